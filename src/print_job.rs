//! Print submission options
//!
//! The preview never interprets these beyond the color filter; they are
//! carried from the form to the submission call as ordered query pairs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::page_selection::PageSelection;
use crate::preview::controls::ZoomControls;

/// How rendered pages are displayed and printed
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    #[default]
    Color,
    Grayscale,
}

impl ColorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Color => "color",
            ColorMode::Grayscale => "grayscale",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Duplex setting
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Sides {
    #[default]
    OneSided,
    TwoSidedLongEdge,
    TwoSidedShortEdge,
}

impl Sides {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sides::OneSided => "one-sided",
            Sides::TwoSidedLongEdge => "two-sided-long-edge",
            Sides::TwoSidedShortEdge => "two-sided-short-edge",
        }
    }
}

impl fmt::Display for Sides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOptions {
    pub sides: Sides,
    pub color_mode: ColorMode,
    pub copies: u32,
    /// Page range text exactly as typed
    pub pages: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            sides: Sides::default(),
            color_mode: ColorMode::default(),
            copies: 1,
            pages: String::new(),
            title: None,
        }
    }
}

impl PrintOptions {
    /// Options carrying the selection's current text
    #[must_use]
    pub fn with_selection(selection: &PageSelection) -> Self {
        Self {
            pages: selection.text().to_string(),
            ..Self::default()
        }
    }

    /// Fill in the title: an explicit one wins, then the title read from the
    /// document, then the file name.
    #[must_use]
    pub fn resolved(&self, controls: &ZoomControls, file_name: &str) -> Self {
        let title = self
            .title
            .clone()
            .or_else(|| controls.document_title())
            .unwrap_or_else(|| file_name.to_string());
        Self {
            title: Some(title),
            copies: self.copies.max(1),
            ..self.clone()
        }
    }

    /// Query pairs in submission order
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("sides", self.sides.as_str().to_string()),
            ("colorMode", self.color_mode.as_str().to_string()),
            ("copies", self.copies.to_string()),
            ("pages", self.pages.clone()),
        ];
        if let Some(title) = &self.title {
            pairs.push(("title", title.clone()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_keep_form_order() {
        let options = PrintOptions {
            sides: Sides::TwoSidedLongEdge,
            color_mode: ColorMode::Grayscale,
            copies: 2,
            pages: "1-3, 7".to_string(),
            title: Some("Report".to_string()),
        };
        let keys: Vec<_> = options.query_pairs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["sides", "colorMode", "copies", "pages", "title"]);
        assert_eq!(options.query_pairs()[0].1, "two-sided-long-edge");
        assert_eq!(options.query_pairs()[3].1, "1-3, 7");
    }

    #[test]
    fn title_falls_back_to_file_name() {
        let controls = ZoomControls::new();
        let resolved = PrintOptions::default().resolved(&controls, "thesis.pdf");
        assert_eq!(resolved.title.as_deref(), Some("thesis.pdf"));
    }

    #[test]
    fn document_title_beats_file_name() {
        let controls = ZoomControls::new();
        controls.publish_title(Some("Annual Report".to_string()));
        let resolved = PrintOptions::default().resolved(&controls, "thesis.pdf");
        assert_eq!(resolved.title.as_deref(), Some("Annual Report"));

        let explicit = PrintOptions {
            title: Some("Mine".to_string()),
            ..PrintOptions::default()
        };
        assert_eq!(
            explicit.resolved(&controls, "thesis.pdf").title.as_deref(),
            Some("Mine")
        );
    }

    #[test]
    fn pages_text_passes_through_unvalidated() {
        let mut selection = PageSelection::new();
        selection.set_text("1-");
        assert_eq!(PrintOptions::with_selection(&selection).pages, "1-");
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_string(&PrintOptions::default()).unwrap_or_default();
        assert!(json.contains("\"colorMode\":\"color\""));
        assert!(json.contains("\"sides\":\"one-sided\""));
    }
}
