//! Page selection state shared between the host form and the preview
//!
//! The free-text field may hold anything the user typed. `valid_set` keeps
//! the last text that parsed, so there is always one authoritative selection
//! even while the field is mid-edit.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::range_set::{self, RangeSyntaxError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSelection {
    text: String,
    valid_set: String,
}

impl PageSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selection from text; invalid text yields an empty valid set
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        let mut selection = Self::new();
        selection.set_text(text);
        selection
    }

    /// Raw text as typed by the user
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Last text that parsed successfully
    #[must_use]
    pub fn valid_set(&self) -> &str {
        &self.valid_set
    }

    /// True while the typed text differs from the last valid selection
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.text != self.valid_set
    }

    /// Store new text from the form field.
    ///
    /// The valid set only advances when the text parses; a syntax error is
    /// reported through [`PageSelection::is_invalid`], never to the caller.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        match range_set::parse(&text) {
            Ok(_) => self.valid_set.clone_from(&text),
            Err(e) => debug!("Keeping previous page selection, {text:?} is invalid: {e}"),
        }
        self.text = text;
    }

    /// Whether the valid selection includes `page` (1-based)
    #[must_use]
    pub fn includes(&self, page: u32) -> bool {
        range_set::contains_page(&self.valid_set, page).unwrap_or_else(|e| {
            warn!("Stored page selection {:?} failed to parse: {e}", self.valid_set);
            false
        })
    }

    /// Include or exclude a single page, rewriting both fields canonically.
    ///
    /// Edits always apply to the valid set, so a half-typed expression is
    /// replaced by the result.
    pub fn set_page_included(
        &mut self,
        page: u32,
        included: bool,
        total_pages: usize,
    ) -> Result<(), RangeSyntaxError> {
        let updated = if included {
            range_set::add_page_to_set(&self.valid_set, page)?
        } else {
            range_set::remove_page_from_set(&self.valid_set, page, total_pages)?
        };
        debug!("Page {page} included={included}: {:?} -> {updated:?}", self.valid_set);
        self.text.clone_from(&updated);
        self.valid_set = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_text_keeps_last_valid_set() {
        let mut selection = PageSelection::new();
        selection.set_text("1-3");
        assert!(!selection.is_invalid());

        selection.set_text("1-3, 5-");
        assert!(selection.is_invalid());
        assert_eq!(selection.text(), "1-3, 5-");
        assert_eq!(selection.valid_set(), "1-3");
        assert!(selection.includes(2));
        assert!(!selection.includes(5));

        selection.set_text("1-3, 5-6");
        assert!(!selection.is_invalid());
        assert!(selection.includes(6));
    }

    #[test]
    fn valid_text_is_kept_verbatim() {
        let selection = PageSelection::from_text("3,1");
        assert_eq!(selection.valid_set(), "3,1");
        assert!(!selection.is_invalid());
    }

    #[test]
    fn toggles_rewrite_canonical_text() {
        let mut selection = PageSelection::from_text("3,1");
        selection.set_page_included(2, true, 10).unwrap();
        assert_eq!(selection.text(), "1-3");
        assert_eq!(selection.valid_set(), "1-3");

        selection.set_page_included(2, false, 10).unwrap();
        assert_eq!(selection.text(), "1, 3");
    }

    #[test]
    fn toggle_replaces_half_typed_text() {
        let mut selection = PageSelection::from_text("4");
        selection.set_text("4, 9-");
        selection.set_page_included(5, true, 10).unwrap();
        assert_eq!(selection.text(), "4-5");
        assert!(!selection.is_invalid());
    }

    #[test]
    fn starts_empty_and_valid() {
        let selection = PageSelection::new();
        assert!(!selection.is_invalid());
        assert!(!selection.includes(1));
    }
}
