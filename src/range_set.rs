//! Page range expressions
//!
//! A range expression is human-authored text such as `"1-5, 8, 11-13"` that
//! denotes a set of 1-based page numbers. All functions here are pure: they
//! parse their input on every call and never retain state. The canonical text
//! form is sorted, merged and joined with [`SEPARATOR`].

use std::fmt;

use log::debug;

/// Separator used between ranges in canonical text
pub const SEPARATOR: &str = ", ";

/// Errors produced when a range expression does not parse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeSyntaxError {
    #[error("empty entry in page range")]
    EmptyToken,

    #[error("'{0}' is not a page number")]
    NotANumber(String),

    #[error("page numbers start at 1, got '{0}'")]
    PageBelowOne(String),

    #[error("range {low}-{high} runs backwards")]
    Reversed { low: u32, high: u32 },
}

/// An inclusive span of 1-based page numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn single(page: u32) -> Self {
        Self::new(page, page)
    }

    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        (self.start..=self.end).contains(&page)
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Parse a range expression into sorted, disjoint, merged ranges.
///
/// Blank text is the empty selection. Every comma-separated entry must be a
/// page number or a `low-high` pair with `1 <= low <= high`.
pub fn parse(text: &str) -> Result<Vec<PageRange>, RangeSyntaxError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let ranges = text
        .split(',')
        .map(parse_token)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(normalize(ranges))
}

fn parse_token(token: &str) -> Result<PageRange, RangeSyntaxError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(RangeSyntaxError::EmptyToken);
    }

    match token.split_once('-') {
        Some((low, high)) => {
            let low = parse_page(low)?;
            let high = parse_page(high)?;
            if low > high {
                return Err(RangeSyntaxError::Reversed { low, high });
            }
            Ok(PageRange::new(low, high))
        }
        None => parse_page(token).map(PageRange::single),
    }
}

fn parse_page(raw: &str) -> Result<u32, RangeSyntaxError> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeSyntaxError::NotANumber(raw.to_string()));
    }
    let page: u32 = raw
        .parse()
        .map_err(|_| RangeSyntaxError::NotANumber(raw.to_string()))?;
    if page < 1 {
        return Err(RangeSyntaxError::PageBelowOne(raw.to_string()));
    }
    Ok(page)
}

/// Sort ranges by start and merge the overlapping or adjacent ones
fn normalize(mut ranges: Vec<PageRange>) -> Vec<PageRange> {
    ranges.sort_unstable();

    let mut merged: Vec<PageRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end.saturating_add(1) => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Test whether `page` is selected by `text`
pub fn contains_page(text: &str, page: u32) -> Result<bool, RangeSyntaxError> {
    Ok(parse(text)?.iter().any(|range| range.contains(page)))
}

/// Render ranges in canonical form
#[must_use]
pub fn serialize(ranges: &[PageRange]) -> String {
    normalize(ranges.to_vec())
        .iter()
        .map(PageRange::to_string)
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Insert `page` into the set denoted by `text` and return canonical text
pub fn add_page_to_set(text: &str, page: u32) -> Result<String, RangeSyntaxError> {
    if page < 1 {
        return Err(RangeSyntaxError::PageBelowOne(page.to_string()));
    }
    let mut ranges = parse(text)?;
    ranges.push(PageRange::single(page));
    Ok(serialize(&ranges))
}

/// Remove `page` from the set denoted by `text` and return canonical text.
///
/// Removing an interior page splits its range in two. Every other page is
/// kept, including pages past `total_pages`.
pub fn remove_page_from_set(
    text: &str,
    page: u32,
    total_pages: usize,
) -> Result<String, RangeSyntaxError> {
    if total_pages > 0 && u32::try_from(total_pages).is_ok_and(|last| page > last) {
        debug!("Removing page {page} beyond the last page {total_pages}");
    }
    let ranges = parse(text)?;
    let mut kept = Vec::with_capacity(ranges.len() + 1);

    for range in ranges {
        if !range.contains(page) {
            kept.push(range);
            continue;
        }
        if range.start < page {
            kept.push(PageRange::new(range.start, page - 1));
        }
        if page < range.end {
            kept.push(PageRange::new(page + 1, range.end));
        }
    }

    Ok(serialize(&kept))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_expression() {
        let ranges = parse("1-5, 8, 11-13").unwrap();
        assert_eq!(
            ranges,
            vec![
                PageRange::new(1, 5),
                PageRange::single(8),
                PageRange::new(11, 13)
            ]
        );
        assert_eq!(serialize(&ranges), "1-5, 8, 11-13");
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            parse("5-1"),
            Err(RangeSyntaxError::Reversed { low: 5, high: 1 })
        );
        assert_eq!(parse("0-3"), Err(RangeSyntaxError::PageBelowOne("0".into())));
        assert_eq!(parse("abc"), Err(RangeSyntaxError::NotANumber("abc".into())));
        assert_eq!(parse("1,,2"), Err(RangeSyntaxError::EmptyToken));
        assert_eq!(parse("1, "), Err(RangeSyntaxError::EmptyToken));
        assert!(parse("1-2-3").is_err());
        assert!(parse("-4").is_err());
        assert!(parse("+4").is_err());
    }

    #[test]
    fn blank_text_is_empty_selection() {
        assert_eq!(parse("").unwrap(), vec![]);
        assert_eq!(parse("   ").unwrap(), vec![]);
        assert!(!contains_page("", 1).unwrap());
    }

    #[test]
    fn canonicalizes_unsorted_overlapping_input() {
        let ranges = parse("9, 3-4,1 - 2, 4-6, 8").unwrap();
        assert_eq!(ranges, vec![PageRange::new(1, 6), PageRange::new(8, 9)]);
        assert_eq!(serialize(&ranges), "1-6, 8-9");
    }

    #[test]
    fn canonical_form_is_idempotent() {
        for text in ["1-5, 8, 11-13", "3,2,1", "10-12, 1, 11-20", "7"] {
            let once = parse(text).unwrap();
            let again = parse(&serialize(&once)).unwrap();
            assert_eq!(once, again, "round trip of {text:?}");
        }
    }

    #[test]
    fn contains_page_propagates_syntax_errors() {
        assert!(contains_page("1-5", 3).unwrap());
        assert!(!contains_page("1-5", 6).unwrap());
        assert!(contains_page("1-", 1).is_err());
    }

    #[test]
    fn add_merges_with_neighbors() {
        assert_eq!(add_page_to_set("1-3, 5-7", 4).unwrap(), "1-7");
        assert_eq!(add_page_to_set("1-3", 5).unwrap(), "1-3, 5");
        assert_eq!(add_page_to_set("", 2).unwrap(), "2");
        assert_eq!(add_page_to_set("2-4", 3).unwrap(), "2-4");
        assert!(add_page_to_set("x", 1).is_err());
        assert!(add_page_to_set("1", 0).is_err());
    }

    #[test]
    fn remove_splits_interior_page() {
        assert_eq!(remove_page_from_set("1-10", 5, 10).unwrap(), "1-4, 6-10");
        assert_eq!(remove_page_from_set("1-10", 1, 10).unwrap(), "2-10");
        assert_eq!(remove_page_from_set("1-10", 10, 10).unwrap(), "1-9");
    }

    #[test]
    fn remove_drops_singleton_range() {
        assert_eq!(remove_page_from_set("1-3, 8, 11", 8, 20).unwrap(), "1-3, 11");
        assert_eq!(remove_page_from_set("4", 4, 20).unwrap(), "");
    }

    #[test]
    fn remove_missing_page_is_noop() {
        assert_eq!(remove_page_from_set("1-3", 50, 0).unwrap(), "1-3");
        assert_eq!(remove_page_from_set("1-3", 50, 10).unwrap(), "1-3");
    }

    #[test]
    fn remove_keeps_pages_past_document_end() {
        assert_eq!(remove_page_from_set("1-20", 5, 10).unwrap(), "1-4, 6-20");
        assert_eq!(remove_page_from_set("12-15", 13, 10).unwrap(), "12, 14-15");
        assert_eq!(remove_page_from_set("1, 12-15", 1, 10).unwrap(), "12-15");
    }

    #[test]
    fn add_then_remove_membership() {
        let text = "1-5, 8, 11-13";
        for page in [6, 7, 9, 14, 40] {
            let added = add_page_to_set(text, page).unwrap();
            assert!(contains_page(&added, page).unwrap());
            assert_eq!(serialize(&parse(&added).unwrap()), added);

            let removed = remove_page_from_set(&added, page, 100).unwrap();
            assert!(!contains_page(&removed, page).unwrap());
        }
    }
}
