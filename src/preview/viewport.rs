//! Exact-height list virtualization for page rows
//!
//! Every page's natural size is known once the document is loaded, so row
//! heights are exact. Row offsets are measured lazily from the top and cached;
//! a scale change drops the whole cache before the next layout so no row is
//! ever placed with a stale offset.

use std::ops::Range;

use super::engine::PageSize;

/// Placement of one materialised row
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RowLayout {
    pub index: usize,
    /// Distance from the top of the content
    pub top: f32,
    /// Row height including padding between pages
    pub height: f32,
    /// Row width, shared by all rows
    pub width: f32,
    /// Page size at the current scale
    pub page: PageSize,
    /// Left inset that centres a narrower page in the row
    pub inset: f32,
}

#[derive(Debug)]
pub struct PreviewViewport {
    sizes: Vec<PageSize>,
    max_natural_width: f32,
    scale: f32,
    page_padding: f32,
    overscan: usize,
    width: f32,
    height: f32,
    scroll_offset: f32,
    /// Sum of all row heights at the current scale
    content_height: f32,
    /// `offsets[i]` is the top of row `i`; only a prefix is measured
    offsets: Vec<f32>,
}

impl PreviewViewport {
    #[must_use]
    pub fn new(sizes: Vec<PageSize>, scale: f32, page_padding: f32, overscan: usize) -> Self {
        let max_natural_width = sizes.iter().map(|s| s.width).fold(0.0, f32::max);
        let mut viewport = Self {
            sizes,
            max_natural_width,
            scale,
            page_padding,
            overscan,
            width: 0.0,
            height: 0.0,
            scroll_offset: 0.0,
            content_height: 0.0,
            offsets: Vec::new(),
        };
        viewport.content_height = viewport.sum_heights();
        viewport
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.sizes.len()
    }

    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    #[must_use]
    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    #[must_use]
    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Height of row `index` at the current scale
    #[must_use]
    pub fn height_of(&self, index: usize) -> f32 {
        self.sizes
            .get(index)
            .map_or(0.0, |s| s.height * self.scale + self.page_padding)
    }

    /// Widest page at the current scale
    #[must_use]
    pub fn row_width(&self) -> f32 {
        self.max_natural_width * self.scale
    }

    /// Number of rows whose offsets are cached
    #[must_use]
    pub fn measured(&self) -> usize {
        self.offsets.len()
    }

    /// Drop cached offsets for `index` and every row after it
    pub fn reset_after_index(&mut self, index: usize) {
        self.offsets.truncate(index);
    }

    /// Change the scale, invalidating every cached offset.
    ///
    /// The page at the top of the window keeps its relative position.
    pub fn set_scale(&mut self, scale: f32) {
        if self.scale == scale {
            return;
        }
        let anchor = self.anchor();

        self.scale = scale;
        self.reset_after_index(0);
        self.content_height = self.sum_heights();

        if let Some((index, fraction)) = anchor {
            let top = self.offset_of(index) + fraction * self.height_of(index);
            self.scroll_to(top);
        } else {
            self.scroll_to(0.0);
        }
    }

    /// Resize the window; offsets do not depend on it
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.scroll_to(self.scroll_offset);
    }

    /// Top of row `index`, measuring rows up to it if needed
    pub fn offset_of(&mut self, index: usize) -> f32 {
        let index = index.min(self.sizes.len().saturating_sub(1));
        self.measure_through(index);
        self.offsets.get(index).copied().unwrap_or(0.0)
    }

    /// Total content height
    #[must_use]
    pub fn total_height(&self) -> f32 {
        self.content_height
    }

    /// Mean row height, usable as a list widget's size estimate
    #[must_use]
    pub fn mean_row_height(&self) -> f32 {
        match self.sizes.len() {
            0 => 0.0,
            n => self.total_height() / n as f32,
        }
    }

    pub fn scroll_to(&mut self, offset: f32) {
        let max = (self.total_height() - self.height).max(0.0);
        self.scroll_offset = if offset.is_finite() {
            offset.clamp(0.0, max)
        } else {
            0.0
        };
    }

    pub fn scroll_by(&mut self, delta: f32) {
        self.scroll_to(self.scroll_offset + delta);
    }

    pub fn scroll_to_page(&mut self, index: usize) {
        let top = self.offset_of(index);
        self.scroll_to(top);
    }

    /// Rows intersecting the window
    pub fn visible_range(&mut self) -> Range<usize> {
        let count = self.sizes.len();
        if count == 0 || self.height <= 0.0 {
            return 0..0;
        }

        let start = self.row_at(self.scroll_offset);
        let bottom = self.scroll_offset + self.height;
        let mut end = start + 1;
        while end < count && self.offset_of(end) < bottom {
            end += 1;
        }
        start..end
    }

    /// Visible rows widened by the overscan on both sides
    pub fn render_range(&mut self) -> Range<usize> {
        let visible = self.visible_range();
        if visible.is_empty() {
            return visible;
        }
        let start = visible.start.saturating_sub(self.overscan);
        let end = (visible.end + self.overscan).min(self.sizes.len());
        start..end
    }

    /// Layout for every row in the render range
    pub fn rows(&mut self) -> Vec<RowLayout> {
        let width = self.row_width();
        self.render_range()
            .map(|index| {
                let page = self.sizes[index].scaled(self.scale);
                RowLayout {
                    index,
                    top: self.offset_of(index),
                    height: self.height_of(index),
                    width,
                    page,
                    inset: ((width - page.width) / 2.0).max(0.0),
                }
            })
            .collect()
    }

    /// Index of the row containing content offset `y`
    fn row_at(&mut self, y: f32) -> usize {
        let count = self.sizes.len();
        // Extend measurement until the cache covers `y`
        while self.offsets.len() < count {
            let last = self.offsets.len().saturating_sub(1);
            if !self.offsets.is_empty() && self.offsets[last] + self.height_of(last) > y {
                break;
            }
            self.measure_through(self.offsets.len());
        }
        // Last measured row whose top is at or above `y`
        let idx = self.offsets.partition_point(|&top| top <= y);
        idx.saturating_sub(1).min(count.saturating_sub(1))
    }

    /// Row at the top of the window and how far into it the window starts
    fn anchor(&mut self) -> Option<(usize, f32)> {
        if self.sizes.is_empty() {
            return None;
        }
        let index = self.row_at(self.scroll_offset);
        let height = self.height_of(index);
        let into = self.scroll_offset - self.offset_of(index);
        let fraction = if height > 0.0 { into / height } else { 0.0 };
        Some((index, fraction.clamp(0.0, 1.0)))
    }

    fn sum_heights(&self) -> f32 {
        (0..self.sizes.len()).map(|i| self.height_of(i)).sum()
    }

    fn measure_through(&mut self, index: usize) {
        while self.offsets.len() <= index && self.offsets.len() < self.sizes.len() {
            let next = match self.offsets.len() {
                0 => 0.0,
                n => self.offsets[n - 1] + self.height_of(n - 1),
            };
            self.offsets.push(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter_pages(count: usize) -> Vec<PageSize> {
        vec![PageSize::new(100.0, 200.0); count]
    }

    fn viewport(sizes: Vec<PageSize>) -> PreviewViewport {
        let mut viewport = PreviewViewport::new(sizes, 1.0, 10.0, 0);
        viewport.set_size(300.0, 400.0);
        viewport
    }

    #[test]
    fn materialises_only_visible_rows() {
        let mut viewport = viewport(letter_pages(1000));
        // Rows are 210 tall; a 400 window at the top shows rows 0 and 1
        assert_eq!(viewport.visible_range(), 0..2);
        assert!(viewport.measured() <= 3);

        viewport.scroll_to(210.0 * 500.0 + 5.0);
        assert_eq!(viewport.visible_range(), 500..502);
    }

    #[test]
    fn overscan_widens_render_range() {
        let mut viewport = PreviewViewport::new(letter_pages(10), 1.0, 10.0, 2);
        viewport.set_size(300.0, 400.0);
        viewport.scroll_to_page(5);
        assert_eq!(viewport.visible_range(), 5..7);
        assert_eq!(viewport.render_range(), 3..9);
    }

    #[test]
    fn offsets_follow_exact_heights() {
        let sizes = vec![
            PageSize::new(100.0, 100.0),
            PageSize::new(100.0, 300.0),
            PageSize::new(100.0, 50.0),
        ];
        let mut viewport = viewport(sizes);
        assert_eq!(viewport.offset_of(0), 0.0);
        assert_eq!(viewport.offset_of(1), 110.0);
        assert_eq!(viewport.offset_of(2), 420.0);
        assert_eq!(viewport.total_height(), 480.0);
        assert_eq!(viewport.mean_row_height(), 160.0);
    }

    #[test]
    fn scale_change_rebuilds_offsets_from_zero() {
        let mut viewport = viewport(letter_pages(20));
        assert_eq!(viewport.offset_of(10), 2100.0);
        assert_eq!(viewport.measured(), 11);

        viewport.set_scale(2.0);
        assert_eq!(viewport.offset_of(10), 4100.0);
        assert_eq!(viewport.height_of(3), 410.0);
    }

    #[test]
    fn scale_change_keeps_top_page_anchored() {
        let mut viewport = viewport(letter_pages(20));
        viewport.scroll_to_page(4);
        viewport.scroll_by(105.0);

        viewport.set_scale(2.0);
        assert_eq!(viewport.visible_range().start, 4);
        assert_eq!(viewport.scroll_offset(), 4.0 * 410.0 + 205.0);
    }

    #[test]
    fn rows_centre_narrow_pages() {
        let sizes = vec![PageSize::new(200.0, 100.0), PageSize::new(100.0, 100.0)];
        let mut viewport = viewport(sizes);
        let rows = viewport.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].width, 200.0);
        assert_eq!(rows[0].inset, 0.0);
        assert_eq!(rows[1].inset, 50.0);
        assert_eq!(rows[1].top, 110.0);
    }

    #[test]
    fn scroll_is_clamped_to_content() {
        let mut viewport = viewport(letter_pages(3));
        viewport.scroll_to(10_000.0);
        assert_eq!(viewport.scroll_offset(), 630.0 - 400.0);
        viewport.scroll_by(-10_000.0);
        assert_eq!(viewport.scroll_offset(), 0.0);
        viewport.scroll_to(f32::NAN);
        assert_eq!(viewport.scroll_offset(), 0.0);
    }

    #[test]
    fn empty_or_zero_height_window_shows_nothing() {
        let mut viewport = PreviewViewport::new(vec![], 1.0, 10.0, 1);
        viewport.set_size(100.0, 100.0);
        assert_eq!(viewport.visible_range(), 0..0);
        assert_eq!(viewport.total_height(), 0.0);

        let mut viewport = PreviewViewport::new(letter_pages(3), 1.0, 10.0, 1);
        assert_eq!(viewport.render_range(), 0..0);
    }
}
