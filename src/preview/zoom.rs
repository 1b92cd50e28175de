//! Scale arithmetic for the preview
//!
//! The preview scale starts at the fit-to-window value and is then moved by
//! additive steps. Reset recomputes the fit for the current window size.

use super::engine::PageSize;

/// A zoom operation from the toolbar
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ZoomRequest {
    /// Add this amount to the scale
    Delta(f32),
    /// Return to the fit-to-window scale
    Reset,
}

/// Current scale and the fit it was derived from
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zoom {
    /// Current scale factor (1.0 = natural size)
    pub factor: f32,

    /// Fit-to-window scale for the current window size
    pub fit: f32,

    /// Smallest scale additive zooming may reach
    pub min_scale: f32,
}

impl Zoom {
    /// Default additive step for the toolbar buttons
    pub const STEP: f32 = 0.1;
    /// Default minimum scale
    pub const MIN_SCALE: f32 = 0.1;

    /// Start at the fit scale
    #[must_use]
    pub fn fitted(fit: f32, min_scale: f32) -> Self {
        let fit = Self::sanitize(fit);
        Self {
            factor: fit,
            fit,
            min_scale,
        }
    }

    #[must_use]
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Apply a zoom request, returning true if the scale changed
    pub fn apply(&mut self, request: ZoomRequest) -> bool {
        let next = match request {
            ZoomRequest::Delta(delta) => self.clamp_factor(self.factor + delta),
            ZoomRequest::Reset => self.fit,
        };
        let changed = next != self.factor;
        self.factor = next;
        changed
    }

    /// Record a new fit without moving the current scale
    pub fn refit(&mut self, fit: f32) {
        self.fit = Self::sanitize(fit);
    }

    /// Clamp factor to the minimum, handling NaN/Inf
    #[must_use]
    pub fn clamp_factor(&self, factor: f32) -> f32 {
        if factor.is_finite() {
            factor.max(self.min_scale)
        } else {
            self.factor
        }
    }

    /// Scale that fits the largest page into the window minus `margin`.
    ///
    /// `max_page` is the per-axis maximum over all pages at scale 1.0.
    #[must_use]
    pub fn fit_scale(max_page: PageSize, window: (f32, f32), margin: f32) -> f32 {
        let available_width = window.0 - margin;
        let available_height = window.1 - margin;
        Self::sanitize((available_width / max_page.width).min(available_height / max_page.height))
    }

    fn sanitize(scale: f32) -> f32 {
        if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        }
    }
}

/// Per-axis maximum of natural page sizes
#[must_use]
pub fn max_page_size(sizes: &[PageSize]) -> PageSize {
    sizes.iter().fold(PageSize::new(0.0, 0.0), |acc, size| {
        PageSize::new(acc.width.max(size.width), acc.height.max(size.height))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_uses_tighter_axis() {
        let page = PageSize::new(600.0, 800.0);
        assert_eq!(Zoom::fit_scale(page, (316.0, 1616.0), 16.0), 0.5);
        assert_eq!(Zoom::fit_scale(page, (1216.0, 416.0), 16.0), 0.5);
    }

    #[test]
    fn degenerate_fit_falls_back_to_natural_size() {
        assert_eq!(Zoom::fit_scale(PageSize::new(0.0, 0.0), (100.0, 100.0), 0.0), 1.0);
        assert_eq!(Zoom::fit_scale(PageSize::new(10.0, 10.0), (5.0, 5.0), 16.0), 1.0);
    }

    #[test]
    fn reset_returns_to_fit_after_deltas() {
        let mut zoom = Zoom::fitted(0.75, Zoom::MIN_SCALE);
        for delta in [0.1, 0.1, -0.3, 0.5, 0.1] {
            zoom.apply(ZoomRequest::Delta(delta));
        }
        assert_ne!(zoom.factor(), 0.75);

        assert!(zoom.apply(ZoomRequest::Reset));
        assert_eq!(zoom.factor(), 0.75);
        assert!(!zoom.apply(ZoomRequest::Reset));
    }

    #[test]
    fn deltas_cannot_cross_minimum() {
        let mut zoom = Zoom::fitted(0.2, 0.1);
        zoom.apply(ZoomRequest::Delta(-1.0));
        assert_eq!(zoom.factor(), 0.1);
        assert!(!zoom.apply(ZoomRequest::Delta(-0.1)));
        zoom.apply(ZoomRequest::Delta(f32::NAN));
        assert_eq!(zoom.factor(), 0.1);
    }

    #[test]
    fn refit_does_not_move_scale() {
        let mut zoom = Zoom::fitted(0.5, 0.1);
        zoom.refit(0.8);
        assert_eq!(zoom.factor(), 0.5);
        zoom.apply(ZoomRequest::Reset);
        assert_eq!(zoom.factor(), 0.8);
    }

    #[test]
    fn max_page_size_is_per_axis() {
        let sizes = [PageSize::new(100.0, 300.0), PageSize::new(200.0, 100.0)];
        assert_eq!(max_page_size(&sizes), PageSize::new(200.0, 300.0));
    }
}
