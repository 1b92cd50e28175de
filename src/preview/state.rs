//! View state management

use super::engine::PageSize;
use super::zoom::{Zoom, ZoomRequest};

/// Scale and window state for one loaded document
#[derive(Clone, Debug)]
pub struct ViewState {
    /// Current zoom
    pub zoom: Zoom,

    /// Window size in logical units
    pub window: (f32, f32),

    /// Largest natural page size, per axis
    pub max_page: PageSize,

    /// Margin subtracted from the window when fitting
    pub fit_margin: f32,
}

impl ViewState {
    /// State for a freshly loaded document, scaled to fit `window`
    #[must_use]
    pub fn fitted(
        max_page: PageSize,
        window: (f32, f32),
        fit_margin: f32,
        min_scale: f32,
    ) -> Self {
        let fit = Zoom::fit_scale(max_page, window, fit_margin);
        Self {
            zoom: Zoom::fitted(fit, min_scale),
            window,
            max_page,
            fit_margin,
        }
    }

    #[must_use]
    pub fn scale(&self) -> f32 {
        self.zoom.factor()
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::Zoom(request) => {
                if self.zoom.apply(request) {
                    vec![Effect::Rescale, Effect::Relayout, Effect::RestartRenders]
                } else {
                    vec![]
                }
            }

            Command::Resize { width, height } => {
                if self.window != (width, height) {
                    self.window = (width, height);
                    self.zoom
                        .refit(Zoom::fit_scale(self.max_page, self.window, self.fit_margin));
                    vec![Effect::Relayout]
                } else {
                    vec![]
                }
            }
        }
    }
}

/// Commands that modify view state
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Zoom in, out or back to fit
    Zoom(ZoomRequest),
    /// The window changed size
    Resize { width: f32, height: f32 },
}

/// Effects produced by state changes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Push the new scale into the viewport and drop its offset cache
    Rescale,
    /// Start a new render epoch for every materialised row
    RestartRenders,
    /// Recompute which rows are materialised
    Relayout,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> ViewState {
        ViewState::fitted(
            PageSize::new(600.0, 800.0),
            (316.0, 1616.0),
            16.0,
            Zoom::MIN_SCALE,
        )
    }

    #[test]
    fn starts_at_fit_scale() {
        assert_eq!(test_state().scale(), 0.5);
    }

    #[test]
    fn zoom_rescales_and_restarts_renders() {
        let mut state = test_state();
        let effects = state.apply(Command::Zoom(ZoomRequest::Delta(0.25)));
        assert_eq!(state.scale(), 0.75);
        assert_eq!(effects, vec![Effect::Rescale, Effect::Relayout, Effect::RestartRenders]);
    }

    #[test]
    fn reset_at_fit_is_a_noop() {
        let mut state = test_state();
        let effects = state.apply(Command::Zoom(ZoomRequest::Reset));
        assert!(effects.is_empty());
    }

    #[test]
    fn resize_refits_without_rescaling() {
        let mut state = test_state();
        let effects = state.apply(Command::Resize {
            width: 616.0,
            height: 1616.0,
        });
        assert_eq!(effects, vec![Effect::Relayout]);
        assert_eq!(state.scale(), 0.5);

        let effects = state.apply(Command::Zoom(ZoomRequest::Reset));
        assert_eq!(state.scale(), 1.0);
        assert_eq!(effects, vec![Effect::Rescale, Effect::Relayout, Effect::RestartRenders]);
    }
}
