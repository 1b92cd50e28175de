//! Toolbar handle for a preview
//!
//! The host owns a [`ZoomControls`] and hands clones to its toolbar. Only the
//! preview controller can bind the zoom channel, and only a metadata reply
//! for the live document can set the title; the host side is read/request
//! only.

use std::sync::{Arc, Mutex, PoisonError};

use flume::Sender;
use log::debug;

use super::zoom::ZoomRequest;

#[derive(Default)]
struct ControlsState {
    zoom_tx: Option<Sender<ZoomRequest>>,
    title: Option<String>,
}

#[derive(Clone, Default)]
pub struct ZoomControls {
    state: Arc<Mutex<ControlsState>>,
}

impl ZoomControls {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the bound preview to zoom.
    ///
    /// The request is queued and applied by the controller's next `poll`,
    /// which updates the scale, row offsets and renders in one step. Code on
    /// the controller's own thread can call `PreviewController::zoom` to
    /// apply it immediately. Returns false when no document is being
    /// previewed.
    pub fn zoom(&self, request: ZoomRequest) -> bool {
        let tx = self.lock().zoom_tx.clone();
        match tx {
            Some(tx) => tx.send(request).is_ok(),
            None => {
                debug!("Zoom {request:?} ignored, no preview bound");
                false
            }
        }
    }

    pub fn zoom_in(&self, step: f32) -> bool {
        self.zoom(ZoomRequest::Delta(step))
    }

    pub fn zoom_out(&self, step: f32) -> bool {
        self.zoom(ZoomRequest::Delta(-step))
    }

    pub fn reset_zoom(&self) -> bool {
        self.zoom(ZoomRequest::Reset)
    }

    /// Title from the document metadata, once it has been read
    #[must_use]
    pub fn document_title(&self) -> Option<String> {
        self.lock().title.clone()
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.lock().zoom_tx.is_some()
    }

    pub(crate) fn bind(&self, zoom_tx: Sender<ZoomRequest>) {
        let mut state = self.lock();
        state.zoom_tx = Some(zoom_tx);
        state.title = None;
    }

    pub(crate) fn unbind(&self) {
        let mut state = self.lock();
        state.zoom_tx = None;
        state.title = None;
    }

    pub(crate) fn publish_title(&self, title: Option<String>) {
        self.lock().title = title;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ControlsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ZoomControls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ZoomControls")
            .field("bound", &state.zoom_tx.is_some())
            .field("title", &state.title)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_controls_ignore_zoom() {
        let controls = ZoomControls::new();
        assert!(!controls.zoom_in(0.1));
        assert_eq!(controls.document_title(), None);
    }

    #[test]
    fn bound_controls_forward_requests() {
        let controls = ZoomControls::new();
        let toolbar = controls.clone();
        let (tx, rx) = flume::unbounded();
        controls.bind(tx);

        assert!(toolbar.zoom_in(0.1));
        assert!(toolbar.reset_zoom());
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![ZoomRequest::Delta(0.1), ZoomRequest::Reset]
        );

        controls.publish_title(Some("Report".into()));
        assert_eq!(toolbar.document_title().as_deref(), Some("Report"));

        controls.unbind();
        assert!(!toolbar.zoom_out(0.1));
        assert_eq!(toolbar.document_title(), None);
    }
}
