//! Virtualized print preview
//!
//! Pages are rasterised on a small pool of worker threads. The controller
//! owns the live document, decides which rows are materialised and routes
//! worker responses back to the cell whose render epoch they belong to.

pub mod cancel;
pub mod cell;
pub mod controller;
pub mod controls;
pub mod engine;
pub mod request;
pub mod service;
pub mod state;
pub mod task;
pub mod viewport;
pub mod worker;
pub mod zoom;

pub use cancel::CancellationToken;
pub use cell::{PageCell, PageCheckbox, PageToggle, RenderOutcome, StatusOverlay};
pub use controller::{DocumentStatus, PreviewController, PreviewRow};
pub use controls::ZoomControls;
pub use engine::{
    DocumentEngine, DocumentMetadata, DocumentSource, PageSize, PageSource, RenderTarget, Surface,
    Transform,
};
pub use request::{LoadError, RenderFault, RequestId};
pub use service::RenderPool;
pub use task::{PageRenderTask, RenderHandle};
pub use viewport::{PreviewViewport, RowLayout};
pub use zoom::{Zoom, ZoomRequest};

/// Tunables for a preview, usually taken from [`crate::settings::Settings`]
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewConfig {
    /// Additive step used by [`PreviewController::zoom_steps`]
    pub zoom_step: f32,
    pub min_scale: f32,
    /// Vertical space between pages
    pub page_padding: f32,
    /// Subtracted from both window axes when fitting
    pub fit_margin: f32,
    /// Rows materialised beyond each edge of the window
    pub overscan: usize,
    pub workers: usize,
    /// Backing store pixels per logical unit
    pub pixel_ratio: f32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            zoom_step: Zoom::STEP,
            min_scale: Zoom::MIN_SCALE,
            page_padding: 16.0,
            fit_margin: 16.0,
            overscan: 1,
            workers: 2,
            pixel_ratio: 1.0,
        }
    }
}
