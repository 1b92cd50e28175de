//! Cancellable rasterisation of one page at one scale

use std::sync::Arc;

use super::cancel::CancellationToken;
use super::engine::{PageSource, RenderTarget};
use super::request::RequestId;
use super::service::RenderPool;

/// Starts page renders on the pool
pub struct PageRenderTask;

impl PageRenderTask {
    /// Begin rasterising `page` at `scale`, with the backing store enlarged by
    /// `pixel_ratio`. The returned handle identifies the render epoch.
    pub fn start(
        pool: &mut RenderPool,
        index: usize,
        page: Arc<dyn PageSource>,
        scale: f32,
        pixel_ratio: f32,
    ) -> RenderHandle {
        let target = RenderTarget::new(page.size(), scale, pixel_ratio);
        let cancel = CancellationToken::new();
        let id = pool.render_page(index, page, target, cancel.clone());
        RenderHandle { id, target, cancel }
    }
}

/// Handle to an in-flight render
#[derive(Debug)]
pub struct RenderHandle {
    id: RequestId,
    target: RenderTarget,
    cancel: CancellationToken,
}

impl RenderHandle {
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    #[must_use]
    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    /// Request early termination. Fire-and-forget: the worker answers with a
    /// cancellation that the owner ignores.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
