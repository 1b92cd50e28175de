//! Render worker - runs in separate thread(s)

use std::sync::Arc;

use flume::{Receiver, Sender};
use log::{debug, error};

use super::cancel::CancellationToken;
use super::engine::{DocumentEngine, PageSource, RenderTarget, Surface};
use super::request::{LoadError, LoadedDocument, RenderRequest, RenderResponse, RequestId};

/// Main worker function - runs in a dedicated thread
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn render_worker(
    engine: Arc<dyn DocumentEngine>,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
) {
    for request in requests {
        let response = match request {
            RenderRequest::Load { id, blob, cancel } => {
                handle_load_request(engine.as_ref(), id, &blob, &cancel)
            }
            RenderRequest::Page {
                id,
                index,
                page,
                target,
                cancel,
            } => handle_page_request(id, index, page.as_ref(), &target, &cancel),
            RenderRequest::Metadata { id, document } => RenderResponse::Metadata {
                id,
                result: document.metadata(),
            },
            RenderRequest::Shutdown => break,
        };

        if responses.send(response).is_err() {
            // Service is gone, nobody is listening anymore
            break;
        }
    }
}

fn handle_load_request(
    engine: &dyn DocumentEngine,
    id: RequestId,
    blob: &[u8],
    cancel: &CancellationToken,
) -> RenderResponse {
    if cancel.is_cancelled() {
        return RenderResponse::Cancelled(id);
    }

    match load_document(engine, blob, cancel) {
        Ok(document) if cancel.is_cancelled() => {
            debug!("Load {id:?} superseded after resolving, releasing document");
            document.release();
            RenderResponse::Cancelled(id)
        }
        Ok(document) => RenderResponse::Loaded { id, document },
        Err(_) if cancel.is_cancelled() => RenderResponse::Cancelled(id),
        Err(error) => {
            error!("Loading document failed: {error}");
            RenderResponse::LoadFailed { id, error }
        }
    }
}

/// Load a document and eagerly fetch every page handle.
///
/// A failure on any page fails the whole load; the partially loaded document
/// is released before returning.
pub fn load_document(
    engine: &dyn DocumentEngine,
    blob: &[u8],
    cancel: &CancellationToken,
) -> Result<LoadedDocument, LoadError> {
    let document = engine.load(blob, cancel)?;
    let page_count = document.page_count();
    if page_count == 0 {
        document.destroy();
        return Err(LoadError::Empty);
    }

    let mut pages: Vec<Arc<dyn PageSource>> = Vec::with_capacity(page_count);
    for index in 0..page_count {
        match document.page(index) {
            Ok(page) => pages.push(page),
            Err(e) => {
                LoadedDocument {
                    document: Arc::clone(&document),
                    pages,
                }
                .release();
                return Err(e);
            }
        }
    }

    Ok(LoadedDocument { document, pages })
}

fn handle_page_request(
    id: RequestId,
    index: usize,
    page: &dyn PageSource,
    target: &RenderTarget,
    cancel: &CancellationToken,
) -> RenderResponse {
    if cancel.is_cancelled() {
        return RenderResponse::Cancelled(id);
    }

    let mut surface = Surface::for_target(target);
    let result = page.render(&mut surface, target, cancel);

    // A cancelled render never reports success or failure
    if cancel.is_cancelled() {
        return RenderResponse::Cancelled(id);
    }

    match result {
        Ok(()) => RenderResponse::Page { id, index, surface },
        Err(error) => {
            error!("Rendering page {index} failed: {error}");
            RenderResponse::Error { id, index, error }
        }
    }
}
