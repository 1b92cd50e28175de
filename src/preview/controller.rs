//! Preview controller - document lifecycle, scale and row wiring
//!
//! Exactly one document is live at a time. Opening a new blob releases the
//! previous one first: an unresolved load is cancelled (and released on
//! arrival if it resolves anyway), a loaded document has every page cleaned
//! up and is then destroyed. Cells borrow page handles but never release them.

use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use flume::{Receiver, Sender};
use image::RgbaImage;
use log::{debug, info, warn};

use super::PreviewConfig;
use super::cancel::CancellationToken;
use super::cell::{PageCell, PageCheckbox, PageToggle, RenderOutcome};
use super::controls::ZoomControls;
use super::engine::{DocumentEngine, DocumentMetadata, PageSize};
use super::request::{LoadError, LoadedDocument, RenderResponse, RequestId};
use super::service::RenderPool;
use super::state::{Command, Effect, ViewState};
use super::viewport::{PreviewViewport, RowLayout};
use super::zoom::{ZoomRequest, max_page_size};
use crate::page_selection::PageSelection;
use crate::print_job::ColorMode;

/// Document lifecycle as seen by the host
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentStatus {
    /// Nothing opened
    Empty,
    /// Load in flight
    Loading,
    /// Document is live
    Ready { page_count: usize },
    /// Document could not be loaded; no pages are shown
    Failed(String),
}

/// Snapshot of one materialised row
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewRow {
    pub layout: RowLayout,
    pub outcome: RenderOutcome,
    /// "Loading" or the error text while the render is not finished
    pub overlay: Option<String>,
    /// Present only when page selection is enabled
    pub checkbox: Option<PageCheckbox>,
    /// Whether a bitmap (possibly from an older scale) is available
    pub has_bitmap: bool,
}

struct LiveDocument {
    loaded: LoadedDocument,
    view: ViewState,
    viewport: PreviewViewport,
    cells: BTreeMap<usize, PageCell>,
    pending_metadata: Option<RequestId>,
}

impl LiveDocument {
    fn page_count(&self) -> usize {
        self.loaded.pages.len()
    }
}

enum DocumentState {
    Empty,
    Loading {
        id: RequestId,
        cancel: CancellationToken,
    },
    Ready(Box<LiveDocument>),
    Failed(LoadError),
}

pub struct PreviewController {
    pool: RenderPool,
    config: PreviewConfig,
    controls: ZoomControls,
    zoom_tx: Sender<ZoomRequest>,
    zoom_rx: Receiver<ZoomRequest>,
    window: (f32, f32),
    color_mode: ColorMode,
    selection: Option<PageSelection>,
    /// Blob behind the current document
    source: Option<Arc<[u8]>>,
    document: DocumentState,
}

impl PreviewController {
    #[must_use]
    pub fn new(
        engine: Arc<dyn DocumentEngine>,
        config: PreviewConfig,
        controls: ZoomControls,
    ) -> Self {
        let (zoom_tx, zoom_rx) = flume::unbounded();
        Self {
            pool: RenderPool::new(engine, config.workers),
            config,
            controls,
            zoom_tx,
            zoom_rx,
            window: (0.0, 0.0),
            color_mode: ColorMode::default(),
            selection: None,
            source: None,
            document: DocumentState::Empty,
        }
    }

    /// Start previewing `blob`, releasing whatever was open before.
    ///
    /// Opening the blob that is already loading or live does nothing and
    /// returns false. A blob that failed to load is retried.
    pub fn open(&mut self, blob: impl Into<Arc<[u8]>>) -> bool {
        let blob = blob.into();
        let in_use = matches!(
            self.document,
            DocumentState::Loading { .. } | DocumentState::Ready(_)
        );
        if in_use && self.source.as_deref() == Some(&*blob) {
            debug!("Document already open, ignoring");
            return false;
        }
        self.release();

        let cancel = CancellationToken::new();
        let id = self.pool.load(Arc::clone(&blob), cancel.clone());
        info!("Loading document ({id:?}, {} bytes)", blob.len());
        self.source = Some(blob);
        self.document = DocumentState::Loading { id, cancel };
        true
    }

    /// Release the current document. Safe to call repeatedly, and before a
    /// load has resolved.
    pub fn close(&mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.source = None;
        match mem::replace(&mut self.document, DocumentState::Empty) {
            DocumentState::Empty | DocumentState::Failed(_) => {}
            DocumentState::Loading { id, cancel } => {
                debug!("Cancelling unresolved load {id:?}");
                cancel.cancel();
            }
            DocumentState::Ready(mut live) => {
                debug!("Releasing document with {} pages", live.page_count());
                // Cells cancel their renders on drop; they never own pages
                live.cells.clear();
                live.loaded.release();
            }
        }
        self.controls.unbind();
        // Requests aimed at the old document are meaningless now
        let _ = self.zoom_rx.try_iter().count();
        self.drain_stale_responses();
    }

    /// Handle every queued response while no document is current, so a load
    /// that resolved before being noticed is released rather than dropped
    fn drain_stale_responses(&mut self) {
        for response in self.pool.poll_responses() {
            self.handle_response(response);
        }
    }

    #[must_use]
    pub fn status(&self) -> DocumentStatus {
        match &self.document {
            DocumentState::Empty => DocumentStatus::Empty,
            DocumentState::Loading { .. } => DocumentStatus::Loading,
            DocumentState::Ready(live) => DocumentStatus::Ready {
                page_count: live.page_count(),
            },
            DocumentState::Failed(error) => DocumentStatus::Failed(error.to_string()),
        }
    }

    #[must_use]
    pub fn controls(&self) -> &ZoomControls {
        &self.controls
    }

    #[must_use]
    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    #[must_use]
    pub fn page_count(&self) -> Option<usize> {
        self.live().map(LiveDocument::page_count)
    }

    /// Current scale, once a document is live
    #[must_use]
    pub fn scale(&self) -> Option<f32> {
        self.live().map(|live| live.view.scale())
    }

    /// Fit-to-window scale for the current window
    #[must_use]
    pub fn fit_scale(&self) -> Option<f32> {
        self.live().map(|live| live.view.zoom.fit)
    }

    #[must_use]
    pub fn viewport(&self) -> Option<&PreviewViewport> {
        self.live().map(|live| &live.viewport)
    }

    #[must_use]
    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Natural size of page `index`
    #[must_use]
    pub fn page_size(&self, index: usize) -> Option<PageSize> {
        self.live()?.loaded.pages.get(index).map(|page| page.size())
    }

    /// The window the preview is laid out in
    pub fn resize(&mut self, width: f32, height: f32) {
        self.window = (width, height);
        self.apply(Command::Resize { width, height });
    }

    /// Zoom synchronously: scale, row offsets and renders update before
    /// this returns.
    pub fn zoom(&mut self, request: ZoomRequest) {
        self.apply(Command::Zoom(request));
    }

    /// Zoom by `steps` toolbar steps of `config.zoom_step`; negative zooms out
    pub fn zoom_steps(&mut self, steps: i32) {
        if steps != 0 {
            let delta = steps as f32 * self.config.zoom_step;
            self.zoom(ZoomRequest::Delta(delta));
        }
    }

    /// Switch the display filter. Rendered bitmaps are kept; the filter is
    /// applied in [`Self::present`].
    pub fn set_color_mode(&mut self, mode: ColorMode) {
        if self.color_mode != mode {
            debug!("Color mode now {mode:?}");
            self.color_mode = mode;
        }
    }

    /// Enable per-page checkboxes bound to `selection`
    pub fn set_selection(&mut self, selection: PageSelection) {
        self.selection = Some(selection);
    }

    /// Turn per-page checkboxes off
    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    #[must_use]
    pub fn selection(&self) -> Option<&PageSelection> {
        self.selection.as_ref()
    }

    pub fn scroll_to(&mut self, offset: f32) {
        if let Some(live) = self.live_mut() {
            live.viewport.scroll_to(offset);
        }
        self.layout();
    }

    pub fn scroll_by(&mut self, delta: f32) {
        if let Some(live) = self.live_mut() {
            live.viewport.scroll_by(delta);
        }
        self.layout();
    }

    pub fn scroll_to_page(&mut self, index: usize) {
        if let Some(live) = self.live_mut() {
            live.viewport.scroll_to_page(index);
        }
        self.layout();
    }

    /// The update produced by clicking the checkbox on row `index`.
    ///
    /// `None` when selection is off, the row is not materialised, or the
    /// range text is currently invalid.
    #[must_use]
    pub fn toggle_page(&self, index: usize) -> Option<PageToggle> {
        let selection = self.selection.as_ref()?;
        let live = self.live()?;
        live.cells
            .get(&index)?
            .toggle(selection, live.page_count())
    }

    /// Snapshot of every materialised row, top to bottom
    pub fn rows(&mut self) -> Vec<PreviewRow> {
        let selection = self.selection.clone();
        let Some(live) = self.live_mut() else {
            return Vec::new();
        };

        live.viewport
            .rows()
            .into_iter()
            .filter_map(|layout| {
                let cell = live.cells.get(&layout.index)?;
                Some(PreviewRow {
                    layout,
                    outcome: cell.outcome().clone(),
                    overlay: cell.overlay().map(|o| o.text().to_string()),
                    checkbox: selection.as_ref().map(|s| cell.checkbox(s)),
                    has_bitmap: cell.surface().is_some(),
                })
            })
            .collect()
    }

    /// Row `index` as it should be displayed, with the color filter applied
    #[must_use]
    pub fn present(&self, index: usize) -> Option<RgbaImage> {
        self.live()?.cells.get(&index)?.present(self.color_mode)
    }

    #[must_use]
    pub fn cell(&self, index: usize) -> Option<&PageCell> {
        self.live()?.cells.get(&index)
    }

    /// Apply queued toolbar requests and every worker response that is
    /// ready. Returns the number of responses handled.
    pub fn poll(&mut self) -> usize {
        let requests: Vec<_> = self.zoom_rx.try_iter().collect();
        for request in requests {
            self.zoom(request);
        }

        let responses = self.pool.poll_responses();
        let count = responses.len();
        for response in responses {
            self.handle_response(response);
        }
        count
    }

    /// Block up to `timeout` for a worker response, then drain the rest
    pub fn poll_timeout(&mut self, timeout: Duration) -> bool {
        match self.pool.recv_timeout(timeout) {
            Some(response) => {
                self.handle_response(response);
                self.poll();
                true
            }
            None => {
                self.poll();
                false
            }
        }
    }

    /// True when nothing is loading, rendering or fetching metadata
    #[must_use]
    pub fn is_idle(&self) -> bool {
        match &self.document {
            DocumentState::Loading { .. } => false,
            DocumentState::Ready(live) => {
                live.pending_metadata.is_none()
                    && live.cells.values().all(|cell| !cell.is_rendering())
            }
            DocumentState::Empty | DocumentState::Failed(_) => true,
        }
    }

    /// Poll until idle or until `timeout` passes. Returns true if idle.
    pub fn wait_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll();
            if self.is_idle() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.poll_timeout((deadline - now).min(Duration::from_millis(50)));
        }
    }

    fn handle_response(&mut self, response: RenderResponse) {
        match response {
            RenderResponse::Loaded { id, document } => self.on_loaded(id, document),

            RenderResponse::LoadFailed { id, error } => {
                if self.is_current_load(id) {
                    warn!("Document failed to load: {error}");
                    self.document = DocumentState::Failed(error);
                } else {
                    debug!("Ignoring failure of superseded load {id:?}");
                }
            }

            RenderResponse::Page { id, index, surface } => {
                let applied = self
                    .live_mut()
                    .and_then(|live| live.cells.get_mut(&index))
                    .is_some_and(|cell| cell.finish(id, surface));
                if !applied {
                    debug!("Discarding stale render {id:?} of page {index}");
                }
            }

            RenderResponse::Error { id, index, error } => {
                let applied = self
                    .live_mut()
                    .and_then(|live| live.cells.get_mut(&index))
                    .is_some_and(|cell| cell.fail(id, error.message()));
                if !applied {
                    debug!("Discarding stale render error {id:?} of page {index}");
                }
            }

            RenderResponse::Metadata { id, result } => self.on_metadata(id, result),

            RenderResponse::Cancelled(id) => {
                debug!("Request {id:?} cancelled");
            }
        }
    }

    fn on_loaded(&mut self, id: RequestId, document: LoadedDocument) {
        if !self.is_current_load(id) {
            debug!("Load {id:?} resolved after being superseded, releasing it");
            document.release();
            return;
        }

        let sizes: Vec<PageSize> = document.pages.iter().map(|page| page.size()).collect();
        let view = ViewState::fitted(
            max_page_size(&sizes),
            self.window,
            self.config.fit_margin,
            self.config.min_scale,
        );
        info!(
            "Document loaded: {} pages, fit scale {:.3}",
            sizes.len(),
            view.scale()
        );

        let mut viewport = PreviewViewport::new(
            sizes,
            view.scale(),
            self.config.page_padding,
            self.config.overscan,
        );
        viewport.set_size(self.window.0, self.window.1);

        let pending_metadata = Some(self.pool.metadata(Arc::clone(&document.document)));

        self.document = DocumentState::Ready(Box::new(LiveDocument {
            loaded: document,
            view,
            viewport,
            cells: BTreeMap::new(),
            pending_metadata,
        }));
        self.controls.bind(self.zoom_tx.clone());
        self.layout();
    }

    fn on_metadata(
        &mut self,
        id: RequestId,
        result: Result<DocumentMetadata, LoadError>,
    ) {
        let Some(live) = self.live_mut() else {
            debug!("Ignoring metadata {id:?}, no live document");
            return;
        };
        if live.pending_metadata != Some(id) {
            debug!("Ignoring metadata {id:?} of a previous document");
            return;
        }
        live.pending_metadata = None;

        match result {
            Ok(metadata) => {
                let title = metadata.title().map(str::to_string);
                debug!("Document title: {title:?}");
                self.controls.publish_title(title);
            }
            Err(e) => warn!("Reading document metadata failed: {e}"),
        }
    }

    fn apply(&mut self, cmd: Command) {
        let Some(live) = self.live_mut() else {
            return;
        };
        let effects = live.view.apply(cmd);
        self.execute_effects(effects);
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Rescale => {
                    if let Some(live) = self.live_mut() {
                        let scale = live.view.scale();
                        live.viewport.set_scale(scale);
                    }
                }

                Effect::Relayout => {
                    let (width, height) = self.window;
                    if let Some(live) = self.live_mut() {
                        live.viewport.set_size(width, height);
                    }
                    self.layout();
                }

                Effect::RestartRenders => self.restart_renders(),
            }
        }
    }

    /// Mount cells entering the render range and drop the ones leaving it
    fn layout(&mut self) {
        let pixel_ratio = self.config.pixel_ratio;
        let DocumentState::Ready(live) = &mut self.document else {
            return;
        };
        let live = &mut **live;
        let range = live.viewport.render_range();
        let scale = live.view.scale();

        live.cells.retain(|index, _| range.contains(index));
        for index in range {
            let page = &live.loaded.pages[index];
            match live.cells.get_mut(&index) {
                Some(cell) => {
                    cell.update(&mut self.pool, page, scale, pixel_ratio);
                }
                None => {
                    let cell =
                        PageCell::mount(&mut self.pool, index, Arc::clone(page), scale, pixel_ratio);
                    live.cells.insert(index, cell);
                }
            }
        }
    }

    fn restart_renders(&mut self) {
        let pixel_ratio = self.config.pixel_ratio;
        let DocumentState::Ready(live) = &mut self.document else {
            return;
        };
        let live = &mut **live;
        let scale = live.view.scale();
        for (index, cell) in &mut live.cells {
            cell.update(&mut self.pool, &live.loaded.pages[*index], scale, pixel_ratio);
        }
    }

    fn is_current_load(&self, id: RequestId) -> bool {
        matches!(&self.document, DocumentState::Loading { id: current, .. } if *current == id)
    }

    fn live(&self) -> Option<&LiveDocument> {
        match &self.document {
            DocumentState::Ready(live) => Some(&**live),
            _ => None,
        }
    }

    fn live_mut(&mut self) -> Option<&mut LiveDocument> {
        match &mut self.document {
            DocumentState::Ready(live) => Some(&mut **live),
            _ => None,
        }
    }
}

impl Drop for PreviewController {
    fn drop(&mut self) {
        self.release();
        // A load can resolve between the drain above and worker shutdown
        self.pool.shutdown_and_join();
        self.drain_stale_responses();
    }
}
