//! MuPDF documents are not `Send`, so every worker thread opens its own copy
//! of a blob on first use and keeps it until the document is destroyed and
//! that worker next touches a document.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use image::Rgba;
use log::{debug, warn};
use mupdf::{Colorspace, Document, Matrix, MetadataName, Pixmap};

use crate::preview::{
    CancellationToken, DocumentEngine, DocumentMetadata, DocumentSource, LoadError, PageSize,
    PageSource, RenderFault, RenderTarget, Surface,
};

const PDF_MAGIC: &str = "application/pdf";

struct OpenDocument {
    owner: Weak<SharedBlob>,
    doc: Document,
}

thread_local! {
    static OPEN_DOCUMENTS: RefCell<HashMap<u64, OpenDocument>> = RefCell::new(HashMap::new());
}

struct SharedBlob {
    id: u64,
    bytes: Arc<[u8]>,
    destroyed: AtomicBool,
}

/// Run `f` against this thread's copy of `blob`, opening it if needed
fn with_document<R>(
    blob: &Arc<SharedBlob>,
    f: impl FnOnce(&Document) -> Result<R, mupdf::Error>,
) -> Result<R, String> {
    if blob.destroyed.load(Ordering::Acquire) {
        return Err("document was closed".to_string());
    }

    OPEN_DOCUMENTS.with(|open| {
        let mut open = open.borrow_mut();
        open.retain(|_, entry| {
            entry
                .owner
                .upgrade()
                .is_some_and(|owner| !owner.destroyed.load(Ordering::Acquire))
        });

        if !open.contains_key(&blob.id) {
            let doc = Document::from_bytes(&blob.bytes, PDF_MAGIC).map_err(|e| e.to_string())?;
            open.insert(
                blob.id,
                OpenDocument {
                    owner: Arc::downgrade(blob),
                    doc,
                },
            );
        }

        match open.get(&blob.id) {
            Some(entry) => f(&entry.doc).map_err(|e| e.to_string()),
            None => Err("document is not open".to_string()),
        }
    })
}

#[derive(Default)]
pub struct MupdfEngine {
    next_id: AtomicU64,
}

impl MupdfEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentEngine for MupdfEngine {
    fn load(
        &self,
        blob: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Arc<dyn DocumentSource>, LoadError> {
        let shared = Arc::new(SharedBlob {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            bytes: Arc::from(blob),
            destroyed: AtomicBool::new(false),
        });

        if cancel.is_cancelled() {
            return Err(LoadError::engine("load cancelled"));
        }
        let page_count = with_document(&shared, Document::page_count).map_err(LoadError::engine)?;
        debug!("Opened PDF with {page_count} pages");

        Ok(Arc::new(MupdfDocument {
            blob: shared,
            page_count: usize::try_from(page_count).unwrap_or(0),
        }))
    }
}

struct MupdfDocument {
    blob: Arc<SharedBlob>,
    page_count: usize,
}

impl DocumentSource for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page(&self, index: usize) -> Result<Arc<dyn PageSource>, LoadError> {
        let page_index = i32::try_from(index).map_err(|e| LoadError::Page {
            index,
            detail: e.to_string(),
        })?;
        let bounds = with_document(&self.blob, |doc| doc.load_page(page_index)?.bounds())
            .map_err(|detail| LoadError::Page { index, detail })?;

        Ok(Arc::new(MupdfPage {
            blob: Arc::clone(&self.blob),
            index: page_index,
            size: PageSize::new(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0),
        }))
    }

    fn metadata(&self) -> Result<DocumentMetadata, LoadError> {
        let title = with_document(&self.blob, |doc| doc.metadata(MetadataName::Title))
            .map_err(LoadError::engine)?;

        let mut metadata = DocumentMetadata::default();
        metadata
            .entries
            .insert(DocumentMetadata::TITLE.to_string(), title);
        Ok(metadata)
    }

    fn destroy(&self) {
        // Only this thread's copy is closed here. Other workers close theirs
        // on their next `with_document` call, which purges destroyed entries.
        self.blob.destroyed.store(true, Ordering::Release);
        OPEN_DOCUMENTS.with(|open| {
            open.borrow_mut().remove(&self.blob.id);
        });
    }
}

struct MupdfPage {
    blob: Arc<SharedBlob>,
    index: i32,
    size: PageSize,
}

impl PageSource for MupdfPage {
    fn size(&self) -> PageSize {
        self.size
    }

    fn render(
        &self,
        surface: &mut Surface,
        target: &RenderTarget,
        cancel: &CancellationToken,
    ) -> Result<(), RenderFault> {
        let scale = target.device_scale();
        let pixmap = with_document(&self.blob, |doc| {
            let page = doc.load_page(self.index)?;
            page.to_pixmap(
                &Matrix::new_scale(scale, scale),
                &Colorspace::device_rgb(),
                false,
                false,
            )
        })
        .map_err(RenderFault::engine)?;

        if cancel.is_cancelled() {
            return Ok(());
        }
        copy_pixmap(&pixmap, surface)
    }

    fn cleanup(&self) {
        // Pages are reloaded per render; nothing is cached per page
    }
}

fn copy_pixmap(pixmap: &Pixmap, surface: &mut Surface) -> Result<(), RenderFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(RenderFault::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    if samples.len() < stride.saturating_mul(height) || width * n > stride {
        return Err(RenderFault::generic("Pixmap buffer size mismatch"));
    }

    let image = surface.image_mut();
    if image.width() as usize != width || image.height() as usize != height {
        warn!(
            "Pixmap is {width}x{height}, surface is {}x{}",
            image.width(),
            image.height()
        );
    }

    let copy_width = width.min(image.width() as usize);
    let copy_height = height.min(image.height() as usize);
    for y in 0..copy_height {
        let row = &samples[y * stride..y * stride + width * n];
        for (x, px) in row.chunks_exact(n).take(copy_width).enumerate() {
            image.put_pixel(x as u32, y as u32, Rgba([px[0], px[1], px[2], 255]));
        }
    }
    Ok(())
}
