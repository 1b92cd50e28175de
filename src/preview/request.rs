//! Worker request and response types

use std::sync::Arc;

use super::cancel::CancellationToken;
use super::engine::{DocumentMetadata, DocumentSource, PageSource, RenderTarget, Surface};

/// Message shown for a render failure that carries no text
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Unique identifier for worker requests.
///
/// Ids are never reused, so an id doubles as the epoch of whatever issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Errors from rasterising a single page
#[derive(Debug, thiserror::Error)]
pub enum RenderFault {
    #[error("{detail}")]
    Engine { detail: String },

    #[error("{detail}")]
    Generic { detail: String },
}

impl RenderFault {
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine { detail: msg.into() }
    }

    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }

    /// Human-readable text for the row overlay
    #[must_use]
    pub fn message(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            text
        }
    }
}

/// Errors that make a whole document unusable
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not load document: {detail}")]
    Engine { detail: String },

    #[error("could not load page {}: {detail}", .index + 1)]
    Page { index: usize, detail: String },

    #[error("document has no pages")]
    Empty,
}

impl LoadError {
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine { detail: msg.into() }
    }
}

/// Request sent to workers
pub enum RenderRequest {
    /// Decode a blob and fetch every page handle
    Load {
        id: RequestId,
        blob: Arc<[u8]>,
        cancel: CancellationToken,
    },

    /// Rasterise one page
    Page {
        id: RequestId,
        index: usize,
        page: Arc<dyn PageSource>,
        target: RenderTarget,
        cancel: CancellationToken,
    },

    /// Read the document information dictionary
    Metadata {
        id: RequestId,
        document: Arc<dyn DocumentSource>,
    },

    /// Stop the worker
    Shutdown,
}

/// A document with all of its page handles
#[derive(Clone)]
pub struct LoadedDocument {
    pub document: Arc<dyn DocumentSource>,
    pub pages: Vec<Arc<dyn PageSource>>,
}

impl LoadedDocument {
    /// Clean up every page, then destroy the document
    pub fn release(&self) {
        for page in &self.pages {
            page.cleanup();
        }
        self.document.destroy();
    }
}

/// Response from workers
pub enum RenderResponse {
    Loaded {
        id: RequestId,
        document: LoadedDocument,
    },

    LoadFailed {
        id: RequestId,
        error: LoadError,
    },

    Page {
        id: RequestId,
        index: usize,
        surface: Surface,
    },

    Error {
        id: RequestId,
        index: usize,
        error: RenderFault,
    },

    Metadata {
        id: RequestId,
        result: Result<DocumentMetadata, LoadError>,
    },

    /// Request was cancelled before it produced a result
    Cancelled(RequestId),
}

impl RenderResponse {
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            Self::Loaded { id, .. }
            | Self::LoadFailed { id, .. }
            | Self::Page { id, .. }
            | Self::Error { id, .. }
            | Self::Metadata { id, .. }
            | Self::Cancelled(id) => *id,
        }
    }
}

impl std::fmt::Debug for RenderResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded { id, document } => f
                .debug_struct("Loaded")
                .field("id", id)
                .field("pages", &document.pages.len())
                .finish(),
            Self::LoadFailed { id, error } => f
                .debug_struct("LoadFailed")
                .field("id", id)
                .field("error", error)
                .finish(),
            Self::Page { id, index, surface } => f
                .debug_struct("Page")
                .field("id", id)
                .field("index", index)
                .field("surface", surface)
                .finish(),
            Self::Error { id, index, error } => f
                .debug_struct("Error")
                .field("id", id)
                .field("index", index)
                .field("error", error)
                .finish(),
            Self::Metadata { id, result } => f
                .debug_struct("Metadata")
                .field("id", id)
                .field("result", result)
                .finish(),
            Self::Cancelled(id) => f.debug_tuple("Cancelled").field(id).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fault_falls_back_to_generic_message() {
        assert_eq!(RenderFault::generic("").message(), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(RenderFault::engine("bad xref").message(), "bad xref");
    }

    #[test]
    fn load_error_reports_one_based_page() {
        let error = LoadError::Page {
            index: 2,
            detail: "truncated".into(),
        };
        assert_eq!(error.to_string(), "could not load page 3: truncated");
    }
}
