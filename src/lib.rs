// Export modules for use in tests
pub mod page_selection;
pub mod panic_handler;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod preview;
pub mod print_job;
pub mod range_set;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use page_selection::PageSelection;
pub use preview::{DocumentStatus, PreviewConfig, PreviewController, ZoomControls};
pub use print_job::{ColorMode, PrintOptions, Sides};
pub use range_set::{PageRange, RangeSyntaxError};
