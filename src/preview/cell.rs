//! One materialised row of the preview
//!
//! A cell borrows its page handle from the controller, owns the render task
//! for its current (page, scale) epoch and keeps the last finished bitmap so
//! the row never collapses while a new render is pending.

use std::sync::Arc;

use image::{DynamicImage, RgbaImage};

use super::engine::{PageSize, PageSource, RenderTarget, Surface};
use super::request::RequestId;
use super::service::RenderPool;
use super::task::{PageRenderTask, RenderHandle};
use crate::page_selection::PageSelection;
use crate::print_job::ColorMode;

/// Result of the render for the current epoch
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    Pending,
    Finished,
    Error(String),
}

/// Message drawn above the page bitmap
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusOverlay<'a> {
    Loading,
    Error(&'a str),
}

impl StatusOverlay<'_> {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Loading => "Loading",
            Self::Error(message) => message,
        }
    }
}

/// Selection checkbox state for a row
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageCheckbox {
    /// 1-based page number
    pub page: u32,
    pub checked: bool,
    pub enabled: bool,
}

/// Per-page update the host applies to its selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageToggle {
    pub page: u32,
    pub included: bool,
    pub total_pages: usize,
}

pub struct PageCell {
    index: usize,
    page: Arc<dyn PageSource>,
    scale: f32,
    target: RenderTarget,
    epoch: RequestId,
    task: Option<RenderHandle>,
    outcome: RenderOutcome,
    surface: Option<Surface>,
}

impl PageCell {
    /// Create the cell and start its first render
    pub fn mount(
        pool: &mut RenderPool,
        index: usize,
        page: Arc<dyn PageSource>,
        scale: f32,
        pixel_ratio: f32,
    ) -> Self {
        let task = PageRenderTask::start(pool, index, Arc::clone(&page), scale, pixel_ratio);
        Self {
            index,
            page,
            scale,
            target: *task.target(),
            epoch: task.id(),
            task: Some(task),
            outcome: RenderOutcome::Pending,
            surface: None,
        }
    }

    /// Restart the render if the page or scale changed.
    ///
    /// Returns true when a new epoch began.
    pub fn update(
        &mut self,
        pool: &mut RenderPool,
        page: &Arc<dyn PageSource>,
        scale: f32,
        pixel_ratio: f32,
    ) -> bool {
        let same_page = Arc::ptr_eq(&self.page, page);
        if same_page && self.scale == scale {
            return false;
        }

        self.cancel();
        if !same_page {
            // The old bitmap belongs to another page
            self.surface = None;
        }
        self.page = Arc::clone(page);
        self.scale = scale;

        let task = PageRenderTask::start(pool, self.index, Arc::clone(page), scale, pixel_ratio);
        self.target = *task.target();
        self.epoch = task.id();
        self.task = Some(task);
        self.outcome = RenderOutcome::Pending;
        true
    }

    /// Cancel the in-flight render, if any
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel();
        }
    }

    /// Whether `id` is this cell's current epoch
    #[must_use]
    pub fn owns(&self, id: RequestId) -> bool {
        self.epoch == id
    }

    /// Apply a finished render. Results from older epochs are ignored.
    pub fn finish(&mut self, id: RequestId, surface: Surface) -> bool {
        if !self.owns(id) || self.task.is_none() {
            return false;
        }
        self.task = None;
        self.surface = Some(surface);
        self.outcome = RenderOutcome::Finished;
        true
    }

    /// Apply a failed render. Results from older epochs are ignored.
    pub fn fail(&mut self, id: RequestId, message: String) -> bool {
        if !self.owns(id) || self.task.is_none() {
            return false;
        }
        self.task = None;
        self.outcome = RenderOutcome::Error(message);
        true
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    #[must_use]
    pub fn outcome(&self) -> &RenderOutcome {
        &self.outcome
    }

    /// Logical size of the page at the cell's scale
    #[must_use]
    pub fn css_size(&self) -> PageSize {
        PageSize::new(self.target.css_width, self.target.css_height)
    }

    #[must_use]
    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    /// Last finished bitmap; may be from the previous scale while pending
    #[must_use]
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.task.is_some()
    }

    /// Overlay shown whenever the current epoch has not finished
    #[must_use]
    pub fn overlay(&self) -> Option<StatusOverlay<'_>> {
        match &self.outcome {
            RenderOutcome::Finished => None,
            RenderOutcome::Pending => Some(StatusOverlay::Loading),
            RenderOutcome::Error(message) => Some(StatusOverlay::Error(message)),
        }
    }

    /// Bitmap with the display filter for `color_mode` applied
    #[must_use]
    pub fn present(&self, color_mode: ColorMode) -> Option<RgbaImage> {
        let image = self.surface.as_ref()?.image();
        Some(match color_mode {
            ColorMode::Color => image.clone(),
            ColorMode::Grayscale => DynamicImage::ImageRgba8(image.clone())
                .grayscale()
                .into_rgba8(),
        })
    }

    /// Checkbox bound to the valid selection, disabled while the text is invalid
    #[must_use]
    pub fn checkbox(&self, selection: &PageSelection) -> PageCheckbox {
        let page = self.page_number();
        PageCheckbox {
            page,
            checked: selection.includes(page),
            enabled: !selection.is_invalid(),
        }
    }

    /// The update a click on the checkbox produces, or `None` while disabled
    #[must_use]
    pub fn toggle(&self, selection: &PageSelection, total_pages: usize) -> Option<PageToggle> {
        let checkbox = self.checkbox(selection);
        checkbox.enabled.then_some(PageToggle {
            page: checkbox.page,
            included: !checkbox.checked,
            total_pages,
        })
    }

    fn page_number(&self) -> u32 {
        u32::try_from(self.index + 1).unwrap_or(u32::MAX)
    }
}

impl Drop for PageCell {
    fn drop(&mut self) {
        self.cancel();
    }
}
