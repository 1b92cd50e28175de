//! Document engine boundary
//!
//! Decoding and rasterisation live behind these traits. The preview only
//! needs a page count, each page's natural size, a render primitive and the
//! release calls; everything else about the format stays in the engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use image::{Rgba, RgbaImage};

use super::cancel::CancellationToken;
use super::request::{LoadError, RenderFault};

/// Width and height in CSS-like logical units
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn scaled(self, scale: f32) -> Self {
        Self::new(self.width * scale, self.height * scale)
    }
}

/// Document information dictionary
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub entries: BTreeMap<String, String>,
}

impl DocumentMetadata {
    pub const TITLE: &'static str = "Title";

    /// Non-empty title, if the document declares one
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.entries
            .get(Self::TITLE)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
    }
}

/// Affine transform `[a, b, c, d, e, f]` applied on top of the page scale
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform(pub [f32; 6]);

impl Transform {
    /// Uniform device-pixel scaling, or `None` on a 1:1 display
    #[must_use]
    pub fn for_pixel_ratio(ratio: f32) -> Option<Self> {
        if (ratio - 1.0).abs() <= f32::EPSILON {
            None
        } else {
            Some(Self([ratio, 0.0, 0.0, ratio, 0.0, 0.0]))
        }
    }

    #[must_use]
    pub fn scale_x(&self) -> f32 {
        self.0[0]
    }

    #[must_use]
    pub fn scale_y(&self) -> f32 {
        self.0[3]
    }
}

/// Geometry of one render: logical size, backing pixel size and transform.
///
/// The backing surface is larger than the logical size by the display's pixel
/// ratio so pages stay sharp on high-density screens.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderTarget {
    pub scale: f32,
    pub css_width: f32,
    pub css_height: f32,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub transform: Option<Transform>,
}

impl RenderTarget {
    #[must_use]
    pub fn new(natural: PageSize, scale: f32, pixel_ratio: f32) -> Self {
        let ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };
        let css = natural.scaled(scale);
        Self {
            scale,
            css_width: css.width,
            css_height: css.height,
            pixel_width: (css.width * ratio).ceil().max(1.0) as u32,
            pixel_height: (css.height * ratio).ceil().max(1.0) as u32,
            transform: Transform::for_pixel_ratio(ratio),
        }
    }

    /// Total scale from page units to backing pixels
    #[must_use]
    pub fn device_scale(&self) -> f32 {
        self.scale * self.transform.map_or(1.0, |t| t.scale_x())
    }
}

/// Bitmap a page is rasterised into
#[derive(Clone)]
pub struct Surface {
    image: RgbaImage,
}

impl Surface {
    /// A white surface of the given pixel size
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width.max(1), height.max(1), Rgba([255, 255, 255, 255])),
        }
    }

    #[must_use]
    pub fn for_target(target: &RenderTarget) -> Self {
        Self::blank(target.pixel_width, target.pixel_height)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

/// One page of a loaded document
pub trait PageSource: Send + Sync {
    /// Natural size at scale 1.0
    fn size(&self) -> PageSize;

    /// Size at the given scale
    fn viewport(&self, scale: f32) -> PageSize {
        self.size().scaled(scale)
    }

    /// Rasterise the page onto `surface`.
    ///
    /// Implementations may return early once `cancel` is set; the result of a
    /// cancelled render is discarded either way.
    fn render(
        &self,
        surface: &mut Surface,
        target: &RenderTarget,
        cancel: &CancellationToken,
    ) -> Result<(), RenderFault>;

    /// Free cached decode state
    fn cleanup(&self);
}

/// A loaded document
pub trait DocumentSource: Send + Sync {
    fn page_count(&self) -> usize;

    /// Fetch the handle for page `index` (0-based)
    fn page(&self, index: usize) -> Result<Arc<dyn PageSource>, LoadError>;

    fn metadata(&self) -> Result<DocumentMetadata, LoadError>;

    /// Release engine resources. Pages are cleaned up before this is called.
    fn destroy(&self);
}

/// Turns a byte blob into a document
pub trait DocumentEngine: Send + Sync {
    fn load(
        &self,
        blob: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Arc<dyn DocumentSource>, LoadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_target_scales_backing_store_by_pixel_ratio() {
        let target = RenderTarget::new(PageSize::new(100.0, 200.0), 1.5, 2.0);
        assert_eq!(target.css_width, 150.0);
        assert_eq!(target.css_height, 300.0);
        assert_eq!(target.pixel_width, 300);
        assert_eq!(target.pixel_height, 600);
        assert_eq!(target.transform, Some(Transform([2.0, 0.0, 0.0, 2.0, 0.0, 0.0])));
        assert_eq!(target.device_scale(), 3.0);
    }

    #[test]
    fn unit_pixel_ratio_has_no_transform() {
        let target = RenderTarget::new(PageSize::new(10.0, 10.0), 1.0, 1.0);
        assert_eq!(target.transform, None);
        assert_eq!((target.pixel_width, target.pixel_height), (10, 10));

        let target = RenderTarget::new(PageSize::new(10.0, 10.0), 1.0, f32::NAN);
        assert_eq!(target.transform, None);
    }

    #[test]
    fn metadata_title_ignores_blank_values() {
        let mut metadata = DocumentMetadata::default();
        assert_eq!(metadata.title(), None);

        metadata
            .entries
            .insert(DocumentMetadata::TITLE.to_string(), "  ".to_string());
        assert_eq!(metadata.title(), None);

        metadata
            .entries
            .insert(DocumentMetadata::TITLE.to_string(), "Quarterly".to_string());
        assert_eq!(metadata.title(), Some("Quarterly"));
    }
}
