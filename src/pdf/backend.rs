//! Capabilities the core consumes but does not implement: document parsing
//! and rasterization, drawing primitives, and the clipboard.

use std::path::Path;
use std::sync::Arc;

use super::error::DocumentError;
use super::types::{PageRect, RawBitmap, ScreenRect};

/// An opened document. Shared by the UI thread and every rasterizer thread.
pub trait DocumentSource: Send + Sync {
    fn page_count(&self) -> usize;

    /// Rasterize `page` at `dpi` dots per inch
    fn rasterize(&self, page: usize, dpi: f32) -> Result<RawBitmap, DocumentError>;

    /// Text inside `region`, given in document units (72 per inch)
    fn extract_text(&self, page: usize, region: PageRect) -> Result<String, DocumentError>;
}

/// Opens documents. Structural problems must be reported here, before any
/// page store is allocated.
pub trait DocumentBackend {
    fn open(&self, path: &Path) -> Result<Arc<dyn DocumentSource>, DocumentError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const PAGE: Rgb = Rgb(0xFF, 0xFF, 0xFF);
    pub const BACKGROUND: Rgb = Rgb(0x6E, 0x6E, 0x6E);
    pub const PLACEHOLDER: Rgb = Rgb(0xE4, 0xE4, 0xE4);
}

/// Drawing surface owned by the UI toolkit
pub trait Canvas {
    /// Renderer-side resource built from raw pixels (e.g. an uploaded texture)
    type Image;

    /// Build an image from packed RGB pixels
    fn upload_image(&mut self, pixels: &[u8], width: u32, height: u32) -> Self::Image;

    fn fill_rect(&mut self, rect: ScreenRect, color: Rgb);

    fn draw_image(&mut self, image: &Self::Image, rect: ScreenRect);
}

#[derive(Debug, thiserror::Error)]
#[error("clipboard: {0}")]
pub struct ClipboardError(pub String);

pub trait Clipboard {
    fn set_text(&mut self, text: String) -> Result<(), ClipboardError>;
}
