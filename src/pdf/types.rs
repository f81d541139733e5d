//! Core types shared by the page store, cache and layout engine

use serde::{Deserialize, Serialize};

/// Pixels trimmed from each edge of a raw raster
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Margins {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl Margins {
    /// True when any edge carries more whitespace than `threshold`
    #[must_use]
    pub fn exceed(&self, threshold: u32) -> bool {
        self.left > threshold
            || self.right > threshold
            || self.top > threshold
            || self.bottom > threshold
    }
}

/// Trimmed page dimensions plus the margins that were removed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageGeometry {
    /// Trimmed width in raster pixels
    pub width: u32,
    /// Trimmed height in raster pixels
    pub height: u32,
    pub margins: Margins,
}

impl PageGeometry {
    /// Width of the raster before trimming
    #[must_use]
    pub fn full_width(&self) -> u32 {
        self.width + self.margins.left + self.margins.right
    }

    /// Height of the raster before trimming
    #[must_use]
    pub fn full_height(&self) -> u32 {
        self.height + self.margins.top + self.margins.bottom
    }
}

/// Bitmap handed back by the document backend.
///
/// Rows may be padded: `stride` is the byte distance between row starts and
/// `channels` is 3 (RGB) or 4 (RGBA).
#[derive(Clone)]
pub struct RawBitmap {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub channels: u8,
}

impl std::fmt::Debug for RawBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawBitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

/// Rectangle in screen pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a normalized rectangle from two corners in any order
    #[must_use]
    pub fn from_corners(a: (f32, f32), b: (f32, f32)) -> Self {
        let x0 = a.0.min(b.0);
        let y0 = a.1.min(b.1);
        Self::new(x0, y0, (a.0 - b.0).abs(), (a.1 - b.1).abs())
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Intersection of two rectangles, `None` if they do not overlap
    #[must_use]
    pub fn intersect(&self, other: &ScreenRect) -> Option<ScreenRect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            None
        } else {
            Some(ScreenRect::new(x0, y0, x1 - x0, y1 - y0))
        }
    }

    /// Shrink every edge by the given amounts, never below zero size
    #[must_use]
    pub fn inset(&self, left: f32, top: f32, right: f32, bottom: f32) -> ScreenRect {
        let width = (self.width - left - right).max(0.0);
        let height = (self.height - top - bottom).max(0.0);
        ScreenRect::new(self.x + left, self.y + top, width, height)
    }
}

/// Rectangle in document units (72 per inch), origin at the page's top-left
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PageRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

/// Policy deciding how the layout derives its zoom factor
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomMode {
    /// Fit trimmed row width to the viewport
    #[default]
    Trim,
    /// Fit untrimmed row width to the viewport
    Width,
    /// Fit the whole untrimmed row
    Page,
    /// Fit the whole trimmed row
    PageTrim,
    /// User-set zoom, never recomputed by layout
    Custom,
}

impl ZoomMode {
    /// Modes that lay pages out with their whitespace removed
    #[must_use]
    pub fn trims(self) -> bool {
        matches!(self, Self::Trim | Self::PageTrim)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoomMode::Trim => "Trim",
            ZoomMode::Width => "Width",
            ZoomMode::Page => "Page",
            ZoomMode::PageTrim => "PageTrim",
            ZoomMode::Custom => "Custom",
        }
    }
}

impl std::str::FromStr for ZoomMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trim" => Ok(Self::Trim),
            "width" => Ok(Self::Width),
            "page" => Ok(Self::Page),
            "page_trim" | "pagetrim" => Ok(Self::PageTrim),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown zoom mode: {other}")),
        }
    }
}
