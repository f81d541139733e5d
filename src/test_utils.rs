//! In-memory collaborators for unit and integration tests: a synthetic
//! document, a backend serving such documents, a canvas that records every
//! call, and a clipboard that keeps what was copied.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::pdf::{
    Canvas, Clipboard, ClipboardError, DocumentBackend, DocumentError, DocumentErrorCode,
    DocumentSource, PageRect, RawBitmap, Rgb, ScreenRect,
};

/// Synthetic document: every page is white with a dark ink box inset by a
/// fixed amount from each edge.
pub struct FakeDocument {
    /// Page sizes in document units (72 per inch)
    sizes: Vec<(f32, f32)>,
    /// Distance from each page edge to the ink box, in document units
    ink_inset: f32,
    failing: Vec<usize>,
    panicking: Vec<usize>,
    delay: Option<Duration>,
    rasterize_calls: AtomicUsize,
    extractions: Mutex<Vec<(usize, PageRect)>>,
}

impl FakeDocument {
    #[must_use]
    pub fn uniform(pages: usize, width: f32, height: f32) -> Self {
        Self::with_pages(vec![(width, height); pages])
    }

    #[must_use]
    pub fn with_pages(sizes: Vec<(f32, f32)>) -> Self {
        Self {
            sizes,
            ink_inset: 0.0,
            failing: Vec::new(),
            panicking: Vec::new(),
            delay: None,
            rasterize_calls: AtomicUsize::new(0),
            extractions: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_ink_inset(mut self, inset: f32) -> Self {
        self.ink_inset = inset;
        self
    }

    /// Rasterizing `page` reports a render error
    #[must_use]
    pub fn failing_on(mut self, page: usize) -> Self {
        self.failing.push(page);
        self
    }

    /// Rasterizing `page` panics inside the backend
    #[must_use]
    pub fn panicking_on(mut self, page: usize) -> Self {
        self.panicking.push(page);
        self
    }

    /// Sleep this long inside every rasterization
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn rasterize_calls(&self) -> usize {
        self.rasterize_calls.load(Ordering::SeqCst)
    }

    /// Every `extract_text` call so far
    #[must_use]
    pub fn extractions(&self) -> Vec<(usize, PageRect)> {
        self.extractions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The text `extract_text` returns for a region
    #[must_use]
    pub fn text_for(page: usize, region: PageRect) -> String {
        format!(
            "p{page}:{:.1},{:.1},{:.1},{:.1}",
            region.x0, region.y0, region.x1, region.y1
        )
    }

    fn ink_shade(page: usize) -> u8 {
        (page * 7 % 200) as u8
    }
}

impl DocumentSource for FakeDocument {
    fn page_count(&self) -> usize {
        self.sizes.len()
    }

    fn rasterize(&self, page: usize, dpi: f32) -> Result<RawBitmap, DocumentError> {
        self.rasterize_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.panicking.contains(&page) {
            panic!("backend crashed on page {page}");
        }
        if self.failing.contains(&page) {
            return Err(DocumentError::render(format!("page {page} is damaged")));
        }
        let &(width_pt, height_pt) = self
            .sizes
            .get(page)
            .ok_or_else(|| DocumentError::invalid(format!("no page {page}")))?;

        let scale = dpi / 72.0;
        let width = (width_pt * scale).round() as u32;
        let height = (height_pt * scale).round() as u32;
        let inset = (self.ink_inset * scale).round() as u32;
        let shade = Self::ink_shade(page);

        let stride = width as usize * 3;
        let mut pixels = vec![0xFF; stride * height as usize];
        for y in inset..height.saturating_sub(inset) {
            for x in inset..width.saturating_sub(inset) {
                let at = y as usize * stride + x as usize * 3;
                pixels[at..at + 3].copy_from_slice(&[shade, shade, shade]);
            }
        }

        Ok(RawBitmap {
            pixels,
            width,
            height,
            stride,
            channels: 3,
        })
    }

    fn extract_text(&self, page: usize, region: PageRect) -> Result<String, DocumentError> {
        self.extractions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((page, region));
        Ok(Self::text_for(page, region))
    }
}

/// Serves registered fake documents by path
#[derive(Default)]
pub struct FakeBackend {
    documents: HashMap<PathBuf, Arc<FakeDocument>>,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, document: Arc<FakeDocument>) {
        self.documents.insert(path.into(), document);
    }
}

impl DocumentBackend for FakeBackend {
    fn open(&self, path: &Path) -> Result<Arc<dyn DocumentSource>, DocumentError> {
        match self.documents.get(path) {
            Some(doc) => Ok(Arc::clone(doc) as Arc<dyn DocumentSource>),
            None => Err(DocumentError::new(
                DocumentErrorCode::BadCatalog,
                format!("cannot parse {}", path.display()),
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Upload {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Canvas whose images are upload indices
#[derive(Default)]
pub struct RecordingCanvas {
    pub uploads: Vec<Upload>,
    pub fills: Vec<(ScreenRect, Rgb)>,
    pub draws: Vec<(usize, ScreenRect)>,
}

impl RecordingCanvas {
    /// Forget fills and draws, keep uploads
    pub fn clear_frame(&mut self) {
        self.fills.clear();
        self.draws.clear();
    }
}

impl Canvas for RecordingCanvas {
    type Image = usize;

    fn upload_image(&mut self, pixels: &[u8], width: u32, height: u32) -> usize {
        self.uploads.push(Upload {
            pixels: pixels.to_vec(),
            width,
            height,
        });
        self.uploads.len() - 1
    }

    fn fill_rect(&mut self, rect: ScreenRect, color: Rgb) {
        self.fills.push((rect, color));
    }

    fn draw_image(&mut self, image: &usize, rect: ScreenRect) {
        self.draws.push((*image, rect));
    }
}

/// Clipboard whose contents stay readable after it is boxed into a viewer
#[derive(Clone, Default)]
pub struct MemoryClipboard {
    texts: Arc<Mutex<Vec<String>>>,
}

impl MemoryClipboard {
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.texts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn set_text(&mut self, text: String) -> Result<(), ClipboardError> {
        self.texts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text);
        Ok(())
    }
}

/// Clipboard that is never available
pub struct BrokenClipboard;

impl Clipboard for BrokenClipboard {
    fn set_text(&mut self, _text: String) -> Result<(), ClipboardError> {
        Err(ClipboardError("clipboard unavailable".into()))
    }
}
