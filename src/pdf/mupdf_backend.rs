//! MuPDF implementation of the document capabilities.
//!
//! A MuPDF `Document` must stay on the thread that opened it, so every
//! thread (the UI thread and each rasterizer) keeps its own handle to the
//! file, opened on first use.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use mupdf::text_page::TextBlockType;
use mupdf::{Colorspace, Document, Matrix, TextPageFlags};

use super::backend::{DocumentBackend, DocumentSource};
use super::error::{DocumentError, DocumentErrorCode};
use super::types::{PageRect, RawBitmap};

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static OPEN_DOCUMENT: RefCell<Option<(u64, Document)>> = const { RefCell::new(None) };
}

fn open_document(path: &Path) -> Result<Document, DocumentError> {
    let doc = Document::open(path.to_string_lossy().as_ref()).map_err(|e| {
        DocumentError::new(
            DocumentErrorCode::BadCatalog,
            format!("{}: {e}", path.display()),
        )
    })?;

    if doc.needs_password().unwrap_or(false) {
        return Err(DocumentError::new(
            DocumentErrorCode::PermissionDenied,
            format!("{} is password protected", path.display()),
        ));
    }
    Ok(doc)
}

pub struct MupdfBackend;

impl DocumentBackend for MupdfBackend {
    fn open(&self, path: &Path) -> Result<Arc<dyn DocumentSource>, DocumentError> {
        if !path.is_file() {
            return Err(DocumentError::new(
                DocumentErrorCode::Io,
                format!("{} is not a readable file", path.display()),
            ));
        }

        let doc = open_document(path)?;
        let page_count = doc.page_count().map_err(|e| {
            DocumentError::new(DocumentErrorCode::DamagedContent, e.to_string())
        })?;
        let page_count = usize::try_from(page_count).unwrap_or(0);

        let id = NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed);
        OPEN_DOCUMENT.with(|slot| *slot.borrow_mut() = Some((id, doc)));
        debug!("Opened {} with {page_count} pages", path.display());

        Ok(Arc::new(MupdfSource {
            id,
            path: path.to_path_buf(),
            page_count,
        }))
    }
}

pub struct MupdfSource {
    id: u64,
    path: PathBuf,
    page_count: usize,
}

impl MupdfSource {
    /// Run `f` with this thread's handle to the document
    fn with_document<T>(
        &self,
        f: impl FnOnce(&Document) -> Result<T, DocumentError>,
    ) -> Result<T, DocumentError> {
        OPEN_DOCUMENT.with(|slot| {
            let mut slot = slot.borrow_mut();
            let stale = slot.as_ref().is_none_or(|(id, _)| *id != self.id);
            if stale {
                *slot = Some((self.id, open_document(&self.path)?));
            }
            match slot.as_ref() {
                Some((_, doc)) => f(doc),
                None => Err(DocumentError::invalid("document handle missing")),
            }
        })
    }
}

fn page_index(page: usize) -> Result<i32, DocumentError> {
    i32::try_from(page).map_err(|_| DocumentError::invalid(format!("page {page} out of range")))
}

impl DocumentSource for MupdfSource {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn rasterize(&self, page: usize, dpi: f32) -> Result<RawBitmap, DocumentError> {
        self.with_document(|doc| {
            let loaded = doc
                .load_page(page_index(page)?)
                .map_err(|e| DocumentError::new(DocumentErrorCode::DamagedContent, e.to_string()))?;

            let scale = dpi / 72.0;
            let pixmap = loaded
                .to_pixmap(&Matrix::new_scale(scale, scale), &Colorspace::device_rgb(), false, false)
                .map_err(|e| DocumentError::render(e.to_string()))?;

            Ok(RawBitmap {
                pixels: pixmap.samples().to_vec(),
                width: pixmap.width(),
                height: pixmap.height(),
                stride: pixmap.stride() as usize,
                channels: pixmap.n() as u8,
            })
        })
    }

    fn extract_text(&self, page: usize, region: PageRect) -> Result<String, DocumentError> {
        self.with_document(|doc| {
            let loaded = doc
                .load_page(page_index(page)?)
                .map_err(|e| DocumentError::new(DocumentErrorCode::DamagedContent, e.to_string()))?;
            let bounds = loaded
                .bounds()
                .map_err(|e| DocumentError::new(DocumentErrorCode::DamagedContent, e.to_string()))?;
            let text_page = loaded
                .to_text_page(TextPageFlags::empty())
                .map_err(|e| DocumentError::render(e.to_string()))?;

            // Region is relative to the page's top-left corner
            let (x0, y0) = (region.x0 + bounds.x0, region.y0 + bounds.y0);
            let (x1, y1) = (region.x1 + bounds.x0, region.y1 + bounds.y0);

            let mut lines = Vec::new();
            for block in text_page.blocks() {
                if block.r#type() != TextBlockType::Text {
                    continue;
                }
                for line in block.lines() {
                    let text: String = line
                        .chars()
                        .filter(|ch| {
                            let origin = ch.origin();
                            origin.x >= x0 && origin.x <= x1 && origin.y >= y0 && origin.y <= y1
                        })
                        .filter_map(|ch| ch.char())
                        .collect();
                    if !text.is_empty() {
                        lines.push(text);
                    }
                }
            }

            if lines.is_empty() {
                debug!("No text found on page {page} inside {region:?}");
            }
            Ok(lines.join("\n"))
        })
    }
}
