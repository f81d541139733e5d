//! Page store: compressed bitmaps and geometry for every page of a document.
//!
//! Each slot is written exactly once by the worker that rasterized the page
//! and read any number of times afterwards. Publication goes through a
//! `OnceLock`, so a reader that sees an entry also sees every field of it.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::error::ViewerError;
use super::types::PageGeometry;

/// A published page. Immutable once it is in the store.
pub struct PageEntry {
    compressed: Box<[u8]>,
    uncompressed_size: usize,
    geometry: PageGeometry,
}

impl PageEntry {
    #[must_use]
    pub fn new(compressed: Vec<u8>, uncompressed_size: usize, geometry: PageGeometry) -> Self {
        Self {
            compressed: compressed.into_boxed_slice(),
            uncompressed_size,
            geometry,
        }
    }

    #[must_use]
    pub fn compressed(&self) -> &[u8] {
        &self.compressed
    }

    #[must_use]
    pub fn compressed_size(&self) -> usize {
        self.compressed.len()
    }

    #[must_use]
    pub fn uncompressed_size(&self) -> usize {
        self.uncompressed_size
    }

    #[must_use]
    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }
}

impl std::fmt::Debug for PageEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageEntry")
            .field("compressed_size", &self.compressed.len())
            .field("uncompressed_size", &self.uncompressed_size)
            .field("geometry", &self.geometry)
            .finish()
    }
}

pub struct PageStore {
    entries: Box<[OnceLock<PageEntry>]>,
    ready_count: AtomicUsize,
    max_page_size: OnceLock<(u32, u32)>,
}

impl PageStore {
    /// Allocate one empty slot per page
    pub fn with_page_count(page_count: usize) -> Result<Self, ViewerError> {
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(page_count)
            .map_err(|_| ViewerError::ResourceExhaustion {
                requested: page_count.saturating_mul(std::mem::size_of::<OnceLock<PageEntry>>()),
                purpose: "page store",
            })?;
        entries.resize_with(page_count, OnceLock::new);

        Ok(Self {
            entries: entries.into_boxed_slice(),
            ready_count: AtomicUsize::new(0),
            max_page_size: OnceLock::new(),
        })
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.entries.len()
    }

    /// The published entry, `None` while the page is still pending
    #[must_use]
    pub fn entry(&self, page: usize) -> Option<&PageEntry> {
        self.entries.get(page).and_then(OnceLock::get)
    }

    #[must_use]
    pub fn is_ready(&self, page: usize) -> bool {
        self.entry(page).is_some()
    }

    /// Publish a page. Returns false if the slot was already filled or the
    /// index is out of range; the existing entry is left untouched.
    pub fn publish(&self, page: usize, entry: PageEntry) -> bool {
        let Some(slot) = self.entries.get(page) else {
            return false;
        };
        let stored = slot.set(entry).is_ok();
        if stored {
            self.ready_count.fetch_add(1, Ordering::AcqRel);
        }
        stored
    }

    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.ready_count.load(Ordering::Acquire)
    }

    /// Geometry of `page`, or of page 0 while `page` is not ready yet
    #[must_use]
    pub fn geometry_or_placeholder(&self, page: usize) -> PageGeometry {
        self.entry(page)
            .or_else(|| self.entry(0))
            .map(PageEntry::geometry)
            .unwrap_or_default()
    }

    /// Compute the running maxima over every ready page and freeze them.
    /// Only the first call has any effect.
    pub fn finalize_max_page_size(&self) -> (u32, u32) {
        *self.max_page_size.get_or_init(|| {
            self.entries
                .iter()
                .filter_map(OnceLock::get)
                .fold((0, 0), |(w, h), e| {
                    (w.max(e.geometry.width), h.max(e.geometry.height))
                })
        })
    }

    /// Maximum trimmed page size, available once loading completed
    #[must_use]
    pub fn max_page_size(&self) -> Option<(u32, u32)> {
        self.max_page_size.get().copied()
    }

    #[must_use]
    pub fn compressed_bytes(&self) -> usize {
        self.entries
            .iter()
            .filter_map(OnceLock::get)
            .map(PageEntry::compressed_size)
            .sum()
    }
}
