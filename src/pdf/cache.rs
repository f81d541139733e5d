//! Decompression cache: a small fixed set of decompressed page bitmaps that
//! the UI paints from.
//!
//! Eviction picks a uniformly random slot. Keep it that way; this is not an
//! LRU cache.
//!
//! Only the UI thread touches this cache, so it holds no locks.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::backend::Canvas;
use super::codec::decompress_into;
use super::error::ViewerError;
use super::store::PageEntry;

struct CacheSlot<I> {
    buffer: Vec<u8>,
    page: Option<usize>,
    /// Renderer-side resource built from `buffer`, replaced with the page
    image: Option<I>,
}

pub struct DecompressionCache<I> {
    slots: Vec<CacheSlot<I>>,
    /// Shared capacity of every slot buffer
    slot_capacity: usize,
    rng: StdRng,
}

impl<I> DecompressionCache<I> {
    #[must_use]
    pub fn new(slot_count: usize) -> Self {
        Self::with_rng(slot_count, StdRng::from_entropy())
    }

    /// Deterministic eviction order, for tests and replays
    #[must_use]
    pub fn with_seed(slot_count: usize, seed: u64) -> Self {
        Self::with_rng(slot_count, StdRng::seed_from_u64(seed))
    }

    fn with_rng(slot_count: usize, rng: StdRng) -> Self {
        let slots = (0..slot_count.max(1))
            .map(|_| CacheSlot {
                buffer: Vec::new(),
                page: None,
                image: None,
            })
            .collect();
        Self {
            slots,
            slot_capacity: 0,
            rng,
        }
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn slot_capacity(&self) -> usize {
        self.slot_capacity
    }

    #[must_use]
    pub fn contains(&self, page: usize) -> bool {
        self.find(page).is_some()
    }

    /// Pages currently held, in slot order
    #[must_use]
    pub fn cached_pages(&self) -> Vec<usize> {
        self.slots.iter().filter_map(|s| s.page).collect()
    }

    /// Forget every page, e.g. when a new document is opened
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.page = None;
            slot.image = None;
        }
    }

    fn find(&self, page: usize) -> Option<usize> {
        self.slots.iter().position(|s| s.page == Some(page))
    }

    /// Renderable image of `page`, decompressing it on a miss.
    ///
    /// Taking the published `PageEntry` means an unready page cannot get here.
    pub fn content<C>(
        &mut self,
        page: usize,
        entry: &PageEntry,
        canvas: &mut C,
    ) -> Result<&I, ViewerError>
    where
        C: Canvas<Image = I>,
    {
        let index = match self.find(page) {
            Some(index) => index,
            None => self.load(page, entry, canvas)?,
        };

        let slot = &self.slots[index];
        slot.image.as_ref().ok_or_else(|| ViewerError::CacheCorruption {
            page,
            detail: "slot has no image".into(),
        })
    }

    fn load<C>(&mut self, page: usize, entry: &PageEntry, canvas: &mut C) -> Result<usize, ViewerError>
    where
        C: Canvas<Image = I>,
    {
        let expected = entry.uncompressed_size();
        if expected > self.slot_capacity {
            self.grow(expected)?;
        }

        let index = self.rng.gen_range(0..self.slots.len());
        let slot = &mut self.slots[index];
        debug!("Cache miss for page {page}, replacing slot {index} (held {:?})", slot.page);

        // The slot is unusable until the new page is fully in place
        slot.page = None;
        slot.image = None;

        let written = decompress_into(entry.compressed(), &mut slot.buffer, expected).map_err(|e| {
            ViewerError::CacheCorruption {
                page,
                detail: format!("decompression failed: {e}"),
            }
        })?;
        if written != expected {
            return Err(ViewerError::CacheCorruption {
                page,
                detail: format!("decompressed {written} bytes, expected {expected}"),
            });
        }

        let geometry = entry.geometry();
        slot.image = Some(canvas.upload_image(&slot.buffer, geometry.width, geometry.height));
        slot.page = Some(page);
        Ok(index)
    }

    /// Grow every slot to `capacity` so slots stay interchangeable
    fn grow(&mut self, capacity: usize) -> Result<(), ViewerError> {
        debug!("Growing cache slots from {} to {capacity} bytes", self.slot_capacity);
        for slot in &mut self.slots {
            slot.buffer.clear();
            slot.buffer
                .try_reserve_exact(capacity + 1)
                .map_err(|_| ViewerError::ResourceExhaustion {
                    requested: capacity,
                    purpose: "decompression cache",
                })?;
        }
        self.slot_capacity = capacity;
        Ok(())
    }
}
