//! Background rasterizer - runs on a dedicated loader thread that owns a
//! rayon pool.
//!
//! Every page goes through the same pipeline: rasterize at a fixed DPI, trim
//! whitespace, compress, publish into the page store. Small documents are
//! handed to rayon in one go; large ones are cut into chunks so that the
//! chunk holding the page the user is looking at can jump the queue.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::{debug, error, info, warn};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use super::backend::DocumentSource;
use super::codec::Compressor;
use super::error::ViewerError;
use super::notifier::{Notifier, ViewerEvent};
use super::store::{PageEntry, PageStore};
use super::trim::trim;

/// Rasterization parameters, fixed for the lifetime of a session
#[derive(Clone, Debug)]
pub struct RasterConfig {
    pub dpi: f32,
    pub white_threshold: u8,
    pub compressor: Compressor,
    /// Rayon threads for pages 1..N
    pub threads: usize,
    /// Documents above this page count are scheduled in chunks
    pub large_document_pages: usize,
    /// Chunk size is `threads * chunk_multiplier`
    pub chunk_multiplier: usize,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            dpi: super::DEFAULT_DPI,
            white_threshold: super::DEFAULT_WHITE_THRESHOLD,
            compressor: Compressor::fast(),
            threads: std::thread::available_parallelism().map_or(1, usize::from),
            large_document_pages: 64,
            chunk_multiplier: 4,
        }
    }
}

impl RasterConfig {
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        (self.threads.max(1) * self.chunk_multiplier.max(1)).max(1)
    }
}

/// Cooperative cancellation flag, checked between pages
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Pages currently on screen, written by the UI thread.
///
/// Only a scheduling hint, so relaxed ordering is enough.
#[derive(Debug, Default)]
pub struct VisibleWindow {
    first: AtomicUsize,
    last: AtomicUsize,
}

impl VisibleWindow {
    pub fn set(&self, first: usize, last: usize) {
        self.first.store(first, Ordering::Relaxed);
        self.last.store(last.max(first), Ordering::Relaxed);
    }

    #[must_use]
    pub fn first(&self) -> usize {
        self.first.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn contains(&self, page: usize) -> bool {
        page >= self.first.load(Ordering::Relaxed) && page <= self.last.load(Ordering::Relaxed)
    }
}

/// Rasterize, trim and compress a single page
pub fn render_page(
    source: &dyn DocumentSource,
    page: usize,
    config: &RasterConfig,
) -> Result<PageEntry, ViewerError> {
    let bitmap = source.rasterize(page, config.dpi)?;
    let trimmed = trim(&bitmap, config.white_threshold)?;
    drop(bitmap);

    let compressed = config
        .compressor
        .compress(&trimmed.pixels)
        .map_err(|source| ViewerError::Compression { page, source })?;

    Ok(PageEntry::new(
        compressed,
        trimmed.pixels.len(),
        trimmed.geometry,
    ))
}

/// Pick the next chunk to rasterize.
///
/// The chunk containing the visible page wins if it is still pending.
/// Otherwise continue with the first pending chunk after `last`, wrapping
/// around to the start of the document.
#[must_use]
pub fn next_chunk(done: &[bool], last: Option<usize>, visible: Option<usize>) -> Option<usize> {
    if let Some(v) = visible {
        if done.get(v) == Some(&false) {
            return Some(v);
        }
    }

    let start = last.map_or(0, |l| l + 1);
    let len = done.len();
    (0..len)
        .map(|i| (start + i) % len)
        .find(|&chunk| !done[chunk])
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Everything the loader thread needs, moved into it at spawn time
pub struct RasterJob {
    pub source: Arc<dyn DocumentSource>,
    pub store: Arc<PageStore>,
    pub config: RasterConfig,
    pub window: Arc<VisibleWindow>,
    pub cancel: CancellationToken,
    pub notifier: Notifier,
}

impl RasterJob {
    /// Rasterize pages 1..N. Page 0 is already in the store.
    pub fn run(self) {
        let pages = self.store.page_count();
        let pool = match ThreadPoolBuilder::new()
            .num_threads(self.config.threads.max(1))
            .thread_name(|i| format!("folio-raster-{i}"))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                error!("Could not start rasterizer pool: {e}");
                self.notifier.notify(ViewerEvent::Fatal(e.to_string()));
                return;
            }
        };

        if pages > self.config.large_document_pages {
            self.run_chunked(&pool, pages);
        } else {
            pool.install(|| (1..pages).into_par_iter().for_each(|page| self.process(page)));
        }

        if self.cancel.is_cancelled() {
            info!("Rasterization stopped early ({} of {pages} pages ready)", self.store.ready_count());
            return;
        }

        let (max_w, max_h) = self.store.finalize_max_page_size();
        info!(
            "Rasterized {pages} pages, max trimmed size {max_w}x{max_h}, {} compressed bytes",
            self.store.compressed_bytes()
        );
        self.notifier.notify(ViewerEvent::LoadComplete { pages });
    }

    fn run_chunked(&self, pool: &rayon::ThreadPool, pages: usize) {
        let chunk_size = self.config.chunk_size();
        let chunk_count = (pages - 1).div_ceil(chunk_size);
        let mut done = vec![false; chunk_count];
        let mut last = None;

        debug!("Scheduling {pages} pages in {chunk_count} chunks of {chunk_size}");

        while !self.cancel.is_cancelled() {
            let visible = match self.window.first() {
                0 => None,
                page => Some((page - 1) / chunk_size),
            };
            let Some(chunk) = next_chunk(&done, last, visible) else {
                break;
            };
            if visible == Some(chunk) && last.map(|l| l + 1) != Some(chunk) {
                debug!("Seeking ahead to chunk {chunk} for visible page {}", self.window.first());
            }

            let start = 1 + chunk * chunk_size;
            let end = (start + chunk_size).min(pages);
            pool.install(|| (start..end).into_par_iter().for_each(|page| self.process(page)));

            done[chunk] = true;
            last = Some(chunk);
        }
    }

    fn process(&self, page: usize) {
        if self.cancel.is_cancelled() || self.store.is_ready(page) {
            return;
        }

        let rendered = panic::catch_unwind(AssertUnwindSafe(|| {
            render_page(self.source.as_ref(), page, &self.config)
        }));
        let result = match rendered {
            Ok(result) => result,
            Err(payload) => {
                let message = format!("page {page} panicked: {}", panic_message(payload.as_ref()));
                error!("Rasterizer {message}");
                self.notifier.notify(ViewerEvent::Fatal(message));
                self.cancel.cancel();
                return;
            }
        };

        match result {
            Ok(entry) => {
                self.store.publish(page, entry);
                if self.window.contains(page) {
                    self.notifier.notify(ViewerEvent::PageReady(page));
                }
            }
            Err(ViewerError::Document(e)) => {
                warn!("Page {page} could not be rasterized: {e}");
                self.notifier.notify(ViewerEvent::RasterFailed {
                    page,
                    message: e.to_string(),
                });
            }
            Err(e) => {
                error!("Fatal rasterizer error on page {page}: {e}");
                self.notifier.notify(ViewerEvent::Fatal(e.to_string()));
                self.cancel.cancel();
            }
        }
    }
}
