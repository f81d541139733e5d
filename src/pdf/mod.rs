//! Page rendering core: rasterize, trim, compress, store, cache and lay out
//! the pages of a paginated document.

mod backend;
mod cache;
mod codec;
mod error;
mod layout;
mod notifier;
mod positions;
mod selection;
mod service;
mod store;
mod trim;
mod types;
mod worker;
mod zoom;

#[cfg(feature = "pdf")]
mod mupdf_backend;

pub use backend::{Canvas, Clipboard, ClipboardError, DocumentBackend, DocumentSource, Rgb};
pub use cache::DecompressionCache;
pub use codec::{Compressor, decompress_into};
pub use error::{DocumentError, DocumentErrorCode, ViewerError};
pub use layout::{Effect, LineMetrics, MAX_COLUMNS, MIN_COLUMNS, PagePlacement, ViewSnapshot, Viewport};
#[cfg(feature = "pdf")]
pub use mupdf_backend::{MupdfBackend, MupdfSource};
pub use notifier::{EventQueue, Notifier, ViewerEvent};
pub use positions::{PagePosition, PositionRing};
pub use selection::{PageSelection, TextSelection, map_selection, screen_to_page};
pub use service::{DocumentSession, PreparedDocument};
pub use store::{PageEntry, PageStore};
pub use trim::{BYTES_PER_PIXEL, TrimmedBitmap, trim};
pub use types::*;
pub use worker::{CancellationToken, RasterConfig, RasterJob, VisibleWindow, next_chunk, render_page};
pub use zoom::Zoom;

/// Raster resolution; document units are 72 per inch
pub const DEFAULT_DPI: f32 = 144.0;

/// Channel value at or above which a pixel counts as paper
pub const DEFAULT_WHITE_THRESHOLD: u8 = 250;

/// Gap between pages, in raster pixels (a quarter inch at 144 DPI)
pub const MARGIN: u32 = 36;

pub const DEFAULT_CACHE_SLOTS: usize = 15;

pub const POSITION_RING_CAPACITY: usize = 50;

/// Rows assumed visible per column count, before the draw pass measures
pub const VISIBLE_ROWS_ESTIMATE: [usize; 5] = [2, 3, 3, 4, 4];
