//! Viewport layout engine.
//!
//! The vertical offset is measured in page indices: its integer part is the
//! first page of the top row (always a multiple of the column count) and its
//! fractional part is how far that row has scrolled out of view, as a
//! fraction of the row's stride. Rows differ in height and, outside custom
//! zoom, in zoom, so every distance is computed row by row.

use serde::{Deserialize, Serialize};

use super::positions::PagePosition;
use super::store::PageStore;
use super::types::{ScreenRect, ZoomMode};
use super::zoom::Zoom;
use super::{MARGIN, VISIBLE_ROWS_ESTIMATE};

pub const MIN_COLUMNS: usize = 1;
pub const MAX_COLUMNS: usize = 5;

/// Zoom and raster-pixel size of one row of pages
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineMetrics {
    pub zoom: f32,
    pub width: f32,
    pub height: f32,
}

/// Outward notifications produced by a layout update
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Show this 1-based page number in the page indicator
    PageIndicator(usize),
    /// The scrollbar should be moved to the current offset
    SyncScrollbar,
}

/// Per-document view state that survives closing and reopening the document
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub columns: usize,
    pub horizontal_offset: f32,
    pub vertical_offset: f32,
    pub zoom: f32,
    pub zoom_mode: ZoomMode,
}

/// One page laid out for the current frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PagePlacement {
    /// The page's whole layout box, margins included
    pub cell: ScreenRect,
    /// Where the trimmed image goes and how it is scaled
    pub position: PagePosition,
    pub ready: bool,
}

#[derive(Debug)]
pub struct Viewport {
    area: ScreenRect,
    vertical_offset: f32,
    horizontal_offset: f32,
    columns: usize,
    zoom: f32,
    mode: ZoomMode,
    first_visible: usize,
    last_visible: usize,
    /// First visible page last pushed to the page indicator
    announced: Option<usize>,
}

impl Viewport {
    #[must_use]
    pub fn new(area: ScreenRect, columns: usize, mode: ZoomMode) -> Self {
        Self {
            area,
            vertical_offset: 0.0,
            horizontal_offset: 0.0,
            columns: columns.clamp(MIN_COLUMNS, MAX_COLUMNS),
            zoom: 1.0,
            mode,
            first_visible: 0,
            last_visible: 0,
            announced: None,
        }
    }

    #[must_use]
    pub fn area(&self) -> ScreenRect {
        self.area
    }

    pub fn set_area(&mut self, area: ScreenRect) {
        self.area = area;
    }

    #[must_use]
    pub fn vertical_offset(&self) -> f32 {
        self.vertical_offset
    }

    #[must_use]
    pub fn horizontal_offset(&self) -> f32 {
        self.horizontal_offset
    }

    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Zoom of the top row, or the user-set zoom in custom mode
    #[must_use]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    #[must_use]
    pub fn zoom_mode(&self) -> ZoomMode {
        self.mode
    }

    #[must_use]
    pub fn first_visible(&self) -> usize {
        self.first_visible
    }

    #[must_use]
    pub fn last_visible(&self) -> usize {
        self.last_visible
    }

    /// Forget per-document state before a new document is shown
    pub fn reset(&mut self) {
        self.vertical_offset = 0.0;
        self.horizontal_offset = 0.0;
        self.first_visible = 0;
        self.last_visible = 0;
        self.announced = None;
    }

    fn row_start(&self, page: usize) -> usize {
        page / self.columns * self.columns
    }

    /// True when the page carries more whitespace than the inter-page margin
    #[must_use]
    pub fn has_margins(store: &PageStore, page: usize) -> bool {
        store.geometry_or_placeholder(page).margins.exceed(MARGIN)
    }

    /// Layout box of a page in raster pixels
    fn page_box(&self, store: &PageStore, page: usize) -> (f32, f32) {
        let geometry = store.geometry_or_placeholder(page);
        if self.mode.trims() {
            let pad = if Self::has_margins(store, page) {
                2.0 * MARGIN as f32
            } else {
                0.0
            };
            (geometry.width as f32 + pad, geometry.height as f32 + pad)
        } else {
            (geometry.full_width() as f32, geometry.full_height() as f32)
        }
    }

    /// Zoom and size of the row starting at `first`.
    ///
    /// Cells past the last page are sized like a placeholder, so a short
    /// final row keeps the zoom of the rows above it.
    #[must_use]
    pub fn line_zoom_factor(&self, store: &PageStore, first: usize) -> LineMetrics {
        let (width, height) = (first..first + self.columns)
            .map(|page| self.page_box(store, page))
            .fold((0.0f32, 0.0f32), |(w, h), (bw, bh)| (w + bw, h.max(bh)));
        let width = width.max(1.0);
        let height = height.max(1.0);

        let fit_width = self.area.width.max(1.0) / width;
        let fit_height = self.area.height.max(1.0) / height;
        let zoom = match self.mode {
            ZoomMode::Trim | ZoomMode::Width => fit_width,
            ZoomMode::Page | ZoomMode::PageTrim => fit_width.min(fit_height),
            ZoomMode::Custom => self.zoom,
        };

        LineMetrics {
            zoom,
            width,
            height,
        }
    }

    /// Screen pixels from the top of the row at `first` to the next row
    fn row_stride(&self, store: &PageStore, first: usize) -> f32 {
        let line = self.line_zoom_factor(store, first);
        (line.height + MARGIN as f32) * line.zoom
    }

    /// Largest offset: the one at which the last row is bottom-aligned
    #[must_use]
    pub fn max_vertical_offset(&self, store: &PageStore) -> f32 {
        let pages = store.page_count();
        if pages == 0 {
            return 0.0;
        }

        let mut row = self.row_start(pages - 1);
        if self.area.height <= 0.0 {
            return row as f32;
        }

        let mut remaining = self.area.height;
        loop {
            let stride = self.row_stride(store, row);
            if stride >= remaining {
                let fraction = (1.0 - remaining / stride).min(0.999);
                return row as f32 + fraction;
            }
            remaining -= stride;
            if row == 0 {
                // Everything fits on screen
                return 0.0;
            }
            row -= self.columns;
        }
    }

    /// An offset expressed in rows rather than pages
    #[must_use]
    pub fn offset_in_rows(&self, offset: f32) -> f32 {
        let base = offset.floor();
        (base as usize / self.columns) as f32 + (offset - base)
    }

    /// Scrollable distance in rows, for scrollbars
    #[must_use]
    pub fn max_scroll_rows(&self, store: &PageStore) -> f32 {
        self.offset_in_rows(self.max_vertical_offset(store))
    }

    fn clamp_offset(&mut self, store: &PageStore) {
        let max = self.max_vertical_offset(store);
        self.vertical_offset = self.vertical_offset.clamp(0.0, max);
    }

    /// Jump to an absolute offset, snapping its integer part to a row start
    pub fn set_vertical_offset(&mut self, store: &PageStore, offset: f32) {
        let offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
        let base = offset.floor();
        let fraction = offset - base;
        self.vertical_offset = self.row_start(base as usize) as f32 + fraction;
        self.clamp_offset(store);
    }

    /// Scroll by `delta` rows, keeping the fraction and snapping to row
    /// starts whenever a row boundary is crossed
    pub fn adjust_offset(&mut self, store: &PageStore, delta: f32) {
        if !delta.is_finite() {
            return;
        }
        let base = self.vertical_offset.floor();
        let moved = (self.vertical_offset - base) + delta;
        let rows = moved.floor();
        let target = base + rows * self.columns as f32;

        self.vertical_offset = if target < 0.0 {
            0.0
        } else {
            self.row_start(target as usize) as f32 + (moved - rows)
        };
        self.clamp_offset(store);
    }

    /// Scroll by whole rows, landing exactly on a row start
    pub fn adjust_floor_offset(&mut self, store: &PageStore, rows: isize) {
        let base = self.row_start(self.vertical_offset.floor() as usize) as isize;
        let target = (base + rows * self.columns as isize).max(0) as usize;
        self.vertical_offset = self.row_start(target) as f32;
        self.clamp_offset(store);
    }

    pub fn scroll_to(&mut self, store: &PageStore, page: usize) {
        let page = page.min(store.page_count().saturating_sub(1));
        self.vertical_offset = self.row_start(page) as f32;
        self.clamp_offset(store);
    }

    pub fn scroll_by(&mut self, store: &PageStore, delta: f32) {
        self.adjust_offset(store, delta);
    }

    pub fn page_up(&mut self, store: &PageStore) {
        self.adjust_floor_offset(store, -1);
    }

    pub fn page_down(&mut self, store: &PageStore) {
        self.adjust_floor_offset(store, 1);
    }

    /// Change the column count, keeping the top-left page on screen
    pub fn set_columns(&mut self, store: &PageStore, columns: usize) {
        let first = self.vertical_offset.floor() as usize;
        self.columns = columns.clamp(MIN_COLUMNS, MAX_COLUMNS);
        self.vertical_offset = self.row_start(first) as f32;
        self.clamp_offset(store);
        self.clamp_horizontal(store);
    }

    pub fn set_zoom_mode(&mut self, store: &PageStore, mode: ZoomMode) {
        self.mode = mode;
        if mode != ZoomMode::Custom {
            self.horizontal_offset = 0.0;
        }
        self.clamp_offset(store);
        self.clamp_horizontal(store);
    }

    /// Set a user zoom; switches to custom mode
    pub fn set_zoom(&mut self, store: &PageStore, zoom: f32) {
        self.zoom = Zoom::clamp_factor(zoom);
        self.set_zoom_mode(store, ZoomMode::Custom);
    }

    /// One zoom step in, starting from whatever zoom is on screen
    pub fn zoom_in(&mut self, store: &PageStore) {
        let mut zoom = Zoom::new(self.current_zoom(store));
        zoom.step_in();
        self.set_zoom(store, zoom.factor);
    }

    pub fn zoom_out(&mut self, store: &PageStore) {
        let mut zoom = Zoom::new(self.current_zoom(store));
        zoom.step_out();
        self.set_zoom(store, zoom.factor);
    }

    fn current_zoom(&self, store: &PageStore) -> f32 {
        let first = self.row_start(self.vertical_offset.floor() as usize);
        self.line_zoom_factor(store, first).zoom
    }

    /// Largest horizontal pan that still leaves part of the row on screen
    #[must_use]
    pub fn max_horizontal_offset(&self, store: &PageStore) -> f32 {
        let first = self.row_start(self.vertical_offset.floor() as usize);
        let line = self.line_zoom_factor(store, first);
        let row_width = line.width * line.zoom;
        let keep = (row_width / self.columns as f32).min(self.area.width);
        (((self.area.width + row_width) / 2.0 - keep) / row_width).max(0.0)
    }

    fn clamp_horizontal(&mut self, store: &PageStore) {
        if self.mode != ZoomMode::Custom {
            self.horizontal_offset = 0.0;
            return;
        }
        let max = self.max_horizontal_offset(store);
        self.horizontal_offset = self.horizontal_offset.clamp(-max, max);
    }

    /// Pan by a fraction of the row width. Ignored outside custom zoom.
    pub fn pan_horizontal(&mut self, store: &PageStore, delta: f32) {
        if self.mode != ZoomMode::Custom || !delta.is_finite() {
            return;
        }
        self.horizontal_offset += delta;
        self.clamp_horizontal(store);
    }

    /// Recompute the visible page range from the offset.
    ///
    /// The last visible page is a conservative estimate from a fixed
    /// per-column lookahead; `layout_frame` corrects it while walking rows.
    #[must_use]
    pub fn update_visible(&mut self, store: &PageStore) -> Vec<Effect> {
        let pages = store.page_count();
        if pages == 0 {
            return vec![];
        }

        self.vertical_offset = self.vertical_offset.clamp(0.0, (pages - 1) as f32);
        let base = self.vertical_offset.floor();
        let first = self.row_start(base as usize);
        if first as f32 != base {
            self.vertical_offset = first as f32 + (self.vertical_offset - base);
        }

        if self.mode != ZoomMode::Custom {
            self.zoom = self.line_zoom_factor(store, first).zoom;
        }

        let rows = VISIBLE_ROWS_ESTIMATE[self.columns - 1];
        self.first_visible = first;
        self.last_visible = (first + rows * self.columns - 1).min(pages - 1);

        if self.announced == Some(first) {
            return vec![];
        }
        self.announced = Some(first);
        vec![Effect::PageIndicator(first + 1), Effect::SyncScrollbar]
    }

    /// Draw pass: place every page of every row that reaches into the
    /// viewport, and pin `last_visible` to the last page placed
    pub fn layout_frame(&mut self, store: &PageStore) -> Vec<PagePlacement> {
        let pages = store.page_count();
        let mut placements = Vec::new();
        if pages == 0 {
            return placements;
        }

        let first = self.first_visible.min(pages - 1);
        let fraction = self.vertical_offset - self.vertical_offset.floor();
        let mut y = self.area.y - fraction * self.row_stride(store, first);
        let mut row = first;
        let mut last = first;

        while row < pages && y < self.area.bottom() {
            let line = self.line_zoom_factor(store, row);
            let row_width = line.width * line.zoom;
            let mut x = self.area.x + (self.area.width - row_width) / 2.0;
            if self.mode == ZoomMode::Custom {
                x -= self.horizontal_offset * row_width;
            }

            for page in row..(row + self.columns).min(pages) {
                let placement = self.place(store, page, x, y, line.zoom);
                x += placement.cell.width;
                placements.push(placement);
                last = page;
            }

            y += (line.height + MARGIN as f32) * line.zoom;
            row += self.columns;
        }

        self.last_visible = last;
        placements
    }

    fn place(&self, store: &PageStore, page: usize, x: f32, y: f32, zoom: f32) -> PagePlacement {
        let geometry = store.geometry_or_placeholder(page);
        let (box_width, box_height) = self.page_box(store, page);
        let cell = ScreenRect::new(x, y, box_width * zoom, box_height * zoom);

        let image = if self.mode.trims() {
            if Self::has_margins(store, page) {
                let inset = MARGIN as f32 * zoom;
                cell.inset(inset, inset, inset, inset)
            } else {
                cell
            }
        } else {
            let m = geometry.margins;
            cell.inset(
                m.left as f32 * zoom,
                m.top as f32 * zoom,
                m.right as f32 * zoom,
                m.bottom as f32 * zoom,
            )
        };

        PagePlacement {
            cell,
            position: PagePosition {
                page,
                rect: image,
                scale_x: image.width / geometry.width.max(1) as f32,
                scale_y: image.height / geometry.height.max(1) as f32,
                margins: geometry.margins,
            },
            ready: store.is_ready(page),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            columns: self.columns,
            horizontal_offset: self.horizontal_offset,
            vertical_offset: self.vertical_offset,
            zoom: self.zoom,
            zoom_mode: self.mode,
        }
    }

    pub fn restore(&mut self, store: &PageStore, snapshot: &ViewSnapshot) {
        self.columns = snapshot.columns.clamp(MIN_COLUMNS, MAX_COLUMNS);
        self.mode = snapshot.zoom_mode;
        self.zoom = Zoom::clamp_factor(snapshot.zoom);
        self.horizontal_offset = if snapshot.horizontal_offset.is_finite() {
            snapshot.horizontal_offset
        } else {
            0.0
        };
        self.set_vertical_offset(store, snapshot.vertical_offset);
        self.clamp_horizontal(store);
    }
}
