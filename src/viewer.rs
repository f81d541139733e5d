//! The viewer facade: one document session, one viewport, and the
//! decompression cache the frame is painted from.
//!
//! Everything here runs on the UI thread. The rasterizer reaches it only
//! through the session's event queue.

use std::path::Path;
use std::time::Duration;

use log::{debug, info, warn};

use crate::pdf::{
    Canvas, Clipboard, DecompressionCache, DocumentBackend, DocumentSession, Effect, PageStore,
    PositionRing, PreparedDocument, Rgb, ScreenRect, TextSelection, ViewSnapshot, ViewerError, ViewerEvent,
    Viewport, ZoomMode, map_selection,
};
use crate::settings::Settings;

/// Summary of the open document
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub ready_pages: usize,
    /// Largest trimmed page, known once loading completed
    pub max_page_size: Option<(u32, u32)>,
}

pub struct Viewer<C: Canvas> {
    backend: Box<dyn DocumentBackend>,
    clipboard: Box<dyn Clipboard>,
    settings: Settings,
    session: Option<DocumentSession>,
    viewport: Viewport,
    cache: DecompressionCache<C::Image>,
    positions: PositionRing,
    selection: TextSelection,
    load_complete: bool,
    effects: Vec<Effect>,
}

impl<C: Canvas> Viewer<C> {
    #[must_use]
    pub fn new(
        backend: Box<dyn DocumentBackend>,
        clipboard: Box<dyn Clipboard>,
        settings: Settings,
        area: ScreenRect,
    ) -> Self {
        let viewport = Viewport::new(area, settings.default_columns, settings.default_zoom_mode);
        Self {
            backend,
            clipboard,
            cache: DecompressionCache::new(settings.cache_slots),
            positions: PositionRing::new(settings.position_ring_capacity),
            settings,
            session: None,
            viewport,
            selection: TextSelection::new(),
            load_complete: false,
            effects: Vec::new(),
        }
    }

    /// Open a document, replacing the current one.
    ///
    /// Parse and first-page failures leave the current document untouched.
    /// The previous rasterizer is cancelled and joined before the new
    /// document's page store exists.
    pub fn open_document(&mut self, path: &Path) -> Result<(), ViewerError> {
        info!("Opening {}", path.display());
        let source = self.backend.open(path)?;
        let prepared = PreparedDocument::prepare(source, self.settings.raster_config())?;

        self.close_document();
        let session = prepared.start()?;

        self.session = Some(session);
        self.viewport.reset();
        self.refresh();
        Ok(())
    }

    /// Stop the rasterizer and drop the current document, if any
    pub fn close_document(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        self.cache.reset();
        self.positions.clear();
        self.selection.clear();
        self.load_complete = false;
    }

    #[must_use]
    pub fn has_document(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn session(&self) -> Option<&DocumentSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn document_info(&self) -> Option<DocumentInfo> {
        self.session.as_ref().map(|session| DocumentInfo {
            page_count: session.page_count(),
            ready_pages: session.store().ready_count(),
            max_page_size: session.store().max_page_size(),
        })
    }

    /// True until the rasterizer reported that every page is in, or stopped
    /// and every event it sent has been handled
    #[must_use]
    pub fn is_loading(&self) -> bool {
        match self.session.as_ref() {
            Some(session) if !self.load_complete => {
                session.is_loading() || !session.events().is_empty()
            }
            _ => false,
        }
    }

    /// Outward notifications collected since the last call
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Recompute the visible range and tell the rasterizer about it
    fn refresh(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let effects = self.viewport.update_visible(session.store());
        self.effects.extend(effects);
        session.set_visible(self.viewport.first_visible(), self.viewport.last_visible());
    }

    fn with_layout(&mut self, f: impl FnOnce(&mut Viewport, &PageStore)) {
        if let Some(session) = self.session.as_ref() {
            f(&mut self.viewport, session.store());
        }
        self.refresh();
    }

    pub fn set_area(&mut self, area: ScreenRect) {
        self.viewport.set_area(area);
        self.with_layout(|view, store| {
            let offset = view.vertical_offset();
            view.set_vertical_offset(store, offset);
        });
    }

    pub fn set_zoom_mode(&mut self, mode: ZoomMode) {
        self.with_layout(|view, store| view.set_zoom_mode(store, mode));
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.with_layout(|view, store| view.set_zoom(store, zoom));
    }

    pub fn zoom_in(&mut self) {
        self.with_layout(Viewport::zoom_in);
    }

    pub fn zoom_out(&mut self) {
        self.with_layout(Viewport::zoom_out);
    }

    pub fn set_columns(&mut self, columns: usize) {
        self.with_layout(|view, store| view.set_columns(store, columns));
    }

    pub fn scroll_to(&mut self, page: usize) {
        self.with_layout(|view, store| view.scroll_to(store, page));
    }

    /// Scroll by `delta` rows; fractions scroll smoothly
    pub fn scroll_by(&mut self, delta: f32) {
        self.with_layout(|view, store| view.scroll_by(store, delta));
    }

    pub fn page_up(&mut self) {
        self.with_layout(Viewport::page_up);
    }

    pub fn page_down(&mut self) {
        self.with_layout(Viewport::page_down);
    }

    pub fn pan_horizontal(&mut self, delta: f32) {
        self.with_layout(|view, store| view.pan_horizontal(store, delta));
    }

    #[must_use]
    pub fn snapshot(&self) -> ViewSnapshot {
        self.viewport.snapshot()
    }

    pub fn restore(&mut self, snapshot: &ViewSnapshot) {
        self.with_layout(|view, store| view.restore(store, snapshot));
    }

    /// Paint one frame and return where each visible page's image went
    pub fn on_frame(&mut self, canvas: &mut C) -> Result<Vec<(usize, ScreenRect)>, ViewerError> {
        canvas.fill_rect(self.viewport.area(), Rgb::BACKGROUND);
        let Some(session) = self.session.as_ref() else {
            return Ok(Vec::new());
        };
        let store = session.store();

        let effects = self.viewport.update_visible(store);
        self.effects.extend(effects);
        self.positions.clear();

        let placements = self.viewport.layout_frame(store);
        session.set_visible(self.viewport.first_visible(), self.viewport.last_visible());

        let mut frame = Vec::with_capacity(placements.len());
        for placement in placements {
            let page = placement.position.page;
            match store.entry(page) {
                Some(entry) => {
                    canvas.fill_rect(placement.cell, Rgb::PAGE);
                    let image = self.cache.content(page, entry, canvas)?;
                    canvas.draw_image(image, placement.position.rect);
                    self.positions.record(placement.position);
                }
                None => canvas.fill_rect(placement.cell, Rgb::PLACEHOLDER),
            }
            frame.push((page, placement.position.rect));
        }
        Ok(frame)
    }

    pub fn begin_selection(&mut self, x: f32, y: f32) {
        self.selection.start_at(x, y);
    }

    pub fn update_selection(&mut self, x: f32, y: f32) {
        self.selection.update_end(x, y);
    }

    /// Finish a drag, extract the text under it and copy it to the
    /// clipboard. A selection that misses every drawn page yields `None`.
    pub fn end_selection(&mut self, x: f32, y: f32) -> Result<Option<String>, ViewerError> {
        self.selection.update_end(x, y);
        let Some(rect) = self.selection.finish() else {
            return Ok(None);
        };
        let Some(session) = self.session.as_ref() else {
            return Ok(None);
        };
        let Some(mapped) = map_selection(&self.positions, rect, self.settings.dpi) else {
            debug!("Selection {rect:?} is not on a drawn page");
            return Ok(None);
        };

        let text = session.source().extract_text(mapped.page, mapped.region)?;
        debug!("Selected {} chars on page {}", text.chars().count(), mapped.page);
        if let Err(e) = self.clipboard.set_text(text.clone()) {
            warn!("{e}");
        }
        Ok(Some(text))
    }

    /// Handle every queued rasterizer event without blocking
    pub fn poll_events(&mut self) -> Result<Vec<ViewerEvent>, ViewerError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(Vec::new());
        };
        let events = session.events().drain();
        for event in &events {
            self.handle_event(event)?;
        }
        Ok(events)
    }

    /// Block up to `timeout` for the next rasterizer event
    pub fn wait_event(&mut self, timeout: Duration) -> Result<Option<ViewerEvent>, ViewerError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(None);
        };
        let Some(event) = session.events().wait(timeout) else {
            return Ok(None);
        };
        self.handle_event(&event)?;
        Ok(Some(event))
    }

    fn handle_event(&mut self, event: &ViewerEvent) -> Result<(), ViewerError> {
        match event {
            ViewerEvent::PageReady(page) => debug!("Visible page {page} is ready"),
            ViewerEvent::LoadComplete { pages } => {
                info!("All {pages} pages loaded");
                self.load_complete = true;
                // Real geometry replaced placeholders; the offset may be out of range
                self.set_area(self.viewport.area());
            }
            ViewerEvent::RasterFailed { page, message } => {
                warn!("Page {page} will stay blank: {message}");
            }
            ViewerEvent::Fatal(message) => return Err(ViewerError::Worker(message.clone())),
        }
        Ok(())
    }
}
