//! Pointer-drag selection and its mapping from screen to document space

use super::positions::{PagePosition, PositionRing};
use super::types::{PageRect, ScreenRect};

/// Drag state of a rectangular selection, in screen pixels
#[derive(Clone, Copy, Debug, Default)]
pub struct TextSelection {
    anchor: Option<(f32, f32)>,
    current: Option<(f32, f32)>,
    is_selecting: bool,
}

impl TextSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a drag at a point
    pub fn start_at(&mut self, x: f32, y: f32) {
        self.anchor = Some((x, y));
        self.current = Some((x, y));
        self.is_selecting = true;
    }

    /// Move the free corner while dragging
    pub fn update_end(&mut self, x: f32, y: f32) {
        if self.is_selecting {
            self.current = Some((x, y));
        }
    }

    /// Finish the drag and return the selected rectangle
    pub fn finish(&mut self) -> Option<ScreenRect> {
        if !self.is_selecting {
            return None;
        }
        self.is_selecting = false;
        self.rect()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn is_selecting(&self) -> bool {
        self.is_selecting
    }

    /// Normalized rectangle between the two corners
    #[must_use]
    pub fn rect(&self) -> Option<ScreenRect> {
        match (self.anchor, self.current) {
            (Some(a), Some(b)) => Some(ScreenRect::from_corners(a, b)),
            _ => None,
        }
    }
}

/// A selection resolved to one page, in document units
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSelection {
    pub page: usize,
    pub region: PageRect,
}

/// Convert a screen point on a drawn page to document units
#[must_use]
pub fn screen_to_page(position: &PagePosition, x: f32, y: f32, dpi: f32) -> (f32, f32) {
    let units_per_pixel = 72.0 / dpi;
    let raster_x = (x - position.rect.x) / position.scale_x + position.margins.left as f32;
    let raster_y = (y - position.rect.y) / position.scale_y + position.margins.top as f32;
    (raster_x * units_per_pixel, raster_y * units_per_pixel)
}

/// Map a screen rectangle to the page under its top-left corner.
///
/// The rectangle is clipped to that page; `None` when no drawn page holds
/// the corner or nothing of the rectangle is left after clipping.
#[must_use]
pub fn map_selection(ring: &PositionRing, selection: ScreenRect, dpi: f32) -> Option<PageSelection> {
    let position = ring.find(selection.x, selection.y)?;
    let clipped = position.rect.intersect(&selection)?;

    let (x0, y0) = screen_to_page(position, clipped.x, clipped.y, dpi);
    let (x1, y1) = screen_to_page(position, clipped.right(), clipped.bottom(), dpi);
    Some(PageSelection {
        page: position.page,
        region: PageRect { x0, y0, x1, y1 },
    })
}

#[cfg(test)]
mod tests {
    use super::super::types::Margins;
    use super::*;

    fn ring_with(position: PagePosition) -> PositionRing {
        let mut ring = PositionRing::new(8);
        ring.record(position);
        ring
    }

    fn page(rect: ScreenRect, scale: f32, margins: Margins) -> PagePosition {
        PagePosition {
            page: 3,
            rect,
            scale_x: scale,
            scale_y: scale,
            margins,
        }
    }

    #[test]
    fn drag_produces_normalized_rect() {
        let mut selection = TextSelection::new();
        selection.start_at(50.0, 60.0);
        selection.update_end(20.0, 90.0);

        assert_eq!(selection.finish(), Some(ScreenRect::new(20.0, 60.0, 30.0, 30.0)));
        assert!(!selection.is_selecting());
        assert_eq!(selection.finish(), None);
    }

    #[test]
    fn updates_after_finish_are_ignored() {
        let mut selection = TextSelection::new();
        selection.start_at(0.0, 0.0);
        selection.update_end(5.0, 5.0);
        let _ = selection.finish();
        selection.update_end(100.0, 100.0);
        assert_eq!(selection.rect(), Some(ScreenRect::new(0.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn maps_through_scale_margins_and_dpi() {
        let margins = Margins {
            left: 40,
            right: 0,
            top: 20,
            bottom: 0,
        };
        let ring = ring_with(page(ScreenRect::new(100.0, 50.0, 500.0, 700.0), 0.5, margins));

        let mapped = map_selection(&ring, ScreenRect::new(110.0, 60.0, 50.0, 25.0), 144.0).unwrap();
        assert_eq!(mapped.page, 3);
        // (10 / 0.5 + 40) / 2 = 30, (10 / 0.5 + 20) / 2 = 20
        assert_eq!(
            mapped.region,
            PageRect {
                x0: 30.0,
                y0: 20.0,
                x1: 80.0,
                y1: 45.0
            }
        );
    }

    #[test]
    fn selection_is_clipped_to_page() {
        let ring = ring_with(page(ScreenRect::new(0.0, 0.0, 100.0, 100.0), 1.0, Margins::default()));

        let mapped = map_selection(&ring, ScreenRect::new(50.0, 50.0, 500.0, 500.0), 72.0).unwrap();
        assert_eq!(
            mapped.region,
            PageRect {
                x0: 50.0,
                y0: 50.0,
                x1: 100.0,
                y1: 100.0
            }
        );
    }

    #[test]
    fn origin_outside_every_page_is_ignored() {
        let ring = ring_with(page(ScreenRect::new(100.0, 100.0, 50.0, 50.0), 1.0, Margins::default()));
        assert_eq!(map_selection(&ring, ScreenRect::new(10.0, 10.0, 200.0, 200.0), 72.0), None);
        assert_eq!(map_selection(&PositionRing::new(4), ScreenRect::new(0.0, 0.0, 1.0, 1.0), 72.0), None);
    }

    #[test]
    fn empty_selection_is_discarded() {
        let ring = ring_with(page(ScreenRect::new(0.0, 0.0, 100.0, 100.0), 1.0, Margins::default()));
        assert_eq!(map_selection(&ring, ScreenRect::new(10.0, 10.0, 0.0, 0.0), 72.0), None);
    }
}
