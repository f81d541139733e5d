//! Where each page landed on screen during the last draw pass.
//!
//! Rows are not uniform (pages differ in size and margins), so mapping a
//! screen point back to a page needs the exact rectangles the drawer used.

use std::collections::VecDeque;

use super::types::{Margins, ScreenRect};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PagePosition {
    pub page: usize,
    /// Screen rectangle the trimmed image was drawn into
    pub rect: ScreenRect,
    /// Screen pixels per raster pixel, horizontally
    pub scale_x: f32,
    /// Screen pixels per raster pixel, vertically
    pub scale_y: f32,
    /// Margins trimmed from the raster, in raster pixels
    pub margins: Margins,
}

/// Bounded ring of position records; the oldest falls out when full
#[derive(Debug)]
pub struct PositionRing {
    records: VecDeque<PagePosition>,
    capacity: usize,
}

impl PositionRing {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn record(&mut self, position: PagePosition) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(position);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PagePosition> {
        self.records.iter()
    }

    /// Newest record whose rectangle contains the point
    #[must_use]
    pub fn find(&self, x: f32, y: f32) -> Option<&PagePosition> {
        self.records.iter().rev().find(|p| p.rect.contains(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(page: usize, x: f32) -> PagePosition {
        PagePosition {
            page,
            rect: ScreenRect::new(x, 0.0, 10.0, 10.0),
            scale_x: 1.0,
            scale_y: 1.0,
            margins: Margins::default(),
        }
    }

    #[test]
    fn oldest_record_is_dropped_at_capacity() {
        let mut ring = PositionRing::new(3);
        for page in 0..5 {
            ring.record(position(page, page as f32 * 20.0));
        }

        let pages: Vec<_> = ring.iter().map(|p| p.page).collect();
        assert_eq!(pages, vec![2, 3, 4]);
        assert!(ring.find(5.0, 5.0).is_none());
    }

    #[test]
    fn newest_overlapping_record_wins() {
        let mut ring = PositionRing::new(4);
        ring.record(position(1, 0.0));
        ring.record(position(2, 5.0));

        assert_eq!(ring.find(7.0, 1.0).map(|p| p.page), Some(2));
        assert_eq!(ring.find(1.0, 1.0).map(|p| p.page), Some(1));
    }
}
