//! One-way event channel from the background rasterizer to the UI thread.
//!
//! This is the only path by which worker threads talk to UI state; every
//! other worker write lands in the page store.

use std::time::Duration;

use flume::{Receiver, Sender};
use log::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewerEvent {
    /// A page inside the visible window finished rasterizing
    PageReady(usize),
    /// Every page is in the store and the max page size is final
    LoadComplete { pages: usize },
    /// The backend could not rasterize a page; it stays a placeholder
    RasterFailed { page: usize, message: String },
    /// Unrecoverable worker failure
    Fatal(String),
}

#[derive(Clone)]
pub struct Notifier {
    tx: Sender<ViewerEvent>,
}

impl Notifier {
    pub fn notify(&self, event: ViewerEvent) {
        if self.tx.send(event).is_err() {
            debug!("Event receiver dropped, discarding notification");
        }
    }
}

pub struct EventQueue {
    rx: Receiver<ViewerEvent>,
}

impl EventQueue {
    /// Everything queued so far, without blocking
    #[must_use]
    pub fn drain(&self) -> Vec<ViewerEvent> {
        self.rx.try_iter().collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Block up to `timeout` for the next event
    #[must_use]
    pub fn wait(&self, timeout: Duration) -> Option<ViewerEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}

#[must_use]
pub fn channel() -> (Notifier, EventQueue) {
    let (tx, rx) = flume::unbounded();
    (Notifier { tx }, EventQueue { rx })
}
