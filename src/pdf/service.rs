//! Document session - owns the page store and the loader thread of one
//! opened document.

use std::sync::Arc;
use std::thread::JoinHandle;

use log::{error, info};

use super::backend::DocumentSource;
use super::error::{DocumentError, ViewerError};
use super::notifier::{self, EventQueue};
use super::store::{PageEntry, PageStore};
use super::worker::{CancellationToken, RasterConfig, RasterJob, VisibleWindow, render_page};

/// A document whose first page is already rasterized but which does not
/// own a page store or worker yet.
///
/// Splitting the open in two lets the caller validate a new document, and
/// only then tear down the previous session.
pub struct PreparedDocument {
    source: Arc<dyn DocumentSource>,
    config: RasterConfig,
    first_page: PageEntry,
}

impl PreparedDocument {
    /// Check the page count and rasterize page 0 on the calling thread
    pub fn prepare(source: Arc<dyn DocumentSource>, config: RasterConfig) -> Result<Self, ViewerError> {
        let page_count = source.page_count();
        if page_count < 1 {
            return Err(DocumentError::invalid("document has no pages").into());
        }

        let first_page = render_page(source.as_ref(), 0, &config)?;
        Ok(Self {
            source,
            config,
            first_page,
        })
    }

    /// Allocate the page store and start rasterizing pages 1..N
    pub fn start(self) -> Result<DocumentSession, ViewerError> {
        let page_count = self.source.page_count();
        let store = Arc::new(PageStore::with_page_count(page_count)?);
        store.publish(0, self.first_page);

        let (notifier, events) = notifier::channel();
        let cancel = CancellationToken::new();
        let window = Arc::new(VisibleWindow::default());

        let job = RasterJob {
            source: Arc::clone(&self.source),
            store: Arc::clone(&store),
            config: self.config,
            window: Arc::clone(&window),
            cancel: cancel.clone(),
            notifier,
        };
        let worker = std::thread::Builder::new()
            .name("folio-loader".into())
            .spawn(move || job.run())
            .map_err(|e| ViewerError::Worker(format!("could not spawn loader thread: {e}")))?;

        info!("Opened document with {page_count} pages");

        Ok(DocumentSession {
            source: self.source,
            store,
            window,
            cancel,
            worker: Some(worker),
            events,
        })
    }
}

pub struct DocumentSession {
    source: Arc<dyn DocumentSource>,
    store: Arc<PageStore>,
    window: Arc<VisibleWindow>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
    events: EventQueue,
}

impl DocumentSession {
    /// Open a document: page 0 synchronously, the rest in the background
    pub fn open(source: Arc<dyn DocumentSource>, config: RasterConfig) -> Result<Self, ViewerError> {
        PreparedDocument::prepare(source, config)?.start()
    }

    #[must_use]
    pub fn store(&self) -> &PageStore {
        &self.store
    }

    #[must_use]
    pub fn source(&self) -> &dyn DocumentSource {
        self.source.as_ref()
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.store.page_count()
    }

    #[must_use]
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Tell the rasterizer which pages are on screen
    pub fn set_visible(&self, first: usize, last: usize) {
        self.window.set(first, last);
    }

    /// True while the loader thread is still running
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Request cancellation and wait for the loader thread to stop.
    /// Idempotent.
    pub fn close(&mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Loader thread panicked");
            }
            info!(
                "Closed document ({} of {} pages were ready)",
                self.store.ready_count(),
                self.store.page_count()
            );
        }
    }
}

impl Drop for DocumentSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::notifier::ViewerEvent;
    use super::*;
    use crate::test_utils::FakeDocument;

    fn config() -> RasterConfig {
        RasterConfig {
            threads: 2,
            ..RasterConfig::default()
        }
    }

    #[test]
    fn empty_document_is_rejected() {
        let source: Arc<dyn DocumentSource> = Arc::new(FakeDocument::uniform(0, 10.0, 10.0));
        let err = DocumentSession::open(source, config()).err().unwrap();
        assert!(matches!(err, ViewerError::Document(_)));
    }

    #[test]
    fn first_page_is_ready_when_open_returns() {
        let doc = FakeDocument::uniform(30, 50.0, 50.0).with_delay(Duration::from_millis(1));
        let source: Arc<dyn DocumentSource> = Arc::new(doc);
        let session = DocumentSession::open(source, config()).unwrap();

        assert!(session.store().is_ready(0));
        assert_eq!(session.page_count(), 30);
    }

    #[test]
    fn page_zero_failure_aborts_open() {
        let source: Arc<dyn DocumentSource> =
            Arc::new(FakeDocument::uniform(3, 50.0, 50.0).failing_on(0));
        assert!(DocumentSession::open(source, config()).is_err());
    }

    #[test]
    fn load_completes_and_loader_exits() {
        let source: Arc<dyn DocumentSource> = Arc::new(FakeDocument::uniform(10, 40.0, 40.0));
        let session = DocumentSession::open(source, config()).unwrap();

        let event = session.events().wait(Duration::from_secs(10));
        let mut events: Vec<_> = event.into_iter().collect();
        while !events.contains(&ViewerEvent::LoadComplete { pages: 10 }) {
            match session.events().wait(Duration::from_secs(10)) {
                Some(e) => events.push(e),
                None => panic!("load never completed"),
            }
        }
        assert_eq!(session.store().ready_count(), 10);
    }

    #[test]
    fn close_joins_worker_and_releases_source() {
        let doc = FakeDocument::uniform(300, 40.0, 40.0).with_delay(Duration::from_millis(2));
        let source: Arc<dyn DocumentSource> = Arc::new(doc);
        let mut session = DocumentSession::open(Arc::clone(&source), config()).unwrap();
        std::thread::sleep(Duration::from_millis(10));

        session.close();
        assert!(!session.is_loading());
        drop(session);
        assert_eq!(Arc::strong_count(&source), 1);
    }
}
