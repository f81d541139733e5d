use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use folio::pdf::{
    DocumentErrorCode, DocumentSource, Effect, PageRect, Rgb, ScreenRect, ViewerError,
    ViewerEvent, ZoomMode,
};
use folio::test_utils::{
    BrokenClipboard, FakeBackend, FakeDocument, MemoryClipboard, RecordingCanvas,
};
use folio::{Settings, Viewer};

const AREA: ScreenRect = ScreenRect::new(0.0, 0.0, 800.0, 600.0);

fn settings(mode: ZoomMode) -> Settings {
    Settings {
        worker_threads: 2,
        default_zoom_mode: mode,
        ..Settings::default()
    }
}

fn letter(pages: usize) -> FakeDocument {
    FakeDocument::uniform(pages, 612.0, 792.0)
}

fn viewer_with(
    docs: Vec<(&str, Arc<FakeDocument>)>,
    mode: ZoomMode,
) -> (Viewer<RecordingCanvas>, MemoryClipboard) {
    let mut backend = FakeBackend::new();
    for (path, doc) in docs {
        backend.insert(path, doc);
    }
    let clipboard = MemoryClipboard::default();
    let viewer = Viewer::new(
        Box::new(backend),
        Box::new(clipboard.clone()),
        settings(mode),
        AREA,
    );
    (viewer, clipboard)
}

fn wait_for_load(viewer: &mut Viewer<RecordingCanvas>) -> Vec<ViewerEvent> {
    let mut events = Vec::new();
    for _ in 0..200 {
        if !viewer.is_loading() {
            break;
        }
        if let Some(event) = viewer.wait_event(Duration::from_millis(100)).unwrap() {
            events.push(event);
        }
    }
    assert!(!viewer.is_loading(), "document never finished loading");
    events
}

#[test]
fn test_open_has_first_page_immediately() {
    let doc = Arc::new(letter(50).with_delay(Duration::from_millis(2)));
    let (mut viewer, _) = viewer_with(vec![("a.pdf", doc)], ZoomMode::Width);

    viewer.open_document(Path::new("a.pdf")).unwrap();

    let session = viewer.session().unwrap();
    assert!(session.store().is_ready(0));
    assert_eq!(session.page_count(), 50);
    assert!(viewer.is_loading());
    assert_eq!(
        viewer.take_effects(),
        vec![Effect::PageIndicator(1), Effect::SyncScrollbar]
    );
}

#[test]
fn test_scroll_to_sets_first_visible_page() {
    let (mut viewer, _) = viewer_with(vec![("a.pdf", Arc::new(letter(20)))], ZoomMode::Width);
    viewer.open_document(Path::new("a.pdf")).unwrap();
    wait_for_load(&mut viewer);

    viewer.scroll_to(5);
    assert_eq!(viewer.viewport().first_visible(), 5);

    let mut canvas = RecordingCanvas::default();
    let frame = viewer.on_frame(&mut canvas).unwrap();
    assert_eq!(frame[0].0, 5);
    assert_eq!(canvas.draws.len(), frame.len());
    assert!(viewer.take_effects().contains(&Effect::PageIndicator(6)));
}

#[test]
fn test_redrawing_unchanged_view_emits_no_effects() {
    let (mut viewer, _) = viewer_with(vec![("a.pdf", Arc::new(letter(8)))], ZoomMode::Trim);
    viewer.open_document(Path::new("a.pdf")).unwrap();
    wait_for_load(&mut viewer);
    let _ = viewer.take_effects();

    let mut canvas = RecordingCanvas::default();
    viewer.on_frame(&mut canvas).unwrap();
    viewer.on_frame(&mut canvas).unwrap();
    assert!(viewer.take_effects().is_empty());
}

#[test]
fn test_second_open_joins_first_worker() {
    let first = Arc::new(letter(300).with_delay(Duration::from_millis(2)));
    let second = Arc::new(letter(5));
    let (mut viewer, _) = viewer_with(
        vec![("first.pdf", Arc::clone(&first)), ("second.pdf", second)],
        ZoomMode::Width,
    );

    viewer.open_document(Path::new("first.pdf")).unwrap();
    std::thread::sleep(Duration::from_millis(20));
    viewer.open_document(Path::new("second.pdf")).unwrap();

    // The first document's workers are gone: no more calls, no more owners
    let calls = first.rasterize_calls();
    assert!(calls < 300);
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(first.rasterize_calls(), calls);
    assert_eq!(Arc::strong_count(&first), 2);

    let events = wait_for_load(&mut viewer);
    assert!(events.contains(&ViewerEvent::LoadComplete { pages: 5 }));
    assert!(!events.contains(&ViewerEvent::LoadComplete { pages: 300 }));
    assert_eq!(viewer.document_info().unwrap().page_count, 5);
}

#[test]
fn test_failed_open_keeps_current_document() {
    let (mut viewer, _) = viewer_with(
        vec![
            ("good.pdf", Arc::new(letter(4))),
            ("empty.pdf", Arc::new(letter(0))),
            ("broken.pdf", Arc::new(letter(3).failing_on(0))),
        ],
        ZoomMode::Width,
    );
    viewer.open_document(Path::new("good.pdf")).unwrap();
    wait_for_load(&mut viewer);
    viewer.scroll_to(2);

    let err = viewer.open_document(Path::new("missing.pdf")).unwrap_err();
    assert!(matches!(
        err,
        ViewerError::Document(ref e) if e.code == DocumentErrorCode::BadCatalog
    ));
    assert!(!err.is_fatal());

    let err = viewer.open_document(Path::new("empty.pdf")).unwrap_err();
    assert!(matches!(
        err,
        ViewerError::Document(ref e) if e.code == DocumentErrorCode::InvalidDocument
    ));
    assert!(viewer.open_document(Path::new("broken.pdf")).is_err());

    assert_eq!(viewer.document_info().unwrap().page_count, 4);
    assert_eq!(viewer.viewport().first_visible(), 2);
}

#[test]
fn test_load_complete_finalizes_document_info() {
    let (mut viewer, _) = viewer_with(vec![("a.pdf", Arc::new(letter(12)))], ZoomMode::Width);
    viewer.open_document(Path::new("a.pdf")).unwrap();
    let events = wait_for_load(&mut viewer);

    assert!(events.contains(&ViewerEvent::LoadComplete { pages: 12 }));
    let info = viewer.document_info().unwrap();
    assert_eq!(info.ready_pages, 12);
    assert_eq!(info.max_page_size, Some((1224, 1584)));
}

#[test]
fn test_failed_page_is_drawn_as_placeholder() {
    let doc = Arc::new(letter(4).failing_on(1));
    let (mut viewer, _) = viewer_with(vec![("a.pdf", doc)], ZoomMode::Width);
    viewer.open_document(Path::new("a.pdf")).unwrap();
    viewer.set_columns(2);

    let events = wait_for_load(&mut viewer);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ViewerEvent::RasterFailed { page: 1, .. }))
    );

    let mut canvas = RecordingCanvas::default();
    let frame = viewer.on_frame(&mut canvas).unwrap();
    let pages: Vec<usize> = frame.iter().map(|(page, _)| *page).collect();
    assert!(pages.starts_with(&[0, 1]));
    assert!(canvas.fills.iter().any(|(_, color)| *color == Rgb::PLACEHOLDER));
    assert_eq!(canvas.draws.len(), pages.len() - 1);
}

#[test]
fn test_backend_panic_ends_loading_with_worker_error() {
    let doc = Arc::new(letter(6).panicking_on(3));
    let (mut viewer, _) = viewer_with(vec![("a.pdf", doc)], ZoomMode::Width);
    viewer.open_document(Path::new("a.pdf")).unwrap();

    let mut failure = None;
    for _ in 0..50 {
        match viewer.wait_event(Duration::from_millis(100)) {
            Ok(_) if viewer.is_loading() => {}
            Ok(_) => break,
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    let failure = failure.expect("worker panic was not reported");
    assert!(matches!(failure, ViewerError::Worker(ref m) if m.contains("page 3 panicked")));
    assert!(failure.is_fatal());

    // The loader thread may still be unwinding its pool
    for _ in 0..100 {
        if !viewer.is_loading() {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(!viewer.is_loading());
    assert!(!viewer.session().unwrap().store().is_ready(3));
}

#[test]
fn test_selection_matches_direct_extraction() {
    // 36pt of whitespace on every edge: 72 px margins at 144 dpi
    let doc = Arc::new(letter(3).with_ink_inset(36.0));
    let (mut viewer, clipboard) =
        viewer_with(vec![("a.pdf", Arc::clone(&doc))], ZoomMode::Trim);
    viewer.open_document(Path::new("a.pdf")).unwrap();
    wait_for_load(&mut viewer);

    let mut canvas = RecordingCanvas::default();
    let frame = viewer.on_frame(&mut canvas).unwrap();
    let (page, rect) = frame[0];
    assert_eq!(page, 0);

    let (sx0, sy0) = (rect.x + 10.0, rect.y + 20.0);
    let (sx1, sy1) = (rect.x + 110.0, rect.y + 70.0);
    viewer.begin_selection(sx0, sy0);
    viewer.update_selection(sx1 - 50.0, sy1);
    let text = viewer.end_selection(sx1, sy1).unwrap().unwrap();

    let scale = rect.width / 1080.0;
    let to_doc = |screen: f32, origin: f32| ((screen - origin) / scale + 72.0) / 2.0;
    let expected = PageRect {
        x0: to_doc(sx0, rect.x),
        y0: to_doc(sy0, rect.y),
        x1: to_doc(sx1, rect.x),
        y1: to_doc(sy1, rect.y),
    };

    let (logged_page, logged) = doc.extractions()[0];
    assert_eq!(logged_page, 0);
    assert!((logged.x0 - expected.x0).abs() < 0.01);
    assert!((logged.y0 - expected.y0).abs() < 0.01);
    assert!((logged.x1 - expected.x1).abs() < 0.01);
    assert!((logged.y1 - expected.y1).abs() < 0.01);

    assert_eq!(text, doc.extract_text(0, expected).unwrap());
    assert_eq!(clipboard.texts(), vec![text]);
}

#[test]
fn test_selection_outside_pages_is_ignored() {
    let doc = Arc::new(letter(3).with_ink_inset(36.0));
    let (mut viewer, clipboard) =
        viewer_with(vec![("a.pdf", Arc::clone(&doc))], ZoomMode::Trim);
    viewer.open_document(Path::new("a.pdf")).unwrap();
    wait_for_load(&mut viewer);
    let mut canvas = RecordingCanvas::default();
    viewer.on_frame(&mut canvas).unwrap();

    // The uniform margin strip left of the first image
    viewer.begin_selection(2.0, 100.0);
    assert_eq!(viewer.end_selection(300.0, 200.0).unwrap(), None);
    assert!(doc.extractions().is_empty());
    assert!(clipboard.texts().is_empty());
}

#[test]
fn test_clipboard_failure_still_returns_text() {
    let doc = Arc::new(letter(2));
    let mut backend = FakeBackend::new();
    backend.insert("a.pdf", doc);
    let mut viewer: Viewer<RecordingCanvas> = Viewer::new(
        Box::new(backend),
        Box::new(BrokenClipboard),
        settings(ZoomMode::Width),
        AREA,
    );
    viewer.open_document(Path::new("a.pdf")).unwrap();
    let mut canvas = RecordingCanvas::default();
    viewer.on_frame(&mut canvas).unwrap();

    viewer.begin_selection(100.0, 100.0);
    let text = viewer.end_selection(200.0, 150.0).unwrap();
    assert!(text.is_some_and(|t| t.starts_with("p0:")));
}

#[test]
fn test_cache_serves_repeated_frames_without_decompressing() {
    let (mut viewer, _) = viewer_with(vec![("a.pdf", Arc::new(letter(6)))], ZoomMode::Width);
    viewer.open_document(Path::new("a.pdf")).unwrap();
    wait_for_load(&mut viewer);

    let mut canvas = RecordingCanvas::default();
    viewer.on_frame(&mut canvas).unwrap();
    let uploads = canvas.uploads.len();
    canvas.clear_frame();
    viewer.on_frame(&mut canvas).unwrap();

    assert_eq!(canvas.uploads.len(), uploads);
    assert_eq!(canvas.uploads[0].width, 1224);
}

#[test]
fn test_snapshot_survives_reopen() {
    let (mut viewer, _) = viewer_with(vec![("a.pdf", Arc::new(letter(30)))], ZoomMode::Width);
    viewer.open_document(Path::new("a.pdf")).unwrap();
    wait_for_load(&mut viewer);
    viewer.set_columns(2);
    viewer.scroll_to(9);
    viewer.scroll_by(0.5);
    let snapshot = viewer.snapshot();

    viewer.open_document(Path::new("a.pdf")).unwrap();
    wait_for_load(&mut viewer);
    assert_eq!(viewer.viewport().vertical_offset(), 0.0);

    viewer.restore(&snapshot);
    assert_eq!(viewer.snapshot(), snapshot);
    assert_eq!(viewer.viewport().first_visible(), 8);
}
