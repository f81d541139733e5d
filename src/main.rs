use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use simplelog::{Config, LevelFilter, WriteLogger};

use folio::clipboard::SystemClipboard;
use folio::panic_handler::{die, initialize_panic_handler};
use folio::pdf::{
    Canvas, Clipboard, ClipboardError, Effect, MupdfBackend, Rgb, ScreenRect, ViewerError,
    ZoomMode,
};
use folio::{Settings, Viewer};

/// Open a document headlessly, lay out one frame and report what would be drawn
#[derive(Parser)]
#[command(name = "folio", version)]
struct Args {
    /// Document to open
    file: PathBuf,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 800.0)]
    width: f32,

    #[arg(long, default_value_t = 600.0)]
    height: f32,

    /// Pages per row, 1 to 5
    #[arg(short, long)]
    columns: Option<usize>,

    /// trim, width, page, page_trim or custom
    #[arg(short, long)]
    zoom_mode: Option<ZoomMode>,

    /// Custom zoom factor (implies custom zoom mode)
    #[arg(long)]
    zoom: Option<f32>,

    /// 1-based page to scroll to
    #[arg(short, long)]
    page: Option<usize>,

    /// Selection rectangle in screen pixels: x0 y0 x1 y1
    #[arg(long, num_args = 4, value_names = ["X0", "Y0", "X1", "Y1"])]
    select: Option<Vec<f32>>,

    /// Copy the selected text to the system clipboard
    #[arg(long)]
    copy: bool,

    /// Seconds to wait for every page to be rasterized
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    #[arg(long, default_value = "folio.log")]
    log_file: PathBuf,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

/// Canvas that keeps only what the report needs
#[derive(Default)]
struct FrameCanvas {
    uploads: usize,
    draws: usize,
    placeholders: usize,
}

impl Canvas for FrameCanvas {
    type Image = (u32, u32);

    fn upload_image(&mut self, _pixels: &[u8], width: u32, height: u32) -> Self::Image {
        self.uploads += 1;
        (width, height)
    }

    fn fill_rect(&mut self, _rect: ScreenRect, color: Rgb) {
        if color == Rgb::PLACEHOLDER {
            self.placeholders += 1;
        }
    }

    fn draw_image(&mut self, _image: &Self::Image, _rect: ScreenRect) {
        self.draws += 1;
    }
}

/// Clipboard used when `--copy` is not given
struct NoClipboard;

impl Clipboard for NoClipboard {
    fn set_text(&mut self, _text: String) -> Result<(), ClipboardError> {
        Ok(())
    }
}

fn fatal_or(err: ViewerError) -> anyhow::Error {
    if err.is_fatal() {
        die(&err);
    }
    err.into()
}

fn main() -> Result<()> {
    let args = Args::parse();

    WriteLogger::init(args.log_level, Config::default(), File::create(&args.log_file)?)?;
    initialize_panic_handler();
    info!("Starting folio");

    let settings = match &args.config {
        Some(path) => Settings::load_from_path(path),
        None => Settings::load(),
    };
    let clipboard: Box<dyn Clipboard> = if args.copy {
        Box::new(SystemClipboard)
    } else {
        Box::new(NoClipboard)
    };
    let area = ScreenRect::new(0.0, 0.0, args.width, args.height);
    let mut viewer: Viewer<FrameCanvas> =
        Viewer::new(Box::new(MupdfBackend), clipboard, settings, area);

    viewer.open_document(&args.file).map_err(fatal_or)?;

    let deadline = Instant::now() + Duration::from_secs(args.timeout);
    while viewer.is_loading() && Instant::now() < deadline {
        viewer.wait_event(Duration::from_millis(100)).map_err(fatal_or)?;
    }
    if viewer.is_loading() {
        warn!("Gave up waiting for the rasterizer after {}s", args.timeout);
    }

    if let Some(columns) = args.columns {
        viewer.set_columns(columns);
    }
    if let Some(mode) = args.zoom_mode {
        viewer.set_zoom_mode(mode);
    }
    if let Some(zoom) = args.zoom {
        viewer.set_zoom(zoom);
    }
    if let Some(page) = args.page {
        viewer.scroll_to(page.saturating_sub(1));
    }

    let mut canvas = FrameCanvas::default();
    let frame = viewer.on_frame(&mut canvas).map_err(fatal_or)?;

    if let Some(info) = viewer.document_info() {
        println!(
            "{}: {} pages, {} rasterized",
            args.file.display(),
            info.page_count,
            info.ready_pages
        );
        if let Some((w, h)) = info.max_page_size {
            println!("largest trimmed page: {w}x{h} px");
        }
    }
    for effect in viewer.take_effects() {
        if let Effect::PageIndicator(page) = effect {
            println!("page indicator: {page}");
        }
    }

    let view = viewer.viewport();
    println!(
        "zoom {:.3} ({}), {} column(s), offset {:.3} of {:.3}",
        view.zoom(),
        view.zoom_mode().as_str(),
        view.columns(),
        view.vertical_offset(),
        viewer
            .session()
            .map_or(0.0, |s| view.max_vertical_offset(s.store()))
    );
    for (page, rect) in &frame {
        println!(
            "page {:>4}: x={:.1} y={:.1} w={:.1} h={:.1}",
            page + 1,
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );
    }
    println!(
        "{} images drawn, {} decompressed, {} placeholders",
        canvas.draws, canvas.uploads, canvas.placeholders
    );

    if let Some(corners) = args.select {
        viewer.begin_selection(corners[0], corners[1]);
        match viewer.end_selection(corners[2], corners[3]).map_err(fatal_or)? {
            Some(text) => println!("{text}"),
            None => println!("(selection is not on a drawn page)"),
        }
    }

    Ok(())
}
