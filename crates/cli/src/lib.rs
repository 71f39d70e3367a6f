use anyhow::{Context, Result};
use annot_model::{EditorSettings, PageAnnotationSet};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use storage::Storage;
use viewer_core::{DisplayMode, FlipbookViewer};

mod book;
mod logging;
mod script;

use book::BookFile;

#[derive(Debug, Parser)]
#[command(name = "flipbook-cli")]
#[command(about = "Flipbook annotation CLI")]
pub struct Cli {
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable book and annotation metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Render one page's annotation layer to a PNG.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 1.0)]
        zoom: f32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replay a recorded pointer and toolbar script against a book.
    Replay {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        script: PathBuf,
        /// Page to open at; clamped into the book.
        #[arg(long)]
        page: Option<u32>,
        #[arg(long, value_enum, default_value_t = ModeArg::Single)]
        mode: ModeArg,
        /// Write the final annotation set here as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Load settings and saved annotations from, and save edits to, this
        /// directory.
        #[arg(long)]
        storage_dir: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Single,
    Spread,
}

impl From<ModeArg> for DisplayMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Single => Self::Single,
            ModeArg::Spread => Self::Spread,
        }
    }
}

#[derive(Debug, Serialize)]
struct ReplayOutput {
    book_id: String,
    steps: usize,
    ignored_navigation: usize,
    annotation_count: usize,
    undo_depth: usize,
    redo_depth: usize,
    visible_pages: Vec<u32>,
    zoom_percent: u32,
    saved: bool,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    logging::init(cli.verbose);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Render { file, page, zoom, output } => {
            run_render(&file, page, zoom, output.as_deref())
        }
        Commands::Replay { file, script, page, mode, output, storage_dir } => run_replay(
            &file,
            &script,
            page,
            mode.into(),
            output.as_deref(),
            storage_dir.as_deref(),
        ),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_info(file: &Path) -> Result<()> {
    let book = BookFile::load(file)?;
    let payload = book::summarize(&book, &book.annotations);

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn run_render(file: &Path, page: u32, zoom: f32, output: Option<&Path>) -> Result<()> {
    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    let book = BookFile::load(file)?;
    if book.page(page).is_none() {
        anyhow::bail!("book {} has no page {page}", book.book_id);
    }

    let mut viewer = open_viewer(
        &book,
        book.annotations.clone(),
        EditorSettings::default(),
        DisplayMode::Single,
        Some(page),
    )?;
    viewer.set_zoom(zoom);
    viewer.render_pending();

    let surface = viewer
        .surface(page)
        .with_context(|| format!("page {page} was not painted; is its size known?"))?;
    let image = image::RgbaImage::from_raw(surface.width(), surface.height(), surface.to_rgba())
        .context("surface buffer does not match its dimensions")?;

    let output =
        output.map(ToOwned::to_owned).unwrap_or_else(|| default_render_output(file, page));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    image
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());

    Ok(())
}

fn run_replay(
    file: &Path,
    script_path: &Path,
    page: Option<u32>,
    mode: DisplayMode,
    output: Option<&Path>,
    storage_dir: Option<&Path>,
) -> Result<()> {
    let book = BookFile::load(file)?;
    let steps = script::load(script_path)?;

    let storage = storage_dir.map(Storage::with_root);
    let (settings, annotations) = match &storage {
        Some(storage) => {
            let settings = storage.load_settings().context("failed to load settings")?;
            let saved = storage
                .load_annotations(&book.book_id)
                .context("failed to load saved annotations")?;
            let annotations = if saved.is_empty() { book.annotations.clone() } else { saved };
            (settings, annotations)
        }
        None => (EditorSettings::default(), book.annotations.clone()),
    };

    let mut viewer = open_viewer(&book, annotations, settings, mode, page)?;
    if let Some(storage) = storage {
        viewer = viewer.with_sink(Box::new(storage));
    }

    let report = script::replay(&mut viewer, &steps, Instant::now());
    viewer.pointer_leave();
    viewer.render_pending();

    let store = viewer.store();
    let payload = ReplayOutput {
        book_id: book.book_id.to_string(),
        steps: report.steps,
        ignored_navigation: report.ignored_navigation,
        annotation_count: store.annotations().len(),
        undo_depth: store.undo_depth(),
        redo_depth: store.redo_depth(),
        visible_pages: viewer.visible_pages(),
        zoom_percent: (viewer.zoom() * 100.0).round() as u32,
        saved: storage_dir.is_some(),
    };

    let closed = viewer.close();
    let annotations = match &closed {
        Ok(annotations) => annotations,
        Err(error) => &error.annotations,
    };
    if let Some(output) = output {
        write_annotations(output, annotations)?;
    }
    closed.context("failed to save annotations")?;

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn open_viewer(
    book: &BookFile,
    annotations: PageAnnotationSet,
    settings: EditorSettings,
    mode: DisplayMode,
    page: Option<u32>,
) -> Result<FlipbookViewer> {
    let mut viewer = FlipbookViewer::open(
        book.book_id.clone(),
        book.page_infos(),
        annotations,
        settings,
        mode,
        page,
    )
    .context("failed to open book")?;

    for page in &book.pages {
        viewer.page_loaded(page.info.page_number, page.size())?;
    }
    for (page, classification) in &book.classifications {
        viewer.set_classification(*page, *classification);
    }

    Ok(viewer)
}

fn write_annotations(path: &Path, annotations: &PageAnnotationSet) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec_pretty(annotations)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

fn default_render_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("book");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}
