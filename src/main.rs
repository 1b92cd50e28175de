use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, info, warn};
use simplelog::{Config, WriteLogger};

use pagepick::panic_handler::initialize_panic_handler;
use pagepick::preview::{DocumentEngine, ZoomRequest};
use pagepick::settings::{Settings, load_settings};
use pagepick::{
    ColorMode, DocumentStatus, PageSelection, PreviewController, PrintOptions, Sides, ZoomControls,
};

#[derive(Parser)]
#[command(name = "pagepick", about = "Render a print preview and the matching print options")]
#[command(version)]
struct Cli {
    /// Document to preview
    file: PathBuf,

    /// Window size in logical units, as WIDTHxHEIGHT
    #[arg(long, default_value = "800x1000", value_parser = parse_viewport)]
    viewport: (f32, f32),

    /// Additive zoom applied after fitting; repeat to apply several steps
    #[arg(long, allow_hyphen_values = true)]
    zoom: Vec<f32>,

    /// Toolbar zoom steps applied after fitting, each `zoom_step` from the
    /// settings; negative zooms out
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    zoom_steps: i32,

    /// Scroll so this page (1-based) is at the top
    #[arg(long)]
    page: Option<usize>,

    /// Page range to print, e.g. "1-5, 8, 11-13"
    #[arg(long, default_value = "")]
    pages: String,

    #[arg(long, value_enum, default_value_t)]
    color_mode: ColorMode,

    #[arg(long, value_enum, default_value_t)]
    sides: Sides,

    #[arg(long, default_value_t = 1)]
    copies: u32,

    /// Title sent with the job; defaults to the document title
    #[arg(long)]
    title: Option<String>,

    /// Directory the rendered rows are written to
    #[arg(long, default_value = "preview")]
    out: PathBuf,

    /// Settings file to use instead of the user config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the log here instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Seconds to wait for loading and rendering
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

fn parse_viewport(value: &str) -> Result<(f32, f32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
            .ok_or_else(|| format!("invalid dimension {part:?}"))
    };
    Ok((parse(width)?, parse(height)?))
}

fn init_logging(cli: &Cli, settings: &Settings) -> Result<()> {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        settings.log_level_filter()
    };
    let target: Box<dyn Write + Send> = match &cli.log_file {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create log file {path:?}"))?,
        ),
        None => Box::new(io::stderr()),
    };
    WriteLogger::init(level, Config::default(), target)?;
    Ok(())
}

#[cfg(feature = "pdf")]
fn document_engine() -> Result<Arc<dyn DocumentEngine>> {
    Ok(Arc::new(pagepick::pdf::MupdfEngine::new()))
}

#[cfg(not(feature = "pdf"))]
fn document_engine() -> Result<Arc<dyn DocumentEngine>> {
    bail!("pagepick was built without PDF support; rebuild with `--features pdf`")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref());
    init_logging(&cli, &settings)?;
    initialize_panic_handler();

    info!("Starting pagepick");
    let result = run(&cli, &settings);
    if let Err(e) = &result {
        log::error!("pagepick failed: {e:?}");
    }
    info!("Shutting down pagepick");
    result
}

fn run(cli: &Cli, settings: &Settings) -> Result<()> {
    let blob = fs::read(&cli.file).with_context(|| format!("Failed to read {:?}", cli.file))?;
    let timeout = Duration::from_secs(cli.timeout);

    let mut selection = PageSelection::new();
    selection.set_text(cli.pages.clone());
    if selection.is_invalid() {
        warn!("Page range {:?} is not valid, checkboxes disabled", cli.pages);
    }

    let controls = ZoomControls::new();
    let mut controller =
        PreviewController::new(document_engine()?, settings.preview_config(), controls.clone());
    controller.resize(cli.viewport.0, cli.viewport.1);
    controller.set_color_mode(cli.color_mode);
    controller.set_selection(selection.clone());

    controller.open(blob);
    if !controller.wait_until_idle(timeout) {
        warn!("Preview did not settle within {timeout:?}");
    }
    match controller.status() {
        DocumentStatus::Ready { page_count } => info!("Previewing {page_count} pages"),
        DocumentStatus::Failed(message) => bail!("{message}"),
        status => bail!("Document did not load in time ({status:?})"),
    }

    for step in &cli.zoom {
        controls.zoom(ZoomRequest::Delta(*step));
    }
    controller.poll();
    controller.zoom_steps(cli.zoom_steps);
    if let Some(page) = cli.page {
        controller.scroll_to_page(page.saturating_sub(1));
    }
    if !controller.wait_until_idle(timeout) {
        warn!("Rendering did not finish within {timeout:?}");
    }

    write_rows(&mut controller, &cli.out)?;

    let file_name = cli
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let options = PrintOptions {
        sides: cli.sides,
        color_mode: cli.color_mode,
        copies: cli.copies,
        pages: selection.text().to_string(),
        title: cli.title.clone(),
    }
    .resolved(&controls, &file_name);

    println!("{}", serde_json::to_string_pretty(&options)?);
    Ok(())
}

fn write_rows(controller: &mut PreviewController, out: &Path) -> Result<()> {
    fs::create_dir_all(out).with_context(|| format!("Failed to create {out:?}"))?;

    for row in controller.rows() {
        let page = row.layout.index + 1;
        if let Some(overlay) = &row.overlay {
            warn!("Page {page}: {overlay}");
        }
        let Some(image) = controller.present(row.layout.index) else {
            continue;
        };
        let path = out.join(format!("page-{page:04}.png"));
        image
            .save(&path)
            .with_context(|| format!("Failed to write {path:?}"))?;
        let mark = match row.checkbox {
            Some(checkbox) if checkbox.checked => "[x]",
            Some(_) => "[ ]",
            None => "",
        };
        info!("Wrote {path:?} {mark}");
    }
    Ok(())
}
