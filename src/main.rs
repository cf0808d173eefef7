//! roomviz - headless driver
//!
//! Loads a room snapshot (or the starter room), brings up the editor scene on
//! an in-memory surface, optionally routes a click, runs a few animation
//! frames and writes a 3D capture and/or a top-down plan.

use clap::Parser;
use roomviz::app::{Editor, RoomStore};
use roomviz::config::{ConfigError, EditorConfig};
use roomviz::plan::{render_plan_png, PlanView};
use roomviz::render::{HeadlessHost, PointerEvent, RenderError};
use roomviz::scene::serialization::{load_room_from_file, SerializationError};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Room(#[from] SerializationError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Parser, Debug)]
#[command(name = "roomviz")]
#[command(about = "Render a furnished room headlessly to PNG", long_about = None)]
struct Cli {
    /// Room snapshot JSON; the starter room when omitted
    #[arg(long)]
    room: Option<PathBuf>,

    /// Editor config JSON; defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Furniture id to select before rendering
    #[arg(long)]
    select: Option<String>,

    /// Surface size in pixels, as WxH
    #[arg(long, default_value = "1280x720", value_parser = parse_size)]
    size: (u32, u32),

    /// Animation frames to run
    #[arg(long, default_value = "1")]
    frames: u32,

    /// 3D capture output path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Top-down plan output path
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Surface position to click, as X,Y
    #[arg(long, value_parser = parse_click)]
    click: Option<(f64, f64)>,
}

fn parse_pair<T: std::str::FromStr>(value: &str, separator: char) -> Option<(T, T)> {
    let (a, b) = value.split_once(separator)?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    match parse_pair::<u32>(value, 'x') {
        Some((width, height)) if width > 0 && height > 0 => Ok((width, height)),
        _ => Err(format!("expected WxH with non-zero sides, got {value:?}")),
    }
}

fn parse_click(value: &str) -> Result<(f64, f64), String> {
    parse_pair(value, ',').ok_or_else(|| format!("expected X,Y, got {value:?}"))
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => EditorConfig::load_from_file(path)?,
        None => EditorConfig::default(),
    };
    let mut store = match &cli.room {
        Some(path) => RoomStore::with_room(load_room_from_file(path)?),
        None => RoomStore::new(),
    };
    if let Some(id) = &cli.select {
        store.set_selected(Some(id.as_str()));
    }

    let (width, height) = cli.size;
    let mut editor = Editor::new(HeadlessHost::new(width, height), config, store);
    editor.start()?;

    if let Some((x, y)) = cli.click {
        match editor.click(&PointerEvent::click(x, y)) {
            Some(id) => log::info!("Click at ({x}, {y}) selected {id:?}"),
            None => log::info!("Click at ({x}, {y}) hit nothing; selection cleared"),
        }
    }

    for _ in 0..cli.frames.max(1) {
        editor.frame();
    }

    if let Some(path) = &cli.out {
        editor.capture_png(path)?;
    }
    if let Some(path) = &cli.plan {
        let store = editor.store();
        render_plan_png(&PlanView::new(store.room(), store.selected()), path)?;
    }

    if let Some(selected) = editor.store().selected_item() {
        log::info!("Selected: {} ({})", selected.name, selected.id);
    }
    editor.stop();
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
