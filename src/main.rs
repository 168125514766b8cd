//! Stone-Overlay command line.
//!
//! Outside a browser the host page is stood in for by a JSON snapshot of its
//! global state.
//!
//! ## Usage
//!
//! - `stone-overlay render <snapshot> --out overlay.png` - Draw one overlay
//! - `stone-overlay watch <snapshot> --out overlay.png` - Poll a snapshot file
//! - `stone-overlay control` - Line protocol on stdin/stdout
//! - `stone-overlay demo` - Draw the overlay for a random game

use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{info, warn};
use serde_json::json;

use stone_overlay::config::OverlayConfig;
use stone_overlay::control::ControlSession;
use stone_overlay::host::{HostValue, ObjectRef, load_snapshot, refresh_snapshot};
use stone_overlay::locator::find_stone_model;
use stone_overlay::poll::Poller;
use stone_overlay::render::{RenderOutcome, render_overlay};
use stone_overlay::surface::RasterSurface;
use stone_overlay::watcher::{BoardRect, ObserveOutcome, OverlayWatcher};

/// Stone-Overlay: numbered stone overlay for grid-based board games
#[derive(Parser)]
#[command(name = "stone-overlay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file overriding the default configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the overlay for one snapshot of the host state
    Render {
        snapshot: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long, default_value_t = 800)]
        width: u32,
        #[arg(long, default_value_t = 800)]
        height: u32,
    },
    /// Poll a snapshot file and redraw whenever the game grows
    Watch {
        snapshot: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long, default_value_t = 800)]
        width: u32,
        #[arg(long, default_value_t = 800)]
        height: u32,
        /// Stop after this many polls
        #[arg(long)]
        ticks: Option<usize>,
    },
    /// Drive the overlay with text commands on stdin
    Control,
    /// Render the overlay of a randomly generated game
    Demo {
        #[arg(short, long, default_value = "demo-overlay.png")]
        out: PathBuf,
        #[arg(long, default_value_t = 40)]
        moves: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => OverlayConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => OverlayConfig::default(),
    };

    match cli.command {
        Some(Commands::Render { snapshot, out, width, height }) => {
            run_render(&config, &snapshot, &out, width, height)
        }
        Some(Commands::Watch { snapshot, out, width, height, ticks }) => {
            run_watch(config, &snapshot, &out, BoardRect::new(0.0, 0.0, width, height), ticks)
        }
        Some(Commands::Control) => {
            let mut session = ControlSession::new(config);
            session.run(io::stdin().lock(), io::stdout())?;
            Ok(())
        }
        Some(Commands::Demo { out, moves, seed }) => run_demo(config, &out, moves, seed),
        None => run_demo(config, Path::new("demo-overlay.png"), 40, None),
    }
}

fn run_render(config: &OverlayConfig, snapshot: &Path, out: &Path, width: u32, height: u32) -> Result<()> {
    let root = load_snapshot(snapshot)
        .with_context(|| format!("loading snapshot {}", snapshot.display()))?;
    let Some(model) = find_stone_model(&root) else {
        bail!("no object with a step_history array in {}", snapshot.display());
    };

    let mut surface = RasterSurface::new(width, height);
    match render_overlay(&mut surface, &model, config) {
        RenderOutcome::Drawn { stones, current_move } => {
            info!("drew {stones} stones, current move {current_move:?}");
        }
        RenderOutcome::Skipped(reason) => warn!("nothing drawn: {reason}"),
    }
    surface
        .save_png(out)
        .with_context(|| format!("writing {}", out.display()))?;
    Ok(())
}

fn run_watch(
    config: OverlayConfig,
    snapshot: &Path,
    out: &Path,
    board: BoardRect,
    ticks: Option<usize>,
) -> Result<()> {
    let mut poller = Poller::from_config(&config);
    if let Some(ticks) = ticks {
        poller = poller.with_max_ticks(ticks);
    }
    let mut watcher = OverlayWatcher::new(config);
    let mut root: Option<HostValue> = None;
    let mut failure = None;

    poller.run(|_| {
        // The file is the page: refresh it in place so the watcher's cached
        // model keeps observing the same objects.
        if let Err(e) = refresh_snapshot(&mut root, snapshot) {
            warn!("{}: {e}", snapshot.display());
            return ControlFlow::Continue(());
        }
        let Some(page) = &root else {
            return ControlFlow::Continue(());
        };

        let outcome = watcher.observe(page, Some(board));
        if let ObserveOutcome::Rendered(_) = outcome {
            info!("{outcome}");
            if let Some(surface) = watcher.surface() {
                if let Err(e) = surface.save_png(out) {
                    failure = Some(anyhow::Error::new(e).context(format!("writing {}", out.display())));
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Build a page-like host graph holding a random game: a cyclic `window`
/// object, a property that cannot be read, and the game a few levels down.
fn random_page(rng: &mut fastrand::Rng, moves: usize) -> HostValue {
    const SIZE: i64 = 19;
    const SPACING: i64 = 32;
    const MARGIN: i64 = 30;

    let mut free: Vec<(i64, i64)> = (0..SIZE).flat_map(|x| (0..SIZE).map(move |y| (x, y))).collect();
    rng.shuffle(&mut free);

    let mut history = Vec::new();
    for (x, y) in free.iter().take(moves) {
        if rng.u8(..) < 8 {
            // A pass carries no position but still takes a move number.
            history.push(json!({}));
        }
        history.push(json!({
            "x": x, "y": y,
            "px": MARGIN + x * SPACING,
            "py": MARGIN + y * SPACING,
        }));
    }

    // Handicap codes are written in the rotated frame around the first move.
    let handicap = [(3, 3), (15, 15), (3, 15), (15, 3)];
    let prepos: Vec<String> = match free.first() {
        Some(&(ox, oy)) => handicap
            .iter()
            .filter(|cell| !free.iter().take(moves).any(|taken| taken == *cell))
            .filter_map(|&(cx, cy)| {
                let gx = cy - oy + ox;
                let gy = ox + oy - cx;
                let letter = |n: i64| char::from_u32(u32::try_from(n).ok()? + 'a' as u32);
                Some(format!("{}{}", letter(gx)?, letter(gy)?))
            })
            .collect(),
        None => Vec::new(),
    };

    let page = HostValue::from_json(&json!({
        "document": {"title": "demo"},
        "app": {"room": {"game": {
            "is_start_black": rng.bool(),
            "step_history": history,
            "prepos": [prepos],
        }}},
    }));
    if let Some(window) = page.as_object() {
        window.set("window", window);
        let storage = ObjectRef::new_object();
        storage.set_throwing("getItem", "SecurityError");
        window.set("localStorage", storage);
    }
    page
}

fn run_demo(config: OverlayConfig, out: &Path, moves: usize, seed: Option<u64>) -> Result<()> {
    println!("Stone-Overlay demo\n");

    let mut rng = match seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };
    let page = random_page(&mut rng, moves.min(19 * 19));
    let board = BoardRect::new(0.0, 0.0, 30 * 2 + 18 * 32, 30 * 2 + 18 * 32);

    let mut watcher = OverlayWatcher::new(config);
    let outcome = watcher.observe(&page, Some(board));
    println!("Observe: {outcome}");

    match watcher.surface() {
        Some(surface) => {
            surface
                .save_png(out)
                .with_context(|| format!("writing {}", out.display()))?;
            println!("Overlay written to {}", out.display());
        }
        None => println!("Nothing to draw for {moves} moves"),
    }
    Ok(())
}
