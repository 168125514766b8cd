//! Line-oriented control protocol.
//!
//! Drives one [`OverlayWatcher`] from text commands, standing in for the
//! keyboard shortcuts and page events a browser host would deliver. The
//! framing follows GTP: an optional numeric id, a command and its arguments;
//! answers start with `=` on success and `?` on failure, followed by the id
//! and a blank line.
//!
//! ## Supported Commands
//!
//! - `name`, `version`, `protocol_version`, `list_commands`, `known_command <cmd>`, `quit`
//! - `load <file>` - load (or refresh) the host state from a JSON snapshot
//! - `board <left> <top> <width> <height> [<pixel_width> <pixel_height>]`,
//!   `board none` - where the host's board canvas is
//! - `observe` - run one poll
//! - `toggle`, `reset`, `resize` - the host control signals
//! - `status` - watcher state
//! - `save <file>` - write the overlay as PNG
//!
//! A line holding just the toggle or reset key (`t` / `r` by default) acts
//! like the matching command.

use std::io::{self, BufRead, Write};
use std::path::Path;

use log::debug;

use crate::config::OverlayConfig;
use crate::host::{HostValue, refresh_snapshot};
use crate::watcher::{BoardRect, OverlayWatcher};

/// The list of known control commands.
const KNOWN_COMMANDS: &[&str] = &[
    "board",
    "known_command",
    "list_commands",
    "load",
    "name",
    "observe",
    "protocol_version",
    "quit",
    "reset",
    "resize",
    "save",
    "status",
    "toggle",
    "version",
];

pub struct ControlSession {
    watcher: OverlayWatcher,
    /// Host state as last loaded.
    root: Option<HostValue>,
    board: Option<BoardRect>,
}

impl Default for ControlSession {
    fn default() -> Self {
        Self::new(OverlayConfig::default())
    }
}

impl ControlSession {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            watcher: OverlayWatcher::new(config),
            root: None,
            board: None,
        }
    }

    pub fn watcher(&self) -> &OverlayWatcher {
        &self.watcher
    }

    /// Serve commands from `input` until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Parse optional command ID
            let (id, command_line) = Self::parse_id(line);

            // Parse command and arguments
            let parts: Vec<&str> = command_line.split_whitespace().collect();
            let Some((&first, args)) = parts.split_first() else {
                continue;
            };
            // A bare shortcut key stands for its command
            let command = match self.command_for_key(first) {
                Some(mapped) if args.is_empty() => mapped.to_string(),
                _ => first.to_lowercase(),
            };

            // Execute command
            let (success, message) = self.execute(&command, args);

            // Format and send response
            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();

            writeln!(output, "{prefix}{id_str} {message}\n")?;
            output.flush()?;

            // Quit if requested
            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    /// Parse an optional numeric command ID from the beginning of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        if end == 0 {
            return (None, trimmed);
        }
        match trimmed[..end].parse::<u32>() {
            Ok(id) => (Some(id), trimmed[end..].trim()),
            Err(_) => (None, trimmed),
        }
    }

    /// Single-key shortcuts from the config.
    fn command_for_key(&self, word: &str) -> Option<&'static str> {
        let mut chars = word.chars();
        let (key, None) = (chars.next()?, chars.next()) else {
            return None;
        };
        let config = self.watcher.config();
        if key == config.toggle_key {
            Some("toggle")
        } else if key == config.reset_key {
            Some("reset")
        } else {
            None
        }
    }

    /// Execute a command and return (success, response).
    pub fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        debug!("control command {command} {args:?}");
        match command {
            "name" => (true, env!("CARGO_PKG_NAME").to_string()),

            "version" => (true, env!("CARGO_PKG_VERSION").to_string()),

            "protocol_version" => (true, "1".to_string()),

            "list_commands" => (true, KNOWN_COMMANDS.join("\n")),

            "known_command" => match args.first() {
                None => (false, "missing argument".to_string()),
                Some(cmd) => {
                    let known = KNOWN_COMMANDS.contains(&cmd.to_lowercase().as_str());
                    (true, known.to_string())
                }
            },

            "quit" => (true, String::new()),

            "load" => match args.first() {
                None => (false, "missing argument".to_string()),
                Some(path) => match refresh_snapshot(&mut self.root, Path::new(path)) {
                    Ok(()) => (true, String::new()),
                    Err(e) => (false, e.to_string()),
                },
            },

            "board" => self.set_board(args),

            "observe" => match &self.root {
                None => (false, "no snapshot loaded".to_string()),
                Some(root) => {
                    let outcome = self.watcher.observe(root, self.board);
                    (true, outcome.to_string())
                }
            },

            "toggle" => {
                let visible = self.watcher.toggle_visibility();
                (true, if visible { "shown" } else { "hidden" }.to_string())
            }

            "reset" => {
                self.watcher.reset();
                (true, String::new())
            }

            "resize" => {
                self.watcher.invalidate_geometry();
                (true, String::new())
            }

            "status" => (true, self.status()),

            "save" => match (args.first(), self.watcher.surface()) {
                (None, _) => (false, "missing argument".to_string()),
                (Some(_), None) => (false, "no overlay drawn yet".to_string()),
                (Some(path), Some(surface)) => match surface.save_png(Path::new(path)) {
                    Ok(()) => (true, String::new()),
                    Err(e) => (false, format!("cannot save overlay: {e}")),
                },
            },

            _ => (false, format!("unknown command: {command}")),
        }
    }

    fn set_board(&mut self, args: &[&str]) -> (bool, String) {
        if args == ["none"] {
            self.board = None;
            return (true, String::new());
        }
        if args.len() != 4 && args.len() != 6 {
            return (false, "expected <left> <top> <width> <height> [<pixel_width> <pixel_height>]".to_string());
        }
        let Ok(numbers) = args.iter().map(|a| a.parse::<f64>()).collect::<Result<Vec<f64>, _>>() else {
            return (false, "invalid number".to_string());
        };
        let (w, h) = if numbers.len() == 6 {
            (numbers[4], numbers[5])
        } else {
            (numbers[2], numbers[3])
        };
        if w < 0.0 || h < 0.0 || w.fract() != 0.0 || h.fract() != 0.0 {
            return (false, "invalid pixel size".to_string());
        }
        self.board = Some(BoardRect {
            left: numbers[0],
            top: numbers[1],
            width: numbers[2],
            height: numbers[3],
            pixel_width: w as u32,
            pixel_height: h as u32,
        });
        (true, String::new())
    }

    fn status(&self) -> String {
        let model = match self.watcher.model() {
            Some(_) => "found",
            None => "missing",
        };
        let overlay = match (self.watcher.surface(), self.watcher.overlay_position()) {
            (Some(surface), Some((left, top))) => format!(
                "{}x{} at ({left}, {top})",
                surface.image().width(),
                surface.image().height()
            ),
            _ => "none".to_string(),
        };
        format!(
            "model {model}, steps {}, visible {}, overlay {overlay}",
            self.watcher.last_step_count(),
            self.watcher.is_visible()
        )
    }
}
