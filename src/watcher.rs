//! The observe/reset loop state.
//!
//! [`OverlayWatcher`] holds everything that survives between two polls: the
//! discovered model, the history length at the last render, the last known
//! position of the host's board canvas and the overlay surface itself. All of
//! it is written only by [`OverlayWatcher::observe`] and cleared only by
//! [`OverlayWatcher::reset`].

use std::fmt;

use log::{debug, info};

use crate::config::OverlayConfig;
use crate::host::HostValue;
use crate::locator::find_stone_model;
use crate::model::StoneModel;
use crate::render::{RenderOutcome, render_overlay};
use crate::surface::RasterSurface;

/// Position and size of the host's board canvas.
///
/// `left`/`top` are page coordinates (viewport position plus scroll offset),
/// `width`/`height` the on-screen box, and `pixel_width`/`pixel_height` the
/// size of the canvas's backing buffer, which the overlay copies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl BoardRect {
    /// A canvas whose backing buffer matches its on-screen size.
    pub fn new(left: f64, top: f64, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width: f64::from(width),
            height: f64::from(height),
            pixel_width: width,
            pixel_height: height,
        }
    }

    /// Whether the overlay has to be moved or resized to follow `other`.
    fn differs_from(&self, other: &BoardRect) -> bool {
        self.left != other.left
            || self.top != other.top
            || self.width != other.width
            || self.height != other.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveOutcome {
    /// No game model in the host graph yet.
    ModelNotFound,
    /// The history has not grown since the last observation.
    Unchanged { steps: usize },
    /// The history grew but the overlay is hidden.
    Hidden { steps: usize },
    /// The history grew but the host has no board canvas to follow.
    NoBoard { steps: usize },
    Rendered(RenderOutcome),
}

impl fmt::Display for ObserveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObserveOutcome::ModelNotFound => write!(f, "model not found"),
            ObserveOutcome::Unchanged { steps } => write!(f, "unchanged at {steps} steps"),
            ObserveOutcome::Hidden { steps } => write!(f, "hidden at {steps} steps"),
            ObserveOutcome::NoBoard { steps } => write!(f, "no board at {steps} steps"),
            ObserveOutcome::Rendered(RenderOutcome::Drawn { stones, current_move }) => {
                write!(f, "drew {stones} stones")?;
                match current_move {
                    Some(n) => write!(f, ", current move {n}"),
                    None => Ok(()),
                }
            }
            ObserveOutcome::Rendered(RenderOutcome::Skipped(reason)) => {
                write!(f, "skipped: {reason}")
            }
        }
    }
}

pub struct OverlayWatcher {
    config: OverlayConfig,
    model: Option<StoneModel>,
    last_step_count: usize,
    board: Option<BoardRect>,
    surface: Option<RasterSurface>,
    visible: bool,
}

impl Default for OverlayWatcher {
    fn default() -> Self {
        Self::new(OverlayConfig::default())
    }
}

impl OverlayWatcher {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            model: None,
            last_step_count: 0,
            board: None,
            surface: None,
            visible: true,
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn model(&self) -> Option<&StoneModel> {
        self.model.as_ref()
    }

    pub fn last_step_count(&self) -> usize {
        self.last_step_count
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn surface(&self) -> Option<&RasterSurface> {
        self.surface.as_ref()
    }

    /// Page position of the overlay, once it exists.
    pub fn overlay_position(&self) -> Option<(f64, f64)> {
        match (&self.surface, &self.board) {
            (Some(_), Some(board)) => Some((board.left, board.top)),
            _ => None,
        }
    }

    /// One poll: find the model if needed, detect growth, and redraw on growth.
    ///
    /// The step counter advances on growth whether or not anything gets drawn,
    /// so a hidden overlay or a missing board does not cause a redraw burst
    /// later on.
    pub fn observe(&mut self, root: &HostValue, board: Option<BoardRect>) -> ObserveOutcome {
        // Discovery runs until a model turns up, then never again before reset
        if self.model.is_none() {
            self.model = find_stone_model(root);
        }
        let Some(model) = &self.model else {
            return ObserveOutcome::ModelNotFound;
        };

        // Only strict growth triggers a render
        let steps = model.step_count();
        if steps <= self.last_step_count {
            return ObserveOutcome::Unchanged { steps };
        }
        debug!("history grew from {} to {steps}", self.last_step_count);
        self.last_step_count = steps;

        if !self.visible {
            return ObserveOutcome::Hidden { steps };
        }
        let Some(board) = board else {
            return ObserveOutcome::NoBoard { steps };
        };

        // Follow the board if it moved or was resized
        if self.board.is_none_or(|cached| cached.differs_from(&board)) {
            info!(
                "placing overlay at ({}, {}) size {}x{}",
                board.left, board.top, board.pixel_width, board.pixel_height
            );
            self.board = Some(board);
            self.surface = None;
        }
        let surface = self
            .surface
            .get_or_insert_with(|| RasterSurface::new(board.pixel_width, board.pixel_height));

        ObserveOutcome::Rendered(render_overlay(surface, model, &self.config))
    }

    /// Show or hide the overlay; returns the new visibility. Cached model and
    /// geometry are kept.
    pub fn toggle_visibility(&mut self) -> bool {
        self.visible = !self.visible;
        debug!("overlay {}", if self.visible { "shown" } else { "hidden" });
        self.visible
    }

    /// Drop every cached value and the surface. The next `observe` starts
    /// over with discovery.
    pub fn reset(&mut self) {
        info!("resetting overlay state");
        self.model = None;
        self.last_step_count = 0;
        self.board = None;
        self.surface = None;
    }

    /// The host board moved or was resized: re-place the overlay on the next
    /// render.
    pub fn invalidate_geometry(&mut self) {
        self.board = None;
    }
}
