//! Stone-Overlay: a synchronized overlay for grid-based stone games.
//!
//! This crate watches a game model living inside a host object graph it does
//! not control, infers the board's on-screen geometry from the model's move
//! history, and paints every known stone onto an overlay surface aligned with
//! the host's board.
//!
//! ## Modules
//!
//! - [`host`] - Host object graph (shared objects with identity, failing accessors)
//! - [`model`] - Read-only typed views of the game model
//! - [`locator`] - Depth-first, cycle-safe discovery of the model
//! - [`geometry`] - Grid spacing and frame anchor inference
//! - [`mapper`] - Grid-coordinate to pixel mapping for pre-positioned stones
//! - [`surface`] - Drawing primitives and the RGBA raster surface
//! - [`render`] - Overlay planning and painting
//! - [`watcher`] - Observe/reset state carried between polls
//! - [`poll`] - Fixed-interval, non-overlapping scheduling
//! - [`control`] - Line protocol for driving a watcher
//! - [`config`] / [`constants`] - Tunables and their defaults
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use stone_overlay::host::HostValue;
//! use stone_overlay::watcher::{BoardRect, ObserveOutcome, OverlayWatcher};
//!
//! let page = HostValue::from_json(&json!({
//!     "app": {"game": {"is_start_black": true, "step_history": [
//!         {"x": 3, "y": 3, "px": 130, "py": 130},
//!         {"x": 15, "y": 15, "px": 610, "py": 610}
//!     ]}}
//! }));
//!
//! let mut watcher = OverlayWatcher::default();
//! let outcome = watcher.observe(&page, Some(BoardRect::new(0.0, 0.0, 760, 760)));
//! assert!(matches!(outcome, ObserveOutcome::Rendered(_)));
//! ```

pub mod config;
pub mod constants;
pub mod control;
pub mod geometry;
pub mod host;
pub mod locator;
pub mod mapper;
pub mod model;
pub mod poll;
pub mod render;
pub mod surface;
pub mod watcher;
