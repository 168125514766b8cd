//! Constants for overlay geometry, drawing style and polling cadence.
//!
//! These are the defaults behind [`crate::config::OverlayConfig`]. Every value
//! can be overridden from a JSON config file; nothing here is read directly by
//! the render path except through the config.

// =============================================================================
// Geometry
// =============================================================================

/// Spacing (pixels per grid unit) used when the history has no informative
/// pair of adjacent steps.
pub const FALLBACK_SPACING: f64 = 40.0;

/// Stone radius as a fraction of the spacing. Slightly above one half so that
/// neighbouring stones touch and hide the host's anti-aliasing seams.
pub const RADIUS_FACTOR: f64 = 0.51;

/// Minimum number of history entries before anything is drawn.
pub const MIN_STEPS_TO_RENDER: usize = 2;

// =============================================================================
// Model discovery
// =============================================================================

/// Property that identifies the game model inside the host object graph.
pub const STEP_HISTORY_KEY: &str = "step_history";

/// Groups of pre-positioned stones (handicap and setup stones).
pub const PREPOS_KEY: &str = "prepos";

/// Starting colour flag.
pub const START_BLACK_KEY: &str = "is_start_black";

// =============================================================================
// Polling
// =============================================================================

/// Period between two `observe` calls.
pub const POLL_INTERVAL_MS: u64 = 500;

/// Delay before the first `observe` call, giving the host page time to build
/// its model.
pub const INITIAL_DELAY_MS: u64 = 1000;

// =============================================================================
// Drawing style (CSS-style hex colours)
// =============================================================================

/// Fill for stones that are already on the board.
pub const PLACED_FILL: &str = "#e4b45c";

/// Crosshair stroke drawn over placed stones.
pub const CROSSHAIR_STROKE: &str = "#000";

/// Crosshair line width in pixels.
pub const CROSSHAIR_WIDTH: f64 = 1.0;

/// Black stone fill (and label colour on white stones).
pub const BLACK_FILL: &str = "#000";

/// White stone fill (and label colour on black stones).
pub const WHITE_FILL: &str = "#fff";

/// Outline around the current-move stone.
pub const CURRENT_OUTLINE: &str = "#000";

/// Outline width around the current-move stone.
pub const CURRENT_OUTLINE_WIDTH: f64 = 2.0;

// =============================================================================
// Controls
// =============================================================================

/// Key that shows or hides the overlay.
pub const TOGGLE_KEY: char = 't';

/// Key that drops all cached state and restarts discovery.
pub const RESET_KEY: char = 'r';
