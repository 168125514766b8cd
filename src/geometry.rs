//! Board geometry inference.
//!
//! The host never states how large a grid cell is on screen. The only ground
//! truth is the history itself: some steps carry both their grid position
//! `(x, y)` and the pixel position `(px, py)` at which they were drawn. Two
//! such steps give a pixels-per-cell estimate from their Manhattan distances,
//! and any one of them anchors the grid frame to the pixel frame.
//!
//! Geometry is recomputed from scratch on every render; it is an estimate and
//! a later history may well yield a different one.

use std::fmt;

use log::debug;

use crate::config::{OverlayConfig, SpacingEstimate};
use crate::constants::MIN_STEPS_TO_RENDER;
use crate::model::Step;

/// A step whose grid and pixel positions are both known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub px: f64,
    pub py: f64,
}

impl Anchor {
    pub fn from_step(step: &Step) -> Option<Anchor> {
        Some(Anchor {
            x: step.x?,
            y: step.y?,
            px: step.px?,
            py: step.py?,
        })
    }
}

/// Spacing and frame anchor used for one render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferredGeometry {
    /// Pixels per grid unit.
    pub spacing: f64,
    pub anchor: Anchor,
}

/// Why a render drew nothing. Both are ordinary early-game states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Fewer history entries than needed to say anything about the board.
    TooFewSteps,
    /// No step ties a grid cell to a pixel position.
    NoAnchor,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooFewSteps => write!(f, "too few steps"),
            SkipReason::NoAnchor => write!(f, "no anchor step"),
        }
    }
}

/// Per-pair spacing estimates, in history order. Pairs where either step is
/// missing a field, or where both steps sit on the same cell, yield nothing.
fn pair_estimates(steps: &[Step]) -> impl Iterator<Item = f64> + '_ {
    steps.windows(2).filter_map(|pair| {
        let a = Anchor::from_step(&pair[0])?;
        let b = Anchor::from_step(&pair[1])?;
        let d_grid = (b.x - a.x).abs() + (b.y - a.y).abs();
        let d_pixels = (b.px - a.px).abs() + (b.py - a.py).abs();
        if d_grid == 0.0 {
            None
        } else {
            Some(d_pixels / d_grid)
        }
    })
}

/// Spacing from the first informative adjacent pair, or `fallback`.
pub fn guess_spacing(steps: &[Step], fallback: f64) -> f64 {
    if steps.len() < 2 {
        return fallback;
    }
    pair_estimates(steps).next().unwrap_or(fallback)
}

/// Median spacing over all informative adjacent pairs, or `fallback`.
pub fn guess_spacing_median(steps: &[Step], fallback: f64) -> f64 {
    let mut estimates: Vec<f64> = pair_estimates(steps).filter(|s| !s.is_nan()).collect();
    if estimates.is_empty() {
        return fallback;
    }
    estimates.sort_by(f64::total_cmp);
    let mid = estimates.len() / 2;
    if estimates.len() % 2 == 1 {
        estimates[mid]
    } else {
        (estimates[mid - 1] + estimates[mid]) / 2.0
    }
}

/// First step, in history order, with all four positional fields.
pub fn find_anchor(steps: &[Step]) -> Option<Anchor> {
    steps.iter().find_map(Anchor::from_step)
}

/// Work out spacing and anchor for a render, or why there can be none.
pub fn infer_geometry(steps: &[Step], config: &OverlayConfig) -> Result<InferredGeometry, SkipReason> {
    if steps.len() < MIN_STEPS_TO_RENDER {
        return Err(SkipReason::TooFewSteps);
    }
    let spacing = match config.spacing_estimate {
        SpacingEstimate::FirstPair => guess_spacing(steps, config.fallback_spacing),
        SpacingEstimate::Median => guess_spacing_median(steps, config.fallback_spacing),
    };
    let anchor = find_anchor(steps).ok_or(SkipReason::NoAnchor)?;
    debug!("inferred spacing {spacing} anchored at {anchor:?}");
    Ok(InferredGeometry { spacing, anchor })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare() -> Step {
        Step::default()
    }

    #[test]
    fn test_spacing_from_first_pair() {
        let steps = [
            Step::new(0.0, 0.0, 100.0, 100.0),
            Step::new(1.0, 0.0, 140.0, 100.0),
        ];
        assert_eq!(guess_spacing(&steps, 40.0), 40.0);
    }

    #[test]
    fn test_spacing_manhattan() {
        let steps = [
            Step::new(2.0, 3.0, 50.0, 80.0),
            Step::new(4.0, 6.0, 110.0, 170.0),
        ];
        // (60 + 90) / (2 + 3)
        assert_eq!(guess_spacing(&steps, 40.0), 30.0);
    }

    #[test]
    fn test_spacing_fallback_short_history() {
        assert_eq!(guess_spacing(&[], 40.0), 40.0);
        assert_eq!(guess_spacing(&[Step::new(0.0, 0.0, 1.0, 1.0)], 40.0), 40.0);
    }

    #[test]
    fn test_spacing_fallback_no_usable_pair() {
        let steps = [Step::new(0.0, 0.0, 1.0, 1.0), bare(), Step::new(5.0, 5.0, 9.0, 9.0)];
        assert_eq!(guess_spacing(&steps, 40.0), 40.0);
    }

    #[test]
    fn test_spacing_skips_same_cell_pair() {
        let steps = [
            Step::new(3.0, 3.0, 10.0, 10.0),
            Step::new(3.0, 3.0, 12.0, 12.0),
            Step::new(4.0, 3.0, 37.0, 12.0),
        ];
        assert_eq!(guess_spacing(&steps, 40.0), 25.0);
    }

    #[test]
    fn test_spacing_first_pair_wins() {
        let steps = [
            Step::new(0.0, 0.0, 0.0, 0.0),
            Step::new(1.0, 0.0, 50.0, 0.0),
            Step::new(2.0, 0.0, 80.0, 0.0),
            Step::new(3.0, 0.0, 110.0, 0.0),
        ];
        assert_eq!(guess_spacing(&steps, 40.0), 50.0);
        assert_eq!(guess_spacing_median(&steps, 40.0), 30.0);
    }

    #[test]
    fn test_median_even_count() {
        let steps = [
            Step::new(0.0, 0.0, 0.0, 0.0),
            Step::new(1.0, 0.0, 20.0, 0.0),
            Step::new(2.0, 0.0, 50.0, 0.0),
        ];
        assert_eq!(guess_spacing_median(&steps, 40.0), 25.0);
    }

    #[test]
    fn test_anchor_is_first_complete_step() {
        let steps = [
            bare(),
            Step { x: Some(1.0), y: Some(1.0), ..bare() },
            Step::new(7.0, 8.0, 70.0, 80.0),
            Step::new(1.0, 1.0, 10.0, 10.0),
        ];
        assert_eq!(
            find_anchor(&steps),
            Some(Anchor { x: 7.0, y: 8.0, px: 70.0, py: 80.0 })
        );
    }

    #[test]
    fn test_infer_geometry_reasons() {
        let config = OverlayConfig::default();
        assert_eq!(
            infer_geometry(&[Step::new(0.0, 0.0, 1.0, 1.0)], &config),
            Err(SkipReason::TooFewSteps)
        );
        assert_eq!(infer_geometry(&[bare(), bare()], &config), Err(SkipReason::NoAnchor));
    }

    #[test]
    fn test_infer_geometry_uses_configured_estimate() {
        let steps = [
            Step::new(0.0, 0.0, 0.0, 0.0),
            Step::new(1.0, 0.0, 50.0, 0.0),
            Step::new(2.0, 0.0, 80.0, 0.0),
            Step::new(3.0, 0.0, 110.0, 0.0),
        ];
        let mut config = OverlayConfig::default();
        assert_eq!(infer_geometry(&steps, &config).unwrap().spacing, 50.0);
        config.spacing_estimate = SpacingEstimate::Median;
        assert_eq!(infer_geometry(&steps, &config).unwrap().spacing, 30.0);
    }
}
