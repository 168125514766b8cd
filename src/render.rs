//! Overlay rendering.
//!
//! Every render starts from a blank surface and redraws everything; there is
//! no diffing against the previous frame. Rendering is split into a pure
//! planning step ([`plan_overlay`]), which decides where each stone goes, and
//! a painting step ([`paint`]), which only talks to the [`Surface`].
//!
//! Stones drawn:
//! - every cell occupied by a historical move except the current one, at the
//!   pixel position it was last seen at;
//! - every pre-positioned stone whose cell is not occupied, mapped through
//!   the inferred geometry;
//! - the current move, in its player's colour, labelled with its move number.

use log::{debug, warn};

use crate::config::OverlayConfig;
use crate::constants::{
    BLACK_FILL, CROSSHAIR_STROKE, CROSSHAIR_WIDTH, CURRENT_OUTLINE, CURRENT_OUTLINE_WIDTH,
    MIN_STEPS_TO_RENDER, PLACED_FILL, WHITE_FILL,
};
use crate::geometry::{SkipReason, infer_geometry};
use crate::mapper::{CoordinateMapper, OccupiedCells, prepos_points};
use crate::model::{ModelSnapshot, PixelPoint, StoneModel};
use crate::surface::{Color, Surface, TRANSPARENT, parse_hex_color};

/// The move being played, drawn on top of everything else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentStone {
    pub point: PixelPoint,
    /// 1-based; equal to the history length.
    pub move_number: usize,
    pub is_black: bool,
}

/// Everything one render will draw.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPlan {
    pub spacing: f64,
    pub radius: f64,
    pub placed: Vec<PixelPoint>,
    pub prepositioned: Vec<PixelPoint>,
    pub current: Option<CurrentStone>,
}

impl OverlayPlan {
    /// Placed and pre-positioned stones that will actually be drawn.
    pub fn stones(&self) -> impl Iterator<Item = &PixelPoint> {
        self.placed
            .iter()
            .chain(self.prepositioned.iter())
            .filter(|p| p.is_drawable())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Drawn {
        stones: usize,
        current_move: Option<usize>,
    },
    Skipped(SkipReason),
}

/// Whether move `move_number` (1-based) is played by black. Colours alternate
/// every move, starting with black when `start_black` is set.
pub fn is_black_move(start_black: bool, move_number: usize) -> bool {
    start_black == (move_number % 2 == 1)
}

/// Decide what to draw for `snapshot`, or why nothing can be drawn.
pub fn plan_overlay(snapshot: &ModelSnapshot, config: &OverlayConfig) -> Result<OverlayPlan, SkipReason> {
    let geometry = infer_geometry(&snapshot.steps, config)?;
    let mapper = CoordinateMapper::from(&geometry);

    let occupied = OccupiedCells::from_history(&snapshot.steps);
    let prepositioned = prepos_points(&snapshot.prepos, &occupied, &mapper);

    let move_number = snapshot.steps.len();
    let current = snapshot
        .steps
        .last()
        .and_then(|step| step.pixel())
        .filter(|point| point.is_drawable())
        .map(|point| CurrentStone {
            point,
            move_number,
            is_black: is_black_move(snapshot.start_black, move_number),
        });

    Ok(OverlayPlan {
        spacing: geometry.spacing,
        radius: geometry.spacing * config.radius_factor,
        placed: occupied.points().to_vec(),
        prepositioned,
        current,
    })
}

/// Resolved colours for painting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub placed: Color,
    pub crosshair: Color,
    pub black: Color,
    pub white: Color,
    pub outline: Color,
}

impl OverlayStyle {
    /// Resolve the configured colours. An unparsable colour falls back to the
    /// built-in one.
    pub fn from_config(config: &OverlayConfig) -> Self {
        let resolve = |configured: &str, default: &str| {
            parse_hex_color(configured).unwrap_or_else(|| {
                warn!("ignoring invalid colour {configured:?}, using {default}");
                parse_hex_color(default).unwrap_or(TRANSPARENT)
            })
        };
        let colors = &config.colors;
        Self {
            placed: resolve(&colors.placed, PLACED_FILL),
            crosshair: resolve(&colors.crosshair, CROSSHAIR_STROKE),
            black: resolve(&colors.black, BLACK_FILL),
            white: resolve(&colors.white, WHITE_FILL),
            outline: resolve(&colors.outline, CURRENT_OUTLINE),
        }
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self::from_config(&OverlayConfig::default())
    }
}

/// Draw `plan` onto `surface`. Does not clear first.
pub fn paint(surface: &mut dyn Surface, plan: &OverlayPlan, style: &OverlayStyle) {
    let r = plan.radius;

    for p in plan.stones() {
        let (cx, cy) = (p.px, p.py);
        surface.fill_circle(cx, cy, r, style.placed);
        surface.stroke_line((cx + 0.5, cy - r), (cx + 0.5, cy + r), CROSSHAIR_WIDTH, style.crosshair);
        surface.stroke_line((cx - r, cy + 0.5), (cx + r, cy + 0.5), CROSSHAIR_WIDTH, style.crosshair);
    }

    if let Some(current) = &plan.current {
        let (cx, cy) = (current.point.px, current.point.py);
        let (fill, label) = if current.is_black {
            (style.black, style.white)
        } else {
            (style.white, style.black)
        };
        surface.fill_circle(cx, cy, r, fill);
        surface.stroke_circle(cx, cy, r, CURRENT_OUTLINE_WIDTH, style.outline);
        surface.fill_text_centered(&current.move_number.to_string(), cx, cy, r.floor(), label);
    }
}

/// Redraw the whole overlay for the model's current state.
///
/// With fewer than two history entries the surface is left untouched. Once
/// there are enough entries the surface is cleared, and if no step can anchor
/// the geometry it stays blank.
pub fn render_overlay(
    surface: &mut dyn Surface,
    model: &StoneModel,
    config: &OverlayConfig,
) -> RenderOutcome {
    let snapshot = model.snapshot();
    if snapshot.steps.len() < MIN_STEPS_TO_RENDER {
        debug!("render skipped: {} steps", snapshot.steps.len());
        return RenderOutcome::Skipped(SkipReason::TooFewSteps);
    }

    surface.clear();

    let plan = match plan_overlay(&snapshot, config) {
        Ok(plan) => plan,
        Err(reason) => {
            debug!("render skipped: {reason:?}");
            return RenderOutcome::Skipped(reason);
        }
    };

    paint(surface, &plan, &OverlayStyle::from_config(config));

    let outcome = RenderOutcome::Drawn {
        stones: plan.stones().count(),
        current_move: plan.current.map(|c| c.move_number),
    };
    debug!("rendered {outcome:?} with spacing {}", plan.spacing);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GridCoord, Step};
    use crate::surface::RasterSurface;

    fn snapshot(steps: Vec<Step>) -> ModelSnapshot {
        ModelSnapshot {
            steps,
            prepos: Vec::new(),
            start_black: true,
        }
    }

    #[test]
    fn test_color_parity() {
        assert!(is_black_move(true, 1));
        assert!(!is_black_move(true, 2));
        assert!(is_black_move(true, 3));
        assert!(!is_black_move(false, 1));
        assert!(is_black_move(false, 2));
    }

    #[test]
    fn test_plan_basic() {
        let snap = snapshot(vec![
            Step::new(0.0, 0.0, 100.0, 100.0),
            Step::new(1.0, 0.0, 140.0, 100.0),
        ]);
        let plan = plan_overlay(&snap, &OverlayConfig::default()).unwrap();
        assert_eq!(plan.spacing, 40.0);
        assert!((plan.radius - 20.4).abs() < 1e-9);
        assert_eq!(plan.placed, vec![PixelPoint::new(100.0, 100.0)]);
        assert_eq!(
            plan.current,
            Some(CurrentStone {
                point: PixelPoint::new(140.0, 100.0),
                move_number: 2,
                is_black: false,
            })
        );
    }

    #[test]
    fn test_plan_counts_unusable_steps() {
        let snap = snapshot(vec![
            Step::new(0.0, 0.0, 100.0, 100.0),
            Step::default(),
            Step { px: Some(60.0), py: Some(60.0), ..Step::default() },
        ]);
        let plan = plan_overlay(&snap, &OverlayConfig::default()).unwrap();
        assert_eq!(plan.spacing, 40.0);
        assert_eq!(plan.current.unwrap().move_number, 3);
        assert!(plan.current.unwrap().is_black);
    }

    #[test]
    fn test_plan_current_needs_nonzero_pixels() {
        let snap = snapshot(vec![
            Step::new(0.0, 0.0, 100.0, 100.0),
            Step::new(1.0, 0.0, 0.0, 100.0),
        ]);
        let plan = plan_overlay(&snap, &OverlayConfig::default()).unwrap();
        assert_eq!(plan.current, None);
    }

    #[test]
    fn test_plan_prepos_suppressed_by_history() {
        let mut snap = snapshot(vec![
            Step::new(3.0, 3.0, 130.0, 130.0),
            Step::new(4.0, 3.0, 170.0, 130.0),
        ]);
        snap.prepos = vec![vec![GridCoord { x: 3, y: 3 }, GridCoord { x: 5, y: 5 }]];
        let plan = plan_overlay(&snap, &OverlayConfig::default()).unwrap();
        assert_eq!(plan.placed.len(), 1);
        assert_eq!(plan.prepositioned, vec![PixelPoint::new(50.0, 210.0)]);
    }

    #[test]
    fn test_plan_prepos_not_suppressed_by_current_move() {
        let mut snap = snapshot(vec![
            Step::new(0.0, 0.0, 100.0, 100.0),
            Step::new(1.0, 0.0, 140.0, 100.0),
        ]);
        snap.prepos = vec![vec![GridCoord { x: 1, y: 0 }]];
        let plan = plan_overlay(&snap, &OverlayConfig::default()).unwrap();
        assert_eq!(plan.prepositioned.len(), 1);
    }

    #[test]
    fn test_render_too_few_steps_leaves_surface() {
        let root = crate::host::HostValue::from_json(&serde_json::json!({
            "step_history": [{"x": 0, "y": 0, "px": 5, "py": 5}]
        }));
        let model = crate::locator::find_stone_model(&root).unwrap();
        let mut surface = RasterSurface::new(10, 10);
        surface.fill_circle(5.0, 5.0, 2.0, image::Rgba([1, 2, 3, 255]));
        let before = surface.clone();
        let outcome = render_overlay(&mut surface, &model, &OverlayConfig::default());
        assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::TooFewSteps));
        assert_eq!(surface, before);
    }

    #[test]
    fn test_paint_current_stone_colors() {
        let plan = OverlayPlan {
            spacing: 40.0,
            radius: 20.4,
            placed: Vec::new(),
            prepositioned: Vec::new(),
            current: Some(CurrentStone {
                point: PixelPoint::new(50.0, 50.0),
                move_number: 1,
                is_black: true,
            }),
        };
        let style = OverlayStyle::default();
        let mut surface = RasterSurface::new(100, 100);
        paint(&mut surface, &plan, &style);
        // Inside the stone, away from the label.
        assert_eq!(surface.pixel(50, 36), Some(style.black));
        // On the outline.
        assert_eq!(surface.pixel(70, 50), Some(style.outline));
        assert_eq!(surface.pixel(5, 5), Some(TRANSPARENT));
        let white = surface.image().pixels().filter(|&&p| p == style.white).count();
        assert!(white > 0, "label should be drawn in white");
    }

    #[test]
    fn test_paint_placed_stone_has_crosshair() {
        let plan = OverlayPlan {
            spacing: 40.0,
            radius: 20.4,
            placed: vec![PixelPoint::new(50.0, 50.0)],
            prepositioned: Vec::new(),
            current: None,
        };
        let style = OverlayStyle::default();
        let mut surface = RasterSurface::new(100, 100);
        paint(&mut surface, &plan, &style);
        assert_eq!(surface.pixel(50, 40), Some(style.crosshair));
        assert_eq!(surface.pixel(40, 50), Some(style.crosshair));
        assert_eq!(surface.pixel(45, 45), Some(style.placed));
    }

    #[test]
    fn test_invalid_style_color_falls_back() {
        let mut config = OverlayConfig::default();
        config.colors.placed = "tomato".to_string();
        let style = OverlayStyle::from_config(&config);
        assert_eq!(style.placed, parse_hex_color(PLACED_FILL).unwrap());
    }
}
