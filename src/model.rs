//! Typed, read-only views of the discovered game model.
//!
//! The host owns the model and may change it between two polls, so nothing
//! here caches host data: [`StoneModel`] re-reads on every call and
//! [`ModelSnapshot`] freezes one consistent read for the duration of a render.
//!
//! Reads are forgiving. A missing field, a field of the wrong type or a
//! failing accessor degrades to "absent" for that single value only.

use crate::constants::{PREPOS_KEY, START_BLACK_KEY, STEP_HISTORY_KEY};
use crate::host::{HostValue, ObjectRef, PropertyError};

/// A point in the host surface's pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub px: f64,
    pub py: f64,
}

impl PixelPoint {
    pub fn new(px: f64, py: f64) -> Self {
        Self { px, py }
    }

    /// The host uses 0 for "no position", so a zero or NaN component means the
    /// point cannot be drawn.
    pub fn is_drawable(&self) -> bool {
        let set = |v: f64| v != 0.0 && !v.is_nan();
        set(self.px) && set(self.py)
    }
}

/// One historical move. Any field may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Step {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub px: Option<f64>,
    pub py: Option<f64>,
}

impl Step {
    pub fn new(x: f64, y: f64, px: f64, py: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            px: Some(px),
            py: Some(py),
        }
    }

    /// Read a step out of a history element. Non-objects become empty steps,
    /// which still count toward the move number.
    fn read(element: Result<Option<HostValue>, PropertyError>) -> Self {
        let Ok(Some(HostValue::Object(obj))) = element else {
            return Step::default();
        };
        let number = |key: &str| match obj.get(key) {
            Ok(Some(v)) => v.as_f64(),
            _ => None,
        };
        Step {
            x: number("x"),
            y: number("y"),
            px: number("px"),
            py: number("py"),
        }
    }

    pub fn grid(&self) -> Option<(f64, f64)> {
        Some((self.x?, self.y?))
    }

    pub fn pixel(&self) -> Option<PixelPoint> {
        Some(PixelPoint::new(self.px?, self.py?))
    }

    /// True when the step ties a grid cell to a pixel position.
    pub fn is_anchored(&self) -> bool {
        self.grid().is_some() && self.pixel().is_some()
    }
}

/// A two-letter board coordinate such as `"dd"`; each letter's offset from
/// `'a'` is a zero-based axis index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCoord {
    pub x: i64,
    pub y: i64,
}

impl GridCoord {
    /// Parse a coordinate. Anything that is not exactly two characters long
    /// is rejected.
    pub fn parse(code: &str) -> Option<GridCoord> {
        let mut chars = code.chars();
        let (first, second) = (chars.next()?, chars.next()?);
        if chars.next().is_some() {
            return None;
        }
        let offset = |c: char| c as i64 - 'a' as i64;
        Some(GridCoord {
            x: offset(first),
            y: offset(second),
        })
    }
}

/// One consistent read of the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelSnapshot {
    pub steps: Vec<Step>,
    /// Pre-positioned stones, by group. Malformed codes are already dropped.
    pub prepos: Vec<Vec<GridCoord>>,
    pub start_black: bool,
}

/// Handle to the object that holds the move history.
#[derive(Debug, Clone)]
pub struct StoneModel {
    object: ObjectRef,
}

impl StoneModel {
    pub(crate) fn new(object: ObjectRef) -> Self {
        Self { object }
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    fn array(&self, key: &str) -> Option<ObjectRef> {
        match self.object.get(key) {
            Ok(Some(HostValue::Object(o))) if o.is_array() => Some(o),
            _ => None,
        }
    }

    /// Current history length; 0 if the history is no longer readable.
    pub fn step_count(&self) -> usize {
        self.array(STEP_HISTORY_KEY).map_or(0, |h| h.len())
    }

    pub fn steps(&self) -> Vec<Step> {
        let Some(history) = self.array(STEP_HISTORY_KEY) else {
            return Vec::new();
        };
        history.elements().into_iter().map(Step::read).collect()
    }

    pub fn prepos(&self) -> Vec<Vec<GridCoord>> {
        let Some(groups) = self.array(PREPOS_KEY) else {
            return Vec::new();
        };
        groups
            .elements()
            .into_iter()
            .filter_map(|group| match group {
                Ok(Some(HostValue::Object(g))) if g.is_array() => Some(g),
                _ => None,
            })
            .map(|group| {
                group
                    .elements()
                    .into_iter()
                    .filter_map(|code| match code {
                        Ok(Some(value)) => value.as_str().and_then(GridCoord::parse),
                        _ => None,
                    })
                    .collect()
            })
            .collect()
    }

    pub fn is_start_black(&self) -> bool {
        match self.object.get(START_BLACK_KEY) {
            Ok(Some(value)) => value.is_truthy(),
            _ => false,
        }
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            steps: self.steps(),
            prepos: self.prepos(),
            start_black: self.is_start_black(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model(value: serde_json::Value) -> StoneModel {
        let root = HostValue::from_json(&value);
        StoneModel::new(root.as_object().unwrap().clone())
    }

    #[test]
    fn test_parse_grid_coord() {
        assert_eq!(GridCoord::parse("aa"), Some(GridCoord { x: 0, y: 0 }));
        assert_eq!(GridCoord::parse("dp"), Some(GridCoord { x: 3, y: 15 }));
        assert_eq!(GridCoord::parse("a"), None);
        assert_eq!(GridCoord::parse("abc"), None);
        assert_eq!(GridCoord::parse(""), None);
    }

    #[test]
    fn test_steps_tolerate_partial_entries() {
        let m = model(json!({
            "step_history": [
                {"x": 1, "y": 2, "px": 10, "py": 20},
                {"x": 3, "y": "4"},
                "pass",
                null
            ]
        }));
        let steps = m.steps();
        assert_eq!(steps.len(), 4);
        assert!(steps[0].is_anchored());
        assert_eq!(steps[1].x, Some(3.0));
        assert_eq!(steps[1].y, None);
        assert_eq!(steps[2], Step::default());
        assert_eq!(m.step_count(), 4);
    }

    #[test]
    fn test_throwing_step_field_is_absent() {
        let m = model(json!({"step_history": [{"x": 1, "y": 1, "px": 5, "py": 5}]}));
        let history = m.array(STEP_HISTORY_KEY).unwrap();
        let step = history.get("0").unwrap().unwrap();
        step.as_object().unwrap().set_throwing("px", "boom");
        let steps = m.steps();
        assert_eq!(steps[0].px, None);
        assert!(!steps[0].is_anchored());
    }

    #[test]
    fn test_prepos_skips_malformed() {
        let m = model(json!({
            "step_history": [],
            "prepos": [["dd", "x", 7, "pp"], "not-a-group", ["abc"]]
        }));
        assert_eq!(
            m.prepos(),
            vec![
                vec![GridCoord { x: 3, y: 3 }, GridCoord { x: 15, y: 15 }],
                vec![],
            ]
        );
    }

    #[test]
    fn test_prepos_not_array() {
        let m = model(json!({"step_history": [], "prepos": "dd"}));
        assert!(m.prepos().is_empty());
    }

    #[test]
    fn test_start_black_is_truthy_read() {
        assert!(model(json!({"is_start_black": true})).is_start_black());
        assert!(model(json!({"is_start_black": 1})).is_start_black());
        assert!(model(json!({"is_start_black": "yes"})).is_start_black());
        assert!(!model(json!({"is_start_black": false})).is_start_black());
        assert!(!model(json!({"is_start_black": 0})).is_start_black());
        assert!(!model(json!({"is_start_black": ""})).is_start_black());
        assert!(!model(json!({"is_start_black": null})).is_start_black());
        assert!(!model(json!({})).is_start_black());
    }

    #[test]
    fn test_start_black_throwing_is_false() {
        let m = model(json!({"step_history": []}));
        m.object().set_throwing(START_BLACK_KEY, "boom");
        assert!(!m.is_start_black());
    }

    #[test]
    fn test_pixel_drawable() {
        assert!(PixelPoint::new(1.0, 2.0).is_drawable());
        assert!(!PixelPoint::new(0.0, 2.0).is_drawable());
        assert!(!PixelPoint::new(3.0, f64::NAN).is_drawable());
    }
}
