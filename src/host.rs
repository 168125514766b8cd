//! Host object graph.
//!
//! The overlay never owns the game state; it reads it out of whatever the host
//! page exposes. This module models that state as a graph of shared objects
//! with identity, so that the graph may contain cycles and properties whose
//! accessors fail, exactly like a live page global.
//!
//! - [`HostValue`] - a property value (primitive or object reference)
//! - [`ObjectRef`] - a shared, identity-carrying object or array
//!
//! Graphs are built either programmatically ([`ObjectRef::set`],
//! [`ObjectRef::push`]) or from a JSON snapshot ([`HostValue::from_json`]).

use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::rc::Rc;

use serde_json::Value;

/// Error raised when reading a property whose accessor fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyError {
    pub key: String,
    pub message: String,
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reading '{}' failed: {}", self.key, self.message)
    }
}

impl std::error::Error for PropertyError {}

/// Error raised while loading a JSON snapshot of the host state.
#[derive(Debug)]
pub enum SnapshotError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Io(e) => write!(f, "cannot read snapshot: {e}"),
            SnapshotError::Json(e) => write!(f, "malformed snapshot: {e}"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Io(e) => Some(e),
            SnapshotError::Json(e) => Some(e),
        }
    }
}

impl From<io::Error> for SnapshotError {
    fn from(e: io::Error) -> Self {
        SnapshotError::Io(e)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Json(e)
    }
}

/// A value stored in a host property.
#[derive(Clone, Debug)]
pub enum HostValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Object(ObjectRef),
}

impl HostValue {
    /// Build a graph from a parsed JSON document.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => HostValue::Null,
            Value::Bool(b) => HostValue::Bool(*b),
            Value::Number(n) => HostValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => HostValue::Str(s.clone()),
            Value::Array(items) => {
                let array = ObjectRef::new_array();
                for item in items {
                    array.push(HostValue::from_json(item));
                }
                HostValue::Object(array)
            }
            Value::Object(map) => {
                let object = ObjectRef::new_object();
                for (key, item) in map {
                    object.set(key, HostValue::from_json(item));
                }
                HostValue::Object(object)
            }
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            HostValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness as the host page's script sees it: `null`, `false`, `0`,
    /// `NaN` and `""` are falsy, everything else (objects included) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            HostValue::Null => false,
            HostValue::Bool(b) => *b,
            HostValue::Number(n) => *n != 0.0 && !n.is_nan(),
            HostValue::Str(s) => !s.is_empty(),
            HostValue::Object(_) => true,
        }
    }
}

/// Objects compare by identity, primitives by value.
impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Number(a), HostValue::Number(b)) => a == b,
            (HostValue::Str(a), HostValue::Str(b)) => a == b,
            (HostValue::Object(a), HostValue::Object(b)) => a.same_object(b),
            _ => false,
        }
    }
}

impl From<f64> for HostValue {
    fn from(n: f64) -> Self {
        HostValue::Number(n)
    }
}

impl From<i32> for HostValue {
    fn from(n: i32) -> Self {
        HostValue::Number(f64::from(n))
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::Str(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::Str(s)
    }
}

impl From<ObjectRef> for HostValue {
    fn from(o: ObjectRef) -> Self {
        HostValue::Object(o)
    }
}

impl From<&ObjectRef> for HostValue {
    fn from(o: &ObjectRef) -> Self {
        HostValue::Object(o.clone())
    }
}

enum Slot {
    Value(HostValue),
    /// Accessor that fails with the given message whenever it is read.
    Throws(String),
}

struct HostObject {
    is_array: bool,
    /// Properties in insertion order. Array elements are keyed "0", "1", ...
    slots: Vec<(String, Slot)>,
}

/// Shared handle to a host object. Cloning the handle does not clone the
/// object; two handles are the same object iff [`ObjectRef::same_object`].
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<HostObject>>);

impl ObjectRef {
    pub fn new_object() -> Self {
        Self::with_kind(false)
    }

    pub fn new_array() -> Self {
        Self::with_kind(true)
    }

    fn with_kind(is_array: bool) -> Self {
        ObjectRef(Rc::new(RefCell::new(HostObject {
            is_array,
            slots: Vec::new(),
        })))
    }

    pub fn is_array(&self) -> bool {
        self.0.borrow().is_array
    }

    /// Identity of the underlying object, stable for its lifetime.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn same_object(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Set a property, replacing any previous value (or accessor) in place.
    pub fn set(&self, key: &str, value: impl Into<HostValue>) {
        self.put(key, Slot::Value(value.into()));
    }

    /// Install an accessor that fails with `message` on every read.
    pub fn set_throwing(&self, key: &str, message: &str) {
        self.put(key, Slot::Throws(message.to_string()));
    }

    fn put(&self, key: &str, slot: Slot) {
        let mut obj = self.0.borrow_mut();
        match obj.slots.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = slot,
            None => obj.slots.push((key.to_string(), slot)),
        }
    }

    /// Append an element, keyed by the current length.
    pub fn push(&self, value: impl Into<HostValue>) {
        let key = self.len().to_string();
        self.set(&key, value);
    }

    /// Read a property. `Ok(None)` means the property does not exist.
    pub fn get(&self, key: &str) -> Result<Option<HostValue>, PropertyError> {
        let obj = self.0.borrow();
        match obj.slots.iter().find(|(k, _)| k == key) {
            None => Ok(None),
            Some((_, Slot::Value(v))) => Ok(Some(v.clone())),
            Some((_, Slot::Throws(message))) => Err(PropertyError {
                key: key.to_string(),
                message: message.clone(),
            }),
        }
    }

    /// Property names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().slots.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Array elements in index order; each read may fail independently.
    pub fn elements(&self) -> Vec<Result<Option<HostValue>, PropertyError>> {
        (0..self.len()).map(|i| self.get(&i.to_string())).collect()
    }

    /// Bring this object in line with a newer JSON snapshot without replacing
    /// nested objects, so references held elsewhere keep pointing at live data.
    /// Keys absent from `value` are left untouched.
    pub fn merge_json(&self, value: &Value) {
        let entries: Vec<(String, &Value)> = match value {
            Value::Array(items) if self.is_array() => items
                .iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), item))
                .collect(),
            Value::Object(map) if !self.is_array() => {
                map.iter().map(|(k, v)| (k.clone(), v)).collect()
            }
            _ => return,
        };
        for (key, item) in entries {
            let existing = self.get(&key).ok().flatten();
            match (existing, item) {
                (Some(HostValue::Object(child)), Value::Array(_)) if child.is_array() => {
                    child.merge_json(item);
                }
                (Some(HostValue::Object(child)), Value::Object(_)) if !child.is_array() => {
                    child.merge_json(item);
                }
                _ => self.set(&key, HostValue::from_json(item)),
            }
        }
    }
}

/// Prints identity and shape only; the graph may be cyclic.
impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_array() { "array" } else { "object" };
        write!(f, "ObjectRef({kind}#{:x}, {} keys)", self.id(), self.len())
    }
}

fn read_snapshot(path: &Path) -> Result<Value, SnapshotError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Read and parse a JSON snapshot of the host state.
pub fn load_snapshot(path: &Path) -> Result<HostValue, SnapshotError> {
    Ok(HostValue::from_json(&read_snapshot(path)?))
}

/// Load a snapshot into `root`.
///
/// A plain object already in `root` is refreshed in place when the snapshot
/// is an object too, so models found in it earlier keep seeing new data. In
/// every other case `root` is replaced. On error `root` is left as it was.
pub fn refresh_snapshot(root: &mut Option<HostValue>, path: &Path) -> Result<(), SnapshotError> {
    let value = read_snapshot(path)?;
    if let Some(HostValue::Object(existing)) = root.as_ref() {
        if !existing.is_array() && value.is_object() {
            existing.merge_json(&value);
            return Ok(());
        }
    }
    *root = Some(HostValue::from_json(&value));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_replaces_in_place() {
        let obj = ObjectRef::new_object();
        obj.set("a", 1);
        obj.set("b", 2);
        obj.set("a", 3);
        assert_eq!(obj.keys(), vec!["a", "b"]);
        assert_eq!(obj.get("a").unwrap(), Some(HostValue::Number(3.0)));
    }

    #[test]
    fn test_missing_property_is_none() {
        let obj = ObjectRef::new_object();
        assert_eq!(obj.get("nope").unwrap(), None);
    }

    #[test]
    fn test_throwing_accessor() {
        let obj = ObjectRef::new_object();
        obj.set_throwing("secret", "SecurityError");
        let err = obj.get("secret").unwrap_err();
        assert_eq!(err.key, "secret");
        assert!(err.to_string().contains("SecurityError"));
    }

    fn scratch(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("stone-overlay-host-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_refresh_snapshot_merges_objects() {
        let path = scratch("merge.json", r#"{"game": {"step_history": [1]}}"#);
        let mut root = None;
        refresh_snapshot(&mut root, &path).unwrap();
        let first = root.as_ref().unwrap().as_object().unwrap().clone();
        let game = first.get("game").unwrap().unwrap();

        fs::write(&path, r#"{"game": {"step_history": [1, 2]}}"#).unwrap();
        refresh_snapshot(&mut root, &path).unwrap();
        let second = root.as_ref().unwrap().as_object().unwrap();
        assert!(first.same_object(second));
        assert_eq!(second.get("game").unwrap(), Some(game));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_refresh_snapshot_replaces_array_root() {
        let path = scratch("array.json", "[1, 2]");
        let mut root = None;
        refresh_snapshot(&mut root, &path).unwrap();
        let first = root.as_ref().unwrap().as_object().unwrap().clone();
        assert!(first.is_array());

        refresh_snapshot(&mut root, &path).unwrap();
        let second = root.as_ref().unwrap().as_object().unwrap();
        assert!(!first.same_object(second));
        assert_eq!(second.len(), 2);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_refresh_snapshot_error_keeps_root() {
        let path = scratch("bad.json", "{");
        let mut root = Some(HostValue::Number(1.0));
        let err = refresh_snapshot(&mut root, &path).unwrap_err();
        assert!(err.to_string().starts_with("malformed snapshot"));
        assert_eq!(root, Some(HostValue::Number(1.0)));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_truthiness() {
        assert!(!HostValue::Null.is_truthy());
        assert!(!HostValue::Number(0.0).is_truthy());
        assert!(!HostValue::Number(f64::NAN).is_truthy());
        assert!(!HostValue::from("").is_truthy());
        assert!(HostValue::Number(1.0).is_truthy());
        assert!(HostValue::from("yes").is_truthy());
        assert!(HostValue::from(ObjectRef::new_array()).is_truthy());
    }

    #[test]
    fn test_identity() {
        let a = ObjectRef::new_object();
        let b = a.clone();
        let c = ObjectRef::new_object();
        assert!(a.same_object(&b));
        assert!(!a.same_object(&c));
        assert_eq!(HostValue::from(&a), HostValue::from(&b));
        assert_ne!(HostValue::from(&a), HostValue::from(&c));
    }

    #[test]
    fn test_cycle_debug_terminates() {
        let a = ObjectRef::new_object();
        a.set("self", &a);
        let printed = format!("{a:?}");
        assert!(printed.starts_with("ObjectRef(object#"));
    }

    #[test]
    fn test_from_json_arrays() {
        let root = HostValue::from_json(&json!({"list": [1, "x", null]}));
        let list = root.as_object().unwrap().get("list").unwrap().unwrap();
        let list = list.as_object().unwrap();
        assert!(list.is_array());
        assert_eq!(list.len(), 3);
        assert_eq!(list.get("1").unwrap(), Some(HostValue::Str("x".into())));
    }

    #[test]
    fn test_from_json_keeps_document_order() {
        let root = HostValue::from_json(&json!({"z": 1, "a": 2}));
        assert_eq!(root.as_object().unwrap().keys(), vec!["z", "a"]);
    }

    #[test]
    fn test_merge_json_preserves_nested_identity() {
        let root = HostValue::from_json(&json!({"game": {"step_history": [{"x": 0}]}}));
        let root = root.as_object().unwrap().clone();
        let game = root.get("game").unwrap().unwrap();
        let history = game.as_object().unwrap().get("step_history").unwrap().unwrap();

        root.merge_json(&json!({"game": {"step_history": [{"x": 0}, {"x": 1}]}}));

        let game_after = root.get("game").unwrap().unwrap();
        assert_eq!(game, game_after);
        let history = history.as_object().unwrap();
        assert_eq!(history.len(), 2);
    }
}
