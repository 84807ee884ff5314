//! Structured options passed between host and modules
//!
//! Options are an ordered list of registration-keyed values. Lookups by
//! pattern use the same matching rules as interface selection.

use crate::error::{CoreError, Result};
use crate::registration::registration_match;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single option value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// One keyed option
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionEntry {
    /// Registration-style key, e.g. `org/tint/config/rendering_intent`
    pub key: String,
    pub value: Value,
}

/// Ordered set of options
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options {
    entries: Vec<OptionEntry>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Options::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace the entry with exactly this key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = value,
            None => self.entries.push(OptionEntry { key, value }),
        }
    }

    /// Value stored under exactly this key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    /// Best entry whose key matches `pattern`; earlier entries win ties
    pub fn find(&self, pattern: &str) -> Option<&OptionEntry> {
        let mut best: Option<(u32, &OptionEntry)> = None;
        for entry in &self.entries {
            let rank = registration_match(&entry.key, pattern, None);
            if rank > 0 && best.map_or(true, |(r, _)| rank > r) {
                best = Some((rank, entry));
            }
        }
        best.map(|(_, e)| e)
    }

    pub fn find_text(&self, pattern: &str) -> Option<&str> {
        self.find(pattern).and_then(|e| e.value.as_text())
    }

    pub fn find_int(&self, pattern: &str) -> Option<i64> {
        self.find(pattern).and_then(|e| e.value.as_int())
    }

    pub fn find_bool(&self, pattern: &str) -> Option<bool> {
        self.find(pattern).and_then(|e| e.value.as_bool())
    }

    /// Integer lookup that reports what was missing
    pub fn require_int(&self, pattern: &str) -> Result<i64> {
        self.find_int(pattern)
            .ok_or_else(|| CoreError::Option(format!("no integer option matching '{}'", pattern)))
    }

    /// Remove the entry with exactly this key
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|e| e.key == key)?;
        Some(self.entries.remove(index).value)
    }

    /// Copy every entry of `other` into this set, replacing equal keys
    pub fn merge(&mut self, other: &Options) {
        for entry in &other.entries {
            self.set(entry.key.clone(), entry.value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionEntry> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces() {
        let mut opts = Options::new().with("org/tint/config/intent", 0);
        opts.set("org/tint/config/intent", 3);
        assert_eq!(opts.len(), 1);
        assert_eq!(opts.get("org/tint/config/intent"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_find_by_pattern() {
        let opts = Options::new()
            .with("org/tint/config/intent", 1)
            .with("org/tint/config/proof.soft", true)
            .with("org/tint/config/device_name", "lcd");
        assert_eq!(opts.find_int("intent"), Some(1));
        assert_eq!(opts.find_bool("//config/proof"), Some(true));
        assert_eq!(opts.find_text("device_name"), Some("lcd"));
        assert!(opts.find("missing").is_none());
        assert!(opts.require_int("missing").is_err());
    }

    #[test]
    fn test_merge_and_remove() {
        let mut a = Options::new().with("a/b/c", 1);
        let b = Options::new().with("a/b/c", 2).with("a/b/d", "x");
        a.merge(&b);
        assert_eq!(a.get("a/b/c"), Some(&Value::Int(2)));
        assert_eq!(a.remove("a/b/d"), Some(Value::Text("x".into())));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_value_display() {
        let v = Value::List(vec![Value::Int(1), Value::Text("two".into())]);
        assert_eq!(v.to_string(), "[1, two]");
    }
}
