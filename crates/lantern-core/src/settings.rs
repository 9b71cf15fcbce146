//! Host settings store interface.
//!
//! The launcher host provides a typed key-value store for plugin
//! settings. This module defines the narrow seam the engine consumes:
//! typed accessors plus a group convention that scopes per-root settings
//! under their root-path key (`<group>/<key>`), mirroring the way hosts
//! namespace settings by group.
//!
//! [`MemorySettings`] is the in-memory implementation used in tests and
//! by embedding hosts that map their own store onto the trait.

use std::collections::HashMap;

/// A typed settings value.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsValue {
    String(String),
    Bool(bool),
    Int(i64),
    StringList(Vec<String>),
}

/// Build a group-scoped key.
pub fn scoped_key(group: &str, key: &str) -> String {
    format!("{}/{}", group, key)
}

/// The host's key-value settings store, consumed at startup/shutdown and
/// on every user-driven configuration change.
pub trait SettingsStore: Send {
    /// Read a raw value.
    fn get(&self, key: &str) -> Option<SettingsValue>;

    /// Write a raw value.
    fn set(&mut self, key: &str, value: SettingsValue);

    /// Whether a key is present.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Read a string value, if present and of that type.
    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(SettingsValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Read a bool value, if present and of that type.
    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(SettingsValue::Bool(b)) => Some(b),
            _ => None,
        }
    }

    /// Read an integer value, if present and of that type.
    fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(SettingsValue::Int(i)) => Some(i),
            _ => None,
        }
    }

    /// Read a string-list value, if present and of that type.
    fn get_string_list(&self, key: &str) -> Option<Vec<String>> {
        match self.get(key) {
            Some(SettingsValue::StringList(l)) => Some(l),
            _ => None,
        }
    }

    /// Write a string value.
    fn set_string(&mut self, key: &str, value: impl Into<String>)
    where
        Self: Sized,
    {
        self.set(key, SettingsValue::String(value.into()));
    }

    /// Write a bool value.
    fn set_bool(&mut self, key: &str, value: bool)
    where
        Self: Sized,
    {
        self.set(key, SettingsValue::Bool(value));
    }

    /// Write an integer value.
    fn set_i64(&mut self, key: &str, value: i64)
    where
        Self: Sized,
    {
        self.set(key, SettingsValue::Int(value));
    }

    /// Write a string-list value.
    fn set_string_list(&mut self, key: &str, value: Vec<String>)
    where
        Self: Sized,
    {
        self.set(key, SettingsValue::StringList(value));
    }
}

/// In-memory settings store.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: HashMap<String, SettingsValue>,
}

impl MemorySettings {
    /// Create an empty store.
    pub fn new() -> Self {
        MemorySettings {
            values: HashMap::new(),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<SettingsValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: SettingsValue) {
        self.values.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_round_trip() {
        let mut store = MemorySettings::new();
        store.set_string("name", "lantern");
        store.set_bool("enabled", true);
        store.set_i64("depth", 3);
        store.set_string_list("filters", vec![".DS_Store".to_string()]);

        assert_eq!(store.get_string("name"), Some("lantern".to_string()));
        assert_eq!(store.get_bool("enabled"), Some(true));
        assert_eq!(store.get_i64("depth"), Some(3));
        assert_eq!(
            store.get_string_list("filters"),
            Some(vec![".DS_Store".to_string()])
        );
    }

    #[test]
    fn test_type_mismatch_is_none() {
        let mut store = MemorySettings::new();
        store.set_bool("flag", true);
        assert_eq!(store.get_string("flag"), None);
        assert_eq!(store.get_i64("flag"), None);
    }

    #[test]
    fn test_scoped_keys_isolate_groups() {
        let mut store = MemorySettings::new();
        store.set_bool(&scoped_key("/home/a", "indexHidden"), true);
        store.set_bool(&scoped_key("/home/b", "indexHidden"), false);

        assert_eq!(
            store.get_bool(&scoped_key("/home/a", "indexHidden")),
            Some(true)
        );
        assert_eq!(
            store.get_bool(&scoped_key("/home/b", "indexHidden")),
            Some(false)
        );
        assert!(!store.contains("indexHidden"));
    }
}
