// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Ordered key/value mapping used for metadata, track and stream
//! descriptors, and control-message bodies.
//!
//! Entries are kept in a flat `Vec` rather than a hash map: lookups accept
//! a per-call case-sensitivity choice, so the match mode is not a fixed
//! property of the container that a hash could precompute against, and
//! insertion order has to be exactly preserved through iteration and wire
//! round-trips.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Outcome of a [`Dictionary::set`] call, useful for callers that want to
/// skip redundant downstream work when nothing actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Inserted,
    Replaced,
    Removed,
    /// An entry with the same key and an equal value already existed.
    Unchanged,
    /// The key was absent and the value was `Undefined`: nothing to do.
    NoOp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dictionary {
    entries: Vec<(String, Value)>,
}

impl Dictionary {
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key_matches(a: &str, b: &str, ignore_case: bool) -> bool {
        if ignore_case {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }

    /// Linear scan for `key`, honoring `ignore_case` for this call only.
    #[must_use]
    pub fn find(&self, key: &str, ignore_case: bool) -> Option<usize> {
        self.entries.iter().position(|(k, _)| Self::key_matches(k, key, ignore_case))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.find(key, false).map(|idx| &self.entries[idx].1)
    }

    #[must_use]
    pub fn get_ci(&self, key: &str) -> Option<&Value> {
        self.find(key, true).map(|idx| &self.entries[idx].1)
    }

    pub fn has(&self, key: &str) -> bool {
        self.find(key, false).is_some()
    }

    /// Set `key` to `value`, following these rules:
    /// - `Undefined` removes the entry (or no-ops if it was already absent).
    /// - An equal existing value is a no-op, reported as `Unchanged`.
    /// - Otherwise the slot is overwritten in place, or appended.
    pub fn set(&mut self, key: &str, value: Value) -> SetOutcome {
        self.set_with_match(key, value, false)
    }

    pub fn set_ci(&mut self, key: &str, value: Value) -> SetOutcome {
        self.set_with_match(key, value, true)
    }

    fn set_with_match(&mut self, key: &str, value: Value, ignore_case: bool) -> SetOutcome {
        let existing = self.find(key, ignore_case);

        if value.is_undefined() {
            return match existing {
                Some(idx) => {
                    self.entries.remove(idx);
                    SetOutcome::Removed
                }
                None => SetOutcome::NoOp,
            };
        }

        match existing {
            Some(idx) => {
                if self.entries[idx].1 == value {
                    SetOutcome::Unchanged
                } else {
                    self.entries[idx].1 = value;
                    SetOutcome::Replaced
                }
            }
            None => {
                self.entries.push((key.to_string(), value));
                SetOutcome::Inserted
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.find(key, false).map(|idx| self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn foreach(&self, mut f: impl FnMut(&str, &Value)) {
        for (k, v) in &self.entries {
            f(k, v);
        }
    }

    /// Deep copy: equivalent to `Clone`, spelled out to mirror the
    /// original model's explicit `copy` vs `clone` vocabulary.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Merge `other` into `self`. `priority` keeps `self`'s value on a key
    /// collision (first-wins); otherwise `other`'s value replaces it
    /// (last-wins), matching the merge/replace pair.
    pub fn merge(&mut self, other: &Self, priority: bool) {
        for (k, v) in other.iter() {
            if priority && self.has(k) {
                continue;
            }
            self.set(k, v.clone());
        }
    }

    /// Remove every key present in `keys`.
    pub fn delete_fields(&mut self, keys: &[&str]) {
        self.entries.retain(|(k, _)| !keys.contains(&k.as_str()));
    }

    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::from("{");
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&format!("{k:?}: {v:?}"));
        }
        out.push('}');
        out
    }

    // Typed convenience accessors/setters.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(Value::as_int)
    }

    pub fn set_int(&mut self, key: &str, v: i32) -> SetOutcome {
        self.set(key, Value::Int(v))
    }

    #[must_use]
    pub fn get_long(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_long)
    }

    pub fn set_long(&mut self, key: &str, v: i64) -> SetOutcome {
        self.set(key, Value::Long(v))
    }

    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn set_string(&mut self, key: &str, v: impl Into<String>) -> SetOutcome {
        self.set(key, Value::String(v.into()))
    }

    #[must_use]
    pub fn get_dictionary(&self, key: &str) -> Option<&Self> {
        self.get(key).and_then(Value::as_dictionary)
    }

    pub fn set_dictionary(&mut self, key: &str, v: Self) -> SetOutcome {
        self.set(key, Value::Dictionary(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_undefined_removes() {
        let mut d = Dictionary::new();
        d.set_int("a", 1);
        assert_eq!(d.set("a", Value::Undefined), SetOutcome::Removed);
        assert!(!d.has("a"));
        assert_eq!(d.set("missing", Value::Undefined), SetOutcome::NoOp);
    }

    #[test]
    fn set_preserves_insertion_order_on_replace() {
        let mut d = Dictionary::new();
        d.set_int("a", 1);
        d.set_int("b", 2);
        d.set_int("a", 3);
        let keys: Vec<&str> = d.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(d.get_int("a"), Some(3));
    }

    #[test]
    fn set_equal_value_is_unchanged() {
        let mut d = Dictionary::new();
        d.set_int("a", 1);
        assert_eq!(d.set_int("a", 1), SetOutcome::Unchanged);
    }

    #[test]
    fn find_is_case_insensitive_on_request() {
        let mut d = Dictionary::new();
        d.set_string("Name", "hi");
        assert_eq!(d.find("name", false), None);
        assert_eq!(d.find("name", true), Some(0));
    }

    #[test]
    fn merge_priority_keeps_self() {
        let mut a = Dictionary::new();
        a.set_int("x", 1);
        let mut b = Dictionary::new();
        b.set_int("x", 2);
        b.set_int("y", 3);
        a.merge(&b, true);
        assert_eq!(a.get_int("x"), Some(1));
        assert_eq!(a.get_int("y"), Some(3));
    }

    #[test]
    fn merge_replace_overwrites() {
        let mut a = Dictionary::new();
        a.set_int("x", 1);
        let mut b = Dictionary::new();
        b.set_int("x", 2);
        a.merge(&b, false);
        assert_eq!(a.get_int("x"), Some(2));
    }

    #[test]
    fn delete_fields_removes_listed_keys() {
        let mut d = Dictionary::new();
        d.set_int("a", 1);
        d.set_int("b", 2);
        d.set_int("c", 3);
        d.delete_fields(&["a", "c"]);
        let keys: Vec<&str> = d.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b"]);
    }
}
