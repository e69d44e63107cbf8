//! Typed field access over `serde_json::Value` that records errors instead
//! of returning early.
//!
//! Every accessor pushes at most one error for the field it inspects and
//! returns `None` when the field is absent or invalid. JSON `null` counts as
//! absent for scalars and objects.

use std::ops::RangeInclusive;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::intake::error::{FieldError, FieldErrorReason};

pub(crate) type Object = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Presence {
    Required,
    Optional,
}

/// Join a parent path and a key.
pub(crate) fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Default)]
pub(crate) struct Walker {
    errors: Vec<FieldError>,
}

impl Walker {
    pub fn fail(&mut self, path: impl Into<String>, reason: FieldErrorReason, message: impl Into<String>) {
        self.errors.push(FieldError::new(path, reason, message));
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    /// Fetch `key`, reporting it as missing when required.
    fn lookup<'v>(&mut self, obj: &'v Object, key: &str, path: &str, presence: Presence) -> Option<&'v Value> {
        match obj.get(key) {
            Some(Value::Null) | None => {
                if presence == Presence::Required {
                    self.fail(path, FieldErrorReason::Missing, "field is required");
                }
                None
            }
            Some(value) => Some(value),
        }
    }

    fn wrong_type(&mut self, path: &str, expected: &str, found: &Value) {
        self.fail(
            path,
            FieldErrorReason::WrongType,
            format!("expected {expected}, found {}", json_type(found)),
        );
    }

    pub fn object<'v>(&mut self, obj: &'v Object, parent: &str, key: &str, presence: Presence) -> Option<&'v Object> {
        let path = join(parent, key);
        match self.lookup(obj, key, &path, presence)? {
            Value::Object(map) => Some(map),
            other => {
                self.wrong_type(&path, "object", other);
                None
            }
        }
    }

    /// A string whose trimmed length (in characters) lies within `len`.
    pub fn string<'v>(
        &mut self,
        obj: &'v Object,
        parent: &str,
        key: &str,
        presence: Presence,
        len: RangeInclusive<usize>,
    ) -> Option<&'v str> {
        let path = join(parent, key);
        let value = self.lookup(obj, key, &path, presence)?;
        let Value::String(s) = value else {
            self.wrong_type(&path, "string", value);
            return None;
        };
        self.check_len(&path, s, &len).then_some(s.as_str())
    }

    fn check_len(&mut self, path: &str, s: &str, len: &RangeInclusive<usize>) -> bool {
        let count = s.trim().chars().count();
        if count < *len.start() {
            let message = if count == 0 {
                "must not be blank".to_string()
            } else {
                format!("must be at least {} characters", len.start())
            };
            self.fail(path, FieldErrorReason::TooShort, message);
            false
        } else if count > *len.end() {
            self.fail(path, FieldErrorReason::TooLong, format!("must be at most {} characters", len.end()));
            false
        } else {
            true
        }
    }

    pub fn integer(
        &mut self,
        obj: &Object,
        parent: &str,
        key: &str,
        presence: Presence,
        range: RangeInclusive<i64>,
    ) -> Option<i64> {
        let path = join(parent, key);
        let value = self.lookup(obj, key, &path, presence)?;
        let Some(n) = value.as_i64() else {
            self.wrong_type(&path, "integer", value);
            return None;
        };
        if !range.contains(&n) {
            self.fail(
                &path,
                FieldErrorReason::OutOfRange,
                format!("must be between {} and {}", range.start(), range.end()),
            );
            return None;
        }
        Some(n)
    }

    pub fn boolean(&mut self, obj: &Object, parent: &str, key: &str, presence: Presence) -> Option<bool> {
        let path = join(parent, key);
        let value = self.lookup(obj, key, &path, presence)?;
        match value.as_bool() {
            Some(b) => Some(b),
            None => {
                self.wrong_type(&path, "boolean", value);
                None
            }
        }
    }

    /// An enumeration value, matched exactly through its serde representation.
    pub fn variant<T: DeserializeOwned>(
        &mut self,
        obj: &Object,
        parent: &str,
        key: &str,
        presence: Presence,
    ) -> Option<T> {
        let path = join(parent, key);
        let value = self.lookup(obj, key, &path, presence)?;
        if !value.is_string() {
            self.wrong_type(&path, "string", value);
            return None;
        }
        match serde_json::from_value::<T>(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                self.fail(&path, FieldErrorReason::UnknownVariant, e.to_string());
                None
            }
        }
    }

    /// A list of strings. Absent is an empty list; `null` is a type error.
    pub fn string_list<'v>(
        &mut self,
        obj: &'v Object,
        parent: &str,
        key: &str,
        items: RangeInclusive<usize>,
        item_len: RangeInclusive<usize>,
    ) -> Vec<(String, &'v str)> {
        let path = join(parent, key);
        let Some(value) = obj.get(key) else {
            if *items.start() > 0 {
                self.fail(&path, FieldErrorReason::Missing, "field is required");
            }
            return Vec::new();
        };
        let Value::Array(array) = value else {
            self.wrong_type(&path, "array of strings", value);
            return Vec::new();
        };

        if array.len() < *items.start() {
            self.fail(
                &path,
                FieldErrorReason::TooShort,
                format!("must contain at least {} item(s)", items.start()),
            );
        } else if array.len() > *items.end() {
            self.fail(
                &path,
                FieldErrorReason::TooLong,
                format!("must contain at most {} items", items.end()),
            );
        }

        let mut out = Vec::with_capacity(array.len());
        for (i, item) in array.iter().enumerate() {
            let item_path = format!("{path}[{i}]");
            match item {
                Value::String(s) => {
                    if self.check_len(&item_path, s, &item_len) {
                        out.push((item_path, s.as_str()));
                    }
                }
                other => self.wrong_type(&item_path, "string", other),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Object {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("fixture must be an object"),
        }
    }

    #[test]
    fn test_collects_one_error_per_field() {
        let o = obj(json!({ "age": "twenty", "name": "", "flag": null }));
        let mut w = Walker::default();

        assert_eq!(w.integer(&o, "profile", "age", Presence::Required, 12..=100), None);
        assert_eq!(w.string(&o, "profile", "name", Presence::Required, 1..=10), None);
        assert_eq!(w.boolean(&o, "profile", "flag", Presence::Required), None);
        assert_eq!(w.boolean(&o, "profile", "other", Presence::Optional), None);

        let errors = w.into_errors();
        let summary: Vec<_> = errors.iter().map(|e| (e.path.as_str(), e.reason)).collect();
        assert_eq!(
            summary,
            vec![
                ("profile.age", FieldErrorReason::WrongType),
                ("profile.name", FieldErrorReason::TooShort),
                ("profile.flag", FieldErrorReason::Missing),
            ]
        );
    }

    #[test]
    fn test_string_list_reports_item_paths() {
        let o = obj(json!({ "meds": ["ibuprofen", 7, " "] }));
        let mut w = Walker::default();
        let items = w.string_list(&o, "ctx", "meds", 0..=10, 1..=50);

        assert_eq!(items, vec![("ctx.meds[0]".to_string(), "ibuprofen")]);
        let errors = w.into_errors();
        assert_eq!(errors[0].path, "ctx.meds[1]");
        assert_eq!(errors[1].path, "ctx.meds[2]");
    }

    #[test]
    fn test_range_boundaries_are_inclusive() {
        let o = obj(json!({ "low": 12, "high": 100, "over": 101 }));
        let mut w = Walker::default();
        assert_eq!(w.integer(&o, "", "low", Presence::Required, 12..=100), Some(12));
        assert_eq!(w.integer(&o, "", "high", Presence::Required, 12..=100), Some(100));
        assert_eq!(w.integer(&o, "", "over", Presence::Required, 12..=100), None);
        assert_eq!(w.into_errors()[0].reason, FieldErrorReason::OutOfRange);
    }
}
