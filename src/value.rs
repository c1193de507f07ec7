//! Scalar value kinds and their textual representation.
//!
//! Every value is persisted as text: decimal for numerics, `true`/`false`
//! for booleans. Readers coerce the stored text back through the kind
//! they request; text that fails to parse yields the caller's default.
//! This keeps the on-disk format type-agnostic, so the TTL store can
//! hold all kinds uniformly.

use std::fmt;

/// The scalar kinds a store can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    I32,
    I64,
    F32,
    Bool,
}

/// A typed scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    I32(i32),
    I64(i64),
    F32(f32),
    Bool(bool),
}

impl Value {
    /// The kind tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::I32(_) => ValueKind::I32,
            Self::I64(_) => ValueKind::I64,
            Self::F32(_) => ValueKind::F32,
            Self::Bool(_) => ValueKind::Bool,
        }
    }

    /// Render the value to its persisted textual form.
    pub fn render(&self) -> String {
        match self {
            Self::String(v) => v.clone(),
            Self::I32(v) => v.to_string(),
            Self::I64(v) => v.to_string(),
            Self::F32(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
        }
    }

    /// Parse stored text as the requested kind.
    ///
    /// Returns `None` when the text does not represent a value of that
    /// kind. Booleans accept `true`/`false` case-insensitively and
    /// nothing else.
    pub fn parse(kind: ValueKind, text: &str) -> Option<Self> {
        match kind {
            ValueKind::String => Some(Self::String(text.to_string())),
            ValueKind::I32 => text.parse().ok().map(Self::I32),
            ValueKind::I64 => text.parse().ok().map(Self::I64),
            ValueKind::F32 => text.parse().ok().map(Self::F32),
            ValueKind::Bool => parse_bool(text).map(Self::Bool),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::F32(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Strict boolean parse: `true`/`false`, case-insensitive, nothing else.
pub(crate) fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parse stored text as `i32`, falling back to the default.
pub(crate) fn text_as_i32(text: &str, default: i32) -> i32 {
    text.parse().unwrap_or(default)
}

/// Parse stored text as `i64`, falling back to the default.
pub(crate) fn text_as_i64(text: &str, default: i64) -> i64 {
    text.parse().unwrap_or(default)
}

/// Parse stored text as `f32`, falling back to the default.
pub(crate) fn text_as_f32(text: &str, default: f32) -> f32 {
    text.parse().unwrap_or(default)
}

/// Parse stored text as `bool`, falling back to the default.
pub(crate) fn text_as_bool(text: &str, default: bool) -> bool {
    parse_bool(text).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_round_trips_through_parse() {
        let values = [
            Value::String("santiago".to_string()),
            Value::I32(-42),
            Value::I64(1_234_567_890_123),
            Value::F32(2.5),
            Value::Bool(true),
        ];

        for value in values {
            let text = value.render();
            let parsed = Value::parse(value.kind(), &text).unwrap();
            assert_eq!(parsed, value);
        }
    }

    #[test]
    fn bool_parse_is_strict() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("False"), Some(false));
        assert_eq!(parse_bool("1"), None);
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool(" true"), None);
    }

    #[test]
    fn numeric_parse_failure_returns_default() {
        assert_eq!(text_as_i32("not-a-number", 7), 7);
        assert_eq!(text_as_i64("12.5", -1), -1);
        assert_eq!(text_as_f32("abc", 0.25), 0.25);
        assert_eq!(text_as_bool("maybe", false), false);
    }

    #[test]
    fn i32_overflow_returns_default() {
        assert_eq!(text_as_i32("999999999999", 0), 0);
    }
}
