//! Closed host-side representation of values crossing the guest boundary.
//!
//! Guest entry points may return any Rhai value; the host never handles
//! `rhai::Dynamic` directly. Instead every result is converted into the
//! closed [`ScriptValue`] variant set so host code can pattern-match
//! exhaustively. The conversion is total: anything without a natural
//! host representation degrades to [`ScriptValue::Opaque`] carrying the
//! guest type name.

use std::collections::BTreeMap;

use rhai::Dynamic;
use serde::Serialize;

/// A guest value as observed by the host.
///
/// Numbers keep Rhai's integer/float distinction rather than collapsing
/// to one numeric tag: folding `i64` into `f64` would silently lose
/// precision for large integers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScriptValue {
    /// The unit value `()`.
    Unit,
    /// A boolean.
    Bool(bool),
    /// A 64-bit integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// A string (guest characters are widened to one-char strings).
    Str(String),
    /// An ordered sequence.
    Array(Vec<ScriptValue>),
    /// A string-keyed mapping.
    Map(BTreeMap<String, ScriptValue>),
    /// Anything without a host representation; carries the guest type
    /// name for diagnostics.
    Opaque(String),
}

impl ScriptValue {
    /// Converts a Rhai value into its host representation.
    #[must_use]
    pub fn from_dynamic(value: &Dynamic) -> Self {
        if value.is_unit() {
            Self::Unit
        } else if let Ok(flag) = value.as_bool() {
            Self::Bool(flag)
        } else if let Ok(int) = value.as_int() {
            Self::Int(int)
        } else if let Ok(float) = value.as_float() {
            Self::Float(float)
        } else if let Ok(character) = value.as_char() {
            Self::Str(character.to_string())
        } else if value.is_string() {
            Self::Str(value.clone().into_string().unwrap_or_default())
        } else if let Some(array) = value.clone().try_cast::<rhai::Array>() {
            Self::Array(array.iter().map(Self::from_dynamic).collect())
        } else if let Some(map) = value.clone().try_cast::<rhai::Map>() {
            Self::Map(
                map.into_iter()
                    .map(|(key, item)| (key.to_string(), Self::from_dynamic(&item)))
                    .collect(),
            )
        } else {
            Self::Opaque(value.type_name().to_owned())
        }
    }
}

impl std::fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unit => f.write_str("()"),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Int(int) => write!(f, "{int}"),
            Self::Float(float) => write!(f, "{float}"),
            Self::Str(text) => f.write_str(text),
            Self::Array(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (index, (key, item)) in entries.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {item}")?;
                }
                f.write_str("}")
            }
            Self::Opaque(type_name) => write!(f, "<{type_name}>"),
        }
    }
}
