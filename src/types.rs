//! Core value types for the preference store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One of the six supported value kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    String,
    Int,
    Long,
    Float,
    Bool,
    StringSet,
}

impl Kind {
    /// Every kind, in declaration order.
    pub const ALL: [Kind; 6] = [
        Kind::String,
        Kind::Int,
        Kind::Long,
        Kind::Float,
        Kind::Bool,
        Kind::StringSet,
    ];

    /// The canonical default value used when a key is absent.
    pub fn default_value(self) -> Value {
        match self {
            Kind::String => Value::String(String::new()),
            Kind::Int => Value::Int(-1),
            Kind::Long => Value::Long(-1),
            Kind::Float => Value::Float(-1.0),
            Kind::Bool => Value::Bool(false),
            Kind::StringSet => Value::StringSet(BTreeSet::new()),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::String => "string",
            Kind::Int => "int",
            Kind::Long => "long",
            Kind::Float => "float",
            Kind::Bool => "bool",
            Kind::StringSet => "string_set",
        };
        write!(f, "{}", name)
    }
}

/// A stored preference value, tagged with its kind.
///
/// Sets use `BTreeSet` so the serialized form is stable across commits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Int(i32),
    Long(i64),
    Float(f64),
    Bool(bool),
    StringSet(BTreeSet<String>),
}

impl Value {
    /// The kind tag of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::String(_) => Kind::String,
            Value::Int(_) => Kind::Int,
            Value::Long(_) => Kind::Long,
            Value::Float(_) => Kind::Float,
            Value::Bool(_) => Kind::Bool,
            Value::StringSet(_) => Kind::StringSet,
        }
    }
}

/// Statically typed view over [`Value`], one impl per supported kind.
///
/// The store and registry are generic over this trait, so a single code
/// path serves all six kinds while call sites keep their static types.
pub trait PrefValue: Clone + Send + Sized + 'static {
    /// The kind tag for this type.
    const KIND: Kind;

    /// The canonical default used when a key is absent and no explicit
    /// default was supplied.
    fn canonical_default() -> Self;

    /// Wrap into the tagged union.
    fn into_value(self) -> Value;

    /// Unwrap from the tagged union. Returns `None` on a kind mismatch.
    fn from_value(value: Value) -> Option<Self>;
}

impl PrefValue for String {
    const KIND: Kind = Kind::String;

    fn canonical_default() -> Self {
        String::new()
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(v) => Some(v),
            _ => None,
        }
    }
}

impl PrefValue for i32 {
    const KIND: Kind = Kind::Int;

    fn canonical_default() -> Self {
        -1
    }

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl PrefValue for i64 {
    const KIND: Kind = Kind::Long;

    fn canonical_default() -> Self {
        -1
    }

    fn into_value(self) -> Value {
        Value::Long(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Long(v) => Some(v),
            _ => None,
        }
    }
}

impl PrefValue for f64 {
    const KIND: Kind = Kind::Float;

    fn canonical_default() -> Self {
        -1.0
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl PrefValue for bool {
    const KIND: Kind = Kind::Bool;

    fn canonical_default() -> Self {
        false
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl PrefValue for BTreeSet<String> {
    const KIND: Kind = Kind::StringSet;

    fn canonical_default() -> Self {
        BTreeSet::new()
    }

    fn into_value(self) -> Value {
        Value::StringSet(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::StringSet(v) => Some(v),
            _ => None,
        }
    }
}

/// Unwrap a tagged value as `T`, reporting the stored kind on mismatch.
pub(crate) fn typed_value<T: PrefValue>(key: &str, value: Value) -> crate::error::Result<T> {
    let found = value.kind();
    T::from_value(value).ok_or_else(|| crate::error::PrefsError::TypeMismatch {
        key: key.to_string(),
        expected: T::KIND,
        found,
    })
}
