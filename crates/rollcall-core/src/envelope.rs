//! Response envelope decoding
//!
//! The remote store does not fix its response shapes. Each read is resolved
//! into an explicit variant, in priority order, before any field is touched.
//! No shape is ever an error: the last variant is always `Fallback`.

use serde_json::{Map, Value};

/// Shape of a list response (roster or history)
#[derive(Debug, Clone, PartialEq)]
pub enum RosterEnvelope {
    /// Top-level JSON array
    BareArray(Vec<Value>),
    /// Object wrapping the array under `items`, `data`, or `data.items`
    Wrapped {
        /// Entries
        items: Vec<Value>,
        /// Remote summary object, if supplied alongside
        summary: Option<Value>,
    },
    /// Anything else
    Fallback,
}

impl RosterEnvelope {
    /// Resolve the envelope shape of a document
    #[must_use]
    pub fn decode(doc: Value) -> Self {
        match doc {
            Value::Array(items) => Self::BareArray(items),
            Value::Object(mut map) => {
                let top_summary = take_object(&mut map, "summary");

                if let Some(Value::Array(items)) = map.remove("items") {
                    return Self::Wrapped {
                        items,
                        summary: top_summary,
                    };
                }

                match map.remove("data") {
                    Some(Value::Array(items)) => Self::Wrapped {
                        items,
                        summary: top_summary,
                    },
                    Some(Value::Object(mut data)) => {
                        let inner_summary = take_object(&mut data, "summary");
                        match data.remove("items") {
                            Some(Value::Array(items)) => Self::Wrapped {
                                items,
                                summary: top_summary.or(inner_summary),
                            },
                            _ => Self::Fallback,
                        }
                    }
                    _ => Self::Fallback,
                }
            }
            _ => Self::Fallback,
        }
    }

    /// Short name of the resolved shape, for logging
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BareArray(_) => "bare_array",
            Self::Wrapped { .. } => "wrapped",
            Self::Fallback => "fallback",
        }
    }

    /// Entries and optional summary; `Fallback` yields an empty list
    #[must_use]
    pub fn into_parts(self) -> (Vec<Value>, Option<Value>) {
        match self {
            Self::BareArray(items) => (items, None),
            Self::Wrapped { items, summary } => (items, summary),
            Self::Fallback => (Vec::new(), None),
        }
    }
}

/// Shape of a single-record response (session detail)
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnvelope {
    /// `{"data": {...}}`
    Nested(Map<String, Value>),
    /// The record itself
    Flat(Map<String, Value>),
    /// Not an object
    Fallback,
}

impl SessionEnvelope {
    /// Resolve the envelope shape, nested preferred
    #[must_use]
    pub fn decode(doc: Value) -> Self {
        match doc {
            Value::Object(mut map) => match map.remove("data") {
                Some(Value::Object(inner)) => Self::Nested(inner),
                Some(other) => {
                    map.insert("data".to_string(), other);
                    Self::Flat(map)
                }
                None => Self::Flat(map),
            },
            _ => Self::Fallback,
        }
    }

    /// The record, if any
    #[must_use]
    pub fn into_record(self) -> Option<Map<String, Value>> {
        match self {
            Self::Nested(map) | Self::Flat(map) => Some(map),
            Self::Fallback => None,
        }
    }
}

fn take_object(map: &mut Map<String, Value>, key: &str) -> Option<Value> {
    match map.remove(key) {
        Some(value @ Value::Object(_)) => Some(value),
        Some(other) => {
            map.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

/// Identifier from a string or integer value; blank strings are rejected
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-blank string among `keys`
pub(crate) fn first_str(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

/// First integer among `keys`, accepting numbers and numeric strings
pub(crate) fn first_i64(map: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| match map.get(*key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

/// First identifier among `keys`
pub(crate) fn first_id(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| map.get(*key).and_then(id_string))
}
