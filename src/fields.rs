use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::ValidationError;
use crate::keys;

/// Target used for the crate's own diagnostic events.
pub const DIAGNOSTICS_TARGET: &str = "service_event_log::diagnostics";

/// Longest string New Relic accepts as a custom attribute value.
const NEW_RELIC_MAX_STRING: usize = 254;

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Fields(Fields),
    /// A value that cannot be serialized (a callback, a channel, ...).
    /// Kept on construction, dropped when the record is serialized.
    Unsupported(&'static str),
}

impl Value {
    pub fn unsupported(kind: &'static str) -> Self {
        Value::Unsupported(kind)
    }

    /// Short name of the value's kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Fields(_) => "fields",
            Value::Unsupported(kind) => kind,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_fields(&self) -> Option<&Fields> {
        match self {
            Value::Fields(f) => Some(f),
            _ => None,
        }
    }

    fn is_empty_string(&self) -> bool {
        matches!(self, Value::String(s) if s.is_empty())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::UInt(u) => serializer.serialize_u64(*u),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Fields(fields) => fields.serialize(serializer),
            Value::Unsupported(kind) => Err(S::Error::custom(format!(
                "value of kind '{kind}' cannot be serialized"
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::List(_) | Value::Fields(_) => match serde_json::to_string(self) {
                Ok(json) => f.write_str(&json),
                Err(_) => f.write_str("[unserializable]"),
            },
            Value::Unsupported(kind) => write!(f, "<{kind}>"),
        }
    }
}

macro_rules! value_from_int {
    ($variant:ident as $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v as $target)
                }
            }
        )*
    };
}

value_from_int!(Int as i64: i8, i16, i32, i64, isize, u8, u16, u32);
value_from_int!(UInt as u64: u64, usize);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::String(v.clone())
    }
}

impl From<Fields> for Value {
    fn from(v: Fields) -> Self {
        Value::Fields(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Durations serialize as whole nanoseconds.
impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Int(i64::try_from(v.as_nanos()).unwrap_or(i64::MAX))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::String(v.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Fields(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Semantic key/value set attached to an event.
///
/// Keys are unique and iterate in sorted order, which keeps emitted
/// records deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(BTreeMap<String, Value>);

/// Build a [`Fields`] set from `key => value` pairs.
///
/// ```
/// use service_event_log::fields;
///
/// let f = fields! { "user_name" => "ada", "attempts" => 3 };
/// assert_eq!(f.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut fields = $crate::Fields::new();
        $( fields.insert($key, $value); )+
        fields
    }};
}

impl Fields {
    pub fn new() -> Self {
        Fields(BTreeMap::new())
    }

    /// `time_taken` (ISO-8601 duration) and `time_taken_ms` for `duration`.
    pub fn duration(duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        fields! {
            keys::TIME_TAKEN => duration_as_iso8601(duration),
            keys::TIME_TAKEN_MS => millis,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// New set holding `self` overlaid by each of `others` in order; the
    /// later set wins on collision. No input is modified.
    pub fn merge<'a>(&self, others: impl IntoIterator<Item = &'a Fields>) -> Fields {
        let mut merged = self.clone();
        for other in others {
            for (k, v) in other.iter() {
                merged.0.insert(k.clone(), v.clone());
            }
        }
        merged
    }

    /// New set with every key, including keys of nested sets, in snake_case.
    pub fn to_snake_case(&self) -> Fields {
        self.0
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::Fields(nested) => Value::Fields(nested.to_snake_case()),
                    other => other.clone(),
                };
                (to_snake_case(k), v)
            })
            .collect()
    }

    /// Serialize to a single JSON object.
    ///
    /// Unsupported values are dropped first; with `omit_empty`, empty
    /// strings (and nested sets left empty by that) are dropped too.
    /// Failures go to the diagnostic channel and yield `{}`.
    pub fn to_json(&self, omit_empty: bool) -> String {
        let filtered = self.filter_non_serializable();
        let filtered = if omit_empty { filtered.omit_empty() } else { filtered };

        match serde_json::to_string(&filtered) {
            Ok(json) => json,
            Err(err) => {
                tracing::error!(
                    target: DIAGNOSTICS_TARGET,
                    error = %err,
                    stack = %std::backtrace::Backtrace::force_capture(),
                    "failed to serialize log fields to json string"
                );
                "{}".to_string()
            }
        }
    }

    /// Flatten into `key:value` tags. Nested sets contribute their own
    /// entries under their own keys.
    pub fn to_tags(&self, omit_empty: bool) -> Vec<String> {
        let mut tags = Vec::with_capacity(self.len());
        self.collect_tags(omit_empty, &mut tags);
        tags
    }

    fn collect_tags(&self, omit_empty: bool, tags: &mut Vec<String>) {
        for (k, v) in self.iter() {
            match v {
                Value::Fields(nested) => nested.collect_tags(omit_empty, tags),
                v if omit_empty && v.is_empty_string() => {}
                v => tags.push(format!("{k}:{v}")),
            }
        }
    }

    /// Check New Relic's custom attribute rules, reporting the first
    /// offending key.
    pub fn validate_new_relic(&self) -> Result<(), ValidationError> {
        for (k, v) in self.iter() {
            match v {
                Value::Null => return Err(ValidationError::NilValue { key: k.clone() }),
                Value::String(s) if s.chars().count() > NEW_RELIC_MAX_STRING => {
                    return Err(ValidationError::TooLong { key: k.clone() })
                }
                Value::String(_) | Value::Int(_) | Value::UInt(_) | Value::Float(_) => {}
                other => {
                    return Err(ValidationError::UnsupportedType {
                        key: k.clone(),
                        kind: other.kind(),
                    })
                }
            }
        }
        Ok(())
    }

    fn filter_non_serializable(&self) -> Fields {
        self.0
            .iter()
            .filter_map(|(k, v)| match v {
                Value::Unsupported(_) => None,
                Value::Fields(nested) => Some((k.clone(), Value::Fields(nested.filter_non_serializable()))),
                other => Some((k.clone(), other.clone())),
            })
            .collect()
    }

    fn omit_empty(self) -> Fields {
        self.0
            .into_iter()
            .filter_map(|(k, v)| match v {
                Value::Fields(nested) => {
                    let nested = nested.omit_empty();
                    (!nested.is_empty()).then(|| (k, Value::Fields(nested)))
                }
                v if v.is_empty_string() => None,
                v => Some((k, v)),
            })
            .collect()
    }

    pub(crate) fn entry(&mut self, key: &str) -> btree_map::Entry<'_, String, Value> {
        self.0.entry(key.to_string())
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Fields(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Fields {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl IntoIterator for Fields {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Rewrite a key in snake_case.
///
/// Spaces, hyphens and dots become underscores; a word boundary is
/// inserted before an uppercase letter that follows a lowercase letter or
/// digit, or that starts a new word after an acronym (`HTTPServer`).
/// Input that is already snake_case comes back unchanged.
pub fn to_snake_case(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    let mut out = String::with_capacity(key.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, ' ' | '-' | '.') {
            out.push('_');
            continue;
        }
        if !c.is_uppercase() {
            out.push(c);
            continue;
        }
        if i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    out
}

/// `P<seconds>S`, e.g. `P1.456S` for 1456ms.
pub fn duration_as_iso8601(duration: Duration) -> String {
    format!("P{}S", duration.as_secs_f64())
}
