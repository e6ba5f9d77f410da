//! WeasyPrint command-line options.
//!
//! Options are kept as an ordered list of `name => value` pairs and are only
//! turned into flags when a command is built. Names are normalized the same
//! way every time: lowercased, with anything outside `[a-z0-9]` replaced by a
//! hyphen, and prefixed with `--`. So `print_media_type`, `Print Media Type`
//! and `print-media-type` all become `--print-media-type`.
//!
//! | Value                       | Flags                            |
//! |-----------------------------|----------------------------------|
//! | `true` / `"true"`           | `--name`                         |
//! | `false`                     | *(omitted)*                      |
//! | `"value"` / `42` / `1.5`    | `--name value`                   |
//! | `["a", "b"]`                | `--name a b`                     |
//! | `{"k": "v", "flag": true}`  | `--name k v flag`                |

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A single option value, before normalization.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<OptionValue>),
    Map(BTreeMap<String, OptionValue>),
}

impl OptionValue {
    /// `true`, or the string `"true"`, means "pass the flag without a value".
    fn is_true(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => s == "true",
            _ => false,
        }
    }

    fn is_omitted(&self) -> bool {
        matches!(self, Self::Bool(false))
    }

    /// Flatten into the argument strings that follow the flag name.
    fn normalize(&self) -> Vec<String> {
        match self {
            _ if self.is_true() => Vec::new(),
            Self::List(items) => items.iter().flat_map(Self::flatten).collect(),
            // Map entries are flattened to `key value` pairs, but nested
            // `true` values drop out entirely (they have no string form).
            Self::Map(entries) => entries
                .iter()
                .flat_map(|(k, v)| [OptionValue::Text(k.clone()), v.clone()])
                .filter(|v| !v.is_true())
                .flat_map(|v| v.normalize())
                .collect(),
            other => vec![other.to_string()],
        }
    }

    fn flatten(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.iter().flat_map(Self::flatten).collect(),
            other => vec![other.to_string()],
        }
    }
}

impl Display for OptionValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => f.write_str(&items.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")),
            Self::Map(entries) => {
                let pairs: Vec<_> = entries.iter().map(|(k, v)| format!("{k} {v}")).collect();
                f.write_str(&pairs.join(" "))
            },
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}
impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}
impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
impl<T: Into<OptionValue>> From<Vec<T>> for OptionValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}
impl From<BTreeMap<String, OptionValue>> for OptionValue {
    fn from(value: BTreeMap<String, OptionValue>) -> Self {
        Self::Map(value)
    }
}

/// Converts an option name into its flag form (`Page_Size` → `--page-size`).
pub fn normalize_name(name: impl AsRef<str>) -> String {
    let name: String = name
        .as_ref()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect();
    format!("--{name}")
}

/// Ordered set of renderer options.
///
/// Insertion order is kept so that generated command lines are stable.
/// Setting an option that already exists replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    entries: Vec<(String, OptionValue)>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing (but not moving) any earlier value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `self` overridden by every entry in `overrides`.
    pub fn merge(mut self, overrides: &Options) -> Self {
        for (name, value) in &overrides.entries {
            self.set(name.clone(), value.clone());
        }
        self
    }

    /// Command-line arguments for these options, in insertion order.
    ///
    /// Two names that normalize to the same flag collapse into one, keeping
    /// the later value.
    pub fn to_args(&self) -> Vec<String> {
        let mut normalized: Vec<(String, Vec<String>)> = Vec::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            if value.is_omitted() {
                continue;
            }
            let flag = normalize_name(name);
            let args = value.normalize();
            match normalized.iter_mut().find(|(f, _)| *f == flag) {
                Some((_, existing)) => *existing = args,
                None => normalized.push((flag, args)),
            }
        }
        normalized.into_iter().flat_map(|(flag, args)| std::iter::once(flag).chain(args)).collect()
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for Options {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut options = Self::new();
        for (k, v) in iter {
            options.set(k, v);
        }
        options
    }
}

impl From<BTreeMap<String, OptionValue>> for Options {
    fn from(map: BTreeMap<String, OptionValue>) -> Self {
        map.into_iter().collect()
    }
}
