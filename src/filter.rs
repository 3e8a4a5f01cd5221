//! Filter values, filter state and filter field descriptors.

use std::collections::BTreeMap;
use std::fmt;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

/// A scalar filter value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Number(i64),
    Date(Date),
    Text(String),
}

impl FilterValue {
    /// Blank text counts as "not set".
    pub fn is_empty(&self) -> bool {
        matches!(self, FilterValue::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Bool(b) => write!(f, "{b}"),
            FilterValue::Number(n) => write!(f, "{n}"),
            FilterValue::Date(d) => write!(f, "{d}"),
            FilterValue::Text(s) => f.write_str(s.trim()),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Number(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

impl From<Date> for FilterValue {
    fn from(d: Date) -> Self {
        FilterValue::Date(d)
    }
}

/// Keyed filter values, ordered by key.
///
/// Only set values are stored: assigning `None` or an empty value removes
/// the key, so "absent", "null" and "empty" are indistinguishable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState(BTreeMap<String, FilterValue>);

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear `key`. Returns whether the state changed.
    pub fn set(&mut self, key: &str, value: Option<FilterValue>) -> bool {
        match value.filter(|v| !v.is_empty()) {
            Some(value) => {
                if self.0.get(key) == Some(&value) {
                    return false;
                }
                self.0.insert(key.to_string(), value);
                true
            }
            None => self.0.remove(key).is_some(),
        }
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: &str, value: impl Into<FilterValue>) -> Self {
        self.set(key, Some(value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of filters that are actually set.
    pub fn active_count(&self) -> usize {
        self.0.values().filter(|v| !v.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.0.is_empty();
        self.0.clear();
        changed
    }
}

/// Input widget kind of a filter field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Text,
    Select,
    Date,
}

/// One choice of a select filter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Descriptor of a filter field, as rendered next to a list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FilterKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

impl FilterOption {
    pub fn text(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind: FilterKind::Text,
            options: Vec::new(),
        }
    }

    pub fn date(key: &str, label: &str) -> Self {
        Self {
            kind: FilterKind::Date,
            ..Self::text(key, label)
        }
    }

    pub fn select(key: &str, label: &str, options: &[(&str, &str)]) -> Self {
        Self {
            kind: FilterKind::Select,
            options: options
                .iter()
                .map(|(value, label)| SelectOption {
                    value: value.to_string(),
                    label: label.to_string(),
                })
                .collect(),
            ..Self::text(key, label)
        }
    }

    /// Interpret raw widget input.
    ///
    /// `Ok(None)` clears the filter. [`Transient`] marks input that must not
    /// be committed: a partially typed date or a select value the field does
    /// not offer.
    pub fn parse(&self, raw: &str) -> Result<Option<FilterValue>, Transient> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        match self.kind {
            FilterKind::Text => Ok(Some(FilterValue::Text(raw.to_string()))),
            FilterKind::Select => self
                .options
                .iter()
                .find(|o| o.value == raw)
                .map(|o| Some(FilterValue::Text(o.value.clone())))
                .ok_or(Transient),
            FilterKind::Date => {
                if raw.len() != 10 {
                    return Err(Transient);
                }
                raw.parse::<Date>()
                    .map(|d| Some(FilterValue::Date(d)))
                    .map_err(|_| Transient)
            }
        }
    }
}

/// Widget input that is not yet a complete value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transient;

/// A committed search: free text plus filter values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    pub search_term: String,
    pub filters: FilterState,
}
