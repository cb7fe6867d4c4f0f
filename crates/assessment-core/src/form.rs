//! Accumulated answers for the current step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::StepDefinition;

/// A single answer value.
///
/// Serialized untagged so the JSON is a plain string, string array, or
/// boolean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Flag(bool),
    Text(String),
    Choices(Vec<String>),
}

impl FormValue {
    /// Whether the value counts as answered.
    ///
    /// Text is trimmed; a choice list must be non-empty; booleans coerce to
    /// the non-empty strings `"true"` / `"false"` and therefore always count.
    pub fn is_filled(&self) -> bool {
        match self {
            Self::Flag(_) => true,
            Self::Text(s) => !s.trim().is_empty(),
            Self::Choices(c) => !c.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Flag(_) | Self::Choices(_) => None,
        }
    }

    pub fn as_choices(&self) -> Option<&[String]> {
        match self {
            Self::Choices(c) => Some(c),
            Self::Flag(_) | Self::Text(_) => None,
        }
    }
}

impl From<&str> for FormValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for FormValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FormValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

impl From<Vec<String>> for FormValue {
    fn from(c: Vec<String>) -> Self {
        Self::Choices(c)
    }
}

/// Answers keyed by field or question key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(BTreeMap<String, FormValue>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FormValue> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FormValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` on top of these answers; `other` wins on conflicts.
    pub fn merge(&mut self, other: FormData) {
        self.0.extend(other.0);
    }

    /// Flip membership of `option` in the checkbox answer under `key`.
    ///
    /// A non-list value under `key` is treated as an empty selection.
    /// Toggling the same option twice restores the original set.
    pub fn toggle_choice(&mut self, key: &str, option: &str) {
        let mut choices: Vec<String> = self
            .0
            .get(key)
            .and_then(FormValue::as_choices)
            .map(<[String]>::to_vec)
            .unwrap_or_default();

        if choices.iter().any(|c| c == option) {
            choices.retain(|c| c != option);
        } else {
            choices.push(option.to_owned());
        }
        self.0.insert(key.to_owned(), FormValue::Choices(choices));
    }

    /// Required keys of `step` that are absent or blank, in schema order.
    pub fn missing_required(&self, step: &StepDefinition) -> Vec<String> {
        step.required_keys()
            .into_iter()
            .filter(|key| !self.0.get(*key).is_some_and(FormValue::is_filled))
            .map(str::to_owned)
            .collect()
    }

    /// Whether every required key of `step` is answered.
    pub fn is_complete_for(&self, step: &StepDefinition) -> bool {
        self.missing_required(step).is_empty()
    }

    /// Only the answers that belong to `step`.
    pub fn scoped_to(&self, step: &StepDefinition) -> FormData {
        let mut scoped = BTreeMap::new();
        for key in step.answer_keys() {
            if let Some(v) = self.0.get(&key) {
                scoped.insert(key, v.clone());
            }
        }
        Self(scoped)
    }
}

impl FromIterator<(String, FormValue)> for FormData {
    fn from_iter<I: IntoIterator<Item = (String, FormValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
