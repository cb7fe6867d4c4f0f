//! Server-described step schema.
//!
//! Step 1 is a list of profile [`Field`]s; steps 2–4 are lists of
//! [`Question`]s. The wire format tags each entry with a `type` string, which
//! is decoded into [`FieldInput`] / [`QuestionKind`] so that renderers can
//! match exhaustively.

use serde::{Deserialize, Serialize};

/// Suffix appended to a question key for its free-text "other" answer.
pub const OTHER_SUFFIX: &str = "_other";

/// A selectable option of a dropdown, radio, or checkbox input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
    /// Whether choosing this option invites a free-text "other" answer.
    #[serde(default, rename = "hasOther", skip_serializing_if = "is_false")]
    pub has_other: bool,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            has_other: false,
        }
    }

    #[must_use]
    pub fn with_other(mut self) -> Self {
        self.has_other = true;
        self
    }
}

/// Input control of a step-1 field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldInput {
    Text,
    Dropdown {
        #[serde(default)]
        options: Vec<ChoiceOption>,
    },
}

/// A step-1 profile field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Offer a one-shot postcode lookup from the device location.
    #[serde(default, rename = "detectLocation", skip_serializing_if = "is_false")]
    pub detect_location: bool,
    #[serde(flatten)]
    pub input: FieldInput,
}

/// Answer shape of a question on steps 2–4.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuestionKind {
    /// Exactly one option.
    Radio {
        #[serde(default)]
        options: Vec<ChoiceOption>,
    },
    /// Any subset of the options.
    Checkbox {
        #[serde(default)]
        options: Vec<ChoiceOption>,
    },
    /// Exactly one option from a select box.
    Dropdown {
        #[serde(default)]
        options: Vec<ChoiceOption>,
    },
}

impl QuestionKind {
    pub fn options(&self) -> &[ChoiceOption] {
        match self {
            Self::Radio { options } | Self::Checkbox { options } | Self::Dropdown { options } => {
                options
            }
        }
    }
}

/// A question on steps 2–4.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub key: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_question: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl Question {
    /// Key under which the free-text "other" answer is stored, if any
    /// option of this question invites one.
    pub fn other_key(&self) -> Option<String> {
        self.kind
            .options()
            .iter()
            .any(|o| o.has_other)
            .then(|| format!("{}{OTHER_SUFFIX}", self.key))
    }
}

/// The two structural layouts a step can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepLayout {
    Fields(Vec<Field>),
    Questions(Vec<Question>),
}

/// A fetched step screen. Immutable once fetched; re-fetched per step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    pub title: Option<String>,
    pub layout: StepLayout,
}

impl StepDefinition {
    /// Assemble a definition from the optional wire arrays.
    ///
    /// `fields` wins when both are present. Returns `None` when the server
    /// sent neither.
    pub fn from_parts(
        title: Option<String>,
        fields: Option<Vec<Field>>,
        questions: Option<Vec<Question>>,
    ) -> Option<Self> {
        let layout = match (fields, questions) {
            (Some(fields), _) => StepLayout::Fields(fields),
            (None, Some(questions)) => StepLayout::Questions(questions),
            (None, None) => return None,
        };
        Some(Self { title, layout })
    }

    /// Whether this is the field-based profile screen.
    pub fn is_field_based(&self) -> bool {
        matches!(self.layout, StepLayout::Fields(_))
    }

    /// Keys that must carry a non-empty answer before submission.
    pub fn required_keys(&self) -> Vec<&str> {
        match &self.layout {
            StepLayout::Fields(fields) => fields
                .iter()
                .filter(|f| f.required)
                .map(|f| f.key.as_str())
                .collect(),
            StepLayout::Questions(questions) => questions
                .iter()
                .filter(|q| q.required)
                .map(|q| q.key.as_str())
                .collect(),
        }
    }

    /// Every answer key this step may submit, including "other" text keys.
    pub fn answer_keys(&self) -> Vec<String> {
        match &self.layout {
            StepLayout::Fields(fields) => fields.iter().map(|f| f.key.clone()).collect(),
            StepLayout::Questions(questions) => {
                let mut keys = Vec::with_capacity(questions.len());
                for q in questions {
                    keys.push(q.key.clone());
                    if let Some(other) = q.other_key() {
                        keys.push(other);
                    }
                }
                keys
            }
        }
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        match &self.layout {
            StepLayout::Fields(fields) => fields.iter().find(|f| f.key == key),
            StepLayout::Questions(_) => None,
        }
    }

    pub fn question(&self, key: &str) -> Option<&Question> {
        match &self.layout {
            StepLayout::Questions(questions) => questions.iter().find(|q| q.key == key),
            StepLayout::Fields(_) => None,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(v: &bool) -> bool {
    !*v
}
