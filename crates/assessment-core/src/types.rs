//! Identifier and counter newtypes shared by the client, server, and CLI.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of question screens in an assessment.
pub const STEP_COUNT: u8 = 4;

/// Server-issued opaque session handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a server-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position within the `steps` phase.
///
/// Values `1..=4` name a question screen; `5` means every screen has been
/// submitted and the assessment is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct StepNumber(u8);

impl StepNumber {
    /// The first screen (profile fields).
    pub const FIRST: Self = Self(1);
    /// The terminal marker returned once step 4 is submitted.
    pub const COMPLETE: Self = Self(STEP_COUNT + 1);

    /// Build a step number, rejecting anything outside `1..=5`.
    pub fn new(step: u32) -> Option<Self> {
        match u8::try_from(step) {
            Ok(s) if (1..=STEP_COUNT + 1).contains(&s) => Some(Self(s)),
            _ => None,
        }
    }

    /// Interpret a server-reported `current_step`.
    ///
    /// A missing or zero value means step 1; anything past the last screen
    /// means complete.
    pub fn from_server(step: Option<u32>) -> Self {
        match step {
            None | Some(0) => Self::FIRST,
            Some(s) if s > u32::from(STEP_COUNT) => Self::COMPLETE,
            Some(s) => Self::new(s).unwrap_or(Self::FIRST),
        }
    }

    /// Raw value.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Whether this marks the end of the assessment.
    pub fn is_complete(self) -> bool {
        self.0 > STEP_COUNT
    }

    /// The step that follows this one, saturating at [`StepNumber::COMPLETE`].
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1).min(STEP_COUNT + 1))
    }
}

impl TryFrom<u32> for StepNumber {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("step {value} is outside 1..=5"))
    }
}

impl From<StepNumber> for u32 {
    fn from(step: StepNumber) -> Self {
        u32::from(step.0)
    }
}

impl fmt::Display for StepNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Progress(u8);

impl Progress {
    /// Progress shown while working on `step`: `(step - 1) * 25`.
    pub fn for_step(step: StepNumber) -> Self {
        Self((step.get() - 1).saturating_mul(100 / STEP_COUNT).min(100))
    }

    /// Clamp an arbitrary percentage into range.
    pub fn from_percent(percent: u32) -> Self {
        Self(u8::try_from(percent.min(100)).unwrap_or(100))
    }

    /// Raw percentage.
    pub fn percent(self) -> u8 {
        self.0
    }
}

impl From<u32> for Progress {
    fn from(percent: u32) -> Self {
        Self::from_percent(percent)
    }
}

impl From<Progress> for u32 {
    fn from(progress: Progress) -> Self {
        u32::from(progress.0)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn progress_tracks_step() {
        let expected = [(1, 0), (2, 25), (3, 50), (4, 75), (5, 100)];
        for (step, percent) in expected {
            let step = StepNumber::new(step).unwrap();
            assert_eq!(Progress::for_step(step).percent(), percent);
        }
    }

    #[test]
    fn step_bounds() {
        assert!(StepNumber::new(0).is_none());
        assert!(StepNumber::new(6).is_none());
        assert!(StepNumber::new(5).unwrap().is_complete());
        assert!(!StepNumber::new(4).unwrap().is_complete());
    }

    #[test]
    fn server_step_defaults_and_clamps() {
        assert_eq!(StepNumber::from_server(None), StepNumber::FIRST);
        assert_eq!(StepNumber::from_server(Some(0)), StepNumber::FIRST);
        assert_eq!(StepNumber::from_server(Some(3)).get(), 3);
        assert_eq!(StepNumber::from_server(Some(9)), StepNumber::COMPLETE);
    }

    #[test]
    fn next_saturates_at_complete() {
        assert_eq!(StepNumber::new(4).unwrap().next(), StepNumber::COMPLETE);
        assert_eq!(StepNumber::COMPLETE.next(), StepNumber::COMPLETE);
    }

    #[test]
    fn progress_clamps_and_serializes_as_number() {
        assert_eq!(Progress::from_percent(250).percent(), 100);
        let json = serde_json::to_string(&Progress::from_percent(25)).unwrap();
        assert_eq!(json, "25");
    }
}
