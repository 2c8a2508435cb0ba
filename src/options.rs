use serde::Serialize;

use crate::constants::MIN_OPTIONS;
use crate::error::DecisionError;

/// Trim every entry and drop the ones left empty. Order and duplicates are kept.
pub fn filter_options<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .map(|o| o.as_ref().trim())
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

/// Filtered options ready for submission. Always holds at least two entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OptionSet(Vec<String>);

impl OptionSet {
    pub fn from_raw<S: AsRef<str>>(raw: &[S]) -> Result<Self, DecisionError> {
        let filled = filter_options(raw);
        if filled.len() < MIN_OPTIONS {
            return Err(DecisionError::NotEnoughOptions);
        }
        Ok(Self(filled))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}
