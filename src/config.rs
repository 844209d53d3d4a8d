//! Study-building configuration
//!
//! The participant→arm table and the build options are passed explicitly into
//! the builder; nothing here is process-wide state.

use crate::error::StudyError;
use crate::types::StudyArm;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Mapping from participant id to study-arm code.
///
/// Loaded from a JSON object such as `{"5004": 1, "5005": 2}`. Keys are kept
/// verbatim, so `"007"` and `"7"` are different participants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudyArms {
    arms: HashMap<String, StudyArm>,
}

impl StudyArms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, StudyError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load the mapping from a JSON file
    pub fn load(path: &Path) -> Result<Self, StudyError> {
        let json = fs::read_to_string(path).map_err(|e| StudyError::io(path, e))?;
        Self::from_json(&json)
    }

    pub fn insert(&mut self, participant_id: impl Into<String>, arm: StudyArm) {
        self.arms.insert(participant_id.into(), arm);
    }

    /// Arm of `participant_id`, or `MappingMissing`
    pub fn arm_of(&self, participant_id: &str) -> Result<StudyArm, StudyError> {
        self.arms
            .get(participant_id)
            .copied()
            .ok_or_else(|| StudyError::MappingMissing(participant_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, StudyArm)> for StudyArms {
    fn from_iter<I: IntoIterator<Item = (K, StudyArm)>>(iter: I) -> Self {
        Self {
            arms: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// What the builder does when one record file cannot be added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing file and return its error
    #[default]
    Abort,
    /// Leave the file out and record it in the build report
    Skip,
}

/// Options for building a study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub study_name: String,
    /// Scanner repetition time stamped onto every loaded session
    pub repetition_time: Option<f64>,
    pub failure_policy: FailurePolicy,
}

impl BuildConfig {
    pub fn new(study_name: impl Into<String>) -> Self {
        Self {
            study_name: study_name.into(),
            repetition_time: None,
            failure_policy: FailurePolicy::Abort,
        }
    }

    pub fn with_repetition_time(mut self, tr: f64) -> Self {
        self.repetition_time = Some(tr);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_study_arms_from_json() {
        let arms = StudyArms::from_json(r#"{"100": 1, "5004": 1, "007": 4}"#).unwrap();
        assert_eq!(arms.len(), 3);
        assert_eq!(arms.arm_of("007").unwrap(), 4);
        assert!(matches!(
            arms.arm_of("7"),
            Err(StudyError::MappingMissing(ref p)) if p == "7"
        ));
    }

    #[test]
    fn test_study_arms_rejects_bad_json() {
        assert!(StudyArms::from_json(r#"{"100": "control"}"#).is_err());
        assert!(StudyArms::from_json(r#"{"100": 300}"#).is_err());
    }

    #[test]
    fn test_study_arms_from_pairs() {
        let arms: StudyArms = [("A", 1), ("B", 2)].into_iter().collect();
        assert_eq!(arms.arm_of("B").unwrap(), 2);
    }

    #[test]
    fn test_build_config_defaults() {
        let config = BuildConfig::new("BIODEP");
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.repetition_time, None);

        let config = config
            .with_repetition_time(2.0)
            .with_failure_policy(FailurePolicy::Skip);
        assert_eq!(config.repetition_time, Some(2.0));
        assert_eq!(config.failure_policy, FailurePolicy::Skip);
    }
}
