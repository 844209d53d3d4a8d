//! Core types for the faces study
//!
//! Trial-type codes, query selectors and the per-run acquisition parameters
//! attached to every session.

use crate::error::StudyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Study-arm code assigned to a participant for the whole study
pub type StudyArm = u8;

/// Legal selector spellings, reported back on a bad selector
pub const TRIAL_SELECTORS: &str = "happy, h, neutral, n, sad, s, all";

/// Emotional-face trial type as encoded by the task software
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialType {
    Happy,
    Neutral,
    Sad,
}

impl TrialType {
    pub const ALL: [TrialType; 3] = [TrialType::Happy, TrialType::Neutral, TrialType::Sad];

    /// Single-character tag stored in the record's emotion array
    pub fn code(&self) -> &'static str {
        match self {
            TrialType::Happy => "h",
            TrialType::Neutral => "n",
            TrialType::Sad => "s",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrialType::Happy => "happy",
            TrialType::Neutral => "neutral",
            TrialType::Sad => "sad",
        }
    }
}

impl fmt::Display for TrialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrialType {
    type Err = StudyError;

    /// Accepts both the full name and the single-letter code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "happy" | "h" => Ok(TrialType::Happy),
            "neutral" | "n" => Ok(TrialType::Neutral),
            "sad" | "s" => Ok(TrialType::Sad),
            other => Err(StudyError::InvalidArgument(format!(
                "unknown trial type '{}', choose one of happy, h, neutral, n, sad, s",
                other
            ))),
        }
    }
}

/// Which trials a timing query should return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialSelector {
    Only(TrialType),
    All,
}

impl FromStr for TrialSelector {
    type Err = StudyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(TrialSelector::All);
        }
        s.parse::<TrialType>().map(TrialSelector::Only).map_err(|_| {
            StudyError::InvalidArgument(format!(
                "unknown trial selector '{}', choose one of {}",
                s, TRIAL_SELECTORS
            ))
        })
    }
}

impl From<TrialType> for TrialSelector {
    fn from(trial_type: TrialType) -> Self {
        TrialSelector::Only(trial_type)
    }
}

/// Acquisition and timing configuration for one recorded run.
///
/// Immutable once built. The repetition time is not part of the record file and
/// is only present when supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    scanner_key: String,
    response_keys1: Vec<String>,
    response_keys2: Vec<String>,
    seed: Vec<f64>,
    start_pulse_time: f64,
    stimuli_time: f64,
    response_time: f64,
    repetition_time: Option<f64>,
}

impl RunParams {
    pub fn new(
        scanner_key: impl Into<String>,
        response_keys1: Vec<String>,
        response_keys2: Vec<String>,
        seed: Vec<f64>,
        start_pulse_time: f64,
        stimuli_time: f64,
        response_time: f64,
    ) -> Self {
        Self {
            scanner_key: scanner_key.into(),
            response_keys1,
            response_keys2,
            seed,
            start_pulse_time,
            stimuli_time,
            response_time,
            repetition_time: None,
        }
    }

    /// Copy of these parameters with the scanner repetition time (TR) set
    pub fn with_repetition_time(self, tr: f64) -> Self {
        Self {
            repetition_time: Some(tr),
            ..self
        }
    }

    /// Key the scanner sends on each volume pulse
    pub fn scanner_key(&self) -> &str {
        &self.scanner_key
    }

    /// First set of response keys
    pub fn response_keys1(&self) -> &[String] {
        &self.response_keys1
    }

    /// Second set of response keys
    pub fn response_keys2(&self) -> &[String] {
        &self.response_keys2
    }

    /// Random seed; may hold a full generator state
    pub fn seed(&self) -> &[f64] {
        &self.seed
    }

    /// Time of the first real scanner pulse
    pub fn start_pulse_time(&self) -> f64 {
        self.start_pulse_time
    }

    /// How long each face is shown
    pub fn stimuli_time(&self) -> f64 {
        self.stimuli_time
    }

    /// Length of the response window
    pub fn response_time(&self) -> f64 {
        self.response_time
    }

    pub fn repetition_time(&self) -> Option<f64> {
        self.repetition_time
    }
}
