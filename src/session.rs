//! One recorded run of the emotional-faces task

use crate::error::StudyError;
use crate::types::{RunParams, TrialType};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-trial columns as decoded from a record, before re-basing.
///
/// Trial numbers are one-based as the task software writes them. Every column
/// must have one entry per trial.
#[derive(Debug, Clone, Default)]
pub struct TrialColumns {
    pub trial_numbers: Vec<f64>,
    pub trial_types: Vec<String>,
    pub pictures: Vec<String>,
    pub genders: Vec<String>,
    pub stimulus_times: Vec<f64>,
    pub jitter_times: Vec<f64>,
    pub key_times: Vec<f64>,
    pub keys: Vec<f64>,
    pub responses: Vec<f64>,
    pub reaction_times: Vec<f64>,
}

/// A single task run for one participant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    session_id: String,
    /// Zero-based trial indices
    trials: Vec<usize>,
    /// Emotion code per trial ('h', 'n', 's'; unknown codes are kept as-is)
    trial_types: Vec<String>,
    pictures: Vec<String>,
    genders: Vec<String>,
    stimulus_times: Vec<f64>,
    jitter_times: Vec<f64>,
    key_times: Vec<f64>,
    keys: Vec<f64>,
    responses: Vec<f64>,
    reaction_times: Vec<f64>,
    run_params: RunParams,
}

impl Session {
    /// Build a session from decoded columns, re-basing trial numbers to zero
    pub fn from_columns(
        session_id: impl Into<String>,
        columns: TrialColumns,
        run_params: RunParams,
    ) -> Result<Self, StudyError> {
        let session_id = session_id.into();
        let n = columns.trial_numbers.len();

        let lengths = [
            ("trial types", columns.trial_types.len()),
            ("pictures", columns.pictures.len()),
            ("genders", columns.genders.len()),
            ("stimulus times", columns.stimulus_times.len()),
            ("jitter times", columns.jitter_times.len()),
            ("key times", columns.key_times.len()),
            ("keys", columns.keys.len()),
            ("responses", columns.responses.len()),
            ("reaction times", columns.reaction_times.len()),
        ];
        if let Some((name, len)) = lengths.iter().find(|(_, len)| *len != n) {
            return Err(StudyError::Decode(format!(
                "session {}: {} has {} entries but there are {} trials",
                session_id, name, len, n
            )));
        }

        let trials = columns
            .trial_numbers
            .iter()
            .map(|&raw| rebase_trial_number(raw, &session_id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            session_id,
            trials,
            trial_types: columns.trial_types,
            pictures: columns.pictures,
            genders: columns.genders,
            stimulus_times: columns.stimulus_times,
            jitter_times: columns.jitter_times,
            key_times: columns.key_times,
            keys: columns.keys,
            responses: columns.responses,
            reaction_times: columns.reaction_times,
            run_params,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn trials(&self) -> &[usize] {
        &self.trials
    }

    pub fn trial_types(&self) -> &[String] {
        &self.trial_types
    }

    pub fn pictures(&self) -> &[String] {
        &self.pictures
    }

    pub fn genders(&self) -> &[String] {
        &self.genders
    }

    /// Stimulus presentation time of each trial
    pub fn stimulus_times(&self) -> &[f64] {
        &self.stimulus_times
    }

    pub fn jitter_times(&self) -> &[f64] {
        &self.jitter_times
    }

    pub fn key_times(&self) -> &[f64] {
        &self.key_times
    }

    pub fn keys(&self) -> &[f64] {
        &self.keys
    }

    pub fn responses(&self) -> &[f64] {
        &self.responses
    }

    pub fn reaction_times(&self) -> &[f64] {
        &self.reaction_times
    }

    pub fn run_params(&self) -> &RunParams {
        &self.run_params
    }

    /// Positions of the trials whose stored code equals `code` exactly
    pub fn trials_with_code(&self, code: &str) -> Vec<usize> {
        self.trial_types
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_str() == code)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn trials_of_type(&self, trial_type: TrialType) -> Vec<usize> {
        self.trials_with_code(trial_type.code())
    }

    pub fn happy_trials(&self) -> Vec<usize> {
        self.trials_of_type(TrialType::Happy)
    }

    pub fn neutral_trials(&self) -> Vec<usize> {
        self.trials_of_type(TrialType::Neutral)
    }

    pub fn sad_trials(&self) -> Vec<usize> {
        self.trials_of_type(TrialType::Sad)
    }

    /// Number of trials per stored code, unknown codes included
    pub fn trial_type_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for code in &self.trial_types {
            *counts.entry(code.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Attach a repetition time to this session's run parameters
    pub(crate) fn set_repetition_time(&mut self, tr: f64) {
        self.run_params = self.run_params.clone().with_repetition_time(tr);
    }
}

fn rebase_trial_number(raw: f64, session_id: &str) -> Result<usize, StudyError> {
    if !raw.is_finite() || raw < 1.0 || raw.fract() != 0.0 {
        return Err(StudyError::Decode(format!(
            "session {}: trial number {} is not a positive integer",
            session_id, raw
        )));
    }
    Ok(raw as usize - 1)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn params() -> RunParams {
        RunParams::new(
            "5",
            vec!["1".to_string()],
            vec!["2".to_string()],
            vec![7.0],
            1000.0,
            2.0,
            1.5,
        )
    }

    /// Columns for a session with the given emotion codes, presented every 10s
    pub(crate) fn columns(codes: &[&str]) -> TrialColumns {
        let n = codes.len();
        TrialColumns {
            trial_numbers: (1..=n).map(|i| i as f64).collect(),
            trial_types: codes.iter().map(|c| c.to_string()).collect(),
            pictures: (0..n).map(|i| format!("face{:02}.jpg", i)).collect(),
            genders: (0..n).map(|i| if i % 2 == 0 { "F" } else { "M" }.to_string()).collect(),
            stimulus_times: (0..n).map(|i| 10.0 * i as f64).collect(),
            jitter_times: vec![0.5; n],
            key_times: (0..n).map(|i| 10.0 * i as f64 + 0.7).collect(),
            keys: vec![1.0; n],
            responses: vec![1.0; n],
            reaction_times: vec![0.7; n],
        }
    }

    pub(crate) fn session(id: &str, codes: &[&str]) -> Session {
        Session::from_columns(id, columns(codes), params()).unwrap()
    }

    #[test]
    fn test_trial_numbers_rebased_to_zero() {
        let s = session("1", &["h", "n", "s"]);
        assert_eq!(s.trials(), &[0, 1, 2]);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn test_parallel_columns_have_equal_length() {
        let s = session("1", &["h", "n", "s", "h"]);
        let n = s.len();
        assert_eq!(s.trial_types().len(), n);
        assert_eq!(s.pictures().len(), n);
        assert_eq!(s.genders().len(), n);
        assert_eq!(s.stimulus_times().len(), n);
        assert_eq!(s.jitter_times().len(), n);
        assert_eq!(s.key_times().len(), n);
        assert_eq!(s.keys().len(), n);
        assert_eq!(s.responses().len(), n);
        assert_eq!(s.reaction_times().len(), n);
    }

    #[test]
    fn test_mismatched_columns_rejected() {
        let mut cols = columns(&["h", "n"]);
        cols.genders.pop();
        let err = Session::from_columns("1", cols, params()).unwrap_err();
        assert!(matches!(err, StudyError::Decode(ref m) if m.contains("genders")));
    }

    #[test]
    fn test_non_integer_trial_number_rejected() {
        let mut cols = columns(&["h"]);
        cols.trial_numbers[0] = 0.0;
        assert!(Session::from_columns("1", cols, params()).is_err());
    }

    #[test]
    fn test_named_filters_match_trials_of_type() {
        let s = session("1", &["h", "n", "s", "h", "s", "n"]);
        assert_eq!(s.happy_trials(), vec![0, 3]);
        assert_eq!(s.neutral_trials(), vec![1, 5]);
        assert_eq!(s.sad_trials(), vec![2, 4]);
        assert_eq!(s.happy_trials(), s.trials_of_type(TrialType::Happy));
        assert_eq!(
            s.trials_of_type("happy".parse().unwrap()),
            s.trials_of_type("h".parse().unwrap())
        );
    }

    #[test]
    fn test_unknown_codes_preserved() {
        let s = session("1", &["h", "x", "s"]);
        assert_eq!(s.trial_types()[1], "x");
        assert_eq!(s.trials_with_code("x"), vec![1]);

        let counts = s.trial_type_counts();
        assert_eq!(counts.get("x"), Some(&1));
        assert_eq!(counts.get("n"), None);
    }
}
