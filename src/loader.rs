//! Session loader
//!
//! Turns one record file into a [`Session`]. Record files follow the naming
//! convention `<participant>_..._sess<session>.<ext>`: the participant id is
//! the token before the first underscore and the session id is the last
//! underscore-delimited token with its 4-character prefix removed.

use crate::error::StudyError;
use crate::record::{fields, RawRecord, RecordReader, DATA_COLUMNS};
use crate::session::{Session, TrialColumns};
use crate::types::RunParams;
use std::path::Path;

/// Length of the prefix in front of the session id ("sess")
const SESSION_PREFIX_LEN: usize = 4;

/// Read and decode a record file into a session
pub fn load_session(reader: &dyn RecordReader, path: &Path) -> Result<Session, StudyError> {
    let session_id = session_id_from_path(path)?;
    let record = reader.read(path)?;
    let session = session_from_record(&record, session_id)?;

    tracing::debug!(
        path = %path.display(),
        session = session.session_id(),
        trials = session.len(),
        "decoded record"
    );

    Ok(session)
}

/// Participant id encoded in a record file name
pub fn participant_id_from_path(path: &Path) -> Result<String, StudyError> {
    let name = file_name(path)?;
    match name.split_once('_') {
        Some((ppt, _)) if !ppt.is_empty() => Ok(ppt.to_string()),
        _ => Err(StudyError::InvalidFileName(name.to_string())),
    }
}

/// Session id encoded in a record file name
pub fn session_id_from_path(path: &Path) -> Result<String, StudyError> {
    let name = file_name(path)?;
    let stem = name.split('.').next().unwrap_or(name);
    let token = stem.rsplit('_').next().unwrap_or(stem);

    let session: String = token.chars().skip(SESSION_PREFIX_LEN).collect();
    if token.chars().count() <= SESSION_PREFIX_LEN || session.is_empty() {
        return Err(StudyError::InvalidFileName(name.to_string()));
    }
    Ok(session)
}

/// Decode the fields of one record into a session
pub fn session_from_record(
    record: &RawRecord,
    session_id: impl Into<String>,
) -> Result<Session, StudyError> {
    let run_params = run_params_from_record(record)?;

    let table = record.data_table()?;
    if let Some((i, row)) = table.iter().enumerate().find(|(_, r)| r.len() < DATA_COLUMNS) {
        return Err(StudyError::Decode(format!(
            "data row {} has {} columns, expected {}",
            i,
            row.len(),
            DATA_COLUMNS
        )));
    }
    let column = |c: usize| table.iter().map(|row| row[c]).collect::<Vec<f64>>();

    // Column 1 repeats the trial type as an index and is not kept
    let columns = TrialColumns {
        trial_numbers: column(0),
        trial_types: record.labels(fields::EMOTIONS)?,
        pictures: record.labels(fields::PICTURES)?,
        genders: record.labels(fields::GENDERS)?,
        stimulus_times: column(2),
        jitter_times: column(3),
        key_times: column(4),
        keys: column(5),
        responses: column(6),
        reaction_times: column(7),
    };

    Session::from_columns(session_id, columns, run_params)
}

fn run_params_from_record(record: &RawRecord) -> Result<RunParams, StudyError> {
    Ok(RunParams::new(
        record.scalar_text(fields::SCANNER_KEY)?,
        record.row_text(fields::RESPONSE_KEYS1)?,
        record.row_text(fields::RESPONSE_KEYS2)?,
        record.row_numbers(fields::SEED)?,
        record.scalar_number(fields::START_PULSE_TIME)?,
        record.scalar_number(fields::STIMULI_TIME)?,
        record.scalar_number(fields::RESPONSE_TIME)?,
    ))
}

fn file_name(path: &Path) -> Result<&str, StudyError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StudyError::InvalidFileName(path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> serde_json::Value {
        json!({
            "SCANNERKEY": ["5"],
            "RESPONSEKEYS1": ["1"],
            "RESPONSEKEYS2": ["2"],
            "seed": [[314]],
            "STARTPULSETIME": [1234.5],
            "STIMULITIME": [2.0],
            "RESPONSETIME": [1.5],
            "data": [
                [1, 1, 10.0, 0.3, 10.8, 1, 1, 0.8],
                [2, 2, 20.0, 0.4, null, null, null, null],
                [3, 3, 30.0, 0.5, 30.6, 2, 0, 0.6]
            ],
            "emotions": [[["h"], ["n"], ["s"]]],
            "genders": [[["F"], ["M"], ["F"]]],
            "pictures": [[["f01.jpg"], ["m02.jpg"], ["f03.jpg"]]]
        })
    }

    #[test]
    fn test_participant_id_from_path() {
        let path = Path::new("/data/faces/5004_faces_2016_sess1.json");
        assert_eq!(participant_id_from_path(path).unwrap(), "5004");

        let padded = Path::new("007_x_sess2.mat");
        assert_eq!(participant_id_from_path(padded).unwrap(), "007");

        assert!(matches!(
            participant_id_from_path(Path::new("nounderscore.mat")),
            Err(StudyError::InvalidFileName(_))
        ));
    }

    #[test]
    fn test_session_id_from_path() {
        let path = Path::new("/data/faces/5004_faces_2016_sess1.json");
        assert_eq!(session_id_from_path(path).unwrap(), "1");

        let two_digit = Path::new("100_run_sess12.mat");
        assert_eq!(session_id_from_path(two_digit).unwrap(), "12");

        assert!(session_id_from_path(Path::new("100_sess.mat")).is_err());
    }

    #[test]
    fn test_session_from_record() {
        let record = RawRecord::from_value(sample_record()).unwrap();
        let session = session_from_record(&record, "1").unwrap();

        assert_eq!(session.session_id(), "1");
        assert_eq!(session.trials(), &[0, 1, 2]);
        assert_eq!(session.trial_types(), &["h", "n", "s"]);
        assert_eq!(session.pictures()[1], "m02.jpg");
        assert_eq!(session.stimulus_times(), &[10.0, 20.0, 30.0]);
        assert!(session.reaction_times()[1].is_nan());
        assert_eq!(session.run_params().seed(), &[314.0]);
        assert_eq!(session.run_params().response_keys1(), &["1"]);
        assert_eq!(session.run_params().scanner_key(), "5");
        assert_eq!(session.run_params().repetition_time(), None);
    }

    #[test]
    fn test_run_params_keep_every_response_key() {
        let mut value = sample_record();
        value["RESPONSEKEYS1"] = json!([[30, 89]]);
        value["RESPONSEKEYS2"] = json!([[31, 90]]);
        value["seed"] = json!([[5489, 624]]);
        let record = RawRecord::from_value(value).unwrap();

        let session = session_from_record(&record, "1").unwrap();
        let params = session.run_params();
        assert_eq!(params.response_keys1(), &["30", "89"]);
        assert_eq!(params.response_keys2(), &["31", "90"]);
        assert_eq!(params.seed(), &[5489.0, 624.0]);
        assert_eq!(params.scanner_key(), "5");
    }

    #[test]
    fn test_session_from_record_missing_field() {
        let mut value = sample_record();
        value.as_object_mut().unwrap().remove("STIMULITIME");
        let record = RawRecord::from_value(value).unwrap();

        assert!(matches!(
            session_from_record(&record, "1"),
            Err(StudyError::MissingField(ref f)) if f == "STIMULITIME"
        ));
    }

    #[test]
    fn test_session_from_record_short_row() {
        let mut value = sample_record();
        value["data"][2] = json!([3, 3, 30.0]);
        let record = RawRecord::from_value(value).unwrap();

        assert!(matches!(
            session_from_record(&record, "1"),
            Err(StudyError::Decode(_))
        ));
    }

    #[test]
    fn test_label_count_mismatch() {
        let mut value = sample_record();
        value["emotions"] = json!([["h"], ["n"]]);
        let record = RawRecord::from_value(value).unwrap();

        assert!(matches!(
            session_from_record(&record, "1"),
            Err(StudyError::Decode(_))
        ));
    }
}
