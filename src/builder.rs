//! Study building
//!
//! This module provides the entry points that turn a corpus of record files
//! into a [`Study`]. Files come from a manifest, a directory, or an explicit
//! list; each one is decoded into a session and attached to its participant,
//! creating the participant on first sight.
//!
//! Directory enumeration order is whatever the filesystem returns and is not
//! sorted. Nothing in the resulting study depends on that order except which
//! session wins when two files carry the same participant and session id.

use crate::config::{BuildConfig, FailurePolicy, StudyArms};
use crate::error::StudyError;
use crate::loader::{load_session, participant_id_from_path};
use crate::record::{JsonRecordReader, RecordReader};
use crate::study::Study;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Build a study from a manifest of record paths, one per line.
///
/// Relative paths in the manifest are resolved against the manifest's own
/// directory, not the process working directory.
///
/// # Example
/// ```ignore
/// let arms = StudyArms::load(Path::new("arms.json"))?;
/// let study = study_from_manifest("BIODEP", Path::new("filelist.txt"), arms)?;
/// ```
pub fn study_from_manifest(
    study_name: &str,
    manifest: &Path,
    arms: StudyArms,
) -> Result<Study, StudyError> {
    StudyBuilder::new(BuildConfig::new(study_name), arms)
        .build_from_manifest(manifest)
        .map(|built| built.study)
}

/// Build a study from every record file directly inside `dir`.
///
/// # Example
/// ```ignore
/// let study = study_from_directory("BIODEP", Path::new("/data/faces"), arms)?;
/// ```
pub fn study_from_directory(
    study_name: &str,
    dir: &Path,
    arms: StudyArms,
) -> Result<Study, StudyError> {
    StudyBuilder::new(BuildConfig::new(study_name), arms)
        .build_from_directory(dir)
        .map(|built| built.study)
}

/// A record file left out of the study under [`FailurePolicy::Skip`]
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub error: String,
}

/// What happened during a build
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// Record files considered
    pub files_seen: usize,
    /// Sessions attached to the study
    pub sessions_added: usize,
    /// Participants created
    pub participants_created: usize,
    pub skipped: Vec<SkippedFile>,
}

/// A finished study together with its build report
#[derive(Debug, Clone)]
pub struct StudyBuild {
    pub study: Study,
    pub report: BuildReport,
}

/// Builds studies from record files with a fixed reader, arm table and config
pub struct StudyBuilder {
    config: BuildConfig,
    arms: StudyArms,
    reader: Box<dyn RecordReader>,
}

impl StudyBuilder {
    /// Builder reading JSON-exported records
    pub fn new(config: BuildConfig, arms: StudyArms) -> Self {
        Self {
            config,
            arms,
            reader: Box::new(JsonRecordReader::new()),
        }
    }

    /// Use a different record reader
    pub fn with_reader(mut self, reader: impl RecordReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    /// Build from a manifest file listing one record path per line.
    ///
    /// Blank lines and lines starting with `#` are ignored. Relative paths are
    /// resolved against the manifest's directory.
    pub fn build_from_manifest(&self, manifest: &Path) -> Result<StudyBuild, StudyError> {
        let paths = read_manifest(manifest)?;
        self.build_from_paths(paths)
    }

    /// Build from every file in `dir` (not recursive) with the reader's extension
    pub fn build_from_directory(&self, dir: &Path) -> Result<StudyBuild, StudyError> {
        let paths = record_files_in(dir, self.reader.extension())?;
        self.build_from_paths(paths)
    }

    /// Build from record paths, in the order given
    pub fn build_from_paths(
        &self,
        paths: impl IntoIterator<Item = PathBuf>,
    ) -> Result<StudyBuild, StudyError> {
        let mut study = Study::new(self.config.study_name.clone());
        let mut report = BuildReport::default();

        for path in paths {
            report.files_seen += 1;
            match self.add_file(&mut study, &path) {
                Ok(created) => {
                    report.sessions_added += 1;
                    if created {
                        report.participants_created += 1;
                    }
                }
                Err(error) => match self.config.failure_policy {
                    FailurePolicy::Abort => return Err(error),
                    FailurePolicy::Skip => {
                        tracing::warn!(path = %path.display(), %error, "skipping record file");
                        report.skipped.push(SkippedFile {
                            path,
                            error: error.to_string(),
                        });
                    }
                },
            }
        }

        tracing::info!(
            study = study.name(),
            participants = study.participant_count(),
            sessions = study.session_count(),
            skipped = report.skipped.len(),
            "study built"
        );

        Ok(StudyBuild { study, report })
    }

    /// Load one file into `study`. Returns whether a new participant was created.
    fn add_file(&self, study: &mut Study, path: &Path) -> Result<bool, StudyError> {
        let participant_id = participant_id_from_path(path)?;
        let mut session = load_session(self.reader.as_ref(), path)?;
        if let Some(tr) = self.config.repetition_time {
            session.set_repetition_time(tr);
        }

        if study.contains(&participant_id) {
            tracing::info!(
                session = session.session_id(),
                participant = %participant_id,
                study = %self.config.study_name,
                "adding new session on existing participant"
            );
            study.get_mut(&participant_id)?.add_session(session);
            return Ok(false);
        }

        let arm = self.arms.arm_of(&participant_id)?;
        tracing::info!(
            session = session.session_id(),
            participant = %participant_id,
            arm,
            study = %self.config.study_name,
            "adding new session and new participant"
        );
        study.add_new_participant(participant_id, arm, session);
        Ok(true)
    }
}

/// Record paths listed in a manifest file
pub fn read_manifest(manifest: &Path) -> Result<Vec<PathBuf>, StudyError> {
    let text = fs::read_to_string(manifest).map_err(|e| StudyError::io(manifest, e))?;
    let base = manifest.parent().unwrap_or_else(|| Path::new(""));

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let path = PathBuf::from(line);
            if path.is_absolute() {
                path
            } else {
                base.join(path)
            }
        })
        .collect())
}

/// Files directly inside `dir` with the given extension, in enumeration order
pub fn record_files_in(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, StudyError> {
    let entries = fs::read_dir(dir).map_err(|e| StudyError::io(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StudyError::io(dir, e))?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == extension);
        if matches && path.is_file() {
            paths.push(path);
        }
    }
    Ok(paths)
}
