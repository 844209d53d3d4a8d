//! Faces Study - loader and query layer for emotional-faces task recordings
//!
//! Record files produced by the task-presentation software are decoded into
//! sessions and organized into a study → participant → session hierarchy:
//! record file → session loader → study builder → trial-time queries.
//!
//! ## Modules
//!
//! - **Data model**: [`Study`], [`Participant`], [`Session`], [`RunParams`]
//! - **Loading**: record readers, the session loader and the study builder
//! - **Queries**: stimulus presentation times filtered by trial type

pub mod builder;
pub mod config;
pub mod error;
pub mod loader;
pub mod query;
pub mod record;
pub mod session;
pub mod study;
pub mod types;

pub use builder::{study_from_directory, study_from_manifest, BuildReport, StudyBuild, StudyBuilder};
pub use config::{BuildConfig, FailurePolicy, StudyArms};
pub use error::StudyError;
pub use loader::load_session;
pub use query::{get_time_stimulus_shown, stimulus_times};
pub use record::{JsonRecordReader, RawRecord, RecordReader};
pub use session::Session;
pub use study::{Participant, Study};
pub use types::{RunParams, StudyArm, TrialSelector, TrialType};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
