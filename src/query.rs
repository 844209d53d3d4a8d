//! Trial-time queries
//!
//! Stimulus presentation times filtered by trial type, measured from the first
//! real scanner pulse as recorded by the task software.

use crate::error::StudyError;
use crate::session::Session;
use crate::types::TrialSelector;

/// Presentation times of the trials matching `selector`, in trial order.
///
/// `selector` is one of `happy`, `h`, `neutral`, `n`, `sad`, `s` or `all`.
/// Anything else is an `InvalidArgument` error.
///
/// # Example
/// ```ignore
/// let session = study.session("5004", "1")?;
/// let happy = get_time_stimulus_shown(session, "happy")?;
/// ```
pub fn get_time_stimulus_shown(session: &Session, selector: &str) -> Result<Vec<f64>, StudyError> {
    let selector: TrialSelector = selector.parse()?;
    Ok(stimulus_times(session, selector))
}

/// Presentation times of the trials matching an already-parsed selector
pub fn stimulus_times(session: &Session, selector: TrialSelector) -> Vec<f64> {
    let times = session.stimulus_times();
    match selector {
        TrialSelector::All => times.to_vec(),
        TrialSelector::Only(trial_type) => session
            .trials_of_type(trial_type)
            .into_iter()
            .map(|i| times[i])
            .collect(),
    }
}
