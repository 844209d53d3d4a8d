//! Build a study from a record directory and print stimulus times for one session
//!
//! Usage: example_queries <records-dir> <arms.json> <participant> <session>

use faces_study::{get_time_stimulus_shown, study_from_directory, StudyArms, StudyError};
use std::path::Path;

fn run(dir: &str, arms: &str, participant: &str, session: &str) -> Result<(), StudyError> {
    let arms = StudyArms::load(Path::new(arms))?;
    let study = study_from_directory("faces", Path::new(dir), arms)?;
    let session = study.session(participant, session)?;

    for trial_type in ["all", "happy"] {
        let times = get_time_stimulus_shown(session, trial_type)?;
        println!("{trial_type}: {times:?}");
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let [dir, arms, participant, session] = args.as_slice() else {
        eprintln!("usage: example_queries <records-dir> <arms.json> <participant> <session>");
        return;
    };

    if let Err(e) = run(dir, arms, participant, session) {
        eprintln!("Error: {e:?}");
    }
}
