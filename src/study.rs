//! Participant and study containers
//!
//! A [`Study`] owns its participants, a [`Participant`] owns its sessions.
//! Both are keyed maps; inserting under an existing key replaces the entry.

use crate::error::StudyError;
use crate::session::Session;
use crate::types::StudyArm;
use serde::Serialize;
use std::collections::HashMap;

/// One participant and every session recorded for them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    participant_id: String,
    study_arm: StudyArm,
    sessions: HashMap<String, Session>,
}

impl Participant {
    /// Create a participant with its first session
    pub fn new(participant_id: impl Into<String>, study_arm: StudyArm, session: Session) -> Self {
        let mut participant = Self {
            participant_id: participant_id.into(),
            study_arm,
            sessions: HashMap::new(),
        };
        participant.add_session(session);
        participant
    }

    /// Create a participant from several sessions.
    ///
    /// Sessions sharing an id overwrite earlier ones. At least one session is required.
    pub fn with_sessions(
        participant_id: impl Into<String>,
        study_arm: StudyArm,
        sessions: impl IntoIterator<Item = Session>,
    ) -> Result<Self, StudyError> {
        let participant_id = participant_id.into();
        let sessions: HashMap<String, Session> = sessions
            .into_iter()
            .map(|s| (s.session_id().to_string(), s))
            .collect();

        if sessions.is_empty() {
            return Err(StudyError::InvalidArgument(format!(
                "participant {} needs at least one session",
                participant_id
            )));
        }

        Ok(Self {
            participant_id,
            study_arm,
            sessions,
        })
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn study_arm(&self) -> StudyArm {
        self.study_arm
    }

    /// Insert a session under its own id, replacing any session with that id
    pub fn add_session(&mut self, session: Session) {
        self.sessions.insert(session.session_id().to_string(), session);
    }

    /// Ids of the attached sessions, sorted
    pub fn list_sessions(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.sessions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn get(&self, session_id: &str) -> Result<&Session, StudyError> {
        self.sessions
            .get(session_id)
            .ok_or_else(|| StudyError::not_found("session", session_id))
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Top-level aggregate: every participant in a study
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Study {
    name: String,
    participants: HashMap<String, Participant>,
}

impl Study {
    /// Create an empty study
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            participants: HashMap::new(),
        }
    }

    /// Create a study from existing participants; duplicate ids overwrite earlier ones
    pub fn with_participants(
        name: impl Into<String>,
        participants: impl IntoIterator<Item = Participant>,
    ) -> Self {
        let mut study = Self::new(name);
        for participant in participants {
            study.add_participant(participant);
        }
        study
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a participant under its own id, replacing any existing entry
    pub fn add_participant(&mut self, participant: Participant) {
        self.participants
            .insert(participant.participant_id().to_string(), participant);
    }

    /// Create a participant with one session and insert it
    pub fn add_new_participant(
        &mut self,
        participant_id: impl Into<String>,
        study_arm: StudyArm,
        session: Session,
    ) {
        self.add_participant(Participant::new(participant_id, study_arm, session));
    }

    /// Ids of all participants, sorted
    pub fn list_participants(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.participants.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.participants.contains_key(participant_id)
    }

    pub fn get(&self, participant_id: &str) -> Result<&Participant, StudyError> {
        self.participants
            .get(participant_id)
            .ok_or_else(|| StudyError::not_found("participant", participant_id))
    }

    pub fn get_mut(&mut self, participant_id: &str) -> Result<&mut Participant, StudyError> {
        self.participants
            .get_mut(participant_id)
            .ok_or_else(|| StudyError::not_found("participant", participant_id))
    }

    /// Look up one session of one participant
    pub fn session(&self, participant_id: &str, session_id: &str) -> Result<&Session, StudyError> {
        self.get(participant_id)?.get(session_id)
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    /// Participants assigned to `arm`, sorted by id
    pub fn participants_in_arm(&self, arm: StudyArm) -> Vec<&Participant> {
        let mut members: Vec<&Participant> = self
            .participants
            .values()
            .filter(|p| p.study_arm() == arm)
            .collect();
        members.sort_by(|a, b| a.participant_id().cmp(b.participant_id()));
        members
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Total number of sessions across all participants
    pub fn session_count(&self) -> usize {
        self.participants.values().map(Participant::session_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::session;

    #[test]
    fn test_participant_add_session_overwrites_same_id() {
        let mut ppt = Participant::new("5004", 1, session("1", &["h"]));
        ppt.add_session(session("2", &["n"]));
        assert_eq!(ppt.list_sessions(), vec!["1", "2"]);

        ppt.add_session(session("1", &["s", "s"]));
        assert_eq!(ppt.list_sessions().len(), 2);
        assert_eq!(ppt.get("1").unwrap().trial_types(), &["s", "s"]);
    }

    #[test]
    fn test_participant_get_missing_session() {
        let ppt = Participant::new("5004", 1, session("1", &["h"]));
        let err = ppt.get("9").unwrap_err();
        assert!(matches!(err, StudyError::NotFound { kind: "session", ref key } if key == "9"));
    }

    #[test]
    fn test_participant_with_sessions() {
        let ppt = Participant::with_sessions(
            "100",
            2,
            vec![session("1", &["h"]), session("2", &["n"]), session("1", &["s"])],
        )
        .unwrap();

        assert_eq!(ppt.session_count(), 2);
        assert_eq!(ppt.get("1").unwrap().trial_types(), &["s"]);
        assert_eq!(ppt.study_arm(), 2);

        assert!(matches!(
            Participant::with_sessions("100", 2, Vec::new()),
            Err(StudyError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_study_add_and_lookup() {
        let mut study = Study::new("BIODEP");
        study.add_new_participant("5004", 1, session("1", &["h"]));
        study.add_new_participant("5005", 3, session("1", &["n"]));

        assert_eq!(study.list_participants(), vec!["5004", "5005"]);
        assert_eq!(study.get("5005").unwrap().study_arm(), 3);
        assert!(study.contains("5004"));
        assert_eq!(study.session_count(), 2);
        assert_eq!(study.session("5004", "1").unwrap().len(), 1);

        assert!(matches!(
            study.get("42"),
            Err(StudyError::NotFound { kind: "participant", .. })
        ));
        assert!(matches!(
            study.session("5004", "2"),
            Err(StudyError::NotFound { kind: "session", .. })
        ));
    }

    #[test]
    fn test_study_add_participant_overwrites() {
        let mut study = Study::with_participants(
            "BIODEP",
            vec![Participant::new("5004", 1, session("1", &["h"]))],
        );
        study.add_participant(Participant::new("5004", 4, session("2", &["h"])));

        assert_eq!(study.participant_count(), 1);
        assert_eq!(study.get("5004").unwrap().study_arm(), 4);
        assert_eq!(study.get("5004").unwrap().list_sessions(), vec!["2"]);
    }

    #[test]
    fn test_participants_in_arm() {
        let study = Study::with_participants(
            "BIODEP",
            vec![
                Participant::new("5006", 1, session("1", &["h"])),
                Participant::new("5004", 1, session("1", &["h"])),
                Participant::new("5005", 2, session("1", &["h"])),
            ],
        );

        let controls: Vec<&str> = study
            .participants_in_arm(1)
            .iter()
            .map(|p| p.participant_id())
            .collect();
        assert_eq!(controls, vec!["5004", "5006"]);
    }
}
