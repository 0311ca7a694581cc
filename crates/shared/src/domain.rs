use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId, Uuid);
id_newtype!(InterviewId, String);
id_newtype!(QuestionId, String);

impl InterviewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl QuestionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Authenticated user record. At most one is active per session store;
/// absence means unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

/// Snapshot of the authentication state. `loading` is true from process
/// start until restore settles, and again for the duration of any in-flight
/// credential operation; identity must not be treated as settled while it
/// is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewPhase {
    NotStarted,
    Live,
    Assessment,
}

/// One questionnaire question. The catalog is immutable once loaded; the
/// engine is content-agnostic over the three kinds. `correct` carries the
/// optional answer key used for scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Question {
    Text {
        id: QuestionId,
        prompt: String,
    },
    SingleChoice {
        id: QuestionId,
        prompt: String,
        options: Vec<String>,
        #[serde(default)]
        correct: Option<usize>,
    },
    MultiChoice {
        id: QuestionId,
        prompt: String,
        options: Vec<String>,
        #[serde(default)]
        correct: Option<BTreeSet<usize>>,
    },
}

impl Question {
    pub fn id(&self) -> &QuestionId {
        match self {
            Question::Text { id, .. }
            | Question::SingleChoice { id, .. }
            | Question::MultiChoice { id, .. } => id,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Question::Text { prompt, .. }
            | Question::SingleChoice { prompt, .. }
            | Question::MultiChoice { prompt, .. } => prompt,
        }
    }
}

/// Typed answer value, keyed by question kind: free text for `Text`, a
/// selected option index for `SingleChoice`, a set of option indices for
/// `MultiChoice`. Every read/write site matches exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Text(String),
    Choice(usize),
    Selections(BTreeSet<usize>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_state_defaults_to_loading_and_logged_out() {
        let state = SessionState::default();
        assert!(state.identity.is_none());
        assert!(state.loading);
    }

    #[test]
    fn identity_round_trips_through_json() {
        let identity = Identity {
            id: UserId(Uuid::new_v4()),
            email: "jordan@example.com".to_string(),
            name: "jordan".to_string(),
        };
        let raw = serde_json::to_string(&identity).expect("serialize");
        let parsed: Identity = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(parsed, identity);
    }

    #[test]
    fn question_accessors_cover_every_kind() {
        let questions = vec![
            Question::Text {
                id: QuestionId::new("q1"),
                prompt: "Describe the problem.".to_string(),
            },
            Question::SingleChoice {
                id: QuestionId::new("q2"),
                prompt: "Pick one.".to_string(),
                options: vec!["a".to_string(), "b".to_string()],
                correct: Some(1),
            },
            Question::MultiChoice {
                id: QuestionId::new("q3"),
                prompt: "Pick any.".to_string(),
                options: vec!["a".to_string(), "b".to_string()],
                correct: None,
            },
        ];
        let ids: Vec<&str> = questions.iter().map(|q| q.id().0.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q2", "q3"]);
        assert_eq!(questions[1].prompt(), "Pick one.");
    }
}
