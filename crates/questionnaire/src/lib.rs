use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{AnswerValue, InterviewId, Question, QuestionId};
use thiserror::Error;
use tracing::info;

const DEFAULT_ROUND_TRIP: Duration = Duration::from_millis(1500);

pub type AnswerSet = BTreeMap<QuestionId, AnswerValue>;
pub type QuestionErrors = BTreeMap<QuestionId, String>;

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("unknown question id {0}")]
    UnknownQuestion(QuestionId),
    #[error("answer kind does not match question {0}")]
    KindMismatch(QuestionId),
    #[error("option index {index} is out of range for question {question_id}")]
    OptionOutOfRange {
        question_id: QuestionId,
        index: usize,
    },
    #[error("questionnaire was already submitted")]
    AlreadySubmitted,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("questionnaire was already submitted")]
    AlreadySubmitted,
    #[error("{} question(s) failed validation", .0.len())]
    Validation(QuestionErrors),
    #[error("submission backend failed: {0}")]
    Backend(String),
}

/// Immutable snapshot of one completed questionnaire attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub interview_id: InterviewId,
    pub answers: AnswerSet,
    pub submitted_at: DateTime<Utc>,
}

/// The network seam for delivering a finished submission.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(&self, record: &SubmissionRecord) -> anyhow::Result<()>;
}

/// Simulated sink: sleeps one round trip and logs the record.
pub struct SimulatedSubmissionSink {
    round_trip: Duration,
}

impl SimulatedSubmissionSink {
    pub fn with_round_trip(round_trip: Duration) -> Self {
        Self { round_trip }
    }
}

impl Default for SimulatedSubmissionSink {
    fn default() -> Self {
        Self::with_round_trip(DEFAULT_ROUND_TRIP)
    }
}

#[async_trait]
impl SubmissionSink for SimulatedSubmissionSink {
    async fn submit(&self, record: &SubmissionRecord) -> anyhow::Result<()> {
        tokio::time::sleep(self.round_trip).await;
        info!(
            interview_id = %record.interview_id,
            answers = record.answers.len(),
            "submission accepted"
        );
        Ok(())
    }
}

/// Typed per-question input, mirroring the answer kinds: replace for text
/// and single choice, toggle set membership for multi choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerInput {
    Text(String),
    Choice(usize),
    ToggleSelection(usize),
}

/// Collects and validates answers for one fixed, ordered catalog. Once
/// submitted the engine is frozen: the snapshot is immutable and further
/// mutation fails with `AlreadySubmitted`.
pub struct QuestionnaireEngine {
    interview_id: InterviewId,
    questions: Vec<Question>,
    answers: AnswerSet,
    errors: QuestionErrors,
    submitting: bool,
    submission: Option<SubmissionRecord>,
}

impl QuestionnaireEngine {
    pub fn new(interview_id: InterviewId, questions: Vec<Question>) -> Self {
        Self {
            interview_id,
            questions,
            answers: AnswerSet::new(),
            errors: QuestionErrors::new(),
            submitting: false,
            submission: None,
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answer(&self, question_id: &QuestionId) -> Option<&AnswerValue> {
        self.answers.get(question_id)
    }

    pub fn errors(&self) -> &QuestionErrors {
        &self.errors
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_submitted(&self) -> bool {
        self.submission.is_some()
    }

    pub fn submission(&self) -> Option<&SubmissionRecord> {
        self.submission.as_ref()
    }

    /// Records one answer. The input is kind-checked against the question
    /// and option indices are bounds-checked; an accepted update clears
    /// that question's validation error and never touches any other entry.
    pub fn set_answer(
        &mut self,
        question_id: &QuestionId,
        input: AnswerInput,
    ) -> Result<(), AnswerError> {
        if self.submission.is_some() {
            return Err(AnswerError::AlreadySubmitted);
        }

        let question = self
            .questions
            .iter()
            .find(|question| question.id() == question_id)
            .ok_or_else(|| AnswerError::UnknownQuestion(question_id.clone()))?;

        match (question, input) {
            (Question::Text { .. }, AnswerInput::Text(text)) => {
                self.answers
                    .insert(question_id.clone(), AnswerValue::Text(text));
            }
            (Question::SingleChoice { options, .. }, AnswerInput::Choice(index)) => {
                if index >= options.len() {
                    return Err(AnswerError::OptionOutOfRange {
                        question_id: question_id.clone(),
                        index,
                    });
                }
                self.answers
                    .insert(question_id.clone(), AnswerValue::Choice(index));
            }
            (Question::MultiChoice { options, .. }, AnswerInput::ToggleSelection(index)) => {
                if index >= options.len() {
                    return Err(AnswerError::OptionOutOfRange {
                        question_id: question_id.clone(),
                        index,
                    });
                }
                let entry = self
                    .answers
                    .entry(question_id.clone())
                    .or_insert_with(|| AnswerValue::Selections(BTreeSet::new()));
                match entry {
                    AnswerValue::Selections(selected) => {
                        if !selected.remove(&index) {
                            selected.insert(index);
                        }
                    }
                    // kind-checked insert above makes any other variant
                    // unreachable for a multi-choice id
                    _ => unreachable!("multi-choice answers are always selection sets"),
                }
            }
            _ => return Err(AnswerError::KindMismatch(question_id.clone())),
        }

        self.errors.remove(question_id);
        Ok(())
    }

    /// Revalidates every question: required → blank → empty selection,
    /// exactly one message per failing question. The result replaces the
    /// stored error set.
    pub fn validate(&mut self) -> QuestionErrors {
        let mut errors = QuestionErrors::new();
        for question in &self.questions {
            let id = question.id();
            match self.answers.get(id) {
                None => {
                    errors.insert(id.clone(), "This question requires an answer".to_string());
                }
                Some(AnswerValue::Text(text)) if text.is_empty() => {
                    errors.insert(id.clone(), "This question requires an answer".to_string());
                }
                Some(AnswerValue::Text(text)) if text.trim().is_empty() => {
                    errors.insert(id.clone(), "Please provide a response".to_string());
                }
                Some(AnswerValue::Selections(selected)) if selected.is_empty() => {
                    errors.insert(
                        id.clone(),
                        "Please select at least one option".to_string(),
                    );
                }
                Some(_) => {}
            }
        }
        self.errors = errors.clone();
        errors
    }

    /// Validates, delivers through the sink, then freezes the engine with
    /// an immutable snapshot. A validation or backend failure leaves the
    /// engine unsubmitted; retries are the caller's choice.
    pub async fn submit(
        &mut self,
        sink: &dyn SubmissionSink,
    ) -> Result<&SubmissionRecord, SubmitError> {
        if self.submission.is_some() {
            return Err(SubmitError::AlreadySubmitted);
        }

        let errors = self.validate();
        if !errors.is_empty() {
            return Err(SubmitError::Validation(errors));
        }

        let record = SubmissionRecord {
            interview_id: self.interview_id.clone(),
            answers: self.answers.clone(),
            submitted_at: Utc::now(),
        };

        self.submitting = true;
        let delivery = sink.submit(&record).await;
        self.submitting = false;
        delivery.map_err(|error| SubmitError::Backend(error.to_string()))?;

        info!(interview_id = %record.interview_id, "questionnaire submitted");
        Ok(self.submission.insert(record))
    }
}

/// Auto-scored result: `correct` of `scorable`. Text questions carry no
/// answer key and are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub correct: usize,
    pub scorable: usize,
}

pub fn score(record: &SubmissionRecord, questions: &[Question]) -> Score {
    let mut tally = Score {
        correct: 0,
        scorable: 0,
    };
    for question in questions {
        match question {
            Question::Text { .. } => {}
            Question::SingleChoice {
                id,
                correct: Some(expected),
                ..
            } => {
                tally.scorable += 1;
                if record.answers.get(id) == Some(&AnswerValue::Choice(*expected)) {
                    tally.correct += 1;
                }
            }
            Question::MultiChoice {
                id,
                correct: Some(expected),
                ..
            } => {
                tally.scorable += 1;
                if record.answers.get(id) == Some(&AnswerValue::Selections(expected.clone())) {
                    tally.correct += 1;
                }
            }
            Question::SingleChoice { correct: None, .. }
            | Question::MultiChoice { correct: None, .. } => {}
        }
    }
    tally
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
