//! Practice-question state machine for one slide.
//!
//! Each question moves `Unanswered → Answered(selection) → Checked`. A
//! selection can be changed freely until the question is checked; after that
//! only [`QuizSession::reset`] (which clears every question at once) brings it
//! back to `Unanswered`.

use crate::error::LecSlideError;
use crate::model::{Question, QuestionKind};
use serde::Serialize;
use thiserror::Error;

/// A learner's selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    /// Index into a multiple-choice question's options.
    Choice(usize),
    /// A true/false verdict.
    Verdict(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionState {
    Unanswered,
    Answered(Answer),
    Checked { answer: Answer, correct: bool },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("no question at index {0}")]
    NoSuchQuestion(usize),

    #[error("question {0} has already been checked")]
    AlreadyChecked(usize),

    #[error("question {0} has no answer to check")]
    NotAnswered(usize),

    #[error("answer does not fit question {index}: {reason}")]
    InvalidAnswer { index: usize, reason: String },
}

impl From<QuizError> for LecSlideError {
    fn from(e: QuizError) -> Self {
        LecSlideError::InvalidInput(e.to_string())
    }
}

/// Running tally: only checked questions count as attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub correct: usize,
    pub attempted: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<Question>,
    states: Vec<QuestionState>,
    revealed: bool,
}

impl QuizSession {
    pub fn new(questions: Vec<Question>) -> Self {
        let states = vec![QuestionState::Unanswered; questions.len()];
        Self {
            questions,
            states,
            revealed: false,
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn state(&self, index: usize) -> Option<QuestionState> {
        self.states.get(index).copied()
    }

    /// Whether `check_all` has been run since the last reset.
    pub fn answers_revealed(&self) -> bool {
        self.revealed
    }

    /// Record (or change) the selection for a question.
    pub fn select(&mut self, index: usize, answer: Answer) -> Result<(), QuizError> {
        let question = self.questions.get(index).ok_or(QuizError::NoSuchQuestion(index))?;
        if let QuestionState::Checked { .. } = self.states[index] {
            return Err(QuizError::AlreadyChecked(index));
        }

        match (&question.kind, answer) {
            (QuestionKind::MultipleChoice { options, .. }, Answer::Choice(i)) if i >= options.len() => {
                return Err(QuizError::InvalidAnswer {
                    index,
                    reason: format!("option {} of {}", i, options.len()),
                });
            }
            (QuestionKind::MultipleChoice { .. }, Answer::Choice(_))
            | (QuestionKind::TrueFalse { .. }, Answer::Verdict(_)) => {}
            (QuestionKind::MultipleChoice { .. }, Answer::Verdict(_)) => {
                return Err(QuizError::InvalidAnswer {
                    index,
                    reason: "multiple-choice needs an option index".into(),
                });
            }
            (QuestionKind::TrueFalse { .. }, Answer::Choice(_)) => {
                return Err(QuizError::InvalidAnswer {
                    index,
                    reason: "true-false needs true or false".into(),
                });
            }
        }

        self.states[index] = QuestionState::Answered(answer);
        Ok(())
    }

    /// Grade one answered question. Returns whether it was correct.
    pub fn check(&mut self, index: usize) -> Result<bool, QuizError> {
        let question = self.questions.get(index).ok_or(QuizError::NoSuchQuestion(index))?;
        match self.states[index] {
            QuestionState::Unanswered => Err(QuizError::NotAnswered(index)),
            QuestionState::Checked { .. } => Err(QuizError::AlreadyChecked(index)),
            QuestionState::Answered(answer) => {
                let correct = is_correct(question, answer);
                self.states[index] = QuestionState::Checked { answer, correct };
                Ok(correct)
            }
        }
    }

    /// Grade every answered question; unanswered ones stay as they are.
    pub fn check_all(&mut self) -> Score {
        for (question, state) in self.questions.iter().zip(self.states.iter_mut()) {
            if let QuestionState::Answered(answer) = *state {
                *state = QuestionState::Checked {
                    answer,
                    correct: is_correct(question, answer),
                };
            }
        }
        self.revealed = true;
        self.score()
    }

    pub fn reset(&mut self) {
        self.states.fill(QuestionState::Unanswered);
        self.revealed = false;
    }

    pub fn score(&self) -> Score {
        let (correct, attempted) = self.states.iter().fold((0, 0), |(c, a), s| match s {
            QuestionState::Checked { correct: true, .. } => (c + 1, a + 1),
            QuestionState::Checked { correct: false, .. } => (c, a + 1),
            _ => (c, a),
        });
        Score {
            correct,
            attempted,
            total: self.questions.len(),
        }
    }
}

fn is_correct(question: &Question, answer: Answer) -> bool {
    match (&question.kind, answer) {
        (QuestionKind::MultipleChoice { correct_answer, .. }, Answer::Choice(i)) => i == *correct_answer,
        (QuestionKind::TrueFalse { correct_answer }, Answer::Verdict(v)) => v == *correct_answer,
        _ => false,
    }
}
