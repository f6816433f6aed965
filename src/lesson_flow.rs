//! Exercise progression within a lesson.
//!
//! Correct answers advance on their own after [`AUTO_ADVANCE_DELAY`];
//! incorrect ones wait for an explicit retry.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

pub const AUTO_ADVANCE_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum FlowState {
    PresentingExercise { index: usize },
    CheckingAnswer { index: usize },
    ShowingFeedback {
        index: usize,
        correct: bool,
        #[serde(skip)]
        elapsed: Duration,
    },
    ShowingSummary,
}

#[derive(Debug, Error, PartialEq)]
pub enum FlowError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("lesson has no exercises")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
    pub correct: usize,
    pub total: usize,
    pub xp_earned: i64,
    pub accuracy: f64,
}

#[derive(Debug, Clone)]
pub struct LessonFlow {
    state: FlowState,
    total: usize,
    answered_correctly: Vec<bool>,
    xp_earned: i64,
}

impl FlowState {
    fn name(&self) -> &'static str {
        match self {
            FlowState::PresentingExercise { .. } => "presenting an exercise",
            FlowState::CheckingAnswer { .. } => "checking an answer",
            FlowState::ShowingFeedback { .. } => "showing feedback",
            FlowState::ShowingSummary => "showing the summary",
        }
    }
}

impl LessonFlow {
    pub fn new(total: usize) -> Result<Self, FlowError> {
        if total == 0 {
            return Err(FlowError::Empty);
        }

        Ok(Self {
            state: FlowState::PresentingExercise { index: 0 },
            total,
            answered_correctly: vec![false; total],
            xp_earned: 0,
        })
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    fn invalid(&self, action: &'static str) -> FlowError {
        FlowError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    pub fn submit(&mut self) -> Result<(), FlowError> {
        match self.state {
            FlowState::PresentingExercise { index } => {
                self.state = FlowState::CheckingAnswer { index };
                Ok(())
            }
            _ => Err(self.invalid("submit")),
        }
    }

    pub fn resolve(&mut self, correct: bool, xp: i64) -> Result<(), FlowError> {
        match self.state {
            FlowState::CheckingAnswer { index } => {
                if correct {
                    self.answered_correctly[index] = true;
                    self.xp_earned += xp;
                }
                self.state = FlowState::ShowingFeedback {
                    index,
                    correct,
                    elapsed: Duration::ZERO,
                };
                Ok(())
            }
            _ => Err(self.invalid("resolve")),
        }
    }

    /// Advances time; returns true when the flow moved on.
    pub fn tick(&mut self, delta: Duration) -> bool {
        let FlowState::ShowingFeedback {
            index,
            correct: true,
            elapsed,
        } = self.state
        else {
            return false;
        };

        let elapsed = elapsed + delta;
        if elapsed < AUTO_ADVANCE_DELAY {
            self.state = FlowState::ShowingFeedback {
                index,
                correct: true,
                elapsed,
            };
            return false;
        }

        self.state = if index + 1 < self.total {
            FlowState::PresentingExercise { index: index + 1 }
        } else {
            FlowState::ShowingSummary
        };
        true
    }

    pub fn retry(&mut self) -> Result<(), FlowError> {
        match self.state {
            FlowState::ShowingFeedback {
                index,
                correct: false,
                ..
            } => {
                self.state = FlowState::PresentingExercise { index };
                Ok(())
            }
            _ => Err(self.invalid("retry")),
        }
    }

    pub fn summary(&self) -> Option<LessonSummary> {
        if self.state != FlowState::ShowingSummary {
            return None;
        }

        let correct = self.answered_correctly.iter().filter(|c| **c).count();
        Some(LessonSummary {
            correct,
            total: self.total,
            xp_earned: self.xp_earned,
            accuracy: correct as f64 / self.total as f64,
        })
    }
}
