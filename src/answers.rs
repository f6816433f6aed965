//! Answer evaluation per exercise type.

use serde::{Deserialize, Serialize};

use crate::models::{ExerciseOption, ExerciseType};

/// A submitted answer: an option id for choice exercises, free text otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    OptionId(i64),
    Text(String),
}

impl Answer {
    fn option_id(&self) -> Option<i64> {
        match self {
            Answer::OptionId(id) => Some(*id),
            Answer::Text(text) => text.trim().parse().ok(),
        }
    }

    fn text(&self) -> String {
        match self {
            Answer::OptionId(id) => id.to_string(),
            Answer::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub is_correct: bool,
    /// Text of the expected answer, when one is defined.
    pub correct_answer: Option<String>,
}

fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

pub fn evaluate(
    exercise_type: ExerciseType,
    options: &[ExerciseOption],
    answer: &Answer,
) -> Evaluation {
    let correct_option = options.iter().find(|o| o.is_correct);
    let correct_answer = correct_option.map(|o| o.text.clone());

    let is_correct = if exercise_type.answers_with_text() {
        correct_option
            .is_some_and(|o| normalize_text(&o.text) == normalize_text(&answer.text()))
    } else {
        answer.option_id().is_some_and(|id| {
            options
                .iter()
                .any(|option| option.id == id && option.is_correct)
        })
    };

    Evaluation {
        is_correct,
        correct_answer,
    }
}
