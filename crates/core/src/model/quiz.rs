use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{AssignmentId, QuizId};

/// Points awarded for a correct answer unless the author says otherwise.
pub const DEFAULT_POINTS: u32 = 20;

/// Longest accepted question text, in characters.
pub const MAX_QUESTION_LEN: usize = 500;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("question text cannot be empty")]
    EmptyQuestion,

    #[error("question text exceeds {MAX_QUESTION_LEN} characters")]
    QuestionTooLong,

    #[error("option {0} cannot be empty")]
    EmptyOption(OptionLetter),

    #[error("invalid option letter: {0:?}")]
    InvalidLetter(String),
}

//
// ─── OPTION LETTER ─────────────────────────────────────────────────────────────
//

/// One of the four answer slots of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
}

impl OptionLetter {
    pub const ALL: [OptionLetter; 4] = [Self::A, Self::B, Self::C, Self::D];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }

    /// Case-insensitive comparison against a learner's raw selection.
    ///
    /// Anything that is not one of the four letters simply does not match.
    #[must_use]
    pub fn matches(self, selected: &str) -> bool {
        selected.eq_ignore_ascii_case(self.as_str())
    }

    fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
        }
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionLetter {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|letter| letter.matches(s.trim()))
            .ok_or_else(|| QuizError::InvalidLetter(s.to_owned()))
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question belonging to an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    assignment_id: AssignmentId,
    question: String,
    options: [String; 4],
    correct: OptionLetter,
    points: u32,
    order_index: i32,
}

impl Quiz {
    /// Creates a question. The correct answer is typed, so it is always one of
    /// the four defined options.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the question or any option is blank, or the
    /// question is too long.
    pub fn new(
        id: QuizId,
        assignment_id: AssignmentId,
        question: impl Into<String>,
        options: [String; 4],
        correct: OptionLetter,
        points: u32,
        order_index: i32,
    ) -> Result<Self, QuizError> {
        let question = Self::clean_question(&question.into())?;
        Self::check_options(&options)?;

        Ok(Self {
            id,
            assignment_id,
            question,
            options,
            correct,
            points,
            order_index,
        })
    }

    /// Trimmed question text, checked for emptiness and length.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyQuestion` or `QuizError::QuestionTooLong`.
    pub fn clean_question(question: &str) -> Result<String, QuizError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QuizError::EmptyQuestion);
        }
        if question.chars().count() > MAX_QUESTION_LEN {
            return Err(QuizError::QuestionTooLong);
        }
        Ok(question.to_owned())
    }

    /// # Errors
    ///
    /// Returns `QuizError::EmptyOption` naming the first blank option.
    pub fn check_options(options: &[String; 4]) -> Result<(), QuizError> {
        for letter in OptionLetter::ALL {
            if options[letter.index()].trim().is_empty() {
                return Err(QuizError::EmptyOption(letter));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn assignment_id(&self) -> AssignmentId {
        self.assignment_id
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn option(&self, letter: OptionLetter) -> &str {
        &self.options[letter.index()]
    }

    #[must_use]
    pub fn options(&self) -> &[String; 4] {
        &self.options
    }

    #[must_use]
    pub fn correct(&self) -> OptionLetter {
        self.correct
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn order_index(&self) -> i32 {
        self.order_index
    }

    /// Display order: by `order_index`, ties broken by id.
    #[must_use]
    pub fn display_order(&self, other: &Self) -> Ordering {
        self.order_index
            .cmp(&other.order_index)
            .then(self.id.cmp(&other.id))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
