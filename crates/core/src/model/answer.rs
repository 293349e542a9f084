use chrono::{DateTime, Utc};

use crate::model::ids::{AnswerId, ProgressId, QuizId};

/// A learner's scored response to one question.
///
/// Answers only come into existence as part of a submission and are never
/// edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub id: AnswerId,
    pub quiz_id: QuizId,
    pub progress_id: ProgressId,
    /// Raw selection as submitted, e.g. `"a"` or `"B"`.
    pub selected: String,
    pub is_correct: bool,
    pub points_earned: u32,
    pub answered_at: DateTime<Utc>,
}
