//! Pure quiz scoring.
//!
//! The quiz set passed in is the authoritative source of correct answers and
//! point values; a submission carries nothing but quiz ids and raw selections.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{Quiz, QuizId};

//
// ─── INPUT / OUTPUT ────────────────────────────────────────────────────────────
//

/// One entry of a learner's submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub quiz_id: QuizId,
    pub selected: String,
}

impl SubmittedAnswer {
    #[must_use]
    pub fn new(quiz_id: QuizId, selected: impl Into<String>) -> Self {
        Self {
            quiz_id,
            selected: selected.into(),
        }
    }
}

/// Why a submitted entry was left out of scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The quiz id is not part of the assignment.
    UnknownQuiz,
    /// The quiz was already answered earlier in the same submission.
    Duplicate,
}

/// A matched submission entry with its correctness and points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredEntry {
    pub quiz_id: QuizId,
    pub selected: String,
    pub is_correct: bool,
    pub points_earned: u32,
}

/// Result of scoring a full submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScoreSheet {
    /// Scored entries in submission order.
    pub entries: Vec<ScoredEntry>,
    pub total_score: u32,
    pub skipped: Vec<(QuizId, SkipReason)>,
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Sum of all question points; saturates rather than wrapping.
#[must_use]
pub fn max_score(quizzes: &[Quiz]) -> u32 {
    quizzes
        .iter()
        .fold(0_u32, |acc, quiz| acc.saturating_add(quiz.points()))
}

/// Score a submission against the assignment's quizzes.
///
/// - Entries whose quiz id is not in `quizzes` are skipped silently.
/// - Only the first entry per quiz is scored; later repeats are skipped.
/// - Letters compare case-insensitively; a correct answer earns the quiz's
///   points, anything else earns zero.
#[must_use]
pub fn score_submission(quizzes: &[Quiz], submitted: &[SubmittedAnswer]) -> ScoreSheet {
    let by_id: HashMap<QuizId, &Quiz> = quizzes.iter().map(|q| (q.id(), q)).collect();
    let mut seen = HashSet::with_capacity(submitted.len());
    let mut sheet = ScoreSheet::default();

    for answer in submitted {
        let Some(quiz) = by_id.get(&answer.quiz_id) else {
            sheet.skipped.push((answer.quiz_id, SkipReason::UnknownQuiz));
            continue;
        };
        if !seen.insert(answer.quiz_id) {
            sheet.skipped.push((answer.quiz_id, SkipReason::Duplicate));
            continue;
        }

        let is_correct = quiz.correct().matches(&answer.selected);
        let points_earned = if is_correct { quiz.points() } else { 0 };
        sheet.total_score = sheet.total_score.saturating_add(points_earned);
        sheet.entries.push(ScoredEntry {
            quiz_id: answer.quiz_id,
            selected: answer.selected.clone(),
            is_correct,
            points_earned,
        });
    }

    sheet
}

/// Percentage of `max` achieved, `0.0` when nothing was achievable.
#[must_use]
pub fn score_percentage(total: u32, max: u32) -> f64 {
    if max == 0 {
        return 0.0;
    }
    f64::from(total) / f64::from(max) * 100.0
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssignmentId, DEFAULT_POINTS, OptionLetter};

    const KEY: [OptionLetter; 5] = [
        OptionLetter::A,
        OptionLetter::B,
        OptionLetter::C,
        OptionLetter::D,
        OptionLetter::A,
    ];

    fn quiz(id: u64, correct: OptionLetter, points: u32) -> Quiz {
        Quiz::new(
            QuizId::new(id),
            AssignmentId::new(1),
            format!("Question {id}"),
            ["a".into(), "b".into(), "c".into(), "d".into()],
            correct,
            points,
            i32::try_from(id).unwrap(),
        )
        .unwrap()
    }

    fn five_quizzes(points: [u32; 5]) -> Vec<Quiz> {
        (0..5)
            .map(|i| quiz(i as u64 + 1, KEY[i], points[i]))
            .collect()
    }

    fn wrong(letter: OptionLetter) -> &'static str {
        match letter {
            OptionLetter::A => "B",
            _ => "A",
        }
    }

    #[test]
    fn all_correct_scores_max() {
        let quizzes = five_quizzes([DEFAULT_POINTS; 5]);
        let submitted: Vec<_> = quizzes
            .iter()
            .map(|q| SubmittedAnswer::new(q.id(), q.correct().as_str()))
            .collect();

        let sheet = score_submission(&quizzes, &submitted);
        assert_eq!(sheet.total_score, 100);
        assert_eq!(sheet.total_score, max_score(&quizzes));
        assert!(sheet.entries.iter().all(|e| e.is_correct && e.points_earned == 20));
    }

    #[test]
    fn all_incorrect_scores_zero() {
        let quizzes = five_quizzes([DEFAULT_POINTS; 5]);
        let submitted: Vec<_> = quizzes
            .iter()
            .map(|q| SubmittedAnswer::new(q.id(), wrong(q.correct())))
            .collect();

        let sheet = score_submission(&quizzes, &submitted);
        assert_eq!(sheet.total_score, 0);
        assert_eq!(sheet.entries.len(), 5);
        assert!(sheet.entries.iter().all(|e| !e.is_correct && e.points_earned == 0));
    }

    #[test]
    fn three_of_five_scores_sixty() {
        let quizzes = five_quizzes([DEFAULT_POINTS; 5]);
        let submitted: Vec<_> = quizzes
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let letter = if i < 3 { q.correct().as_str() } else { wrong(q.correct()) };
                SubmittedAnswer::new(q.id(), letter)
            })
            .collect();

        let sheet = score_submission(&quizzes, &submitted);
        assert_eq!(sheet.total_score, 60);
        assert_eq!(sheet.entries.iter().filter(|e| e.is_correct).count(), 3);
        assert_eq!(sheet.entries.iter().filter(|e| !e.is_correct).count(), 2);
    }

    #[test]
    fn lowercase_letters_score_as_correct() {
        let quizzes = five_quizzes([DEFAULT_POINTS; 5]);
        let submitted: Vec<_> = quizzes
            .iter()
            .map(|q| SubmittedAnswer::new(q.id(), q.correct().as_str().to_lowercase()))
            .collect();

        let sheet = score_submission(&quizzes, &submitted);
        assert_eq!(sheet.total_score, 100);
        assert_eq!(sheet.entries[0].selected, "a");
    }

    #[test]
    fn total_is_sum_of_points_for_correct_answers() {
        let points = [10, 15, 20, 25, 30];
        let quizzes = five_quizzes(points);

        // every correctness combination over five questions
        for mask in 0_u32..32 {
            let submitted: Vec<_> = quizzes
                .iter()
                .enumerate()
                .map(|(i, q)| {
                    let letter = if mask & (1 << i) != 0 {
                        q.correct().as_str()
                    } else {
                        wrong(q.correct())
                    };
                    SubmittedAnswer::new(q.id(), letter)
                })
                .collect();

            let expected: u32 = (0..5)
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| points[i])
                .sum();
            assert_eq!(score_submission(&quizzes, &submitted).total_score, expected);
        }
    }

    #[test]
    fn unknown_quiz_ids_are_skipped() {
        let quizzes = five_quizzes([DEFAULT_POINTS; 5]);
        let submitted = vec![
            SubmittedAnswer::new(QuizId::new(1), "A"),
            SubmittedAnswer::new(QuizId::new(99), "A"),
            SubmittedAnswer::new(QuizId::new(2), "B"),
        ];

        let sheet = score_submission(&quizzes, &submitted);
        assert_eq!(sheet.total_score, 40);
        assert_eq!(sheet.entries.len(), 2);
        assert_eq!(sheet.skipped, vec![(QuizId::new(99), SkipReason::UnknownQuiz)]);
    }

    #[test]
    fn repeated_quiz_ids_score_once() {
        let quizzes = five_quizzes([DEFAULT_POINTS; 5]);
        let submitted = vec![
            SubmittedAnswer::new(QuizId::new(1), "B"),
            SubmittedAnswer::new(QuizId::new(1), "A"),
        ];

        let sheet = score_submission(&quizzes, &submitted);
        assert_eq!(sheet.total_score, 0);
        assert_eq!(sheet.entries.len(), 1);
        assert_eq!(sheet.skipped, vec![(QuizId::new(1), SkipReason::Duplicate)]);
    }

    #[test]
    fn percentage_handles_zero_max() {
        assert!((score_percentage(0, 0)).abs() < f64::EPSILON);
        assert!((score_percentage(60, 100) - 60.0).abs() < f64::EPSILON);
        assert!((score_percentage(1, 3) - 33.333_333).abs() < 1e-3);
    }
}
