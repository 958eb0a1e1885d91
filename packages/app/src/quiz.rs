//! Quiz grading.
//!
//! One comparison policy for every call site: multiple-choice answers are
//! chosen from fixed option strings and must match exactly, while typed
//! answers (fill-in-the-gap) and true/false answers match case-insensitively
//! after trimming.

use std::collections::HashMap;

use memelingo_schema::{Lesson, QuestionKind, QuizQuestion};

/// Outcome of grading one question.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionResult {
    pub question_id: String,
    pub user_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: String,
}

/// Result summary of one quiz submission.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSummary {
    pub score: u8,
    pub correct_count: usize,
    pub total: usize,
    pub results: Vec<QuestionResult>,
}

pub fn answer_matches(question: &QuizQuestion, answer: &str) -> bool {
    match question.kind {
        QuestionKind::MultipleChoice => answer == question.correct_answer,
        QuestionKind::FillInTheGap | QuestionKind::TrueFalse => {
            answer.trim().to_lowercase() == question.correct_answer.trim().to_lowercase()
        }
    }
}

/// Grades `answers` against the lesson's questions.
///
/// `score = round(100 * correct / total)`; an unanswered question counts as
/// incorrect, and a lesson without questions scores 0.
pub fn score_answers(lesson: &Lesson, answers: &HashMap<String, String>) -> QuizSummary {
    let total = lesson.questions.len();
    let mut correct_count = 0;

    let results: Vec<QuestionResult> = lesson
        .questions
        .iter()
        .map(|question| {
            let user_answer = answers.get(&question.id).cloned();
            let is_correct = user_answer
                .as_deref()
                .map(|answer| answer_matches(question, answer))
                .unwrap_or(false);
            if is_correct {
                correct_count += 1;
            }

            QuestionResult {
                question_id: question.id.clone(),
                user_answer,
                correct_answer: question.correct_answer.clone(),
                is_correct,
                explanation: question.explanation.clone(),
            }
        })
        .collect();

    let score = if total == 0 {
        0
    } else {
        ((correct_count as f64 / total as f64) * 100.0).round() as u8
    };

    QuizSummary {
        score,
        correct_count,
        total,
        results,
    }
}
