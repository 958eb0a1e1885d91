//! Account statistics derived from the stored lessons.

use memelingo_schema::{Lesson, ProficiencyLevel};
use serde::Serialize;

/// Aggregates shown on the account page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStats {
    pub total_lessons: usize,
    pub beginner_lessons: usize,
    pub intermediate_lessons: usize,
    pub advanced_lessons: usize,
    pub total_vocabulary: usize,
    pub total_questions: usize,
}

impl LearningStats {
    pub fn from_lessons(lessons: &[Lesson]) -> Self {
        let mut stats = LearningStats::default();

        for lesson in lessons {
            stats.total_lessons += 1;
            stats.total_vocabulary += lesson.vocabulary.len();
            stats.total_questions += lesson.questions.len();

            match lesson.level {
                ProficiencyLevel::Beginner => stats.beginner_lessons += 1,
                ProficiencyLevel::Intermediate => stats.intermediate_lessons += 1,
                ProficiencyLevel::Advanced => stats.advanced_lessons += 1,
            }
        }

        stats
    }

    /// Average vocabulary entries per lesson, rounded; 0 without lessons.
    pub fn words_per_lesson(&self) -> usize {
        if self.total_lessons == 0 {
            0
        } else {
            ((self.total_vocabulary as f64) / (self.total_lessons as f64)).round() as usize
        }
    }
}

/// Sorts lessons newest-first, the display order of the saved-lessons page.
pub fn recent_first(lessons: &mut [Lesson]) {
    lessons.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
