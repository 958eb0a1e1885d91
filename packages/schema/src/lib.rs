//! Shared data model for MemeLingo.
//!
//! These types describe the wire format spoken by the backend proxy and the
//! records persisted by the client store: camelCase field names and
//! epoch-millisecond timestamps, matching the JSON the generation endpoints
//! emit.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Current time as epoch milliseconds, the timestamp convention used in every
/// record.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ============================================================
// MediaItem
// ============================================================

/// A single image post shown in the feed.
///
/// Uniquely identified by `id`; a later fetch of the same id overwrites the
/// record (last-write-wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    pub source_url: String,
    pub origin_subreddit: String,
    pub permalink: String,
    pub upvote_count: i64,
    pub author: String,
    pub created_at: i64,
}

// ============================================================
// Proficiency levels and explanation languages
// ============================================================

/// Learner proficiency level controlling generation difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProficiencyLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl ProficiencyLevel {
    pub const ALL: [ProficiencyLevel; 3] = [
        ProficiencyLevel::Beginner,
        ProficiencyLevel::Intermediate,
        ProficiencyLevel::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProficiencyLevel::Beginner => "beginner",
            ProficiencyLevel::Intermediate => "intermediate",
            ProficiencyLevel::Advanced => "advanced",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "beginner" => Some(ProficiencyLevel::Beginner),
            "intermediate" => Some(ProficiencyLevel::Intermediate),
            "advanced" => Some(ProficiencyLevel::Advanced),
            _ => None,
        }
    }
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Languages an explanation can be requested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Russian,
    Spanish,
    French,
    German,
    Italian,
    Portuguese,
    Chinese,
    Japanese,
    Korean,
    Arabic,
    Hindi,
    Turkish,
    Polish,
    Dutch,
    Swedish,
    Norwegian,
    Danish,
    Finnish,
    Czech,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Russian => "russian",
            Language::Spanish => "spanish",
            Language::French => "french",
            Language::German => "german",
            Language::Italian => "italian",
            Language::Portuguese => "portuguese",
            Language::Chinese => "chinese",
            Language::Japanese => "japanese",
            Language::Korean => "korean",
            Language::Arabic => "arabic",
            Language::Hindi => "hindi",
            Language::Turkish => "turkish",
            Language::Polish => "polish",
            Language::Dutch => "dutch",
            Language::Swedish => "swedish",
            Language::Norwegian => "norwegian",
            Language::Danish => "danish",
            Language::Finnish => "finnish",
            Language::Czech => "czech",
        }
    }

    /// English name of the language.
    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Russian => "Russian",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Italian => "Italian",
            Language::Portuguese => "Portuguese",
            Language::Chinese => "Chinese",
            Language::Japanese => "Japanese",
            Language::Korean => "Korean",
            Language::Arabic => "Arabic",
            Language::Hindi => "Hindi",
            Language::Turkish => "Turkish",
            Language::Polish => "Polish",
            Language::Dutch => "Dutch",
            Language::Swedish => "Swedish",
            Language::Norwegian => "Norwegian",
            Language::Danish => "Danish",
            Language::Finnish => "Finnish",
            Language::Czech => "Czech",
        }
    }

    /// Name in the language itself, as shown in the language picker.
    pub fn native_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Russian => "Русский",
            Language::Spanish => "Español",
            Language::French => "Français",
            Language::German => "Deutsch",
            Language::Italian => "Italiano",
            Language::Portuguese => "Português",
            Language::Chinese => "中文",
            Language::Japanese => "日本語",
            Language::Korean => "한국어",
            Language::Arabic => "العربية",
            Language::Hindi => "हिन्दी",
            Language::Turkish => "Türkçe",
            Language::Polish => "Polski",
            Language::Dutch => "Nederlands",
            Language::Swedish => "Svenska",
            Language::Norwegian => "Norsk",
            Language::Danish => "Dansk",
            Language::Finnish => "Suomi",
            Language::Czech => "Čeština",
        }
    }

    /// Label used inside prompt templates, e.g. `Russian (Русский)`.
    pub fn prompt_label(&self) -> String {
        let name = self.name();
        let native = self.native_name();
        if name == native {
            name.to_string()
        } else {
            format!("{name} ({native})")
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// Lessons and quizzes
// ============================================================

/// One vocabulary entry of a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    pub word: String,
    pub definition: String,
    pub example: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    FillInTheGap,
    TrueFalse,
}

/// A single quiz question.
///
/// `options` is present for multiple-choice and true/false questions and
/// empty for fill-in-the-gap ones; a missing field on the wire decodes to an
/// empty list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(rename = "question")]
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
}

/// A generated vocabulary lesson tied to one media item and level.
///
/// Immutable after creation; bookmarking is a separate [`SavedLessonMarker`]
/// record referencing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    #[serde(rename = "memeId")]
    pub media_item_id: String,
    pub level: ProficiencyLevel,
    pub explanation: String,
    pub vocabulary: Vec<VocabularyItem>,
    pub questions: Vec<QuizQuestion>,
    pub created_at: i64,
}

/// A generated natural-language explanation of a media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub id: String,
    #[serde(rename = "memeId")]
    pub media_item_id: String,
    pub language: Language,
    #[serde(rename = "explanation")]
    pub explanation_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cultural_context: Option<String>,
    pub created_at: i64,
}

// ============================================================
// Progress and bookmarks
// ============================================================

/// Submitted answers and resulting score for one lesson.
///
/// Keyed by `lesson_id`; resubmission overwrites the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub lesson_id: String,
    pub answers: HashMap<String, String>,
    pub score: u8,
    pub completed_at: i64,
}

/// Bookmark marker; its presence means the lesson was explicitly saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedLessonMarker {
    pub lesson_id: String,
    pub saved_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_question_wire_names() {
        let question = QuizQuestion {
            id: "q1".to_string(),
            kind: QuestionKind::MultipleChoice,
            prompt: "What does 'word' mean?".to_string(),
            options: vec!["A".to_string(), "B".to_string()],
            correct_answer: "B".to_string(),
            explanation: "Because.".to_string(),
        };

        let value = serde_json::to_value(&question).unwrap();
        assert_eq!(value["type"], "multiple_choice");
        assert_eq!(value["question"], "What does 'word' mean?");
        assert_eq!(value["correctAnswer"], "B");
    }

    #[test]
    fn quiz_question_options_default_to_empty() {
        let question: QuizQuestion = serde_json::from_str(
            r#"{
                "id": "q2",
                "type": "fill_in_the_gap",
                "question": "Fill in the gap: 'The cat _____ on the computer'",
                "correctAnswer": "sits",
                "explanation": "Present simple."
            }"#,
        )
        .unwrap();

        assert_eq!(question.kind, QuestionKind::FillInTheGap);
        assert!(question.options.is_empty());
    }

    #[test]
    fn lesson_round_trips_through_json() {
        let lesson = Lesson {
            id: "lesson_abc_beginner_1".to_string(),
            media_item_id: "abc".to_string(),
            level: ProficiencyLevel::Beginner,
            explanation: String::new(),
            vocabulary: vec![VocabularyItem {
                word: "idiom".to_string(),
                definition: "a phrase with a non-literal meaning".to_string(),
                example: "Break a leg!".to_string(),
            }],
            questions: Vec::new(),
            created_at: 1_700_000_000_000,
        };

        let json = serde_json::to_string(&lesson).unwrap();
        assert!(json.contains("\"memeId\":\"abc\""));
        assert!(json.contains("\"level\":\"beginner\""));
        let back: Lesson = serde_json::from_str(&json).unwrap();
        assert_eq!(back, lesson);
    }

    #[test]
    fn level_parse_matches_as_str() {
        for level in ProficiencyLevel::ALL {
            assert_eq!(ProficiencyLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(ProficiencyLevel::parse("expert"), None);
    }

    #[test]
    fn language_serializes_lowercase() {
        let json = serde_json::to_string(&Language::Russian).unwrap();
        assert_eq!(json, "\"russian\"");
        let back: Language = serde_json::from_str("\"czech\"").unwrap();
        assert_eq!(back, Language::Czech);
    }

    #[test]
    fn prompt_labels() {
        assert_eq!(Language::English.prompt_label(), "English");
        assert_eq!(Language::Russian.prompt_label(), "Russian (Русский)");
        assert_eq!(Language::German.prompt_label(), "German (Deutsch)");
    }

    #[test]
    fn explanation_omits_empty_cultural_context() {
        let explanation = Explanation {
            id: "explanation_abc_english_1".to_string(),
            media_item_id: "abc".to_string(),
            language: Language::English,
            explanation_text: "A cat meme.".to_string(),
            cultural_context: None,
            created_at: 1,
        };

        let json = serde_json::to_string(&explanation).unwrap();
        assert!(!json.contains("culturalContext"));
    }
}
