//! Lesson generation endpoint.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use memelingo_schema::{now_millis, Lesson, ProficiencyLevel, QuizQuestion, VocabularyItem};
use serde::Deserialize;

use crate::routes::{generation_error, malformed_output_error};
use crate::state::AppState;

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 2000;
const FAILURE_MESSAGE: &str = "Failed to generate lesson. Please try again.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateLessonRequest {
    meme_id: String,
    meme_title: String,
    meme_url: String,
    level: ProficiencyLevel,
}

/// The JSON object the model is asked to return. Reusing the schema types
/// validates the required fields; `options` defaults to empty when omitted.
#[derive(Debug, Deserialize)]
struct LessonPayload {
    vocabulary: Vec<VocabularyItem>,
    questions: Vec<QuizQuestion>,
}

pub async fn generate_lesson(
    State(state): State<AppState>,
    Json(request): Json<GenerateLessonRequest>,
) -> Response {
    let llm = state.llm();

    let system = "You are an expert English teacher. Always respond with valid JSON in the \
                  exact format requested.";
    let prompt = lesson_prompt(&request.meme_title, request.level);

    let value = match llm
        .json_for_image(system, &prompt, &request.meme_url, TEMPERATURE, MAX_TOKENS)
        .await
    {
        Ok(value) => value,
        Err(err) => return generation_error(FAILURE_MESSAGE, err),
    };

    let payload: LessonPayload = match serde_json::from_value(value) {
        Ok(payload) => payload,
        Err(err) => return malformed_output_error(FAILURE_MESSAGE, err),
    };

    let created_at = now_millis();
    let lesson = Lesson {
        id: format!(
            "lesson_{}_{}_{created_at}",
            request.meme_id,
            request.level.as_str()
        ),
        media_item_id: request.meme_id,
        level: request.level,
        // Lessons are vocabulary-only; explanations come from the other
        // endpoint.
        explanation: String::new(),
        vocabulary: payload.vocabulary,
        questions: payload.questions,
        created_at,
    };

    Json(lesson).into_response()
}

fn lesson_prompt(meme_title: &str, level: ProficiencyLevel) -> String {
    let level_upper = level.as_str().to_uppercase();
    let level = level.as_str();

    format!(
        r#"You are an expert English teacher who creates vocabulary-focused language lessons using memes from Reddit.

The student is learning English at the {level_upper} level.

Analyze this meme image and its text: "{meme_title}"

Generate a vocabulary-focused English learning lesson based on both the visual content and text of the meme in the following JSON structure:

{{
  "vocabulary": [
    {{
      "word": "word or phrase from the meme",
      "definition": "clear, level-appropriate definition",
      "example": "one example sentence using this word"
    }}
  ],
  "questions": [
    {{
      "id": "q1",
      "type": "multiple_choice",
      "question": "What does 'word' mean?",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correctAnswer": "Option B",
      "explanation": "Why this answer is correct"
    }},
    {{
      "id": "q2",
      "type": "fill_in_the_gap",
      "question": "Fill in the gap: 'The cat _____ on the computer'",
      "correctAnswer": "sits",
      "explanation": "Explanation of the correct answer"
    }},
    {{
      "id": "q3",
      "type": "true_false",
      "question": "True or False: This word is commonly used in everyday English.",
      "options": ["True", "False"],
      "correctAnswer": "True",
      "explanation": "Why this is true or false"
    }}
  ]
}}

IMPORTANT:
- Extract 5-8 vocabulary words from both the meme image and text
- Create 8-12 interactive quiz questions (multiple choice, fill-in-the-gap, or true/false)
- Focus ONLY on vocabulary learning - no meme descriptions or cultural explanations
- Make definitions appropriate for {level} level students
- Create diverse question types to practice the vocabulary thoroughly
- Use visual context from the image to enhance vocabulary selection

Make your explanations clear and supportive. Focus purely on vocabulary learning appropriate for the {level} level."#
    )
}
