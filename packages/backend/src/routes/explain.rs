//! Meme explanation endpoint.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use memelingo_schema::{now_millis, Explanation, Language};
use serde::Deserialize;

use crate::routes::{generation_error, malformed_output_error};
use crate::state::AppState;

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 1500;
const FAILURE_MESSAGE: &str = "Failed to generate explanation. Please try again.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainRequest {
    meme_id: String,
    meme_title: String,
    meme_url: String,
    language: Language,
}

/// The JSON object the model is asked to return.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExplanationPayload {
    explanation: String,
    #[serde(default)]
    cultural_context: Option<String>,
}

pub async fn explain_meme(
    State(state): State<AppState>,
    Json(request): Json<ExplainRequest>,
) -> Response {
    let llm = state.llm();
    let label = request.language.prompt_label();

    let system = format!(
        "You are an expert in internet culture and memes. Always respond with valid JSON \
         in the exact format requested. Respond ONLY in {label} language."
    );
    let prompt = explanation_prompt(&request.meme_title, &label);

    let value = match llm
        .json_for_image(&system, &prompt, &request.meme_url, TEMPERATURE, MAX_TOKENS)
        .await
    {
        Ok(value) => value,
        Err(err) => return generation_error(FAILURE_MESSAGE, err),
    };

    let payload: ExplanationPayload = match serde_json::from_value(value) {
        Ok(payload) => payload,
        Err(err) => return malformed_output_error(FAILURE_MESSAGE, err),
    };

    let created_at = now_millis();
    let explanation = Explanation {
        id: format!(
            "explanation_{}_{}_{created_at}",
            request.meme_id,
            request.language.as_str()
        ),
        media_item_id: request.meme_id,
        language: request.language,
        explanation_text: payload.explanation,
        cultural_context: payload.cultural_context.filter(|v| !v.trim().is_empty()),
        created_at,
    };

    Json(explanation).into_response()
}

fn explanation_prompt(meme_title: &str, language_label: &str) -> String {
    format!(
        r#"You are an expert in internet culture and memes. Please analyze this meme image and its text: "{meme_title}"

Provide a clear, comprehensive explanation in {language_label} language in the following JSON structure:

{{
  "explanation": "Clear explanation of what this meme means, why it's funny, and what's happening in the image",
  "culturalContext": "Any cultural background, references, or context needed to understand this meme fully"
}}

IMPORTANT:
- Respond ONLY in {language_label} language
- Explain both the visual elements and the text/caption
- Include why this is considered funny or meaningful
- Mention any cultural references, trends, or background knowledge needed
- Keep explanations clear and accessible
- If there are no significant cultural elements, you can omit the culturalContext field

Make your explanation helpful for someone who might not understand the meme's context or humor."#
    )
}
