//! Client for the backend proxy's generation endpoints.
//!
//! One attempt per user action: failures come back to the caller for a manual
//! retry, never an automatic one. No timeout is applied here either; a hung
//! upstream request simply keeps that flow pending.

use memelingo_schema::{Explanation, Language, Lesson, MediaItem, ProficiencyLevel};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The proxy was unreachable.
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    /// The proxy answered with a non-2xx status; `error`/`details` carry its
    /// body verbatim for display.
    #[error("{error}")]
    Upstream {
        status: reqwest::StatusCode,
        error: String,
        details: Option<String>,
    },

    /// A 2xx response that does not decode into the expected record.
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    details: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
}

pub struct LessonApi {
    client: reqwest::Client,
    base_url: String,
}

impl LessonApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        let url = self.endpoint("/api/health");
        let response = self.client.get(&url).send().await?;
        Self::decode(response).await
    }

    /// Requests a vocabulary lesson for `media` at `level`.
    pub async fn generate_lesson(
        &self,
        media: &MediaItem,
        level: ProficiencyLevel,
    ) -> Result<Lesson, ApiError> {
        let body = serde_json::json!({
            "memeId": media.id,
            "memeTitle": media.title,
            "memeUrl": media.source_url,
            "level": level,
        });

        let url = self.endpoint("/api/generate-lesson");
        let response = self.client.post(&url).json(&body).send().await?;
        Self::decode(response).await
    }

    /// Requests an explanation of `media` in `language`.
    pub async fn explain(
        &self,
        media: &MediaItem,
        language: Language,
    ) -> Result<Explanation, ApiError> {
        let body = serde_json::json!({
            "memeId": media.id,
            "memeTitle": media.title,
            "memeUrl": media.source_url,
            "language": language,
        });

        let url = self.endpoint("/api/explain-meme");
        let response = self.client.post(&url).json(&body).send().await?;
        Self::decode(response).await
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();

        if !status.is_success() {
            let bytes = response.bytes().await.unwrap_or_default();
            let body: ErrorBody = serde_json::from_slice(&bytes).unwrap_or(ErrorBody {
                error: None,
                details: None,
            });
            return Err(ApiError::Upstream {
                status,
                error: body
                    .error
                    .unwrap_or_else(|| format!("request failed with status {status}")),
                details: body.details,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn media_item() -> MediaItem {
        MediaItem {
            id: "abc".to_string(),
            title: "a meme".to_string(),
            source_url: "https://i.redd.it/abc.jpg".to_string(),
            origin_subreddit: "r/memes".to_string(),
            permalink: "https://reddit.com/r/memes/abc".to_string(),
            upvote_count: 1,
            author: "a".to_string(),
            created_at: 0,
        }
    }

    /// Serves exactly one canned response on an ephemeral port.
    fn one_shot_server(status: u16, body: &'static str) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start stub server");
        let addr = server.server_addr();

        thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(body)
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn generate_lesson_decodes_success_body() {
        let base = one_shot_server(
            200,
            r#"{
                "id": "lesson_abc_beginner_1",
                "memeId": "abc",
                "level": "beginner",
                "explanation": "",
                "vocabulary": [{"word":"w","definition":"d","example":"e"}],
                "questions": [{
                    "id":"q1","type":"true_false",
                    "question":"True or False: ok?",
                    "options":["True","False"],
                    "correctAnswer":"True","explanation":"yes"
                }],
                "createdAt": 1
            }"#,
        );

        let api = LessonApi::new(base);
        let lesson = api
            .generate_lesson(&media_item(), ProficiencyLevel::Beginner)
            .await
            .unwrap();

        assert_eq!(lesson.id, "lesson_abc_beginner_1");
        assert_eq!(lesson.media_item_id, "abc");
        assert_eq!(lesson.questions.len(), 1);
    }

    #[tokio::test]
    async fn non_2xx_surfaces_error_body_verbatim() {
        let base = one_shot_server(
            500,
            r#"{"error":"Failed to generate lesson. Please try again.","details":"boom"}"#,
        );

        let api = LessonApi::new(base);
        let err = api
            .generate_lesson(&media_item(), ProficiencyLevel::Advanced)
            .await
            .unwrap_err();

        match err {
            ApiError::Upstream {
                status,
                error,
                details,
            } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(error, "Failed to generate lesson. Please try again.");
                assert_eq!(details.as_deref(), Some("boom"));
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_required_fields_are_malformed() {
        let base = one_shot_server(200, r#"{"id": "x"}"#);

        let api = LessonApi::new(base);
        let err = api.explain(&media_item(), Language::English).await.unwrap_err();

        assert!(matches!(err, ApiError::Malformed(_)));
    }

    #[tokio::test]
    async fn unreachable_proxy_is_a_network_failure() {
        let api = LessonApi::new("http://127.0.0.1:9");
        let err = api.health().await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }
}
