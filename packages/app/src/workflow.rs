//! Lesson workflow.
//!
//! Drives one media item from selection to a consumed lesson through an
//! explicit state machine:
//!
//! ```text
//! Idle -> ExplanationPending (optional, skippable)
//!      -> LevelSelection -> LessonPending -> LessonReady
//! ```
//!
//! The current step is a single discriminated value, so mixed intermediate
//! states (an explanation and a generating lesson at once, say) cannot be
//! represented. Generation failures put the workflow back on the step the
//! user came from and hand the error up for display; nothing retries on its
//! own.

use std::collections::HashMap;
use std::sync::Arc;

use memelingo_schema::{
    now_millis, Explanation, Language, Lesson, MediaItem, ProficiencyLevel, ProgressRecord,
};
use thiserror::Error;

use crate::api::{ApiError, LessonApi};
use crate::quiz::{score_answers, QuizSummary};
use crate::storage::{StorageError, Store};

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    Idle,
    /// The optional explanation step; holds the explanation once one was
    /// generated.
    ExplanationPending { explanation: Option<Explanation> },
    LevelSelection,
    LessonPending { level: ProficiencyLevel },
    LessonReady { lesson: Lesson },
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::ExplanationPending { .. } => "explanation-pending",
            WorkflowState::LevelSelection => "level-selection",
            WorkflowState::LessonPending { .. } => "lesson-pending",
            WorkflowState::LessonReady { .. } => "lesson-ready",
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("operation not valid in the {0} step")]
    InvalidState(&'static str),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct LessonWorkflow {
    media: MediaItem,
    api: Arc<LessonApi>,
    store: Arc<Store>,
    state: WorkflowState,
    answers: HashMap<String, String>,
}

impl LessonWorkflow {
    pub fn new(media: MediaItem, api: Arc<LessonApi>, store: Arc<Store>) -> Self {
        Self {
            media,
            api,
            store,
            state: WorkflowState::Idle,
            answers: HashMap::new(),
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn media(&self) -> &MediaItem {
        &self.media
    }

    pub fn answers(&self) -> &HashMap<String, String> {
        &self.answers
    }

    /// Enters the explanation step.
    pub fn start(&mut self) -> Result<(), WorkflowError> {
        match self.state {
            WorkflowState::Idle => {
                self.state = WorkflowState::ExplanationPending { explanation: None };
                Ok(())
            }
            _ => Err(WorkflowError::InvalidState(self.state.name())),
        }
    }

    /// Leaves the explanation step for level selection, with or without an
    /// explanation having been generated.
    pub fn proceed_to_levels(&mut self) -> Result<(), WorkflowError> {
        match self.state {
            WorkflowState::ExplanationPending { .. } => {
                self.state = WorkflowState::LevelSelection;
                Ok(())
            }
            _ => Err(WorkflowError::InvalidState(self.state.name())),
        }
    }

    /// Requests an explanation in `language` and caches it in the step state.
    /// A failure leaves the step unchanged; the caller shows the error.
    pub async fn request_explanation(
        &mut self,
        language: Language,
    ) -> Result<Explanation, WorkflowError> {
        if !matches!(self.state, WorkflowState::ExplanationPending { .. }) {
            return Err(WorkflowError::InvalidState(self.state.name()));
        }

        let explanation = self.api.explain(&self.media, language).await?;
        self.state = WorkflowState::ExplanationPending {
            explanation: Some(explanation.clone()),
        };
        Ok(explanation)
    }

    /// Generates a lesson for the chosen level. On success the lesson is
    /// persisted and becomes the ready lesson; on failure the workflow is
    /// back at level selection.
    pub async fn select_level(
        &mut self,
        level: ProficiencyLevel,
    ) -> Result<Lesson, WorkflowError> {
        if !matches!(self.state, WorkflowState::LevelSelection) {
            return Err(WorkflowError::InvalidState(self.state.name()));
        }

        self.state = WorkflowState::LessonPending { level };
        self.answers.clear();

        let result = self.generate_and_persist(level).await;
        match result {
            Ok(lesson) => {
                self.state = WorkflowState::LessonReady {
                    lesson: lesson.clone(),
                };
                Ok(lesson)
            }
            Err(err) => {
                self.state = WorkflowState::LevelSelection;
                Err(err)
            }
        }
    }

    async fn generate_and_persist(
        &self,
        level: ProficiencyLevel,
    ) -> Result<Lesson, WorkflowError> {
        let lesson = self.api.generate_lesson(&self.media, level).await?;
        self.store.lessons().put(&lesson)?;
        Ok(lesson)
    }

    /// Records the user's answer to one question of the ready lesson.
    pub fn update_answer(
        &mut self,
        question_id: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        match self.state {
            WorkflowState::LessonReady { .. } => {
                self.answers.insert(question_id.into(), answer.into());
                Ok(())
            }
            _ => Err(WorkflowError::InvalidState(self.state.name())),
        }
    }

    /// Grades the ready lesson, persists the progress record and returns the
    /// summary. A failing progress write costs only persistence, so it is
    /// logged rather than failing the submission.
    pub fn submit_answers(&self) -> Result<QuizSummary, WorkflowError> {
        let WorkflowState::LessonReady { lesson } = &self.state else {
            return Err(WorkflowError::InvalidState(self.state.name()));
        };

        let summary = score_answers(lesson, &self.answers);

        let record = ProgressRecord {
            lesson_id: lesson.id.clone(),
            answers: self.answers.clone(),
            score: summary.score,
            completed_at: now_millis(),
        };
        if let Err(err) = self.store.progress().put(&record) {
            log::warn!("failed to persist progress for {}: {err}", lesson.id);
        }

        Ok(summary)
    }

    /// Bookmarks the ready lesson.
    pub fn save_lesson(&self) -> Result<(), WorkflowError> {
        let WorkflowState::LessonReady { lesson } = &self.state else {
            return Err(WorkflowError::InvalidState(self.state.name()));
        };

        self.store.saved_lessons().mark_saved(&lesson.id)?;
        Ok(())
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

    const LESSON_BODY: &str = r#"{
        "id": "lesson_abc_beginner_1",
        "memeId": "abc",
        "level": "beginner",
        "explanation": "",
        "vocabulary": [{"word":"w","definition":"d","example":"e"}],
        "questions": [
            {"id":"q1","type":"fill_in_the_gap","question":"The cat _____ on the computer","correctAnswer":"sits","explanation":"."},
            {"id":"q2","type":"true_false","question":"True or False?","options":["True","False"],"correctAnswer":"True","explanation":"."}
        ],
        "createdAt": 1
    }"#;

    const EXPLANATION_BODY: &str = r#"{
        "id": "explanation_abc_english_1",
        "memeId": "abc",
        "language": "english",
        "explanation": "A classic cat meme.",
        "createdAt": 1
    }"#;

    /// Serves one canned JSON response per listed body, in order.
    fn stub_proxy(bodies: Vec<&'static str>) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start stub server");
        let addr = server.server_addr();

        thread::spawn(move || {
            for body in bodies {
                let Ok(request) = server.recv() else { return };
                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(body).with_header(header);
                let _ = request.respond(response);
            }
        });

        format!("http://{addr}")
    }

    fn workflow_against(base_url: String) -> (LessonWorkflow, Arc<Store>) {
        let store = Arc::new(Store::in_memory().unwrap());
        let api = Arc::new(LessonApi::new(base_url));
        (
            LessonWorkflow::new(media_item(), api, Arc::clone(&store)),
            store,
        )
    }

    #[tokio::test]
    async fn full_happy_path_persists_lesson_and_progress() {
        let (mut workflow, store) = workflow_against(stub_proxy(vec![LESSON_BODY]));

        workflow.start().unwrap();
        workflow.proceed_to_levels().unwrap();

        let lesson = workflow
            .select_level(ProficiencyLevel::Beginner)
            .await
            .unwrap();
        assert_eq!(workflow.state().name(), "lesson-ready");
        assert_eq!(
            store.lessons().get(&lesson.id).unwrap(),
            Some(lesson.clone())
        );

        workflow.update_answer("q1", "sits").unwrap();
        workflow.update_answer("q2", "False").unwrap();

        let summary = workflow.submit_answers().unwrap();
        assert_eq!(summary.score, 50);
        assert_eq!(summary.correct_count, 1);
        assert_eq!(summary.total, 2);

        let progress = store.progress().get(&lesson.id).unwrap().unwrap();
        assert_eq!(progress.score, 50);
        assert_eq!(progress.answers.get("q1").map(String::as_str), Some("sits"));

        workflow.save_lesson().unwrap();
        assert!(store.saved_lessons().is_saved(&lesson.id).unwrap());
    }

    #[tokio::test]
    async fn explanation_step_caches_result_and_is_skippable() {
        let (mut workflow, _store) = workflow_against(stub_proxy(vec![EXPLANATION_BODY]));

        workflow.start().unwrap();
        let explanation = workflow
            .request_explanation(Language::English)
            .await
            .unwrap();
        assert_eq!(explanation.explanation_text, "A classic cat meme.");

        match workflow.state() {
            WorkflowState::ExplanationPending { explanation } => {
                assert!(explanation.is_some());
            }
            other => panic!("unexpected state {other:?}"),
        }

        workflow.proceed_to_levels().unwrap();
        assert_eq!(workflow.state(), &WorkflowState::LevelSelection);
    }

    #[tokio::test]
    async fn generation_failure_reverts_to_level_selection() {
        // Nothing listens on the discard port, so the request fails fast.
        let (mut workflow, store) = workflow_against("http://127.0.0.1:9".to_string());

        workflow.start().unwrap();
        workflow.proceed_to_levels().unwrap();

        let err = workflow
            .select_level(ProficiencyLevel::Advanced)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Api(ApiError::Network(_))));
        assert_eq!(workflow.state(), &WorkflowState::LevelSelection);
        assert!(store.lessons().get_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn operations_outside_their_step_are_rejected() {
        let (mut workflow, _store) = workflow_against("http://127.0.0.1:9".to_string());

        assert!(matches!(
            workflow.proceed_to_levels(),
            Err(WorkflowError::InvalidState("idle"))
        ));
        assert!(matches!(
            workflow.select_level(ProficiencyLevel::Beginner).await,
            Err(WorkflowError::InvalidState("idle"))
        ));
        assert!(matches!(
            workflow.submit_answers(),
            Err(WorkflowError::InvalidState("idle"))
        ));

        workflow.start().unwrap();
        assert!(matches!(
            workflow.start(),
            Err(WorkflowError::InvalidState("explanation-pending"))
        ));
        assert!(matches!(
            workflow.update_answer("q1", "x"),
            Err(WorkflowError::InvalidState("explanation-pending"))
        ));
    }
}
