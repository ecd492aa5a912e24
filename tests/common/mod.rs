//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use ktt_core::interview::metacognitive::MetacognitivePrompt;
use ktt_core::interview::{InterviewEvent, InterviewPrompter, PromptReply, QuestionPrompt};
use ktt_core::types::{ResponseId, ResponseRecord};
use ktt_core::{
    ConfidenceRating, ConsentFlags, Movie, MovieId, ResponseCipher, Session, SessionId,
    SessionType, TasteRepository, User,
};
use std::collections::VecDeque;

/// Install a test subscriber once; respects RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create and store a user
pub async fn create_user<R: TasteRepository + ?Sized>(repo: &R, consent: ConsentFlags) -> User {
    let user = User::new(consent);
    repo.create_user(&user).await.expect("Failed to create user");
    user
}

/// Create and store one movie per title
pub async fn add_movies<R: TasteRepository + ?Sized>(
    repo: &R,
    user: &User,
    titles: &[&str],
) -> Vec<Movie> {
    let mut movies = Vec::new();
    for title in titles {
        let movie = Movie::new(user.id, *title, None);
        repo.add_movie(&movie).await.expect("Failed to add movie");
        movies.push(movie);
    }
    movies
}

/// Create and store a completed-looking session over `movies`
pub async fn create_session<R: TasteRepository + ?Sized>(
    repo: &R,
    user: &User,
    movies: &[Movie],
) -> Session {
    let session = Session::new(
        user.id,
        SessionType::Balanced,
        movies.iter().map(|m| m.id).collect(),
    );
    repo.create_session(&session)
        .await
        .expect("Failed to create session");
    session
}

/// Seal and store a response
pub async fn record_response<R: TasteRepository + ?Sized>(
    repo: &R,
    cipher: &dyn ResponseCipher,
    session_id: SessionId,
    movie_id: MovieId,
    text: &str,
    confidence: Option<u8>,
) -> ResponseRecord {
    let record = ResponseRecord {
        id: ResponseId::new(),
        session_id,
        movie_id,
        question_key: "lasting_image".to_string(),
        question_text: "What image or moment do you think will stay with you longest?".to_string(),
        ciphertext: cipher.seal(text).expect("Failed to seal response"),
        confidence: confidence.and_then(ConfidenceRating::new),
        is_new_insight: false,
        specificity_score: 0.5,
        follow_up_count: 0,
        created_at: Utc::now(),
    };
    repo.insert_response(&record)
        .await
        .expect("Failed to insert response");
    record
}

/// A specific answer that passes validation on the first attempt
pub const SPECIFIC_ANSWER: &str = "I remember the moment when the camera held on her face for a \
    long shot, and then she said \"I never left\" before the cut to black. The silence after \
    that line, with only the hum of the lighting, made the grief feel physical.";

/// Prompter that replays a fixed script
#[derive(Default)]
pub struct ScriptedPrompter {
    replies: VecDeque<PromptReply>,
    /// Reply used once the script runs out
    pub fallback: Option<PromptReply>,
    pub confidence: Option<u8>,
    pub new_insight: bool,
    pub asked: Vec<String>,
    pub follow_ups: Vec<String>,
    pub events: Vec<InterviewEvent>,
}

impl ScriptedPrompter {
    pub fn new(replies: impl IntoIterator<Item = PromptReply>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Answer every prompt with `reply`
    pub fn always(reply: PromptReply) -> Self {
        Self {
            fallback: Some(reply),
            ..Default::default()
        }
    }

    fn next_reply(&mut self) -> PromptReply {
        self.replies
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or(PromptReply::Cancel)
    }
}

#[async_trait]
impl InterviewPrompter for ScriptedPrompter {
    async fn ask(&mut self, prompt: &QuestionPrompt) -> PromptReply {
        self.asked.push(prompt.question.key.to_string());
        self.next_reply()
    }

    async fn follow_up(&mut self, follow_up: &str) -> PromptReply {
        self.follow_ups.push(follow_up.to_string());
        self.next_reply()
    }

    async fn rate_confidence(&mut self) -> Option<u8> {
        self.confidence
    }

    async fn confirm_new_insight(&mut self, _prompt: &MetacognitivePrompt) -> bool {
        self.new_insight
    }

    fn on_event(&mut self, event: &InterviewEvent) {
        self.events.push(event.clone());
    }
}
