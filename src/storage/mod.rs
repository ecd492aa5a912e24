//! Storage layer for Know Thy Taste
//!
//! The rest of the crate talks to persistence only through [`TasteRepository`].
//! Two implementations exist: an in-memory one for tests and short-lived use,
//! and a SQLite one backed by a deadpool connection pool.

pub mod memory;
pub mod sqlite;

use crate::consent::ConsentFlags;
use crate::error::Result;
use crate::types::{
    Movie, MovieId, Pattern, PatternCandidate, PatternId, Phase, ResponseRecord, Session,
    SessionId, SessionStatus, TasteElement, TasteElementCandidate, User, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

/// Persistence operations required by interviews, detection and reporting
#[async_trait]
pub trait TasteRepository: Send + Sync {
    // Users

    /// Store a new user
    async fn create_user(&self, user: &User) -> Result<()>;

    /// Retrieve a user by ID
    async fn get_user(&self, id: UserId) -> Result<User>;

    /// Replace the consent flags and stamp the privacy review time
    async fn update_consent(
        &self,
        id: UserId,
        consent: ConsentFlags,
        reviewed_at: DateTime<Utc>,
    ) -> Result<()>;

    // Movies

    /// Store a new movie
    async fn add_movie(&self, movie: &Movie) -> Result<()>;

    /// Retrieve a movie by ID
    async fn get_movie(&self, id: MovieId) -> Result<Movie>;

    /// All movies of a user, oldest first
    async fn list_movies(&self, user_id: UserId) -> Result<Vec<Movie>>;

    /// Record that a movie was just reflected on
    async fn touch_movie_analyzed(&self, id: MovieId, at: DateTime<Utc>) -> Result<()>;

    // Sessions

    /// Store a new session
    async fn create_session(&self, session: &Session) -> Result<()>;

    /// Retrieve a session by ID
    async fn get_session(&self, id: SessionId) -> Result<Session>;

    /// Persist the sequencer position so a paused session can resume
    async fn update_session_progress(&self, id: SessionId, phase: Phase, index: usize)
        -> Result<()>;

    /// Change the status, optionally stamping the end time
    async fn update_session_status(
        &self,
        id: SessionId,
        status: SessionStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Number of completed sessions, which drives scaffold fading
    async fn count_completed_sessions(&self, user_id: UserId) -> Result<usize>;

    /// Sessions of a user, newest first, optionally filtered by status
    async fn list_sessions(
        &self,
        user_id: UserId,
        status: Option<SessionStatus>,
    ) -> Result<Vec<Session>>;

    // Responses

    /// Store a sealed response
    async fn insert_response(&self, response: &ResponseRecord) -> Result<()>;

    /// Every response across all of a user's sessions, oldest first
    async fn list_responses_for_user(&self, user_id: UserId) -> Result<Vec<ResponseRecord>>;

    /// Responses of one session, oldest first
    async fn list_responses_for_session(&self, session_id: SessionId)
        -> Result<Vec<ResponseRecord>>;

    /// Responses about one movie, oldest first
    async fn list_responses_for_movie(&self, movie_id: MovieId) -> Result<Vec<ResponseRecord>>;

    // Patterns

    /// Insert a pattern or merge it into the existing record with the same
    /// (user, type, description). Returns the stored record.
    async fn upsert_pattern(&self, user_id: UserId, candidate: &PatternCandidate)
        -> Result<Pattern>;

    /// Patterns of a user, highest confidence first
    async fn list_patterns(&self, user_id: UserId) -> Result<Vec<Pattern>>;

    /// Record the user's verdict on a pattern (`None` clears it)
    async fn set_pattern_validation(&self, id: PatternId, validated: Option<bool>) -> Result<()>;

    /// Delete every pattern of a user, returning how many were removed
    async fn delete_patterns(&self, user_id: UserId) -> Result<usize>;

    // Taste elements

    /// Insert a taste element or merge it into the record with the same
    /// (user, name). Returns the stored record.
    async fn upsert_taste_element(
        &self,
        user_id: UserId,
        candidate: &TasteElementCandidate,
    ) -> Result<TasteElement>;

    /// Taste elements of a user, most important first
    async fn list_taste_elements(&self, user_id: UserId, limit: usize)
        -> Result<Vec<TasteElement>>;
}

/// Order patterns by descending confidence, then description for stability
pub(crate) fn sort_patterns(patterns: &mut [Pattern]) {
    patterns.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.description.cmp(&b.description))
    });
}

/// Order taste elements by descending importance, then name
pub(crate) fn sort_taste_elements(elements: &mut [TasteElement]) {
    elements.sort_by(|a, b| {
        b.importance_score
            .total_cmp(&a.importance_score)
            .then_with(|| a.element_name.cmp(&b.element_name))
    });
}
