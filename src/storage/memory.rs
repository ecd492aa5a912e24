//! In-memory repository
//!
//! Keeps everything in maps behind one async mutex. Used by tests and by
//! callers that do not want anything written to disk.

use super::{sort_patterns, sort_taste_elements, TasteRepository};
use crate::consent::ConsentFlags;
use crate::error::{KttError, Result};
use crate::types::{
    Movie, MovieId, Pattern, PatternCandidate, PatternId, Phase, ResponseRecord, Session,
    SessionId, SessionStatus, TasteElement, TasteElementCandidate, User, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    movies: Vec<Movie>,
    sessions: Vec<Session>,
    responses: Vec<ResponseRecord>,
    patterns: Vec<Pattern>,
    taste_elements: Vec<TasteElement>,
}

impl State {
    fn session_mut(&mut self, id: SessionId) -> Result<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| KttError::NotFound(format!("session {}", id)))
    }

    fn session_owner(&self, id: SessionId) -> Option<UserId> {
        self.sessions.iter().find(|s| s.id == id).map(|s| s.user_id)
    }
}

/// Repository holding all data in process memory
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<State>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TasteRepository for InMemoryRepository {
    async fn create_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.users.contains_key(&user.id) {
            return Err(KttError::InvalidOperation(format!(
                "user {} already exists",
                user.id
            )));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        let state = self.state.lock().await;
        state
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| KttError::NotFound(format!("user {}", id)))
    }

    async fn update_consent(
        &self,
        id: UserId,
        consent: ConsentFlags,
        reviewed_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| KttError::NotFound(format!("user {}", id)))?;
        user.consent = consent;
        user.last_privacy_review = Some(reviewed_at);
        Ok(())
    }

    async fn add_movie(&self, movie: &Movie) -> Result<()> {
        let mut state = self.state.lock().await;
        state.movies.push(movie.clone());
        Ok(())
    }

    async fn get_movie(&self, id: MovieId) -> Result<Movie> {
        let state = self.state.lock().await;
        state
            .movies
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| KttError::NotFound(format!("movie {}", id)))
    }

    async fn list_movies(&self, user_id: UserId) -> Result<Vec<Movie>> {
        let state = self.state.lock().await;
        Ok(state
            .movies
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn touch_movie_analyzed(&self, id: MovieId, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock().await;
        let movie = state
            .movies
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| KttError::NotFound(format!("movie {}", id)))?;
        movie.last_analyzed = Some(at);
        Ok(())
    }

    async fn create_session(&self, session: &Session) -> Result<()> {
        let mut state = self.state.lock().await;
        state.sessions.push(session.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Session> {
        let mut state = self.state.lock().await;
        state.session_mut(id).map(|s| s.clone())
    }

    async fn update_session_progress(
        &self,
        id: SessionId,
        phase: Phase,
        index: usize,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let session = state.session_mut(id)?;
        session.current_phase = phase;
        session.current_question_index = index;
        Ok(())
    }

    async fn update_session_status(
        &self,
        id: SessionId,
        status: SessionStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let session = state.session_mut(id)?;
        session.status = status;
        if ended_at.is_some() {
            session.ended_at = ended_at;
        }
        Ok(())
    }

    async fn count_completed_sessions(&self, user_id: UserId) -> Result<usize> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.status == SessionStatus::Completed)
            .count())
    }

    async fn list_sessions(
        &self,
        user_id: UserId,
        status: Option<SessionStatus>,
    ) -> Result<Vec<Session>> {
        let state = self.state.lock().await;
        let mut sessions: Vec<Session> = state
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .filter(|s| status.map_or(true, |wanted| s.status == wanted))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(sessions)
    }

    async fn insert_response(&self, response: &ResponseRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.session_owner(response.session_id).is_none() {
            return Err(KttError::NotFound(format!(
                "session {}",
                response.session_id
            )));
        }
        state.responses.push(response.clone());
        Ok(())
    }

    async fn list_responses_for_user(&self, user_id: UserId) -> Result<Vec<ResponseRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .responses
            .iter()
            .filter(|r| state.session_owner(r.session_id) == Some(user_id))
            .cloned()
            .collect())
    }

    async fn list_responses_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<ResponseRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .responses
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn list_responses_for_movie(&self, movie_id: MovieId) -> Result<Vec<ResponseRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .responses
            .iter()
            .filter(|r| r.movie_id == movie_id)
            .cloned()
            .collect())
    }

    async fn upsert_pattern(
        &self,
        user_id: UserId,
        candidate: &PatternCandidate,
    ) -> Result<Pattern> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        if let Some(existing) = state.patterns.iter_mut().find(|p| {
            p.user_id == user_id
                && p.pattern_type == candidate.pattern_type
                && p.description == candidate.description
        }) {
            existing.merge(candidate, now);
            return Ok(existing.clone());
        }

        let pattern = Pattern::from_candidate(user_id, candidate.clone(), now);
        state.patterns.push(pattern.clone());
        Ok(pattern)
    }

    async fn list_patterns(&self, user_id: UserId) -> Result<Vec<Pattern>> {
        let state = self.state.lock().await;
        let mut patterns: Vec<Pattern> = state
            .patterns
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        sort_patterns(&mut patterns);
        Ok(patterns)
    }

    async fn set_pattern_validation(&self, id: PatternId, validated: Option<bool>) -> Result<()> {
        let mut state = self.state.lock().await;
        let pattern = state
            .patterns
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| KttError::NotFound(format!("pattern {}", id)))?;
        pattern.validated = validated;
        Ok(())
    }

    async fn delete_patterns(&self, user_id: UserId) -> Result<usize> {
        let mut state = self.state.lock().await;
        let before = state.patterns.len();
        state.patterns.retain(|p| p.user_id != user_id);
        Ok(before - state.patterns.len())
    }

    async fn upsert_taste_element(
        &self,
        user_id: UserId,
        candidate: &TasteElementCandidate,
    ) -> Result<TasteElement> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state
            .taste_elements
            .iter_mut()
            .find(|e| e.user_id == user_id && e.element_name == candidate.element_name)
        {
            existing.merge(candidate);
            return Ok(existing.clone());
        }

        let element = TasteElement::from_candidate(user_id, candidate.clone(), Utc::now());
        state.taste_elements.push(element.clone());
        Ok(element)
    }

    async fn list_taste_elements(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<TasteElement>> {
        let state = self.state.lock().await;
        let mut elements: Vec<TasteElement> = state
            .taste_elements
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        sort_taste_elements(&mut elements);
        elements.truncate(limit);
        Ok(elements)
    }
}
