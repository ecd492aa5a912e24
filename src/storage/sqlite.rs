//! SQLite repository
//!
//! Persistent storage on a single SQLite file accessed through a deadpool
//! connection pool. Every query runs inside `interact` on a pooled
//! connection, so the async side never blocks on SQLite.
//!
//! Timestamps are stored as fixed-width RFC 3339 text (so they sort
//! lexicographically), sets and consent flags as JSON text.

use super::{sort_patterns, sort_taste_elements, TasteRepository};
use crate::config::StorageConfig;
use crate::consent::ConsentFlags;
use crate::error::{KttError, Result};
use crate::types::{
    ConfidenceRating, Movie, MovieId, Pattern, PatternCandidate, PatternId, Phase,
    ResponseId, ResponseRecord, Session, SessionId, SessionStatus, TasteElement,
    TasteElementCandidate, TasteElementId, User, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use deadpool_sqlite::{Config, Pool, PoolConfig, Runtime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Schema, safe to apply repeatedly
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    created_at TEXT NOT NULL,
    consent TEXT NOT NULL,
    last_privacy_review TEXT
);

CREATE TABLE IF NOT EXISTS movies (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    year INTEGER,
    genres TEXT NOT NULL DEFAULT '[]',
    watch_context TEXT,
    created_at TEXT NOT NULL,
    last_analyzed TEXT
);

CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    session_type TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    ended_at TEXT,
    movie_ids TEXT NOT NULL DEFAULT '[]',
    current_phase TEXT NOT NULL,
    current_question_index INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS responses (
    id TEXT PRIMARY KEY NOT NULL,
    session_id TEXT NOT NULL REFERENCES sessions(id),
    movie_id TEXT NOT NULL,
    question_key TEXT NOT NULL,
    question_text TEXT NOT NULL,
    ciphertext BLOB NOT NULL,
    confidence INTEGER CHECK(confidence BETWEEN 1 AND 5),
    is_new_insight INTEGER NOT NULL DEFAULT 0,
    specificity_score REAL NOT NULL CHECK(specificity_score BETWEEN 0.0 AND 1.0),
    follow_up_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS patterns (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    pattern_type TEXT NOT NULL,
    description TEXT NOT NULL,
    confidence REAL NOT NULL CHECK(confidence BETWEEN 0.0 AND 1.0),
    supporting_movie_ids TEXT NOT NULL DEFAULT '[]',
    validated INTEGER,
    first_detected TEXT NOT NULL,
    last_confirmed TEXT,
    UNIQUE(user_id, pattern_type, description)
);

CREATE TABLE IF NOT EXISTS taste_elements (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    element_type TEXT NOT NULL,
    element_name TEXT NOT NULL,
    importance_score REAL NOT NULL,
    mention_count INTEGER NOT NULL DEFAULT 0,
    first_mentioned TEXT NOT NULL,
    UNIQUE(user_id, element_name)
);

CREATE INDEX IF NOT EXISTS idx_movies_user ON movies(user_id);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
CREATE INDEX IF NOT EXISTS idx_responses_session ON responses(session_id);
CREATE INDEX IF NOT EXISTS idx_responses_movie ON responses(movie_id);
"#;

const MOVIE_COLUMNS: &str =
    "id, user_id, title, year, genres, watch_context, created_at, last_analyzed";
const SESSION_COLUMNS: &str = "id, user_id, session_type, status, started_at, ended_at, \
     movie_ids, current_phase, current_question_index";
const RESPONSE_COLUMNS: &str = "r.id, r.session_id, r.movie_id, r.question_key, r.question_text, \
     r.ciphertext, r.confidence, r.is_new_insight, r.specificity_score, r.follow_up_count, \
     r.created_at";
const PATTERN_COLUMNS: &str = "id, user_id, pattern_type, description, confidence, \
     supporting_movie_ids, validated, first_detected, last_confirmed";
const ELEMENT_COLUMNS: &str =
    "id, user_id, element_type, element_name, importance_score, mention_count, first_mentioned";

/// Repository backed by a SQLite file
pub struct SqliteRepository {
    pool: Pool,
}

impl SqliteRepository {
    /// Open (creating if needed) the database described by `config`
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        Self::with_pool_size(&config.database_path, config.pool_size).await
    }

    /// Open a database file with a custom pool size and apply the schema
    pub async fn with_pool_size<P: AsRef<Path>>(db_path: P, pool_size: usize) -> Result<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        info!(
            "Opening taste database at: {} (pool_size: {})",
            path.display(),
            pool_size
        );

        let mut config = Config::new(path);
        config.pool = Some(PoolConfig::new(pool_size));
        let pool = config
            .create_pool(Runtime::Tokio1)
            .map_err(|e| KttError::Pool(format!("Failed to create connection pool: {}", e)))?;

        let repo = Self { pool };
        repo.init_schema().await?;
        Ok(repo)
    }

    async fn init_schema(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;
        debug!("Schema applied");
        Ok(())
    }

    /// Run `f` on a pooled connection
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| KttError::Pool(format!("Failed to get connection from pool: {}", e)))?;

        conn.interact(f)
            .await
            .map_err(|e| KttError::Pool(format!("Pool interaction failed: {}", e)))?
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_error(idx, e))
}

fn parsed_opt<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: Option<String> = row.get(idx)?;
    text.map(|t| t.parse().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn json<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e))
}

fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    parsed(row, idx)
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(uuid_col(row, 0)?),
        created_at: parsed(row, 1)?,
        consent: json(row, 2)?,
        last_privacy_review: parsed_opt(row, 3)?,
    })
}

fn row_to_movie(row: &Row<'_>) -> rusqlite::Result<Movie> {
    Ok(Movie {
        id: MovieId(uuid_col(row, 0)?),
        user_id: UserId(uuid_col(row, 1)?),
        title: row.get(2)?,
        year: row.get(3)?,
        genres: json(row, 4)?,
        watch_context: row.get(5)?,
        created_at: parsed(row, 6)?,
        last_analyzed: parsed_opt(row, 7)?,
    })
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: SessionId(uuid_col(row, 0)?),
        user_id: UserId(uuid_col(row, 1)?),
        session_type: parsed(row, 2)?,
        status: parsed(row, 3)?,
        started_at: parsed(row, 4)?,
        ended_at: parsed_opt(row, 5)?,
        movie_ids: json(row, 6)?,
        current_phase: parsed(row, 7)?,
        current_question_index: row.get(8)?,
    })
}

fn row_to_response(row: &Row<'_>) -> rusqlite::Result<ResponseRecord> {
    let confidence: Option<u8> = row.get(6)?;
    Ok(ResponseRecord {
        id: ResponseId(uuid_col(row, 0)?),
        session_id: SessionId(uuid_col(row, 1)?),
        movie_id: MovieId(uuid_col(row, 2)?),
        question_key: row.get(3)?,
        question_text: row.get(4)?,
        ciphertext: row.get(5)?,
        confidence: confidence.and_then(ConfidenceRating::new),
        is_new_insight: row.get(7)?,
        specificity_score: row.get(8)?,
        follow_up_count: row.get(9)?,
        created_at: parsed(row, 10)?,
    })
}

fn row_to_pattern(row: &Row<'_>) -> rusqlite::Result<Pattern> {
    Ok(Pattern {
        id: PatternId(uuid_col(row, 0)?),
        user_id: UserId(uuid_col(row, 1)?),
        pattern_type: parsed(row, 2)?,
        description: row.get(3)?,
        confidence: row.get(4)?,
        supporting_movie_ids: json(row, 5)?,
        validated: row.get(6)?,
        first_detected: parsed(row, 7)?,
        last_confirmed: parsed_opt(row, 8)?,
    })
}

fn row_to_element(row: &Row<'_>) -> rusqlite::Result<TasteElement> {
    Ok(TasteElement {
        id: TasteElementId(uuid_col(row, 0)?),
        user_id: UserId(uuid_col(row, 1)?),
        element_type: parsed(row, 2)?,
        element_name: row.get(3)?,
        importance_score: row.get(4)?,
        mention_count: row.get(5)?,
        first_mentioned: parsed(row, 6)?,
    })
}

fn not_found_if_untouched(changed: usize, what: String) -> Result<()> {
    if changed == 0 {
        Err(KttError::NotFound(what))
    } else {
        Ok(())
    }
}

#[async_trait]
impl TasteRepository for SqliteRepository {
    async fn create_user(&self, user: &User) -> Result<()> {
        let consent = serde_json::to_string(&user.consent)?;
        let user = user.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO users (id, created_at, consent, last_privacy_review)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.id.to_string(),
                    timestamp(&user.created_at),
                    consent,
                    user.last_privacy_review.as_ref().map(timestamp),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, created_at, consent, last_privacy_review FROM users WHERE id = ?1",
                params![id.to_string()],
                row_to_user,
            )
            .optional()?
            .ok_or_else(|| KttError::NotFound(format!("user {}", id)))
        })
        .await
    }

    async fn update_consent(
        &self,
        id: UserId,
        consent: ConsentFlags,
        reviewed_at: DateTime<Utc>,
    ) -> Result<()> {
        let consent = serde_json::to_string(&consent)?;
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE users SET consent = ?1, last_privacy_review = ?2 WHERE id = ?3",
                params![consent, timestamp(&reviewed_at), id.to_string()],
            )?;
            not_found_if_untouched(changed, format!("user {}", id))
        })
        .await
    }

    async fn add_movie(&self, movie: &Movie) -> Result<()> {
        let genres = serde_json::to_string(&movie.genres)?;
        let movie = movie.clone();
        self.with_conn(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO movies ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    MOVIE_COLUMNS
                ),
                params![
                    movie.id.to_string(),
                    movie.user_id.to_string(),
                    movie.title,
                    movie.year,
                    genres,
                    movie.watch_context,
                    timestamp(&movie.created_at),
                    movie.last_analyzed.as_ref().map(timestamp),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_movie(&self, id: MovieId) -> Result<Movie> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM movies WHERE id = ?1", MOVIE_COLUMNS),
                params![id.to_string()],
                row_to_movie,
            )
            .optional()?
            .ok_or_else(|| KttError::NotFound(format!("movie {}", id)))
        })
        .await
    }

    async fn list_movies(&self, user_id: UserId) -> Result<Vec<Movie>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM movies WHERE user_id = ?1 ORDER BY created_at, rowid",
                MOVIE_COLUMNS
            ))?;
            let movies = stmt
                .query_map(params![user_id.to_string()], row_to_movie)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(movies)
        })
        .await
    }

    async fn touch_movie_analyzed(&self, id: MovieId, at: DateTime<Utc>) -> Result<()> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE movies SET last_analyzed = ?1 WHERE id = ?2",
                params![timestamp(&at), id.to_string()],
            )?;
            not_found_if_untouched(changed, format!("movie {}", id))
        })
        .await
    }

    async fn create_session(&self, session: &Session) -> Result<()> {
        let movie_ids = serde_json::to_string(&session.movie_ids)?;
        let session = session.clone();
        self.with_conn(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO sessions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    SESSION_COLUMNS
                ),
                params![
                    session.id.to_string(),
                    session.user_id.to_string(),
                    session.session_type.as_str(),
                    session.status.as_str(),
                    timestamp(&session.started_at),
                    session.ended_at.as_ref().map(timestamp),
                    movie_ids,
                    session.current_phase.as_str(),
                    session.current_question_index,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_session(&self, id: SessionId) -> Result<Session> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS),
                params![id.to_string()],
                row_to_session,
            )
            .optional()?
            .ok_or_else(|| KttError::NotFound(format!("session {}", id)))
        })
        .await
    }

    async fn update_session_progress(
        &self,
        id: SessionId,
        phase: Phase,
        index: usize,
    ) -> Result<()> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE sessions SET current_phase = ?1, current_question_index = ?2
                 WHERE id = ?3",
                params![phase.as_str(), index, id.to_string()],
            )?;
            not_found_if_untouched(changed, format!("session {}", id))
        })
        .await
    }

    async fn update_session_status(
        &self,
        id: SessionId,
        status: SessionStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE sessions SET status = ?1, ended_at = COALESCE(?2, ended_at)
                 WHERE id = ?3",
                params![
                    status.as_str(),
                    ended_at.as_ref().map(timestamp),
                    id.to_string()
                ],
            )?;
            not_found_if_untouched(changed, format!("session {}", id))
        })
        .await
    }

    async fn count_completed_sessions(&self, user_id: UserId) -> Result<usize> {
        self.with_conn(move |conn| {
            let count: usize = conn.query_row(
                "SELECT COUNT(*) FROM sessions WHERE user_id = ?1 AND status = ?2",
                params![user_id.to_string(), SessionStatus::Completed.as_str()],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
    }

    async fn list_sessions(
        &self,
        user_id: UserId,
        status: Option<SessionStatus>,
    ) -> Result<Vec<Session>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM sessions
                 WHERE user_id = ?1 AND (?2 IS NULL OR status = ?2)
                 ORDER BY started_at DESC, rowid DESC",
                SESSION_COLUMNS
            ))?;
            let sessions = stmt
                .query_map(
                    params![user_id.to_string(), status.map(|s| s.as_str())],
                    row_to_session,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(sessions)
        })
        .await
    }

    async fn insert_response(&self, response: &ResponseRecord) -> Result<()> {
        let response = response.clone();
        self.with_conn(move |conn| {
            let session_exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sessions WHERE id = ?1)",
                params![response.session_id.to_string()],
                |row| row.get(0),
            )?;
            if !session_exists {
                return Err(KttError::NotFound(format!(
                    "session {}",
                    response.session_id
                )));
            }

            conn.execute(
                "INSERT INTO responses (id, session_id, movie_id, question_key, question_text,
                     ciphertext, confidence, is_new_insight, specificity_score,
                     follow_up_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    response.id.to_string(),
                    response.session_id.to_string(),
                    response.movie_id.to_string(),
                    response.question_key,
                    response.question_text,
                    response.ciphertext,
                    response.confidence.map(|c| c.value()),
                    response.is_new_insight,
                    response.specificity_score,
                    response.follow_up_count,
                    timestamp(&response.created_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_responses_for_user(&self, user_id: UserId) -> Result<Vec<ResponseRecord>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM responses r JOIN sessions s ON s.id = r.session_id
                 WHERE s.user_id = ?1 ORDER BY r.created_at, r.rowid",
                RESPONSE_COLUMNS
            ))?;
            let responses = stmt
                .query_map(params![user_id.to_string()], row_to_response)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(responses)
        })
        .await
    }

    async fn list_responses_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<ResponseRecord>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM responses r WHERE r.session_id = ?1
                 ORDER BY r.created_at, r.rowid",
                RESPONSE_COLUMNS
            ))?;
            let responses = stmt
                .query_map(params![session_id.to_string()], row_to_response)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(responses)
        })
        .await
    }

    async fn list_responses_for_movie(&self, movie_id: MovieId) -> Result<Vec<ResponseRecord>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM responses r WHERE r.movie_id = ?1
                 ORDER BY r.created_at, r.rowid",
                RESPONSE_COLUMNS
            ))?;
            let responses = stmt
                .query_map(params![movie_id.to_string()], row_to_response)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(responses)
        })
        .await
    }

    async fn upsert_pattern(
        &self,
        user_id: UserId,
        candidate: &PatternCandidate,
    ) -> Result<Pattern> {
        let candidate = candidate.clone();
        self.with_conn(move |conn| {
            let now = Utc::now();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing = tx
                .query_row(
                    &format!(
                        "SELECT {} FROM patterns
                         WHERE user_id = ?1 AND pattern_type = ?2 AND description = ?3",
                        PATTERN_COLUMNS
                    ),
                    params![
                        user_id.to_string(),
                        candidate.pattern_type.as_str(),
                        candidate.description
                    ],
                    row_to_pattern,
                )
                .optional()?;

            let pattern = match existing {
                Some(mut pattern) => {
                    pattern.merge(&candidate, now);
                    tx.execute(
                        "UPDATE patterns SET confidence = ?1, supporting_movie_ids = ?2,
                             last_confirmed = ?3
                         WHERE id = ?4",
                        params![
                            pattern.confidence,
                            serde_json::to_string(&pattern.supporting_movie_ids)?,
                            pattern.last_confirmed.as_ref().map(timestamp),
                            pattern.id.to_string(),
                        ],
                    )?;
                    pattern
                }
                None => {
                    let pattern = Pattern::from_candidate(user_id, candidate, now);
                    tx.execute(
                        &format!(
                            "INSERT INTO patterns ({})
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                            PATTERN_COLUMNS
                        ),
                        params![
                            pattern.id.to_string(),
                            pattern.user_id.to_string(),
                            pattern.pattern_type.as_str(),
                            pattern.description,
                            pattern.confidence,
                            serde_json::to_string(&pattern.supporting_movie_ids)?,
                            pattern.validated,
                            timestamp(&pattern.first_detected),
                            pattern.last_confirmed.as_ref().map(timestamp),
                        ],
                    )?;
                    pattern
                }
            };

            tx.commit()?;
            Ok(pattern)
        })
        .await
    }

    async fn list_patterns(&self, user_id: UserId) -> Result<Vec<Pattern>> {
        let mut patterns = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM patterns WHERE user_id = ?1",
                    PATTERN_COLUMNS
                ))?;
                let patterns = stmt
                    .query_map(params![user_id.to_string()], row_to_pattern)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(patterns)
            })
            .await?;
        sort_patterns(&mut patterns);
        Ok(patterns)
    }

    async fn set_pattern_validation(&self, id: PatternId, validated: Option<bool>) -> Result<()> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE patterns SET validated = ?1 WHERE id = ?2",
                params![validated, id.to_string()],
            )?;
            not_found_if_untouched(changed, format!("pattern {}", id))
        })
        .await
    }

    async fn delete_patterns(&self, user_id: UserId) -> Result<usize> {
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM patterns WHERE user_id = ?1",
                params![user_id.to_string()],
            )?;
            Ok(removed)
        })
        .await
    }

    async fn upsert_taste_element(
        &self,
        user_id: UserId,
        candidate: &TasteElementCandidate,
    ) -> Result<TasteElement> {
        let candidate = candidate.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing = tx
                .query_row(
                    &format!(
                        "SELECT {} FROM taste_elements WHERE user_id = ?1 AND element_name = ?2",
                        ELEMENT_COLUMNS
                    ),
                    params![user_id.to_string(), candidate.element_name],
                    row_to_element,
                )
                .optional()?;

            let element = match existing {
                Some(mut element) => {
                    element.merge(&candidate);
                    tx.execute(
                        "UPDATE taste_elements SET importance_score = ?1, mention_count = ?2
                         WHERE id = ?3",
                        params![
                            element.importance_score,
                            element.mention_count,
                            element.id.to_string()
                        ],
                    )?;
                    element
                }
                None => {
                    let element = TasteElement::from_candidate(user_id, candidate, Utc::now());
                    tx.execute(
                        &format!(
                            "INSERT INTO taste_elements ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                            ELEMENT_COLUMNS
                        ),
                        params![
                            element.id.to_string(),
                            element.user_id.to_string(),
                            element.element_type.as_str(),
                            element.element_name,
                            element.importance_score,
                            element.mention_count,
                            timestamp(&element.first_mentioned),
                        ],
                    )?;
                    element
                }
            };

            tx.commit()?;
            Ok(element)
        })
        .await
    }

    async fn list_taste_elements(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<TasteElement>> {
        let mut elements = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM taste_elements WHERE user_id = ?1",
                    ELEMENT_COLUMNS
                ))?;
                let elements = stmt
                    .query_map(params![user_id.to_string()], row_to_element)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(elements)
            })
            .await?;
        sort_taste_elements(&mut elements);
        elements.truncate(limit);
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PatternType, SessionType};

    async fn open_temp() -> (tempfile::TempDir, SqliteRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = SqliteRepository::with_pool_size(dir.path().join("ktt.db"), 2)
            .await
            .unwrap();
        (dir, repo)
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ktt.db");

        SqliteRepository::with_pool_size(&path, 1).await.unwrap();
        SqliteRepository::with_pool_size(&path, 1).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_user_round_trip() {
        let (_dir, repo) = open_temp().await;
        let user = User::new(ConsentFlags::all_granted());
        repo.create_user(&user).await.unwrap();

        let loaded = repo.get_user(user.id).await.unwrap();
        assert_eq!(loaded.id, user.id);
        assert_eq!(loaded.consent, ConsentFlags::all_granted());
        assert!(loaded.last_privacy_review.is_none());
    }

    #[tokio::test]
    async fn test_session_status_keeps_end_time() {
        let (_dir, repo) = open_temp().await;
        let session = Session::new(UserId::new(), SessionType::Temporal, vec![MovieId::new()]);
        repo.create_session(&session).await.unwrap();

        let ended = Utc::now();
        repo.update_session_status(session.id, SessionStatus::Completed, Some(ended))
            .await
            .unwrap();
        repo.update_session_status(session.id, SessionStatus::Completed, None)
            .await
            .unwrap();

        let loaded = repo.get_session(session.id).await.unwrap();
        assert_eq!(loaded.status, SessionStatus::Completed);
        assert_eq!(loaded.session_type, SessionType::Temporal);
        assert_eq!(loaded.movie_ids, session.movie_ids);
        assert!(loaded.ended_at.is_some());
    }

    #[tokio::test]
    async fn test_update_missing_session_is_not_found() {
        let (_dir, repo) = open_temp().await;
        let result = repo
            .update_session_progress(SessionId::new(), Phase::Monitoring, 1)
            .await;
        assert!(matches!(result, Err(KttError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_taste_element_upsert() {
        let (_dir, repo) = open_temp().await;
        let user = UserId::new();
        let candidate = |importance: f32, count: u32| TasteElementCandidate {
            element_type: PatternType::Thematic,
            element_name: "loss".to_string(),
            importance_score: importance,
            mention_count: count,
        };

        let first = repo
            .upsert_taste_element(user, &candidate(0.7, 5))
            .await
            .unwrap();
        let second = repo
            .upsert_taste_element(user, &candidate(0.4, 2))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.mention_count, 2);
        assert!((second.importance_score - 0.7).abs() < 1e-6);
        assert_eq!(repo.list_taste_elements(user, 10).await.unwrap().len(), 1);
    }
}
