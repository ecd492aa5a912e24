//! Know Thy Taste - adaptive film reflection and taste pattern inference
//!
//! Interviews a user about films they watched, presses vague answers for
//! specifics, and mines the accumulated reflections for recurring taste
//! patterns.
//!
//! # Architecture
//!
//! - **Types**: entities and identifiers (User, Movie, Session, Pattern, ...)
//! - **Analysis**: pure lexical scoring and extraction, pattern detection
//! - **Interview**: question bank, scaffolding, follow-up loop, session driver
//! - **Storage**: repository trait with SQLite and in-memory backends
//! - **Cipher**: response encryption; storage only ever sees sealed text
//!
//! # Example
//!
//! ```ignore
//! use ktt_core::{AgeCipher, Interview, KttConfig, SessionType, SqliteRepository};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = KttConfig::from_file(Path::new("ktt.toml"))?;
//!     let repo = SqliteRepository::open(&config.storage).await?;
//!     let cipher = AgeCipher::generate();
//!
//!     let interview = Interview::new(&repo, &cipher, &config);
//!     let outcome = interview
//!         .start(user_id, SessionType::DeepDive, &[movie_id], &mut my_prompter)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod cipher;
pub mod config;
pub mod consent;
pub mod error;
pub mod interview;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use analysis::{run_pattern_detection, summarize, SpecificityScorer, TasteSummary};
pub use cipher::{AgeCipher, ResponseCipher};
pub use config::KttConfig;
pub use consent::{ConsentFlags, ConsentKind};
pub use error::{DecryptionFailure, KttError, Result};
pub use interview::{
    score_response, Interview, InterviewPrompter, QuestionSequencer, ScaffoldPolicy,
};
pub use storage::{InMemoryRepository, SqliteRepository, TasteRepository};
pub use types::{
    ConfidenceRating, Movie, MovieId, Pattern, PatternType, Phase, Session, SessionId,
    SessionStatus, SessionType, TasteElement, User, UserId,
};
