//! Core data types for Know Thy Taste
//!
//! Identifiers, the interview vocabulary (phases, categories, session types)
//! and the persisted entities: users, movies, sessions, responses, patterns
//! and taste elements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::consent::ConsentFlags;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse an identifier from a string
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of the (single) user owning all data
    UserId
);
entity_id!(
    /// Identifier of a movie the user reflected on
    MovieId
);
entity_id!(
    /// Identifier of an interview session
    SessionId
);
entity_id!(
    /// Identifier of a stored response
    ResponseId
);
entity_id!(
    /// Identifier of a persisted pattern
    PatternId
);
entity_id!(
    /// Identifier of a persisted taste element
    TasteElementId
);

/// Error returned when parsing one of the string-backed enums fails
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// The three cognitive phases of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// What did you notice?
    Planning,
    /// How did you engage?
    Monitoring,
    /// Why did it matter?
    Evaluation,
}

string_enum!(Phase, "phase", {
    Planning => "planning",
    Monitoring => "monitoring",
    Evaluation => "evaluation",
});

impl Phase {
    /// All phases in session order
    pub const ALL: [Phase; 3] = [Phase::Planning, Phase::Monitoring, Phase::Evaluation];

    /// The phase that follows this one, `None` after evaluation
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Planning => Some(Phase::Monitoring),
            Phase::Monitoring => Some(Phase::Evaluation),
            Phase::Evaluation => None,
        }
    }
}

/// What a question is probing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    Sensory,
    Emotional,
    Narrative,
    Thematic,
    Technical,
}

string_enum!(QuestionCategory, "question category", {
    Sensory => "sensory",
    Emotional => "emotional",
    Narrative => "narrative",
    Thematic => "thematic",
    Technical => "technical",
});

/// Kind of session, which decides the question subset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionType {
    /// Intensive analysis of one or two films
    DeepDive,
    /// Compare several similar films to find differentiators
    PatternHunt,
    /// Compare a rewatch with the first viewing
    Temporal,
    /// Unspecified: a short balanced selection
    #[default]
    Balanced,
}

string_enum!(SessionType, "session type", {
    DeepDive => "deep-dive",
    PatternHunt => "pattern-hunt",
    Temporal => "temporal",
    Balanced => "balanced",
});

impl SessionType {
    /// How many movies the session works through at most
    pub fn max_movies(&self) -> usize {
        match self {
            SessionType::DeepDive => 2,
            SessionType::PatternHunt => 4,
            SessionType::Temporal => 1,
            SessionType::Balanced => 2,
        }
    }
}

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
    Abandoned,
}

string_enum!(SessionStatus, "session status", {
    Active => "active",
    Paused => "paused",
    Completed => "completed",
    Abandoned => "abandoned",
});

/// Self-reported confidence in a response, 1 (guessing) to 5 (certain)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ConfidenceRating(u8);

impl ConfidenceRating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Build a rating, rejecting values outside 1..=5
    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ConfidenceRating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("confidence rating out of range: {}", value))
    }
}

impl From<ConfidenceRating> for u8 {
    fn from(rating: ConfidenceRating) -> Self {
        rating.0
    }
}

/// The user owning all data in one installation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub created_at: DateTime<Utc>,
    pub consent: ConsentFlags,
    pub last_privacy_review: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(consent: ConsentFlags) -> Self {
        Self {
            id: UserId::new(),
            created_at: Utc::now(),
            consent,
            last_privacy_review: None,
        }
    }
}

/// A movie the user has watched and may reflect on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub user_id: UserId,
    pub title: String,
    pub year: Option<u16>,
    pub genres: Vec<String>,
    pub watch_context: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_analyzed: Option<DateTime<Utc>>,
}

impl Movie {
    pub fn new(user_id: UserId, title: impl Into<String>, year: Option<u16>) -> Self {
        Self {
            id: MovieId::new(),
            user_id,
            title: title.into().trim().to_string(),
            year,
            genres: Vec::new(),
            watch_context: None,
            created_at: Utc::now(),
            last_analyzed: None,
        }
    }
}

impl fmt::Display for Movie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} ({})", self.title, year),
            None => f.write_str(&self.title),
        }
    }
}

/// An interview session over one or more movies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub movie_ids: Vec<MovieId>,
    pub current_phase: Phase,
    pub current_question_index: usize,
}

impl Session {
    pub fn new(user_id: UserId, session_type: SessionType, movie_ids: Vec<MovieId>) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            session_type,
            status: SessionStatus::Active,
            started_at: Utc::now(),
            ended_at: None,
            movie_ids,
            current_phase: Phase::Planning,
            current_question_index: 0,
        }
    }
}

/// A stored answer to one question. The text only exists sealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub id: ResponseId,
    pub session_id: SessionId,
    pub movie_id: MovieId,
    pub question_key: String,
    pub question_text: String,
    pub ciphertext: Vec<u8>,
    pub confidence: Option<ConfidenceRating>,
    pub is_new_insight: bool,
    pub specificity_score: f32,
    pub follow_up_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Classification of a detected pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Thematic,
    Visual,
    Auditory,
    Structural,
    Performance,
    Conceptual,
    General,
}

string_enum!(PatternType, "pattern type", {
    Thematic => "thematic",
    Visual => "visual",
    Auditory => "auditory",
    Structural => "structural",
    Performance => "performance",
    Conceptual => "conceptual",
    General => "general",
});

/// A candidate produced by one detection pass, before merging into storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCandidate {
    pub pattern_type: PatternType,
    pub description: String,
    pub confidence: f32,
    pub movie_ids: BTreeSet<MovieId>,
}

/// A persisted, confidence-scored inference about the user's taste
///
/// Identity for merging is (user_id, pattern_type, description).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    pub user_id: UserId,
    pub pattern_type: PatternType,
    pub description: String,
    pub confidence: f32,
    pub supporting_movie_ids: BTreeSet<MovieId>,
    /// `None` until the user confirms or rejects the pattern
    pub validated: Option<bool>,
    pub first_detected: DateTime<Utc>,
    pub last_confirmed: Option<DateTime<Utc>>,
}

impl Pattern {
    /// Create a fresh record from a candidate
    pub fn from_candidate(
        user_id: UserId,
        candidate: PatternCandidate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PatternId::new(),
            user_id,
            pattern_type: candidate.pattern_type,
            description: candidate.description,
            confidence: candidate.confidence,
            supporting_movie_ids: candidate.movie_ids,
            validated: None,
            first_detected: now,
            last_confirmed: None,
        }
    }

    /// Fold a repeated detection into this record.
    ///
    /// Confidence never drops and the supporting set only grows.
    pub fn merge(&mut self, candidate: &PatternCandidate, now: DateTime<Utc>) {
        self.confidence = self.confidence.max(candidate.confidence);
        self.supporting_movie_ids
            .extend(candidate.movie_ids.iter().copied());
        self.last_confirmed = Some(now);
    }
}

/// Per-element statistics produced by one aggregation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasteElementCandidate {
    pub element_type: PatternType,
    pub element_name: String,
    pub importance_score: f32,
    pub mention_count: u32,
}

/// An accumulating per-user statistic for one extracted element
///
/// Identity for merging is (user_id, element_name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasteElement {
    pub id: TasteElementId,
    pub user_id: UserId,
    pub element_type: PatternType,
    pub element_name: String,
    pub importance_score: f32,
    pub mention_count: u32,
    pub first_mentioned: DateTime<Utc>,
}

impl TasteElement {
    pub fn from_candidate(
        user_id: UserId,
        candidate: TasteElementCandidate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TasteElementId::new(),
            user_id,
            element_type: candidate.element_type,
            element_name: candidate.element_name,
            importance_score: candidate.importance_score,
            mention_count: candidate.mention_count,
            first_mentioned: now,
        }
    }

    /// Mention count is replaced by the latest pass; importance only rises.
    pub fn merge(&mut self, candidate: &TasteElementCandidate) {
        self.mention_count = candidate.mention_count;
        self.importance_score = self.importance_score.max(candidate.importance_score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(confidence: f32, movies: &[MovieId]) -> PatternCandidate {
        PatternCandidate {
            pattern_type: PatternType::Visual,
            description: "You pay close attention to visual elements".to_string(),
            confidence,
            movie_ids: movies.iter().copied().collect(),
        }
    }

    #[test]
    fn test_phase_order() {
        assert_eq!(Phase::Planning.next(), Some(Phase::Monitoring));
        assert_eq!(Phase::Monitoring.next(), Some(Phase::Evaluation));
        assert_eq!(Phase::Evaluation.next(), None);
    }

    #[test]
    fn test_session_type_round_trips_through_str() {
        for ty in [
            SessionType::DeepDive,
            SessionType::PatternHunt,
            SessionType::Temporal,
            SessionType::Balanced,
        ] {
            assert_eq!(ty.as_str().parse::<SessionType>().unwrap(), ty);
        }
        assert!("marathon".parse::<SessionType>().is_err());
    }

    #[test]
    fn test_confidence_rating_bounds() {
        assert!(ConfidenceRating::new(0).is_none());
        assert_eq!(ConfidenceRating::new(1).map(|c| c.value()), Some(1));
        assert_eq!(ConfidenceRating::new(5).map(|c| c.value()), Some(5));
        assert!(ConfidenceRating::new(6).is_none());
        assert!(serde_json::from_str::<ConfidenceRating>("9").is_err());
    }

    #[test]
    fn test_pattern_merge_is_monotonic() {
        let user = UserId::new();
        let (a, b, c) = (MovieId::new(), MovieId::new(), MovieId::new());
        let now = Utc::now();
        let mut pattern = Pattern::from_candidate(user, candidate(0.7, &[a, b]), now);

        pattern.merge(&candidate(0.5, &[b, c]), now);

        assert_eq!(pattern.confidence, 0.7);
        assert_eq!(pattern.supporting_movie_ids.len(), 3);
        assert_eq!(pattern.validated, None);
        assert_eq!(pattern.last_confirmed, Some(now));
    }

    #[test]
    fn test_taste_element_merge_overwrites_count() {
        let now = Utc::now();
        let mut element = TasteElement::from_candidate(
            UserId::new(),
            TasteElementCandidate {
                element_type: PatternType::Thematic,
                element_name: "loss".to_string(),
                importance_score: 0.8,
                mention_count: 6,
            },
            now,
        );

        element.merge(&TasteElementCandidate {
            element_type: PatternType::Thematic,
            element_name: "loss".to_string(),
            importance_score: 0.5,
            mention_count: 2,
        });

        assert_eq!(element.mention_count, 2);
        assert_eq!(element.importance_score, 0.8);
    }
}
