//! Consent management
//!
//! Each installation records which kinds of data the user agreed to store.
//! Two kinds are required for the app to function at all; the rest can be
//! withdrawn, and withdrawing pattern analysis invalidates every detected
//! pattern.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{KttError, Result};
use crate::storage::TasteRepository;
use crate::types::UserId;

/// A kind of data processing the user can consent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentKind {
    StoreMovieTitles,
    StoreReflections,
    StoreTemporalData,
    EnablePatternAnalysis,
    EnableExport,
}

impl ConsentKind {
    pub const ALL: [ConsentKind; 5] = [
        ConsentKind::StoreMovieTitles,
        ConsentKind::StoreReflections,
        ConsentKind::StoreTemporalData,
        ConsentKind::EnablePatternAnalysis,
        ConsentKind::EnableExport,
    ];

    /// Required kinds cannot be withdrawn; deleting all data is the only way out.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            ConsentKind::StoreMovieTitles | ConsentKind::StoreReflections
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConsentKind::StoreMovieTitles => "Store Movie Titles",
            ConsentKind::StoreReflections => "Store Written Reflections",
            ConsentKind::StoreTemporalData => "Store Temporal Data",
            ConsentKind::EnablePatternAnalysis => "Enable Pattern Analysis",
            ConsentKind::EnableExport => "Enable Data Export",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConsentKind::StoreMovieTitles => {
                "Store the titles and basic metadata of movies you analyze."
            }
            ConsentKind::StoreReflections => {
                "Store your written responses to questions (encrypted)."
            }
            ConsentKind::StoreTemporalData => {
                "Store when you watched movies and when you wrote reflections."
            }
            ConsentKind::EnablePatternAnalysis => {
                "Analyze your responses to detect patterns in your taste."
            }
            ConsentKind::EnableExport => "Allow exporting your data as JSON or Markdown.",
        }
    }
}

/// Recorded consent choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentFlags {
    pub store_movie_titles: bool,
    pub store_reflections: bool,
    #[serde(default)]
    pub store_temporal_data: bool,
    #[serde(default)]
    pub enable_pattern_analysis: bool,
    #[serde(default)]
    pub enable_export: bool,
}

impl ConsentFlags {
    /// Only the required kinds granted
    pub fn required_only() -> Self {
        Self {
            store_movie_titles: true,
            store_reflections: true,
            store_temporal_data: false,
            enable_pattern_analysis: false,
            enable_export: false,
        }
    }

    /// Every kind granted
    pub fn all_granted() -> Self {
        Self {
            store_movie_titles: true,
            store_reflections: true,
            store_temporal_data: true,
            enable_pattern_analysis: true,
            enable_export: true,
        }
    }

    pub fn has(&self, kind: ConsentKind) -> bool {
        match kind {
            ConsentKind::StoreMovieTitles => self.store_movie_titles,
            ConsentKind::StoreReflections => self.store_reflections,
            ConsentKind::StoreTemporalData => self.store_temporal_data,
            ConsentKind::EnablePatternAnalysis => self.enable_pattern_analysis,
            ConsentKind::EnableExport => self.enable_export,
        }
    }

    pub fn set(&mut self, kind: ConsentKind, granted: bool) {
        let flag = match kind {
            ConsentKind::StoreMovieTitles => &mut self.store_movie_titles,
            ConsentKind::StoreReflections => &mut self.store_reflections,
            ConsentKind::StoreTemporalData => &mut self.store_temporal_data,
            ConsentKind::EnablePatternAnalysis => &mut self.enable_pattern_analysis,
            ConsentKind::EnableExport => &mut self.enable_export,
        };
        *flag = granted;
    }
}

impl Default for ConsentFlags {
    fn default() -> Self {
        Self::required_only()
    }
}

/// Check whether the user granted a consent kind
pub async fn has_consent<R>(repo: &R, user_id: UserId, kind: ConsentKind) -> Result<bool>
where
    R: TasteRepository + ?Sized,
{
    let user = repo.get_user(user_id).await?;
    Ok(user.consent.has(kind))
}

/// Withdraw a consent kind.
///
/// Returns `Ok(false)` when it was already withdrawn. Withdrawing pattern
/// analysis deletes all detected patterns for the user.
pub async fn withdraw_consent<R>(repo: &R, user_id: UserId, kind: ConsentKind) -> Result<bool>
where
    R: TasteRepository + ?Sized,
{
    if kind.is_required() {
        return Err(KttError::ConsentRequired(format!(
            "'{}' is required; delete all data to stop using the app",
            kind.name()
        )));
    }

    let user = repo.get_user(user_id).await?;
    if !user.consent.has(kind) {
        return Ok(false);
    }

    let mut flags = user.consent;
    flags.set(kind, false);
    repo.update_consent(user_id, flags, Utc::now()).await?;

    if kind == ConsentKind::EnablePatternAnalysis {
        let removed = repo.delete_patterns(user_id).await?;
        info!("Pattern analysis withdrawn, {} patterns deleted", removed);
    }

    info!("Consent '{}' withdrawn", kind.name());
    Ok(true)
}

/// Grant a consent kind
pub async fn grant_consent<R>(repo: &R, user_id: UserId, kind: ConsentKind) -> Result<()>
where
    R: TasteRepository + ?Sized,
{
    let user = repo.get_user(user_id).await?;
    let mut flags = user.consent;
    flags.set(kind, true);
    repo.update_consent(user_id, flags, Utc::now()).await
}
