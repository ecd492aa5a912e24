//! Taste analysis
//!
//! Pure lexical scoring and extraction, plus the batch jobs built on them:
//! - [`specificity`]: how concrete a single response is
//! - [`elements`]: which craft aspects and themes a response mentions
//! - [`patterns`]: recurring elements and concepts across movies
//! - [`taste`]: accumulating per-element statistics
//! - [`insights`]: summaries and readable insight lines

pub mod elements;
pub mod insights;
pub mod lexicon;
pub mod patterns;
pub mod specificity;
pub mod taste;

pub use elements::{Aspect, ElementExtractor, ElementTag, ElementTally, Theme};
pub use insights::{compare_movies, profile_insights, session_insights, summarize, TasteSummary};
pub use patterns::{DetectionReport, PatternDetector, RevealedResponse};
pub use specificity::SpecificityScorer;
pub use taste::TasteElementAggregator;

use crate::cipher::ResponseCipher;
use crate::config::KttConfig;
use crate::error::Result;
use crate::storage::TasteRepository;
use crate::types::{Pattern, UserId};

/// Detect and store patterns for a user, returning the stored records
pub async fn run_pattern_detection<R>(
    repo: &R,
    cipher: &dyn ResponseCipher,
    config: &KttConfig,
    user_id: UserId,
) -> Result<Vec<Pattern>>
where
    R: TasteRepository + ?Sized,
{
    let report = PatternDetector::new(config).run(repo, cipher, user_id).await?;
    Ok(report.patterns)
}
