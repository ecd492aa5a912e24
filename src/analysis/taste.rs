//! Taste element aggregation
//!
//! Folds an element tally into per-user taste statistics. Importance grows
//! with both mentions and the number of movies an element shows up for.

use tracing::debug;

use super::elements::ElementTally;
use crate::config::TasteConfig;
use crate::error::Result;
use crate::storage::TasteRepository;
use crate::types::{TasteElement, TasteElementCandidate, UserId};

const MENTION_WEIGHT: f32 = 0.1;
const MOVIE_WEIGHT: f32 = 0.15;

/// Updates taste element statistics from a detection pass
pub struct TasteElementAggregator {
    top_elements: usize,
}

impl TasteElementAggregator {
    pub fn new(config: &TasteConfig) -> Self {
        Self {
            top_elements: config.top_elements,
        }
    }

    /// Candidates for the most mentioned elements of `tally`
    pub fn candidates(&self, tally: &ElementTally) -> Vec<TasteElementCandidate> {
        tally
            .most_common(self.top_elements)
            .into_iter()
            .map(|row| TasteElementCandidate {
                element_type: row.tag.pattern_type(),
                element_name: row.tag.name().to_string(),
                importance_score: importance(row.count, row.movie_ids.len()),
                mention_count: u32::try_from(row.count).unwrap_or(u32::MAX),
            })
            .collect()
    }

    /// Merge the tally into storage, returning the stored records
    pub async fn apply<R>(
        &self,
        repo: &R,
        user_id: UserId,
        tally: &ElementTally,
    ) -> Result<Vec<TasteElement>>
    where
        R: TasteRepository + ?Sized,
    {
        let mut stored = Vec::new();
        for candidate in self.candidates(tally) {
            stored.push(repo.upsert_taste_element(user_id, &candidate).await?);
        }
        debug!("Updated {} taste elements", stored.len());
        Ok(stored)
    }
}

fn importance(mentions: usize, movies: usize) -> f32 {
    (mentions as f32 * MENTION_WEIGHT + movies as f32 * MOVIE_WEIGHT).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryRepository;
    use crate::types::{MovieId, PatternType};

    #[test]
    fn test_importance_formula() {
        assert!((importance(2, 1) - 0.35).abs() < 1e-6);
        assert_eq!(importance(10, 5), 1.0);
    }

    #[test]
    fn test_candidates_use_bare_names() {
        let mut tally = ElementTally::new();
        tally.record(MovieId::new(), "grief and the soundtrack");

        let candidates = TasteElementAggregator::new(&TasteConfig::default()).candidates(&tally);
        let names: Vec<&str> = candidates.iter().map(|c| c.element_name.as_str()).collect();
        assert_eq!(names, vec!["audio", "loss"]);
        assert_eq!(candidates[1].element_type, PatternType::Thematic);
    }

    #[test]
    fn test_top_limit() {
        let mut tally = ElementTally::new();
        tally.record(
            MovieId::new(),
            "lighting, music, editing, dialogue, acting, palette",
        );

        let aggregator = TasteElementAggregator::new(&TasteConfig {
            top_elements: 2,
            summary_elements: 10,
        });
        assert_eq!(aggregator.candidates(&tally).len(), 2);
    }

    #[tokio::test]
    async fn test_second_pass_overwrites_count_and_keeps_max_importance() {
        let repo = InMemoryRepository::new();
        let user = UserId::new();
        let aggregator = TasteElementAggregator::new(&TasteConfig::default());

        let mut first = ElementTally::new();
        for _ in 0..4 {
            first.record(MovieId::new(), "grief");
        }
        aggregator.apply(&repo, user, &first).await.unwrap();

        let mut second = ElementTally::new();
        second.record(MovieId::new(), "grief");
        let stored = aggregator.apply(&repo, user, &second).await.unwrap();

        assert_eq!(stored[0].mention_count, 1);
        // first pass: 4 * 0.1 + 4 * 0.15
        assert!((stored[0].importance_score - 1.0).abs() < 1e-6);
    }
}
