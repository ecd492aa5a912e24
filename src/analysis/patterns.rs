//! Pattern detection
//!
//! Batch job over a user's whole response history. Each response is revealed,
//! tagged by the element extractor, and tallied per element. Elements that
//! recur across enough movies become element patterns; recurring concept
//! words in responses the user felt confident about become conceptual
//! patterns. Candidates are merged into storage by identity key, then the
//! same tally feeds the taste element aggregator.
//!
//! Unreadable records are skipped; too little data yields an empty result.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use super::elements::{ElementTag, ElementTally};
use super::taste::TasteElementAggregator;
use crate::cipher::ResponseCipher;
use crate::config::{KttConfig, PatternConfig};
use crate::error::Result;
use crate::storage::TasteRepository;
use crate::types::{
    ConfidenceRating, MovieId, Pattern, PatternCandidate, PatternType, ResponseRecord,
    TasteElement, UserId,
};

/// Weight of movie coverage in element pattern confidence
const COVERAGE_WEIGHT: f32 = 0.7;
/// Weight of mention frequency in element pattern confidence
const FREQUENCY_WEIGHT: f32 = 0.3;

struct Concept {
    pattern: Regex,
    description: &'static str,
}

static CONCEPTS: Lazy<Vec<Concept>> = Lazy::new(|| {
    [
        (r"\b(intimate|intimacy)\b", "You value intimate, close moments in films"),
        (r"\b(quiet|silence|stillness)\b", "Quiet, still moments resonate with you"),
        (r"\b(unexpected|surprise|surprising)\b", "You appreciate the unexpected"),
        (r"\b(authentic|real|genuine)\b", "Authenticity matters deeply to you"),
        (r"\b(beautiful|beauty)\b", "Visual beauty captures your attention"),
        (r"\b(tension|tense|suspense)\b", "You engage with tension and suspense"),
        (r"\b(subtle|subtlety|understated)\b", "You appreciate subtlety over obviousness"),
    ]
    .into_iter()
    .map(|(pattern, description)| Concept {
        pattern: Regex::new(&format!("(?i){}", pattern)).expect("Valid concept regex"),
        description,
    })
    .collect()
});

/// A response whose text has been revealed for analysis
#[derive(Debug, Clone, PartialEq)]
pub struct RevealedResponse {
    pub movie_id: MovieId,
    pub text: String,
    pub confidence: Option<ConfidenceRating>,
}

/// What one detection run found and stored
#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
    /// Stored pattern records touched by this run, in candidate order
    pub patterns: Vec<Pattern>,
    pub taste_elements: Vec<TasteElement>,
    pub responses_scanned: usize,
    pub unreadable_skipped: usize,
    pub movies_considered: usize,
}

impl DetectionReport {
    /// True when the run stored nothing (too little data or no recurring signal)
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.taste_elements.is_empty()
    }
}

/// Output of the pure detection pass
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub candidates: Vec<PatternCandidate>,
    pub tally: ElementTally,
}

/// Detects taste patterns across movies
pub struct PatternDetector {
    config: PatternConfig,
    aggregator: TasteElementAggregator,
}

impl PatternDetector {
    pub fn new(config: &KttConfig) -> Self {
        Self {
            config: config.patterns.clone(),
            aggregator: TasteElementAggregator::new(&config.taste),
        }
    }

    /// Reveal every record, skipping the ones that fail to decrypt
    pub fn reveal_all(
        cipher: &dyn ResponseCipher,
        records: &[ResponseRecord],
    ) -> (Vec<RevealedResponse>, usize) {
        let mut revealed = Vec::with_capacity(records.len());
        let mut skipped = 0;

        for record in records {
            match cipher.reveal(&record.ciphertext) {
                Ok(text) => revealed.push(RevealedResponse {
                    movie_id: record.movie_id,
                    text,
                    confidence: record.confidence,
                }),
                Err(e) => {
                    warn!("Skipping response {}: {}", record.id, e.reason);
                    skipped += 1;
                }
            }
        }

        (revealed, skipped)
    }

    /// Pure pass: candidates and element tally for revealed responses.
    ///
    /// `recorded_movies` holds every movie with a recorded response, readable
    /// or not. It gates the pass and is the coverage denominator. Returns
    /// `None` when it has fewer than `min_movies` entries.
    pub fn detect(
        &self,
        responses: &[RevealedResponse],
        recorded_movies: &BTreeSet<MovieId>,
    ) -> Option<Detection> {
        let movies = recorded_movies;
        if movies.len() < self.config.min_movies {
            debug!(
                "Pattern detection needs {} movies, have {}",
                self.config.min_movies,
                movies.len()
            );
            return None;
        }

        let mut tally = ElementTally::new();
        for response in responses {
            tally.record(response.movie_id, &response.text);
        }

        let mut candidates = self.element_candidates(&tally, responses.len(), movies.len());
        candidates.extend(self.concept_candidates(responses));

        Some(Detection { candidates, tally })
    }

    fn element_candidates(
        &self,
        tally: &ElementTally,
        total_responses: usize,
        total_movies: usize,
    ) -> Vec<PatternCandidate> {
        tally
            .most_common(self.config.top_elements)
            .into_iter()
            .filter_map(|row| {
                let coverage = row.movie_ids.len() as f32 / total_movies as f32;
                let frequency = row.count as f32 / (total_responses as f32 * 0.5);
                let confidence = (coverage * COVERAGE_WEIGHT + frequency * FREQUENCY_WEIGHT)
                    .min(self.config.max_element_confidence);

                self.passes_floor(confidence, row.movie_ids.len())
                    .then(|| PatternCandidate {
                        pattern_type: row.tag.pattern_type(),
                        description: describe(row.tag),
                        confidence,
                        movie_ids: row.movie_ids.clone(),
                    })
            })
            .collect()
    }

    /// Concept words across responses rated at least `high_confidence_rating`
    fn concept_candidates(&self, responses: &[RevealedResponse]) -> Vec<PatternCandidate> {
        let confident: Vec<&RevealedResponse> = responses
            .iter()
            .filter(|r| {
                r.confidence
                    .is_some_and(|c| c.value() >= self.config.high_confidence_rating)
            })
            .collect();
        if confident.is_empty() {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for concept in CONCEPTS.iter() {
            let mut matches = 0;
            let mut movie_ids = BTreeSet::new();
            for response in &confident {
                let found = concept.pattern.find_iter(&response.text).count();
                if found > 0 {
                    matches += found;
                    movie_ids.insert(response.movie_id);
                }
            }

            if matches < self.config.concept_min_matches {
                continue;
            }

            let confidence = (matches as f32 / 10.0
                + movie_ids.len() as f32 / confident.len() as f32)
                .min(self.config.max_concept_confidence);

            if self.passes_floor(confidence, movie_ids.len()) {
                candidates.push(PatternCandidate {
                    pattern_type: PatternType::Conceptual,
                    description: concept.description.to_string(),
                    confidence,
                    movie_ids,
                });
            }
        }
        candidates
    }

    fn passes_floor(&self, confidence: f32, movies: usize) -> bool {
        confidence >= self.config.min_confidence && movies >= self.config.min_supporting_movies
    }

    /// Run detection over everything the user has answered and merge results
    /// into storage. Callers serialize runs per user.
    pub async fn run<R>(
        &self,
        repo: &R,
        cipher: &dyn ResponseCipher,
        user_id: UserId,
    ) -> Result<DetectionReport>
    where
        R: TasteRepository + ?Sized,
    {
        let records = repo.list_responses_for_user(user_id).await?;
        let recorded_movies: BTreeSet<MovieId> = records.iter().map(|r| r.movie_id).collect();
        let (revealed, skipped) = Self::reveal_all(cipher, &records);

        let mut report = DetectionReport {
            responses_scanned: records.len(),
            unreadable_skipped: skipped,
            movies_considered: recorded_movies.len(),
            ..Default::default()
        };

        let Some(detection) = self.detect(&revealed, &recorded_movies) else {
            info!(
                "Pattern detection skipped: {} movies with recorded responses",
                report.movies_considered
            );
            return Ok(report);
        };

        for candidate in &detection.candidates {
            let stored = repo.upsert_pattern(user_id, candidate).await?;
            report.patterns.push(stored);
        }

        report.taste_elements = self
            .aggregator
            .apply(repo, user_id, &detection.tally)
            .await?;

        info!(
            "Pattern detection: {} responses scanned, {} unreadable, {} candidates, {} taste elements",
            report.responses_scanned,
            report.unreadable_skipped,
            detection.candidates.len(),
            report.taste_elements.len()
        );

        Ok(report)
    }
}

/// Human-readable description for an element pattern
fn describe(tag: ElementTag) -> String {
    let name = tag.name();
    match tag.pattern_type() {
        PatternType::Thematic => format!("You consistently respond to themes of {}", name),
        PatternType::Visual => format!("You pay close attention to {} elements", name),
        PatternType::Auditory => {
            format!("Sound and music ({}) significantly impact your experience", name)
        }
        PatternType::Structural => format!("You notice and value {} in storytelling", name),
        PatternType::Performance => format!("Strong {} is a key factor in your enjoyment", name),
        PatternType::Conceptual | PatternType::General => {
            format!("You frequently mention {} in your responses", name)
        }
    }
}
