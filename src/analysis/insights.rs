//! Reporting over detected patterns and taste elements
//!
//! Read-only views for the presentation layer: a structured taste summary and
//! short human-readable insight lines for a profile, a session, or a set of
//! movies.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::elements::{ElementExtractor, ElementTag};
use super::patterns::PatternDetector;
use crate::cipher::ResponseCipher;
use crate::error::Result;
use crate::storage::TasteRepository;
use crate::types::{MovieId, PatternType, SessionId, UserId};

/// Minimum analyzed movies before the profile mentions its own size
const PROFILE_SIZE_NOTE_MOVIES: usize = 5;

/// One pattern as shown in a summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternSummary {
    pub description: String,
    pub confidence: f32,
    pub validated: Option<bool>,
}

/// One taste element as shown in a summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementSummary {
    pub name: String,
    pub element_type: PatternType,
    pub importance: f32,
}

/// Structured overview of a user's taste
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TasteSummary {
    pub patterns_by_type: BTreeMap<PatternType, Vec<PatternSummary>>,
    pub top_elements: Vec<ElementSummary>,
    pub pattern_count: usize,
    /// Patterns the user confirmed
    pub validated_count: usize,
}

/// Summarize patterns by type along with the `top_elements` most important elements
pub async fn summarize<R>(repo: &R, user_id: UserId, top_elements: usize) -> Result<TasteSummary>
where
    R: TasteRepository + ?Sized,
{
    let patterns = repo.list_patterns(user_id).await?;
    let elements = repo.list_taste_elements(user_id, top_elements).await?;

    let mut summary = TasteSummary {
        pattern_count: patterns.len(),
        validated_count: patterns.iter().filter(|p| p.validated == Some(true)).count(),
        ..Default::default()
    };

    for pattern in patterns {
        summary
            .patterns_by_type
            .entry(pattern.pattern_type)
            .or_default()
            .push(PatternSummary {
                description: pattern.description,
                confidence: pattern.confidence,
                validated: pattern.validated,
            });
    }

    summary.top_elements = elements
        .into_iter()
        .map(|e| ElementSummary {
            name: e.element_name,
            element_type: e.element_type,
            importance: e.importance_score,
        })
        .collect();

    Ok(summary)
}

/// Insight lines built from confirmed patterns and top elements
pub async fn profile_insights<R>(repo: &R, user_id: UserId) -> Result<Vec<String>>
where
    R: TasteRepository + ?Sized,
{
    let confirmed: Vec<_> = repo
        .list_patterns(user_id)
        .await?
        .into_iter()
        .filter(|p| p.validated == Some(true))
        .collect();
    let elements = repo.list_taste_elements(user_id, 5).await?;
    let movie_count = repo.list_movies(user_id).await?.len();

    if confirmed.is_empty() && elements.is_empty() {
        return Ok(vec![
            "Complete more sessions to discover patterns in your taste.".to_string(),
        ]);
    }

    let mut insights = Vec::new();

    if let Some(top) = confirmed.first() {
        insights.push(format!(
            "Your most distinctive trait: {}",
            top.description.to_lowercase()
        ));
    }

    if confirmed.len() >= 2 {
        if let Some(thematic) = confirmed
            .iter()
            .find(|p| p.pattern_type == PatternType::Thematic)
        {
            let themes = thematic
                .description
                .split_once("themes of ")
                .map(|(_, rest)| rest)
                .unwrap_or("various emotional themes");
            insights.push(format!("Themes that resonate: {}", themes));
        }

        if let Some(technical) = confirmed.iter().find(|p| {
            matches!(
                p.pattern_type,
                PatternType::Visual | PatternType::Auditory | PatternType::Structural
            )
        }) {
            insights.push(format!(
                "You're particularly attuned to {} elements in films.",
                technical.pattern_type
            ));
        }
    }

    if !elements.is_empty() {
        let names: Vec<&str> = elements
            .iter()
            .take(3)
            .map(|e| e.element_name.as_str())
            .collect();
        insights.push(format!(
            "Elements you frequently notice: {}",
            names.join(", ")
        ));
    }

    if movie_count >= PROFILE_SIZE_NOTE_MOVIES {
        insights.push(format!(
            "Based on {} films analyzed, your taste profile is taking shape.",
            movie_count
        ));
    }

    Ok(insights)
}

/// Insight lines about one session's responses
pub async fn session_insights<R>(repo: &R, session_id: SessionId) -> Result<Vec<String>>
where
    R: TasteRepository + ?Sized,
{
    repo.get_session(session_id).await?;
    let responses = repo.list_responses_for_session(session_id).await?;

    if responses.is_empty() {
        return Ok(vec!["No responses recorded in this session.".to_string()]);
    }

    let total = responses.len() as f32;
    let high_confidence = responses
        .iter()
        .filter(|r| r.confidence.is_some_and(|c| c.value() >= 4))
        .count() as f32;
    let new_insights = responses.iter().filter(|r| r.is_new_insight).count();
    let avg_specificity = responses.iter().map(|r| r.specificity_score).sum::<f32>() / total;

    let mut insights = Vec::new();

    let confident_share = high_confidence / total;
    if confident_share > 0.5 {
        insights.push(
            "You expressed high confidence in most of your responses, so you know your taste well."
                .to_string(),
        );
    } else if confident_share < 0.2 {
        insights.push(
            "Many responses had lower confidence; you may be discovering new aspects of your taste."
                .to_string(),
        );
    }

    if new_insights > 0 {
        insights.push(format!(
            "You identified {} new insight{} about yourself.",
            new_insights,
            if new_insights > 1 { "s" } else { "" }
        ));
    }

    if avg_specificity > 0.6 {
        insights.push(
            "Your responses were notably specific, which is great for understanding your taste."
                .to_string(),
        );
    } else if avg_specificity < 0.4 {
        insights.push(
            "Consider being more specific in future sessions for richer insights.".to_string(),
        );
    }

    Ok(insights)
}

/// Compare what the user noticed across several of their movies.
///
/// Returns `None` when fewer than two of the given movies belong to the user.
pub async fn compare_movies<R>(
    repo: &R,
    cipher: &dyn ResponseCipher,
    user_id: UserId,
    movie_ids: &[MovieId],
) -> Result<Option<String>>
where
    R: TasteRepository + ?Sized,
{
    let wanted: BTreeSet<MovieId> = movie_ids.iter().copied().collect();
    let movies: Vec<_> = repo
        .list_movies(user_id)
        .await?
        .into_iter()
        .filter(|m| wanted.contains(&m.id))
        .collect();
    if movies.len() < 2 {
        return Ok(None);
    }

    let mut per_movie: Vec<(String, BTreeSet<ElementTag>)> = Vec::with_capacity(movies.len());
    for movie in &movies {
        let records = repo.list_responses_for_movie(movie.id).await?;
        let (revealed, _) = PatternDetector::reveal_all(cipher, &records);
        let tags = revealed
            .iter()
            .flat_map(|r| ElementExtractor::extract(&r.text))
            .collect();
        per_movie.push((movie.title.clone(), tags));
    }

    let common: BTreeSet<ElementTag> = per_movie
        .iter()
        .map(|(_, tags)| tags.clone())
        .reduce(|acc, tags| acc.intersection(&tags).copied().collect())
        .unwrap_or_default();

    if !common.is_empty() {
        let shared: Vec<String> = common.iter().take(3).map(|t| t.to_string()).collect();
        return Ok(Some(format!(
            "These films share your attention to: {}",
            shared.join(", ")
        )));
    }

    for (i, (title, tags)) in per_movie.iter().enumerate() {
        let others: BTreeSet<ElementTag> = per_movie
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .flat_map(|(_, (_, t))| t.iter().copied())
            .collect();
        if let Some(unique) = tags.difference(&others).next() {
            return Ok(Some(format!(
                "{} uniquely engaged your {} sensibilities.",
                title, unique
            )));
        }
    }

    Ok(Some(
        "These films appealed to different aspects of your taste.".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::AgeCipher;
    use crate::consent::ConsentFlags;
    use crate::storage::memory::InMemoryRepository;
    use crate::types::{
        ConfidenceRating, Movie, PatternCandidate, ResponseId, ResponseRecord, Session,
        SessionType, User,
    };
    use chrono::Utc;

    fn record(session: &Session, movie: MovieId, ciphertext: Vec<u8>) -> ResponseRecord {
        ResponseRecord {
            id: ResponseId::new(),
            session_id: session.id,
            movie_id: movie,
            question_key: "emotional_peak".to_string(),
            question_text: "When did you feel the most?".to_string(),
            ciphertext,
            confidence: ConfidenceRating::new(5),
            is_new_insight: true,
            specificity_score: 0.8,
            follow_up_count: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_summary_groups_by_type() {
        let repo = InMemoryRepository::new();
        let user = UserId::new();
        let movies: BTreeSet<MovieId> = [MovieId::new(), MovieId::new()].into_iter().collect();

        for (ty, description, confidence) in [
            (PatternType::Thematic, "You consistently respond to themes of loss", 0.8),
            (PatternType::Thematic, "You consistently respond to themes of hope", 0.5),
            (PatternType::Visual, "You pay close attention to visual elements", 0.6),
        ] {
            repo.upsert_pattern(
                user,
                &PatternCandidate {
                    pattern_type: ty,
                    description: description.to_string(),
                    confidence,
                    movie_ids: movies.clone(),
                },
            )
            .await
            .unwrap();
        }
        let patterns = repo.list_patterns(user).await.unwrap();
        repo.set_pattern_validation(patterns[0].id, Some(true))
            .await
            .unwrap();

        let summary = summarize(&repo, user, 10).await.unwrap();
        assert_eq!(summary.pattern_count, 3);
        assert_eq!(summary.validated_count, 1);
        assert_eq!(summary.patterns_by_type[&PatternType::Thematic].len(), 2);
        assert_eq!(summary.patterns_by_type[&PatternType::Visual].len(), 1);
    }

    #[tokio::test]
    async fn test_empty_profile_prompts_for_sessions() {
        let repo = InMemoryRepository::new();
        let insights = profile_insights(&repo, UserId::new()).await.unwrap();
        assert_eq!(
            insights,
            vec!["Complete more sessions to discover patterns in your taste."]
        );
    }

    #[tokio::test]
    async fn test_session_insights() {
        let repo = InMemoryRepository::new();
        let user = User::new(ConsentFlags::default());
        repo.create_user(&user).await.unwrap();
        let movie = MovieId::new();
        let session = Session::new(user.id, SessionType::DeepDive, vec![movie]);
        repo.create_session(&session).await.unwrap();
        repo.insert_response(&record(&session, movie, vec![0]))
            .await
            .unwrap();

        let insights = session_insights(&repo, session.id).await.unwrap();
        assert_eq!(insights.len(), 3);
        assert!(insights[1].contains("1 new insight about yourself"));
    }

    #[tokio::test]
    async fn test_compare_movies_common_elements() {
        let repo = InMemoryRepository::new();
        let cipher = AgeCipher::generate();
        let user = User::new(ConsentFlags::default());
        repo.create_user(&user).await.unwrap();

        let first = Movie::new(user.id, "Three Colours: Blue", Some(1993));
        let second = Movie::new(user.id, "Manchester by the Sea", Some(2016));
        repo.add_movie(&first).await.unwrap();
        repo.add_movie(&second).await.unwrap();
        let session = Session::new(user.id, SessionType::PatternHunt, vec![first.id, second.id]);
        repo.create_session(&session).await.unwrap();

        for (movie, text) in [
            (first.id, "The score carries her grief"),
            (second.id, "Grief everywhere, and the music knows it"),
        ] {
            let sealed = cipher.seal(text).unwrap();
            repo.insert_response(&record(&session, movie, sealed))
                .await
                .unwrap();
        }

        let line = compare_movies(&repo, &cipher, user.id, &[first.id, second.id])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line, "These films share your attention to: audio, theme:loss");

        let single = compare_movies(&repo, &cipher, user.id, &[first.id])
            .await
            .unwrap();
        assert!(single.is_none());
    }
}
