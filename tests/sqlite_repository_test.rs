//! SQLite repository behavior on a real database file

use chrono::Utc;
use ktt_core::config::StorageConfig;
use ktt_core::types::{PatternCandidate, TasteElementCandidate};
use ktt_core::{
    run_pattern_detection, AgeCipher, ConsentFlags, KttConfig, KttError, MovieId, PatternType,
    Phase, SessionStatus, SqliteRepository, TasteRepository,
};
use std::collections::BTreeSet;
use tempfile::TempDir;

mod common;

use common::{add_movies, create_session, create_user, record_response};

async fn open_repo(dir: &TempDir) -> SqliteRepository {
    SqliteRepository::with_pool_size(dir.path().join("ktt.db"), 2)
        .await
        .expect("Failed to open repository")
}

fn candidate(description: &str, confidence: f32, movies: &[MovieId]) -> PatternCandidate {
    PatternCandidate {
        pattern_type: PatternType::Visual,
        description: description.to_string(),
        confidence,
        movie_ids: movies.iter().copied().collect::<BTreeSet<_>>(),
    }
}

#[tokio::test]
async fn test_data_survives_reopen() {
    common::init_tracing();
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    let user = create_user(&repo, ConsentFlags::all_granted()).await;
    let movies = add_movies(&repo, &user, &["Cleo from 5 to 7"]).await;
    drop(repo);

    let config = StorageConfig {
        database_path: dir.path().join("ktt.db"),
        pool_size: 1,
    };
    let repo = SqliteRepository::open(&config).await.unwrap();
    let loaded = repo.get_user(user.id).await.unwrap();
    assert_eq!(loaded.consent, ConsentFlags::all_granted());

    let listed = repo.list_movies(user.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, movies[0].id);
    assert_eq!(listed[0].title, "Cleo from 5 to 7");
}

#[tokio::test]
async fn test_session_lifecycle() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    let user = create_user(&repo, ConsentFlags::required_only()).await;
    let movies = add_movies(&repo, &user, &["Beau Travail", "Chungking Express"]).await;
    let session = create_session(&repo, &user, &movies).await;

    repo.update_session_progress(session.id, Phase::Monitoring, 4)
        .await
        .unwrap();
    repo.update_session_status(session.id, SessionStatus::Paused, None)
        .await
        .unwrap();

    let loaded = repo.get_session(session.id).await.unwrap();
    assert_eq!(loaded.current_phase, Phase::Monitoring);
    assert_eq!(loaded.current_question_index, 4);
    assert_eq!(loaded.status, SessionStatus::Paused);
    assert_eq!(loaded.movie_ids, session.movie_ids);

    let paused = repo
        .list_sessions(user.id, Some(SessionStatus::Paused))
        .await
        .unwrap();
    assert_eq!(paused.len(), 1);
    assert_eq!(repo.count_completed_sessions(user.id).await.unwrap(), 0);

    repo.update_session_status(session.id, SessionStatus::Completed, Some(Utc::now()))
        .await
        .unwrap();
    assert_eq!(repo.count_completed_sessions(user.id).await.unwrap(), 1);
    assert!(repo.get_session(session.id).await.unwrap().ended_at.is_some());
}

#[tokio::test]
async fn test_pattern_upsert_merges_by_identity() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    let user = create_user(&repo, ConsentFlags::all_granted()).await;
    let (a, b, c) = (MovieId::new(), MovieId::new(), MovieId::new());

    let visual = "You pay close attention to visual elements";
    let first = repo
        .upsert_pattern(user.id, &candidate(visual, 0.7, &[a, b]))
        .await
        .unwrap();
    assert!(first.last_confirmed.is_none());

    let merged = repo
        .upsert_pattern(user.id, &candidate(visual, 0.5, &[b, c]))
        .await
        .unwrap();

    assert_eq!(merged.id, first.id);
    assert!((merged.confidence - 0.7).abs() < 1e-6);
    assert_eq!(merged.supporting_movie_ids.len(), 3);
    assert!(merged.last_confirmed.is_some());

    let color = candidate("You pay close attention to color elements", 0.9, &[a, c]);
    repo.upsert_pattern(user.id, &color).await.unwrap();
    let listed = repo.list_patterns(user.id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[0].confidence >= listed[1].confidence);

    repo.set_pattern_validation(first.id, Some(true)).await.unwrap();
    let listed = repo.list_patterns(user.id).await.unwrap();
    assert_eq!(listed.iter().filter(|p| p.validated == Some(true)).count(), 1);

    assert_eq!(repo.delete_patterns(user.id).await.unwrap(), 2);
    assert!(repo.list_patterns(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_taste_element_count_overwrites() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    let user = create_user(&repo, ConsentFlags::all_granted()).await;

    let element = |importance: f32, mentions: u32| TasteElementCandidate {
        element_type: PatternType::Thematic,
        element_name: "isolation".to_string(),
        importance_score: importance,
        mention_count: mentions,
    };

    repo.upsert_taste_element(user.id, &element(0.8, 6)).await.unwrap();
    let stored = repo.upsert_taste_element(user.id, &element(0.3, 2)).await.unwrap();

    assert_eq!(stored.mention_count, 2);
    assert!((stored.importance_score - 0.8).abs() < 1e-6);
    assert_eq!(repo.list_taste_elements(user.id, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_records_are_not_found() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;

    let err = repo.get_movie(MovieId::new()).await.unwrap_err();
    assert!(matches!(err, KttError::NotFound(_)));
}

#[tokio::test]
async fn test_detection_against_sqlite_with_age() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir).await;
    let cipher = AgeCipher::generate();
    let user = create_user(&repo, ConsentFlags::all_granted()).await;
    let movies = add_movies(&repo, &user, &["Solaris", "Mirror", "Nostalghia"]).await;
    let session = create_session(&repo, &user, &movies).await;

    for movie in &movies {
        record_response(
            &repo,
            &cipher,
            session.id,
            movie.id,
            "The sound design and the score carried the loneliness of that house.",
            Some(4),
        )
        .await;
    }

    let patterns = run_pattern_detection(&repo, &cipher, &KttConfig::default(), user.id)
        .await
        .unwrap();
    assert!(patterns.iter().any(|p| p.pattern_type == PatternType::Auditory));
    assert!(patterns.iter().any(|p| p.pattern_type == PatternType::Thematic));
    assert_eq!(repo.list_patterns(user.id).await.unwrap().len(), patterns.len());
}
