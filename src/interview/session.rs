//! Interview driver
//!
//! Runs a session end to end against a repository, a cipher and an
//! [`InterviewPrompter`] that owns all user interaction. The driver decides
//! what to ask and what to store; the prompter decides how it looks.
//!
//! Progress is persisted after every handled question as the number of
//! questions handled so far in the session (across movies) plus the phase of
//! the last one, so a paused session resumes at the next unanswered question.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use super::bank::{format_question, Question};
use super::followup::{AcceptanceNote, Attempt, FollowUpController, FollowUpStep};
use super::metacognitive::{
    pattern_reflection, random_prompt, transition_prompt, MetacognitivePrompt, PromptTiming,
    ReflectionSubject, NEW_INSIGHT_KEY,
};
use super::scaffold::{
    phase_description, priming_question, sentence_starters, PhaseDescription, PrimingQuestion,
    ScaffoldLevel, ScaffoldPolicy,
};
use super::sequencer::{NextQuestion, QuestionSequencer};
use crate::analysis::patterns::{DetectionReport, PatternDetector};
use crate::cipher::ResponseCipher;
use crate::config::KttConfig;
use crate::consent::{has_consent, ConsentKind};
use crate::error::{KttError, Result};
use crate::storage::TasteRepository;
use crate::types::{
    ConfidenceRating, Movie, MovieId, Phase, ResponseId, ResponseRecord, Session, SessionId,
    SessionStatus, SessionType, UserId,
};

/// Before-question prompts shown per session at most
const MAX_BEFORE_PROMPTS: usize = 3;

/// What the user did with a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptReply {
    Text(String),
    /// Dismissed; the question is skipped
    Cancel,
    /// Stop here and keep the session for later
    Pause,
}

impl PromptReply {
    pub fn text(text: impl Into<String>) -> Self {
        PromptReply::Text(text.into())
    }
}

/// Everything needed to present one question
#[derive(Debug, Clone)]
pub struct QuestionPrompt {
    pub question: &'static Question,
    /// Question text with the movie title filled in
    pub text: String,
    pub movie_title: String,
    pub hint: Option<&'static str>,
    pub example_good: Option<&'static str>,
    pub example_vague: Option<&'static str>,
    pub starters: &'static [&'static str],
    pub priming: Option<&'static PrimingQuestion>,
    /// Metacognitive nudge to show before the question
    pub reflection: Option<&'static MetacognitivePrompt>,
}

/// Progress notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum InterviewEvent {
    SessionStarted {
        session_id: SessionId,
        session_type: SessionType,
        scaffold_level: ScaffoldLevel,
    },
    SessionResumed {
        session_id: SessionId,
        questions_handled: usize,
    },
    MovieStarted {
        movie_id: MovieId,
        title: String,
        index: usize,
        total: usize,
    },
    PhaseStarted {
        phase: Phase,
        description: PhaseDescription,
        transition: Option<&'static MetacognitivePrompt>,
    },
    ResponseSaved {
        question_key: &'static str,
        specificity: f32,
        follow_up_count: u32,
        note: Option<AcceptanceNote>,
    },
    QuestionSkipped {
        question_key: &'static str,
    },
    Paused {
        session_id: SessionId,
    },
    SessionCompleted {
        summary: SessionSummary,
        closing_prompt: Option<&'static MetacognitivePrompt>,
    },
    PatternsDetected {
        count: usize,
        reflection: String,
    },
}

/// The presentation collaborator: renders prompts and collects answers
#[async_trait]
pub trait InterviewPrompter: Send {
    /// Present a question and return the first attempt
    async fn ask(&mut self, prompt: &QuestionPrompt) -> PromptReply;

    /// Present a follow-up and return the next attempt
    async fn follow_up(&mut self, follow_up: &str) -> PromptReply;

    /// Self-rated confidence 1-5, `None` to skip rating
    async fn rate_confidence(&mut self) -> Option<u8>;

    /// Whether the response was a new realization
    async fn confirm_new_insight(&mut self, prompt: &MetacognitivePrompt) -> bool;

    fn on_event(&mut self, _event: &InterviewEvent) {}
}

/// End-of-session statistics
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub responses: usize,
    pub average_specificity: f32,
    pub duration: chrono::Duration,
}

#[derive(Debug, Clone)]
pub enum InterviewOutcome {
    Completed {
        summary: SessionSummary,
        /// `None` when pattern analysis is not consented
        detection: Option<DetectionReport>,
    },
    Paused {
        session_id: SessionId,
        questions_handled: usize,
    },
}

enum Answer {
    Saved,
    Skipped,
    Paused,
}

/// Drives interview sessions
pub struct Interview<'a, R: ?Sized> {
    repo: &'a R,
    cipher: &'a dyn ResponseCipher,
    config: &'a KttConfig,
}

impl<'a, R> Interview<'a, R>
where
    R: TasteRepository + ?Sized,
{
    pub fn new(repo: &'a R, cipher: &'a dyn ResponseCipher, config: &'a KttConfig) -> Self {
        Self {
            repo,
            cipher,
            config,
        }
    }

    /// Start a new session over `movie_ids` and run it until it completes
    /// or the prompter pauses it
    pub async fn start<P>(
        &self,
        user_id: UserId,
        session_type: SessionType,
        movie_ids: &[MovieId],
        prompter: &mut P,
    ) -> Result<InterviewOutcome>
    where
        P: InterviewPrompter + ?Sized,
    {
        if movie_ids.is_empty() {
            return Err(KttError::InvalidOperation(
                "A session needs at least one movie".to_string(),
            ));
        }
        if movie_ids.len() > session_type.max_movies() {
            return Err(KttError::InvalidOperation(format!(
                "A {} session covers at most {} movies, got {}",
                session_type,
                session_type.max_movies(),
                movie_ids.len()
            )));
        }

        let movies = self.load_movies(user_id, movie_ids).await?;
        let level = self.scaffold_level(user_id).await?;

        let session = Session::new(user_id, session_type, movie_ids.to_vec());
        self.repo.create_session(&session).await?;
        info!(
            "Started {} session {} ({} movies, scaffold level {})",
            session_type,
            session.id,
            movies.len(),
            level.number()
        );

        prompter.on_event(&InterviewEvent::SessionStarted {
            session_id: session.id,
            session_type,
            scaffold_level: level,
        });

        self.drive(session, movies, level, 0, prompter).await
    }

    /// Continue a paused session from the first unhandled question
    pub async fn resume<P>(
        &self,
        session_id: SessionId,
        prompter: &mut P,
    ) -> Result<InterviewOutcome>
    where
        P: InterviewPrompter + ?Sized,
    {
        let session = self.repo.get_session(session_id).await?;
        if session.status != SessionStatus::Paused {
            return Err(KttError::InvalidOperation(format!(
                "Session {} is {}, only paused sessions can be resumed",
                session.id, session.status
            )));
        }

        let movies = self.load_movies(session.user_id, &session.movie_ids).await?;
        let level = self.scaffold_level(session.user_id).await?;
        self.repo
            .update_session_status(session.id, SessionStatus::Active, None)
            .await?;

        let handled = session.current_question_index;
        info!("Resuming session {} after {} questions", session.id, handled);
        prompter.on_event(&InterviewEvent::SessionResumed {
            session_id: session.id,
            questions_handled: handled,
        });

        self.drive(session, movies, level, handled, prompter).await
    }

    async fn load_movies(&self, user_id: UserId, movie_ids: &[MovieId]) -> Result<Vec<Movie>> {
        let mut movies = Vec::with_capacity(movie_ids.len());
        for id in movie_ids {
            let movie = self.repo.get_movie(*id).await?;
            if movie.user_id != user_id {
                return Err(KttError::InvalidOperation(format!(
                    "Movie {} does not belong to user {}",
                    movie.id, user_id
                )));
            }
            movies.push(movie);
        }
        Ok(movies)
    }

    async fn scaffold_level(&self, user_id: UserId) -> Result<ScaffoldLevel> {
        let completed = self.repo.count_completed_sessions(user_id).await?;
        Ok(ScaffoldPolicy::new(&self.config.scaffold).level_for(completed))
    }

    async fn drive<P>(
        &self,
        session: Session,
        movies: Vec<Movie>,
        level: ScaffoldLevel,
        mut handled: usize,
        prompter: &mut P,
    ) -> Result<InterviewOutcome>
    where
        P: InterviewPrompter + ?Sized,
    {
        let mut sequencer = QuestionSequencer::new(session.session_type, level);
        let per_movie = sequencer.questions().len().max(1);
        let first_movie = handled / per_movie;
        let mut used_prompts: Vec<&'static str> = Vec::new();
        let mut rng = StdRng::from_entropy();

        for (index, movie) in movies.iter().enumerate().skip(first_movie) {
            sequencer.restart();
            if index == first_movie {
                for _ in 0..handled % per_movie {
                    sequencer.next_question();
                }
            }

            prompter.on_event(&InterviewEvent::MovieStarted {
                movie_id: movie.id,
                title: movie.to_string(),
                index,
                total: movies.len(),
            });

            let mut shown_phase: Option<Phase> = None;
            while let NextQuestion::Ask(question) = sequencer.next_question() {
                if shown_phase != Some(question.phase) {
                    prompter.on_event(&InterviewEvent::PhaseStarted {
                        phase: question.phase,
                        description: phase_description(question.phase),
                        transition: shown_phase
                            .and_then(|from| transition_prompt(from, question.phase)),
                    });
                    shown_phase = Some(question.phase);
                }

                let reflection = if sequencer.show_hints()
                    && question.phase == Phase::Monitoring
                    && used_prompts.len() < MAX_BEFORE_PROMPTS
                {
                    let picked =
                        random_prompt(PromptTiming::BeforeQuestion, &used_prompts, &mut rng);
                    if let Some(p) = picked {
                        used_prompts.push(p.key);
                    }
                    picked
                } else {
                    None
                };

                let prompt = build_prompt(question, movie, &sequencer, reflection);
                let answer = self
                    .answer(
                        &session,
                        movie,
                        &prompt,
                        sequencer.validate_responses(),
                        prompter,
                        &mut rng,
                    )
                    .await?;

                if let Answer::Paused = answer {
                    self.repo
                        .update_session_status(session.id, SessionStatus::Paused, None)
                        .await?;
                    info!("Session {} paused after {} questions", session.id, handled);
                    prompter.on_event(&InterviewEvent::Paused {
                        session_id: session.id,
                    });
                    return Ok(InterviewOutcome::Paused {
                        session_id: session.id,
                        questions_handled: handled,
                    });
                }

                handled += 1;
                self.repo
                    .update_session_progress(session.id, question.phase, handled)
                    .await?;
            }

            self.repo.touch_movie_analyzed(movie.id, Utc::now()).await?;
        }

        self.complete(&session, prompter, &mut rng).await
    }

    /// Run the follow-up loop for one question and store the accepted response
    async fn answer<P>(
        &self,
        session: &Session,
        movie: &Movie,
        prompt: &QuestionPrompt,
        validate: bool,
        prompter: &mut P,
        rng: &mut StdRng,
    ) -> Result<Answer>
    where
        P: InterviewPrompter + ?Sized,
    {
        let question = prompt.question;
        let mut controller = FollowUpController::new(&self.config.followup, validate);
        let mut reply = prompter.ask(prompt).await;

        let accepted = loop {
            let attempt = match reply {
                PromptReply::Pause => return Ok(Answer::Paused),
                PromptReply::Cancel => Attempt::Cancel,
                PromptReply::Text(text) => Attempt::Text(text),
            };

            match controller.submit(attempt)? {
                FollowUpStep::FollowUp { prompt: follow_up, .. } => {
                    reply = prompter.follow_up(&follow_up).await
                }
                FollowUpStep::Accepted(accepted) => break accepted,
                FollowUpStep::Cancelled => {
                    debug!("Question '{}' skipped", question.key);
                    prompter.on_event(&InterviewEvent::QuestionSkipped {
                        question_key: question.key,
                    });
                    return Ok(Answer::Skipped);
                }
            }
        };

        let confidence = match prompter.rate_confidence().await {
            Some(value) => {
                let rating = ConfidenceRating::new(value);
                if rating.is_none() {
                    warn!("Ignoring out-of-range confidence rating {}", value);
                }
                rating
            }
            None => None,
        };

        let is_new_insight = match random_prompt(PromptTiming::AfterResponse, &[], rng) {
            Some(p) if p.key == NEW_INSIGHT_KEY => prompter.confirm_new_insight(p).await,
            _ => false,
        };

        let record = ResponseRecord {
            id: ResponseId::new(),
            session_id: session.id,
            movie_id: movie.id,
            question_key: question.key.to_string(),
            question_text: prompt.text.clone(),
            ciphertext: self.cipher.seal(&accepted.text)?,
            confidence,
            is_new_insight,
            specificity_score: accepted.analysis.specificity_score,
            follow_up_count: accepted.follow_up_count,
            created_at: Utc::now(),
        };
        self.repo.insert_response(&record).await?;
        debug!(
            "Saved response to '{}' (specificity {:.2}, {} follow-ups)",
            question.key, record.specificity_score, record.follow_up_count
        );

        prompter.on_event(&InterviewEvent::ResponseSaved {
            question_key: question.key,
            specificity: record.specificity_score,
            follow_up_count: record.follow_up_count,
            note: accepted.note,
        });
        Ok(Answer::Saved)
    }

    async fn complete<P>(
        &self,
        session: &Session,
        prompter: &mut P,
        rng: &mut StdRng,
    ) -> Result<InterviewOutcome>
    where
        P: InterviewPrompter + ?Sized,
    {
        let ended_at = Utc::now();
        self.repo
            .update_session_status(session.id, SessionStatus::Completed, Some(ended_at))
            .await?;

        let responses = self.repo.list_responses_for_session(session.id).await?;
        let summary = summarize_session(session.id, &responses, session.started_at, ended_at);
        info!(
            "Session {} completed: {} responses, average specificity {:.2}",
            session.id, summary.responses, summary.average_specificity
        );

        prompter.on_event(&InterviewEvent::SessionCompleted {
            summary: summary.clone(),
            closing_prompt: random_prompt(PromptTiming::SessionEnd, &[], rng),
        });

        let detection =
            if has_consent(self.repo, session.user_id, ConsentKind::EnablePatternAnalysis).await? {
                let report = PatternDetector::new(self.config)
                    .run(self.repo, self.cipher, session.user_id)
                    .await?;
                if !report.patterns.is_empty() {
                    prompter.on_event(&InterviewEvent::PatternsDetected {
                        count: report.patterns.len(),
                        reflection: pattern_reflection(
                            Some(ReflectionSubject::MovieCount(report.movies_considered)),
                            rng,
                        ),
                    });
                }
                Some(report)
            } else {
                debug!("Pattern analysis not consented, skipping detection");
                None
            };

        Ok(InterviewOutcome::Completed { summary, detection })
    }
}

fn build_prompt(
    question: &'static Question,
    movie: &Movie,
    sequencer: &QuestionSequencer,
    reflection: Option<&'static MetacognitivePrompt>,
) -> QuestionPrompt {
    let caps = sequencer.capabilities();
    QuestionPrompt {
        question,
        text: format_question(question, &movie.title),
        movie_title: movie.title.clone(),
        hint: question.hint.filter(|_| caps.show_hints),
        example_good: question.example_good.filter(|_| caps.show_examples),
        example_vague: question.example_vague.filter(|_| caps.show_examples),
        starters: if caps.provide_starters {
            sentence_starters(question.category)
        } else {
            &[]
        },
        priming: priming_question(question.category).filter(|_| caps.provide_starters),
        reflection,
    }
}

fn summarize_session(
    session_id: SessionId,
    responses: &[ResponseRecord],
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
) -> SessionSummary {
    let average_specificity = if responses.is_empty() {
        0.0
    } else {
        responses.iter().map(|r| r.specificity_score).sum::<f32>() / responses.len() as f32
    };

    SessionSummary {
        session_id,
        responses: responses.len(),
        average_specificity,
        duration: ended_at - started_at,
    }
}
