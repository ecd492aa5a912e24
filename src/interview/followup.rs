//! Follow-up loop for a single question
//!
//! ```text
//! Awaiting(0) --vague--> Awaiting(1) --vague--> ... --> Awaiting(max)
//!      |                     |                              |
//!      +---- accepted -------+------------------------------+--> Accepted
//!      +---- cancel / skip token -----------------------------> Cancelled
//! ```
//!
//! Each attempt replaces the previous one; only the accepted text is kept.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::vagueness::{VagueAnalysis, VaguenessDetector};
use crate::config::FollowUpConfig;
use crate::error::{KttError, Result};

/// Inputs that skip the current question
pub const SKIP_TOKENS: [&str; 3] = ["skip", "pass", "s"];

/// Accepted responses scoring at least this get an encouragement line
const ENCOURAGEMENT_THRESHOLD: f32 = 0.6;

const ENCOURAGEMENTS: [&str; 4] = [
    "That's exactly the kind of detail that helps.",
    "Good, I can see that scene now.",
    "That specificity is valuable.",
    "This is helpful for understanding your taste.",
];

const ACKNOWLEDGEMENTS: [&str; 3] = [
    "I'll note that as you've described it.",
    "Sometimes that's as specific as a feeling gets. Noted.",
    "Let's move on. We can always come back to this.",
];

/// One user input to the loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Text(String),
    /// The prompt was dismissed (e.g. Ctrl-C / Esc)
    Cancel,
}

impl Attempt {
    pub fn text(text: impl Into<String>) -> Self {
        Attempt::Text(text.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum FollowUpState {
    Awaiting { attempt: u32 },
    Accepted,
    Cancelled,
}

/// Line shown when a response is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptanceNote {
    Encouragement(&'static str),
    Acknowledgement(&'static str),
}

impl AcceptanceNote {
    pub fn message(&self) -> &'static str {
        match self {
            AcceptanceNote::Encouragement(m) | AcceptanceNote::Acknowledgement(m) => m,
        }
    }
}

/// The response that ended the loop
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedResponse {
    pub text: String,
    pub analysis: VagueAnalysis,
    /// Follow-ups asked before acceptance
    pub follow_up_count: u32,
    pub note: Option<AcceptanceNote>,
}

/// What the caller should do next
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUpStep {
    /// Show `prompt` and submit another attempt
    FollowUp { prompt: String, attempt: u32 },
    Accepted(AcceptedResponse),
    /// No response should be saved
    Cancelled,
}

/// Accept if specific, if attempts are used up, or if a borderline
/// response already got one follow-up.
pub fn should_accept(analysis: &VagueAnalysis, attempt: u32, config: &FollowUpConfig) -> bool {
    !analysis.is_vague
        || attempt >= config.max_attempts
        || (analysis.specificity_score >= config.accept_threshold && attempt >= 1)
}

/// Follow-up to show after `attempt`, getting more direct as attempts grow
pub fn follow_up_for_attempt(analysis: &VagueAnalysis, attempt: u32) -> Option<&str> {
    let last = analysis.suggested_follow_ups.len().checked_sub(1)?;
    let idx = (attempt as usize).min(last);
    analysis.suggested_follow_ups.get(idx).map(String::as_str)
}

fn is_skip(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    SKIP_TOKENS.contains(&normalized.as_str())
}

/// Per-question state machine
#[derive(Debug, Clone)]
pub struct FollowUpController {
    config: FollowUpConfig,
    detector: VaguenessDetector,
    validate: bool,
    state: FollowUpState,
}

impl FollowUpController {
    /// `validate` is the scaffold capability; without it the first non-skip
    /// answer is accepted as given, blank text included
    pub fn new(config: &FollowUpConfig, validate: bool) -> Self {
        Self {
            config: config.clone(),
            detector: VaguenessDetector::new(config),
            validate,
            state: FollowUpState::Awaiting { attempt: 0 },
        }
    }

    pub fn state(&self) -> FollowUpState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.state, FollowUpState::Awaiting { .. })
    }

    /// Feed one attempt. Submitting after the loop finished is an error.
    pub fn submit(&mut self, attempt: Attempt) -> Result<FollowUpStep> {
        let FollowUpState::Awaiting { attempt: n } = self.state else {
            return Err(KttError::InvalidOperation(
                "Follow-up loop already finished".to_string(),
            ));
        };

        let text = match attempt {
            Attempt::Cancel => return Ok(self.cancel()),
            Attempt::Text(text) if is_skip(&text) => return Ok(self.cancel()),
            Attempt::Text(text) => text.trim().to_string(),
        };

        let analysis = self.detector.analyze(&text);

        if !self.validate {
            self.state = FollowUpState::Accepted;
            return Ok(FollowUpStep::Accepted(AcceptedResponse {
                text,
                analysis,
                follow_up_count: 0,
                note: None,
            }));
        }

        if should_accept(&analysis, n, &self.config) {
            return Ok(self.accept(text, analysis, n));
        }

        let Some(prompt) = follow_up_for_attempt(&analysis, n).map(str::to_string) else {
            return Ok(self.accept(text, analysis, n));
        };

        debug!(
            "Vague response ({}), follow-up {}",
            analysis
                .vagueness_type
                .map(|t| t.as_str())
                .unwrap_or("unknown"),
            n + 1
        );
        self.state = FollowUpState::Awaiting { attempt: n + 1 };
        Ok(FollowUpStep::FollowUp {
            prompt,
            attempt: n + 1,
        })
    }

    fn cancel(&mut self) -> FollowUpStep {
        self.state = FollowUpState::Cancelled;
        FollowUpStep::Cancelled
    }

    fn accept(&mut self, text: String, analysis: VagueAnalysis, attempts: u32) -> FollowUpStep {
        let mut rng = rand::thread_rng();
        let note = if analysis.specificity_score >= ENCOURAGEMENT_THRESHOLD {
            ENCOURAGEMENTS.choose(&mut rng).copied().map(AcceptanceNote::Encouragement)
        } else if attempts > 0 {
            ACKNOWLEDGEMENTS.choose(&mut rng).copied().map(AcceptanceNote::Acknowledgement)
        } else {
            None
        };

        self.state = FollowUpState::Accepted;
        FollowUpStep::Accepted(AcceptedResponse {
            text,
            analysis,
            follow_up_count: attempts,
            note,
        })
    }
}
