//! Adaptive interview
//!
//! - [`bank`]: the static question catalog
//! - [`scaffold`]: guidance that fades with experience
//! - [`sequencer`]: which question comes next
//! - [`vagueness`] and [`followup`]: pressing for specifics
//! - [`metacognitive`]: reflection prompts
//! - [`session`]: the driver tying it together

pub mod bank;
pub mod followup;
pub mod metacognitive;
pub mod scaffold;
pub mod sequencer;
pub mod session;
pub mod vagueness;

pub use bank::{format_question, Question};
pub use followup::{should_accept, Attempt, FollowUpController, FollowUpState, FollowUpStep};
pub use scaffold::{ScaffoldCapabilities, ScaffoldLevel, ScaffoldPolicy};
pub use sequencer::{NextQuestion, QuestionSequencer};
pub use session::{
    Interview, InterviewEvent, InterviewOutcome, InterviewPrompter, PromptReply, QuestionPrompt,
    SessionSummary,
};
pub use vagueness::{VagueAnalysis, VaguenessDetector, VaguenessType};

use serde::Serialize;

use crate::analysis::SpecificityScorer;

/// Everything the interactive loop needs to know about one response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseScore {
    /// Full-table specificity, used for feedback
    pub specificity: f32,
    pub is_vague: bool,
    pub vagueness_type: Option<VaguenessType>,
    pub follow_ups: Vec<String>,
    pub feedback: Option<&'static str>,
}

/// Score a response with default thresholds
pub fn score_response(text: &str) -> ResponseScore {
    let analysis = VaguenessDetector::default().analyze(text);
    let specificity = SpecificityScorer::score(text);
    ResponseScore {
        specificity,
        is_vague: analysis.is_vague,
        vagueness_type: analysis.vagueness_type,
        follow_ups: analysis.suggested_follow_ups,
        feedback: SpecificityScorer::feedback_for(specificity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_response_vague() {
        let score = score_response("I liked it.");
        assert!(score.is_vague);
        assert_eq!(score.vagueness_type, Some(VaguenessType::TooShort));
        assert!(!score.follow_ups.is_empty());
        assert!(score.feedback.is_some());
    }

    #[test]
    fn test_score_response_empty() {
        let score = score_response("");
        assert_eq!(score.specificity, 0.0);
        assert!(score.is_vague);
    }
}
