//! Scaffolding that fades with experience
//!
//! First sessions get hints, examples, sentence starters and response
//! validation; later sessions get progressively less guidance.

use serde::{Deserialize, Serialize};

use crate::config::ScaffoldConfig;
use crate::types::{Phase, QuestionCategory};

/// What guidance the interview shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaffoldCapabilities {
    pub show_hints: bool,
    pub show_examples: bool,
    pub provide_starters: bool,
    pub validate_responses: bool,
}

/// Degree of guidance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaffoldLevel {
    Heavy,
    Medium,
    Light,
}

impl ScaffoldLevel {
    /// Numeric level: 1 is heavy, 3 is light
    pub fn number(&self) -> u8 {
        match self {
            ScaffoldLevel::Heavy => 1,
            ScaffoldLevel::Medium => 2,
            ScaffoldLevel::Light => 3,
        }
    }

    pub fn capabilities(&self) -> ScaffoldCapabilities {
        match self {
            ScaffoldLevel::Heavy => ScaffoldCapabilities {
                show_hints: true,
                show_examples: true,
                provide_starters: true,
                validate_responses: true,
            },
            ScaffoldLevel::Medium => ScaffoldCapabilities {
                show_hints: true,
                show_examples: false,
                provide_starters: false,
                validate_responses: true,
            },
            ScaffoldLevel::Light => ScaffoldCapabilities {
                show_hints: false,
                show_examples: false,
                provide_starters: false,
                validate_responses: false,
            },
        }
    }
}

/// Maps completed-session counts to scaffold levels
#[derive(Debug, Clone)]
pub struct ScaffoldPolicy {
    heavy_max_sessions: u32,
    medium_max_sessions: u32,
}

impl Default for ScaffoldPolicy {
    fn default() -> Self {
        Self::new(&ScaffoldConfig::default())
    }
}

impl ScaffoldPolicy {
    pub fn new(config: &ScaffoldConfig) -> Self {
        Self {
            heavy_max_sessions: config.heavy_max_sessions,
            medium_max_sessions: config.medium_max_sessions,
        }
    }

    /// Level for a user with `completed_sessions` finished sessions
    pub fn level_for(&self, completed_sessions: usize) -> ScaffoldLevel {
        if completed_sessions <= self.heavy_max_sessions as usize {
            ScaffoldLevel::Heavy
        } else if completed_sessions <= self.medium_max_sessions as usize {
            ScaffoldLevel::Medium
        } else {
            ScaffoldLevel::Light
        }
    }
}

/// Sentence openers offered under heavy scaffolding
pub fn sentence_starters(category: QuestionCategory) -> &'static [&'static str] {
    match category {
        QuestionCategory::Sensory => &[
            "The moment that comes to mind is...",
            "I remember seeing...",
            "I can still hear...",
            "What struck me visually was...",
        ],
        QuestionCategory::Emotional => &[
            "I felt...",
            "It made me...",
            "I was surprised to find myself...",
            "My immediate reaction was...",
        ],
        QuestionCategory::Narrative => &[
            "The story worked because...",
            "I was drawn in when...",
            "The structure made me...",
            "What kept me watching was...",
        ],
        QuestionCategory::Thematic => &[
            "This connects to...",
            "I found myself thinking about...",
            "It reminded me of...",
            "What resonated was...",
        ],
        QuestionCategory::Technical => &[
            "I noticed the way...",
            "The [element] made me...",
            "What stood out technically was...",
            "I was aware of...",
        ],
    }
}

/// A multiple-choice question that primes recall before the open question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimingQuestion {
    pub prompt: &'static str,
    /// (key, label) pairs
    pub options: &'static [(&'static str, &'static str)],
}

static SENSORY_PRIMING: PrimingQuestion = PrimingQuestion {
    prompt: "Was the moment that struck you primarily:",
    options: &[
        ("visual", "Something you saw (a shot, a face, a color)"),
        ("auditory", "Something you heard (dialogue, music, silence)"),
        ("kinetic", "Movement or action (choreography, pacing)"),
        ("atmospheric", "A feeling or mood in a scene"),
    ],
};

static EMOTIONAL_PRIMING: PrimingQuestion = PrimingQuestion {
    prompt: "Your emotional response was mostly:",
    options: &[
        ("visceral", "Physical: tears, laughter, tension"),
        ("contemplative", "Thoughtful: made you reflect"),
        ("nostalgic", "Connected to your own memories"),
        ("unsettling", "Uncomfortable in an interesting way"),
    ],
};

/// Priming question for a category, if one exists
pub fn priming_question(category: QuestionCategory) -> Option<&'static PrimingQuestion> {
    match category {
        QuestionCategory::Sensory => Some(&SENSORY_PRIMING),
        QuestionCategory::Emotional => Some(&EMOTIONAL_PRIMING),
        _ => None,
    }
}

/// User-facing description of a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDescription {
    pub name: &'static str,
    pub description: &'static str,
    pub goal: &'static str,
}

pub fn phase_description(phase: Phase) -> PhaseDescription {
    match phase {
        Phase::Planning => PhaseDescription {
            name: "Planning / Awareness",
            description: "Let's start by noticing what stayed with you from this film.",
            goal: "Capture initial impressions and expectations.",
        },
        Phase::Monitoring => PhaseDescription {
            name: "Monitoring / Engagement",
            description: "Now let's explore how you engaged with the film while watching.",
            goal: "Understand your moment-to-moment experience.",
        },
        Phase::Evaluation => PhaseDescription {
            name: "Evaluation / Meaning",
            description: "Finally, let's reflect on what this film means to you.",
            goal: "Extract insights about your taste and values.",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        let policy = ScaffoldPolicy::default();
        assert_eq!(policy.level_for(0), ScaffoldLevel::Heavy);
        assert_eq!(policy.level_for(1), ScaffoldLevel::Heavy);
        assert_eq!(policy.level_for(3), ScaffoldLevel::Heavy);
        assert_eq!(policy.level_for(4), ScaffoldLevel::Medium);
        assert_eq!(policy.level_for(5), ScaffoldLevel::Medium);
        assert_eq!(policy.level_for(8), ScaffoldLevel::Medium);
        assert_eq!(policy.level_for(9), ScaffoldLevel::Light);
        assert_eq!(policy.level_for(10), ScaffoldLevel::Light);
    }

    #[test]
    fn test_capabilities_fade() {
        let heavy = ScaffoldLevel::Heavy.capabilities();
        let medium = ScaffoldLevel::Medium.capabilities();
        let light = ScaffoldLevel::Light.capabilities();

        assert!(heavy.show_examples && heavy.provide_starters);
        assert!(medium.show_hints && medium.validate_responses);
        assert!(!medium.show_examples && !medium.provide_starters);
        assert!(!light.show_hints && !light.validate_responses);
    }

    #[test]
    fn test_custom_thresholds() {
        let policy = ScaffoldPolicy::new(&ScaffoldConfig {
            heavy_max_sessions: 0,
            medium_max_sessions: 1,
        });
        assert_eq!(policy.level_for(0), ScaffoldLevel::Heavy);
        assert_eq!(policy.level_for(1), ScaffoldLevel::Medium);
        assert_eq!(policy.level_for(2), ScaffoldLevel::Light);
    }

    #[test]
    fn test_priming_only_for_sensory_and_emotional() {
        assert_eq!(
            priming_question(QuestionCategory::Sensory).map(|p| p.options.len()),
            Some(4)
        );
        assert!(priming_question(QuestionCategory::Emotional).is_some());
        assert!(priming_question(QuestionCategory::Narrative).is_none());
    }

    #[test]
    fn test_every_category_has_starters() {
        for category in [
            QuestionCategory::Sensory,
            QuestionCategory::Emotional,
            QuestionCategory::Narrative,
            QuestionCategory::Thematic,
            QuestionCategory::Technical,
        ] {
            assert_eq!(sentence_starters(category).len(), 4);
        }
    }
}
