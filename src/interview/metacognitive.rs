//! Metacognitive prompts
//!
//! Short prompts that ask the user to notice how they are thinking, shown
//! before questions, after responses, between phases and at session end.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::Phase;

/// When a prompt is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTiming {
    BeforeQuestion,
    AfterResponse,
    PhaseTransition,
    SessionEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptCategory {
    Awareness,
    Strategy,
    Insight,
    Confidence,
    Reflection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetacognitivePrompt {
    pub key: &'static str,
    pub text: &'static str,
    pub timing: PromptTiming,
    pub category: PromptCategory,
}

/// Key of the after-response prompt that asks whether a response is a new insight
pub const NEW_INSIGHT_KEY: &str = "new_insight";

const fn prompt(
    key: &'static str,
    text: &'static str,
    timing: PromptTiming,
    category: PromptCategory,
) -> MetacognitivePrompt {
    MetacognitivePrompt {
        key,
        text,
        timing,
        category,
    }
}

static BEFORE_QUESTION: [MetacognitivePrompt; 3] = [
    prompt(
        "notice_first",
        "Before answering, pause for a moment. What comes to mind first?",
        PromptTiming::BeforeQuestion,
        PromptCategory::Awareness,
    ),
    prompt(
        "feeling_check",
        "How are you feeling about analyzing this film? Excited? Resistant? Neutral?",
        PromptTiming::BeforeQuestion,
        PromptCategory::Awareness,
    ),
    prompt(
        "memory_strategy",
        "What strategy are you using to recall these details? Replaying scenes? Remembering feelings?",
        PromptTiming::BeforeQuestion,
        PromptCategory::Strategy,
    ),
];

static AFTER_RESPONSE: [MetacognitivePrompt; 4] = [
    prompt(
        NEW_INSIGHT_KEY,
        "Was that something you've thought about before, or did articulating it reveal something new?",
        PromptTiming::AfterResponse,
        PromptCategory::Insight,
    ),
    prompt(
        "confidence_check",
        "How confident are you in that response? Solid ground or still exploring?",
        PromptTiming::AfterResponse,
        PromptCategory::Confidence,
    ),
    prompt(
        "authentic_check",
        "Are you describing what you actually experienced, or what you think you should have experienced?",
        PromptTiming::AfterResponse,
        PromptCategory::Awareness,
    ),
    prompt(
        "articulation_quality",
        "If you explained this to a friend, would they understand exactly what you mean?",
        PromptTiming::AfterResponse,
        PromptCategory::Strategy,
    ),
];

static TO_MONITORING: MetacognitivePrompt = prompt(
    "transition_1",
    "You've captured your initial impressions. Now let's go deeper into how you actually engaged with the film.",
    PromptTiming::PhaseTransition,
    PromptCategory::Reflection,
);

static TO_EVALUATION: MetacognitivePrompt = prompt(
    "transition_2",
    "You've explored your experience. Now let's step back and reflect on what it all means.",
    PromptTiming::PhaseTransition,
    PromptCategory::Reflection,
);

static SESSION_END: [MetacognitivePrompt; 3] = [
    prompt(
        "session_learning",
        "What did you learn about your taste from this session?",
        PromptTiming::SessionEnd,
        PromptCategory::Reflection,
    ),
    prompt(
        "session_surprise",
        "Was anything surprising in what you discovered?",
        PromptTiming::SessionEnd,
        PromptCategory::Reflection,
    ),
    prompt(
        "session_feeling",
        "How do you feel about this depth of analysis? Energizing? Exhausting? Illuminating?",
        PromptTiming::SessionEnd,
        PromptCategory::Reflection,
    ),
];

/// Every prompt shown at `timing`
pub fn prompts_for(timing: PromptTiming) -> &'static [MetacognitivePrompt] {
    match timing {
        PromptTiming::BeforeQuestion => &BEFORE_QUESTION,
        PromptTiming::AfterResponse => &AFTER_RESPONSE,
        PromptTiming::SessionEnd => &SESSION_END,
        // transitions are keyed by phase pair, see `transition_prompt`
        PromptTiming::PhaseTransition => &[],
    }
}

/// A random prompt for `timing`, skipping keys in `exclude`
pub fn random_prompt<R: Rng + ?Sized>(
    timing: PromptTiming,
    exclude: &[&str],
    rng: &mut R,
) -> Option<&'static MetacognitivePrompt> {
    let candidates: Vec<&'static MetacognitivePrompt> = prompts_for(timing)
        .iter()
        .filter(|p| !exclude.contains(&p.key))
        .collect();
    candidates.choose(rng).copied()
}

/// Prompt shown when moving from `from` to `to`
pub fn transition_prompt(from: Phase, to: Phase) -> Option<&'static MetacognitivePrompt> {
    match (from, to) {
        (Phase::Planning, Phase::Monitoring) => Some(&TO_MONITORING),
        (Phase::Monitoring, Phase::Evaluation) => Some(&TO_EVALUATION),
        _ => None,
    }
}

/// Label for a 1-5 self-rated confidence
pub fn confidence_description(level: u8) -> &'static str {
    match level {
        1 => "Just guessing, not sure at all",
        2 => "Uncertain, might change my mind",
        3 => "Moderate, seems right but I'm open",
        4 => "Confident, this feels solid",
        5 => "Very confident, I know this about myself",
        _ => "Unknown",
    }
}

/// What a pattern reflection prompt is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectionSubject<'a> {
    MovieCount(usize),
    Element(&'a str),
    Pattern(&'a str),
}

/// Prompt inviting the user to react to detected patterns
pub fn pattern_reflection<R: Rng + ?Sized>(
    subject: Option<ReflectionSubject<'_>>,
    rng: &mut R,
) -> String {
    match subject {
        Some(ReflectionSubject::MovieCount(count)) => movie_count_reflection(&count.to_string()),
        Some(ReflectionSubject::Element(element)) => {
            if rng.gen_bool(0.5) {
                format!(
                    "Your responses suggest you value {}. Does that resonate, or does it feel incomplete?",
                    element
                )
            } else {
                format!(
                    "I notice you keep mentioning {}. Is this something you've always known about yourself?",
                    element
                )
            }
        }
        Some(ReflectionSubject::Pattern(pattern)) => format!(
            "Three of your favorite moments involved {}. Interesting pattern or coincidence?",
            pattern
        ),
        None => movie_count_reflection("several"),
    }
}

fn movie_count_reflection(count: &str) -> String {
    format!(
        "You've identified patterns in {} films now. What surprises you about what you're discovering?",
        count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_prompt_respects_exclusions() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let excluded = ["notice_first", "feeling_check"];
            let p = random_prompt(PromptTiming::BeforeQuestion, &excluded, &mut rng).unwrap();
            assert_eq!(p.key, "memory_strategy");
        }

        let all: Vec<&str> = BEFORE_QUESTION.iter().map(|p| p.key).collect();
        assert!(random_prompt(PromptTiming::BeforeQuestion, &all, &mut rng).is_none());
    }

    #[test]
    fn test_random_prompt_timing() {
        let mut rng = StdRng::seed_from_u64(1);
        let p = random_prompt(PromptTiming::SessionEnd, &[], &mut rng).unwrap();
        assert_eq!(p.timing, PromptTiming::SessionEnd);
        assert!(random_prompt(PromptTiming::PhaseTransition, &[], &mut rng).is_none());
    }

    #[test]
    fn test_transitions_only_forward_adjacent() {
        assert_eq!(
            transition_prompt(Phase::Planning, Phase::Monitoring).map(|p| p.key),
            Some("transition_1")
        );
        assert_eq!(
            transition_prompt(Phase::Monitoring, Phase::Evaluation).map(|p| p.key),
            Some("transition_2")
        );
        assert!(transition_prompt(Phase::Planning, Phase::Evaluation).is_none());
    }

    #[test]
    fn test_confidence_descriptions() {
        assert_eq!(confidence_description(4), "Confident, this feels solid");
        assert_eq!(confidence_description(0), "Unknown");
        assert_eq!(confidence_description(6), "Unknown");
    }

    #[test]
    fn test_pattern_reflection_fills_subject() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(pattern_reflection(Some(ReflectionSubject::MovieCount(4)), &mut rng)
            .contains("4 films"));
        assert!(pattern_reflection(Some(ReflectionSubject::Element("stillness")), &mut rng)
            .contains("stillness"));
        assert!(pattern_reflection(Some(ReflectionSubject::Pattern("silence")), &mut rng)
            .contains("silence"));
        assert!(pattern_reflection(None, &mut rng).contains("several films"));
    }
}
