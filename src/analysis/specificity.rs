//! Response specificity scoring
//!
//! Scores how concrete a written reflection is, from 0.0 (empty or entirely
//! generic) to 1.0. Scoring is deterministic: the text starts at 0.5 and each
//! lexical signal that appears anywhere in it adds or removes a fixed weight.
//!
//! Positive signals: scene references, precision adverbs, memory markers,
//! quoted dialogue, film vocabulary, causal reasoning and examples.
//! Negative signals: hedging, uncertainty, generalization, filler emphasis
//! and unqualified praise.

use once_cell::sync::Lazy;
use regex::Regex;

use super::lexicon::{total_weight, LexicalRule};

/// Neutral starting score for non-empty text
const BASELINE: f32 = 0.5;

/// Bonus when the text has at least this many sentences
const SENTENCE_BONUS_MIN: usize = 3;
const SENTENCE_BONUS: f32 = 0.05;

static POSITIVE_RULES: Lazy<Vec<LexicalRule>> = Lazy::new(|| {
    vec![
        LexicalRule::new("temporal", r"\bwhen\b.*\b(was|were|did)\b", 0.08),
        LexicalRule::new("scene_reference", r"\bthe scene where\b|\bin the scene\b", 0.12),
        LexicalRule::new("precision", r"\bspecifically\b|\bexactly\b|\bprecisely\b", 0.08),
        LexicalRule::new("memory", r"\bi remember\b|\bi recall\b", 0.08),
        LexicalRule::new("moment", r"\bthe moment\b|\bthat moment\b", 0.1),
        LexicalRule::new("quoted_dialogue", r#""[^"]{5,}?""#, 0.12),
        LexicalRule::new("single_quoted", r"'[^']{5,}?'", 0.1),
        LexicalRule::new("sequence", r"\bfirst\b.*\bthen\b|\bafter\b.*\bbefore\b", 0.08),
        LexicalRule::new("body", r"\b(face|eyes|hands|voice|expression)\b", 0.08),
        LexicalRule::new("technical", r"\b(shot|frame|cut|angle|camera)\b", 0.1),
        LexicalRule::new("visual", r"\b(lighting|color|shadow|contrast)\b", 0.08),
        LexicalRule::new("audio", r"\b(score|soundtrack|music|sound|silence)\b", 0.06),
        LexicalRule::new("causal", r"\bbecause\b", 0.06),
        LexicalRule::new("example", r"\bfor example\b|\bfor instance\b", 0.1),
        LexicalRule::new(
            "emotional_timing",
            r"\b(felt|feeling|emotion)\b.*\b(when|during|as)\b",
            0.08,
        ),
    ]
});

static NEGATIVE_RULES: Lazy<Vec<LexicalRule>> = Lazy::new(|| {
    vec![
        LexicalRule::new("hedging", r"\bkind of\b|\bsort of\b", -0.08),
        LexicalRule::new("uncertainty", r"\bi guess\b|\bmaybe\b|\bprobably\b", -0.08),
        LexicalRule::new("generalization", r"\bin general\b|\boverall\b|\bmostly\b", -0.1),
        LexicalRule::new("filler", r"\bjust\b.*\breally\b|\breally\b.*\bjust\b", -0.08),
        // "great because ..." or "nice lighting because ..." is qualified praise
        LexicalRule::new("generic_praise", r"\b(good|great|nice)\b", -0.06)
            .unless_followed_by(r"\s+(?:[a-z]+\s+)?because\b"),
        LexicalRule::new("vague_interesting", r"\binteresting\b", -0.06)
            .unless_followed_by(r"\s+(?:because|in that)\b"),
        LexicalRule::new("dont_know", r"\bi don['’]t know\b|\bi['’]m not sure\b", -0.1),
    ]
});

static SENTENCE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+").expect("Valid sentence break regex"));

/// Pure specificity scorer
pub struct SpecificityScorer;

impl SpecificityScorer {
    /// Score `text` in `[0.0, 1.0]`. Empty or whitespace-only text scores 0.0.
    pub fn score(text: &str) -> f32 {
        if text.trim().is_empty() {
            return 0.0;
        }

        let mut score = BASELINE + Self::length_adjustment(text.split_whitespace().count());
        score += total_weight(&POSITIVE_RULES, text);
        score += total_weight(&NEGATIVE_RULES, text);

        if sentence_count(text) >= SENTENCE_BONUS_MIN {
            score += SENTENCE_BONUS;
        }

        score.clamp(0.0, 1.0)
    }

    /// Word-count bracket; only the highest matching bracket applies
    fn length_adjustment(words: usize) -> f32 {
        if words < 10 {
            -0.2
        } else if words > 100 {
            0.15
        } else if words > 50 {
            0.1
        } else {
            0.0
        }
    }

    /// Coaching line for a score, `None` once the response is specific enough
    pub fn feedback_for(score: f32) -> Option<&'static str> {
        if score >= 0.7 {
            None
        } else if score >= 0.5 {
            Some("That's a good start. Can you add a specific example or moment?")
        } else if score >= 0.3 {
            Some("Try to be more specific. Describe what you saw, heard, or felt in detail.")
        } else {
            Some("I need more detail. Can you describe a specific scene or moment?")
        }
    }
}

/// Sentences after splitting on terminal punctuation, ignoring empty pieces
fn sentence_count(text: &str) -> usize {
    SENTENCE_BREAK
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_empty_and_whitespace_score_zero() {
        assert_eq!(SpecificityScorer::score(""), 0.0);
        assert_eq!(SpecificityScorer::score("   \n\t"), 0.0);
    }

    #[test]
    fn test_short_generic_response_is_penalized() {
        // 4 words (-0.2), "good" unqualified (-0.06)
        let score = SpecificityScorer::score("It was good overall");
        // "overall" (-0.1)
        assert!(approx(score, 0.5 - 0.2 - 0.06 - 0.1));
    }

    #[test]
    fn test_length_brackets_are_not_cumulative() {
        assert!(approx(SpecificityScorer::length_adjustment(9), -0.2));
        assert!(approx(SpecificityScorer::length_adjustment(10), 0.0));
        assert!(approx(SpecificityScorer::length_adjustment(50), 0.0));
        assert!(approx(SpecificityScorer::length_adjustment(51), 0.1));
        assert!(approx(SpecificityScorer::length_adjustment(100), 0.1));
        assert!(approx(SpecificityScorer::length_adjustment(101), 0.15));
    }

    #[test]
    fn test_specific_response_scores_high() {
        let text = "I remember the scene where she turns off the lamp. \
                    The camera holds on her face for a long time, and the silence \
                    made me hold my breath. Specifically, the shadow across her eyes \
                    felt like grief settling in when the door closed.";
        let score = SpecificityScorer::score(text);
        assert!(score >= 0.9, "score was {}", score);
    }

    #[test]
    fn test_qualified_praise_is_not_penalized() {
        let base = "The ending of the film stayed with me for a while afterwards";
        let unqualified = SpecificityScorer::score(&format!("{} and it was great", base));
        let qualified =
            SpecificityScorer::score(&format!("{} and it was great because it lingered", base));

        // qualified: avoids -0.06 and earns "because" +0.06
        assert!(approx(qualified - unqualified, 0.12));
    }

    #[test]
    fn test_interesting_qualified_by_in_that() {
        let vague = SpecificityScorer::score(
            "The structure of the second half of this movie was interesting to me.",
        );
        let qualified = SpecificityScorer::score(
            "The structure of the second half was interesting in that it ran backwards.",
        );
        assert!(qualified > vague);
    }

    #[test]
    fn test_sentence_bonus() {
        assert_eq!(sentence_count("One. Two! Three?"), 3);
        assert_eq!(sentence_count("...!!"), 0);
        assert_eq!(sentence_count("No punctuation at all"), 1);
    }

    #[test]
    fn test_curly_apostrophe_uncertainty() {
        let straight = SpecificityScorer::score("Honestly I don't know what to say about it");
        let curly = SpecificityScorer::score("Honestly I don’t know what to say about it");
        assert!(approx(straight, curly));
    }

    #[test]
    fn test_feedback_tiers() {
        assert_eq!(SpecificityScorer::feedback_for(0.75), None);
        assert!(SpecificityScorer::feedback_for(0.55)
            .unwrap()
            .contains("good start"));
        assert!(SpecificityScorer::feedback_for(0.35)
            .unwrap()
            .contains("more specific"));
        assert!(SpecificityScorer::feedback_for(0.1)
            .unwrap()
            .contains("more detail"));
    }

    #[test]
    fn test_non_ascii_input() {
        let score = SpecificityScorer::score("映画のシーンがとても美しかった。静かな瞬間。");
        assert!((0.0..=1.0).contains(&score));
    }
}
