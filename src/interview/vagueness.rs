//! Vague response detection
//!
//! Classifies a response, first match wins:
//! 1. too short
//! 2. one of the known vague phrasings (generic praise, hyperbole, ...)
//! 3. low specificity under a reduced rule table
//!
//! The reduced table deliberately differs from
//! [`SpecificityScorer`](crate::analysis::SpecificityScorer); it only decides
//! whether to ask again, never what gets stored.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::analysis::lexicon::{total_weight, LexicalRule};
use crate::config::FollowUpConfig;

const VAGUE_PHRASE_SCORE: f32 = 0.3;
const TOO_SHORT_SCORE: f32 = 0.2;
const SPECIFIC_ENOUGH: f32 = 0.5;

/// Why a response was judged vague
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaguenessType {
    TooShort,
    Acting,
    VaguePositive,
    Cinematography,
    Music,
    Writing,
    GenericPositive,
    EmotionalVague,
    StructuralVague,
    Relatable,
    Hyperbole,
    LowSpecificity,
}

impl VaguenessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VaguenessType::TooShort => "too_short",
            VaguenessType::Acting => "acting",
            VaguenessType::VaguePositive => "vague_positive",
            VaguenessType::Cinematography => "cinematography",
            VaguenessType::Music => "music",
            VaguenessType::Writing => "writing",
            VaguenessType::GenericPositive => "generic_positive",
            VaguenessType::EmotionalVague => "emotional_vague",
            VaguenessType::StructuralVague => "structural_vague",
            VaguenessType::Relatable => "relatable",
            VaguenessType::Hyperbole => "hyperbole",
            VaguenessType::LowSpecificity => "low_specificity",
        }
    }

    /// Follow-up prompts for this kind of vagueness, gentlest first
    pub fn follow_ups(&self) -> &'static [&'static str] {
        match self {
            VaguenessType::TooShort => &[
                "Can you elaborate on that?",
                "Tell me more. What specifically do you mean?",
                "I'd like to understand this better. Can you expand?",
            ],
            VaguenessType::Acting => &[
                "Which actor specifically?",
                "Can you describe a moment where their performance stood out?",
                "What exactly were they doing that worked?",
                "How was their approach different from what you typically see?",
            ],
            VaguenessType::VaguePositive => &[
                "What made it interesting, specifically?",
                "Interesting compared to what?",
                "Can you point to the exact moment that felt interesting?",
                "Interesting in what way? Surprising? Unusual? Thought-provoking?",
            ],
            VaguenessType::Cinematography => &[
                "Can you describe one specific shot that struck you?",
                "Was it the framing, the lighting, the movement, or something else?",
                "What made it beautiful: the composition, colors, or mood?",
                "Close your eyes and describe one image from the film.",
            ],
            VaguenessType::Music => &[
                "Can you hum or describe a specific piece from the score?",
                "When in the film did the music most affect you?",
                "What did the music add that wouldn't be there without it?",
                "Was it the melody, the instruments, or how it interacted with the scene?",
            ],
            VaguenessType::Writing => &[
                "Can you quote or paraphrase a line that stuck with you?",
                "What made the writing effective? Naturalistic? Witty? Poetic?",
                "Was there a conversation or monologue that particularly worked?",
                "How would you describe the voice of this screenplay?",
            ],
            VaguenessType::GenericPositive => &[
                "What specifically did you like about it?",
                "If you had to pick one element that made it work, what would it be?",
                "What kept you engaged?",
                "What would you tell a friend about why they should watch it?",
            ],
            VaguenessType::EmotionalVague => &[
                "What specifically made it powerful/moving?",
                "Which scene hit you the hardest?",
                "What were you feeling in that moment?",
                "Was it the content, the execution, or both?",
            ],
            VaguenessType::StructuralVague => &[
                "What about the ending specifically?",
                "Describe the moment in the ending that affected you.",
                "What did the ending make you feel, and why?",
                "How did it land differently than you expected?",
            ],
            VaguenessType::Relatable => &[
                "What specifically did you relate to?",
                "Was it a character, a situation, or a feeling?",
                "What from your own experience connected to this?",
                "Can you describe the moment you felt that connection?",
            ],
            VaguenessType::Hyperbole => &[
                "What made it so effective for you?",
                "Which elements came together particularly well?",
                "Was there anything that almost didn't work but somehow did?",
                "What sets it apart from other films you've loved?",
            ],
            VaguenessType::LowSpecificity => &[
                "Can you be more specific? Describe a particular moment.",
                "Give me the details. What exactly happened in that scene?",
                "I want to see it through your eyes. Describe it like I haven't seen the film.",
            ],
        }
    }
}

impl std::fmt::Display for VaguenessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of analyzing one attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VagueAnalysis {
    pub is_vague: bool,
    pub vagueness_type: Option<VaguenessType>,
    pub suggested_follow_ups: Vec<String>,
    pub specificity_score: f32,
}

impl VagueAnalysis {
    fn vague(kind: VaguenessType, score: f32) -> Self {
        Self {
            is_vague: true,
            vagueness_type: Some(kind),
            suggested_follow_ups: kind.follow_ups().iter().map(|s| s.to_string()).collect(),
            specificity_score: score,
        }
    }

    fn specific(score: f32) -> Self {
        Self {
            is_vague: false,
            vagueness_type: None,
            suggested_follow_ups: Vec::new(),
            specificity_score: score,
        }
    }
}

/// Ordered catalog; the first matching phrasing wins
static VAGUE_PHRASES: Lazy<Vec<(VaguenessType, LexicalRule)>> = Lazy::new(|| {
    vec![
        (
            VaguenessType::Acting,
            LexicalRule::new(
                "acting",
                r"\bgood acting\b|\bgreat acting\b|\bacting was good\b",
                0.0,
            ),
        ),
        (
            VaguenessType::VaguePositive,
            LexicalRule::new("vague_positive", r"\binteresting\b", 0.0)
                .unless_followed_by(r" (?:because|in that|how)"),
        ),
        (
            VaguenessType::Cinematography,
            LexicalRule::new(
                "cinematography",
                r"\bbeautiful cinematography\b|\bgreat cinematography\b|\bvisually stunning\b",
                0.0,
            ),
        ),
        (
            VaguenessType::Music,
            LexicalRule::new(
                "music",
                r"\bgreat soundtrack\b|\bgood music\b|\bmusic was great\b|\bamazing score\b",
                0.0,
            ),
        ),
        (
            VaguenessType::Writing,
            LexicalRule::new(
                "writing",
                r"\bwell written\b|\bgood writing\b|\bgreat dialogue\b",
                0.0,
            ),
        ),
        (
            VaguenessType::GenericPositive,
            LexicalRule::new(
                "generic_positive",
                r"\bi liked it\b|\bit was good\b|\breally enjoyed it\b",
                0.0,
            ),
        ),
        (
            VaguenessType::EmotionalVague,
            LexicalRule::new("emotional_vague", r"\b(?:powerful|moving|emotional)\b", 0.0)
                .unless_followed_by(" because"),
        ),
        (
            VaguenessType::StructuralVague,
            LexicalRule::new("structural_vague", r"\bthe (?:ending|beginning)\b", 0.0)
                .unless_followed_by(r" (?:where|when)"),
        ),
        (
            VaguenessType::Relatable,
            LexicalRule::new("relatable", r"\brelatable\b|\brelateable\b", 0.0),
        ),
        (
            VaguenessType::Hyperbole,
            LexicalRule::new("hyperbole", r"\bperfect\b|\bflawless\b|\bmasterpiece\b", 0.0),
        ),
    ]
});

static REDUCED_RULES: Lazy<Vec<LexicalRule>> = Lazy::new(|| {
    vec![
        LexicalRule::new("temporal", r"\bwhen\b.*\bwas\b", 0.1),
        LexicalRule::new("scene_reference", r"\bthe scene where\b", 0.15),
        LexicalRule::new("specifically", r"\bspecifically\b", 0.1),
        LexicalRule::new("exactly", r"\bexactly\b", 0.1),
        LexicalRule::new("memory", r"\bi remember\b", 0.1),
        LexicalRule::new("moment", r"\bthe moment\b", 0.1),
        LexicalRule::new("quoted", r#""[^"]+?""#, 0.15),
        LexicalRule::new("digits", r"\d+", 0.05),
        LexicalRule::new("sequence", r"\bfirst\b|\bthen\b|\bafter\b|\bbefore\b", 0.1),
        LexicalRule::new("body", r"\b(face|eyes|hands|voice)\b", 0.1),
        LexicalRule::new("technical", r"\b(shot|frame|cut|angle)\b", 0.1),
        LexicalRule::new("hedging", r"\bkind of\b|\bsort of\b", -0.1),
        LexicalRule::new("uncertainty", r"\bi guess\b|\bmaybe\b", -0.1),
        LexicalRule::new("generalization", r"\bin general\b|\boverall\b", -0.1),
        LexicalRule::new("filler", r"\bjust\b.*\breally\b", -0.1),
    ]
});

/// Decides whether a response deserves a follow-up
#[derive(Debug, Clone)]
pub struct VaguenessDetector {
    min_response_length: usize,
}

impl Default for VaguenessDetector {
    fn default() -> Self {
        Self::new(&FollowUpConfig::default())
    }
}

impl VaguenessDetector {
    pub fn new(config: &FollowUpConfig) -> Self {
        Self {
            min_response_length: config.min_response_length,
        }
    }

    /// Classify one attempt. Total over all input.
    pub fn analyze(&self, text: &str) -> VagueAnalysis {
        let trimmed = text.trim();
        if trimmed.chars().count() < self.min_response_length {
            return VagueAnalysis::vague(VaguenessType::TooShort, TOO_SHORT_SCORE);
        }

        if let Some((kind, _)) = VAGUE_PHRASES.iter().find(|(_, rule)| rule.is_match(trimmed)) {
            return VagueAnalysis::vague(*kind, VAGUE_PHRASE_SCORE);
        }

        let score = reduced_specificity(text);
        if score < SPECIFIC_ENOUGH {
            VagueAnalysis::vague(VaguenessType::LowSpecificity, score)
        } else {
            VagueAnalysis::specific(score)
        }
    }
}

/// Reduced specificity table: fixed weights plus a character-length bonus
fn reduced_specificity(text: &str) -> f32 {
    let mut score = 0.5 + total_weight(&REDUCED_RULES, text);

    let chars = text.chars().count();
    if chars > 200 {
        score += 0.1;
    }
    if chars > 400 {
        score += 0.1;
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(text: &str) -> VagueAnalysis {
        VaguenessDetector::default().analyze(text)
    }

    #[test]
    fn test_short_response_is_too_short() {
        let analysis = analyze("I liked it.");
        assert!(analysis.is_vague);
        assert_eq!(analysis.vagueness_type, Some(VaguenessType::TooShort));
        assert_eq!(analysis.suggested_follow_ups.len(), 3);
        assert_eq!(analysis.specificity_score, 0.2);
    }

    #[test]
    fn test_empty_is_too_short() {
        assert_eq!(analyze("   ").vagueness_type, Some(VaguenessType::TooShort));
    }

    #[test]
    fn test_acting_praise() {
        let text = "I really enjoyed the film because the acting was good throughout the movie.";
        let analysis = analyze(text);
        assert_eq!(analysis.vagueness_type, Some(VaguenessType::Acting));
        assert!(!analysis.suggested_follow_ups.is_empty());
        assert_eq!(analysis.specificity_score, 0.3);
    }

    #[test]
    fn test_catalog_order_first_match_wins() {
        // matches both acting and hyperbole; acting comes first
        let text = "Great acting everywhere, honestly a flawless film from start to finish.";
        let analysis = analyze(text);
        assert_eq!(analysis.vagueness_type, Some(VaguenessType::Acting));
    }

    #[test]
    fn test_qualified_interesting_is_not_vague_positive() {
        let text = "It was interesting because the camera never left her face during the call.";
        assert_ne!(analyze(text).vagueness_type, Some(VaguenessType::VaguePositive));

        let text = "The whole thing was interesting, and I kept watching until the very end of it.";
        assert_eq!(analyze(text).vagueness_type, Some(VaguenessType::VaguePositive));
    }

    #[test]
    fn test_ending_with_where_clause() {
        let text = "I keep thinking about the ending where he closes the door on the empty room.";
        assert_ne!(analyze(text).vagueness_type, Some(VaguenessType::StructuralVague));
    }

    #[test]
    fn test_specific_response_is_not_vague() {
        let text = "I remember the moment when the camera held on her face for a long shot, \
                    and then she said \"I never left\" before the cut to black.";
        let analysis = analyze(text);
        assert!(!analysis.is_vague);
        assert!(analysis.suggested_follow_ups.is_empty());
        assert!(analysis.specificity_score >= 0.5);
    }

    #[test]
    fn test_hedged_response_is_low_specificity() {
        let text = "I guess it was kind of a slow film overall, not sure what else to say.";
        let analysis = analyze(text);
        assert_eq!(analysis.vagueness_type, Some(VaguenessType::LowSpecificity));
        assert!(analysis.specificity_score < 0.5);
        assert_eq!(analysis.suggested_follow_ups.len(), 3);
    }

    #[test]
    fn test_non_ascii_input() {
        let text = "映画の最後のシーンで、彼女の顔がゆっくりと暗闇に消えていく瞬間がずっと心に残っています。本当に。ずっと。いつまでも。";
        let analysis = analyze(text);
        assert!((0.0..=1.0).contains(&analysis.specificity_score));
    }

    #[test]
    fn test_custom_min_length() {
        let detector = VaguenessDetector::new(&FollowUpConfig {
            min_response_length: 5,
            ..FollowUpConfig::default()
        });
        assert_ne!(detector.analyze("I liked it.").vagueness_type, Some(VaguenessType::TooShort));
    }
}
