//! Question catalog
//!
//! Twenty questions across the three phases. Question text may contain a
//! `{movie}` placeholder that [`format_question`] fills with the title.

use crate::types::{Phase, QuestionCategory};
use crate::types::Phase::{Evaluation, Monitoring, Planning};
use crate::types::QuestionCategory::{Emotional, Narrative, Sensory, Technical, Thematic};

/// Placeholder replaced by the movie title
pub const MOVIE_PLACEHOLDER: &str = "{movie}";

/// One question of the static catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub key: &'static str,
    pub text: &'static str,
    pub phase: Phase,
    pub category: QuestionCategory,
    pub hint: Option<&'static str>,
    pub example_good: Option<&'static str>,
    pub example_vague: Option<&'static str>,
}

impl Question {
    const fn new(
        key: &'static str,
        text: &'static str,
        phase: Phase,
        category: QuestionCategory,
        hint: &'static str,
    ) -> Self {
        Self {
            key,
            text,
            phase,
            category,
            hint: Some(hint),
            example_good: None,
            example_vague: None,
        }
    }

    const fn with_examples(mut self, good: &'static str, vague: &'static str) -> Self {
        self.example_good = Some(good);
        self.example_vague = Some(vague);
        self
    }
}

static PLANNING: [Question; 5] = [
    Question::new(
        "first_memory",
        "Before we analyze this film, what's the first specific moment or scene that comes to mind when you think of {movie}?",
        Planning,
        Sensory,
        "Try to recall a specific image, sound, or moment, not the plot summary.",
    )
    .with_examples(
        "The scene where she walks into the empty apartment and just stands there, looking at the dust floating in the light from the window.",
        "The ending was good.",
    ),
    Question::new(
        "expectations",
        "What were you hoping for or expecting when you started watching {movie}?",
        Planning,
        Emotional,
        "Think about what drew you to watch it, what you anticipated.",
    ),
    Question::new(
        "attention_focus",
        "Can you identify one specific element you found yourself paying attention to while watching?",
        Planning,
        Sensory,
        "Was it the dialogue? The faces? The colors? The music? What kept catching your eye or ear?",
    ),
    Question::new(
        "initial_feeling",
        "What did you feel immediately after the film ended, before you had time to think about it?",
        Planning,
        Emotional,
        "Not what you think about it now. What was the raw, immediate feeling?",
    ),
    Question::new(
        "watch_context",
        "Where and how did you watch {movie}? Were you alone? What was your state of mind?",
        Planning,
        Thematic,
        "Context shapes experience. Theater vs. laptop, alone vs. with someone, tired vs. alert.",
    ),
];

static MONITORING: [Question; 7] = [
    Question::new(
        "attention_captured",
        "Think about a moment when your attention was most completely captured. What was happening in that exact scene?",
        Monitoring,
        Sensory,
        "Describe it like you're setting up the scene for someone who hasn't seen it.",
    )
    .with_examples(
        "When the camera slowly pushed in on his face as he read the letter, and you could see his expression shift from confusion to devastation. No dialogue, just that face.",
        "The dramatic scenes were engaging.",
    ),
    Question::new(
        "disconnection",
        "Were there points where you felt disconnected or your mind wandered? What was happening when that occurred?",
        Monitoring,
        Emotional,
        "It's valuable to identify what doesn't work for you too.",
    ),
    Question::new(
        "predictions",
        "Did you notice yourself making predictions about what would happen? Were they right?",
        Monitoring,
        Narrative,
        "We're constantly predicting. What did you expect, and how did the film respond?",
    ),
    Question::new(
        "comparisons",
        "While watching, did you find yourself comparing this to other films, books, or experiences? To what?",
        Monitoring,
        Thematic,
        "These automatic comparisons reveal your mental library and what patterns you recognize.",
    ),
    Question::new(
        "physical_response",
        "Did you have any physical responses? Tension, tears, laughter, leaning forward, looking away?",
        Monitoring,
        Emotional,
        "Our bodies often respond before our minds catch up. What did yours do?",
    ),
    Question::new(
        "rewatch_impulse",
        "Were there moments you wanted to rewind or see again? Which ones?",
        Monitoring,
        Sensory,
        "The urge to revisit something immediately is a strong signal.",
    ),
    Question::new(
        "time_perception",
        "How did time feel during the film? Did it fly by, drag, or did certain sections feel different?",
        Monitoring,
        Narrative,
        "Time perception reveals engagement. When did the film earn your full presence?",
    ),
];

static EVALUATION: [Question; 8] = [
    Question::new(
        "emotional_impact",
        "Looking back, what element had the most emotional impact on you, and what specifically about it?",
        Evaluation,
        Emotional,
        "'The score' is too vague. Which part of the score? What did it do?",
    )
    .with_examples(
        "The recurring piano motif that played during her memories. The first few times it felt nostalgic, but by the end, when it played over her empty chair, it felt like loss.",
        "The emotional parts were moving.",
    ),
    Question::new(
        "removal_test",
        "If you removed one element (the score, the cinematography, the dialogue style, the lead performance), would your experience be fundamentally different? Which one?",
        Evaluation,
        Technical,
        "This reveals what you consider essential to the film's effect.",
    ),
    Question::new(
        "self_reflection",
        "What does your reaction to this film tell you about what you value in storytelling?",
        Evaluation,
        Thematic,
        "Step back. What does loving (or not loving) this film say about you?",
    ),
    Question::new(
        "lasting_image",
        "What image or moment do you think will stay with you longest? Why that one?",
        Evaluation,
        Sensory,
        "Of everything in the film, what has lodged itself in your memory?",
    ),
    Question::new(
        "recommendation",
        "If you were to recommend this film to someone, what kind of person would appreciate it most? Why?",
        Evaluation,
        Thematic,
        "Imagining the ideal audience reveals what you think the film offers.",
    ),
    Question::new(
        "changed_view",
        "Did this film change how you think about anything: films, life, a topic it addressed?",
        Evaluation,
        Thematic,
        "Films can shift perspectives. Did this one move anything in you?",
    ),
    Question::new(
        "craft_appreciation",
        "Is there a specific craft element (editing, sound design, production design, etc.) that you noticed more than usual?",
        Evaluation,
        Technical,
        "Sometimes a film teaches us to see filmmaking differently.",
    ),
    Question::new(
        "narrative_structure",
        "How did the structure of the story affect your experience? Did the way it was told enhance or diminish the material?",
        Evaluation,
        Narrative,
        "Not just what happened, but how it was revealed to you.",
    ),
];

/// Catalog questions of a phase, in catalog order
pub fn questions_for_phase(phase: Phase) -> &'static [Question] {
    match phase {
        Planning => &PLANNING,
        Monitoring => &MONITORING,
        Evaluation => &EVALUATION,
    }
}

/// Every question, phase by phase
pub fn all_questions() -> impl Iterator<Item = &'static Question> {
    Phase::ALL
        .into_iter()
        .flat_map(|phase| questions_for_phase(phase).iter())
}

/// Look up a question by key
pub fn question(key: &str) -> Option<&'static Question> {
    all_questions().find(|q| q.key == key)
}

/// Question text with the movie title filled in
pub fn format_question(question: &Question, movie_title: &str) -> String {
    question.text.replace(MOVIE_PLACEHOLDER, movie_title)
}
