//! Question sequencing
//!
//! A two-level state machine: the current phase, and the index within that
//! phase's selected questions. Running past the last evaluation question
//! completes the sequence.

use super::bank::{questions_for_phase, Question};
use super::scaffold::{ScaffoldCapabilities, ScaffoldLevel};
use crate::types::{Phase, SessionType};

const PATTERN_HUNT_CAP: usize = 6;
const TEMPORAL_CAP: usize = 4;

/// Vocabulary that marks a comparison question
const COMPARISON_TERMS: [&str; 3] = ["compar", "different", "remov"];

/// Vocabulary that marks a change-over-time question
const CHANGE_TERMS: [&str; 3] = ["change", "last", "stay"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextQuestion {
    Ask(&'static Question),
    /// No questions remain
    Complete,
}

/// Ordered question plan for one movie
#[derive(Debug, Clone)]
pub struct QuestionSequencer {
    session_type: SessionType,
    level: ScaffoldLevel,
    plan: Vec<&'static Question>,
    phase: Phase,
    index: usize,
    complete: bool,
}

impl QuestionSequencer {
    pub fn new(session_type: SessionType, level: ScaffoldLevel) -> Self {
        Self {
            session_type,
            level,
            plan: select_questions(session_type),
            phase: Phase::Planning,
            index: 0,
            complete: false,
        }
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn scaffold_level(&self) -> ScaffoldLevel {
        self.level
    }

    /// Every selected question, phase by phase
    pub fn questions(&self) -> &[&'static Question] {
        &self.plan
    }

    fn phase_questions(&self, phase: Phase) -> impl Iterator<Item = &'static Question> + '_ {
        self.plan.iter().copied().filter(move |q| q.phase == phase)
    }

    /// Advance and return the next question, moving through phases as each
    /// one runs out. Phases with no selected questions are passed over.
    pub fn next_question(&mut self) -> NextQuestion {
        if self.complete {
            return NextQuestion::Complete;
        }

        loop {
            let next = self.phase_questions(self.phase).nth(self.index);
            if let Some(question) = next {
                self.index += 1;
                return NextQuestion::Ask(question);
            }

            match self.phase.next() {
                Some(next) => {
                    self.phase = next;
                    self.index = 0;
                }
                None => {
                    self.complete = true;
                    return NextQuestion::Complete;
                }
            }
        }
    }

    pub fn current_phase(&self) -> Phase {
        self.phase
    }

    /// (phase, questions already asked in that phase)
    pub fn position(&self) -> (Phase, usize) {
        (self.phase, self.index)
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Continue from a persisted position
    pub fn resume(&mut self, phase: Phase, index: usize) {
        self.phase = phase;
        self.index = index;
        self.complete = false;
    }

    /// Start over at the first planning question (next movie)
    pub fn restart(&mut self) {
        self.resume(Phase::Planning, 0);
    }

    pub fn capabilities(&self) -> ScaffoldCapabilities {
        self.level.capabilities()
    }

    pub fn show_hints(&self) -> bool {
        self.capabilities().show_hints
    }

    pub fn show_examples(&self) -> bool {
        self.capabilities().show_examples
    }

    pub fn provide_starters(&self) -> bool {
        self.capabilities().provide_starters
    }

    pub fn validate_responses(&self) -> bool {
        self.capabilities().validate_responses
    }
}

fn mentions_any(question: &Question, terms: &[&str]) -> bool {
    let text = question.text.to_lowercase();
    terms.iter().any(|term| text.contains(term))
}

/// Question subset for a session type, in catalog order
pub fn select_questions(session_type: SessionType) -> Vec<&'static Question> {
    let head = |phase: Phase, n: usize| questions_for_phase(phase).iter().take(n);

    match session_type {
        SessionType::DeepDive => head(Phase::Planning, 3)
            .chain(head(Phase::Monitoring, 4))
            .chain(head(Phase::Evaluation, 4))
            .collect(),
        SessionType::PatternHunt => questions_for_phase(Phase::Monitoring)
            .iter()
            .chain(questions_for_phase(Phase::Evaluation))
            .filter(|q| mentions_any(q, &COMPARISON_TERMS))
            .take(PATTERN_HUNT_CAP)
            .collect(),
        SessionType::Temporal => questions_for_phase(Phase::Evaluation)
            .iter()
            .filter(|q| mentions_any(q, &CHANGE_TERMS))
            .take(TEMPORAL_CAP)
            .collect(),
        SessionType::Balanced => head(Phase::Planning, 2)
            .chain(head(Phase::Monitoring, 3))
            .chain(head(Phase::Evaluation, 3))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(sequencer: &mut QuestionSequencer) -> Vec<&'static str> {
        let mut keys = Vec::new();
        while let NextQuestion::Ask(q) = sequencer.next_question() {
            keys.push(q.key);
        }
        keys
    }

    fn keys(session_type: SessionType) -> Vec<&'static str> {
        select_questions(session_type).iter().map(|q| q.key).collect()
    }

    #[test]
    fn test_deep_dive_selection() {
        let selected = select_questions(SessionType::DeepDive);
        assert_eq!(selected.len(), 11);
        assert_eq!(selected[0].key, "first_memory");
        assert_eq!(selected[3].key, "attention_captured");
        assert_eq!(selected[7].key, "emotional_impact");
    }

    #[test]
    fn test_balanced_selection() {
        assert_eq!(
            keys(SessionType::Balanced),
            vec![
                "first_memory",
                "expectations",
                "attention_captured",
                "disconnection",
                "predictions",
                "emotional_impact",
                "removal_test",
                "self_reflection",
            ]
        );
    }

    #[test]
    fn test_pattern_hunt_selection() {
        assert_eq!(
            keys(SessionType::PatternHunt),
            vec!["comparisons", "time_perception", "removal_test"]
        );
    }

    #[test]
    fn test_temporal_selection() {
        assert_eq!(keys(SessionType::Temporal), vec!["lasting_image", "changed_view"]);
    }

    #[test]
    fn test_walks_phases_in_order_then_completes() {
        let mut sequencer = QuestionSequencer::new(SessionType::DeepDive, ScaffoldLevel::Heavy);
        assert_eq!(sequencer.current_phase(), Phase::Planning);

        let asked = drain(&mut sequencer);
        assert_eq!(asked.len(), 11);
        assert_eq!(sequencer.current_phase(), Phase::Evaluation);
        assert!(sequencer.is_complete());
        assert_eq!(sequencer.next_question(), NextQuestion::Complete);
    }

    #[test]
    fn test_empty_phases_are_skipped() {
        let mut sequencer = QuestionSequencer::new(SessionType::Temporal, ScaffoldLevel::Light);
        match sequencer.next_question() {
            NextQuestion::Ask(q) => {
                assert_eq!(q.key, "lasting_image");
                assert_eq!(sequencer.current_phase(), Phase::Evaluation);
            }
            NextQuestion::Complete => panic!("temporal plan should not be empty"),
        }
    }

    #[test]
    fn test_resume_and_restart() {
        let mut sequencer = QuestionSequencer::new(SessionType::Balanced, ScaffoldLevel::Medium);
        sequencer.resume(Phase::Monitoring, 2);
        assert_eq!(
            sequencer.next_question(),
            NextQuestion::Ask(crate::interview::bank::question("predictions").unwrap())
        );
        assert_eq!(sequencer.position(), (Phase::Monitoring, 3));

        drain(&mut sequencer);
        sequencer.restart();
        assert!(!sequencer.is_complete());
        assert_eq!(drain(&mut sequencer).len(), 8);
    }

    #[test]
    fn test_capabilities_follow_level() {
        let sequencer = QuestionSequencer::new(SessionType::Balanced, ScaffoldLevel::Medium);
        assert!(sequencer.show_hints());
        assert!(!sequencer.show_examples());
        assert!(!sequencer.provide_starters());
        assert!(sequencer.validate_responses());
    }
}
