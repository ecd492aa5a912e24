//! Element extraction
//!
//! Tags a response with the craft aspects and themes it mentions. Tags are a
//! set: a response mentioning music three times yields one `audio` tag.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::types::{MovieId, PatternType};

/// Craft aspect a response can mention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    Visual,
    Audio,
    Editing,
    Writing,
    Performance,
    Color,
}

impl Aspect {
    pub const ALL: [Aspect; 6] = [
        Aspect::Visual,
        Aspect::Audio,
        Aspect::Editing,
        Aspect::Writing,
        Aspect::Performance,
        Aspect::Color,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Aspect::Visual => "visual",
            Aspect::Audio => "audio",
            Aspect::Editing => "editing",
            Aspect::Writing => "writing",
            Aspect::Performance => "performance",
            Aspect::Color => "color",
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            Aspect::Visual => r"\b(cinematography|lighting|framing|composition)\b",
            Aspect::Audio => r"\b(score|soundtrack|music|sound design)\b",
            Aspect::Editing => r"\b(editing|cuts?|pacing|rhythm)\b",
            Aspect::Writing => r"\b(dialogue|script|writing)\b",
            Aspect::Performance => r"\b(performance|acting|delivery)\b",
            Aspect::Color => r"\b(color|palette|tone)\b",
        }
    }
}

/// Theme a response can touch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Loss,
    Love,
    Isolation,
    Hope,
    Nostalgia,
    Identity,
    Family,
    Mortality,
}

impl Theme {
    pub const ALL: [Theme; 8] = [
        Theme::Loss,
        Theme::Love,
        Theme::Isolation,
        Theme::Hope,
        Theme::Nostalgia,
        Theme::Identity,
        Theme::Family,
        Theme::Mortality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Loss => "loss",
            Theme::Love => "love",
            Theme::Isolation => "isolation",
            Theme::Hope => "hope",
            Theme::Nostalgia => "nostalgia",
            Theme::Identity => "identity",
            Theme::Family => "family",
            Theme::Mortality => "mortality",
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            Theme::Loss => r"\b(loss|grief|mourning)\b",
            Theme::Love => r"\b(love|romance|relationship)\b",
            Theme::Isolation => r"\b(isolation|loneliness|alone)\b",
            Theme::Hope => r"\b(hope|redemption|healing)\b",
            Theme::Nostalgia => r"\b(nostalgia|memory|past)\b",
            Theme::Identity => r"\b(identity|self|who I am)\b",
            Theme::Family => r"\b(family|parent|child)\b",
            Theme::Mortality => r"\b(mortality|death|dying)\b",
        }
    }
}

/// One extracted element. Displays as `visual` or `theme:loss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum ElementTag {
    Technical(Aspect),
    Theme(Theme),
}

impl ElementTag {
    /// Bare element name, without the `theme:` namespace
    pub fn name(&self) -> &'static str {
        match self {
            ElementTag::Technical(aspect) => aspect.as_str(),
            ElementTag::Theme(theme) => theme.as_str(),
        }
    }

    /// Pattern type this element feeds
    pub fn pattern_type(&self) -> PatternType {
        match self {
            ElementTag::Theme(_) => PatternType::Thematic,
            ElementTag::Technical(Aspect::Visual | Aspect::Color) => PatternType::Visual,
            ElementTag::Technical(Aspect::Audio) => PatternType::Auditory,
            ElementTag::Technical(Aspect::Editing) => PatternType::Structural,
            ElementTag::Technical(Aspect::Performance) => PatternType::Performance,
            ElementTag::Technical(Aspect::Writing) => PatternType::General,
        }
    }
}

impl fmt::Display for ElementTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementTag::Technical(aspect) => f.write_str(aspect.as_str()),
            ElementTag::Theme(theme) => write!(f, "theme:{}", theme.as_str()),
        }
    }
}

static TAG_PATTERNS: Lazy<Vec<(ElementTag, Regex)>> = Lazy::new(|| {
    let technical = Aspect::ALL
        .iter()
        .map(|a| (ElementTag::Technical(*a), a.pattern()));
    let thematic = Theme::ALL.iter().map(|t| (ElementTag::Theme(*t), t.pattern()));

    technical
        .chain(thematic)
        .map(|(tag, pattern)| {
            let regex = Regex::new(&format!("(?i){}", pattern)).expect("Valid element regex");
            (tag, regex)
        })
        .collect()
});

/// Pure element extractor
pub struct ElementExtractor;

impl ElementExtractor {
    /// Every craft aspect and theme mentioned in `text`
    pub fn extract(text: &str) -> BTreeSet<ElementTag> {
        TAG_PATTERNS
            .iter()
            .filter(|(_, regex)| regex.is_match(text))
            .map(|(tag, _)| *tag)
            .collect()
    }
}

/// Per-element mention counts and supporting movies over many responses
#[derive(Debug, Clone, Default)]
pub struct ElementTally {
    counts: BTreeMap<ElementTag, usize>,
    movies: BTreeMap<ElementTag, BTreeSet<MovieId>>,
}

/// One row of a tally
#[derive(Debug, Clone, PartialEq)]
pub struct TalliedElement<'a> {
    pub tag: ElementTag,
    /// Responses mentioning the element
    pub count: usize,
    pub movie_ids: &'a BTreeSet<MovieId>,
}

impl ElementTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract `text` and count each of its tags once
    pub fn record(&mut self, movie_id: MovieId, text: &str) {
        for tag in ElementExtractor::extract(text) {
            *self.counts.entry(tag).or_insert(0) += 1;
            self.movies.entry(tag).or_default().insert(movie_id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The `limit` most mentioned elements, ties broken by tag order
    pub fn most_common(&self, limit: usize) -> Vec<TalliedElement<'_>> {
        let mut rows: Vec<TalliedElement<'_>> = self
            .counts
            .iter()
            .filter_map(|(tag, count)| {
                self.movies.get(tag).map(|movie_ids| TalliedElement {
                    tag: *tag,
                    count: *count,
                    movie_ids,
                })
            })
            .collect();

        // stable sort keeps BTreeMap (tag) order among equal counts
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        rows.truncate(limit);
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_counts_responses_not_occurrences() {
        let (a, b) = (MovieId::new(), MovieId::new());
        let mut tally = ElementTally::new();
        tally.record(a, "music and music");
        tally.record(b, "the music, the grief");
        tally.record(b, "grief");
        tally.record(b, "the acting");

        let top = tally.most_common(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].tag, ElementTag::Technical(Aspect::Audio));
        assert_eq!(top[0].count, 2);
        assert_eq!(top[0].movie_ids.len(), 2);
        assert_eq!(top[1].tag, ElementTag::Theme(Theme::Loss));
        assert_eq!(top[1].movie_ids.len(), 1);
    }

    #[test]
    fn test_extracts_technical_and_thematic_tags() {
        let tags = ElementExtractor::extract(
            "The Cinematography and the score carried the grief of the family.",
        );

        let rendered: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["visual", "audio", "theme:loss", "theme:family"]
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let tags = ElementExtractor::extract("music, music and more music");
        assert_eq!(tags.len(), 1);
        assert!(tags.contains(&ElementTag::Technical(Aspect::Audio)));
    }

    #[test]
    fn test_word_boundaries() {
        // "scored" and "selfish" are not element words
        assert!(ElementExtractor::extract("She scored a selfish goal").is_empty());
        assert!(ElementExtractor::extract("").is_empty());
    }

    #[test]
    fn test_pattern_type_classification() {
        assert_eq!(
            ElementTag::Theme(Theme::Hope).pattern_type(),
            PatternType::Thematic
        );
        assert_eq!(
            ElementTag::Technical(Aspect::Color).pattern_type(),
            PatternType::Visual
        );
        assert_eq!(
            ElementTag::Technical(Aspect::Editing).pattern_type(),
            PatternType::Structural
        );
        assert_eq!(
            ElementTag::Technical(Aspect::Writing).pattern_type(),
            PatternType::General
        );
    }

    #[test]
    fn test_name_drops_namespace() {
        assert_eq!(ElementTag::Theme(Theme::Mortality).name(), "mortality");
        assert_eq!(ElementTag::Theme(Theme::Mortality).to_string(), "theme:mortality");
    }
}
