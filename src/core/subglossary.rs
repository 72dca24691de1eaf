// File: src/core/subglossary.rs
use crate::core::context::ContextWindow;
use crate::core::scanner::ChapterScanner;
use crate::core::store::TermStore;
use crate::core::types::{Category, Chapter, Gender, Term};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const DEFAULT_MAX_PER_CATEGORY: usize = 15;

/// Ranking constants for sub-glossary candidates.
///
/// A term found in the chapter text and live in the window gets
/// `present_score`. A term that is only live in the window scores
/// `min(usage / usage_divisor, usage_cap)` plus `recent_bonus` when it was
/// last used within `recency_chapters` of the current chapter, else
/// `stale_bonus`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    pub present_score: f64,
    pub usage_divisor: f64,
    pub usage_cap: f64,
    pub recent_bonus: f64,
    pub stale_bonus: f64,
    pub recency_chapters: Chapter,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            present_score: 3.0,
            usage_divisor: 10.0,
            usage_cap: 2.0,
            recent_bonus: 1.0,
            stale_bonus: 0.5,
            recency_chapters: 3,
        }
    }
}

impl PriorityWeights {
    /// Score of a term that is live in the window but absent from the text.
    pub fn context_score(&self, term: &Term, current_chapter: Chapter) -> f64 {
        let usage = (f64::from(term.usage_count) / self.usage_divisor).min(self.usage_cap);
        let threshold = i64::from(current_chapter) - i64::from(self.recency_chapters);
        let recency = if i64::from(term.last_used) >= threshold {
            self.recent_bonus
        } else {
            self.stale_bonus
        };
        usage + recency
    }
}

/// Character details carried into the sub-glossary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterSummary {
    pub gender: Gender,
    pub relationships: Vec<String>,
    pub name: String,
    pub surname: String,
    pub korean_name: String,
    pub korean_family_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubGlossaryEntry {
    pub source_key: String,
    pub english: String,
    pub context: String,
    pub usage_count: u32,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character: Option<CharacterSummary>,
}

impl SubGlossaryEntry {
    fn from_term(source_key: &str, term: &Term, score: f64) -> Self {
        Self {
            source_key: source_key.to_string(),
            english: term.english.clone(),
            context: term.context.clone(),
            usage_count: term.usage_count,
            score,
            character: term.character.as_ref().map(|p| CharacterSummary {
                gender: p.gender,
                relationships: p.relationships.clone(),
                name: p.name.clone(),
                surname: p.surname.clone(),
                korean_name: p.korean_name.clone(),
                korean_family_name: p.korean_family_name.clone(),
            }),
        }
    }

    pub fn gender(&self) -> Gender {
        self.character.as_ref().map(|c| c.gender).unwrap_or_default()
    }
}

/// The per-chapter projection of the store shown to the translator.
/// Entries in each category are ordered by descending score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubGlossary {
    pub chapter: Chapter,
    categories: BTreeMap<Category, Vec<SubGlossaryEntry>>,
}

impl SubGlossary {
    pub fn empty(chapter: Chapter) -> Self {
        Self { chapter, categories: Category::ALL.into_iter().map(|c| (c, Vec::new())).collect() }
    }

    pub fn entries(&self, category: Category) -> &[SubGlossaryEntry] {
        self.categories.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, category: Category, source_key: &str) -> Option<&SubGlossaryEntry> {
        self.entries(category).iter().find(|e| e.source_key == source_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &[SubGlossaryEntry])> {
        self.categories.iter().map(|(c, v)| (*c, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Combines the scanner and the context window into a bounded glossary.
#[derive(Debug, Clone)]
pub struct SubGlossaryBuilder {
    window: ContextWindow,
    max_per_category: usize,
    weights: PriorityWeights,
}

impl Default for SubGlossaryBuilder {
    fn default() -> Self {
        Self {
            window: ContextWindow::default(),
            max_per_category: DEFAULT_MAX_PER_CATEGORY,
            weights: PriorityWeights::default(),
        }
    }
}

impl SubGlossaryBuilder {
    pub fn new(window: ContextWindow, max_per_category: usize, weights: PriorityWeights) -> Self {
        Self { window, max_per_category, weights }
    }

    pub fn with_max_per_category(mut self, max_per_category: usize) -> Self {
        self.max_per_category = max_per_category;
        self
    }

    pub fn build(&self, store: &TermStore, korean_text: &str, current_chapter: Chapter) -> SubGlossary {
        self.build_with_scanner(store, &ChapterScanner::new(store), korean_text, current_chapter)
    }

    /// Same as [`build`](Self::build) with a scanner the caller already built
    /// for this store state.
    pub fn build_with_scanner(
        &self,
        store: &TermStore,
        scanner: &ChapterScanner,
        korean_text: &str,
        current_chapter: Chapter,
    ) -> SubGlossary {
        let chapter_terms = scanner.scan(korean_text);
        let context_terms = self.window.select(store, current_chapter);
        let mut glossary = SubGlossary::empty(current_chapter);

        for category in Category::ALL {
            let (Some(live), Some(present)) =
                (context_terms.get(&category), chapter_terms.get(&category))
            else {
                continue;
            };

            // Present-and-live first, then live-only; both in key order so the
            // stable sort below breaks ties deterministically. Keys found in the
            // text but not live in the window are dropped.
            let mut candidates: Vec<(&str, &Term, f64)> = present
                .iter()
                .filter_map(|key| live.get_key_value(key.as_str()))
                .map(|(&key, &term)| (key, term, self.weights.present_score))
                .collect();
            candidates.extend(
                live.iter()
                    .filter(|(key, _)| !present.contains(**key))
                    .map(|(&key, &term)| {
                        (key, term, self.weights.context_score(term, current_chapter))
                    }),
            );

            candidates.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));
            candidates.truncate(self.max_per_category);

            if let Some(slot) = glossary.categories.get_mut(&category) {
                slot.extend(
                    candidates
                        .into_iter()
                        .map(|(key, term, score)| SubGlossaryEntry::from_term(key, term, score)),
                );
            }
        }
        glossary
    }
}
