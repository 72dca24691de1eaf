// File: src/core/context.rs
use crate::core::store::TermStore;
use crate::core::types::{Category, Chapter, Term};
use std::collections::BTreeMap;

pub const DEFAULT_LOOKBACK: Chapter = 10;

/// Terms live in the recent window, per category.
pub type ContextTerms<'a> = BTreeMap<Category, BTreeMap<&'a str, &'a Term>>;

/// Decides which terms are still "live" for a chapter: those used at least
/// once in the last `lookback` chapters (inclusive of the current one).
#[derive(Debug, Clone, Copy)]
pub struct ContextWindow {
    lookback: Chapter,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKBACK)
    }
}

impl ContextWindow {
    pub fn new(lookback: Chapter) -> Self {
        Self { lookback }
    }

    /// Inclusive chapter range `[max(1, current - lookback), current]`.
    pub fn range(&self, current_chapter: Chapter) -> (Chapter, Chapter) {
        let min = current_chapter.saturating_sub(self.lookback).max(1);
        (min, current_chapter)
    }

    /// O(T log C): each term's sorted chapter list is binary searched.
    pub fn select<'a>(&self, store: &'a TermStore, current_chapter: Chapter) -> ContextTerms<'a> {
        let (min, max) = self.range(current_chapter);
        Category::ALL
            .into_iter()
            .map(|category| {
                let live = store
                    .terms(category)
                    .iter()
                    .filter(|(_, term)| term.used_between(min, max))
                    .map(|(key, term)| (key.as_str(), term))
                    .collect();
                (category, live)
            })
            .collect()
    }
}
