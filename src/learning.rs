// File: src/learning.rs
use crate::core::scanner::ChapterScanner;
use crate::core::store::TermStore;
use crate::core::types::{Category, Chapter};
use crate::discovery::DiscoveredTerm;
use serde::Serialize;
use tracing::{debug, info, warn};

const GENERIC_CONTEXT_PREFIX: &str = "Discovered in Chapter";

/// What one ingestion pass changed. Keys are reported as `category/key`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestionReport {
    pub chapter: Chapter,
    pub added: Vec<String>,
    /// Usage updates from scanning the source text.
    pub usage_updates: usize,
    pub gender_filled: Vec<String>,
    pub context_replaced: Vec<String>,
    pub warnings: Vec<String>,
}

impl IngestionReport {
    pub fn changed_anything(&self) -> bool {
        self.usage_updates > 0
            || !self.added.is_empty()
            || !self.gender_filled.is_empty()
            || !self.context_replaced.is_empty()
    }
}

/// Placeholder contexts may be overwritten by a real description.
pub fn is_generic_context(context: &str) -> bool {
    let context = context.trim();
    context.is_empty() || context.starts_with(GENERIC_CONTEXT_PREFIX)
}

/// Learns from a finished chapter: bumps usage of known terms found in the
/// source text and merges the translator's newly discovered terms.
///
/// Existing entries are never renamed. Only missing facts are filled in: an
/// unknown gender, or a generic context.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermIngestor;

impl TermIngestor {
    pub fn new() -> Self {
        Self
    }

    pub fn ingest(
        &self,
        store: &mut TermStore,
        source_text: &str,
        translated_text: &str,
        discovered: &[DiscoveredTerm],
        chapter: Chapter,
    ) -> IngestionReport {
        let mut report = IngestionReport { chapter, ..Default::default() };

        let found = ChapterScanner::new(store).scan(source_text);
        for (category, keys) in &found {
            for key in keys {
                store.update_term_usage(key, *category, chapter);
                report.usage_updates += 1;
            }
        }

        let translated_lower = translated_text.to_lowercase();
        for term in discovered {
            if term.source_key.is_empty() || term.english.is_empty() {
                report.warnings.push(format!(
                    "Skipped malformed term entry: '{}' → '{}'",
                    term.source_key, term.english
                ));
                continue;
            }
            if !translated_lower.is_empty() && !translated_lower.contains(&term.english.to_lowercase()) {
                report.warnings.push(format!(
                    "Discovered term '{}' does not appear in the translation",
                    term.english
                ));
            }
            self.merge_one(store, term, chapter, &mut report);
        }

        store.advance_watermark(chapter);
        store.update_statistics();

        info!(
            chapter,
            added = report.added.len(),
            usage_updates = report.usage_updates,
            warnings = report.warnings.len(),
            "ingested chapter"
        );
        report
    }

    fn merge_one(
        &self,
        store: &mut TermStore,
        discovered: &DiscoveredTerm,
        chapter: Chapter,
        report: &mut IngestionReport,
    ) {
        let category = discovered.resolve_category();
        let label = format!("{category}/{}", discovered.source_key);

        if !store.contains(category, &discovered.source_key) {
            let context = if discovered.context.is_empty() {
                format!("{GENERIC_CONTEXT_PREFIX} {chapter}")
            } else {
                discovered.context.clone()
            };
            let gender = (category == Category::Characters).then_some(discovered.gender);
            store.add_term(
                &discovered.source_key,
                &discovered.english,
                category,
                chapter,
                &context,
                gender,
                None,
            );
            report.added.push(label);
            return;
        }
        let Some(existing) = store.get_mut(category, &discovered.source_key) else {
            return;
        };

        if existing.english != discovered.english {
            debug!(
                key = %discovered.source_key,
                stored = %existing.english,
                offered = %discovered.english,
                "keeping stored translation"
            );
        }

        if let Some(profile) = existing.character.as_mut() {
            if !profile.gender.is_known() && discovered.gender.is_known() {
                profile.gender = discovered.gender;
                info!(key = %discovered.source_key, gender = %discovered.gender, "filled in gender");
                report.gender_filled.push(label.clone());
            } else if profile.gender.is_known()
                && discovered.gender.is_known()
                && profile.gender != discovered.gender
            {
                warn!(
                    key = %discovered.source_key,
                    stored = %profile.gender,
                    offered = %discovered.gender,
                    "conflicting gender ignored"
                );
            }
        }

        if is_generic_context(&existing.context) && !is_generic_context(&discovered.context) {
            existing.context = discovered.context.clone();
            report.context_replaced.push(label);
        }
    }
}
