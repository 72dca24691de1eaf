// File: src/core/engine.rs
use crate::config::GlossaryConfig;
use crate::core::scanner::{CategorySets, ChapterScanner};
use crate::core::store::TermStore;
use crate::core::subglossary::SubGlossary;
use crate::core::types::Chapter;
use crate::dedup::{DedupMode, DedupReport, Deduplicator};
use crate::discovery::{parse_response, DiscoveredTerm};
use crate::error::Result;
use crate::learning::{IngestionReport, TermIngestor};
use crate::persistence::write_text_atomic;
use crate::render::{export_readable, render_for_prompt};
use crate::validation::ValidationReport;
use std::path::{Path, PathBuf};
use tracing::info;

/// Owns the store together with its configuration and location.
///
/// Every mutating call that completes a unit of work (ingestion, applied
/// deduplication) saves the store before returning.
pub struct GlossaryEngine {
    store: TermStore,
    config: GlossaryConfig,
    store_path: PathBuf,
    /// Rebuilt lazily after the store changes.
    scanner: Option<ChapterScanner>,
    ingestor: TermIngestor,
}

impl GlossaryEngine {
    /// Loads the store named by `config.paths.glossary_file`.
    pub fn open(config: GlossaryConfig) -> Result<Self> {
        let store_path = config.paths.glossary_file.clone();
        let store = TermStore::load(&store_path)?;
        Ok(Self::from_store(store, config, store_path))
    }

    pub fn from_store(store: TermStore, config: GlossaryConfig, store_path: PathBuf) -> Self {
        Self { store, config, store_path, scanner: None, ingestor: TermIngestor::new() }
    }

    pub fn store(&self) -> &TermStore {
        &self.store
    }

    /// Direct access for manual edits. Call [`save`](Self::save) afterwards.
    pub fn store_mut(&mut self) -> &mut TermStore {
        self.scanner = None;
        &mut self.store
    }

    pub fn config(&self) -> &GlossaryConfig {
        &self.config
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    fn scanner(&mut self) -> &ChapterScanner {
        self.scanner.get_or_insert_with(|| ChapterScanner::new(&self.store))
    }

    pub fn generate_sub_glossary(&mut self, korean_text: &str, chapter: Chapter) -> SubGlossary {
        let builder = self.config.sub_glossary_builder();
        let sub = {
            let scanner = self.scanner.get_or_insert_with(|| ChapterScanner::new(&self.store));
            builder.build_with_scanner(&self.store, scanner, korean_text, chapter)
        };
        info!(chapter, terms = sub.len(), "generated sub-glossary");
        sub
    }

    /// The sub-glossary rendered as the prompt block.
    pub fn prompt_glossary(&mut self, korean_text: &str, chapter: Chapter) -> String {
        render_for_prompt(&self.generate_sub_glossary(korean_text, chapter))
    }

    pub fn validate_consistency(&self, translated_text: &str, sub_glossary: &SubGlossary) -> Vec<String> {
        self.config.consistency_validator().validate(translated_text, sub_glossary)
    }

    /// Quality gate against the sub-glossary the chapter was translated with.
    pub fn validate_translation(&mut self, translated: &str, source: &str, chapter: Chapter) -> ValidationReport {
        let sub = self.generate_sub_glossary(source, chapter);
        self.config.translation_validator().validate(translated, source, &sub)
    }

    pub fn ingest(
        &mut self,
        source_text: &str,
        translated_text: &str,
        discovered: &[DiscoveredTerm],
        chapter: Chapter,
    ) -> Result<IngestionReport> {
        let report = self.ingestor.ingest(&mut self.store, source_text, translated_text, discovered, chapter);
        self.scanner = None;
        self.save()?;
        Ok(report)
    }

    /// Parses the discovered-terms section of a raw translator response and
    /// ingests it. Parser warnings come first in the report.
    pub fn ingest_response(
        &mut self,
        response: &str,
        source_text: &str,
        translated_text: &str,
        chapter: Chapter,
    ) -> Result<IngestionReport> {
        let parsed = parse_response(response);
        let mut report = self.ingest(source_text, translated_text, &parsed.terms, chapter)?;
        let mut warnings = parsed.warnings;
        warnings.append(&mut report.warnings);
        report.warnings = warnings;
        Ok(report)
    }

    pub fn deduplicate(&mut self, mode: DedupMode) -> Result<DedupReport> {
        let report = Deduplicator::new(&self.config.paths.backup_dir).run(&mut self.store, mode)?;
        if report.removed > 0 {
            self.scanner = None;
            self.save()?;
        }
        Ok(report)
    }

    pub fn save(&mut self) -> Result<()> {
        self.store.save(&self.store_path)
    }

    /// Writes the markdown listing of the store to `path`.
    pub fn export_readable(&self, path: &Path) -> Result<()> {
        write_text_atomic(&export_readable(&self.store), path)?;
        info!(path = %path.display(), "exported readable glossary");
        Ok(())
    }

    /// Known terms found in `korean_text`, without building a glossary.
    pub fn scan(&mut self, korean_text: &str) -> CategorySets {
        self.scanner().scan(korean_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Category, Gender};

    fn engine_in(dir: &Path) -> GlossaryEngine {
        let mut config = GlossaryConfig::default();
        config.paths.glossary_file = dir.join("translation_glossary.json");
        config.paths.backup_dir = dir.join("backups");
        GlossaryEngine::open(config).unwrap()
    }

    #[test]
    fn ingest_persists_and_refreshes_scanner() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        assert!(engine.scan("시로네")[&Category::Characters].is_empty());

        let shirone = DiscoveredTerm::new("시로네", "Shirone", "character", "protagonist")
            .with_gender(Gender::Male);
        engine.ingest("시로네", "Shirone", &[shirone], 1).unwrap();

        assert!(engine.scan("시로네")[&Category::Characters].contains("시로네"));
        let reloaded = TermStore::load(engine.store_path()).unwrap();
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn ingest_response_merges_parser_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        let response = "NEW_TERMS_DISCOVERED:\n- 광구 → photon sphere (category: magic_term)\nnot a term\n";
        let report = engine.ingest_response(response, "광구", "a photon sphere", 2).unwrap();
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.warnings, vec!["Could not parse term entry: not a term".to_string()]);
    }

    #[test]
    fn export_writes_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_in(dir.path());
        engine.store_mut().add_term("광구", "photon sphere", Category::MagicTerms, 1, "", None, None);
        let out = dir.path().join("readable_glossary.md");
        engine.export_readable(&out).unwrap();
        assert!(std::fs::read_to_string(out).unwrap().contains("photon sphere"));
    }
}
