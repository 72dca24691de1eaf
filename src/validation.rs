// File: src/validation.rs
//! Consistency and quality checks run on a finished translation.
//!
//! Nothing here returns an error. Problems are collected into a
//! [`ValidationReport`]; only critical ones (unprocessed template placeholders,
//! near-empty output) flip `success` to `false` and block saving the chapter.

use crate::config::QualitySettings;
use crate::core::subglossary::SubGlossary;
use crate::core::types::{Category, Gender};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{debug, warn};

pub const DEFAULT_PRONOUN_WINDOW: usize = 2;

static FEMININE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(she|her|hers)\b").expect("static regex"));
static MASCULINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(he|him|his)\b").expect("static regex"));
static HANGUL_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[가-힣]+").expect("static regex"));
static CRITICAL_PLACEHOLDERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\[English chapter title here\]",
        r"(?i)\[Your excellent English translation here.*?\]",
        r"(?i)\[[^\]]*?chapter title[^\]]*?\]",
        r"(?i)\[[^\]]*?translation[^\]]*?here[^\]]*?\]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});
static ANY_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[.*?\]|\{.*?\}|TODO|PLACEHOLDER|XXX").expect("static regex")
});

/// Flags characters referred to with pronouns of the other gender.
///
/// A name match only inspects the text that follows it up to the end of the
/// `pronoun_window`-th sentence (the name's own sentence counts as the first).
/// `None` searches to the end of the text.
#[derive(Debug, Clone, Copy)]
pub struct ConsistencyValidator {
    pronoun_window: Option<usize>,
}

impl Default for ConsistencyValidator {
    fn default() -> Self {
        Self::new(Some(DEFAULT_PRONOUN_WINDOW))
    }
}

impl ConsistencyValidator {
    pub fn new(pronoun_window: Option<usize>) -> Self {
        Self { pronoun_window }
    }

    pub fn validate(&self, translated_text: &str, sub_glossary: &SubGlossary) -> Vec<String> {
        let lowered = translated_text.to_lowercase();
        let mut issues = Vec::new();

        for entry in sub_glossary.entries(Category::Characters) {
            let name = entry.english.trim();
            if name.is_empty() || !lowered.contains(&name.to_lowercase()) {
                continue;
            }
            let (pronouns, wrong) = match entry.gender() {
                Gender::Male => (&*FEMININE, "she/her"),
                Gender::Female => (&*MASCULINE, "he/him"),
                Gender::Unknown => continue,
            };
            let name_re = match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name))) {
                Ok(re) => re,
                Err(e) => {
                    warn!(name, error = %e, "skipping gender check");
                    continue;
                }
            };
            let mismatch = name_re
                .find_iter(translated_text)
                .any(|m| pronouns.is_match(self.window_after(translated_text, m.end())));
            if mismatch {
                issues.push(format!(
                    "Gender inconsistency: {name} ({}) referred to as '{wrong}'",
                    entry.gender()
                ));
            }
        }
        issues
    }

    fn window_after<'t>(&self, text: &'t str, start: usize) -> &'t str {
        let rest = &text[start..];
        let Some(limit) = self.pronoun_window else {
            return rest;
        };
        let limit = limit.max(1);
        let mut seen = 0;
        let mut prev_terminal = false;
        for (i, ch) in rest.char_indices() {
            let terminal = matches!(ch, '.' | '!' | '?' | '\n');
            // "..." and "?!" end one sentence, not three.
            if terminal && !prev_terminal {
                seen += 1;
            }
            if !terminal && prev_terminal && seen >= limit {
                return &rest[..i];
            }
            prev_terminal = terminal;
        }
        rest
    }
}

/// Outcome of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub success: bool,
    /// Blocking problems. The chapter must be retried.
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn new() -> Self {
        Self { success: true, ..Default::default() }
    }

    fn critical(&mut self, message: String) {
        self.success = false;
        self.errors.push(format!("CRITICAL: {message}"));
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Quality gate for a whole chapter translation.
#[derive(Debug, Clone)]
pub struct TranslationValidator {
    settings: QualitySettings,
    consistency: ConsistencyValidator,
}

impl TranslationValidator {
    pub fn new(settings: QualitySettings, consistency: ConsistencyValidator) -> Self {
        Self { settings, consistency }
    }

    pub fn validate(&self, translated: &str, source: &str, sub_glossary: &SubGlossary) -> ValidationReport {
        let mut report = ValidationReport::new();

        if self.settings.detect_untranslated {
            let runs: Vec<&str> = HANGUL_RUN.find_iter(translated).map(|m| m.as_str()).take(5).collect();
            if !runs.is_empty() {
                report.warn(format!("Found untranslated Korean text: {}", runs.join(", ")));
            }
        }

        if self.settings.placeholder_detection {
            let mut critical: Vec<&str> = Vec::new();
            for pattern in CRITICAL_PLACEHOLDERS.iter() {
                if let Some(m) = pattern.find(translated) {
                    if !critical.contains(&m.as_str()) {
                        critical.push(m.as_str());
                    }
                }
            }
            if !critical.is_empty() {
                critical.truncate(3);
                report.critical(format!(
                    "Translation contains unprocessed placeholders: {}",
                    critical.join(", ")
                ));
            } else {
                let generic: Vec<&str> =
                    ANY_PLACEHOLDER.find_iter(translated).map(|m| m.as_str()).take(3).collect();
                if !generic.is_empty() {
                    report.warn(format!("Found placeholder text: {}", generic.join(", ")));
                }
            }
        }

        let content_words = translated.split_whitespace().filter(|w| !w.starts_with('[')).count();
        if content_words < self.settings.minimum_content_words {
            report.critical("Translation appears to be empty or contains minimal content".into());
        }

        let source_len = source.trim().chars().count() as f64;
        let translated_len = translated.trim().chars().count() as f64;
        if source_len > 0.0 {
            if translated_len < source_len * self.settings.minimum_translation_ratio {
                report.warn("Translation appears too short compared to original".into());
            } else if translated_len > source_len * self.settings.maximum_translation_ratio {
                report.warn("Translation appears too long compared to original".into());
            }
        }

        for issue in self.consistency.validate(translated, sub_glossary) {
            report.warn(issue);
        }

        if report.success {
            debug!(warnings = report.warnings.len(), "translation passed validation");
        } else {
            warn!(errors = ?report.errors, "translation rejected");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::TermStore;
    use crate::core::subglossary::SubGlossaryBuilder;

    fn glossary_with(gender: Gender) -> SubGlossary {
        let mut store = TermStore::new();
        store.add_term("시로네", "Shirone", Category::Characters, 1, "", Some(gender), None);
        SubGlossaryBuilder::default().build(&store, "시로네", 1)
    }

    #[test]
    fn flags_feminine_pronoun_for_male_character() {
        let issues = ConsistencyValidator::default()
            .validate("Shirone smiled. She walked away.", &glossary_with(Gender::Male));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("Gender inconsistency"));
    }

    #[test]
    fn accepts_matching_pronoun() {
        let issues = ConsistencyValidator::default()
            .validate("Shirone smiled. He walked away.", &glossary_with(Gender::Male));
        assert!(issues.is_empty());
    }

    #[test]
    fn flags_masculine_pronoun_for_female_character() {
        let issues = ConsistencyValidator::default()
            .validate("shirone nodded, and his voice shook.", &glossary_with(Gender::Female));
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn unknown_gender_is_not_checked() {
        let issues = ConsistencyValidator::default()
            .validate("Shirone smiled. She walked away.", &glossary_with(Gender::Unknown));
        assert!(issues.is_empty());
    }

    #[test]
    fn window_ignores_distant_pronouns() {
        let text = "Shirone smiled. The wind blew. The door opened. She walked in.";
        let glossary = glossary_with(Gender::Male);
        assert!(ConsistencyValidator::default().validate(text, &glossary).is_empty());
        assert_eq!(ConsistencyValidator::new(None).validate(text, &glossary).len(), 1);
    }

    #[test]
    fn ellipsis_counts_as_one_sentence_end() {
        let text = "Shirone hesitated... She was gone.";
        assert_eq!(ConsistencyValidator::default().validate(text, &glossary_with(Gender::Male)).len(), 1);
    }

    #[test]
    fn pronoun_inside_word_is_ignored() {
        let issues = ConsistencyValidator::default()
            .validate("Shirone saw the shepherd. Then he left.", &glossary_with(Gender::Male));
        assert!(issues.is_empty());
    }

    fn gate() -> TranslationValidator {
        TranslationValidator::new(QualitySettings::default(), ConsistencyValidator::default())
    }

    #[test]
    fn placeholder_is_critical() {
        let text = "[English chapter title here] Shirone walked to the academy and studied magic.";
        let report = gate().validate(text, "", &SubGlossary::empty(1));
        assert!(!report.success);
        assert!(report.errors[0].starts_with("CRITICAL:"));
    }

    #[test]
    fn near_empty_output_is_critical() {
        let report = gate().validate("Shirone.", "", &SubGlossary::empty(1));
        assert!(!report.success);
    }

    #[test]
    fn length_ratio_is_only_a_warning() {
        let source = "가".repeat(200);
        let report = gate().validate("Shirone walked to the academy today.", &source, &SubGlossary::empty(1));
        assert!(report.success);
        assert!(report.warnings.iter().any(|w| w.contains("too short")));
    }

    #[test]
    fn untranslated_hangul_and_gender_are_warnings() {
        let report = gate().validate(
            "Shirone smiled at 알페아스. She walked away from the gate.",
            "시로네는 웃었다.",
            &glossary_with(Gender::Male),
        );
        assert!(report.success);
        assert!(report.warnings.iter().any(|w| w.contains("알페아스")));
        assert!(report.warnings.iter().any(|w| w.contains("Gender inconsistency")));
    }

    #[test]
    fn clean_translation_passes() {
        let text = "Shirone smiled. He walked toward the old academy gate.";
        let report = gate().validate(text, "시로네는 웃었다. 그는 오래된 학교 문으로 걸어갔다.", &glossary_with(Gender::Male));
        assert!(report.success);
        assert!(report.is_clean(), "{report:?}");
    }
}
