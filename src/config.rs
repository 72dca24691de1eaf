// File: src/config.rs
//! Configuration with deep merge and environment overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`GlossaryConfig::default()`]
//! 2. If the config file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate

use crate::core::context::ContextWindow;
use crate::core::subglossary::{PriorityWeights, SubGlossaryBuilder, DEFAULT_MAX_PER_CATEGORY};
use crate::core::types::Chapter;
use crate::error::{GlossaryError, Result};
use crate::persistence::read_if_exists;
use crate::validation::{ConsistencyValidator, TranslationValidator, DEFAULT_PRONOUN_WINDOW};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "glossary_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub glossary_file: PathBuf,
    pub progress_file: PathBuf,
    pub backup_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let base = PathBuf::from("data").join("glossaries");
        Self {
            glossary_file: base.join("translation_glossary.json"),
            progress_file: base.join("translation_progress.json"),
            backup_dir: base.join("backups"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlossarySettings {
    pub max_terms_per_category: usize,
    /// Lookback window in chapters.
    pub context_chapters: Chapter,
    /// Sentences searched after a name for a mismatched pronoun; 0 = to end of text.
    pub pronoun_window_sentences: usize,
    pub priority: PriorityWeights,
}

impl Default for GlossarySettings {
    fn default() -> Self {
        Self {
            max_terms_per_category: DEFAULT_MAX_PER_CATEGORY,
            context_chapters: 10,
            pronoun_window_sentences: DEFAULT_PRONOUN_WINDOW,
            priority: PriorityWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySettings {
    pub minimum_translation_ratio: f64,
    pub maximum_translation_ratio: f64,
    pub minimum_content_words: usize,
    pub detect_untranslated: bool,
    pub placeholder_detection: bool,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            minimum_translation_ratio: 0.5,
            maximum_translation_ratio: 3.0,
            minimum_content_words: 5,
            detect_untranslated: true,
            placeholder_detection: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlossaryConfig {
    pub paths: PathsConfig,
    pub glossary: GlossarySettings,
    pub quality: QualitySettings,
    /// Chapters in the source novel, for progress percentages.
    pub total_chapters: Chapter,
}

impl Default for GlossaryConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            glossary: GlossarySettings::default(),
            quality: QualitySettings::default(),
            total_chapters: 1277,
        }
    }
}

impl GlossaryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.glossary.max_terms_per_category == 0 {
            return Err(GlossaryError::InvalidConfig(
                "glossary.max_terms_per_category must be greater than 0".into(),
            ));
        }
        let q = &self.quality;
        if q.minimum_translation_ratio < 0.0 || q.minimum_translation_ratio > q.maximum_translation_ratio {
            return Err(GlossaryError::InvalidConfig(format!(
                "quality ratio bounds are inverted: {} > {}",
                q.minimum_translation_ratio, q.maximum_translation_ratio
            )));
        }
        if self.glossary.priority.usage_divisor <= 0.0 {
            return Err(GlossaryError::InvalidConfig(
                "glossary.priority.usage_divisor must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn sub_glossary_builder(&self) -> SubGlossaryBuilder {
        SubGlossaryBuilder::new(
            ContextWindow::new(self.glossary.context_chapters),
            self.glossary.max_terms_per_category,
            self.glossary.priority,
        )
    }

    pub fn consistency_validator(&self) -> ConsistencyValidator {
        let window = self.glossary.pronoun_window_sentences;
        ConsistencyValidator::new((window > 0).then_some(window))
    }

    pub fn translation_validator(&self) -> TranslationValidator {
        TranslationValidator::new(self.quality.clone(), self.consistency_validator())
    }
}

/// Load config from the default file name in the working directory.
pub fn load_config() -> Result<GlossaryConfig> {
    load_config_from_path(Path::new(DEFAULT_CONFIG_FILE))
}

/// Load config from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. Invalid JSON is an error.
pub fn load_config_from_path(path: &Path) -> Result<GlossaryConfig> {
    let defaults = serde_json::to_value(GlossaryConfig::default())?;

    let merged = match read_if_exists(path)? {
        Some(content) => {
            debug!(path = %path.display(), "loading config from file");
            let user: Value = serde_json::from_str(&content)?;
            deep_merge(defaults, user)
        }
        None => {
            debug!(path = %path.display(), "config file not found, using defaults");
            defaults
        }
    };

    let mut config: GlossaryConfig = serde_json::from_value(merged)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Applies environment overrides. Values that fail to parse or fall outside
/// their range are ignored.
pub fn apply_env_overrides(config: &mut GlossaryConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("GLOSSARY_FILE").filter(|v| !v.trim().is_empty()) {
        config.paths.glossary_file = PathBuf::from(v);
    }
    if let Some(v) = read_ranged(&env, "GLOSSARY_MAX_TERMS", 1, 500) {
        config.glossary.max_terms_per_category = v as usize;
    }
    if let Some(v) = read_ranged(&env, "GLOSSARY_CONTEXT_CHAPTERS", 0, 10_000) {
        config.glossary.context_chapters = v as Chapter;
    }
}

fn read_ranged(env: &impl Fn(&str) -> Option<String>, key: &str, min: u64, max: u64) -> Option<u64> {
    env(key)?.trim().parse::<u64>().ok().filter(|v| (min..=max).contains(v))
}
