// File: src/core/store.rs
use crate::core::types::{
    Category, Chapter, CharacterProfile, Gender, MostUsedTerm, StoreMetadata, StoreStatistics,
    Term,
};
use crate::error::{GlossaryError, Result};
use crate::persistence::{read_if_exists, save_json_atomic};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Terms of one category, keyed by Korean source text.
pub type TermMap = BTreeMap<String, Term>;

/// The master glossary: six category maps plus a metadata envelope.
///
/// Serializes directly to the persisted document shape, so a store written by
/// older tooling (missing metadata or categories) loads with defaults filled in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermStore {
    #[serde(default)]
    pub metadata: StoreMetadata,
    #[serde(default)]
    characters: TermMap,
    #[serde(default)]
    places: TermMap,
    #[serde(default)]
    magic_terms: TermMap,
    #[serde(default)]
    organizations: TermMap,
    #[serde(default)]
    items: TermMap,
    #[serde(default)]
    concepts: TermMap,
}

impl TermStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the store from `path`. A missing file is "no data yet" and yields
    /// an empty store; a file that fails to parse is a [`GlossaryError::StoreLoad`].
    pub fn load(path: &Path) -> Result<Self> {
        let Some(content) = read_if_exists(path)? else {
            info!(path = %path.display(), "no glossary yet, starting empty");
            return Ok(Self::new());
        };
        let mut store: TermStore = serde_json::from_str(&content).map_err(|source| {
            GlossaryError::StoreLoad { path: path.to_path_buf(), source }
        })?;
        store.normalize();
        info!(
            path = %path.display(),
            terms = store.len(),
            chapters = store.metadata.total_chapters_processed,
            "loaded glossary"
        );
        Ok(store)
    }

    /// Writes the whole store, stamping `last_updated`.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.metadata.last_updated = Some(Local::now().naive_local());
        save_json_atomic(self, path)?;
        debug!(path = %path.display(), terms = self.len(), "saved glossary");
        Ok(())
    }

    /// Repairs records edited by hand: unsorted chapter lists, stale
    /// `last_used`, characters with a missing or partial profile block.
    fn normalize(&mut self) {
        for category in Category::ALL {
            for (key, term) in self.terms_mut(category).iter_mut() {
                term.category = category;
                term.chapters_used.sort_unstable();
                term.chapters_used.dedup();
                if let Some(&last) = term.chapters_used.last() {
                    term.last_used = last;
                }
                if category != Category::Characters {
                    term.character = None;
                    continue;
                }
                let profile = term.character.get_or_insert_with(CharacterProfile::default);
                fill_profile(profile, key, &term.english);
            }
        }
    }

    pub fn terms(&self, category: Category) -> &TermMap {
        match category {
            Category::Characters => &self.characters,
            Category::Places => &self.places,
            Category::MagicTerms => &self.magic_terms,
            Category::Organizations => &self.organizations,
            Category::Items => &self.items,
            Category::Concepts => &self.concepts,
        }
    }

    pub fn terms_mut(&mut self, category: Category) -> &mut TermMap {
        match category {
            Category::Characters => &mut self.characters,
            Category::Places => &mut self.places,
            Category::MagicTerms => &mut self.magic_terms,
            Category::Organizations => &mut self.organizations,
            Category::Items => &mut self.items,
            Category::Concepts => &mut self.concepts,
        }
    }

    pub fn get(&self, category: Category, source_key: &str) -> Option<&Term> {
        self.terms(category).get(source_key)
    }

    pub fn get_mut(&mut self, category: Category, source_key: &str) -> Option<&mut Term> {
        self.terms_mut(category).get_mut(source_key)
    }

    pub fn contains(&self, category: Category, source_key: &str) -> bool {
        self.terms(category).contains_key(source_key)
    }

    /// Total number of terms across all categories.
    pub fn len(&self) -> usize {
        Category::ALL.iter().map(|&c| self.terms(c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates `(category, key, term)` in canonical category order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &String, &Term)> {
        Category::ALL
            .into_iter()
            .flat_map(move |c| self.terms(c).iter().map(move |(k, t)| (c, k, t)))
    }

    /// Inserts a new term. An existing entry under the same key is replaced
    /// wholesale, usage history included.
    #[allow(clippy::too_many_arguments)]
    pub fn add_term(
        &mut self,
        source_key: &str,
        english: &str,
        category: Category,
        chapter: Chapter,
        context: &str,
        gender: Option<Gender>,
        relationships: Option<Vec<String>>,
    ) {
        let mut term = Term::new(english, category, chapter, context);
        if category == Category::Characters {
            let mut profile =
                CharacterProfile::from_english(source_key, english, gender.unwrap_or_default());
            profile.relationships = relationships.unwrap_or_default();
            term.character = Some(profile);
        }
        self.insert_term(source_key, term);
    }

    /// Inserts a character whose name parts are known separately in both
    /// languages. The English full name is written family-name first.
    #[allow(clippy::too_many_arguments)]
    pub fn add_character_with_parts(
        &mut self,
        korean_full_name: &str,
        english_family_name: &str,
        english_given_name: &str,
        korean_family_name: &str,
        korean_given_name: &str,
        chapter: Chapter,
        context: &str,
        gender: Gender,
        relationships: Vec<String>,
    ) {
        let english_full = join_name(english_family_name, english_given_name);
        let mut term = Term::new(&english_full, Category::Characters, chapter, context);
        term.character = Some(CharacterProfile {
            name: english_given_name.to_string(),
            surname: english_family_name.to_string(),
            korean_name: korean_given_name.to_string(),
            korean_family_name: korean_family_name.to_string(),
            korean_full_name: korean_full_name.to_string(),
            english_full_name: english_full,
            gender,
            relationships,
            aliases: Vec::new(),
            titles: Vec::new(),
        });
        self.insert_term(korean_full_name, term);
    }

    fn insert_term(&mut self, source_key: &str, term: Term) {
        let category = term.category;
        if let Some(old) = self.terms_mut(category).insert(source_key.to_string(), term) {
            warn!(
                key = source_key,
                %category,
                lost_usage = old.usage_count,
                "add_term replaced an existing entry"
            );
        } else {
            debug!(key = source_key, %category, "added term");
        }
    }

    /// Edits the name parts of an existing character and recomputes its full
    /// English name. Returns `false` when the key is unknown.
    pub fn update_character_name(
        &mut self,
        korean_full_name: &str,
        name: Option<&str>,
        surname: Option<&str>,
        korean_name: Option<&str>,
        korean_family_name: Option<&str>,
    ) -> bool {
        let Some(term) = self.characters.get_mut(korean_full_name) else {
            warn!(key = korean_full_name, "character not found");
            return false;
        };
        let english = term.english.clone();
        let profile = term.character.get_or_insert_with(|| {
            CharacterProfile::from_english(korean_full_name, &english, Gender::Unknown)
        });
        if let Some(v) = name {
            profile.name = v.to_string();
        }
        if let Some(v) = surname {
            profile.surname = v.to_string();
        }
        if let Some(v) = korean_name {
            profile.korean_name = v.to_string();
        }
        if let Some(v) = korean_family_name {
            profile.korean_family_name = v.to_string();
        }
        if !profile.name.is_empty() {
            let full = join_name(&profile.surname, &profile.name);
            profile.english_full_name = full.clone();
            term.english = full;
        }
        true
    }

    /// Records one more mention of a known term. Unknown keys are ignored:
    /// scanning is best effort.
    pub fn update_term_usage(&mut self, source_key: &str, category: Category, chapter: Chapter) {
        if let Some(term) = self.get_mut(category, source_key) {
            term.record_usage(chapter);
        }
    }

    pub fn total_chapters_processed(&self) -> Chapter {
        self.metadata.total_chapters_processed
    }

    /// Moves the processed-chapters watermark forward, never back.
    pub fn advance_watermark(&mut self, chapter: Chapter) {
        let current = &mut self.metadata.total_chapters_processed;
        *current = (*current).max(chapter);
    }

    /// Recomputes per-category counts and most-used terms.
    pub fn update_statistics(&mut self) {
        let mut stats = StoreStatistics::default();
        for category in Category::ALL {
            let terms = self.terms(category);
            stats.terms_by_category.insert(category, terms.len());
            stats.total_terms += terms.len();
            // First maximum wins on ties, in key order.
            let most_used = terms.iter().fold(None::<(&String, &Term)>, |best, (k, t)| match best {
                Some((_, b)) if b.usage_count >= t.usage_count => best,
                _ => Some((k, t)),
            });
            if let Some((key, term)) = most_used {
                stats.most_used_terms.insert(
                    category,
                    MostUsedTerm {
                        term: key.clone(),
                        english: term.english.clone(),
                        usage_count: term.usage_count,
                    },
                );
            }
        }
        self.metadata.statistics = stats;
    }

    pub fn statistics(&self) -> &StoreStatistics {
        &self.metadata.statistics
    }
}

/// Fills the name fields an older record left out. Gender, relationships and
/// anything already set are left alone.
fn fill_profile(profile: &mut CharacterProfile, key: &str, english: &str) {
    if profile.korean_full_name.is_empty() {
        profile.korean_full_name = key.to_string();
    }
    if profile.english_full_name.is_empty() {
        profile.english_full_name = english.to_string();
    }
    if profile.name.is_empty() && profile.surname.is_empty() {
        let split = CharacterProfile::from_english(key, english, profile.gender);
        profile.name = split.name;
        profile.surname = split.surname;
    }
}

fn join_name(family: &str, given: &str) -> String {
    if family.trim().is_empty() {
        given.to_string()
    } else {
        format!("{family} {given}")
    }
}
