// src/core/types.rs
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A chapter number. Chapters are numbered from 1.
pub type Chapter = u32;

/// Schema version written into the metadata envelope.
pub const STORE_VERSION: &str = "2.0";

/// The six fixed term classes. Declaration order is the canonical order used
/// for iteration, rendering and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Characters,
    Places,
    MagicTerms,
    Organizations,
    Items,
    Concepts,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Characters,
        Category::Places,
        Category::MagicTerms,
        Category::Organizations,
        Category::Items,
        Category::Concepts,
    ];

    /// Key used in the persisted document.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Characters => "characters",
            Category::Places => "places",
            Category::MagicTerms => "magic_terms",
            Category::Organizations => "organizations",
            Category::Items => "items",
            Category::Concepts => "concepts",
        }
    }

    /// Title-cased heading, e.g. "Magic Terms".
    pub fn display_name(self) -> &'static str {
        match self {
            Category::Characters => "Characters",
            Category::Places => "Places",
            Category::MagicTerms => "Magic Terms",
            Category::Organizations => "Organizations",
            Category::Items => "Items",
            Category::Concepts => "Concepts",
        }
    }

    /// Normalizes a free-form category label as reported by the translator.
    /// Returns `None` for labels that need the detection cascade.
    pub fn from_label(label: &str) -> Option<Category> {
        match label.trim().to_lowercase().as_str() {
            "character" | "characters" | "person" | "people" => Some(Category::Characters),
            "place" | "places" | "location" | "area" => Some(Category::Places),
            "magic" | "magic_term" | "magic_terms" | "magic-term" | "spell" | "technique" => {
                Some(Category::MagicTerms)
            }
            "organization" | "organizations" | "org" | "family" | "gang" => {
                Some(Category::Organizations)
            }
            "item" | "items" | "weapon" | "tool" => Some(Category::Items),
            "concept" | "concepts" => Some(Category::Concepts),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gender of a character. Anything unrecognized on disk reads as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    /// Parses gender words the translator tends to use ("boy", "woman", ...).
    pub fn parse(word: &str) -> Gender {
        match word.trim().to_lowercase().as_str() {
            "male" | "boy" | "man" => Gender::Male,
            "female" | "girl" | "woman" => Gender::Female,
            _ => Gender::Unknown,
        }
    }

    pub fn is_known(self) -> bool {
        self != Gender::Unknown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        }
    }
}

impl From<String> for Gender {
    fn from(s: String) -> Self {
        Gender::parse(&s)
    }
}

impl From<Gender> for String {
    fn from(g: Gender) -> Self {
        g.as_str().to_string()
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Character-only extension of a [`Term`]. Every field may be absent on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterProfile {
    /// Given name in English.
    #[serde(default)]
    pub name: String,
    /// Family name in English.
    #[serde(default)]
    pub surname: String,
    /// Given name in Korean, used by the scanner for partial-name hits.
    #[serde(default)]
    pub korean_name: String,
    #[serde(default)]
    pub korean_family_name: String,
    #[serde(default)]
    pub korean_full_name: String,
    #[serde(default)]
    pub english_full_name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub relationships: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub titles: Vec<String>,
}

impl CharacterProfile {
    /// Splits an English full name into given name (first token) and family
    /// name (remaining tokens).
    pub fn from_english(korean_full_name: &str, english: &str, gender: Gender) -> Self {
        let mut parts = english.split_whitespace();
        let name = parts.next().unwrap_or(english).to_string();
        let surname = parts.collect::<Vec<_>>().join(" ");
        Self {
            name,
            surname,
            korean_name: String::new(),
            korean_family_name: String::new(),
            korean_full_name: korean_full_name.to_string(),
            english_full_name: english.to_string(),
            gender,
            relationships: Vec::new(),
            aliases: Vec::new(),
            titles: Vec::new(),
        }
    }

    pub fn has_family_name(&self) -> bool {
        !self.surname.trim().is_empty()
    }
}

/// One glossary entry. This is the "value" of the term store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TermRecord")]
pub struct Term {
    pub english: String,
    pub category: Category,
    pub first_appearance: Chapter,
    /// Raw mention count, bumped once per usage update.
    pub usage_count: u32,
    /// Distinct chapters, ascending, no duplicates.
    pub chapters_used: Vec<Chapter>,
    pub last_used: Chapter,
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_date: Option<NaiveDateTime>,
    #[serde(flatten)]
    pub character: Option<CharacterProfile>,
    /// Fields this crate does not model (`type`, `element`, `tier`, ...),
    /// written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// On-disk shape of a [`Term`]. The profile fields are read for every record
/// and only kept for characters.
#[derive(Deserialize)]
struct TermRecord {
    english: String,
    category: Category,
    first_appearance: Chapter,
    usage_count: u32,
    #[serde(default)]
    chapters_used: Vec<Chapter>,
    last_used: Chapter,
    #[serde(default)]
    context: String,
    #[serde(default)]
    added_date: Option<NaiveDateTime>,
    #[serde(flatten)]
    character: CharacterProfile,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<TermRecord> for Term {
    fn from(r: TermRecord) -> Self {
        Self {
            english: r.english,
            category: r.category,
            first_appearance: r.first_appearance,
            usage_count: r.usage_count,
            chapters_used: r.chapters_used,
            last_used: r.last_used,
            context: r.context,
            added_date: r.added_date,
            character: (r.category == Category::Characters).then_some(r.character),
            extra: r.extra,
        }
    }
}

impl Term {
    pub fn new(english: &str, category: Category, chapter: Chapter, context: &str) -> Self {
        Self {
            english: english.to_string(),
            category,
            first_appearance: chapter,
            usage_count: 1,
            chapters_used: vec![chapter],
            last_used: chapter,
            context: context.to_string(),
            added_date: Some(Local::now().naive_local()),
            character: None,
            extra: Map::new(),
        }
    }

    /// Bumps the usage count and records the chapter in sorted position.
    pub fn record_usage(&mut self, chapter: Chapter) {
        self.usage_count = self.usage_count.saturating_add(1);
        if let Err(pos) = self.chapters_used.binary_search(&chapter) {
            self.chapters_used.insert(pos, chapter);
        }
        self.last_used = self.chapters_used.last().copied().unwrap_or(chapter);
    }

    /// Folds another chapter set into this one, keeping it sorted and unique.
    pub fn merge_chapters(&mut self, chapters: &[Chapter]) {
        self.chapters_used.extend_from_slice(chapters);
        self.chapters_used.sort_unstable();
        self.chapters_used.dedup();
        if let Some(&last) = self.chapters_used.last() {
            self.last_used = last;
        }
    }

    /// True when some used chapter falls inside `[min, max]`.
    pub fn used_between(&self, min: Chapter, max: Chapter) -> bool {
        let start = self.chapters_used.partition_point(|&c| c < min);
        self.chapters_used.get(start).is_some_and(|&c| c <= max)
    }

    pub fn gender(&self) -> Gender {
        self.character.as_ref().map(|c| c.gender).unwrap_or_default()
    }
}

/// Most-used entry of one category, as reported in the statistics block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MostUsedTerm {
    pub term: String,
    pub english: String,
    pub usage_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStatistics {
    #[serde(default)]
    pub total_terms: usize,
    #[serde(default)]
    pub terms_by_category: BTreeMap<Category, usize>,
    #[serde(default)]
    pub most_used_terms: BTreeMap<Category, MostUsedTerm>,
}

/// Metadata envelope of the persisted store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMetadata {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<NaiveDateTime>,
    #[serde(default)]
    pub total_chapters_processed: Chapter,
    #[serde(default)]
    pub statistics: StoreStatistics,
}

fn default_version() -> String {
    STORE_VERSION.to_string()
}

impl Default for StoreMetadata {
    fn default() -> Self {
        let now = Local::now().naive_local();
        Self {
            version: default_version(),
            created: Some(now),
            last_updated: Some(now),
            total_chapters_processed: 0,
            statistics: StoreStatistics::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_normalize() {
        assert_eq!(Category::from_label("Person"), Some(Category::Characters));
        assert_eq!(Category::from_label("magic_term"), Some(Category::MagicTerms));
        assert_eq!(Category::from_label(" gang "), Some(Category::Organizations));
        assert_eq!(Category::from_label("creature"), None);
    }

    #[test]
    fn category_serializes_as_document_key() {
        let json = serde_json::to_string(&Category::MagicTerms).unwrap();
        assert_eq!(json, "\"magic_terms\"");
    }

    #[test]
    fn gender_reads_unknown_for_empty_string() {
        let g: Gender = serde_json::from_str("\"\"").unwrap();
        assert_eq!(g, Gender::Unknown);
        assert_eq!(Gender::parse("Girl"), Gender::Female);
    }

    #[test]
    fn record_usage_keeps_chapters_sorted() {
        let mut term = Term::new("Shirone", Category::Characters, 5, "");
        term.record_usage(2);
        term.record_usage(9);
        term.record_usage(5);
        assert_eq!(term.chapters_used, vec![2, 5, 9]);
        assert_eq!(term.last_used, 9);
        assert_eq!(term.usage_count, 4);
    }

    #[test]
    fn used_between_is_inclusive() {
        let mut term = Term::new("Alpheas", Category::Places, 3, "");
        term.record_usage(12);
        assert!(term.used_between(3, 3));
        assert!(term.used_between(10, 12));
        assert!(!term.used_between(4, 11));
    }

    #[test]
    fn profile_splits_first_token_as_given_name() {
        let p = CharacterProfile::from_english("아리안 시로네", "Arian  Shirone Jr", Gender::Male);
        assert_eq!(p.name, "Arian");
        assert_eq!(p.surname, "Shirone Jr");
    }

    #[test]
    fn non_character_record_has_no_profile() {
        let json = r#"{"english":"Alpheas Magic School","category":"places",
            "first_appearance":1,"usage_count":1,"chapters_used":[1],"last_used":1,
            "context":"academy","type":"unknown"}"#;
        let term: Term = serde_json::from_str(json).unwrap();
        assert!(term.character.is_none());
        assert_eq!(term.extra["type"], "unknown");
    }

    #[test]
    fn character_record_reads_profile() {
        let json = r#"{"english":"Shirone","category":"characters",
            "first_appearance":1,"usage_count":3,"chapters_used":[1,2],"last_used":2,
            "context":"protagonist","name":"Shirone","surname":"",
            "korean_full_name":"시로네","gender":"male","relationships":["Vincent's son"]}"#;
        let term: Term = serde_json::from_str(json).unwrap();
        let profile = term.character.unwrap();
        assert_eq!(profile.gender, Gender::Male);
        assert_eq!(profile.relationships, vec!["Vincent's son".to_string()]);
    }

    #[test]
    fn character_record_without_full_name_keeps_profile() {
        let json = r#"{"english":"Amy","category":"characters",
            "first_appearance":2,"usage_count":1,"chapters_used":[2],"last_used":2,
            "name":"Amy","gender":"female","relationships":["Shirone's friend"]}"#;
        let term: Term = serde_json::from_str(json).unwrap();
        let profile = term.character.unwrap();
        assert_eq!(profile.gender, Gender::Female);
        assert_eq!(profile.korean_full_name, "");
        assert!(term.extra.is_empty());
    }

    #[test]
    fn magic_term_extra_fields_serialize_back() {
        let json = r#"{"english":"photon sphere","category":"magic_terms",
            "first_appearance":1,"usage_count":1,"chapters_used":[1],"last_used":1,
            "context":"","type":"spell","element":"light","tier":"basic"}"#;
        let term: Term = serde_json::from_str(json).unwrap();
        let back = serde_json::to_value(&term).unwrap();
        assert_eq!(back["element"], "light");
        assert_eq!(back["tier"], "basic");
        assert!(back.get("gender").is_none());
    }
}
