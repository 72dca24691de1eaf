// File: src/discovery.rs
//! Parsing of the "new terms" list returned by the translator.
//!
//! Expected line shape: `- 한국어 → English (category[: attribute]) {context}`.
//! The `category:` prefix, the bullet and the context are all optional. Lines
//! that do not fit become warnings; they never abort the batch.

use crate::core::types::{Category, Gender};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

static SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)NEW_TERMS_DISCOVERED:\s*\n(.*?)(?:\n\n|\nCONSISTENCY_CHECK:|\z)")
        .expect("static regex")
});

static TERM_LINE: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r"[-*]\s*([^→]+)→\s*([^(]+)\s*\(category:\s*([^)]+)\)\s*(?:\{([^}]+)\})?",
        r"[-*]\s*([^→]+)→\s*([^(]+)\s*\(([^)]+)\)\s*(?:\{([^}]+)\})?",
        r"([^→]+)→\s*([^(]+)\s*\(category:\s*([^)]+)\)\s*(?:\{([^}]+)\})?",
    ]
    .map(|p| Regex::new(p).expect("static regex"))
});

/// A term reported by the translator, before it is merged into the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredTerm {
    pub source_key: String,
    pub english: String,
    /// Category as written by the translator, e.g. "character" or "spell".
    pub category_label: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub gender: Gender,
}

impl DiscoveredTerm {
    pub fn new(source_key: &str, english: &str, category_label: &str, context: &str) -> Self {
        Self {
            source_key: source_key.trim().to_string(),
            english: english.trim().to_string(),
            category_label: category_label.trim().to_lowercase(),
            context: context.trim().to_string(),
            gender: Gender::Unknown,
        }
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    /// The label if it is a known one, otherwise the detection cascade.
    pub fn resolve_category(&self) -> Category {
        Category::from_label(&self.category_label)
            .unwrap_or_else(|| classify(&self.english, &self.context))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryParse {
    pub terms: Vec<DiscoveredTerm>,
    pub warnings: Vec<String>,
}

/// Body of the `NEW_TERMS_DISCOVERED:` section of a translator response.
pub fn extract_new_terms_section(response: &str) -> Option<&str> {
    SECTION.captures(response).and_then(|c| c.get(1)).map(|m| m.as_str().trim())
}

/// Finds the discovered-terms section in a full response and parses it.
pub fn parse_response(response: &str) -> DiscoveryParse {
    match extract_new_terms_section(response) {
        Some(block) => parse_discovered_terms(block),
        None => DiscoveryParse {
            terms: Vec::new(),
            warnings: vec!["No NEW_TERMS_DISCOVERED section found".to_string()],
        },
    }
}

/// Parses one term per line. Blank lines and `#` comments are skipped.
pub fn parse_discovered_terms(block: &str) -> DiscoveryParse {
    let mut parsed = DiscoveryParse::default();

    for line in block.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_line(line) {
            Some(term) => parsed.terms.push(term),
            None => parsed.warnings.push(format!("Could not parse term entry: {line}")),
        }
    }
    debug!(terms = parsed.terms.len(), warnings = parsed.warnings.len(), "parsed discovered terms");
    parsed
}

fn parse_line(line: &str) -> Option<DiscoveredTerm> {
    let caps = TERM_LINE.iter().find_map(|re| re.captures(line))?;
    let korean = caps.get(1)?.as_str();
    let english = caps.get(2)?.as_str();
    let raw = caps.get(3)?.as_str().to_lowercase();
    let context = caps.get(4).map_or("", |m| m.as_str());

    // "character: female" carries the gender after the colon.
    let (label, attribute) = match raw.split_once(':') {
        Some((label, attr)) => (label.trim(), attr.trim()),
        None => (raw.trim(), ""),
    };
    Some(DiscoveredTerm::new(korean, english, label, context).with_gender(Gender::parse(attribute)))
}

const ORGANIZATION_INDICATORS: &[&str] = &[
    "family", "house", "clan", "tribe", "gang", "group", "organization", "guild", "order",
    "society", "association", "company", "faction", "nobility", "royal", "government",
    "kingdom", "empire", "military", "school", "academy", "institution",
];

const MAGIC_INDICATORS: &[&str] = &[
    "magic", "spell", "technique", "skill", "ability", "power", "cast", "conjure", "summon",
    "enchant", "ritual", "incantation", "mana", "energy", "force", "element", "elemental",
    "fire", "water", "earth", "air", "wind", "lightning", "ice", "light", "dark",
];

const PLACE_INDICATORS: &[&str] = &[
    "city", "town", "village", "district", "area", "region", "place", "location", "school",
    "academy", "library", "building", "house", "palace", "castle", "kingdom", "empire",
    "nation", "country", "forest", "mountain", "valley", "street", "alley", "road", "path",
    "gate", "door", "room", "hall",
];

const ITEM_INDICATORS: &[&str] = &[
    "weapon", "sword", "knife", "blade", "axe", "bow", "staff", "wand", "armor", "shield",
    "helmet", "boots", "gloves", "cloak", "robe", "potion", "scroll", "book", "tome",
    "artifact", "relic", "treasure", "tool", "instrument", "device", "object", "item",
    "equipment",
];

const CHARACTER_INDICATORS: &[&str] = &[
    "male", "female", "boy", "girl", "man", "woman", "person", "character", "father",
    "mother", "son", "daughter", "brother", "sister", "king", "queen", "prince", "princess",
    "lord", "lady", "teacher", "student", "mage", "wizard", "principal", "director", "he",
    "she", "his", "her", "him", "protagonist", "villain", "retired from politics",
    "daughter of", "son of",
];

const PERSON_CLUES: &[&str] = &["from", "of", "the", "'s", "who", "is", "was"];
const ORGANIZATION_BLOCKERS: &[&str] = &["family", "house", "clan", "guild", "school", "academy"];

fn mentions_any(text: &str, indicators: &[&str]) -> bool {
    indicators.iter().any(|i| text.contains(i))
}

/// Category for a term whose label was not recognized. The order of the
/// checks is fixed: organization, magic, place, item, character, then
/// concept as the fallback.
///
/// Indicators match as plain substrings of the lowercased English or context,
/// so compounds like "Firebolt" count, and so does "ice" inside "police".
pub fn classify(english: &str, context: &str) -> Category {
    let english_lower = english.to_lowercase();
    let context_lower = context.to_lowercase();
    let either = |indicators: &[&str]| {
        mentions_any(&english_lower, indicators) || mentions_any(&context_lower, indicators)
    };

    if either(ORGANIZATION_INDICATORS) {
        Category::Organizations
    } else if either(MAGIC_INDICATORS) {
        Category::MagicTerms
    } else if either(PLACE_INDICATORS) {
        Category::Places
    } else if either(ITEM_INDICATORS) {
        Category::Items
    } else if looks_like_character(english, &context_lower) {
        Category::Characters
    } else {
        Category::Concepts
    }
}

/// Only the context is consulted here; the English name alone says little.
fn looks_like_character(english: &str, context_lower: &str) -> bool {
    if mentions_any(context_lower, CHARACTER_INDICATORS) {
        return true;
    }
    // A capitalized one- or two-word name described like a person.
    let capitalized = english.chars().next().is_some_and(char::is_uppercase);
    capitalized
        && english.split_whitespace().count() <= 2
        && mentions_any(context_lower, PERSON_CLUES)
        && !mentions_any(context_lower, ORGANIZATION_BLOCKERS)
}
