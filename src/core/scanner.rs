// File: src/core/scanner.rs
use crate::core::store::TermStore;
use crate::core::trie::PatternTrie;
use crate::core::types::Category;
use std::collections::{BTreeMap, BTreeSet};

/// Source keys per category. Every category is always present.
pub type CategorySets = BTreeMap<Category, BTreeSet<String>>;

pub fn empty_category_sets() -> CategorySets {
    Category::ALL.into_iter().map(|c| (c, BTreeSet::new())).collect()
}

/// Finds which known terms occur in a chapter's Korean text.
///
/// Every term key is a pattern; characters additionally register their
/// separately stored Korean given and family names so a chapter that only
/// says "시로네" still finds "아리안 시로네". Matching is literal substring
/// containment, nothing fuzzy. Build once per store state, scan many texts.
pub struct ChapterScanner {
    trie: PatternTrie,
    /// Owner of each pattern id, in insertion order.
    owners: Vec<(Category, String)>,
}

impl ChapterScanner {
    pub fn new(store: &TermStore) -> Self {
        let mut trie = PatternTrie::new();
        let mut owners = Vec::new();

        for (category, key, term) in store.iter() {
            let mut patterns = vec![key.as_str()];
            if let Some(profile) = &term.character {
                patterns.push(profile.korean_name.as_str());
                patterns.push(profile.korean_family_name.as_str());
            }
            for pattern in patterns {
                if trie.insert(pattern).is_some() {
                    owners.push((category, key.clone()));
                }
            }
        }
        trie.build();

        Self { trie, owners }
    }

    pub fn scan(&self, text: &str) -> CategorySets {
        let mut found = empty_category_sets();
        for id in self.trie.find_all(text) {
            let (category, key) = &self.owners[id];
            if let Some(set) = found.get_mut(category) {
                set.insert(key.clone());
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Gender;

    fn store() -> TermStore {
        let mut store = TermStore::new();
        store.add_character_with_parts(
            "아리안 시로네",
            "Arian",
            "Shirone",
            "아리안",
            "시로네",
            1,
            "",
            Gender::Male,
            vec![],
        );
        store.add_term("알페아스 마법학교", "Alpheas Magic School", Category::Places, 1, "", None, None);
        store.add_term("광구", "photon sphere", Category::MagicTerms, 2, "", None, None);
        store
    }

    #[test]
    fn finds_full_keys() {
        let found = ChapterScanner::new(&store()).scan("알페아스 마법학교에서 광구를 만들었다.");
        assert!(found[&Category::Places].contains("알페아스 마법학교"));
        assert!(found[&Category::MagicTerms].contains("광구"));
        assert!(found[&Category::Characters].is_empty());
        assert_eq!(found.len(), 6);
    }

    #[test]
    fn finds_character_by_given_name_only() {
        let found = ChapterScanner::new(&store()).scan("시로네는 웃었다.");
        assert!(found[&Category::Characters].contains("아리안 시로네"));
    }

    #[test]
    fn finds_character_by_family_name_only() {
        let found = ChapterScanner::new(&store()).scan("아리안 가문의 저택");
        assert!(found[&Category::Characters].contains("아리안 시로네"));
    }

    #[test]
    fn empty_store_finds_nothing() {
        let found = ChapterScanner::new(&TermStore::new()).scan("시로네");
        assert!(found.values().all(BTreeSet::is_empty));
    }
}
