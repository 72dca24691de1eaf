//! Property-based tests for the glossary core
//!
//! 1. Chapter sets stay sorted and unique
//! 2. The scanner agrees with plain substring search
//! 3. Sub-glossaries never exceed their cap, and never cut a present live
//!    term while such terms fit under it
//! 4. Save then load gives back the same store
//! 5. A known gender is never overwritten by ingestion

use glossary_core::core::context::ContextWindow;
use glossary_core::core::scanner::ChapterScanner;
use glossary_core::discovery::DiscoveredTerm;
use glossary_core::learning::TermIngestor;
use glossary_core::{Category, Chapter, Gender, SubGlossaryBuilder, TermStore};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn key_strategy() -> impl Strategy<Value = String> {
    "[가나다라마]{1,3}"
}

fn category_strategy() -> impl Strategy<Value = Category> {
    prop::sample::select(Category::ALL.to_vec())
}

fn gender_strategy() -> impl Strategy<Value = Gender> {
    prop_oneof![Just(Gender::Male), Just(Gender::Female), Just(Gender::Unknown)]
}

fn store_strategy() -> impl Strategy<Value = TermStore> {
    prop::collection::vec((key_strategy(), category_strategy(), 1u32..60, prop::collection::vec(1u32..60, 0..6)), 0..40)
        .prop_map(|entries| {
            let mut store = TermStore::new();
            for (key, category, first, later) in entries {
                store.add_term(&key, &format!("term {key}"), category, first, "", None, None);
                for chapter in later {
                    store.update_term_usage(&key, category, chapter);
                }
            }
            store
        })
}

// ============================================================================
// Store invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn chapters_used_sorted_and_unique(first in 1u32..100, updates in prop::collection::vec(1u32..100, 0..30)) {
        let mut store = TermStore::new();
        store.add_term("광구", "photon sphere", Category::MagicTerms, first, "", None, None);
        for &chapter in &updates {
            store.update_term_usage("광구", Category::MagicTerms, chapter);
        }
        let term = store.get(Category::MagicTerms, "광구").unwrap();
        prop_assert!(term.chapters_used.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(term.last_used, *term.chapters_used.last().unwrap());
        prop_assert_eq!(term.usage_count as usize, updates.len() + 1);
    }

    #[test]
    fn scanner_matches_substring_search(store in store_strategy(), text in "[가나다라마 ]{0,30}") {
        let found = ChapterScanner::new(&store).scan(&text);
        for category in Category::ALL {
            for key in store.terms(category).keys() {
                prop_assert_eq!(found[&category].contains(key), text.contains(key.as_str()), "key {}", key);
            }
        }
    }

    #[test]
    fn sub_glossary_respects_cap(
        store in store_strategy(),
        text in "[가나다라마]{0,20}",
        chapter in 1u32..70,
        cap in 1usize..6,
    ) {
        let sub = SubGlossaryBuilder::default().with_max_per_category(cap).build(&store, &text, chapter);
        for (_, entries) in sub.iter() {
            prop_assert!(entries.len() <= cap);
            prop_assert!(entries.windows(2).all(|w| w[0].score >= w[1].score));
        }

        let found = ChapterScanner::new(&store).scan(&text);
        let live = ContextWindow::default().select(&store, chapter);
        for category in Category::ALL {
            let present_live: Vec<&String> =
                found[&category].iter().filter(|k| live[&category].contains_key(k.as_str())).collect();
            if present_live.len() <= cap {
                for key in present_live {
                    prop_assert!(sub.get(category, key).is_some(), "dropped {} in {}", key, category);
                }
            }
        }
    }

    #[test]
    fn save_load_round_trip(mut store in store_strategy(), watermark in 0u32..100) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translation_glossary.json");
        store.advance_watermark(watermark);
        store.update_statistics();
        store.save(&path).unwrap();
        prop_assert_eq!(TermStore::load(&path).unwrap(), store);
    }

    #[test]
    fn known_gender_is_monotonic(
        initial in gender_strategy(),
        offered in prop::collection::vec(gender_strategy(), 1..8),
    ) {
        let mut store = TermStore::new();
        store.add_term("에이미", "Amy", Category::Characters, 1, "", Some(initial), None);
        let ingestor = TermIngestor::new();
        let mut settled = initial;

        for (i, gender) in offered.into_iter().enumerate() {
            let term = DiscoveredTerm::new("에이미", "Amy", "character", "").with_gender(gender);
            ingestor.ingest(&mut store, "", "", &[term], i as Chapter + 2);
            let now = store.get(Category::Characters, "에이미").unwrap().gender();
            if settled.is_known() {
                prop_assert_eq!(now, settled);
            }
            settled = now;
        }
    }
}
