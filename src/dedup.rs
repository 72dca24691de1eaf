// File: src/dedup.rs
//! Offline merge of character entries that name the same person.
//!
//! Two characters are duplicates when they share a non-empty given name and
//! one lacks a family name (or both carry the same one), or when one English
//! name contains the other and is more than two characters longer. The entry
//! with a family name wins, then the more used one.

use crate::core::store::TermStore;
use crate::core::types::{Category, CharacterProfile, Term};
use crate::error::Result;
use crate::learning::is_generic_context;
use crate::persistence::write_snapshot;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SNAPSHOT_STEM: &str = "translation_glossary";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// Report what would be merged without touching the store.
    #[default]
    DryRun,
    Apply,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub primary: String,
    pub secondaries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DedupReport {
    pub mode: DedupMode,
    pub groups: Vec<DuplicateGroup>,
    /// Snapshot written before merging; only set in apply mode.
    pub backup: Option<PathBuf>,
    pub removed: usize,
}

impl DedupReport {
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }
}

fn given_and_family(term: &Term) -> (&str, &str) {
    term.character
        .as_ref()
        .map_or(("", ""), |p| (p.name.trim(), p.surname.trim()))
}

fn same_person(a: &Term, b: &Term) -> bool {
    let (given_a, family_a) = given_and_family(a);
    let (given_b, family_b) = given_and_family(b);
    if !given_a.is_empty() && given_a.eq_ignore_ascii_case(given_b) {
        let presence_differs = family_a.is_empty() != family_b.is_empty();
        if presence_differs || family_a.eq_ignore_ascii_case(family_b) {
            return true;
        }
    }

    let english_a = a.english.trim().to_lowercase();
    let english_b = b.english.trim().to_lowercase();
    if english_a.is_empty() || english_b.is_empty() {
        return false;
    }
    let contained = english_a.contains(&english_b) || english_b.contains(&english_a);
    contained && english_a.chars().count().abs_diff(english_b.chars().count()) > 2
}

/// Groups duplicate characters. Each key lands in at most one group, and
/// groups are discovered in key order.
pub fn find_duplicate_groups(store: &TermStore) -> Vec<DuplicateGroup> {
    let characters = store.terms(Category::Characters);
    let mut processed: BTreeSet<&str> = BTreeSet::new();
    let mut groups = Vec::new();

    for (key, term) in characters {
        if processed.contains(key.as_str()) {
            continue;
        }
        let mut members: Vec<(&String, &Term)> = vec![(key, term)];
        members.extend(characters.iter().filter(|(other_key, other)| {
            *other_key != key && !processed.contains(other_key.as_str()) && same_person(term, other)
        }));
        if members.len() < 2 {
            continue;
        }
        processed.extend(members.iter().map(|(k, _)| k.as_str()));

        let rank = |t: &Term| {
            let has_family = t.character.as_ref().is_some_and(CharacterProfile::has_family_name);
            (has_family, t.usage_count)
        };
        members.sort_by(|a, b| rank(b.1).cmp(&rank(a.1)));

        groups.push(DuplicateGroup {
            primary: members[0].0.clone(),
            secondaries: members[1..].iter().map(|(k, _)| (*k).clone()).collect(),
        });
    }
    groups
}

/// Folds the secondaries of `group` into its primary and deletes them.
/// Returns how many entries were removed.
pub fn merge_group(store: &mut TermStore, group: &DuplicateGroup) -> usize {
    let characters = store.terms_mut(Category::Characters);
    if !characters.contains_key(&group.primary) {
        warn!(primary = %group.primary, "duplicate group has no primary entry, skipped");
        return 0;
    }
    let secondaries: Vec<Term> = group
        .secondaries
        .iter()
        .filter(|key| **key != group.primary)
        .filter_map(|key| characters.remove(key))
        .collect();
    let Some(primary) = characters.get_mut(&group.primary) else {
        return 0;
    };

    for secondary in &secondaries {
        primary.usage_count = primary.usage_count.saturating_add(secondary.usage_count);
        primary.merge_chapters(&secondary.chapters_used);
        primary.first_appearance = primary.first_appearance.min(secondary.first_appearance);
        if is_generic_context(&primary.context) && !is_generic_context(&secondary.context) {
            primary.context = secondary.context.clone();
        }

        let english = secondary.english.clone();
        let secondary_gender = secondary.gender();
        if let Some(profile) = primary.character.as_mut() {
            if !profile.gender.is_known() {
                profile.gender = secondary_gender;
            }
            if english != primary.english && !profile.aliases.contains(&english) {
                profile.aliases.push(english);
            }
        }
    }

    info!(
        primary = %group.primary,
        merged = ?group.secondaries,
        usage = primary.usage_count,
        "merged duplicate characters"
    );
    secondaries.len()
}

/// Runs the deduplication pass over a store.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    backup_dir: PathBuf,
}

impl Deduplicator {
    pub fn new(backup_dir: &Path) -> Self {
        Self { backup_dir: backup_dir.to_path_buf() }
    }

    /// In apply mode the store is snapshotted to the backup directory before
    /// the first mutation. Persisting the merged store is left to the caller.
    pub fn run(&self, store: &mut TermStore, mode: DedupMode) -> Result<DedupReport> {
        let groups = find_duplicate_groups(store);
        let mut report = DedupReport { mode, groups, backup: None, removed: 0 };

        if mode == DedupMode::DryRun || report.groups.is_empty() {
            info!(groups = report.groups.len(), ?mode, "deduplication finished without changes");
            return Ok(report);
        }

        let backup = write_snapshot(&*store, &self.backup_dir, SNAPSHOT_STEM)?;
        info!(path = %backup.display(), "wrote pre-merge snapshot");
        report.backup = Some(backup);

        for group in &report.groups {
            report.removed += merge_group(store, group);
        }
        store.update_statistics();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Gender;

    fn shirone_pair() -> TermStore {
        let mut store = TermStore::new();
        store.add_term("시로네", "Shirone", Category::Characters, 1, "protagonist", Some(Gender::Male), None);
        store.update_term_usage("시로네", Category::Characters, 2);
        store.add_term("아리안 시로네", "Arian Shirone", Category::Characters, 5, "", None, None);
        store.update_term_usage("아리안 시로네", Category::Characters, 7);
        store
    }

    #[test]
    fn finds_substring_duplicate_with_family_name_as_primary() {
        let groups = find_duplicate_groups(&shirone_pair());
        assert_eq!(
            groups,
            vec![DuplicateGroup {
                primary: "아리안 시로네".into(),
                secondaries: vec!["시로네".into()],
            }]
        );
    }

    #[test]
    fn dry_run_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = shirone_pair();
        let before = store.clone();
        let report = Deduplicator::new(dir.path()).run(&mut store, DedupMode::default()).unwrap();
        assert!(report.has_duplicates());
        assert_eq!(report.removed, 0);
        assert!(report.backup.is_none());
        assert_eq!(store, before);
    }

    #[test]
    fn apply_merges_into_primary_and_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = shirone_pair();
        let report = Deduplicator::new(dir.path()).run(&mut store, DedupMode::Apply).unwrap();

        assert_eq!(report.removed, 1);
        assert!(report.backup.as_ref().is_some_and(|p| p.exists()));
        assert!(!store.contains(Category::Characters, "시로네"));

        let merged = store.get(Category::Characters, "아리안 시로네").unwrap();
        assert_eq!(merged.usage_count, 4);
        assert_eq!(merged.chapters_used, vec![1, 2, 5, 7]);
        assert_eq!(merged.last_used, 7);
        assert_eq!(merged.first_appearance, 1);
        assert_eq!(merged.context, "protagonist");
        assert_eq!(merged.gender(), Gender::Male);
        assert_eq!(merged.character.as_ref().unwrap().aliases, vec!["Shirone".to_string()]);
        assert_eq!(store.statistics().total_terms, 1);
    }

    #[test]
    fn short_overlap_is_not_a_duplicate() {
        let mut store = TermStore::new();
        store.add_term("앤", "Ann", Category::Characters, 1, "", None, None);
        store.add_term("애나", "Anna", Category::Characters, 1, "", None, None);
        assert!(find_duplicate_groups(&store).is_empty());
    }

    #[test]
    fn same_given_name_with_and_without_family_name() {
        let mut store = TermStore::new();
        store.add_character_with_parts("오리엘 에이미", "Oriel", "Amy", "오리엘", "에이미", 3, "", Gender::Female, vec![]);
        store.add_term("에이미", "Amy", Category::Characters, 1, "", None, None);
        let groups = find_duplicate_groups(&store);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].primary, "오리엘 에이미");
    }

    #[test]
    fn apply_without_duplicates_writes_no_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TermStore::new();
        store.add_term("시로네", "Shirone", Category::Characters, 1, "", None, None);
        let report = Deduplicator::new(dir.path()).run(&mut store, DedupMode::Apply).unwrap();
        assert!(report.backup.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn group_with_missing_primary_removes_nothing() {
        let mut store = shirone_pair();
        let before = store.clone();
        let group = DuplicateGroup { primary: "없는 이름".into(), secondaries: vec!["시로네".into()] };
        assert_eq!(merge_group(&mut store, &group), 0);
        assert_eq!(store, before);
    }
}
