// File: src/render.rs
//! Text renderings of glossary data: the block pasted into the translation
//! prompt, and a markdown listing of the whole store for people.

use crate::core::store::TermStore;
use crate::core::subglossary::{SubGlossary, SubGlossaryEntry};
use crate::core::types::{Category, Term};
use chrono::Local;
use std::fmt;

/// Contexts at least this long are left out of the prompt.
pub const PROMPT_CONTEXT_LIMIT: usize = 50;

/// Displays a sub-glossary as the prompt block handed to the translator.
pub struct PromptBlock<'a>(pub &'a SubGlossary);

impl fmt::Display for PromptBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# GLOSSARY - USE THESE TRANSLATIONS EXACTLY")?;
        writeln!(f, "*Critical: Use these exact translations to maintain consistency*")?;
        writeln!(f)?;

        for (category, entries) in self.0.iter() {
            if entries.is_empty() {
                continue;
            }
            writeln!(f, "## {}", category.display_name())?;
            for entry in entries {
                write_prompt_line(f, category, entry)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn write_prompt_line(f: &mut fmt::Formatter<'_>, category: Category, entry: &SubGlossaryEntry) -> fmt::Result {
    write!(f, "- **{}** → {}", entry.source_key, entry.english)?;

    if let (Category::Characters, Some(ch)) = (category, &entry.character) {
        if !ch.korean_family_name.is_empty() && !ch.korean_name.is_empty() {
            write!(
                f,
                " *(Korean parts: {}={}, {}={})*",
                ch.korean_family_name, ch.surname, ch.korean_name, ch.name
            )?;
        } else if !ch.korean_name.is_empty() && ch.korean_name != entry.source_key {
            write!(f, " *(Korean given: {})*", ch.korean_name)?;
        }

        let parts = format!("{} {}", ch.name, ch.surname);
        let parts = parts.trim();
        if !parts.is_empty() && parts != entry.english && ch.name != entry.english {
            write!(f, " *(English: {parts})*")?;
        }
        if ch.gender.is_known() {
            write!(f, " *[{}]*", ch.gender)?;
        }
        if !ch.relationships.is_empty() {
            write!(f, " *(Relationships: {})*", ch.relationships.join(", "))?;
        }
    }

    if !entry.context.is_empty() && entry.context.chars().count() < PROMPT_CONTEXT_LIMIT {
        write!(f, " *({})*", entry.context)?;
    }
    writeln!(f)
}

pub fn render_for_prompt(sub_glossary: &SubGlossary) -> String {
    PromptBlock(sub_glossary).to_string()
}

/// Displays the whole store as markdown, most used terms first.
pub struct ReadableGlossary<'a>(pub &'a TermStore);

impl fmt::Display for ReadableGlossary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.0;
        writeln!(f, "# Translation Glossary")?;
        writeln!(f, "*Generated: {}*", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f)?;
        writeln!(f, "**Total Terms**: {}", store.len())?;
        writeln!(f, "**Chapters Processed**: {}", store.total_chapters_processed())?;

        for category in Category::ALL {
            let terms = store.terms(category);
            if terms.is_empty() {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "## {}", category.display_name())?;
            writeln!(f)?;

            let mut sorted: Vec<(&String, &Term)> = terms.iter().collect();
            sorted.sort_by(|a, b| b.1.usage_count.cmp(&a.1.usage_count));
            for (key, term) in sorted {
                write!(
                    f,
                    "- **{key}** → {} *(Used {}x, First: Ch.{})*",
                    term.english, term.usage_count, term.first_appearance
                )?;
                if term.gender().is_known() {
                    write!(f, " *[{}]*", term.gender())?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

pub fn export_readable(store: &TermStore) -> String {
    ReadableGlossary(store).to_string()
}
