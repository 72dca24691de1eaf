use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use glossary_core::config::{load_config_from_path, DEFAULT_CONFIG_FILE};
use glossary_core::dedup::DedupMode;
use glossary_core::progress::ChapterProgress;
use glossary_core::render::render_for_prompt;
use glossary_core::validation::ValidationReport;
use glossary_core::{Category, Chapter, GlossaryEngine, Result};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Glossary maintenance for the chapter translation pipeline.
#[derive(Parser, Debug)]
#[command(name = "glossary_tool", version, about)]
struct Cli {
    /// JSON config file; missing means defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Term counts and most used terms per category.
    Stats,
    /// Chapter progress summary.
    Progress,
    /// Print the glossary block for one chapter.
    SubGlossary {
        #[arg(long)]
        chapter: Chapter,
        /// Korean chapter text.
        #[arg(long)]
        source: PathBuf,
        /// Emit JSON instead of the prompt block.
        #[arg(long)]
        json: bool,
    },
    /// Check a finished translation.
    Validate {
        #[arg(long)]
        chapter: Chapter,
        #[arg(long)]
        source: PathBuf,
        #[arg(long)]
        translated: PathBuf,
    },
    /// Merge the terms a translator response reported.
    Ingest {
        #[arg(long)]
        chapter: Chapter,
        #[arg(long)]
        source: PathBuf,
        #[arg(long)]
        translated: PathBuf,
        /// Full translator response containing NEW_TERMS_DISCOVERED.
        #[arg(long)]
        response: PathBuf,
    },
    /// Find duplicate characters. Dry run unless --apply is given.
    Dedupe {
        #[arg(long)]
        apply: bool,
    },
    /// Write a markdown listing of the glossary.
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e}", "[ERROR]".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config_from_path(&cli.config)?;
    let progress_path = config.paths.progress_file.clone();
    let total_chapters = config.total_chapters;
    let mut engine = GlossaryEngine::open(config)?;

    match cli.command {
        Command::Stats => {
            engine.store_mut().update_statistics();
            print_stats(&engine);
        }
        Command::Progress => {
            let status = ChapterProgress::load(&progress_path, total_chapters)?.status();
            println!("{}", "Translation progress".bold());
            println!(
                "  Completed: {}/{} ({:.1}%)",
                status.completed_chapters, status.total_chapters, status.completion_percentage
            );
            println!("  Failed: {}  Skipped: {}", status.failed_chapters, status.skipped_chapters);
            println!("  Last translated: {}", status.last_translated);
            println!("  Average time: {:.1}s", status.average_processing_time);
        }
        Command::SubGlossary { chapter, source, json } => {
            let text = fs::read_to_string(source)?;
            let sub = engine.generate_sub_glossary(&text, chapter);
            if json {
                println!("{}", serde_json::to_string_pretty(&sub)?);
            } else {
                print!("{}", render_for_prompt(&sub));
            }
        }
        Command::Validate { chapter, source, translated } => {
            let source = fs::read_to_string(source)?;
            let translated = fs::read_to_string(translated)?;
            let report = engine.validate_translation(&translated, &source, chapter);
            print_report(&report);
            if !report.success {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Ingest { chapter, source, translated, response } => {
            let started = Instant::now();
            let source = fs::read_to_string(source)?;
            let translated = fs::read_to_string(translated)?;
            let response = fs::read_to_string(response)?;

            let report = engine.validate_translation(&translated, &source, chapter);
            let mut progress = ChapterProgress::load(&progress_path, total_chapters)?;
            if !report.success {
                print_report(&report);
                progress.record_failure(chapter);
                progress.save(&progress_path)?;
                return Ok(ExitCode::FAILURE);
            }

            let ingested = engine.ingest_response(&response, &source, &translated, chapter)?;
            progress.record_success(chapter, started.elapsed(), ingested.added.len());
            progress.save(&progress_path)?;

            println!(
                "{} chapter {chapter}: {} new, {} usage updates",
                "Ingested".green().bold(),
                ingested.added.len(),
                ingested.usage_updates
            );
            for warning in report.warnings.iter().chain(&ingested.warnings) {
                println!("  {} {warning}", "warning:".yellow());
            }
        }
        Command::Dedupe { apply } => {
            let mode = if apply { DedupMode::Apply } else { DedupMode::DryRun };
            let report = engine.deduplicate(mode)?;
            if !report.has_duplicates() {
                println!("{}", "No duplicate characters found.".green());
            }
            for group in &report.groups {
                println!("{} <- {}", group.primary.clone().bold(), group.secondaries.join(", "));
            }
            match (&report.backup, mode) {
                (Some(path), _) => {
                    println!("Merged {} entries. Backup: {}", report.removed, path.display());
                }
                (None, DedupMode::DryRun) if report.has_duplicates() => {
                    println!("{}", "Dry run. Re-run with --apply to merge.".yellow());
                }
                _ => {}
            }
        }
        Command::Export { output } => {
            let output = output.unwrap_or_else(|| {
                engine
                    .store_path()
                    .with_file_name("readable_glossary.md")
            });
            engine.export_readable(&output)?;
            println!("Exported to {}", output.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_stats(engine: &GlossaryEngine) {
    let store = engine.store();
    let stats = store.statistics();
    println!("{}", "Glossary".bold());
    println!("  File: {}", engine.store_path().display());
    println!("  Total terms: {}", stats.total_terms);
    println!("  Chapters processed: {}", store.total_chapters_processed());
    for category in Category::ALL {
        let count = stats.terms_by_category.get(&category).copied().unwrap_or(0);
        print!("  {:<14} {count:>5}", category.display_name());
        if let Some(top) = stats.most_used_terms.get(&category) {
            print!("  top: {} → {} ({}x)", top.term, top.english, top.usage_count);
        }
        println!();
    }
}

fn print_report(report: &ValidationReport) {
    if report.success {
        println!("{}", "Validation passed".green().bold());
    } else {
        println!("{}", "Validation failed".red().bold());
    }
    for error in &report.errors {
        println!("  {} {error}", "error:".red());
    }
    for warning in &report.warnings {
        println!("  {} {warning}", "warning:".yellow());
    }
}
