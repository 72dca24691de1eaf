// File: src/progress.rs
use crate::core::types::Chapter;
use crate::error::Result;
use crate::persistence::{read_if_exists, save_json_atomic};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Processing times kept for the rolling average.
pub const TIMING_WINDOW: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressStatistics {
    pub total_terms_discovered: usize,
    /// Seconds, averaged over `processing_times`.
    pub average_processing_time: f64,
    pub processing_times: Vec<f64>,
    pub quality_scores: Vec<f64>,
}

/// Which chapters have been attempted and how they went.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterProgress {
    pub last_translated_chapter: Chapter,
    pub total_chapters: Chapter,
    pub completed_chapters: BTreeSet<Chapter>,
    pub failed_chapters: BTreeSet<Chapter>,
    pub skipped_chapters: BTreeSet<Chapter>,
    pub last_update: Option<NaiveDateTime>,
    pub statistics: ProgressStatistics,
}

impl Default for ChapterProgress {
    fn default() -> Self {
        Self::new(1277)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressStatus {
    pub completed_chapters: usize,
    pub total_chapters: Chapter,
    pub completion_percentage: f64,
    pub failed_chapters: usize,
    pub skipped_chapters: usize,
    pub last_translated: Chapter,
    pub average_processing_time: f64,
}

impl ChapterProgress {
    pub fn new(total_chapters: Chapter) -> Self {
        Self {
            last_translated_chapter: 0,
            total_chapters,
            completed_chapters: BTreeSet::new(),
            failed_chapters: BTreeSet::new(),
            skipped_chapters: BTreeSet::new(),
            last_update: None,
            statistics: ProgressStatistics::default(),
        }
    }

    /// Missing or unreadable records start fresh; progress is advisory and
    /// can always be rebuilt from the translated output.
    pub fn load(path: &Path, total_chapters: Chapter) -> Result<Self> {
        let Some(content) = read_if_exists(path)? else {
            return Ok(Self::new(total_chapters));
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(progress) => Ok(progress),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "progress record unreadable, starting fresh");
                Ok(Self::new(total_chapters))
            }
        }
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.last_update = Some(Local::now().naive_local());
        save_json_atomic(self, path)?;
        debug!(path = %path.display(), completed = self.completed_chapters.len(), "saved progress");
        Ok(())
    }

    pub fn record_success(&mut self, chapter: Chapter, elapsed: Duration, new_terms: usize) {
        self.completed_chapters.insert(chapter);
        self.failed_chapters.remove(&chapter);
        self.skipped_chapters.remove(&chapter);
        self.last_translated_chapter = self.last_translated_chapter.max(chapter);

        let stats = &mut self.statistics;
        stats.total_terms_discovered += new_terms;
        stats.processing_times.push(elapsed.as_secs_f64());
        let excess = stats.processing_times.len().saturating_sub(TIMING_WINDOW);
        stats.processing_times.drain(..excess);
        stats.average_processing_time =
            stats.processing_times.iter().sum::<f64>() / stats.processing_times.len() as f64;
    }

    pub fn record_failure(&mut self, chapter: Chapter) {
        if !self.completed_chapters.contains(&chapter) {
            self.failed_chapters.insert(chapter);
        }
    }

    pub fn record_skip(&mut self, chapter: Chapter) {
        self.skipped_chapters.insert(chapter);
    }

    pub fn record_quality(&mut self, score: f64) {
        self.statistics.quality_scores.push(score);
    }

    pub fn is_completed(&self, chapter: Chapter) -> bool {
        self.completed_chapters.contains(&chapter)
    }

    /// First chapter in `1..=total_chapters` not yet completed.
    pub fn next_pending(&self) -> Option<Chapter> {
        (1..=self.total_chapters).find(|c| !self.completed_chapters.contains(c))
    }

    pub fn status(&self) -> ProgressStatus {
        let completed = self.completed_chapters.len();
        let completion_percentage = if self.total_chapters == 0 {
            0.0
        } else {
            completed as f64 / f64::from(self.total_chapters) * 100.0
        };
        ProgressStatus {
            completed_chapters: completed,
            total_chapters: self.total_chapters,
            completion_percentage,
            failed_chapters: self.failed_chapters.len(),
            skipped_chapters: self.skipped_chapters.len(),
            last_translated: self.last_translated_chapter,
            average_processing_time: self.statistics.average_processing_time,
        }
    }
}
