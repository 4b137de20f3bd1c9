//! Background comparison jobs.

use anyhow::{Context, Result};
use slidecheck_core::report;
use slidecheck_core::{compare_presentations, CompareOptions, Progress, ProgressSink};
use slidecheck_translate::{CachedTranslator, GoogleConfig, GoogleTranslator, TranslationCache};
use std::path::PathBuf;
use std::sync::Arc;

use crate::state::Job;

/// Everything a worker needs to run one comparison.
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub source_path: PathBuf,
    pub translated_path: PathBuf,
    /// Names shown in the report instead of the stored upload names.
    pub source_name: String,
    pub translated_name: String,
    pub threshold: f64,
    pub translator: GoogleConfig,
}

/// Forwards progress but holds back completion until the report is on disk,
/// so clients never fetch a report that does not exist yet.
struct PendingReport<'a>(&'a Job);

impl ProgressSink for PendingReport<'_> {
    fn update(&self, progress: &Progress) {
        let mut progress = progress.clone();
        if progress.done {
            progress.done = false;
            progress.message = "Writing report...".to_string();
        }
        self.0.set(progress);
    }
}

/// Run a job to completion on the current (blocking) thread.
///
/// The job always ends marked done, with `error` set if it failed.
pub fn run(job: Arc<Job>, settings: JobSettings) {
    log::info!(
        "Job {} started: {} vs {}",
        job.id,
        settings.source_name,
        settings.translated_name
    );
    match execute(&job, &settings) {
        Ok(path) => log::info!("Job {} finished: {}", job.id, path.display()),
        Err(e) => {
            log::error!("Job {} failed: {:#}", job.id, e);
            let failed = job.snapshot().failed(format!("{:#}", e));
            job.set(failed);
        }
    }
}

fn execute(job: &Job, settings: &JobSettings) -> Result<PathBuf> {
    let mut source = slidecheck_pptx::load_presentation(&settings.source_path)
        .with_context(|| format!("Failed to read {}", settings.source_name))?;
    source.filename = settings.source_name.clone();

    let mut translated = slidecheck_pptx::load_presentation(&settings.translated_path)
        .with_context(|| format!("Failed to read {}", settings.translated_name))?;
    translated.filename = settings.translated_name.clone();

    std::fs::create_dir_all(&job.report_dir)
        .with_context(|| format!("Failed to create {}", job.report_dir.display()))?;

    let google = GoogleTranslator::new(settings.translator.clone())?;
    let cache = TranslationCache::load(job.report_dir.join("cache.json"));
    let mut translator = CachedTranslator::new(google, cache);

    let options = CompareOptions::default().with_threshold(settings.threshold);
    let report = compare_presentations(
        &source,
        &translated,
        &mut translator,
        &options,
        &PendingReport(job),
    );
    log::debug!(
        "Job {}: {} cache hits, {} misses ({})",
        job.id,
        translator.hits(),
        translator.misses(),
        translator.cache().path().display()
    );

    let path = job.report_path();
    report::write_html(&report, &path)?;

    job.set(Progress {
        current: report.summary.total,
        total: report.summary.total,
        done: true,
        message: "Report ready".to_string(),
        error: None,
    });
    Ok(path)
}
