use dashmap::DashMap;
use slidecheck_core::report::REPORT_FILE_NAME;
use slidecheck_core::{Progress, ProgressSink};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::config::ServerConfig;
use crate::error::ApiError;

/// Finished jobs beyond this count are forgotten, oldest first.
pub const MAX_TRACKED_JOBS: usize = 100;

static JOB_SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub jobs: Arc<DashMap<String, Arc<Job>>>,
    latest_job: Arc<RwLock<Option<String>>>,
}

/// One comparison run and its shared progress.
pub struct Job {
    pub id: String,
    pub report_dir: PathBuf,
    /// Creation order across all jobs in this process.
    sequence: u64,
    progress: RwLock<Progress>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            jobs: Arc::new(DashMap::new()),
            latest_job: Arc::new(RwLock::new(None)),
        }
    }

    /// Track a job and make it the default for `/progress` and `/report`.
    ///
    /// Once more than [`MAX_TRACKED_JOBS`] are tracked, the oldest finished
    /// jobs are dropped. Running jobs and the new job are always kept, and the
    /// reports of dropped jobs stay on disk.
    pub fn register_job(&self, job: Arc<Job>) {
        let id = job.id.clone();
        self.jobs.insert(id.clone(), job);
        {
            let mut latest = self.latest_job.write().unwrap_or_else(|e| e.into_inner());
            *latest = Some(id.clone());
        }
        self.prune_jobs(&id);
    }

    fn prune_jobs(&self, keep: &str) {
        let excess = self.jobs.len().saturating_sub(MAX_TRACKED_JOBS);
        if excess == 0 {
            return;
        }

        let mut finished: Vec<(u64, String)> = self
            .jobs
            .iter()
            .filter(|entry| entry.key() != keep && entry.value().snapshot().done)
            .map(|entry| (entry.value().sequence, entry.key().clone()))
            .collect();
        finished.sort();

        for (_, id) in finished.into_iter().take(excess) {
            self.jobs.remove(&id);
        }
        log::debug!("Job registry pruned to {} entries", self.jobs.len());
    }

    /// Job by id, or the most recently started job when `id` is None.
    pub fn find_job(&self, id: Option<&str>) -> Option<Arc<Job>> {
        let id = match id {
            Some(id) => id.to_string(),
            None => self
                .latest_job
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .clone()?,
        };
        self.jobs.get(&id).map(|entry| entry.value().clone())
    }

    /// Internal error whose detail is only shown outside production.
    pub fn internal_error(&self, err: impl Display) -> ApiError {
        log::error!("Internal error: {}", err);
        if self.config.is_production() {
            ApiError::Internal("An internal error occurred".to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl Job {
    pub fn new(id: impl Into<String>, report_dir: PathBuf) -> Self {
        Self {
            id: id.into(),
            report_dir,
            sequence: JOB_SEQUENCE.fetch_add(1, Ordering::Relaxed),
            progress: RwLock::new(Progress::starting()),
        }
    }

    pub fn snapshot(&self) -> Progress {
        self.progress
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set(&self, progress: Progress) {
        let mut current = self.progress.write().unwrap_or_else(|e| e.into_inner());
        *current = progress;
    }

    pub fn report_path(&self) -> PathBuf {
        self.report_dir.join(REPORT_FILE_NAME)
    }
}

impl ProgressSink for Job {
    fn update(&self, progress: &Progress) {
        self.set(progress.clone());
    }
}
