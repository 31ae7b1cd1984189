//! Batch job execution.
//!
//! One background task per submitted job; files are processed strictly
//! one at a time so peak resource use stays bounded to a single
//! in-flight conversion regardless of batch size. The job table sits
//! behind one coarse lock that is only ever held for counter updates,
//! never across a converter call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{info, warn};

use crate::converter::{
    extension_of, Category, ConversionRequest, ConvertError, ConverterRegistry, Quality,
};
use crate::history::{HistoryStore, NewConversionRecord};
use crate::metrics;

use super::types::{Job, JobError};

/// Owns the in-memory table of batch jobs and drives their workers.
pub struct JobRunner {
    registry: Arc<ConverterRegistry>,
    history: Arc<dyn HistoryStore>,
    jobs: Arc<Mutex<HashMap<String, Job>>>,
}

impl JobRunner {
    /// Create a runner over the given converter registry and history.
    pub fn new(registry: Arc<ConverterRegistry>, history: Arc<dyn HistoryStore>) -> Self {
        Self {
            registry,
            history,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Submit a batch job. Returns immediately with the new job id;
    /// exactly one worker task is spawned per job.
    pub fn submit(
        &self,
        files: Vec<PathBuf>,
        output_format: &str,
        output_dir: &Path,
        quality: Quality,
    ) -> Result<String, JobError> {
        if files.is_empty() {
            return Err(JobError::EmptyFileList);
        }

        let job_id = uuid::Uuid::new_v4().to_string();
        let job = Job::new(job_id.clone(), files.len() as u32);
        self.jobs.lock().unwrap().insert(job_id.clone(), job);
        metrics::JOBS_SUBMITTED.inc();

        info!(job_id = %job_id, files = files.len(), format = %output_format, "job submitted");

        let registry = Arc::clone(&self.registry);
        let history = Arc::clone(&self.history);
        let jobs = Arc::clone(&self.jobs);
        let output_format = output_format.trim_start_matches('.').to_ascii_lowercase();
        let output_dir = output_dir.to_path_buf();
        let worker_job_id = job_id.clone();

        tokio::spawn(async move {
            run_job(
                worker_job_id,
                files,
                output_format,
                output_dir,
                quality,
                registry,
                history,
                jobs,
            )
            .await;
        });

        Ok(job_id)
    }

    /// Consistent point-in-time snapshot of a job, or `None` when the id
    /// was never issued.
    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs.lock().unwrap().get(job_id).cloned()
    }

    /// Number of jobs tracked (active and completed).
    pub fn job_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

/// Mutate a job entry under the lock.
fn update_job(jobs: &Mutex<HashMap<String, Job>>, job_id: &str, f: impl FnOnce(&mut Job)) {
    let mut map = jobs.lock().unwrap();
    if let Some(job) = map.get_mut(job_id) {
        f(job);
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_job(
    job_id: String,
    files: Vec<PathBuf>,
    output_format: String,
    output_dir: PathBuf,
    quality: Quality,
    registry: Arc<ConverterRegistry>,
    history: Arc<dyn HistoryStore>,
    jobs: Arc<Mutex<HashMap<String, Job>>>,
) {
    // The one job-fatal condition: no output directory means nothing in
    // the batch can be attempted. Every file is marked failed so that
    // processed == total still holds at completion.
    if let Err(e) = tokio::fs::create_dir_all(&output_dir).await {
        warn!(job_id = %job_id, dir = %output_dir.display(), "failed to create output directory: {}", e);
        update_job(&jobs, &job_id, |job| {
            job.processed = job.total;
            job.failed = job.total;
            job.current_file = None;
            job.message = Some(format!("Failed to create output directory: {}", e));
            job.done = true;
        });
        return;
    }

    let total = files.len();
    for (i, file) in files.iter().enumerate() {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string());

        update_job(&jobs, &job_id, |job| {
            job.current_file = Some(file_name.clone());
            job.message = Some(format!("Converting {} ({}/{})", file_name, i + 1, total));
        });

        let started = Instant::now();
        let outcome = convert_one(&registry, file, &output_dir, &output_format, quality).await;
        let elapsed = started.elapsed().as_secs_f64();

        let input_format = extension_of(file).unwrap_or_default();
        let category = Category::from_extension(&input_format)
            .map(|c| c.as_str())
            .unwrap_or("unknown");
        let (success, output_file, error_message) = match outcome {
            Ok(path) => (true, path.display().to_string(), None),
            Err(e) => {
                let stem = file
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| "output".to_string());
                let derived = output_dir.join(format!("{}.{}", stem, output_format));
                (false, derived.display().to_string(), Some(e.to_string()))
            }
        };

        metrics::CONVERSIONS_TOTAL
            .with_label_values(&[if success { "success" } else { "failed" }, category])
            .inc();
        metrics::CONVERSION_DURATION
            .with_label_values(&[category])
            .observe(elapsed);

        // History is written unconditionally, even for failures; a
        // history failure never affects job state.
        let file_size = tokio::fs::metadata(file).await.map(|m| m.len()).unwrap_or(0);
        let record = NewConversionRecord {
            input_file: file.display().to_string(),
            input_format,
            output_file,
            output_format: output_format.clone(),
            file_size,
            conversion_time: elapsed,
            success,
            error_message,
            quality,
        };
        if let Err(e) = history.record(record) {
            warn!(job_id = %job_id, "failed to record history entry: {}", e);
        }

        update_job(&jobs, &job_id, |job| {
            job.processed += 1;
            if success {
                job.success += 1;
            } else {
                job.failed += 1;
            }
        });
    }

    update_job(&jobs, &job_id, |job| {
        job.done = true;
        job.current_file = None;
        job.message = Some("Conversion complete".to_string());
    });
    info!(job_id = %job_id, "job finished");
}

/// Resolve and invoke the converter for one file. An unsupported
/// extension or target format fails here without any converter call.
async fn convert_one(
    registry: &ConverterRegistry,
    input: &Path,
    output_dir: &Path,
    output_format: &str,
    quality: Quality,
) -> Result<PathBuf, ConvertError> {
    let converter = registry.resolve(input)?;
    if !converter.supports_output(output_format) {
        return Err(ConvertError::UnsupportedOutput {
            converter: converter.name().to_string(),
            format: output_format.to_string(),
        });
    }
    let request = ConversionRequest::new(input, output_dir, output_format, quality);
    converter.convert(&request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::SqliteHistoryStore;
    use crate::testing::{mock_registry, MockConverter};
    use std::time::Duration;
    use tempfile::tempdir;

    fn runner_with_mock(mock: Arc<MockConverter>) -> (JobRunner, Arc<SqliteHistoryStore>) {
        let history = Arc::new(SqliteHistoryStore::in_memory().unwrap());
        let runner = JobRunner::new(
            Arc::new(mock_registry(mock)),
            Arc::clone(&history) as Arc<dyn HistoryStore>,
        );
        (runner, history)
    }

    async fn wait_done(runner: &JobRunner, job_id: &str) -> Job {
        for _ in 0..500 {
            if let Some(job) = runner.get(job_id) {
                assert_eq!(job.processed, job.success + job.failed);
                assert!(job.processed <= job.total);
                if job.done {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job did not finish in time");
    }

    #[tokio::test]
    async fn test_empty_file_list_rejected() {
        let (runner, _) = runner_with_mock(Arc::new(MockConverter::new()));
        let dir = tempdir().unwrap();
        let result = runner.submit(vec![], "pdf", dir.path(), Quality::Medium);
        assert!(matches!(result, Err(JobError::EmptyFileList)));
        assert_eq!(runner.job_count(), 0);
    }

    #[tokio::test]
    async fn test_mixed_batch_counts_and_history() {
        let mock = Arc::new(MockConverter::new());
        let (runner, history) = runner_with_mock(Arc::clone(&mock));
        let dir = tempdir().unwrap();
        let out_dir = dir.path().join("out");

        let files = vec![PathBuf::from("/in/a.png"), PathBuf::from("/in/b.unsupported")];
        let job_id = runner
            .submit(files, "pdf", &out_dir, Quality::Medium)
            .unwrap();

        let job = wait_done(&runner, &job_id).await;
        assert_eq!(job.total, 2);
        assert_eq!(job.processed, 2);
        assert_eq!(job.success, 1);
        assert_eq!(job.failed, 1);
        assert!(job.done);
        assert_eq!(job.message.as_deref(), Some("Conversion complete"));
        assert!(job.current_file.is_none());

        // The unsupported extension never reached a converter.
        assert_eq!(mock.invocation_count(), 1);

        let records = history.recent(10).unwrap();
        assert_eq!(records.len(), 2);
        // Most-recent-first: the unsupported file was processed last.
        assert_eq!(records[0].input_file, "/in/b.unsupported");
        assert!(!records[0].success);
        assert!(!records[0].error_message.as_deref().unwrap_or("").is_empty());
        assert_eq!(records[1].input_file, "/in/a.png");
        assert!(records[1].success);
        assert!(records[1].error_message.is_none());
    }

    #[tokio::test]
    async fn test_converter_failure_does_not_abort_batch() {
        let mock = Arc::new(MockConverter::new());
        mock.fail_with("codec exploded");
        let (runner, history) = runner_with_mock(Arc::clone(&mock));
        let dir = tempdir().unwrap();

        let files = vec![PathBuf::from("/in/a.png"), PathBuf::from("/in/b.png")];
        let job_id = runner
            .submit(files, "jpg", dir.path(), Quality::Medium)
            .unwrap();

        let job = wait_done(&runner, &job_id).await;
        assert_eq!(job.processed, 2);
        assert_eq!(job.failed, 2);
        assert_eq!(mock.invocation_count(), 2);

        let records = history.recent(10).unwrap();
        assert!(records
            .iter()
            .all(|r| r.error_message.as_deref().unwrap_or("").contains("codec exploded")));
    }

    #[tokio::test]
    async fn test_output_dir_creation_failure_is_job_fatal() {
        let mock = Arc::new(MockConverter::new());
        let (runner, history) = runner_with_mock(Arc::clone(&mock));
        let dir = tempdir().unwrap();

        // A regular file where a directory is needed makes create_dir_all fail.
        let blocking_file = dir.path().join("blocked");
        std::fs::write(&blocking_file, "x").unwrap();
        let bad_dir = blocking_file.join("out");

        let files = vec![PathBuf::from("/in/a.png"), PathBuf::from("/in/b.png")];
        let job_id = runner
            .submit(files, "jpg", &bad_dir, Quality::Medium)
            .unwrap();

        let job = wait_done(&runner, &job_id).await;
        assert_eq!(job.processed, job.total);
        assert_eq!(job.failed, job.total);
        assert_eq!(job.success, 0);
        assert!(job
            .message
            .as_deref()
            .unwrap_or("")
            .contains("output directory"));

        // Nothing was attempted: no converter call, no history rows.
        assert_eq!(mock.invocation_count(), 0);
        assert!(history.recent(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_progress_message_names_position() {
        let mock = Arc::new(MockConverter::new());
        mock.set_delay(Duration::from_millis(50));
        let (runner, _) = runner_with_mock(Arc::clone(&mock));
        let dir = tempdir().unwrap();

        let job_id = runner
            .submit(
                vec![PathBuf::from("/in/slow.png")],
                "jpg",
                dir.path(),
                Quality::Medium,
            )
            .unwrap();

        let mut saw_progress = false;
        for _ in 0..100 {
            if let Some(job) = runner.get(&job_id) {
                if let Some(message) = &job.message {
                    if message.contains("slow.png (1/1)") {
                        saw_progress = true;
                        break;
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert!(saw_progress, "progress message never observed");
        wait_done(&runner, &job_id).await;
    }

    #[tokio::test]
    async fn test_unknown_job_id() {
        let (runner, _) = runner_with_mock(Arc::new(MockConverter::new()));
        assert!(runner.get("never-issued").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_jobs_are_independent() {
        let mock = Arc::new(MockConverter::new());
        let (runner, _) = runner_with_mock(Arc::clone(&mock));
        let dir = tempdir().unwrap();

        let id1 = runner
            .submit(
                vec![PathBuf::from("/in/a.png")],
                "jpg",
                dir.path(),
                Quality::Medium,
            )
            .unwrap();
        let id2 = runner
            .submit(
                vec![PathBuf::from("/in/b.png"), PathBuf::from("/in/c.png")],
                "jpg",
                dir.path(),
                Quality::Medium,
            )
            .unwrap();
        assert_ne!(id1, id2);

        let job1 = wait_done(&runner, &id1).await;
        let job2 = wait_done(&runner, &id2).await;
        assert_eq!(job1.total, 1);
        assert_eq!(job2.total, 2);
        assert_eq!(runner.job_count(), 2);
    }
}
