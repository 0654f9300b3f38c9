//! Bounded, timeout-safe job execution.
//!
//! Every job runs on its own tokio task and is joined with a deadline.
//! A job that misses its deadline is abandoned, not aborted: its publish
//! gate is closed so the late result can never become visible, and a
//! watcher logs when the orphaned task finally ends.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};

use avkit_media::{remove_if_exists, MediaError, MediaOperation, OperationRequest, PublishGate};
use avkit_models::JobResult;

use crate::handle::MediaFileHandle;
use crate::job::Job;
use crate::logging::JobLogger;

/// Live executor counters.
#[derive(Debug, Default)]
struct ExecutorStats {
    in_flight: AtomicU64,
    abandoned_running: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
}

/// Point-in-time copy of the executor counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorSnapshot {
    /// Jobs whose caller is still waiting
    pub in_flight: u64,
    /// Timed-out jobs whose task has not finished yet
    pub abandoned: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
}

/// Runs media operations under a deadline and cleans up after them.
#[derive(Clone)]
pub struct BoundedExecutor {
    operation: Arc<dyn MediaOperation>,
    stats: Arc<ExecutorStats>,
}

impl BoundedExecutor {
    /// Create an executor running `operation` by default.
    pub fn new(operation: Arc<dyn MediaOperation>) -> Self {
        Self {
            operation,
            stats: Arc::new(ExecutorStats::default()),
        }
    }

    /// Current counters.
    pub fn stats(&self) -> ExecutorSnapshot {
        ExecutorSnapshot {
            in_flight: self.stats.in_flight.load(Ordering::SeqCst),
            abandoned: self.stats.abandoned_running.load(Ordering::SeqCst),
            succeeded: self.stats.succeeded.load(Ordering::SeqCst),
            failed: self.stats.failed.load(Ordering::SeqCst),
            timed_out: self.stats.timed_out.load(Ordering::SeqCst),
        }
    }

    /// Run `job` with the default operation.
    pub async fn run(&self, job: Job) -> JobResult {
        self.run_operation(Arc::clone(&self.operation), job).await
    }

    /// Run `job` with a specific operation.
    ///
    /// Always returns exactly one terminal result and removes every owned
    /// input of the job before returning. If this future is dropped early,
    /// the inputs are removed by their handles, the gate is closed and the
    /// still-running task is counted as abandoned.
    pub async fn run_operation(&self, operation: Arc<dyn MediaOperation>, job: Job) -> JobResult {
        let Job {
            id,
            params,
            inputs,
            output_path,
            deadline,
            created_at: _,
        } = job;

        let kind = params.kind();
        let logger = JobLogger::new(&id, kind.as_str());
        let span = logger.create_span();

        let gate = PublishGate::new();
        // Disarmed once a terminal result exists
        let close_on_drop = scopeguard::guard(gate.clone(), |gate| gate.abandon_now());

        self.stats.in_flight.fetch_add(1, Ordering::SeqCst);
        let stats = Arc::clone(&self.stats);
        let _in_flight = scopeguard::guard((), move |_| {
            stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        });

        let request = OperationRequest {
            job_id: id.clone(),
            inputs: inputs.iter().map(|h| h.path().to_path_buf()).collect(),
            output_path: output_path.clone(),
            params,
            gate: gate.clone(),
        };

        logger.log_start(&format!(
            "{} input(s) via {}, deadline {}s",
            inputs.len(),
            operation.name(),
            deadline.as_secs()
        ));

        let started = Instant::now();
        let task: OperationTask =
            tokio::spawn(async move { operation.execute(request).await }.instrument(span));

        // A caller that goes away leaves the task running; track it like a timeout
        let stats = Arc::clone(&self.stats);
        let drop_logger = logger.clone();
        let mut pending = scopeguard::guard(task, move |task| {
            if !task.is_finished() {
                drop_logger.log_warning("caller went away, abandoning task");
                watch_abandoned(&stats, task, drop_logger);
            }
        });

        let joined = tokio::time::timeout(deadline, &mut *pending).await;
        let task = scopeguard::ScopeGuard::into_inner(pending);

        let result = match joined {
            Ok(Ok(Ok(path))) => {
                logger.log_completion(&format!("output at {}", path.display()));
                JobResult::success(path)
            }
            Ok(Ok(Err(e))) => {
                let description = e.describe();
                logger.log_error(&description);
                discard_output(&output_path).await;
                JobResult::failure(description)
            }
            Ok(Err(join_error)) => {
                let description = format!("Operation task failed: {}", join_error);
                logger.log_error(&description);
                discard_output(&output_path).await;
                JobResult::failure(description)
            }
            Err(_) => {
                logger.log_warning(&format!(
                    "deadline of {}s exceeded, abandoning task",
                    deadline.as_secs()
                ));
                watch_abandoned(&self.stats, task, logger.clone());
                gate.abandon().await;
                discard_output(&output_path).await;
                JobResult::timeout(deadline.as_secs())
            }
        };

        scopeguard::ScopeGuard::into_inner(close_on_drop);

        remove_inputs(inputs, &logger).await;
        self.record(&result, kind.as_str(), started.elapsed().as_secs_f64());

        result
    }

    fn record(&self, result: &JobResult, operation: &str, elapsed_secs: f64) {
        let counter = match result {
            JobResult::Success { .. } => &self.stats.succeeded,
            JobResult::Failure { .. } => &self.stats.failed,
            JobResult::Timeout { .. } => &self.stats.timed_out,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let labels = [
            ("operation", operation.to_string()),
            ("status", result.as_str().to_string()),
        ];
        metrics::counter!("avkit_jobs_total", &labels).increment(1);
        metrics::histogram!("avkit_job_duration_seconds", &labels).record(elapsed_secs);
    }
}

type OperationTask = JoinHandle<Result<PathBuf, MediaError>>;

/// Count an abandoned task until it ends, then log how it ended.
fn watch_abandoned(stats: &Arc<ExecutorStats>, task: OperationTask, logger: JobLogger) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        logger.log_warning("no runtime to watch the abandoned task on");
        return;
    };

    let stats = Arc::clone(stats);
    stats.abandoned_running.fetch_add(1, Ordering::SeqCst);
    metrics::gauge!("avkit_jobs_abandoned_running").increment(1.0);

    runtime.spawn(async move {
        let started = Instant::now();
        match task.await {
            Ok(Err(MediaError::Abandoned)) => {
                info!(
                    job_id = %logger.job_id(),
                    late_by_secs = started.elapsed().as_secs_f64(),
                    "Abandoned job finished, output discarded"
                );
            }
            Ok(Ok(path)) => {
                // Published before the gate closed; the executor already removed it
                info!(
                    job_id = %logger.job_id(),
                    path = %path.display(),
                    "Abandoned job had published before its deadline was enforced"
                );
            }
            Ok(Err(e)) => {
                info!(
                    job_id = %logger.job_id(),
                    error = %e,
                    "Abandoned job finished with an error"
                );
            }
            Err(e) => {
                warn!(job_id = %logger.job_id(), error = %e, "Abandoned job task failed");
            }
        }
        stats.abandoned_running.fetch_sub(1, Ordering::SeqCst);
        metrics::gauge!("avkit_jobs_abandoned_running").decrement(1.0);
    });
}

async fn discard_output(path: &Path) {
    match remove_if_exists(path).await {
        Ok(true) => info!(path = %path.display(), "Removed unreported output"),
        Ok(false) => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove output"),
    }
}

async fn remove_inputs(inputs: Vec<MediaFileHandle>, logger: &JobLogger) {
    for handle in inputs {
        let path = handle.path().to_path_buf();
        if let Err(e) = handle.remove().await {
            logger.log_warning(&format!("failed to remove input {}: {}", path.display(), e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use avkit_media::MediaResult;
    use avkit_models::{MergeMethod, OperationParams};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Sleeps, then publishes a small file through the gate.
    struct SleepThenPublish {
        delay: Duration,
        seen_gate: Mutex<Option<PublishGate>>,
    }

    impl SleepThenPublish {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                seen_gate: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl MediaOperation for SleepThenPublish {
        fn name(&self) -> &'static str {
            "sleep_then_publish"
        }

        async fn execute(&self, request: OperationRequest) -> MediaResult<PathBuf> {
            *self.seen_gate.lock().unwrap() = Some(request.gate.clone());
            tokio::time::sleep(self.delay).await;
            request.gate.ensure_open()?;
            let scratch = request.output_path.with_extension("scratch");
            std::fs::write(&scratch, b"merged")?;
            request.gate.publish(&scratch, &request.output_path).await
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl MediaOperation for AlwaysFails {
        fn name(&self) -> &'static str {
            "always_fails"
        }

        async fn execute(&self, request: OperationRequest) -> MediaResult<PathBuf> {
            // Leave a stray output behind to check it gets removed
            std::fs::write(&request.output_path, b"partial")?;
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some("Invalid data found when processing input".to_string()),
                Some(1),
            ))
        }
    }

    struct Panics;

    #[async_trait]
    impl MediaOperation for Panics {
        fn name(&self) -> &'static str {
            "panics"
        }

        async fn execute(&self, _request: OperationRequest) -> MediaResult<PathBuf> {
            panic!("boom");
        }
    }

    fn merge_job(dir: &TempDir, deadline: Duration) -> (Job, Vec<PathBuf>) {
        let inputs: Vec<PathBuf> = ["a.mp4", "b.mp4"]
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                std::fs::write(&path, b"video").unwrap();
                path
            })
            .collect();

        let job = Job::new(
            OperationParams::Merge {
                method: MergeMethod::Concatenate,
            },
            inputs.iter().map(MediaFileHandle::owned).collect(),
            dir.path().join("merged_0123abcd.mp4"),
            deadline,
        )
        .unwrap();

        (job, inputs)
    }

    #[tokio::test]
    async fn test_success_publishes_and_removes_inputs() {
        let dir = TempDir::new().unwrap();
        let (job, inputs) = merge_job(&dir, Duration::from_secs(5));
        let output = job.output_path.clone();

        let executor = BoundedExecutor::new(Arc::new(SleepThenPublish::new(Duration::ZERO)));
        let result = executor.run(job).await;

        assert_eq!(result, JobResult::success(&output));
        assert!(output.exists());
        assert!(inputs.iter().all(|p| !p.exists()));

        let stats = executor.stats();
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn test_failure_removes_output_and_inputs() {
        let dir = TempDir::new().unwrap();
        let (job, inputs) = merge_job(&dir, Duration::from_secs(5));
        let output = job.output_path.clone();

        let executor = BoundedExecutor::new(Arc::new(AlwaysFails));
        let result = executor.run(job).await;

        match &result {
            JobResult::Failure { error } => {
                assert!(error.contains("Invalid data found when processing input"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(!output.exists());
        assert!(inputs.iter().all(|p| !p.exists()));
        assert_eq!(executor.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let dir = TempDir::new().unwrap();
        let (job, inputs) = merge_job(&dir, Duration::from_secs(5));

        let executor = BoundedExecutor::new(Arc::new(Panics));
        let result = executor.run(job).await;

        assert_eq!(result.as_str(), "failure");
        assert!(inputs.iter().all(|p| !p.exists()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_returns_timeout() {
        let dir = TempDir::new().unwrap();
        let (job, inputs) = merge_job(&dir, Duration::from_secs(300));
        let output = job.output_path.clone();

        let executor =
            BoundedExecutor::new(Arc::new(SleepThenPublish::new(Duration::from_secs(400))));
        let started = tokio::time::Instant::now();
        let result = executor.run(job).await;
        let elapsed = started.elapsed();

        assert_eq!(result, JobResult::timeout(300));
        assert!(elapsed >= Duration::from_secs(300));
        assert!(elapsed < Duration::from_secs(400));
        assert!(!output.exists());
        assert!(inputs.iter().all(|p| !p.exists()));

        let stats = executor.stats();
        assert_eq!(stats.timed_out, 1);
        assert_eq!(stats.succeeded, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_completion_is_not_published() {
        let dir = TempDir::new().unwrap();
        let (job, _inputs) = merge_job(&dir, Duration::from_secs(300));
        let output = job.output_path.clone();

        let executor =
            BoundedExecutor::new(Arc::new(SleepThenPublish::new(Duration::from_secs(301))));
        let result = executor.run(job).await;
        assert!(result.is_timeout());

        // Let the abandoned task run to completion
        tokio::time::sleep(Duration::from_secs(10)).await;
        for _ in 0..100 {
            if executor.stats().abandoned == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert!(!output.exists());
        assert!(!output.with_extension("scratch").exists());
        assert_eq!(executor.stats().abandoned, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_caller_closes_gate_and_removes_inputs() {
        let dir = TempDir::new().unwrap();
        let (job, inputs) = merge_job(&dir, Duration::from_secs(300));

        let operation = Arc::new(SleepThenPublish::new(Duration::from_secs(60)));
        let executor = BoundedExecutor::new(operation.clone());

        let outcome = tokio::time::timeout(Duration::from_secs(1), executor.run(job)).await;
        assert!(outcome.is_err());

        assert!(inputs.iter().all(|p| !p.exists()));
        let gate = operation.seen_gate.lock().unwrap().clone().unwrap();
        assert!(gate.is_abandoned());
        assert_eq!(executor.stats().in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_caller_counts_task_as_abandoned_until_it_ends() {
        let dir = TempDir::new().unwrap();
        let (job, _inputs) = merge_job(&dir, Duration::from_secs(300));
        let output = job.output_path.clone();

        let executor =
            BoundedExecutor::new(Arc::new(SleepThenPublish::new(Duration::from_secs(60))));

        let outcome = tokio::time::timeout(Duration::from_secs(1), executor.run(job)).await;
        assert!(outcome.is_err());
        assert_eq!(executor.stats().abandoned, 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        for _ in 0..100 {
            if executor.stats().abandoned == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(executor.stats().abandoned, 0);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_external_inputs_survive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("song.wav");
        std::fs::write(&path, b"audio").unwrap();

        let job = Job::new(
            OperationParams::AudioToVideo(Default::default()),
            vec![MediaFileHandle::external(&path)],
            dir.path().join("song_video_0123abcd.mp4"),
            Duration::from_secs(5),
        )
        .unwrap();

        let executor = BoundedExecutor::new(Arc::new(SleepThenPublish::new(Duration::ZERO)));
        assert!(executor.run(job).await.is_success());
        assert!(path.exists());
    }
}
