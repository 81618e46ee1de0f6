use prometheus::{IntCounter, IntGauge, Registry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::job::{Job, JobFailure, JobProcessor, JobStatus};
use crate::queue::JobQueue;

#[derive(Debug, Clone)]
pub struct PoolConfig {
	/// Number of concurrent workers. Kept small in production to respect
	/// memory and external-API rate limits.
	pub worker_count: usize,
	/// How long in-flight jobs get to finish during shutdown before they
	/// are forcibly cancelled.
	pub shutdown_grace: Duration,
}

impl Default for PoolConfig {
	fn default() -> Self {
		Self {
			worker_count: 3,
			shutdown_grace: Duration::from_secs(30),
		}
	}
}

/// Pool counters registered against an injected registry, exposed at
/// `/metrics` by the service.
#[derive(Clone)]
pub struct PoolMetrics {
	pub jobs_accepted: IntCounter,
	pub jobs_rejected: IntCounter,
	pub jobs_completed: IntCounter,
	pub jobs_failed: IntCounter,
	pub queue_depth: IntGauge,
	pub workers_busy: IntGauge,
}

impl PoolMetrics {
	pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
		let jobs_accepted = IntCounter::new("pipeline_jobs_accepted", "Jobs admitted into the intake queue")?;
		let jobs_rejected = IntCounter::new("pipeline_jobs_rejected", "Jobs bounced because the queue was full")?;
		let jobs_completed = IntCounter::new("pipeline_jobs_completed", "Jobs finished successfully")?;
		let jobs_failed = IntCounter::new("pipeline_jobs_failed", "Jobs that ended in failure")?;
		let queue_depth = IntGauge::new("pipeline_queue_depth", "Jobs waiting in the intake queue")?;
		let workers_busy = IntGauge::new("pipeline_workers_busy", "Workers currently processing a job")?;

		registry.register(Box::new(jobs_accepted.clone()))?;
		registry.register(Box::new(jobs_rejected.clone()))?;
		registry.register(Box::new(jobs_completed.clone()))?;
		registry.register(Box::new(jobs_failed.clone()))?;
		registry.register(Box::new(queue_depth.clone()))?;
		registry.register(Box::new(workers_busy.clone()))?;

		Ok(Self {
			jobs_accepted,
			jobs_rejected,
			jobs_completed,
			jobs_failed,
			queue_depth,
			workers_busy,
		})
	}
}

/// Fixed-size pool of workers pulling jobs off the shared FIFO queue.
///
/// Each worker executes one job at a time, so a job's stages never overlap
/// with themselves; up to `worker_count` different jobs run concurrently.
pub struct WorkerPool {
	queue: Arc<JobQueue>,
	processor: Arc<dyn JobProcessor>,
	config: PoolConfig,
	metrics: PoolMetrics,
	/// Stops workers from pulling further jobs.
	stop: CancellationToken,
	/// Aborts jobs that are still running after the grace period.
	hard_cancel: CancellationToken,
	handles: Mutex<Vec<JoinHandle<()>>>,
	shared_rx: Arc<Mutex<mpsc::Receiver<Job>>>,
}

impl WorkerPool {
	/// Panics if the queue's receiver was already taken (one pool per
	/// queue).
	pub fn new(queue: Arc<JobQueue>, processor: Arc<dyn JobProcessor>, config: PoolConfig, metrics: PoolMetrics) -> Self {
		let rx = queue.take_receiver().expect("queue receiver already taken");
		// The queue owns intake, so it records its own accept/reject
		// counts and keeps the depth gauge current.
		queue.attach_metrics(metrics.clone());
		Self {
			queue,
			processor,
			config,
			metrics,
			stop: CancellationToken::new(),
			hard_cancel: CancellationToken::new(),
			handles: Mutex::new(Vec::new()),
			shared_rx: Arc::new(Mutex::new(rx)),
		}
	}

	/// Spawn the workers. Returns once they are all running.
	pub async fn start(&self) {
		let mut handles = self.handles.lock().await;
		for worker_id in 0..self.config.worker_count.max(1) {
			let queue = Arc::clone(&self.queue);
			let processor = Arc::clone(&self.processor);
			let metrics = self.metrics.clone();
			let rx = Arc::clone(&self.shared_rx);
			let stop = self.stop.clone();
			let hard_cancel = self.hard_cancel.clone();

			handles.push(tokio::spawn(async move {
				worker_loop(worker_id, queue, processor, metrics, rx, stop, hard_cancel).await;
			}));
		}
		info!(workers = self.config.worker_count.max(1), "worker pool started");
	}

	/// Graceful shutdown: close intake, cancel not-yet-started jobs
	/// immediately, give in-flight jobs the grace period, then hard-cancel
	/// whatever is left.
	pub async fn shutdown(&self) {
		info!("worker pool shutting down");
		self.queue.close_intake();
		self.stop.cancel();

		// Drain jobs that never reached a worker; they fail with a
		// distinct shutdown reason so callers know resubmission is safe.
		{
			let mut rx = self.shared_rx.lock().await;
			while let Ok(job) = rx.try_recv() {
				self.queue.mark_dequeued_for_shutdown(job.id);
				self.queue.set_status(job.id, JobStatus::Failed { reason: JobFailure::Shutdown });
				self.metrics.jobs_failed.inc();
			}
		}

		let grace = self.config.shutdown_grace;
		let mut handles = self.handles.lock().await;
		let drain_all = async {
			for handle in handles.iter_mut() {
				let _ = handle.await;
			}
		};

		if tokio::time::timeout(grace, drain_all).await.is_err() {
			warn!(grace_secs = grace.as_secs(), "grace period elapsed, cancelling in-flight jobs");
			self.hard_cancel.cancel();
			for handle in handles.iter_mut() {
				let _ = handle.await;
			}
		}

		handles.clear();
		info!("worker pool stopped");
	}
}

async fn worker_loop(
	worker_id: usize,
	queue: Arc<JobQueue>,
	processor: Arc<dyn JobProcessor>,
	metrics: PoolMetrics,
	rx: Arc<Mutex<mpsc::Receiver<Job>>>,
	stop: CancellationToken,
	hard_cancel: CancellationToken,
) {
	info!(worker_id, "worker started");

	loop {
		// `recv` is cancel-safe: a message is only taken off the channel
		// when the arm completes, so a stop signal can win the race without
		// losing a queued job.
		let job = tokio::select! {
			biased;
			_ = stop.cancelled() => break,
			job = async { rx.lock().await.recv().await } => match job {
				Some(job) => job,
				None => break,
			},
		};

		queue.mark_started(job.id);
		metrics.workers_busy.inc();

		let wait_ms = (chrono::Utc::now() - job.submitted_at).num_milliseconds();
		info!(worker_id, job_id = %job.id, wait_ms, "job picked up");

		let outcome = tokio::select! {
			result = processor.process(&job) => result,
			_ = hard_cancel.cancelled() => Err(JobFailure::Shutdown),
		};

		match outcome {
			Ok(output) => {
				info!(worker_id, job_id = %job.id, mode = %output.mode_label, "job done");
				queue.set_output(job.id, output);
				queue.set_status(job.id, JobStatus::Done);
				metrics.jobs_completed.inc();
			}
			Err(reason) => {
				error!(worker_id, job_id = %job.id, %reason, "job failed");
				queue.set_status(job.id, JobStatus::Failed { reason });
				metrics.jobs_failed.inc();
			}
		}

		metrics.workers_busy.dec();
	}

	info!(worker_id, "worker exiting");
}
