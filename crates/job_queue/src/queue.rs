use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{OnceLock, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::QueueError;
use crate::job::{Job, JobOutput, JobPayload, JobRecord, JobStatus};
use crate::pool::PoolMetrics;

/// Bounded FIFO intake for processing jobs.
///
/// `submit` is non-blocking: when the queue is at capacity the job is
/// rejected immediately so the caller can surface "service busy" feedback
/// without holding resources. Backpressure, not unbounded queueing.
///
/// The record map is the single source of truth for job status; workers
/// update it through the pool, and the intake surface reads it.
pub struct JobQueue {
	tx: mpsc::Sender<Job>,
	rx: std::sync::Mutex<Option<mpsc::Receiver<Job>>>,
	capacity: usize,
	depth: AtomicUsize,
	accepting: AtomicBool,
	records: RwLock<HashMap<Uuid, JobRecord>>,
	metrics: OnceLock<PoolMetrics>,
}

impl JobQueue {
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		let (tx, rx) = mpsc::channel(capacity);
		Self {
			tx,
			rx: std::sync::Mutex::new(Some(rx)),
			capacity,
			depth: AtomicUsize::new(0),
			accepting: AtomicBool::new(true),
			records: RwLock::new(HashMap::new()),
			metrics: OnceLock::new(),
		}
	}

	/// Intake counters and the depth gauge live with the queue; the pool
	/// hands them over at construction. Attaching twice is a no-op.
	pub(crate) fn attach_metrics(&self, metrics: PoolMetrics) {
		metrics.queue_depth.set(self.depth() as i64);
		let _ = self.metrics.set(metrics);
	}

	fn sync_depth_gauge(&self) {
		if let Some(metrics) = self.metrics.get() {
			metrics.queue_depth.set(self.depth() as i64);
		}
	}

	/// Accept a job if the queue has a free slot, otherwise reject
	/// immediately with [`QueueError::Full`]. Never blocks.
	pub fn submit(&self, payload: JobPayload) -> Result<Uuid, QueueError> {
		if !self.accepting.load(Ordering::Acquire) {
			return Err(QueueError::ShuttingDown);
		}

		let job = Job::new(payload);
		let record = JobRecord {
			job: job.clone(),
			status: JobStatus::Queued,
			output: None,
			finished_at: None,
		};

		match self.tx.try_send(job) {
			Ok(()) => {
				self.depth.fetch_add(1, Ordering::AcqRel);
				let id = record.job.id;
				self.records.write().expect("records lock poisoned").insert(id, record);
				if let Some(metrics) = self.metrics.get() {
					metrics.jobs_accepted.inc();
				}
				self.sync_depth_gauge();
				debug!(job_id = %id, depth = self.depth(), "job accepted");
				Ok(id)
			}
			Err(mpsc::error::TrySendError::Full(_)) => {
				if let Some(metrics) = self.metrics.get() {
					metrics.jobs_rejected.inc();
				}
				warn!(capacity = self.capacity, "job rejected, queue full");
				Err(QueueError::Full(self.capacity))
			}
			Err(mpsc::error::TrySendError::Closed(_)) => Err(QueueError::ShuttingDown),
		}
	}

	/// Current number of queued (not yet started) jobs.
	pub fn depth(&self) -> usize {
		self.depth.load(Ordering::Acquire)
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn status(&self, id: Uuid) -> Option<JobStatus> {
		self.records.read().expect("records lock poisoned").get(&id).map(|r| r.status.clone())
	}

	pub fn record(&self, id: Uuid) -> Option<JobRecord> {
		self.records.read().expect("records lock poisoned").get(&id).cloned()
	}

	/// Stop accepting new jobs. Called once at the start of shutdown.
	pub(crate) fn close_intake(&self) {
		self.accepting.store(false, Ordering::Release);
	}

	/// Hand the single consumer end to the worker pool.
	pub(crate) fn take_receiver(&self) -> Option<mpsc::Receiver<Job>> {
		self.rx.lock().expect("receiver lock poisoned").take()
	}

	/// A worker pulled `id` off the queue.
	pub(crate) fn mark_started(&self, id: Uuid) {
		self.depth.fetch_sub(1, Ordering::AcqRel);
		self.sync_depth_gauge();
		self.set_status(id, JobStatus::InFlight);
	}

	pub(crate) fn mark_dequeued_for_shutdown(&self, id: Uuid) {
		self.depth.fetch_sub(1, Ordering::AcqRel);
		self.sync_depth_gauge();
		debug!(job_id = %id, "queued job cancelled by shutdown");
	}

	/// Terminal states are written once and never overwritten.
	pub(crate) fn set_status(&self, id: Uuid, status: JobStatus) {
		let mut records = self.records.write().expect("records lock poisoned");
		if let Some(record) = records.get_mut(&id) {
			if !record.status.is_terminal() {
				let terminal = status.is_terminal();
				record.status = status;
				if terminal {
					record.finished_at = Some(Utc::now());
				}
			}
		}
	}

	/// Drop records of jobs that reached a terminal state more than
	/// `older_than` ago. Returns the pruned ids so the caller can clean up
	/// whatever it keyed on them.
	pub fn prune_finished(&self, older_than: Duration) -> Vec<Uuid> {
		// A window too large to represent reaches back before any record.
		let cutoff = match chrono::Duration::from_std(older_than).ok().and_then(|window| Utc::now().checked_sub_signed(window)) {
			Some(cutoff) => cutoff,
			None => return Vec::new(),
		};
		let mut records = self.records.write().expect("records lock poisoned");
		let mut pruned = Vec::new();
		records.retain(|id, record| match record.finished_at {
			Some(finished_at) if record.status.is_terminal() && finished_at <= cutoff => {
				pruned.push(*id);
				false
			}
			_ => true,
		});
		if !pruned.is_empty() {
			debug!(pruned = pruned.len(), "finished job records dropped");
		}
		pruned
	}

	pub(crate) fn set_output(&self, id: Uuid, output: JobOutput) {
		let mut records = self.records.write().expect("records lock poisoned");
		if let Some(record) = records.get_mut(&id) {
			record.output = Some(output);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn payload() -> JobPayload {
		JobPayload {
			audio_ref: "voice/1.ogg".into(),
			language: None,
			duration_secs: Some(4.0),
			mode: None,
			caller: None,
		}
	}

	#[tokio::test]
	async fn accepts_until_capacity_then_rejects() {
		let queue = JobQueue::new(3);

		let mut accepted = Vec::new();
		for _ in 0..5 {
			match queue.submit(payload()) {
				Ok(id) => accepted.push(id),
				Err(err) => assert_eq!(err, QueueError::Full(3)),
			}
		}

		assert_eq!(accepted.len(), 3);
		assert_eq!(queue.depth(), 3);
		for id in accepted {
			assert_eq!(queue.status(id), Some(JobStatus::Queued));
		}
	}

	#[tokio::test]
	async fn closed_intake_rejects_with_shutdown() {
		let queue = JobQueue::new(3);
		queue.close_intake();
		assert_eq!(queue.submit(payload()), Err(QueueError::ShuttingDown));
	}

	#[tokio::test]
	async fn unknown_job_has_no_status() {
		let queue = JobQueue::new(1);
		assert!(queue.status(Uuid::new_v4()).is_none());
	}

	#[tokio::test]
	async fn intake_records_accepts_rejects_and_depth_in_metrics() {
		let registry = prometheus::Registry::new();
		let metrics = PoolMetrics::new(&registry).unwrap();
		let queue = JobQueue::new(2);
		queue.attach_metrics(metrics.clone());

		queue.submit(payload()).unwrap();
		queue.submit(payload()).unwrap();
		assert_eq!(queue.submit(payload()), Err(QueueError::Full(2)));

		assert_eq!(metrics.jobs_accepted.get(), 2);
		assert_eq!(metrics.jobs_rejected.get(), 1);
		assert_eq!(metrics.queue_depth.get(), 2);

		let names: Vec<String> = registry.gather().iter().map(|family| family.get_name().to_string()).collect();
		assert!(names.contains(&"pipeline_jobs_accepted".to_string()));
		assert!(names.contains(&"pipeline_jobs_rejected".to_string()));
	}

	#[tokio::test]
	async fn finished_records_are_pruned_after_retention() {
		let queue = JobQueue::new(4);
		let done = queue.submit(payload()).unwrap();
		let still_queued = queue.submit(payload()).unwrap();

		queue.set_status(done, JobStatus::Done);
		tokio::time::sleep(Duration::from_millis(5)).await;

		let pruned = queue.prune_finished(Duration::ZERO);
		assert_eq!(pruned, vec![done]);
		assert!(queue.record(done).is_none());
		// non-terminal jobs are never pruned, whatever their age
		assert_eq!(queue.status(still_queued), Some(JobStatus::Queued));
	}

	#[tokio::test]
	async fn young_finished_records_survive_the_sweep() {
		let queue = JobQueue::new(1);
		let id = queue.submit(payload()).unwrap();
		queue.set_status(id, JobStatus::Done);

		assert!(queue.prune_finished(Duration::from_secs(3600)).is_empty());
		assert!(queue.record(id).is_some());
	}

	#[tokio::test]
	async fn terminal_status_is_immutable() {
		let queue = JobQueue::new(1);
		let id = queue.submit(payload()).unwrap();

		queue.set_status(id, JobStatus::Done);
		queue.set_status(id, JobStatus::InFlight);
		assert_eq!(queue.status(id), Some(JobStatus::Done));
	}
}
