use async_trait::async_trait;
use chrono::{DateTime, Utc};
use provider_router::ProcessingMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// What a caller submits: a recording to transcribe, optionally followed by
/// a language-model rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
	/// Opaque audio reference (path, URL, platform file id).
	pub audio_ref: String,
	/// Language hint forwarded to speech providers.
	#[serde(default)]
	pub language: Option<String>,
	/// Recording length when the caller knows it; feeds realtime-factor
	/// metrics.
	#[serde(default)]
	pub duration_secs: Option<f64>,
	/// Requested rewrite mode; `None` means transcript only.
	#[serde(default)]
	pub mode: Option<ProcessingMode>,
	/// Owning caller reference (chat id, user id, ...).
	#[serde(default)]
	pub caller: Option<String>,
}

/// One unit of work. Immutable once created; only the worker that owns the
/// job mutates its record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
	pub id: Uuid,
	pub payload: JobPayload,
	pub submitted_at: DateTime<Utc>,
}

impl Job {
	pub fn new(payload: JobPayload) -> Self {
		Self {
			id: Uuid::new_v4(),
			payload,
			submitted_at: Utc::now(),
		}
	}
}

/// Why a job failed. Shutdown cancellation is reported distinctly so
/// callers can decide whether resubmitting makes sense.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum JobFailure {
	#[error("provider failure: {0}")]
	Provider(String),

	#[error("job cancelled during shutdown")]
	Shutdown,

	#[error("internal error: {0}")]
	Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
	Queued,
	InFlight,
	Done,
	Failed { reason: JobFailure },
	Rejected,
}

impl JobStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Done | Self::Failed { .. } | Self::Rejected)
	}
}

/// Plain processed text plus its mode label, ready for the export handoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutput {
	pub text: String,
	pub mode_label: String,
	pub truncated: bool,
	/// Raw transcript, retained so a later request for another mode can
	/// skip re-transcription. Absent for benchmark runs.
	pub transcript: Option<String>,
}

/// Everything the intake surface knows about one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
	pub job: Job,
	pub status: JobStatus,
	pub output: Option<JobOutput>,
	/// When the job reached a terminal state; drives record retention.
	#[serde(default)]
	pub finished_at: Option<DateTime<Utc>>,
}

/// The stage sequence a worker runs one job through. Implemented by the
/// pipeline; injected into the pool at startup.
#[async_trait]
pub trait JobProcessor: Send + Sync + 'static {
	async fn process(&self, job: &Job) -> Result<JobOutput, JobFailure>;
}
