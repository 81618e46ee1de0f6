use async_trait::async_trait;
use job_queue::{Job, JobFailure, JobOutput, JobPayload, JobProcessor};
use provider_router::{AudioInput, CompletionReason, ProcessingMode, ProviderError, ProviderRouter, RouteOutcome};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use variant_cache::{Variant, VariantCache};

use crate::session::{SessionEvent, SessionStore};
use crate::state::PipelineState;
use crate::strategy::{ProcessingRequest, StrategySelector};

/// The stage sequence one worker runs a job through: transcribe via the
/// router, then optionally rewrite via the strategy selector, with the
/// variant cache consulted first.
///
/// Router, selector and cache are injected at startup and shared across
/// workers; the pipeline itself holds no per-job state.
pub struct Pipeline {
	router: Arc<ProviderRouter>,
	selector: StrategySelector,
	cache: Arc<VariantCache<ProcessingMode>>,
	state: Arc<PipelineState>,
	sessions: Arc<SessionStore>,
}

impl Pipeline {
	pub fn new(router: Arc<ProviderRouter>, selector: StrategySelector, cache: Arc<VariantCache<ProcessingMode>>, state: Arc<PipelineState>, sessions: Arc<SessionStore>) -> Self {
		Self {
			router,
			selector,
			cache,
			state,
			sessions,
		}
	}

	/// Session bookkeeping never fails a job; an out-of-order event is
	/// logged and dropped.
	fn advance_session(&self, job_id: Uuid, event: SessionEvent) {
		if let Err(err) = self.sessions.advance(job_id, event) {
			warn!(%job_id, error = %err, "session transition skipped");
		}
	}

	/// Serve the variant for (job, mode) from cache, or compute and store
	/// it. A cache hit never reaches a provider.
	pub async fn variant_for(&self, job_id: Uuid, mode: ProcessingMode, transcript: &str) -> Result<Variant, ProviderError> {
		if let Some(variant) = self.cache.get(job_id, &mode).await {
			debug!(%job_id, %mode, "variant served from cache");
			self.state.cache_hits.fetch_add(1, Ordering::Relaxed);
			return Ok(variant);
		}
		self.state.cache_misses.fetch_add(1, Ordering::Relaxed);

		let request = ProcessingRequest {
			job_id,
			mode,
			text: transcript.to_string(),
		};
		let outcome = self.selector.process(&request).await?;

		self.state.rewrites_completed.fetch_add(1, Ordering::Relaxed);
		if outcome.truncated {
			self.state.truncations.fetch_add(1, Ordering::Relaxed);
		}

		self.cache.put(job_id, mode, outcome.text.clone(), outcome.truncated).await;
		// Serve what we computed; a racing writer for the same key would
		// have produced content-equivalent text.
		Ok(Variant {
			text: outcome.text,
			truncated: outcome.truncated,
			created_at: std::time::Instant::now(),
		})
	}

	async fn load_audio(&self, payload: &JobPayload) -> Result<AudioInput, JobFailure> {
		let bytes = tokio::fs::read(&payload.audio_ref)
			.await
			.map_err(|e| JobFailure::Internal(format!("cannot read audio '{}': {e}", payload.audio_ref)))?;

		Ok(AudioInput {
			reference: payload.audio_ref.clone(),
			bytes,
			duration_secs: payload.duration_secs,
			language: payload.language.clone(),
		})
	}
}

#[async_trait]
impl JobProcessor for Pipeline {
	async fn process(&self, job: &Job) -> Result<JobOutput, JobFailure> {
		// Jobs without a chosen mode transcribe while the session stays in
		// its mode-selection state.
		if job.payload.mode.is_some() {
			self.advance_session(job.id, SessionEvent::ProcessingStarted);
		}

		let audio = self.load_audio(&job.payload).await?;

		let outcome = self.router.transcribe(&audio).await.map_err(|e| JobFailure::Provider(e.to_string()))?;

		let result = match outcome {
			RouteOutcome::Report(report) => {
				self.state.benchmarks_run.fetch_add(1, Ordering::Relaxed);
				info!(job_id = %job.id, configurations = report.results.len(), "benchmark sweep finished");
				return Ok(JobOutput {
					text: report.to_markdown(),
					mode_label: "benchmark".into(),
					truncated: false,
					transcript: None,
				});
			}
			RouteOutcome::Result(result) => result,
		};

		self.state.transcriptions_completed.fetch_add(1, Ordering::Relaxed);
		info!(
			job_id = %job.id,
			provider = %result.provider_id,
			processing_ms = result.metrics.processing_ms,
			"transcription finished"
		);

		let Some(mode) = job.payload.mode else {
			return Ok(JobOutput {
				text: result.text.clone(),
				mode_label: "transcript".into(),
				truncated: result.completion == CompletionReason::Truncated,
				transcript: Some(result.text),
			});
		};

		let variant = self.variant_for(job.id, mode, &result.text).await.map_err(|e| JobFailure::Provider(e.to_string()))?;
		self.advance_session(job.id, SessionEvent::ResultReady);

		Ok(JobOutput {
			text: variant.text,
			mode_label: mode.label().to_string(),
			truncated: variant.truncated,
			transcript: Some(result.text),
		})
	}
}
