use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::adapter::ProviderAdapter;
use crate::benchmark::BenchmarkReport;
use crate::config::RoutingStrategy;
use crate::error::ProviderError;
use crate::types::{AudioInput, CompletionReason, ProviderMetrics, ProviderResult, RewriteOutput, RewriteRequest};

/// Invocation counters shared with callers and tests.
#[derive(Debug, Default)]
pub struct RouterMetrics {
	pub calls: AtomicU64,
	pub successes: AtomicU64,
	pub timeouts: AtomicU64,
	pub provider_errors: AtomicU64,
	pub fallback_successes: AtomicU64,
}

impl RouterMetrics {
	pub fn snapshot(&self) -> (u64, u64, u64, u64) {
		(
			self.calls.load(Ordering::Relaxed),
			self.successes.load(Ordering::Relaxed),
			self.timeouts.load(Ordering::Relaxed),
			self.provider_errors.load(Ordering::Relaxed),
		)
	}
}

/// What one routing decision produced: a single result for normal traffic,
/// or a full report when the benchmark strategy ran.
#[derive(Debug)]
pub enum RouteOutcome {
	Result(ProviderResult),
	Report(BenchmarkReport),
}

/// Selects one or more provider adapters per job according to the
/// configured routing strategy and aggregates results and metrics.
///
/// Constructed once at startup and passed by reference into workers; owns
/// no per-job state beyond the shared counters.
pub struct ProviderRouter {
	strategy: RoutingStrategy,
	call_timeout: Duration,
	speech: Vec<Arc<dyn ProviderAdapter>>,
	language: Vec<Arc<dyn ProviderAdapter>>,
	/// Benchmark quality reference; defaults to the last (highest-quality)
	/// speech configuration.
	reference_provider: Option<String>,
	metrics: Arc<RouterMetrics>,
}

impl ProviderRouter {
	pub fn new(strategy: RoutingStrategy, call_timeout: Duration, speech: Vec<Arc<dyn ProviderAdapter>>, language: Vec<Arc<dyn ProviderAdapter>>) -> Self {
		Self {
			strategy,
			call_timeout,
			speech,
			language,
			reference_provider: None,
			metrics: Arc::new(RouterMetrics::default()),
		}
	}

	pub fn with_reference_provider(mut self, provider_id: impl Into<String>) -> Self {
		self.reference_provider = Some(provider_id.into());
		self
	}

	pub fn metrics(&self) -> Arc<RouterMetrics> {
		Arc::clone(&self.metrics)
	}

	pub fn strategy(&self) -> RoutingStrategy {
		self.strategy
	}

	/// Route one transcription according to the configured strategy.
	pub async fn transcribe(&self, audio: &AudioInput) -> Result<RouteOutcome, ProviderError> {
		match self.strategy {
			RoutingStrategy::Single => {
				let adapter = self.speech.first().ok_or(ProviderError::NotConfigured)?;
				self.timed_transcribe(adapter, audio).await.map(RouteOutcome::Result)
			}
			RoutingStrategy::Fallback => {
				let primary = self.speech.first().ok_or(ProviderError::NotConfigured)?;
				match self.timed_transcribe(primary, audio).await {
					Ok(result) => Ok(RouteOutcome::Result(result)),
					Err(err) if err.is_transient() => {
						let Some(secondary) = self.speech.get(1) else {
							return Err(err);
						};
						warn!(
							primary = primary.id(),
							secondary = secondary.id(),
							error = %err,
							"primary provider failed, trying fallback"
						);
						let result = self.timed_transcribe(secondary, audio).await?;
						self.metrics.fallback_successes.fetch_add(1, Ordering::Relaxed);
						Ok(RouteOutcome::Result(result))
					}
					Err(err) => Err(err),
				}
			}
			RoutingStrategy::Benchmark => Ok(RouteOutcome::Report(self.benchmark_all(audio).await)),
		}
	}

	/// Route one language-model rewrite. Benchmark is a transcription-side
	/// diagnostic, so rewrites under it get fallback semantics.
	pub async fn rewrite(&self, request: &RewriteRequest) -> Result<RewriteOutput, ProviderError> {
		let primary = self.language.first().ok_or(ProviderError::NotConfigured)?;
		match self.timed_rewrite(primary, request).await {
			Ok(output) => Ok(output),
			Err(err) if err.is_transient() && self.strategy != RoutingStrategy::Single => {
				let Some(secondary) = self.language.get(1) else {
					return Err(err);
				};
				warn!(
					primary = primary.id(),
					secondary = secondary.id(),
					error = %err,
					"primary language provider failed, trying fallback"
				);
				let output = self.timed_rewrite(secondary, request).await?;
				self.metrics.fallback_successes.fetch_add(1, Ordering::Relaxed);
				Ok(output)
			}
			Err(err) => Err(err),
		}
	}

	/// Run every speech configuration sequentially against the same input.
	/// Failures become `Error` entries instead of aborting the sweep.
	async fn benchmark_all(&self, audio: &AudioInput) -> BenchmarkReport {
		let mut results = Vec::with_capacity(self.speech.len());

		for adapter in &self.speech {
			info!(provider = adapter.id(), "benchmark: running configuration");
			match self.timed_transcribe(adapter, audio).await {
				Ok(result) => results.push(result),
				Err(err) => {
					warn!(provider = adapter.id(), error = %err, "benchmark: configuration failed");
					results.push(ProviderResult {
						provider_id: adapter.id().to_string(),
						text: String::new(),
						metrics: ProviderMetrics::default(),
						completion: CompletionReason::Error,
					});
				}
			}
		}

		let reference = self
			.reference_provider
			.clone()
			.or_else(|| self.speech.last().map(|a| a.id().to_string()));

		BenchmarkReport::from_results(results, reference)
	}

	async fn timed_transcribe(&self, adapter: &Arc<dyn ProviderAdapter>, audio: &AudioInput) -> Result<ProviderResult, ProviderError> {
		self.metrics.calls.fetch_add(1, Ordering::Relaxed);
		let started = Instant::now();

		match timeout(self.call_timeout, adapter.transcribe(audio)).await {
			Err(_) => {
				self.metrics.timeouts.fetch_add(1, Ordering::Relaxed);
				Err(ProviderError::Timeout {
					provider: adapter.id().to_string(),
					timeout: self.call_timeout,
				})
			}
			Ok(Err(err)) => {
				self.metrics.provider_errors.fetch_add(1, Ordering::Relaxed);
				Err(err)
			}
			Ok(Ok(output)) => {
				self.metrics.successes.fetch_add(1, Ordering::Relaxed);
				let processing_ms = started.elapsed().as_millis() as u64;
				let realtime_factor = audio.duration_secs.filter(|d| *d > 0.0).map(|d| processing_ms as f64 / 1000.0 / d);

				Ok(ProviderResult {
					provider_id: adapter.id().to_string(),
					text: output.text,
					metrics: ProviderMetrics {
						processing_ms,
						realtime_factor,
						peak_memory_bytes: None,
						similarity: None,
					},
					completion: output.completion,
				})
			}
		}
	}

	async fn timed_rewrite(&self, adapter: &Arc<dyn ProviderAdapter>, request: &RewriteRequest) -> Result<RewriteOutput, ProviderError> {
		self.metrics.calls.fetch_add(1, Ordering::Relaxed);

		match timeout(self.call_timeout, adapter.rewrite(request)).await {
			Err(_) => {
				self.metrics.timeouts.fetch_add(1, Ordering::Relaxed);
				Err(ProviderError::Timeout {
					provider: adapter.id().to_string(),
					timeout: self.call_timeout,
				})
			}
			Ok(Err(err)) => {
				self.metrics.provider_errors.fetch_add(1, Ordering::Relaxed);
				Err(err)
			}
			Ok(Ok(output)) => {
				self.metrics.successes.fetch_add(1, Ordering::Relaxed);
				Ok(output)
			}
		}
	}
}

#[cfg(test)]
pub(crate) mod test_support {
	use super::*;
	use async_trait::async_trait;
	use crate::types::TranscriptionOutput;

	/// Scripted adapter for router tests: succeeds, fails, or hangs.
	pub enum Behavior {
		Succeed { text: String, delay: Duration },
		Fail,
		Hang,
	}

	pub struct FakeAdapter {
		pub id: String,
		pub behavior: Behavior,
		pub transcribe_calls: AtomicU64,
		pub rewrite_calls: AtomicU64,
	}

	impl FakeAdapter {
		pub fn new(id: &str, behavior: Behavior) -> Arc<Self> {
			Arc::new(Self {
				id: id.to_string(),
				behavior,
				transcribe_calls: AtomicU64::new(0),
				rewrite_calls: AtomicU64::new(0),
			})
		}
	}

	#[async_trait]
	impl ProviderAdapter for FakeAdapter {
		fn id(&self) -> &str {
			&self.id
		}

		async fn transcribe(&self, _audio: &AudioInput) -> Result<TranscriptionOutput, ProviderError> {
			self.transcribe_calls.fetch_add(1, Ordering::Relaxed);
			match &self.behavior {
				Behavior::Succeed { text, delay } => {
					tokio::time::sleep(*delay).await;
					Ok(TranscriptionOutput {
						text: text.clone(),
						completion: CompletionReason::Complete,
					})
				}
				Behavior::Fail => Err(ProviderError::Call {
					provider: self.id.clone(),
					message: "scripted failure".into(),
				}),
				Behavior::Hang => {
					tokio::time::sleep(Duration::from_secs(3600)).await;
					unreachable!("hang behavior should always be timed out")
				}
			}
		}

		async fn rewrite(&self, _request: &RewriteRequest) -> Result<RewriteOutput, ProviderError> {
			self.rewrite_calls.fetch_add(1, Ordering::Relaxed);
			match &self.behavior {
				Behavior::Succeed { text, delay } => {
					tokio::time::sleep(*delay).await;
					Ok(RewriteOutput {
						text: text.clone(),
						completion: CompletionReason::Complete,
						tokens_used: None,
					})
				}
				Behavior::Fail => Err(ProviderError::Call {
					provider: self.id.clone(),
					message: "scripted failure".into(),
				}),
				Behavior::Hang => {
					tokio::time::sleep(Duration::from_secs(3600)).await;
					unreachable!("hang behavior should always be timed out")
				}
			}
		}
	}

	pub fn audio() -> AudioInput {
		AudioInput {
			reference: "test.ogg".into(),
			bytes: vec![0; 16],
			duration_secs: Some(2.0),
			language: None,
		}
	}
}
