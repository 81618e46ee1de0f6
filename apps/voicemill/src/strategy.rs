use provider_router::{CompletionReason, ProcessingMode, ProviderError, ProviderRouter, RewriteRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use text_chunker::{merge, split, TokenEstimator};
use tracing::{info, warn};
use uuid::Uuid;

/// Appended to the returned text whenever a model signalled a truncated
/// completion. Truncation is never silent.
pub const TRUNCATION_NOTICE: &str = "\n\n⚠️ The response may be incomplete: the model hit its output limit.";

/// How to handle a rewrite that is predicted to exceed the active model's
/// output budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LongTextStrategy {
	/// Re-issue the same request against a model with a larger output
	/// ceiling, no chunking.
	ModelSwitch,
	/// Split the input on sentence boundaries, rewrite each chunk through
	/// the router, merge in order.
	Chunking,
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
	pub name: String,
	pub max_output_tokens: u32,
}

/// One rewrite request flowing through the selector. Not persisted beyond
/// the request lifetime.
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
	pub job_id: Uuid,
	pub mode: ProcessingMode,
	pub text: String,
}

#[derive(Debug, Clone)]
pub struct RewriteOutcome {
	pub text: String,
	pub truncated: bool,
}

/// Long-output strategy selector.
///
/// Estimates the output size of every rewrite up front and prefers the
/// direct under-limit path; an over-limit request gets exactly one of the
/// configured strategies, never both, and never a retry across strategies.
pub struct StrategySelector {
	router: Arc<ProviderRouter>,
	estimator: TokenEstimator,
	long_text: LongTextStrategy,
	chunk_max_chars: usize,
	default_model: ModelSpec,
	extended_model: ModelSpec,
}

impl StrategySelector {
	pub fn new(router: Arc<ProviderRouter>, estimator: TokenEstimator, long_text: LongTextStrategy, chunk_max_chars: usize, default_model: ModelSpec, extended_model: ModelSpec) -> Self {
		Self {
			router,
			estimator,
			long_text,
			chunk_max_chars: chunk_max_chars.max(1),
			default_model,
			extended_model,
		}
	}

	pub async fn process(&self, request: &ProcessingRequest) -> Result<RewriteOutcome, ProviderError> {
		let prompt = request.mode.prompt();

		if !self.estimator.will_exceed_output_limit(&request.text, prompt, self.default_model.max_output_tokens) {
			let output = self.router.rewrite(&self.rewrite_request(&request.text, prompt, &self.default_model)).await?;
			return Ok(finish(output.text, output.completion == CompletionReason::Truncated));
		}

		let estimate = self.estimator.estimate_output_tokens(&request.text, prompt);
		info!(
			job_id = %request.job_id,
			mode = %request.mode,
			estimate,
			ceiling = self.default_model.max_output_tokens,
			strategy = ?self.long_text,
			"rewrite over output budget, applying long-text strategy"
		);

		match self.long_text {
			LongTextStrategy::ModelSwitch => {
				let output = self.router.rewrite(&self.rewrite_request(&request.text, prompt, &self.extended_model)).await?;
				Ok(finish(output.text, output.completion == CompletionReason::Truncated))
			}
			LongTextStrategy::Chunking => self.process_chunked(request, prompt).await,
		}
	}

	/// One router call per chunk; any chunk failure aborts the whole
	/// rewrite so a partial merge is never returned.
	async fn process_chunked(&self, request: &ProcessingRequest, prompt: &str) -> Result<RewriteOutcome, ProviderError> {
		let chunks = split(&request.text, self.chunk_max_chars);
		info!(job_id = %request.job_id, chunks = chunks.len(), "chunking long input");

		let mut truncated = false;
		let mut outputs = Vec::with_capacity(chunks.len());

		for (index, chunk) in chunks.iter().enumerate() {
			let output = self.router.rewrite(&self.rewrite_request(chunk, prompt, &self.default_model)).await.map_err(|err| {
				warn!(job_id = %request.job_id, chunk = index, error = %err, "chunk rewrite failed, aborting merge");
				err
			})?;

			truncated |= output.completion == CompletionReason::Truncated;

			// Model outputs carry no separators of their own; keep chunk
			// boundaries readable before the ordered merge.
			let mut piece = output.text.trim_end().to_string();
			if index + 1 < chunks.len() {
				piece.push_str("\n\n");
			}
			outputs.push(piece);
		}

		Ok(finish(merge(&outputs), truncated))
	}

	fn rewrite_request(&self, text: &str, prompt: &str, model: &ModelSpec) -> RewriteRequest {
		RewriteRequest {
			text: text.to_string(),
			prompt: prompt.to_string(),
			model: model.name.clone(),
			max_output_tokens: model.max_output_tokens,
		}
	}
}

fn finish(mut text: String, truncated: bool) -> RewriteOutcome {
	if truncated {
		text.push_str(TRUNCATION_NOTICE);
	}
	RewriteOutcome { text, truncated }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{MockChatAdapter, Script};
	use provider_router::RoutingStrategy;
	use std::sync::atomic::Ordering;
	use std::time::Duration;

	fn selector_with(adapter: Arc<MockChatAdapter>, long_text: LongTextStrategy, chunk_max_chars: usize) -> StrategySelector {
		let router = Arc::new(ProviderRouter::new(RoutingStrategy::Single, Duration::from_secs(5), vec![], vec![adapter as Arc<dyn provider_router::ProviderAdapter>]));
		StrategySelector::new(
			router,
			TokenEstimator::default(),
			long_text,
			chunk_max_chars,
			ModelSpec {
				name: "default-model".into(),
				max_output_tokens: 100,
			},
			ModelSpec {
				name: "extended-model".into(),
				max_output_tokens: 1000,
			},
		)
	}

	fn request(text: &str) -> ProcessingRequest {
		ProcessingRequest {
			job_id: Uuid::new_v4(),
			mode: ProcessingMode::Summary,
			text: text.into(),
		}
	}

	#[tokio::test]
	async fn under_limit_goes_direct_with_the_default_model() {
		let adapter = MockChatAdapter::new(Script::Echo);
		let selector = selector_with(adapter.clone(), LongTextStrategy::ModelSwitch, 50);

		let outcome = selector.process(&request("short note.")).await.unwrap();
		assert!(!outcome.truncated);
		assert_eq!(adapter.rewrite_calls.load(Ordering::SeqCst), 1);
		assert_eq!(adapter.models_seen(), vec!["default-model"]);
	}

	#[tokio::test]
	async fn over_limit_switches_models_when_configured() {
		let adapter = MockChatAdapter::new(Script::Echo);
		let selector = selector_with(adapter.clone(), LongTextStrategy::ModelSwitch, 50);

		// ~500 estimated tokens against a ceiling of 100
		let long_text = "word ".repeat(400);
		let outcome = selector.process(&request(&long_text)).await.unwrap();

		assert!(!outcome.truncated);
		assert_eq!(adapter.rewrite_calls.load(Ordering::SeqCst), 1, "model switch must not chunk");
		assert_eq!(adapter.models_seen(), vec!["extended-model"]);
	}

	#[tokio::test]
	async fn over_limit_chunks_when_configured() {
		let adapter = MockChatAdapter::new(Script::Echo);
		let selector = selector_with(adapter.clone(), LongTextStrategy::Chunking, 500);

		let long_text = "A sentence that repeats. ".repeat(80); // 2000 chars
		let outcome = selector.process(&request(&long_text)).await.unwrap();

		let expected_chunks = split(&long_text, 500).len();
		assert!(expected_chunks > 1);
		assert_eq!(adapter.rewrite_calls.load(Ordering::SeqCst) as usize, expected_chunks);
		// every chunk call stays on the default model
		assert!(adapter.models_seen().iter().all(|m| m == "default-model"));
		// merged output keeps every chunk, in order
		for chunk in split(&long_text, 500) {
			assert!(outcome.text.contains(chunk.trim_end()));
		}
	}

	#[tokio::test]
	async fn chunk_failure_aborts_the_whole_rewrite() {
		let adapter = MockChatAdapter::new(Script::FailOnCall(1));
		let selector = selector_with(adapter.clone(), LongTextStrategy::Chunking, 500);

		let long_text = "A sentence that repeats. ".repeat(80);
		let err = selector.process(&request(&long_text)).await;
		assert!(err.is_err(), "partial merges must not be returned");
	}

	#[tokio::test]
	async fn truncated_completion_is_annotated_not_silent() {
		let adapter = MockChatAdapter::new(Script::EchoTruncated);
		let selector = selector_with(adapter.clone(), LongTextStrategy::ModelSwitch, 50);

		let outcome = selector.process(&request("short note.")).await.unwrap();
		assert!(outcome.truncated);
		assert!(outcome.text.ends_with(TRUNCATION_NOTICE));
		assert!(outcome.text.len() > TRUNCATION_NOTICE.len(), "full available text is kept");
	}

	/// Reference case from production logs: 22,396 chars estimated around
	/// 16k output tokens against an 8,192 ceiling must never take the
	/// direct path.
	#[tokio::test]
	async fn production_length_case_selects_the_over_limit_branch() {
		let adapter = MockChatAdapter::new(Script::Echo);
		let router = Arc::new(ProviderRouter::new(RoutingStrategy::Single, Duration::from_secs(5), vec![], vec![adapter.clone() as Arc<dyn provider_router::ProviderAdapter>]));
		let selector = StrategySelector::new(
			router,
			TokenEstimator::default(),
			LongTextStrategy::ModelSwitch,
			8_000,
			ModelSpec {
				name: "default-model".into(),
				max_output_tokens: 8_192,
			},
			ModelSpec {
				name: "extended-model".into(),
				max_output_tokens: 16_384,
			},
		);

		let text: String = "Это длинная голосовая заметка, которую нужно переписать целиком. ".repeat(400).chars().take(22_396).collect();

		selector.process(&request(&text)).await.unwrap();
		assert_eq!(adapter.models_seen(), vec!["extended-model"]);
	}
}
