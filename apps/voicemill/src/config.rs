use clap::Parser;
use provider_router::{RoutingStrategy, WhisperModel};
use std::time::Duration;

use crate::strategy::LongTextStrategy;

#[derive(Parser, Debug, Clone)]
#[command(name = "voicemill")]
#[command(about = "Voice-note transcription and rewrite pipeline", long_about = None)]
pub struct Config {
	/// HTTP intake listen address
	#[arg(long, env = "HTTP_ADDR", default_value = "0.0.0.0:8085")]
	pub http_addr: String,

	/// Maximum number of jobs waiting in the intake queue
	#[arg(long, env = "QUEUE_CAPACITY", default_value = "100")]
	pub queue_capacity: usize,

	/// Number of concurrent workers
	#[arg(long, env = "WORKER_COUNT", default_value = "3")]
	pub worker_count: usize,

	/// Per-provider call timeout in seconds
	#[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value = "120", value_parser = parse_duration)]
	pub provider_timeout: Duration,

	/// How long in-flight jobs may run during shutdown, in seconds
	#[arg(long, env = "SHUTDOWN_GRACE_SECS", default_value = "30", value_parser = parse_duration)]
	pub shutdown_grace: Duration,

	/// Provider routing strategy
	#[arg(long, env = "ROUTING_STRATEGY", value_enum, default_value = "single")]
	pub routing_strategy: RoutingStrategy,

	/// What to do when a rewrite is predicted to exceed the output budget
	#[arg(long, env = "LONG_TEXT_STRATEGY", value_enum, default_value = "model-switch")]
	pub long_text_strategy: LongTextStrategy,

	/// Chunk budget in characters for the chunking strategy
	#[arg(long, env = "CHUNK_MAX_CHARS", default_value_t = text_chunker::DEFAULT_MAX_CHUNK_CHARS)]
	pub chunk_max_chars: usize,

	/// Speech API base URL (OpenAI-compatible transcription endpoint)
	#[arg(long, env = "SPEECH_API_URL", default_value = "http://localhost:9000")]
	pub speech_api_url: String,

	#[arg(long, env = "SPEECH_API_KEY")]
	pub speech_api_key: Option<String>,

	/// Primary speech model variant
	#[arg(long, env = "SPEECH_MODEL", value_enum, default_value = "small")]
	pub speech_model: WhisperModel,

	/// Secondary speech endpoint for the fallback strategy; defaults to the
	/// primary URL when only the model differs
	#[arg(long, env = "SPEECH_FALLBACK_URL")]
	pub speech_fallback_url: Option<String>,

	#[arg(long, env = "SPEECH_FALLBACK_MODEL", value_enum)]
	pub speech_fallback_model: Option<WhisperModel>,

	/// Chat API base URL (OpenAI-compatible completion endpoint)
	#[arg(long, env = "CHAT_API_URL", default_value = "http://localhost:8080")]
	pub chat_api_url: String,

	#[arg(long, env = "CHAT_API_KEY")]
	pub chat_api_key: Option<String>,

	/// Default rewrite model
	#[arg(long, env = "CHAT_MODEL", default_value = "gpt-4o-mini")]
	pub chat_model: String,

	/// Secondary rewrite model for the fallback strategy
	#[arg(long, env = "CHAT_FALLBACK_MODEL")]
	pub chat_fallback_model: Option<String>,

	/// Output token ceiling of the default rewrite model
	#[arg(long, env = "MAX_OUTPUT_TOKENS", default_value = "8192")]
	pub max_output_tokens: u32,

	/// Larger-ceiling model used by the model-switch strategy
	#[arg(long, env = "CHAT_LONG_MODEL", default_value = "gpt-4o")]
	pub chat_long_model: String,

	/// Output token ceiling of the long model
	#[arg(long, env = "LONG_MODEL_MAX_OUTPUT_TOKENS", default_value = "16384")]
	pub long_model_max_output_tokens: u32,

	/// Variants retained per job before the oldest is evicted
	#[arg(long, env = "CACHE_MAX_VARIANTS", default_value = "10")]
	pub cache_max_variants: usize,

	/// Variant time-to-live in days
	#[arg(long, env = "CACHE_TTL_DAYS", default_value = "7")]
	pub cache_ttl_days: u64,

	/// How long finished job records (and their sessions and variants) are
	/// retained before the periodic sweep drops them, in days
	#[arg(long, env = "RETENTION_DAYS", default_value = "7")]
	pub retention_days: u64,
}

impl Config {
	pub fn validate(&self) -> Result<(), String> {
		if self.queue_capacity == 0 {
			return Err("queue_capacity must be at least 1".to_string());
		}
		if self.worker_count == 0 {
			return Err("worker_count must be at least 1".to_string());
		}
		if self.provider_timeout.is_zero() {
			return Err("provider_timeout_secs must be greater than 0".to_string());
		}
		if self.chunk_max_chars == 0 {
			return Err("chunk_max_chars must be greater than 0".to_string());
		}
		if self.max_output_tokens == 0 || self.long_model_max_output_tokens == 0 {
			return Err("output token ceilings must be greater than 0".to_string());
		}
		if self.cache_max_variants == 0 {
			return Err("cache_max_variants must be at least 1".to_string());
		}
		Ok(())
	}

	pub fn cache_ttl(&self) -> Duration {
		Duration::from_secs(self.cache_ttl_days * 24 * 60 * 60)
	}

	pub fn retention(&self) -> Duration {
		Duration::from_secs(self.retention_days * 24 * 60 * 60)
	}
}

fn parse_duration(s: &str) -> Result<Duration, std::num::ParseIntError> {
	s.parse::<u64>().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn base() -> Config {
		Config::try_parse_from(["voicemill"]).unwrap()
	}

	#[test]
	fn defaults_match_the_documented_surface() {
		let config = base();
		assert_eq!(config.queue_capacity, 100);
		assert_eq!(config.worker_count, 3);
		assert_eq!(config.provider_timeout, Duration::from_secs(120));
		assert_eq!(config.routing_strategy, RoutingStrategy::Single);
		assert_eq!(config.long_text_strategy, LongTextStrategy::ModelSwitch);
		assert_eq!(config.chunk_max_chars, text_chunker::DEFAULT_MAX_CHUNK_CHARS);
		assert_eq!(config.chunk_max_chars, 8000);
		assert_eq!(config.max_output_tokens, 8192);
		assert_eq!(config.cache_max_variants, 10);
		assert_eq!(config.cache_ttl_days, 7);
		assert_eq!(config.retention_days, 7);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn zero_values_fail_validation() {
		let mut config = base();
		config.queue_capacity = 0;
		assert!(config.validate().is_err());

		let mut config = base();
		config.worker_count = 0;
		assert!(config.validate().is_err());

		let mut config = base();
		config.max_output_tokens = 0;
		assert!(config.validate().is_err());
	}

	#[test]
	fn strategy_flags_parse() {
		let config = Config::try_parse_from(["voicemill", "--routing-strategy", "fallback", "--long-text-strategy", "chunking"]).unwrap();
		assert_eq!(config.routing_strategy, RoutingStrategy::Fallback);
		assert_eq!(config.long_text_strategy, LongTextStrategy::Chunking);
	}

	#[test]
	fn cache_ttl_is_days() {
		let mut config = base();
		config.cache_ttl_days = 2;
		assert_eq!(config.cache_ttl(), Duration::from_secs(2 * 24 * 3600));
	}
}
