use serde::{Deserialize, Serialize};

/// Closed set of speech model size/quality variants. The benchmark strategy
/// runs the cross product of backend x variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum WhisperModel {
	Tiny,
	Base,
	Small,
	Medium,
	LargeV3,
}

impl WhisperModel {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Tiny => "whisper-tiny",
			Self::Base => "whisper-base",
			Self::Small => "whisper-small",
			Self::Medium => "whisper-medium",
			Self::LargeV3 => "whisper-large-v3",
		}
	}

	/// Every variant, in ascending quality order. Used by the benchmark
	/// strategy to fan out configurations.
	pub fn all() -> [Self; 5] {
		[Self::Tiny, Self::Base, Self::Small, Self::Medium, Self::LargeV3]
	}
}

impl std::fmt::Display for WhisperModel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Tagged configuration for the small closed set of supported backends.
/// Each variant carries only the fields its backend needs and is matched
/// exhaustively by [`crate::adapter::build_adapter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ProviderConfig {
	/// OpenAI-compatible audio transcription endpoint.
	SpeechApi {
		base_url: String,
		api_key: Option<String>,
		model: WhisperModel,
	},
	/// OpenAI-compatible chat completion endpoint used for rewrites.
	ChatApi {
		base_url: String,
		api_key: Option<String>,
		model: String,
		max_output_tokens: u32,
	},
}

impl ProviderConfig {
	/// Stable identifier used in results, reports and logs.
	pub fn id(&self) -> String {
		match self {
			Self::SpeechApi { model, .. } => format!("speech-api/{model}"),
			Self::ChatApi { model, .. } => format!("chat-api/{model}"),
		}
	}
}

/// Policy governing how many and which providers one job's call reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
	/// Exactly one configured provider; errors pass through untouched.
	Single,
	/// Primary provider, then the secondary exactly once on transient
	/// failure.
	Fallback,
	/// Every configured provider sequentially against the same input.
	/// Diagnostic only: latency is the sum of all configurations.
	Benchmark,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn provider_ids_name_the_backend_and_model() {
		let speech = ProviderConfig::SpeechApi {
			base_url: "http://localhost:9000".into(),
			api_key: None,
			model: WhisperModel::Small,
		};
		assert_eq!(speech.id(), "speech-api/whisper-small");

		let chat = ProviderConfig::ChatApi {
			base_url: "http://localhost:8080".into(),
			api_key: None,
			model: "gpt-4o-mini".into(),
			max_output_tokens: 8192,
		};
		assert_eq!(chat.id(), "chat-api/gpt-4o-mini");
	}

	#[test]
	fn whisper_variants_cover_the_size_ladder() {
		assert_eq!(WhisperModel::all().len(), 5);
		assert_eq!(WhisperModel::LargeV3.as_str(), "whisper-large-v3");
	}
}
