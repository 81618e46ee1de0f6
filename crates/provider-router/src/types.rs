use serde::{Deserialize, Serialize};

/// How a provider finished one invocation. Truncation is not an error: the
/// text is usable but hit the model's output ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
	Complete,
	Truncated,
	Error,
}

/// Quality/cost numbers for one provider invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderMetrics {
	pub processing_ms: u64,
	/// processing time divided by audio duration; < 1.0 is faster than
	/// realtime. Only meaningful for transcription.
	pub realtime_factor: Option<f64>,
	/// Reported by local backends only; remote APIs do not expose it.
	pub peak_memory_bytes: Option<u64>,
	/// Similarity against the benchmark reference output, filled in by the
	/// benchmark report.
	pub similarity: Option<f64>,
}

/// Immutable outcome of one provider invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResult {
	pub provider_id: String,
	pub text: String,
	pub metrics: ProviderMetrics,
	pub completion: CompletionReason,
}

/// One recording handed to a speech provider.
#[derive(Debug, Clone)]
pub struct AudioInput {
	/// Opaque reference (path, URL, platform file id) for logging.
	pub reference: String,
	pub bytes: Vec<u8>,
	pub duration_secs: Option<f64>,
	/// BCP-47-ish language hint, forwarded to providers that accept one.
	pub language: Option<String>,
}

/// What a speech adapter returns; the router wraps it into a
/// [`ProviderResult`] with timing attached.
#[derive(Debug, Clone)]
pub struct TranscriptionOutput {
	pub text: String,
	pub completion: CompletionReason,
}

/// One language-model rewrite call.
#[derive(Debug, Clone)]
pub struct RewriteRequest {
	pub text: String,
	pub prompt: String,
	pub model: String,
	pub max_output_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct RewriteOutput {
	pub text: String,
	pub completion: CompletionReason,
	pub tokens_used: Option<u32>,
}

/// The rewrite variants a caller can ask for. Each mode carries its prompt
/// template and the label used when the result is handed downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
	/// Clean up filler words and lay the text out in paragraphs with
	/// headings, preserving all content.
	Structured,
	/// Condense to the key points.
	Summary,
	/// Rewrite in a polished, neutral written style.
	Stylized,
}

impl ProcessingMode {
	pub fn label(&self) -> &'static str {
		match self {
			Self::Structured => "structured",
			Self::Summary => "summary",
			Self::Stylized => "stylized",
		}
	}

	pub fn prompt(&self) -> &'static str {
		match self {
			Self::Structured => {
				"Rewrite the following transcript into well-organized text. Remove filler words and false starts, \
				 add paragraphs and headings where natural, and keep every substantive detail."
			}
			Self::Summary => "Summarize the following transcript. Keep the key points, decisions and action items; drop everything else.",
			Self::Stylized => "Rewrite the following transcript in a clear, polished written style, keeping the meaning and level of detail intact.",
		}
	}
}

impl std::fmt::Display for ProcessingMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.label())
	}
}
