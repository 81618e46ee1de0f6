use serde::{Deserialize, Serialize};

/// Heuristic output-size estimator for language-model rewrites.
///
/// Token counts are approximated from character counts with a per-script
/// calibration ratio. Dense scripts (Cyrillic and other non-ASCII
/// alphabets) tokenize far less efficiently than ASCII text on the common
/// BPE vocabularies, so they get their own ratio.
///
/// The defaults are calibration starting points measured against observed
/// provider usage, not universal constants. Deployments processing a
/// different language mix should tune them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenEstimator {
	/// Characters per token for ASCII text.
	pub ascii_chars_per_token: f64,
	/// Characters per token for non-ASCII text.
	pub dense_chars_per_token: f64,
}

impl Default for TokenEstimator {
	fn default() -> Self {
		Self {
			ascii_chars_per_token: 4.0,
			dense_chars_per_token: 1.4,
		}
	}
}

impl TokenEstimator {
	/// Approximate the token count of `text`. Deterministic, no side effects.
	pub fn estimate_tokens(&self, text: &str) -> usize {
		let (ascii, dense) = text.chars().fold((0u64, 0u64), |(a, d), c| if c.is_ascii() { (a + 1, d) } else { (a, d + 1) });

		let tokens = ascii as f64 / self.ascii_chars_per_token + dense as f64 / self.dense_chars_per_token;
		tokens.ceil() as usize
	}

	/// Predicted output size of a rewrite of `text` under `prompt`.
	///
	/// A rewrite roughly reproduces its input, so the estimate is the input
	/// token count plus the prompt's own contribution.
	pub fn estimate_output_tokens(&self, text: &str, prompt: &str) -> usize {
		self.estimate_tokens(text) + self.estimate_tokens(prompt)
	}

	/// Will a rewrite of `text` blow through the model's output ceiling?
	pub fn will_exceed_output_limit(&self, text: &str, prompt: &str, max_output_tokens: u32) -> bool {
		self.estimate_output_tokens(text, prompt) > max_output_tokens as usize
	}
}
