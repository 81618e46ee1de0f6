use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::{CompletionReason, ProviderResult};

/// Outcome of one benchmark sweep: every configuration's result plus
/// derived rankings. Read-only once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
	pub results: Vec<ProviderResult>,
	pub reference_provider: Option<String>,
	/// Provider id with the lowest processing time among successes.
	pub fastest: Option<String>,
	/// Provider id with the highest similarity to the reference output.
	pub best_quality: Option<String>,
	/// Provider id with the best quality-per-time trade-off.
	pub best_balance: Option<String>,
}

impl BenchmarkReport {
	/// Fill in similarity scores against the reference provider's output
	/// and derive the rankings.
	pub fn from_results(mut results: Vec<ProviderResult>, reference_provider: Option<String>) -> Self {
		let reference_text = reference_provider
			.as_deref()
			.and_then(|id| results.iter().find(|r| r.provider_id == id && r.completion != CompletionReason::Error))
			.map(|r| r.text.clone());

		if let Some(reference) = &reference_text {
			for result in &mut results {
				if result.completion != CompletionReason::Error {
					result.metrics.similarity = Some(similarity(reference, &result.text));
				}
			}
		}

		let successes = || results.iter().filter(|r| r.completion != CompletionReason::Error);

		let fastest = successes().min_by_key(|r| r.metrics.processing_ms).map(|r| r.provider_id.clone());

		let best_quality = successes()
			.filter_map(|r| r.metrics.similarity.map(|s| (r, s)))
			.max_by(|(_, a), (_, b)| a.total_cmp(b))
			.map(|(r, _)| r.provider_id.clone());

		// Balance: similarity scaled by how close the run is to the fastest
		// one. A slightly worse transcript that finishes in half the time
		// wins over a marginally better but much slower one.
		let min_ms = successes().map(|r| r.metrics.processing_ms.max(1)).min();
		let best_balance = min_ms.and_then(|min_ms| {
			successes()
				.filter_map(|r| {
					let similarity = r.metrics.similarity?;
					let time_ratio = min_ms as f64 / r.metrics.processing_ms.max(1) as f64;
					Some((r, similarity * time_ratio))
				})
				.max_by(|(_, a), (_, b)| a.total_cmp(b))
				.map(|(r, _)| r.provider_id.clone())
		});

		Self {
			results,
			reference_provider,
			fastest,
			best_quality,
			best_balance,
		}
	}

	/// Render the ranked table delivered to the caller as an attachment.
	pub fn to_markdown(&self) -> String {
		let mut out = String::from("# Provider benchmark\n\n");

		if let Some(reference) = &self.reference_provider {
			out.push_str(&format!("Quality reference: `{reference}`\n\n"));
		}

		out.push_str("| provider | time (ms) | realtime factor | peak memory | quality | completion |\n");
		out.push_str("|---|---|---|---|---|---|\n");

		for result in &self.results {
			let rtf = result.metrics.realtime_factor.map_or_else(|| "-".to_string(), |v| format!("{v:.2}x"));
			let memory = result
				.metrics
				.peak_memory_bytes
				.map_or_else(|| "-".to_string(), |b| format!("{:.1} MiB", b as f64 / (1024.0 * 1024.0)));
			let quality = result.metrics.similarity.map_or_else(|| "-".to_string(), |s| format!("{s:.3}"));
			let completion = match result.completion {
				CompletionReason::Complete => "complete",
				CompletionReason::Truncated => "truncated",
				CompletionReason::Error => "error",
			};
			out.push_str(&format!(
				"| {} | {} | {} | {} | {} | {} |\n",
				result.provider_id, result.metrics.processing_ms, rtf, memory, quality, completion
			));
		}

		out.push('\n');
		if let Some(fastest) = &self.fastest {
			out.push_str(&format!("- fastest: `{fastest}`\n"));
		}
		if let Some(best) = &self.best_quality {
			out.push_str(&format!("- highest quality: `{best}`\n"));
		}
		if let Some(balance) = &self.best_balance {
			out.push_str(&format!("- best balance: `{balance}`\n"));
		}

		out
	}
}

/// Dice coefficient over lowercased word sets. Crude but monotonic enough
/// to rank transcripts of the same recording; 1.0 means identical word
/// sets, 0.0 means disjoint.
pub fn similarity(a: &str, b: &str) -> f64 {
	let words_a: HashSet<String> = a.split_whitespace().map(|w| w.to_lowercase()).collect();
	let words_b: HashSet<String> = b.split_whitespace().map(|w| w.to_lowercase()).collect();

	if words_a.is_empty() && words_b.is_empty() {
		return 1.0;
	}
	if words_a.is_empty() || words_b.is_empty() {
		return 0.0;
	}

	let shared = words_a.intersection(&words_b).count();
	2.0 * shared as f64 / (words_a.len() + words_b.len()) as f64
}
