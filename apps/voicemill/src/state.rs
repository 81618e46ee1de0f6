use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Pipeline counters shared across workers and exposed at `/healthz`.
#[derive(Debug, Default)]
pub struct PipelineState {
	pub transcriptions_completed: AtomicU64,
	pub rewrites_completed: AtomicU64,
	pub benchmarks_run: AtomicU64,
	pub cache_hits: AtomicU64,
	pub cache_misses: AtomicU64,
	pub truncations: AtomicU64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StateSnapshot {
	pub transcriptions_completed: u64,
	pub rewrites_completed: u64,
	pub benchmarks_run: u64,
	pub cache_hits: u64,
	pub cache_misses: u64,
	pub truncations: u64,
}

impl PipelineState {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn snapshot(&self) -> StateSnapshot {
		StateSnapshot {
			transcriptions_completed: self.transcriptions_completed.load(Ordering::Relaxed),
			rewrites_completed: self.rewrites_completed.load(Ordering::Relaxed),
			benchmarks_run: self.benchmarks_run.load(Ordering::Relaxed),
			cache_hits: self.cache_hits.load(Ordering::Relaxed),
			cache_misses: self.cache_misses.load(Ordering::Relaxed),
			truncations: self.truncations.load(Ordering::Relaxed),
		}
	}
}
