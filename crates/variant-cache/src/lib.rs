//! Bounded, time-limited store of computed result variants.
//!
//! One variant is the produced text for a (job, processing mode) pair. The
//! cache is the pipeline's primary cost control: repeat requests for a pair
//! that is already cached never reach a provider again. Per job only the N
//! most recently created variants survive, and any variant past its TTL is
//! treated as a miss and removed on the access that notices it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// A cached rewrite result. Immutable once written; a hit never mutates
/// content.
#[derive(Debug, Clone)]
pub struct Variant {
	pub text: String,
	pub truncated: bool,
	pub created_at: Instant,
}

/// Keyed store of (job, mode) -> [`Variant`], bounded per job and expired by
/// age.
///
/// Generic over the mode key so the crate carries no domain dependency.
///
/// Concurrent `get` + compute + `put` sequences for the same key are allowed
/// to race with last-write-wins semantics: variants computed for the same
/// key are expected to be content-equivalent. With non-deterministic
/// providers that assumption can surface visibly different cached text on
/// repeat views; the relaxation is deliberate.
pub struct VariantCache<M> {
	max_per_job: usize,
	ttl: Duration,
	inner: RwLock<HashMap<Uuid, Vec<(M, Variant)>>>,
	hits: AtomicU64,
	misses: AtomicU64,
}

impl<M> VariantCache<M>
where
	M: PartialEq + Clone + Send + Sync,
{
	pub fn new(max_per_job: usize, ttl: Duration) -> Self {
		Self {
			max_per_job: max_per_job.max(1),
			ttl,
			inner: RwLock::new(HashMap::new()),
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
		}
	}

	/// Look up the variant for (job, mode). Expired entries are removed and
	/// reported as a miss.
	pub async fn get(&self, job: Uuid, mode: &M) -> Option<Variant> {
		{
			let inner = self.inner.read().await;
			match inner.get(&job).and_then(|entries| entries.iter().find(|(m, _)| m == mode)) {
				Some((_, variant)) if variant.created_at.elapsed() <= self.ttl => {
					self.hits.fetch_add(1, Ordering::Relaxed);
					return Some(variant.clone());
				}
				Some(_) => {} // expired, fall through to remove it
				None => {
					self.misses.fetch_add(1, Ordering::Relaxed);
					return None;
				}
			}
		}

		// Expired entry: take the write lock and drop it.
		let mut inner = self.inner.write().await;
		if let Some(entries) = inner.get_mut(&job) {
			entries.retain(|(m, v)| !(m == mode && v.created_at.elapsed() > self.ttl));
			if entries.is_empty() {
				inner.remove(&job);
			}
		}
		debug!(%job, "expired variant dropped");
		self.misses.fetch_add(1, Ordering::Relaxed);
		None
	}

	/// Store a freshly computed variant. Replaces any existing variant for
	/// the same mode; evicts the oldest variant of the job once the per-job
	/// cap is exceeded.
	pub async fn put(&self, job: Uuid, mode: M, text: String, truncated: bool) {
		let variant = Variant {
			text,
			truncated,
			created_at: Instant::now(),
		};

		let mut inner = self.inner.write().await;
		let entries = inner.entry(job).or_default();
		entries.retain(|(m, _)| m != &mode);
		entries.push((mode, variant));

		while entries.len() > self.max_per_job {
			// Entries are in creation order, so index 0 is the oldest.
			entries.remove(0);
			debug!(%job, "evicted oldest variant over per-job cap");
		}
	}

	/// Drop every variant belonging to `job`.
	pub async fn invalidate_job(&self, job: Uuid) {
		self.inner.write().await.remove(&job);
	}

	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	pub fn misses(&self) -> u64 {
		self.misses.load(Ordering::Relaxed)
	}
}
