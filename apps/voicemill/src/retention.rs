use job_queue::JobQueue;
use provider_router::ProcessingMode;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use variant_cache::VariantCache;

use crate::session::SessionStore;

/// How often the background sweep runs. Coarse on purpose; retention is
/// measured in days.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Periodic cleanup of the in-memory registries. Job records, sessions and
/// cached variants all key on the job id, so when a finished record ages
/// out, everything hanging off its id goes with it.
pub struct RetentionSweeper {
	queue: Arc<JobQueue>,
	sessions: Arc<SessionStore>,
	cache: Arc<VariantCache<ProcessingMode>>,
	retention: Duration,
}

impl RetentionSweeper {
	pub fn new(queue: Arc<JobQueue>, sessions: Arc<SessionStore>, cache: Arc<VariantCache<ProcessingMode>>, retention: Duration) -> Self {
		Self {
			queue,
			sessions,
			cache,
			retention,
		}
	}

	/// One pass: drop job records terminal for longer than the retention
	/// window, then the sessions and variants keyed on the dropped ids.
	pub async fn sweep_once(&self) -> usize {
		let pruned = self.queue.prune_finished(self.retention);
		for id in &pruned {
			self.sessions.close(*id);
			self.cache.invalidate_job(*id).await;
		}
		match pruned.len() {
			0 => debug!("retention sweep found nothing to drop"),
			count => info!(count, "retention sweep retired finished jobs"),
		}
		pruned.len()
	}

	/// Run the sweep on a fixed interval until the task is aborted at
	/// shutdown. Nothing here is durable, so a missed final sweep is fine.
	pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.tick().await; // the first tick completes immediately
			loop {
				ticker.tick().await;
				self.sweep_once().await;
			}
		})
	}
}
