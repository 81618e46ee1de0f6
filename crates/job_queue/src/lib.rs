pub mod error;
pub mod job;
pub mod pool;
pub mod queue;

pub use error::QueueError;
pub use job::{Job, JobFailure, JobOutput, JobPayload, JobProcessor, JobRecord, JobStatus};
pub use pool::{PoolConfig, PoolMetrics, WorkerPool};
pub use queue::JobQueue;
