use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
	/// Intake rejected, capacity exceeded. Never retried by the system;
	/// the caller decides when to resubmit.
	#[error("queue is at capacity ({0} jobs)")]
	Full(usize),

	/// Intake closed during shutdown.
	#[error("queue is shutting down")]
	ShuttingDown,
}
