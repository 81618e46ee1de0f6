use chrono::{DateTime, Utc};
use provider_router::ProcessingMode;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Where a job's conversation with the caller currently stands. The state
/// machine is linear for a normal run; mode toggles re-enter `Processing`
/// from either of the two post-result states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
	/// Accepted with a mode already chosen; waiting for a worker.
	Received,
	/// Accepted without a mode; nothing runs until one is chosen.
	AwaitingMode,
	Processing,
	/// Result ready; waiting for the caller to pick an output format.
	AwaitingFormat,
	Delivered,
}

#[derive(Debug, Clone, Copy)]
pub enum SessionEvent {
	ModeSelected(ProcessingMode),
	ProcessingStarted,
	ResultReady,
	Exported,
}

#[derive(Debug, Error)]
pub enum SessionError {
	#[error("no session for job {0}")]
	Unknown(Uuid),
	#[error("session for job {job_id} is in state {state:?}, cannot apply {event:?}")]
	InvalidTransition { job_id: Uuid, state: SessionState, event: SessionEvent },
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
	pub job_id: Uuid,
	pub state: SessionState,
	pub mode: Option<ProcessingMode>,
	pub updated_at: DateTime<Utc>,
}

impl SessionContext {
	fn new(job_id: Uuid, mode: Option<ProcessingMode>) -> Self {
		let state = if mode.is_some() { SessionState::Received } else { SessionState::AwaitingMode };
		Self {
			job_id,
			state,
			mode,
			updated_at: Utc::now(),
		}
	}

	fn apply(&mut self, event: SessionEvent) -> Result<SessionState, SessionError> {
		use SessionState::*;

		let next = match (self.state, event) {
			(AwaitingMode | AwaitingFormat | Delivered, SessionEvent::ModeSelected(mode)) => {
				self.mode = Some(mode);
				Processing
			}
			(Received, SessionEvent::ProcessingStarted) => Processing,
			(Processing, SessionEvent::ResultReady) => AwaitingFormat,
			(AwaitingFormat | Delivered, SessionEvent::Exported) => Delivered,
			(state, event) => {
				return Err(SessionError::InvalidTransition {
					job_id: self.job_id,
					state,
					event,
				})
			}
		};

		self.state = next;
		self.updated_at = Utc::now();
		Ok(next)
	}
}

/// In-memory session registry keyed by job id. Lock scope matches the
/// queue's record map: short, uncontended updates from workers and
/// handlers.
#[derive(Debug, Default)]
pub struct SessionStore {
	inner: RwLock<HashMap<Uuid, SessionContext>>,
}

impl SessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn open(&self, job_id: Uuid, mode: Option<ProcessingMode>) {
		let context = SessionContext::new(job_id, mode);
		debug!(%job_id, state = ?context.state, "session opened");
		if let Ok(mut sessions) = self.inner.write() {
			sessions.insert(job_id, context);
		}
	}

	pub fn advance(&self, job_id: Uuid, event: SessionEvent) -> Result<SessionState, SessionError> {
		let mut sessions = self.inner.write().map_err(|_| SessionError::Unknown(job_id))?;
		let context = sessions.get_mut(&job_id).ok_or(SessionError::Unknown(job_id))?;
		let next = context.apply(event)?;
		debug!(%job_id, state = ?next, "session advanced");
		Ok(next)
	}

	pub fn get(&self, job_id: Uuid) -> Option<SessionContext> {
		self.inner.read().ok().and_then(|sessions| sessions.get(&job_id).cloned())
	}

	/// Forget a session. Called when the job record it belongs to is
	/// retired.
	pub fn close(&self, job_id: Uuid) {
		if let Ok(mut sessions) = self.inner.write() {
			if sessions.remove(&job_id).is_some() {
				debug!(%job_id, "session closed");
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn full_run_with_mode_walks_the_linear_path() {
		let store = SessionStore::new();
		let id = Uuid::new_v4();
		store.open(id, Some(ProcessingMode::Summary));

		assert_eq!(store.get(id).unwrap().state, SessionState::Received);
		assert_eq!(store.advance(id, SessionEvent::ProcessingStarted).unwrap(), SessionState::Processing);
		assert_eq!(store.advance(id, SessionEvent::ResultReady).unwrap(), SessionState::AwaitingFormat);
		assert_eq!(store.advance(id, SessionEvent::Exported).unwrap(), SessionState::Delivered);
	}

	#[test]
	fn submission_without_mode_waits_for_one() {
		let store = SessionStore::new();
		let id = Uuid::new_v4();
		store.open(id, None);

		assert_eq!(store.get(id).unwrap().state, SessionState::AwaitingMode);
		// a worker cannot start a job whose mode is still open
		assert!(matches!(
			store.advance(id, SessionEvent::ProcessingStarted),
			Err(SessionError::InvalidTransition { .. })
		));
		assert_eq!(
			store.advance(id, SessionEvent::ModeSelected(ProcessingMode::Structured)).unwrap(),
			SessionState::Processing
		);
		assert_eq!(store.get(id).unwrap().mode, Some(ProcessingMode::Structured));
	}

	#[test]
	fn mode_toggle_after_delivery_reenters_processing() {
		let store = SessionStore::new();
		let id = Uuid::new_v4();
		store.open(id, Some(ProcessingMode::Summary));
		store.advance(id, SessionEvent::ProcessingStarted).unwrap();
		store.advance(id, SessionEvent::ResultReady).unwrap();
		store.advance(id, SessionEvent::Exported).unwrap();

		assert_eq!(
			store.advance(id, SessionEvent::ModeSelected(ProcessingMode::Stylized)).unwrap(),
			SessionState::Processing
		);
	}

	#[test]
	fn repeated_export_stays_delivered() {
		let store = SessionStore::new();
		let id = Uuid::new_v4();
		store.open(id, Some(ProcessingMode::Summary));
		store.advance(id, SessionEvent::ProcessingStarted).unwrap();
		store.advance(id, SessionEvent::ResultReady).unwrap();
		store.advance(id, SessionEvent::Exported).unwrap();
		assert_eq!(store.advance(id, SessionEvent::Exported).unwrap(), SessionState::Delivered);
	}

	#[test]
	fn closed_sessions_are_gone() {
		let store = SessionStore::new();
		let id = Uuid::new_v4();
		store.open(id, Some(ProcessingMode::Summary));

		store.close(id);
		assert!(store.get(id).is_none());
		assert!(matches!(store.advance(id, SessionEvent::ProcessingStarted), Err(SessionError::Unknown(_))));
	}

	#[test]
	fn unknown_job_is_reported() {
		let store = SessionStore::new();
		assert!(matches!(store.advance(Uuid::new_v4(), SessionEvent::ResultReady), Err(SessionError::Unknown(_))));
	}
}
