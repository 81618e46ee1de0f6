use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
	#[error("provider '{provider}' timed out after {timeout:?}")]
	Timeout { provider: String, timeout: Duration },

	#[error("provider '{provider}' call failed: {message}")]
	Call { provider: String, message: String },

	#[error("provider '{0}' does not support this operation")]
	Unsupported(String),

	#[error("no provider configured for this operation")]
	NotConfigured,

	#[error("transport error: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("malformed provider response: {0}")]
	Response(String),
}

impl ProviderError {
	/// Transient failures are eligible for the fallback provider; a
	/// misconfiguration is not.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Timeout { .. } | Self::Call { .. } | Self::Transport(_) | Self::Response(_))
	}
}
