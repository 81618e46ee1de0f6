// Scripted provider adapters shared by the app's unit tests.

use async_trait::async_trait;
use provider_router::{AudioInput, CompletionReason, ProviderAdapter, ProviderError, RewriteOutput, RewriteRequest, TranscriptionOutput};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub enum Script {
	/// Return the input text unchanged.
	Echo,
	/// Return the input text with a truncated completion reason.
	EchoTruncated,
	/// Fail the call with the given zero-based index, succeed otherwise.
	FailOnCall(u64),
}

pub struct MockChatAdapter {
	pub script: Script,
	pub rewrite_calls: AtomicU64,
	models: Mutex<Vec<String>>,
}

impl MockChatAdapter {
	pub fn new(script: Script) -> Arc<Self> {
		Arc::new(Self {
			script,
			rewrite_calls: AtomicU64::new(0),
			models: Mutex::new(Vec::new()),
		})
	}

	pub fn models_seen(&self) -> Vec<String> {
		self.models.lock().unwrap().clone()
	}
}

#[async_trait]
impl ProviderAdapter for MockChatAdapter {
	fn id(&self) -> &str {
		"mock-chat"
	}

	async fn transcribe(&self, _audio: &AudioInput) -> Result<TranscriptionOutput, ProviderError> {
		Err(ProviderError::Unsupported("mock-chat".into()))
	}

	async fn rewrite(&self, request: &RewriteRequest) -> Result<RewriteOutput, ProviderError> {
		let call = self.rewrite_calls.fetch_add(1, Ordering::SeqCst);
		if let Script::FailOnCall(n) = self.script {
			if call == n {
				return Err(ProviderError::Call {
					provider: "mock-chat".into(),
					message: "scripted failure".into(),
				});
			}
		}
		self.models.lock().unwrap().push(request.model.clone());

		let completion = match self.script {
			Script::EchoTruncated => CompletionReason::Truncated,
			_ => CompletionReason::Complete,
		};
		Ok(RewriteOutput {
			text: request.text.clone(),
			completion,
			tokens_used: None,
		})
	}
}

pub struct MockSpeechAdapter {
	pub transcript: String,
	pub transcribe_calls: AtomicU64,
}

impl MockSpeechAdapter {
	pub fn new(transcript: &str) -> Arc<Self> {
		Arc::new(Self {
			transcript: transcript.to_string(),
			transcribe_calls: AtomicU64::new(0),
		})
	}
}

#[async_trait]
impl ProviderAdapter for MockSpeechAdapter {
	fn id(&self) -> &str {
		"mock-speech"
	}

	async fn transcribe(&self, _audio: &AudioInput) -> Result<TranscriptionOutput, ProviderError> {
		self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
		Ok(TranscriptionOutput {
			text: self.transcript.clone(),
			completion: CompletionReason::Complete,
		})
	}

	async fn rewrite(&self, _request: &RewriteRequest) -> Result<RewriteOutput, ProviderError> {
		Err(ProviderError::Unsupported("mock-speech".into()))
	}
}
