use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::types::{AudioInput, CompletionReason, RewriteOutput, RewriteRequest, TranscriptionOutput};

/// Uniform interface over every external speech-to-text or language-model
/// backend. Adapters that do not support one of the operations return
/// [`ProviderError::Unsupported`].
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
	fn id(&self) -> &str;

	async fn transcribe(&self, audio: &AudioInput) -> Result<TranscriptionOutput, ProviderError>;

	async fn rewrite(&self, request: &RewriteRequest) -> Result<RewriteOutput, ProviderError>;
}

/// Build the adapter for a provider configuration. The match is exhaustive
/// on purpose: adding a backend variant forces a decision here.
pub fn build_adapter(config: &ProviderConfig, client: &reqwest::Client) -> Arc<dyn ProviderAdapter> {
	match config {
		ProviderConfig::SpeechApi { base_url, api_key, model } => Arc::new(SpeechApiAdapter {
			id: config.id(),
			base_url: base_url.trim_end_matches('/').to_string(),
			api_key: api_key.clone(),
			model: model.as_str().to_string(),
			client: client.clone(),
		}),
		ProviderConfig::ChatApi { base_url, api_key, model, .. } => Arc::new(ChatApiAdapter {
			id: config.id(),
			base_url: base_url.trim_end_matches('/').to_string(),
			api_key: api_key.clone(),
			default_model: model.clone(),
			client: client.clone(),
		}),
	}
}

/// OpenAI-compatible `/v1/audio/transcriptions` backend.
struct SpeechApiAdapter {
	id: String,
	base_url: String,
	api_key: Option<String>,
	model: String,
	client: reqwest::Client,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
	text: String,
}

#[async_trait]
impl ProviderAdapter for SpeechApiAdapter {
	fn id(&self) -> &str {
		&self.id
	}

	async fn transcribe(&self, audio: &AudioInput) -> Result<TranscriptionOutput, ProviderError> {
		let part = reqwest::multipart::Part::bytes(audio.bytes.clone()).file_name("audio.ogg");
		let mut form = reqwest::multipart::Form::new().part("file", part).text("model", self.model.clone());
		if let Some(language) = &audio.language {
			form = form.text("language", language.clone());
		}

		let mut request = self.client.post(format!("{}/v1/audio/transcriptions", self.base_url)).multipart(form);
		if let Some(key) = &self.api_key {
			request = request.bearer_auth(key);
		}

		let response = request.send().await?;
		if !response.status().is_success() {
			return Err(ProviderError::Call {
				provider: self.id.clone(),
				message: format!("http status {}", response.status()),
			});
		}

		let body: TranscriptionResponse = response.json().await.map_err(|e| ProviderError::Response(e.to_string()))?;

		Ok(TranscriptionOutput {
			text: body.text,
			completion: CompletionReason::Complete,
		})
	}

	async fn rewrite(&self, _request: &RewriteRequest) -> Result<RewriteOutput, ProviderError> {
		Err(ProviderError::Unsupported(self.id.clone()))
	}
}

/// OpenAI-compatible `/v1/chat/completions` backend.
struct ChatApiAdapter {
	id: String,
	base_url: String,
	api_key: Option<String>,
	default_model: String,
	client: reqwest::Client,
}

#[derive(Deserialize)]
struct ChatResponse {
	choices: Vec<ChatChoice>,
	usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
	message: ChatMessage,
	finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessage {
	content: String,
}

#[derive(Deserialize)]
struct ChatUsage {
	completion_tokens: Option<u32>,
}

#[async_trait]
impl ProviderAdapter for ChatApiAdapter {
	fn id(&self) -> &str {
		&self.id
	}

	async fn transcribe(&self, _audio: &AudioInput) -> Result<TranscriptionOutput, ProviderError> {
		Err(ProviderError::Unsupported(self.id.clone()))
	}

	async fn rewrite(&self, request: &RewriteRequest) -> Result<RewriteOutput, ProviderError> {
		let model = if request.model.is_empty() { &self.default_model } else { &request.model };

		let body = serde_json::json!({
			"model": model,
			"max_tokens": request.max_output_tokens,
			"messages": [
				{ "role": "system", "content": request.prompt },
				{ "role": "user", "content": request.text },
			],
		});

		let mut http = self.client.post(format!("{}/v1/chat/completions", self.base_url)).json(&body);
		if let Some(key) = &self.api_key {
			http = http.bearer_auth(key);
		}

		let response = http.send().await?;
		if !response.status().is_success() {
			return Err(ProviderError::Call {
				provider: self.id.clone(),
				message: format!("http status {}", response.status()),
			});
		}

		let parsed: ChatResponse = response.json().await.map_err(|e| ProviderError::Response(e.to_string()))?;
		let choice = parsed.choices.into_iter().next().ok_or_else(|| ProviderError::Response("empty choices array".into()))?;

		// "length" is the model's signal that it hit its output ceiling.
		let completion = match choice.finish_reason.as_deref() {
			Some("length") => CompletionReason::Truncated,
			_ => CompletionReason::Complete,
		};

		Ok(RewriteOutput {
			text: choice.message.content,
			completion,
			tokens_used: parsed.usage.and_then(|u| u.completion_tokens),
		})
	}
}
