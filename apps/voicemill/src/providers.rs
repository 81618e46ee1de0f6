use provider_router::{build_adapter, ProviderAdapter, ProviderConfig, ProviderRouter, RoutingStrategy, WhisperModel};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;

/// Assemble the provider router from configuration.
///
/// Single uses the primary speech and chat endpoints. Fallback appends the
/// configured secondaries. Benchmark fans the primary speech endpoint out
/// across every model size so the report compares like with like.
pub fn build_router(config: &Config, client: &reqwest::Client) -> ProviderRouter {
	let speech = speech_configs(config);
	let language = language_configs(config);

	for provider in speech.iter().chain(language.iter()) {
		info!(provider = %provider.id(), "provider configured");
	}

	let speech: Vec<Arc<dyn ProviderAdapter>> = speech.iter().map(|c| build_adapter(c, client)).collect();
	let language: Vec<Arc<dyn ProviderAdapter>> = language.iter().map(|c| build_adapter(c, client)).collect();

	ProviderRouter::new(config.routing_strategy, config.provider_timeout, speech, language)
}

fn speech_configs(config: &Config) -> Vec<ProviderConfig> {
	match config.routing_strategy {
		RoutingStrategy::Single => vec![primary_speech(config)],
		RoutingStrategy::Fallback => {
			let mut configs = vec![primary_speech(config)];
			// A fallback model without its own URL runs against the primary
			// endpoint.
			if config.speech_fallback_url.is_some() || config.speech_fallback_model.is_some() {
				configs.push(ProviderConfig::SpeechApi {
					base_url: config.speech_fallback_url.clone().unwrap_or_else(|| config.speech_api_url.clone()),
					api_key: config.speech_api_key.clone(),
					model: config.speech_fallback_model.unwrap_or(config.speech_model),
				});
			}
			configs
		}
		// One configuration per model size, smallest first so the report's
		// default quality reference lands on the largest.
		RoutingStrategy::Benchmark => WhisperModel::all()
			.into_iter()
			.map(|model| ProviderConfig::SpeechApi {
				base_url: config.speech_api_url.clone(),
				api_key: config.speech_api_key.clone(),
				model,
			})
			.collect(),
	}
}

fn language_configs(config: &Config) -> Vec<ProviderConfig> {
	let mut configs = vec![ProviderConfig::ChatApi {
		base_url: config.chat_api_url.clone(),
		api_key: config.chat_api_key.clone(),
		model: config.chat_model.clone(),
		max_output_tokens: config.max_output_tokens,
	}];

	if let Some(fallback_model) = &config.chat_fallback_model {
		configs.push(ProviderConfig::ChatApi {
			base_url: config.chat_api_url.clone(),
			api_key: config.chat_api_key.clone(),
			model: fallback_model.clone(),
			max_output_tokens: config.max_output_tokens,
		});
	}

	configs
}

fn primary_speech(config: &Config) -> ProviderConfig {
	ProviderConfig::SpeechApi {
		base_url: config.speech_api_url.clone(),
		api_key: config.speech_api_key.clone(),
		model: config.speech_model,
	}
}
