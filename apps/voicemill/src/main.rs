mod config;
mod error;
mod export;
mod pipeline;
mod providers;
mod retention;
mod routes;
mod session;
mod state;
mod strategy;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use clap::Parser;
use job_queue::{JobQueue, PoolConfig, PoolMetrics, WorkerPool};
use prometheus::Registry;
use std::sync::Arc;
use text_chunker::TokenEstimator;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use variant_cache::VariantCache;

use config::Config;
use pipeline::Pipeline;
use routes::AppState;
use session::SessionStore;
use state::PipelineState;
use strategy::{ModelSpec, StrategySelector};

#[tokio::main]
async fn main() -> Result<()> {
	// Load environment variables
	dotenvy::dotenv().ok();

	// Parse CLI arguments
	let config = Config::parse();
	config.validate().map_err(anyhow::Error::msg)?;

	init_tracing();

	info!(
		addr = %config.http_addr,
		workers = config.worker_count,
		queue_capacity = config.queue_capacity,
		strategy = ?config.routing_strategy,
		"🎯 Starting voicemill service"
	);

	let registry = Registry::new();
	let pool_metrics = PoolMetrics::new(&registry)?;

	let client = reqwest::Client::new();
	let router = Arc::new(providers::build_router(&config, &client));

	let selector = StrategySelector::new(
		Arc::clone(&router),
		TokenEstimator::default(),
		config.long_text_strategy,
		config.chunk_max_chars,
		ModelSpec {
			name: config.chat_model.clone(),
			max_output_tokens: config.max_output_tokens,
		},
		ModelSpec {
			name: config.chat_long_model.clone(),
			max_output_tokens: config.long_model_max_output_tokens,
		},
	);

	let cache = Arc::new(VariantCache::new(config.cache_max_variants, config.cache_ttl()));
	let sessions = Arc::new(SessionStore::new());
	let pipeline_state = PipelineState::new();
	let pipeline = Arc::new(Pipeline::new(
		Arc::clone(&router),
		selector,
		Arc::clone(&cache),
		Arc::clone(&pipeline_state),
		Arc::clone(&sessions),
	));

	let queue = Arc::new(JobQueue::new(config.queue_capacity));
	let pool = WorkerPool::new(
		Arc::clone(&queue),
		Arc::clone(&pipeline) as Arc<dyn job_queue::JobProcessor>,
		PoolConfig {
			worker_count: config.worker_count,
			shutdown_grace: config.shutdown_grace,
		},
		pool_metrics,
	);
	pool.start().await;

	let sweeper = retention::RetentionSweeper::new(Arc::clone(&queue), Arc::clone(&sessions), Arc::clone(&cache), config.retention());
	let sweeper_handle = sweeper.spawn(retention::SWEEP_INTERVAL);

	let app = routes::router(AppState {
		queue: Arc::clone(&queue),
		pipeline,
		sessions,
		state: pipeline_state,
		registry,
	});

	let listener = tokio::net::TcpListener::bind(&config.http_addr)
		.await
		.with_context(|| format!("cannot bind {}", config.http_addr))?;
	info!(addr = %config.http_addr, "✅ Listening");

	axum::serve(listener, app).with_graceful_shutdown(wait_for_shutdown_signal()).await?;

	info!("🛑 Shutdown signal received, draining workers");
	sweeper_handle.abort();
	pool.shutdown().await;
	info!("✅ Shutdown complete");

	Ok(())
}

fn init_tracing() {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,voicemill=debug,job_queue=debug,provider_router=debug"));

	tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer().with_target(true)).init();
}

async fn wait_for_shutdown_signal() {
	let ctrl_c = async {
		signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("failed to install SIGTERM handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
