use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use job_queue::{JobPayload, JobQueue, JobStatus};
use prometheus::{Encoder, Registry, TextEncoder};
use provider_router::ProcessingMode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::export::{self, ExportFormat};
use crate::pipeline::Pipeline;
use crate::session::{SessionContext, SessionEvent, SessionStore};
use crate::state::PipelineState;

#[derive(Clone)]
pub struct AppState {
	pub queue: Arc<JobQueue>,
	pub pipeline: Arc<Pipeline>,
	pub sessions: Arc<SessionStore>,
	pub state: Arc<PipelineState>,
	pub registry: Registry,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/jobs", post(submit_job))
		.route("/jobs/:id", get(job_status))
		.route("/jobs/:id/variants", post(request_variant))
		.route("/jobs/:id/export", get(export_job))
		.route("/healthz", get(healthz))
		.route("/metrics", get(metrics))
		.with_state(state)
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
	job_id: Uuid,
	queue_depth: usize,
}

async fn submit_job(State(app): State<AppState>, Json(payload): Json<JobPayload>) -> Result<impl IntoResponse, AppError> {
	let mode = payload.mode;
	let job_id = app.queue.submit(payload)?;
	app.sessions.open(job_id, mode);
	info!(%job_id, ?mode, depth = app.queue.depth(), "job accepted");

	Ok((
		StatusCode::ACCEPTED,
		Json(SubmitResponse {
			job_id,
			queue_depth: app.queue.depth(),
		}),
	))
}

#[derive(Debug, Serialize)]
struct StatusResponse {
	job_id: Uuid,
	status: JobStatus,
	session: Option<SessionContext>,
	output: Option<job_queue::JobOutput>,
}

async fn job_status(State(app): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<StatusResponse>, AppError> {
	let record = app.queue.record(id).ok_or(AppError::UnknownJob(id))?;

	Ok(Json(StatusResponse {
		job_id: id,
		status: record.status,
		session: app.sessions.get(id),
		output: record.output,
	}))
}

#[derive(Debug, Deserialize)]
struct VariantRequest {
	mode: ProcessingMode,
}

#[derive(Debug, Serialize)]
struct VariantResponse {
	job_id: Uuid,
	mode: ProcessingMode,
	text: String,
	truncated: bool,
}

/// Produce (or re-serve) a rewrite variant for a finished job. Served from
/// the variant cache when the mode was already computed; the stored
/// transcript means the audio is never transcribed twice.
async fn request_variant(State(app): State<AppState>, Path(id): Path<Uuid>, Json(request): Json<VariantRequest>) -> Result<Json<VariantResponse>, AppError> {
	let record = app.queue.record(id).ok_or(AppError::UnknownJob(id))?;
	let output = match record.status {
		JobStatus::Done => record.output.ok_or(AppError::NotReady(id))?,
		_ => return Err(AppError::NotReady(id)),
	};
	let transcript = output.transcript.ok_or(AppError::NoTranscript(id))?;

	app.sessions.advance(id, SessionEvent::ModeSelected(request.mode))?;
	let variant = app.pipeline.variant_for(id, request.mode, &transcript).await?;
	let _ = app.sessions.advance(id, SessionEvent::ResultReady);

	Ok(Json(VariantResponse {
		job_id: id,
		mode: request.mode,
		text: variant.text,
		truncated: variant.truncated,
	}))
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
	format: ExportFormat,
	/// Export a specific variant instead of the job's original output.
	mode: Option<ProcessingMode>,
}

async fn export_job(State(app): State<AppState>, Path(id): Path<Uuid>, Query(query): Query<ExportQuery>) -> Result<Response, AppError> {
	let record = app.queue.record(id).ok_or(AppError::UnknownJob(id))?;
	let output = match record.status {
		JobStatus::Done => record.output.ok_or(AppError::NotReady(id))?,
		_ => return Err(AppError::NotReady(id)),
	};

	let (label, text) = match query.mode {
		Some(mode) => {
			let transcript = output.transcript.ok_or(AppError::NoTranscript(id))?;
			let variant = app.pipeline.variant_for(id, mode, &transcript).await?;
			(mode.label().to_string(), variant.text)
		}
		None => (output.mode_label, output.text),
	};

	let file = export::render(id, &label, &text, query.format)?;
	let _ = app.sessions.advance(id, SessionEvent::Exported);

	Ok((
		[
			(header::CONTENT_TYPE, file.content_type.to_string()),
			(header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file.filename)),
		],
		file.bytes,
	)
		.into_response())
}

async fn healthz(State(app): State<AppState>) -> Json<serde_json::Value> {
	Json(json!({
		"status": "ok",
		"queue_depth": app.queue.depth(),
		"queue_capacity": app.queue.capacity(),
		"pipeline": app.state.snapshot(),
	}))
}

async fn metrics(State(app): State<AppState>) -> Result<Response, AppError> {
	let encoder = TextEncoder::new();
	let families = app.registry.gather();
	let mut buffer = Vec::new();
	encoder.encode(&families, &mut buffer).map_err(|e| AppError::Anyhow(e.into()))?;

	Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], buffer).into_response())
}
