use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use job_queue::QueueError;
use provider_router::ProviderError;
use serde_json::json;
use uuid::Uuid;

use crate::export::ExportError;
use crate::session::SessionError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
	#[error("the queue is full, try again shortly")]
	Busy,

	#[error("the service is shutting down")]
	ShuttingDown,

	#[error("no job with id {0}")]
	UnknownJob(Uuid),

	#[error("job {0} has no result yet")]
	NotReady(Uuid),

	#[error("job {0} produced no transcript to rewrite")]
	NoTranscript(Uuid),

	#[error("provider failure: {0}")]
	Provider(#[from] ProviderError),

	#[error(transparent)]
	Export(#[from] ExportError),

	#[error(transparent)]
	Session(#[from] SessionError),

	#[error("an internal server error occurred")]
	Anyhow(#[from] anyhow::Error),
}

impl From<QueueError> for AppError {
	fn from(err: QueueError) -> Self {
		match err {
			QueueError::Full(_) => Self::Busy,
			QueueError::ShuttingDown => Self::ShuttingDown,
		}
	}
}

impl AppError {
	const fn status_code(&self) -> StatusCode {
		match self {
			Self::Busy => StatusCode::TOO_MANY_REQUESTS,
			Self::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
			Self::UnknownJob(_) => StatusCode::NOT_FOUND,
			Self::NotReady(_) => StatusCode::CONFLICT,
			Self::NoTranscript(_) => StatusCode::CONFLICT,
			Self::Provider(_) => StatusCode::BAD_GATEWAY,
			Self::Export(_) => StatusCode::UNPROCESSABLE_ENTITY,
			Self::Session(_) => StatusCode::CONFLICT,
			Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		if let Self::Anyhow(ref e) = self {
			tracing::error!("unhandled error: {e:?}");
		}

		(self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn queue_rejections_map_to_transport_codes() {
		assert_eq!(AppError::from(QueueError::Full(100)).status_code(), StatusCode::TOO_MANY_REQUESTS);
		assert_eq!(AppError::from(QueueError::ShuttingDown).status_code(), StatusCode::SERVICE_UNAVAILABLE);
	}

	#[test]
	fn missing_job_is_not_found() {
		assert_eq!(AppError::UnknownJob(Uuid::new_v4()).status_code(), StatusCode::NOT_FOUND);
	}

	#[test]
	fn export_without_converter_is_unprocessable() {
		let err = AppError::from(ExportError::ConverterUnavailable("pdf"));
		assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
	}
}
