pub mod adapter;
pub mod benchmark;
pub mod config;
pub mod error;
pub mod router;
pub mod types;

pub use adapter::{build_adapter, ProviderAdapter};
pub use benchmark::BenchmarkReport;
pub use config::{ProviderConfig, RoutingStrategy, WhisperModel};
pub use error::ProviderError;
pub use router::{ProviderRouter, RouteOutcome, RouterMetrics};
pub use types::{AudioInput, CompletionReason, ProcessingMode, ProviderMetrics, ProviderResult, RewriteOutput, RewriteRequest, TranscriptionOutput};
