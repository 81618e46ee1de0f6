pub mod estimator;
pub mod splitter;

pub use estimator::TokenEstimator;
pub use splitter::{merge, split, DEFAULT_MAX_CHUNK_CHARS};
