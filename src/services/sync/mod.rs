pub mod fetcher;
pub mod matcher;
pub mod orchestrator;
pub mod reconciler;
pub mod types;

/// Boxed cause carried by the sync error kinds.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
