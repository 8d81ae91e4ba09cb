use thiserror::Error;

/// Errors surfaced by the engine. Per-symbol failures in multi-symbol runs
/// are caught at the orchestrator boundary and reported as data; nothing
/// here is fatal to the host process.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("insufficient data for {symbol}: {available} bars available, {required} required")]
    InsufficientData {
        symbol: String,
        available: usize,
        required: usize,
    },

    #[error("empty price series for {symbol}")]
    EmptySeries { symbol: String },

    #[error("invalid strategy: {}", .0.join("; "))]
    InvalidStrategy(Vec<String>),
}
