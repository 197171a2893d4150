//! Error definitions for the mapping module.

use thiserror::Error;

/// Errors surfaced by the navigator engine and its handle.
#[derive(Debug, Error)]
pub enum MapperError {
    /// The input-sample channel closed while the engine was running
    #[error("input channel closed")]
    ChannelClosed,

    /// The engine task panicked or could not be joined
    #[error("engine task error: {0}")]
    TaskError(String),
}
