//! # Structured Error Handling
//!
//! Error taxonomy for the batch engine. Chunk-level store and processor
//! failures abort the in-flight chunk and fail the enclosing step; delivery
//! failures are recovered locally by the dispatch writer and never escalate.

/// Errors surfaced by readers, processors, writers and the step executor.
///
/// Variants map to the failure domains of the chunk runtime:
///
/// - [`StoreRead`](BatchError::StoreRead) / [`StoreWrite`](BatchError::StoreWrite):
///   record store round-trips. A write failure rolls back only the chunk in
///   flight; previously committed chunks stand.
/// - [`Processor`](BatchError::Processor): a record-level transform failure.
///   Fails the whole chunk, never a partial commit.
/// - [`Delivery`](BatchError::Delivery): outbound notification delivery.
///   Recorded per record and retried on the next run.
/// - [`Concurrency`](BatchError::Concurrency): a broken invariant in the
///   multi-worker machinery (worker panic, reused step). Programming error,
///   not user-recoverable.
/// - [`Configuration`](BatchError::Configuration): invalid runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("store read error: {0}")]
    StoreRead(String),

    #[error("store write error: {0}")]
    StoreWrite(String),

    #[error("processor error: {0}")]
    Processor(String),

    #[error("delivery error: {0}")]
    Delivery(String),

    #[error("concurrency violation: {0}")]
    Concurrency(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_domain() {
        let err = BatchError::StoreWrite("insert failed".to_string());
        assert_eq!(err.to_string(), "store write error: insert failed");

        let err = BatchError::Concurrency("worker panicked".to_string());
        assert_eq!(err.to_string(), "concurrency violation: worker panicked");
    }
}
