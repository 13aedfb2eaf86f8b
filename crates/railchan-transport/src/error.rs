/// Errors that can occur while moving PDU buffers in or out.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The byte sink reported an I/O failure.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The chunks delivered for one PDU do not add up to its declared length.
    #[error("reassembly length mismatch (expected {expected} bytes, got {actual})")]
    Reassembly { expected: usize, actual: usize },

    /// A continuation chunk arrived with no PDU in progress.
    #[error("chunk delivered without a preceding first chunk")]
    NoPendingPdu,

    /// The queue or sink has been shut down.
    #[error("transport closed")]
    Closed,

    /// The worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
