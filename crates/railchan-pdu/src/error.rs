/// Errors produced while decoding untrusted wire input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Fewer bytes remain than a fixed or declared-length field requires.
    #[error("truncated input (needed {needed} bytes, {remaining} remaining)")]
    Truncated { needed: usize, remaining: usize },

    /// An order type or parameter discriminant is not recognised.
    #[error("unknown {kind} 0x{value:X}")]
    UnknownOrder { kind: &'static str, value: u32 },

    /// Length fields within the input contradict each other.
    #[error("inconsistent input: {0}")]
    Inconsistent(String),
}

/// Errors produced while encoding locally constructed values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// The value names a parameter this codec cannot represent.
    #[error("unsupported variant 0x{0:X}")]
    UnsupportedVariant(u32),

    /// A variable-length field does not fit its wire length prefix.
    #[error("{field} too long ({len} bytes, max {max})")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// Populated fields contradict each other.
    #[error("inconsistent value: {0}")]
    Inconsistent(&'static str),
}

/// Any codec failure, including stream I/O for the async framer.
#[derive(Debug, thiserror::Error)]
pub enum PduError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// A framed PDU declares a length above the configured maximum.
    #[error("PDU too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("PDU I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PduError>;
