use railchan_pdu::{DecodeError, EncodeError};
use railchan_transport::TransportError;

use crate::handshake::HandshakeState;

/// Errors that can occur while driving a RAIL session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// An inbound PDU could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An outbound PDU could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The byte sink or inbound queue failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An event arrived in a state that does not expect it.
    #[error("{event} is not valid in state {state}")]
    InvalidState {
        state: HandshakeState,
        event: &'static str,
    },

    /// An initial system parameter failed to send; the rest were refused.
    #[error("initial system parameter push aborted")]
    SysParamPushAborted,

    /// The byte sink was dropped by its owner.
    #[error("byte sink is no longer attached")]
    SinkDetached,
}

pub type Result<T> = std::result::Result<T, SessionError>;
