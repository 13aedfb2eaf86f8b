use bytes::Bytes;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::error::{Result, TransportError};
use crate::sink::ByteSink;

/// Byte sink for hosts whose channel writer runs on a tokio runtime.
///
/// `send` never blocks: PDUs are queued on an unbounded channel and the
/// host's async writer task drains the receiver.
#[derive(Debug, Clone)]
pub struct TokioChannelSink {
    tx: UnboundedSender<Bytes>,
}

impl TokioChannelSink {
    /// Create a sink and the receiver the writer task should drain.
    pub fn new() -> (Self, UnboundedReceiver<Bytes>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }

    /// Wrap an existing sender.
    pub fn from_sender(tx: UnboundedSender<Bytes>) -> Self {
        Self { tx }
    }
}

impl ByteSink for TokioChannelSink {
    fn send(&self, pdu: Bytes) -> Result<()> {
        self.tx.send(pdu).map_err(|_| TransportError::Closed)
    }
}
