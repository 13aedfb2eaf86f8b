use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;

use crate::error::{Result, TransportError};

/// Outbound half of the virtual channel.
///
/// The host integration layer implements this over its channel write
/// primitive. Each call carries exactly one header-prefixed PDU.
pub trait ByteSink: Send + Sync {
    /// Write one complete PDU to the channel.
    fn send(&self, pdu: Bytes) -> Result<()>;
}

/// A sink that records every PDU it is given.
///
/// Useful for replaying captures and for asserting on outbound traffic.
#[derive(Debug, Default)]
pub struct VecSink {
    sent: Mutex<Vec<Bytes>>,
    closed: AtomicBool,
}

impl VecSink {
    /// Create an empty, open sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every PDU sent so far, in send order.
    pub fn sent(&self) -> Vec<Bytes> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return every PDU sent so far.
    pub fn take(&self) -> Vec<Bytes> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of PDUs sent so far.
    pub fn len(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if nothing has been sent.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent send fail with [`TransportError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl ByteSink for VecSink {
    fn send(&self, pdu: Bytes) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(pdu);
        Ok(())
    }
}
