use bytes::{Bytes, BytesMut};

use crate::error::{Result, TransportError};

/// Rebuilds one PDU from the chunks the host channel delivers.
///
/// The host calls [`deliver_chunk`](Self::deliver_chunk) once per read
/// callback. A first chunk starts a fresh buffer sized to the declared total
/// length; the last chunk hands the finished buffer back to the caller.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    pending: Option<BytesMut>,
    expected: usize,
}

impl ChunkAssembler {
    /// Create an assembler with no PDU in progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one delivered chunk.
    ///
    /// Returns `Ok(Some(pdu))` when `is_last` completes a PDU whose size
    /// matches `total_length`, and `Ok(None)` while more chunks are expected.
    /// A size mismatch discards the partial buffer and is reported as
    /// [`TransportError::Reassembly`].
    pub fn deliver_chunk(
        &mut self,
        chunk: &[u8],
        total_length: usize,
        is_first: bool,
        is_last: bool,
    ) -> Result<Option<Bytes>> {
        if is_first {
            if let Some(stale) = self.pending.take() {
                tracing::warn!(
                    received = stale.len(),
                    expected = self.expected,
                    "discarding incomplete PDU on new first chunk"
                );
            }
            self.pending = Some(BytesMut::with_capacity(total_length));
            self.expected = total_length;
        }

        let mut buf = self.pending.take().ok_or(TransportError::NoPendingPdu)?;

        let actual = buf.len() + chunk.len();
        if actual > self.expected {
            return Err(TransportError::Reassembly {
                expected: self.expected,
                actual,
            });
        }
        buf.extend_from_slice(chunk);

        if !is_last {
            self.pending = Some(buf);
            return Ok(None);
        }

        if actual != self.expected {
            return Err(TransportError::Reassembly {
                expected: self.expected,
                actual,
            });
        }

        tracing::trace!(len = actual, "reassembled inbound PDU");
        Ok(Some(buf.freeze()))
    }

    /// Returns true while a PDU is partially assembled.
    pub fn in_progress(&self) -> bool {
        self.pending.is_some()
    }
}
