use std::sync::Arc;

use bytes::Bytes;

use crate::assembler::ChunkAssembler;
use crate::error::Result;
use crate::queue::InboundQueue;

/// Producer side of the inbound path: reassembly followed by enqueue.
///
/// Owned by whichever thread the host uses for read callbacks. Completed
/// PDUs are converted into the queue's item type and pushed in one step.
#[derive(Debug)]
pub struct InboundPipeline<T> {
    assembler: ChunkAssembler,
    queue: Arc<InboundQueue<T>>,
}

impl<T: From<Bytes>> InboundPipeline<T> {
    /// Feed chunks into `queue`.
    pub fn new(queue: Arc<InboundQueue<T>>) -> Self {
        Self {
            assembler: ChunkAssembler::new(),
            queue,
        }
    }

    /// Reassemble one chunk; push the PDU when it completes.
    ///
    /// Returns true when a complete PDU was queued.
    pub fn deliver_chunk(
        &mut self,
        chunk: &[u8],
        total_length: usize,
        is_first: bool,
        is_last: bool,
    ) -> Result<bool> {
        match self
            .assembler
            .deliver_chunk(chunk, total_length, is_first, is_last)?
        {
            Some(pdu) => {
                self.queue.push(T::from(pdu))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Push an already complete item, bypassing reassembly.
    pub fn push(&self, item: T) -> Result<()> {
        self.queue.push(item)
    }

    /// The queue this pipeline feeds.
    pub fn queue(&self) -> &Arc<InboundQueue<T>> {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    #[test]
    fn queues_only_completed_pdus() {
        let queue = Arc::new(InboundQueue::<Bytes>::new());
        let mut pipeline = InboundPipeline::new(Arc::clone(&queue));

        assert!(!pipeline.deliver_chunk(b"he", 5, true, false).unwrap());
        assert!(queue.is_empty());
        assert!(pipeline.deliver_chunk(b"llo", 5, false, true).unwrap());

        let drained = queue.pop_all();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].as_ref(), b"hello");
    }

    #[test]
    fn reassembly_error_queues_nothing() {
        let queue = Arc::new(InboundQueue::<Bytes>::new());
        let mut pipeline = InboundPipeline::new(Arc::clone(&queue));

        pipeline.deliver_chunk(b"ab", 4, true, false).unwrap();
        let err = pipeline.deliver_chunk(b"c", 4, false, true).unwrap_err();
        assert!(matches!(err, TransportError::Reassembly { .. }));
        assert!(queue.is_empty());

        assert!(pipeline.deliver_chunk(b"wxyz", 4, true, true).unwrap());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn terminated_queue_rejects_completed_pdu() {
        let queue = Arc::new(InboundQueue::<Bytes>::new());
        let mut pipeline = InboundPipeline::new(Arc::clone(&queue));
        queue.terminate();

        let err = pipeline.deliver_chunk(b"ab", 2, true, true).unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }
}
