//! Transport plumbing for the RAIL virtual channel.
//!
//! This is the lowest layer of railchan. It knows nothing about PDU
//! contents, only about moving whole PDU buffers around:
//! - [`ChunkAssembler`] rebuilds one PDU from chunked channel deliveries
//! - [`InboundQueue`] hands completed buffers from the host's read callback
//!   to a single processing thread
//! - [`InboundPipeline`] ties the two together for the producer side
//! - [`QueueWorker`] owns that thread and its bounded shutdown
//! - [`ByteSink`] is the outbound write side supplied by the host

pub mod assembler;
pub mod error;
pub mod pipeline;
pub mod queue;
pub mod sink;
pub mod worker;

#[cfg(feature = "async")]
pub mod tokio_sink;

pub use assembler::ChunkAssembler;
pub use error::{Result, TransportError};
pub use pipeline::InboundPipeline;
pub use queue::{InboundQueue, WaitOutcome};
pub use sink::{ByteSink, VecSink};
pub use worker::{QueueConfig, QueueWorker, ShutdownOutcome};

#[cfg(feature = "async")]
pub use tokio_sink::TokioChannelSink;
