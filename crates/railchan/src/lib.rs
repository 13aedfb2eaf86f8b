//! Client-side engine for the RDP Remote Programs (RAIL) virtual channel.
//!
//! RAIL lets a remote application's windows appear as local windows. This
//! crate bundles the protocol layers a host embeds to drive that channel.
//!
//! # Crate Structure
//!
//! - [`transport`]: chunk reassembly, the inbound queue and its worker,
//!   and the outbound byte sink
//! - [`pdu`]: encode/decode of channel PDUs and windowing orders
//! - [`session`]: capability sets, the handshake state machine and the
//!   channel lifecycle

/// Re-export transport types.
pub mod transport {
    pub use railchan_transport::*;
}

/// Re-export PDU codec types.
pub mod pdu {
    pub use railchan_pdu::*;
}

/// Re-export session types.
pub mod session {
    pub use railchan_session::*;
}
