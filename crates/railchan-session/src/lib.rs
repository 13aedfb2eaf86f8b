//! Session layer of the RAIL channel.
//!
//! This is where the protocol is driven. Capability sets are negotiated,
//! the handshake runs from channel-connect to established, inbound PDUs are
//! dispatched to the application's [`EventSink`], and application commands
//! are encoded onto the host's [`railchan_transport::ByteSink`].

pub mod capabilities;
pub mod channel;
pub mod config;
pub mod error;
pub mod event;
pub mod handshake;
pub mod session;
pub mod text;

#[cfg(test)]
mod test_support;

pub use capabilities::{
    apply_remote_rail_capset, apply_remote_window_capset, build_local_rail_capset,
    build_local_window_capset, RailCapset, WindowCapset, RAIL_LEVEL_DOCKED_LANGBAR_SUPPORTED,
    RAIL_LEVEL_SUPPORTED, WINDOW_LEVEL_NOT_SUPPORTED, WINDOW_LEVEL_SUPPORTED,
    WINDOW_LEVEL_SUPPORTED_EX,
};
pub use channel::{Inbound, RailChannel};
pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use event::{EventSink, SysParamPusher};
pub use handshake::{Handshake, HandshakeState};
pub use session::Session;
pub use text::{TextCodec, Utf16Codec};
