//! Wire codec for the RAIL (Remote Applications Integrated Locally) channel.
//!
//! Every channel PDU is framed with:
//! - A 2-byte little-endian order type
//! - A 2-byte little-endian total length, header included
//!
//! Windowing orders from the graphics update stream are handled in
//! [`window`]. Decoding treats all input as untrusted: every declared length
//! is checked against the remaining bytes before anything is allocated.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod client;
pub mod codec;
pub mod error;
pub mod order;
pub mod primitives;
pub mod server;
pub mod sysparam;
pub mod window;

#[cfg(feature = "async")]
pub use async_codec::RailCodec;
pub use client::{
    decode_client_pdu, encode_client_pdu, ActivatePdu, ClientInformationPdu, ClientPdu, ExecPdu,
    GetAppIdRequestPdu, HandshakePdu, LangbarInfoPdu, NotifyEventPdu, SysCommandPdu, SystemMenuPdu,
    WindowMovePdu,
};
pub use codec::{
    decode_header, encode_pdu, ensure, CodecConfig, PduHeader, WirePayload, HEADER_SIZE,
    MAX_PDU_SIZE,
};
pub use error::{DecodeError, EncodeError, PduError, Result};
pub use order::{exec_result_name, is_valid_for, order_name, Direction};
pub use primitives::{CachedIconInfo, IconInfo, Rect16, UnicodeString};
pub use server::{
    decode_server_pdu, encode_server_pdu, ExecResultPdu, GetAppIdResponsePdu, MinMaxInfoPdu,
    MoveSizePdu, ServerPdu,
};
pub use sysparam::{default_initial_sysparams, ClientSysParam, HighContrast, ServerSysParam};
pub use window::{
    decode_window_order, encode_window_order, DesktopInfo, DesktopRecord, DesktopUpdate,
    NotifyIconInfo, NotifyIconInfoTip, NotifyIconRecord, NotifyIconUpdate, Point32, Size32,
    WindowInfo, WindowOrder, WindowRecord, WindowStyle, WindowUpdate,
};
