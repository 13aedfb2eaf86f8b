//! Client-to-server PDUs.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::codec::{
    decode_body, decode_header, encode_pdu, len_u16, read_bytes, read_u16, read_u32, read_u8,
    WirePayload,
};
use crate::error::{DecodeError, EncodeError};
use crate::order;
use crate::primitives::{Rect16, UnicodeString};
use crate::sysparam::ClientSysParam;

/// Handshake PDU. The same layout is used in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HandshakePdu {
    pub build_number: u32,
}

impl WirePayload for HandshakePdu {
    const ORDER_TYPE: u16 = order::HANDSHAKE;

    fn payload_len(&self) -> usize {
        4
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32_le(self.build_number);
        Ok(())
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            build_number: read_u32(src)?,
        })
    }
}

/// Client Activate PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivatePdu {
    pub window_id: u32,
    /// Nonzero activates the window.
    pub enabled: u8,
}

impl ActivatePdu {
    pub fn is_enabled(&self) -> bool {
        self.enabled != 0
    }
}

impl WirePayload for ActivatePdu {
    const ORDER_TYPE: u16 = order::ACTIVATE;

    fn payload_len(&self) -> usize {
        4 + 1
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32_le(self.window_id);
        dst.put_u8(self.enabled);
        Ok(())
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            window_id: read_u32(src)?,
            enabled: read_u8(src)?,
        })
    }
}

/// Client Execute PDU.
///
/// The three string lengths travel together after the flags, followed by
/// the string bytes themselves, as MS-RDPERP lays the PDU out. The strings
/// are not individually length prefixed:
/// ```text
/// Flags(2) ExeOrFileLength(2) WorkingDirLength(2) ArgumentsLen(2)
/// ExeOrFile WorkingDir Arguments
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecPdu {
    pub flags: u16,
    pub exe_or_file: UnicodeString,
    pub working_dir: UnicodeString,
    pub arguments: UnicodeString,
}

impl WirePayload for ExecPdu {
    const ORDER_TYPE: u16 = order::EXEC;

    fn payload_len(&self) -> usize {
        2 + 2 + 2 + 2 + self.exe_or_file.len() + self.working_dir.len() + self.arguments.len()
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16_le(self.flags);
        dst.put_u16_le(len_u16("ExeOrFile", self.exe_or_file.len())?);
        dst.put_u16_le(len_u16("WorkingDir", self.working_dir.len())?);
        dst.put_u16_le(len_u16("Arguments", self.arguments.len())?);
        dst.put_slice(self.exe_or_file.as_bytes());
        dst.put_slice(self.working_dir.as_bytes());
        dst.put_slice(self.arguments.as_bytes());
        Ok(())
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        let flags = read_u16(src)?;
        let exe_len = read_u16(src)?;
        let dir_len = read_u16(src)?;
        let args_len = read_u16(src)?;
        Ok(Self {
            flags,
            exe_or_file: UnicodeString::new(read_bytes(src, usize::from(exe_len))?),
            working_dir: UnicodeString::new(read_bytes(src, usize::from(dir_len))?),
            arguments: UnicodeString::new(read_bytes(src, usize::from(args_len))?),
        })
    }
}

/// Client System Command PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SysCommandPdu {
    pub window_id: u32,
    pub command: u16,
}

impl WirePayload for SysCommandPdu {
    const ORDER_TYPE: u16 = order::SYSCOMMAND;

    fn payload_len(&self) -> usize {
        4 + 2
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32_le(self.window_id);
        dst.put_u16_le(self.command);
        Ok(())
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            window_id: read_u32(src)?,
            command: read_u16(src)?,
        })
    }
}

/// Client Notify Event PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotifyEventPdu {
    pub window_id: u32,
    pub notify_icon_id: u32,
    pub message: u32,
}

impl WirePayload for NotifyEventPdu {
    const ORDER_TYPE: u16 = order::NOTIFY_EVENT;

    fn payload_len(&self) -> usize {
        4 * 3
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32_le(self.window_id);
        dst.put_u32_le(self.notify_icon_id);
        dst.put_u32_le(self.message);
        Ok(())
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            window_id: read_u32(src)?,
            notify_icon_id: read_u32(src)?,
            message: read_u32(src)?,
        })
    }
}

/// Client Window Move PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowMovePdu {
    pub window_id: u32,
    pub position: Rect16,
}

impl WirePayload for WindowMovePdu {
    const ORDER_TYPE: u16 = order::WINDOWMOVE;

    fn payload_len(&self) -> usize {
        4 + Rect16::SIZE
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32_le(self.window_id);
        self.position.encode(dst);
        Ok(())
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            window_id: read_u32(src)?,
            position: Rect16::decode(src)?,
        })
    }
}

/// Client Information PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientInformationPdu {
    pub flags: u32,
}

impl WirePayload for ClientInformationPdu {
    const ORDER_TYPE: u16 = order::CLIENTSTATUS;

    fn payload_len(&self) -> usize {
        4
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32_le(self.flags);
        Ok(())
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            flags: read_u32(src)?,
        })
    }
}

/// Client System Menu PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemMenuPdu {
    pub window_id: u32,
    pub left: u16,
    pub top: u16,
}

impl WirePayload for SystemMenuPdu {
    const ORDER_TYPE: u16 = order::SYSMENU;

    fn payload_len(&self) -> usize {
        4 + 2 + 2
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32_le(self.window_id);
        dst.put_u16_le(self.left);
        dst.put_u16_le(self.top);
        Ok(())
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            window_id: read_u32(src)?,
            left: read_u16(src)?,
            top: read_u16(src)?,
        })
    }
}

/// Language Bar Information PDU. The same layout is used in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LangbarInfoPdu {
    pub status: u32,
}

impl WirePayload for LangbarInfoPdu {
    const ORDER_TYPE: u16 = order::LANGBARINFO;

    fn payload_len(&self) -> usize {
        4
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32_le(self.status);
        Ok(())
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            status: read_u32(src)?,
        })
    }
}

/// Client Get Application ID PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GetAppIdRequestPdu {
    pub window_id: u32,
}

impl WirePayload for GetAppIdRequestPdu {
    const ORDER_TYPE: u16 = order::GET_APPID_REQ;

    fn payload_len(&self) -> usize {
        4
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32_le(self.window_id);
        Ok(())
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            window_id: read_u32(src)?,
        })
    }
}

/// Every PDU a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "order", content = "body", rename_all = "snake_case")]
pub enum ClientPdu {
    Handshake(HandshakePdu),
    Activate(ActivatePdu),
    Exec(ExecPdu),
    SysParam(ClientSysParam),
    SysCommand(SysCommandPdu),
    NotifyEvent(NotifyEventPdu),
    WindowMove(WindowMovePdu),
    ClientStatus(ClientInformationPdu),
    SystemMenu(SystemMenuPdu),
    LangbarInfo(LangbarInfoPdu),
    GetAppIdRequest(GetAppIdRequestPdu),
}

impl ClientPdu {
    /// The orderType this PDU is sent with.
    pub fn order_type(&self) -> u16 {
        match self {
            Self::Handshake(_) => HandshakePdu::ORDER_TYPE,
            Self::Activate(_) => ActivatePdu::ORDER_TYPE,
            Self::Exec(_) => ExecPdu::ORDER_TYPE,
            Self::SysParam(_) => ClientSysParam::ORDER_TYPE,
            Self::SysCommand(_) => SysCommandPdu::ORDER_TYPE,
            Self::NotifyEvent(_) => NotifyEventPdu::ORDER_TYPE,
            Self::WindowMove(_) => WindowMovePdu::ORDER_TYPE,
            Self::ClientStatus(_) => ClientInformationPdu::ORDER_TYPE,
            Self::SystemMenu(_) => SystemMenuPdu::ORDER_TYPE,
            Self::LangbarInfo(_) => LangbarInfoPdu::ORDER_TYPE,
            Self::GetAppIdRequest(_) => GetAppIdRequestPdu::ORDER_TYPE,
        }
    }
}

/// Encode a client PDU with its header.
pub fn encode_client_pdu(pdu: &ClientPdu) -> Result<Bytes, EncodeError> {
    match pdu {
        ClientPdu::Handshake(p) => encode_pdu(p),
        ClientPdu::Activate(p) => encode_pdu(p),
        ClientPdu::Exec(p) => encode_pdu(p),
        ClientPdu::SysParam(p) => encode_pdu(p),
        ClientPdu::SysCommand(p) => encode_pdu(p),
        ClientPdu::NotifyEvent(p) => encode_pdu(p),
        ClientPdu::WindowMove(p) => encode_pdu(p),
        ClientPdu::ClientStatus(p) => encode_pdu(p),
        ClientPdu::SystemMenu(p) => encode_pdu(p),
        ClientPdu::LangbarInfo(p) => encode_pdu(p),
        ClientPdu::GetAppIdRequest(p) => encode_pdu(p),
    }
}

/// Decode one client PDU, header included.
pub fn decode_client_pdu(src: &[u8]) -> Result<ClientPdu, DecodeError> {
    let (header, body) = decode_header(src)?;
    let pdu = match header.order_type {
        order::HANDSHAKE => ClientPdu::Handshake(decode_body(body)?),
        order::ACTIVATE => ClientPdu::Activate(decode_body(body)?),
        order::EXEC => ClientPdu::Exec(decode_body(body)?),
        order::SYSPARAM => ClientPdu::SysParam(decode_body(body)?),
        order::SYSCOMMAND => ClientPdu::SysCommand(decode_body(body)?),
        order::NOTIFY_EVENT => ClientPdu::NotifyEvent(decode_body(body)?),
        order::WINDOWMOVE => ClientPdu::WindowMove(decode_body(body)?),
        order::CLIENTSTATUS => ClientPdu::ClientStatus(decode_body(body)?),
        order::SYSMENU => ClientPdu::SystemMenu(decode_body(body)?),
        order::LANGBARINFO => ClientPdu::LangbarInfo(decode_body(body)?),
        order::GET_APPID_REQ => ClientPdu::GetAppIdRequest(decode_body(body)?),
        other => {
            return Err(DecodeError::UnknownOrder {
                kind: "client order type",
                value: u32::from(other),
            })
        }
    };
    Ok(pdu)
}
