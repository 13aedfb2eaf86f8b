//! Server-to-client PDUs.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::client::{HandshakePdu, LangbarInfoPdu};
use crate::codec::{decode_body, decode_header, encode_pdu, read_bytes, read_u16, read_u32, WirePayload};
use crate::error::{DecodeError, EncodeError};
use crate::order;
use crate::primitives::UnicodeString;
use crate::sysparam::ServerSysParam;

/// Fixed size of the ApplicationId field: 256 wide characters.
pub const APP_ID_SIZE: usize = 512;

/// Server Execute Result PDU.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecResultPdu {
    pub flags: u16,
    pub exec_result: u16,
    pub raw_result: u32,
    pub exe_or_file: UnicodeString,
}

impl ExecResultPdu {
    /// Returns true if the server launched the application.
    pub fn succeeded(&self) -> bool {
        self.exec_result == order::EXEC_S_OK
    }
}

impl WirePayload for ExecResultPdu {
    const ORDER_TYPE: u16 = order::EXEC_RESULT;

    fn payload_len(&self) -> usize {
        2 + 2 + 4 + 2 + self.exe_or_file.encoded_len()
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16_le(self.flags);
        dst.put_u16_le(self.exec_result);
        dst.put_u32_le(self.raw_result);
        dst.put_u16_le(0); // padding
        self.exe_or_file.encode("ExeOrFile", dst)
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        let flags = read_u16(src)?;
        let exec_result = read_u16(src)?;
        let raw_result = read_u32(src)?;
        let _padding = read_u16(src)?;
        Ok(Self {
            flags,
            exec_result,
            raw_result,
            exe_or_file: UnicodeString::decode(src)?,
        })
    }
}

/// Server Move/Size Start or End PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveSizePdu {
    pub window_id: u32,
    /// Nonzero for Move/Size Start, zero for Move/Size End.
    pub is_move_size_start: u16,
    pub move_size_type: u16,
    pub pos_x: u16,
    pub pos_y: u16,
}

impl WirePayload for MoveSizePdu {
    const ORDER_TYPE: u16 = order::LOCALMOVESIZE;

    fn payload_len(&self) -> usize {
        4 + 2 * 4
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32_le(self.window_id);
        dst.put_u16_le(self.is_move_size_start);
        dst.put_u16_le(self.move_size_type);
        dst.put_u16_le(self.pos_x);
        dst.put_u16_le(self.pos_y);
        Ok(())
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            window_id: read_u32(src)?,
            is_move_size_start: read_u16(src)?,
            move_size_type: read_u16(src)?,
            pos_x: read_u16(src)?,
            pos_y: read_u16(src)?,
        })
    }
}

impl MoveSizePdu {
    pub fn is_start(&self) -> bool {
        self.is_move_size_start != 0
    }
}

/// Server Min Max Info PDU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MinMaxInfoPdu {
    pub window_id: u32,
    pub max_width: u16,
    pub max_height: u16,
    pub max_pos_x: u16,
    pub max_pos_y: u16,
    pub min_track_width: u16,
    pub min_track_height: u16,
    pub max_track_width: u16,
    pub max_track_height: u16,
}

impl WirePayload for MinMaxInfoPdu {
    const ORDER_TYPE: u16 = order::MINMAXINFO;

    fn payload_len(&self) -> usize {
        4 + 2 * 8
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32_le(self.window_id);
        for extent in [
            self.max_width,
            self.max_height,
            self.max_pos_x,
            self.max_pos_y,
            self.min_track_width,
            self.min_track_height,
            self.max_track_width,
            self.max_track_height,
        ] {
            dst.put_u16_le(extent);
        }
        Ok(())
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            window_id: read_u32(src)?,
            max_width: read_u16(src)?,
            max_height: read_u16(src)?,
            max_pos_x: read_u16(src)?,
            max_pos_y: read_u16(src)?,
            min_track_width: read_u16(src)?,
            min_track_height: read_u16(src)?,
            max_track_width: read_u16(src)?,
            max_track_height: read_u16(src)?,
        })
    }
}

/// Server Get Application ID Response PDU.
///
/// The application id occupies a fixed 512-byte field, NUL padded. Only the
/// trailing padding is stripped on decode; interior NUL units are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GetAppIdResponsePdu {
    pub window_id: u32,
    pub app_id: UnicodeString,
}

impl GetAppIdResponsePdu {
    /// The application id up to its first NUL unit.
    pub fn app_id_text(&self) -> String {
        let raw = self.app_id.as_bytes();
        let end = raw
            .chunks_exact(2)
            .position(|unit| unit == [0u8, 0])
            .map_or(raw.len(), |index| index * 2);
        UnicodeString::new(raw[..end].to_vec()).to_string_lossy()
    }
}

impl WirePayload for GetAppIdResponsePdu {
    const ORDER_TYPE: u16 = order::GET_APPID_RESP;

    fn payload_len(&self) -> usize {
        4 + APP_ID_SIZE
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        let app_id = self.app_id.as_bytes();
        if app_id.len() > APP_ID_SIZE {
            return Err(EncodeError::FieldTooLong {
                field: "ApplicationId",
                len: app_id.len(),
                max: APP_ID_SIZE,
            });
        }
        dst.put_u32_le(self.window_id);
        dst.put_slice(app_id);
        dst.put_bytes(0, APP_ID_SIZE - app_id.len());
        Ok(())
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        let window_id = read_u32(src)?;
        let mut raw = read_bytes(src, APP_ID_SIZE)?;
        let end = raw
            .chunks_exact(2)
            .rposition(|unit| unit != [0u8, 0])
            .map_or(0, |index| (index + 1) * 2);
        raw.truncate(end);
        Ok(Self {
            window_id,
            app_id: UnicodeString::new(raw),
        })
    }
}

/// Every PDU a server may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "order", content = "body", rename_all = "snake_case")]
pub enum ServerPdu {
    Handshake(HandshakePdu),
    ExecResult(ExecResultPdu),
    SysParam(ServerSysParam),
    MoveSize(MoveSizePdu),
    MinMaxInfo(MinMaxInfoPdu),
    LangbarInfo(LangbarInfoPdu),
    GetAppIdResponse(GetAppIdResponsePdu),
}

impl ServerPdu {
    /// The orderType this PDU is sent with.
    pub fn order_type(&self) -> u16 {
        match self {
            Self::Handshake(_) => HandshakePdu::ORDER_TYPE,
            Self::ExecResult(_) => ExecResultPdu::ORDER_TYPE,
            Self::SysParam(_) => ServerSysParam::ORDER_TYPE,
            Self::MoveSize(_) => MoveSizePdu::ORDER_TYPE,
            Self::MinMaxInfo(_) => MinMaxInfoPdu::ORDER_TYPE,
            Self::LangbarInfo(_) => LangbarInfoPdu::ORDER_TYPE,
            Self::GetAppIdResponse(_) => GetAppIdResponsePdu::ORDER_TYPE,
        }
    }
}

/// Encode a server PDU with its header.
pub fn encode_server_pdu(pdu: &ServerPdu) -> Result<Bytes, EncodeError> {
    match pdu {
        ServerPdu::Handshake(p) => encode_pdu(p),
        ServerPdu::ExecResult(p) => encode_pdu(p),
        ServerPdu::SysParam(p) => encode_pdu(p),
        ServerPdu::MoveSize(p) => encode_pdu(p),
        ServerPdu::MinMaxInfo(p) => encode_pdu(p),
        ServerPdu::LangbarInfo(p) => encode_pdu(p),
        ServerPdu::GetAppIdResponse(p) => encode_pdu(p),
    }
}

/// Decode one server PDU, header included.
pub fn decode_server_pdu(src: &[u8]) -> Result<ServerPdu, DecodeError> {
    let (header, body) = decode_header(src)?;
    let pdu = match header.order_type {
        order::HANDSHAKE => ServerPdu::Handshake(decode_body(body)?),
        order::EXEC_RESULT => ServerPdu::ExecResult(decode_body(body)?),
        order::SYSPARAM => ServerPdu::SysParam(decode_body(body)?),
        order::LOCALMOVESIZE => ServerPdu::MoveSize(decode_body(body)?),
        order::MINMAXINFO => ServerPdu::MinMaxInfo(decode_body(body)?),
        order::LANGBARINFO => ServerPdu::LangbarInfo(decode_body(body)?),
        order::GET_APPID_RESP => ServerPdu::GetAppIdResponse(decode_body(body)?),
        other => {
            return Err(DecodeError::UnknownOrder {
                kind: "server order type",
                value: u32::from(other),
            })
        }
    };
    Ok(pdu)
}
