//! System parameter updates carried by SYSPARAM PDUs.
//!
//! Both directions share the order type but not the parameter set: the
//! client reports desktop and accessibility settings, the server reports
//! screen saver state. Each update leads with a u32 discriminant.

use bytes::{BufMut, BytesMut};
use serde::Serialize;

use crate::codec::{put_bool, read_bool, read_u32, WirePayload};
use crate::error::{DecodeError, EncodeError};
use crate::order;
use crate::primitives::{Rect16, UnicodeString};

pub const SPI_SETDRAGFULLWINDOWS: u32 = 0x0000_0025;
pub const SPI_SETKEYBOARDCUES: u32 = 0x0000_100B;
pub const SPI_SETKEYBOARDPREF: u32 = 0x0000_0045;
pub const SPI_SETMOUSEBUTTONSWAP: u32 = 0x0000_0021;
pub const SPI_SETWORKAREA: u32 = 0x0000_002F;
pub const SPI_DISPLAYCHANGE: u32 = 0x0000_F001;
pub const SPI_TASKBARPOS: u32 = 0x0000_F000;
pub const SPI_SETHIGHCONTRAST: u32 = 0x0000_0043;

pub const SPI_SETSCREENSAVEACTIVE: u32 = 0x0000_0011;
pub const SPI_SETSCREENSAVESECURE: u32 = 0x0000_0077;

/// High contrast accessibility settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HighContrast {
    pub flags: u32,
    pub color_scheme: UnicodeString,
}

/// A client-to-server system parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "param", content = "value", rename_all = "snake_case")]
pub enum ClientSysParam {
    DragFullWindows(bool),
    KeyboardCues(bool),
    KeyboardPref(bool),
    MouseButtonSwap(bool),
    WorkArea(Rect16),
    DisplayChange(Rect16),
    TaskbarPos(Rect16),
    HighContrast(HighContrast),
}

impl ClientSysParam {
    /// Build a boolean parameter from its raw SPI number.
    ///
    /// Only the four on/off parameters can be built this way; any other
    /// number is reported as [`EncodeError::UnsupportedVariant`].
    pub fn from_flag(kind: u32, enabled: bool) -> Result<Self, EncodeError> {
        match kind {
            SPI_SETDRAGFULLWINDOWS => Ok(Self::DragFullWindows(enabled)),
            SPI_SETKEYBOARDCUES => Ok(Self::KeyboardCues(enabled)),
            SPI_SETKEYBOARDPREF => Ok(Self::KeyboardPref(enabled)),
            SPI_SETMOUSEBUTTONSWAP => Ok(Self::MouseButtonSwap(enabled)),
            other => Err(EncodeError::UnsupportedVariant(other)),
        }
    }

    /// The SPI discriminant written on the wire.
    pub fn kind(&self) -> u32 {
        match self {
            Self::DragFullWindows(_) => SPI_SETDRAGFULLWINDOWS,
            Self::KeyboardCues(_) => SPI_SETKEYBOARDCUES,
            Self::KeyboardPref(_) => SPI_SETKEYBOARDPREF,
            Self::MouseButtonSwap(_) => SPI_SETMOUSEBUTTONSWAP,
            Self::WorkArea(_) => SPI_SETWORKAREA,
            Self::DisplayChange(_) => SPI_DISPLAYCHANGE,
            Self::TaskbarPos(_) => SPI_TASKBARPOS,
            Self::HighContrast(_) => SPI_SETHIGHCONTRAST,
        }
    }
}

impl WirePayload for ClientSysParam {
    const ORDER_TYPE: u16 = order::SYSPARAM;

    fn payload_len(&self) -> usize {
        let body = match self {
            Self::DragFullWindows(_)
            | Self::KeyboardCues(_)
            | Self::KeyboardPref(_)
            | Self::MouseButtonSwap(_) => 1,
            Self::WorkArea(_) | Self::DisplayChange(_) | Self::TaskbarPos(_) => Rect16::SIZE,
            Self::HighContrast(hc) => 4 + 4 + hc.color_scheme.encoded_len(),
        };
        4 + body
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32_le(self.kind());
        match self {
            Self::DragFullWindows(on)
            | Self::KeyboardCues(on)
            | Self::KeyboardPref(on)
            | Self::MouseButtonSwap(on) => put_bool(dst, *on),
            Self::WorkArea(rect) | Self::DisplayChange(rect) | Self::TaskbarPos(rect) => {
                rect.encode(dst)
            }
            Self::HighContrast(hc) => {
                let scheme_len = hc.color_scheme.encoded_len();
                let scheme_len = u32::try_from(scheme_len).map_err(|_| EncodeError::FieldTooLong {
                    field: "ColorSchemeLength",
                    len: scheme_len,
                    max: u32::MAX as usize,
                })?;
                dst.put_u32_le(hc.flags);
                dst.put_u32_le(scheme_len);
                hc.color_scheme.encode("ColorScheme", dst)?;
            }
        }
        Ok(())
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        let kind = read_u32(src)?;
        match kind {
            SPI_SETDRAGFULLWINDOWS => Ok(Self::DragFullWindows(read_bool(src)?)),
            SPI_SETKEYBOARDCUES => Ok(Self::KeyboardCues(read_bool(src)?)),
            SPI_SETKEYBOARDPREF => Ok(Self::KeyboardPref(read_bool(src)?)),
            SPI_SETMOUSEBUTTONSWAP => Ok(Self::MouseButtonSwap(read_bool(src)?)),
            SPI_SETWORKAREA => Ok(Self::WorkArea(Rect16::decode(src)?)),
            SPI_DISPLAYCHANGE => Ok(Self::DisplayChange(Rect16::decode(src)?)),
            SPI_TASKBARPOS => Ok(Self::TaskbarPos(Rect16::decode(src)?)),
            SPI_SETHIGHCONTRAST => {
                let flags = read_u32(src)?;
                let scheme_len = read_u32(src)?;
                let color_scheme = UnicodeString::decode(src)?;
                if scheme_len as usize != color_scheme.encoded_len() {
                    return Err(DecodeError::Inconsistent(format!(
                        "ColorSchemeLength {scheme_len} does not match a {}-byte scheme",
                        color_scheme.len()
                    )));
                }
                Ok(Self::HighContrast(HighContrast {
                    flags,
                    color_scheme,
                }))
            }
            value => Err(DecodeError::UnknownOrder {
                kind: "client system parameter",
                value,
            }),
        }
    }
}

/// A server-to-client system parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "param", content = "value", rename_all = "snake_case")]
pub enum ServerSysParam {
    ScreenSaveActive(bool),
    ScreenSaveSecure(bool),
}

impl ServerSysParam {
    /// The SPI discriminant written on the wire.
    pub fn kind(&self) -> u32 {
        match self {
            Self::ScreenSaveActive(_) => SPI_SETSCREENSAVEACTIVE,
            Self::ScreenSaveSecure(_) => SPI_SETSCREENSAVESECURE,
        }
    }

    pub fn enabled(&self) -> bool {
        match *self {
            Self::ScreenSaveActive(on) | Self::ScreenSaveSecure(on) => on,
        }
    }
}

impl WirePayload for ServerSysParam {
    const ORDER_TYPE: u16 = order::SYSPARAM;

    fn payload_len(&self) -> usize {
        4 + 1
    }

    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u32_le(self.kind());
        put_bool(dst, self.enabled());
        Ok(())
    }

    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
        match read_u32(src)? {
            SPI_SETSCREENSAVEACTIVE => Ok(Self::ScreenSaveActive(read_bool(src)?)),
            SPI_SETSCREENSAVESECURE => Ok(Self::ScreenSaveSecure(read_bool(src)?)),
            value => Err(DecodeError::UnknownOrder {
                kind: "server system parameter",
                value,
            }),
        }
    }
}

/// The parameter set a client reports right after the handshake when the
/// application has nothing more specific to say.
pub fn default_initial_sysparams() -> Vec<ClientSysParam> {
    vec![
        ClientSysParam::HighContrast(HighContrast {
            flags: 0x7E,
            color_scheme: UnicodeString::default(),
        }),
        ClientSysParam::TaskbarPos(Rect16::new(0, 0, 1024, 29)),
        ClientSysParam::MouseButtonSwap(false),
        ClientSysParam::KeyboardPref(false),
        ClientSysParam::DragFullWindows(true),
        ClientSysParam::KeyboardCues(false),
        ClientSysParam::WorkArea(Rect16::new(0, 0, 1024, 768)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_body, decode_header, encode_pdu};

    fn payload_of(param: &ClientSysParam) -> Vec<u8> {
        let pdu = encode_pdu(param).unwrap();
        let (_, body) = decode_header(&pdu).unwrap();
        body.to_vec()
    }

    #[test]
    fn from_flag_builds_boolean_params() {
        assert_eq!(
            ClientSysParam::from_flag(SPI_SETMOUSEBUTTONSWAP, true).unwrap(),
            ClientSysParam::MouseButtonSwap(true)
        );
        assert_eq!(
            ClientSysParam::from_flag(SPI_SETWORKAREA, true).unwrap_err(),
            EncodeError::UnsupportedVariant(SPI_SETWORKAREA)
        );
        assert_eq!(
            ClientSysParam::from_flag(0xDEAD, false).unwrap_err(),
            EncodeError::UnsupportedVariant(0xDEAD)
        );
    }

    #[test]
    fn high_contrast_wire_layout() {
        let param = ClientSysParam::HighContrast(HighContrast {
            flags: 0x7E,
            color_scheme: UnicodeString::new(vec![b'x', 0]),
        });
        let body = payload_of(&param);
        assert_eq!(
            body,
            vec![
                0x43, 0, 0, 0, // SPI_SETHIGHCONTRAST
                0x7E, 0, 0, 0, // flags
                4, 0, 0, 0, // ColorSchemeLength = 2 + 2
                2, 0, b'x', 0,
            ]
        );
        assert_eq!(decode_body::<ClientSysParam>(&body).unwrap(), param);
    }

    #[test]
    fn high_contrast_length_mismatch_is_inconsistent() {
        let mut body = payload_of(&ClientSysParam::HighContrast(HighContrast::default()));
        body[8] = 9;
        let err = decode_body::<ClientSysParam>(&body).unwrap_err();
        assert!(matches!(err, DecodeError::Inconsistent(_)));
    }

    #[test]
    fn unknown_client_discriminant_is_reported() {
        let body = [0x99u8, 0x99, 0, 0, 1];
        let err = decode_body::<ClientSysParam>(&body).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownOrder {
                kind: "client system parameter",
                value: 0x9999
            }
        );
    }

    #[test]
    fn unknown_server_discriminant_is_reported() {
        let body = [0x25u8, 0, 0, 0, 1];
        let err = decode_body::<ServerSysParam>(&body).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownOrder { value: 0x25, .. }));
    }

    #[test]
    fn every_client_param_round_trips() {
        let mut params = default_initial_sysparams();
        params.push(ClientSysParam::DisplayChange(Rect16::new(0, 0, 1920, 1080)));
        for param in params {
            let body = payload_of(&param);
            assert_eq!(body.len(), param.payload_len());
            assert_eq!(decode_body::<ClientSysParam>(&body).unwrap(), param);
            for cut in 0..body.len() {
                assert!(matches!(
                    decode_body::<ClientSysParam>(&body[..cut]),
                    Err(DecodeError::Truncated { .. })
                ));
            }
        }
    }

    #[test]
    fn default_set_matches_reference_desktop() {
        let params = default_initial_sysparams();
        assert_eq!(params.len(), 7);
        assert_eq!(params[4], ClientSysParam::DragFullWindows(true));
        assert_eq!(
            params[6],
            ClientSysParam::WorkArea(Rect16::new(0, 0, 1024, 768))
        );
    }
}
