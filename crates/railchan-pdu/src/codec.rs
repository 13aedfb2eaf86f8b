use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::error::{DecodeError, EncodeError};

/// PDU header: orderType (2) + orderLength (2) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Largest PDU the 16-bit orderLength field can describe.
pub const MAX_PDU_SIZE: usize = u16::MAX as usize;

/// The fixed header in front of every RAIL PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PduHeader {
    /// Order type, one of the constants in [`crate::order`].
    pub order_type: u16,
    /// Total PDU length including this header.
    pub order_length: u16,
}

impl PduHeader {
    /// Payload length implied by `order_length`.
    pub fn payload_len(&self) -> usize {
        usize::from(self.order_length).saturating_sub(HEADER_SIZE)
    }
}

/// A payload that knows its order type and wire layout.
///
/// `payload_len` must return exactly the number of bytes `encode_payload`
/// writes; the PDU buffer is sized from it before anything is written.
pub trait WirePayload: Sized {
    /// The orderType written in the header.
    const ORDER_TYPE: u16;

    /// Encoded payload size in bytes, excluding the header.
    fn payload_len(&self) -> usize;

    /// Append the payload to `dst`.
    fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError>;

    /// Read the payload from the front of `src`, advancing it.
    fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError>;
}

/// Encode one payload as a complete header-prefixed PDU.
///
/// Wire format:
/// ```text
/// ┌───────────────┬────────────────┬───────────────────────────┐
/// │ orderType     │ orderLength    │ Payload                   │
/// │ (2B LE)       │ (2B LE)        │ (orderLength - 4 bytes)   │
/// └───────────────┴────────────────┴───────────────────────────┘
/// ```
pub fn encode_pdu<P: WirePayload>(payload: &P) -> Result<Bytes, EncodeError> {
    let total = HEADER_SIZE + payload.payload_len();
    let order_length = u16::try_from(total).map_err(|_| EncodeError::FieldTooLong {
        field: "orderLength",
        len: total,
        max: MAX_PDU_SIZE,
    })?;

    let mut dst = BytesMut::with_capacity(total);
    dst.put_u16_le(P::ORDER_TYPE);
    dst.put_u16_le(order_length);
    payload.encode_payload(&mut dst)?;
    debug_assert_eq!(dst.len(), total, "payload_len disagrees with encoder");

    Ok(dst.freeze())
}

/// Split a PDU into its header and the payload slice it declares.
///
/// Bytes after `orderLength` are not part of the PDU and are ignored.
pub fn decode_header(src: &[u8]) -> Result<(PduHeader, &[u8]), DecodeError> {
    ensure(src, HEADER_SIZE)?;
    let mut cursor = src;
    let order_type = read_u16(&mut cursor)?;
    let order_length = read_u16(&mut cursor)?;

    let total = usize::from(order_length);
    if total < HEADER_SIZE {
        return Err(DecodeError::Inconsistent(format!(
            "orderLength {total} is shorter than the header"
        )));
    }
    if total > src.len() {
        return Err(DecodeError::Truncated {
            needed: total,
            remaining: src.len(),
        });
    }
    if total < src.len() {
        tracing::trace!(
            order_length = total,
            buffer = src.len(),
            "ignoring bytes past orderLength"
        );
    }

    Ok((
        PduHeader {
            order_type,
            order_length,
        },
        &src[HEADER_SIZE..total],
    ))
}

/// Decode a payload and note any bytes it left unread.
pub(crate) fn decode_body<P: WirePayload>(mut body: &[u8]) -> Result<P, DecodeError> {
    let payload = P::decode_payload(&mut body)?;
    if !body.is_empty() {
        tracing::trace!(
            order_type = P::ORDER_TYPE,
            trailing = body.len(),
            "tolerating trailing payload bytes"
        );
    }
    Ok(payload)
}

/// Configuration for stream framing.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Largest orderLength accepted from a stream. Default: 65535.
    pub max_pdu_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_pdu_size: MAX_PDU_SIZE,
        }
    }
}

/// Fail with [`DecodeError::Truncated`] unless `src` holds `needed` bytes.
pub fn ensure(src: &[u8], needed: usize) -> Result<(), DecodeError> {
    if src.len() < needed {
        return Err(DecodeError::Truncated {
            needed,
            remaining: src.len(),
        });
    }
    Ok(())
}

pub(crate) fn read_u8(src: &mut &[u8]) -> Result<u8, DecodeError> {
    ensure(src, 1)?;
    Ok(src.get_u8())
}

pub(crate) fn read_u16(src: &mut &[u8]) -> Result<u16, DecodeError> {
    ensure(src, 2)?;
    Ok(src.get_u16_le())
}

pub(crate) fn read_u32(src: &mut &[u8]) -> Result<u32, DecodeError> {
    ensure(src, 4)?;
    Ok(src.get_u32_le())
}

pub(crate) fn read_i32(src: &mut &[u8]) -> Result<i32, DecodeError> {
    ensure(src, 4)?;
    Ok(src.get_i32_le())
}

pub(crate) fn read_bytes(src: &mut &[u8], len: usize) -> Result<Vec<u8>, DecodeError> {
    ensure(src, len)?;
    let (head, tail) = src.split_at(len);
    *src = tail;
    Ok(head.to_vec())
}

/// Check that `count` items of `item_size` bytes are present before
/// allocating for them.
pub(crate) fn ensure_items(src: &[u8], count: usize, item_size: usize) -> Result<(), DecodeError> {
    let needed = count.checked_mul(item_size).ok_or(DecodeError::Truncated {
        needed: usize::MAX,
        remaining: src.len(),
    })?;
    ensure(src, needed)
}

pub(crate) fn len_u16(field: &'static str, len: usize) -> Result<u16, EncodeError> {
    u16::try_from(len).map_err(|_| EncodeError::FieldTooLong {
        field,
        len,
        max: u16::MAX as usize,
    })
}

pub(crate) fn put_bool(dst: &mut BytesMut, value: bool) {
    dst.put_u8(u8::from(value));
}

pub(crate) fn read_bool(src: &mut &[u8]) -> Result<bool, DecodeError> {
    Ok(read_u8(src)? != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        a: u32,
        b: u16,
    }

    impl WirePayload for Pair {
        const ORDER_TYPE: u16 = 0x7777;

        fn payload_len(&self) -> usize {
            6
        }

        fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
            dst.put_u32_le(self.a);
            dst.put_u16_le(self.b);
            Ok(())
        }

        fn decode_payload(src: &mut &[u8]) -> Result<Self, DecodeError> {
            Ok(Self {
                a: read_u32(src)?,
                b: read_u16(src)?,
            })
        }
    }

    #[test]
    fn header_precedes_payload() {
        let pdu = encode_pdu(&Pair { a: 1, b: 2 }).unwrap();
        assert_eq!(
            pdu.as_ref(),
            &[0x77u8, 0x77, 0x0A, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00]
        );

        let (header, body) = decode_header(&pdu).unwrap();
        assert_eq!(header.order_type, 0x7777);
        assert_eq!(usize::from(header.order_length), pdu.len());
        assert_eq!(header.payload_len(), 6);
        let pair: Pair = decode_body(body).unwrap();
        assert_eq!((pair.a, pair.b), (1, 2));
    }

    #[test]
    fn short_header_is_truncated() {
        let err = decode_header(&[0x05, 0x00, 0x08]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                needed: 4,
                remaining: 3
            }
        );
    }

    #[test]
    fn order_length_below_header_is_inconsistent() {
        let err = decode_header(&[0x05, 0x00, 0x02, 0x00]).unwrap_err();
        assert!(matches!(err, DecodeError::Inconsistent(_)));
    }

    #[test]
    fn order_length_past_buffer_is_truncated() {
        let err = decode_header(&[0x05, 0x00, 0x08, 0x00, 0xB0]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                needed: 8,
                remaining: 5
            }
        );
    }

    #[test]
    fn bytes_past_order_length_are_ignored() {
        let (header, body) = decode_header(&[0x05, 0x00, 0x05, 0x00, 0xAA, 0xBB]).unwrap();
        assert_eq!(header.order_length, 5);
        assert_eq!(body, &[0xAAu8]);
    }

    #[test]
    fn item_count_overflow_is_truncated() {
        let err = ensure_items(&[0u8; 4], usize::MAX, 8).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }
}
