//! Sub-structures shared by several PDUs and window orders.

use bytes::{BufMut, BytesMut};
use serde::{Serialize, Serializer};

use crate::codec::{ensure, len_u16, read_bytes, read_u16, read_u8};
use crate::error::{DecodeError, EncodeError};

/// Length-prefixed wide string. The bytes are opaque to the codec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnicodeString {
    bytes: Vec<u8>,
}

impl UnicodeString {
    /// Wrap bytes already converted to the wire encoding.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// UTF-16LE encoding of `text`, without a terminator.
    pub fn from_utf16(text: &str) -> Self {
        let bytes = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
        Self { bytes }
    }

    /// The raw wire bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume into the raw wire bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Byte length, excluding the length prefix.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Interpret the bytes as UTF-16LE, dropping trailing NULs.
    pub fn to_string_lossy(&self) -> String {
        let units: Vec<u16> = self
            .bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let end = units
            .iter()
            .rposition(|&unit| unit != 0)
            .map_or(0, |last| last + 1);
        String::from_utf16_lossy(&units[..end])
    }

    /// Size on the wire including the u16 length prefix.
    pub fn encoded_len(&self) -> usize {
        2 + self.bytes.len()
    }

    pub(crate) fn encode(&self, field: &'static str, dst: &mut BytesMut) -> Result<(), EncodeError> {
        dst.put_u16_le(len_u16(field, self.bytes.len())?);
        dst.put_slice(&self.bytes);
        Ok(())
    }

    pub(crate) fn decode(src: &mut &[u8]) -> Result<Self, DecodeError> {
        let len = read_u16(src)?;
        Ok(Self {
            bytes: read_bytes(src, usize::from(len))?,
        })
    }
}

impl Serialize for UnicodeString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

/// Rectangle with 16-bit edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rect16 {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
}

impl Rect16 {
    /// Wire size in bytes.
    pub const SIZE: usize = 8;

    pub fn new(left: u16, top: u16, right: u16, bottom: u16) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub(crate) fn encode(&self, dst: &mut BytesMut) {
        dst.put_u16_le(self.left);
        dst.put_u16_le(self.top);
        dst.put_u16_le(self.right);
        dst.put_u16_le(self.bottom);
    }

    pub(crate) fn decode(src: &mut &[u8]) -> Result<Self, DecodeError> {
        ensure(src, Self::SIZE)?;
        Ok(Self {
            left: read_u16(src)?,
            top: read_u16(src)?,
            right: read_u16(src)?,
            bottom: read_u16(src)?,
        })
    }
}

/// Reference to a previously transmitted icon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CachedIconInfo {
    pub cache_id: u8,
    pub cache_entry_id: u16,
}

impl CachedIconInfo {
    /// Wire size: CacheEntry (2) + CacheId (1).
    pub const SIZE: usize = 3;

    pub(crate) fn encode(&self, dst: &mut BytesMut) {
        dst.put_u16_le(self.cache_entry_id);
        dst.put_u8(self.cache_id);
    }

    pub(crate) fn decode(src: &mut &[u8]) -> Result<Self, DecodeError> {
        let cache_entry_id = read_u16(src)?;
        let cache_id = read_u8(src)?;
        Ok(Self {
            cache_id,
            cache_entry_id,
        })
    }
}

/// Icon bitmap together with the cache slot it should be stored in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IconInfo {
    pub cache_info: CachedIconInfo,
    pub bpp: u8,
    pub width: u16,
    pub height: u16,
    /// Present exactly when `bpp` is 1, 4 or 8.
    pub color_table: Option<Vec<u8>>,
    pub bits_mask: Vec<u8>,
    pub bits_color: Vec<u8>,
}

impl IconInfo {
    /// Returns true if icons of this depth carry a color table.
    pub fn has_color_table(bpp: u8) -> bool {
        matches!(bpp, 1 | 4 | 8)
    }

    /// Size on the wire.
    pub fn encoded_len(&self) -> usize {
        let color_table = if Self::has_color_table(self.bpp) {
            2 + self.color_table.as_ref().map_or(0, Vec::len)
        } else {
            0
        };
        CachedIconInfo::SIZE
            + 1
            + 2
            + 2
            + color_table
            + 2
            + 2
            + self.bits_mask.len()
            + self.bits_color.len()
    }

    pub(crate) fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        let palettized = Self::has_color_table(self.bpp);
        if !palettized && self.color_table.is_some() {
            return Err(EncodeError::Inconsistent(
                "color table supplied for an icon depth without one",
            ));
        }
        let color_table: &[u8] = self.color_table.as_deref().unwrap_or_default();

        self.cache_info.encode(dst);
        dst.put_u8(self.bpp);
        dst.put_u16_le(self.width);
        dst.put_u16_le(self.height);
        if palettized {
            dst.put_u16_le(len_u16("CbColorTable", color_table.len())?);
        }
        dst.put_u16_le(len_u16("CbBitsMask", self.bits_mask.len())?);
        dst.put_u16_le(len_u16("CbBitsColor", self.bits_color.len())?);
        dst.put_slice(&self.bits_mask);
        dst.put_slice(color_table);
        dst.put_slice(&self.bits_color);
        Ok(())
    }

    pub(crate) fn decode(src: &mut &[u8]) -> Result<Self, DecodeError> {
        let cache_info = CachedIconInfo::decode(src)?;
        let bpp = read_u8(src)?;
        let width = read_u16(src)?;
        let height = read_u16(src)?;

        let color_table_len = if Self::has_color_table(bpp) {
            Some(read_u16(src)?)
        } else {
            None
        };
        let bits_mask_len = read_u16(src)?;
        let bits_color_len = read_u16(src)?;

        let bits_mask = read_bytes(src, usize::from(bits_mask_len))?;
        let color_table = match color_table_len {
            Some(len) => Some(read_bytes(src, usize::from(len))?),
            None => None,
        };
        let bits_color = read_bytes(src, usize::from(bits_color_len))?;

        Ok(Self {
            cache_info,
            bpp,
            width,
            height,
            color_table,
            bits_mask,
            bits_color,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_icon(icon: &IconInfo) -> BytesMut {
        let mut dst = BytesMut::new();
        icon.encode(&mut dst).unwrap();
        assert_eq!(dst.len(), icon.encoded_len());
        dst
    }

    #[test]
    fn unicode_string_wire_layout() {
        let mut dst = BytesMut::new();
        UnicodeString::from_utf16("ab")
            .encode("test", &mut dst)
            .unwrap();
        assert_eq!(dst.as_ref(), &[4u8, 0, b'a', 0, b'b', 0]);
    }

    #[test]
    fn unicode_string_lossy_text_drops_trailing_nuls() {
        let s = UnicodeString::new(vec![b'h', 0, b'i', 0, 0, 0]);
        assert_eq!(s.to_string_lossy(), "hi");
        assert_eq!(UnicodeString::default().to_string_lossy(), "");
    }

    #[test]
    fn unicode_string_declared_length_past_end() {
        let mut src: &[u8] = &[10, 0, 1, 2];
        let err = UnicodeString::decode(&mut src).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                needed: 10,
                remaining: 2
            }
        );
    }

    #[test]
    fn cached_icon_entry_precedes_id() {
        let mut dst = BytesMut::new();
        CachedIconInfo {
            cache_id: 0x01,
            cache_entry_id: 0x0302,
        }
        .encode(&mut dst);
        assert_eq!(dst.as_ref(), &[0x02u8, 0x03, 0x01]);
    }

    #[test]
    fn icon_without_color_table_skips_field() {
        let icon = IconInfo {
            cache_info: CachedIconInfo {
                cache_id: 1,
                cache_entry_id: 4,
            },
            bpp: 24,
            width: 2,
            height: 2,
            color_table: None,
            bits_mask: vec![0xFF; 4],
            bits_color: vec![0x11; 12],
        };
        let encoded = encode_icon(&icon);
        // cache(3) bpp(1) w(2) h(2) cbMask(2) cbColor(2) + data
        assert_eq!(encoded.len(), 12 + 4 + 12);
        assert_eq!(&encoded[8..10], &[4u8, 0]);

        let mut src: &[u8] = &encoded;
        assert_eq!(IconInfo::decode(&mut src).unwrap(), icon);
        assert!(src.is_empty());
    }

    #[test]
    fn palettized_icon_reads_color_table() {
        let icon = IconInfo {
            bpp: 8,
            width: 1,
            height: 1,
            color_table: Some(vec![0xAB; 6]),
            bits_mask: vec![0x01],
            bits_color: vec![0x02],
            ..Default::default()
        };
        let encoded = encode_icon(&icon);
        assert_eq!(&encoded[8..10], &[6u8, 0]);

        let mut src: &[u8] = &encoded;
        assert_eq!(IconInfo::decode(&mut src).unwrap(), icon);

        // Without the CbColorTable field the palettized layout is short.
        let mut short: &[u8] = &encoded[..10];
        assert!(matches!(
            IconInfo::decode(&mut short),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn zero_length_bitmaps() {
        let icon = IconInfo {
            bpp: 32,
            ..Default::default()
        };
        let encoded = encode_icon(&icon);
        let mut src: &[u8] = &encoded;
        assert_eq!(IconInfo::decode(&mut src).unwrap(), icon);
    }

    #[test]
    fn color_table_for_true_color_is_rejected() {
        let icon = IconInfo {
            bpp: 24,
            color_table: Some(vec![0]),
            ..Default::default()
        };
        let err = icon.encode(&mut BytesMut::new()).unwrap_err();
        assert!(matches!(err, EncodeError::Inconsistent(_)));
    }

    #[test]
    fn icon_prefixes_are_truncated() {
        let icon = IconInfo {
            bpp: 4,
            color_table: Some(vec![1, 2]),
            bits_mask: vec![3],
            bits_color: vec![4, 5],
            ..Default::default()
        };
        let encoded = encode_icon(&icon);
        for cut in 0..encoded.len() {
            let mut src: &[u8] = &encoded[..cut];
            assert!(
                matches!(IconInfo::decode(&mut src), Err(DecodeError::Truncated { .. })),
                "prefix of {cut} bytes"
            );
        }
    }
}
