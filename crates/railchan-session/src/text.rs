use railchan_pdu::UnicodeString;

/// Conversion between local text and the wire's wide-character bytes.
pub trait TextCodec: Send + Sync {
    /// Encode local text for a wire string field.
    fn to_wire(&self, text: &str) -> Vec<u8>;

    /// Decode a wire string field into local text.
    fn from_wire(&self, bytes: &[u8]) -> String;
}

/// UTF-16LE codec.
///
/// `to_wire` appends a NUL terminator unit; `from_wire` drops trailing NULs
/// and replaces invalid sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf16Codec;

impl TextCodec for Utf16Codec {
    fn to_wire(&self, text: &str) -> Vec<u8> {
        let mut bytes = UnicodeString::from_utf16(text).into_bytes();
        bytes.extend_from_slice(&[0, 0]);
        bytes
    }

    fn from_wire(&self, bytes: &[u8]) -> String {
        UnicodeString::new(bytes).to_string_lossy()
    }
}
