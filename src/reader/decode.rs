//! Byte-order-mark detection and streaming decoders.
//!
//! The decoders turn a byte slice into code points one at a time, reporting
//! the byte offset of the first malformed sequence. UTF-8 decoding applies
//! the usual validity rules:
//!
//! | Bytes | First byte    | Continuation bytes | Code point range     |
//! |-------|---------------|-------------------|----------------------|
//! | 1     | `0xxxxxxx`    | -                 | U+0000 - U+007F      |
//! | 2     | `110xxxxx`    | `10xxxxxx`        | U+0080 - U+07FF      |
//! | 3     | `1110xxxx`    | `10xxxxxx` × 2    | U+0800 - U+FFFF      |
//! | 4     | `11110xxx`    | `10xxxxxx` × 3    | U+10000 - U+10FFFF   |
//!
//! Overlong forms, surrogates and code points above U+10FFFF are rejected.

use core::fmt;

/// Character encoding of a byte input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// UTF-8 (with or without BOM)
    Utf8,
    /// UTF-16 little endian
    Utf16Le,
    /// UTF-16 big endian
    Utf16Be,
    /// UTF-32 little endian
    Utf32Le,
    /// UTF-32 big endian
    Utf32Be,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Utf32Le => "UTF-32LE",
            Encoding::Utf32Be => "UTF-32BE",
        };
        f.write_str(name)
    }
}

/// Detect the encoding from a byte-order mark.
///
/// Returns the encoding and the length of the BOM to skip. Input without a
/// BOM is treated as UTF-8.
pub fn detect_encoding(bytes: &[u8]) -> (Encoding, usize) {
    match bytes {
        [0x00, 0x00, 0xFE, 0xFF, ..] => (Encoding::Utf32Be, 4),
        [0xFF, 0xFE, 0x00, 0x00, ..] => (Encoding::Utf32Le, 4),
        [0xEF, 0xBB, 0xBF, ..] => (Encoding::Utf8, 3),
        [0xFE, 0xFF, ..] => (Encoding::Utf16Be, 2),
        [0xFF, 0xFE, ..] => (Encoding::Utf16Le, 2),
        _ => (Encoding::Utf8, 0),
    }
}

/// The specific kind of decoding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// A byte in 0x80-0xBF (or 0xF8-0xFF) where a lead byte was expected.
    InvalidLeadByte,
    /// A non-continuation byte where a continuation byte was expected.
    InvalidContinuationByte,
    /// A code point encoded with more bytes than necessary.
    OverlongEncoding,
    /// A surrogate code point (U+D800-U+DFFF), or an unpaired UTF-16 surrogate.
    SurrogateCodepoint,
    /// A code point above U+10FFFF.
    OutOfRangeCodepoint,
    /// A multi-byte sequence cut off at the end of input.
    TruncatedSequence,
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLeadByte => write!(f, "invalid lead byte"),
            Self::InvalidContinuationByte => write!(f, "invalid continuation byte"),
            Self::OverlongEncoding => write!(f, "overlong encoding"),
            Self::SurrogateCodepoint => write!(f, "surrogate code point"),
            Self::OutOfRangeCodepoint => write!(f, "code point above U+10FFFF"),
            Self::TruncatedSequence => write!(f, "truncated sequence"),
        }
    }
}

/// A decoding failure at a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    /// Encoding being decoded
    pub encoding: Encoding,
    /// Byte offset of the malformed sequence
    pub offset: usize,
    /// What was wrong with it
    pub kind: DecodeErrorKind,
}

/// Streaming decoder over a byte slice.
pub struct ByteDecoder<'a> {
    bytes: &'a [u8],
    pos: usize,
    encoding: Encoding,
    failed: bool,
}

impl<'a> ByteDecoder<'a> {
    /// Create a decoder. `start` is the offset after any BOM.
    pub fn new(bytes: &'a [u8], encoding: Encoding, start: usize) -> Self {
        Self {
            bytes,
            pos: start,
            encoding,
            failed: false,
        }
    }

    #[inline]
    fn error(&mut self, offset: usize, kind: DecodeErrorKind) -> DecodeError {
        self.failed = true;
        DecodeError {
            encoding: self.encoding,
            offset,
            kind,
        }
    }

    fn next_utf8(&mut self) -> Result<char, DecodeError> {
        let start = self.pos;
        let lead = self.bytes[start];
        if lead < 0x80 {
            self.pos += 1;
            return Ok(lead as char);
        }

        let (len, min, initial) = match lead {
            0xC0..=0xDF => (2, 0x80, u32::from(lead & 0x1F)),
            0xE0..=0xEF => (3, 0x800, u32::from(lead & 0x0F)),
            0xF0..=0xF7 => (4, 0x10000, u32::from(lead & 0x07)),
            _ => return Err(self.error(start, DecodeErrorKind::InvalidLeadByte)),
        };

        let mut code = initial;
        for i in 1..len {
            let Some(&byte) = self.bytes.get(start + i) else {
                return Err(self.error(start, DecodeErrorKind::TruncatedSequence));
            };
            if byte & 0xC0 != 0x80 {
                return Err(self.error(start + i, DecodeErrorKind::InvalidContinuationByte));
            }
            code = (code << 6) | u32::from(byte & 0x3F);
        }

        if code < min {
            return Err(self.error(start, DecodeErrorKind::OverlongEncoding));
        }
        if (0xD800..=0xDFFF).contains(&code) {
            return Err(self.error(start, DecodeErrorKind::SurrogateCodepoint));
        }
        let Some(c) = char::from_u32(code) else {
            return Err(self.error(start, DecodeErrorKind::OutOfRangeCodepoint));
        };
        self.pos += len;
        Ok(c)
    }

    fn read_u16(&self, at: usize) -> Option<u16> {
        let pair = [*self.bytes.get(at)?, *self.bytes.get(at + 1)?];
        Some(match self.encoding {
            Encoding::Utf16Be => u16::from_be_bytes(pair),
            _ => u16::from_le_bytes(pair),
        })
    }

    fn next_utf16(&mut self) -> Result<char, DecodeError> {
        let start = self.pos;
        let Some(unit) = self.read_u16(start) else {
            return Err(self.error(start, DecodeErrorKind::TruncatedSequence));
        };
        if !(0xD800..=0xDFFF).contains(&unit) {
            self.pos += 2;
            return Ok(char::from_u32(u32::from(unit)).unwrap_or('\u{FFFD}'));
        }
        if unit >= 0xDC00 {
            return Err(self.error(start, DecodeErrorKind::SurrogateCodepoint));
        }
        let Some(low) = self.read_u16(start + 2) else {
            return Err(self.error(start, DecodeErrorKind::TruncatedSequence));
        };
        if !(0xDC00..=0xDFFF).contains(&low) {
            return Err(self.error(start, DecodeErrorKind::SurrogateCodepoint));
        }
        let code = 0x10000 + ((u32::from(unit) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
        self.pos += 4;
        char::from_u32(code).ok_or_else(|| self.error(start, DecodeErrorKind::OutOfRangeCodepoint))
    }

    fn next_utf32(&mut self) -> Result<char, DecodeError> {
        let start = self.pos;
        let Some(chunk) = self.bytes.get(start..start + 4) else {
            return Err(self.error(start, DecodeErrorKind::TruncatedSequence));
        };
        let quad = [chunk[0], chunk[1], chunk[2], chunk[3]];
        let code = match self.encoding {
            Encoding::Utf32Be => u32::from_be_bytes(quad),
            _ => u32::from_le_bytes(quad),
        };
        if (0xD800..=0xDFFF).contains(&code) {
            return Err(self.error(start, DecodeErrorKind::SurrogateCodepoint));
        }
        let Some(c) = char::from_u32(code) else {
            return Err(self.error(start, DecodeErrorKind::OutOfRangeCodepoint));
        };
        self.pos += 4;
        Ok(c)
    }
}

impl Iterator for ByteDecoder<'_> {
    type Item = Result<char, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.bytes.len() {
            return None;
        }
        Some(match self.encoding {
            Encoding::Utf8 => self.next_utf8(),
            Encoding::Utf16Le | Encoding::Utf16Be => self.next_utf16(),
            Encoding::Utf32Le | Encoding::Utf32Be => self.next_utf32(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<String, DecodeError> {
        let (encoding, bom) = detect_encoding(bytes);
        ByteDecoder::new(bytes, encoding, bom).collect()
    }

    #[test]
    fn test_detect_encoding() {
        assert_eq!(detect_encoding(b"abc"), (Encoding::Utf8, 0));
        assert_eq!(detect_encoding(b"\xEF\xBB\xBFabc"), (Encoding::Utf8, 3));
        assert_eq!(detect_encoding(b"\xFF\xFEa\x00"), (Encoding::Utf16Le, 2));
        assert_eq!(detect_encoding(b"\xFE\xFF\x00a"), (Encoding::Utf16Be, 2));
        assert_eq!(detect_encoding(b"\xFF\xFE\x00\x00"), (Encoding::Utf32Le, 4));
        assert_eq!(detect_encoding(b"\x00\x00\xFE\xFF"), (Encoding::Utf32Be, 4));
    }

    #[test]
    fn test_utf8_multibyte() {
        assert_eq!(decode("日本語: 🎉".as_bytes()).unwrap(), "日本語: 🎉");
    }

    #[test]
    fn test_utf8_errors() {
        assert_eq!(decode(&[0x80]).unwrap_err().kind, DecodeErrorKind::InvalidLeadByte);
        assert_eq!(decode(&[0xC2]).unwrap_err().kind, DecodeErrorKind::TruncatedSequence);
        assert_eq!(decode(&[0xC0, 0x81]).unwrap_err().kind, DecodeErrorKind::OverlongEncoding);
        assert_eq!(
            decode(&[0xED, 0xA0, 0x80]).unwrap_err().kind,
            DecodeErrorKind::SurrogateCodepoint
        );
        assert_eq!(
            decode(&[0xF4, 0x90, 0x80, 0x80]).unwrap_err().kind,
            DecodeErrorKind::OutOfRangeCodepoint
        );
        let err = decode(b"ab\xE2\x28\xA1").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::InvalidContinuationByte);
        assert_eq!(err.offset, 3);
    }

    #[test]
    fn test_utf16() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "a🎉".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode(&bytes).unwrap(), "a🎉");

        let mut be = vec![0xFE, 0xFF];
        for unit in "key: v".encode_utf16() {
            be.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode(&be).unwrap(), "key: v");
    }

    #[test]
    fn test_utf16_unpaired_surrogate() {
        let bytes = [0xFF, 0xFE, 0x00, 0xD8, 0x41, 0x00];
        assert_eq!(decode(&bytes).unwrap_err().kind, DecodeErrorKind::SurrogateCodepoint);
    }

    #[test]
    fn test_utf32() {
        let mut bytes = vec![0x00, 0x00, 0xFE, 0xFF];
        for c in "x: 1".chars() {
            bytes.extend_from_slice(&(c as u32).to_be_bytes());
        }
        assert_eq!(decode(&bytes).unwrap(), "x: 1");
    }

    #[test]
    fn test_decoder_stops_after_error() {
        let (encoding, bom) = detect_encoding(&[0x61, 0xFF, 0x62]);
        let mut decoder = ByteDecoder::new(&[0x61, 0xFF, 0x62], encoding, bom);
        assert_eq!(decoder.next(), Some(Ok('a')));
        assert!(matches!(decoder.next(), Some(Err(_))));
        assert_eq!(decoder.next(), None);
    }
}
