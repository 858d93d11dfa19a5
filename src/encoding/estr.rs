use std::{fmt, ops::Range};

use crate::encoding::{EString, EncNext, Encoding};

/// Equivalent to [`&'a str`][str] but with encoding information.
/// Additionally, it can contain invalid byte sequences.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EStrRef<'a> {
    bytes: &'a [u8],
    encoding: Encoding,
}

impl<'a> EStrRef<'a> {
    pub fn from_bytes(bytes: &'a [u8], encoding: Encoding) -> Self {
        Self { bytes, encoding }
    }

    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Byte at `pos`, or NUL past the end.
    pub fn byte_at(&self, pos: usize) -> u8 {
        self.bytes.get(pos).copied().unwrap_or(0)
    }

    /// Decodes the character starting at `pos`; `None` at the end of input.
    pub fn char_at(&self, pos: usize) -> Option<EncNext> {
        if pos >= self.bytes.len() {
            return None;
        }
        Some(self.encoding.next_char(&self.bytes[pos..]))
    }

    /// Subslice keeping the encoding. Out-of-range bounds are clamped.
    pub fn slice(&self, range: Range<usize>) -> EStrRef<'a> {
        let end = range.end.min(self.bytes.len());
        let start = range.start.min(end);
        EStrRef {
            bytes: &self.bytes[start..end],
            encoding: self.encoding,
        }
    }

    pub fn char_indices(&self) -> CharIndices<'a> {
        CharIndices {
            bytes: self.bytes,
            pos: 0,
            encoding: self.encoding,
        }
    }

    pub fn is_ascii(&self) -> bool {
        self.bytes.is_ascii()
    }

    pub fn to_estring(&self) -> EString {
        EString::from_bytes(self.bytes.to_vec(), self.encoding)
    }
}

impl fmt::Debug for EStrRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = String::new();
        for (range, next) in self.char_indices() {
            match next.unicode() {
                Some(ch) => text.extend(ch.escape_debug()),
                None => {
                    for b in &self.bytes[range] {
                        text.push_str(&format!("\\x{:02x}", b));
                    }
                }
            }
        }
        if self.encoding == Encoding::UTF_8 {
            write!(f, "\"{}\"", text)
        } else {
            write!(f, "EString(\"{}\", {:?})", text, self.encoding)
        }
    }
}

impl<'a> From<&'a str> for EStrRef<'a> {
    fn from(s: &'a str) -> Self {
        Self {
            bytes: s.as_bytes(),
            encoding: Encoding::UTF_8,
        }
    }
}

impl<'a> From<&'a EString> for EStrRef<'a> {
    fn from(s: &'a EString) -> Self {
        s.as_estr()
    }
}

#[derive(Debug, Clone)]
pub struct CharIndices<'a> {
    bytes: &'a [u8],
    pos: usize,
    encoding: Encoding,
}

impl Iterator for CharIndices<'_> {
    type Item = (Range<usize>, EncNext);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.bytes.len() {
            return None;
        }
        let start = self.pos;
        let next = self.encoding.next_char(&self.bytes[start..]);
        self.pos += next.len();
        Some((start..self.pos, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_debug() {
        assert_eq!(
            format!("{:?}", EStrRef::from_bytes(b"abc", Encoding::UTF_8)),
            "\"abc\""
        );
        assert_eq!(
            format!("{:?}", EStrRef::from_bytes(b"\xe3\x81", Encoding::UTF_8)),
            "\"\\xe3\\x81\""
        );
    }

    #[test]
    fn test_binary_debug() {
        assert_eq!(
            format!("{:?}", EStrRef::from_bytes(b"a\xff", Encoding::ASCII_8BIT)),
            "EString(\"a\\xff\", ASCII_8BIT)"
        );
    }

    #[test]
    fn test_byte_at_past_end() {
        let s = EStrRef::from("ab");
        assert_eq!(s.byte_at(1), b'b');
        assert_eq!(s.byte_at(2), 0);
        assert_eq!(s.char_at(2), None);
    }

    #[test]
    fn test_slice_clamps() {
        let s = EStrRef::from("hello");
        assert_eq!(s.slice(1..3).as_bytes(), b"el");
        assert_eq!(s.slice(4..10).as_bytes(), b"o");
    }
}
