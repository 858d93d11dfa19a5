use std::{fmt, mem};

use crate::encoding::{EStrRef, Encoding};

/// Owned, encoding-tagged byte string. Literal buffers accumulate decoded
/// content in one of these and hand it to the emitted token on flush.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct EString {
    bytes: Vec<u8>,
    encoding: Encoding,
}

impl EString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoding(encoding: Encoding) -> Self {
        Self {
            bytes: Vec::new(),
            encoding,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>, encoding: Encoding) -> Self {
        Self { bytes, encoding }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn as_estr(&self) -> EStrRef<'_> {
        EStrRef::from_bytes(&self.bytes, self.encoding)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Moves the content out, leaving an empty string of the same encoding.
    pub fn take(&mut self) -> EString {
        EString {
            bytes: mem::take(&mut self.bytes),
            encoding: self.encoding,
        }
    }

    /// Appends a raw byte. A high byte makes a US-ASCII string binary.
    pub fn push_byte(&mut self, b: u8) {
        if b >= 0x80 && self.encoding == Encoding::US_ASCII {
            self.encoding = Encoding::ASCII_8BIT;
        }
        self.bytes.push(b);
    }

    /// Appends a codepoint. A non-ASCII codepoint turns the string into UTF-8.
    pub fn push_char(&mut self, ch: char) {
        if ch.is_ascii() {
            self.bytes.push(ch as u8);
            return;
        }
        if !self.encoding.is_unicode() {
            self.encoding = Encoding::UTF_8;
        }
        let mut buf = [0; 4];
        self.bytes
            .extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    }

    /// A non-ASCII codepoint cannot join a non-Unicode string that already
    /// holds raw high bytes.
    pub fn mixes_with(&self, ch: char) -> bool {
        !ch.is_ascii() && !self.encoding.is_unicode() && !self.bytes.is_ascii()
    }

    /// Appends bytes taken verbatim from a source of the same encoding.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn remove_prefix(&mut self, len: usize) {
        self.bytes.drain(..len.min(self.bytes.len()));
    }

    pub fn ends_with(&self, suffix: &[u8]) -> bool {
        self.bytes.ends_with(suffix)
    }
}

impl fmt::Debug for EString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <EStrRef<'_> as fmt::Debug>::fmt(&self.as_estr(), f)
    }
}

impl From<String> for EString {
    fn from(s: String) -> Self {
        Self {
            bytes: s.into_bytes(),
            encoding: Encoding::UTF_8,
        }
    }
}

impl From<&str> for EString {
    fn from(s: &str) -> Self {
        Self {
            bytes: s.as_bytes().to_vec(),
            encoding: Encoding::UTF_8,
        }
    }
}
