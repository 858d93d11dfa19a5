mod estr;
mod estring;

pub use estr::{CharIndices, EStrRef};
pub use estring::EString;

/// Source encodings the scanner understands. All of them are ASCII-compatible,
/// so delimiters and escape introducers can be matched bytewise.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Encoding {
    ASCII_8BIT,
    #[default]
    UTF_8,
    US_ASCII,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncNext {
    /// A well-formed character. `unicode` is `None` for bytes that have no
    /// Unicode interpretation in the encoding (high bytes of ASCII-8BIT).
    Valid { len: usize, unicode: Option<char> },
    Invalid { len: usize },
}

impl EncNext {
    pub fn len(&self) -> usize {
        match *self {
            EncNext::Valid { len, .. } | EncNext::Invalid { len } => len,
        }
    }

    pub fn unicode(&self) -> Option<char> {
        match *self {
            EncNext::Valid { unicode, .. } => unicode,
            EncNext::Invalid { .. } => None,
        }
    }
}

impl Encoding {
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::ASCII_8BIT => "ASCII-8BIT",
            Encoding::UTF_8 => "UTF-8",
            Encoding::US_ASCII => "US-ASCII",
        }
    }

    pub fn is_unicode(&self) -> bool {
        matches!(self, Encoding::UTF_8)
    }

    /// Decodes the character at the start of `bytes`, which must be non-empty.
    pub fn next_char(&self, bytes: &[u8]) -> EncNext {
        match self {
            Encoding::UTF_8 => next_utf8(bytes),
            Encoding::US_ASCII => match bytes[0] {
                b @ 0x00..0x80 => valid(1, b as u32),
                _ => INVALID,
            },
            Encoding::ASCII_8BIT => match bytes[0] {
                b @ 0x00..0x80 => valid(1, b as u32),
                _ => EncNext::Valid {
                    len: 1,
                    unicode: None,
                },
            },
        }
    }
}

fn next_utf8(bytes: &[u8]) -> EncNext {
    let has_cont = |len: usize| len <= bytes.len() && bytes[1..len].iter().all(|&b| is_cont(b));
    let b0 = bytes[0];
    match b0 {
        0x00..0x80 => valid(1, b0 as u32),
        0xC0..0xE0 => {
            if !has_cont(2) {
                return INVALID;
            }
            let unicode = ((b0 & 0x1F) as u32) << 6 | (bytes[1] & 0x3F) as u32;
            if unicode < 0x80 {
                return INVALID;
            }
            valid(2, unicode)
        }
        0xE0..0xF0 => {
            if !has_cont(3) {
                return INVALID;
            }
            let unicode = ((b0 & 0x0F) as u32) << 12
                | ((bytes[1] & 0x3F) as u32) << 6
                | (bytes[2] & 0x3F) as u32;
            if unicode < 0x800 {
                return INVALID;
            }
            valid(3, unicode)
        }
        0xF0..0xF8 => {
            if !has_cont(4) {
                return INVALID;
            }
            let unicode = ((b0 & 0x07) as u32) << 18
                | ((bytes[1] & 0x3F) as u32) << 12
                | ((bytes[2] & 0x3F) as u32) << 6
                | (bytes[3] & 0x3F) as u32;
            if unicode < 0x10000 {
                return INVALID;
            }
            valid(4, unicode)
        }
        _ => INVALID,
    }
}

fn is_cont(b: u8) -> bool {
    b & 0xC0 == 0x80
}

const INVALID: EncNext = EncNext::Invalid { len: 1 };

// Surrogates and out-of-range values fail `char::from_u32` and count as invalid.
fn valid(len: usize, unicode: u32) -> EncNext {
    match char::from_u32(unicode) {
        Some(ch) => EncNext::Valid {
            len,
            unicode: Some(ch),
        },
        None => INVALID,
    }
}
