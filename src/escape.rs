use crate::{
    config::SyntaxVersion,
    diagnostic::{Diagnostic, DiagnosticKind},
    encoding::EStrRef,
    pos::CodeRange,
};

/// How a literal treats backslash sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscapeMode {
    /// `<<'EOS'`: backslashes have no meaning.
    Verbatim,
    /// `'...'` and friends: only `\\` and escaped delimiters.
    Quoted,
    /// `"..."` and friends: the full escape table.
    Interpolated,
    /// Regexps: validated like `Interpolated`, kept as written.
    Regexp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscapeValue {
    Char(char),
    /// `\u{X Y Z}`
    Chars(Vec<char>),
    /// A raw byte from `\xNN`, `\nnn` or `\M-x`.
    Byte(u8),
    /// The source text of the escape, backslash included.
    Verbatim,
    /// Line continuation, or a malformed escape with no usable value.
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escape {
    /// From the backslash to the end of the sequence.
    pub range: CodeRange,
    pub value: EscapeValue,
}

#[derive(Debug, Clone, Copy)]
pub struct EscapeContext {
    pub mode: EscapeMode,
    pub start_delimiter: char,
    pub end_delimiter: char,
    /// Word lists keep escaped whitespace as element content.
    pub words: bool,
    pub version: SyntaxVersion,
    pub strict: bool,
}

/// Decodes the escape whose backslash is at `pos`.
pub fn decode_escape(
    src: EStrRef<'_>,
    pos: usize,
    ctx: &EscapeContext,
    diag: &mut Vec<Diagnostic>,
) -> Escape {
    let body = pos + 1;
    let Some(next) = src.char_at(body) else {
        diag.push(Diagnostic::error(
            DiagnosticKind::IncompleteEscape,
            CodeRange::new(pos, body.min(src.len())),
        ));
        return Escape {
            range: CodeRange::new(pos, body.min(src.len())),
            value: EscapeValue::Nothing,
        };
    };
    let simple = CodeRange::new(pos, body + next.len());
    let ch = next.unicode();
    let escaped_space = ctx.words && ch.is_some_and(is_word_space);

    match ctx.mode {
        EscapeMode::Verbatim => Escape {
            range: simple,
            value: EscapeValue::Verbatim,
        },
        EscapeMode::Quoted => {
            let value = match ch {
                Some('\\') => EscapeValue::Char('\\'),
                Some(c) if c == ctx.start_delimiter || c == ctx.end_delimiter => {
                    EscapeValue::Char(c)
                }
                Some(c) if escaped_space => EscapeValue::Char(c),
                _ => EscapeValue::Verbatim,
            };
            Escape {
                range: simple,
                value,
            }
        }
        EscapeMode::Interpolated => match ch {
            Some('\n') => Escape {
                range: simple,
                value: if ctx.words {
                    EscapeValue::Char('\n')
                } else {
                    EscapeValue::Nothing
                },
            },
            Some(c) if escaped_space => Escape {
                range: simple,
                value: EscapeValue::Char(c),
            },
            _ => {
                let mut decoder = Decoder {
                    src,
                    ctx,
                    escape_start: pos,
                    modifiers: 0,
                    diag,
                };
                let (value, end) = decoder.decode(body);
                Escape {
                    range: CodeRange::new(pos, end),
                    value,
                }
            }
        },
        EscapeMode::Regexp => {
            if ch == Some('\n') {
                return Escape {
                    range: simple,
                    value: EscapeValue::Nothing,
                };
            }
            let mut decoder = Decoder {
                src,
                ctx,
                escape_start: pos,
                modifiers: 0,
                diag,
            };
            let (_, end) = decoder.decode(body);
            Escape {
                range: CodeRange::new(pos, end),
                value: EscapeValue::Verbatim,
            }
        }
    }
}

fn is_word_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

const CONTROL: u8 = 1;
const META: u8 = 2;

struct Decoder<'s, 'c, 'd> {
    src: EStrRef<'s>,
    ctx: &'c EscapeContext,
    escape_start: usize,
    /// `CONTROL`/`META` bits already applied by enclosing sequences.
    modifiers: u8,
    diag: &'d mut Vec<Diagnostic>,
}

impl Decoder<'_, '_, '_> {
    fn regexp(&self) -> bool {
        self.ctx.mode == EscapeMode::Regexp
    }

    fn error(&mut self, kind: DiagnosticKind, start: usize, end: usize) {
        self.diag
            .push(Diagnostic::error(kind, CodeRange::new(start, end)));
    }

    /// `pos` points just past a backslash. Returns the value and the end of
    /// the sequence.
    fn decode(&mut self, pos: usize) -> (EscapeValue, usize) {
        let Some(next) = self.src.char_at(pos) else {
            self.error(DiagnosticKind::IncompleteEscape, pos - 1, pos);
            return (EscapeValue::Nothing, pos);
        };
        let end = pos + next.len();
        let simple = |c: u8| (EscapeValue::Char(c as char), end);
        match self.src.byte_at(pos) {
            b'a' => simple(0x07),
            b'b' => simple(0x08),
            b'e' => simple(0x1b),
            b'f' => simple(0x0c),
            b'n' => simple(b'\n'),
            b'r' => simple(b'\r'),
            b's' => simple(b' '),
            b't' => simple(b'\t'),
            b'v' => simple(0x0b),
            b'0'..=b'7' => self.decode_octal(pos),
            b'8' | b'9' => {
                if self.ctx.strict && !self.regexp() {
                    self.error(DiagnosticKind::InvalidOctal, pos - 1, end);
                }
                simple(self.src.byte_at(pos))
            }
            b'x' => self.decode_hex(pos + 1),
            b'u' if self.ctx.version.has_unicode_escapes() => self.decode_unicode(pos + 1),
            b'c' => self.decode_control(pos + 1),
            b'C' | b'M' if self.src.byte_at(pos + 1) != b'-' => {
                self.error(DiagnosticKind::InvalidEscape, self.escape_start, end);
                (EscapeValue::Nothing, end)
            }
            b'C' => self.decode_control(pos + 2),
            b'M' => self.decode_meta(pos + 2),
            b => {
                if self.ctx.strict && !self.regexp() && b.is_ascii_alphabetic() {
                    self.error(DiagnosticKind::InvalidEscape, pos - 1, end);
                }
                match next.unicode() {
                    Some(c) => (EscapeValue::Char(c), end),
                    None => (EscapeValue::Verbatim, end),
                }
            }
        }
    }

    fn decode_octal(&mut self, pos: usize) -> (EscapeValue, usize) {
        let mut value = 0u32;
        let mut end = pos;
        while end < pos + 3 && matches!(self.src.byte_at(end), b'0'..=b'7') {
            value = value * 8 + (self.src.byte_at(end) - b'0') as u32;
            end += 1;
        }
        (byte_value((value & 0xff) as u8), end)
    }

    fn decode_hex(&mut self, pos: usize) -> (EscapeValue, usize) {
        let mut value = 0u32;
        let mut end = pos;
        while end < pos + 2 {
            let Some(digit) = (self.src.byte_at(end) as char).to_digit(16) else {
                break;
            };
            value = value * 16 + digit;
            end += 1;
        }
        if end == pos {
            self.error(DiagnosticKind::InvalidHexEscape, self.escape_start, pos);
            return (EscapeValue::Nothing, pos);
        }
        (byte_value(value as u8), end)
    }

    fn decode_unicode(&mut self, pos: usize) -> (EscapeValue, usize) {
        if self.src.byte_at(pos) != b'{' {
            let digits = self.hex_run(pos, 4);
            let end = pos + digits;
            if digits < 4 {
                self.error(DiagnosticKind::InvalidUnicodeEscape, self.escape_start, end);
                return (EscapeValue::Nothing, end);
            }
            return match self.codepoint(pos, end) {
                Some(c) => (EscapeValue::Char(c), end),
                None => (EscapeValue::Nothing, end),
            };
        }

        let mut chars = Vec::new();
        let mut p = pos + 1;
        loop {
            while matches!(self.src.byte_at(p), b' ' | b'\t') {
                p += 1;
            }
            if self.src.byte_at(p) == b'}' && p < self.src.len() {
                p += 1;
                break;
            }
            let digits = self.hex_run(p, usize::MAX);
            if digits == 0 {
                self.error(DiagnosticKind::UnterminatedUnicode, self.escape_start, p);
                break;
            }
            if let Some(c) = self.codepoint(p, p + digits) {
                chars.push(c);
            }
            p += digits;
        }
        let value = match chars.len() {
            0 => EscapeValue::Nothing,
            1 => EscapeValue::Char(chars[0]),
            _ => EscapeValue::Chars(chars),
        };
        (value, p)
    }

    fn hex_run(&self, pos: usize, max: usize) -> usize {
        let mut len = 0;
        while len < max && pos + len < self.src.len() && self.src.byte_at(pos + len).is_ascii_hexdigit() {
            len += 1;
        }
        len
    }

    /// Validates the hex digits in `start..end` as a codepoint.
    fn codepoint(&mut self, start: usize, end: usize) -> Option<char> {
        let digits = &self.src.as_bytes()[start..end];
        let value = digits
            .iter()
            .skip_while(|&&b| b == b'0')
            .try_fold(0u32, |acc, &b| {
                let digit = (b as char).to_digit(16)?;
                acc.checked_mul(16)?.checked_add(digit)
            });
        match value {
            Some(value) if value <= 0x10ffff => match char::from_u32(value) {
                Some(c) => Some(c),
                None => {
                    self.error(DiagnosticKind::InvalidUnicodeEscape, start, end);
                    None
                }
            },
            _ => {
                self.error(DiagnosticKind::UnicodePointTooLarge, start, end);
                None
            }
        }
    }

    fn decode_control(&mut self, pos: usize) -> (EscapeValue, usize) {
        self.apply_modifier(CONTROL, pos);
        match self.target(pos) {
            Some((b'?', end)) => (EscapeValue::Char('\x7f'), end),
            Some((b, end)) => (byte_value(b & 0x9f), end),
            None => (EscapeValue::Nothing, pos.min(self.src.len())),
        }
    }

    fn decode_meta(&mut self, pos: usize) -> (EscapeValue, usize) {
        self.apply_modifier(META, pos);
        match self.target(pos) {
            Some((b, end)) => (byte_value(b | 0x80), end),
            None => (EscapeValue::Nothing, pos.min(self.src.len())),
        }
    }

    /// `\C-\C-x`, `\c\C-x` and `\M-\M-x` apply a modifier twice.
    fn apply_modifier(&mut self, modifier: u8, pos: usize) {
        if self.modifiers & modifier != 0 {
            self.error(
                DiagnosticKind::InvalidEscapeUse,
                self.escape_start,
                pos.min(self.src.len()),
            );
        }
        self.modifiers |= modifier;
    }

    /// The character a `\c`, `\C-` or `\M-` applies to, possibly itself an
    /// escape (`\M-\C-x`, `\C-\\`).
    fn target(&mut self, pos: usize) -> Option<(u8, usize)> {
        let b = self.src.byte_at(pos);
        if pos < self.src.len() && b == b'\\' && pos + 1 < self.src.len() {
            let (value, end) = self.decode(pos + 1);
            match value {
                EscapeValue::Char(c) if c.is_ascii() => return Some((c as u8, end)),
                EscapeValue::Byte(b) => return Some((b, end)),
                _ => {}
            }
        } else if pos < self.src.len() && b.is_ascii() && b != b'\\' {
            return Some((b, pos + 1));
        }
        self.error(
            DiagnosticKind::InvalidEscape,
            self.escape_start,
            (pos + 1).min(self.src.len()),
        );
        None
    }
}

fn byte_value(b: u8) -> EscapeValue {
    if b.is_ascii() {
        EscapeValue::Char(b as char)
    } else {
        EscapeValue::Byte(b)
    }
}
