mod decimal;

use num_bigint::BigInt;
use num_traits::Num;
use ordered_float::NotNan;

pub use decimal::{Decimal, ParseDecimalError};

use crate::{
    config::SyntaxVersion,
    diagnostic::{Diagnostic, DiagnosticKind},
    pos::CodeRange,
    token::TokenKind,
};

/// Classified numeric literal, as carried by `Integer`/`Float`/`Rational`/
/// `Imaginary` tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumericLiteral {
    pub base: u32,
    /// Digits without base prefix, underscores or suffix. Floats keep their
    /// `.` and exponent: `1.5e-3`.
    pub digits: String,
    pub float: bool,
    pub rational: bool,
    pub imaginary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NumericValue {
    Integer(BigInt),
    Float(NotNan<f64>),
    Rational(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumericToken {
    pub value: NumericValue,
    pub imaginary: bool,
}

impl NumericLiteral {
    pub fn token_kind(&self) -> TokenKind {
        if self.imaginary {
            TokenKind::Imaginary
        } else if self.rational {
            TokenKind::Rational
        } else if self.float {
            TokenKind::Float
        } else {
            TokenKind::Integer
        }
    }

    /// Evaluates the literal. `None` only if the digits do not parse, which
    /// the classifier never produces.
    pub fn evaluate(&self) -> Option<NumericToken> {
        let value = if self.float {
            if self.rational {
                NumericValue::Rational(self.digits.parse().ok()?)
            } else {
                NumericValue::Float(NotNan::new(self.digits.parse::<f64>().ok()?).ok()?)
            }
        } else {
            let int = BigInt::from_str_radix(&self.digits, self.base).ok()?;
            if self.rational {
                NumericValue::Rational(Decimal::from(int))
            } else {
                NumericValue::Integer(int)
            }
        };
        Some(NumericToken {
            value,
            imaginary: self.imaginary,
        })
    }
}

/// Classifies the numeric run `text`, which starts at source offset `start`.
///
/// Returns the literal and the length of the recognized portion. Problems are
/// pushed to `diag` and a best-effort literal is still produced.
pub(crate) fn classify(
    text: &[u8],
    start: usize,
    version: SyntaxVersion,
    diag: &mut Vec<Diagnostic>,
) -> (NumericLiteral, usize) {
    let at = |i: usize| text.get(i).copied().unwrap_or(0);
    let mut scanner = DigitScanner {
        text,
        start,
        digits: String::new(),
        diag,
    };

    let (mut base, prefix_len, prefixed) = match (at(0), at(1)) {
        (b'0', b'x' | b'X') => (16, 2, true),
        (b'0', b'b' | b'B') => (2, 2, true),
        (b'0', b'o' | b'O') => (8, 2, true),
        (b'0', b'd' | b'D') => (10, 2, true),
        // Legacy octal keeps its leading zero as a digit.
        (b'0', b'_' | b'0'..=b'9') => (8, 0, false),
        _ => (10, 0, false),
    };

    let mut i = scanner.scan_digits(prefix_len, base);
    if scanner.digits.is_empty() {
        if prefixed && base != 8 {
            scanner.diag.push(Diagnostic::error(
                DiagnosticKind::EmptyNumeric,
                CodeRange::new(start, start + i),
            ));
        }
        scanner.digits.push('0');
    }
    if base == 8 {
        if let Some(bad) = scanner.digits.bytes().position(|b| b == b'8' || b == b'9') {
            let bad_pos = start + prefix_len + bad;
            scanner.diag.push(Diagnostic::error(
                DiagnosticKind::InvalidOctal,
                CodeRange::new(bad_pos, bad_pos + 1),
            ));
            base = 10;
        }
    }

    let mut float = false;
    let mut exponent = false;
    if base == 10 && !prefixed {
        if at(i) == b'.' && at(i + 1).is_ascii_digit() {
            float = true;
            scanner.digits.push('.');
            i = scanner.scan_digits(i + 1, 10);
        }
        let sign_len = usize::from(matches!(at(i + 1), b'+' | b'-'));
        if matches!(at(i), b'e' | b'E') && at(i + 1 + sign_len).is_ascii_digit() {
            float = true;
            exponent = true;
            scanner.digits.push('e');
            if sign_len == 1 {
                scanner.digits.push(at(i + 1) as char);
            }
            i = scanner.scan_digits(i + 1 + sign_len, 10);
        }
    }

    let mut rational = false;
    let mut imaginary = false;
    if version.has_numeric_suffixes() {
        if at(i) == b'r' && !exponent {
            rational = true;
            i += 1;
        }
        if at(i) == b'i' {
            imaginary = true;
            i += 1;
        }
    }

    if i < text.len() {
        scanner.diag.push(
            Diagnostic::error(
                DiagnosticKind::TrailingInNumber,
                CodeRange::new(start + i, start + i + 1),
            )
            .with_arg("character", String::from_utf8_lossy(&text[i..i + 1])),
        );
    }

    let literal = NumericLiteral {
        base,
        digits: scanner.digits,
        float,
        rational,
        imaginary,
    };
    (literal, i)
}

struct DigitScanner<'t, 'd> {
    text: &'t [u8],
    start: usize,
    digits: String,
    diag: &'d mut Vec<Diagnostic>,
}

impl DigitScanner<'_, '_> {
    /// Consumes digits and `_` separators from `i`, returning the end. Octal
    /// runs take `8`/`9` so that they can be diagnosed as a whole.
    fn scan_digits(&mut self, mut i: usize, base: u32) -> usize {
        let run_start = i;
        let mut last_underscore = None;
        while let Some(&b) = self.text.get(i) {
            if b == b'_' {
                if i == run_start || last_underscore == Some(i - 1) {
                    self.trailing_underscore(i);
                }
                last_underscore = Some(i);
            } else if is_digit_for(b, base) {
                self.digits.push(b as char);
            } else {
                break;
            }
            i += 1;
        }
        if i > run_start && last_underscore == Some(i - 1) {
            self.trailing_underscore(i - 1);
        }
        i
    }

    fn trailing_underscore(&mut self, i: usize) {
        let pos = self.start + i;
        self.diag.push(
            Diagnostic::error(DiagnosticKind::TrailingInNumber, CodeRange::new(pos, pos + 1))
                .with_arg("character", "_"),
        );
    }
}

fn is_digit_for(b: u8, base: u32) -> bool {
    match base {
        2 => matches!(b, b'0' | b'1'),
        8 | 10 => b.is_ascii_digit(),
        16 => b.is_ascii_hexdigit(),
        _ => false,
    }
}
