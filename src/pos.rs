use std::fmt;
use std::ops::{BitOr, BitOrAssign, Range};

/// Byte range into the source unit being scanned.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeRange {
    pub start: usize,
    pub end: usize,
}
impl CodeRange {
    pub fn new(start: usize, end: usize) -> Self {
        CodeRange { start, end }
    }
    pub fn empty_at(pos: usize) -> Self {
        CodeRange {
            start: pos,
            end: pos,
        }
    }
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
    pub fn is_dummy(&self) -> bool {
        self.start > self.end
    }
}
impl fmt::Debug for CodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == DUMMY_RANGE {
            write!(f, "DUMMY_RANGE")
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}
impl From<Range<usize>> for CodeRange {
    fn from(range: Range<usize>) -> Self {
        CodeRange {
            start: range.start,
            end: range.end,
        }
    }
}
impl From<CodeRange> for Range<usize> {
    fn from(range: CodeRange) -> Self {
        range.start..range.end
    }
}
pub const DUMMY_RANGE: CodeRange = CodeRange { start: 1, end: 0 };

impl BitOr for CodeRange {
    type Output = CodeRange;
    fn bitor(self, rhs: Self) -> Self::Output {
        if rhs.is_dummy() {
            self
        } else if self.is_dummy() {
            rhs
        } else {
            CodeRange {
                start: self.start.min(rhs.start),
                end: self.end.max(rhs.end),
            }
        }
    }
}
impl BitOrAssign for CodeRange {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// Range of the `idx`-th occurrence of `sub_text` in `all_text`. Used to
/// write expected positions in tests.
pub fn pos_in<T, U>(all_text: T, sub_text: U, idx: usize) -> CodeRange
where
    T: AsRef<[u8]>,
    U: AsRef<[u8]>,
{
    let (all_text, sub_text) = (all_text.as_ref(), sub_text.as_ref());
    if sub_text.is_empty() {
        return DUMMY_RANGE;
    }
    all_text
        .windows(sub_text.len())
        .enumerate()
        .filter(|(_, window)| *window == sub_text)
        .nth(idx)
        .map_or(DUMMY_RANGE, |(i, _)| CodeRange::new(i, i + sub_text.len()))
}
