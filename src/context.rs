use bit_vec::BitVec;

use crate::stack::Stack;

/// Nested boolean flags used by the driver to disambiguate `do` and
/// command arguments (`cond` and `cmdarg`).
///
/// Frames live in a growable bit vector, so nesting depth is bounded only by
/// memory. Popping past the bottom reads as `false`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextStack {
    bits: BitVec,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bit: bool) -> bool {
        self.bits.push(bit);
        bit
    }

    pub fn pop(&mut self) -> bool {
        self.bits.pop().unwrap_or(false)
    }

    /// Pops two frames and pushes their disjunction.
    pub fn lexpop(&mut self) -> bool {
        let top = self.pop();
        let below = self.pop();
        self.push(top || below)
    }

    pub fn active(&self) -> bool {
        self.bits.get(self.bits.len().wrapping_sub(1)).unwrap_or(false)
    }

    pub fn depth(&self) -> usize {
        self.bits.len()
    }

    pub fn clear(&mut self) {
        self.bits.truncate(0);
    }
}

const NO_NUMPARAMS: i32 = -1;

/// Highest numbered block parameter (`_1`..`_9`) seen in each open block.
///
/// A scope that declared ordinary parameters is marked so that `_1` is
/// rejected there.
#[derive(Debug, Clone, Default)]
pub struct NumparamStack {
    scopes: Stack<i32>,
}

impl NumparamStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.scopes.push(0);
    }

    pub fn pop(&mut self) -> i32 {
        self.scopes.pop_or_default()
    }

    pub fn top(&self) -> i32 {
        self.scopes.top().copied().unwrap_or(0)
    }

    pub fn has_numparams(&self) -> bool {
        self.top() > 0
    }

    pub fn can_have_numparams(&self) -> bool {
        self.top() >= 0
    }

    pub fn cant_have_numparams(&mut self) {
        if let Some(top) = self.scopes.top_mut() {
            *top = NO_NUMPARAMS;
        }
    }

    pub fn register(&mut self, numparam: i32) {
        if let Some(top) = self.scopes.top_mut() {
            if *top != NO_NUMPARAMS && numparam > *top {
                *top = numparam;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
