//! Canonical token-span keys.
//!
//! Annotators list the tokens of a span in whatever order their tool emitted
//! them, so spans are compared as multisets.  A [`SpanKey`] is the sorted
//! multiset and can be hashed, which lets the consensus engine key its
//! candidate pool by span instead of scanning positions.

use std::fmt;

/// Sorted token multiset identifying one span.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanKey(Vec<usize>);

impl SpanKey {
    pub fn new(tokens: &[usize]) -> Self {
        let mut sorted = tokens.to_vec();
        sorted.sort_unstable();
        SpanKey(sorted)
    }

    pub fn tokens(&self) -> &[usize] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<&[usize]> for SpanKey {
    fn from(tokens: &[usize]) -> Self {
        SpanKey::new(tokens)
    }
}

impl From<&Vec<usize>> for SpanKey {
    fn from(tokens: &Vec<usize>) -> Self {
        SpanKey::new(tokens)
    }
}

impl fmt::Display for SpanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{token}")?;
        }
        write!(f, "]")
    }
}

/// Order-independent multiset equality of two token lists.
pub fn tokens_equal(a: &[usize], b: &[usize]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    SpanKey::new(a) == SpanKey::new(b)
}
