//! Tree node for slab-based storage.
//!
//! ## Design
//!
//! `TreeNode` wraps a `Security` with the red-black links. Links are slab
//! keys (`usize`), not references, so the tree can be rotated and cloned
//! without any shared mutable state.
//!
//! ## Slab Integration
//!
//! Per official slab docs (https://docs.rs/slab/0.4.11):
//! - Keys are `usize` values returned by `slab.insert()`
//! - Keys may be reused after `slab.remove()`
//! - O(1) insert, remove, and lookup

use std::fmt;

use rust_decimal::Decimal;

use crate::types::Security;

/// Node color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Black,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => f.write_str("red"),
            Color::Black => f.write_str("black"),
        }
    }
}

/// Node stored in the tree's slab.
///
/// ```text
/// TreeNode {
///     security: Security
///     color:    Color
///     parent / left / right: Option<usize>   (slab keys)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Payload; `security.market_value` is the sort key
    pub security: Security,

    pub color: Color,

    /// None for the root
    pub parent: Option<usize>,
    pub left: Option<usize>,
    pub right: Option<usize>,
}

impl TreeNode {
    /// New unlinked node. Fresh nodes are red, as insertion expects.
    #[inline]
    pub fn new(security: Security) -> Self {
        Self {
            security,
            color: Color::Red,
            parent: None,
            left: None,
            right: None,
        }
    }

    #[inline]
    pub fn value(&self) -> Decimal {
        self.security.market_value
    }

    #[inline]
    pub fn is_red(&self) -> bool {
        self.color == Color::Red
    }

    #[inline]
    pub fn has_two_children(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    /// The only child, if the node has at most one
    #[inline]
    pub fn single_child(&self) -> Option<usize> {
        self.left.or(self.right)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
