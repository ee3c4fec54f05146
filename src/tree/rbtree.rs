//! Red-black tree of securities keyed by market value.
//!
//! ## Architecture
//!
//! - **Slab**: every node lives in a `Slab<TreeNode>`; parent/child links are
//!   slab keys, so rotations only rewrite integers.
//! - **Ordering**: ascending market value. Equal values descend to the right
//!   on insert, so ties keep insertion order until a rotation moves them.
//! - **Ownership**: the tree owns every security linked into it. `remove`
//!   hands the security back by value; nothing else keeps a reference.
//!
//! `SecurityTree` is `Clone`. A clone is a fully independent pool: removals
//! from one are never visible in the other.
//!
//! ## Key stability
//!
//! Removing a node with two children moves the in-order predecessor's
//! security into the removed node's slot and frees the predecessor's slot.
//! Keys obtained before a `remove` must therefore be looked up again after
//! it.
//!
//! ## Example
//!
//! ```
//! use pledge_engine::tree::SecurityTree;
//! use pledge_engine::types::Security;
//! use rust_decimal::Decimal;
//!
//! let mut pool = SecurityTree::with_capacity(16);
//! for (ticket, value) in [(1, 100), (2, 250), (3, 400)] {
//!     pool.insert(Security::with_value(ticket, Decimal::from(value)));
//! }
//!
//! let hit = pool.range_search(Decimal::from(240), Decimal::from(360)).unwrap();
//! let taken = pool.remove(hit).unwrap();
//!
//! assert_eq!(taken.market_value, Decimal::from(250));
//! assert_eq!(pool.len(), 2);
//! assert!(pool.verify_invariants().is_ok());
//! ```

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use slab::Slab;

use crate::error::PledgeError;
use crate::tree::{Color, TreeNode};
use crate::types::{PoolEntry, Security};

/// Which child link of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Left,
    Right,
}

/// Pool of unassigned securities ordered by market value
#[derive(Debug, Clone, Default)]
pub struct SecurityTree {
    /// Node storage
    nodes: Slab<TreeNode>,

    /// Slab key of the root, None when empty
    root: Option<usize>,
}

impl SecurityTree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree with pre-allocated node capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Slab::with_capacity(capacity),
            root: None,
        }
    }

    // ========================================================================
    // Size and Access
    // ========================================================================

    /// Number of securities stored
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    #[inline]
    pub fn root(&self) -> Option<usize> {
        self.root
    }

    #[inline]
    pub fn node(&self, key: usize) -> Option<&TreeNode> {
        self.nodes.get(key)
    }

    #[inline]
    pub fn get(&self, key: usize) -> Option<&Security> {
        self.nodes.get(key).map(|node| &node.security)
    }

    #[inline]
    pub fn value_of(&self, key: usize) -> Option<Decimal> {
        self.nodes.get(key).map(TreeNode::value)
    }

    // ========================================================================
    // Insert
    // ========================================================================

    /// Insert a security and rebalance.
    ///
    /// Returns the slab key of the new node.
    pub fn insert(&mut self, security: Security) -> usize {
        let value = security.market_value;
        let key = self.nodes.insert(TreeNode::new(security));

        match self.root {
            None => self.root = Some(key),
            Some(mut cursor) => loop {
                // Equal values go right
                let branch = if value < self.nodes[cursor].value() {
                    Branch::Left
                } else {
                    Branch::Right
                };
                match self.child(cursor, branch) {
                    Some(next) => cursor = next,
                    None => {
                        self.set_child(cursor, branch, Some(key));
                        break;
                    }
                }
            },
        }

        self.rebalance_after_insert(key);
        key
    }

    fn rebalance_after_insert(&mut self, mut node: usize) {
        loop {
            let Some(mut parent) = self.nodes[node].parent else {
                self.nodes[node].color = Color::Black;
                return;
            };
            if !self.nodes[parent].is_red() {
                return;
            }
            // A red parent is never the root
            let Some(grandparent) = self.nodes[parent].parent else {
                self.nodes[parent].color = Color::Black;
                return;
            };

            let uncle = self.sibling(parent);
            if let Some(uncle) = uncle.filter(|&u| self.nodes[u].is_red()) {
                self.nodes[parent].color = Color::Black;
                self.nodes[uncle].color = Color::Black;
                self.nodes[grandparent].color = Color::Red;
                node = grandparent;
                continue;
            }

            // Straighten a zig-zag so node, parent and grandparent line up
            let node_is_left = self.is_left_child(node);
            let parent_is_left = self.is_left_child(parent);
            if !node_is_left && parent_is_left {
                self.rotate_left(parent);
                std::mem::swap(&mut node, &mut parent);
            } else if node_is_left && !parent_is_left {
                self.rotate_right(parent);
                std::mem::swap(&mut node, &mut parent);
            }

            self.nodes[parent].color = Color::Black;
            self.nodes[grandparent].color = Color::Red;
            if self.is_left_child(node) {
                self.rotate_right(grandparent);
            } else {
                self.rotate_left(grandparent);
            }
            return;
        }
    }

    // ========================================================================
    // Remove
    // ========================================================================

    /// Remove the node at `key` and return its security.
    ///
    /// Returns `None` if `key` is not a live node. Other keys may be
    /// invalidated (see the module docs).
    pub fn remove(&mut self, key: usize) -> Option<Security> {
        if !self.nodes.contains(key) {
            return None;
        }

        let mut target = key;
        if self.nodes[key].has_two_children() {
            // Predecessor's payload moves up; its slot, which has at most
            // one child, is the one spliced out.
            let predecessor = self.predecessor(key)?;
            self.swap_payloads(key, predecessor);
            target = predecessor;
        }

        if !self.nodes[target].is_red() {
            self.prepare_for_removal(target);
        }
        Some(self.splice_out(target))
    }

    /// Restore black balance around a black node about to be spliced out.
    ///
    /// Cases are tried in order; case 3 moves up to the parent, cases 4 and
    /// 6 finish.
    fn prepare_for_removal(&mut self, mut node: usize) {
        loop {
            // Case 1: red or root
            let Some(parent) = self.nodes[node].parent else {
                return;
            };
            if self.nodes[node].is_red() {
                return;
            }

            let node_is_left = self.is_left_child(node);
            let Some(mut sibling) = self.sibling(node) else {
                return;
            };

            // Case 2: red sibling
            if self.nodes[sibling].is_red() {
                self.nodes[parent].color = Color::Red;
                self.nodes[sibling].color = Color::Black;
                if node_is_left {
                    self.rotate_left(parent);
                } else {
                    self.rotate_right(parent);
                }
                match self.sibling(node) {
                    Some(s) => sibling = s,
                    None => return,
                }
            }

            let sibling_children_black = self.children_black(sibling);

            // Case 3: black parent, black nephews
            if !self.nodes[parent].is_red() && sibling_children_black {
                self.nodes[sibling].color = Color::Red;
                node = parent;
                continue;
            }

            // Case 4: red parent, black nephews
            if self.nodes[parent].is_red() && sibling_children_black {
                self.nodes[parent].color = Color::Black;
                self.nodes[sibling].color = Color::Red;
                return;
            }

            // Case 5: near nephew red, far nephew black
            let near = self.child(sibling, if node_is_left { Branch::Left } else { Branch::Right });
            let far = self.child(sibling, if node_is_left { Branch::Right } else { Branch::Left });
            if self.is_red(near) && !self.is_red(far) {
                self.nodes[sibling].color = Color::Red;
                if let Some(near) = near {
                    self.nodes[near].color = Color::Black;
                }
                if node_is_left {
                    self.rotate_right(sibling);
                } else {
                    self.rotate_left(sibling);
                }
                match self.sibling(node) {
                    Some(s) => sibling = s,
                    None => return,
                }
            }

            // Case 6: far nephew red
            self.nodes[sibling].color = self.nodes[parent].color;
            self.nodes[parent].color = Color::Black;
            let far = self.child(sibling, if node_is_left { Branch::Right } else { Branch::Left });
            if let Some(far) = far {
                self.nodes[far].color = Color::Black;
            }
            if node_is_left {
                self.rotate_left(parent);
            } else {
                self.rotate_right(parent);
            }
            return;
        }
    }

    /// Unlink a node with at most one child, promoting that child.
    fn splice_out(&mut self, key: usize) -> Security {
        let parent = self.nodes[key].parent;
        let child = self.nodes[key].single_child();

        match parent {
            Some(parent) => self.replace_child(parent, key, child),
            None => {
                self.root = child;
                if let Some(child) = child {
                    self.nodes[child].parent = None;
                    self.nodes[child].color = Color::Black;
                }
            }
        }

        self.nodes.remove(key).security
    }

    fn swap_payloads(&mut self, a: usize, b: usize) {
        if let Some((first, second)) = self.nodes.get2_mut(a, b) {
            std::mem::swap(&mut first.security, &mut second.security);
        }
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Single-path probe for a security valued in `[min, max]`.
    ///
    /// Descends from the root, returning the first in-range node met. Goes
    /// left when `min` is below the current value, right otherwise. An
    /// in-range node off that path is not found; callers widen the window
    /// instead of scanning.
    pub fn range_search(&self, min: Decimal, max: Decimal) -> Option<usize> {
        let mut cursor = self.root;
        while let Some(key) = cursor {
            let value = self.nodes[key].value();
            if value >= min && value <= max {
                return Some(key);
            }
            cursor = if min < value {
                self.nodes[key].left
            } else {
                self.nodes[key].right
            };
        }
        None
    }

    /// Leftmost node (smallest market value)
    pub fn minimum(&self) -> Option<usize> {
        self.root.map(|root| self.subtree_min(root))
    }

    /// Rightmost node (largest market value)
    pub fn maximum(&self) -> Option<usize> {
        self.root.map(|root| self.subtree_max(root))
    }

    /// Locate a specific security by ticket and market value.
    ///
    /// Rotations can leave equal values on either side, so both subtrees of
    /// an equal-valued node are searched.
    pub fn find(&self, ticket: u32, value: Decimal) -> Option<usize> {
        let mut pending: Vec<usize> = self.root.into_iter().collect();
        while let Some(key) = pending.pop() {
            let node = &self.nodes[key];
            if value < node.value() {
                pending.extend(node.left);
            } else if value > node.value() {
                pending.extend(node.right);
            } else {
                if node.security.ticket == ticket {
                    return Some(key);
                }
                pending.extend(node.left);
                pending.extend(node.right);
            }
        }
        None
    }

    // ========================================================================
    // Structural Queries
    // ========================================================================

    /// Nodes reachable from the root
    pub fn count(&self) -> usize {
        self.count_from(self.root)
    }

    /// Total market value of the pool
    pub fn sum(&self) -> Decimal {
        self.sum_from(self.root)
    }

    /// Nodes on the longest root-to-leaf path (0 when empty)
    pub fn height(&self) -> usize {
        self.height_from(self.root)
    }

    fn count_from(&self, key: Option<usize>) -> usize {
        match key {
            None => 0,
            Some(key) => {
                let node = &self.nodes[key];
                1 + self.count_from(node.left) + self.count_from(node.right)
            }
        }
    }

    fn sum_from(&self, key: Option<usize>) -> Decimal {
        match key {
            None => Decimal::ZERO,
            Some(key) => {
                let node = &self.nodes[key];
                node.value() + self.sum_from(node.left) + self.sum_from(node.right)
            }
        }
    }

    fn height_from(&self, key: Option<usize>) -> usize {
        match key {
            None => 0,
            Some(key) => {
                let node = &self.nodes[key];
                1 + self.height_from(node.left).max(self.height_from(node.right))
            }
        }
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// In-order iterator over `(key, security)`
    pub fn in_order(&self) -> InOrder<'_> {
        let mut iter = InOrder {
            tree: self,
            stack: Vec::new(),
        };
        iter.push_left_spine(self.root);
        iter
    }

    /// Securities in ascending market value
    pub fn iter(&self) -> impl Iterator<Item = &Security> + '_ {
        self.in_order().map(|(_, security)| security)
    }

    /// SHA-256 over the SSZ encoding of every pooled security, in order.
    ///
    /// Identical operation sequences produce identical roots.
    pub fn state_root(&self) -> Result<[u8; 32], PledgeError> {
        let mut hasher = Sha256::new();
        for security in self.iter() {
            let entry = PoolEntry::from_security(security);
            let bytes = ssz_rs::serialize(&entry)
                .map_err(|e| PledgeError::Encoding(format!("{e:?}")))?;
            hasher.update(&bytes);
        }

        let mut root = [0u8; 32];
        root.copy_from_slice(&hasher.finalize());
        Ok(root)
    }

    // ========================================================================
    // Link Helpers
    // ========================================================================

    #[inline]
    fn child(&self, key: usize, branch: Branch) -> Option<usize> {
        match branch {
            Branch::Left => self.nodes[key].left,
            Branch::Right => self.nodes[key].right,
        }
    }

    /// Absent nodes count as black
    #[inline]
    fn is_red(&self, key: Option<usize>) -> bool {
        key.is_some_and(|k| self.nodes[k].is_red())
    }

    #[inline]
    fn children_black(&self, key: usize) -> bool {
        !self.is_red(self.nodes[key].left) && !self.is_red(self.nodes[key].right)
    }

    #[inline]
    fn is_left_child(&self, key: usize) -> bool {
        self.nodes[key]
            .parent
            .is_some_and(|p| self.nodes[p].left == Some(key))
    }

    fn sibling(&self, key: usize) -> Option<usize> {
        let parent = self.nodes[key].parent?;
        if self.nodes[parent].left == Some(key) {
            self.nodes[parent].right
        } else {
            self.nodes[parent].left
        }
    }

    fn subtree_min(&self, mut key: usize) -> usize {
        while let Some(left) = self.nodes[key].left {
            key = left;
        }
        key
    }

    fn subtree_max(&self, mut key: usize) -> usize {
        while let Some(right) = self.nodes[key].right {
            key = right;
        }
        key
    }

    fn predecessor(&self, key: usize) -> Option<usize> {
        self.nodes[key].left.map(|left| self.subtree_max(left))
    }

    fn set_child(&mut self, parent: usize, branch: Branch, child: Option<usize>) {
        match branch {
            Branch::Left => self.nodes[parent].left = child,
            Branch::Right => self.nodes[parent].right = child,
        }
        if let Some(child) = child {
            self.nodes[child].parent = Some(parent);
        }
    }

    fn replace_child(&mut self, parent: usize, current: usize, new: Option<usize>) {
        if self.nodes[parent].left == Some(current) {
            self.set_child(parent, Branch::Left, new);
        } else if self.nodes[parent].right == Some(current) {
            self.set_child(parent, Branch::Right, new);
        }
    }

    fn rotate_left(&mut self, node: usize) {
        let Some(pivot) = self.nodes[node].right else {
            return;
        };
        let pivot_left = self.nodes[pivot].left;

        match self.nodes[node].parent {
            Some(parent) => self.replace_child(parent, node, Some(pivot)),
            None => {
                self.nodes[pivot].parent = None;
                self.root = Some(pivot);
            }
        }
        self.set_child(pivot, Branch::Left, Some(node));
        self.set_child(node, Branch::Right, pivot_left);
    }

    fn rotate_right(&mut self, node: usize) {
        let Some(pivot) = self.nodes[node].left else {
            return;
        };
        let pivot_right = self.nodes[pivot].right;

        match self.nodes[node].parent {
            Some(parent) => self.replace_child(parent, node, Some(pivot)),
            None => {
                self.nodes[pivot].parent = None;
                self.root = Some(pivot);
            }
        }
        self.set_child(pivot, Branch::Right, Some(node));
        self.set_child(node, Branch::Left, pivot_right);
    }
}

/// In-order traversal, see [`SecurityTree::in_order`]
pub struct InOrder<'a> {
    tree: &'a SecurityTree,
    stack: Vec<usize>,
}

impl<'a> InOrder<'a> {
    fn push_left_spine(&mut self, mut cursor: Option<usize>) {
        while let Some(key) = cursor {
            self.stack.push(key);
            cursor = self.tree.nodes[key].left;
        }
    }
}

impl<'a> Iterator for InOrder<'a> {
    type Item = (usize, &'a Security);

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.stack.pop()?;
        let node = &self.tree.nodes[key];
        self.push_left_spine(node.right);
        Some((key, &node.security))
    }
}

impl Extend<Security> for SecurityTree {
    fn extend<I: IntoIterator<Item = Security>>(&mut self, iter: I) {
        for security in iter {
            self.insert(security);
        }
    }
}

impl FromIterator<Security> for SecurityTree {
    fn from_iter<I: IntoIterator<Item = Security>>(iter: I) -> Self {
        let mut tree = SecurityTree::new();
        tree.extend(iter);
        tree
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
