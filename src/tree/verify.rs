//! Structural checks and diagnostics for [`SecurityTree`].
//!
//! `verify_invariants` walks the whole tree and reports the first rule that
//! does not hold. It is O(n) and intended for tests and debug builds.

use std::fmt::Write;

use rust_decimal::Decimal;

use crate::error::InvariantViolation;
use crate::tree::SecurityTree;

/// Shape summary returned by a successful check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    pub count: usize,
    /// Nodes on the longest path
    pub height: usize,
    /// Black nodes on every root-to-nil path, nil included
    pub black_height: usize,
    pub sum: Decimal,
}

impl SecurityTree {
    /// Check ordering, coloring, links, black height and height bound.
    pub fn verify_invariants(&self) -> Result<TreeStats, InvariantViolation> {
        let Some(root) = self.root() else {
            if self.len() > 0 {
                return Err(InvariantViolation::Unreachable {
                    stored: self.len(),
                    reachable: 0,
                });
            }
            return Ok(TreeStats::default());
        };

        let root_node = self
            .node(root)
            .ok_or(InvariantViolation::BrokenParentLink { key: root })?;
        if root_node.is_red() {
            return Err(InvariantViolation::RedRoot { key: root });
        }
        if root_node.parent.is_some() {
            return Err(InvariantViolation::BrokenParentLink { key: root });
        }

        let black_height = self.check_subtree(root)?;

        let mut count = 0;
        let mut sum = Decimal::ZERO;
        let mut previous: Option<Decimal> = None;
        for (key, security) in self.in_order() {
            let value = security.market_value;
            if let Some(previous) = previous.filter(|&p| value < p) {
                return Err(InvariantViolation::OutOfOrder {
                    key,
                    value,
                    previous,
                });
            }
            previous = Some(value);
            count += 1;
            sum += value;
        }

        if count != self.len() {
            return Err(InvariantViolation::Unreachable {
                stored: self.len(),
                reachable: count,
            });
        }

        let height = self.height();
        let min = (count + 1).ilog2() as usize;
        let max = 2 * min;
        if height < min || height > max {
            return Err(InvariantViolation::Height {
                height,
                count,
                min,
                max,
            });
        }

        Ok(TreeStats {
            count,
            height,
            black_height,
            sum,
        })
    }

    /// Shape summary without checking any rule.
    ///
    /// Black height is read along the left spine.
    pub fn stats(&self) -> TreeStats {
        if self.is_empty() {
            return TreeStats::default();
        }

        let mut black_height = 1;
        let mut cursor = self.root();
        while let Some(node) = cursor.and_then(|k| self.node(k)) {
            black_height += usize::from(!node.is_red());
            cursor = node.left;
        }

        TreeStats {
            count: self.count(),
            height: self.height(),
            black_height,
            sum: self.sum(),
        }
    }

    /// Black height of the subtree at `key`, checking links and red-red on
    /// the way.
    fn check_subtree(&self, key: usize) -> Result<usize, InvariantViolation> {
        let node = self
            .node(key)
            .ok_or(InvariantViolation::BrokenParentLink { key })?;

        let mut heights = [1usize; 2];
        for (slot, child) in [node.left, node.right].into_iter().enumerate() {
            let Some(child) = child else { continue };
            let child_node = self
                .node(child)
                .ok_or(InvariantViolation::BrokenParentLink { key: child })?;
            if child_node.parent != Some(key) {
                return Err(InvariantViolation::BrokenParentLink { key: child });
            }
            if node.is_red() && child_node.is_red() {
                return Err(InvariantViolation::RedRed { key });
            }
            heights[slot] = self.check_subtree(child)?;
        }

        let [left, right] = heights;
        if left != right {
            return Err(InvariantViolation::BlackHeight { key, left, right });
        }
        Ok(left + usize::from(!node.is_red()))
    }

    /// Sideways text drawing: right subtree on top, one line per node.
    ///
    /// ```text
    ///     400.00 red
    /// 250.00 black
    ///     100.00 red
    /// ```
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(self.root(), 0, &mut out);
        out
    }

    fn render_into(&self, key: Option<usize>, depth: usize, out: &mut String) {
        let Some(node) = key.and_then(|k| self.node(k)) else {
            return;
        };
        self.render_into(node.right, depth + 1, out);
        let _ = writeln!(out, "{}{:.2} {}", "    ".repeat(depth), node.value(), node.color);
        self.render_into(node.left, depth + 1, out);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
