//! Security pool: a red-black tree over a slab arena.
//!
//! ## Components
//!
//! - [`TreeNode`]: a `Security` plus color and parent/child slab keys
//! - [`SecurityTree`]: insert, remove, range probe, min/max, traversal
//! - [`TreeStats`]: result of [`SecurityTree::verify_invariants`]
//!
//! ## Complexity
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | Insert | O(log n) |
//! | Remove by key | O(log n) |
//! | Range probe | O(log n) |
//! | Min / max | O(log n) |
//! | Count / sum / height | O(n) |
//! | Verify | O(n) |

pub mod node;
pub mod rbtree;
pub mod verify;

pub use node::{Color, TreeNode};
pub use rbtree::{InOrder, SecurityTree};
pub use verify::TreeStats;
