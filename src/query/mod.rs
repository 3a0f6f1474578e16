//! Select plans and tree-aware join planning. Identifiers come from metadata only.

mod builder;
pub mod tree;
pub use builder::*;
pub use tree::{is_tree_entity, TreeJoinPlanner};
