//! Field selections → relation paths.

mod analyzer;
mod cache;
mod tree;
pub use analyzer::*;
pub use cache::{CacheStats, RelationPathCache};
pub use tree::FieldSelection;
