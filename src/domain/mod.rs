//! Domain layer: deduction-tree model and structural rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;
pub mod proposal;

pub use arena::{LogicNode, LogicTree, NodeData, NodeExport, TreeExport, TreeResult};
pub use builder::{make_root_tree, BranchingPolicy, StructureBuilder, CHILD_PATTERN};
pub use entities::*;
pub use error::DomainError;
pub use generational_arena::Index;
pub use proposal::{ChildProposal, ChildTag, TaggedLine};
