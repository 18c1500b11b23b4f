//! Sparse wide tree
//!
//! Nodes and voxel payloads live inside one arena client and reference each
//! other only by arena index, so the arena bytes can be uploaded as-is.

mod integrity;
mod node;
mod region;
mod view;

pub use integrity::{validate_tree, TreeIntegrityReport};
pub use node::{NodeKind, RawNode};
pub use region::{Region, RegionConfig};
pub use view::{voxel_at, FlatBuffer, NodeSource};
