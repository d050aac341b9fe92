//! Data Models
//!
//! This module contains the value types shared by every layer:
//!
//! - `Node` - immutable page snapshot, and `Pages`, an ordered sibling collection
//! - `ModelDescriptor` / `ModelRegistry` - per-kind table declarations
//! - `VersionId` / `Language` - the coordinates that address a page's rows

mod descriptor;
mod node;
pub mod slug;
mod version;

pub use descriptor::{ModelDescriptor, ModelRegistry, NumScheme};
pub use node::{NewPage, Node, NodeStatus, Pages, ParentRef};
pub use version::{Language, Languages, VersionId};
