//! Page Lifecycle Operations
//!
//! Lifecycle operations are implemented on [`PageTree`](crate::services::PageTree):
//!
//! - `change_num` / `change_slug` - renumber and rename
//! - `publish` / `unpublish` - move between drafts and children
//! - `delete` - two-phase delete cascading into descendants and attachments
//! - `copy` / `move_to` - unsupported for relational storage
//!
//! Every mutating operation runs through [`CommitHooks`].

mod hooks;
mod lifecycle;
mod resequence;

pub use hooks::{Action, CommitHooks, HookEvent, NoopHooks};
