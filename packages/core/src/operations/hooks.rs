//! Commit hooks around lifecycle operations
//!
//! Every lifecycle operation that changes rows runs `before` with the
//! current node and `after` with the outcome. An error from `before` aborts
//! the operation with nothing changed.

use crate::models::Node;
use crate::services::PageStoreError;
use crate::storage::ContentSnapshot;
use async_trait::async_trait;
use std::fmt;

/// Lifecycle operation being committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ChangeNum,
    ChangeSlug,
    ChangeStatus,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::ChangeNum => "changeNum",
            Action::ChangeSlug => "changeSlug",
            Action::ChangeStatus => "changeStatus",
            Action::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Outcome passed to [`CommitHooks::after`]
#[derive(Debug, Clone)]
pub enum HookEvent {
    /// The node was replaced by a new snapshot
    Changed { action: Action, old: Node, new: Node },

    /// The node and all of its rows are gone; `snapshot` holds the rows
    Deleted { node: Node, snapshot: ContentSnapshot },
}

impl HookEvent {
    pub fn action(&self) -> Action {
        match self {
            HookEvent::Changed { action, .. } => *action,
            HookEvent::Deleted { .. } => Action::Delete,
        }
    }
}

#[async_trait]
pub trait CommitHooks: Send + Sync + fmt::Debug {
    async fn before(&self, _action: Action, _node: &Node) -> Result<(), PageStoreError> {
        Ok(())
    }

    async fn after(&self, _event: &HookEvent) -> Result<(), PageStoreError> {
        Ok(())
    }
}

/// Hooks that do nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl CommitHooks for NoopHooks {}
