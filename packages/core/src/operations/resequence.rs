//! Sibling resequencing
//!
//! When a listed page leaves the listing (unpublished or deleted), the
//! remaining listed siblings are renumbered 1..n in their current order.
//! Only kinds using the default num scheme are renumbered; the other
//! schemes derive their numbers from content.

use crate::models::{Node, NumScheme};
use crate::services::{PageStoreError, PageTree};

impl PageTree {
    /// Renumber the listed siblings of `node`, skipping `node` itself
    pub async fn resort_siblings_after_unlisting(&self, node: &Node) -> Result<(), PageStoreError> {
        if self.descriptor(node)?.num_scheme != NumScheme::Default {
            return Ok(());
        }

        let siblings = self.siblings(node).await?;
        let mut listed: Vec<Node> = siblings
            .listed()
            .filter(|sibling| sibling.uuid() != node.uuid())
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.num().cmp(&b.num()).then_with(|| a.title().cmp(&b.title())));

        for (index, sibling) in listed.iter().enumerate() {
            self.change_num(sibling, Some(index as i64 + 1)).await?;
        }

        tracing::debug!("Resequenced {} siblings of {}", listed.len(), node.id());
        Ok(())
    }
}
