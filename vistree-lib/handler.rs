use async_trait::async_trait;
use vistree_event::Event;

use crate::{
  node::HierarchyNode,
  status::VisibilityStatus,
};

/// Determines and changes visibility of the model elements represented by
/// tree nodes.
///
/// Lookups may be slow (spatial queries, category resolution); the cache never
/// awaits them on the caller's path. A handler that can answer immediately just
/// returns from the async fn without suspending.
#[async_trait]
pub trait VisibilityHandler: Send + Sync {
  /// Raised when visibility changed outside of the tree, invalidating every
  /// cached status.
  fn on_visibility_change(&self) -> &Event;

  /// Current visibility status of `node`. Errors are logged and otherwise
  /// ignored by the cache; report user-facing problems through
  /// [`VisibilityStatus::tooltip`] instead.
  async fn get_visibility_status(&self, node: &HierarchyNode) -> anyhow::Result<VisibilityStatus>;

  /// Show (`on`) or hide the elements represented by `node`.
  async fn change_visibility(&self, node: &HierarchyNode, on: bool) -> anyhow::Result<()>;

  /// Release resources. Called exactly once when the owning cache drops this
  /// handler.
  fn dispose(&self) {}
}
