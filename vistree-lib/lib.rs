//! Visibility status cache for hierarchy tree checkboxes.
//!
//! A tree view asks [`VisibilityCache`] for the checkbox state of every node
//! it draws. The cache answers synchronously from what it already knows and
//! resolves unknown or stale nodes in the background through a
//! [`VisibilityHandler`], notifying subscribers when new data arrives.

pub mod cache;
pub mod config;
pub mod handler;
pub mod model;
pub mod node;
pub mod status;
pub mod telemetry;

mod request;

pub use cache::{
  CachedStatus,
  TreeCheckbox,
  VisibilityCache,
};
pub use config::CacheConfig;
pub use handler::VisibilityHandler;
pub use node::{
  HierarchyNode,
  NodeId,
};
pub use status::{
  CheckState,
  CheckboxState,
  VisibilityState,
  VisibilityStatus,
};
pub use telemetry::{
  FeatureUsage,
  TelemetrySink,
};
pub use vistree_event::Event;
