//! In-memory hierarchy of model elements and a handler that resolves node
//! visibility from per-element visibility.

use std::{
  path::{
    Path,
    PathBuf,
  },
  sync::atomic::{
    AtomicBool,
    AtomicUsize,
    Ordering,
  },
  time::Duration,
};

use async_trait::async_trait;
use hashbrown::HashSet;
use parking_lot::RwLock;
use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;
use vistree_event::Event;

use crate::{
  handler::VisibilityHandler,
  node::HierarchyNode,
  status::VisibilityStatus,
};

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
  #[error("failed to read {path}: {source}")]
  Io {
    path:   PathBuf,
    source: std::io::Error,
  },
  #[error("invalid hierarchy: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("node id {0:?} appears more than once")]
  DuplicateNode(String),
}

pub const NO_ELEMENTS_TOOLTIP: &str = "Node has no elements";

/// A node of a hierarchy file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeNode {
  pub id:       String,
  #[serde(default)]
  pub label:    Option<String>,
  /// Elements represented directly by this node.
  #[serde(default)]
  pub elements: Vec<String>,
  #[serde(default)]
  pub children: Vec<TreeNode>,
}

impl TreeNode {
  pub fn label(&self) -> &str {
    self.label.as_deref().unwrap_or(&self.id)
  }

  /// Elements of this node and all of its descendants.
  pub fn subtree_elements(&self) -> Vec<String> {
    let mut elements = Vec::new();
    let mut stack = vec![self];
    while let Some(node) = stack.pop() {
      elements.extend(node.elements.iter().cloned());
      stack.extend(node.children.iter().rev());
    }
    elements
  }

  pub fn to_hierarchy_node(&self) -> HierarchyNode {
    HierarchyNode::new(self.id.as_str(), self.label()).with_elements(self.subtree_elements())
  }
}

/// A forest of [`TreeNode`]s, loaded from TOML:
///
/// ```toml
/// [[nodes]]
/// id = "site"
/// label = "Site"
///
/// [[nodes.children]]
/// id = "walls"
/// elements = ["0x20", "0x21"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HierarchyTree {
  #[serde(default)]
  pub nodes: Vec<TreeNode>,
}

impl HierarchyTree {
  pub fn from_toml_str(source: &str) -> Result<Self> {
    let tree: Self = toml::from_str(source)?;
    tree.validate()?;
    Ok(tree)
  }

  pub fn load(path: &Path) -> Result<Self> {
    let source = std::fs::read_to_string(path).map_err(|source| {
      ModelError::Io {
        path: path.to_path_buf(),
        source,
      }
    })?;
    Self::from_toml_str(&source)
  }

  fn validate(&self) -> Result<()> {
    let mut seen = HashSet::new();
    for (_, node) in self.iter() {
      if !seen.insert(node.id.as_str()) {
        return Err(ModelError::DuplicateNode(node.id.clone()));
      }
    }
    Ok(())
  }

  /// Pre-order walk yielding each node with its depth.
  pub fn iter(&self) -> impl Iterator<Item = (usize, &TreeNode)> {
    let mut stack: Vec<(usize, &TreeNode)> = self.nodes.iter().rev().map(|node| (0, node)).collect();
    std::iter::from_fn(move || {
      let (depth, node) = stack.pop()?;
      stack.extend(node.children.iter().rev().map(|child| (depth + 1, child)));
      Some((depth, node))
    })
  }

  pub fn find(&self, id: &str) -> Option<&TreeNode> {
    self.iter().map(|(_, node)| node).find(|node| node.id == id)
  }

  pub fn len(&self) -> usize {
    self.iter().count()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }
}

/// Tuning for [`ModelVisibilityHandler`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ModelConfig {
  /// Artificial delay for every lookup and change, to mimic slow queries.
  pub latency_ms: u64,
  /// Elements hidden when the session starts.
  pub hidden:     Vec<String>,
}

/// Resolves node visibility from the visibility of the node's elements:
/// all shown is `visible`, none shown is `hidden`, anything else `partial`.
#[derive(Debug, Default)]
pub struct ModelVisibilityHandler {
  hidden:       RwLock<HashSet<String>>,
  event:        Event,
  latency:      Duration,
  status_calls: AtomicUsize,
  change_calls: AtomicUsize,
  disposed:     AtomicBool,
}

impl ModelVisibilityHandler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_config(config: &ModelConfig) -> Self {
    Self {
      hidden: RwLock::new(config.hidden.iter().cloned().collect()),
      latency: Duration::from_millis(config.latency_ms),
      ..Self::default()
    }
  }

  pub fn is_element_visible(&self, element: &str) -> bool {
    !self.hidden.read().contains(element)
  }

  /// Change visibility of a single element from outside the tree (e.g. the
  /// viewport) and notify listeners.
  pub fn set_element_visible(&self, element: &str, visible: bool) {
    let changed = {
      let mut hidden = self.hidden.write();
      if visible {
        hidden.remove(element)
      } else {
        hidden.insert(element.to_string())
      }
    };
    if changed {
      self.event.raise();
    }
  }

  pub fn status_of(&self, node: &HierarchyNode) -> VisibilityStatus {
    if node.element_ids.is_empty() {
      return VisibilityStatus::hidden()
        .disabled()
        .with_tooltip(NO_ELEMENTS_TOOLTIP);
    }

    let hidden = self.hidden.read();
    let shown = node
      .element_ids
      .iter()
      .filter(|element| !hidden.contains(element.as_str()))
      .count();
    if shown == node.element_ids.len() {
      VisibilityStatus::visible()
    } else if shown == 0 {
      VisibilityStatus::hidden()
    } else {
      VisibilityStatus::partial()
    }
  }

  pub fn status_calls(&self) -> usize {
    self.status_calls.load(Ordering::Relaxed)
  }

  /// Number of changes applied so far.
  pub fn change_calls(&self) -> usize {
    self.change_calls.load(Ordering::Acquire)
  }

  pub fn is_disposed(&self) -> bool {
    self.disposed.load(Ordering::Acquire)
  }

  async fn delay(&self) {
    if !self.latency.is_zero() {
      tokio::time::sleep(self.latency).await;
    }
  }
}

#[async_trait]
impl VisibilityHandler for ModelVisibilityHandler {
  fn on_visibility_change(&self) -> &Event {
    &self.event
  }

  async fn get_visibility_status(&self, node: &HierarchyNode) -> anyhow::Result<VisibilityStatus> {
    self.status_calls.fetch_add(1, Ordering::Relaxed);
    self.delay().await;
    Ok(self.status_of(node))
  }

  async fn change_visibility(&self, node: &HierarchyNode, on: bool) -> anyhow::Result<()> {
    if self.is_disposed() {
      anyhow::bail!("handler for {} is disposed", node.id);
    }
    self.delay().await;
    {
      let mut hidden = self.hidden.write();
      for element in &node.element_ids {
        if on {
          hidden.remove(element.as_str());
        } else {
          hidden.insert(element.clone());
        }
      }
    }
    log::debug!(
      "{} {} elements of {}",
      if on { "showed" } else { "hid" },
      node.element_ids.len(),
      node.id
    );
    self.change_calls.fetch_add(1, Ordering::Release);
    self.event.raise();
    Ok(())
  }

  fn dispose(&self) {
    self.disposed.store(true, Ordering::Release);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SITE: &str = r#"
[[nodes]]
id = "site"
label = "Site"

[[nodes.children]]
id = "walls"
elements = ["w1", "w2"]

[[nodes.children]]
id = "doors"
label = "Doors"
elements = ["d1"]

[[nodes]]
id = "empty"
"#;

  fn site() -> HierarchyTree {
    HierarchyTree::from_toml_str(SITE).unwrap()
  }

  #[test]
  fn walks_in_pre_order_with_depth() {
    let tree = site();
    let walk: Vec<_> = tree
      .iter()
      .map(|(depth, node)| (depth, node.id.as_str()))
      .collect();
    assert_eq!(walk, vec![(0, "site"), (1, "walls"), (1, "doors"), (0, "empty")]);
    assert_eq!(tree.len(), 4);
  }

  #[test]
  fn parent_represents_subtree_elements() {
    let tree = site();
    let node = tree.find("site").unwrap().to_hierarchy_node();
    assert_eq!(node.label, "Site");
    assert_eq!(node.element_ids, vec!["w1", "w2", "d1"]);
    assert_eq!(tree.find("walls").unwrap().label(), "walls");
  }

  #[test]
  fn duplicate_ids_are_rejected() {
    let err = HierarchyTree::from_toml_str(
      r#"
[[nodes]]
id = "a"
[[nodes.children]]
id = "a"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ModelError::DuplicateNode(id) if id == "a"));
  }

  #[test]
  fn unknown_fields_are_rejected() {
    let err = HierarchyTree::from_toml_str("[[nodes]]\nid = \"a\"\ncolor = 3").unwrap_err();
    assert!(matches!(err, ModelError::Parse(_)));
  }

  #[test]
  fn status_follows_element_visibility() {
    let tree = site();
    let handler = ModelVisibilityHandler::new();
    let site_node = tree.find("site").unwrap().to_hierarchy_node();
    let walls = tree.find("walls").unwrap().to_hierarchy_node();

    assert_eq!(handler.status_of(&site_node), VisibilityStatus::visible());
    handler.set_element_visible("w1", false);
    assert_eq!(handler.status_of(&site_node), VisibilityStatus::partial());
    assert_eq!(handler.status_of(&walls), VisibilityStatus::partial());
    handler.set_element_visible("w2", false);
    assert_eq!(handler.status_of(&walls), VisibilityStatus::hidden());
  }

  #[test]
  fn node_without_elements_is_disabled() {
    let tree = site();
    let handler = ModelVisibilityHandler::new();
    let status = handler.status_of(&tree.find("empty").unwrap().to_hierarchy_node());
    assert_eq!(
      status,
      VisibilityStatus::hidden()
        .disabled()
        .with_tooltip(NO_ELEMENTS_TOOLTIP)
    );
  }

  #[test]
  fn config_seeds_hidden_elements() {
    let config: ModelConfig = toml::from_str("hidden = [\"d1\"]\nlatency-ms = 0").unwrap();
    let handler = ModelVisibilityHandler::from_config(&config);
    assert!(!handler.is_element_visible("d1"));
    assert!(handler.is_element_visible("w1"));
  }

  #[tokio::test(flavor = "current_thread")]
  async fn change_updates_elements_and_raises_event() {
    let tree = site();
    let handler = ModelVisibilityHandler::new();
    let raised = std::sync::Arc::new(AtomicUsize::new(0));
    let _listener = {
      let raised = raised.clone();
      handler.on_visibility_change().add_listener(move || {
        raised.fetch_add(1, Ordering::SeqCst);
      })
    };

    let site_node = tree.find("site").unwrap().to_hierarchy_node();
    handler.change_visibility(&site_node, false).await.unwrap();
    assert!(!handler.is_element_visible("w1"));
    assert!(!handler.is_element_visible("d1"));
    assert_eq!(raised.load(Ordering::SeqCst), 1);

    let status = handler.get_visibility_status(&site_node).await.unwrap();
    assert_eq!(status, VisibilityStatus::hidden());
    assert_eq!(handler.status_calls(), 1);
    assert_eq!(handler.change_calls(), 1);
  }

  #[tokio::test(flavor = "current_thread")]
  async fn disposed_handler_refuses_changes() {
    let handler = ModelVisibilityHandler::new();
    handler.dispose();
    let node = HierarchyNode::new("a", "A").with_elements(["x"]);
    assert!(handler.change_visibility(&node, false).await.is_err());
    assert!(handler.is_element_visible("x"));
    assert_eq!(handler.change_calls(), 0);
  }
}
