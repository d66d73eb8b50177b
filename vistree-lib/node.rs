use std::{
  borrow::Borrow,
  fmt,
};

/// Identifier of a node in a hierarchy tree, unique within one tree session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl Borrow<str> for NodeId {
  fn borrow(&self) -> &str {
    &self.0
  }
}

impl From<&str> for NodeId {
  fn from(id: &str) -> Self {
    Self::new(id)
  }
}

impl From<String> for NodeId {
  fn from(id: String) -> Self {
    Self(id)
  }
}

/// A tree node as handed to a [`crate::VisibilityHandler`]: its id, what the
/// row displays, and the model elements whose visibility it represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyNode {
  pub id:          NodeId,
  pub label:       String,
  pub element_ids: Vec<String>,
}

impl HierarchyNode {
  pub fn new(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
    Self {
      id:          id.into(),
      label:       label.into(),
      element_ids: Vec::new(),
    }
  }

  pub fn with_elements<I, S>(mut self, elements: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.element_ids = elements.into_iter().map(Into::into).collect();
    self
  }
}
