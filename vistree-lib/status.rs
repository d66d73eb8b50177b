use serde::{
  Deserialize,
  Serialize,
};

/// Whether the elements behind a node are shown in the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityState {
  Visible,
  Partial,
  Hidden,
}

/// Visibility of a node as reported by a [`crate::VisibilityHandler`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityStatus {
  pub state:       VisibilityState,
  /// Whether changing the visibility of this node is disallowed.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_disabled: Option<bool>,
  /// Shown when hovering the checkbox, e.g. why the node is disabled.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tooltip:     Option<String>,
}

impl VisibilityStatus {
  pub fn new(state: VisibilityState) -> Self {
    Self {
      state,
      is_disabled: None,
      tooltip: None,
    }
  }

  pub fn visible() -> Self {
    Self::new(VisibilityState::Visible)
  }

  pub fn partial() -> Self {
    Self::new(VisibilityState::Partial)
  }

  pub fn hidden() -> Self {
    Self::new(VisibilityState::Hidden)
  }

  pub fn disabled(mut self) -> Self {
    self.is_disabled = Some(true);
    self
  }

  pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
    self.tooltip = Some(tooltip.into());
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckState {
  On,
  Off,
  Partial,
}

impl From<VisibilityState> for CheckState {
  fn from(state: VisibilityState) -> Self {
    match state {
      VisibilityState::Visible => CheckState::On,
      VisibilityState::Hidden => CheckState::Off,
      VisibilityState::Partial => CheckState::Partial,
    }
  }
}

/// What a tree row needs to draw its visibility checkbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckboxState {
  pub state:       CheckState,
  pub is_disabled: Option<bool>,
  pub tooltip:     Option<String>,
}

impl CheckboxState {
  /// Shown while a node's status has not been computed yet.
  pub fn placeholder() -> Self {
    Self {
      state:       CheckState::Off,
      is_disabled: Some(true),
      tooltip:     None,
    }
  }

  pub fn is_disabled(&self) -> bool {
    self.is_disabled.unwrap_or(false)
  }
}

impl From<&VisibilityStatus> for CheckboxState {
  fn from(status: &VisibilityStatus) -> Self {
    Self {
      state:       status.state.into(),
      is_disabled: status.is_disabled,
      tooltip:     status.tooltip.clone(),
    }
  }
}
