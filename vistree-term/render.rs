use std::io::{
  self,
  Write,
};

use vistree_lib::{
  CheckState,
  CheckboxState,
  HierarchyNode,
  TreeCheckbox,
};

fn glyph(state: CheckState) -> &'static str {
  match state {
    CheckState::On => "[x]",
    CheckState::Off => "[ ]",
    CheckState::Partial => "[~]",
  }
}

fn line(depth: usize, label: &str, checkbox: &CheckboxState) -> String {
  let mut line = format!("{}{} {}", "  ".repeat(depth), glyph(checkbox.state), label);
  if checkbox.is_disabled() {
    line.push_str(" (disabled)");
  }
  if let Some(tooltip) = &checkbox.tooltip {
    line.push_str(" - ");
    line.push_str(tooltip);
  }
  line
}

/// Write one row per node with its checkbox as the tree currently knows it.
pub fn render<W: Write>(
  out: &mut W,
  checkboxes: &dyn TreeCheckbox,
  rows: &[(usize, HierarchyNode)],
) -> io::Result<()> {
  for (depth, node) in rows {
    let checkbox = checkboxes.get_checkbox_state(node);
    writeln!(out, "{}", line(*depth, &node.label, &checkbox))?;
  }
  Ok(())
}
