//! Headless driver for the visibility cache.
//!
//! Loads a hierarchy, resolves every node's checkbox through the cache over
//! the in-memory model, applies scripted clicks, and prints the resulting tree.

mod cli;
mod config;
mod logging;
mod render;

use std::{
  io::Write,
  sync::Arc,
  time::Duration,
};

use anyhow::{
  Context,
  Result,
};
use clap::Parser;
use vistree_lib::{
  FeatureUsage,
  HierarchyNode,
  TreeCheckbox,
  VisibilityCache,
  model::{
    HierarchyTree,
    ModelVisibilityHandler,
  },
};

use crate::{
  cli::Cli,
  config::AppConfig,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  logging::setup(cli.verbosity, cli.log_file.as_deref())?;

  let config = match &cli.config_file {
    Some(path) => AppConfig::load(path)?,
    None => AppConfig::default(),
  };
  let tree = HierarchyTree::load(&cli.tree)
    .with_context(|| format!("failed to load hierarchy {}", cli.tree.display()))?;
  let rows: Vec<(usize, HierarchyNode)> = tree
    .iter()
    .map(|(depth, node)| (depth, node.to_hierarchy_node()))
    .collect();
  let nodes: Vec<HierarchyNode> = rows.iter().map(|(_, node)| node.clone()).collect();
  let timeout = Duration::from_millis(cli.timeout_ms);

  let handler = Arc::new(ModelVisibilityHandler::from_config(&config.model));
  let telemetry = |usage: &FeatureUsage| {
    log::info!(
      "feature used: {} (interaction: {})",
      usage.feature_id,
      usage.report_interaction
    );
  };
  let cache = VisibilityCache::with_options(handler.clone(), config.cache, Arc::new(telemetry));

  if !cache.settle(&nodes, timeout).await {
    log::warn!("some statuses did not resolve within {timeout:?}");
  }

  for click in &cli.clicks {
    let node = tree
      .find(&click.id)
      .with_context(|| format!("no node with id {:?}", click.id))?
      .to_hierarchy_node();
    let applied = handler.change_calls();
    log::info!("clicking {} {}", node.id, if click.on { "on" } else { "off" });
    cache.on_checkbox_clicked(&node, click.on);

    let changed = tokio::time::timeout(timeout, async {
      while handler.change_calls() == applied {
        tokio::time::sleep(Duration::from_millis(1)).await;
      }
    })
    .await;
    if changed.is_err() {
      log::warn!("change of {} not applied within {timeout:?}", node.id);
    }
    if !cache.settle(&nodes, timeout).await {
      log::warn!("some statuses did not resolve within {timeout:?}");
    }
  }

  let stdout = std::io::stdout();
  let mut out = stdout.lock();
  render::render(&mut out, &cache, &rows)?;
  out.flush()?;

  log::debug!(
    "{} lookups, {} changes",
    handler.status_calls(),
    handler.change_calls()
  );
  cache.dispose();
  Ok(())
}
