//! Background resolution of visibility status requests.

use std::{
  sync::{
    Arc,
    Weak,
  },
  time::Duration,
};

use tokio::time::Instant;
use vistree_event::AsyncHook;

use crate::{
  cache::CacheInner,
  handler::VisibilityHandler,
  node::HierarchyNode,
};

pub(crate) const DEFAULT_CHANNEL_CAPACITY: usize = vistree_event::DEFAULT_CAPACITY;

/// A node whose status should be looked up, tagged with the cache epoch it
/// was requested in.
#[derive(Debug)]
pub(crate) struct VisibilityRequest {
  pub node:  HierarchyNode,
  pub epoch: u64,
}

/// Starts one lookup per request, either immediately or in batches once the
/// debounce deadline passes.
pub(crate) struct RequestHook {
  cache:    Weak<CacheInner>,
  handler:  Arc<dyn VisibilityHandler>,
  debounce: Duration,
  pending:  Vec<VisibilityRequest>,
}

impl RequestHook {
  pub fn new(
    cache: Weak<CacheInner>,
    handler: Arc<dyn VisibilityHandler>,
    debounce: Duration,
  ) -> Self {
    Self {
      cache,
      handler,
      debounce,
      pending: Vec::new(),
    }
  }
}

impl AsyncHook for RequestHook {
  type Event = VisibilityRequest;

  fn handle_event(&mut self, request: Self::Event, timeout: Option<Instant>) -> Option<Instant> {
    self.pending.push(request);
    if self.debounce.is_zero() {
      self.finish_debounce();
      return None;
    }
    // keep the armed deadline so a steady trickle of requests still flushes
    Some(timeout.unwrap_or_else(|| Instant::now() + self.debounce))
  }

  fn finish_debounce(&mut self) {
    let Some(cache) = self.cache.upgrade() else {
      self.pending.clear();
      return;
    };

    for request in self.pending.drain(..) {
      if !cache.is_current(request.epoch) {
        log::trace!(
          "skipping lookup for {} requested in expired epoch {}",
          request.node.id,
          request.epoch
        );
        continue;
      }

      let cache = Arc::downgrade(&cache);
      let handler = self.handler.clone();
      tokio::spawn(async move {
        let result = handler.get_visibility_status(&request.node).await;
        if let Some(cache) = cache.upgrade() {
          cache.complete(request, result);
        }
      });
    }
  }
}
