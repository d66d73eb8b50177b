//! Tri-state visibility cache backing tree checkboxes.
//!
//! Reads never wait: an unknown node gets a disabled placeholder and a
//! background lookup, a stale node gets its last known status and a refresh.
//! Lookups for the same node are deduplicated within an epoch, and every
//! invalidation starts a new epoch whose predecessors' results are dropped
//! when they arrive.

use std::{
  sync::Arc,
  time::Duration,
};

use hashbrown::{
  HashMap,
  HashSet,
};
use parking_lot::Mutex;
use tokio::sync::{
  mpsc,
  watch,
};
use vistree_event::{
  AsyncHook,
  ListenerHandle,
  try_send,
};

use crate::{
  config::CacheConfig,
  handler::VisibilityHandler,
  node::{
    HierarchyNode,
    NodeId,
  },
  request::{
    RequestHook,
    VisibilityRequest,
  },
  status::{
    CheckboxState,
    VisibilityState,
    VisibilityStatus,
  },
  telemetry::{
    FeatureUsage,
    NoopTelemetry,
    TelemetrySink,
    VISIBILITY_CHANGE_FEATURE,
  },
};


/// The checkbox surface a tree view binds to.
pub trait TreeCheckbox {
  fn get_checkbox_state(&self, node: &HierarchyNode) -> CheckboxState;
  fn on_checkbox_clicked(&self, node: &HierarchyNode, checked: bool);
  fn trigger_refresh(&self);
}

/// Snapshot of a cached entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedStatus {
  pub node:          HierarchyNode,
  pub status:        VisibilityStatus,
  /// Set after an invalidation until a fresh lookup replaces the status.
  pub needs_refresh: bool,
}

struct VisibilityEntry {
  node:          HierarchyNode,
  status:        VisibilityStatus,
  needs_refresh: bool,
}

/// A handler together with the request hook and change listener bound to it.
struct Session {
  handler:  Arc<dyn VisibilityHandler>,
  requests: mpsc::Sender<VisibilityRequest>,
  listener: ListenerHandle,
}

impl Session {
  fn start(inner: &Arc<CacheInner>, handler: Arc<dyn VisibilityHandler>) -> Self {
    let requests = RequestHook::new(
      Arc::downgrade(inner),
      handler.clone(),
      inner.config.request_debounce(),
    )
    .spawn_with_capacity(inner.config.request_channel_capacity);

    let cache = Arc::downgrade(inner);
    let listener = handler.on_visibility_change().add_listener(move || {
      if let Some(cache) = cache.upgrade() {
        log::debug!("visibility changed externally, invalidating cache");
        cache.invalidate_all();
      }
    });

    Self {
      handler,
      requests,
      listener,
    }
  }

  fn close(self) {
    let Session {
      handler,
      requests,
      listener,
    } = self;
    // closing the channel stops the request hook
    drop(requests);
    listener.remove();
    handler.dispose();
  }
}

struct State {
  alive:     bool,
  epoch:     u64,
  entries:   HashMap<NodeId, VisibilityEntry>,
  /// Nodes already requested in the current epoch.
  requested: HashSet<NodeId>,
  session:   Option<Session>,
}

impl State {
  fn request(&mut self, node: &HierarchyNode) {
    if !self.alive || self.requested.contains(&node.id) {
      return;
    }
    let Some(session) = &self.session else {
      return;
    };

    let request = VisibilityRequest {
      node:  node.clone(),
      epoch: self.epoch,
    };
    if try_send(&session.requests, request) {
      self.requested.insert(node.id.clone());
    } else {
      log::debug!("status request for {} dropped, will retry on next read", node.id);
    }
  }

  fn advance_epoch(&mut self) {
    self.epoch = self.epoch.wrapping_add(1);
    self.requested.clear();
  }
}

pub(crate) struct CacheInner {
  state:     Mutex<State>,
  revision:  watch::Sender<u64>,
  telemetry: Arc<dyn TelemetrySink>,
  config:    CacheConfig,
}

impl CacheInner {
  fn notify(&self) {
    self
      .revision
      .send_modify(|revision| *revision = revision.wrapping_add(1));
  }

  pub(crate) fn is_current(&self, epoch: u64) -> bool {
    let state = self.state.lock();
    state.alive && state.epoch == epoch
  }

  /// Apply a finished lookup, unless the cache moved on since it was
  /// requested.
  pub(crate) fn complete(
    &self,
    request: VisibilityRequest,
    result: anyhow::Result<VisibilityStatus>,
  ) {
    let VisibilityRequest { node, epoch } = request;
    let mut state = self.state.lock();
    if !state.alive {
      log::trace!("cache disposed, ignoring status for {}", node.id);
      return;
    }
    if state.epoch != epoch {
      log::trace!(
        "dropping status for {} from epoch {epoch}, current epoch is {}",
        node.id,
        state.epoch
      );
      return;
    }

    let status = match result {
      Ok(status) => status,
      Err(err) => {
        log::debug!("visibility lookup for {} failed: {err:#}", node.id);
        return;
      },
    };
    state.entries.insert(node.id.clone(), VisibilityEntry {
      node,
      status,
      needs_refresh: false,
    });
    drop(state);
    self.notify();
  }

  fn invalidate_all(&self) {
    {
      let mut state = self.state.lock();
      if !state.alive {
        return;
      }
      state.advance_epoch();
      for entry in state.entries.values_mut() {
        entry.needs_refresh = true;
      }
    }
    self.notify();
  }

  fn reset(&self) {
    {
      let mut state = self.state.lock();
      if !state.alive {
        return;
      }
      state.advance_epoch();
      state.entries.clear();
    }
    self.notify();
  }
}

/// Cached visibility status of tree nodes, resolved through a
/// [`VisibilityHandler`].
///
/// Must be created inside a tokio runtime for lookups and changes to run;
/// outside of one every read returns the placeholder.
pub struct VisibilityCache {
  inner: Arc<CacheInner>,
}

impl VisibilityCache {
  pub fn new(handler: Arc<dyn VisibilityHandler>) -> Self {
    Self::with_options(handler, CacheConfig::default(), Arc::new(NoopTelemetry))
  }

  pub fn with_options(
    handler: Arc<dyn VisibilityHandler>,
    config: CacheConfig,
    telemetry: Arc<dyn TelemetrySink>,
  ) -> Self {
    let (revision, _) = watch::channel(0);
    let inner = Arc::new(CacheInner {
      state: Mutex::new(State {
        alive:     true,
        epoch:     0,
        entries:   HashMap::new(),
        requested: HashSet::new(),
        session:   None,
      }),
      revision,
      telemetry,
      config,
    });
    let session = Session::start(&inner, handler);
    inner.state.lock().session = Some(session);
    Self { inner }
  }

  /// Checkbox state of `node` as currently known. Schedules a lookup when the
  /// node is unknown or stale.
  pub fn get_status(&self, node: &HierarchyNode) -> CheckboxState {
    let mut state = self.inner.state.lock();
    let (checkbox, needs_lookup) = match state.entries.get(&node.id) {
      None => (CheckboxState::placeholder(), true),
      Some(entry) => (CheckboxState::from(&entry.status), entry.needs_refresh),
    };
    if needs_lookup {
      state.request(node);
    }
    checkbox
  }

  /// Show or hide `node`. The cached state flips immediately while the
  /// handler applies the change in the background; a failed change is logged
  /// and not rolled back.
  pub fn set_status(&self, node: &HierarchyNode, on: bool) {
    if !self.is_alive() {
      return;
    }
    self
      .inner
      .telemetry
      .on_feature_used(&FeatureUsage::interaction(VISIBILITY_CHANGE_FEATURE));

    let updated = {
      let mut state = self.inner.state.lock();
      if !state.alive {
        return;
      }
      if let Some(session) = &state.session {
        spawn_change(session.handler.clone(), node.clone(), on);
      }

      match state.entries.get_mut(&node.id) {
        Some(entry) => {
          entry.status.state = if on {
            VisibilityState::Visible
          } else {
            VisibilityState::Hidden
          };
          entry.status.tooltip = None;
          true
        },
        None => false,
      }
    };
    if updated {
      self.inner.notify();
    }
  }

  /// Mark every entry stale and drop results of lookups still in flight.
  pub fn invalidate_all(&self) {
    self.inner.invalidate_all();
  }

  /// Forget every entry.
  pub fn reset(&self) {
    self.inner.reset();
  }

  /// Dispose the current handler and continue with `handler` on an empty
  /// cache.
  pub fn replace_handler(&self, handler: Arc<dyn VisibilityHandler>) {
    let session = Session::start(&self.inner, handler);
    let previous = {
      let mut state = self.inner.state.lock();
      if !state.alive {
        drop(state);
        session.close();
        return;
      }
      state.advance_epoch();
      state.entries.clear();
      state.session.replace(session)
    };
    if let Some(previous) = previous {
      previous.close();
    }
    self.inner.notify();
  }

  /// End the session: stop lookups, detach from the handler's change event
  /// and dispose the handler. Later calls are no-ops.
  pub fn dispose(&self) {
    let session = {
      let mut state = self.inner.state.lock();
      if !state.alive {
        return;
      }
      state.alive = false;
      state.advance_epoch();
      state.entries.clear();
      state.session.take()
    };
    if let Some(session) = session {
      session.close();
    }
  }

  pub fn is_alive(&self) -> bool {
    self.inner.state.lock().alive
  }

  pub fn epoch(&self) -> u64 {
    self.inner.state.lock().epoch
  }

  pub fn len(&self) -> usize {
    self.inner.state.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Cached entry for `id`, without scheduling anything.
  pub fn entry(&self, id: &str) -> Option<CachedStatus> {
    self.inner.state.lock().entries.get(id).map(|entry| {
      CachedStatus {
        node:          entry.node.clone(),
        status:        entry.status.clone(),
        needs_refresh: entry.needs_refresh,
      }
    })
  }

  /// Whether `id` has a status computed in the current epoch.
  pub fn is_fresh(&self, id: &str) -> bool {
    self
      .inner
      .state
      .lock()
      .entries
      .get(id)
      .is_some_and(|entry| !entry.needs_refresh)
  }

  /// Bumped whenever cached data changes; views re-render on change.
  pub fn revision(&self) -> u64 {
    *self.inner.revision.borrow()
  }

  pub fn subscribe(&self) -> watch::Receiver<u64> {
    self.inner.revision.subscribe()
  }

  /// Keep reading `nodes` until each has a status from the current epoch.
  /// Gives up after `timeout`; returns whether everything settled.
  pub async fn settle(&self, nodes: &[HierarchyNode], timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut revisions = self.subscribe();
    loop {
      revisions.mark_unchanged();
      let mut fresh = true;
      for node in nodes {
        self.get_status(node);
        fresh &= self.is_fresh(node.id.as_str());
      }
      if fresh || !self.is_alive() {
        return fresh;
      }
      match tokio::time::timeout_at(deadline, revisions.changed()).await {
        Ok(Ok(())) => {},
        Ok(Err(_)) | Err(_) => return false,
      }
    }
  }
}

impl TreeCheckbox for VisibilityCache {
  fn get_checkbox_state(&self, node: &HierarchyNode) -> CheckboxState {
    self.get_status(node)
  }

  fn on_checkbox_clicked(&self, node: &HierarchyNode, checked: bool) {
    self.set_status(node, checked)
  }

  fn trigger_refresh(&self) {
    self.invalidate_all()
  }
}

impl Drop for VisibilityCache {
  fn drop(&mut self) {
    self.dispose();
  }
}

fn spawn_change(handler: Arc<dyn VisibilityHandler>, node: HierarchyNode, on: bool) {
  let Ok(runtime) = tokio::runtime::Handle::try_current() else {
    log::warn!("no tokio runtime, visibility change for {} not applied", node.id);
    return;
  };
  runtime.spawn(async move {
    if let Err(err) = handler.change_visibility(&node, on).await {
      log::warn!("failed to change visibility of {}: {err:#}", node.id);
    }
  });
}
