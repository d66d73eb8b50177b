use std::sync::{
  Arc,
  Weak,
};

use hashbrown::HashMap;
use parking_lot::Mutex;

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Listeners {
  next_id: u64,
  entries: HashMap<u64, Listener>,
}

/// A registry of parameterless listeners, raised when something observed has
/// changed (for example, visibility of elements in a viewport).
///
/// Listeners are called outside the registry lock, so a listener may add or
/// remove listeners on the same event while it runs.
#[derive(Default)]
pub struct Event {
  listeners: Arc<Mutex<Listeners>>,
}

impl Event {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `listener`. It stays registered until the returned handle is
  /// dropped or [`ListenerHandle::remove`] is called.
  #[must_use = "dropping the handle removes the listener"]
  pub fn add_listener<F>(&self, listener: F) -> ListenerHandle
  where
    F: Fn() + Send + Sync + 'static,
  {
    let mut listeners = self.listeners.lock();
    let id = listeners.next_id;
    listeners.next_id += 1;
    listeners.entries.insert(id, Arc::new(listener));
    ListenerHandle {
      listeners: Arc::downgrade(&self.listeners),
      id,
    }
  }

  /// Call every registered listener.
  pub fn raise(&self) {
    let snapshot: Vec<Listener> = self.listeners.lock().entries.values().cloned().collect();
    for listener in snapshot {
      listener();
    }
  }

  pub fn listener_count(&self) -> usize {
    self.listeners.lock().entries.len()
  }

  pub fn has_listeners(&self) -> bool {
    self.listener_count() > 0
  }
}

impl std::fmt::Debug for Event {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Event")
      .field("listeners", &self.listener_count())
      .finish()
  }
}

/// Keeps a listener registered on an [`Event`].
pub struct ListenerHandle {
  listeners: Weak<Mutex<Listeners>>,
  id:        u64,
}

impl ListenerHandle {
  /// Detach the listener now.
  pub fn remove(self) {
    drop(self);
  }
}

impl Drop for ListenerHandle {
  fn drop(&mut self) {
    if let Some(listeners) = self.listeners.upgrade() {
      listeners.lock().entries.remove(&self.id);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{
    AtomicUsize,
    Ordering,
  };

  use super::*;

  #[test]
  fn raise_calls_every_listener() {
    let event = Event::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let a = {
      let calls = calls.clone();
      event.add_listener(move || {
        calls.fetch_add(1, Ordering::SeqCst);
      })
    };
    let b = {
      let calls = calls.clone();
      event.add_listener(move || {
        calls.fetch_add(10, Ordering::SeqCst);
      })
    };

    event.raise();
    assert_eq!(calls.load(Ordering::SeqCst), 11);
    assert_eq!(event.listener_count(), 2);
    drop((a, b));
  }

  #[test]
  fn removed_listener_is_not_called() {
    let event = Event::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let handle = {
      let calls = calls.clone();
      event.add_listener(move || {
        calls.fetch_add(1, Ordering::SeqCst);
      })
    };

    handle.remove();
    event.raise();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!event.has_listeners());
  }

  #[test]
  fn handle_outliving_event_is_harmless() {
    let event = Event::new();
    let handle = event.add_listener(|| {});
    drop(event);
    drop(handle);
  }
}
