//! Channel-driven background hooks with optional debouncing

use tokio::{
  sync::mpsc::{
    self,
    Sender,
    error::TrySendError,
  },
  time::Instant,
};

/// Default channel capacity for [`AsyncHook::spawn`].
pub const DEFAULT_CAPACITY: usize = 256;

/// A hook runs as a background tokio task and consumes events sent through a
/// channel. Synchronous callers (a tree render pass asking for checkbox
/// states) push events and return immediately; the hook decides whether to act
/// on each event right away or to collect them until a debounce deadline.
pub trait AsyncHook: Sync + Send + 'static + Sized {
  type Event: Sync + Send + 'static;

  /// Called for every received event. Returns the deadline at which
  /// [`AsyncHook::finish_debounce`] should run, or `None` if nothing is
  /// pending. `timeout` is the currently armed deadline, if any.
  fn handle_event(&mut self, event: Self::Event, timeout: Option<Instant>) -> Option<Instant>;

  /// Called when the debounce deadline is reached.
  fn finish_debounce(&mut self);

  fn spawn(self) -> mpsc::Sender<Self::Event> {
    self.spawn_with_capacity(DEFAULT_CAPACITY)
  }

  fn spawn_with_capacity(self, capacity: usize) -> mpsc::Sender<Self::Event> {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    // plain unit tests have no runtime; the receiver is dropped and sends fail
    if tokio::runtime::Handle::try_current().is_ok() {
      tokio::spawn(run(self, rx));
    } else {
      log::debug!("no tokio runtime, async hook not started");
    }
    tx
  }
}

async fn run<Hook: AsyncHook>(mut hook: Hook, mut rx: mpsc::Receiver<Hook::Event>) {
  let mut deadline = None;
  loop {
    let event = match deadline {
      Some(deadline_) => {
        match tokio::time::timeout_at(deadline_, rx.recv()).await {
          Ok(event) => event,
          Err(_) => {
            hook.finish_debounce();
            deadline = None;
            continue;
          },
        }
      },
      None => rx.recv().await,
    };
    let Some(event) = event else {
      // all senders dropped: flush whatever is still pending and stop
      if deadline.is_some() {
        hook.finish_debounce();
      }
      break;
    };
    deadline = hook.handle_event(event, deadline);
  }
}

/// Send an event without blocking. Returns whether the event was queued; a
/// full channel drops the event, a closed one additionally logs a warning.
///
/// Callers run on the render path and must never wait for the hook, which on
/// a single-threaded runtime could only make progress once they return.
pub fn try_send<T>(tx: &Sender<T>, data: T) -> bool {
  match tx.try_send(data) {
    Ok(()) => true,
    Err(TrySendError::Full(_)) => false,
    Err(TrySendError::Closed(_)) => {
      log::warn!("attempted to send to closed hook channel");
      false
    },
  }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::Arc,
    time::Duration,
  };

  use parking_lot::Mutex;

  use super::*;

  struct Collect {
    pending:  Vec<u32>,
    flushed:  Arc<Mutex<Vec<Vec<u32>>>>,
    debounce: Duration,
  }

  impl AsyncHook for Collect {
    type Event = u32;

    fn handle_event(&mut self, event: u32, timeout: Option<Instant>) -> Option<Instant> {
      self.pending.push(event);
      Some(timeout.unwrap_or_else(|| Instant::now() + self.debounce))
    }

    fn finish_debounce(&mut self) {
      let batch = std::mem::take(&mut self.pending);
      self.flushed.lock().push(batch);
    }
  }

  #[tokio::test(flavor = "current_thread")]
  async fn events_within_deadline_are_batched() {
    let flushed = Arc::new(Mutex::new(Vec::new()));
    let tx = Collect {
      pending:  Vec::new(),
      flushed:  flushed.clone(),
      debounce: Duration::from_millis(20),
    }
    .spawn();

    assert!(try_send(&tx, 1));
    assert!(try_send(&tx, 2));
    assert!(try_send(&tx, 3));
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(*flushed.lock(), vec![vec![1, 2, 3]]);
  }

  #[tokio::test(flavor = "current_thread")]
  async fn steady_stream_still_flushes() {
    let flushed = Arc::new(Mutex::new(Vec::new()));
    let tx = Collect {
      pending:  Vec::new(),
      flushed:  flushed.clone(),
      debounce: Duration::from_millis(30),
    }
    .spawn();

    for event in 0..10 {
      assert!(try_send(&tx, event));
      tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // a deadline pushed back by every event would not have fired yet
    let batches = flushed.lock().clone();
    assert!(batches.len() >= 2, "flushed batches: {batches:?}");
    assert!(batches.iter().all(|batch| !batch.is_empty()));
    assert_eq!(batches.concat(), (0..batches.concat().len() as u32).collect::<Vec<_>>());
  }

  #[tokio::test(flavor = "current_thread")]
  async fn closing_channel_flushes_pending_events() {
    let flushed = Arc::new(Mutex::new(Vec::new()));
    let tx = Collect {
      pending:  Vec::new(),
      flushed:  flushed.clone(),
      debounce: Duration::from_secs(60),
    }
    .spawn();

    assert!(try_send(&tx, 7));
    drop(tx);
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(*flushed.lock(), vec![vec![7]]);
  }

  #[tokio::test(flavor = "current_thread")]
  async fn full_channel_drops_event() {
    let tx = Collect {
      pending:  Vec::new(),
      flushed:  Arc::new(Mutex::new(Vec::new())),
      debounce: Duration::ZERO,
    }
    .spawn_with_capacity(1);

    // the hook cannot drain until this task yields
    assert!(try_send(&tx, 1));
    assert!(!try_send(&tx, 2));
  }

  #[test]
  fn sending_without_runtime_fails_quietly() {
    let tx = Collect {
      pending:  Vec::new(),
      flushed:  Arc::new(Mutex::new(Vec::new())),
      debounce: Duration::ZERO,
    }
    .spawn();

    assert!(!try_send(&tx, 1));
  }
}
