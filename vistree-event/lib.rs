//! Event plumbing for the visibility cache: debounced async hooks driven by a
//! channel, and listener registries for synchronous change notifications.

mod debounce;
mod listener;

pub use debounce::{
  AsyncHook,
  DEFAULT_CAPACITY,
  try_send,
};
pub use listener::{
  Event,
  ListenerHandle,
};
