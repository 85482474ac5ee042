//! Execution events and notifiers for observability.
//!
//! Events are emitted as executions move through their state machines
//! so consumers can observe progress, persist state, or drive a UI.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during recipe execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// A stream execution has started ticking.
  StreamStarted { execution_id: String, stream: String },

  /// A stream execution finished its final task.
  StreamCompleted { execution_id: String, stream: String },

  /// A task became the current task of a stream execution.
  TaskStarted {
    execution_id: String,
    stream: String,
    task: String,
  },

  /// The current task was marked done.
  TaskCompleted {
    execution_id: String,
    stream: String,
    task: String,
  },

  /// A task's timer ran out and an alert was raised.
  OverrunAlert {
    execution_id: String,
    stream: String,
    task: String,
    message: String,
  },

  /// A task's trigger started a new stream execution.
  TriggerFired {
    execution_id: String,
    stream: String,
    target: String,
  },

  /// A task's trigger could not start its target stream.
  TriggerFailed {
    execution_id: String,
    stream: String,
    target: String,
    error: String,
  },
}

/// Trait for receiving execution events.
///
/// The engine calls `notify` for each event; implementations decide
/// what to do with them (persist, broadcast, log, ignore).
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {
    // Intentionally empty
  }
}

/// A notifier that sends events to an unbounded channel.
///
/// Unbounded so a slow consumer never blocks a tick; the event volume
/// is a handful per task transition.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self { sender }, receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Ignore send errors; the receiver may have been dropped.
    let _ = self.sender.send(event);
  }
}
