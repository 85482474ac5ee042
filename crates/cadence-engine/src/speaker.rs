//! The speech sink.
//!
//! The engine never produces audio itself; it hands text and fixed cues
//! to a [`Speaker`] and moves on. Implementations decide what a spoken
//! message or a cue actually sounds like.

use tokio::sync::mpsc;

/// Fixed non-verbal cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
  /// A stream finished its last task.
  StreamComplete,
  /// The go stream finished; the whole workflow is done.
  WorkflowComplete,
  /// A task auto-progressed on expiry.
  AutoAdvance,
}

pub trait Speaker: Send + Sync {
  fn speak(&self, text: &str);
  fn cue(&self, cue: Cue);
}

/// Discards everything. Useful for tests and non-audio front ends.
#[derive(Debug, Clone, Default)]
pub struct NoopSpeaker;

impl Speaker for NoopSpeaker {
  fn speak(&self, _text: &str) {}
  fn cue(&self, _cue: Cue) {}
}

/// One speech request, as sent to a [`ChannelSpeaker`] consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechRequest {
  Say(String),
  Cue(Cue),
}

/// Forwards requests to an unbounded channel so a consumer can render
/// them asynchronously. Unbounded so a slow consumer never stalls a
/// tick; the volume is a few messages per task.
#[derive(Debug, Clone)]
pub struct ChannelSpeaker {
  sender: mpsc::UnboundedSender<SpeechRequest>,
}

impl ChannelSpeaker {
  pub fn new() -> (Self, mpsc::UnboundedReceiver<SpeechRequest>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self { sender }, receiver)
  }
}

impl Speaker for ChannelSpeaker {
  fn speak(&self, text: &str) {
    // Ignore send errors; the receiver may have been dropped.
    let _ = self.sender.send(SpeechRequest::Say(text.to_string()));
  }

  fn cue(&self, cue: Cue) {
    let _ = self.sender.send(SpeechRequest::Cue(cue));
  }
}
