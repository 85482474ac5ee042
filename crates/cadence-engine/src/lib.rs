//! Cadence Engine
//!
//! Executes a built recipe: one countdown state machine per running
//! stream, cross-stream triggering, and the session that ties the
//! concurrent pieces together.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Session                             │
//! │  - owns the built recipe, registries and live board         │
//! │  - start_go_stream() / open_*_checklist()                   │
//! │  - spawn_driver(execution, cancel) runs the tick loop       │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StreamExecution                         │
//! │  - NotStarted/Running/Paused/Completed state machine        │
//! │  - tick() → countdown, overrun alerts, auto-advance         │
//! │  - done_next() → trigger dispatch, task cursor              │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Speaker / ExecutionNotifier                │
//! │  - side-effect sinks: speech requests, progress events      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never renders or produces audio itself; front ends plug
//! in through the [`Speaker`] and [`ExecutionNotifier`] traits.

mod checklist;
mod error;
mod events;
mod execution;
mod live;
mod registry;
mod session;
mod speaker;

pub use checklist::ChecklistExecution;
pub use error::EngineError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use execution::{
  AdvanceOutcome, ExecStatus, ExecutionSnapshot, StreamExecution, Urgency, format_remaining,
};
pub use live::{ADJUST_STEP_SECONDS, LiveRecord, REVISIT_FLOOR_SECONDS, TaskKey};
pub use session::{Session, SessionConfig};
pub use speaker::{ChannelSpeaker, Cue, NoopSpeaker, Speaker, SpeechRequest};
