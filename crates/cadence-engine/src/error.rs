use thiserror::Error;

use crate::execution::ExecStatus;

/// Errors raised by execution-time operations.
#[derive(Debug, Error)]
pub enum EngineError {
  /// The one-live-instance-per-stream guard. The existing instance is
  /// left untouched.
  #[error("a live execution for stream '{0}' already exists")]
  DuplicateExecution(String),

  #[error("checklist '{0}' is already open")]
  ChecklistOpen(String),

  #[error("recipe has no {0} checklist")]
  MissingChecklist(&'static str),

  #[error("recipe has not been built")]
  NotBuilt,

  #[error("stream '{0}' has no tasks to execute")]
  EmptyStream(String),

  #[error("cannot {action} while {status:?}")]
  InvalidAction {
    action: &'static str,
    status: ExecStatus,
  },
}
