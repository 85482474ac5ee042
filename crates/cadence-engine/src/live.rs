//! Per-task runtime records.
//!
//! The definition model stays read-only during execution. Everything a
//! running task accumulates (remaining time, adjustment counters,
//! rendered text) lives in a session-owned map keyed by task identity,
//! so revisiting a task resumes exactly where it left off.

use cadence_recipe::Task;

/// Revisiting a nearly-expired task resets its clock up to this floor,
/// provided the original duration exceeded it.
pub const REVISIT_FLOOR_SECONDS: i64 = 30;

/// Step applied by a single extend or reduce action.
pub const ADJUST_STEP_SECONDS: i64 = 30;

/// Identity of a task within a built recipe: stream index plus task
/// position within that stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskKey {
  pub stream: usize,
  pub task: usize,
}

/// Runtime state attached to a task on first visit.
#[derive(Debug, Clone)]
pub struct LiveRecord {
  pub remaining_time: i64,
  /// Duration snapshot taken at first visit.
  pub duration: i64,
  pub extend_count: u32,
  pub reduce_count: u32,
  pub pause_count: u32,
  /// "Stream: {title}" header for the hosting stream.
  pub title_text: String,
  /// The task's own title line.
  pub detail_text: String,
  /// Description plus bulleted step list.
  pub steps_text: String,
}

impl LiveRecord {
  pub(crate) fn new(stream_title: &str, task: &Task) -> Self {
    let mut steps_text = if task.description.is_empty() {
      String::new()
    } else {
      format!("{}\n\n", task.description)
    };
    steps_text.push_str(
      &task
        .steps
        .iter()
        .map(|step| format!("\u{2022} {step}"))
        .collect::<Vec<_>>()
        .join("\n"),
    );
    Self {
      remaining_time: task.duration,
      duration: task.duration,
      extend_count: 0,
      reduce_count: 0,
      pause_count: 0,
      title_text: format!("Stream: {stream_title}"),
      detail_text: task.title.clone(),
      steps_text,
    }
  }

  /// The floor rule for revisits: a clock that has nearly (or fully)
  /// run out gets topped back up to the floor, but only when the task
  /// was sized above the floor to begin with. Short tasks keep their
  /// true remainder.
  pub(crate) fn apply_revisit_floor(&mut self) {
    if self.remaining_time < REVISIT_FLOOR_SECONDS && self.duration > REVISIT_FLOOR_SECONDS {
      self.remaining_time = REVISIT_FLOOR_SECONDS;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(remaining: i64, duration: i64) -> LiveRecord {
    LiveRecord {
      remaining_time: remaining,
      duration,
      extend_count: 0,
      reduce_count: 0,
      pause_count: 0,
      title_text: String::new(),
      detail_text: String::new(),
      steps_text: String::new(),
    }
  }

  #[test]
  fn test_floor_tops_up_nearly_expired_long_task() {
    let mut live = record(4, 300);
    live.apply_revisit_floor();
    assert_eq!(live.remaining_time, 30);

    let mut overrun = record(-12, 300);
    overrun.apply_revisit_floor();
    assert_eq!(overrun.remaining_time, 30);
  }

  #[test]
  fn test_floor_leaves_healthy_remainder_alone() {
    let mut live = record(200, 300);
    live.apply_revisit_floor();
    assert_eq!(live.remaining_time, 200);
  }

  #[test]
  fn test_floor_skips_short_tasks() {
    let mut live = record(3, 20);
    live.apply_revisit_floor();
    assert_eq!(live.remaining_time, 3);
  }
}
