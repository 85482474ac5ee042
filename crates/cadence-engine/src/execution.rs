//! Per-stream countdown state machine and trigger dispatch.

use std::sync::{Arc, Mutex};

use cadence_recipe::{Stream, Task, TaskKind};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::events::ExecutionEvent;
use crate::live::{ADJUST_STEP_SECONDS, LiveRecord, TaskKey};
use crate::session::SessionCtx;
use crate::speaker::Cue;

/// Lifecycle of one stream execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
  NotStarted,
  Running,
  Paused,
  Completed,
}

/// Derived visual band for the current task's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
  Red,
  Amber,
  Green,
  /// No band reached; the task is an attended one.
  Active,
  /// No band reached; the task runs in the background.
  Background,
}

/// Band thresholds compare against remaining time; a threshold of zero
/// disables its band.
pub(crate) fn urgency_for(remaining: i64, task: &Task) -> Urgency {
  if task.red > 0 && remaining <= task.red {
    Urgency::Red
  } else if task.amber > 0 && remaining <= task.amber {
    Urgency::Amber
  } else if task.green > 0 && remaining <= task.green {
    Urgency::Green
  } else {
    match task.kind {
      TaskKind::Active => Urgency::Active,
      TaskKind::Background => Urgency::Background,
    }
  }
}

/// Render a remaining-time value the way the countdown clock shows it.
pub fn format_remaining(remaining: i64) -> String {
  if remaining >= 60 {
    format!("{:02}:{:02}", remaining / 60, remaining % 60)
  } else if remaining <= -60 {
    let overrun = -remaining;
    format!("overrun {:02}:{:02}", overrun / 60, overrun % 60)
  } else if remaining <= 0 {
    format!("overrun {}s", remaining.abs())
  } else {
    format!("{remaining}s")
  }
}

/// What an advance produced: the stream executions its triggers
/// started, and per-target failures. One failed trigger never stops
/// its siblings, so both lists can be non-empty at once.
#[derive(Default)]
pub struct AdvanceOutcome {
  pub triggered: Vec<Arc<StreamExecution>>,
  pub failures: Vec<(String, EngineError)>,
}

/// A point-in-time view of an execution for rendering.
#[derive(Debug, Clone)]
pub struct ExecutionSnapshot {
  pub stream: String,
  pub status: ExecStatus,
  /// Name of the task the cursor sits on; `None` once the stream has
  /// completed.
  pub task: Option<String>,
  pub title_text: String,
  pub detail_text: String,
  pub steps_text: String,
  pub remaining_time: i64,
  pub urgency: Urgency,
  pub pause_count: u32,
  pub extend_count: u32,
  pub reduce_count: u32,
}

#[derive(Debug)]
struct ExecState {
  status: ExecStatus,
  current: usize,
}

/// One running instance of a stream: a cursor over the stream's tasks
/// plus a countdown for the current one.
///
/// All mutation goes through the action methods; the session's live
/// board holds the per-task clocks so a revisited task resumes where
/// it left off. Instances are created through the session, which
/// enforces the one-live-instance-per-stream guard.
pub struct StreamExecution {
  ctx: Arc<SessionCtx>,
  pub execution_id: String,
  stream: usize,
  state: Mutex<ExecState>,
}

impl StreamExecution {
  /// Register and construct an instance for `stream`. A triggered
  /// instance auto-starts; the go stream waits for an explicit start.
  pub(crate) fn create(
    ctx: &Arc<SessionCtx>,
    stream: usize,
    auto_start: bool,
  ) -> Result<Arc<Self>, EngineError> {
    let def = ctx.recipe.stream(stream);
    if def.tasks.is_empty() {
      return Err(EngineError::EmptyStream(def.name.clone()));
    }
    let execution = Arc::new(Self {
      ctx: ctx.clone(),
      execution_id: Uuid::new_v4().to_string(),
      stream,
      state: Mutex::new(ExecState {
        status: if auto_start {
          ExecStatus::Running
        } else {
          ExecStatus::NotStarted
        },
        current: 0,
      }),
    });
    ctx.executions.register(&def.name, &execution)?;
    if auto_start {
      execution.notify_stream_started();
    }
    execution.visit_task(0);
    Ok(execution)
  }

  fn stream_def(&self) -> &Stream {
    self.ctx.recipe.stream(self.stream)
  }

  pub fn stream_name(&self) -> &str {
    &self.stream_def().name
  }

  pub fn status(&self) -> ExecStatus {
    self.state.lock().unwrap().status
  }

  /// Attach or resume the live record for `task` and announce it.
  /// A revisit goes through the 30-second floor rule.
  fn visit_task(&self, task: usize) {
    let def = self.stream_def();
    let task_def = &def.tasks[task];
    let key = TaskKey {
      stream: self.stream,
      task,
    };
    {
      let mut board = self.ctx.live.lock().unwrap();
      board
        .entry(key)
        .and_modify(LiveRecord::apply_revisit_floor)
        .or_insert_with(|| LiveRecord::new(&def.title, task_def));
    }
    if !task_def.start_message.is_empty() {
      info!(
        task = %task_def.fullname,
        message = %task_def.start_message,
        "task_start_message"
      );
      self.ctx.speaker.speak(&task_def.start_message);
    }
    self.ctx.notifier.notify(ExecutionEvent::TaskStarted {
      execution_id: self.execution_id.clone(),
      stream: def.name.clone(),
      task: task_def.name.clone(),
    });
  }

  fn notify_stream_started(&self) {
    info!(
      execution_id = %self.execution_id,
      stream = %self.stream_name(),
      "stream_started"
    );
    self.ctx.notifier.notify(ExecutionEvent::StreamStarted {
      execution_id: self.execution_id.clone(),
      stream: self.stream_name().to_string(),
    });
  }

  /// Begin ticking. Only valid before the first start; a triggered
  /// instance is already running when it is handed out.
  pub fn start(&self) -> Result<(), EngineError> {
    {
      let mut state = self.state.lock().unwrap();
      if state.status != ExecStatus::NotStarted {
        return Err(EngineError::InvalidAction {
          action: "start",
          status: state.status,
        });
      }
      state.status = ExecStatus::Running;
    }
    self.notify_stream_started();
    Ok(())
  }

  pub fn pause(&self) -> Result<(), EngineError> {
    let current = {
      let mut state = self.state.lock().unwrap();
      if state.status != ExecStatus::Running {
        return Err(EngineError::InvalidAction {
          action: "pause",
          status: state.status,
        });
      }
      state.status = ExecStatus::Paused;
      state.current
    };
    let key = TaskKey {
      stream: self.stream,
      task: current,
    };
    if let Some(live) = self.ctx.live.lock().unwrap().get_mut(&key) {
      live.pause_count += 1;
    }
    info!(execution_id = %self.execution_id, stream = %self.stream_name(), "paused");
    Ok(())
  }

  pub fn resume(&self) -> Result<(), EngineError> {
    let mut state = self.state.lock().unwrap();
    if state.status != ExecStatus::Paused {
      return Err(EngineError::InvalidAction {
        action: "resume",
        status: state.status,
      });
    }
    state.status = ExecStatus::Running;
    info!(execution_id = %self.execution_id, stream = %self.stream_name(), "resumed");
    Ok(())
  }

  pub fn extend(&self) -> Result<i64, EngineError> {
    self.adjust("extend", ADJUST_STEP_SECONDS)
  }

  pub fn reduce(&self) -> Result<i64, EngineError> {
    self.adjust("reduce", -ADJUST_STEP_SECONDS)
  }

  fn adjust(&self, action: &'static str, delta: i64) -> Result<i64, EngineError> {
    let current = {
      let state = self.state.lock().unwrap();
      if state.status != ExecStatus::Running {
        return Err(EngineError::InvalidAction {
          action,
          status: state.status,
        });
      }
      state.current
    };
    let key = TaskKey {
      stream: self.stream,
      task: current,
    };
    let mut board = self.ctx.live.lock().unwrap();
    let Some(live) = board.get_mut(&key) else {
      // visit_task always precedes any action on the current task.
      warn!(stream = %self.stream_name(), task = current, "live record missing on adjust");
      return Ok(0);
    };
    live.remaining_time += delta;
    if delta > 0 {
      live.extend_count += 1;
    } else {
      live.reduce_count += 1;
    }
    info!(
      execution_id = %self.execution_id,
      stream = %self.stream_name(),
      remaining = live.remaining_time,
      action,
      "timer adjusted"
    );
    Ok(live.remaining_time)
  }

  /// The "Done / Next" action. The very first press on a not-yet
  /// started instance only starts the clock; every later press marks
  /// the current task done and advances.
  pub fn done_next(self: &Arc<Self>) -> Result<AdvanceOutcome, EngineError> {
    {
      let mut state = self.state.lock().unwrap();
      match state.status {
        ExecStatus::Completed => {
          return Err(EngineError::InvalidAction {
            action: "advance",
            status: state.status,
          });
        }
        ExecStatus::NotStarted => {
          state.status = ExecStatus::Running;
          drop(state);
          self.notify_stream_started();
          return Ok(AdvanceOutcome::default());
        }
        ExecStatus::Running | ExecStatus::Paused => {}
      }
    }
    Ok(self.advance())
  }

  /// Complete the current task: fire its triggers, then move on or
  /// finish the stream. Triggering is synchronous; every new instance
  /// exists and is registered before this returns.
  fn advance(self: &Arc<Self>) -> AdvanceOutcome {
    let current = self.state.lock().unwrap().current;
    let def = self.stream_def();
    let task_def = &def.tasks[current];
    let mut outcome = AdvanceOutcome::default();

    for &target in &task_def.triggers {
      let target_name = self.ctx.recipe.stream(target).name.clone();
      match StreamExecution::create(&self.ctx, target, true) {
        Ok(new_execution) => {
          info!(
            task = %task_def.fullname,
            target = %target_name,
            "trigger_fired"
          );
          self.ctx.notifier.notify(ExecutionEvent::TriggerFired {
            execution_id: self.execution_id.clone(),
            stream: def.name.clone(),
            target: target_name,
          });
          outcome.triggered.push(new_execution);
        }
        Err(e) => {
          error!(
            task = %task_def.fullname,
            target = %target_name,
            error = %e,
            "trigger_failed"
          );
          self.ctx.notifier.notify(ExecutionEvent::TriggerFailed {
            execution_id: self.execution_id.clone(),
            stream: def.name.clone(),
            target: target_name.clone(),
            error: e.to_string(),
          });
          outcome.failures.push((target_name, e));
        }
      }
    }

    self.ctx.notifier.notify(ExecutionEvent::TaskCompleted {
      execution_id: self.execution_id.clone(),
      stream: def.name.clone(),
      task: task_def.name.clone(),
    });

    match def.task_after(current) {
      Some(next) => {
        {
          let mut state = self.state.lock().unwrap();
          state.current = next;
          // Advancing while paused restarts the clock.
          if state.status == ExecStatus::Paused {
            state.status = ExecStatus::Running;
          }
        }
        self.visit_task(next);
      }
      None => {
        self.state.lock().unwrap().status = ExecStatus::Completed;
        info!(
          execution_id = %self.execution_id,
          stream = %def.name,
          "stream_completed"
        );
        self.ctx.notifier.notify(ExecutionEvent::StreamCompleted {
          execution_id: self.execution_id.clone(),
          stream: def.name.clone(),
        });
        if self.stream == self.ctx.recipe.go_stream_index() {
          self.ctx.speaker.cue(Cue::WorkflowComplete);
        } else {
          self.ctx.speaker.cue(Cue::StreamComplete);
        }
      }
    }
    outcome
  }

  /// Step backward to the previous task. A no-op on the first task;
  /// running/paused status is untouched either way.
  pub fn back(&self) -> Result<(), EngineError> {
    let previous = {
      let mut state = self.state.lock().unwrap();
      if state.status == ExecStatus::Completed {
        return Err(EngineError::InvalidAction {
          action: "go back",
          status: state.status,
        });
      }
      let Some(previous) = self.stream_def().task_before(state.current) else {
        info!(stream = %self.stream_name(), "already on the first task");
        return Ok(());
      };
      state.current = previous;
      previous
    };
    self.visit_task(previous);
    Ok(())
  }

  /// One clock step. Only a `Running` instance loses time; the rest
  /// are a no-op. Expiry behavior is per the current task: either an
  /// automatic advance, or an overrun alert cadence.
  pub fn tick(self: &Arc<Self>) -> AdvanceOutcome {
    let current = {
      let state = self.state.lock().unwrap();
      if state.status != ExecStatus::Running {
        return AdvanceOutcome::default();
      }
      state.current
    };
    let def = self.stream_def();
    let task_def = &def.tasks[current];
    let key = TaskKey {
      stream: self.stream,
      task: current,
    };
    let remaining = {
      let mut board = self.ctx.live.lock().unwrap();
      let Some(live) = board.get_mut(&key) else {
        warn!(stream = %def.name, task = current, "live record missing on tick");
        return AdvanceOutcome::default();
      };
      live.remaining_time -= self.ctx.tick_size;
      live.remaining_time
    };

    if task_def.autoprogress && remaining <= 0 {
      info!(task = %task_def.fullname, "timer expired; auto-advancing");
      self.ctx.speaker.cue(Cue::AutoAdvance);
      return self.advance();
    }

    if remaining == 0 && task_def.check_every_seconds > 0 {
      self.overrun_alert(def, task_def);
    } else if remaining < 0
      && task_def.check_every_seconds > 0
      && remaining % task_def.check_every_seconds == 0
    {
      self.overrun_alert(def, task_def);
    } else if remaining == 0 {
      self.overrun_no_message(def, task_def);
    }
    AdvanceOutcome::default()
  }

  fn overrun_alert(&self, def: &Stream, task_def: &Task) {
    info!(
      task = %task_def.fullname,
      message = %task_def.check_message,
      "overrun_alert"
    );
    self.ctx.speaker.speak(&task_def.check_message);
    self.ctx.notifier.notify(ExecutionEvent::OverrunAlert {
      execution_id: self.execution_id.clone(),
      stream: def.name.clone(),
      task: task_def.name.clone(),
      message: task_def.check_message.clone(),
    });
  }

  fn overrun_no_message(&self, def: &Stream, task_def: &Task) {
    let message = format!("Overrun {}", def.title);
    info!(task = %task_def.fullname, message = %message, "overrun_without_check");
    self.ctx.speaker.speak(&message);
    self.ctx.notifier.notify(ExecutionEvent::OverrunAlert {
      execution_id: self.execution_id.clone(),
      stream: def.name.clone(),
      task: task_def.name.clone(),
      message,
    });
  }

  /// Drop a completed instance from the execution registry so its
  /// stream can run again.
  pub fn close(&self) -> Result<(), EngineError> {
    {
      let state = self.state.lock().unwrap();
      if state.status != ExecStatus::Completed {
        return Err(EngineError::InvalidAction {
          action: "close",
          status: state.status,
        });
      }
    }
    self.ctx.executions.unregister(self.stream_name());
    Ok(())
  }

  pub fn remaining_time(&self) -> i64 {
    self.snapshot().remaining_time
  }

  pub fn urgency(&self) -> Urgency {
    self.snapshot().urgency
  }

  pub fn snapshot(&self) -> ExecutionSnapshot {
    let (status, current) = {
      let state = self.state.lock().unwrap();
      (state.status, state.current)
    };
    let def = self.stream_def();
    let task_def = &def.tasks[current];
    let key = TaskKey {
      stream: self.stream,
      task: current,
    };
    let live = {
      let board = self.ctx.live.lock().unwrap();
      board
        .get(&key)
        .cloned()
        .unwrap_or_else(|| LiveRecord::new(&def.title, task_def))
    };
    let task = match status {
      ExecStatus::Completed => None,
      _ => Some(task_def.name.clone()),
    };
    ExecutionSnapshot {
      stream: def.name.clone(),
      status,
      task,
      title_text: live.title_text.clone(),
      detail_text: live.detail_text.clone(),
      steps_text: live.steps_text.clone(),
      remaining_time: live.remaining_time,
      urgency: urgency_for(live.remaining_time, task_def),
      pause_count: live.pause_count,
      extend_count: live.extend_count,
      reduce_count: live.reduce_count,
    }
  }
}
