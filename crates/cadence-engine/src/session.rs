//! The execution session: everything shared across running streams.
//!
//! A session owns the built recipe, the speaker and notifier sinks, the
//! duplicate-execution registries, and the live board of per-task
//! clocks. Nothing here is process-global; two sessions are fully
//! independent, which is also what keeps tests hermetic.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cadence_recipe::{BuildState, Recipe};
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::checklist::ChecklistExecution;
use crate::error::EngineError;
use crate::events::ExecutionNotifier;
use crate::execution::{ExecStatus, StreamExecution};
use crate::live::{LiveRecord, TaskKey};
use crate::registry::{ChecklistRegistry, ExecutionRegistry};
use crate::speaker::Speaker;

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
  /// Seconds deducted per one-second wall-clock tick. Values above 1
  /// fast-forward a rehearsal run.
  pub tick_size: i64,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self { tick_size: 1 }
  }
}

pub(crate) struct SessionCtx {
  pub(crate) recipe: Recipe,
  pub(crate) tick_size: i64,
  pub(crate) speaker: Arc<dyn Speaker>,
  pub(crate) notifier: Arc<dyn ExecutionNotifier>,
  pub(crate) executions: ExecutionRegistry,
  pub(crate) checklists: ChecklistRegistry,
  pub(crate) live: Mutex<HashMap<TaskKey, LiveRecord>>,
}

/// Handle to a running session. Cheap to clone; all clones share the
/// same registries and live board.
#[derive(Clone)]
pub struct Session {
  ctx: Arc<SessionCtx>,
}

impl Session {
  /// Wrap a built recipe for execution. The recipe must have gone
  /// through `build()` first.
  pub fn new(
    recipe: Recipe,
    speaker: Arc<dyn Speaker>,
    notifier: Arc<dyn ExecutionNotifier>,
    config: SessionConfig,
  ) -> Result<Self, EngineError> {
    if recipe.state() != BuildState::Built {
      return Err(EngineError::NotBuilt);
    }
    info!(recipe = %recipe.name, tick_size = config.tick_size, "session created");
    Ok(Self {
      ctx: Arc::new(SessionCtx {
        recipe,
        tick_size: config.tick_size,
        speaker,
        notifier,
        executions: ExecutionRegistry::default(),
        checklists: ChecklistRegistry::default(),
        live: Mutex::new(HashMap::new()),
      }),
    })
  }

  pub fn recipe(&self) -> &Recipe {
    &self.ctx.recipe
  }

  /// Instantiate the go stream. It waits for an explicit start or the
  /// first done press; triggered streams created later auto-start.
  pub fn start_go_stream(&self) -> Result<Arc<StreamExecution>, EngineError> {
    StreamExecution::create(&self.ctx, self.ctx.recipe.go_stream_index(), false)
  }

  /// The live execution for `stream_name`, if one exists.
  pub fn execution(&self, stream_name: &str) -> Option<Arc<StreamExecution>> {
    self.ctx.executions.get(stream_name)
  }

  /// Names of streams with a live execution.
  pub fn live_streams(&self) -> Vec<String> {
    self.ctx.executions.live_names()
  }

  pub fn open_pre_checklist(&self) -> Result<Arc<ChecklistExecution>, EngineError> {
    let checklist = self
      .ctx
      .recipe
      .pre_checklist
      .as_ref()
      .ok_or(EngineError::MissingChecklist("pre-flight"))?;
    let open = Arc::new(ChecklistExecution::new(checklist));
    self.ctx.checklists.register(&open.name, &open)?;
    Ok(open)
  }

  pub fn open_post_checklist(&self) -> Result<Arc<ChecklistExecution>, EngineError> {
    let checklist = self
      .ctx
      .recipe
      .post_checklist
      .as_ref()
      .ok_or(EngineError::MissingChecklist("post-flight"))?;
    let open = Arc::new(ChecklistExecution::new(checklist));
    self.ctx.checklists.register(&open.name, &open)?;
    Ok(open)
  }

  /// Spawn the tick driver for `execution`: one second of wall clock
  /// per tick, each tick fully applied (including any auto-advance
  /// cascade) before the next is considered. Executions started by the
  /// driven instance's triggers get their own driver automatically.
  pub fn spawn_driver(
    &self,
    execution: Arc<StreamExecution>,
    cancel: CancellationToken,
  ) -> tokio::task::JoinHandle<()> {
    tokio::spawn(self.clone().drive(execution, cancel))
  }

  // Boxed so the driver can spawn further drivers for triggered
  // streams without a recursive future type.
  fn drive(
    self,
    execution: Arc<StreamExecution>,
    cancel: CancellationToken,
  ) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
    Box::pin(async move {
      let period = Duration::from_secs(1);
      let mut ticker = interval_at(Instant::now() + period, period);
      info!(
        execution_id = %execution.execution_id,
        stream = %execution.stream_name(),
        "driver started"
      );
      loop {
        tokio::select! {
          _ = cancel.cancelled() => {
            info!(
              execution_id = %execution.execution_id,
              stream = %execution.stream_name(),
              "driver cancelled"
            );
            break;
          }
          _ = ticker.tick() => {
            let outcome = execution.tick();
            for triggered in outcome.triggered {
              self.spawn_driver(triggered, cancel.child_token());
            }
            if execution.status() == ExecStatus::Completed {
              info!(
                execution_id = %execution.execution_id,
                stream = %execution.stream_name(),
                "driver finished"
              );
              break;
            }
          }
        }
      }
    })
  }
}
