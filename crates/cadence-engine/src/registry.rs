//! Session-owned registries guarding concurrent executions.
//!
//! Both registries hold weak references so a dropped execution never
//! pins itself in the map. Stream executions are additionally removed
//! eagerly on close; checklist executions rely purely on the weak
//! semantics, which is what allows reopening a closed checklist.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tracing::info;

use crate::checklist::ChecklistExecution;
use crate::error::EngineError;
use crate::execution::StreamExecution;

/// Enforces at most one live execution per stream name.
#[derive(Debug, Default)]
pub(crate) struct ExecutionRegistry {
  inner: Mutex<HashMap<String, Weak<StreamExecution>>>,
}

impl ExecutionRegistry {
  /// Insert `execution` under `name`, failing if a live instance is
  /// already registered. A dead weak entry does not count as live.
  pub(crate) fn register(
    &self,
    name: &str,
    execution: &Arc<StreamExecution>,
  ) -> Result<(), EngineError> {
    let mut inner = self.inner.lock().unwrap();
    if let Some(existing) = inner.get(name) {
      if existing.upgrade().is_some() {
        return Err(EngineError::DuplicateExecution(name.to_string()));
      }
    }
    inner.insert(name.to_string(), Arc::downgrade(execution));
    info!(stream = %name, "registered stream execution");
    Ok(())
  }

  pub(crate) fn unregister(&self, name: &str) {
    self.inner.lock().unwrap().remove(name);
    info!(stream = %name, "unregistered stream execution");
  }

  pub(crate) fn get(&self, name: &str) -> Option<Arc<StreamExecution>> {
    self.inner.lock().unwrap().get(name).and_then(Weak::upgrade)
  }

  /// Names with a live instance, pruning dead entries as a side effect.
  pub(crate) fn live_names(&self) -> Vec<String> {
    let mut inner = self.inner.lock().unwrap();
    inner.retain(|_, weak| weak.upgrade().is_some());
    inner.keys().cloned().collect()
  }
}

/// Tracks open checklist executions by checklist name.
#[derive(Debug, Default)]
pub(crate) struct ChecklistRegistry {
  inner: Mutex<HashMap<String, Weak<ChecklistExecution>>>,
}

impl ChecklistRegistry {
  pub(crate) fn register(
    &self,
    name: &str,
    execution: &Arc<ChecklistExecution>,
  ) -> Result<(), EngineError> {
    let mut inner = self.inner.lock().unwrap();
    if let Some(existing) = inner.get(name) {
      if existing.upgrade().is_some() {
        return Err(EngineError::ChecklistOpen(name.to_string()));
      }
    }
    inner.insert(name.to_string(), Arc::downgrade(execution));
    info!(checklist = %name, "opened checklist");
    Ok(())
  }

  pub(crate) fn get(&self, name: &str) -> Option<Arc<ChecklistExecution>> {
    self.inner.lock().unwrap().get(name).and_then(Weak::upgrade)
  }
}
