//! One stream: an ordered sequence of tasks plus display settings.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{info, warn};

use cadence_document::{NAME_RULES, get_bool, get_str, is_name_ok};

use crate::error::RecipeError;
use crate::task::Task;

/// An ordered sequence of tasks representing one concurrent thread of
/// guided activity. Tasks live in an arena (`Vec` in declaration order);
/// next/previous navigation is index arithmetic, so there are no
/// reference cycles to manage.
#[derive(Debug, Clone)]
pub struct Stream {
  pub name: String,
  pub title: String,
  /// The `DisplayColumn` setting as declared; metadata only.
  pub display_column: Option<String>,
  /// Numeric layout column assigned at build time (go stream = 1).
  pub column: u32,
  pub countdown: bool,
  /// Raw document subtree; consumed by task resolution.
  doc: Value,
  pub tasks: Vec<Task>,
  task_index: HashMap<String, usize>,
  resolved_tasks: bool,
  resolved_triggers: bool,
}

impl Stream {
  pub(crate) fn from_document(name: &str, body: &Value) -> Result<Self, RecipeError> {
    if !is_name_ok(name) {
      return Err(RecipeError::InvalidStreamName {
        name: name.to_string(),
        rules: NAME_RULES,
      });
    }
    if !body.is_object() {
      return Err(RecipeError::InvalidStreamBody(name.to_string()));
    }

    let title = get_str(body, "Settings", Some("Title"), name).value;
    let display_column_text = get_str(body, "Settings", Some("DisplayColumn"), "").value;
    let display_column = if display_column_text.is_empty() {
      None
    } else {
      Some(display_column_text)
    };
    let countdown = get_bool(body, "Settings", Some("CountDown"), true).value;

    Ok(Self {
      name: name.to_string(),
      title,
      display_column,
      column: 0,
      countdown,
      doc: body.clone(),
      tasks: Vec::new(),
      task_index: HashMap::new(),
      resolved_tasks: false,
      resolved_triggers: false,
    })
  }

  /// Phase 1: construct this stream's tasks from its document subtree
  /// in declaration order. Idempotent; a second call is a no-op.
  ///
  /// Duplicate task names and non-object task bodies are dropped with a
  /// warning; one bad entry never stops the rest of the stream.
  pub(crate) fn resolve_tasks(&mut self) -> Vec<String> {
    if self.resolved_tasks {
      return Vec::new();
    }
    let doc = std::mem::take(&mut self.doc);
    let entries: Vec<(String, Value)> = doc
      .as_object()
      .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
      .unwrap_or_default();
    self.resolve_task_entries(entries)
  }

  fn resolve_task_entries(&mut self, entries: Vec<(String, Value)>) -> Vec<String> {
    let mut warnings = Vec::new();
    for (task_name, body) in entries {
      if task_name == "Settings" {
        continue;
      }
      if self.task_index.contains_key(&task_name) {
        let warning = format!(
          "task '{}' in stream '{}' is duplicated; only the first occurrence is kept",
          task_name, self.name
        );
        warn!(warning = %warning, "dropping duplicate task");
        warnings.push(warning);
        continue;
      }
      if !body.is_object() {
        let warning = format!(
          "task '{}' in stream '{}' is not an object; ignoring",
          task_name, self.name
        );
        warn!(warning = %warning, "dropping malformed task");
        warnings.push(warning);
        continue;
      }
      let task = Task::from_document(&task_name, &body, &self.name, &mut warnings);
      self.task_index.insert(task_name.clone(), self.tasks.len());
      self.tasks.push(task);
      info!(stream = %self.name, task = %task_name, "added task");
    }
    self.resolved_tasks = true;
    warnings
  }

  /// Phase 2: turn declared trigger names into stream indices, using
  /// the recipe's full name-to-index map. Idempotent.
  ///
  /// Unknown targets and repeat triggers to the same target within this
  /// stream produce warnings; valid links are applied regardless.
  pub(crate) fn resolve_triggers(&mut self, stream_index: &HashMap<String, usize>) -> Vec<String> {
    if self.resolved_triggers {
      return Vec::new();
    }
    let mut warnings = Vec::new();
    // Target name -> name of the task that first triggered it.
    let mut seen: HashMap<String, String> = HashMap::new();
    let stream_name = self.name.clone();

    for task in &mut self.tasks {
      let target_names = task.trigger_names.clone();
      for target_name in &target_names {
        match stream_index.get(target_name) {
          None => {
            let warning = format!(
              "unknown stream '{}' in task '{}/{}'",
              target_name, stream_name, task.name
            );
            warn!(warning = %warning, "dangling trigger");
            warnings.push(warning);
          }
          Some(&target) => {
            if let Some(first) = seen.get(target_name) {
              let warning = format!(
                "duplicate trigger for stream '{}' within stream '{}' in task '{}'; first trigger was in task '{}'",
                target_name, stream_name, task.name, first
              );
              warn!(warning = %warning, "dropping duplicate trigger");
              warnings.push(warning);
            } else {
              seen.insert(target_name.clone(), task.name.clone());
              info!(
                task = %task.fullname,
                target = %target_name,
                "linked trigger"
              );
              task.triggers.push(target);
            }
          }
        }
      }
    }
    self.resolved_triggers = true;
    warnings
  }

  /// Index of the first task, if the stream has any.
  pub fn first_task(&self) -> Option<usize> {
    if self.tasks.is_empty() { None } else { Some(0) }
  }

  /// The task after `index` in declaration order.
  pub fn task_after(&self, index: usize) -> Option<usize> {
    let next = index + 1;
    if next < self.tasks.len() { Some(next) } else { None }
  }

  /// The task before `index` in declaration order.
  pub fn task_before(&self, index: usize) -> Option<usize> {
    index.checked_sub(1)
  }

  pub fn task_position(&self, name: &str) -> Option<usize> {
    self.task_index.get(name).copied()
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn eggs_stream() -> Stream {
    let body = json!({
      "Settings": {"Title": "Eggs", "DisplayColumn": "Left", "CountDown": true},
      "Boil": {"Title": "Boil kettle", "DurationSeconds": 120},
      "PlaceEggs": {"DurationSeconds": 60, "Trigger": "ToastStream"},
      "RemoveEggs": {"DurationSeconds": 45}
    });
    Stream::from_document("EggsStream", &body).unwrap()
  }

  #[test]
  fn test_settings_are_parsed() {
    let stream = eggs_stream();
    assert_eq!(stream.title, "Eggs");
    assert_eq!(stream.display_column.as_deref(), Some("Left"));
    assert!(stream.countdown);
  }

  #[test]
  fn test_resolve_tasks_keeps_declaration_order() {
    let mut stream = eggs_stream();
    let warnings = stream.resolve_tasks();
    assert!(warnings.is_empty());
    let names: Vec<&str> = stream.tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Boil", "PlaceEggs", "RemoveEggs"]);
    assert_eq!(stream.first_task(), Some(0));
    assert_eq!(stream.task_after(0), Some(1));
    assert_eq!(stream.task_after(2), None);
    assert_eq!(stream.task_before(0), None);
    assert_eq!(stream.task_before(2), Some(1));
  }

  #[test]
  fn test_resolve_tasks_is_idempotent() {
    let mut stream = eggs_stream();
    stream.resolve_tasks();
    let second = stream.resolve_tasks();
    assert!(second.is_empty());
    assert_eq!(stream.tasks.len(), 3);
  }

  #[test]
  fn test_duplicate_task_kept_once_with_warning() {
    let mut stream = Stream::from_document("S", &json!({})).unwrap();
    let entries = vec![
      ("Boil".to_string(), json!({"DurationSeconds": 10})),
      ("Boil".to_string(), json!({"DurationSeconds": 99})),
      ("Serve".to_string(), json!({})),
    ];
    let warnings = stream.resolve_task_entries(entries);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("duplicated"));
    assert_eq!(stream.tasks.len(), 2);
    assert_eq!(stream.tasks[0].name, "Boil");
    assert_eq!(stream.tasks[0].duration, 10);
    assert_eq!(stream.task_position("Serve"), Some(1));
  }

  #[test]
  fn test_non_object_task_body_is_skipped() {
    let mut stream = Stream::from_document("S", &json!({})).unwrap();
    let entries = vec![
      ("Good".to_string(), json!({})),
      ("Bad".to_string(), json!("not an object")),
    ];
    let warnings = stream.resolve_task_entries(entries);
    assert_eq!(warnings.len(), 1);
    assert_eq!(stream.tasks.len(), 1);
  }

  #[test]
  fn test_trigger_resolution_warns_on_unknown_and_duplicate() {
    let body = json!({
      "A": {"Trigger": "Known"},
      "B": {"Trigger": ["Known", "Missing"]}
    });
    let mut stream = Stream::from_document("S", &body).unwrap();
    stream.resolve_tasks();

    let mut index = HashMap::new();
    index.insert("Known".to_string(), 3usize);

    let warnings = stream.resolve_triggers(&index);
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().any(|w| w.contains("duplicate trigger")));
    assert!(warnings.iter().any(|w| w.contains("unknown stream 'Missing'")));
    assert_eq!(stream.tasks[0].triggers, vec![3]);
    assert!(stream.tasks[1].triggers.is_empty());
  }
}
