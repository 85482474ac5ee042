//! One timed, orderable unit of work within a stream.

use serde_json::Value;
use tracing::info;

use cadence_document::{get_bool, get_int, get_str, get_str_list};

/// Default shown when a task declares no steps of its own.
const PLACEHOLDER_STEP: &str = "No action needed here!";

/// Interval substituted when a check message is declared without one.
const DEFAULT_CHECK_INTERVAL: i64 = 60;

/// Message substituted when a check interval is declared without one.
const DEFAULT_CHECK_MESSAGE: &str = "Check";

/// Whether a task demands the operator's attention or just runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
  Active,
  Background,
}

/// How much is at risk if this task goes wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stakes {
  Low,
  Medium,
  High,
}

/// One task definition. Immutable once its stream finishes resolution;
/// execution-time state lives in the engine, never here.
#[derive(Debug, Clone)]
pub struct Task {
  pub name: String,
  /// Name qualified by the owning stream, for diagnostics only.
  pub fullname: String,
  pub title: String,
  pub description: String,
  pub steps: Vec<String>,
  pub kind: TaskKind,
  pub stakes: Stakes,
  pub autoprogress: bool,
  /// Allotted time in seconds.
  pub duration: i64,
  pub start_message: String,
  pub check_every_seconds: i64,
  pub check_message: String,
  /// Urgency thresholds in remaining seconds; 0 disables a band.
  pub green: i64,
  pub amber: i64,
  pub red: i64,
  /// Raw trigger target names as declared in the document.
  pub trigger_names: Vec<String>,
  /// Resolved trigger targets as indices into the recipe's stream list.
  /// Filled during phase 2; empty until then.
  pub triggers: Vec<usize>,
}

impl Task {
  /// Build a task from its document subtree, normalizing the fields and
  /// pushing any content warnings onto the stream's list. The name has
  /// already passed validation at recipe construction.
  pub(crate) fn from_document(
    name: &str,
    body: &Value,
    parent: &str,
    warnings: &mut Vec<String>,
  ) -> Self {
    let fullname = if parent.is_empty() {
      name.to_string()
    } else {
      format!("{}/{}", parent, name)
    };

    let mut title = get_str(body, "Title", None, "").value;
    if title.is_empty() {
      title = name.replace('_', " ");
    }
    let description = get_str(body, "Description", None, "").value;
    let steps = get_str_list(body, "Steps", None, &[PLACEHOLDER_STEP]).value;

    let kind_text = get_str(body, "Type", None, "Background").value;
    let kind = match kind_text.as_str() {
      "Active" => TaskKind::Active,
      "Background" => TaskKind::Background,
      other => {
        warnings.push(format!(
          "task '{}' has invalid type '{}'; forcing to Background",
          fullname, other
        ));
        TaskKind::Background
      }
    };

    let stakes_text = get_str(body, "Stakes", None, "Low").value;
    let stakes = match stakes_text.as_str() {
      "Low" => Stakes::Low,
      "Medium" => Stakes::Medium,
      "High" => Stakes::High,
      other => {
        warnings.push(format!(
          "task '{}' has invalid stakes '{}'; forcing to Low",
          fullname, other
        ));
        Stakes::Low
      }
    };

    let mut autoprogress = get_bool(body, "Autoprogress", None, false).value;
    let duration = get_int(body, "DurationSeconds", None, 0).value;
    let start_message = get_str(body, "StartMessage", None, "").value;
    let mut check_every_seconds = get_int(body, "CheckEverySeconds", None, 0).value;
    let mut check_message = get_str(body, "CheckMessage", None, "").value;

    if check_every_seconds <= 0 && !check_message.is_empty() {
      check_every_seconds = DEFAULT_CHECK_INTERVAL;
      warnings.push(format!(
        "task '{}' has CheckMessage but no CheckEverySeconds; forcing to {}",
        fullname, check_every_seconds
      ));
    }
    if check_every_seconds > 0 && check_message.is_empty() {
      check_message = DEFAULT_CHECK_MESSAGE.to_string();
      warnings.push(format!(
        "task '{}' has CheckEverySeconds of {} but no CheckMessage; forcing to '{}'",
        fullname, check_every_seconds, check_message
      ));
    }
    // Autoprogress completes the task at zero; a periodic check only
    // makes sense for a task that can overrun. The two cannot coexist.
    if autoprogress && check_every_seconds > 0 {
      autoprogress = false;
      warnings.push(format!(
        "task '{}' has CheckEverySeconds of {} AND Autoprogress set; forcing Autoprogress off",
        fullname, check_every_seconds
      ));
    }

    let green = get_int(body, "Green", None, 0).value;
    let amber = get_int(body, "Amber", None, 0).value;
    let red = get_int(body, "Red", None, 0).value;

    let trigger_names = get_str_list(body, "Trigger", None, &[]).value;
    if !trigger_names.is_empty() {
      info!(task = %fullname, triggers = ?trigger_names, "task declares triggers");
    }

    Self {
      name: name.to_string(),
      fullname,
      title,
      description,
      steps,
      kind,
      stakes,
      autoprogress,
      duration,
      start_message,
      check_every_seconds,
      check_message,
      green,
      amber,
      red,
      trigger_names,
      triggers: Vec::new(),
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_title_defaults_to_name_with_spaces() {
    let mut warnings = Vec::new();
    let task = Task::from_document("Boil_Kettle", &json!({}), "Eggs", &mut warnings);
    assert_eq!(task.title, "Boil Kettle");
    assert_eq!(task.fullname, "Eggs/Boil_Kettle");
    assert_eq!(task.steps, vec![PLACEHOLDER_STEP.to_string()]);
  }

  #[test]
  fn test_invalid_kind_and_stakes_coerce_with_warning() {
    let mut warnings = Vec::new();
    let task = Task::from_document(
      "t",
      &json!({"Type": "Loud", "Stakes": "Extreme"}),
      "s",
      &mut warnings,
    );
    assert_eq!(task.kind, TaskKind::Background);
    assert_eq!(task.stakes, Stakes::Low);
    assert_eq!(warnings.len(), 2);
  }

  #[test]
  fn test_check_message_without_interval_gets_sixty_seconds() {
    let mut warnings = Vec::new();
    let task = Task::from_document("t", &json!({"CheckMessage": "Water OK?"}), "s", &mut warnings);
    assert_eq!(task.check_every_seconds, 60);
    assert_eq!(task.check_message, "Water OK?");
    assert_eq!(warnings.len(), 1);
  }

  #[test]
  fn test_check_interval_without_message_gets_default_message() {
    let mut warnings = Vec::new();
    let task = Task::from_document("t", &json!({"CheckEverySeconds": 45}), "s", &mut warnings);
    assert_eq!(task.check_every_seconds, 45);
    assert_eq!(task.check_message, "Check");
  }

  #[test]
  fn test_autoprogress_and_check_are_mutually_exclusive() {
    let mut warnings = Vec::new();
    let task = Task::from_document(
      "t",
      &json!({"Autoprogress": true, "CheckEverySeconds": 45}),
      "s",
      &mut warnings,
    );
    assert!(!task.autoprogress);
    assert_eq!(task.check_every_seconds, 45);
    assert!(warnings.iter().any(|w| w.contains("Autoprogress")));
  }

  #[test]
  fn test_single_trigger_string_becomes_namelist() {
    let mut warnings = Vec::new();
    let task = Task::from_document("t", &json!({"Trigger": "ToastStream"}), "s", &mut warnings);
    assert_eq!(task.trigger_names, vec!["ToastStream".to_string()]);
    assert!(task.triggers.is_empty());
  }
}
