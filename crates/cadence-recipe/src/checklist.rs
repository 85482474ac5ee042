//! Pre-flight and post-flight checklists.
//!
//! A checklist is an untimed, flat list of labeled bullet groups; it
//! never owns tasks and takes no part in graph resolution.

use serde_json::Value;
use tracing::error;

use cadence_document::{NAME_RULES, get_str, get_str_list, is_name_ok};

use crate::error::RecipeError;

/// One labeled bullet group inside a checklist.
#[derive(Debug, Clone)]
pub struct ChecklistGroup {
  pub label: String,
  pub items: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Checklist {
  pub name: String,
  pub title: String,
  pub description: String,
  /// Groups in declaration order, one per document key except
  /// `Description`.
  pub groups: Vec<ChecklistGroup>,
}

impl Checklist {
  pub(crate) fn from_document(name: &str, body: &Value) -> Result<Self, RecipeError> {
    if !is_name_ok(name) {
      error!(name, "invalid checklist name");
      return Err(RecipeError::InvalidChecklistName {
        name: name.to_string(),
        rules: NAME_RULES,
      });
    }
    let description = get_str(body, "Description", None, &format!("This is the {}", name)).value;

    let mut groups = Vec::new();
    if let Some(map) = body.as_object() {
      for key in map.keys() {
        if key == "Description" {
          continue;
        }
        let items = get_str_list(body, key, None, &[]).value;
        groups.push(ChecklistGroup {
          label: key.clone(),
          items,
        });
      }
    }

    Ok(Self {
      name: name.to_string(),
      title: name.replace('_', " "),
      description,
      groups,
    })
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_groups_preserve_order_and_skip_description() {
    let body = json!({
      "Description": "Before you start",
      "Kitchen": ["Clear the counter", "Find the spatula"],
      "Safety": ["Oven gloves nearby"]
    });
    let checklist = Checklist::from_document("PreFlight_checklist", &body).unwrap();
    assert_eq!(checklist.description, "Before you start");
    assert_eq!(checklist.groups.len(), 2);
    assert_eq!(checklist.groups[0].label, "Kitchen");
    assert_eq!(checklist.groups[0].items.len(), 2);
    assert_eq!(checklist.groups[1].label, "Safety");
  }

  #[test]
  fn test_invalid_name_is_fatal() {
    assert!(Checklist::from_document("no spaces allowed", &json!({})).is_err());
  }

  #[test]
  fn test_description_defaults_to_checklist_name() {
    let checklist = Checklist::from_document("PostFlight_checklist", &json!({})).unwrap();
    assert_eq!(checklist.description, "This is the PostFlight_checklist");
    assert!(checklist.groups.is_empty());
  }
}
