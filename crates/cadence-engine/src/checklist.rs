//! Open checklist instances.

use cadence_recipe::Checklist;

const EMPTY_STEPS: &str = "[No steps defined; maybe it's obvious?]";

/// A checklist opened for display. Entirely read-only; its lifetime is
/// what matters, since the session's checklist registry holds it weakly
/// and dropping the handle is what allows reopening.
#[derive(Debug)]
pub struct ChecklistExecution {
  pub name: String,
  pub title: String,
  pub description: String,
  steps_text: String,
}

impl ChecklistExecution {
  pub(crate) fn new(checklist: &Checklist) -> Self {
    let mut steps_text = String::new();
    for group in &checklist.groups {
      steps_text.push_str(&format!("\u{2022} {}\n", group.label));
      steps_text.push_str(
        &group
          .items
          .iter()
          .map(|item| format!("  \u{2022} {item}"))
          .collect::<Vec<_>>()
          .join("\n"),
      );
      steps_text.push_str("\n\n");
    }
    if steps_text.is_empty() {
      steps_text = EMPTY_STEPS.to_string();
    }
    Self {
      name: checklist.name.clone(),
      title: checklist.title.clone(),
      description: checklist.description.clone(),
      steps_text,
    }
  }

  pub fn steps_text(&self) -> &str {
    &self.steps_text
  }
}

#[cfg(test)]
mod tests {
  use cadence_recipe::Recipe;
  use serde_json::json;

  use super::*;

  fn recipe_with_checklists() -> Recipe {
    Recipe::from_document(
      "test",
      &json!({
        "Identity": {},
        "GoStream": "Main",
        "PreFlight": {
          "Description": "Before you start",
          "Kitchen": ["Clear the counter", "Find a pan"],
          "Fridge": ["Get the eggs"]
        },
        "PostFlight": {},
        "Streams": {"Main": {"A": {}}}
      }),
    )
    .unwrap()
  }

  #[test]
  fn test_groups_render_as_nested_bullets() {
    let recipe = recipe_with_checklists();
    let open = ChecklistExecution::new(recipe.pre_checklist.as_ref().unwrap());
    assert_eq!(open.title, "PreFlight checklist");
    assert_eq!(open.description, "Before you start");
    let text = open.steps_text();
    assert!(text.starts_with("\u{2022} Kitchen\n  \u{2022} Clear the counter"));
    assert!(text.contains("\u{2022} Fridge\n  \u{2022} Get the eggs"));
  }

  #[test]
  fn test_empty_checklist_gets_placeholder() {
    let recipe = recipe_with_checklists();
    let open = ChecklistExecution::new(recipe.post_checklist.as_ref().unwrap());
    assert_eq!(open.steps_text(), EMPTY_STEPS);
  }
}
