//! The recipe aggregate: streams, checklists, and the two-phase build.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde_json::Value;
use tracing::{error, info, warn};

use cadence_document::{NAME_RULES, get_str, is_name_ok};

use crate::checklist::Checklist;
use crate::error::RecipeError;
use crate::stream::Stream;

const MANDATORY_SECTIONS: [&str; 5] = ["Identity", "GoStream", "PreFlight", "PostFlight", "Streams"];

/// Build state of the aggregate: `Init -> Built`, one way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
  Init,
  Built,
}

/// The aggregate root: the full stream set, the entry ("go") stream, and
/// the optional pre/post checklists.
///
/// Construction performs the fatal checks; [`Recipe::build`] performs
/// the two linking phases and returns recoverable problems as a flat
/// warning list. After build the model is read-only.
#[derive(Debug)]
pub struct Recipe {
  pub name: String,
  /// The name the recipe was loaded under (usually a file path).
  pub invoked_name: String,
  pub go_stream_name: String,
  streams: Vec<Stream>,
  stream_index: HashMap<String, usize>,
  go_stream: usize,
  pub pre_checklist: Option<Checklist>,
  pub post_checklist: Option<Checklist>,
  state: BuildState,
}

impl Recipe {
  /// Construct the shallow model from a parsed document.
  ///
  /// Fatal here: missing mandatory sections, an unknown go stream,
  /// invalid or duplicate stream names, invalid task names, and
  /// non-object stream bodies. A malformed checklist section merely
  /// degrades to an absent checklist.
  pub fn from_document(invoked_name: &str, doc: &Value) -> Result<Self, RecipeError> {
    for section in MANDATORY_SECTIONS {
      if doc.get(section).is_none() {
        return Err(RecipeError::MissingSection(section));
      }
    }

    let go_stream_name = get_str(doc, "GoStream", None, "").value;
    let name = get_str(doc, "Identity", Some("Name"), invoked_name).value;

    let streams_doc = doc
      .get("Streams")
      .and_then(|v| v.as_object())
      .ok_or(RecipeError::InvalidStreamsSection)?;

    let (streams, stream_index) = Self::collect_streams(streams_doc.iter())?;

    let go_stream = *stream_index
      .get(&go_stream_name)
      .ok_or_else(|| RecipeError::UnknownGoStream(go_stream_name.clone()))?;

    let pre_checklist = Self::collect_checklist(doc, "PreFlight", "PreFlight_checklist")?;
    let post_checklist = Self::collect_checklist(doc, "PostFlight", "PostFlight_checklist")?;

    info!(recipe = %name, go_stream = %go_stream_name, streams = streams.len(), "recipe constructed");

    Ok(Self {
      name,
      invoked_name: invoked_name.to_string(),
      go_stream_name,
      streams,
      stream_index,
      go_stream,
      pre_checklist,
      post_checklist,
      state: BuildState::Init,
    })
  }

  fn collect_streams<'a>(
    entries: impl Iterator<Item = (&'a String, &'a Value)>,
  ) -> Result<(Vec<Stream>, HashMap<String, usize>), RecipeError> {
    let mut streams = Vec::new();
    let mut stream_index = HashMap::new();
    for (stream_name, body) in entries {
      if stream_index.contains_key(stream_name) {
        error!(stream = %stream_name, "duplicate stream name");
        return Err(RecipeError::DuplicateStream(stream_name.clone()));
      }
      let stream = Stream::from_document(stream_name, body)?;
      Self::validate_task_names(stream_name, body)?;
      stream_index.insert(stream_name.clone(), streams.len());
      streams.push(stream);
    }
    Ok((streams, stream_index))
  }

  /// Task names are part of the fatal construction contract; a key that
  /// breaks the name rule could never be addressed later.
  fn validate_task_names(stream_name: &str, body: &Value) -> Result<(), RecipeError> {
    let Some(map) = body.as_object() else {
      return Ok(());
    };
    for task_name in map.keys() {
      if task_name != "Settings" && !is_name_ok(task_name) {
        return Err(RecipeError::InvalidTaskName {
          name: task_name.clone(),
          stream: stream_name.to_string(),
          rules: NAME_RULES,
        });
      }
    }
    Ok(())
  }

  fn collect_checklist(
    doc: &Value,
    section: &str,
    checklist_name: &str,
  ) -> Result<Option<Checklist>, RecipeError> {
    match doc.get(section) {
      Some(body) if body.is_object() => Ok(Some(Checklist::from_document(checklist_name, body)?)),
      Some(_) => {
        // Section present but malformed; degrade rather than abort.
        error!(section, "checklist section is not an object; skipping");
        Ok(None)
      }
      None => Ok(None),
    }
  }

  /// Link everything up: phase 1 resolves every stream's tasks, phase 2
  /// resolves cross-stream triggers once all streams exist. Returns the
  /// aggregated warning list; recoverable issues never abort the build.
  ///
  /// A second call is a no-op with a warning.
  pub fn build(&mut self) -> Vec<String> {
    if self.state != BuildState::Init {
      warn!(recipe = %self.name, state = ?self.state, "build() called again; ignoring");
      return Vec::new();
    }
    let mut warnings = Vec::new();
    let mut affected: BTreeSet<String> = BTreeSet::new();

    self.assign_columns();

    for stream in &mut self.streams {
      let stream_warnings = stream.resolve_tasks();
      if !stream_warnings.is_empty() {
        affected.insert(stream.name.clone());
        warnings.extend(stream_warnings);
      }
    }

    // Streams only know trigger target names; the recipe owns the
    // name-to-index map, so phase 2 hands it to each stream in turn.
    let index = self.stream_index.clone();
    for stream in &mut self.streams {
      let stream_warnings = stream.resolve_triggers(&index);
      if !stream_warnings.is_empty() {
        affected.insert(stream.name.clone());
        warnings.extend(stream_warnings);
      }
    }

    if self.streams[self.go_stream].tasks.is_empty() {
      affected.insert(self.go_stream_name.clone());
      warnings.push(format!(
        "workflow '{}' is empty; go stream '{}' has no tasks",
        self.name, self.go_stream_name
      ));
    }

    self.state = BuildState::Built;
    if !affected.is_empty() {
      let names: Vec<String> = affected.into_iter().collect();
      warnings.insert(0, format!("issues in streams: {}", names.join(", ")));
    }
    info!(recipe = %self.name, warnings = warnings.len(), "recipe built");
    warnings
  }

  /// The go stream takes column 1; the rest follow declaration order.
  fn assign_columns(&mut self) {
    self.streams[self.go_stream].column = 1;
    let mut next = 2;
    for (index, stream) in self.streams.iter_mut().enumerate() {
      if index != self.go_stream {
        stream.column = next;
        next += 1;
      }
    }
  }

  /// Report streams that can never run: declared, but not the go stream
  /// and not reachable through any chain of triggers from it.
  ///
  /// Only meaningful after `build()`; before that it warns and reports
  /// nothing.
  pub fn check_for_issues(&self) -> Vec<String> {
    if self.state != BuildState::Built {
      warn!(recipe = %self.name, "check_for_issues() called before build()");
      return Vec::new();
    }
    let mut reachable = HashSet::new();
    let mut pending = vec![self.go_stream];
    while let Some(index) = pending.pop() {
      if !reachable.insert(index) {
        continue;
      }
      for task in &self.streams[index].tasks {
        pending.extend(task.triggers.iter().copied());
      }
    }
    self
      .streams
      .iter()
      .enumerate()
      .filter(|(index, _)| !reachable.contains(index))
      .map(|(_, stream)| {
        format!(
          "stream '{}' is declared but never triggered and is not the go stream",
          stream.name
        )
      })
      .collect()
  }

  pub fn state(&self) -> BuildState {
    self.state
  }

  pub fn streams(&self) -> &[Stream] {
    &self.streams
  }

  pub fn stream(&self, index: usize) -> &Stream {
    &self.streams[index]
  }

  pub fn stream_position(&self, name: &str) -> Option<usize> {
    self.stream_index.get(name).copied()
  }

  pub fn go_stream_index(&self) -> usize {
    self.go_stream
  }

  pub fn go_stream(&self) -> &Stream {
    &self.streams[self.go_stream]
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn breakfast_doc() -> Value {
    json!({
      "Identity": {"Name": "Breakfast"},
      "GoStream": "Main",
      "PreFlight": {"Kitchen": ["Clear the counter"]},
      "PostFlight": {"Kitchen": ["Wipe down"]},
      "Streams": {
        "Main": {
          "Settings": {"Title": "Main line"},
          "A": {"DurationSeconds": 10},
          "B": {"DurationSeconds": 5, "Trigger": "Side"}
        },
        "Side": {
          "C": {"DurationSeconds": 20}
        }
      }
    })
  }

  #[test]
  fn test_missing_section_is_fatal() {
    let mut doc = breakfast_doc();
    doc.as_object_mut().unwrap().remove("PostFlight");
    let err = Recipe::from_document("test", &doc).unwrap_err();
    assert!(matches!(err, RecipeError::MissingSection("PostFlight")));
  }

  #[test]
  fn test_unknown_go_stream_is_fatal() {
    let mut doc = breakfast_doc();
    doc["GoStream"] = json!("Nowhere");
    let err = Recipe::from_document("test", &doc).unwrap_err();
    assert!(matches!(err, RecipeError::UnknownGoStream(name) if name == "Nowhere"));
  }

  #[test]
  fn test_invalid_stream_and_task_names_are_fatal() {
    let mut doc = breakfast_doc();
    doc["Streams"]["Bad Name"] = json!({});
    assert!(matches!(
      Recipe::from_document("test", &doc).unwrap_err(),
      RecipeError::InvalidStreamName { .. }
    ));

    let mut doc = breakfast_doc();
    doc["Streams"]["Main"]["Bad Task"] = json!({});
    assert!(matches!(
      Recipe::from_document("test", &doc).unwrap_err(),
      RecipeError::InvalidTaskName { .. }
    ));
  }

  #[test]
  fn test_non_object_stream_body_is_fatal() {
    let mut doc = breakfast_doc();
    doc["Streams"]["Broken"] = json!("just a string");
    assert!(matches!(
      Recipe::from_document("test", &doc).unwrap_err(),
      RecipeError::InvalidStreamBody(name) if name == "Broken"
    ));
  }

  #[test]
  fn test_duplicate_stream_name_is_fatal() {
    let a = json!({});
    let b = json!({});
    let name = "Twice".to_string();
    let entries = vec![(&name, &a), (&name, &b)];
    assert!(matches!(
      Recipe::collect_streams(entries.into_iter()).unwrap_err(),
      RecipeError::DuplicateStream(n) if n == "Twice"
    ));
  }

  #[test]
  fn test_build_links_triggers_and_is_idempotent() {
    let mut recipe = Recipe::from_document("test", &breakfast_doc()).unwrap();
    assert_eq!(recipe.state(), BuildState::Init);

    let warnings = recipe.build();
    assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    assert_eq!(recipe.state(), BuildState::Built);

    let main = recipe.stream(recipe.stream_position("Main").unwrap());
    let side_index = recipe.stream_position("Side").unwrap();
    assert_eq!(main.tasks[1].triggers, vec![side_index]);
    assert_eq!(main.column, 1);
    assert_eq!(recipe.stream(side_index).column, 2);

    let again = recipe.build();
    assert!(again.is_empty());
    assert_eq!(recipe.go_stream().tasks.len(), 2);
  }

  #[test]
  fn test_dangling_trigger_produces_warning_and_summary() {
    let mut doc = breakfast_doc();
    doc["Streams"]["Main"]["B"]["Trigger"] = json!("Nowhere");
    let mut recipe = Recipe::from_document("test", &doc).unwrap();
    let warnings = recipe.build();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].starts_with("issues in streams: Main"));
    assert!(warnings[1].contains("unknown stream 'Nowhere'"));

    // The bad trigger is dropped; the rest of the workflow still loads.
    let main = recipe.go_stream();
    assert!(main.tasks[1].triggers.is_empty());
    assert_eq!(main.tasks.len(), 2);
  }

  #[test]
  fn test_empty_go_stream_warns() {
    let doc = json!({
      "Identity": {},
      "GoStream": "Main",
      "PreFlight": {},
      "PostFlight": {},
      "Streams": {"Main": {"Settings": {}}}
    });
    let mut recipe = Recipe::from_document("test", &doc).unwrap();
    let warnings = recipe.build();
    assert!(warnings.iter().any(|w| w.contains("is empty")));
  }

  #[test]
  fn test_malformed_checklist_degrades_to_absent() {
    let mut doc = breakfast_doc();
    doc["PreFlight"] = json!("not an object");
    let recipe = Recipe::from_document("test", &doc).unwrap();
    assert!(recipe.pre_checklist.is_none());
    assert!(recipe.post_checklist.is_some());
  }

  #[test]
  fn test_identity_name_defaults_to_invoked_name() {
    let mut doc = breakfast_doc();
    doc["Identity"] = json!({});
    let recipe = Recipe::from_document("recipes/simple.jsonc", &doc).unwrap();
    assert_eq!(recipe.name, "recipes/simple.jsonc");
  }

  #[test]
  fn test_unreachable_stream_is_reported() {
    let mut doc = breakfast_doc();
    doc["Streams"]["Orphan"] = json!({"D": {"DurationSeconds": 5}});
    let mut recipe = Recipe::from_document("test", &doc).unwrap();
    recipe.build();
    let issues = recipe.check_for_issues();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].contains("'Orphan'"));
  }

  #[test]
  fn test_reachability_follows_trigger_chains() {
    let mut recipe = Recipe::from_document("test", &breakfast_doc()).unwrap();
    recipe.build();
    assert!(recipe.check_for_issues().is_empty());
  }
}
