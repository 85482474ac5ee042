use thiserror::Error;

/// Fatal construction-time problems.
///
/// Anything recoverable is reported as a build warning instead; these
/// errors mean there is no partially-usable recipe at all.
#[derive(Debug, Error)]
pub enum RecipeError {
  #[error("recipe is missing mandatory section '{0}'")]
  MissingSection(&'static str),

  #[error("go stream '{0}' not found in the Streams section")]
  UnknownGoStream(String),

  #[error("the Streams section is not an object")]
  InvalidStreamsSection,

  #[error("invalid stream name '{name}'; allowed: {rules}")]
  InvalidStreamName { name: String, rules: &'static str },

  #[error("duplicate stream name '{0}'")]
  DuplicateStream(String),

  #[error("stream '{0}' is not an object")]
  InvalidStreamBody(String),

  #[error("invalid task name '{name}' in stream '{stream}'; allowed: {rules}")]
  InvalidTaskName {
    name: String,
    stream: String,
    rules: &'static str,
  },

  #[error("invalid checklist name '{name}'; allowed: {rules}")]
  InvalidChecklistName { name: String, rules: &'static str },
}
