//! Name validation for streams, tasks, and checklists.

/// Human-readable description of the name rule, for error messages.
pub const NAME_RULES: &str = "letters, digits, underscore [_] and fullstop [.] only";

/// Check whether a name is acceptable for a stream, task, or checklist.
///
/// Names may contain letters, digits, `_`, and `.` only. Keys that fail
/// this rule are never looked up in a document, so a malformed key can
/// not address anything.
pub fn is_name_ok(name: &str) -> bool {
  name
    .chars()
    .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}
