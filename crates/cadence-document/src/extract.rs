//! Typed value extraction with soft-fail semantics.
//!
//! The getters here never fail: a missing key, a container that is not
//! an object, or a key that breaks the name rule all yield the caller's
//! default. Type mismatches are coerced to the requested type and the
//! coercion is made visible in the returned [`Extracted`] instead of
//! being silently swallowed.

use serde_json::Value;
use tracing::{debug, warn};

use crate::name::is_name_ok;

/// Result of one extraction call.
///
/// `coerced` is true when a value of the wrong type was converted to the
/// requested type. `warning` carries the human-readable account of a
/// coercion or a failed conversion; it is `None` for an exact hit or a
/// plain default substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<T> {
  pub value: T,
  pub coerced: bool,
  pub warning: Option<String>,
}

impl<T> Extracted<T> {
  fn exact(value: T) -> Self {
    Self {
      value,
      coerced: false,
      warning: None,
    }
  }

  fn coerced(value: T, warning: String) -> Self {
    warn!(warning = %warning, "coerced document value");
    Self {
      value,
      coerced: true,
      warning: Some(warning),
    }
  }

  /// Conversion failed entirely; the default is used instead.
  fn fallback(value: T, warning: String) -> Self {
    warn!(warning = %warning, "unusable document value, using default");
    Self {
      value,
      coerced: false,
      warning: Some(warning),
    }
  }
}

/// Look up `key` (and optionally `subkey` one level down) in a document.
///
/// Returns `None` when the document is not an object, the key is absent,
/// or the key fails name validation. Never panics, never errors.
pub fn get<'a>(doc: &'a Value, key: &str, subkey: Option<&str>) -> Option<&'a Value> {
  let map = doc.as_object()?;
  if key.is_empty() || !is_name_ok(key) {
    debug!(key, "key failed name validation, not looked up");
    return None;
  }
  let item = map.get(key)?;
  match subkey {
    None | Some("") => Some(item),
    Some(sub) => item.as_object()?.get(sub),
  }
}

fn location(key: &str, subkey: Option<&str>) -> String {
  match subkey {
    None | Some("") => key.to_string(),
    Some(sub) => format!("{}/{}", key, sub),
  }
}

/// Render a scalar to its display text. Arrays and objects fall back to
/// their JSON text, which only shows up in warnings and placeholder
/// values anyway.
fn scalar_text(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    other => other.to_string(),
  }
}

/// Extract a string, coercing other scalars to their display form.
pub fn get_str(doc: &Value, key: &str, subkey: Option<&str>, default: &str) -> Extracted<String> {
  match get(doc, key, subkey) {
    None | Some(Value::Null) => Extracted::exact(default.to_string()),
    Some(Value::String(s)) => Extracted::exact(s.clone()),
    Some(other) => Extracted::coerced(
      scalar_text(other),
      format!(
        "expected string at '{}', found {}; converting to string",
        location(key, subkey),
        other
      ),
    ),
  }
}

/// Extract an integer. JSON floats truncate, numeric strings parse, and
/// anything else falls back to the default.
pub fn get_int(doc: &Value, key: &str, subkey: Option<&str>, default: i64) -> Extracted<i64> {
  match get(doc, key, subkey) {
    None | Some(Value::Null) => Extracted::exact(default),
    Some(Value::Number(n)) => {
      if let Some(i) = n.as_i64() {
        Extracted::exact(i)
      } else if let Some(f) = n.as_f64() {
        Extracted::coerced(
          f as i64,
          format!(
            "expected integer at '{}', found {}; truncating",
            location(key, subkey),
            f
          ),
        )
      } else {
        Extracted::fallback(
          default,
          format!(
            "unusable number at '{}'; using default {}",
            location(key, subkey),
            default
          ),
        )
      }
    }
    Some(Value::String(s)) => match s.trim().parse::<i64>() {
      Ok(i) => Extracted::coerced(
        i,
        format!(
          "expected integer at '{}', found string '{}'; parsing",
          location(key, subkey),
          s
        ),
      ),
      Err(_) => Extracted::fallback(
        default,
        format!(
          "unable to convert '{}' at '{}' to integer; using default {}",
          s,
          location(key, subkey),
          default
        ),
      ),
    },
    Some(other) => Extracted::fallback(
      default,
      format!(
        "expected integer at '{}', found {}; using default {}",
        location(key, subkey),
        other,
        default
      ),
    ),
  }
}

/// Extract a boolean.
///
/// A malformed boolean normalizes the literal `"FALSE"` (any case) to
/// false, along with `""`, `"0"`, and numeric zero; any other non-empty,
/// non-zero scalar coerces to true.
pub fn get_bool(doc: &Value, key: &str, subkey: Option<&str>, default: bool) -> Extracted<bool> {
  match get(doc, key, subkey) {
    None | Some(Value::Null) => Extracted::exact(default),
    Some(Value::Bool(b)) => Extracted::exact(*b),
    Some(Value::String(s)) => {
      let value = !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"));
      Extracted::coerced(
        value,
        format!(
          "expected bool at '{}', found string '{}'; converting to {}",
          location(key, subkey),
          s,
          value
        ),
      )
    }
    Some(Value::Number(n)) => {
      let value = n.as_f64().is_some_and(|f| f != 0.0);
      Extracted::coerced(
        value,
        format!(
          "expected bool at '{}', found number {}; converting to {}",
          location(key, subkey),
          n,
          value
        ),
      )
    }
    Some(other) => Extracted::fallback(
      default,
      format!(
        "expected bool at '{}', found {}; using default {}",
        location(key, subkey),
        other,
        default
      ),
    ),
  }
}

/// Extract a list of strings.
///
/// A bare string becomes a one-element list; non-string list entries are
/// stringified; any other shape falls back to the default.
pub fn get_str_list(
  doc: &Value,
  key: &str,
  subkey: Option<&str>,
  default: &[&str],
) -> Extracted<Vec<String>> {
  let default_list = || default.iter().map(|s| s.to_string()).collect::<Vec<_>>();
  match get(doc, key, subkey) {
    None | Some(Value::Null) => Extracted::exact(default_list()),
    Some(Value::String(s)) => Extracted::coerced(
      vec![s.clone()],
      format!(
        "expected list at '{}', found string; wrapping in a one-element list",
        location(key, subkey)
      ),
    ),
    Some(Value::Array(items)) => {
      let mut values = Vec::with_capacity(items.len());
      let mut warning = None;
      for item in items {
        match item {
          Value::String(s) => values.push(s.clone()),
          other => {
            warning = Some(format!(
              "expected string entry in list at '{}', found {}; converting to string",
              location(key, subkey),
              other
            ));
            values.push(scalar_text(other));
          }
        }
      }
      match warning {
        Some(warning) => Extracted::coerced(values, warning),
        None => Extracted::exact(values),
      }
    }
    Some(other) => Extracted::fallback(
      default_list(),
      format!(
        "expected list at '{}', found {}; using default",
        location(key, subkey),
        other
      ),
    ),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_get_follows_one_sublevel() {
    let doc = json!({"name": "Gilbert", "info": {"info2": "interesting", "infonum": 5}});
    assert_eq!(get(&doc, "name", None), Some(&json!("Gilbert")));
    assert_eq!(get(&doc, "info", Some("info2")), Some(&json!("interesting")));
    assert_eq!(get(&doc, "info", Some("missing")), None);
    assert_eq!(get(&doc, "missing", None), None);
  }

  #[test]
  fn test_get_rejects_bad_containers_and_keys() {
    assert_eq!(get(&json!("not an object"), "name", None), None);
    let doc = json!({"bad key": 1});
    // The key exists but fails name validation, so it is never addressed.
    assert_eq!(get(&doc, "bad key", None), None);
  }

  #[test]
  fn test_get_str_exact_and_coerced() {
    let doc = json!({"name": "Gilbert", "score": 24});
    let exact = get_str(&doc, "name", None, "");
    assert_eq!(exact.value, "Gilbert");
    assert!(!exact.coerced);
    assert!(exact.warning.is_none());

    let coerced = get_str(&doc, "score", None, "");
    assert_eq!(coerced.value, "24");
    assert!(coerced.coerced);
    assert!(coerced.warning.is_some());
  }

  #[test]
  fn test_get_str_missing_uses_default_without_warning() {
    let doc = json!({});
    let missing = get_str(&doc, "name", None, "defaulted");
    assert_eq!(missing.value, "defaulted");
    assert!(!missing.coerced);
    assert!(missing.warning.is_none());
  }

  #[test]
  fn test_get_int_parses_strings_and_truncates_floats() {
    let doc = json!({"score": 24, "text": "12", "frac": 2.9, "word": "lots"});
    assert_eq!(get_int(&doc, "score", None, -1).value, 24);

    let parsed = get_int(&doc, "text", None, -1);
    assert_eq!(parsed.value, 12);
    assert!(parsed.coerced);

    let truncated = get_int(&doc, "frac", None, -1);
    assert_eq!(truncated.value, 2);
    assert!(truncated.coerced);

    let failed = get_int(&doc, "word", None, -1);
    assert_eq!(failed.value, -1);
    assert!(!failed.coerced);
    assert!(failed.warning.is_some());
  }

  #[test]
  fn test_get_bool_normalizes_false_literals() {
    let doc = json!({
      "a": "FALSE", "b": "false", "c": "", "d": "0",
      "e": "yes", "f": 0, "g": 3, "h": true
    });
    assert!(!get_bool(&doc, "a", None, true).value);
    assert!(!get_bool(&doc, "b", None, true).value);
    assert!(!get_bool(&doc, "c", None, true).value);
    assert!(!get_bool(&doc, "d", None, true).value);
    assert!(get_bool(&doc, "e", None, false).value);
    assert!(!get_bool(&doc, "f", None, true).value);
    assert!(get_bool(&doc, "g", None, false).value);

    let exact = get_bool(&doc, "h", None, false);
    assert!(exact.value);
    assert!(!exact.coerced);
  }

  #[test]
  fn test_get_str_list_wraps_and_stringifies() {
    let doc = json!({
      "steps": ["Pour the water into the Kettle", "Close lid", "Turn on"],
      "single": "ToastStream",
      "mixed": ["one", 2],
      "wrong": {"not": "a list"}
    });

    let exact = get_str_list(&doc, "steps", None, &[]);
    assert_eq!(exact.value.len(), 3);
    assert!(!exact.coerced);

    let wrapped = get_str_list(&doc, "single", None, &[]);
    assert_eq!(wrapped.value, vec!["ToastStream".to_string()]);
    assert!(wrapped.coerced);

    let mixed = get_str_list(&doc, "mixed", None, &[]);
    assert_eq!(mixed.value, vec!["one".to_string(), "2".to_string()]);
    assert!(mixed.coerced);

    let fallback = get_str_list(&doc, "wrong", None, &["placeholder"]);
    assert_eq!(fallback.value, vec!["placeholder".to_string()]);
    assert!(fallback.warning.is_some());
  }
}
