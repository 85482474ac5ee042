//! Cadence Document
//!
//! Defensive extraction of typed values from parsed recipe documents.
//! A recipe arrives as an already-parsed `serde_json::Value` tree (the
//! JSON/JSONC parsing itself happens upstream); this crate pulls typed
//! scalars and string lists out of that tree without ever failing hard.
//!
//! Every typed getter returns an [`Extracted`] that says whether the
//! value was found exactly, coerced from another type, or substituted
//! with the caller's default. Callers that care about data quality can
//! inspect the attached warning; callers that don't can just take the
//! value.

mod extract;
mod name;

pub use extract::{Extracted, get, get_bool, get_int, get_str, get_str_list};
pub use name::{NAME_RULES, is_name_ok};
