//! Cadence Recipe
//!
//! This crate provides the validated recipe model for Cadence. A recipe
//! is an ordered set of streams, each an ordered sequence of timed
//! tasks; a task can trigger other streams to start running
//! concurrently. The model is built from an already-parsed document
//! tree in two phases:
//!
//! 1. Construction performs the fatal checks (mandatory sections,
//!    go-stream existence, name validity) and parses per-stream
//!    settings. A recipe that fails here is unusable.
//! 2. [`Recipe::build`] resolves tasks and cross-stream trigger links,
//!    collecting recoverable problems (duplicate tasks, dangling
//!    triggers) into a flat warning list instead of aborting on the
//!    first bad entry.
//!
//! After `build()` the model is read-only. Traversal for rendering or
//! inspection goes through [`Recipe::visual_nodes`] and
//! [`Recipe::walk`], which detect trigger cycles instead of looping.

mod checklist;
mod error;
mod recipe;
mod stream;
mod task;
mod visual;

pub use checklist::{Checklist, ChecklistGroup};
pub use error::RecipeError;
pub use recipe::{BuildState, Recipe};
pub use stream::Stream;
pub use task::{Stakes, Task, TaskKind};
pub use visual::{NodeKind, NodeRef, VisualNode, WalkNode};
