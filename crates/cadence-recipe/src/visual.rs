//! Read-only traversals over a built recipe for rendering and
//! inspection.

use std::collections::HashSet;

use tracing::{debug, error, warn};

use crate::recipe::{BuildState, Recipe};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
  Checklist,
  Stream,
  Task,
  Trigger,
  TriggeredStream,
}

/// What a traversal node points at in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
  PreChecklist,
  PostChecklist,
  Stream(usize),
  Task { stream: usize, task: usize },
}

/// One cell of the layout grid produced by [`Recipe::visual_nodes`].
/// Columns match the stream columns assigned at build time; checklists
/// sit in column 0.
#[derive(Debug, Clone)]
pub struct VisualNode {
  pub kind: NodeKind,
  pub name: String,
  pub column: u32,
  pub row: u32,
  pub node: NodeRef,
}

/// One step of the flat go-stream walk produced by [`Recipe::walk`].
#[derive(Debug, Clone)]
pub struct WalkNode {
  pub kind: NodeKind,
  pub name: String,
  pub node: NodeRef,
}

impl Recipe {
  /// Lay the recipe out as a grid for display: the optional pre
  /// checklist on row 0, then the go stream and everything reachable
  /// from it through triggers, then the optional post checklist one
  /// row below everything else.
  ///
  /// Each trigger contributes an arrow node named
  /// `"{stream}/{task}->{target}"` in the target's column. A trigger
  /// cycle halts that branch with an error log; the traversal itself
  /// always terminates.
  pub fn visual_nodes(&self) -> Vec<VisualNode> {
    if self.state() != BuildState::Built {
      warn!(recipe = %self.name, "visual_nodes() called before build()");
      return Vec::new();
    }
    let mut nodes = Vec::new();
    let mut row = 0;
    if self.pre_checklist.is_some() {
      nodes.push(VisualNode {
        kind: NodeKind::Checklist,
        name: "Preflight Checklist".to_string(),
        column: 0,
        row,
        node: NodeRef::PreChecklist,
      });
      row += 1;
    }

    let go = self.go_stream_index();
    nodes.push(VisualNode {
      kind: NodeKind::Stream,
      name: self.go_stream().name.clone(),
      column: self.go_stream().column,
      row,
      node: NodeRef::Stream(go),
    });

    let mut visited = HashSet::new();
    self.visit_stream(go, 2, &mut visited, &mut nodes);

    if self.post_checklist.is_some() {
      let max_row = nodes.iter().map(|n| n.row).max().unwrap_or(0);
      nodes.push(VisualNode {
        kind: NodeKind::Checklist,
        name: "Postflight Checklist".to_string(),
        column: 0,
        row: max_row + 1,
        node: NodeRef::PostChecklist,
      });
    }
    nodes
  }

  fn visit_stream(
    &self,
    index: usize,
    start_row: u32,
    visited: &mut HashSet<usize>,
    out: &mut Vec<VisualNode>,
  ) {
    if !visited.insert(index) {
      error!(
        stream = %self.stream(index).name,
        "workflow is not a DAG; trigger chain cycles back, halting this branch"
      );
      return;
    }
    let stream = self.stream(index);
    debug!(stream = %stream.name, row = start_row, "laying out stream");

    let mut row = start_row;
    for (position, task) in stream.tasks.iter().enumerate() {
      out.push(VisualNode {
        kind: NodeKind::Task,
        name: task.name.clone(),
        column: stream.column,
        row,
        node: NodeRef::Task {
          stream: index,
          task: position,
        },
      });
      row += 1;
    }

    // Arrows restart at the stream's first row and stack downward in
    // the target's column.
    let mut row = start_row;
    for task in &stream.tasks {
      for &target in &task.triggers {
        let target_stream = self.stream(target);
        out.push(VisualNode {
          kind: NodeKind::Trigger,
          name: format!("{}/{}->{}", stream.name, task.name, target_stream.name),
          column: target_stream.column,
          row,
          node: NodeRef::Stream(target),
        });
        row += 1;
        out.push(VisualNode {
          kind: NodeKind::Stream,
          name: target_stream.name.clone(),
          column: target_stream.column,
          row,
          node: NodeRef::Stream(target),
        });
        row += 1;
        self.visit_stream(target, row, visited, out);
        row += 1;
      }
    }
  }

  /// A flat, one-level walk of the go stream: the stream itself, its
  /// tasks in order, and for each task the streams it triggers.
  /// Triggered streams are named, not descended into.
  pub fn walk(&self) -> Vec<WalkNode> {
    let go = self.go_stream_index();
    let stream = self.go_stream();
    let mut out = vec![WalkNode {
      kind: NodeKind::Stream,
      name: stream.name.clone(),
      node: NodeRef::Stream(go),
    }];
    for (position, task) in stream.tasks.iter().enumerate() {
      out.push(WalkNode {
        kind: NodeKind::Task,
        name: task.name.clone(),
        node: NodeRef::Task {
          stream: go,
          task: position,
        },
      });
      for &target in &task.triggers {
        out.push(WalkNode {
          kind: NodeKind::TriggeredStream,
          name: self.stream(target).name.clone(),
          node: NodeRef::Stream(target),
        });
      }
    }
    out
  }
}
