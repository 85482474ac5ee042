use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cadence_engine::{
  ChannelNotifier, Cue, EngineError, ExecutionEvent, Session, SessionConfig, Speaker,
  format_remaining,
};
use cadence_recipe::Recipe;

/// Cadence - a timed multi-stream workflow runner
#[derive(Parser)]
#[command(name = "cadence")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Validate a recipe and report warnings
  Check {
    /// Path to the recipe file (JSON)
    recipe_file: PathBuf,
  },

  /// Print the recipe's layout grid
  Show {
    /// Path to the recipe file (JSON)
    recipe_file: PathBuf,
  },

  /// Run a recipe interactively
  Run {
    /// Path to the recipe file (JSON)
    recipe_file: PathBuf,

    /// Seconds deducted per wall-clock second (rehearsal fast-forward)
    #[arg(long, default_value_t = 1)]
    tick: i64,

    /// Continue past build warnings without asking
    #[arg(long)]
    yes: bool,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
    .with(tracing_subscriber::fmt::layer().without_time())
    .init();

  let cli = Cli::parse();
  match cli.command {
    Commands::Check { recipe_file } => check(recipe_file),
    Commands::Show { recipe_file } => show(recipe_file),
    Commands::Run {
      recipe_file,
      tick,
      yes,
    } => run(recipe_file, tick, yes),
  }
}

fn load_recipe(recipe_file: &PathBuf) -> Result<Recipe> {
  let content = std::fs::read_to_string(recipe_file)
    .with_context(|| format!("failed to read recipe file: {}", recipe_file.display()))?;
  let doc: serde_json::Value = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse recipe file: {}", recipe_file.display()))?;
  let recipe = Recipe::from_document(&recipe_file.display().to_string(), &doc)
    .context("recipe failed validation")?;
  Ok(recipe)
}

fn check(recipe_file: PathBuf) -> Result<()> {
  let mut recipe = load_recipe(&recipe_file)?;
  let warnings = recipe.build();

  println!("Recipe: {}", recipe.name);
  println!("Streams: {}", recipe.streams().len());
  if warnings.is_empty() {
    println!("No build warnings");
  } else {
    println!("Build warnings:");
    for warning in &warnings {
      println!("  - {warning}");
    }
  }
  let issues = recipe.check_for_issues();
  for issue in &issues {
    println!("  - {issue}");
  }
  Ok(())
}

fn show(recipe_file: PathBuf) -> Result<()> {
  let mut recipe = load_recipe(&recipe_file)?;
  recipe.build();

  println!("Recipe: {}", recipe.name);
  for node in recipe.visual_nodes() {
    println!(
      "  col {:>2} row {:>2}  {:<16} {}",
      node.column,
      node.row,
      format!("{:?}", node.kind),
      node.name
    );
  }
  Ok(())
}

fn run(recipe_file: PathBuf, tick: i64, yes: bool) -> Result<()> {
  let mut recipe = load_recipe(&recipe_file)?;
  let warnings = recipe.build();

  if !warnings.is_empty() {
    eprintln!("Build warnings:");
    for warning in &warnings {
      eprintln!("  - {warning}");
    }
    if !yes && !confirm("Continue anyway? [y/N] ")? {
      anyhow::bail!("aborted on build warnings");
    }
  }

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(run_async(recipe, tick))
}

fn confirm(prompt: &str) -> Result<bool> {
  print!("{prompt}");
  io::stdout().flush()?;
  let mut answer = String::new();
  io::stdin().lock().read_line(&mut answer)?;
  Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

/// Prints speech requests instead of producing audio.
struct ConsoleSpeaker;

impl Speaker for ConsoleSpeaker {
  fn speak(&self, text: &str) {
    println!("*** {text} ***");
  }

  fn cue(&self, cue: Cue) {
    match cue {
      Cue::StreamComplete => println!("*** Stream complete ***"),
      Cue::WorkflowComplete => println!("*** Workflow complete ***"),
      Cue::AutoAdvance => println!("*** Moving on ***"),
    }
  }
}

async fn run_async(recipe: Recipe, tick: i64) -> Result<()> {
  let (notifier, mut events) = ChannelNotifier::new();
  let session = Session::new(
    recipe,
    Arc::new(ConsoleSpeaker),
    Arc::new(notifier),
    SessionConfig { tick_size: tick },
  )?;

  tokio::spawn(async move {
    while let Some(event) = events.recv().await {
      match event {
        ExecutionEvent::TaskStarted { stream, task, .. } => {
          println!("[{stream}] now on task '{task}'");
        }
        ExecutionEvent::StreamCompleted { stream, .. } => {
          println!("[{stream}] all tasks done");
        }
        ExecutionEvent::OverrunAlert { stream, message, .. } => {
          println!("[{stream}] {message}");
        }
        ExecutionEvent::TriggerFailed { target, error, .. } => {
          println!("trigger into '{target}' failed: {error}");
        }
        _ => {}
      }
    }
  });

  let cancel = CancellationToken::new();
  let go = session.start_go_stream()?;
  session.spawn_driver(go.clone(), cancel.clone());
  println!(
    "Loaded '{}'. Go stream is '{}'; type 'done' to begin, 'help' for commands.",
    session.recipe().name,
    go.stream_name()
  );

  // Checklist handles stay open while held here; the same command
  // closes an open one.
  let mut pre_checklist = None;
  let mut post_checklist = None;

  let stdin = io::stdin();
  let mut line = String::new();
  loop {
    print!("> ");
    io::stdout().flush()?;
    line.clear();
    if stdin.lock().read_line(&mut line)? == 0 {
      break;
    }
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
      continue;
    };
    // Commands act on the go stream unless another is named.
    let target = match words.next() {
      Some(name) => match session.execution(name) {
        Some(execution) => execution,
        None => {
          println!("no live execution for stream '{name}'");
          continue;
        }
      },
      None => go.clone(),
    };

    let result = match command {
      "done" | "next" => target.done_next().map(|outcome| {
        // Triggered executions only stay registered while an Arc is
        // held; give each one its driver before the outcome drops.
        for triggered in outcome.triggered {
          println!("stream '{}' started", triggered.stream_name());
          session.spawn_driver(triggered, cancel.child_token());
        }
        for (name, error) in outcome.failures {
          println!("trigger into '{name}' failed: {error}");
        }
      }),
      "pause" => target.pause(),
      "resume" => target.resume(),
      "back" => target.back(),
      "extend" => target.extend().map(|remaining| {
        println!("remaining: {}", format_remaining(remaining));
      }),
      "reduce" => target.reduce().map(|remaining| {
        println!("remaining: {}", format_remaining(remaining));
      }),
      "close" => target.close(),
      "status" => {
        for name in session.live_streams() {
          if let Some(execution) = session.execution(&name) {
            let snapshot = execution.snapshot();
            println!(
              "{:<20} {:<10} task '{}' {:>14}  {:?}",
              snapshot.stream,
              format!("{:?}", snapshot.status),
              snapshot.task.as_deref().unwrap_or("-"),
              format_remaining(snapshot.remaining_time),
              snapshot.urgency
            );
          }
        }
        Ok(())
      }
      "pre" => toggle_checklist(&mut pre_checklist, || session.open_pre_checklist()),
      "post" => toggle_checklist(&mut post_checklist, || session.open_post_checklist()),
      "help" => {
        println!(
          "commands: done [stream], pause, resume, back, extend, reduce,\n\
           close, status, pre, post, quit"
        );
        Ok(())
      }
      "quit" | "exit" => break,
      other => {
        println!("unknown command '{other}'; try 'help'");
        Ok(())
      }
    };
    if let Err(e) = result {
      println!("{e}");
    }
  }

  cancel.cancel();
  Ok(())
}

fn toggle_checklist(
  slot: &mut Option<Arc<cadence_engine::ChecklistExecution>>,
  open: impl FnOnce() -> Result<Arc<cadence_engine::ChecklistExecution>, EngineError>,
) -> Result<(), EngineError> {
  match slot.take() {
    Some(checklist) => {
      println!("closed '{}'", checklist.title);
      Ok(())
    }
    None => {
      let checklist = open()?;
      println!("{}", checklist.title);
      println!("{}", checklist.description);
      println!("{}", checklist.steps_text());
      *slot = Some(checklist);
      Ok(())
    }
  }
}
