use crate::config::{load_registry, read_document, read_history};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use pagecraft_common::Config;
use pagecraft_editor::{DragEvent, Editor, EditorOptions, ScriptedAction};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Document JSON to start from
    pub document: PathBuf,

    /// Script: a JSON array of actions and drag events
    pub script: PathBuf,

    /// Component registry (defaults to pagecraft.config.json in the working directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Resume from a saved history snapshot
    #[arg(long)]
    pub history_in: Option<PathBuf>,

    /// Write the resulting history snapshot here
    #[arg(long)]
    pub history_out: Option<PathBuf>,

    /// Write the resulting document here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Seed for generated component ids
    #[arg(long, default_value = "replay")]
    pub seed: String,
}

/// Which host drag callback a scripted drag event stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DragStage {
    BeforeStart,
    Start,
    Over,
    End,
}

/// One script entry: either a drag event or an action in its wire shape
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptStep {
    Drag {
        drag: DragStage,
        #[serde(flatten)]
        event: DragEvent,
    },
    Undo {
        undo: usize,
    },
    Redo {
        redo: usize,
    },
    Action(ScriptedAction),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub steps: usize,
    pub changes: usize,
}

pub fn replay(args: ReplayArgs, cwd: &str) -> Result<()> {
    let config = load_registry(args.config.as_deref(), cwd)?;
    let document = read_document(&args.document)?;

    let script = fs::read_to_string(&args.script)
        .with_context(|| format!("Cannot read script {}", args.script.display()))?;
    let steps: Vec<ScriptStep> = serde_json::from_str(&script)
        .with_context(|| format!("Invalid script {}", args.script.display()))?;

    let mut options = EditorOptions::default()
        .with_data(document)
        .with_seed(args.seed.clone());
    if let Some(path) = &args.history_in {
        options = options.with_history(read_history(path)?);
    }

    let (editor, summary) = run_script(config, options, &steps);
    editor.verify()?;

    for notice in editor.deprecations() {
        eprintln!("{} {}", "Deprecated:".yellow().bold(), notice);
    }

    let output = serde_json::to_string_pretty(editor.data())?;
    match &args.out {
        Some(path) => fs::write(path, output)?,
        None => println!("{}", output),
    }

    if let Some(path) = &args.history_out {
        fs::write(path, serde_json::to_string_pretty(&editor.history_snapshot())?)?;
    }

    eprintln!(
        "{} {} steps, {} document changes, {} history entries",
        "✓".green(),
        summary.steps,
        summary.changes,
        editor.history().len()
    );

    Ok(())
}

/// Drive an editor through a script
pub fn run_script(config: Config, options: EditorOptions, steps: &[ScriptStep]) -> (Editor, ReplaySummary) {
    let mut editor = Editor::new(config, options);

    let changes = std::rc::Rc::new(std::cell::Cell::new(0));
    let counter = std::rc::Rc::clone(&changes);
    editor.on_change(move |_| counter.set(counter.get() + 1));

    for step in steps {
        match step {
            ScriptStep::Drag { drag, event } => match drag {
                DragStage::BeforeStart => editor.on_before_drag_start(event),
                DragStage::Start => editor.on_drag_start(event),
                DragStage::Over => editor.on_drag_over(event),
                DragStage::End => editor.on_drag_end(event),
            },
            ScriptStep::Undo { undo } => {
                for _ in 0..*undo {
                    editor.undo();
                }
            }
            ScriptStep::Redo { redo } => {
                for _ in 0..*redo {
                    editor.redo();
                }
            }
            ScriptStep::Action(action) => editor.dispatch(action.clone()),
        }
    }

    let summary = ReplaySummary {
        steps: steps.len(),
        changes: changes.get(),
    };
    (editor, summary)
}
