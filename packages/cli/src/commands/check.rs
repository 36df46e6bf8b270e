use crate::config::{load_registry, read_document};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use pagecraft_common::{walk_component, ComponentData, Config, Visitor};
use pagecraft_editor::{Editor, EditorOptions, ZoneId, ZoneType};
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Document JSON to check
    pub document: PathBuf,

    /// Component registry (defaults to pagecraft.config.json in the working directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print every zone with its contents
    #[arg(short, long)]
    pub zones: bool,
}

/// Counts gathered from a loaded document
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub nodes: usize,
    pub slots: usize,
    pub dropzones: usize,
    pub unknown_types: Vec<String>,
}

pub fn check(args: CheckArgs, cwd: &str) -> Result<()> {
    let config = load_registry(args.config.as_deref(), cwd)?;
    let document = read_document(&args.document)?;

    println!("🔍 {} {}", "Checking".green().bold(), args.document.display());

    let editor = Editor::new(config, EditorOptions::default().with_data(document).with_seed("check"));
    editor
        .verify()
        .map_err(|err| anyhow!("Index invariant violated: {}", err))?;

    let report = report(&editor);

    for notice in editor.deprecations() {
        println!("   {} {}", "warning".yellow().bold(), notice);
    }
    for component_type in &report.unknown_types {
        println!(
            "   {} component type {} is not registered",
            "warning".yellow().bold(),
            component_type
        );
    }

    if args.zones {
        for (zone, record) in &editor.indexes().zones {
            println!("   {} [{:?}] {}", zone, record.kind, record.content_ids.join(", "));
        }
    }

    println!();
    println!("✨ {} {}", "Done".green().bold(), "document is consistent");
    println!("   Nodes: {}", report.nodes);
    println!("   Slot zones: {}", report.slots);
    println!("   Drop zones: {}", report.dropzones);

    Ok(())
}

/// Collects component types that the registry does not know
struct UnknownTypes<'a> {
    config: &'a Config,
    found: BTreeSet<String>,
}

impl Visitor for UnknownTypes<'_> {
    fn visit_component(&mut self, component: &ComponentData, _zone: &ZoneId, _index: usize, config: &Config) {
        if self.config.component(&component.component_type).is_none() {
            self.found.insert(component.component_type.clone());
        }
        walk_component(self, component, config);
    }
}

pub fn report(editor: &Editor) -> CheckReport {
    let indexes = editor.indexes();

    let mut unknown = UnknownTypes {
        config: editor.config(),
        found: BTreeSet::new(),
    };
    unknown.visit_data(editor.data(), editor.config());

    let count = |kind: ZoneType| indexes.zones.values().filter(|zone| zone.kind == kind).count();

    CheckReport {
        // The root node is not part of the document content
        nodes: indexes.nodes.len().saturating_sub(1),
        slots: count(ZoneType::Slot),
        dropzones: count(ZoneType::Dropzone),
        unknown_types: unknown.found.into_iter().collect(),
    }
}
