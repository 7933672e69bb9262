// SPDX-License-Identifier: MIT OR Apache-2.0
//! Blocksmith Editor - headless scenario inspector
//!
//! Loads a scenario into a headless editor, logs what it contains, and can
//! write it back out to check that it survives a round trip.

use blocksmith_editor_app::{EditorSettings, EditorState, HeadlessPlatform};
use blocksmith_editor_scene::{DirectoryStore, EditorStore, MemoryStore, OrbitCamera, ScenarioFile};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Inspect and re-export Blocksmith scenarios
#[derive(Debug, Parser)]
#[command(name = "blocksmith_editor", version, about)]
struct Args {
    /// Scenario JSON file to load
    #[arg(long)]
    scenario: PathBuf,

    /// Write the loaded scene back out to this file
    #[arg(long)]
    output: Option<PathBuf>,

    /// RON settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Editor store directory holding the component library
    #[arg(long)]
    store: Option<PathBuf>,
}

fn init_tracing() {
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["blocksmith_editor_app=debug", "blocksmith_editor_scene=debug"] {
        if let Ok(directive) = directive.parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn run(args: &Args) -> blocksmith_editor_app::Result<()> {
    let settings = match &args.settings {
        Some(path) => EditorSettings::load(path)?,
        None => EditorSettings::default(),
    };
    let persistence: Box<dyn EditorStore> = match &args.store {
        Some(root) => Box::new(DirectoryStore::open(root)?),
        None => Box::new(MemoryStore::new()),
    };

    let mut state = EditorState::new(
        settings,
        Box::new(OrbitCamera::new()),
        Box::new(HeadlessPlatform),
        persistence,
    );
    let library = state.load_component_library()?;
    tracing::debug!("Component library holds {} definitions", library);

    let content = std::fs::read_to_string(&args.scenario).map_err(blocksmith_editor_scene::StoreError::from)?;
    let scenario = ScenarioFile::from_json(&content)?;
    state.import_scenario(&scenario)?;

    let summary = state.summary();
    tracing::info!(
        "Scenario '{}': {} roots, {} leaves, {} component groups, {} definitions",
        state.scene_name(),
        summary.roots,
        summary.leaves,
        summary.component_groups,
        summary.definitions
    );

    if let Some(output) = &args.output {
        let name = state.scene_name().to_string();
        let exported = state.export_scenario(&name)?;
        std::fs::write(output, exported.to_json()?).map_err(blocksmith_editor_scene::StoreError::from)?;
        tracing::info!("Wrote {} root blocks to {:?}", exported.blocks.len(), output);
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    tracing::info!("Starting Blocksmith Editor v{}", env!("CARGO_PKG_VERSION"));

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Inspection failed: {e}");
            ExitCode::FAILURE
        }
    }
}
