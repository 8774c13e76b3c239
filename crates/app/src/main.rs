use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use combo_overlay_core::{ChipEvent, ControllerFrame, Engine, Profile};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

fn main() -> combo_overlay_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay { trace, profile } => run_replay(&trace, profile.as_deref()),
        Commands::InitProfile { output } => run_init_profile(&output),
    }
}

/// One recorded poll tick of raw controller state.
#[derive(Debug, Deserialize)]
struct TraceStep {
    at_ms: u64,
    #[serde(default)]
    buttons: Vec<bool>,
    #[serde(default)]
    axes: [f32; 2],
}

fn run_replay(trace: &Path, profile: Option<&Path>) -> combo_overlay_core::Result<()> {
    let profile = match profile {
        Some(path) => Profile::from_json(&std::fs::read_to_string(path)?)?,
        None => Profile::default(),
    };
    tracing::info!(profile = %profile.name, ?trace, "replaying controller trace");

    let steps: Vec<TraceStep> = serde_json::from_str(&std::fs::read_to_string(trace)?)?;
    let mut engine = Engine::new(profile);
    engine.subscribe(Box::new(|event| match event {
        ChipEvent::Added { index, chip } => {
            tracing::debug!(index, text = %chip.content.render(), "added")
        }
        ChipEvent::Removed { index, .. } => tracing::debug!(index, "removed"),
        ChipEvent::Replaced { index, after, .. } => {
            tracing::debug!(index, text = %after.render(), "replaced")
        }
        ChipEvent::Cleared { saved } => tracing::debug!(count = saved.len(), "cleared"),
    }));

    let mut last_ms = 0;
    for step in &steps {
        let frame = ControllerFrame {
            buttons: step.buttons.clone(),
            axes: step.axes,
        };
        engine.poll(&frame, step.at_ms);
        last_ms = last_ms.max(step.at_ms);
    }
    // Flush any chord or hold timer still pending after the last frame.
    engine.advance(last_ms + 1_000);

    tracing::info!(chips = engine.chips().len(), "replay finished");
    println!("{}", engine.notation());
    Ok(())
}

fn run_init_profile(output: &PathBuf) -> combo_overlay_core::Result<()> {
    let profile = Profile::default();
    std::fs::write(output, serde_json::to_string_pretty(&profile)?)?;
    tracing::info!(?output, "wrote default profile");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Combo notation overlay engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a recorded controller trace and print the resulting notation.
    Replay {
        /// Path to the JSON trace of controller frames.
        trace: PathBuf,
        /// Optional profile file to use instead of the defaults.
        #[arg(short, long)]
        profile: Option<PathBuf>,
    },
    /// Write a default capture profile that can be edited by hand.
    InitProfile {
        /// Output path for the generated profile.
        output: PathBuf,
    },
}
