use crate::handler::ArtifactKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `mendforge` - oracle-driven artifact generation with bounded self-healing.
#[derive(Parser, Debug)]
#[command(name = "mendforge")]
#[command(version)]
#[command(about = "Generate and self-heal code artifacts with an LLM oracle.", long_about = None)]
pub struct Cli {
    /// Config file path (default: ./mendforge.toml, falling back to built-in defaults)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate (and heal) artifacts for the given sources
    Run {
        /// Source files or globs, relative to the project root
        /// (default: project.include from config)
        targets: Vec<String>,

        /// Artifact kind to produce
        #[arg(long, value_enum, default_value_t = ArtifactKind::UnitTests)]
        kind: ArtifactKind,

        /// Report validation failures instead of healing them
        #[arg(long)]
        no_heal: bool,

        /// Override healing.max_attempts for this run
        #[arg(long)]
        max_attempts: Option<usize>,

        /// Override engine.max_iterations for this run
        #[arg(long)]
        max_iterations: Option<usize>,

        /// List the files that would be processed, without touching the oracle
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate existing artifacts without generating or healing anything
    Check {
        /// Source files or globs, relative to the project root
        /// (default: project.include from config)
        targets: Vec<String>,

        /// Artifact kind to check
        #[arg(long, value_enum, default_value_t = ArtifactKind::UnitTests)]
        kind: ArtifactKind,
    },
}
