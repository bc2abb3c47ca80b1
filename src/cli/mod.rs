//! CLI Module
//!
//! Command-line interface for inspecting the effect catalog and the
//! schedules a score produces.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fxchain - effect automation scheduler
#[derive(Parser, Debug)]
#[command(name = "fxchain")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List effect types and their parameters
    #[command(name = "effects")]
    Effects,

    /// Convert a user value to engine units
    #[command(name = "scale")]
    Scale {
        /// Effect name (e.g. VOLUME)
        effect: String,

        /// Parameter name (e.g. GAIN)
        parameter: String,

        /// Value in user units
        #[arg(allow_hyphen_values = true)]
        value: f64,
    },

    /// Validate a score file
    #[command(name = "validate")]
    Validate {
        /// Path to the score (JSON)
        score: PathBuf,
    },

    /// Build a score's session and print the scheduled calls as JSON
    #[command(name = "schedule")]
    Schedule {
        /// Path to the score (JSON)
        score: PathBuf,

        /// Measure playback starts from
        #[arg(short, long, default_value_t = 1.0)]
        start_measure: f64,

        /// Bypass an effect parameter on a track (TRACK:EFFECT-PARAMETER)
        #[arg(short, long)]
        bypass: Vec<String>,

        /// Mute a track
        #[arg(short, long)]
        mute: Vec<usize>,

        /// Build for export (limiter, no analysers, bypass ignored)
        #[arg(short, long)]
        export: bool,

        /// Engine configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the whole graph instead of only the call log
        #[arg(long)]
        graph: bool,
    },
}
