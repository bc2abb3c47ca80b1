//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::collections::BTreeMap;
use std::path::Path;

use log::{info, warn};

use crate::automation::{BypassSet, Score};
use crate::config::EngineConfig;
use crate::dsp::{self, EffectKind};
use crate::engine::AudioGraph;
use crate::error::{FxError, Result};
use crate::session::{Session, SessionOptions};

/// Print every effect type with its parameters.
pub fn list_effects() -> Result<()> {
    for kind in EffectKind::ALL {
        let descriptor = kind.descriptor();
        println!("{} (default: {})", descriptor.name, descriptor.default_parameter);
        for p in descriptor.parameters {
            println!(
                "  {:<22} [{}, {}] default {}",
                p.name, p.min, p.max, p.default
            );
        }
    }
    Ok(())
}

/// Print the engine value of a user value.
pub fn scale(effect: &str, parameter: &str, value: f64) -> Result<()> {
    let scaled = dsp::scale(effect, parameter, value)?;
    println!("{}", scaled);
    Ok(())
}

/// Validate a score file.
pub fn validate(path: &Path) -> Result<()> {
    info!("Validating score: {}", path.display());

    let score = Score::from_path(path)?;
    score.validate()?;

    println!(
        "Score OK: {} tracks, {} ranges",
        score.tracks.len(),
        score.range_count()
    );
    Ok(())
}

/// Parse `TRACK:EFFECT-PARAMETER` bypass arguments into per-track sets.
pub fn parse_bypass(args: &[String]) -> Result<BTreeMap<usize, BypassSet>> {
    let mut bypassed: BTreeMap<usize, BypassSet> = BTreeMap::new();
    for arg in args {
        let parsed = arg
            .split_once(':')
            .and_then(|(track, key)| track.parse::<usize>().ok().map(|t| (t, key)));
        let Some((track, key)) = parsed else {
            return Err(FxError::InvalidConfig {
                reason: format!("bypass '{}' is not TRACK:EFFECT-PARAMETER", arg),
            });
        };
        bypassed.entry(track).or_default().insert_key(key);
    }
    Ok(bypassed)
}

/// Options for the `schedule` command.
#[derive(Debug, Clone, Default)]
pub struct ScheduleArgs<'a> {
    pub start_measure: f64,
    pub bypass: &'a [String],
    pub mute: &'a [usize],
    pub export: bool,
    pub config: Option<&'a Path>,
    pub graph: bool,
}

/// Build a score's session and print its schedule as JSON.
pub fn schedule(path: &Path, args: &ScheduleArgs<'_>) -> Result<()> {
    info!("Scheduling score: {}", path.display());

    let config = match args.config {
        Some(config) => EngineConfig::from_path(config)?,
        None => EngineConfig::default(),
    };
    let score = Score::from_path(path)?;
    if let Err(e) = score.validate() {
        // Without a tempo there is no timeline to schedule on
        if matches!(e, FxError::InvalidTempo { .. }) {
            return Err(e);
        }
        warn!("score does not validate: {}", e);
    }

    let options = SessionOptions {
        start_measure: args.start_measure,
        bypassed: parse_bypass(args.bypass)?,
        muted: args.mute.iter().copied().collect(),
        is_export: args.export,
        master_track: config.master_track,
    };

    let clock = score.tempo_map(config.master_track, config.beats_per_measure);
    let mut graph = AudioGraph::new(config.sample_rate);
    let session = Session::build(&mut graph, &score, &clock, &options)?;

    info!(
        "{} tracks built, {} scheduled calls",
        session.tracks().len(),
        graph.calls().len()
    );

    let json = if args.graph {
        serde_json::to_string_pretty(&graph)?
    } else {
        serde_json::to_string_pretty(graph.calls())?
    };
    println!("{}", json);
    Ok(())
}
