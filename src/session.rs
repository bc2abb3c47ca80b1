//! Session assembly
//!
//! Wires a whole score into one graph:
//!
//! ```text
//! track n gain -> [chain n] -> analyser n ──> master bus
//! master bus -> [limiter] -> master gain -> [master chain] -> analyser -> mix -> destination
//! ```
//!
//! The limiter is only inserted for exports. Muted tracks are left out of
//! playback builds, except the master track: its chain carries the whole
//! mix, so only its own input is silenced. Exports ignore mutes.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};

use crate::automation::{build_chain, BuildOptions, BypassSet, Score, TrackRouting};
use crate::dsp::EffectChain;
use crate::engine::{AudioGraph, CompressorNode, GainNode, MeasureClock, NodeId};
use crate::error::{FxError, Result};

/// How a score is assembled
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Measure playback starts from
    pub start_measure: f64,
    /// Bypass sets keyed by track index
    pub bypassed: BTreeMap<usize, BypassSet>,
    /// Track indices left out of the session
    pub muted: BTreeSet<usize>,
    /// Rendering to file rather than playing back
    pub is_export: bool,
    /// Track routed to the mix bus
    pub master_track: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            start_measure: 1.0,
            bypassed: BTreeMap::new(),
            muted: BTreeSet::new(),
            is_export: false,
            master_track: 0,
        }
    }
}

/// Graph nodes owned by one track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackGraph {
    pub index: usize,
    /// Track input gain
    pub gain: GainNode,
    pub chain: EffectChain,
    /// Only set on a muted master track: the chain still carries the mix,
    /// but nothing of the track's own should be fed into `gain`
    pub muted: bool,
}

/// A score wired into a graph
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    mix: GainNode,
    master: GainNode,
    limiter: Option<CompressorNode>,
    tracks: Vec<TrackGraph>,
}

impl Session {
    /// Build every unmuted track's chain and the buses between them
    ///
    /// # Arguments
    /// * `graph` - Graph to build into; its current time is "now"
    /// * `score` - Tracks and their automation
    /// * `clock` - Measure to seconds conversion
    /// * `options` - Start position, bypass, mute and export settings
    pub fn build(
        graph: &mut AudioGraph,
        score: &Score,
        clock: &dyn MeasureClock,
        options: &SessionOptions,
    ) -> Result<Self> {
        if !score.tracks.is_empty() && options.master_track >= score.tracks.len() {
            return Err(FxError::InvalidConfig {
                reason: format!(
                    "master track {} is outside the score's {} tracks",
                    options.master_track,
                    score.tracks.len()
                ),
            });
        }

        let offset_in_seconds = clock.measure_to_time(options.start_measure);
        info!(
            "building session: {} tracks from measure {} ({:.3}s){}",
            score.tracks.len(),
            options.start_measure,
            offset_in_seconds,
            if options.is_export { ", export" } else { "" }
        );

        let mix = graph.create_gain();
        graph.connect(mix.id, graph.destination());
        let master = graph.create_gain();

        let limiter = if options.is_export {
            let limiter = graph.create_dynamics_compressor();
            graph.set_initial_value(limiter.threshold, -1.0);
            graph.set_initial_value(limiter.knee, 0.0);
            graph.set_initial_value(limiter.ratio, 10000.0);
            graph.set_initial_value(limiter.attack, 0.0);
            graph.set_initial_value(limiter.release, 0.1);
            Some(limiter)
        } else {
            None
        };

        let no_bypass = BypassSet::new();
        let mut tracks = Vec::with_capacity(score.tracks.len());

        for (index, track) in score.tracks.iter().enumerate() {
            let is_master = index == options.master_track;
            let muted = !options.is_export && (track.mute || options.muted.contains(&index));
            if muted && !is_master {
                debug!("track {} muted", index);
                continue;
            }

            let gain = graph.create_gain();
            if is_master {
                match &limiter {
                    Some(limiter) => {
                        graph.connect(master.id, limiter.id);
                        graph.connect(limiter.id, gain.id);
                    }
                    None => graph.connect(master.id, gain.id),
                }
            }

            let analyser = if !options.is_export && track.analyser {
                Some(graph.create_analyser())
            } else {
                None
            };
            let routing = TrackRouting {
                is_master,
                analyser,
                mix: mix.id,
                output: master.id,
            };
            let build = BuildOptions {
                offset_in_seconds,
                bypassed: options.bypassed.get(&index).unwrap_or(&no_bypass),
                is_export: options.is_export,
            };

            let chain = build_chain(graph, track, clock, &build, &routing)?;
            let target: NodeId = chain.entry().unwrap_or(chain.sink());
            graph.connect(gain.id, target);

            debug!("track {}: {} units{}", index, chain.len(), if muted { ", muted" } else { "" });
            tracks.push(TrackGraph {
                index,
                gain,
                chain,
                muted,
            });
        }

        Ok(Self {
            mix,
            master,
            limiter,
            tracks,
        })
    }

    /// Bus feeding the graph destination
    pub fn mix(&self) -> &GainNode {
        &self.mix
    }

    /// Bus collecting every non-master track
    pub fn master(&self) -> &GainNode {
        &self.master
    }

    pub fn limiter(&self) -> Option<&CompressorNode> {
        self.limiter.as_ref()
    }

    pub fn tracks(&self) -> &[TrackGraph] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Option<&TrackGraph> {
        self.tracks.iter().find(|t| t.index == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::{AutomationRange, Track};
    use crate::dsp::EffectKind;
    use crate::engine::{ConstantTempo, NodeKind};

    fn score() -> Score {
        Score {
            tempo: 120.0,
            tracks: vec![
                Track::new().with_range(AutomationRange::hold("VOLUME", "GAIN", 1.0, -3.0)),
                Track::new()
                    .with_range(AutomationRange::hold("DELAY", "MIX", 1.0, 0.4))
                    .with_range(AutomationRange::hold("PAN", "LEFT_RIGHT", 1.0, -50.0)),
                Track::new(),
            ],
        }
    }

    #[test]
    fn test_buses() {
        let mut graph = AudioGraph::default();
        let session = Session::build(&mut graph, &score(), &ConstantTempo::new(120.0), &SessionOptions::default()).unwrap();

        assert!(graph.is_connected(session.mix().id, graph.destination()));
        assert!(session.limiter().is_none());

        let master = session.track(0).unwrap();
        assert!(graph.is_connected(session.master().id, master.gain.id));
        assert!(graph.is_connected(master.chain.sink(), session.mix().id));
        assert_eq!(graph.node(master.chain.sink()).kind, NodeKind::Analyser);

        let drums = session.track(1).unwrap();
        assert_eq!(drums.chain.kinds(), vec![EffectKind::Delay, EffectKind::Pan]);
        assert!(graph.is_connected(drums.gain.id, drums.chain.entry().unwrap()));
        assert!(graph.is_connected(drums.chain.sink(), session.master().id));
    }

    #[test]
    fn test_empty_track_routes_through_analyser() {
        let mut graph = AudioGraph::default();
        let session = Session::build(&mut graph, &score(), &ConstantTempo::new(120.0), &SessionOptions::default()).unwrap();

        let empty = session.track(2).unwrap();
        assert!(empty.chain.is_empty());
        assert!(graph.is_connected(empty.gain.id, empty.chain.sink()));
        assert!(graph.is_connected(empty.chain.sink(), session.master().id));
    }

    #[test]
    fn test_export_inserts_limiter_and_stand_ins() {
        let mut graph = AudioGraph::default();
        let options = SessionOptions {
            is_export: true,
            ..SessionOptions::default()
        };
        let session = Session::build(&mut graph, &score(), &ConstantTempo::new(120.0), &options).unwrap();

        let limiter = session.limiter().unwrap();
        assert_eq!(graph.param(limiter.threshold).initial_value(), -1.0);
        assert_eq!(graph.param(limiter.ratio).initial_value(), 10000.0);
        assert!(graph.is_connected(session.master().id, limiter.id));
        assert!(graph.is_connected(limiter.id, session.track(0).unwrap().gain.id));

        assert!(!graph.nodes().iter().any(|n| n.kind == NodeKind::Analyser));
    }

    #[test]
    fn test_muted_tracks_are_skipped() {
        let mut graph = AudioGraph::default();
        let options = SessionOptions {
            muted: [1].into_iter().collect(),
            ..SessionOptions::default()
        };
        let session = Session::build(&mut graph, &score(), &ConstantTempo::new(120.0), &options).unwrap();
        assert!(session.track(1).is_none());
        assert_eq!(session.tracks().len(), 2);
    }

    /// Whether signal entering `from` can reach `to`
    fn reaches(graph: &AudioGraph, from: NodeId, to: NodeId) -> bool {
        let mut pending = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(node) = pending.pop() {
            if node == to {
                return true;
            }
            if seen.insert(node) {
                pending.extend(graph.outputs_of(node));
            }
        }
        false
    }

    #[test]
    fn test_muted_master_still_carries_mix() {
        for muted in [Vec::<usize>::new(), vec![0]] {
            let mut graph = AudioGraph::default();
            let options = SessionOptions {
                muted: muted.iter().copied().collect(),
                ..SessionOptions::default()
            };
            let session = Session::build(&mut graph, &score(), &ConstantTempo::new(120.0), &options).unwrap();

            let drums = session.track(1).unwrap();
            assert!(reaches(&graph, drums.gain.id, graph.destination()), "muted {:?}", muted);

            let master = session.track(0).unwrap();
            assert_eq!(master.muted, !muted.is_empty());
            assert_eq!(master.chain.kinds(), vec![EffectKind::Volume]);
        }
    }

    #[test]
    fn test_master_track_out_of_range() {
        let mut graph = AudioGraph::default();
        let options = SessionOptions {
            master_track: 3,
            ..SessionOptions::default()
        };
        let err = Session::build(&mut graph, &score(), &ConstantTempo::new(120.0), &options).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_export_ignores_mutes() {
        let mut graph = AudioGraph::default();
        let mut score = score();
        score.tracks[2].mute = true;
        let options = SessionOptions {
            muted: [1].into_iter().collect(),
            is_export: true,
            ..SessionOptions::default()
        };
        let session = Session::build(&mut graph, &score, &ConstantTempo::new(120.0), &options).unwrap();
        assert_eq!(session.tracks().len(), 3);
        assert!(session.tracks().iter().all(|t| !t.muted));
        assert!(reaches(&graph, session.track(1).unwrap().gain.id, graph.destination()));
    }

    #[test]
    fn test_per_track_bypass() {
        let mut graph = AudioGraph::default();
        let mut bypassed = BTreeMap::new();
        bypassed.insert(1, ["DELAY-MIX"].into_iter().collect::<BypassSet>());
        let options = SessionOptions {
            bypassed,
            ..SessionOptions::default()
        };
        let session = Session::build(&mut graph, &score(), &ConstantTempo::new(120.0), &options).unwrap();
        assert_eq!(session.track(1).unwrap().chain.kinds(), vec![EffectKind::Pan]);
    }

    #[test]
    fn test_start_measure_sets_offset() {
        let mut graph = AudioGraph::default();
        let score = Score {
            tempo: 120.0,
            tracks: vec![Track::new().with_range(AutomationRange::new("VOLUME", "GAIN", 1.0, 3.0, -12.0, 0.0))],
        };
        let options = SessionOptions {
            start_measure: 5.0,
            ..SessionOptions::default()
        };
        let session = Session::build(&mut graph, &score, &ConstantTempo::new(120.0), &options).unwrap();

        let unit = session.track(0).unwrap().chain.unit(EffectKind::Volume).unwrap();
        let gain = unit.binding("GAIN").unwrap().params()[0];
        // Range ended before measure 5: a single set of the end value, now
        assert_eq!(graph.calls_for(gain).len(), 1);
        assert_eq!(graph.value_at(gain, 0.0), 1.0);
    }
}
