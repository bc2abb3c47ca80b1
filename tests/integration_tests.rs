//! Integration Tests
//!
//! End-to-end tests for chain building and automation scheduling.

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;

use fxchain::automation::{build_chain, AutomationRange, BuildOptions, BypassSet, Score, Track, TrackRouting};
use fxchain::dsp::{self, EffectChain, EffectKind};
use fxchain::engine::{AudioGraph, AutomationEvent, ConstantTempo, ParamId};
use fxchain::session::{Session, SessionOptions};

/// Build one non-master track at 120 bpm
fn build(graph: &mut AudioGraph, track: &Track, offset: f64) -> EffectChain {
    let mix = graph.create_gain().id;
    let output = graph.create_gain().id;
    let routing = TrackRouting {
        is_master: false,
        analyser: None,
        mix,
        output,
    };
    let bypassed = BypassSet::new();
    let options = BuildOptions {
        offset_in_seconds: offset,
        bypassed: &bypassed,
        is_export: false,
    };
    build_chain(graph, track, &ConstantTempo::new(120.0), &options, &routing).unwrap()
}

fn param(chain: &EffectChain, kind: EffectKind, parameter: &str) -> ParamId {
    chain.unit(kind).unwrap().binding(parameter).unwrap().params()[0]
}

/// A track touching every audible effect, with ramps, holds and bypass
fn busy_track() -> Track {
    Track::new()
        .with_range(AutomationRange::new("VOLUME", "GAIN", 1.0, 3.0, -6.0, 0.0))
        .with_range(AutomationRange::new("DELAY", "MIX", 2.0, 5.0, 0.1, 0.9))
        .with_range(AutomationRange::hold("FILTER", "FILTER_FREQ", 1.0, 1200.0))
        .with_range(AutomationRange::new("COMPRESSOR", "BYPASS", 2.0, 4.0, 1.0, 0.0))
        .with_range(AutomationRange::new("PAN", "LEFT_RIGHT", 1.0, 9.0, -100.0, 100.0))
        .with_range(AutomationRange::hold("BANDPASS", "MIX", 3.0, 0.25))
        .with_range(AutomationRange::hold("EQ3BAND", "EQ3BAND_MIDGAIN", 1.0, 6.0))
        .with_range(AutomationRange::new("CHORUS", "CHORUS_NUMVOICES", 1.0, 2.0, 1.0, 3.0))
        .with_range(AutomationRange::new("FLANGER", "MIX", 1.0, 2.0, 0.0, 1.0))
        .with_range(AutomationRange::hold("PHASER", "PHASER_RATE", 1.0, 2.0))
        .with_range(AutomationRange::hold("TREMOLO", "BYPASS", 4.0, 1.0))
        .with_range(AutomationRange::new("DISTORTION", "DISTO_GAIN", 2.0, 6.0, 10.0, 40.0))
        .with_range(AutomationRange::hold("DISTORTION", "MIX", 7.0, 0.3))
        .with_range(AutomationRange::new("PITCHSHIFT", "PITCHSHIFT_SHIFT", 1.0, 4.0, 0.0, 12.0))
        .with_range(AutomationRange::hold("RINGMOD", "RINGMOD_MODFREQ", 1.0, 60.0))
        .with_range(AutomationRange::new("WAH", "WAH_POSITION", 1.0, 8.0, 0.0, 1.0))
        .with_range(AutomationRange::new("REVERB", "REVERB_TIME", 2.0, 6.0, 1000.0, 3500.0))
        .with_range(AutomationRange::new("REVERB", "MIX", 1.0, 2.0, 0.5, 0.2))
        .with_range(AutomationRange::hold("TEMPO", "TEMPO", 1.0, 120.0))
}

// === Schedule Shape ===

#[test]
fn test_open_ended_range_schedules_one_set_and_no_ramp() {
    for (effect, parameter, value) in [
        ("VOLUME", "GAIN", -12.0),
        ("FILTER", "FILTER_RESONANCE", 0.5),
        ("WAH", "WAH_POSITION", 0.3),
        ("REVERB", "REVERB_DAMPFREQ", 4000.0),
    ] {
        let mut graph = AudioGraph::default();
        let track = Track::new().with_range(AutomationRange::hold(effect, parameter, 2.0, value));
        let kind: EffectKind = effect.parse().unwrap();
        let chain = build(&mut graph, &track, 0.0);

        for p in chain.unit(kind).unwrap().binding(parameter).unwrap().params() {
            let events = graph.calls_for(p);
            assert_eq!(events.len(), 1, "{}-{}", effect, parameter);
            assert!(!events[0].is_ramp());
        }
    }
}

#[test]
fn test_future_range_schedules_set_then_ramp() {
    let mut graph = AudioGraph::default();
    let track = Track::new().with_range(AutomationRange::new("VOLUME", "GAIN", 2.0, 4.0, -6.0, 0.0));
    let chain = build(&mut graph, &track, 0.0);

    let events = graph.calls_for(param(&chain, EffectKind::Volume, "GAIN"));
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].time(), 2.0);
    assert_relative_eq!(events[0].value(), 0.501187, epsilon = 1e-6);
    assert!(events[1].is_ramp());
    assert_eq!(events[1].time(), 6.0);
    assert_relative_eq!(events[1].value(), 1.0);
}

#[test]
fn test_past_range_schedules_end_value_now() {
    let mut graph = AudioGraph::default();
    graph.set_current_time(3.0);
    let track = Track::new()
        .with_range(AutomationRange::new("DELAY", "DELAY_TIME", 1.0, 2.0, 100.0, 300.0))
        .with_range(AutomationRange::new("REVERB", "REVERB_TIME", 1.0, 2.0, 100.0, 3500.0));
    let chain = build(&mut graph, &track, 20.0);

    assert_eq!(
        graph.calls_for(param(&chain, EffectKind::Delay, "DELAY_TIME")),
        vec![AutomationEvent::SetValueAtTime { value: 0.3, time: 3.0 }]
    );
    let reverb_time = chain.unit(EffectKind::Reverb).unwrap().binding("REVERB_TIME").unwrap().params();
    for p in reverb_time {
        assert!(graph.calls_for(p).is_empty());
    }
}

#[test]
fn test_volume_example() {
    let mut graph = AudioGraph::default();
    let track = Track::new().with_range(AutomationRange::new("VOLUME", "GAIN", 1.0, 2.0, -6.0, 0.0));
    let chain = build(&mut graph, &track, 0.0);

    let gain = param(&chain, EffectKind::Volume, "GAIN");
    let events = graph.calls_for(gain);
    assert_eq!(events[0].time(), 0.0);
    assert_relative_eq!(events[0].value(), 0.5012, epsilon = 1e-4);
    assert_relative_eq!(events[1].value(), 1.0);
    assert_relative_eq!(graph.value_at(gain, 1.0), (0.501187 + 1.0) / 2.0, epsilon = 1e-6);
}

#[test]
fn test_delay_example() {
    let mut graph = AudioGraph::default();
    let track = Track::new().with_range(AutomationRange::hold("DELAY", "DELAY_TIME", 1.0, 300.0));
    let chain = build(&mut graph, &track, 0.0);

    let time = graph.calls_for(param(&chain, EffectKind::Delay, "DELAY_TIME"));
    assert_relative_eq!(time[0].value(), 0.3);

    let feedback = graph.calls_for(param(&chain, EffectKind::Delay, "DELAY_FEEDBACK"));
    for event in feedback {
        assert_relative_eq!(event.value(), 0.5623, epsilon = 1e-4);
    }
}

#[test]
fn test_reverb_time_example() {
    assert_relative_eq!(dsp::scale("REVERB", "REVERB_TIME", 3500.0).unwrap(), 0.7, epsilon = 1e-12);

    let mut graph = AudioGraph::default();
    let track = Track::new().with_range(AutomationRange::hold("REVERB", "REVERB_TIME", 1.0, 3500.0));
    let chain = build(&mut graph, &track, 0.0);
    let params = chain.unit(EffectKind::Reverb).unwrap().binding("REVERB_TIME").unwrap().params();
    assert_eq!(params.len(), 8);
    for p in params {
        assert_relative_eq!(graph.calls_for(p)[0].value(), 0.7, epsilon = 1e-12);
    }
}

#[test]
fn test_pitchshift_creates_one_unit_and_schedules_nothing() {
    let mut graph = AudioGraph::default();
    let track = Track::new()
        .with_range(AutomationRange::new("PITCHSHIFT", "PITCHSHIFT_SHIFT", 1.0, 3.0, -5.0, 5.0))
        .with_range(AutomationRange::hold("PITCHSHIFT", "MIX", 2.0, 0.5))
        .with_range(AutomationRange::hold("VOLUME", "GAIN", 1.0, -6.0));
    let chain = build(&mut graph, &track, 0.0);

    assert_eq!(chain.kinds(), vec![EffectKind::Pitchshift, EffectKind::Volume]);
    let gain = param(&chain, EffectKind::Volume, "GAIN");
    assert!(graph.calls().iter().all(|c| c.param == gain));
}

#[test]
fn test_chorus_num_voices_example() {
    let mut graph = AudioGraph::default();
    let track = Track::new().with_range(AutomationRange::new("CHORUS", "CHORUS_NUMVOICES", 1.0, 3.0, 1.0, 4.0));
    let chain = build(&mut graph, &track, 0.0);

    let voices = chain.unit(EffectKind::Chorus).unwrap().binding("CHORUS_NUMVOICES").unwrap().params();
    let opened = voices.iter().filter(|v| !graph.calls_for(**v).is_empty()).count();
    assert_eq!(opened, 4);
}

// === Invariants ===

#[test]
fn test_one_unit_per_effect() {
    let mut graph = AudioGraph::default();
    let mut track = busy_track();
    for measure in [3.0, 5.0, 7.0] {
        track.add_range(AutomationRange::hold("VOLUME", "GAIN", measure, -3.0));
        track.add_range(AutomationRange::hold("WAH", "MIX", measure, 0.5));
    }
    let chain = build(&mut graph, &track, 0.0);

    let mut kinds = chain.kinds();
    let count = kinds.len();
    kinds.sort();
    kinds.dedup();
    assert_eq!(kinds.len(), count);
    // Every audible effect appears; TEMPO never does
    assert_eq!(count, 16);
    assert!(chain.unit(EffectKind::Tempo).is_none());
}

#[test]
fn test_complementary_pairs_at_every_instant() {
    for offset in [0.0, 5.0, 30.0] {
        let mut graph = AudioGraph::default();
        graph.set_current_time(1.0);
        let chain = build(&mut graph, &busy_track(), offset);

        let mut instants: Vec<f64> = graph.calls().iter().map(|c| c.event.time()).collect();
        let midpoints: Vec<f64> = instants.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
        instants.extend(midpoints);
        instants.extend([0.0, 100.0]);

        for unit in chain.iter() {
            for &t in &instants {
                if let Some(mix) = unit.mix() {
                    let sum = graph.value_at(mix.wet.gain, t) + graph.value_at(mix.dry.gain, t);
                    assert!((sum - 1.0).abs() < 1e-9, "{} wet+dry = {} at {}", unit.kind(), sum, t);
                }
                if let Some(bypass) = unit.bypass() {
                    let sum = graph.value_at(bypass.bypass.gain, t) + graph.value_at(bypass.bypass_dry.gain, t);
                    assert!((sum - 1.0).abs() < 1e-9, "{} bypass sum = {} at {}", unit.kind(), sum, t);
                }
            }
        }
    }
}

#[test]
fn test_bypass_never_ramps() {
    let mut graph = AudioGraph::default();
    let chain = build(&mut graph, &busy_track(), 0.0);

    for unit in chain.iter() {
        if let Some(bypass) = unit.bypass() {
            for p in [bypass.bypass.gain, bypass.bypass_dry.gain] {
                assert!(graph.calls_for(p).iter().all(|e| !e.is_ramp()));
            }
        }
    }
    let compressor = chain.unit(EffectKind::Compressor).unwrap().bypass().unwrap();
    assert_eq!(graph.calls_for(compressor.bypass_dry.gain).len(), 2);
}

#[test]
fn test_build_is_deterministic() {
    let build_calls = || {
        let mut graph = AudioGraph::default();
        graph.set_current_time(0.5);
        build(&mut graph, &busy_track(), 4.0);
        serde_json::to_value(&graph).unwrap()
    };
    assert_eq!(build_calls(), build_calls());
}

// === Sessions ===

const SCORE: &str = r#"{
    "tempo": 120,
    "tracks": [
        {
            "effects": {
                "TEMPO-TEMPO": [
                    { "name": "TEMPO", "parameter": "TEMPO", "startMeasure": 1, "startValue": 60 }
                ],
                "VOLUME-GAIN": [
                    { "name": "VOLUME", "parameter": "GAIN", "startMeasure": 2, "endMeasure": 3, "startValue": -12, "endValue": 0 }
                ]
            }
        },
        {
            "effects": {
                "FILTER-FILTER_FREQ": [
                    { "name": "FILTER", "startMeasure": 1, "startValue": 400 }
                ],
                "DELAY-MIX": [
                    { "name": "DELAY", "parameter": "MIX", "startMeasure": 3, "startValue": 0.5 }
                ]
            }
        }
    ]
}"#;

#[test]
fn test_score_session_uses_tempo_lane() {
    let score = Score::from_json_str(SCORE).unwrap();
    score.validate().unwrap();

    let clock = score.tempo_map(0, 4.0);
    let mut graph = AudioGraph::default();
    let session = Session::build(&mut graph, &score, &clock, &SessionOptions::default()).unwrap();

    // 60 bpm: 4 s per measure
    let master = session.track(0).unwrap();
    let gain = param(&master.chain, EffectKind::Volume, "GAIN");
    let events = graph.calls_for(gain);
    assert_eq!(events[0].time(), 4.0);
    assert_eq!(events[1].time(), 8.0);

    let track = session.track(1).unwrap();
    assert_eq!(track.chain.kinds(), vec![EffectKind::Filter, EffectKind::Delay]);
    let wet = track.chain.unit(EffectKind::Delay).unwrap().mix().unwrap().wet.gain;
    assert_eq!(graph.calls_for(wet), vec![AutomationEvent::SetValueAtTime { value: 0.5, time: 8.0 }]);
}

#[test]
fn test_session_resumed_mid_score() {
    let score = Score::from_json_str(SCORE).unwrap();
    let clock = score.tempo_map(0, 4.0);
    let mut graph = AudioGraph::default();
    let options = SessionOptions {
        start_measure: 4.0,
        ..SessionOptions::default()
    };
    let session = Session::build(&mut graph, &score, &clock, &options).unwrap();

    let master = session.track(0).unwrap();
    let gain = param(&master.chain, EffectKind::Volume, "GAIN");
    assert_eq!(graph.calls_for(gain), vec![AutomationEvent::SetValueAtTime { value: 1.0, time: 0.0 }]);

    // Open-ended ranges that started earlier land now
    let track = session.track(1).unwrap();
    let freq = param(&track.chain, EffectKind::Filter, "FILTER_FREQ");
    assert_eq!(graph.calls_for(freq), vec![AutomationEvent::SetValueAtTime { value: 400.0, time: 0.0 }]);
}
