//! Per-effect unit topologies
//!
//! Every audible unit shares the same scaffold:
//!
//! ```text
//! input ─┬─> [processing] ─> wet ─> bypass ─────┬─> output
//!        ├─> dry ───────────────────────────────┤
//!        └─> bypass_dry ────────────────────────┘
//! ```
//!
//! Each effect type only supplies the processing section and the
//! bindings from its declared parameters onto that section's signal
//! parameters. Pitchshift is the exception: its unit is a plain
//! pass-through into the external pitch shifter.

use std::f64::consts::PI;

use log::debug;

use super::catalog::{EffectKind, MIX};
use super::unit::{BypassPair, EffectUnit, MixPair, ParamBinding};
use crate::engine::{AudioGraph, FilterType, GainNode, NodeId};

/// Maximum delay of a delay line created without an explicit bound (seconds)
const DEFAULT_MAX_DELAY: f64 = 1.0;

/// Voices available to the chorus
pub const CHORUS_MAX_VOICES: usize = 8;

/// Freeverb comb filter delay times (seconds)
const COMB_FILTER_TUNINGS: [f64; 8] = [
    1557.0 / 48000.0,
    1617.0 / 48000.0,
    1491.0 / 48000.0,
    1422.0 / 48000.0,
    1277.0 / 48000.0,
    1356.0 / 48000.0,
    1188.0 / 48000.0,
    1116.0 / 48000.0,
];

/// Freeverb allpass centre frequencies (Hz)
const ALLPASS_FILTER_FREQUENCIES: [f64; 4] = [225.0, 556.0, 441.0, 341.0];

/// Offset applied to the right allpass bank for stereo spread
const STEREO_SPREAD: f64 = 23.0 / 48000.0;

type Bindings = Vec<(&'static str, ParamBinding)>;

/// Build one unit of `kind` inside `graph`
///
/// Returns `None` for effect types that are not realised as units
/// (TEMPO).
pub fn create_unit(graph: &mut AudioGraph, kind: EffectKind) -> Option<EffectUnit> {
    let descriptor = kind.descriptor();
    if !descriptor.quirks.builds_unit {
        return None;
    }

    if kind == EffectKind::Pitchshift {
        return Some(pitchshift(graph));
    }

    let scaffold = Scaffold::new(graph);
    let wet = scaffold.mix.wet.id;
    let input = scaffold.input.id;

    let mut bindings = match kind {
        EffectKind::Volume => volume(graph, input, wet),
        EffectKind::Delay => delay(graph, input, wet),
        EffectKind::Filter => filter(graph, input, wet),
        EffectKind::Compressor => compressor(graph, input, wet),
        EffectKind::Pan => pan(graph, input, wet),
        EffectKind::Bandpass => bandpass(graph, input, wet),
        EffectKind::Eq3Band => eq3band(graph, input, wet),
        EffectKind::Chorus => chorus(graph, input, wet),
        EffectKind::Flanger => flanger(graph, input, wet),
        EffectKind::Phaser => phaser(graph, input, wet),
        EffectKind::Tremolo => tremolo(graph, input, wet),
        EffectKind::Distortion => distortion(graph, input, &scaffold.mix),
        EffectKind::Ringmod => ringmod(graph, input, wet),
        EffectKind::Wah => wah(graph, input, wet),
        EffectKind::Reverb => reverb(graph, input, wet),
        EffectKind::Pitchshift | EffectKind::Tempo => Vec::new(),
    };

    if descriptor.declares(MIX) {
        bindings.push((MIX, scaffold.mix.binding()));
    }
    bindings.sort_by_key(|(name, _)| descriptor.parameters.iter().position(|p| p.name == *name));

    debug!("created {} unit ({} bindings)", kind, bindings.len());

    Some(EffectUnit {
        kind,
        input,
        output: scaffold.output.id,
        mix: Some(scaffold.mix),
        bypass: Some(scaffold.bypass),
        bindings,
    })
}

/// Input/output attachment points plus the wet/dry and bypass pairs
struct Scaffold {
    input: GainNode,
    output: GainNode,
    mix: MixPair,
    bypass: BypassPair,
}

impl Scaffold {
    fn new(graph: &mut AudioGraph) -> Self {
        let input = graph.create_gain();
        let output = graph.create_gain();
        let bypass = BypassPair {
            bypass: graph.create_gain(),
            bypass_dry: graph.create_gain(),
        };
        let mix = MixPair {
            wet: graph.create_gain(),
            dry: graph.create_gain(),
        };

        graph.set_initial_value(bypass.bypass.gain, 1.0);
        graph.set_initial_value(bypass.bypass_dry.gain, 0.0);
        graph.set_initial_value(mix.wet.gain, 1.0);
        graph.set_initial_value(mix.dry.gain, 0.0);

        graph.connect(input.id, bypass.bypass_dry.id);
        graph.connect(bypass.bypass_dry.id, output.id);
        graph.connect(bypass.bypass.id, output.id);
        graph.connect(input.id, mix.dry.id);
        graph.connect(mix.dry.id, output.id);
        graph.connect(mix.wet.id, bypass.bypass.id);

        Self {
            input,
            output,
            mix,
            bypass,
        }
    }
}

// ============================================================================
// Simple processors
// ============================================================================

fn volume(graph: &mut AudioGraph, input: NodeId, wet: NodeId) -> Bindings {
    let volume = graph.create_gain();
    graph.connect(input, volume.id);
    graph.connect(volume.id, wet);
    vec![("GAIN", ParamBinding::Single(volume.gain))]
}

fn delay(graph: &mut AudioGraph, input: NodeId, wet: NodeId) -> Bindings {
    // Long enough for the whole DELAY_TIME range
    let line = graph.create_delay(4.0);
    let feedback = graph.create_gain();
    graph.set_initial_value(feedback.gain, 0.0);

    graph.connect(input, line.id);
    graph.connect(line.id, feedback.id);
    graph.connect(line.id, wet);
    graph.connect(feedback.id, line.id);

    vec![
        ("DELAY_TIME", ParamBinding::Single(line.delay_time)),
        ("DELAY_FEEDBACK", ParamBinding::Single(feedback.gain)),
    ]
}

fn filter(graph: &mut AudioGraph, input: NodeId, wet: NodeId) -> Bindings {
    let lowpass = graph.create_biquad_filter(FilterType::Lowpass);
    graph.set_initial_value(lowpass.frequency, 0.0);
    graph.connect(input, lowpass.id);
    graph.connect(lowpass.id, wet);
    vec![
        ("FILTER_FREQ", ParamBinding::Single(lowpass.frequency)),
        ("FILTER_RESONANCE", ParamBinding::Single(lowpass.q)),
    ]
}

fn compressor(graph: &mut AudioGraph, input: NodeId, wet: NodeId) -> Bindings {
    let comp = graph.create_dynamics_compressor();
    graph.set_initial_value(comp.attack, 0.01);
    graph.set_initial_value(comp.release, 0.15);
    graph.set_initial_value(comp.knee, 3.0);
    graph.connect(input, comp.id);
    graph.connect(comp.id, wet);
    vec![
        ("COMPRESSOR_THRESHOLD", ParamBinding::Single(comp.threshold)),
        ("COMPRESSOR_RATIO", ParamBinding::Single(comp.ratio)),
    ]
}

fn pan(graph: &mut AudioGraph, input: NodeId, wet: NodeId) -> Bindings {
    let left = graph.create_gain();
    let right = graph.create_gain();
    let merger = graph.create_channel_merger(2);

    graph.connect(input, left.id);
    graph.connect(input, right.id);
    graph.connect_channel(left.id, 0, merger, 0);
    graph.connect_channel(right.id, 0, merger, 1);
    graph.connect(merger, wet);

    vec![(
        "LEFT_RIGHT",
        ParamBinding::Pan {
            left: left.gain,
            right: right.gain,
        },
    )]
}

fn bandpass(graph: &mut AudioGraph, input: NodeId, wet: NodeId) -> Bindings {
    let band = graph.create_biquad_filter(FilterType::Bandpass);
    graph.set_initial_value(band.frequency, 0.0);
    graph.connect(input, band.id);
    graph.connect(band.id, wet);
    vec![
        ("BANDPASS_FREQ", ParamBinding::Single(band.frequency)),
        ("BANDPASS_WIDTH", ParamBinding::Single(band.q)),
    ]
}

fn eq3band(graph: &mut AudioGraph, input: NodeId, wet: NodeId) -> Bindings {
    let low = graph.create_biquad_filter(FilterType::Lowshelf);
    let mid = graph.create_biquad_filter(FilterType::Peaking);
    let high = graph.create_biquad_filter(FilterType::Highshelf);
    for band in [&low, &mid, &high] {
        graph.set_initial_value(band.frequency, 0.0);
    }

    graph.connect(input, low.id);
    graph.connect(low.id, mid.id);
    graph.connect(mid.id, high.id);
    graph.connect(high.id, wet);

    vec![
        ("EQ3BAND_LOWGAIN", ParamBinding::Single(low.gain)),
        ("EQ3BAND_LOWFREQ", ParamBinding::Single(low.frequency)),
        ("EQ3BAND_MIDGAIN", ParamBinding::Single(mid.gain)),
        ("EQ3BAND_MIDFREQ", ParamBinding::Single(mid.frequency)),
        ("EQ3BAND_HIGHGAIN", ParamBinding::Single(high.gain)),
        ("EQ3BAND_HIGHFREQ", ParamBinding::Single(high.frequency)),
    ]
}

fn wah(graph: &mut AudioGraph, input: NodeId, wet: NodeId) -> Bindings {
    let band = graph.create_biquad_filter(FilterType::Bandpass);
    graph.set_initial_value(band.frequency, 0.0);
    graph.set_initial_value(band.q, 1.25);
    graph.connect(input, band.id);
    graph.connect(band.id, wet);
    vec![("WAH_POSITION", ParamBinding::Single(band.frequency))]
}

// ============================================================================
// Modulation effects
// ============================================================================

fn chorus(graph: &mut AudioGraph, input: NodeId, wet: NodeId) -> Bindings {
    let lfo = graph.create_oscillator();
    let lfo_gain = graph.create_gain();
    graph.set_initial_value(lfo.frequency, 0.0);
    graph.connect(lfo.id, lfo_gain.id);

    let mut delay_times = Vec::with_capacity(CHORUS_MAX_VOICES);
    let mut voice_gains = Vec::with_capacity(CHORUS_MAX_VOICES);
    for voice in 0..CHORUS_MAX_VOICES {
        let line = graph.create_delay(DEFAULT_MAX_DELAY);
        let gain = graph.create_gain();
        // Only the first voice sounds initially
        graph.set_initial_value(gain.gain, if voice == 0 { 1.0 } else { 0.0 });

        graph.connect(input, line.id);
        graph.connect_param(lfo_gain.id, line.delay_time);
        graph.connect(line.id, gain.id);
        graph.connect(gain.id, wet);

        delay_times.push(line.delay_time);
        voice_gains.push(gain.gain);
    }

    vec![
        ("CHORUS_LENGTH", ParamBinding::Multi(delay_times)),
        ("CHORUS_NUMVOICES", ParamBinding::Voices(voice_gains)),
        ("CHORUS_RATE", ParamBinding::Single(lfo.frequency)),
        ("CHORUS_MOD", ParamBinding::Single(lfo_gain.gain)),
    ]
}

fn flanger(graph: &mut AudioGraph, input: NodeId, wet: NodeId) -> Bindings {
    let feedback = graph.create_gain();
    let lfo = graph.create_oscillator();
    let lfo_gain = graph.create_gain();
    let line = graph.create_delay(DEFAULT_MAX_DELAY);
    graph.set_initial_value(lfo.frequency, 0.0);
    graph.set_initial_value(lfo_gain.gain, 0.003);
    graph.set_initial_value(feedback.gain, 0.0);

    graph.connect(input, line.id);
    graph.connect(lfo.id, lfo_gain.id);
    graph.connect_param(lfo_gain.id, line.delay_time);
    graph.connect(line.id, wet);
    graph.connect(line.id, feedback.id);
    graph.connect(feedback.id, line.id);

    vec![
        ("FLANGER_LENGTH", ParamBinding::Single(line.delay_time)),
        ("FLANGER_FEEDBACK", ParamBinding::Single(feedback.gain)),
        ("FLANGER_RATE", ParamBinding::Single(lfo.frequency)),
    ]
}

fn phaser(graph: &mut AudioGraph, input: NodeId, wet: NodeId) -> Bindings {
    let feedback = graph.create_gain();
    let short_delay = graph.create_delay(1.0 / graph.sample_rate());
    let lfo = graph.create_oscillator();
    let lfo_gain = graph.create_gain();
    graph.set_initial_value(lfo.frequency, 0.0);
    graph.set_initial_value(lfo_gain.gain, 300.0);
    graph.connect(lfo.id, lfo_gain.id);

    // Four allpass stages in series, all swept by the LFO
    let stages: Vec<_> = (0..4)
        .map(|_| graph.create_biquad_filter(FilterType::Allpass))
        .collect();
    let mut last = input;
    for stage in &stages {
        graph.connect_param(lfo_gain.id, stage.frequency);
        graph.connect(last, stage.id);
        last = stage.id;
    }
    graph.connect(last, wet);
    graph.connect(last, feedback.id);
    // One-sample delay breaks the zero-delay cycle
    graph.connect(feedback.id, short_delay.id);
    graph.connect(short_delay.id, stages[0].id);

    vec![
        ("PHASER_RATE", ParamBinding::Single(lfo.frequency)),
        ("PHASER_FEEDBACK", ParamBinding::Single(feedback.gain)),
        (
            "PHASER_RANGEMIN",
            ParamBinding::Multi(vec![stages[0].frequency, stages[1].frequency]),
        ),
        (
            "PHASER_RANGEMAX",
            ParamBinding::Multi(vec![stages[2].frequency, stages[3].frequency]),
        ),
    ]
}

fn tremolo(graph: &mut AudioGraph, input: NodeId, wet: NodeId) -> Bindings {
    let feedback = graph.create_gain();
    let short_delay = graph.create_delay(1.0 / graph.sample_rate());
    let lfo = graph.create_oscillator();
    let lfo_gain = graph.create_gain();
    let input_gain = graph.create_gain();
    graph.set_initial_value(lfo.frequency, 0.0);
    graph.set_initial_value(lfo_gain.gain, 0.1);
    graph.set_initial_value(feedback.gain, 0.2);

    graph.connect(input, input_gain.id);
    graph.connect(lfo.id, lfo_gain.id);
    graph.connect(input_gain.id, wet);
    graph.connect(input_gain.id, feedback.id);
    graph.connect(feedback.id, short_delay.id);
    graph.connect(short_delay.id, input_gain.id);
    graph.connect_param(lfo_gain.id, input_gain.gain);

    vec![
        ("TREMOLO_FREQ", ParamBinding::Single(lfo.frequency)),
        ("TREMOLO_AMOUNT", ParamBinding::Single(lfo_gain.gain)),
    ]
}

fn ringmod(graph: &mut AudioGraph, input: NodeId, wet: NodeId) -> Bindings {
    let feedback = graph.create_gain();
    let short_delay = graph.create_delay(1.0 / graph.sample_rate());
    let lfo = graph.create_oscillator();
    let ring_gain = graph.create_gain();
    let input_gain = graph.create_gain();
    graph.set_initial_value(lfo.frequency, 40.0);
    graph.set_initial_value(feedback.gain, 0.0);

    graph.connect(input, input_gain.id);
    graph.connect(lfo.id, ring_gain.id);
    graph.connect(input_gain.id, wet);
    graph.connect(input_gain.id, feedback.id);
    graph.connect(feedback.id, short_delay.id);
    graph.connect(short_delay.id, input_gain.id);
    graph.connect_param(ring_gain.id, input_gain.gain);

    vec![
        ("RINGMOD_MODFREQ", ParamBinding::Single(lfo.frequency)),
        ("RINGMOD_FEEDBACK", ParamBinding::Single(feedback.gain)),
    ]
}

// ============================================================================
// Distortion
// ============================================================================

const DISTORTION_PRE_GAIN: f64 = 3.0;
const DISTORTION_CURVE_LEN: usize = 22050;

/// Soft-clipping transfer curve sampled over `[-1, 1)`
pub fn distortion_curve(amount: f64, len: usize) -> Vec<f32> {
    let deg = PI / 180.0;
    (0..len)
        .map(|i| {
            let x = (i as f64) * 2.0 / (len as f64) - 1.0;
            ((3.0 + amount) * x * 20.0 * deg / (PI + amount * x.abs())) as f32
        })
        .collect()
}

fn distortion(graph: &mut AudioGraph, input: NodeId, mix: &MixPair) -> Bindings {
    let pre_gain = graph.create_gain();
    let post_gain = graph.create_gain();
    let shaper = graph.create_wave_shaper(&distortion_curve(
        DISTORTION_PRE_GAIN * 100.0,
        DISTORTION_CURVE_LEN,
    ));
    graph.set_initial_value(pre_gain.gain, DISTORTION_PRE_GAIN);
    graph.set_initial_value(post_gain.gain, (1.0 / DISTORTION_PRE_GAIN).powf(0.6));
    graph.set_initial_value(mix.wet.gain, 0.5);
    graph.set_initial_value(mix.dry.gain, 0.5);

    graph.connect(input, pre_gain.id);
    graph.connect(pre_gain.id, shaper);
    graph.connect(shaper, post_gain.id);
    graph.connect(post_gain.id, mix.wet.id);

    // DISTO_GAIN drives the wet/dry pair directly
    vec![("DISTO_GAIN", mix.binding())]
}

// ============================================================================
// Reverb
// ============================================================================

/// Freeverb: eight lowpass-feedback comb filters split across two
/// channels, each side diffused by four allpass stages, then highpassed
/// and summed with the direct signal.
fn reverb(graph: &mut AudioGraph, input: NodeId, wet: NodeId) -> Bindings {
    let entry = graph.create_gain();
    let out = graph.create_gain();
    let merger = graph.create_channel_merger(2);
    let splitter = graph.create_channel_splitter(2);
    let highpass = graph.create_biquad_filter(FilterType::Highpass);
    graph.set_initial_value(highpass.frequency, 200.0);

    graph.connect(input, entry.id);
    graph.connect(entry.id, out.id);
    graph.connect(entry.id, splitter);
    graph.connect(merger, highpass.id);
    graph.connect(highpass.id, out.id);
    graph.connect(out.id, wet);

    let allpass_left = allpass_bank(graph, 0.0);
    let allpass_right = allpass_bank(graph, STEREO_SPREAD);
    graph.connect_channel(allpass_left[allpass_left.len() - 1], 0, merger, 0);
    graph.connect_channel(allpass_right[allpass_right.len() - 1], 0, merger, 1);

    let mut resonance = Vec::with_capacity(COMB_FILTER_TUNINGS.len());
    let mut dampening = Vec::with_capacity(COMB_FILTER_TUNINGS.len());
    for (i, &tuning) in COMB_FILTER_TUNINGS.iter().enumerate() {
        let comb = graph.create_delay(DEFAULT_MAX_DELAY);
        let lowpass = graph.create_biquad_filter(FilterType::Lowpass);
        let feedback = graph.create_gain();
        graph.set_initial_value(comb.delay_time, tuning);
        graph.set_initial_value(lowpass.q, 0.15);
        graph.set_initial_value(feedback.gain, 0.5);

        graph.connect(comb.id, lowpass.id);
        graph.connect(lowpass.id, feedback.id);
        graph.connect(feedback.id, comb.id);

        if i < COMB_FILTER_TUNINGS.len() / 2 {
            graph.connect_channel(splitter, 0, comb.id, 0);
            graph.connect(comb.id, allpass_left[0]);
        } else {
            graph.connect_channel(splitter, 1, comb.id, 0);
            graph.connect(comb.id, allpass_right[0]);
        }

        resonance.push(feedback.gain);
        dampening.push(lowpass.frequency);
    }

    vec![
        ("REVERB_TIME", ParamBinding::Multi(resonance)),
        ("REVERB_DAMPFREQ", ParamBinding::Multi(dampening)),
    ]
}

/// Four allpass filters in series
fn allpass_bank(graph: &mut AudioGraph, spread: f64) -> Vec<NodeId> {
    let mut bank: Vec<NodeId> = Vec::with_capacity(ALLPASS_FILTER_FREQUENCIES.len());
    for &frequency in &ALLPASS_FILTER_FREQUENCIES {
        let stage = graph.create_biquad_filter(FilterType::Allpass);
        graph.set_initial_value(stage.frequency, frequency + spread);
        if let Some(&previous) = bank.last() {
            graph.connect(previous, stage.id);
        }
        bank.push(stage.id);
    }
    bank
}

// ============================================================================
// Pitchshift
// ============================================================================

/// Pass-through into the external block-based pitch shifter
fn pitchshift(graph: &mut AudioGraph) -> EffectUnit {
    let input = graph.create_gain();
    let shifter = graph.create_pitch_shifter();
    graph.connect(input.id, shifter);

    debug!("created {} unit (pass-through)", EffectKind::Pitchshift);

    EffectUnit {
        kind: EffectKind::Pitchshift,
        input: input.id,
        output: shifter,
        mix: None,
        bypass: None,
        bindings: Vec::new(),
    }
}
