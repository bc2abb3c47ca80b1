//! Effect catalog
//!
//! Static registry of effect types, their parameters, and the historical
//! scheduling exceptions attached to each type. Parameter order is
//! significant: it is the order defaults are applied in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::scale::Scaling;
use crate::error::{FxError, Result};

/// Name of the bypass parameter every audible effect declares
pub const BYPASS: &str = "BYPASS";

/// Name of the wet/dry mix parameter
pub const MIX: &str = "MIX";

/// Closed set of effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EffectKind {
    Volume,
    Delay,
    Filter,
    Compressor,
    Pan,
    Bandpass,
    #[serde(rename = "EQ3BAND")]
    Eq3Band,
    Chorus,
    Flanger,
    Phaser,
    Tremolo,
    Distortion,
    Pitchshift,
    Ringmod,
    Wah,
    Reverb,
    Tempo,
}

impl EffectKind {
    pub const ALL: [EffectKind; 17] = [
        EffectKind::Volume,
        EffectKind::Delay,
        EffectKind::Filter,
        EffectKind::Compressor,
        EffectKind::Pan,
        EffectKind::Bandpass,
        EffectKind::Eq3Band,
        EffectKind::Chorus,
        EffectKind::Flanger,
        EffectKind::Phaser,
        EffectKind::Tremolo,
        EffectKind::Distortion,
        EffectKind::Pitchshift,
        EffectKind::Ringmod,
        EffectKind::Wah,
        EffectKind::Reverb,
        EffectKind::Tempo,
    ];

    /// Score-facing name of this effect type
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Catalog entry for this effect type
    pub fn descriptor(self) -> &'static EffectTypeDescriptor {
        match self {
            EffectKind::Volume => &VOLUME,
            EffectKind::Delay => &DELAY,
            EffectKind::Filter => &FILTER,
            EffectKind::Compressor => &COMPRESSOR,
            EffectKind::Pan => &PAN,
            EffectKind::Bandpass => &BANDPASS,
            EffectKind::Eq3Band => &EQ3BAND,
            EffectKind::Chorus => &CHORUS,
            EffectKind::Flanger => &FLANGER,
            EffectKind::Phaser => &PHASER,
            EffectKind::Tremolo => &TREMOLO,
            EffectKind::Distortion => &DISTORTION,
            EffectKind::Pitchshift => &PITCHSHIFT,
            EffectKind::Ringmod => &RINGMOD,
            EffectKind::Wah => &WAH,
            EffectKind::Reverb => &REVERB,
            EffectKind::Tempo => &TEMPO,
        }
    }
}

impl FromStr for EffectKind {
    type Err = FxError;

    fn from_str(name: &str) -> Result<Self> {
        EffectKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| FxError::UnknownEffect {
                name: name.to_string(),
            })
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One automatable parameter of an effect type
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterDescriptor {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    /// Default value in user units
    pub default: f64,
    pub scaling: Scaling,
}

impl ParameterDescriptor {
    /// Convert a user-facing value to engine units
    pub fn scale(&self, value: f64) -> f64 {
        self.scaling.apply(self, value)
    }

    /// Default value converted to engine units
    pub fn scaled_default(&self) -> f64 {
        self.scale(self.default)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Historical scheduling exceptions attached to an effect type
///
/// Each field names one preserved behavior so it can be retired by
/// editing a table entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quirks {
    /// Parameters never given a default value
    pub never_default: &'static [&'static str],
    /// `(set, suppressed)`: when the range's own parameter is `set`, the
    /// follow-up default pass leaves `suppressed` alone
    pub suppressed_defaults: &'static [(&'static str, &'static str)],
    /// Parameters whose applied value is always the range's end value
    pub always_end_value: &'static [&'static str],
    /// Parameters left untouched when the range already ended
    pub skip_when_past: &'static [&'static str],
    /// Whether ranges schedule anything on the unit once it exists
    pub schedules_parameters: bool,
    /// Whether the effect is realised as a unit in the signal graph
    pub builds_unit: bool,
}

impl Quirks {
    const NONE: Quirks = Quirks {
        never_default: &[],
        suppressed_defaults: &[],
        always_end_value: &[],
        skip_when_past: &[],
        schedules_parameters: true,
        builds_unit: true,
    };
}

/// Catalog entry describing one effect type
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectTypeDescriptor {
    pub kind: EffectKind,
    pub name: &'static str,
    /// Parameter used when a range does not name one
    pub default_parameter: &'static str,
    pub parameters: &'static [ParameterDescriptor],
    pub quirks: Quirks,
}

impl EffectTypeDescriptor {
    pub fn parameter(&self, name: &str) -> Result<&'static ParameterDescriptor> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| FxError::unknown_parameter(self.name, name))
    }

    /// Resolve an optional parameter name, falling back to the default parameter
    pub fn resolve_parameter(&self, name: Option<&str>) -> Result<&'static ParameterDescriptor> {
        self.parameter(name.unwrap_or(self.default_parameter))
    }

    pub fn declares(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p.name == name)
    }
}

/// Look up an effect type by name
pub fn descriptor(name: &str) -> Result<&'static EffectTypeDescriptor> {
    Ok(name.parse::<EffectKind>()?.descriptor())
}

/// Parameter used when a range for `name` omits its parameter
pub fn default_parameter(name: &str) -> Result<&'static str> {
    Ok(descriptor(name)?.default_parameter)
}

const fn param(name: &'static str, min: f64, max: f64, default: f64, scaling: Scaling) -> ParameterDescriptor {
    ParameterDescriptor {
        name,
        min,
        max,
        default,
        scaling,
    }
}

const BYPASS_PARAM: ParameterDescriptor = param(BYPASS, 0.0, 1.0, 0.0, Scaling::Identity);

const fn mix_param(default: f64) -> ParameterDescriptor {
    param(MIX, 0.0, 1.0, default, Scaling::Identity)
}

static VOLUME: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Volume,
    name: "VOLUME",
    default_parameter: "GAIN",
    parameters: &[
        param("GAIN", -60.0, 12.0, 0.0, Scaling::Decibels),
        BYPASS_PARAM,
    ],
    quirks: Quirks::NONE,
};

static DELAY: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Delay,
    name: "DELAY",
    default_parameter: "DELAY_TIME",
    parameters: &[
        param("DELAY_TIME", 0.0, 4000.0, 300.0, Scaling::Divide(1000.0)),
        param("DELAY_FEEDBACK", -120.0, -1.0, -5.0, Scaling::Decibels),
        mix_param(0.5),
        BYPASS_PARAM,
    ],
    quirks: Quirks::NONE,
};

static FILTER: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Filter,
    name: "FILTER",
    default_parameter: "FILTER_FREQ",
    parameters: &[
        param("FILTER_FREQ", 20.0, 20000.0, 1000.0, Scaling::Identity),
        param("FILTER_RESONANCE", 0.0, 1.0, 0.8, Scaling::Remap { to_min: 1.0, to_max: 5.0 }),
        BYPASS_PARAM,
        mix_param(1.0),
    ],
    quirks: Quirks::NONE,
};

static COMPRESSOR: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Compressor,
    name: "COMPRESSOR",
    default_parameter: "COMPRESSOR_THRESHOLD",
    parameters: &[
        param("COMPRESSOR_THRESHOLD", -30.0, 0.0, -18.0, Scaling::Identity),
        param("COMPRESSOR_RATIO", 1.0, 100.0, 10.0, Scaling::Identity),
        BYPASS_PARAM,
    ],
    quirks: Quirks::NONE,
};

static PAN: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Pan,
    name: "PAN",
    default_parameter: "LEFT_RIGHT",
    parameters: &[
        param("LEFT_RIGHT", -100.0, 100.0, 0.0, Scaling::Remap { to_min: -1.0, to_max: 1.0 }),
        BYPASS_PARAM,
    ],
    quirks: Quirks::NONE,
};

static BANDPASS: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Bandpass,
    name: "BANDPASS",
    default_parameter: "BANDPASS_FREQ",
    parameters: &[
        param("BANDPASS_FREQ", 20.0, 20000.0, 800.0, Scaling::Identity),
        param("BANDPASS_WIDTH", 0.0, 1.0, 0.5, Scaling::Remap { to_min: 1.0, to_max: 5.0 }),
        BYPASS_PARAM,
        mix_param(1.0),
    ],
    quirks: Quirks::NONE,
};

static EQ3BAND: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Eq3Band,
    name: "EQ3BAND",
    default_parameter: "EQ3BAND_LOWGAIN",
    parameters: &[
        param("EQ3BAND_LOWGAIN", -24.0, 18.0, 0.0, Scaling::Identity),
        param("EQ3BAND_LOWFREQ", 20.0, 20000.0, 200.0, Scaling::Identity),
        param("EQ3BAND_MIDGAIN", -24.0, 18.0, 0.0, Scaling::Identity),
        param("EQ3BAND_MIDFREQ", 20.0, 20000.0, 200.0, Scaling::Identity),
        param("EQ3BAND_HIGHGAIN", -24.0, 18.0, 0.0, Scaling::Identity),
        param("EQ3BAND_HIGHFREQ", 20.0, 20000.0, 200.0, Scaling::Identity),
        BYPASS_PARAM,
        mix_param(1.0),
    ],
    quirks: Quirks {
        never_default: &["EQ3BAND_HIGHFREQ"],
        ..Quirks::NONE
    },
};

static CHORUS: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Chorus,
    name: "CHORUS",
    default_parameter: "CHORUS_LENGTH",
    parameters: &[
        param("CHORUS_LENGTH", 1.0, 250.0, 15.0, Scaling::Divide(1000.0)),
        param("CHORUS_NUMVOICES", 1.0, 8.0, 1.0, Scaling::Identity),
        param("CHORUS_RATE", 0.1, 16.0, 0.5, Scaling::Identity),
        param("CHORUS_MOD", 0.0, 1.0, 0.7, Scaling::Divide(1000.0)),
        BYPASS_PARAM,
        mix_param(1.0),
    ],
    quirks: Quirks {
        always_end_value: &["CHORUS_NUMVOICES"],
        ..Quirks::NONE
    },
};

static FLANGER: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Flanger,
    name: "FLANGER",
    default_parameter: "FLANGER_LENGTH",
    parameters: &[
        param("FLANGER_LENGTH", 0.0, 200.0, 6.0, Scaling::Divide(1000.0)),
        param("FLANGER_FEEDBACK", -80.0, -1.0, -50.0, Scaling::Decibels),
        param("FLANGER_RATE", 0.001, 100.0, 0.6, Scaling::Identity),
        BYPASS_PARAM,
        mix_param(1.0),
    ],
    quirks: Quirks::NONE,
};

static PHASER: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Phaser,
    name: "PHASER",
    default_parameter: "PHASER_RATE",
    parameters: &[
        param("PHASER_RATE", 0.0, 10.0, 0.5, Scaling::Identity),
        param("PHASER_FEEDBACK", -120.0, -1.0, -3.0, Scaling::Decibels),
        param("PHASER_RANGEMIN", 40.0, 20000.0, 440.0, Scaling::Identity),
        param("PHASER_RANGEMAX", 40.0, 20000.0, 1600.0, Scaling::Identity),
        BYPASS_PARAM,
        mix_param(1.0),
    ],
    quirks: Quirks::NONE,
};

static TREMOLO: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Tremolo,
    name: "TREMOLO",
    default_parameter: "TREMOLO_FREQ",
    parameters: &[
        param("TREMOLO_FREQ", 0.0, 100.0, 4.0, Scaling::Identity),
        param("TREMOLO_AMOUNT", -60.0, 0.0, -6.0, Scaling::Decibels),
        BYPASS_PARAM,
        mix_param(1.0),
    ],
    quirks: Quirks::NONE,
};

// DISTO_GAIN and MIX drive the same wet/dry pair, so neither default may
// overwrite the other.
static DISTORTION: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Distortion,
    name: "DISTORTION",
    default_parameter: "DISTO_GAIN",
    parameters: &[
        param("DISTO_GAIN", 0.0, 50.0, 20.0, Scaling::Remap { to_min: 0.0, to_max: 1.0 }),
        BYPASS_PARAM,
        mix_param(0.5),
    ],
    quirks: Quirks {
        never_default: &[MIX],
        suppressed_defaults: &[(MIX, "DISTO_GAIN")],
        ..Quirks::NONE
    },
};

static PITCHSHIFT: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Pitchshift,
    name: "PITCHSHIFT",
    default_parameter: "PITCHSHIFT_SHIFT",
    parameters: &[
        param("PITCHSHIFT_SHIFT", -12.0, 12.0, 0.0, Scaling::Multiply(100.0)),
        BYPASS_PARAM,
        mix_param(1.0),
    ],
    quirks: Quirks {
        schedules_parameters: false,
        ..Quirks::NONE
    },
};

static RINGMOD: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Ringmod,
    name: "RINGMOD",
    default_parameter: "RINGMOD_MODFREQ",
    parameters: &[
        param("RINGMOD_MODFREQ", 0.0, 100.0, 40.0, Scaling::Identity),
        param("RINGMOD_FEEDBACK", 0.0, 100.0, 0.0, Scaling::Divide(100.0)),
        BYPASS_PARAM,
        mix_param(1.0),
    ],
    quirks: Quirks::NONE,
};

static WAH: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Wah,
    name: "WAH",
    default_parameter: "WAH_POSITION",
    parameters: &[
        param("WAH_POSITION", 0.0, 1.0, 0.0, Scaling::Remap { to_min: 350.0, to_max: 10000.0 }),
        BYPASS_PARAM,
        mix_param(1.0),
    ],
    quirks: Quirks::NONE,
};

static REVERB: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Reverb,
    name: "REVERB",
    default_parameter: "REVERB_DAMPFREQ",
    parameters: &[
        param("REVERB_TIME", 0.0, 4000.0, 3500.0, Scaling::ReverbTime),
        param("REVERB_DAMPFREQ", 200.0, 18000.0, 8000.0, Scaling::Identity),
        mix_param(1.0),
        BYPASS_PARAM,
    ],
    quirks: Quirks {
        skip_when_past: &["REVERB_TIME"],
        ..Quirks::NONE
    },
};

// Tempo automation shapes the timeline, not the signal.
static TEMPO: EffectTypeDescriptor = EffectTypeDescriptor {
    kind: EffectKind::Tempo,
    name: "TEMPO",
    default_parameter: "TEMPO",
    parameters: &[param("TEMPO", 45.0, 220.0, 0.0, Scaling::Identity)],
    quirks: Quirks {
        schedules_parameters: false,
        builds_unit: false,
        ..Quirks::NONE
    },
};
