//! Parameter scaling
//!
//! Scores speak in user units (dB, ms, %, semitones); signal nodes expect
//! engine units (linear gain, seconds, fractions, cents).

use serde::Serialize;

use super::catalog::{self, ParameterDescriptor};
use crate::error::Result;

/// Transform from user units to engine units
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    /// Already in engine units
    Identity,
    /// Decibels to linear amplitude
    Decibels,
    /// Divide by a constant (ms -> s, % -> fraction)
    Divide(f64),
    /// Multiply by a constant (semitones -> cents)
    Multiply(f64),
    /// Linear map from the parameter's declared `[min, max]` onto `[to_min, to_max]`
    Remap { to_min: f64, to_max: f64 },
    /// Reverb time in ms to comb filter resonance
    ReverbTime,
}

impl Scaling {
    pub fn apply(&self, descriptor: &ParameterDescriptor, value: f64) -> f64 {
        match *self {
            Scaling::Identity => value,
            Scaling::Decibels => db_to_linear(value),
            Scaling::Divide(divisor) => value / divisor,
            Scaling::Multiply(factor) => value * factor,
            Scaling::Remap { to_min, to_max } => {
                linear_scaling(descriptor.min, descriptor.max, to_min, to_max, value)
            }
            Scaling::ReverbTime => ((0.8 / 4000.0) * (value - 4000.0)) + 0.8,
        }
    }
}

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(0.05 * db)
}

/// Map `value` from `[from_min, from_max]` onto `[to_min, to_max]`
#[inline]
pub fn linear_scaling(from_min: f64, from_max: f64, to_min: f64, to_max: f64, value: f64) -> f64 {
    let percent = (value - from_min) / (from_max - from_min);
    percent * (to_max - to_min) + to_min
}

/// Scale a user value for `effect`'s `parameter`
pub fn scale(effect: &str, parameter: &str, value: f64) -> Result<f64> {
    Ok(catalog::descriptor(effect)?.parameter(parameter)?.scale(value))
}
