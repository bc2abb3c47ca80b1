//! Effect units
//!
//! One instantiated effect on one track: an input attachment point, the
//! live parameter handles its automation drives, a wet/dry gain pair and
//! a bypass/bypass-dry gain pair.

use crate::engine::{AudioGraph, GainNode, NodeId, ParamId};
use crate::error::{FxError, Result};

use super::catalog::{EffectKind, BYPASS};

/// How a declared parameter maps onto the unit's signal parameters
#[derive(Debug, Clone, PartialEq)]
pub enum ParamBinding {
    /// One signal parameter
    Single(ParamId),
    /// Several signal parameters driven in lockstep
    Multi(Vec<ParamId>),
    /// Wet level gets `x`, dry level gets `1 - x`
    Mix { wet: ParamId, dry: ParamId },
    /// Left gain gets `-0.5x + 0.5`, right gain gets `0.5x + 0.5`
    Pan { left: ParamId, right: ParamId },
    /// The first `ceil(x)` voice gains are opened to 1; the rest are left alone
    Voices(Vec<ParamId>),
}

impl ParamBinding {
    pub fn set_value_at_time(&self, graph: &mut AudioGraph, value: f64, time: f64) {
        for (param, value) in self.targets(value) {
            graph.set_value_at_time(param, value, time);
        }
    }

    pub fn linear_ramp_to_value_at_time(&self, graph: &mut AudioGraph, value: f64, time: f64) {
        for (param, value) in self.targets(value) {
            graph.linear_ramp_to_value_at_time(param, value, time);
        }
    }

    /// Signal parameters and the values they receive for a scheduled `value`
    fn targets(&self, value: f64) -> Vec<(ParamId, f64)> {
        match self {
            ParamBinding::Single(param) => vec![(*param, value)],
            ParamBinding::Multi(params) => params.iter().map(|p| (*p, value)).collect(),
            ParamBinding::Mix { wet, dry } => vec![(*wet, value), (*dry, 1.0 - value)],
            ParamBinding::Pan { left, right } => vec![
                (*left, (value * -0.5) + 0.5),
                (*right, (value * 0.5) + 0.5),
            ],
            ParamBinding::Voices(gains) => {
                let active = (value.max(0.0).ceil() as usize).min(gains.len());
                gains[..active].iter().map(|g| (*g, 1.0)).collect()
            }
        }
    }

    /// Every signal parameter this binding can touch
    pub fn params(&self) -> Vec<ParamId> {
        match self {
            ParamBinding::Single(param) => vec![*param],
            ParamBinding::Multi(params) | ParamBinding::Voices(params) => params.clone(),
            ParamBinding::Mix { wet, dry } => vec![*wet, *dry],
            ParamBinding::Pan { left, right } => vec![*left, *right],
        }
    }
}

/// Complementary wet/dry gain pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixPair {
    pub wet: GainNode,
    pub dry: GainNode,
}

impl MixPair {
    pub fn binding(&self) -> ParamBinding {
        ParamBinding::Mix {
            wet: self.wet.gain,
            dry: self.dry.gain,
        }
    }
}

/// Complementary bypass crossfade: processed signal vs. untouched input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BypassPair {
    /// Gain on the processed signal
    pub bypass: GainNode,
    /// Gain on the raw input
    pub bypass_dry: GainNode,
}

impl BypassPair {
    /// Step the crossfade to `value` (0 = active, 1 = bypassed) at `time`
    ///
    /// Bypass never ramps.
    pub fn step(&self, graph: &mut AudioGraph, value: f64, time: f64) {
        graph.set_value_at_time(self.bypass.gain, 1.0 - value, time);
        graph.set_value_at_time(self.bypass_dry.gain, value, time);
    }
}

/// One effect instance in a track's chain
#[derive(Debug, Clone, PartialEq)]
pub struct EffectUnit {
    pub(crate) kind: EffectKind,
    pub(crate) input: NodeId,
    pub(crate) output: NodeId,
    pub(crate) mix: Option<MixPair>,
    pub(crate) bypass: Option<BypassPair>,
    pub(crate) bindings: Vec<(&'static str, ParamBinding)>,
}

impl EffectUnit {
    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    /// Attachment point for the upstream signal
    pub fn input(&self) -> NodeId {
        self.input
    }

    /// Node carrying the unit's final signal downstream
    pub fn output(&self) -> NodeId {
        self.output
    }

    pub fn mix(&self) -> Option<&MixPair> {
        self.mix.as_ref()
    }

    pub fn bypass(&self) -> Option<&BypassPair> {
        self.bypass.as_ref()
    }

    /// Live handle for a declared wet-path parameter
    pub fn binding(&self, parameter: &str) -> Result<&ParamBinding> {
        if parameter == BYPASS {
            return Err(FxError::unknown_parameter(self.kind.name(), parameter));
        }
        self.bindings
            .iter()
            .find(|(name, _)| *name == parameter)
            .map(|(_, binding)| binding)
            .ok_or_else(|| FxError::unknown_parameter(self.kind.name(), parameter))
    }

    /// Names of the parameters bound on this unit, in catalog order
    pub fn bound_parameters(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bindings.iter().map(|(name, _)| *name)
    }
}
