//! Effects Library
//!
//! Catalog of effect types, user-to-engine parameter scaling, and the
//! factory that instantiates one effect unit per type in a signal graph.

mod catalog;
mod chain;
mod scale;
mod topology;
mod unit;

pub use catalog::{
    default_parameter, descriptor, EffectKind, EffectTypeDescriptor, ParameterDescriptor, Quirks,
    BYPASS, MIX,
};
pub use chain::EffectChain;
pub use scale::{db_to_linear, linear_scaling, scale, Scaling};
pub use topology::{create_unit, distortion_curve, CHORUS_MAX_VOICES};
pub use unit::{BypassPair, EffectUnit, MixPair, ParamBinding};
