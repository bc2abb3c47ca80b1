//! Signal Engine Module
//!
//! The collaborators the scheduling core drives:
//! - Signal graph primitives and their parameters
//! - Scheduled parameter timelines
//! - Measure to seconds conversion

pub mod graph;
pub mod param;
pub mod tempo;

pub use graph::{
    AudioGraph, BiquadNode, CompressorNode, Connection, DelayNode, FilterType, GainNode, Node,
    NodeId, NodeKind, OscillatorNode, Port, ScheduledCall,
};
pub use param::{AutomationEvent, ParamId, ScheduledParam};
pub use tempo::{ConstantTempo, MeasureClock, TempoMap, TempoPoint};
