//! fxchain - Effect Automation Scheduling Engine
//!
//! Turns a score's automation ranges into per-track effect chains whose
//! parameters change at musically defined instants.
//!
//! # Architecture
//!
//! - `dsp`: effect catalog, parameter scaling, effect unit topologies
//! - `engine`: signal graph, parameter timelines, measure clocks
//! - `automation`: score data and the chain builder / scheduler
//! - `session`: whole-score graph assembly

pub mod automation;
pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod session;

pub use automation::{build_chain, AutomationRange, BuildOptions, BypassSet, Score, Track, TrackRouting};
pub use config::EngineConfig;
pub use dsp::{EffectChain, EffectKind, EffectUnit};
pub use error::{FxError, Result};
pub use session::{Session, SessionOptions};
