//! Automation Module
//!
//! Score data and the scheduler that turns a track's automation ranges
//! into an effect chain with parameter timelines:
//! - Ranges, lanes, tracks and scores
//! - Bypass sets
//! - Past-vs-future range timing
//! - Chain building

pub mod builder;
pub mod bypass;
pub mod range;
pub mod timing;

pub use builder::{build_chain, BuildOptions, ChainBuilder, TrackRouting};
pub use bypass::BypassSet;
pub use range::{AutomationRange, EffectLanes, ResolvedRange, Score, Track};
pub use timing::RangeTiming;
