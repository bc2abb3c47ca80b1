//! Past-vs-future timing of one automation range
//!
//! Playback may resume mid-score. `offset` is where on the score
//! timeline playback currently is (seconds); `now` is the graph's
//! current time. Score times are mapped onto graph time as
//! `now + time_at(measure) - offset`, clamped to `now`.

use crate::engine::MeasureClock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeTiming {
    /// The range has an end and playback is already at or beyond it
    pub past_end: bool,
    pub start_time: f64,
    pub end_time: f64,
}

impl RangeTiming {
    pub fn resolve(
        clock: &dyn MeasureClock,
        now: f64,
        offset: f64,
        start_measure: f64,
        end_measure: f64,
    ) -> Self {
        let past_end = end_measure != 0.0 && clock.measure_to_time(end_measure) <= offset;
        let start_time = (now + clock.measure_to_time(start_measure) - offset).max(now);
        let end_time = (now + clock.measure_to_time(end_measure) - offset).max(now);
        Self {
            past_end,
            start_time,
            end_time,
        }
    }

    /// When the range's immediate set lands: `now` once past, else the start
    pub fn applied_time(&self, now: f64) -> f64 {
        if self.past_end {
            now
        } else {
            self.start_time
        }
    }
}
