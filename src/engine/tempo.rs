//! Measure to seconds conversion
//!
//! Measures are 1-based: measure 1 starts at 0 seconds.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::automation::AutomationRange;
use crate::config::DEFAULT_BEATS_PER_MEASURE;
use crate::dsp::EffectKind;

/// Converts a musical position (measure) into seconds on the timeline
///
/// Implementations must be monotonic in `measure`.
pub trait MeasureClock {
    fn measure_to_time(&self, measure: f64) -> f64;
}

/// Fixed tempo: `(measure - 1) * beats_per_measure * 60 / tempo`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantTempo {
    tempo: f64,
    beats_per_measure: f64,
}

impl ConstantTempo {
    /// Constant tempo in 4/4
    pub fn new(tempo: f64) -> Self {
        Self::with_beats_per_measure(tempo, DEFAULT_BEATS_PER_MEASURE)
    }

    pub fn with_beats_per_measure(tempo: f64, beats_per_measure: f64) -> Self {
        Self {
            tempo,
            beats_per_measure,
        }
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }
}

impl MeasureClock for ConstantTempo {
    fn measure_to_time(&self, measure: f64) -> f64 {
        (measure - 1.0) * self.beats_per_measure * 60.0 / self.tempo
    }
}

/// A tempo marking on the tempo curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoPoint {
    pub measure: f64,
    pub tempo: f64,
}

/// Tempo before the first marking
const INITIAL_POINT: TempoPoint = TempoPoint {
    measure: 1.0,
    tempo: 120.0,
};

/// Piecewise-linear tempo curve
///
/// Tempo interpolates linearly between points and holds after the last
/// point. Elapsed time integrates `60 * bpm / tempo(m)` over measures.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    points: Vec<TempoPoint>,
    beats_per_measure: f64,
}

impl TempoMap {
    pub fn new(points: Vec<TempoPoint>) -> Self {
        Self::with_beats_per_measure(points, DEFAULT_BEATS_PER_MEASURE)
    }

    pub fn with_beats_per_measure(mut points: Vec<TempoPoint>, beats_per_measure: f64) -> Self {
        // Leading points sharing a measure do not shape the curve
        while points.len() > 1 && points[0].measure == points[1].measure {
            points.remove(0);
        }
        Self {
            points,
            beats_per_measure,
        }
    }

    /// Tempo curve from TEMPO automation ranges
    ///
    /// Each range contributes its start point, and its end point when it
    /// has an end. Ranges of other effects are ignored.
    pub fn from_lane<'a, I>(ranges: I, beats_per_measure: f64) -> Self
    where
        I: IntoIterator<Item = &'a AutomationRange>,
    {
        let tempo = EffectKind::Tempo.name();
        let mut points = Vec::new();
        for range in ranges.into_iter().filter(|r| r.name == tempo) {
            let Some(start) = range.start_value.filter(|v| *v > 0.0) else {
                warn!("ignoring TEMPO range at measure {} without a tempo", range.start_measure);
                continue;
            };
            points.push(TempoPoint {
                measure: range.start_measure,
                tempo: start,
            });
            if range.end_measure != 0.0 {
                points.push(TempoPoint {
                    measure: range.end_measure,
                    tempo: range.end_value.unwrap_or(start),
                });
            }
        }
        points.sort_by(|a, b| a.measure.total_cmp(&b.measure));
        Self::with_beats_per_measure(points, beats_per_measure)
    }

    pub fn points(&self) -> &[TempoPoint] {
        &self.points
    }

    /// Tempo in effect at `measure`
    pub fn tempo_at_measure(&self, measure: f64) -> f64 {
        self.point_at_measure(measure).1
    }

    /// Returns (seconds, tempo) at `measure`
    fn point_at_measure(&self, measure: f64) -> (f64, f64) {
        let mut time = 0.0;
        let mut prev = INITIAL_POINT;
        let mut next = prev;

        for &point in &self.points {
            next = point;
            if measure < point.measure {
                break;
            }
            time += self.segment_time(prev, point, point.measure);
            prev = point;
        }
        time += self.segment_time(prev, next, measure);

        if next.measure == prev.measure {
            return (time, next.tempo);
        }
        let slope = (next.tempo - prev.tempo) / (next.measure - prev.measure);
        (time, prev.tempo + slope * (measure - prev.measure))
    }

    /// Seconds elapsed from `start.measure` to `measure` along the segment `start -> end`
    fn segment_time(&self, start: TempoPoint, end: TempoPoint, measure: f64) -> f64 {
        let seconds_per_measure = |tempo: f64| 60.0 * self.beats_per_measure / tempo;

        if start.measure == end.measure {
            return (measure - end.measure) * seconds_per_measure(end.tempo);
        }
        if start.tempo == end.tempo {
            return (measure - start.measure) * seconds_per_measure(start.tempo);
        }
        let slope = (end.tempo - start.tempo) / (end.measure - start.measure);
        let tempo = start.tempo + slope * (measure - start.measure);
        60.0 * self.beats_per_measure / slope * (tempo / start.tempo).ln()
    }
}

impl MeasureClock for TempoMap {
    fn measure_to_time(&self, measure: f64) -> f64 {
        self.point_at_measure(measure).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_tempo() {
        let clock = ConstantTempo::new(120.0);
        assert_eq!(clock.measure_to_time(1.0), 0.0);
        assert_eq!(clock.measure_to_time(2.0), 2.0);
        assert_eq!(clock.measure_to_time(3.5), 5.0);
    }

    #[test]
    fn test_constant_tempo_three_four() {
        let clock = ConstantTempo::with_beats_per_measure(90.0, 3.0);
        assert_relative_eq!(clock.measure_to_time(3.0), 4.0);
    }

    #[test]
    fn test_empty_map_defaults_to_120() {
        let map = TempoMap::new(Vec::new());
        assert_relative_eq!(map.measure_to_time(1.0), 0.0);
        assert_relative_eq!(map.measure_to_time(5.0), 8.0);
        assert_eq!(map.tempo_at_measure(7.0), 120.0);
    }

    #[test]
    fn test_single_point_matches_constant_tempo() {
        let map = TempoMap::new(vec![TempoPoint {
            measure: 1.0,
            tempo: 90.0,
        }]);
        let clock = ConstantTempo::new(90.0);
        for measure in [1.0, 2.0, 4.5, 17.0] {
            assert_relative_eq!(map.measure_to_time(measure), clock.measure_to_time(measure));
        }
    }

    #[test]
    fn test_linear_ramp_integrates_logarithmically() {
        // 60 -> 120 bpm over measures 1..3
        let map = TempoMap::new(vec![
            TempoPoint { measure: 1.0, tempo: 60.0 },
            TempoPoint { measure: 3.0, tempo: 120.0 },
        ]);
        let slope = 30.0;
        let expected = 240.0 / slope * 2.0_f64.ln();
        assert_relative_eq!(map.measure_to_time(3.0), expected, epsilon = 1e-9);
        assert_relative_eq!(map.tempo_at_measure(2.0), 90.0);

        // Held constant after the last point
        assert_relative_eq!(map.measure_to_time(4.0), expected + 2.0, epsilon = 1e-9);
        assert_eq!(map.tempo_at_measure(10.0), 120.0);
    }

    #[test]
    fn test_leading_duplicate_points_collapse() {
        let map = TempoMap::new(vec![
            TempoPoint { measure: 1.0, tempo: 100.0 },
            TempoPoint { measure: 1.0, tempo: 60.0 },
        ]);
        assert_eq!(map.points().len(), 1);
        assert_relative_eq!(map.measure_to_time(2.0), 4.0);
    }

    #[test]
    fn test_from_lane() {
        let ranges = vec![
            AutomationRange::hold("VOLUME", "GAIN", 1.0, -3.0),
            AutomationRange::new("TEMPO", "TEMPO", 3.0, 5.0, 100.0, 140.0),
            AutomationRange::hold("TEMPO", "TEMPO", 1.0, 100.0),
        ];
        let map = TempoMap::from_lane(&ranges, 4.0);
        assert_eq!(
            map.points(),
            &[
                TempoPoint { measure: 1.0, tempo: 100.0 },
                TempoPoint { measure: 3.0, tempo: 100.0 },
                TempoPoint { measure: 5.0, tempo: 140.0 },
            ]
        );
        assert_relative_eq!(map.measure_to_time(3.0), 4.8);
        assert_relative_eq!(map.tempo_at_measure(4.0), 120.0);
    }

    #[test]
    fn test_monotonic() {
        let map = TempoMap::new(vec![
            TempoPoint { measure: 1.0, tempo: 140.0 },
            TempoPoint { measure: 5.0, tempo: 70.0 },
            TempoPoint { measure: 9.0, tempo: 70.0 },
        ]);
        let mut last = -1.0;
        for step in 0..40 {
            let t = map.measure_to_time(1.0 + step as f64 * 0.25);
            assert!(t > last);
            last = t;
        }
    }
}
