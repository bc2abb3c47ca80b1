//! Score data: automation ranges, tracks and whole scores
//!
//! A track's effects are keyed lanes (`"VOLUME-GAIN": [...]`). Lane order
//! is the order the lanes appear in the score document; it decides chain
//! order, so lanes are kept in a `Vec` rather than a hash map.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::dsp::{EffectKind, ParameterDescriptor};
use crate::engine::{TempoMap, TempoPoint};
use crate::error::{FxError, Result};

fn first_measure() -> f64 {
    1.0
}

/// One parameter change over a span of measures
///
/// Values are in user units. `end_measure == 0` means the value holds
/// indefinitely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRange {
    /// Effect name (e.g. `"VOLUME"`)
    pub name: String,
    /// Parameter name; the effect's default parameter when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    #[serde(default = "first_measure")]
    pub start_measure: f64,
    #[serde(default)]
    pub end_measure: f64,
    /// The parameter's default when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_value: Option<f64>,
    /// The start value when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_value: Option<f64>,
}

/// A range with names resolved against the catalog and values scaled to
/// engine units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedRange {
    pub kind: EffectKind,
    pub parameter: &'static ParameterDescriptor,
    pub start_measure: f64,
    pub end_measure: f64,
    pub start_value: f64,
    pub end_value: f64,
}

impl AutomationRange {
    /// Fully specified range
    pub fn new(
        name: &str,
        parameter: &str,
        start_measure: f64,
        end_measure: f64,
        start_value: f64,
        end_value: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            parameter: Some(parameter.to_string()),
            start_measure,
            end_measure,
            start_value: Some(start_value),
            end_value: Some(end_value),
        }
    }

    /// Range that sets `value` at `start_measure` and holds it
    pub fn hold(name: &str, parameter: &str, start_measure: f64, value: f64) -> Self {
        Self {
            end_value: None,
            ..Self::new(name, parameter, start_measure, 0.0, value, value)
        }
    }

    pub fn kind(&self) -> Result<EffectKind> {
        self.name.parse()
    }

    /// Parameter descriptor this range drives
    pub fn descriptor(&self) -> Result<&'static ParameterDescriptor> {
        self.kind()?
            .descriptor()
            .resolve_parameter(self.parameter.as_deref())
    }

    /// `"EFFECT-PARAMETER"`, the key bypass sets use
    pub fn full_name(&self) -> Result<String> {
        Ok(format!("{}-{}", self.name, self.descriptor()?.name))
    }

    /// Resolve names and scale values
    ///
    /// A missing start value falls back to the parameter default; a
    /// missing end value falls back to the scaled start value.
    pub fn resolve(&self) -> Result<ResolvedRange> {
        let kind = self.kind()?;
        let parameter = kind.descriptor().resolve_parameter(self.parameter.as_deref())?;
        let start_value = parameter.scale(self.start_value.unwrap_or(parameter.default));
        let end_value = self
            .end_value
            .map(|v| parameter.scale(v))
            .unwrap_or(start_value);

        Ok(ResolvedRange {
            kind,
            parameter,
            start_measure: self.start_measure,
            end_measure: self.end_measure,
            start_value,
            end_value,
        })
    }

    /// Check names, value bounds and measure ordering
    pub fn validate(&self) -> Result<()> {
        let parameter = self.descriptor()?;

        for value in [self.start_value, self.end_value].into_iter().flatten() {
            if !parameter.contains(value) {
                return Err(FxError::ValueOutOfRange {
                    effect: self.name.clone(),
                    parameter: parameter.name.to_string(),
                    value,
                    min: parameter.min,
                    max: parameter.max,
                });
            }
        }

        let ends = self.end_measure != 0.0;
        if self.start_measure < 1.0 || (ends && self.end_measure < self.start_measure) {
            return Err(FxError::InvalidMeasureRange {
                effect: self.name.clone(),
                parameter: parameter.name.to_string(),
                start: self.start_measure,
                end: self.end_measure,
            });
        }
        Ok(())
    }
}

/// Automation lanes of one track, in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectLanes {
    lanes: Vec<(String, Vec<AutomationRange>)>,
}

impl EffectLanes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `range` to the lane `key`, creating the lane at the end if new
    pub fn push(&mut self, key: &str, range: AutomationRange) {
        match self.lanes.iter_mut().find(|(k, _)| k == key) {
            Some((_, ranges)) => ranges.push(range),
            None => self.lanes.push((key.to_string(), vec![range])),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[AutomationRange]> {
        self.lanes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, ranges)| ranges.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.lanes.iter().map(|(k, _)| k.as_str())
    }

    /// Every range, lane by lane, preserving order within each lane
    pub fn ranges(&self) -> impl Iterator<Item = &AutomationRange> {
        self.lanes.iter().flat_map(|(_, ranges)| ranges.iter())
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

impl Serialize for EffectLanes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.lanes.len()))?;
        for (key, ranges) in &self.lanes {
            map.serialize_entry(key, ranges)?;
        }
        map.end()
    }
}

struct LanesVisitor;

impl<'de> Visitor<'de> for LanesVisitor {
    type Value = EffectLanes;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of effect lanes to automation ranges")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<EffectLanes, A::Error> {
        let mut lanes = EffectLanes::new();
        while let Some((key, ranges)) = access.next_entry::<String, Vec<AutomationRange>>()? {
            for range in ranges {
                lanes.push(&key, range);
            }
        }
        Ok(lanes)
    }
}

impl<'de> Deserialize<'de> for EffectLanes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(LanesVisitor)
    }
}

fn default_true() -> bool {
    true
}

/// One track of a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub effects: EffectLanes,
    /// Whether the track gets a level analyser in playback
    #[serde(default = "default_true")]
    pub analyser: bool,
    #[serde(default)]
    pub mute: bool,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            label: None,
            effects: EffectLanes::new(),
            analyser: true,
            mute: false,
        }
    }
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a range to the lane named after its effect and parameter
    pub fn add_range(&mut self, range: AutomationRange) {
        let key = match &range.parameter {
            Some(parameter) => format!("{}-{}", range.name, parameter),
            None => range.name.clone(),
        };
        self.effects.push(&key, range);
    }

    /// Builder-style [`Track::add_range`]
    pub fn with_range(mut self, range: AutomationRange) -> Self {
        self.add_range(range);
        self
    }

    pub fn ranges(&self) -> impl Iterator<Item = &AutomationRange> {
        self.effects.ranges()
    }
}

fn default_tempo() -> f64 {
    120.0
}

/// A whole score: base tempo plus tracks (track 0 is the master track by
/// default)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    #[serde(default = "default_tempo")]
    pub tempo: f64,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Default for Score {
    fn default() -> Self {
        Self {
            tempo: default_tempo(),
            tracks: Vec::new(),
        }
    }
}

impl Score {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Validate the base tempo and every range of every track, stopping at
    /// the first error
    pub fn validate(&self) -> Result<()> {
        if !(self.tempo > 0.0) {
            return Err(FxError::InvalidTempo { tempo: self.tempo });
        }
        for track in &self.tracks {
            for range in track.ranges() {
                range.validate()?;
            }
        }
        Ok(())
    }

    /// Tempo curve of the score
    ///
    /// Built from the TEMPO lane of `master_track`; the score's base tempo
    /// applies before the first marking, or throughout when there is none.
    pub fn tempo_map(&self, master_track: usize, beats_per_measure: f64) -> TempoMap {
        let mut points = self
            .tracks
            .get(master_track)
            .map(|track| TempoMap::from_lane(track.ranges(), beats_per_measure).points().to_vec())
            .unwrap_or_default();

        let starts_late = points.first().map_or(true, |p| p.measure > 1.0);
        if starts_late {
            points.insert(
                0,
                TempoPoint {
                    measure: 1.0,
                    tempo: self.tempo,
                },
            );
        }
        TempoMap::with_beats_per_measure(points, beats_per_measure)
    }

    /// Number of ranges across all tracks
    pub fn range_count(&self) -> usize {
        self.tracks.iter().map(|t| t.ranges().count()).sum()
    }
}
