//! Scheduled parameter timeline
//!
//! A parameter holds an initial value plus a time-ordered list of
//! automation events, mirroring the Web Audio `AudioParam` contract:
//! `setValueAtTime` steps, `linearRampToValueAtTime` ramps from the
//! previous event to the target.

use serde::{Deserialize, Serialize};

/// Handle to a parameter owned by an [`AudioGraph`](super::AudioGraph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamId(pub(crate) usize);

impl ParamId {
    /// Position of this parameter in the graph's parameter arena
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A single scheduled change on a parameter timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AutomationEvent {
    /// Jump to `value` at `time`
    SetValueAtTime { value: f64, time: f64 },
    /// Arrive at `value` at `time`, interpolating linearly from the previous event
    LinearRampToValueAtTime { value: f64, time: f64 },
}

impl AutomationEvent {
    pub fn time(&self) -> f64 {
        match self {
            AutomationEvent::SetValueAtTime { time, .. }
            | AutomationEvent::LinearRampToValueAtTime { time, .. } => *time,
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            AutomationEvent::SetValueAtTime { value, .. }
            | AutomationEvent::LinearRampToValueAtTime { value, .. } => *value,
        }
    }

    pub fn is_ramp(&self) -> bool {
        matches!(self, AutomationEvent::LinearRampToValueAtTime { .. })
    }
}

/// A parameter with an initial value and a scheduled value timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledParam {
    /// Name of the parameter on its node (e.g. "gain", "frequency")
    name: &'static str,
    /// Value before any event takes effect
    initial: f64,
    /// Events sorted by time; equal times keep insertion order
    events: Vec<AutomationEvent>,
}

impl ScheduledParam {
    pub(crate) fn new(name: &'static str, initial: f64) -> Self {
        Self {
            name,
            initial,
            events: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Value before the first event
    pub fn initial_value(&self) -> f64 {
        self.initial
    }

    pub(crate) fn set_initial_value(&mut self, value: f64) {
        self.initial = value;
    }

    /// Events in timeline order
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    pub(crate) fn insert(&mut self, event: AutomationEvent) {
        let position = self
            .events
            .iter()
            .position(|e| e.time() > event.time())
            .unwrap_or(self.events.len());
        self.events.insert(position, event);
    }

    /// Evaluate the timeline at `time`
    ///
    /// A ramp interpolates from the value and time of the event preceding
    /// it; before the first event the initial value holds.
    pub fn value_at(&self, time: f64) -> f64 {
        let mut prev_time = 0.0;
        let mut prev_value = self.initial;

        for event in &self.events {
            if event.time() <= time {
                prev_time = event.time();
                prev_value = event.value();
                continue;
            }
            if let AutomationEvent::LinearRampToValueAtTime { value, time: end } = *event {
                let span = end - prev_time;
                if span <= 0.0 {
                    return value;
                }
                let fraction = ((time - prev_time) / span).clamp(0.0, 1.0);
                return prev_value + (value - prev_value) * fraction;
            }
            return prev_value;
        }

        prev_value
    }
}
