//! Chain building and automation scheduling
//!
//! Ranges are processed in track order. The first range naming an effect
//! type creates that type's unit and links it after the previous unit;
//! every later range for the type drives the same unit.

use std::collections::HashMap;

use log::debug;

use super::bypass::BypassSet;
use super::range::{AutomationRange, ResolvedRange, Track};
use super::timing::RangeTiming;
use crate::dsp::{create_unit, EffectChain, EffectKind, EffectTypeDescriptor, EffectUnit, BYPASS};
use crate::engine::{AudioGraph, MeasureClock, NodeId};
use crate::error::Result;

/// Per-build scheduling inputs
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions<'a> {
    /// Position of playback on the score timeline (seconds)
    pub offset_in_seconds: f64,
    /// `"EFFECT-PARAMETER"` pairs to leave out
    pub bypassed: &'a BypassSet,
    /// Export renders ignore the bypass set
    pub is_export: bool,
}

/// Where a finished chain sends its signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackRouting {
    /// Master track chains feed the mix bus; others feed the output bus
    pub is_master: bool,
    /// Track analyser; a unity gain stands in when absent
    pub analyser: Option<NodeId>,
    pub mix: NodeId,
    pub output: NodeId,
}

impl TrackRouting {
    fn bus(&self) -> NodeId {
        if self.is_master {
            self.mix
        } else {
            self.output
        }
    }
}

/// Build the effect chain for one track and schedule its automation
///
/// # Arguments
/// * `graph` - Graph the units are created in; its current time is "now"
/// * `track` - Track whose ranges are scheduled
/// * `clock` - Measure to seconds conversion
/// * `options` - Playback offset and bypass policy
/// * `routing` - Analyser and buses the chain ends in
pub fn build_chain(
    graph: &mut AudioGraph,
    track: &Track,
    clock: &dyn MeasureClock,
    options: &BuildOptions<'_>,
    routing: &TrackRouting,
) -> Result<EffectChain> {
    let mut builder = ChainBuilder::new(clock, *options);
    for range in track.ranges() {
        builder.apply(graph, range)?;
    }
    Ok(builder.finish(graph, routing))
}

/// Incremental chain construction over one track's ranges
pub struct ChainBuilder<'a> {
    clock: &'a dyn MeasureClock,
    options: BuildOptions<'a>,
    units: Vec<EffectUnit>,
    by_kind: HashMap<EffectKind, usize>,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(clock: &'a dyn MeasureClock, options: BuildOptions<'a>) -> Self {
        Self {
            clock,
            options,
            units: Vec::new(),
            by_kind: HashMap::new(),
        }
    }

    /// Schedule one range, creating its unit on first use
    pub fn apply(&mut self, graph: &mut AudioGraph, range: &AutomationRange) -> Result<()> {
        let resolved = range.resolve()?;
        let descriptor = resolved.kind.descriptor();
        let parameter = resolved.parameter.name;

        if !self.options.is_export && self.options.bypassed.contains(descriptor.name, parameter) {
            debug!("bypassed {}-{}", descriptor.name, parameter);
            return Ok(());
        }
        if !descriptor.quirks.builds_unit {
            debug!("{} is handled outside the signal graph", descriptor.name);
            return Ok(());
        }

        let now = graph.current_time();
        let Some((index, created)) = self.unit_for(graph, resolved.kind, parameter, now)? else {
            return Ok(());
        };
        let unit = &self.units[index];

        let timing = RangeTiming::resolve(
            self.clock,
            now,
            self.options.offset_in_seconds,
            resolved.start_measure,
            resolved.end_measure,
        );
        let applied_time = timing.applied_time(now);

        if !descriptor.quirks.schedules_parameters {
            return Ok(());
        }

        if parameter == BYPASS {
            schedule_bypass(graph, unit, &resolved, &timing, now);
            return Ok(());
        }

        schedule_parameter(graph, unit, descriptor, &resolved, &timing, applied_time)?;

        if created {
            let suppressed: Vec<&str> = descriptor
                .quirks
                .suppressed_defaults
                .iter()
                .filter(|(set, _)| *set == parameter)
                .map(|(_, suppressed)| *suppressed)
                .collect();
            apply_defaults(graph, unit, descriptor, parameter, &suppressed, applied_time)?;
        }
        Ok(())
    }

    /// Existing unit for `kind`, or a new one linked after the current tail
    ///
    /// Returns the unit's index and whether it was created by this call,
    /// or `None` for effect types that build no unit.
    fn unit_for(
        &mut self,
        graph: &mut AudioGraph,
        kind: EffectKind,
        parameter: &str,
        now: f64,
    ) -> Result<Option<(usize, bool)>> {
        if let Some(&index) = self.by_kind.get(&kind) {
            return Ok(Some((index, false)));
        }

        let Some(unit) = create_unit(graph, kind) else {
            return Ok(None);
        };
        if let Some(tail) = self.units.last() {
            graph.connect(tail.output(), unit.input());
        }

        let descriptor = kind.descriptor();
        if descriptor.quirks.schedules_parameters {
            apply_defaults(graph, &unit, descriptor, parameter, &[], now)?;
        }

        debug!("linked {} at chain position {}", kind, self.units.len());
        self.units.push(unit);
        self.by_kind.insert(kind, self.units.len() - 1);
        Ok(Some((self.units.len() - 1, true)))
    }

    /// Route the chain into the analyser (or its stand-in) and on to the bus
    pub fn finish(self, graph: &mut AudioGraph, routing: &TrackRouting) -> EffectChain {
        let sink = match routing.analyser {
            Some(analyser) => analyser,
            None => graph.create_gain().id,
        };
        if let Some(tail) = self.units.last() {
            graph.connect(tail.output(), sink);
        }
        graph.connect(sink, routing.bus());

        debug!("built chain of {} units", self.units.len());
        EffectChain::new(self.units, sink)
    }
}

/// Set every other declared parameter to its default at `time`
///
/// BYPASS, the range's own parameter, the type's never-defaulted
/// parameters and `suppressed` are left alone.
fn apply_defaults(
    graph: &mut AudioGraph,
    unit: &EffectUnit,
    descriptor: &EffectTypeDescriptor,
    parameter: &str,
    suppressed: &[&str],
    time: f64,
) -> Result<()> {
    let quirks = &descriptor.quirks;
    for default in descriptor.parameters {
        if default.name == BYPASS
            || default.name == parameter
            || quirks.never_default.contains(&default.name)
            || suppressed.contains(&default.name)
        {
            continue;
        }
        unit.binding(default.name)?
            .set_value_at_time(graph, default.scaled_default(), time);
    }
    Ok(())
}

/// Immediate set, plus a ramp to the end value when the range lies ahead
fn schedule_parameter(
    graph: &mut AudioGraph,
    unit: &EffectUnit,
    descriptor: &EffectTypeDescriptor,
    range: &ResolvedRange,
    timing: &RangeTiming,
    applied_time: f64,
) -> Result<()> {
    let quirks = &descriptor.quirks;
    let parameter = range.parameter.name;

    if timing.past_end && quirks.skip_when_past.contains(&parameter) {
        return Ok(());
    }

    let value = if timing.past_end || quirks.always_end_value.contains(&parameter) {
        range.end_value
    } else {
        range.start_value
    };

    let binding = unit.binding(parameter)?;
    binding.set_value_at_time(graph, value, applied_time);
    if !timing.past_end && range.end_measure != 0.0 {
        binding.linear_ramp_to_value_at_time(graph, range.end_value, timing.end_time);
    }
    Ok(())
}

/// Bypass steps; never ramps
fn schedule_bypass(
    graph: &mut AudioGraph,
    unit: &EffectUnit,
    range: &ResolvedRange,
    timing: &RangeTiming,
    now: f64,
) {
    let Some(pair) = unit.bypass() else {
        return;
    };
    if timing.past_end {
        pair.step(graph, range.end_value, now);
    } else if range.end_measure == 0.0 {
        pair.step(graph, range.start_value, timing.start_time);
    } else {
        pair.step(graph, range.start_value, timing.start_time);
        pair.step(graph, range.end_value, timing.end_time);
    }
}
