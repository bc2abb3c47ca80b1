//! Effect Chain
//!
//! Units are linked in the order their effect type is first encountered
//! on the track (index 0 first). Unit `i` feeds unit `i + 1`; the last
//! unit feeds the chain's sink (the track analyser or its stand-in).

use super::catalog::EffectKind;
use super::unit::EffectUnit;
use crate::engine::NodeId;

/// Ordered, exclusively owned units of one track
#[derive(Debug, Clone, PartialEq)]
pub struct EffectChain {
    units: Vec<EffectUnit>,
    sink: NodeId,
}

impl EffectChain {
    pub(crate) fn new(units: Vec<EffectUnit>, sink: NodeId) -> Self {
        Self { units, sink }
    }

    /// Input of the first unit, or `None` when the track built no units
    pub fn entry(&self) -> Option<NodeId> {
        self.units.first().map(EffectUnit::input)
    }

    /// Node the last unit feeds
    pub fn sink(&self) -> NodeId {
        self.sink
    }

    /// Get a reference to the unit for an effect type
    pub fn unit(&self, kind: EffectKind) -> Option<&EffectUnit> {
        self.units.iter().find(|u| u.kind() == kind)
    }

    /// Effect types in chain order
    pub fn kinds(&self) -> Vec<EffectKind> {
        self.units.iter().map(EffectUnit::kind).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectUnit> {
        self.units.iter()
    }

    /// Get the number of units in the chain
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if chain is empty
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
