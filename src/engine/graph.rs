//! Signal graph primitives
//!
//! `AudioGraph` is an arena of processing nodes and their parameters.
//! It does not render audio: it records topology and parameter
//! timelines for a block-based renderer to consume.

use log::trace;
use serde::Serialize;

use super::param::{AutomationEvent, ParamId, ScheduledParam};

/// Handle to a node owned by an [`AudioGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of this node in the graph's node arena
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Biquad filter response types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
    Lowshelf,
    Highshelf,
    Peaking,
    Allpass,
}

/// What a node does to the signal passing through it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Destination,
    Gain,
    BiquadFilter { filter_type: FilterType },
    Delay { max_delay_time: f64 },
    Oscillator { started: bool },
    DynamicsCompressor,
    WaveShaper { curve_len: usize },
    ChannelMerger { inputs: usize },
    ChannelSplitter { outputs: usize },
    Analyser,
    /// Opaque block-based pitch shifter; processes frames outside this graph
    PitchShifter,
}

/// A node and the parameters it exposes
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub params: Vec<ParamId>,
}

/// Destination of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Port {
    /// Audio input of a node, on the given input channel
    Node(NodeId, usize),
    /// Modulation input of a parameter
    Param(ParamId),
}

/// A directed edge from a node output to a node input or parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub from: NodeId,
    pub output: usize,
    pub to: Port,
}

/// One scheduling call, in the order it was issued
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduledCall {
    pub param: ParamId,
    pub event: AutomationEvent,
}

/// Gain node handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainNode {
    pub id: NodeId,
    pub gain: ParamId,
}

/// Biquad filter node handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiquadNode {
    pub id: NodeId,
    pub frequency: ParamId,
    pub q: ParamId,
    pub gain: ParamId,
}

/// Delay line handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayNode {
    pub id: NodeId,
    pub delay_time: ParamId,
}

/// Oscillator handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OscillatorNode {
    pub id: NodeId,
    pub frequency: ParamId,
}

/// Dynamics compressor handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressorNode {
    pub id: NodeId,
    pub threshold: ParamId,
    pub knee: ParamId,
    pub ratio: ParamId,
    pub attack: ParamId,
    pub release: ParamId,
}

/// Signal graph with scheduled parameter timelines
#[derive(Debug, Clone, Serialize)]
pub struct AudioGraph {
    sample_rate: f64,
    current_time: f64,
    destination: NodeId,
    nodes: Vec<Node>,
    params: Vec<ScheduledParam>,
    connections: Vec<Connection>,
    calls: Vec<ScheduledCall>,
}

impl AudioGraph {
    /// Create an empty graph with a destination node
    pub fn new(sample_rate: f64) -> Self {
        let mut graph = Self {
            sample_rate,
            current_time: 0.0,
            destination: NodeId(0),
            nodes: Vec::new(),
            params: Vec::new(),
            connections: Vec::new(),
            calls: Vec::new(),
        };
        graph.destination = graph.add_node(NodeKind::Destination, &[]).0;
        graph
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// The playback instant scheduling calls are relative to ("now")
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn set_current_time(&mut self, time: f64) {
        self.current_time = time;
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    fn add_node(&mut self, kind: NodeKind, params: &[(&'static str, f64)]) -> (NodeId, Vec<ParamId>) {
        let ids: Vec<ParamId> = params
            .iter()
            .map(|&(name, initial)| {
                self.params.push(ScheduledParam::new(name, initial));
                ParamId(self.params.len() - 1)
            })
            .collect();
        self.nodes.push(Node {
            kind,
            params: ids.clone(),
        });
        (NodeId(self.nodes.len() - 1), ids)
    }

    pub fn create_gain(&mut self) -> GainNode {
        let (id, params) = self.add_node(NodeKind::Gain, &[("gain", 1.0)]);
        GainNode {
            id,
            gain: params[0],
        }
    }

    pub fn create_biquad_filter(&mut self, filter_type: FilterType) -> BiquadNode {
        let (id, params) = self.add_node(
            NodeKind::BiquadFilter { filter_type },
            &[("frequency", 350.0), ("Q", 1.0), ("gain", 0.0)],
        );
        BiquadNode {
            id,
            frequency: params[0],
            q: params[1],
            gain: params[2],
        }
    }

    pub fn create_delay(&mut self, max_delay_time: f64) -> DelayNode {
        let (id, params) = self.add_node(NodeKind::Delay { max_delay_time }, &[("delayTime", 0.0)]);
        DelayNode {
            id,
            delay_time: params[0],
        }
    }

    /// Create a free-running oscillator
    pub fn create_oscillator(&mut self) -> OscillatorNode {
        let (id, params) = self.add_node(NodeKind::Oscillator { started: true }, &[("frequency", 440.0)]);
        OscillatorNode {
            id,
            frequency: params[0],
        }
    }

    pub fn create_dynamics_compressor(&mut self) -> CompressorNode {
        let (id, params) = self.add_node(
            NodeKind::DynamicsCompressor,
            &[
                ("threshold", -24.0),
                ("knee", 30.0),
                ("ratio", 12.0),
                ("attack", 0.003),
                ("release", 0.25),
            ],
        );
        CompressorNode {
            id,
            threshold: params[0],
            knee: params[1],
            ratio: params[2],
            attack: params[3],
            release: params[4],
        }
    }

    pub fn create_wave_shaper(&mut self, curve: &[f32]) -> NodeId {
        self.add_node(
            NodeKind::WaveShaper {
                curve_len: curve.len(),
            },
            &[],
        )
        .0
    }

    pub fn create_channel_merger(&mut self, inputs: usize) -> NodeId {
        self.add_node(NodeKind::ChannelMerger { inputs }, &[]).0
    }

    pub fn create_channel_splitter(&mut self, outputs: usize) -> NodeId {
        self.add_node(NodeKind::ChannelSplitter { outputs }, &[]).0
    }

    pub fn create_analyser(&mut self) -> NodeId {
        self.add_node(NodeKind::Analyser, &[]).0
    }

    pub fn create_pitch_shifter(&mut self) -> NodeId {
        self.add_node(NodeKind::PitchShifter, &[]).0
    }

    /// Connect output 0 of `from` to input 0 of `to`
    pub fn connect(&mut self, from: NodeId, to: NodeId) {
        self.connect_channel(from, 0, to, 0);
    }

    /// Connect a specific output channel to a specific input channel
    pub fn connect_channel(&mut self, from: NodeId, output: usize, to: NodeId, input: usize) {
        self.connections.push(Connection {
            from,
            output,
            to: Port::Node(to, input),
        });
    }

    /// Route a node's signal into a parameter (modulation)
    pub fn connect_param(&mut self, from: NodeId, param: ParamId) {
        self.connections.push(Connection {
            from,
            output: 0,
            to: Port::Param(param),
        });
    }

    /// Set a parameter's value before any scheduled event (`param.value = x`)
    pub fn set_initial_value(&mut self, param: ParamId, value: f64) {
        self.params[param.0].set_initial_value(value);
    }

    pub fn set_value_at_time(&mut self, param: ParamId, value: f64, time: f64) {
        self.schedule(param, AutomationEvent::SetValueAtTime { value, time });
    }

    pub fn linear_ramp_to_value_at_time(&mut self, param: ParamId, value: f64, time: f64) {
        self.schedule(param, AutomationEvent::LinearRampToValueAtTime { value, time });
    }

    fn schedule(&mut self, param: ParamId, event: AutomationEvent) {
        trace!(
            "schedule {}#{} {:?}",
            self.params[param.0].name(),
            param.0,
            event
        );
        self.params[param.0].insert(event);
        self.calls.push(ScheduledCall { param, event });
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn param(&self, id: ParamId) -> &ScheduledParam {
        &self.params[id.0]
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Whether any output of `from` feeds an input of `to`
    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.connections
            .iter()
            .any(|c| c.from == from && matches!(c.to, Port::Node(target, _) if target == to))
    }

    /// Nodes fed by `from`
    pub fn outputs_of(&self, from: NodeId) -> Vec<NodeId> {
        self.connections
            .iter()
            .filter(|c| c.from == from)
            .filter_map(|c| match c.to {
                Port::Node(target, _) => Some(target),
                Port::Param(_) => None,
            })
            .collect()
    }

    /// Every scheduling call in issue order
    pub fn calls(&self) -> &[ScheduledCall] {
        &self.calls
    }

    /// Scheduling calls issued against one parameter
    pub fn calls_for(&self, param: ParamId) -> Vec<AutomationEvent> {
        self.calls
            .iter()
            .filter(|c| c.param == param)
            .map(|c| c.event)
            .collect()
    }

    /// Value of a parameter at `time` according to its timeline
    pub fn value_at(&self, param: ParamId, time: f64) -> f64 {
        self.params[param.0].value_at(time)
    }

    /// Number of nodes, including the destination
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for AudioGraph {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SAMPLE_RATE)
    }
}
