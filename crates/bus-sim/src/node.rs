//! Virtual bus nodes
//!
//! Each node transmits one identifier at a fixed period. Its payload is
//! built byte by byte from [`BytePattern`]s, which gives the monitor a mix of
//! steady, counting, toggling and noisy bytes to highlight.

use std::time::Duration;

use bus_monitor::{DefinitionCatalog, Frame, FrameId, MAX_PAYLOAD_LEN};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimError;

/// How one payload byte evolves from frame to frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BytePattern {
    /// Never changes
    Constant {
        /// Byte value
        value: u8,
    },
    /// Adds `step` every frame, wrapping
    Counter {
        /// Increment per frame
        step: u8,
    },
    /// Alternates between two values every `every` frames
    Toggle {
        /// Value in even phases
        low: u8,
        /// Value in odd phases
        high: u8,
        /// Frames per phase
        every: u32,
    },
    /// Random bits, restricted to `mask`
    Noise {
        /// Bits allowed to change
        mask: u8,
    },
}

impl BytePattern {
    fn value(&self, frame_index: u64, rng: &mut StdRng) -> u8 {
        match *self {
            BytePattern::Constant { value } => value,
            BytePattern::Counter { step } => frame_index.wrapping_mul(step as u64) as u8,
            BytePattern::Toggle { low, high, every } => {
                if (frame_index / every.max(1) as u64) % 2 == 0 {
                    low
                } else {
                    high
                }
            }
            BytePattern::Noise { mask } => rng.gen::<u8>() & mask,
        }
    }
}

/// Configuration of one simulated node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualNodeConfig {
    /// Source channel
    pub source: u8,
    /// Bus address
    pub address: u32,
    /// Name to publish in the definition catalog
    #[serde(default)]
    pub name: Option<String>,
    /// Transmit period in milliseconds
    pub period_ms: u64,
    /// One pattern per payload byte
    pub bytes: Vec<BytePattern>,
    /// Send an oversized frame instead of every N-th frame
    #[serde(default)]
    pub malformed_every: Option<u64>,
}

impl VirtualNodeConfig {
    /// Create a node with the given payload patterns
    pub fn new(source: u8, address: u32, period_ms: u64, bytes: Vec<BytePattern>) -> Self {
        Self {
            source,
            address,
            name: None,
            period_ms,
            bytes,
            malformed_every: None,
        }
    }

    /// Builder: set the catalog name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Identifier this node transmits
    pub fn id(&self) -> FrameId {
        FrameId::new(self.source, self.address)
    }

    /// Check that the node can produce valid frames
    pub fn validate(&self) -> Result<(), SimError> {
        if self.period_ms == 0 {
            return Err(SimError::InvalidNode(format!(
                "{}: period must be greater than zero",
                self.id()
            )));
        }
        if self.bytes.len() > MAX_PAYLOAD_LEN {
            return Err(SimError::InvalidNode(format!(
                "{}: {} payload bytes exceeds {}",
                self.id(),
                self.bytes.len(),
                MAX_PAYLOAD_LEN
            )));
        }
        if self.malformed_every == Some(0) {
            return Err(SimError::InvalidNode(format!(
                "{}: malformed_every must be greater than zero",
                self.id()
            )));
        }
        Ok(())
    }
}

/// A node with its transmit schedule
#[derive(Debug, Clone)]
pub struct VirtualNode {
    config: VirtualNodeConfig,
    period: Duration,
    next_due: Duration,
    frames_sent: u64,
}

impl VirtualNode {
    /// Create a node whose first frame is due at time zero
    pub fn new(config: VirtualNodeConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            period: Duration::from_millis(config.period_ms),
            next_due: Duration::ZERO,
            frames_sent: 0,
            config,
        })
    }

    /// Node configuration
    pub fn config(&self) -> &VirtualNodeConfig {
        &self.config
    }

    /// Identifier this node transmits
    pub fn id(&self) -> FrameId {
        self.config.id()
    }

    /// Frames produced so far
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Time the next frame is due
    pub fn next_due(&self) -> Duration {
        self.next_due
    }

    /// Produce the next frame and advance the schedule
    pub fn next_frame(&mut self, rng: &mut StdRng) -> Frame {
        let index = self.frames_sent;
        let malformed = self
            .config
            .malformed_every
            .is_some_and(|every| (index + 1) % every == 0);

        let data = if malformed {
            vec![0xEE; MAX_PAYLOAD_LEN + 1]
        } else {
            self.config
                .bytes
                .iter()
                .map(|pattern| pattern.value(index, rng))
                .collect()
        };

        let frame = Frame::new(self.id(), data, self.next_due);
        self.frames_sent += 1;
        self.next_due += self.period;
        frame
    }
}

/// Configuration of a simulated bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualBusConfig {
    /// Seed for noisy bytes
    pub seed: u64,
    /// Nodes on the bus
    pub nodes: Vec<VirtualNodeConfig>,
}

impl Default for VirtualBusConfig {
    fn default() -> Self {
        Self::demo()
    }
}

impl VirtualBusConfig {
    /// A small two-channel bus with a little of everything
    pub fn demo() -> Self {
        use BytePattern::*;

        Self {
            seed: 0,
            nodes: vec![
                VirtualNodeConfig::new(
                    0,
                    0x0C9,
                    10,
                    vec![
                        Counter { step: 1 },
                        Noise { mask: 0x0F },
                        Constant { value: 0x00 },
                        Constant { value: 0x80 },
                    ],
                )
                .named("ENGINE_DATA"),
                VirtualNodeConfig::new(
                    0,
                    0x1A0,
                    20,
                    vec![
                        Constant { value: 0x12 },
                        Toggle {
                            low: 0x00,
                            high: 0x01,
                            every: 25,
                        },
                    ],
                )
                .named("BRAKE_STATUS"),
                VirtualNodeConfig::new(
                    0,
                    0x3E9,
                    100,
                    vec![Constant { value: 0x00 }; 8],
                )
                .named("GEAR_PACKET"),
                VirtualNodeConfig::new(
                    1,
                    0x2E4,
                    50,
                    vec![
                        Noise { mask: 0xFF },
                        Noise { mask: 0xFF },
                        Counter { step: 4 },
                    ],
                ),
                VirtualNodeConfig {
                    malformed_every: Some(40),
                    ..VirtualNodeConfig::new(1, 0x7DF, 250, vec![Counter { step: 1 }])
                },
            ],
        }
    }
}

/// A set of nodes sharing one simulated clock
#[derive(Debug)]
pub struct VirtualBus {
    nodes: Vec<VirtualNode>,
    rng: StdRng,
    clock: Duration,
}

impl VirtualBus {
    /// Build a bus from its configuration
    pub fn new(config: &VirtualBusConfig) -> Result<Self, SimError> {
        let nodes = config
            .nodes
            .iter()
            .cloned()
            .map(VirtualNode::new)
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Virtual bus created with {} nodes", nodes.len());

        Ok(Self {
            nodes,
            rng: StdRng::seed_from_u64(config.seed),
            clock: Duration::ZERO,
        })
    }

    /// Nodes on the bus
    pub fn nodes(&self) -> &[VirtualNode] {
        &self.nodes
    }

    /// Simulated time
    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// Advance the clock and collect every frame that fell due, in time order
    pub fn advance(&mut self, elapsed: Duration) -> Vec<Frame> {
        self.clock += elapsed;
        let mut frames = Vec::new();
        for node in &mut self.nodes {
            while node.next_due() <= self.clock {
                frames.push(node.next_frame(&mut self.rng));
            }
        }
        frames.sort_by_key(|frame| frame.timestamp);
        frames
    }

    /// Catalog of the named nodes, sized by their payload length
    pub fn catalog(&self) -> DefinitionCatalog {
        self.nodes
            .iter()
            .filter_map(|node| {
                let config = node.config();
                config
                    .name
                    .as_ref()
                    .map(|name| (config.id(), name.clone(), config.bytes.len()))
            })
            .fold(DefinitionCatalog::new(), |mut catalog, (id, name, size)| {
                catalog.insert(id, name, size);
                catalog
            })
    }
}
