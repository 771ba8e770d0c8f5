#![cfg_attr(not(test), no_std)]

//! Playalights sync engine
//!
//! Keeps several LED controllers visually synchronized over a lossy broadcast
//! radio, with one leader optionally driving the strip from live audio.
//!
//! Architecture layers:
//! - `protocol` - Wire codec for chunk, token and pattern-parameter packets
//! - `broadcast` - Frame fragmentation (sender) and reassembly (receiver)
//! - `election` - Conflict check, active election and preemption
//! - `audio` - Adaptive level tracking, beat/BPM detection and envelopes
//! - `render` - Pattern slots and the output processor (scale, then gamma)
//! - `node` - Role/mode state machine and the per-tick orchestrator
//! - `inbox` - Bounded hand-off from the radio receive path to the tick
//!
//! Everything is driven by explicit [`embassy_time::Instant`] values passed
//! into each call, so the engine never reads a clock on its own.

pub mod audio;
pub mod broadcast;
pub mod config;
pub mod election;
pub mod error;
pub mod identity;
pub mod inbox;
pub mod math8;
pub mod node;
pub mod ports;
pub mod protocol;
pub mod render;

pub use smart_leds::RGB8 as Rgb;

pub use audio::{AudioEngine, AudioFrame};
pub use config::{AudioConfig, ElectionPolicy, SyncConfig, SyncPayload};
pub use error::{ConfigError, InboxError, ProtocolError, RadioError};
pub use identity::NodeToken;
pub use inbox::{PacketInbox, RawPacket};
pub use node::{NodeRole, NodeSettings, NodeStatus, OperatingMode, SyncNode, TickOutcome};
pub use ports::{AudioSource, ButtonEvent, LedDriver, Radio, StatusDisplay};
pub use render::{OutputProcessor, PatternSlot, RenderContext, Renderer};
