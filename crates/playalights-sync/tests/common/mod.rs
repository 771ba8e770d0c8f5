//! In-memory doubles and a simulated broadcast medium.

#![allow(dead_code)]

use embassy_time::Instant;
use embedded_hal::delay::DelayNs;
use playalights_sync::node::NodePorts;
use playalights_sync::protocol::{chunk_count, leds_in_chunk, ChunkHeader, CHUNK_LEDS, MAX_PACKET_LEN};
use playalights_sync::{
    AudioConfig, LedDriver, NodeStatus, NodeToken, Radio, RadioError, Rgb, StatusDisplay, SyncConfig,
    SyncNode,
};
use rand_core::RngCore;

// -----------------------------------------------------------------------------
// Doubles
// -----------------------------------------------------------------------------

/// Radio that keeps every broadcast until the test collects it
#[derive(Default)]
pub struct Outbox {
    pub packets: Vec<Vec<u8>>,
}

impl Outbox {
    pub fn take(&mut self) -> Vec<Vec<u8>> {
        core::mem::take(&mut self.packets)
    }
}

impl Radio for Outbox {
    fn broadcast(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        self.packets.push(payload.to_vec());
        Ok(())
    }
}

/// Delay that only records what was requested
#[derive(Default)]
pub struct CountingDelay {
    pub calls: usize,
    pub total_ns: u64,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.calls += 1;
        self.total_ns += u64::from(ns);
    }
}

/// LED strip keeping the last written frame
#[derive(Default)]
pub struct MemoryLeds {
    pub writes: usize,
    pub last: Vec<Rgb>,
}

impl<const N: usize> LedDriver<N> for MemoryLeds {
    fn write(&mut self, colors: &[Rgb; N]) {
        self.writes += 1;
        self.last = colors.to_vec();
    }
}

/// Status display keeping the last status
#[derive(Default)]
pub struct LastStatus {
    pub last: Option<NodeStatus>,
}

impl StatusDisplay for LastStatus {
    fn show(&mut self, status: &NodeStatus) {
        self.last = Some(*status);
    }
}

/// Deterministic LCG
pub struct TestRng(pub u32);

impl RngCore for TestRng {
    fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.0
    }

    fn next_u64(&mut self) -> u64 {
        (u64::from(self.next_u32()) << 32) | u64::from(self.next_u32())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for byte in dest {
            *byte = self.next_u32().to_le_bytes()[3];
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

pub type TestNode<const N: usize> = SyncNode<Outbox, CountingDelay, MemoryLeds, LastStatus, TestRng, N>;

pub fn node<const N: usize>(token: u32, config: SyncConfig) -> TestNode<N> {
    let ports = NodePorts {
        radio: Outbox::default(),
        delay: CountingDelay::default(),
        leds: MemoryLeds::default(),
        display: LastStatus::default(),
        rng: TestRng(token),
    };
    SyncNode::new(NodeToken::new(token), config, AudioConfig::default(), ports).expect("valid config")
}

pub fn at(ms: u64) -> Instant {
    Instant::from_millis(ms)
}

// -----------------------------------------------------------------------------
// Air
// -----------------------------------------------------------------------------

/// Deliver everything each node broadcast to every other node
pub fn exchange<const N: usize>(nodes: &mut [TestNode<N>], now: Instant) {
    for from in 0..nodes.len() {
        let packets = nodes[from].ports_mut().radio.take();
        for (to, node) in nodes.iter_mut().enumerate() {
            if to == from {
                continue;
            }
            for packet in &packets {
                let _ = node.handle_packet(packet, now);
            }
        }
    }
}

/// Like [`exchange`], but every delivery is lost with `loss_percent` chance
pub fn lossy_exchange<const N: usize>(nodes: &mut [TestNode<N>], now: Instant, air: &mut TestRng, loss_percent: u32) {
    for from in 0..nodes.len() {
        let packets = nodes[from].ports_mut().radio.take();
        for (to, node) in nodes.iter_mut().enumerate() {
            if to == from {
                continue;
            }
            for packet in &packets {
                if air.next_u32() % 100 < loss_percent {
                    continue;
                }
                let _ = node.handle_packet(packet, now);
            }
        }
    }
}

/// Tick every node, then let their broadcasts reach each other
pub fn step<const N: usize>(nodes: &mut [TestNode<N>], now: Instant) {
    for node in nodes.iter_mut() {
        node.tick(now, None);
    }
    exchange(nodes, now);
}

// -----------------------------------------------------------------------------
// Frames from a fabricated leader
// -----------------------------------------------------------------------------

/// Encode chunk `index` of a frame of `N` LEDs, all of one color
pub fn chunk<const N: usize>(originator: u32, sequence: u32, index: u8, color: Rgb) -> Vec<u8> {
    chunk_with_brightness::<N>(originator, sequence, index, color, 255)
}

#[allow(clippy::cast_possible_truncation)]
pub fn chunk_with_brightness<const N: usize>(
    originator: u32,
    sequence: u32,
    index: u8,
    color: Rgb,
    brightness: u8,
) -> Vec<u8> {
    let header = ChunkHeader {
        sequence,
        originator: NodeToken::new(originator),
        index,
        count: chunk_count(N) as u8,
        brightness,
        speed: 0,
    };
    let leds = [color; CHUNK_LEDS];
    let count = leds_in_chunk(N, usize::from(index));
    let mut buffer = [0u8; MAX_PACKET_LEN];
    let len = header.encode(&leds[..count], &mut buffer).expect("encode");
    buffer[..len].to_vec()
}

/// Deliver a complete frame to `node`
#[allow(clippy::cast_possible_truncation)]
pub fn deliver_frame<const N: usize>(node: &mut TestNode<N>, originator: u32, sequence: u32, color: Rgb, now: Instant) {
    for index in 0..chunk_count(N) {
        node.handle_packet(&chunk::<N>(originator, sequence, index as u8, color), now)
            .expect("valid chunk");
    }
}
