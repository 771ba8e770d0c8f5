use embassy_time::{Duration, Instant};

use super::sequence_is_newer;
use crate::error::ProtocolError;
use crate::identity::NodeToken;
use crate::protocol::{chunk_count, leds_in_chunk, ChunkPacket, CHUNK_LEDS};
use crate::Rgb;

/// What happened to a received chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Chunk belongs to an older sequence and was dropped
    Stale,
    /// Chunk was already received for this frame
    Duplicate,
    /// Chunk was stored, the frame is still partial
    Stored,
    /// Chunk completed the frame
    Completed,
}

/// Receive-side counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveStats {
    pub chunks: u32,
    pub frames_completed: u32,
    /// Frames superseded before all of their chunks arrived
    pub frames_dropped: u32,
    pub stale_chunks: u32,
    pub rejected_chunks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameTarget {
    sequence: u32,
    originator: NodeToken,
}

/// Receiver side of the frame protocol
///
/// Tracks exactly one frame at a time. Chunks of a newer sequence or a
/// different originator discard the partial frame, so a displayed frame
/// never mixes pixels from two sequences.
pub struct Reassembler<const N: usize> {
    partial: [Rgb; N],
    complete: [Rgb; N],
    target: Option<FrameTarget>,
    received_mask: u32,
    brightness: u8,
    last_chunk: Option<Instant>,
    last_complete: Option<Instant>,
    receiving_since: Option<Instant>,
    stats: ReceiveStats,
}

impl<const N: usize> Default for Reassembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Reassembler<N> {
    pub const fn new() -> Self {
        Self {
            partial: [Rgb::new(0, 0, 0); N],
            complete: [Rgb::new(0, 0, 0); N],
            target: None,
            received_mask: 0,
            brightness: 255,
            last_chunk: None,
            last_complete: None,
            receiving_since: None,
            stats: ReceiveStats {
                chunks: 0,
                frames_completed: 0,
                frames_dropped: 0,
                stale_chunks: 0,
                rejected_chunks: 0,
            },
        }
    }

    /// Bitmask with one bit per chunk of an `N` LED frame
    pub const fn expected_mask() -> u32 {
        let count = chunk_count(N);
        if count >= 32 {
            u32::MAX
        } else {
            (1 << count) - 1
        }
    }

    /// Feed one decoded chunk
    pub fn accept(&mut self, chunk: &ChunkPacket<'_>, now: Instant) -> Result<ChunkOutcome, ProtocolError> {
        if let Err(e) = Self::validate(chunk) {
            self.stats.rejected_chunks += 1;
            return Err(e);
        }

        let header = chunk.header;
        let incoming = FrameTarget {
            sequence: header.sequence,
            originator: header.originator,
        };

        match self.target {
            Some(current) if current.originator == incoming.originator => {
                if sequence_is_newer(incoming.sequence, current.sequence) {
                    self.start_frame(incoming);
                } else if incoming.sequence != current.sequence {
                    self.stats.stale_chunks += 1;
                    return Ok(ChunkOutcome::Stale);
                }
            }
            _ => self.start_frame(incoming),
        }

        self.last_chunk = Some(now);
        self.receiving_since.get_or_insert(now);
        self.stats.chunks += 1;
        self.brightness = header.brightness;

        let bit = 1u32 << header.index;
        if self.received_mask & bit != 0 {
            return Ok(ChunkOutcome::Duplicate);
        }

        let start = usize::from(header.index) * CHUNK_LEDS;
        for (slot, color) in self.partial[start..].iter_mut().zip(chunk.colors()) {
            *slot = color;
        }
        self.received_mask |= bit;

        if self.received_mask == Self::expected_mask() {
            self.complete = self.partial;
            self.last_complete = Some(now);
            self.stats.frames_completed += 1;
            return Ok(ChunkOutcome::Completed);
        }

        Ok(ChunkOutcome::Stored)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn validate(chunk: &ChunkPacket<'_>) -> Result<(), ProtocolError> {
        let expected = chunk_count(N) as u8;
        if chunk.header.count != expected {
            return Err(ProtocolError::ChunkCountMismatch {
                expected,
                actual: chunk.header.count,
            });
        }
        let leds = leds_in_chunk(N, usize::from(chunk.header.index));
        if chunk.led_count() != leds || chunk.rgb_bytes().len() != leds * 3 {
            return Err(ProtocolError::PayloadLength {
                expected: leds * 3,
                actual: chunk.rgb_bytes().len(),
            });
        }
        Ok(())
    }

    fn start_frame(&mut self, target: FrameTarget) {
        if self.target.is_some() && !self.is_complete() && self.received_mask != 0 {
            self.stats.frames_dropped += 1;
            log::trace!(
                "reassembly: dropping partial seq with mask {:#010b}",
                self.received_mask
            );
        }
        self.target = Some(target);
        self.received_mask = 0;
    }

    /// Forget the in-flight frame and both watchdog timestamps
    ///
    /// The last complete frame stays available for display.
    pub fn reset(&mut self) {
        self.target = None;
        self.received_mask = 0;
        self.last_chunk = None;
        self.last_complete = None;
        self.receiving_since = None;
    }

    /// The frame currently being assembled has all of its chunks
    pub fn is_complete(&self) -> bool {
        self.target.is_some() && self.received_mask == Self::expected_mask()
    }

    /// Last completed frame
    pub fn frame(&self) -> &[Rgb; N] {
        &self.complete
    }

    /// Brightness scalar of the most recent chunk
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Chunks keep arriving but no frame completed for `stuck_timeout`
    ///
    /// Chunks count as "arriving" when the last one is younger than
    /// `activity_window`.
    pub fn is_stuck(&self, now: Instant, stuck_timeout: Duration, activity_window: Duration) -> bool {
        let Some(last_chunk) = self.last_chunk else {
            return false;
        };
        if now.saturating_duration_since(last_chunk) > activity_window {
            return false;
        }
        let since = self.last_complete.or(self.receiving_since).unwrap_or(last_chunk);
        now.saturating_duration_since(since) > stuck_timeout
    }

    pub fn stats(&self) -> ReceiveStats {
        self.stats
    }
}
