use embassy_time::Duration;
use embedded_hal::delay::DelayNs;

use crate::error::RadioError;
use crate::identity::NodeToken;
use crate::ports::Radio;
use crate::protocol::{
    chunk_count, leds_in_chunk, ChunkHeader, PatternParams, TokenPacket, CHUNK_LEDS,
    MAX_PACKET_LEN,
};
use crate::Rgb;

/// Cumulative transmit counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendStats {
    pub frames: u32,
    pub chunks_sent: u32,
    pub chunks_failed: u32,
    pub tokens_sent: u32,
    pub params_sent: u32,
}

/// Result of broadcasting one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub sequence: u32,
    pub sent: u8,
    pub failed: u8,
}

/// Leader side of the frame protocol
#[derive(Debug, Default)]
pub struct FrameSender {
    next_sequence: u32,
    stats: SendStats,
}

impl FrameSender {
    pub const fn new() -> Self {
        Self {
            next_sequence: 0,
            stats: SendStats {
                frames: 0,
                chunks_sent: 0,
                chunks_failed: 0,
                tokens_sent: 0,
                params_sent: 0,
            },
        }
    }

    pub fn stats(&self) -> SendStats {
        self.stats
    }

    /// Broadcast a frame as chunks sharing one sequence number
    ///
    /// Waits `inter_packet_delay` between consecutive chunks. Failed chunks
    /// are counted and skipped, never retried.
    #[allow(clippy::cast_possible_truncation, clippy::too_many_arguments)]
    pub fn send_frame<R, D, const N: usize>(
        &mut self,
        radio: &mut R,
        delay: &mut D,
        inter_packet_delay: Duration,
        originator: NodeToken,
        leds: &[Rgb; N],
        brightness: u8,
        speed: u8,
    ) -> FrameReport
    where
        R: Radio,
        D: DelayNs,
    {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        let count = chunk_count(N);
        let pause_us = u32::try_from(inter_packet_delay.as_micros()).unwrap_or(u32::MAX);
        let mut report = FrameReport {
            sequence,
            ..FrameReport::default()
        };
        let mut buffer = [0u8; MAX_PACKET_LEN];

        for index in 0..count {
            if index > 0 {
                delay.delay_us(pause_us);
            }

            let start = index * CHUNK_LEDS;
            let end = start + leds_in_chunk(N, index);
            let header = ChunkHeader {
                sequence,
                originator,
                index: index as u8,
                count: count as u8,
                brightness,
                speed,
            };

            let result = header
                .encode(&leds[start..end], &mut buffer)
                .map_err(|_| RadioError::PayloadTooLarge)
                .and_then(|len| radio.broadcast(&buffer[..len]));

            match result {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    log::warn!("sender: chunk {}/{} of seq {} failed: {}", index, count, sequence, e);
                    report.failed += 1;
                }
            }
        }

        self.stats.frames += 1;
        self.stats.chunks_sent += u32::from(report.sent);
        self.stats.chunks_failed += u32::from(report.failed);
        report
    }

    /// Broadcast a token packet (election or heartbeat)
    pub fn send_token<R: Radio>(&mut self, radio: &mut R, token: NodeToken) -> Result<(), RadioError> {
        radio.broadcast(&TokenPacket::new(token).encode())?;
        self.stats.tokens_sent += 1;
        Ok(())
    }

    /// Broadcast pattern parameters instead of pixels
    pub fn send_params<R: Radio>(
        &mut self,
        radio: &mut R,
        params: &PatternParams,
    ) -> Result<(), RadioError> {
        radio.broadcast(&params.encode())?;
        self.stats.params_sent += 1;
        Ok(())
    }
}
