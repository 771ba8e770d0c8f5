use super::{ensure_len, read_u16, read_u32, MessageType};
use crate::error::ProtocolError;

/// `type u8 | pattern u8 | start u32 | clock u32 | hue u8 | seed u32 | counter u16 | checksum u8`
pub const PATTERN_PARAMS_LEN: usize = 18;

/// Lightweight alternative to raw pixel chunks
///
/// Carries everything a follower needs to regenerate the leader's pattern
/// locally with the same renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternParams {
    pub pattern: u8,
    /// Leader clock (ms) when the current pattern started
    pub pattern_start: u32,
    /// Leader clock (ms) when the packet was sent
    pub sender_clock: u32,
    pub global_hue: u8,
    pub random_seed: u32,
    pub frame_counter: u16,
}

impl PatternParams {
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        ensure_len(bytes, PATTERN_PARAMS_LEN)?;

        let expected = checksum(&bytes[..PATTERN_PARAMS_LEN - 1]);
        let actual = bytes[PATTERN_PARAMS_LEN - 1];
        if expected != actual {
            return Err(ProtocolError::Checksum { expected, actual });
        }

        Ok(Self {
            pattern: bytes[1],
            pattern_start: read_u32(bytes, 2),
            sender_clock: read_u32(bytes, 6),
            global_hue: bytes[10],
            random_seed: read_u32(bytes, 11),
            frame_counter: read_u16(bytes, 15),
        })
    }

    pub fn encode(&self) -> [u8; PATTERN_PARAMS_LEN] {
        let mut out = [0u8; PATTERN_PARAMS_LEN];
        out[0] = MessageType::PatternParams as u8;
        out[1] = self.pattern;
        out[2..6].copy_from_slice(&self.pattern_start.to_le_bytes());
        out[6..10].copy_from_slice(&self.sender_clock.to_le_bytes());
        out[10] = self.global_hue;
        out[11..15].copy_from_slice(&self.random_seed.to_le_bytes());
        out[15..17].copy_from_slice(&self.frame_counter.to_le_bytes());
        out[PATTERN_PARAMS_LEN - 1] = checksum(&out[..PATTERN_PARAMS_LEN - 1]);
        out
    }
}

/// XOR of all bytes
fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}
