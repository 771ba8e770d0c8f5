//! Wire format of the broadcast protocol
//!
//! Every packet starts with a message type byte. Multi-byte fields are
//! little-endian. Packets are decoded from and encoded into plain byte
//! slices with explicit length checks; nothing relies on struct layout.

mod chunk;
mod pattern;
mod token;

pub use chunk::{ChunkHeader, ChunkPacket, CHUNK_HEADER_LEN};
pub use pattern::{PatternParams, PATTERN_PARAMS_LEN};
pub use token::{TokenPacket, TOKEN_PACKET_LEN};

use crate::error::ProtocolError;

/// Largest payload the radio sends in one transmission (ESP-NOW)
pub const MAX_PACKET_LEN: usize = 250;

/// LEDs carried by one chunk
pub const CHUNK_LEDS: usize = 75;

/// Chunks one frame may span, bounded by the reassembly bitmask
pub const MAX_CHUNKS: usize = 32;

/// Number of chunks needed for `leds` LEDs
pub const fn chunk_count(leds: usize) -> usize {
    leds.div_ceil(CHUNK_LEDS)
}

/// Number of LEDs carried by chunk `index` of a frame of `leds` LEDs
pub const fn leds_in_chunk(leds: usize, index: usize) -> usize {
    let start = index * CHUNK_LEDS;
    if start >= leds {
        return 0;
    }
    let remaining = leds - start;
    if remaining < CHUNK_LEDS {
        remaining
    } else {
        CHUNK_LEDS
    }
}

/// Message type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Raw LED chunk of a frame
    Chunk = 0x00,
    /// Token broadcast (election and leader heartbeat)
    Token = 0x01,
    /// Pattern parameters
    PatternParams = 0x02,
}

impl MessageType {
    pub const fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            0x00 => Self::Chunk,
            0x01 => Self::Token,
            0x02 => Self::PatternParams,
            _ => return None,
        })
    }
}

/// A decoded packet borrowing its payload from the receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet<'a> {
    Chunk(ChunkPacket<'a>),
    Token(TokenPacket),
    PatternParams(PatternParams),
}

impl<'a> Packet<'a> {
    /// Decode any packet, dispatching on the message type byte
    pub fn decode(bytes: &'a [u8]) -> Result<Self, ProtocolError> {
        let Some(&kind) = bytes.first() else {
            return Err(ProtocolError::Empty);
        };
        if bytes.len() > MAX_PACKET_LEN {
            return Err(ProtocolError::Oversized(bytes.len()));
        }

        match MessageType::from_raw(kind) {
            Some(MessageType::Chunk) => ChunkPacket::decode(bytes).map(Packet::Chunk),
            Some(MessageType::Token) => TokenPacket::decode(bytes).map(Packet::Token),
            Some(MessageType::PatternParams) => {
                PatternParams::decode(bytes).map(Packet::PatternParams)
            }
            None => Err(ProtocolError::UnknownMessageType(kind)),
        }
    }
}

pub(crate) fn ensure_len(bytes: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if bytes.len() < expected {
        return Err(ProtocolError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}
