//! Error types for the sync engine

use core::fmt;

/// Errors raised while decoding or validating a received packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Packet is empty
    Empty,
    /// Leading message type byte is not known
    UnknownMessageType(u8),
    /// Packet is shorter than its fixed header
    Truncated { expected: usize, actual: usize },
    /// Packet is longer than the radio allows
    Oversized(usize),
    /// Chunk index is not below the chunk count
    ChunkIndexOutOfRange { index: u8, count: u8 },
    /// Chunk count does not match the receiver's LED layout
    ChunkCountMismatch { expected: u8, actual: u8 },
    /// Chunk payload length does not match the LED count of that chunk
    PayloadLength { expected: usize, actual: usize },
    /// Pattern-parameter checksum mismatch
    Checksum { expected: u8, actual: u8 },
    /// Output buffer is too small for the encoded packet
    BufferTooSmall,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty packet"),
            Self::UnknownMessageType(t) => write!(f, "unknown message type 0x{:02X}", t),
            Self::Truncated { expected, actual } => {
                write!(f, "truncated packet: need {} bytes, got {}", expected, actual)
            }
            Self::Oversized(len) => write!(f, "packet of {} bytes exceeds radio limit", len),
            Self::ChunkIndexOutOfRange { index, count } => {
                write!(f, "chunk index {} out of range for {} chunks", index, count)
            }
            Self::ChunkCountMismatch { expected, actual } => {
                write!(f, "chunk count {} does not match expected {}", actual, expected)
            }
            Self::PayloadLength { expected, actual } => {
                write!(f, "chunk payload is {} bytes, expected {}", actual, expected)
            }
            Self::Checksum { expected, actual } => {
                write!(f, "checksum 0x{:02X} does not match 0x{:02X}", actual, expected)
            }
            Self::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

/// Errors reported by a [`crate::ports::Radio`] implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// The radio's transmit queue is full
    QueueFull,
    /// Payload exceeds the single-transmission limit
    PayloadTooLarge,
    /// The radio stack rejected the send
    SendFailed,
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "radio send queue full"),
            Self::PayloadTooLarge => write!(f, "payload too large"),
            Self::SendFailed => write!(f, "radio send failed"),
        }
    }
}

/// Invalid timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// LED count needs more chunks than the reassembly bitmask can hold
    TooManyLeds { leds: usize, max: usize },
    /// Election broadcast slots do not fit before the decision deadline
    ElectionDelayExceedsDeadline,
    /// Stuck watchdog must be longer than the leader timeout
    StuckTimeoutTooShort,
    /// A timing value is zero where a positive duration is required
    ZeroInterval(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyLeds { leds, max } => {
                write!(f, "{} LEDs exceed the maximum of {}", leds, max)
            }
            Self::ElectionDelayExceedsDeadline => {
                write!(f, "election base delay must be shorter than the election timeout")
            }
            Self::StuckTimeoutTooShort => {
                write!(f, "stuck timeout must be longer than the leader timeout")
            }
            Self::ZeroInterval(name) => write!(f, "{} must be non-zero", name),
        }
    }
}

/// Errors raised when handing a packet to the [`crate::inbox::PacketInbox`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxError {
    /// The tick loop has not drained the inbox yet
    Full,
    /// Packet does not fit a [`crate::inbox::RawPacket`]
    Oversized(usize),
}

impl fmt::Display for InboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "inbox full"),
            Self::Oversized(len) => write!(f, "packet of {} bytes does not fit the inbox", len),
        }
    }
}
