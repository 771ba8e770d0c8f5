//! Interfaces to the node's collaborators
//!
//! The engine is generic over these traits, so the firmware can plug in the
//! ESP-NOW radio, the RMT LED driver and the microphone, while tests plug in
//! in-memory doubles.

use crate::error::RadioError;
use crate::node::NodeStatus;
use crate::Rgb;

/// Abstract button events, already debounced and classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    ShortPress,
    LongPress,
    Released,
}

/// Broadcast radio
///
/// Sends are fire-and-forget: `Ok` means the radio accepted the payload, not
/// that anyone received it.
pub trait Radio {
    /// Broadcast one packet on the shared channel
    fn broadcast(&mut self, payload: &[u8]) -> Result<(), RadioError>;
}

/// Abstract LED driver trait
///
/// Implement this trait to support different hardware platforms.
/// The sync node is generic over this trait.
pub trait LedDriver<const N: usize> {
    /// Write colors to the LED strip
    fn write(&mut self, colors: &[Rgb; N]);
}

/// Source of raw microphone samples
pub trait AudioSource {
    /// Fill `buffer` with signed samples, returning how many were written
    fn capture(&mut self, buffer: &mut [i16]) -> usize;
}

/// Sink for the node's status line
pub trait StatusDisplay {
    fn show(&mut self, status: &NodeStatus);
}
