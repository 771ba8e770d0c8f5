//! Bounded hand-off from the radio receive path to the tick loop
//!
//! The receive task only copies bytes in; decoding and every decision
//! happen on the tick, which drains the inbox at its start.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use heapless::Vec;

use crate::error::InboxError;
use crate::protocol::MAX_PACKET_LEN;

/// Packets waiting for the next tick
pub type PacketInbox<const DEPTH: usize> = Channel<CriticalSectionRawMutex, RawPacket, DEPTH>;

/// Undecoded packet as received from the radio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    bytes: Vec<u8, MAX_PACKET_LEN>,
}

impl RawPacket {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, InboxError> {
        let bytes = Vec::from_slice(bytes).map_err(|()| InboxError::Oversized(bytes.len()))?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Copy `bytes` into the inbox without waiting
///
/// A full inbox drops the packet; the next leader frame supersedes it anyway.
pub fn enqueue_packet<const DEPTH: usize>(
    inbox: &PacketInbox<DEPTH>,
    bytes: &[u8],
) -> Result<(), InboxError> {
    let packet = RawPacket::from_slice(bytes)?;
    inbox.try_send(packet).map_err(|TrySendError::Full(_)| InboxError::Full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_inbox_drops_packets() {
        let inbox: PacketInbox<2> = Channel::new();
        assert_eq!(enqueue_packet(&inbox, &[1, 0, 0, 0, 1]), Ok(()));
        assert_eq!(enqueue_packet(&inbox, &[1, 0, 0, 0, 2]), Ok(()));
        assert_eq!(enqueue_packet(&inbox, &[1, 0, 0, 0, 3]), Err(InboxError::Full));

        let first = inbox.try_receive().expect("queued packet");
        assert_eq!(first.as_bytes(), &[1, 0, 0, 0, 1]);
    }

    #[test]
    fn oversized_packet_is_rejected() {
        let inbox: PacketInbox<2> = Channel::new();
        let bytes = [0u8; MAX_PACKET_LEN + 1];
        assert_eq!(
            enqueue_packet(&inbox, &bytes),
            Err(InboxError::Oversized(MAX_PACKET_LEN + 1))
        );
        assert!(inbox.try_receive().is_err());
    }
}
