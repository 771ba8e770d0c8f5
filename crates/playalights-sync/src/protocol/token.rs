use super::{ensure_len, read_u32, MessageType};
use crate::error::ProtocolError;
use crate::identity::NodeToken;

/// `type u8 | token u32`
pub const TOKEN_PACKET_LEN: usize = 5;

/// Token broadcast, used for election rounds and leader heartbeats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPacket {
    pub token: NodeToken,
}

impl TokenPacket {
    pub const fn new(token: NodeToken) -> Self {
        Self { token }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        ensure_len(bytes, TOKEN_PACKET_LEN)?;
        Ok(Self {
            token: NodeToken::new(read_u32(bytes, 1)),
        })
    }

    pub fn encode(&self) -> [u8; TOKEN_PACKET_LEN] {
        let raw = self.token.raw().to_le_bytes();
        [MessageType::Token as u8, raw[0], raw[1], raw[2], raw[3]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_packet_layout() {
        let bytes = TokenPacket::new(NodeToken::new(0x0012_3456)).encode();
        assert_eq!(bytes, [0x01, 0x56, 0x34, 0x12, 0x00]);
        assert_eq!(
            TokenPacket::decode(&bytes).map(|p| p.token),
            Ok(NodeToken::new(0x0012_3456))
        );
    }

    #[test]
    fn short_token_is_rejected() {
        assert!(matches!(
            TokenPacket::decode(&[0x01, 0x00]),
            Err(ProtocolError::Truncated { .. })
        ));
    }
}
