//! Node identity token

use core::fmt;

/// Priority token of a node
///
/// Derived once at boot from a stable hardware identifier. Tokens are
/// compared as plain integers; the greater token wins every election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeToken(u32);

impl NodeToken {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Build the token from the station MAC address
    ///
    /// The lower three bytes carry the per-device part of the address, so
    /// they are unique per physical node.
    pub const fn from_mac(mac: &[u8; 6]) -> Self {
        Self(((mac[3] as u32) << 16) | ((mac[4] as u32) << 8) | mac[5] as u32)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Number of significant bits, 0 for the zero token
    pub const fn bit_length(self) -> u32 {
        u32::BITS - self.0.leading_zeros()
    }
}

impl fmt::Display for NodeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_uses_lower_mac_bytes() {
        let token = NodeToken::from_mac(&[0xAA, 0xBB, 0xCC, 0x12, 0x34, 0x56]);
        assert_eq!(token.raw(), 0x12_3456);
    }

    #[test]
    fn bit_length_orders_like_token() {
        assert_eq!(NodeToken::new(0).bit_length(), 0);
        assert_eq!(NodeToken::new(0x100).bit_length(), 9);
        assert_eq!(NodeToken::new(0x200).bit_length(), 10);
        assert_eq!(NodeToken::new(u32::MAX).bit_length(), 32);
    }
}
