//! Broadcast frame protocol
//!
//! A leader splits each rendered frame into radio-sized chunks
//! ([`FrameSender`]); receivers stitch them back together per sequence
//! number ([`Reassembler`]) and only ever display whole frames.

mod reassembly;
mod sender;

pub use reassembly::{ChunkOutcome, Reassembler, ReceiveStats};
pub use sender::{FrameReport, FrameSender, SendStats};

/// Returns `true` if sequence `a` is newer than `b`, tolerating wrap-around
pub const fn sequence_is_newer(a: u32, b: u32) -> bool {
    #[allow(clippy::cast_possible_wrap)]
    let distance = a.wrapping_sub(b) as i32;
    distance > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_comparison_wraps() {
        assert!(sequence_is_newer(101, 100));
        assert!(!sequence_is_newer(100, 101));
        assert!(!sequence_is_newer(7, 7));
        assert!(sequence_is_newer(2, u32::MAX - 1));
    }
}
