use super::{ensure_len, read_u32, MessageType, MAX_CHUNKS, MAX_PACKET_LEN};
use crate::error::ProtocolError;
use crate::identity::NodeToken;
use crate::Rgb;

/// Header bytes preceding the LED payload of a chunk
///
/// `type u8 | seq u32 | token u32 | index u8 | count u8 | brightness u8 | speed u8`
pub const CHUNK_HEADER_LEN: usize = 13;

/// Frame metadata stamped on every chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Frame sequence number, shared by all chunks of a frame
    pub sequence: u32,
    /// Token of the frame's originator
    pub originator: NodeToken,
    /// Position of this chunk within the frame
    pub index: u8,
    /// Total chunks of the frame
    pub count: u8,
    /// Brightness scalar of the frame
    pub brightness: u8,
    /// Speed scalar of the frame
    pub speed: u8,
}

/// A decoded chunk with its raw RGB payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPacket<'a> {
    pub header: ChunkHeader,
    rgb: &'a [u8],
}

impl<'a> ChunkPacket<'a> {
    #[allow(clippy::cast_possible_truncation)]
    pub fn decode(bytes: &'a [u8]) -> Result<Self, ProtocolError> {
        ensure_len(bytes, CHUNK_HEADER_LEN)?;

        let header = ChunkHeader {
            sequence: read_u32(bytes, 1),
            originator: NodeToken::new(read_u32(bytes, 5)),
            index: bytes[9],
            count: bytes[10],
            brightness: bytes[11],
            speed: bytes[12],
        };

        if header.count == 0 || usize::from(header.count) > MAX_CHUNKS {
            return Err(ProtocolError::ChunkCountMismatch {
                expected: MAX_CHUNKS as u8,
                actual: header.count,
            });
        }
        if header.index >= header.count {
            return Err(ProtocolError::ChunkIndexOutOfRange {
                index: header.index,
                count: header.count,
            });
        }

        let rgb = &bytes[CHUNK_HEADER_LEN..];
        if rgb.len() % 3 != 0 {
            return Err(ProtocolError::PayloadLength {
                expected: rgb.len() - rgb.len() % 3,
                actual: rgb.len(),
            });
        }

        Ok(Self { header, rgb })
    }

    /// Number of LEDs carried by this chunk
    pub fn led_count(&self) -> usize {
        self.rgb.len() / 3
    }

    /// Raw RGB triples
    pub fn rgb_bytes(&self) -> &'a [u8] {
        self.rgb
    }

    /// Iterate the carried colors
    pub fn colors(&self) -> impl Iterator<Item = Rgb> + 'a {
        self.rgb
            .chunks_exact(3)
            .map(|c| Rgb::new(c[0], c[1], c[2]))
    }
}

impl ChunkHeader {
    /// Encode the header and `leds` into `out`, returning the packet length
    pub fn encode(&self, leds: &[Rgb], out: &mut [u8]) -> Result<usize, ProtocolError> {
        let len = CHUNK_HEADER_LEN + leds.len() * 3;
        if len > MAX_PACKET_LEN {
            return Err(ProtocolError::Oversized(len));
        }
        if out.len() < len {
            return Err(ProtocolError::BufferTooSmall);
        }

        out[0] = MessageType::Chunk as u8;
        out[1..5].copy_from_slice(&self.sequence.to_le_bytes());
        out[5..9].copy_from_slice(&self.originator.raw().to_le_bytes());
        out[9] = self.index;
        out[10] = self.count;
        out[11] = self.brightness;
        out[12] = self.speed;

        for (slot, led) in out[CHUNK_HEADER_LEN..len].chunks_exact_mut(3).zip(leds) {
            slot[0] = led.r;
            slot[1] = led.g;
            slot[2] = led.b;
        }

        Ok(len)
    }
}
