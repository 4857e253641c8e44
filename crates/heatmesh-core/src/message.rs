//! Halo message wire format.
//!
//! A frame is `S + 1` 32-bit words:
//!
//! ```text
//! word 0      : ...0000 DD P   (DD = receiver-facing direction, P = parity)
//! word 1..=S  : Q16.16 edge values, raw bits
//! ```

use crate::direction::Direction;
use crate::error::{MeshError, Result};
use crate::fixed::Fixed;
use crate::subgrid::{EdgeBuffer, Parity};

/// Encoded halo message as carried by a link.
pub type Frame = Vec<u32>;

const PARITY_MASK: u32 = 0b001;
const HEADER_MASK: u32 = 0b111;

/// Edge tagged for transmission to a neighbor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaloMessage {
    /// Direction of the sender as seen by the receiver.
    pub direction: Direction,
    /// Parity of the sender's iteration.
    pub parity: Parity,
    /// Edge values.
    pub edge: EdgeBuffer,
}

impl HaloMessage {
    /// Create a new halo message.
    pub fn new(direction: Direction, parity: Parity, edge: EdgeBuffer) -> Self {
        Self {
            direction,
            parity,
            edge,
        }
    }

    /// Header word.
    pub fn header(&self) -> u32 {
        (self.direction.code() << 1) | self.parity.bit()
    }

    /// Encode into a frame.
    pub fn encode(&self) -> Frame {
        let mut frame = Vec::with_capacity(self.edge.len() + 1);
        frame.push(self.header());
        frame.extend(self.edge.values().iter().map(|v| v.to_bits() as u32));
        frame
    }

    /// Decode a frame carrying `edge_len` values.
    pub fn decode(frame: &[u32], edge_len: usize) -> Result<Self> {
        let (&header, values) = frame
            .split_first()
            .ok_or_else(|| MeshError::MalformedFrame("empty frame".to_string()))?;

        if values.len() != edge_len {
            return Err(MeshError::MalformedFrame(format!(
                "expected {} values, got {}",
                edge_len,
                values.len()
            )));
        }
        if header & !HEADER_MASK != 0 {
            return Err(MeshError::MalformedFrame(format!(
                "reserved header bits set: {:#010x}",
                header
            )));
        }

        let direction = Direction::from_code(header >> 1).ok_or_else(|| {
            MeshError::MalformedFrame(format!("bad direction code in {:#x}", header))
        })?;
        let parity = Parity::from_bit(header & PARITY_MASK);
        let edge = EdgeBuffer::from_values(values.iter().map(|&w| Fixed::from_bits(w as i32)).collect());

        Ok(Self {
            direction,
            parity,
            edge,
        })
    }
}
