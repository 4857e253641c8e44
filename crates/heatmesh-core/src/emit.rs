//! Result emission.
//!
//! After its last iteration every cell streams one packed word per local
//! position:
//!
//! ```text
//!  31        20 19         8 7      0
//! +------------+------------+--------+
//! | global row | global col |  temp  |
//! +------------+------------+--------+
//! ```

use std::fmt;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

use crate::partition::Position;
use crate::subgrid::Subgrid;

/// Largest global row or column a result word can address.
pub const MAX_COORDINATE: usize = 0xfff;

/// Packed result for one global grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResultWord(pub u32);

impl ResultWord {
    /// Pack a global position and temperature byte. Coordinates are masked to 12 bits.
    pub fn pack(row: u32, col: u32, temperature: u8) -> Self {
        Self(((row & 0xfff) << 20) | ((col & 0xfff) << 8) | u32::from(temperature))
    }

    /// Global row.
    pub fn row(self) -> u32 {
        self.0 >> 20
    }

    /// Global column.
    pub fn col(self) -> u32 {
        (self.0 >> 8) & 0xfff
    }

    /// Temperature byte.
    pub fn temperature(self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

impl fmt::Display for ResultWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) = {}", self.row(), self.col(), self.temperature())
    }
}

/// Destination for result words.
///
/// Emission is fire-and-forget: a sink that cannot accept a word drops it
/// and the cell never learns about it.
pub trait ResultSink: Send + Sync {
    /// Accept one word.
    fn put(&self, word: ResultWord);
}

/// Sink forwarding words into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<ResultWord>,
}

impl ChannelSink {
    /// Create a sink and the receiver draining it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ResultWord>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ResultSink for ChannelSink {
    fn put(&self, word: ResultWord) {
        if self.sender.send(word).is_err() {
            warn!("Result receiver gone, dropped {}", word);
        }
    }
}

/// Sink collecting words in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    words: Mutex<Vec<ResultWord>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Words received so far, in arrival order.
    pub fn words(&self) -> Vec<ResultWord> {
        self.words.lock().clone()
    }

    /// Number of words received.
    pub fn len(&self) -> usize {
        self.words.lock().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.words.lock().is_empty()
    }
}

impl ResultSink for MemorySink {
    fn put(&self, word: ResultWord) {
        self.words.lock().push(word);
    }
}

/// Emit one word per position of `subgrid`, owned by the cell at `position`.
///
/// Returns the number of words emitted.
pub fn emit_subgrid(position: Position, subgrid: &Subgrid, sink: &dyn ResultSink) -> usize {
    let size = subgrid.size() as u32;
    let row0 = position.y * size;
    let col0 = position.x * size;

    let mut emitted = 0;
    for (i, j, value) in subgrid.iter() {
        sink.put(ResultWord::pack(
            row0 + i as u32,
            col0 + j as u32,
            value.temperature_byte(),
        ));
        emitted += 1;
    }
    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed;

    #[test]
    fn test_pack_layout() {
        let word = ResultWord::pack(5, 9, 0xff);
        assert_eq!(word.0, (5 << 20) | (9 << 8) | 0xff);
        assert_eq!(word.row(), 5);
        assert_eq!(word.col(), 9);
        assert_eq!(word.temperature(), 0xff);
    }

    #[test]
    fn test_pack_max_coordinates() {
        let word = ResultWord::pack(4095, 4095, 1);
        assert_eq!(word.row(), 4095);
        assert_eq!(word.col(), 4095);
        assert_eq!(word.temperature(), 1);
    }

    #[test]
    fn test_emit_subgrid_offsets_by_position() {
        let mut subgrid = Subgrid::new(2);
        subgrid.set(1, 0, Fixed::from_int(300));
        let sink = MemorySink::new();

        let n = emit_subgrid(Position { x: 3, y: 1 }, &subgrid, &sink);

        assert_eq!(n, 4);
        let words = sink.words();
        assert_eq!(words.len(), 4);
        assert_eq!(words[0], ResultWord::pack(2, 6, 0));
        // 300 truncated to eight bits
        assert_eq!(words[2], ResultWord::pack(3, 6, 44));
        assert_eq!(words[3], ResultWord::pack(3, 7, 0));
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_and_survives_closed_receiver() {
        let (sink, mut rx) = ChannelSink::new();
        sink.put(ResultWord::pack(1, 2, 3));
        assert_eq!(rx.recv().await, Some(ResultWord::pack(1, 2, 3)));

        drop(rx);
        sink.put(ResultWord::pack(0, 0, 0));
    }
}
