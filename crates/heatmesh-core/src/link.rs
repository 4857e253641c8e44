//! Cell-to-cell links.
//!
//! Every pair of adjacent cells is joined by two bounded channels, one per
//! direction of travel. A cell holds the sending half for each neighbor it
//! talks to and the receiving half for each neighbor that talks to it, so
//! outgoing and incoming frames never share storage.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::direction::{Direction, DirectionMap};
use crate::error::Result;
use crate::message::Frame;
use crate::partition::{CellId, MeshGeometry};

/// Configuration for links.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Frames a link buffers before the sender must wait.
    pub capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { capacity: 1 }
    }
}

/// Delivery counters shared by every link of a mesh.
#[derive(Debug, Default)]
pub struct LinkCounters {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    early_arrivals: AtomicU64,
}

impl LinkCounters {
    pub(crate) fn record_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_early(&self) {
        self.early_arrivals.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the counters.
    pub fn snapshot(&self) -> LinkStats {
        LinkStats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            early_arrivals: self.early_arrivals.load(Ordering::Relaxed),
        }
    }
}

/// Link statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Frames handed to a link.
    pub frames_sent: u64,
    /// Frames taken from a link.
    pub frames_received: u64,
    /// Frames that arrived one iteration early.
    pub early_arrivals: u64,
}

/// Link endpoints owned by one cell.
pub struct CellPorts {
    cell: CellId,
    pub(crate) outbound: DirectionMap<Option<mpsc::Sender<Frame>>>,
    pub(crate) inbound: DirectionMap<Option<mpsc::Receiver<Frame>>>,
}

impl CellPorts {
    /// Create ports with no links attached.
    pub fn new(cell: CellId) -> Self {
        Self {
            cell,
            outbound: DirectionMap::default(),
            inbound: DirectionMap::default(),
        }
    }

    /// Cell owning these ports.
    pub fn cell(&self) -> CellId {
        self.cell
    }

    /// Attach the sending half of a link toward `direction`.
    pub fn attach_outbound(&mut self, direction: Direction, sender: mpsc::Sender<Frame>) {
        self.outbound[direction] = Some(sender);
    }

    /// Attach the receiving half of a link from `direction`.
    pub fn attach_inbound(&mut self, direction: Direction, receiver: mpsc::Receiver<Frame>) {
        self.inbound[direction] = Some(receiver);
    }

    /// Directions with an outbound link, in [`Direction::ALL`] order.
    pub fn outbound_directions(&self) -> Vec<Direction> {
        self.outbound
            .iter()
            .filter(|(_, s)| s.is_some())
            .map(|(d, _)| d)
            .collect()
    }

    /// True if a link from `direction` is attached.
    pub fn has_inbound(&self, direction: Direction) -> bool {
        self.inbound[direction].is_some()
    }
}

impl std::fmt::Debug for CellPorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellPorts")
            .field("cell", &self.cell)
            .field("outbound", &self.outbound_directions())
            .finish()
    }
}

/// Factory for links between cells.
pub struct LinkFabric {
    config: LinkConfig,
    counters: Arc<LinkCounters>,
}

impl LinkFabric {
    /// Create a new fabric.
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            counters: Arc::new(LinkCounters::default()),
        }
    }

    /// Shared delivery counters.
    pub fn counters(&self) -> Arc<LinkCounters> {
        Arc::clone(&self.counters)
    }

    /// Get statistics.
    pub fn stats(&self) -> LinkStats {
        self.counters.snapshot()
    }

    /// Create one unattached link.
    pub fn link(&self) -> (mpsc::Sender<Frame>, mpsc::Receiver<Frame>) {
        mpsc::channel(self.config.capacity.max(1))
    }

    /// Join `a` and `b`, where `b` lies in `direction` from `a`.
    pub fn connect(&self, a: &mut CellPorts, b: &mut CellPorts, direction: Direction) {
        let (a_to_b, b_from_a) = self.link();
        let (b_to_a, a_from_b) = self.link();
        a.attach_outbound(direction, a_to_b);
        a.attach_inbound(direction, a_from_b);
        b.attach_outbound(direction.opposite(), b_to_a);
        b.attach_inbound(direction.opposite(), b_from_a);
    }

    /// Build ports for every cell of `geometry`, indexed by cell id.
    pub fn wire(&self, geometry: &MeshGeometry) -> Result<Vec<CellPorts>> {
        let mut ports: Vec<CellPorts> = geometry.cell_ids().map(CellPorts::new).collect();

        // Each pair is joined once, from its western or northern member.
        for id in geometry.cell_ids() {
            let neighbors = geometry.neighbors(id)?;
            for direction in [Direction::East, Direction::South] {
                if let Some(other) = neighbors.get(direction) {
                    let (low, high) = ports.split_at_mut(other.0 as usize);
                    self.connect(&mut low[id.0 as usize], &mut high[0], direction);
                }
            }
        }

        tracing::debug!(
            "Wired {} cells ({}x{}), link capacity {}",
            geometry.cells(),
            geometry.side(),
            geometry.side(),
            self.config.capacity
        );

        Ok(ports)
    }
}

impl Default for LinkFabric {
    fn default() -> Self {
        Self::new(LinkConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_matches_neighbor_tables() {
        let geometry = MeshGeometry::new(16).unwrap();
        let fabric = LinkFabric::default();
        let ports = fabric.wire(&geometry).unwrap();

        assert_eq!(ports.len(), 16);
        for id in geometry.cell_ids() {
            let neighbors = geometry.neighbors(id).unwrap();
            let p = &ports[id.0 as usize];
            assert_eq!(p.cell(), id);
            assert_eq!(
                p.outbound_directions(),
                neighbors.directions().collect::<Vec<_>>()
            );
            for d in Direction::ALL {
                assert_eq!(p.has_inbound(d), neighbors.get(d).is_some());
            }
        }
    }

    #[tokio::test]
    async fn test_connect_routes_frames() {
        let fabric = LinkFabric::default();
        let mut a = CellPorts::new(CellId(0));
        let mut b = CellPorts::new(CellId(1));
        fabric.connect(&mut a, &mut b, Direction::East);

        let tx = a.outbound[Direction::East].as_ref().unwrap();
        tx.send(vec![1, 2, 3]).await.unwrap();

        let rx = b.inbound[Direction::West].as_mut().unwrap();
        assert_eq!(rx.recv().await, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_link_config_default() {
        let config = LinkConfig::default();
        assert_eq!(config.capacity, 1);
    }
}
