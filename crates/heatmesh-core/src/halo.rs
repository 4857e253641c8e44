//! Halo exchange protocol.
//!
//! Once per iteration every cell sends one edge to each neighbor and
//! receives one edge from each neighbor. Neighbors are not barrier
//! synchronized: a neighbor that finishes iteration `t` first may already
//! send its iteration `t + 1` edge while this cell is still exchanging
//! iteration `t`. Frames carry the sender's iteration parity so such an
//! early edge can be told apart and parked in a per-direction lookahead
//! slot until this cell reaches `t + 1`.
//!
//! A neighbor can run at most one iteration ahead, because it cannot finish
//! iteration `t + 1` without this cell's `t + 1` edge. One lookahead slot
//! per direction is therefore enough, and a frame from iteration `t - 1`
//! can never arrive during iteration `t`.
//!
//! ```text
//!   cell A (iteration t)                       cell B (iteration t+1)
//!   +----------------------+   frame(t+1)      +----------------------+
//!   | lookahead[East] <----+-------------------+ outgoing[West]       |
//!   | incoming[East]       |                   |                      |
//!   +----------------------+                   +----------------------+
//! ```

use std::future::poll_fn;
use std::sync::Arc;
use std::task::Poll;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::direction::{Direction, DirectionMap};
use crate::error::{MeshError, Result};
use crate::link::{CellPorts, LinkCounters};
use crate::message::{Frame, HaloMessage};
use crate::partition::CellId;
use crate::subgrid::{EdgeBuffer, Parity};

/// Outcome of one exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeReport {
    /// Edges sent.
    pub sent: usize,
    /// Edges taken from links for this iteration.
    pub received: usize,
    /// Edges taken from lookahead slots for this iteration.
    pub promoted: usize,
    /// Edges parked for the next iteration.
    pub early: usize,
}

/// Per-cell halo exchange state.
pub struct HaloExchange {
    cell: CellId,
    edge_len: usize,
    /// Directions with a neighbor, in send order.
    send_order: Vec<Direction>,
    has_neighbor: DirectionMap<bool>,
    outbound: DirectionMap<Option<mpsc::Sender<Frame>>>,
    inbound: DirectionMap<Option<mpsc::Receiver<Frame>>>,
    lookahead: DirectionMap<Option<HaloMessage>>,
    /// Sends of the latest exchange not yet handed to a link.
    unsent: usize,
    counters: Arc<LinkCounters>,
}

impl HaloExchange {
    /// Create exchange state from a cell's ports.
    ///
    /// Every outbound link must be paired with an inbound link from the same
    /// direction.
    pub fn new(ports: CellPorts, edge_len: usize, counters: Arc<LinkCounters>) -> Result<Self> {
        let cell = ports.cell();
        let send_order = ports.outbound_directions();
        let has_neighbor = DirectionMap::from_fn(|d| ports.outbound[d].is_some());

        for d in Direction::ALL {
            if has_neighbor[d] != ports.has_inbound(d) {
                return Err(MeshError::InvalidConfig(format!(
                    "{}: {:?} link is not bidirectional",
                    cell, d
                )));
            }
        }

        let CellPorts {
            outbound, inbound, ..
        } = ports;

        Ok(Self {
            cell,
            edge_len,
            send_order,
            has_neighbor,
            outbound,
            inbound,
            lookahead: DirectionMap::default(),
            unsent: 0,
            counters,
        })
    }

    /// Cell this exchange belongs to.
    pub fn cell(&self) -> CellId {
        self.cell
    }

    /// Number of neighbors.
    pub fn neighbor_count(&self) -> usize {
        self.send_order.len()
    }

    /// Edge parked in the lookahead slot for `direction`, if any.
    pub fn lookahead(&self, direction: Direction) -> Option<&HaloMessage> {
        self.lookahead[direction].as_ref()
    }

    /// Check that every send of the previous exchange has completed.
    ///
    /// Must hold before outgoing edges are overwritten by the next update.
    pub fn ensure_drained(&self) -> Result<()> {
        if self.unsent > 0 {
            return Err(MeshError::SendsInFlight {
                cell: self.cell,
                pending: self.unsent,
            });
        }
        Ok(())
    }

    /// Exchange edges for `iteration`.
    ///
    /// Sends `outgoing[d]` to every neighbor `d` and fills `incoming[d]` with
    /// that neighbor's edge for the same iteration. Returns once every send
    /// and every receive for this iteration has completed. Blocks without a
    /// timeout while a neighbor is silent.
    pub async fn exchange(
        &mut self,
        iteration: u32,
        outgoing: &DirectionMap<EdgeBuffer>,
        incoming: &mut DirectionMap<EdgeBuffer>,
    ) -> Result<ExchangeReport> {
        let parity = Parity::of(iteration);
        let mut report = ExchangeReport::default();
        let mut awaiting = self.has_neighbor.clone();
        let mut receives = self.send_order.len();
        let mut next_send = 0;
        self.unsent = self.send_order.len();

        // Early edges parked during the previous exchange
        for d in Direction::ALL {
            let ready = self.lookahead[d]
                .as_ref()
                .is_some_and(|msg| msg.parity == parity);
            if !ready {
                continue;
            }
            if let Some(msg) = self.lookahead[d].take() {
                debug!("{} promoted early {:?} edge at iteration {}", self.cell, d, iteration);
                incoming[d] = msg.edge;
                awaiting[d] = false;
                receives -= 1;
                report.promoted += 1;
            }
        }

        while self.unsent > 0 || receives > 0 {
            if let Some(d) = Direction::ALL
                .into_iter()
                .find(|&d| awaiting[d] && self.inbound[d].is_none())
            {
                return Err(MeshError::LinkClosed {
                    cell: self.cell,
                    direction: d,
                    iteration,
                });
            }

            let target = self.send_order.get(next_send).copied();
            let can_receive = self.inbound.iter().any(|(_, rx)| rx.is_some());

            tokio::select! {
                biased;

                permit = reserve(&self.outbound, target), if self.unsent > 0 => {
                    let Some(direction) = target else {
                        continue;
                    };
                    let permit = permit.ok_or(MeshError::LinkClosed {
                        cell: self.cell,
                        direction,
                        iteration,
                    })?;
                    let msg = HaloMessage::new(direction.opposite(), parity, outgoing[direction].clone());
                    permit.send(msg.encode());
                    trace!("{} sent {:?} edge for iteration {}", self.cell, direction, iteration);
                    self.counters.record_sent();
                    self.unsent -= 1;
                    next_send += 1;
                    report.sent += 1;
                }

                (direction, frame) = recv_any(&mut self.inbound), if can_receive => {
                    let Some(frame) = frame else {
                        // Neighbor finished and dropped its sender.
                        self.inbound[direction] = None;
                        continue;
                    };
                    self.counters.record_received();

                    let msg = HaloMessage::decode(&frame, self.edge_len)?;
                    if msg.direction != direction {
                        return Err(MeshError::Misrouted {
                            cell: self.cell,
                            tagged: msg.direction,
                            link: direction,
                        });
                    }

                    if msg.parity == parity {
                        if !awaiting[direction] {
                            return Err(MeshError::ProtocolViolation {
                                cell: self.cell,
                                direction,
                                reason: "second edge within one iteration",
                            });
                        }
                        trace!("{} received {:?} edge for iteration {}", self.cell, direction, iteration);
                        incoming[direction] = msg.edge;
                        awaiting[direction] = false;
                        receives -= 1;
                        report.received += 1;
                    } else {
                        if self.lookahead[direction].is_some() {
                            return Err(MeshError::ProtocolViolation {
                                cell: self.cell,
                                direction,
                                reason: "neighbor more than one iteration ahead",
                            });
                        }
                        trace!("{} parked early {:?} edge during iteration {}", self.cell, direction, iteration);
                        self.lookahead[direction] = Some(msg);
                        self.counters.record_early();
                        report.early += 1;
                    }
                }
            }
        }

        Ok(report)
    }
}

impl std::fmt::Debug for HaloExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaloExchange")
            .field("cell", &self.cell)
            .field("edge_len", &self.edge_len)
            .field("neighbors", &self.send_order)
            .field("unsent", &self.unsent)
            .finish()
    }
}

/// Wait for capacity on the link toward `direction`.
///
/// Resolves to `None` if the link is missing or its receiver is gone.
async fn reserve(
    outbound: &DirectionMap<Option<mpsc::Sender<Frame>>>,
    direction: Option<Direction>,
) -> Option<mpsc::Permit<'_, Frame>> {
    let sender = outbound[direction?].as_ref()?;
    sender.reserve().await.ok()
}

/// Wait for a frame on any open inbound link.
///
/// Resolves to `(direction, None)` when that link has closed.
async fn recv_any(
    inbound: &mut DirectionMap<Option<mpsc::Receiver<Frame>>>,
) -> (Direction, Option<Frame>) {
    poll_fn(|cx| {
        for direction in Direction::ALL {
            if let Some(rx) = inbound[direction].as_mut() {
                if let Poll::Ready(frame) = rx.poll_recv(cx) {
                    return Poll::Ready((direction, frame));
                }
            }
        }
        Poll::Pending
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed;
    use crate::link::{LinkConfig, LinkFabric};
    use std::time::Duration;

    fn edges(len: usize, value: i32) -> DirectionMap<EdgeBuffer> {
        DirectionMap::from_fn(|_| EdgeBuffer::filled(len, Fixed::from_int(value)))
    }

    #[tokio::test]
    async fn test_no_neighbors_completes_immediately() {
        let fabric = LinkFabric::default();
        let mut halo = HaloExchange::new(CellPorts::new(CellId(0)), 3, fabric.counters()).unwrap();
        let outgoing = edges(3, 1);
        let mut incoming = edges(3, 7);

        for t in 0..4 {
            halo.ensure_drained().unwrap();
            let report = halo.exchange(t, &outgoing, &mut incoming).await.unwrap();
            assert_eq!(report, ExchangeReport::default());
        }
        assert_eq!(incoming, edges(3, 7));
        assert_eq!(fabric.stats().frames_sent, 0);
    }

    #[tokio::test]
    async fn test_rejects_one_way_link() {
        let fabric = LinkFabric::default();
        let mut ports = CellPorts::new(CellId(0));
        let (tx, _rx) = fabric.link();
        ports.attach_outbound(Direction::East, tx);

        let err = HaloExchange::new(ports, 3, fabric.counters()).unwrap_err();
        assert!(matches!(err, MeshError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_misrouted_frame_is_rejected() {
        let fabric = LinkFabric::default();
        let mut ports = CellPorts::new(CellId(0));
        let (to_east, _east_rx) = fabric.link();
        let (east_tx, from_east) = fabric.link();
        ports.attach_outbound(Direction::East, to_east);
        ports.attach_inbound(Direction::East, from_east);
        let mut halo = HaloExchange::new(ports, 2, fabric.counters()).unwrap();

        let bogus = HaloMessage::new(Direction::North, Parity::Even, EdgeBuffer::filled(2, Fixed::ZERO));
        east_tx.send(bogus.encode()).await.unwrap();

        let mut incoming = edges(2, 0);
        let err = halo.exchange(0, &edges(2, 1), &mut incoming).await.unwrap_err();
        assert!(matches!(
            err,
            MeshError::Misrouted { tagged: Direction::North, link: Direction::East, .. }
        ));
    }

    #[tokio::test]
    async fn test_closed_link_reports_error() {
        let fabric = LinkFabric::new(LinkConfig { capacity: 4 });
        let mut ports = CellPorts::new(CellId(3));
        let (to_west, _west_rx) = fabric.link();
        let (west_tx, from_west) = fabric.link();
        ports.attach_outbound(Direction::West, to_west);
        ports.attach_inbound(Direction::West, from_west);
        let mut halo = HaloExchange::new(ports, 2, fabric.counters()).unwrap();

        drop(west_tx);

        let mut incoming = edges(2, 0);
        let err = halo.exchange(5, &edges(2, 1), &mut incoming).await.unwrap_err();
        assert!(matches!(
            err,
            MeshError::LinkClosed { direction: Direction::West, iteration: 5, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupted_exchange_leaves_sends_in_flight() {
        let fabric = LinkFabric::new(LinkConfig { capacity: 1 });
        let mut ports = CellPorts::new(CellId(0));
        let (to_south, _south_rx) = fabric.link();
        let (to_east, _east_rx) = fabric.link();
        let (_south_tx, from_south) = fabric.link();
        let (_east_tx, from_east) = fabric.link();

        // East link is full and never drained
        let stale = HaloMessage::new(Direction::West, Parity::Odd, EdgeBuffer::filled(2, Fixed::ZERO));
        to_east.try_send(stale.encode()).unwrap();

        ports.attach_outbound(Direction::South, to_south);
        ports.attach_outbound(Direction::East, to_east);
        ports.attach_inbound(Direction::South, from_south);
        ports.attach_inbound(Direction::East, from_east);
        let mut halo = HaloExchange::new(ports, 2, fabric.counters()).unwrap();

        let mut incoming = edges(2, 0);
        let outgoing = edges(2, 1);
        let interrupted = tokio::time::timeout(
            Duration::from_millis(50),
            halo.exchange(0, &outgoing, &mut incoming),
        )
        .await;
        assert!(interrupted.is_err());

        // South went out, East is still blocked
        assert_eq!(fabric.stats().frames_sent, 1);
        let err = halo.ensure_drained().unwrap_err();
        assert!(matches!(
            err,
            MeshError::SendsInFlight { cell: CellId(0), pending: 1 }
        ));
    }
}
