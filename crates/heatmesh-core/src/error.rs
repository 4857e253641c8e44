//! Error types for heatmesh.

use thiserror::Error;

use crate::direction::Direction;
use crate::partition::CellId;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors raised while configuring or running a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    /// Cell count is not a power of two with an even exponent.
    #[error("Invalid cell count {0}: must be a power of two with an even log2")]
    InvalidCellCount(u32),

    /// Cell identifier outside the mesh.
    #[error("Cell {cell} is outside a mesh of {cells} cells")]
    CellOutOfRange {
        /// Offending identifier.
        cell: u32,
        /// Total cell count.
        cells: u32,
    },

    /// Message payload too small to carry a header and one value.
    #[error("Invalid message length {0}: need at least 2 words")]
    InvalidMessageLength(usize),

    /// Global coordinates do not fit the 12-bit result fields.
    #[error("Global grid side {0} exceeds the 4096 rows/columns addressable by result words")]
    CoordinateOverflow(usize),

    /// Configuration value rejected during validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration source could not be loaded or deserialized.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A link closed while an edge was still expected on it.
    #[error("Cell {cell}: link {direction:?} closed before iteration {iteration} completed")]
    LinkClosed {
        /// Cell observing the closed link.
        cell: CellId,
        /// Direction of the closed link.
        direction: Direction,
        /// Iteration in progress.
        iteration: u32,
    },

    /// A frame could not be decoded.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// A frame's encoded direction disagrees with the link it arrived on.
    #[error("Cell {cell}: frame tagged {tagged:?} arrived on link {link:?}")]
    Misrouted {
        /// Receiving cell.
        cell: CellId,
        /// Direction the frame claims to come from.
        tagged: Direction,
        /// Direction of the link it arrived on.
        link: Direction,
    },

    /// A neighbor broke the one-iteration send-ahead bound.
    #[error("Cell {cell}: protocol violation on {direction:?}: {reason}")]
    ProtocolViolation {
        /// Receiving cell.
        cell: CellId,
        /// Offending direction.
        direction: Direction,
        /// What went wrong.
        reason: &'static str,
    },

    /// An update was attempted while outgoing edges were still unsent.
    #[error("Cell {cell}: {pending} sends still in flight")]
    SendsInFlight {
        /// Cell attempting the update.
        cell: CellId,
        /// Sends not yet completed.
        pending: usize,
    },

    /// A cell task panicked or was cancelled.
    #[error("Cell task failed: {0}")]
    CellFailed(String),

    /// Drained results did not cover the global grid exactly once.
    #[error("Result mismatch: {0}")]
    ResultMismatch(String),

    /// IO error while writing output.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
