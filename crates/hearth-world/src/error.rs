//! Error types for world operations.

use hearth_types::{Direction, Position};

/// Errors that can occur during world operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A position lies outside the world bounds.
    #[error("position {position} is outside the {width}x{height} world")]
    OutOfBounds {
        /// The offending position.
        position: Position,
        /// World width.
        width: u32,
        /// World height.
        height: u32,
    },

    /// A door was requested on an edge with no wall.
    #[error("no wall on the {direction} edge of {position} to put a door in")]
    NoWallForDoor {
        /// The cell.
        position: Position,
        /// The doorless edge.
        direction: Direction,
    },

    /// The symmetric-wall invariant was found violated. This indicates a
    /// bug: all wall mutations must go through the placement routine.
    #[error("wall mismatch: {position} {direction} has no mirror")]
    WallMismatch {
        /// The cell carrying the unmirrored wall.
        position: Position,
        /// The unmirrored edge.
        direction: Direction,
    },
}
