//! World Error Handling
//!
//! Errors raised while building or walking a region. Traversal errors are
//! programmer errors; the mutating paths log them and abort.

/// World-specific result type
pub type WorldResult<T> = Result<T, WorldError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("Coordinate ({x}, {y}, {z}) outside a region {width} voxels wide")]
    CoordinateOutOfBounds { x: u32, y: u32, z: u32, width: u32 },

    #[error("Node at {index:#x} on level {level} is {found}, expected {expected}")]
    EncodingMismatch {
        index: u32,
        level: u32,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Tree depth {depth} outside 1..={max}")]
    InvalidDepth { depth: u32, max: u32 },

    #[error("Node header {header:#010x} carries the reserved tag 0b10")]
    InvalidHeaderTag { header: u32 },
}
