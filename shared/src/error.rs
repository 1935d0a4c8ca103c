//! Error types surfaced by the simulation engine and the wire protocol.

use crate::vector::Vector;
use thiserror::Error;

/// Failures while encoding or decoding a packet.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty packet")]
    Empty,

    #[error("unknown packet tag {0}")]
    UnknownTag(u8),

    #[error("packet tag {tag} does not match payload kind {actual}")]
    TagMismatch { tag: u8, actual: u8 },

    #[error("packet of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: usize, max: usize },

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

/// Failures raised by world mutations that callers may want to surface.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("no empty cell left on a {width}x{height} map")]
    NoEmptyCell { width: i32, height: i32 },

    #[error("position {0} is outside the map")]
    OutOfBounds(Vector),

    #[error("cell {0} is already occupied")]
    Occupied(Vector),

    #[error("unknown entity {0}")]
    UnknownEntity(u32),
}
