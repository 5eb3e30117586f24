//! Error taxonomy for control-flow graph construction.
//!
//! These are the only failures `graph_control_flow` can return; they always
//! name the offending offset so a caller can point back at the malformed
//! bytecode. Precondition violations inside [`crate::bit_vector::BitVector`]
//! are a different category (programming errors) and are not represented
//! here - see that module.

use thiserror::Error;

/// Failure produced while building a control-flow graph from a [`crate::bytecode::ByteCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// A `Jump`/`If` targets an offset that is neither an action offset in
    /// the stream nor equal to `end_offset`.
    #[error("action at offset {action_offset} targets offset {target}, which does not begin any action and is not end_offset")]
    InvalidTarget {
        action_offset: u32,
        target: u32,
    },

    /// Action offsets are not strictly ascending.
    #[error("action at offset {action_offset} is out of order")]
    DisorderedBytecode { action_offset: u32 },

    /// An action carries payload inconsistent with its opcode, e.g. a
    /// `Push` with no values.
    #[error("action at offset {action_offset} is malformed: {reason}")]
    MalformedAction {
        action_offset: u32,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
