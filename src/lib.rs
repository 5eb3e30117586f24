//! Control-flow graph construction and dataflow primitives for the AP2
//! bytecode decompiler: turns a linear stream of [`bytecode::Action`]s into
//! a graph of [`chunk::ByteCodeChunk`]s, and provides the small
//! bitvector/abstract-interpretation building blocks used to analyze it.

pub mod bit_vector;
pub mod bytecode;
pub mod chunk;
pub mod control_flow;
pub mod dataflow;
pub mod error;
pub mod graph;

pub use bit_vector::BitVector;
pub use bytecode::{Action, ActionKind, ByteCode, Comparison, PushValue};
pub use chunk::ByteCodeChunk;
pub use control_flow::ControlFlow;
pub use error::{Error, Result};
pub use graph::graph_control_flow;
