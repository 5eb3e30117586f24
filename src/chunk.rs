//! The basic-block record the CFG builder produces.
use std::fmt;

use indexmap::IndexSet;

use crate::bytecode::Action;

/// A maximal run of actions with a single entry and single exit (its last
/// action). Identity and equality are by `id`; edges are kept in
/// insertion-ordered sets so downstream consumers (tests included) see a
/// deterministic iteration order without duplicate predecessor/successor
/// relations.
#[derive(Debug, Clone)]
pub struct ByteCodeChunk {
    pub id: u32,
    pub actions: Vec<Action>,
    pub previous_chunks: IndexSet<u32>,
    pub next_chunks: IndexSet<u32>,
}

impl ByteCodeChunk {
    pub fn new(id: u32) -> Self {
        ByteCodeChunk {
            id,
            actions: Vec::new(),
            previous_chunks: IndexSet::new(),
            next_chunks: IndexSet::new(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.actions.is_empty()
    }

    /// Appends `successor` if it isn't already present, preserving the
    /// order successors were first linked in (e.g. `[fall_through,
    /// target]` for `If`).
    pub fn add_successor(&mut self, successor: u32) {
        self.next_chunks.insert(successor);
    }

    pub fn add_predecessor(&mut self, predecessor: u32) {
        self.previous_chunks.insert(predecessor);
    }
}

impl PartialEq for ByteCodeChunk {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ByteCodeChunk {}

impl fmt::Display for ByteCodeChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Chunk {}:", self.id)?;
        for action in &self.actions {
            writeln!(f, "  {action}")?;
        }
        write!(
            f,
            "  previous: {:?}, next: {:?}",
            self.previous_chunks.iter().collect::<Vec<_>>(),
            self.next_chunks.iter().collect::<Vec<_>>()
        )
    }
}
