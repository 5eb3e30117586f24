//! A small abstract-interpretation harness for running fixed-point analyses
//! over a built [`crate::chunk::ByteCodeChunk`] graph, plus two concrete
//! analyses on top of it: reaching-offsets (forward) and live-registers
//! (backward). Grounded on the same `AbstractDomain`/`TransferFunctions`
//! split used elsewhere in this lineage for bytecode verification, reduced
//! to the single finite-height join (no error channel, no loop-specific
//! re-queueing) this crate actually needs.
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::trace;

use crate::bit_vector::BitVector;
use crate::bytecode::Action;
use crate::chunk::ByteCodeChunk;

/// Whether a [`AbstractDomain::join`] changed its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinResult {
    Changed,
    Unchanged,
}

/// A finite-height join-semilattice state type. Finite height is what
/// guarantees the worklist in [`AbstractInterpreter::analyze`] terminates.
pub trait AbstractDomain: Clone {
    fn join(&mut self, other: &Self) -> JoinResult;
}

impl AbstractDomain for BitVector {
    fn join(&mut self, other: &Self) -> JoinResult {
        let before = self.clone();
        self.or_vector(other);
        if *self == before {
            JoinResult::Unchanged
        } else {
            JoinResult::Changed
        }
    }
}

/// Pre/post state of one chunk after a fixed point is reached (or while one
/// is still being computed - `post` is `None` until the chunk has been
/// processed at least once).
#[derive(Clone)]
pub struct BlockInvariant<S> {
    pub pre: S,
    pub post: Option<S>,
}

/// A map from chunk id to its pre/post invariant.
pub type InvariantMap<S> = BTreeMap<u32, BlockInvariant<S>>;

/// Runs `pre` forward across one action.
pub trait TransferFunctions {
    type State: AbstractDomain;

    fn execute(&mut self, pre: &mut Self::State, action: &Action);

    /// Hook invoked once per chunk, before its actions run. Default is a
    /// no-op; [`ReachingOffsets`] uses it to mark the current chunk as
    /// reached without needing a per-action signal.
    fn seed_block(&mut self, _chunk_id: u32, _state: &mut Self::State) {}
}

/// Drives a [`TransferFunctions`] impl to a fixed point over a chunk graph
/// via a worklist, propagating postconditions forward along successor
/// edges.
pub trait AbstractInterpreter: TransferFunctions {
    fn analyze(&mut self, chunks: &[ByteCodeChunk], initial: Self::State) -> InvariantMap<Self::State> {
        let mut inv_map: InvariantMap<Self::State> = BTreeMap::new();
        let Some(entry) = chunks.first() else {
            return inv_map;
        };
        let chunk_by_id: BTreeMap<u32, &ByteCodeChunk> = chunks.iter().map(|c| (c.id, c)).collect();

        inv_map.insert(
            entry.id,
            BlockInvariant {
                pre: initial,
                post: None,
            },
        );
        let mut queued = BTreeSet::new();
        let mut worklist = VecDeque::new();
        worklist.push_back(entry.id);
        queued.insert(entry.id);

        while let Some(id) = worklist.pop_front() {
            queued.remove(&id);
            let chunk = chunk_by_id[&id];
            let mut state = inv_map[&id].pre.clone();
            self.seed_block(id, &mut state);
            for action in &chunk.actions {
                self.execute(&mut state, action);
            }
            inv_map.get_mut(&id).unwrap().post = Some(state.clone());
            trace!(chunk = id, "analyzed block");

            for &successor in &chunk.next_chunks {
                match inv_map.get_mut(&successor) {
                    Some(invariant) => {
                        if let JoinResult::Changed = invariant.pre.join(&state) {
                            if queued.insert(successor) {
                                worklist.push_back(successor);
                            }
                        }
                    }
                    None => {
                        inv_map.insert(
                            successor,
                            BlockInvariant {
                                pre: state.clone(),
                                post: None,
                            },
                        );
                        if queued.insert(successor) {
                            worklist.push_back(successor);
                        }
                    }
                }
            }
        }
        inv_map
    }
}

/// Reachability from the entry chunk, expressed as a fixed point instead of
/// a one-off BFS: `State` is a `BitVector` indexed by chunk id, the
/// transfer function is the identity (no per-action effect), and
/// `seed_block` marks the current chunk's own bit so the final
/// `InvariantMap`'s postconditions are exactly the "reachable from here"
/// sets.
pub struct ReachingOffsets {
    num_chunks: usize,
}

impl ReachingOffsets {
    pub fn new(num_chunks: usize) -> Self {
        ReachingOffsets { num_chunks }
    }

    /// Convenience entry point: the set of chunk ids reachable from
    /// `chunks[0]`, inclusive.
    pub fn reachable_from_entry(chunks: &[ByteCodeChunk]) -> BTreeSet<u32> {
        let mut analysis = ReachingOffsets::new(chunks.len());
        let initial = BitVector::new(chunks.len());
        let inv_map = analysis.analyze(chunks, initial);
        inv_map
            .values()
            .filter_map(|inv| inv.post.as_ref())
            .flat_map(|bv| bv.bits_set())
            .map(|i| i as u32)
            .collect()
    }
}

impl TransferFunctions for ReachingOffsets {
    type State = BitVector;

    fn execute(&mut self, _pre: &mut Self::State, _action: &Action) {}

    fn seed_block(&mut self, chunk_id: u32, state: &mut Self::State) {
        debug_assert!((chunk_id as usize) < self.num_chunks);
        state.set_bit(chunk_id as usize);
    }
}

impl AbstractInterpreter for ReachingOffsets {}

/// Backward liveness over register slots. A register is live-in at a chunk
/// if it is read before being (re)written along some path from that chunk,
/// i.e. the classic `live_in = use U (live_out - def)` equations, computed
/// to a fixed point over the reversed edges of the chunk graph.
///
/// This walks predecessors instead of successors, so it doesn't reuse
/// [`AbstractInterpreter::analyze`] (which is forward-only); the worklist
/// shape is otherwise identical.
pub fn live_registers(chunks: &[ByteCodeChunk], register_count: usize) -> BTreeMap<u32, BitVector> {
    let mut live_in: BTreeMap<u32, BitVector> = chunks
        .iter()
        .map(|c| (c.id, BitVector::new(register_count)))
        .collect();
    let chunk_by_id: BTreeMap<u32, &ByteCodeChunk> = chunks.iter().map(|c| (c.id, c)).collect();

    let mut worklist: VecDeque<u32> = chunks.iter().map(|c| c.id).collect();
    let mut queued: BTreeSet<u32> = worklist.iter().copied().collect();

    while let Some(id) = worklist.pop_front() {
        queued.remove(&id);
        let chunk = chunk_by_id[&id];

        // live_out = union of live_in over successors
        let mut live_out = BitVector::new(register_count);
        for successor in &chunk.next_chunks {
            live_out.or_vector(&live_in[successor]);
        }

        // Walk the block backward applying `live = use U (live - def)`.
        let mut state = live_out;
        for action in chunk.actions.iter().rev() {
            if let Some(register) = action.register_written() {
                state.clear_bit(register as usize);
            }
            for register in action.registers_read() {
                state.set_bit(register as usize);
            }
        }

        let changed = live_in[&id].clone() != state;
        if changed {
            live_in.insert(id, state);
            for &predecessor in &chunk.previous_chunks {
                if queued.insert(predecessor) {
                    worklist.push_back(predecessor);
                }
            }
        }
    }

    live_in
}
