//! Control-flow graph construction: the `graph_control_flow` operation.
//!
//! Carves a [`ByteCode`]'s action stream into [`ByteCodeChunk`]s, links
//! their predecessor/successor edges, and emits an offset map from every
//! referenced offset to the chunk it belongs to. Unreachable (dead) code
//! between a terminator/unconditional jump and the next branch target is
//! dropped entirely - it never appears in a chunk or in the offset map.
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::bytecode::{Action, ActionKind, ByteCode};
use crate::chunk::ByteCodeChunk;
use crate::error::{Error, Result};

/// Builds the control-flow graph for `bytecode`.
///
/// Returns the ordered chunk list (chunk 0 is the entry, the last chunk is
/// the empty sentinel representing "control has fallen off the end") and
/// the total offset -> chunk-id map.
pub fn graph_control_flow(bytecode: &ByteCode) -> Result<(Vec<ByteCodeChunk>, BTreeMap<u32, u32>)> {
    verify_ordering(&bytecode.actions)?;

    let action_offsets: BTreeSet<u32> = bytecode.actions.iter().map(|a| a.offset).collect();
    let branch_targets = collect_and_validate_targets(bytecode, &action_offsets)?;

    debug!(
        actions = bytecode.actions.len(),
        end_offset = bytecode.end_offset,
        branch_targets = branch_targets.len(),
        "building control-flow graph"
    );

    let mut chunks = carve_chunks(&bytecode.actions, &branch_targets);
    let sentinel_id = chunks.len() as u32;
    chunks.push(ByteCodeChunk::new(sentinel_id));

    let leader_to_id = build_leader_map(&chunks, bytecode.end_offset, sentinel_id);
    link_edges(&mut chunks, &leader_to_id, sentinel_id)?;
    link_predecessors(&mut chunks);

    let offset_map = build_offset_map(&chunks, bytecode.end_offset, sentinel_id);

    trace!(chunks = chunks.len(), "control-flow graph built");
    Ok((chunks, offset_map))
}

fn verify_ordering(actions: &[Action]) -> Result<()> {
    for pair in actions.windows(2) {
        if pair[0].offset >= pair[1].offset {
            return Err(Error::DisorderedBytecode {
                action_offset: pair[1].offset,
            });
        }
    }
    Ok(())
}

/// Validates every branch target is either a real action offset or the
/// function's `end_offset`, and returns the set of all such targets.
///
/// Also validates per-action payload shape (currently: a `Push` must carry
/// at least one value - an empty `PUSH` has no valid encoding in the
/// original bytecode and is rejected as [`Error::MalformedAction`]).
fn collect_and_validate_targets(
    bytecode: &ByteCode,
    action_offsets: &BTreeSet<u32>,
) -> Result<BTreeSet<u32>> {
    let mut targets = BTreeSet::new();
    for action in &bytecode.actions {
        if let ActionKind::Push { values } = &action.kind {
            if values.is_empty() {
                return Err(Error::MalformedAction {
                    action_offset: action.offset,
                    reason: "PUSH carries no values",
                });
            }
        }

        if let Some(target) = action.branch_target() {
            if !action_offsets.contains(&target) && target != bytecode.end_offset {
                return Err(Error::InvalidTarget {
                    action_offset: action.offset,
                    target,
                });
            }
            targets.insert(target);
        }
    }
    Ok(targets)
}

/// Phases 2-4: slice the action stream into live basic blocks, dropping
/// dead code. Chunk ids equal their index in the returned vector (the
/// sentinel is appended by the caller, so ids here run `0..chunks.len()`).
fn carve_chunks(actions: &[Action], branch_targets: &BTreeSet<u32>) -> Vec<ByteCodeChunk> {
    let mut chunks = Vec::new();
    let mut current: Option<ByteCodeChunk> = None;
    // AFTER_TERMINATOR: true once a terminator or unconditional jump has
    // been seen and no branch target has resumed live code since.
    let mut skipping = false;

    for action in actions {
        if skipping {
            if branch_targets.contains(&action.offset) {
                skipping = false;
            } else {
                trace!(offset = action.offset, "dropping unreachable action");
                continue;
            }
        }

        if current.is_none() || branch_targets.contains(&action.offset) {
            if let Some(finished) = current.take() {
                chunks.push(finished);
            }
            current = Some(ByteCodeChunk::new(chunks.len() as u32));
        }

        let chunk = current.as_mut().expect("chunk started above");
        chunk.actions.push(action.clone());

        if action.kind.is_terminator() || action.kind.is_unconditional_jump() {
            chunks.push(current.take().expect("chunk started above"));
            skipping = true;
        } else if action.kind.is_branch() {
            // An `If` is always the last action of its block: the
            // fall-through case begins a new block unconditionally.
            chunks.push(current.take().expect("chunk started above"));
        }
    }

    if let Some(finished) = current.take() {
        chunks.push(finished);
    }

    chunks
}

fn build_leader_map(
    chunks: &[ByteCodeChunk],
    end_offset: u32,
    sentinel_id: u32,
) -> BTreeMap<u32, u32> {
    let mut map = BTreeMap::new();
    for chunk in chunks {
        if chunk.id == sentinel_id {
            continue;
        }
        let leader = chunk.actions[0].offset;
        map.insert(leader, chunk.id);
    }
    map.insert(end_offset, sentinel_id);
    map
}

fn link_edges(
    chunks: &mut [ByteCodeChunk],
    leader_to_id: &BTreeMap<u32, u32>,
    sentinel_id: u32,
) -> Result<()> {
    let fallthrough_of = |index: usize| -> u32 {
        chunks
            .get(index + 1)
            .map(|c| c.id)
            .unwrap_or(sentinel_id)
    };

    let resolve = |offset: u32, action: &Action| -> Result<u32> {
        leader_to_id.get(&offset).copied().ok_or(Error::InvalidTarget {
            action_offset: action.offset,
            target: offset,
        })
    };

    let mut edges: Vec<(u32, Vec<u32>)> = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        if chunk.is_sentinel() {
            edges.push((chunk.id, Vec::new()));
            continue;
        }
        let last = chunk.actions.last().expect("non-sentinel chunk has actions");
        let successors = if last.kind.is_terminator() {
            vec![sentinel_id]
        } else if last.kind.is_unconditional_jump() {
            let target = last.branch_target().expect("unconditional jump carries a target");
            vec![resolve(target, last)?]
        } else if last.kind.is_branch() {
            let target = last.branch_target().expect("if carries a target");
            vec![fallthrough_of(index), resolve(target, last)?]
        } else {
            vec![fallthrough_of(index)]
        };
        edges.push((chunk.id, successors));
    }

    for (id, successors) in edges {
        let chunk = &mut chunks[id as usize];
        for successor in successors {
            chunk.add_successor(successor);
        }
    }
    Ok(())
}

fn link_predecessors(chunks: &mut [ByteCodeChunk]) {
    let edges: Vec<(u32, Vec<u32>)> = chunks
        .iter()
        .map(|c| (c.id, c.next_chunks.iter().copied().collect()))
        .collect();
    for (predecessor, successors) in edges {
        for successor in successors {
            chunks[successor as usize].add_predecessor(predecessor);
        }
    }
}

fn build_offset_map(
    chunks: &[ByteCodeChunk],
    end_offset: u32,
    sentinel_id: u32,
) -> BTreeMap<u32, u32> {
    let mut map: BTreeMap<u32, u32> = chunks
        .iter()
        .filter(|c| !c.is_sentinel())
        .map(|c| (c.actions[0].offset, c.id))
        .collect();
    map.insert(end_offset, sentinel_id);
    map
}
