//! Shared CFG utilities.
//!
//! Every pass needs the same handful of graph facts: predecessors, a
//! reverse postorder, which edges are retreating (loop back-edges, also for
//! irreducible graphs), and which blocks belong to a loop. They are computed
//! once per function into a [`ControlFlow`] and shared read-only, so passes
//! never import from each other.

use rustc_hash::FxHashSet;
use smallvec::{smallvec, SmallVec};

use crate::ir::{BlockId, CheckFunction, Terminator};

/// Successor block ids of a terminator.
pub(crate) fn successor_block_ids(terminator: &Terminator) -> SmallVec<[BlockId; 2]> {
    match terminator {
        Terminator::Return | Terminator::Unreachable => SmallVec::new(),
        Terminator::Goto { target } => smallvec![*target],
        Terminator::Branch {
            then_block,
            else_block,
            ..
        } => smallvec![*then_block, *else_block],
    }
}

/// Compute the predecessor list for each block (deduplicated).
pub(crate) fn compute_predecessors(func: &CheckFunction) -> Vec<Vec<usize>> {
    let num_blocks = func.blocks.len();
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); num_blocks];

    for (block_idx, block) in func.blocks.iter().enumerate() {
        let mut seen: SmallVec<[usize; 2]> = SmallVec::new();
        for succ_id in successor_block_ids(&block.terminator) {
            let succ_idx = succ_id.index();
            if succ_idx < num_blocks && !seen.contains(&succ_idx) {
                seen.push(succ_idx);
                predecessors[succ_idx].push(block_idx);
            }
        }
    }

    predecessors
}

/// Postorder over the blocks reachable from the entry.
///
/// Iterative DFS with an explicit stack, so deeply nested bodies cannot
/// overflow the native stack.
pub(crate) fn compute_postorder(func: &CheckFunction) -> Vec<usize> {
    let num_blocks = func.blocks.len();
    let mut visited = vec![false; num_blocks];
    let mut postorder = Vec::with_capacity(num_blocks);

    if func.entry.index() >= num_blocks {
        return postorder;
    }

    // (block, index of next successor to visit)
    let mut stack: Vec<(usize, usize)> = vec![(func.entry.index(), 0)];
    visited[func.entry.index()] = true;

    while let Some(&mut (block_idx, ref mut next)) = stack.last_mut() {
        let succs = successor_block_ids(&func.blocks[block_idx].terminator);
        if let Some(succ) = succs.get(*next) {
            *next += 1;
            let succ_idx = succ.index();
            if succ_idx < num_blocks && !visited[succ_idx] {
                visited[succ_idx] = true;
                stack.push((succ_idx, 0));
            }
        } else {
            postorder.push(block_idx);
            stack.pop();
        }
    }

    postorder
}

/// Graph facts for one function.
#[derive(Clone, Debug)]
pub struct ControlFlow {
    preds: Vec<Vec<usize>>,
    /// Reachable blocks in reverse postorder.
    rpo: Vec<usize>,
    /// Position of each block in `rpo`, `None` if unreachable.
    rpo_pos: Vec<Option<usize>>,
    /// Retreating edges `(from, to)`: `to` does not come after `from` in RPO.
    retreating: FxHashSet<(usize, usize)>,
}

impl ControlFlow {
    pub fn build(func: &CheckFunction) -> Self {
        let n = func.blocks.len();
        let preds = compute_predecessors(func);
        let mut rpo = compute_postorder(func);
        rpo.reverse();

        let mut rpo_pos = vec![None; n];
        for (pos, &block_idx) in rpo.iter().enumerate() {
            rpo_pos[block_idx] = Some(pos);
        }

        // In a DFS-derived RPO every back-edge target precedes its source.
        // Irreducible loops still produce at least one such edge per cycle.
        let mut retreating = FxHashSet::default();
        for &from in &rpo {
            for succ in successor_block_ids(&func.blocks[from].terminator) {
                let to = succ.index();
                if let (Some(pf), Some(pt)) = (rpo_pos[from], rpo_pos.get(to).copied().flatten()) {
                    if pt <= pf {
                        retreating.insert((from, to));
                    }
                }
            }
        }

        ControlFlow {
            preds,
            rpo,
            rpo_pos,
            retreating,
        }
    }

    /// Reachable blocks in reverse postorder.
    pub fn reverse_postorder(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.rpo.iter().map(|&b| BlockId::from_index(b))
    }

    pub fn num_blocks(&self) -> usize {
        self.preds.len()
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        matches!(self.rpo_pos.get(block.index()), Some(Some(_)))
    }

    /// All distinct predecessors, reachable or not.
    pub fn predecessors(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.preds[block.index()]
            .iter()
            .map(|&b| BlockId::from_index(b))
    }

    /// Reachable predecessors reached over a non-retreating edge.
    ///
    /// Walking blocks in RPO, these are exactly the predecessors already
    /// visited when `block` is reached.
    pub fn forward_predecessors(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        let to = block.index();
        self.preds[to]
            .iter()
            .copied()
            .filter(move |&from| {
                self.rpo_pos[from].is_some() && !self.retreating.contains(&(from, to))
            })
            .map(BlockId::from_index)
    }

    pub fn is_retreating(&self, from: BlockId, to: BlockId) -> bool {
        self.retreating.contains(&(from.index(), to.index()))
    }

    /// A block entered through at least one retreating edge.
    pub fn is_loop_header(&self, block: BlockId) -> bool {
        let to = block.index();
        self.preds[to]
            .iter()
            .any(|&from| self.retreating.contains(&(from, to)))
    }

    /// Number of loop headers.
    pub fn loop_count(&self) -> usize {
        self.rpo
            .iter()
            .filter(|&&b| self.is_loop_header(BlockId::from_index(b)))
            .count()
    }

    /// Blocks of the loop(s) headed by `header`, header included.
    ///
    /// For each retreating edge `s -> header`, collects every block that
    /// reaches `s` without passing through `header`. For irreducible loops
    /// this may include blocks before the loop; callers only use the body
    /// as an over-approximation of what one iteration can execute.
    pub fn loop_body(&self, header: BlockId) -> FxHashSet<BlockId> {
        let h = header.index();
        let mut body = FxHashSet::default();
        body.insert(header);

        let mut stack: Vec<usize> = self.preds[h]
            .iter()
            .copied()
            .filter(|&from| self.retreating.contains(&(from, h)))
            .collect();

        while let Some(b) = stack.pop() {
            if !body.insert(BlockId::from_index(b)) {
                continue;
            }
            for &p in &self.preds[b] {
                if p != h && self.rpo_pos[p].is_some() {
                    stack.push(p);
                }
            }
        }

        body
    }
}

#[cfg(test)]
mod tests;
