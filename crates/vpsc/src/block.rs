//! Blocks of variables held together by active constraints.
//!
//! All state lives in index-addressed arenas: variables and constraints keep the indices the
//! caller gave them, blocks are appended to `arena` as they are created (merges and splits never
//! reuse a slot) and `live` tracks the blocks that currently own variables. The active
//! constraints of a block always form a spanning tree over its variables, which is what the
//! traversals below rely on.

use crate::constraint::Constraint;
use crate::variable::Variable;
use indexmap::IndexSet;

// Variables with zero weight still need a tiny share of the block statistics so the reference
// position stays defined.
const MIN_EFFECTIVE_WEIGHT: f64 = 1e-10;

#[derive(Debug, Clone, Copy, Default)]
struct PositionStats {
    scale: f64,
    ab: f64,
    ad: f64,
    a2: f64,
}

impl PositionStats {
    fn add_variable(&mut self, v: &Variable) {
        let ai = self.scale / v.scale;
        let bi = v.offset / v.scale;
        let wi = v.weight.max(MIN_EFFECTIVE_WEIGHT);
        self.ab += wi * ai * bi;
        self.ad += wi * ai * v.desired_position;
        self.a2 += wi * ai * ai;
    }

    fn optimal_position(&self) -> f64 {
        (self.ad - self.ab) / self.a2
    }
}

#[derive(Debug, Clone, Copy)]
struct TreeNode {
    var: usize,
    // Index of the parent in the traversal order and the active constraint leading to it.
    parent: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Block {
    pub(crate) vars: Vec<usize>,
    posn: f64,
    ps: PositionStats,
    pub(crate) deleted: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Blocks {
    pub(crate) vars: Vec<Variable>,
    pub(crate) cs: Vec<Constraint>,
    arena: Vec<Block>,
    pub(crate) live: IndexSet<usize>,
}

impl Blocks {
    /// Wires up the constraint adjacency of every variable and puts each variable into its own
    /// singleton block.
    pub(crate) fn new(mut vars: Vec<Variable>, mut cs: Vec<Constraint>) -> Self {
        for v in &mut vars {
            v.in_cs.clear();
            v.out_cs.clear();
        }
        for (ci, c) in cs.iter_mut().enumerate() {
            c.reset();
            vars[c.left].out_cs.push(ci);
            vars[c.right].in_cs.push(ci);
        }

        let mut blocks = Self {
            vars,
            cs,
            arena: Vec::new(),
            live: IndexSet::new(),
        };
        for v in 0..blocks.vars.len() {
            blocks.vars[v].offset = 0.0;
            let b = blocks.new_block();
            blocks.add_variable(b, v);
            blocks.live.insert(b);
        }
        blocks
    }

    fn new_block(&mut self) -> usize {
        self.arena.push(Block::default());
        self.arena.len() - 1
    }

    pub(crate) fn block_of(&self, v: usize) -> usize {
        self.vars[v].block
    }

    fn add_variable(&mut self, b: usize, v: usize) {
        self.vars[v].block = b;
        let block = &mut self.arena[b];
        block.vars.push(v);
        if block.ps.a2 == 0.0 {
            block.ps.scale = self.vars[v].scale;
        }
        block.ps.add_variable(&self.vars[v]);
        block.posn = block.ps.optimal_position();
        debug_assert!(!block.posn.is_nan(), "block position became NaN");
    }

    /// Recomputes a block's reference position from the current desired positions of its
    /// members.
    pub(crate) fn update_weighted_position(&mut self, b: usize) {
        let block = &mut self.arena[b];
        block.ps.ab = 0.0;
        block.ps.ad = 0.0;
        block.ps.a2 = 0.0;
        for &v in &block.vars {
            block.ps.add_variable(&self.vars[v]);
        }
        block.posn = block.ps.optimal_position();
        debug_assert!(!block.posn.is_nan(), "block position became NaN");
    }

    pub(crate) fn position(&self, v: usize) -> f64 {
        let var = &self.vars[v];
        let block = &self.arena[var.block];
        (block.ps.scale * block.posn + var.offset) / var.scale
    }

    fn dfdv(&self, v: usize) -> f64 {
        let var = &self.vars[v];
        2.0 * var.weight * (self.position(v) - var.desired_position)
    }

    pub(crate) fn slack(&self, c: usize) -> f64 {
        let con = &self.cs[c];
        if con.unsatisfiable {
            return f64::MAX;
        }
        self.vars[con.right].scale * self.position(con.right)
            - con.gap
            - self.vars[con.left].scale * self.position(con.left)
    }

    /// Total weighted squared distance of all variables from their desired positions.
    pub(crate) fn cost(&self) -> f64 {
        self.live.iter().map(|&b| self.block_cost(b)).sum()
    }

    fn block_cost(&self, b: usize) -> f64 {
        self.arena[b]
            .vars
            .iter()
            .map(|&v| {
                let diff = self.position(v) - self.vars[v].desired_position;
                self.vars[v].weight * diff * diff
            })
            .sum()
    }

    pub(crate) fn is_deleted(&self, b: usize) -> bool {
        self.arena[b].deleted
    }

    pub(crate) fn mark_deleted(&mut self, b: usize) {
        self.arena[b].deleted = true;
    }

    /// Drops deleted blocks from the live set.
    pub(crate) fn cleanup(&mut self) {
        let arena = &self.arena;
        self.live.retain(|&b| !arena[b].deleted);
    }

    /// Merges the blocks on either side of `c`, making `c` active. The smaller block is folded
    /// into the larger one; the surviving block is returned.
    pub(crate) fn merge(&mut self, c: usize) -> usize {
        let (left, right, gap) = {
            let con = &self.cs[c];
            (con.left, con.right, con.gap)
        };
        let dist = self.vars[right].offset - self.vars[left].offset - gap;
        let lb = self.vars[left].block;
        let rb = self.vars[right].block;
        debug_assert_ne!(lb, rb, "merge across an internal constraint");
        if self.arena[lb].vars.len() < self.arena[rb].vars.len() {
            self.merge_into(rb, lb, c, dist);
            rb
        } else {
            self.merge_into(lb, rb, c, -dist);
            lb
        }
    }

    fn merge_into(&mut self, target: usize, other: usize, c: usize, dist: f64) {
        tracing::trace!(target, other, constraint = c, dist, "merging blocks");
        self.cs[c].active = true;
        let moved = std::mem::take(&mut self.arena[other].vars);
        for &v in &moved {
            self.vars[v].offset += dist;
            self.add_variable(target, v);
        }
        self.arena[other].vars = moved;
        self.arena[other].deleted = true;
    }

    fn can_follow_left(&self, b: usize, c: usize, last: Option<usize>) -> bool {
        let con = &self.cs[c];
        self.vars[con.left].block == b && con.active && last != Some(con.left)
    }

    fn can_follow_right(&self, b: usize, c: usize, last: Option<usize>) -> bool {
        let con = &self.cs[c];
        self.vars[con.right].block == b && con.active && last != Some(con.right)
    }

    // Smallest multiplier wins, ties going to the lowest constraint index. Equalities never
    // split.
    fn is_better_split(&self, c: usize, current: Option<usize>) -> bool {
        if self.cs[c].equality {
            return false;
        }
        current.is_none_or(|m| {
            let (lm, best) = (self.cs[c].lm, self.cs[m].lm);
            lm < best || (lm == best && c < m)
        })
    }

    /// The active constraint tree of `b` reachable from `root` without stepping onto `skip`, in
    /// preorder. Every entry after the first links back to an earlier one.
    fn active_tree(&self, b: usize, root: usize, skip: Option<usize>) -> Vec<TreeNode> {
        let mut order = Vec::new();
        let mut stack = vec![(root, skip, None)];
        while let Some((v, last, parent)) = stack.pop() {
            let idx = order.len();
            order.push(TreeNode { var: v, parent });
            let var = &self.vars[v];
            // Pushed in reverse so that left neighbours are visited first.
            for &c in var.out_cs.iter().rev() {
                if self.can_follow_right(b, c, last) {
                    stack.push((self.cs[c].right, Some(v), Some((idx, c))));
                }
            }
            for &c in var.in_cs.iter().rev() {
                if self.can_follow_left(b, c, last) {
                    stack.push((self.cs[c].left, Some(v), Some((idx, c))));
                }
            }
        }
        order
    }

    /// Computes the multipliers of every active constraint of `b` from `df/dv` of its variables,
    /// leaves first. Returns the constraint that most wants to split.
    fn compute_multipliers(&mut self, b: usize, tree: &[TreeNode]) -> Option<usize> {
        let mut dfdv: Vec<f64> = tree.iter().map(|n| self.dfdv(n.var)).collect();
        let mut min_lm = None;
        for (i, node) in tree.iter().enumerate().rev() {
            let Some((p, c)) = node.parent else {
                continue;
            };
            let value = dfdv[i] / self.vars[node.var].scale;
            let (left, right) = (self.cs[c].left, self.cs[c].right);
            if left == tree[p].var {
                self.cs[c].lm = value;
                dfdv[p] += value * self.vars[left].scale;
            } else {
                self.cs[c].lm = -value;
                dfdv[p] += value * self.vars[right].scale;
            }
            if self.is_better_split(c, min_lm) {
                min_lm = Some(c);
            }
        }
        min_lm
    }

    /// The active constraint of `b` that most wants to split (smallest multiplier).
    pub(crate) fn find_min_lm(&mut self, b: usize) -> Option<usize> {
        let front = *self.arena[b].vars.first()?;
        let tree = self.active_tree(b, front, None);
        self.compute_multipliers(b, &tree)
    }

    /// Like [`Blocks::find_min_lm`], restricted to the constraints on the path from `lv` to
    /// `rv` that point from `lv` towards `rv`. Only those can be split without creating a new
    /// violation.
    fn find_min_lm_between(&mut self, b: usize, lv: usize, rv: usize) -> Option<usize> {
        self.find_min_lm(b);
        let tree = self.active_tree(b, lv, None);
        let mut i = tree.iter().position(|n| n.var == rv)?;
        let mut min_lm = None;
        while let Some((p, c)) = tree[i].parent {
            if self.cs[c].left == tree[p].var && self.is_better_split(c, min_lm) {
                min_lm = Some(c);
            }
            i = p;
        }
        min_lm
    }

    /// Whether a chain of active constraints leads from `u` rightwards to `v`.
    pub(crate) fn is_active_directed_path_between(&self, b: usize, u: usize, v: usize) -> bool {
        let mut stack = vec![u];
        while let Some(w) = stack.pop() {
            if w == v {
                return true;
            }
            for &c in &self.vars[w].out_cs {
                if self.can_follow_right(b, c, None) {
                    stack.push(self.cs[c].right);
                }
            }
        }
        false
    }

    fn populate_split_block(&mut self, old: usize, target: usize, v: usize, u: Option<usize>) {
        for node in self.active_tree(old, v, u) {
            self.add_variable(target, node.var);
        }
    }

    /// Splits `b` across the active constraint `c` into two fresh blocks, returned as
    /// `(left, right)`. The caller decides what happens to `b` itself.
    pub(crate) fn split(&mut self, b: usize, c: usize) -> (usize, usize) {
        self.cs[c].active = false;
        let (left, right) = (self.cs[c].left, self.cs[c].right);
        let l = self.new_block();
        self.populate_split_block(b, l, left, Some(right));
        let r = self.new_block();
        self.populate_split_block(b, r, right, Some(left));
        tracing::trace!(block = b, constraint = c, l, r, "split block");
        (l, r)
    }

    /// Splits `b` on the path between `vl` and `vr` at the constraint with the smallest
    /// multiplier. Returns the split constraint and the two new blocks, or `None` when no
    /// constraint on the path can be split.
    pub(crate) fn split_between(
        &mut self,
        b: usize,
        vl: usize,
        vr: usize,
    ) -> Option<(usize, usize, usize)> {
        let c = self.find_min_lm_between(b, vl, vr)?;
        let (l, r) = self.split(b, c);
        self.arena[b].deleted = true;
        Some((c, l, r))
    }

    pub(crate) fn block_vars(&self, b: usize) -> &[usize] {
        &self.arena[b].vars
    }
}

#[cfg(test)]
mod tests {
    use super::Blocks;
    use crate::constraint::Constraint;
    use crate::variable::Variable;

    #[test]
    fn singleton_blocks_sit_at_the_desired_positions() {
        let blocks = Blocks::new(
            vec![Variable::new(3.0, 1.0), Variable::new(-2.0, 5.0)],
            Vec::new(),
        );
        assert_eq!(blocks.live.len(), 2);
        assert_eq!(blocks.position(0), 3.0);
        assert_eq!(blocks.position(1), -2.0);
        assert_eq!(blocks.cost(), 0.0);
    }

    #[test]
    fn merge_places_the_block_at_the_weighted_optimum() {
        // x0 wants 2, x1 wants 0, and x1 - x0 >= 1.
        let mut blocks = Blocks::new(
            vec![Variable::new(2.0, 1.0), Variable::new(0.0, 3.0)],
            vec![Constraint::new(0, 1, 1.0)],
        );
        let merged = blocks.merge(0);
        blocks.cleanup();

        assert_eq!(blocks.live.len(), 1);
        assert_eq!(blocks.block_of(0), merged);
        assert_eq!(blocks.block_of(1), merged);
        let gap = blocks.position(1) - blocks.position(0);
        assert!((gap - 1.0).abs() < 1e-12, "gap: {gap}");
        // minimize (x-2)^2 + 3(x+1)^2  =>  x = -0.25
        assert!((blocks.position(0) + 0.25).abs() < 1e-12);
    }

    #[test]
    fn multiplier_is_negative_when_the_constraint_pulls_the_wrong_way() {
        let mut blocks = Blocks::new(
            vec![Variable::new(0.0, 1.0), Variable::new(5.0, 1.0)],
            vec![Constraint::new(0, 1, 1.0)],
        );
        let merged = blocks.merge(0);
        let min = blocks.find_min_lm(merged);
        assert_eq!(min, Some(0));
        assert!(blocks.cs[0].lm < 0.0);

        let (l, r) = blocks.split(merged, 0);
        blocks.mark_deleted(merged);
        blocks.update_weighted_position(l);
        blocks.update_weighted_position(r);
        assert!(!blocks.cs[0].active);
        assert_eq!(blocks.block_vars(l), &[0]);
        assert_eq!(blocks.block_vars(r), &[1]);
        assert!((blocks.position(1) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn long_blocks_split_without_recursion() {
        let n = 20_000;
        let vars = (0..n).map(|_| Variable::new(0.0, 1.0)).collect();
        let cs = (0..n - 1).map(|i| Constraint::new(i, i + 1, 1.0)).collect();
        let mut blocks = Blocks::new(vars, cs);
        let mut b = 0;
        for c in 0..n - 1 {
            b = blocks.merge(c);
        }
        blocks.cleanup();
        assert_eq!(blocks.live.len(), 1);
        assert!(blocks.is_active_directed_path_between(b, 0, n - 1));
        assert!(!blocks.is_active_directed_path_between(b, n - 1, 0));
        // Spreading a chain of variables that all want 0 pushes on every constraint.
        let min = blocks.find_min_lm(b).unwrap();
        assert!(blocks.cs[min].lm > 0.0);

        let (l, r) = blocks.split(b, n / 2);
        assert_eq!(blocks.block_vars(l).len(), n / 2 + 1);
        assert_eq!(blocks.block_vars(r).len(), n - n / 2 - 1);
    }
}
