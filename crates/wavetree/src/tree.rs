//! `Wavetree<T>`: the sparse tree of active coefficients plus the
//! attachable (`S_b`) / prunable (`S_d`) companion sets, generic over
//! the domain [`Topology`].
//!
//! Ported from the shared contract of `wavetree2d_sub.c`,
//! `wavetree3d_sub.c`, `wavetreesphereface2d.c`,
//! `wavetreesphereface3d.c`, and `wavetreesphere3d.c` — the five
//! sources implement the same state machine over different index
//! spaces, which this type factors out behind `T: Topology`.

use wavetree_core::{
    all_empty, bad_arg, empty_depth, nothing_pending, not_active, not_attachable, occupied,
    OrderedMultisetInt, OrderedMultisetIntDouble, Result, DEPTH_SIZE,
};

use crate::laststep::{LastStep, StepKind};
use crate::topology::Topology;

/// Sparse, trans-dimensional coefficient tree over a domain `T`.
pub struct Wavetree<T: Topology> {
    topology: T,
    alpha: f64,
    s_v: OrderedMultisetIntDouble,
    s_b: OrderedMultisetInt,
    s_d: OrderedMultisetInt,
    last_step: Option<LastStep>,
    pending: bool,
}

impl<T: Topology> Wavetree<T> {
    /// Allocate an empty, uninitialised tree over `topology`, with
    /// `alpha` the power-law depth-weighting exponent used by the
    /// `*_global` choosers.
    #[must_use]
    pub fn new(topology: T, alpha: f64) -> Self {
        tracing::debug!(alpha, "creating wavetree");
        Self {
            topology,
            alpha,
            s_v: OrderedMultisetIntDouble::new(),
            s_b: OrderedMultisetInt::new(),
            s_d: OrderedMultisetInt::new(),
            last_step: None,
            pending: false,
        }
    }

    /// Hydrate from three already-consistent companion sets (the text
    /// persistence format stores all three explicitly, so no
    /// reconstruction is needed on that path).
    pub(crate) const fn from_parts(
        topology: T,
        alpha: f64,
        s_v: OrderedMultisetIntDouble,
        s_b: OrderedMultisetInt,
        s_d: OrderedMultisetInt,
    ) -> Self {
        Self {
            topology,
            alpha,
            s_v,
            s_b,
            s_d,
            last_step: None,
            pending: false,
        }
    }

    /// Hydrate by replaying `S_v` alone (the binary format's payload):
    /// initialise from `root_value`, then attach every remaining entry
    /// as a birth, in the depth-ascending, index-ascending order the
    /// wire format guarantees so each parent is already active by the
    /// time its child is replayed.
    pub(crate) fn rebuild_from_active(
        &mut self,
        root_value: f64,
        rest: &[(u32, i32, f64)],
    ) -> Result<()> {
        self.initialize(root_value)?;
        for &(d, i, v) in rest {
            self.apply_birth(d, i, v)?;
        }
        self.last_step = None;
        self.pending = false;
        Ok(())
    }

    #[must_use]
    pub const fn topology(&self) -> &T {
        &self.topology
    }

    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    #[must_use]
    pub const fn s_v(&self) -> &OrderedMultisetIntDouble {
        &self.s_v
    }

    #[must_use]
    pub const fn s_b(&self) -> &OrderedMultisetInt {
        &self.s_b
    }

    #[must_use]
    pub const fn s_d(&self) -> &OrderedMultisetInt {
        &self.s_d
    }

    /// Number of active coefficients, `|S_v|`.
    #[must_use]
    pub fn coeff_count(&self) -> usize {
        self.s_v.total_count()
    }

    /// A copy of the most recent step record, whether or not it has
    /// been committed yet.
    #[must_use]
    pub fn get_last_perturbation(&self) -> Option<LastStep> {
        self.last_step
    }

    /// Reset the last-step record to nothing without attempting an
    /// undo, for samplers that reject a proposal analytically before
    /// ever calling `propose_*`.
    pub fn set_invalid_perturbation(&mut self) {
        self.last_step = None;
        self.pending = false;
    }

    /// Clear all state, seed `(0, 0)` with `dc`, and populate `S_b`
    /// with every depth-1 base cell. Re-seeds on repeated calls.
    pub fn initialize(&mut self, dc: f64) -> Result<()> {
        tracing::trace!(dc, "initialising wavetree");
        self.s_v = OrderedMultisetIntDouble::new();
        self.s_b = OrderedMultisetInt::new();
        self.s_d = OrderedMultisetInt::new();
        self.s_v.insert(0, 0, dc)?;
        let mut kids = Vec::new();
        self.topology.children(0, 0, &mut kids);
        for k in kids {
            self.s_b.insert(1, k)?;
        }
        let mut step = LastStep::initialise(dc);
        step.accepted = true;
        self.last_step = Some(step);
        self.pending = false;
        Ok(())
    }

    /// The synthetic root is never a member of `S_d`: it is always
    /// present once initialised (invariant 1) and `propose_death`
    /// rejects `depth == 0` outright, so "childless" never makes it
    /// eligible for pruning the way an ordinary leaf would be. This is
    /// a deliberate narrowing of invariant 6's literal "in `S_v` and no
    /// active child" reading for the one node it would otherwise wrongly
    /// admit.
    fn readd_parent_to_sd_if_childless(&mut self, depth: u32, index: i32) -> Result<()> {
        if let Some((pd, pi)) = self.topology.parent(depth, index) {
            if pd == 0 {
                return Ok(());
            }
            let mut sibs = Vec::new();
            self.topology.children(pd, pi, &mut sibs);
            let any_active = sibs.iter().any(|&s| self.s_v.is_element(depth as i32, s));
            if !any_active && !self.s_d.is_element(pd as i32, pi) {
                self.s_d.insert(pd as i32, pi)?;
            }
        }
        Ok(())
    }

    fn apply_birth(&mut self, depth: u32, index: i32, value: f64) -> Result<()> {
        tracing::trace!(depth, index, value, "applying birth");
        self.s_v.insert(depth as i32, index, value)?;
        self.s_b.remove(depth as i32, index)?;
        let mut kids = Vec::new();
        self.topology.children(depth, index, &mut kids);
        for c in kids {
            self.s_b.insert(depth as i32 + 1, c)?;
        }
        if let Some((pd, pi)) = self.topology.parent(depth, index) {
            self.s_d.remove(pd as i32, pi)?;
        }
        self.s_d.insert(depth as i32, index)?;
        Ok(())
    }

    fn undo_birth(&mut self, depth: u32, index: i32) -> Result<()> {
        self.s_v.remove(depth as i32, index)?;
        self.s_d.remove(depth as i32, index)?;
        self.s_b.insert(depth as i32, index)?;
        let mut kids = Vec::new();
        self.topology.children(depth, index, &mut kids);
        for c in kids {
            self.s_b.remove(depth as i32 + 1, c)?;
        }
        self.readd_parent_to_sd_if_childless(depth, index)
    }

    fn apply_death(&mut self, depth: u32, index: i32) -> Result<f64> {
        tracing::trace!(depth, index, "applying death");
        let old = self.s_v.get(depth as i32, index)?;
        self.s_v.remove(depth as i32, index)?;
        self.s_d.remove(depth as i32, index)?;
        self.s_b.insert(depth as i32, index)?;
        let mut kids = Vec::new();
        self.topology.children(depth, index, &mut kids);
        for c in kids {
            self.s_b.remove(depth as i32 + 1, c)?;
        }
        self.readd_parent_to_sd_if_childless(depth, index)?;
        Ok(old)
    }

    fn undo_death(&mut self, depth: u32, index: i32, old_value: f64) -> Result<()> {
        self.s_v.insert(depth as i32, index, old_value)?;
        self.s_b.remove(depth as i32, index)?;
        let mut kids = Vec::new();
        self.topology.children(depth, index, &mut kids);
        for c in kids {
            self.s_b.insert(depth as i32 + 1, c)?;
        }
        if let Some((pd, pi)) = self.topology.parent(depth, index) {
            self.s_d.remove(pd as i32, pi)?;
        }
        self.s_d.insert(depth as i32, index)?;
        Ok(())
    }

    /// Overwrite the value of an already-active coefficient.
    pub fn propose_value(&mut self, depth: u32, index: i32, new_value: f64) -> Result<()> {
        let old = self
            .s_v
            .get(depth as i32, index)
            .map_err(|_| not_active(depth, index as usize))?;
        self.s_v.set(depth as i32, index, new_value)?;
        self.last_step = Some(LastStep::value(depth, index, old, new_value));
        self.pending = true;
        Ok(())
    }

    /// Attach a new coefficient at an `S_b` slot.
    pub fn propose_birth(&mut self, depth: u32, index: i32, new_value: f64) -> Result<()> {
        if !self.s_b.is_element(depth as i32, index) {
            return Err(not_attachable(depth, index as usize));
        }
        self.apply_birth(depth, index, new_value)?;
        self.last_step = Some(LastStep::birth(depth, index, new_value));
        self.pending = true;
        Ok(())
    }

    /// Detach a leaf coefficient (an `S_d` slot), returning its value.
    pub fn propose_death(&mut self, depth: u32, index: i32) -> Result<f64> {
        if depth == 0 {
            return Err(bad_arg("the synthetic root cannot be killed"));
        }
        if !self.s_d.is_element(depth as i32, index) {
            return Err(not_active(depth, index as usize));
        }
        let old = self.apply_death(depth, index)?;
        self.last_step = Some(LastStep::death(depth, index, old));
        self.pending = true;
        Ok(old)
    }

    /// Relocate an active coefficient to an unoccupied same-depth
    /// sibling slot whose parent is active. Only supported by domain
    /// topologies for which `Topology::supports_move` is `true`.
    pub fn propose_move(
        &mut self,
        depth: u32,
        index: i32,
        new_index: i32,
        new_value: f64,
    ) -> Result<()> {
        if !self.topology.supports_move() {
            return Err(bad_arg("this topology does not support propose_move"));
        }
        if !self.s_v.is_element(depth as i32, index) {
            return Err(not_active(depth, index as usize));
        }
        if self.s_v.is_element(depth as i32, new_index) {
            return Err(occupied(depth, new_index as usize));
        }
        let parent_active = self
            .topology
            .parent(depth, new_index)
            .is_some_and(|(pd, pi)| self.s_v.is_element(pd as i32, pi));
        if !parent_active {
            return Err(not_attachable(depth, new_index as usize));
        }

        let old_value = self.apply_death(depth, index)?;
        self.apply_birth(depth, new_index, new_value)?;
        self.last_step = Some(LastStep::mv(depth, index, new_index, old_value, new_value));
        self.pending = true;
        Ok(())
    }

    /// Reverse the pending edit exactly.
    pub fn undo(&mut self) -> Result<()> {
        if !self.pending {
            return Err(nothing_pending());
        }
        let step = self.last_step.ok_or_else(nothing_pending)?;
        tracing::trace!(kind = ?step.kind, "undoing pending edit");
        match step.kind {
            StepKind::Initialise => {}
            StepKind::Value => {
                self.s_v.set(step.depth as i32, step.index, step.old_value)?;
            }
            StepKind::Birth => self.undo_birth(step.depth, step.index)?,
            StepKind::Death => self.undo_death(step.depth, step.index, step.old_value)?,
            StepKind::Move => {
                self.undo_birth(step.depth, step.dest_index)?;
                self.undo_death(step.depth, step.index, step.old_value)?;
            }
        }
        self.pending = false;
        Ok(())
    }

    /// Mark the pending edit accepted and clear the undo window.
    pub fn commit(&mut self) -> Result<()> {
        if !self.pending {
            return Err(nothing_pending());
        }
        if let Some(step) = self.last_step.as_mut() {
            step.accepted = true;
            tracing::trace!(kind = ?step.kind, "committing pending edit");
        }
        self.pending = false;
        Ok(())
    }

    // -- proposal-support query API --------------------------------

    pub fn choose_birth_depth(&self, u: f64, max_depth: u32) -> Result<(u32, usize)> {
        let (d, n) = self.s_b.choose_depth(u, max_depth as i32)?;
        Ok((d as u32, n))
    }

    pub fn reverse_birth_depth(&self, max_depth: u32) -> Result<f64> {
        let n = self.s_d.nonempty_count(max_depth as i32);
        if n == 0 {
            return Err(all_empty());
        }
        Ok(1.0 / n as f64)
    }

    pub fn choose_birth(&self, depth: u32, u: f64) -> Result<(i32, usize)> {
        self.s_b.choose_index(depth as i32, u)
    }

    pub fn reverse_birth(&self, depth: u32) -> Result<f64> {
        let n = self.s_d.depth_count(depth as i32);
        if n == 0 {
            return Err(empty_depth(depth));
        }
        Ok(1.0 / n as f64)
    }

    pub fn choose_birth_global(&self, u: f64, max_depth: u32) -> Result<(i32, u32, f64)> {
        let (i, d, p) = self.s_b.choose_index_weighted(u, max_depth as i32, self.alpha)?;
        Ok((i, d as u32, p))
    }

    pub fn reverse_birth_global(&self, max_depth: u32, depth: u32, index: i32) -> Result<f64> {
        self.s_d
            .reverse_choose_index_weighted(max_depth as i32, self.alpha, index, depth as i32)
    }

    pub fn choose_death_depth(&self, u: f64, max_depth: u32) -> Result<(u32, usize)> {
        let (d, n) = self.s_d.choose_depth(u, max_depth as i32)?;
        Ok((d as u32, n))
    }

    pub fn reverse_death_depth(&self, max_depth: u32) -> Result<f64> {
        let n = self.s_b.nonempty_count(max_depth as i32);
        if n == 0 {
            return Err(all_empty());
        }
        Ok(1.0 / n as f64)
    }

    pub fn choose_death(&self, depth: u32, u: f64) -> Result<(i32, usize)> {
        self.s_d.choose_index(depth as i32, u)
    }

    pub fn reverse_death(&self, depth: u32) -> Result<f64> {
        let n = self.s_b.depth_count(depth as i32);
        if n == 0 {
            return Err(empty_depth(depth));
        }
        Ok(1.0 / n as f64)
    }

    pub fn choose_death_global(&self, u: f64, max_depth: u32) -> Result<(i32, u32, f64)> {
        let (i, d, p) = self.s_d.choose_index_weighted(u, max_depth as i32, self.alpha)?;
        Ok((i, d as u32, p))
    }

    pub fn reverse_death_global(&self, max_depth: u32, depth: u32, index: i32) -> Result<f64> {
        self.s_b
            .reverse_choose_index_weighted(max_depth as i32, self.alpha, index, depth as i32)
    }

    pub fn choose_value_depth(&self, u: f64, max_depth: u32) -> Result<(u32, usize)> {
        let (d, n) = self.s_v.choose_depth(u, max_depth as i32)?;
        Ok((d as u32, n))
    }

    pub fn choose_value(&self, depth: u32, u: f64) -> Result<(i32, usize)> {
        let ((i, _v), n) = self.s_v.choose_index(depth as i32, u)?;
        Ok((i, n))
    }

    pub fn choose_value_global(&self, u: f64, max_depth: u32) -> Result<(i32, u32, f64)> {
        let ((i, _v), d, p) = self.s_v.choose_index_weighted(u, max_depth as i32, self.alpha)?;
        Ok((i, d as u32, p))
    }

    /// `move` is selected the same way as `death` — a leaf in `S_d` —
    /// the distinct name tracks `SPEC_FULL.md` §4.2's table entry
    /// rather than a different underlying selection.
    pub fn choose_move_depth(&self, u: f64, max_depth: u32) -> Result<(u32, usize)> {
        self.choose_death_depth(u, max_depth)
    }

    pub fn choose_move(&self, depth: u32, u: f64) -> Result<(i32, usize)> {
        self.choose_death(depth, u)
    }

    /// Same-depth, empty, parent-active slots a coefficient at
    /// `(depth, index)` could relocate to.
    #[must_use]
    pub fn move_available_siblings(&self, depth: u32, index: i32) -> Vec<i32> {
        let mut out = Vec::new();
        if !self.topology.supports_move() {
            return out;
        }
        let is_active = |k: i32| self.s_v.is_element(depth as i32, k);
        self.topology.sibling_candidates(depth, index, &is_active, &mut out);
        out
    }

    pub fn choose_move_sibling(&self, depth: u32, index: i32, u: f64) -> Result<i32> {
        let candidates = self.move_available_siblings(depth, index);
        if candidates.is_empty() {
            return Err(bad_arg(format!(
                "no move-sibling candidates for ({depth}, {index})"
            )));
        }
        let j = ((u * candidates.len() as f64) as usize).min(candidates.len() - 1);
        Ok(candidates[j])
    }

    pub fn reverse_choose_move_sibling(&self, depth: u32, index: i32) -> Result<f64> {
        let nvalid = self.move_available_siblings(depth, index).len();
        Ok(1.0 / (nvalid as f64 + 1.0))
    }

    // -- dense-array mapping ----------------------------------------

    /// Write the current coefficients into a dense buffer indexed by
    /// the domain's physical array index (length
    /// [`Topology::array_len`]). Delegates entirely to
    /// [`Topology::project_to_array`], which for the regular grids
    /// walks every depth rather than stopping at depth 1.
    pub fn map_to_array(&self, out: &mut [f64]) -> Result<()> {
        if out.len() != self.topology.array_len() {
            return Err(bad_arg("output buffer length does not match array_len"));
        }
        self.topology.project_to_array(&self.s_v, out)
    }

    /// Inverse of [`Self::map_to_array`] with no pruning threshold.
    pub fn map_from_array(&mut self, arr: &[f64]) -> Result<()> {
        self.create_from_array_with_threshold(arr, 0.0)
    }

    /// Rebuild the tree from a dense physical array: decompose it via
    /// [`Topology::decompose_array`] into a root mean and a set of
    /// `(depth, index, value)` coefficients already pruned to
    /// `threshold`, then attach each one as a birth (deepest depths
    /// first are not required — `decompose_array` emits an entry's
    /// ancestors before the entry itself for every topology in this
    /// workspace, so a straight forward iteration finds every parent
    /// already active).
    pub fn create_from_array_with_threshold(&mut self, arr: &[f64], threshold: f64) -> Result<()> {
        if arr.len() != self.topology.array_len() {
            return Err(bad_arg("input array length does not match array_len"));
        }
        let (mean, entries) = self.topology.decompose_array(arr, threshold);
        self.initialize(mean)?;
        for (depth, index, value) in entries {
            self.apply_birth(depth, index, value)?;
        }
        self.pending = false;
        Ok(())
    }

    // -- traversal ----------------------------------------------------

    /// Invoke `f(depth, index, value)` for every active coefficient,
    /// depth-major in ascending index order (matching the persisted
    /// layouts in `SPEC_FULL.md` §6).
    pub fn for_each_active(&self, mut f: impl FnMut(u32, i32, f64)) {
        for depth in 0..DEPTH_SIZE as u32 {
            let n = self.s_v.depth_count(depth as i32);
            for idx in 0..n {
                if let Ok((index, value)) = self.s_v.nth_element(depth as i32, idx) {
                    f(depth, index, value);
                }
            }
        }
    }

    /// Walk every active coefficient, folding a caller-supplied
    /// per-node ratio into a running product. The structural-prior
    /// math itself is a collaborator's responsibility (`SPEC_FULL.md`
    /// §4.2) — this only supplies the traversal shape.
    pub fn visit_tree(&self, mut f: impl FnMut(u32, i32, f64) -> f64) -> f64 {
        let mut acc = 1.0;
        self.for_each_active(|d, i, v| acc *= f(d, i, v));
        acc
    }

    /// Audit the six companion-set invariants of `SPEC_FULL.md` §3.3.
    #[must_use]
    pub fn valid(&self) -> bool {
        if !self.s_v.is_element(0, 0) {
            return false;
        }
        for depth in 1..DEPTH_SIZE as u32 {
            let nv = self.s_v.depth_count(depth as i32);
            for idx in 0..nv {
                let Ok((index, _)) = self.s_v.nth_element(depth as i32, idx) else {
                    return false;
                };
                if let Some((pd, pi)) = self.topology.parent(depth, index) {
                    if !self.s_v.is_element(pd as i32, pi) {
                        return false;
                    }
                } else {
                    return false;
                }
            }

            let nb = self.s_b.depth_count(depth as i32);
            for idx in 0..nb {
                let Ok(index) = self.s_b.nth_element(depth as i32, idx) else {
                    return false;
                };
                if self.s_v.is_element(depth as i32, index) || self.s_d.is_element(depth as i32, index) {
                    return false;
                }
                let parent_active = self
                    .topology
                    .parent(depth, index)
                    .is_some_and(|(pd, pi)| self.s_v.is_element(pd as i32, pi));
                if !parent_active {
                    return false;
                }
            }

            let nd = self.s_d.depth_count(depth as i32);
            for idx in 0..nd {
                let Ok(index) = self.s_d.nth_element(depth as i32, idx) else {
                    return false;
                };
                if !self.s_v.is_element(depth as i32, index) {
                    return false;
                }
                let mut kids = Vec::new();
                self.topology.children(depth, index, &mut kids);
                if kids.iter().any(|&c| self.s_v.is_element(depth as i32 + 1, c)) {
                    return false;
                }
            }
        }

        // Depth 0 (the synthetic root) is excluded: it is never a
        // member of S_d regardless of whether it currently has active
        // children, per the note on `readd_parent_to_sd_if_childless`.
        for depth in 1..DEPTH_SIZE as u32 {
            let nv = self.s_v.depth_count(depth as i32);
            for idx in 0..nv {
                let Ok((index, _)) = self.s_v.nth_element(depth as i32, idx) else {
                    return false;
                };
                let mut kids = Vec::new();
                self.topology.children(depth, index, &mut kids);
                let has_active_child = kids.iter().any(|&c| self.s_v.is_element(depth as i32 + 1, c));
                let is_leaf = !has_active_child;
                if is_leaf != self.s_d.is_element(depth as i32, index) {
                    return false;
                }
            }
        }
        if self.s_d.is_element(0, 0) {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::Rect2D;

    // A 2x2 grid (degree_max == 1): root is pixel (0,0), its three
    // other quadrants {1, 2, 3} are the only depth-1 nodes.
    fn tree() -> Wavetree<Rect2D> {
        Wavetree::new(Rect2D::new(1, 1), 0.0)
    }

    #[test]
    fn initialize_seeds_root_and_base_attachables() {
        let mut t = tree();
        t.initialize(1.5).unwrap();
        assert!(t.s_v().is_element(0, 0));
        assert_eq!(t.s_b().depth_count(1), 3); // root's TL quadrant is suppressed
        assert!(t.valid());
    }

    #[test]
    fn birth_then_commit_then_death_round_trips() {
        let mut t = tree();
        t.initialize(0.0).unwrap();
        t.propose_birth(1, 1, 3.0).unwrap();
        t.commit().unwrap();
        assert!(t.s_v().is_element(1, 1));
        assert!(t.s_d().is_element(1, 1));
        assert!(t.valid());

        t.propose_death(1, 1).unwrap();
        t.commit().unwrap();
        assert!(!t.s_v().is_element(1, 1));
        assert!(t.s_b().is_element(1, 1));
        assert!(t.valid());
    }

    #[test]
    fn birth_then_undo_restores_prior_state() {
        let mut t = tree();
        t.initialize(0.0).unwrap();
        t.propose_birth(1, 2, 9.0).unwrap();
        t.undo().unwrap();
        assert!(!t.s_v().is_element(1, 2));
        assert!(t.s_b().is_element(1, 2));
        assert!(t.valid());
    }

    #[test]
    fn value_propose_undo_restores_old_value() {
        let mut t = tree();
        t.initialize(2.0).unwrap();
        t.propose_value(0, 0, 5.0).unwrap();
        assert_eq!(t.s_v().get(0, 0).unwrap(), 5.0);
        t.undo().unwrap();
        assert_eq!(t.s_v().get(0, 0).unwrap(), 2.0);
    }

    #[test]
    fn map_to_array_and_back_round_trips_base_values() {
        let mut t = tree();
        t.initialize(0.0).unwrap();
        t.propose_birth(1, 1, 1.0).unwrap();
        t.commit().unwrap();
        t.propose_birth(1, 3, -2.0).unwrap();
        t.commit().unwrap();

        let mut arr = vec![0.0; 4];
        t.map_to_array(&mut arr).unwrap();
        assert_eq!(arr, vec![0.0, 1.0, 0.0, -2.0]);

        let mut t2 = tree();
        t2.map_from_array(&arr).unwrap();
        let mut round = vec![0.0; 4];
        t2.map_to_array(&mut round).unwrap();
        assert_eq!(round, arr);
    }

    #[test]
    fn commit_or_undo_without_pending_edit_fails() {
        let mut t = tree();
        t.initialize(0.0).unwrap();
        assert!(t.commit().is_err());
        assert!(t.undo().is_err());
    }

    #[test]
    fn move_relocates_value_between_siblings() {
        // Needs a second level of refinement, so use a 4x4 grid instead
        // of the 2x2 `tree()` helper.
        let mut t = Wavetree::new(Rect2D::new(2, 2), 0.0);
        t.initialize(0.0).unwrap();
        t.propose_birth(1, 1, 4.0).unwrap();
        t.commit().unwrap();
        t.propose_birth(2, 2, 1.0).unwrap();
        t.commit().unwrap();

        t.propose_move(2, 2, 3, 1.0).unwrap();
        t.commit().unwrap();
        assert!(!t.s_v().is_element(2, 2));
        assert!(t.s_v().is_element(2, 3));
        assert!(t.valid());
    }
}
