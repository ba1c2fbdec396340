//! Regular dyadic grid topologies, ported from `wavetree2d_sub.c` /
//! `wavetree3d_sub.c`.
//!
//! The index space spans the *entire* physical grid across *every*
//! depth, not just depth 1: a coefficient's index is a position in the
//! flat `width * height[ * depth]` grid (or, once a base tile exists,
//! one past that), and its tree depth is however many coordinate
//! halvings separate it from the grid origin. Two regimes:
//!
//! - **Symmetric degree** (`base_size == 1`, every axis has the same
//!   `degree_*`): index `0` doubles as both the physical cell `(0,0)`
//!   and the tree root. Every other index's parent is found by halving
//!   its coordinates; `degree_max` (== the shared per-axis degree) is
//!   the number of halvings needed to collapse any cell down to the
//!   origin.
//! - **Asymmetric degree** (`base_size > 1`): index `0` is a *synthetic*
//!   root with no physical cell of its own. Its children are the
//!   `base_width * base_height[ * base_depth]` cells of the coarsest
//!   common tile (row-major, offset by one past the root), and
//!   `degree_max` collapses to `degree_min + 1` — the source never
//!   refines an asymmetric grid past one further halving beyond the
//!   base tile.
//!
//! `TL`/`TR`/`BL`/`BR` (2D) and their 3D analogues double a node's
//! coordinates with an axis offset and re-encode; only the "all zero
//! offsets" slot is special-cased, since it self-loops to the node's
//! own coordinates at the root (the root has one fewer child than
//! every other node).

use crate::topology::Topology;

/// Dyadic quadtree over a `2^degree_width x 2^degree_height` grid.
#[derive(Debug, Clone)]
pub struct Rect2D {
    width: i32,
    height: i32,
    degree_min: u32,
    degree_max: u32,
    base_width: i32,
    base_height: i32,
    base_size: i32,
    base_indices: Vec<i32>,
}

impl Rect2D {
    /// Construct a new grid topology from its per-axis degrees (the
    /// grid is `2^degree_width` wide and `2^degree_height` tall).
    #[must_use]
    pub fn new(degree_width: u32, degree_height: u32) -> Self {
        let degree_min = degree_width.min(degree_height);
        let width = 1i32 << degree_width;
        let height = 1i32 << degree_height;
        let base_width = 1i32 << (degree_width - degree_min);
        let base_height = 1i32 << (degree_height - degree_min);
        let base_size = base_width * base_height;

        let (degree_max, base_indices) = if base_size == 1 {
            (degree_width.max(degree_height), vec![0])
        } else {
            let mut indices = Vec::with_capacity(base_size as usize);
            for j in 0..base_height {
                for i in 0..base_width {
                    indices.push(j * width + i + 1);
                }
            }
            (degree_min + 1, indices)
        };

        Self {
            width,
            height,
            degree_min,
            degree_max,
            base_width,
            base_height,
            base_size,
            base_indices,
        }
    }

    fn is_symmetric(&self) -> bool {
        self.base_size == 1
    }

    /// Row/column coordinates of `index`, accounting for the synthetic
    /// root's `+1` offset in the asymmetric regime.
    fn to_2d(&self, index: i32) -> (i32, i32) {
        let raw = if self.is_symmetric() { index } else { index - 1 };
        (raw % self.width, raw / self.width)
    }

    fn from_2d(&self, ii: i32, ij: i32) -> i32 {
        let raw = ij * self.width + ii;
        if self.is_symmetric() {
            raw
        } else {
            raw + 1
        }
    }

    fn in_bounds(&self, ii: i32, ij: i32) -> bool {
        ii >= 0 && ij >= 0 && ii < self.width && ij < self.height
    }

    fn tl(&self, index: i32) -> i32 {
        if index == 0 {
            return -1;
        }
        let (ii, ij) = self.to_2d(index);
        let (ni, nj) = (2 * ii, 2 * ij);
        if self.in_bounds(ni, nj) {
            self.from_2d(ni, nj)
        } else {
            -1
        }
    }

    fn tr(&self, index: i32) -> i32 {
        let (ii, ij) = self.to_2d(index);
        let (ni, nj) = (2 * ii + 1, 2 * ij);
        if self.in_bounds(ni, nj) {
            self.from_2d(ni, nj)
        } else {
            -1
        }
    }

    fn bl(&self, index: i32) -> i32 {
        let (ii, ij) = self.to_2d(index);
        let (ni, nj) = (2 * ii, 2 * ij + 1);
        if self.in_bounds(ni, nj) {
            self.from_2d(ni, nj)
        } else {
            -1
        }
    }

    fn br(&self, index: i32) -> i32 {
        let (ii, ij) = self.to_2d(index);
        let (ni, nj) = (2 * ii + 1, 2 * ij + 1);
        if self.in_bounds(ni, nj) {
            self.from_2d(ni, nj)
        } else {
            -1
        }
    }

    /// The four quadrant-child candidates of `index`, in `TL, TR, BL,
    /// BR` order, with `-1` marking an out-of-bounds or self-loop slot.
    /// Used directly by the Dyck-word walk, which needs to see the
    /// `-1` slots rather than the already-filtered [`Topology::children`] list.
    #[must_use]
    pub(crate) fn quadrants(&self, index: i32) -> [i32; 4] {
        [self.tl(index), self.tr(index), self.bl(index), self.br(index)]
    }

    /// Raw array value at `index` (offset by one past the root in the
    /// asymmetric regime, where the root owns no array slot).
    fn array_value(&self, arr: &[f64], index: i32) -> f64 {
        let slot = if self.is_symmetric() { index } else { index - 1 };
        arr[slot as usize]
    }

    fn array_slot(&self, index: i32) -> usize {
        (if self.is_symmetric() { index } else { index - 1 }) as usize
    }
}

impl Topology for Rect2D {
    fn base_size(&self) -> usize {
        self.base_size as usize
    }

    fn max_depth(&self) -> u32 {
        self.degree_max
    }

    fn array_len(&self) -> usize {
        (self.width * self.height) as usize
    }

    fn parent(&self, depth: u32, index: i32) -> Option<(u32, i32)> {
        if depth == 0 {
            return None;
        }
        if self.is_symmetric() {
            let (ii, ij) = self.to_2d(index);
            Some((depth - 1, self.from_2d(ii / 2, ij / 2)))
        } else if depth == 1 {
            Some((0, 0))
        } else {
            let (ii, ij) = self.to_2d(index);
            let (bi, bj) = (ii % self.base_width, ij % self.base_height);
            Some((depth - 1, self.from_2d(bi, bj)))
        }
    }

    fn children(&self, depth: u32, index: i32, out: &mut Vec<i32>) {
        out.clear();
        if depth >= self.degree_max {
            return;
        }
        if !self.is_symmetric() && depth == 0 {
            out.extend_from_slice(&self.base_indices);
            return;
        }
        for c in self.quadrants(index) {
            if c > 0 {
                out.push(c);
            }
        }
    }

    fn sibling_candidates(
        &self,
        depth: u32,
        index: i32,
        is_active: &dyn Fn(i32) -> bool,
        out: &mut Vec<i32>,
    ) {
        out.clear();
        if depth == 0 {
            return;
        }
        if let Some((pd, pi)) = self.parent(depth, index) {
            let mut sibs = Vec::new();
            self.children(pd, pi, &mut sibs);
            for s in sibs {
                if s != index && !is_active(s) {
                    out.push(s);
                }
            }
        }
    }

    fn supports_move(&self) -> bool {
        true
    }

    fn project_to_array(
        &self,
        s_v: &wavetree_core::OrderedMultisetIntDouble,
        out: &mut [f64],
    ) -> wavetree_core::Result<()> {
        if self.is_symmetric() {
            for depth in 0..wavetree_core::DEPTH_SIZE as u32 {
                let n = s_v.depth_count(depth as i32);
                for idx in 0..n {
                    let (index, value) = s_v.nth_element(depth as i32, idx)?;
                    out[self.array_slot(index)] = value;
                }
            }
        } else {
            let root = s_v
                .get(0, 0)
                .map_err(|_| wavetree_core::bad_arg("tree has not been initialised"))?;
            for &b in &self.base_indices {
                out[self.array_slot(b)] = root;
            }
            for depth in 1..wavetree_core::DEPTH_SIZE as u32 {
                let n = s_v.depth_count(depth as i32);
                for idx in 0..n {
                    let (index, value) = s_v.nth_element(depth as i32, idx)?;
                    if depth == 1 {
                        out[self.array_slot(index)] += value;
                    } else {
                        out[self.array_slot(index)] = value;
                    }
                }
            }
        }
        Ok(())
    }

    fn decompose_array(
        &self,
        arr: &[f64],
        threshold: f64,
    ) -> (f64, Vec<(u32, i32, f64)>) {
        let mean = if self.is_symmetric() {
            self.array_value(arr, 0)
        } else if arr.is_empty() {
            0.0
        } else {
            arr.iter().sum::<f64>() / arr.len() as f64
        };

        let mut entries = Vec::new();
        if self.is_symmetric() {
            let mut kids = Vec::new();
            self.children(0, 0, &mut kids);
            for k in kids {
                self.build_recursive(arr, 1, k, mean, &mut entries);
            }
        } else {
            let mut kids = Vec::new();
            self.children(0, 0, &mut kids);
            for k in kids {
                self.build_recursive(arr, 1, k, mean, &mut entries);
            }
        }

        if threshold > 0.0 {
            self.prune(&mut entries, threshold);
        }
        (mean, entries)
    }
}

impl Rect2D {
    /// Unconditionally populate every coefficient from depth `depth`
    /// down to `degree_max`, mirroring
    /// `r_wavetree2d_sub_create_from_array_children`: every node's raw
    /// array value, except the asymmetric regime's depth-1 nodes which
    /// carry the DC-subtracted value once (the one explicit mean
    /// subtraction the source performs).
    fn build_recursive(
        &self,
        arr: &[f64],
        depth: u32,
        index: i32,
        mean: f64,
        out: &mut Vec<(u32, i32, f64)>,
    ) {
        let raw = self.array_value(arr, index);
        let value = if depth == 1 && !self.is_symmetric() {
            raw - mean
        } else {
            raw
        };
        out.push((depth, index, value));
        if depth >= self.degree_max {
            return;
        }
        let mut kids = Vec::new();
        self.children(depth, index, &mut kids);
        for k in kids {
            self.build_recursive(arr, depth + 1, k, mean, out);
        }
    }

    /// Bottom-up threshold prune: for `d` from `degree_max` down to 2
    /// (depth 1 is never pruned), drop any node whose magnitude is
    /// below `threshold` and that has no surviving child, matching
    /// `create_from_array_with_threshold`'s single descending pass (a
    /// parent made childless by this pass can itself be dropped in the
    /// same pass, one depth shallower).
    fn prune(&self, entries: &mut Vec<(u32, i32, f64)>, threshold: f64) {
        use std::collections::HashSet;
        let mut present: HashSet<(u32, i32)> =
            entries.iter().map(|&(d, i, _)| (d, i)).collect();

        let mut d = self.degree_max;
        while d > 1 {
            let at_depth: Vec<(i32, f64)> = entries
                .iter()
                .filter(|&&(dd, _, _)| dd == d)
                .map(|&(_, i, v)| (i, v))
                .collect();
            for (index, value) in at_depth {
                if value.abs() >= threshold {
                    continue;
                }
                let mut kids = Vec::new();
                self.children(d, index, &mut kids);
                let has_child = kids.iter().any(|&k| present.contains(&(d + 1, k)));
                if !has_child {
                    present.remove(&(d, index));
                }
            }
            d -= 1;
        }
        entries.retain(|&(d, i, _)| present.contains(&(d, i)));
    }
}

/// Dyadic octree over a `2^degree_width x 2^degree_height x 2^degree_depth` grid.
#[derive(Debug, Clone)]
pub struct Rect3D {
    width: i32,
    height: i32,
    depth_extent: i32,
    degree_min: u32,
    degree_max: u32,
    base_width: i32,
    base_height: i32,
    base_depth: i32,
    base_size: i32,
    base_indices: Vec<i32>,
}

impl Rect3D {
    /// Construct a new grid topology from its per-axis degrees.
    #[must_use]
    pub fn new(degree_width: u32, degree_height: u32, degree_depth: u32) -> Self {
        let degree_min = degree_width.min(degree_height).min(degree_depth);
        let width = 1i32 << degree_width;
        let height = 1i32 << degree_height;
        let depth_extent = 1i32 << degree_depth;
        let base_width = 1i32 << (degree_width - degree_min);
        let base_height = 1i32 << (degree_height - degree_min);
        let base_depth = 1i32 << (degree_depth - degree_min);
        let base_size = base_width * base_height * base_depth;

        let (degree_max, base_indices) = if base_size == 1 {
            (degree_width.max(degree_height).max(degree_depth), vec![0])
        } else {
            let mut indices = Vec::with_capacity(base_size as usize);
            for k in 0..base_depth {
                for j in 0..base_height {
                    for i in 0..base_width {
                        indices.push((k * height + j) * width + i + 1);
                    }
                }
            }
            (degree_min + 1, indices)
        };

        Self {
            width,
            height,
            depth_extent,
            degree_min,
            degree_max,
            base_width,
            base_height,
            base_depth,
            base_size,
            base_indices,
        }
    }

    fn is_symmetric(&self) -> bool {
        self.base_size == 1
    }

    fn to_3d(&self, index: i32) -> (i32, i32, i32) {
        let raw = if self.is_symmetric() { index } else { index - 1 };
        let plane = self.width * self.height;
        let k = raw / plane;
        let rem = raw % plane;
        (rem % self.width, rem / self.width, k)
    }

    fn from_3d(&self, ii: i32, ij: i32, ik: i32) -> i32 {
        let raw = (ik * self.height + ij) * self.width + ii;
        if self.is_symmetric() {
            raw
        } else {
            raw + 1
        }
    }

    fn in_bounds(&self, ii: i32, ij: i32, ik: i32) -> bool {
        ii >= 0
            && ij >= 0
            && ik >= 0
            && ii < self.width
            && ij < self.height
            && ik < self.depth_extent
    }

    /// The eight octant-child candidates of `index`, `-1` marking an
    /// out-of-bounds or self-loop slot. Offset `0` in every axis is the
    /// root's self-loop, mirroring 2D's `TL`.
    pub(crate) fn octants(&self, index: i32) -> [i32; 8] {
        let (ii, ij, ik) = self.to_3d(index);
        let mut out = [-1; 8];
        for (slot, &(dx, dy, dz)) in [
            (0, 0, 0),
            (1, 0, 0),
            (0, 1, 0),
            (1, 1, 0),
            (0, 0, 1),
            (1, 0, 1),
            (0, 1, 1),
            (1, 1, 1),
        ]
        .iter()
        .enumerate()
        {
            if slot == 0 && index == 0 {
                continue;
            }
            let (ni, nj, nk) = (2 * ii + dx, 2 * ij + dy, 2 * ik + dz);
            if self.in_bounds(ni, nj, nk) {
                out[slot] = self.from_3d(ni, nj, nk);
            }
        }
        out
    }

    fn array_value(&self, arr: &[f64], index: i32) -> f64 {
        arr[self.array_slot(index)]
    }

    fn array_slot(&self, index: i32) -> usize {
        (if self.is_symmetric() { index } else { index - 1 }) as usize
    }

    fn build_recursive(
        &self,
        arr: &[f64],
        depth: u32,
        index: i32,
        mean: f64,
        out: &mut Vec<(u32, i32, f64)>,
    ) {
        let raw = self.array_value(arr, index);
        let value = if depth == 1 && !self.is_symmetric() {
            raw - mean
        } else {
            raw
        };
        out.push((depth, index, value));
        if depth >= self.degree_max {
            return;
        }
        let mut kids = Vec::new();
        self.children(depth, index, &mut kids);
        for k in kids {
            self.build_recursive(arr, depth + 1, k, mean, out);
        }
    }

    fn prune(&self, entries: &mut Vec<(u32, i32, f64)>, threshold: f64) {
        use std::collections::HashSet;
        let mut present: HashSet<(u32, i32)> =
            entries.iter().map(|&(d, i, _)| (d, i)).collect();

        let mut d = self.degree_max;
        while d > 1 {
            let at_depth: Vec<(i32, f64)> = entries
                .iter()
                .filter(|&&(dd, _, _)| dd == d)
                .map(|&(_, i, v)| (i, v))
                .collect();
            for (index, value) in at_depth {
                if value.abs() >= threshold {
                    continue;
                }
                let mut kids = Vec::new();
                self.children(d, index, &mut kids);
                let has_child = kids.iter().any(|&k| present.contains(&(d + 1, k)));
                if !has_child {
                    present.remove(&(d, index));
                }
            }
            d -= 1;
        }
        entries.retain(|&(d, i, _)| present.contains(&(d, i)));
    }
}

impl Topology for Rect3D {
    fn base_size(&self) -> usize {
        self.base_size as usize
    }

    fn max_depth(&self) -> u32 {
        self.degree_max
    }

    fn array_len(&self) -> usize {
        (self.width * self.height * self.depth_extent) as usize
    }

    fn parent(&self, depth: u32, index: i32) -> Option<(u32, i32)> {
        if depth == 0 {
            return None;
        }
        if self.is_symmetric() {
            let (ii, ij, ik) = self.to_3d(index);
            Some((depth - 1, self.from_3d(ii / 2, ij / 2, ik / 2)))
        } else if depth == 1 {
            Some((0, 0))
        } else {
            let (ii, ij, ik) = self.to_3d(index);
            let (bi, bj, bk) = (
                ii % self.base_width,
                ij % self.base_height,
                ik % self.base_depth,
            );
            Some((depth - 1, self.from_3d(bi, bj, bk)))
        }
    }

    fn children(&self, depth: u32, index: i32, out: &mut Vec<i32>) {
        out.clear();
        if depth >= self.degree_max {
            return;
        }
        if !self.is_symmetric() && depth == 0 {
            out.extend_from_slice(&self.base_indices);
            return;
        }
        for c in self.octants(index) {
            if c > 0 {
                out.push(c);
            }
        }
    }

    fn sibling_candidates(
        &self,
        depth: u32,
        index: i32,
        is_active: &dyn Fn(i32) -> bool,
        out: &mut Vec<i32>,
    ) {
        out.clear();
        if depth == 0 {
            return;
        }
        if let Some((pd, pi)) = self.parent(depth, index) {
            let mut sibs = Vec::new();
            self.children(pd, pi, &mut sibs);
            for s in sibs {
                if s != index && !is_active(s) {
                    out.push(s);
                }
            }
        }
    }

    fn supports_move(&self) -> bool {
        true
    }

    fn project_to_array(
        &self,
        s_v: &wavetree_core::OrderedMultisetIntDouble,
        out: &mut [f64],
    ) -> wavetree_core::Result<()> {
        if self.is_symmetric() {
            for depth in 0..wavetree_core::DEPTH_SIZE as u32 {
                let n = s_v.depth_count(depth as i32);
                for idx in 0..n {
                    let (index, value) = s_v.nth_element(depth as i32, idx)?;
                    out[self.array_slot(index)] = value;
                }
            }
        } else {
            let root = s_v
                .get(0, 0)
                .map_err(|_| wavetree_core::bad_arg("tree has not been initialised"))?;
            for &b in &self.base_indices {
                out[self.array_slot(b)] = root;
            }
            for depth in 1..wavetree_core::DEPTH_SIZE as u32 {
                let n = s_v.depth_count(depth as i32);
                for idx in 0..n {
                    let (index, value) = s_v.nth_element(depth as i32, idx)?;
                    if depth == 1 {
                        out[self.array_slot(index)] += value;
                    } else {
                        out[self.array_slot(index)] = value;
                    }
                }
            }
        }
        Ok(())
    }

    fn decompose_array(&self, arr: &[f64], threshold: f64) -> (f64, Vec<(u32, i32, f64)>) {
        let mean = if self.is_symmetric() {
            self.array_value(arr, 0)
        } else if arr.is_empty() {
            0.0
        } else {
            arr.iter().sum::<f64>() / arr.len() as f64
        };

        let mut entries = Vec::new();
        let mut kids = Vec::new();
        self.children(0, 0, &mut kids);
        for k in kids {
            self.build_recursive(arr, 1, k, mean, &mut entries);
        }

        if threshold > 0.0 {
            self.prune(&mut entries, threshold);
        }
        (mean, entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_parent_child_roundtrip() {
        // degree_width = degree_height = 2 -> 4x4 grid, root is pixel (0,0).
        let t = Rect2D::new(2, 2);
        assert_eq!(t.base_size(), 1);
        assert_eq!(t.max_depth(), 2);
        assert_eq!(t.array_len(), 16);

        let mut kids = Vec::new();
        t.children(0, 0, &mut kids);
        assert_eq!(kids, vec![1, 4, 5]); // TL(0) is suppressed

        for &k in &kids {
            assert_eq!(t.parent(1, k), Some((0, 0)));
        }
    }

    #[test]
    fn asymmetric_base_tile_is_roots_children() {
        // degree_width=2 (width 4), degree_height=1 (height 2):
        // base_width=2, base_height=1, base_size=2.
        let t = Rect2D::new(2, 1);
        assert_eq!(t.base_size(), 2);
        assert_eq!(t.max_depth(), 2); // degree_min(1) + 1
        assert_eq!(t.array_len(), 8);

        let mut kids = Vec::new();
        t.children(0, 0, &mut kids);
        assert_eq!(kids, vec![1, 2]);
        for &k in &kids {
            assert_eq!(t.parent(1, k), Some((0, 0)));
        }
    }

    #[test]
    fn image_mapping_is_sparse_and_does_not_fill_the_buffer() {
        // The literal "Rect2D image mapping" scenario: 16x16 grid,
        // dc=1.0, birth 0.5 at depth 1 index 1, birth 0.25 at depth 1
        // index 16 (= width). Only those three cells are nonzero.
        use crate::tree::Wavetree;
        let t = Rect2D::new(4, 4);
        let mut tree = Wavetree::new(t, 0.0);
        tree.initialize(1.0).unwrap();
        tree.propose_birth(1, 1, 0.5).unwrap();
        tree.commit().unwrap();
        tree.propose_birth(1, 16, 0.25).unwrap();
        tree.commit().unwrap();

        let mut arr = vec![0.0; 256];
        tree.map_to_array(&mut arr).unwrap();
        for (i, &v) in arr.iter().enumerate() {
            match i {
                0 => assert_eq!(v, 1.0),
                1 => assert_eq!(v, 0.5),
                16 => assert_eq!(v, 0.25),
                _ => assert_eq!(v, 0.0, "cell {i} should be untouched"),
            }
        }
    }
}
