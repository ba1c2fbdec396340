//! The `Topology` trait: the one seam across which `Wavetree<T>`
//! generalises over the five domain variants (`wavetree2d_sub.h`,
//! `wavetree3d_sub.h`, `wavetreesphereface2d.h`,
//! `wavetreesphereface3d.h`, `wavetreesphere3d.h`).
//!
//! A wavetree index is always a `(depth, index)` pair. Depth 0 is a
//! single synthetic root; its children (depth 1) are the domain's
//! coarsest base cells, one-to-one with `Topology::base_size()`. For
//! the sphere variants every depth beyond 1 is further
//! manifold-subdivision refinement *within* a base cell's subtree, so
//! the physical array index a coefficient maps to is always its
//! depth-1 ancestor. The regular dyadic grids (`Rect2D`/`Rect3D`)
//! instead address the *entire* grid across every depth via
//! coordinate halving and override [`Topology::array_len`],
//! [`Topology::project_to_array`] and [`Topology::decompose_array`]
//! accordingly — see `rect.rs`.

use wavetree_core::{OrderedMultisetIntDouble, Result, DEPTH_SIZE};

/// Domain geometry contract shared by every wavetree variant.
pub trait Topology {
    /// Number of coarsest base cells == the number of depth-1 nodes.
    fn base_size(&self) -> usize;

    /// Maximum depth a node may be created at.
    fn max_depth(&self) -> u32;

    /// Length of the dense array [`Topology::project_to_array`]
    /// produces / [`Topology::decompose_array`] consumes. Defaults to
    /// [`Topology::base_size`], correct for every topology where a
    /// physical cell and a depth-1 node coincide (every variant but
    /// the regular grids).
    fn array_len(&self) -> usize {
        self.base_size()
    }

    /// Parent of `(depth, index)`, or `None` for the root `(0, 0)`.
    fn parent(&self, depth: u32, index: i32) -> Option<(u32, i32)>;

    /// Append the children of `(depth, index)` to `out` (not cleared
    /// by this call; callers clear first).
    fn children(&self, depth: u32, index: i32, out: &mut Vec<i32>);

    /// Whether `propose_move`/`choose_move_*` are supported. Sphere
    /// variants return `false` (third Open Question resolution).
    fn supports_move(&self) -> bool {
        false
    }

    /// Same-depth sibling candidates for a `move` proposal at
    /// `(depth, index)`: slots whose parent is active (checked via
    /// `is_active`) and that are not themselves active. Empty default
    /// for topologies that don't support `move`.
    fn sibling_candidates(
        &self,
        depth: u32,
        index: i32,
        is_active: &dyn Fn(i32) -> bool,
        out: &mut Vec<i32>,
    ) {
        let _ = (depth, index, is_active);
        out.clear();
    }

    /// Depth-1 ancestor of `(depth, index)` — the physical base-cell
    /// slot its value contributes to in `map_to_array`. `(0, 0)` has no
    /// ancestor and is not a valid input.
    fn base_cell_of(&self, depth: u32, index: i32) -> i32 {
        let mut d = depth;
        let mut i = index;
        while d > 1 {
            let (pd, pi) = self
                .parent(d, i)
                .expect("non-root node must have a parent");
            d = pd;
            i = pi;
        }
        i
    }

    /// Write every active coefficient in `s_v` into the dense array
    /// `out` (length [`Topology::array_len`]). Default: the root value
    /// fills every base-cell slot, depth-1 values add on top of it,
    /// and anything deeper overwrites — correct wherever a depth-1
    /// node addresses a whole, disjoint physical cell.
    fn project_to_array(&self, s_v: &OrderedMultisetIntDouble, out: &mut [f64]) -> Result<()> {
        let root = s_v
            .get(0, 0)
            .map_err(|_| wavetree_core::bad_arg("tree has not been initialised"))?;
        out.fill(root);
        for depth in 1..DEPTH_SIZE as u32 {
            let n = s_v.depth_count(depth as i32);
            for idx in 0..n {
                let (index, value) = s_v.nth_element(depth as i32, idx)?;
                let base = self.base_cell_of(depth, index) as usize;
                if depth == 1 {
                    out[base] = root + value;
                } else {
                    out[base] = value;
                }
            }
        }
        Ok(())
    }

    /// Inverse of [`Topology::project_to_array`]: split `arr` into a
    /// root mean and depth-1 `(index, value)` entries with the mean
    /// subtracted, dropping any entry whose magnitude is below
    /// `threshold`. Default: depth-1 only, matching the
    /// root-fill-then-additive-overlay default above.
    fn decompose_array(&self, arr: &[f64], threshold: f64) -> (f64, Vec<(u32, i32, f64)>) {
        let mean = if arr.is_empty() {
            0.0
        } else {
            arr.iter().sum::<f64>() / arr.len() as f64
        };
        let entries = arr
            .iter()
            .enumerate()
            .map(|(i, &v)| (1u32, i as i32, v - mean))
            .filter(|&(_, _, v)| threshold <= 0.0 || v.abs() >= threshold)
            .collect();
        (mean, entries)
    }
}
