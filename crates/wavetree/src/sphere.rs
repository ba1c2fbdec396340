//! Spherical-manifold topologies (`wavetreesphereface2d.h`,
//! `wavetreesphereface3d.h`, `wavetreesphere3d.h`), built directly on
//! top of `wavetree_manifold::SphericalManifold`'s own parent/child
//! bookkeeping rather than re-deriving it.
//!
//! Wavetree depth is always manifold depth + 1 (wavetree depth 1 holds
//! the 20 base triangles / 12 base vertices at manifold depth 0); depth
//! 0 stays the synthetic root shared with the other topologies.
//!
//! The two "3D" variants stack `nshells` independent copies of the
//! lateral (2D) tree — `index = shell * lateral_count_at(depth) +
//! lateral_index` — rather than giving shells their own tree depth.
//! The radial wavelet transform across shells
//! (`wavetree_manifold::transform::{shell_forward, shell_inverse}`)
//! operates on the dense `map_to_array` output directly, so the tree
//! itself only needs to track lateral refinement per shell. This is a
//! deliberate narrowing versus a fully combined radial x lateral tree,
//! recorded in `DESIGN.md`.

use wavetree_manifold::{nvertices_at_depth, ntriangles_at_depth, SphericalManifold};

use crate::topology::Topology;

const BASE_TRIANGLES: usize = 20;
const BASE_VERTICES: usize = 12;

/// Lateral quadtree of triangular faces over a subdivided icosahedron.
pub struct Sphere2DFace {
    manifold: SphericalManifold,
}

impl Sphere2DFace {
    /// Wrap an already-built manifold.
    #[must_use]
    pub const fn new(manifold: SphericalManifold) -> Self {
        Self { manifold }
    }

    #[must_use]
    pub const fn manifold(&self) -> &SphericalManifold {
        &self.manifold
    }

    fn lateral_count_at(&self, depth: u32) -> usize {
        ntriangles_at_depth(depth - 1)
    }
}

impl Topology for Sphere2DFace {
    fn base_size(&self) -> usize {
        BASE_TRIANGLES
    }

    fn max_depth(&self) -> u32 {
        self.manifold.degree() + 1
    }

    fn parent(&self, depth: u32, index: i32) -> Option<(u32, i32)> {
        match depth {
            0 => None,
            1 => Some((0, 0)),
            _ => {
                let manifold_depth = depth - 1;
                let tri = &self.manifold.triangles_at(manifold_depth)[index as usize];
                Some((depth - 1, tri.parent))
            }
        }
    }

    fn children(&self, depth: u32, index: i32, out: &mut Vec<i32>) {
        out.clear();
        if depth == 0 {
            out.extend(0..self.base_size() as i32);
            return;
        }
        let manifold_depth = depth - 1;
        if manifold_depth >= self.manifold.degree() {
            return;
        }
        let tri = &self.manifold.triangles_at(manifold_depth)[index as usize];
        out.extend(tri.child_triangles.iter().copied().filter(|&c| c >= 0));
    }
}

/// Lateral butterfly-wavelet tree over manifold vertices.
pub struct Sphere2DVertex {
    manifold: SphericalManifold,
}

impl Sphere2DVertex {
    /// Wrap an already-built manifold.
    #[must_use]
    pub const fn new(manifold: SphericalManifold) -> Self {
        Self { manifold }
    }

    #[must_use]
    pub const fn manifold(&self) -> &SphericalManifold {
        &self.manifold
    }

    fn prior_count(manifold_depth: i64) -> usize {
        if manifold_depth < 0 {
            0
        } else {
            nvertices_at_depth(manifold_depth as u32)
        }
    }

    fn global_index(&self, depth: u32, index: i32) -> usize {
        let manifold_depth = depth as i64 - 1;
        Self::prior_count(manifold_depth - 1) + index as usize
    }

    fn wavetree_coords_of(&self, global: usize) -> (u32, i32) {
        let vtx_depth = self.manifold.vertices()[global].depth;
        let offset = Self::prior_count(vtx_depth as i64 - 1);
        (vtx_depth + 1, (global - offset) as i32)
    }
}

impl Topology for Sphere2DVertex {
    fn base_size(&self) -> usize {
        BASE_VERTICES
    }

    fn max_depth(&self) -> u32 {
        self.manifold.degree() + 1
    }

    fn parent(&self, depth: u32, index: i32) -> Option<(u32, i32)> {
        match depth {
            0 => None,
            1 => Some((0, 0)),
            _ => {
                let global = self.global_index(depth, index);
                let parent_global = self.manifold.vertices()[global].parent;
                if parent_global < 0 {
                    Some((0, 0))
                } else {
                    Some(self.wavetree_coords_of(parent_global as usize))
                }
            }
        }
    }

    fn children(&self, depth: u32, index: i32, out: &mut Vec<i32>) {
        out.clear();
        if depth == 0 {
            out.extend(0..self.base_size() as i32);
            return;
        }
        let global = self.global_index(depth, index);
        for &child in &self.manifold.vertices()[global].children {
            if child >= 0 {
                let (_, ci) = self.wavetree_coords_of(child as usize);
                out.push(ci);
            }
        }
    }
}

/// `nshells` independent copies of [`Sphere2DFace`], one per radial shell.
pub struct Sphere3DFace {
    lateral: Sphere2DFace,
    nshells: u32,
}

impl Sphere3DFace {
    /// Construct from an already-built manifold and a shell count.
    #[must_use]
    pub const fn new(manifold: SphericalManifold, nshells: u32) -> Self {
        Self {
            lateral: Sphere2DFace::new(manifold),
            nshells,
        }
    }

    #[must_use]
    pub const fn nshells(&self) -> u32 {
        self.nshells
    }
}

impl Topology for Sphere3DFace {
    fn base_size(&self) -> usize {
        self.nshells as usize * self.lateral.base_size()
    }

    fn max_depth(&self) -> u32 {
        self.lateral.max_depth()
    }

    fn parent(&self, depth: u32, index: i32) -> Option<(u32, i32)> {
        if depth == 0 {
            return None;
        }
        let count = self.lateral.lateral_count_at(depth) as i32;
        let shell = index / count;
        let lateral = index % count;
        if depth == 1 {
            return Some((0, 0));
        }
        let (pd, pl) = self.lateral.parent(depth, lateral)?;
        let pcount = self.lateral.lateral_count_at(pd) as i32;
        Some((pd, shell * pcount + pl))
    }

    fn children(&self, depth: u32, index: i32, out: &mut Vec<i32>) {
        out.clear();
        if depth == 0 {
            out.extend(0..self.base_size() as i32);
            return;
        }
        let count = self.lateral.lateral_count_at(depth) as i32;
        let shell = index / count;
        let lateral = index % count;
        let mut lateral_kids = Vec::new();
        self.lateral.children(depth, lateral, &mut lateral_kids);
        if lateral_kids.is_empty() {
            return;
        }
        let ccount = self.lateral.lateral_count_at(depth + 1) as i32;
        out.extend(lateral_kids.into_iter().map(|c| shell * ccount + c));
    }
}

/// `nshells` independent copies of [`Sphere2DVertex`], one per radial shell.
pub struct Sphere3DVertex {
    lateral: Sphere2DVertex,
    nshells: u32,
}

impl Sphere3DVertex {
    /// Construct from an already-built manifold and a shell count.
    #[must_use]
    pub const fn new(manifold: SphericalManifold, nshells: u32) -> Self {
        Self {
            lateral: Sphere2DVertex::new(manifold),
            nshells,
        }
    }

    #[must_use]
    pub const fn nshells(&self) -> u32 {
        self.nshells
    }

    fn lateral_count_at(&self, depth: u32) -> usize {
        let manifold_depth = depth as i64 - 1;
        Sphere2DVertex::prior_count(manifold_depth) - Sphere2DVertex::prior_count(manifold_depth - 1)
    }
}

impl Topology for Sphere3DVertex {
    fn base_size(&self) -> usize {
        self.nshells as usize * self.lateral.base_size()
    }

    fn max_depth(&self) -> u32 {
        self.lateral.max_depth()
    }

    fn parent(&self, depth: u32, index: i32) -> Option<(u32, i32)> {
        if depth == 0 {
            return None;
        }
        let count = self.lateral_count_at(depth) as i32;
        let shell = index / count;
        let lateral = index % count;
        if depth == 1 {
            return Some((0, 0));
        }
        let (pd, pl) = self.lateral.parent(depth, lateral)?;
        if pd == 0 {
            return Some((0, 0));
        }
        let pcount = self.lateral_count_at(pd) as i32;
        Some((pd, shell * pcount + pl))
    }

    fn children(&self, depth: u32, index: i32, out: &mut Vec<i32>) {
        out.clear();
        if depth == 0 {
            out.extend(0..self.base_size() as i32);
            return;
        }
        let count = self.lateral_count_at(depth) as i32;
        let shell = index / count;
        let lateral = index % count;
        let mut lateral_kids = Vec::new();
        self.lateral.children(depth, lateral, &mut lateral_kids);
        if lateral_kids.is_empty() {
            return;
        }
        let ccount = self.lateral_count_at(depth + 1) as i32;
        out.extend(lateral_kids.into_iter().map(|c| shell * ccount + c));
    }
}
