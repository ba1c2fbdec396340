//! Recursively subdivided icosahedral manifold.
//!
//! Vertices are indexed globally across all depths (depth `d`'s vertices
//! occupy `[nvertices_at_depth(d-1), nvertices_at_depth(d))`); edges and
//! triangles are indexed per depth, matching the source's `manifold_t`
//! layout (`manifold.h`/`manifold.c`). Subdivision proceeds in two
//! passes per depth: split every parent edge to create the new
//! mid-edge vertices and their two child edges, then split every
//! parent triangle into four children using those child edges.

use crate::geometry::{determinant, Vec3};
use wavetree_core::{bad_arg, format_error, Result};

use serde::{Deserialize, Serialize};

/// A vertex on the subdivided sphere.
///
/// `v`, `f`, and `e` mirror the source's `vertex3_t`: `v` are the two
/// parent-edge endpoints this vertex bisects, `f` are the two
/// "opposite" vertices of the triangles either side of that parent
/// edge, and `e` are the four vertices one further step out, used by
/// the butterfly wavelet stencils. All are `-1` (unset) for base
/// vertices (depth 0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    /// Position on the unit sphere.
    pub pos: Vec3,
    /// Subdivision depth this vertex was created at.
    pub depth: u32,
    /// Parent vertex index, or `-1` for a base vertex.
    pub parent: i32,
    /// Up to 4 child vertex indices (`-1` if absent).
    pub children: [i32; 4],
    /// The two parent-edge endpoints this vertex bisects.
    pub v: [i32; 2],
    /// The two "opposite" vertices of the two triangles flanking the
    /// parent edge.
    pub f: [i32; 2],
    /// The four second-ring vertices used by butterfly stencils.
    pub e: [i32; 4],
    /// Up to 6 neighbours, populated only at the finest depth.
    pub neighbors: [i32; 6],
    /// Voronoi-style area weight, populated by [`SphericalManifold::new`].
    pub area: f64,
}

impl Vertex {
    fn new(pos: Vec3, depth: u32) -> Self {
        Self {
            pos,
            depth,
            parent: -1,
            children: [-1; 4],
            v: [-1; 2],
            f: [-1; 2],
            e: [-1; 4],
            neighbors: [-1; 6],
            area: 0.0,
        }
    }

    fn add_child(&mut self, ci: i32) -> Result<()> {
        for slot in &mut self.children {
            if *slot < 0 {
                *slot = ci;
                return Ok(());
            }
        }
        Err(format_error("vertex already has 4 children"))
    }

    fn add_neighbor(&mut self, ni: i32) -> Result<()> {
        for slot in &mut self.neighbors {
            if *slot < 0 {
                *slot = ni;
                return Ok(());
            }
        }
        Err(format_error("vertex already has 6 neighbours"))
    }
}

/// An edge at a single subdivision depth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Edge {
    /// Endpoint vertex indices.
    pub a: i32,
    /// Endpoint vertex indices.
    pub b: i32,
    /// Parent edge index at `depth - 1`, or `-1` at depth 0.
    pub parent: i32,
    /// The two child edges at `depth + 1`.
    pub child_edges: [i32; 2],
    /// The (up to two) triangles incident to this edge.
    pub triangles: [i32; 2],
}

impl Edge {
    fn new(a: i32, b: i32) -> Self {
        Self {
            a,
            b,
            parent: -1,
            child_edges: [-1, -1],
            triangles: [-1, -1],
        }
    }

    fn add_triangle(&mut self, ti: i32) -> Result<()> {
        if self.triangles[0] < 0 {
            self.triangles[0] = ti;
        } else if self.triangles[1] < 0 {
            self.triangles[1] = ti;
        } else {
            return Err(format_error("edge already has 2 triangles"));
        }
        Ok(())
    }
}

/// A triangular face at a single subdivision depth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Triangle {
    /// Vertex indices, counter-clockwise.
    pub a: i32,
    /// Vertex indices, counter-clockwise.
    pub b: i32,
    /// Vertex indices, counter-clockwise.
    pub c: i32,
    /// Edge indices opposite `c`, `a`, `b` respectively.
    pub ab: i32,
    /// Edge indices opposite `c`, `a`, `b` respectively.
    pub bc: i32,
    /// Edge indices opposite `c`, `a`, `b` respectively.
    pub ca: i32,
    /// Parent triangle index at `depth - 1`, or `-1` at depth 0.
    pub parent: i32,
    /// The four child triangles at `depth + 1`.
    pub child_triangles: [i32; 4],
    /// Surface area, populated by [`SphericalManifold::new`].
    pub area: f64,
}

impl Triangle {
    fn new(a: i32, b: i32, c: i32, ab: i32, bc: i32, ca: i32) -> Self {
        Self {
            a,
            b,
            c,
            ab,
            bc,
            ca,
            parent: -1,
            child_triangles: [-1; 4],
            area: 0.0,
        }
    }
}

/// Closed-form vertex/edge/triangle counts at a given depth, matching
/// `icosahedron_nvertices`/`_nedges`/`_ntriangles`.
#[must_use]
pub fn nvertices_at_depth(depth: u32) -> usize {
    10 * (1usize << (2 * depth)) + 2
}

/// See [`nvertices_at_depth`].
#[must_use]
pub fn nedges_at_depth(depth: u32) -> usize {
    30 * (1usize << (2 * depth))
}

/// See [`nvertices_at_depth`].
#[must_use]
pub fn ntriangles_at_depth(depth: u32) -> usize {
    10 * (1usize << (2 * depth + 1))
}

/// A recursively subdivided icosahedron, built once to `degree` and
/// immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SphericalManifold {
    degree: u32,
    /// Flat, global vertex index across all depths.
    vertices: Vec<Vertex>,
    /// `edges[depth][i]`.
    edges: Vec<Vec<Edge>>,
    /// `triangles[depth][i]`.
    triangles: Vec<Vec<Triangle>>,
}

/// `(va, vb)` for each of the 30 base edges, `icosahedron.c`'s literal
/// edge table.
const BASE_EDGES: [(i32, i32); 30] = [
    (2, 0),
    (2, 3),
    (2, 8),
    (3, 0),
    (3, 4),
    (3, 9),
    (4, 0),
    (4, 5),
    (4, 10),
    (5, 0),
    (5, 6),
    (5, 11),
    (6, 0),
    (6, 2),
    (6, 7),
    (7, 2),
    (7, 8),
    (7, 1),
    (8, 3),
    (8, 9),
    (8, 1),
    (9, 4),
    (9, 10),
    (9, 1),
    (10, 5),
    (10, 11),
    (10, 1),
    (11, 6),
    (11, 7),
    (11, 1),
];

/// `(va, vb, vc, eab, ebc, eca)` for each of the 20 base triangles.
const BASE_TRIANGLES: [(i32, i32, i32, i32, i32, i32); 20] = [
    (0, 3, 2, 3, 1, 0),
    (8, 2, 3, 2, 1, 18),
    (0, 4, 3, 6, 4, 3),
    (9, 3, 4, 5, 4, 21),
    (0, 5, 4, 9, 7, 6),
    (10, 4, 5, 8, 7, 24),
    (0, 6, 5, 12, 10, 9),
    (11, 5, 6, 11, 10, 27),
    (0, 2, 6, 0, 13, 12),
    (7, 6, 2, 14, 13, 15),
    (2, 8, 7, 2, 16, 15),
    (1, 7, 8, 17, 16, 20),
    (3, 9, 8, 5, 19, 18),
    (1, 8, 9, 20, 19, 23),
    (4, 10, 9, 8, 22, 21),
    (1, 9, 10, 23, 22, 26),
    (5, 11, 10, 11, 25, 24),
    (1, 10, 11, 26, 25, 29),
    (6, 7, 11, 14, 28, 27),
    (1, 11, 7, 29, 28, 17),
];

impl SphericalManifold {
    /// Build the icosahedral manifold, subdivided to `degree`.
    ///
    /// # Errors
    ///
    /// Returns an error if `degree` is out of the supported range or if
    /// the subdivision bookkeeping fails an internal consistency check
    /// (which would indicate a bug in this module, not bad input).
    pub fn new(degree: u32) -> Result<Self> {
        tracing::debug!(degree, "building subdivided icosahedron manifold");
        if degree >= 16 {
            return Err(bad_arg(format!(
                "degree {degree} out of range (0..16)"
            )));
        }

        let phi = (1.0 + 5.0_f64.sqrt()) / 2.0;
        let base_positions: [Vec3; 12] = [
            Vec3::new(1.0, 0.0, phi),
            Vec3::new(-1.0, 0.0, -phi),
            Vec3::new(phi, -1.0, 0.0),
            Vec3::new(phi, 1.0, 0.0),
            Vec3::new(0.0, phi, 1.0),
            Vec3::new(-1.0, 0.0, phi),
            Vec3::new(0.0, -phi, 1.0),
            Vec3::new(0.0, -phi, -1.0),
            Vec3::new(1.0, 0.0, -phi),
            Vec3::new(0.0, phi, -1.0),
            Vec3::new(-phi, 1.0, 0.0),
            Vec3::new(-phi, -1.0, 0.0),
        ];

        let total_vertices = nvertices_at_depth(degree);
        let mut vertices = Vec::with_capacity(total_vertices);
        for pos in base_positions {
            let normalized = pos
                .normalized()
                .ok_or_else(|| format_error("degenerate base vertex"))?;
            vertices.push(Vertex::new(normalized, 0));
        }
        vertices.resize_with(total_vertices, || Vertex::new(Vec3::new(0.0, 0.0, 0.0), 0));

        let mut edges = Vec::with_capacity(degree as usize + 1);
        let mut triangles = Vec::with_capacity(degree as usize + 1);

        let base_edges: Vec<Edge> = BASE_EDGES.iter().map(|&(a, b)| Edge::new(a, b)).collect();
        edges.push(base_edges);
        let mut base_triangles: Vec<Triangle> = BASE_TRIANGLES
            .iter()
            .map(|&(a, b, c, ab, bc, ca)| Triangle::new(a, b, c, ab, bc, ca))
            .collect();
        for (ti, t) in base_triangles.iter_mut().enumerate() {
            edges[0][t.ab as usize].add_triangle(ti as i32)?;
            edges[0][t.bc as usize].add_triangle(ti as i32)?;
            edges[0][t.ca as usize].add_triangle(ti as i32)?;
        }
        triangles.push(base_triangles);

        // Rotate so vertex 0/1 sit exactly at the poles: the base
        // table places them at (1, 0, phi)/(-1, 0, -phi) normalised.
        // A rotation about Z then Y aligns (1, 0, phi) with +Z.
        let pole = vertices[0].pos;
        let colatitude = pole.z.acos();
        let azimuth = pole.y.atan2(pole.x);
        for v in &mut vertices[0..12] {
            v.pos = v.pos.rotate_z(-azimuth).rotate_y(-colatitude);
        }
        if vertices[0].pos.x.abs() > 1.0e-9
            || vertices[0].pos.y.abs() > 1.0e-9
            || (vertices[0].pos.z - 1.0).abs() > 1.0e-9
        {
            return Err(format_error(
                "pole-alignment rotation failed to move vertex 0 to the north pole",
            ));
        }

        let mut manifold = Self {
            degree,
            vertices,
            edges,
            triangles,
        };

        for d in 1..=degree {
            manifold.subdivide(d)?;
        }
        for d in (0..=degree).rev() {
            manifold.compute_areas(d)?;
        }
        manifold.build_neighbors()?;

        Ok(manifold)
    }

    /// Subdivision degree this manifold was built to.
    #[must_use]
    pub const fn degree(&self) -> u32 {
        self.degree
    }

    /// Total vertex count (global index range).
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// All vertices, indexed globally.
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Total triangle count across every depth, the `rowstride` used
    /// by the face shell transforms.
    #[must_use]
    pub fn ntotaltriangles(&self) -> usize {
        self.triangles.iter().map(Vec::len).sum()
    }

    /// Edges at a given depth.
    #[must_use]
    pub fn edges_at(&self, depth: u32) -> &[Edge] {
        &self.edges[depth as usize]
    }

    /// Triangles at a given depth.
    #[must_use]
    pub fn triangles_at(&self, depth: u32) -> &[Triangle] {
        &self.triangles[depth as usize]
    }

    fn get_triangle_other_vertex(&self, depth: u32, ei: i32, ti: i32) -> Result<i32> {
        let e = &self.edges[depth as usize][ei as usize];
        let (va, vb) = (e.a, e.b);
        let t = &self.triangles[depth as usize][ti as usize];
        if t.a != va && t.a != vb {
            Ok(t.a)
        } else if t.b != va && t.b != vb {
            Ok(t.b)
        } else if t.c != va && t.c != vb {
            Ok(t.c)
        } else {
            Err(format_error("triangle/edge inconsistency"))
        }
    }

    fn get_edge_f_vertices(&self, depth: u32, ei: i32) -> Result<[i32; 2]> {
        let e = self.edges[depth as usize][ei as usize];
        if e.triangles[0] < 0 || e.triangles[1] < 0 {
            return Err(format_error("edge missing an incident triangle"));
        }
        Ok([
            self.get_triangle_other_vertex(depth, ei, e.triangles[0])?,
            self.get_triangle_other_vertex(depth, ei, e.triangles[1])?,
        ])
    }

    fn get_edge_e_vertices(&self, depth: u32, ei: i32) -> Result<[i32; 4]> {
        let e = self.edges[depth as usize][ei as usize];
        let mut ev = [0i32; 4];
        for (side, &ti) in e.triangles.iter().enumerate() {
            if ti < 0 {
                return Err(format_error("edge missing an incident triangle"));
            }
            let t = self.triangles[depth as usize][ti as usize];
            let (ea, eb) = if t.ab == ei {
                (t.bc, t.ca)
            } else if t.bc == ei {
                (t.ab, t.ca)
            } else if t.ca == ei {
                (t.ab, t.bc)
            } else {
                return Err(format_error("triangle/edge inconsistency"));
            };

            for (slot, &other_edge) in [ea, eb].iter().enumerate() {
                let f = self.get_edge_f_vertices(depth, other_edge)?;
                let value = if f[0] != e.a && f[0] != e.b {
                    f[0]
                } else if f[1] != e.a && f[1] != e.b {
                    f[1]
                } else if f[0] == f[1] {
                    f[0]
                } else {
                    return Err(format_error(
                        "failed to resolve an e-vertex (edge/triangle data inconsistent)",
                    ));
                };
                ev[side * 2 + slot] = value;
            }
        }
        Ok(ev)
    }

    fn subdivide(&mut self, depth: u32) -> Result<()> {
        let prev = depth - 1;
        let mut vi = nvertices_at_depth(prev);
        let mut new_edges: Vec<Edge> = Vec::with_capacity(nedges_at_depth(depth));
        let mut child_edges_of: Vec<[i32; 2]> = vec![[-1, -1]; self.edges[prev as usize].len()];

        for i in 0..self.edges[prev as usize].len() {
            let (ea, eb) = {
                let e = self.edges[prev as usize][i];
                (e.a, e.b)
            };
            let pos_a = self.vertices[ea as usize].pos;
            let pos_b = self.vertices[eb as usize].pos;
            let midpoint = Vec3::new(
                (pos_a.x + pos_b.x) / 2.0,
                (pos_a.y + pos_b.y) / 2.0,
                (pos_a.z + pos_b.z) / 2.0,
            )
            .normalized()
            .ok_or_else(|| format_error("degenerate edge midpoint"))?;

            let mut vm = Vertex::new(midpoint, depth);
            vm.v = [ea, eb];

            let a_is_parent_depth = self.vertices[ea as usize].depth == prev;
            if a_is_parent_depth {
                self.vertices[ea as usize].add_child(vi as i32)?;
                vm.parent = ea;
            } else {
                self.vertices[eb as usize].add_child(vi as i32)?;
                vm.parent = eb;
            }

            vm.f = self.get_edge_f_vertices(prev, i as i32)?;
            vm.e = self.get_edge_e_vertices(prev, i as i32)?;

            self.vertices[vi] = vm;

            let c0 = new_edges.len() as i32;
            new_edges.push(Edge {
                parent: i as i32,
                ..Edge::new(ea, vi as i32)
            });
            let c1 = new_edges.len() as i32;
            new_edges.push(Edge {
                parent: i as i32,
                ..Edge::new(vi as i32, eb)
            });
            child_edges_of[i] = [c0, c1];

            vi += 1;
        }

        let mut new_triangles: Vec<Triangle> = Vec::with_capacity(ntriangles_at_depth(depth));

        for i in 0..self.triangles[prev as usize].len() {
            let t = self.triangles[prev as usize][i];
            let (via, vib, vic) = (t.a, t.b, t.c);

            let eab = self.edges[prev as usize][t.ab as usize];
            let ebc = self.edges[prev as usize][t.bc as usize];
            let eca = self.edges[prev as usize][t.ca as usize];
            let [eab_c0, eab_c1] = child_edges_of[t.ab as usize];
            let [ebc_c0, ebc_c1] = child_edges_of[t.bc as usize];
            let [eca_c0, eca_c1] = child_edges_of[t.ca as usize];

            let ordered = [
                if eab.a == via {
                    [eab_c0, eab_c1]
                } else if eab.b == via {
                    [eab_c1, eab_c0]
                } else {
                    return Err(format_error("edge/triangle mismatch a"));
                },
                if ebc.a == vib {
                    [ebc_c0, ebc_c1]
                } else if ebc.b == vib {
                    [ebc_c1, ebc_c0]
                } else {
                    return Err(format_error("edge/triangle mismatch b"));
                },
                if eca.a == vic {
                    [eca_c0, eca_c1]
                } else if eca.b == vic {
                    [eca_c1, eca_c0]
                } else {
                    return Err(format_error("edge/triangle mismatch c"));
                },
            ];

            let viab = new_edges[eab_c0 as usize].b;
            let vibc = new_edges[ebc_c0 as usize].b;
            let vica = new_edges[eca_c0 as usize].b;

            let iabbc = new_edges.len() as i32;
            new_edges.push(Edge::new(viab, vibc));
            let ibcca = new_edges.len() as i32;
            new_edges.push(Edge::new(vibc, vica));
            let icaab = new_edges.len() as i32;
            new_edges.push(Edge::new(vica, viab));

            let mut children = [0i32; 4];
            let faces = [
                Triangle::new(via, viab, vica, ordered[0][0], icaab, ordered[2][1]),
                Triangle::new(viab, vib, vibc, ordered[0][1], ordered[1][0], iabbc),
                Triangle::new(vica, vibc, vic, ibcca, ordered[1][1], ordered[2][0]),
                Triangle::new(vica, viab, vibc, icaab, iabbc, ibcca),
            ];
            for (slot, mut face) in faces.into_iter().enumerate() {
                let ti = new_triangles.len() as i32;
                face.parent = i as i32;
                for &ei in &[face.ab, face.bc, face.ca] {
                    new_edges[ei as usize].add_triangle(ti)?;
                }
                new_triangles.push(face);
                children[slot] = ti;
            }

            self.triangles[prev as usize][i].child_triangles = children;
        }

        for (i, ce) in child_edges_of.into_iter().enumerate() {
            self.edges[prev as usize][i].child_edges = ce;
        }

        if new_edges.len() != nedges_at_depth(depth) {
            return Err(format_error(format!(
                "incorrect edge count generated at depth {depth}: {} != {}",
                new_edges.len(),
                nedges_at_depth(depth)
            )));
        }
        if new_triangles.len() != ntriangles_at_depth(depth) {
            return Err(format_error(format!(
                "incorrect triangle count generated at depth {depth}: {} != {}",
                new_triangles.len(),
                ntriangles_at_depth(depth)
            )));
        }

        self.edges.push(new_edges);
        self.triangles.push(new_triangles);

        Ok(())
    }

    fn build_neighbors(&mut self) -> Result<()> {
        let finest = self.degree as usize;
        for j in 0..self.edges[finest].len() {
            let (v0, v1) = {
                let e = self.edges[finest][j];
                (e.a, e.b)
            };
            self.vertices[v0 as usize].add_neighbor(v1)?;
            self.vertices[v1 as usize].add_neighbor(v0)?;
        }
        Ok(())
    }

    fn compute_areas(&mut self, depth: u32) -> Result<()> {
        if depth == self.degree {
            let mut _total = 0.0;
            for i in 0..self.triangles[depth as usize].len() {
                let t = self.triangles[depth as usize][i];
                let pa = self.vertices[t.a as usize].pos;
                let pb = self.vertices[t.b as usize].pos;
                let pc = self.vertices[t.c as usize].pos;
                let area = triangle_area(pa, pb, pc);
                self.triangles[depth as usize][i].area = area;
                _total += area;
                self.vertices[t.a as usize].area += area / 3.0;
                self.vertices[t.b as usize].area += area / 3.0;
                self.vertices[t.c as usize].area += area / 3.0;
            }
        } else {
            let vstart = nvertices_at_depth(depth);
            let vend = nvertices_at_depth(depth + 1);

            for i in vstart..vend {
                let (area, v, f, e) = {
                    let vert = &self.vertices[i];
                    (vert.area, vert.v, vert.f, vert.e)
                };
                if v[0] < 0 || v[1] < 0 {
                    return Err(format_error("v vertices unset"));
                }
                self.vertices[v[0] as usize].area += area / 2.0;
                self.vertices[v[1] as usize].area += area / 2.0;

                if f[0] < 0 || f[1] < 0 {
                    return Err(format_error("f vertices unset"));
                }
                self.vertices[f[0] as usize].area += area / 4.0;
                self.vertices[f[1] as usize].area += area / 4.0;

                if e.iter().any(|&x| x < 0) {
                    return Err(format_error("e vertices unset"));
                }
                for &ei in &e {
                    self.vertices[ei as usize].area -= area / 16.0;
                }
            }

            for i in vstart..vend {
                let v = self.vertices[i].v;
                let denom = self.vertices[v[0] as usize].area + self.vertices[v[1] as usize].area;
                self.vertices[i].area /= denom;
            }

            for i in 0..ntriangles_at_depth(depth) {
                let children = self.triangles[depth as usize][i].child_triangles;
                let sum: f64 = children
                    .iter()
                    .map(|&c| self.triangles[depth as usize + 1][c as usize].area)
                    .sum();
                self.triangles[depth as usize][i].area = sum;
            }
        }
        Ok(())
    }

    /// Linear search of the finest-depth triangles enclosing `point`,
    /// descending from depth 0 rather than scanning every depth-0
    /// triangle and then walking down through child triangles.
    ///
    /// Returns the enclosing triangle index at the finest depth and
    /// its barycentric coordinates `(alpha, beta, gamma)`.
    ///
    /// # Errors
    ///
    /// Returns an error if no top-level triangle contains `point`
    /// (which should not happen for a point on the unit sphere).
    pub fn find_enclosing_triangle(&self, point: Vec3) -> Result<(usize, f64, f64, f64)> {
        const EPSILON: f64 = 1.0e-14;

        let mut t = None;
        let mut bary = (0.0, 0.0, 0.0);
        for i in 0..self.triangles[0].len() {
            if let Some(b) = self.point_in_triangle(0, i, point, EPSILON) {
                t = Some(i);
                bary = b;
                break;
            }
        }
        let mut t = t.ok_or_else(|| {
            format_error("point does not lie within any top-level triangle")
        })?;

        for depth in 0..self.degree {
            let children = self.triangles[depth as usize][t].child_triangles;
            let mut found = None;
            let mut epsilon = EPSILON;
            while found.is_none() {
                for &c in &children {
                    if let Some(b) = self.point_in_triangle(depth + 1, c as usize, point, epsilon) {
                        found = Some(c as usize);
                        bary = b;
                        break;
                    }
                }
                if found.is_none() {
                    epsilon *= 2.0;
                }
            }
            t = found.unwrap();
        }

        Ok((t, bary.0, bary.1, bary.2))
    }

    /// Nearest finest-depth vertex to `point`, found by locating the
    /// enclosing triangle and picking the vertex with the largest
    /// barycentric weight.
    ///
    /// # Errors
    ///
    /// See [`Self::find_enclosing_triangle`].
    pub fn find_nearest_vertex(&self, point: Vec3) -> Result<usize> {
        let (ti, ba, bb, bc) = self.find_enclosing_triangle(point)?;
        let t = self.triangles[self.degree as usize][ti];
        let vi = if ba > bb {
            if ba > bc {
                t.a
            } else {
                t.c
            }
        } else if bb > bc {
            t.b
        } else {
            t.c
        };
        Ok(vi as usize)
    }

    fn point_in_triangle(
        &self,
        depth: u32,
        ti: usize,
        p: Vec3,
        epsilon: f64,
    ) -> Option<(f64, f64, f64)> {
        let t = self.triangles[depth as usize][ti];
        let a = self.vertices[t.a as usize].pos;
        let b = self.vertices[t.b as usize].pos;
        let c = self.vertices[t.c as usize].pos;

        let total = determinant(a, b, c);
        if total.abs() < 1.0e-30 {
            return None;
        }
        let mut alpha = determinant(p, b, c) / total;
        let mut beta = determinant(a, p, c) / total;
        let mut gamma = determinant(a, b, p) / total;

        for v in [&mut alpha, &mut beta, &mut gamma] {
            if v.abs() < epsilon {
                *v = 0.0;
            }
        }

        if alpha >= 0.0 && beta >= 0.0 && gamma >= 0.0 {
            Some((alpha, beta, gamma))
        } else {
            None
        }
    }
}

fn triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f64 {
    (b - a).cross(c - a).length() / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_three_counts_match_closed_form() {
        assert_eq!(nvertices_at_depth(3), 642);
        assert_eq!(nedges_at_depth(3), 1920);
        assert_eq!(ntriangles_at_depth(3), 1280);
    }

    #[test]
    fn degree_two_manifold_builds_and_is_consistent() {
        let m = SphericalManifold::new(2).expect("manifold builds");
        assert_eq!(m.vertex_count(), nvertices_at_depth(2));
        assert_eq!(m.edges_at(2).len(), nedges_at_depth(2));
        assert_eq!(m.triangles_at(2).len(), ntriangles_at_depth(2));

        for v in m.vertices() {
            let l = v.pos.length();
            assert!((l - 1.0).abs() < 1.0e-9, "vertex not on unit sphere: {l}");
        }
    }

    #[test]
    fn finest_depth_neighbor_counts_are_five_or_six() {
        let m = SphericalManifold::new(2).expect("manifold builds");
        let mut five_count = 0;
        for v in m.vertices() {
            if v.depth != m.degree() {
                continue;
            }
            let n = v.neighbors.iter().filter(|&&x| x >= 0).count();
            assert!((5..=6).contains(&n), "unexpected neighbour count {n}");
            if n == 5 {
                five_count += 1;
            }
        }
        assert_eq!(five_count, 12, "icosahedral manifolds have exactly 12 pentavalent vertices");
    }

    #[test]
    fn triangle_areas_sum_to_sphere_area() {
        let m = SphericalManifold::new(2).expect("manifold builds");
        let total: f64 = m
            .triangles_at(m.degree())
            .iter()
            .map(|t| t.area)
            .sum();
        let expected = 4.0 * std::f64::consts::PI;
        assert!(
            (total - expected).abs() / expected < 1.0e-6,
            "total {total} vs expected {expected}"
        );
    }

    #[test]
    fn find_enclosing_triangle_locates_a_base_vertex() {
        let m = SphericalManifold::new(2).expect("manifold builds");
        let north = Vec3::new(0.0, 0.0, 1.0);
        let (ti, _, _, _) = m.find_enclosing_triangle(north).expect("point located");
        assert!(ti < m.triangles_at(m.degree()).len());
    }
}
