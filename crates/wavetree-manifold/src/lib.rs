//! Recursively subdivided icosahedral manifold, the companion
//! lateral/radial multi-resolution transforms, and a Houdini geometry
//! exporter.
//!
//! Grounded on `examples/original_source/sphericalwavelet/*.c`:
//! `manifold.c`/`icosahedron.c` for the manifold builder, `triangle.c`
//! for the barycentric point-location test, `face_subdivision.c`/
//! `face_wavelet.c`/`vertex_wavelet.c` for the lateral transforms.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod geo;
pub mod geometry;
pub mod manifold;
pub mod transform;

pub use geometry::{determinant, Vec3};
pub use manifold::{
    nedges_at_depth, ntriangles_at_depth, nvertices_at_depth, Edge, SphericalManifold, Triangle,
    Vertex,
};
pub use transform::{Cdf97RadialStep, RadialStep};
