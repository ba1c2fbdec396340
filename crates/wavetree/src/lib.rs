//! Trans-dimensional wavetrees: a sparse, node-indexed coefficient tree
//! supporting reversible-jump birth/death/value/move edits over either a
//! regular dyadic grid (2D/3D) or a subdivided-icosahedron spherical
//! manifold (2D lateral, 3D radial-shell stack).
//!
//! Ported from the shared contract of `wavetree2d_sub.c`,
//! `wavetree3d_sub.c`, `wavetreesphereface2d.c`, `wavetreesphereface3d.c`,
//! and `wavetreesphere3d.c` — five sources implementing the same state
//! machine over different index spaces, factored here behind a single
//! [`Topology`] trait and one generic [`Wavetree<T>`].

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod dyck;
pub mod laststep;
pub mod persist;
pub mod rect;
pub mod sphere;
pub mod topology;
pub mod tree;

pub use dyck::{
    generate_dyck_binary_2d, generate_dyck_binary_3d, generate_dyck_word_2d, generate_dyck_word_3d,
};
pub use laststep::{LastStep, StepKind};
pub use rect::{Rect2D, Rect3D};
pub use sphere::{Sphere2DFace, Sphere2DVertex, Sphere3DFace, Sphere3DVertex};
pub use topology::Topology;
pub use tree::Wavetree;
