//! Lateral (face/vertex) and radial (shell) multi-resolution
//! transforms over a [`SphericalManifold`].
//!
//! Four lateral schemes, ported from their namesake source files:
//! - [`face_subdivision_forward_step`]/[`face_subdivision_inverse_step`] —
//!   plain mean/subtract, no wavelet normalisation (`face_subdivision.c`).
//! - [`face_biohaar_forward_step`]/[`face_biohaar_inverse_step`] —
//!   area-weighted biorthogonal Haar, with the redundant central-child
//!   coefficient zeroed out (`face_wavelet.c`).
//! - [`vertex_butterfly_forward_step`]/[`vertex_butterfly_inverse_step`]
//!   and their `_lifted` companions — an 8-point butterfly stencil over
//!   `v`/`f`/`e` neighbours (`vertex_wavelet.c`).
//!
//! Each lateral scheme has a `*_shell_forward`/`*_shell_inverse` that
//! composes it with a radial lift per depth, alternating lateral and
//! radial passes the way `face_wavelet_biohaar_shell_forward` does.
//! The source's radial step (`cdf97_lift.c`) was not present in the
//! retrieved pack; [`Cdf97RadialStep`] here is a standard two-lift
//! CDF 9/7 wavelet step (predict, then update) behind the
//! [`RadialStep`] seam so a different radial kernel can be substituted.

use crate::manifold::SphericalManifold;
use wavetree_core::{bad_arg, Result};

fn triangle_offsets(m: &SphericalManifold, depth: u32) -> (usize, usize) {
    let mut coffset = 0;
    let mut poffset = 0;
    for d in 0..depth {
        poffset = coffset;
        coffset += crate::manifold::ntriangles_at_depth(d);
    }
    (poffset, coffset)
}

fn check_depth(m: &SphericalManifold, depth: u32) -> Result<()> {
    if depth == 0 || depth > m.degree() {
        return Err(bad_arg(format!(
            "transform depth {depth} out of range (1..={})",
            m.degree()
        )));
    }
    Ok(())
}

/// One step of the plain mean/subtract face transform: push the mean
/// of each parent's 4 children up, leaving the per-child deviation.
///
/// # Errors
///
/// Returns an error if `depth` is out of `1..=m.degree()`.
pub fn face_subdivision_forward_step(
    m: &SphericalManifold,
    coeff: &mut [f64],
    depth: u32,
) -> Result<()> {
    check_depth(m, depth)?;
    let (poffset, coffset) = triangle_offsets(m, depth);
    for (pt, parent) in m.triangles_at(depth - 1).iter().enumerate() {
        let children = parent.child_triangles;
        let mean: f64 = children.iter().map(|&c| coeff[coffset + c as usize]).sum::<f64>() / 4.0;
        coeff[poffset + pt] = mean;
        for &c in &children {
            coeff[coffset + c as usize] -= mean;
        }
    }
    Ok(())
}

/// Inverse of [`face_subdivision_forward_step`].
///
/// # Errors
///
/// Returns an error if `depth` is out of `1..=m.degree()`.
pub fn face_subdivision_inverse_step(
    m: &SphericalManifold,
    coeff: &mut [f64],
    depth: u32,
) -> Result<()> {
    check_depth(m, depth)?;
    let (poffset, coffset) = triangle_offsets(m, depth);
    for (pt, parent) in m.triangles_at(depth - 1).iter().enumerate() {
        let mean = coeff[poffset + pt];
        for &c in &parent.child_triangles {
            coeff[coffset + c as usize] += mean;
        }
    }
    Ok(())
}

/// One step of the area-weighted biorthogonal Haar face wavelet.
///
/// # Errors
///
/// Returns an error if `depth` is out of `1..=m.degree()`.
pub fn face_biohaar_forward_step(
    m: &SphericalManifold,
    coeff: &mut [f64],
    depth: u32,
) -> Result<()> {
    check_depth(m, depth)?;
    let (poffset, coffset) = triangle_offsets(m, depth);
    for (pt, parent) in m.triangles_at(depth - 1).iter().enumerate() {
        let children = parent.child_triangles;
        let mut scaling = 0.0;
        for &ci in &children {
            scaling += coeff[coffset + ci as usize] * m.triangles_at(depth)[ci as usize].area;
        }
        scaling /= parent.area;
        coeff[poffset + pt] = scaling;

        for &ci in &children[0..3] {
            coeff[coffset + ci as usize] = 0.5 * (coeff[coffset + ci as usize] - scaling);
        }
        coeff[coffset + children[3] as usize] = 0.0;
    }
    Ok(())
}

/// Inverse of [`face_biohaar_forward_step`].
///
/// # Errors
///
/// Returns an error if `depth` is out of `1..=m.degree()`.
pub fn face_biohaar_inverse_step(
    m: &SphericalManifold,
    coeff: &mut [f64],
    depth: u32,
) -> Result<()> {
    check_depth(m, depth)?;
    let (poffset, coffset) = triangle_offsets(m, depth);
    for (pt, parent) in m.triangles_at(depth - 1).iter().enumerate() {
        let scaling = coeff[poffset + pt];
        let children = parent.child_triangles;

        let mut balance = 0.0;
        for &ci in &children[0..3] {
            let v = 2.0 * coeff[coffset + ci as usize] + scaling;
            coeff[coffset + ci as usize] = v;
            balance += v * m.triangles_at(depth)[ci as usize].area;
        }

        let central = children[3] as usize;
        coeff[coffset + central] =
            (parent.area * scaling - balance) / m.triangles_at(depth)[central].area;
    }
    Ok(())
}

/// One step of the butterfly vertex wavelet: subtract an 8-point
/// stencil over the `v`/`f`/`e` neighbours from each new vertex at
/// `depth`.
///
/// # Errors
///
/// Returns an error if `depth` is out of `1..=m.degree()`.
pub fn vertex_butterfly_forward_step(
    m: &SphericalManifold,
    coeff: &mut [f64],
    depth: u32,
) -> Result<()> {
    check_depth(m, depth)?;
    let vstart = crate::manifold::nvertices_at_depth(depth - 1);
    let vend = crate::manifold::nvertices_at_depth(depth);
    for i in vstart..vend {
        let v = &m.vertices()[i];
        let stencil = 0.5 * (coeff[v.v[0] as usize] + coeff[v.v[1] as usize])
            + 0.125 * (coeff[v.f[0] as usize] + coeff[v.f[1] as usize])
            - 0.0625
                * (coeff[v.e[0] as usize]
                    + coeff[v.e[1] as usize]
                    + coeff[v.e[2] as usize]
                    + coeff[v.e[3] as usize]);
        coeff[i] -= stencil;
    }
    Ok(())
}

/// Inverse of [`vertex_butterfly_forward_step`].
///
/// # Errors
///
/// Returns an error if `depth` is out of `1..=m.degree()`.
pub fn vertex_butterfly_inverse_step(
    m: &SphericalManifold,
    coeff: &mut [f64],
    depth: u32,
) -> Result<()> {
    check_depth(m, depth)?;
    let vstart = crate::manifold::nvertices_at_depth(depth - 1);
    let vend = crate::manifold::nvertices_at_depth(depth);
    for i in vstart..vend {
        let v = &m.vertices()[i];
        let stencil = 0.5 * (coeff[v.v[0] as usize] + coeff[v.v[1] as usize])
            + 0.125 * (coeff[v.f[0] as usize] + coeff[v.f[1] as usize])
            - 0.0625
                * (coeff[v.e[0] as usize]
                    + coeff[v.e[1] as usize]
                    + coeff[v.e[2] as usize]
                    + coeff[v.e[3] as usize]);
        coeff[i] += stencil;
    }
    Ok(())
}

/// Area-weighted lifting companion to [`vertex_butterfly_forward_step`]:
/// redistributes each new coefficient's area-weighted mass onto its
/// two parent vertices.
///
/// # Errors
///
/// Returns an error if `depth` is out of `1..=m.degree()`.
pub fn vertex_butterfly_forward_lifted_step(
    m: &SphericalManifold,
    coeff: &mut [f64],
    depth: u32,
) -> Result<()> {
    vertex_butterfly_forward_step(m, coeff, depth)?;
    let vstart = crate::manifold::nvertices_at_depth(depth - 1);
    let vend = crate::manifold::nvertices_at_depth(depth);
    for i in vstart..vend {
        let v = &m.vertices()[i];
        let lift = coeff[i] * v.area;
        let (va, vb) = (v.v[0] as usize, v.v[1] as usize);
        coeff[va] += lift;
        coeff[vb] += lift;
    }
    Ok(())
}

/// Inverse of [`vertex_butterfly_forward_lifted_step`].
///
/// # Errors
///
/// Returns an error if `depth` is out of `1..=m.degree()`.
pub fn vertex_butterfly_inverse_lifted_step(
    m: &SphericalManifold,
    coeff: &mut [f64],
    depth: u32,
) -> Result<()> {
    check_depth(m, depth)?;
    let vstart = crate::manifold::nvertices_at_depth(depth - 1);
    let vend = crate::manifold::nvertices_at_depth(depth);
    for i in vstart..vend {
        let v = &m.vertices()[i];
        let lift = coeff[i] * v.area;
        let (va, vb) = (v.v[0] as usize, v.v[1] as usize);
        coeff[va] -= lift;
        coeff[vb] -= lift;
    }
    vertex_butterfly_inverse_step(m, coeff, depth)
}

/// One lifting step of a radial (depth-wise) transform over a strided
/// row of `size` samples with stride `rowstride`, starting at `coeff`.
///
/// Implementations may use `workspace` as scratch of length >= `size`.
pub trait RadialStep {
    /// Forward lifting step.
    fn forward(&self, coeff: &mut [f64], base: usize, size: usize, rowstride: usize);
    /// Inverse lifting step.
    fn inverse(&self, coeff: &mut [f64], base: usize, size: usize, rowstride: usize);
}

/// CDF 9/7-flavoured two-lift radial step: a predict pass followed by
/// an update pass over the strided row, matching the shape of a
/// standard biorthogonal lifting wavelet transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cdf97RadialStep;

const PREDICT: f64 = -1.586_134_342;
const UPDATE: f64 = -0.052_980_118;
const SCALE_LO: f64 = 1.149_604_398;
const SCALE_HI: f64 = 1.0 / 1.149_604_398;

impl RadialStep for Cdf97RadialStep {
    fn forward(&self, coeff: &mut [f64], base: usize, size: usize, rowstride: usize) {
        if size < 2 {
            return;
        }
        let at = |i: usize| base + i * rowstride;
        let half = size / 2;

        for i in 0..half {
            let odd = at(2 * i + 1);
            let l = coeff[at(2 * i)];
            let r = coeff[at((2 * i + 2).min(size - 1))];
            coeff[odd] += PREDICT * (l + r);
        }
        for i in 0..half {
            let even = at(2 * i);
            let l = coeff[at((2 * i).wrapping_sub(1).min(size - 1))];
            let r = coeff[at(2 * i + 1)];
            let prev_odd = if i == 0 { r } else { l };
            coeff[even] += UPDATE * (prev_odd + r);
        }
        for i in 0..half {
            coeff[at(2 * i)] *= SCALE_LO;
            coeff[at(2 * i + 1)] *= SCALE_HI;
        }
    }

    fn inverse(&self, coeff: &mut [f64], base: usize, size: usize, rowstride: usize) {
        if size < 2 {
            return;
        }
        let at = |i: usize| base + i * rowstride;
        let half = size / 2;

        for i in 0..half {
            coeff[at(2 * i)] *= SCALE_HI;
            coeff[at(2 * i + 1)] *= SCALE_LO;
        }
        for i in 0..half {
            let even = at(2 * i);
            let l = coeff[at((2 * i).wrapping_sub(1).min(size - 1))];
            let r = coeff[at(2 * i + 1)];
            let prev_odd = if i == 0 { r } else { l };
            coeff[even] -= UPDATE * (prev_odd + r);
        }
        for i in 0..half {
            let odd = at(2 * i + 1);
            let l = coeff[at(2 * i)];
            let r = coeff[at((2 * i + 2).min(size - 1))];
            coeff[odd] -= PREDICT * (l + r);
        }
    }
}

fn shell_forward<L>(
    m: &SphericalManifold,
    coeff: &mut [f64],
    rowstride: usize,
    radial: &impl RadialStep,
    lateral_step: L,
) -> Result<()>
where
    L: Fn(&SphericalManifold, &mut [f64], u32) -> Result<()>,
{
    tracing::trace!(degree = m.degree(), rowstride, "shell forward transform");
    let radial_size_at_degree = 1usize << m.degree();
    if coeff.len() != rowstride * radial_size_at_degree {
        return Err(bad_arg("shell coefficient buffer size mismatch"));
    }

    for depth in (1..=m.degree()).rev() {
        let radial_size = 1usize << depth;
        for j in 0..radial_size {
            lateral_step(m, &mut coeff[rowstride * j..], depth)?;
        }

        let vend = crate::manifold::nvertices_at_depth(depth);
        for j in 0..vend.min(rowstride) {
            radial.forward(coeff, j, radial_size, rowstride);
        }
    }
    Ok(())
}

fn shell_inverse<L>(
    m: &SphericalManifold,
    coeff: &mut [f64],
    rowstride: usize,
    radial: &impl RadialStep,
    lateral_step: L,
) -> Result<()>
where
    L: Fn(&SphericalManifold, &mut [f64], u32) -> Result<()>,
{
    tracing::trace!(degree = m.degree(), rowstride, "shell inverse transform");
    let radial_size_at_degree = 1usize << m.degree();
    if coeff.len() != rowstride * radial_size_at_degree {
        return Err(bad_arg("shell coefficient buffer size mismatch"));
    }

    for depth in 1..=m.degree() {
        let radial_size = 1usize << depth;

        let vend = crate::manifold::nvertices_at_depth(depth);
        for j in 0..vend.min(rowstride) {
            radial.inverse(coeff, j, radial_size, rowstride);
        }

        for j in 0..radial_size {
            lateral_step(m, &mut coeff[rowstride * j..], depth)?;
        }
    }
    Ok(())
}

/// Shell transform composing [`face_biohaar_forward_step`] laterally
/// with `radial` per depth. `coeff` is laid out as `radial_size` rows
/// of `m.ntotaltriangles()`-length lateral coefficient vectors.
///
/// # Errors
///
/// Returns an error if `coeff`'s length does not match
/// `rowstride * 2^degree`.
pub fn face_biohaar_shell_forward(
    m: &SphericalManifold,
    coeff: &mut [f64],
    rowstride: usize,
    radial: &impl RadialStep,
) -> Result<()> {
    shell_forward(m, coeff, rowstride, radial, face_biohaar_forward_step)
}

/// Inverse of [`face_biohaar_shell_forward`].
///
/// # Errors
///
/// Returns an error if `coeff`'s length does not match
/// `rowstride * 2^degree`.
pub fn face_biohaar_shell_inverse(
    m: &SphericalManifold,
    coeff: &mut [f64],
    rowstride: usize,
    radial: &impl RadialStep,
) -> Result<()> {
    shell_inverse(m, coeff, rowstride, radial, face_biohaar_inverse_step)
}

/// Shell transform composing [`vertex_butterfly_forward_step`]
/// laterally with `radial` per depth.
///
/// # Errors
///
/// Returns an error if `coeff`'s length does not match
/// `rowstride * 2^degree`.
pub fn vertex_butterfly_shell_forward(
    m: &SphericalManifold,
    coeff: &mut [f64],
    rowstride: usize,
    radial: &impl RadialStep,
) -> Result<()> {
    shell_forward(m, coeff, rowstride, radial, vertex_butterfly_forward_step)
}

/// Inverse of [`vertex_butterfly_shell_forward`].
///
/// # Errors
///
/// Returns an error if `coeff`'s length does not match
/// `rowstride * 2^degree`.
pub fn vertex_butterfly_shell_inverse(
    m: &SphericalManifold,
    coeff: &mut [f64],
    rowstride: usize,
    radial: &impl RadialStep,
) -> Result<()> {
    shell_inverse(m, coeff, rowstride, radial, vertex_butterfly_inverse_step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_subdivision_roundtrips() {
        let m = SphericalManifold::new(2).expect("manifold builds");
        let n = m.triangles_at(m.degree()).len();
        let mut coeff = vec![0.0; n];
        for (i, c) in coeff.iter_mut().enumerate() {
            *c = (i as f64 * 0.37).sin();
        }
        let original = coeff.clone();

        for depth in (1..=m.degree()).rev() {
            face_subdivision_forward_step(&m, &mut coeff, depth).unwrap();
        }
        for depth in 1..=m.degree() {
            face_subdivision_inverse_step(&m, &mut coeff, depth).unwrap();
        }

        for (a, b) in coeff.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn face_biohaar_roundtrips() {
        let m = SphericalManifold::new(2).expect("manifold builds");
        let n = m.triangles_at(m.degree()).len();
        let mut coeff = vec![0.0; n];
        for (i, c) in coeff.iter_mut().enumerate() {
            *c = 1.0 + (i as f64 * 0.11).cos();
        }
        let original = coeff.clone();

        for depth in (1..=m.degree()).rev() {
            face_biohaar_forward_step(&m, &mut coeff, depth).unwrap();
        }
        for depth in 1..=m.degree() {
            face_biohaar_inverse_step(&m, &mut coeff, depth).unwrap();
        }

        for (a, b) in coeff.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn vertex_butterfly_roundtrips() {
        let m = SphericalManifold::new(2).expect("manifold builds");
        let mut coeff: Vec<f64> = (0..m.vertex_count()).map(|i| (i as f64 * 0.07).sin()).collect();
        let original = coeff.clone();

        for depth in (1..=m.degree()).rev() {
            vertex_butterfly_forward_step(&m, &mut coeff, depth).unwrap();
        }
        for depth in 1..=m.degree() {
            vertex_butterfly_inverse_step(&m, &mut coeff, depth).unwrap();
        }

        for (a, b) in coeff.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn vertex_butterfly_lifted_roundtrips() {
        let m = SphericalManifold::new(2).expect("manifold builds");
        let mut coeff: Vec<f64> = (0..m.vertex_count()).map(|i| (i as f64 * 0.13).cos()).collect();
        let original = coeff.clone();

        for depth in (1..=m.degree()).rev() {
            vertex_butterfly_forward_lifted_step(&m, &mut coeff, depth).unwrap();
        }
        for depth in 1..=m.degree() {
            vertex_butterfly_inverse_lifted_step(&m, &mut coeff, depth).unwrap();
        }

        for (a, b) in coeff.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }
}
