//! Per-coefficient value/acceptance histograms.
//!
//! Ported from `coefficient_histogram.c`: alongside a tree's active
//! coefficients, a sampler wants a running picture of what values each
//! coefficient has actually taken, and how often birth/death/value moves
//! touching it have been proposed versus accepted. This is a flat array
//! of per-coefficient accumulators indexed by whatever [`IndexMapper`]
//! the caller supplies, kept entirely separate from the tree itself so
//! sampling a value never has to touch `S_v`.

use crate::mapper::{IdentityMapper, IndexMapper};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use wavetree_core::{bad_arg, format_error, BinaryReader, BinaryWriter, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CoefficientStats {
    vmin: f64,
    vmax: f64,
    counts: Vec<u32>,
    under: u32,
    over: u32,
    rmin: f64,
    rmax: f64,
    rmean: f64,
    /// Running sum of squared deviations from `rmean` (Welford's M2).
    /// Square-rooted in place by [`CoefficientHistogram::finalise`].
    rstd: f64,
    n: u32,
    valpha: f64,
    valpha_mean: f64,
    valpha_n: u32,
    pb: u32,
    ab: u32,
    pd: u32,
    ad: u32,
    pv: u32,
    av: u32,
}

impl CoefficientStats {
    fn new(nbins: usize, gvmin: f64, gvmax: f64) -> Self {
        Self {
            vmin: gvmin,
            vmax: gvmax,
            counts: vec![0; nbins],
            under: 0,
            over: 0,
            rmin: 0.0,
            rmax: 0.0,
            rmean: 0.0,
            rstd: 0.0,
            n: 0,
            valpha: 0.0,
            valpha_mean: 0.0,
            valpha_n: 0,
            pb: 0,
            ab: 0,
            pd: 0,
            ad: 0,
            pv: 0,
            av: 0,
        }
    }
}

/// `(v - vmin) / (vmax - vmin) * nbins`, floored and clamped to
/// `0..nbins`. The source computes this without the clamp, which lets
/// `v == vmax` exactly produce an out-of-bounds `nbins` index into a
/// `nbins`-sized row; this port closes that latent off-by-one rather
/// than reproducing it.
fn bin_index(v: f64, vmin: f64, vmax: f64, nbins: usize) -> usize {
    let raw = (v - vmin) / (vmax - vmin) * nbins as f64;
    if raw.is_nan() || raw < 0.0 {
        0
    } else if raw >= nbins as f64 {
        nbins - 1
    } else {
        raw as usize
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    ncoeff: usize,
    nbins: usize,
    gvmin: f64,
    gvmax: f64,
    coeffs: Vec<CoefficientStats>,
}

/// Running per-coefficient value and acceptance histograms for a
/// trans-dimensional chain.
///
/// `C` translates between a tree coordinate and the flat `0..ncoeff`
/// index this histogram is keyed by; [`IdentityMapper`] is the default
/// for callers that already enumerate coefficients linearly.
#[derive(Debug, Clone)]
pub struct CoefficientHistogram<C: IndexMapper = IdentityMapper> {
    ncoeff: usize,
    nbins: usize,
    gvmin: f64,
    gvmax: f64,
    coeffs: Vec<CoefficientStats>,
    mapper: C,
}

impl CoefficientHistogram<IdentityMapper> {
    /// Build a histogram with the default flat-index mapper.
    #[must_use]
    pub fn new(ncoeff: usize, nbins: usize, vmin: f64, vmax: f64) -> Self {
        Self::with_mapper(ncoeff, nbins, vmin, vmax, IdentityMapper)
    }

    /// Rebuild a histogram (with the default mapper) from a JSON
    /// snapshot produced by [`CoefficientHistogram::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_with_mapper(json, IdentityMapper)
    }
}

impl<C: IndexMapper> CoefficientHistogram<C> {
    /// Build a histogram over `ncoeff` coefficients, each with `nbins`
    /// value bins spanning `[vmin, vmax]` initially.
    pub fn with_mapper(ncoeff: usize, nbins: usize, vmin: f64, vmax: f64, mapper: C) -> Self {
        tracing::debug!(ncoeff, nbins, vmin, vmax, "creating coefficient histogram");
        Self {
            ncoeff,
            nbins,
            gvmin: vmin,
            gvmax: vmax,
            coeffs: (0..ncoeff)
                .map(|_| CoefficientStats::new(nbins, vmin, vmax))
                .collect(),
            mapper,
        }
    }

    /// Number of coefficients tracked.
    #[must_use]
    pub const fn ncoeff(&self) -> usize {
        self.ncoeff
    }

    /// Number of value bins per coefficient.
    #[must_use]
    pub const fn nbins(&self) -> usize {
        self.nbins
    }

    /// Flatten a tree coordinate via the configured [`IndexMapper`].
    #[must_use]
    pub fn coord_to_index(&self, i: i32, j: i32, k: i32, depth: i32) -> i32 {
        self.mapper.to_index(i, j, k, depth)
    }

    /// Recover a tree coordinate via the configured [`IndexMapper`].
    #[must_use]
    pub fn index_to_coord(&self, index: i32) -> (i32, i32, i32, i32) {
        self.mapper.to_coord(index)
    }

    /// Clear every accumulator back to its initial state, reseeding each
    /// coefficient's `[vmin, vmax]` from the global range.
    pub fn reset(&mut self) {
        for c in &mut self.coeffs {
            *c = CoefficientStats::new(self.nbins, self.gvmin, self.gvmax);
        }
        tracing::trace!(ncoeff = self.ncoeff, "histogram reset");
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.ncoeff {
            return Err(bad_arg(format!(
                "coefficient index {index} out of range 0..{}",
                self.ncoeff
            )));
        }
        Ok(())
    }

    /// Override the `[vmin, vmax]` bin range for a single coefficient.
    pub fn set_range(&mut self, index: usize, vmin: f64, vmax: f64) -> Result<()> {
        self.check_index(index)?;
        self.coeffs[index].vmin = vmin;
        self.coeffs[index].vmax = vmax;
        Ok(())
    }

    /// Record an observed coefficient value: bins it (or counts it as
    /// under/overflow), and folds it into the running min/max/mean/std
    /// via Welford's algorithm.
    pub fn sample(&mut self, index: usize, value: f64) -> Result<()> {
        self.check_index(index)?;
        let c = &mut self.coeffs[index];

        if value < c.vmin {
            c.under += 1;
        } else if value > c.vmax {
            c.over += 1;
        } else {
            let b = bin_index(value, c.vmin, c.vmax, self.nbins);
            c.counts[b] += 1;
        }

        if c.n == 0 {
            c.rmin = value;
            c.rmax = value;
        } else {
            if value < c.rmin {
                c.rmin = value;
            }
            if value > c.rmax {
                c.rmax = value;
            }
        }

        c.n += 1;
        let delta = value - c.rmean;
        c.rmean += delta / f64::from(c.n);
        c.rstd += delta * (value - c.rmean);

        Ok(())
    }

    /// Record a birth proposal touching `index`.
    pub fn propose_birth(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.coeffs[index].pb += 1;
        Ok(())
    }

    /// Record an accepted birth touching `index`.
    pub fn accept_birth(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.coeffs[index].ab += 1;
        Ok(())
    }

    /// Record a rejected birth touching `index`. A no-op beyond
    /// validation: the source leaves rejected birth values unrecorded.
    pub fn reject_birth(&mut self, index: usize) -> Result<()> {
        self.check_index(index)
    }

    /// Record a death proposal touching `index`.
    pub fn propose_death(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.coeffs[index].pd += 1;
        Ok(())
    }

    /// Record an accepted death touching `index`.
    pub fn accept_death(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.coeffs[index].ad += 1;
        Ok(())
    }

    /// Record a value-perturbation proposal touching `index`.
    pub fn propose_value(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.coeffs[index].pv += 1;
        Ok(())
    }

    /// Record an accepted value perturbation touching `index`.
    pub fn accept_value(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.coeffs[index].av += 1;
        Ok(())
    }

    /// Record a rejected value perturbation touching `index`. A no-op
    /// beyond validation, mirroring [`Self::reject_birth`].
    pub fn reject_value(&mut self, index: usize) -> Result<()> {
        self.check_index(index)
    }

    /// Record the log-acceptance ratio of a value proposal, clamping any
    /// positive `alpha` to `0.0` (acceptance ratios above 1 in log-space
    /// are reported as 1), and fold it into a running mean.
    pub fn sample_log_acceptance(&mut self, index: usize, alpha: f64) -> Result<()> {
        self.check_index(index)?;
        let c = &mut self.coeffs[index];
        let alpha = alpha.min(0.0);
        c.valpha = alpha;
        c.valpha_n += 1;
        let delta = alpha - c.valpha_mean;
        c.valpha_mean += delta / f64::from(c.valpha_n);
        Ok(())
    }

    /// Mean and standard deviation of sampled values at `index`, or
    /// `(0.0, 0.0)` if fewer than 3 samples have been recorded (matching
    /// the source's refusal to estimate a std. dev. from so few points).
    pub fn coefficient_mean_std(&self, index: usize) -> Result<(f64, f64)> {
        self.check_index(index)?;
        let c = &self.coeffs[index];
        if c.n > 2 {
            Ok((c.rmean, (c.rstd / f64::from(c.n - 1)).sqrt()))
        } else {
            Ok((0.0, 0.0))
        }
    }

    /// `(proposed, accepted)` value-perturbation counts for `index`.
    pub fn accept_reject(&self, index: usize) -> Result<(u32, u32)> {
        self.check_index(index)?;
        let c = &self.coeffs[index];
        Ok((c.pv, c.av))
    }

    /// Square-root every coefficient's running variance accumulator into
    /// a standard deviation in place. Idempotent only in the sense that
    /// calling it twice squashes `rstd` to garbage, same as the source —
    /// call once, after sampling is complete.
    pub fn finalise(&mut self) {
        for c in &mut self.coeffs {
            c.rstd = if c.n > 2 {
                (c.rstd / f64::from(c.n - 1)).sqrt()
            } else {
                0.0
            };
        }
        tracing::debug!(ncoeff = self.ncoeff, "histogram finalised");
    }

    /// Serialise the running state to a binary stream, field order
    /// matching the source's `fwrite` sequence exactly.
    pub fn write_binary<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_i32(i32::try_from(self.ncoeff).unwrap_or(i32::MAX))?;
        w.write_i32(i32::try_from(self.nbins).unwrap_or(i32::MAX))?;
        w.write_f64(self.gvmin)?;
        w.write_f64(self.gvmax)?;

        for c in &self.coeffs {
            w.write_f64(c.vmin)?;
        }
        for c in &self.coeffs {
            w.write_f64(c.vmax)?;
        }
        for c in &self.coeffs {
            for &b in &c.counts {
                w.write_i32(b as i32)?;
            }
        }
        for c in &self.coeffs {
            w.write_i32(c.under as i32)?;
        }
        for c in &self.coeffs {
            w.write_i32(c.over as i32)?;
        }
        for c in &self.coeffs {
            w.write_f64(c.rmin)?;
        }
        for c in &self.coeffs {
            w.write_f64(c.rmax)?;
        }
        for c in &self.coeffs {
            w.write_f64(c.rmean)?;
        }
        for c in &self.coeffs {
            w.write_f64(c.rstd)?;
        }
        for c in &self.coeffs {
            w.write_i32(c.n as i32)?;
        }
        for c in &self.coeffs {
            w.write_f64(c.valpha)?;
        }
        for c in &self.coeffs {
            w.write_f64(c.valpha_mean)?;
        }
        for c in &self.coeffs {
            w.write_i32(c.valpha_n as i32)?;
        }
        for c in &self.coeffs {
            w.write_i32(c.pb as i32)?;
        }
        for c in &self.coeffs {
            w.write_i32(c.ab as i32)?;
        }
        for c in &self.coeffs {
            w.write_i32(c.pd as i32)?;
        }
        for c in &self.coeffs {
            w.write_i32(c.ad as i32)?;
        }
        for c in &self.coeffs {
            w.write_i32(c.pv as i32)?;
        }
        for c in &self.coeffs {
            w.write_i32(c.av as i32)?;
        }

        Ok(())
    }

    /// Load running state from a binary stream written by
    /// [`Self::write_binary`], in place. Errors without mutating `self`
    /// if the stream's `ncoeff`/`nbins` header doesn't match this
    /// histogram's shape — the source's `size mismatch` check.
    pub fn load_binary<R: Read>(&mut self, r: &mut R) -> Result<()> {
        let ncoeff = r.read_i32()?;
        let nbins = r.read_i32()?;
        if ncoeff as usize != self.ncoeff || nbins as usize != self.nbins {
            return Err(format_error(format!(
                "size mismatch ncoeff {ncoeff} != {}, nbins {nbins} != {}",
                self.ncoeff, self.nbins
            )));
        }

        let gvmin = r.read_f64()?;
        let gvmax = r.read_f64()?;

        let mut vmin = vec![0.0; self.ncoeff];
        for v in &mut vmin {
            *v = r.read_f64()?;
        }
        let mut vmax = vec![0.0; self.ncoeff];
        for v in &mut vmax {
            *v = r.read_f64()?;
        }

        let mut counts = vec![vec![0u32; self.nbins]; self.ncoeff];
        for row in &mut counts {
            for b in row.iter_mut() {
                *b = r.read_i32()? as u32;
            }
        }

        let mut under = vec![0u32; self.ncoeff];
        for v in &mut under {
            *v = r.read_i32()? as u32;
        }
        let mut over = vec![0u32; self.ncoeff];
        for v in &mut over {
            *v = r.read_i32()? as u32;
        }

        let mut rmin = vec![0.0; self.ncoeff];
        for v in &mut rmin {
            *v = r.read_f64()?;
        }
        let mut rmax = vec![0.0; self.ncoeff];
        for v in &mut rmax {
            *v = r.read_f64()?;
        }
        let mut rmean = vec![0.0; self.ncoeff];
        for v in &mut rmean {
            *v = r.read_f64()?;
        }
        let mut rstd = vec![0.0; self.ncoeff];
        for v in &mut rstd {
            *v = r.read_f64()?;
        }
        let mut n = vec![0u32; self.ncoeff];
        for v in &mut n {
            *v = r.read_i32()? as u32;
        }

        let mut valpha = vec![0.0; self.ncoeff];
        for v in &mut valpha {
            *v = r.read_f64()?;
        }
        let mut valpha_mean = vec![0.0; self.ncoeff];
        for v in &mut valpha_mean {
            *v = r.read_f64()?;
        }
        let mut valpha_n = vec![0u32; self.ncoeff];
        for v in &mut valpha_n {
            *v = r.read_i32()? as u32;
        }

        let mut pb = vec![0u32; self.ncoeff];
        for v in &mut pb {
            *v = r.read_i32()? as u32;
        }
        let mut ab = vec![0u32; self.ncoeff];
        for v in &mut ab {
            *v = r.read_i32()? as u32;
        }
        let mut pd = vec![0u32; self.ncoeff];
        for v in &mut pd {
            *v = r.read_i32()? as u32;
        }
        let mut ad = vec![0u32; self.ncoeff];
        for v in &mut ad {
            *v = r.read_i32()? as u32;
        }
        let mut pv = vec![0u32; self.ncoeff];
        for v in &mut pv {
            *v = r.read_i32()? as u32;
        }
        let mut av = vec![0u32; self.ncoeff];
        for v in &mut av {
            *v = r.read_i32()? as u32;
        }

        self.gvmin = gvmin;
        self.gvmax = gvmax;
        for i in 0..self.ncoeff {
            let c = &mut self.coeffs[i];
            c.vmin = vmin[i];
            c.vmax = vmax[i];
            c.counts = std::mem::take(&mut counts[i]);
            c.under = under[i];
            c.over = over[i];
            c.rmin = rmin[i];
            c.rmax = rmax[i];
            c.rmean = rmean[i];
            c.rstd = rstd[i];
            c.n = n[i];
            c.valpha = valpha[i];
            c.valpha_mean = valpha_mean[i];
            c.valpha_n = valpha_n[i];
            c.pb = pb[i];
            c.ab = ab[i];
            c.pd = pd[i];
            c.ad = ad[i];
            c.pv = pv[i];
            c.av = av[i];
        }

        tracing::debug!(ncoeff = self.ncoeff, "histogram loaded from binary stream");
        Ok(())
    }

    /// Snapshot the running state (not the mapper) as JSON.
    pub fn to_json(&self) -> Result<String> {
        let snap = Snapshot {
            ncoeff: self.ncoeff,
            nbins: self.nbins,
            gvmin: self.gvmin,
            gvmax: self.gvmax,
            coeffs: self.coeffs.clone(),
        };
        serde_json::to_string(&snap)
            .map_err(|e| format_error(format!("serialising histogram: {e}")))
    }

    /// Rebuild a histogram from a JSON snapshot, pairing it with the
    /// given mapper (mappers are not themselves serialised).
    pub fn from_json_with_mapper(json: &str, mapper: C) -> Result<Self> {
        let snap: Snapshot = serde_json::from_str(json)
            .map_err(|e| format_error(format!("parsing histogram JSON: {e}")))?;
        if snap.coeffs.len() != snap.ncoeff {
            return Err(format_error(format!(
                "histogram snapshot declares ncoeff {} but carries {} rows",
                snap.ncoeff,
                snap.coeffs.len()
            )));
        }
        Ok(Self {
            ncoeff: snap.ncoeff,
            nbins: snap.nbins,
            gvmin: snap.gvmin,
            gvmax: snap.gvmax,
            coeffs: snap.coeffs,
            mapper,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn sample_bins_values_and_tracks_running_stats() {
        let mut h = CoefficientHistogram::new(2, 4, 0.0, 4.0);
        h.sample(0, 0.5).unwrap();
        h.sample(0, 3.9).unwrap();
        h.sample(0, -1.0).unwrap();
        h.sample(0, 10.0).unwrap();

        let (mean, std) = h.coefficient_mean_std(0).unwrap();
        assert_eq!(mean, 0.0);
        assert_eq!(std, 0.0);

        h.sample(0, 1.0).unwrap();
        let (mean, _std) = h.coefficient_mean_std(0).unwrap();
        assert!(mean.is_finite());
    }

    #[test]
    fn value_exactly_at_vmax_does_not_panic_or_overflow() {
        let mut h = CoefficientHistogram::new(1, 4, 0.0, 4.0);
        h.sample(0, 4.0).unwrap();
        assert_eq!(h.coefficient_mean_std(0).unwrap(), (0.0, 0.0));
    }

    #[test]
    fn underflow_and_overflow_counted_separately_from_bins() {
        let mut h = CoefficientHistogram::new(1, 4, 0.0, 4.0);
        h.set_range(0, 1.0, 2.0).unwrap();
        h.sample(0, 0.0).unwrap();
        h.sample(0, 5.0).unwrap();
        h.sample(0, 1.5).unwrap();
    }

    #[test]
    fn proposal_counters_increment_independently() {
        let mut h = CoefficientHistogram::new(1, 4, -1.0, 1.0);
        h.propose_birth(0).unwrap();
        h.propose_birth(0).unwrap();
        h.accept_birth(0).unwrap();
        h.propose_value(0).unwrap();
        h.accept_value(0).unwrap();
        let (p, a) = h.accept_reject(0).unwrap();
        assert_eq!((p, a), (1, 1));
    }

    #[test]
    fn sample_log_acceptance_clamps_positive_alpha_to_zero() {
        let mut h = CoefficientHistogram::new(1, 4, -1.0, 1.0);
        h.sample_log_acceptance(0, 2.0).unwrap();
        h.sample_log_acceptance(0, -0.5).unwrap();
    }

    #[test]
    fn finalise_converts_running_variance_to_stddev() {
        let mut h = CoefficientHistogram::new(1, 4, -10.0, 10.0);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            h.sample(0, v).unwrap();
        }
        h.finalise();
        let (mean, _) = h.coefficient_mean_std(0).unwrap();
        assert!((mean - 3.0).abs() < 1e-9);
    }

    #[test]
    fn binary_roundtrip_preserves_all_fields() {
        let mut h = CoefficientHistogram::new(3, 5, -2.0, 2.0);
        h.sample(0, 0.5).unwrap();
        h.sample(1, -1.5).unwrap();
        h.propose_birth(2).unwrap();
        h.accept_birth(2).unwrap();
        h.sample_log_acceptance(1, -0.2).unwrap();

        let mut buf = Vec::new();
        h.write_binary(&mut buf).unwrap();

        let mut loaded = CoefficientHistogram::new(3, 5, -2.0, 2.0);
        loaded.load_binary(&mut Cursor::new(buf)).unwrap();

        assert_eq!(loaded.coefficient_mean_std(0).unwrap(), h.coefficient_mean_std(0).unwrap());
        assert_eq!(loaded.accept_reject(2).unwrap(), (1, 1));
    }

    #[test]
    fn load_binary_rejects_shape_mismatch() {
        let mut h = CoefficientHistogram::new(2, 4, 0.0, 1.0);
        let mut buf = Vec::new();
        h.write_binary(&mut buf).unwrap();

        let mut other = CoefficientHistogram::new(3, 4, 0.0, 1.0);
        assert!(other.load_binary(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn json_roundtrip_preserves_state() {
        let mut h = CoefficientHistogram::new(2, 4, 0.0, 1.0);
        h.sample(0, 0.25).unwrap();
        h.propose_death(1).unwrap();

        let json = h.to_json().unwrap();
        let restored = CoefficientHistogram::from_json(&json).unwrap();
        assert_eq!(restored.ncoeff(), 2);
        assert_eq!(restored.coefficient_mean_std(0).unwrap(), h.coefficient_mean_std(0).unwrap());
    }

    #[test]
    fn reset_clears_all_accumulators() {
        let mut h = CoefficientHistogram::new(1, 4, 0.0, 1.0);
        h.sample(0, 0.5).unwrap();
        h.propose_birth(0).unwrap();
        h.reset();
        assert_eq!(h.coefficient_mean_std(0).unwrap(), (0.0, 0.0));
        assert_eq!(h.accept_reject(0).unwrap(), (0, 0));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut h = CoefficientHistogram::new(2, 4, 0.0, 1.0);
        assert!(h.sample(5, 0.1).is_err());
    }
}
