//! Depth-indexed ordered multisets.
//!
//! Ported from `oset/multiset_int.c` and `oset/multiset_int_double.c`.
//! Both containers map a depth to a sorted, unique sequence of entries
//! and support the same family of random-choice queries used by the
//! proposal machinery in [`crate`]'s sibling crate `wavetree`.
//!
//! The depth dimension is a fixed `DEPTH_SIZE` rather than a growable
//! array: the source's `expand_depth` path exists but is permanently
//! disabled (it prints a diagnostic and returns failure before reaching
//! the dead `realloc` code beneath it), and this port keeps that
//! behaviour rather than resurrecting the growth path. See
//! `SPEC_FULL.md` §4.1 and §9.

use crate::error::{all_empty, bad_arg, empty_depth, format_error, io_failure, Result};
use crate::gfmt::format_g;
use crate::io::{BinaryReader, BinaryWriter};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Fixed depth-dimension size, matching the source's `DEPTH_INCREMENT`.
pub const DEPTH_SIZE: usize = 16;

/// Outcome of an [`OrderedMultisetInt::insert`] / [`OrderedMultisetIntDouble::insert`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    /// A new entry was added.
    Added,
    /// The key was already present; the multiset is unchanged.
    Duplicate,
}

/// Outcome of a `remove` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removed {
    /// An entry was deleted.
    Removed,
    /// The key was not present.
    NotFound,
}

fn check_depth(d: i32) -> Result<usize> {
    if d < 0 {
        return Err(bad_arg(format!("negative depth {d}")));
    }
    let d = d as usize;
    if d >= DEPTH_SIZE {
        return Err(bad_arg(format!(
            "depth {d} exceeds fixed depth dimension {DEPTH_SIZE} (expand_depth is disabled)"
        )));
    }
    Ok(d)
}

fn depth_limit(max_depth: i32) -> usize {
    let cap = DEPTH_SIZE - 1;
    if max_depth >= 0 && (max_depth as usize) < cap {
        max_depth as usize
    } else {
        cap
    }
}

/// Depth-indexed sorted set of unique non-negative integer keys.
///
/// Ported from `multiset_int.c`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderedMultisetInt {
    depths: Vec<Vec<i32>>,
}

impl Default for OrderedMultisetInt {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderedMultisetInt {
    /// Create an empty multiset with the fixed `DEPTH_SIZE` depth dimension.
    #[must_use]
    pub fn new() -> Self {
        Self {
            depths: vec![Vec::new(); DEPTH_SIZE],
        }
    }

    /// Insert `k` at depth `d`.
    pub fn insert(&mut self, d: i32, k: i32) -> Result<Inserted> {
        let d = check_depth(d)?;
        let set = &mut self.depths[d];
        match set.binary_search(&k) {
            Ok(_) => Ok(Inserted::Duplicate),
            Err(pos) => {
                set.insert(pos, k);
                Ok(Inserted::Added)
            }
        }
    }

    /// Remove `k` from depth `d`.
    pub fn remove(&mut self, d: i32, k: i32) -> Result<Removed> {
        let d = check_depth(d)?;
        let set = &mut self.depths[d];
        match set.binary_search(&k) {
            Ok(pos) => {
                set.remove(pos);
                Ok(Removed::Removed)
            }
            Err(_) => Ok(Removed::NotFound),
        }
    }

    /// Whether `k` is present at depth `d`.
    #[must_use]
    pub fn is_element(&self, d: i32, k: i32) -> bool {
        if d < 0 || d as usize >= DEPTH_SIZE {
            return false;
        }
        self.depths[d as usize].binary_search(&k).is_ok()
    }

    /// Number of entries at depth `d`.
    #[must_use]
    pub fn depth_count(&self, d: i32) -> usize {
        if d < 0 || d as usize >= DEPTH_SIZE {
            0
        } else {
            self.depths[d as usize].len()
        }
    }

    /// Total entries across depths `0..=max_depth` (or all depths if negative).
    #[must_use]
    pub fn restricted_total_count(&self, max_depth: i32) -> usize {
        let limit = depth_limit(max_depth);
        self.depths[..=limit].iter().map(Vec::len).sum()
    }

    /// Total entries across every depth.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.restricted_total_count(-1)
    }

    /// Count of non-empty depths within `0..=max_depth`.
    #[must_use]
    pub fn nonempty_count(&self, max_depth: i32) -> usize {
        let limit = depth_limit(max_depth);
        self.depths[..=limit].iter().filter(|s| !s.is_empty()).count()
    }

    /// The `i`-th (0-based) entry at depth `d`, in sorted order.
    pub fn nth_element(&self, d: i32, i: usize) -> Result<i32> {
        let d = check_depth(d)?;
        self.depths[d]
            .get(i)
            .copied()
            .ok_or_else(|| bad_arg(format!("index {i} out of range at depth {d}")))
    }

    /// Choose a non-empty depth in `0..=max_depth` using draw `u`.
    ///
    /// Returns `(depth, ndepths)` where `ndepths` is the number of
    /// non-empty depths considered.
    pub fn choose_depth(&self, u: f64, max_depth: i32) -> Result<(i32, usize)> {
        let limit = depth_limit(max_depth);
        let ndepths = self.nonempty_count(max_depth);
        if ndepths == 0 {
            return Err(all_empty());
        }
        let mut j = (u * ndepths as f64) as usize;
        for (d, set) in self.depths[..=limit].iter().enumerate() {
            if !set.is_empty() {
                if j == 0 {
                    return Ok((d as i32, ndepths));
                }
                j -= 1;
            }
        }
        Err(all_empty())
    }

    /// Choose the `⌊u·n_d⌋`-th entry at depth `d`. Returns `(k, n_d)`.
    pub fn choose_index(&self, d: i32, u: f64) -> Result<(i32, usize)> {
        let dd = check_depth(d)?;
        let n = self.depths[dd].len();
        if n == 0 {
            return Err(empty_depth(d as u32));
        }
        let j = (u * n as f64) as usize;
        Ok((self.depths[dd][j.min(n - 1)], n))
    }

    /// Choose the `⌊u·N⌋`-th entry across depths `0..=max_depth`, scanning
    /// in depth order. Returns `(k, depth, total)`.
    pub fn choose_index_globally(&self, u: f64, max_depth: i32) -> Result<(i32, i32, usize)> {
        let limit = depth_limit(max_depth);
        let total = self.restricted_total_count(max_depth as i32);
        if total == 0 {
            return Err(all_empty());
        }
        let mut j = (u * total as f64) as usize;
        for (d, set) in self.depths[..=limit].iter().enumerate() {
            if j < set.len() {
                return Ok((set[j], d as i32, total));
            }
            j -= set.len();
        }
        Err(all_empty())
    }

    /// Choose a depth with probability proportional to `n_d·(d+1)^alpha`,
    /// then uniformly within that depth. Returns `(k, depth, p)`.
    pub fn choose_index_weighted(
        &self,
        u: f64,
        max_depth: i32,
        alpha: f64,
    ) -> Result<(i32, i32, f64)> {
        let limit = depth_limit(max_depth);
        let sum: f64 = self.depths[..=limit]
            .iter()
            .enumerate()
            .map(|(i, s)| s.len() as f64 * (i as f64 + 1.0).powf(alpha))
            .sum();
        if sum <= 0.0 {
            return Err(all_empty());
        }
        let mut v = sum * u;
        for (d, set) in self.depths[..=limit].iter().enumerate() {
            let dv = set.len() as f64 * (d as f64 + 1.0).powf(alpha);
            if v < dv {
                let n = set.len();
                let j = ((v / dv) * n as f64) as usize;
                let prob = (d as f64 + 1.0).powf(alpha) / sum;
                return Ok((set[j.min(n.saturating_sub(1))], d as i32, prob));
            }
            v -= dv;
        }
        Err(all_empty())
    }

    /// Probability that [`Self::choose_index_weighted`] would have chosen
    /// `(k, d)`.
    pub fn reverse_choose_index_weighted(
        &self,
        max_depth: i32,
        alpha: f64,
        k: i32,
        d: i32,
    ) -> Result<f64> {
        if !self.is_element(d, k) {
            return Err(bad_arg(format!("({d}, {k}) is not an element")));
        }
        let limit = depth_limit(max_depth);
        let sum: f64 = self.depths[..=limit]
            .iter()
            .enumerate()
            .map(|(i, s)| s.len() as f64 * (i as f64 + 1.0).powf(alpha))
            .sum();
        Ok((d as f64 + 1.0).powf(alpha) / sum)
    }

    /// Write the text format: a header count then, per depth, `<d> <n_d>`
    /// followed by `n_d` lines each holding `<k>`.
    pub fn write_text<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(w, "{DEPTH_SIZE}").map_err(|e| io_failure("writing header", e))?;
        for (d, set) in self.depths.iter().enumerate() {
            writeln!(w, "{} {}", d, set.len())
                .map_err(|e| io_failure("writing depth header", e))?;
            for k in set {
                writeln!(w, "{k}").map_err(|e| io_failure("writing entry", e))?;
            }
        }
        Ok(())
    }

    /// Read the text format written by [`Self::write_text`].
    pub fn read_text<R: Read>(r: &mut R) -> Result<Self> {
        let mut text = String::new();
        r.read_to_string(&mut text)
            .map_err(|e| io_failure("reading text multiset", e))?;
        Self::read_text_from_lines(&mut text.lines())
    }

    /// Parse from an already-opened line iterator, consuming only the
    /// lines this multiset's block occupies. Lets callers embed this
    /// format inside a larger multi-section text document (see
    /// `wavetree`'s combined tree persistence) without the whole-file
    /// `read_to_string` a standalone [`Self::read_text`] needs.
    pub fn read_text_from_lines<'a>(lines: &mut impl Iterator<Item = &'a str>) -> Result<Self> {
        let depth_size: usize = lines
            .next()
            .ok_or_else(|| format_error("missing depth_size header"))?
            .trim()
            .parse()
            .map_err(|_| format_error("malformed depth_size header"))?;
        if depth_size != DEPTH_SIZE {
            return Err(format_error(format!(
                "depth_size mismatch: expected {DEPTH_SIZE}, found {depth_size}"
            )));
        }
        let mut out = Self::new();
        for expected_d in 0..DEPTH_SIZE {
            let header = lines
                .next()
                .ok_or_else(|| format_error("missing depth header"))?;
            let mut parts = header.split_whitespace();
            let d: usize = parts
                .next()
                .ok_or_else(|| format_error("missing depth index"))?
                .parse()
                .map_err(|_| format_error("malformed depth index"))?;
            let n: usize = parts
                .next()
                .ok_or_else(|| format_error("missing depth count"))?
                .parse()
                .map_err(|_| format_error("malformed depth count"))?;
            if d != expected_d {
                return Err(format_error("depths out of order"));
            }
            for _ in 0..n {
                let k: i32 = lines
                    .next()
                    .ok_or_else(|| format_error("missing entry"))?
                    .trim()
                    .parse()
                    .map_err(|_| format_error("malformed entry"))?;
                out.depths[d].push(k);
            }
        }
        Ok(out)
    }
}

/// Depth-indexed sorted set of unique `(key, value)` entries, ordered by key.
///
/// Ported from `multiset_int_double.c`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderedMultisetIntDouble {
    depths: Vec<Vec<(i32, f64)>>,
}

impl Default for OrderedMultisetIntDouble {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderedMultisetIntDouble {
    /// Create an empty multiset with the fixed `DEPTH_SIZE` depth dimension.
    #[must_use]
    pub fn new() -> Self {
        Self {
            depths: vec![Vec::new(); DEPTH_SIZE],
        }
    }

    fn search(set: &[(i32, f64)], k: i32) -> std::result::Result<usize, usize> {
        set.binary_search_by_key(&k, |e| e.0)
    }

    /// Insert `(k, v)` at depth `d`. Never attempts to expand the depth
    /// dimension (stricter than [`OrderedMultisetInt::insert`], matching
    /// the source).
    pub fn insert(&mut self, d: i32, k: i32, v: f64) -> Result<Inserted> {
        let d = check_depth(d)?;
        let set = &mut self.depths[d];
        match Self::search(set, k) {
            Ok(_) => Ok(Inserted::Duplicate),
            Err(pos) => {
                set.insert(pos, (k, v));
                Ok(Inserted::Added)
            }
        }
    }

    /// Remove `k` from depth `d`.
    pub fn remove(&mut self, d: i32, k: i32) -> Result<Removed> {
        let d = check_depth(d)?;
        let set = &mut self.depths[d];
        match Self::search(set, k) {
            Ok(pos) => {
                set.remove(pos);
                Ok(Removed::Removed)
            }
            Err(_) => Ok(Removed::NotFound),
        }
    }

    /// Fetch the payload for `(d, k)`.
    pub fn get(&self, d: i32, k: i32) -> Result<f64> {
        let dd = check_depth(d)?;
        Self::search(&self.depths[dd], k)
            .map(|pos| self.depths[dd][pos].1)
            .map_err(|_| bad_arg(format!("({d}, {k}) not found")))
    }

    /// Overwrite the payload for `(d, k)`; fails if absent.
    pub fn set(&mut self, d: i32, k: i32, v: f64) -> Result<()> {
        let dd = check_depth(d)?;
        let pos = Self::search(&self.depths[dd], k)
            .map_err(|_| bad_arg(format!("({d}, {k}) not found")))?;
        self.depths[dd][pos].1 = v;
        Ok(())
    }

    /// Whether `k` is present at depth `d`.
    #[must_use]
    pub fn is_element(&self, d: i32, k: i32) -> bool {
        if d < 0 || d as usize >= DEPTH_SIZE {
            return false;
        }
        Self::search(&self.depths[d as usize], k).is_ok()
    }

    /// Number of entries at depth `d`.
    #[must_use]
    pub fn depth_count(&self, d: i32) -> usize {
        if d < 0 || d as usize >= DEPTH_SIZE {
            0
        } else {
            self.depths[d as usize].len()
        }
    }

    /// Total entries across depths `0..=max_depth` (or all depths if negative).
    #[must_use]
    pub fn restricted_total_count(&self, max_depth: i32) -> usize {
        let limit = depth_limit(max_depth);
        self.depths[..=limit].iter().map(Vec::len).sum()
    }

    /// Total entries across every depth.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.restricted_total_count(-1)
    }

    /// Count of non-empty depths within `0..=max_depth`.
    #[must_use]
    pub fn nonempty_count(&self, max_depth: i32) -> usize {
        let limit = depth_limit(max_depth);
        self.depths[..=limit].iter().filter(|s| !s.is_empty()).count()
    }

    /// The `i`-th (0-based) entry at depth `d`, in key-sorted order.
    pub fn nth_element(&self, d: i32, i: usize) -> Result<(i32, f64)> {
        let d = check_depth(d)?;
        self.depths[d]
            .get(i)
            .copied()
            .ok_or_else(|| bad_arg(format!("index {i} out of range at depth {d}")))
    }

    /// Choose a non-empty depth in `0..=max_depth` using draw `u`.
    pub fn choose_depth(&self, u: f64, max_depth: i32) -> Result<(i32, usize)> {
        let limit = depth_limit(max_depth);
        let ndepths = self.nonempty_count(max_depth);
        if ndepths == 0 {
            return Err(all_empty());
        }
        let mut j = (u * ndepths as f64) as usize;
        for (d, set) in self.depths[..=limit].iter().enumerate() {
            if !set.is_empty() {
                if j == 0 {
                    return Ok((d as i32, ndepths));
                }
                j -= 1;
            }
        }
        Err(all_empty())
    }

    /// Choose the `⌊u·n_d⌋`-th entry at depth `d`. Returns `((k, v), n_d)`.
    pub fn choose_index(&self, d: i32, u: f64) -> Result<((i32, f64), usize)> {
        let dd = check_depth(d)?;
        let n = self.depths[dd].len();
        if n == 0 {
            return Err(empty_depth(d as u32));
        }
        let j = (u * n as f64) as usize;
        Ok((self.depths[dd][j.min(n - 1)], n))
    }

    /// Choose the `⌊u·N⌋`-th entry across depths `0..=max_depth`.
    pub fn choose_index_globally(
        &self,
        u: f64,
        max_depth: i32,
    ) -> Result<((i32, f64), i32, usize)> {
        let limit = depth_limit(max_depth);
        let total = self.restricted_total_count(max_depth);
        if total == 0 {
            return Err(all_empty());
        }
        let mut j = (u * total as f64) as usize;
        for (d, set) in self.depths[..=limit].iter().enumerate() {
            if j < set.len() {
                return Ok((set[j], d as i32, total));
            }
            j -= set.len();
        }
        Err(all_empty())
    }

    /// Choose a depth with probability proportional to `n_d·(d+1)^alpha`,
    /// then uniformly within that depth. Returns `((k, v), depth, p)`.
    pub fn choose_index_weighted(
        &self,
        u: f64,
        max_depth: i32,
        alpha: f64,
    ) -> Result<((i32, f64), i32, f64)> {
        let limit = depth_limit(max_depth);
        let sum: f64 = self.depths[..=limit]
            .iter()
            .enumerate()
            .map(|(i, s)| s.len() as f64 * (i as f64 + 1.0).powf(alpha))
            .sum();
        if sum <= 0.0 {
            return Err(all_empty());
        }
        let mut v = sum * u;
        for (d, set) in self.depths[..=limit].iter().enumerate() {
            let dv = set.len() as f64 * (d as f64 + 1.0).powf(alpha);
            if v < dv {
                let n = set.len();
                let j = ((v / dv) * n as f64) as usize;
                let prob = (d as f64 + 1.0).powf(alpha) / sum;
                return Ok((set[j.min(n.saturating_sub(1))], d as i32, prob));
            }
            v -= dv;
        }
        Err(all_empty())
    }

    /// Probability that [`Self::choose_index_weighted`] would have chosen
    /// `(k, d)`.
    pub fn reverse_choose_index_weighted(
        &self,
        max_depth: i32,
        alpha: f64,
        k: i32,
        d: i32,
    ) -> Result<f64> {
        if !self.is_element(d, k) {
            return Err(bad_arg(format!("({d}, {k}) is not an element")));
        }
        let limit = depth_limit(max_depth);
        let sum: f64 = self.depths[..=limit]
            .iter()
            .enumerate()
            .map(|(i, s)| s.len() as f64 * (i as f64 + 1.0).powf(alpha))
            .sum();
        Ok((d as f64 + 1.0).powf(alpha) / sum)
    }

    /// Write the text format: header count, then per depth `<d> <n_d>`
    /// followed by `n_d` lines each holding `<k> <v>` with `v` in `%.9g`.
    pub fn write_text<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(w, "{DEPTH_SIZE}").map_err(|e| io_failure("writing header", e))?;
        for (d, set) in self.depths.iter().enumerate() {
            writeln!(w, "{} {}", d, set.len())
                .map_err(|e| io_failure("writing depth header", e))?;
            for (k, v) in set {
                writeln!(w, "{k} {}", format_g(*v, 9))
                    .map_err(|e| io_failure("writing entry", e))?;
            }
        }
        Ok(())
    }

    /// Read the text format written by [`Self::write_text`].
    pub fn read_text<R: Read>(r: &mut R) -> Result<Self> {
        let mut text = String::new();
        r.read_to_string(&mut text)
            .map_err(|e| io_failure("reading text multiset", e))?;
        Self::read_text_from_lines(&mut text.lines())
    }

    /// Parse from an already-opened line iterator; see
    /// [`OrderedMultisetInt::read_text_from_lines`] for why this exists
    /// alongside the whole-file [`Self::read_text`].
    pub fn read_text_from_lines<'a>(lines: &mut impl Iterator<Item = &'a str>) -> Result<Self> {
        let depth_size: usize = lines
            .next()
            .ok_or_else(|| format_error("missing depth_size header"))?
            .trim()
            .parse()
            .map_err(|_| format_error("malformed depth_size header"))?;
        if depth_size != DEPTH_SIZE {
            return Err(format_error(format!(
                "depth_size mismatch: expected {DEPTH_SIZE}, found {depth_size}"
            )));
        }
        let mut out = Self::new();
        for expected_d in 0..DEPTH_SIZE {
            let header = lines
                .next()
                .ok_or_else(|| format_error("missing depth header"))?;
            let mut parts = header.split_whitespace();
            let d: usize = parts
                .next()
                .ok_or_else(|| format_error("missing depth index"))?
                .parse()
                .map_err(|_| format_error("malformed depth index"))?;
            let n: usize = parts
                .next()
                .ok_or_else(|| format_error("missing depth count"))?
                .parse()
                .map_err(|_| format_error("malformed depth count"))?;
            if d != expected_d {
                return Err(format_error("depths out of order"));
            }
            for _ in 0..n {
                let line = lines
                    .next()
                    .ok_or_else(|| format_error("missing entry"))?;
                let mut parts = line.split_whitespace();
                let k: i32 = parts
                    .next()
                    .ok_or_else(|| format_error("missing key"))?
                    .parse()
                    .map_err(|_| format_error("malformed key"))?;
                let v: f64 = parts
                    .next()
                    .ok_or_else(|| format_error("missing value"))?
                    .parse()
                    .map_err(|_| format_error("malformed value"))?;
                out.depths[d].push((k, v));
            }
        }
        Ok(out)
    }

    /// Binary encoding used by chain history and tree persistence:
    /// `int32 depth_size` then per depth `(d: int32, n_d: int32)`
    /// followed by `n_d` entries of `(index: int32, value: float64)`.
    pub fn write_binary<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_i32(DEPTH_SIZE as i32)?;
        for (d, set) in self.depths.iter().enumerate() {
            w.write_i32(d as i32)?;
            w.write_i32(set.len() as i32)?;
            for (k, v) in set {
                w.write_i32(*k)?;
                w.write_f64(*v)?;
            }
        }
        Ok(())
    }

    /// Read the binary encoding written by [`Self::write_binary`]. Fails
    /// with a format error if `depth_size` exceeds the
    /// fixed dimension, matching the source's hard rejection (no
    /// truncation tolerance here; that is specific to chain history).
    pub fn read_binary<R: Read>(r: &mut R) -> Result<Self> {
        let depth_size = r.read_i32()?;
        if depth_size < 0 || depth_size as usize > DEPTH_SIZE {
            return Err(format_error(format!(
                "invalid depth_size {depth_size} (max {DEPTH_SIZE})"
            )));
        }
        let mut out = Self::new();
        for expected_d in 0..depth_size {
            let d = r.read_i32()?;
            if d != expected_d {
                return Err(format_error("depths out of order"));
            }
            let n = r.read_i32()?;
            if n < 0 {
                return Err(format_error("negative entry count"));
            }
            let set = &mut out.depths[d as usize];
            for _ in 0..n {
                let k = r.read_i32()?;
                let v = r.read_f64()?;
                set.push((k, v));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn insert_is_sorted_and_deduplicated() {
        let mut s = OrderedMultisetInt::new();
        assert_eq!(s.insert(2, 9).unwrap(), Inserted::Added);
        assert_eq!(s.insert(2, 4).unwrap(), Inserted::Added);
        assert_eq!(s.insert(2, 9).unwrap(), Inserted::Duplicate);
        assert_eq!(s.nth_element(2, 0).unwrap(), 4);
        assert_eq!(s.nth_element(2, 1).unwrap(), 9);
    }

    #[test]
    fn depth_at_or_beyond_fixed_size_is_bad_arg() {
        let mut s = OrderedMultisetInt::new();
        assert!(s.insert(DEPTH_SIZE as i32, 0).is_err());
    }

    #[test]
    fn choose_depth_matches_literal_scenario() {
        // indices=[9,4,7,8,1,3,6], depths=[3,1,2,2,1,1,2]
        let mut s = OrderedMultisetIntDouble::new();
        let indices = [9, 4, 7, 8, 1, 3, 6];
        let depths = [3, 1, 2, 2, 1, 1, 2];
        let values = [0.5, 0.25, 0.33, 0.11, 0.78, 0.2, 0.6];
        for i in 0..indices.len() {
            s.insert(depths[i], indices[i], values[i]).unwrap();
        }

        let (d, n) = s.choose_depth(0.0, 5).unwrap();
        assert_eq!((d, n), (1, 3));
        let (d, n) = s.choose_depth(0.34, 5).unwrap();
        assert_eq!((d, n), (2, 3));
        let (d, n) = s.choose_depth(0.67, 5).unwrap();
        assert_eq!((d, n), (3, 3));

        let (d, n) = s.choose_depth(0.0, 2).unwrap();
        assert_eq!((d, n), (1, 2));
        let (d, n) = s.choose_depth(0.34, 2).unwrap();
        assert_eq!((d, n), (1, 2));
        let (d, n) = s.choose_depth(0.67, 2).unwrap();
        assert_eq!((d, n), (2, 2));
    }

    #[test]
    fn binary_roundtrip_preserves_values_exactly() {
        let mut s = OrderedMultisetIntDouble::new();
        let indices = [9, 4, 7, 8, 1, 3, 6];
        let depths = [3, 1, 2, 2, 1, 1, 2];
        let values = [0.5, 0.25, 0.33, 0.11, 0.78, 0.2, 0.6];
        for i in 0..indices.len() {
            s.insert(depths[i], indices[i], values[i]).unwrap();
        }

        let mut buf = Vec::new();
        s.write_binary(&mut buf).unwrap();
        let back = OrderedMultisetIntDouble::read_binary(&mut Cursor::new(buf)).unwrap();

        for i in 0..indices.len() {
            assert_eq!(back.get(depths[i], indices[i]).unwrap(), values[i]);
        }
    }

    #[test]
    fn text_roundtrip() {
        let mut s = OrderedMultisetInt::new();
        s.insert(0, 0).unwrap();
        s.insert(1, 5).unwrap();
        s.insert(1, 2).unwrap();

        let mut buf = Vec::new();
        s.write_text(&mut buf).unwrap();
        let back = OrderedMultisetInt::read_text(&mut Cursor::new(buf)).unwrap();
        assert!(back.is_element(0, 0));
        assert!(back.is_element(1, 5));
        assert!(back.is_element(1, 2));
        assert_eq!(back.total_count(), 3);
    }

    #[test]
    fn empty_chooser_fails_all_empty() {
        let s = OrderedMultisetInt::new();
        assert!(s.choose_depth(0.5, -1).is_err());
    }
}
