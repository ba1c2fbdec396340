//! Tree (de)serialisation: the text format (`wavetree_save`/`wavetree_load`
//! in the source) and the binary format (`wavetree_save_promotion`-style
//! compact encoding) described in `SPEC_FULL.md` §6.1/§6.2.
//!
//! Text keeps all three companion sets explicit — `S_v`, `S_b`, `S_d` each
//! write/read their own block via `wavetree_core`'s multiset text codec, one
//! after another on a shared line stream. Binary keeps only `S_v`: the
//! companion sets are rebuilt by replaying every entry as a birth, in the
//! depth-major/index-ascending order the wire format already guarantees,
//! with the root record (mandatorily first) seeding `initialize` instead.

use std::io::{Read, Write};

use wavetree_core::{
    format_error, format_g, io_failure, BinaryReader, BinaryWriter, OrderedMultisetInt,
    OrderedMultisetIntDouble, Result,
};

use crate::topology::Topology;
use crate::tree::Wavetree;

fn parse_ints(line: &str) -> Result<Vec<i32>> {
    line.split_whitespace()
        .map(|t| {
            t.parse()
                .map_err(|_| format_error(format!("malformed integer {t:?}")))
        })
        .collect()
}

/// Write the text format: `<degree...>` line, `<dims... N_total>` line,
/// `<alpha>` line, then `S_v`/`S_b`/`S_d` each in their own multiset block.
///
/// `degree` and `dims` are caller-supplied header metadata (the source's
/// `degree_w`/`degree_h`[/`degree_d`] and `W`/`H`[/`Z`] fields) since no
/// single field on `T: Topology` captures both a per-axis degree and a
/// per-axis extent across all five domain shapes.
pub fn write_text<T: Topology, W: Write>(
    tree: &Wavetree<T>,
    degree: &[i32],
    dims: &[i32],
    w: &mut W,
) -> Result<()> {
    tracing::debug!(coeff_count = tree.coeff_count(), ?degree, ?dims, "writing text tree");
    let degree_line = degree.iter().map(i32::to_string).collect::<Vec<_>>().join(" ");
    writeln!(w, "{degree_line}").map_err(|e| io_failure("writing degree header", e))?;

    let n_total = tree.topology().array_len() as i32;
    let dims_line = dims
        .iter()
        .map(i32::to_string)
        .chain(std::iter::once(n_total.to_string()))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(w, "{dims_line}").map_err(|e| io_failure("writing dims header", e))?;

    writeln!(w, "{}", format_g(tree.alpha(), 10))
        .map_err(|e| io_failure("writing alpha", e))?;

    tree.s_v().write_text(w)?;
    tree.s_b().write_text(w)?;
    tree.s_d().write_text(w)?;
    Ok(())
}

/// Parsed text-format header, returned alongside the hydrated tree so the
/// caller can check it against the geometry it expected.
#[derive(Debug, Clone, PartialEq)]
pub struct TextHeader {
    /// Per-axis degree fields (`degree_w`, `degree_h`, `[degree_d]`).
    pub degree: Vec<i32>,
    /// Per-axis extent fields (`W`, `H`, `[Z]`), not including `N_total`.
    pub dims: Vec<i32>,
    /// The trailing `N_total` field on the dims line.
    pub n_total: i32,
}

/// Read the text format written by [`write_text`].
///
/// `ndims` is the number of per-axis fields to expect on each header line
/// (2 for a rectangular/spherical 2D domain, 3 for 3D).
pub fn read_text<T: Topology, R: Read>(
    topology: T,
    ndims: usize,
    r: &mut R,
) -> Result<(Wavetree<T>, TextHeader)> {
    let mut text = String::new();
    r.read_to_string(&mut text)
        .map_err(|e| io_failure("reading text tree", e))?;
    let mut lines = text.lines();

    let degree_line = lines
        .next()
        .ok_or_else(|| format_error("missing degree header"))?;
    let degree = parse_ints(degree_line)?;
    if degree.len() != ndims {
        return Err(format_error(format!(
            "expected {ndims} degree fields, found {}",
            degree.len()
        )));
    }

    let dims_line = lines
        .next()
        .ok_or_else(|| format_error("missing dims header"))?;
    let mut dims = parse_ints(dims_line)?;
    if dims.len() != ndims + 1 {
        return Err(format_error(format!(
            "expected {} dims fields, found {}",
            ndims + 1,
            dims.len()
        )));
    }
    let n_total = dims.pop().expect("checked length above");

    let alpha_line = lines
        .next()
        .ok_or_else(|| format_error("missing alpha"))?;
    let alpha: f64 = alpha_line
        .trim()
        .parse()
        .map_err(|_| format_error("malformed alpha"))?;

    let s_v = OrderedMultisetIntDouble::read_text_from_lines(&mut lines)?;
    let s_b = OrderedMultisetInt::read_text_from_lines(&mut lines)?;
    let s_d = OrderedMultisetInt::read_text_from_lines(&mut lines)?;

    if !s_v.is_element(0, 0) {
        return Err(format_error(
            "persisted S_v is missing the root coefficient",
        ));
    }

    let tree = Wavetree::from_parts(topology, alpha, s_v, s_b, s_d);
    tracing::debug!(coeff_count = tree.coeff_count(), "read text tree");
    Ok((
        tree,
        TextHeader {
            degree,
            dims,
            n_total,
        },
    ))
}

/// Write the binary format: `<degree...>` as little-endian `i32`s, then
/// `alpha` as `f64`, then `n_active` as `i32`, then every active
/// coefficient as `(depth: i32, index: i32, value: f64)` in depth-major,
/// index-ascending order. The root is naturally first in that ordering.
pub fn write_binary<T: Topology, W: Write>(
    tree: &Wavetree<T>,
    degree: &[i32],
    w: &mut W,
) -> Result<()> {
    tracing::debug!(coeff_count = tree.coeff_count(), ?degree, "writing binary tree");
    for &d in degree {
        w.write_i32(d)?;
    }
    w.write_f64(tree.alpha())?;
    w.write_i32(tree.coeff_count() as i32)?;

    let mut write_err = None;
    tree.for_each_active(|depth, index, value| {
        if write_err.is_some() {
            return;
        }
        if let Err(e) = w
            .write_i32(depth as i32)
            .and_then(|()| w.write_i32(index))
            .and_then(|()| w.write_f64(value))
        {
            write_err = Some(e);
        }
    });
    if let Some(e) = write_err {
        return Err(e);
    }
    Ok(())
}

/// Read the binary format written by [`write_binary`]. Rejects a header
/// that does not match `expected_degree`, and any stream whose first
/// record is not `(0, 0, _)` — the mandatory root.
pub fn read_binary<T: Topology, R: Read>(
    topology: T,
    expected_degree: &[i32],
    r: &mut R,
) -> Result<Wavetree<T>> {
    let mut degree = Vec::with_capacity(expected_degree.len());
    for _ in 0..expected_degree.len() {
        degree.push(r.read_i32()?);
    }
    if degree != expected_degree {
        return Err(format_error(format!(
            "degree header mismatch: expected {expected_degree:?}, found {degree:?}"
        )));
    }

    let alpha = r.read_f64()?;
    let n_active = r.read_i32()?;
    if n_active <= 0 {
        return Err(format_error(
            "stream omits the mandatory root record",
        ));
    }

    let root_depth = r.read_i32()?;
    let root_index = r.read_i32()?;
    let root_value = r.read_f64()?;
    if root_depth != 0 || root_index != 0 {
        return Err(format_error(
            "first record is not the root coefficient (0, 0)",
        ));
    }

    let mut rest = Vec::with_capacity(n_active as usize - 1);
    for _ in 1..n_active {
        let d = r.read_i32()?;
        let i = r.read_i32()?;
        let v = r.read_f64()?;
        rest.push((d as u32, i, v));
    }

    let mut tree = Wavetree::new(topology, alpha);
    tree.rebuild_from_active(root_value, &rest)?;
    tracing::debug!(coeff_count = tree.coeff_count(), "read binary tree");
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::Rect2D;
    use std::io::Cursor;

    // A 2x2 grid: `degree_width = degree_height = 1`, so `array_len() == 4`
    // and the root's three quadrant children are indices 1, 2, 3.
    fn sample_tree() -> Wavetree<Rect2D> {
        let mut t = Wavetree::new(Rect2D::new(1, 1), 0.0);
        t.initialize(1.0).unwrap();
        t.propose_birth(1, 1, 2.0).unwrap();
        t.commit().unwrap();
        t.propose_birth(1, 3, -1.5).unwrap();
        t.commit().unwrap();
        t
    }

    #[test]
    fn text_roundtrip_preserves_all_three_sets() {
        let t = sample_tree();
        let mut buf = Vec::new();
        write_text(&t, &[1, 1], &[2, 2], &mut buf).unwrap();

        let (back, header) = read_text(Rect2D::new(1, 1), 2, &mut Cursor::new(buf)).unwrap();
        assert_eq!(header.degree, vec![1, 1]);
        assert_eq!(header.n_total, 4);
        assert_eq!(back.coeff_count(), t.coeff_count());
        assert!(back.s_v().is_element(1, 1));
        assert!(back.s_v().is_element(1, 3));
        assert_eq!(back.s_b().depth_count(1), t.s_b().depth_count(1));
        assert_eq!(back.s_d().depth_count(1), t.s_d().depth_count(1));
        assert!(back.valid());
    }

    #[test]
    fn binary_roundtrip_rebuilds_companion_sets() {
        let t = sample_tree();
        let mut buf = Vec::new();
        write_binary(&t, &[1, 1], &mut buf).unwrap();

        let back = read_binary(Rect2D::new(1, 1), &[1, 1], &mut Cursor::new(buf)).unwrap();
        assert_eq!(back.coeff_count(), t.coeff_count());
        assert!(back.s_v().is_element(1, 1));
        assert!(back.s_v().is_element(1, 3));
        assert!(back.valid());

        let mut expected_arr = vec![0.0; 4];
        t.map_to_array(&mut expected_arr).unwrap();
        let mut back_arr = vec![0.0; 4];
        back.map_to_array(&mut back_arr).unwrap();
        assert_eq!(expected_arr, back_arr);
    }

    #[test]
    fn binary_rejects_degree_mismatch() {
        let t = sample_tree();
        let mut buf = Vec::new();
        write_binary(&t, &[1, 1], &mut buf).unwrap();
        let err = read_binary(Rect2D::new(1, 1), &[3, 3], &mut Cursor::new(buf)).unwrap_err();
        assert!(err.to_string().contains("format error"));
    }

    #[test]
    fn binary_rejects_stream_missing_root() {
        let mut buf = Vec::new();
        buf.write_i32(1).unwrap();
        buf.write_i32(1).unwrap();
        buf.write_f64(0.0).unwrap();
        buf.write_i32(0).unwrap();
        let err = read_binary(Rect2D::new(1, 1), &[1, 1], &mut Cursor::new(buf)).unwrap_err();
        assert!(err.to_string().contains("format error"));
    }
}
