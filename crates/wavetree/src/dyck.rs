//! Dyck-word / packed-binary tree fingerprinting.
//!
//! Ported from `wavetree2d_sub.c`'s (and `wavetree3d_sub.c`'s)
//! `r_generate_dyck_word` / `r_generate_dyck_binary` /
//! `db_open` / `db_close` / `db_leaf`. The source only defines this
//! for the regular dyadic grids, never for the sphere variants, so
//! this port is `Rect2D`/`Rect3D`-specific rather than a generic
//! `Topology` method.
//!
//! The binary and textual encodings are NOT the same traversal with
//! two output formats — the source's two recursive functions differ
//! in how they treat a structurally-absent child slot (out of bounds,
//! or the root's missing `TL`/`UTL` quadrant):
//!
//! - `r_generate_dyck_binary` emits `db_leaf` (open then close) for
//!   every missing slot, *except* the node's own index is `0` and the
//!   slot is `TL`/`UTL` (and, mirroring the source's `LTL` guard for
//!   the 3D case, `LTL`), which contribute nothing at all.
//! - `r_generate_dyck_word` never emits a placeholder for a
//!   structurally-absent slot; it only recurses into slots that exist,
//!   and a `.` appears when that recursive call lands on an inactive
//!   node.
//!
//! `db_open` only advances the bit cursor (an open paren is an
//! implicit `0` bit); `db_close` sets the bit at the current cursor
//! position before advancing. Bit 0 of the packed integer is therefore
//! the FIRST event emitted, not the last: LSB-first, not the MSB-first
//! convention a left-to-right reading of the word would suggest.

use crate::rect::{Rect2D, Rect3D};
use crate::tree::Wavetree;

struct Cursor {
    bits: u64,
    len: u32,
}

impl Cursor {
    const fn new() -> Self {
        Self { bits: 0, len: 0 }
    }

    fn open(&mut self) {
        if self.len < 64 {
            self.len += 1;
        }
    }

    fn close(&mut self) {
        if self.len < 64 {
            self.bits |= 1u64 << self.len;
            self.len += 1;
        }
    }

    fn leaf(&mut self) {
        self.open();
        self.close();
    }
}

fn walk_binary_2d(tree: &Wavetree<Rect2D>, depth: u32, index: i32, cur: &mut Cursor) {
    if !tree.s_v().is_element(depth as i32, index) {
        cur.leaf();
        return;
    }
    cur.open();
    for (slot, child) in tree.topology().quadrants(index).into_iter().enumerate() {
        if child > 0 {
            walk_binary_2d(tree, depth + 1, child, cur);
        } else if slot != 0 || index != 0 {
            // slot 0 is TL; the root's missing TL is a self-loop, not
            // a real absent quadrant, and contributes nothing.
            cur.leaf();
        }
    }
    cur.close();
}

fn walk_binary_3d(tree: &Wavetree<Rect3D>, depth: u32, index: i32, cur: &mut Cursor) {
    if !tree.s_v().is_element(depth as i32, index) {
        cur.leaf();
        return;
    }
    cur.open();
    for (slot, child) in tree.topology().octants(index).into_iter().enumerate() {
        if child > 0 {
            walk_binary_3d(tree, depth + 1, child, cur);
        } else if (slot != 0 && slot != 4) || index != 0 {
            // slots 0 (UTL) and 4 (LTL) get the source's root-self-loop
            // guard; every other slot always gets a leaf.
            cur.leaf();
        }
    }
    cur.close();
}

fn walk_word_2d(tree: &Wavetree<Rect2D>, depth: u32, index: i32, word: &mut String) {
    if !tree.s_v().is_element(depth as i32, index) {
        word.push('.');
        return;
    }
    word.push('(');
    for child in tree.topology().quadrants(index) {
        if child > 0 {
            walk_word_2d(tree, depth + 1, child, word);
        }
    }
    word.push(')');
}

fn walk_word_3d(tree: &Wavetree<Rect3D>, depth: u32, index: i32, word: &mut String) {
    if !tree.s_v().is_element(depth as i32, index) {
        word.push('.');
        return;
    }
    word.push('(');
    for child in tree.topology().octants(index) {
        if child > 0 {
            walk_word_3d(tree, depth + 1, child, word);
        }
    }
    word.push(')');
}

/// Packed 64-bit Dyck fingerprint of a [`Rect2D`] tree.
#[must_use]
pub fn generate_dyck_binary_2d(tree: &Wavetree<Rect2D>) -> u64 {
    let mut cur = Cursor::new();
    walk_binary_2d(tree, 0, 0, &mut cur);
    cur.bits
}

/// Textual Dyck word of a [`Rect2D`] tree: `(`/`)` per node, `.` per
/// structurally-present-but-inactive child.
#[must_use]
pub fn generate_dyck_word_2d(tree: &Wavetree<Rect2D>) -> String {
    let mut word = String::new();
    walk_word_2d(tree, 0, 0, &mut word);
    word
}

/// Packed 64-bit Dyck fingerprint of a [`Rect3D`] tree.
#[must_use]
pub fn generate_dyck_binary_3d(tree: &Wavetree<Rect3D>) -> u64 {
    let mut cur = Cursor::new();
    walk_binary_3d(tree, 0, 0, &mut cur);
    cur.bits
}

/// Textual Dyck word of a [`Rect3D`] tree.
#[must_use]
pub fn generate_dyck_word_3d(tree: &Wavetree<Rect3D>) -> String {
    let mut word = String::new();
    walk_word_3d(tree, 0, 0, &mut word);
    word
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::Rect2D;

    fn tree_with(births: &[(u32, i32, f64)]) -> Wavetree<Rect2D> {
        let mut t = Wavetree::new(Rect2D::new(6, 6), 0.0);
        t.initialize(0.0).unwrap();
        for &(d, i, v) in births {
            t.propose_birth(d, i, v).unwrap();
            t.commit().unwrap();
        }
        t
    }

    #[test]
    fn identical_topology_yields_identical_word() {
        let a = tree_with(&[(1, 1, 1.0), (2, 2, -1.0)]);
        let b = tree_with(&[(2, 2, 9.0), (1, 1, 2.0)]);
        assert_eq!(generate_dyck_word_2d(&a), generate_dyck_word_2d(&b));
        assert_eq!(generate_dyck_binary_2d(&a), generate_dyck_binary_2d(&b));
    }

    #[test]
    fn differing_active_sets_yield_differing_output() {
        let a = tree_with(&[(1, 1, 1.0)]);
        let b = tree_with(&[(1, 128, 1.0)]);
        assert_ne!(generate_dyck_word_2d(&a), generate_dyck_word_2d(&b));
        assert_ne!(generate_dyck_binary_2d(&a), generate_dyck_binary_2d(&b));
    }

    #[test]
    fn empty_tree_is_a_single_balanced_pair() {
        let mut t = Wavetree::new(Rect2D::new(2, 2), 0.0);
        t.initialize(0.0).unwrap();
        let word = generate_dyck_word_2d(&t);
        assert_eq!(word.matches('(').count(), word.matches(')').count());
        assert!(word.starts_with('('));
        assert!(word.ends_with(')'));
    }

    /// The literal "Rect2D birth/undo/commit" scenario from spec.md §8:
    /// a 128x128 grid (`degree_w = degree_h = 7`), `alpha = 0`.
    /// Note the scenario's argument order is `(index, depth, value)`,
    /// the opposite of this crate's `propose_birth(depth, index, value)`.
    #[test]
    fn literal_birth_undo_commit_scenario_matches_spec_hex_constant() {
        let mut t = Wavetree::new(Rect2D::new(7, 7), 0.0);
        t.initialize(0.0).unwrap();
        t.propose_birth(1, 1, 1.0).unwrap();
        t.commit().unwrap();
        t.propose_birth(2, 2, 2.0).unwrap();
        t.undo().unwrap();
        t.propose_birth(2, 3, 3.0).unwrap();
        t.commit().unwrap();

        assert_eq!(t.coeff_count(), 3);
        assert_eq!(generate_dyck_binary_2d(&t), 0xd6b548);
    }
}
