//! # Selection Module
//!
//! A compiled query language for describing sets of atoms, bonds, angles,
//! and dihedrals inside a [`Frame`].
//!
//! ## Overview
//!
//! A selection string like `"name O and mass > 10"` is compiled once by
//! [`Selection::new`] into an immutable expression tree, then evaluated
//! against any number of frames with [`Selection::evaluate`]. Predicates
//! may bind up to four atoms at once through `(n)` argument suffixes
//! (`"name(1) H and name(2) O"`), which switches candidate generation from
//! single atoms to topology-declared bonds, angles, or dihedrals.
//!
//! Compilation errors ([`SelectionError`]) carry the byte offset of the
//! offending input. Evaluation never fails: properties that do not apply
//! (for instance `resid` on an atom outside any residue) make the enclosing
//! predicate false instead.
//!
//! ```ignore
//! let selection = Selection::new("name(1) H and name(2) O")?;
//! assert_eq!(selection.arity(), 2);
//! for matched in selection.evaluate(&frame) {
//!     println!("H {} bonded to O {}", matched[0], matched[1]);
//! }
//! ```

pub mod error;
pub mod expr;

mod lexer;
mod parser;

pub use error::{LexErrorKind, SelectionError, SyntaxErrorKind};
pub use expr::Selector;

use crate::core::models::frame::Frame;
use std::fmt;
use std::str::FromStr;

/// The maximum number of atoms a selection predicate can bind at once.
pub const MAX_ARITY: usize = 4;

/// An ordered tuple of atom indices bound by a selection predicate.
///
/// Slot `k` corresponds to argument index `k`: in a match produced by
/// `"name(1) H and name(2) O"`, slot 0 is the hydrogen and slot 1 the
/// oxygen. A match always has exactly as many slots as the arity of the
/// selection that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Match {
    // unused slots stay zero so the derived comparisons are well defined
    atoms: [usize; MAX_ARITY],
    size: usize,
}

impl Match {
    /// Creates a match from 1 to [`MAX_ARITY`] atom indices.
    ///
    /// # Panics
    ///
    /// Panics if `indices` is empty or holds more than [`MAX_ARITY`]
    /// values.
    pub fn new(indices: &[usize]) -> Self {
        assert!(
            !indices.is_empty() && indices.len() <= MAX_ARITY,
            "a match must contain between 1 and {MAX_ARITY} atoms"
        );
        let mut atoms = [0; MAX_ARITY];
        atoms[..indices.len()].copy_from_slice(indices);
        Match {
            atoms,
            size: indices.len(),
        }
    }

    /// Returns the number of atoms in this match.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns whether the match holds no atoms (never true for matches
    /// produced by a selection).
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the atom index in slot `slot`, or `None` past the end.
    pub fn get(&self, slot: usize) -> Option<usize> {
        self.as_slice().get(slot).copied()
    }

    /// Returns the bound atom indices, in slot order.
    pub fn as_slice(&self) -> &[usize] {
        &self.atoms[..self.size]
    }

    /// Iterates over the bound atom indices, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.as_slice().iter().copied()
    }
}

impl std::ops::Index<usize> for Match {
    type Output = usize;
    fn index(&self, slot: usize) -> &usize {
        &self.as_slice()[slot]
    }
}

impl<const N: usize> From<[usize; N]> for Match {
    fn from(indices: [usize; N]) -> Self {
        Match::new(&indices)
    }
}

/// A compiled selection.
///
/// Holds the predicate tree, the arity derived from it, and the original
/// source text. Immutable after construction; evaluating it never mutates
/// anything, so a `Selection` can be shared freely across threads.
#[derive(Debug, Clone)]
pub struct Selection {
    ast: Selector,
    arity: usize,
    source: String,
}

impl Selection {
    /// Compiles a selection string.
    ///
    /// The arity is the highest argument index referenced in the string
    /// (`name(3)` gives 3), or 1 when no explicit binding is present.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectionError`] when the string does not lex or parse;
    /// no partial selection is ever produced.
    pub fn new(selection: &str) -> Result<Self, SelectionError> {
        let tokens = lexer::tokenize(selection)?;
        let ast = parser::parse(tokens, selection.len())?;
        let arity = ast.max_argument() + 1;
        debug_assert!(arity <= MAX_ARITY);
        Ok(Selection {
            ast,
            arity,
            source: selection.to_string(),
        })
    }

    /// The number of atoms this selection binds in each match.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The source string this selection was compiled from.
    pub fn string(&self) -> &str {
        &self.source
    }

    /// Evaluates the selection against a frame.
    ///
    /// Candidates are derived from the frame topology according to the
    /// arity: every atom (arity 1), every bond (arity 2), angle (3), or
    /// dihedral (4), the tuples being tested in both their canonical and
    /// reversed orderings since argument binding is order sensitive. The
    /// returned matches preserve candidate order and are deterministic for
    /// a given frame.
    pub fn evaluate(&self, frame: &Frame) -> Vec<Match> {
        candidates(frame, self.arity)
            .into_iter()
            .filter(|candidate| self.ast.is_match(frame, candidate))
            .collect()
    }

    /// Evaluates an arity-1 selection to a plain list of atom indices.
    ///
    /// Returns `None` for selections with arity above 1, where a match is
    /// more than a single atom.
    pub fn list(&self, frame: &Frame) -> Option<Vec<usize>> {
        if self.arity != 1 {
            return None;
        }
        Some(
            self.evaluate(frame)
                .into_iter()
                .map(|matched| matched[0])
                .collect(),
        )
    }
}

impl fmt::Display for Selection {
    /// Prints a deterministic reconstruction of the compiled tree. The
    /// output may differ from the source string but re-parses to an
    /// equivalent selection.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ast)
    }
}

impl FromStr for Selection {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selection::new(s)
    }
}

/// Enumerates the candidate tuples for a given arity, from the frame
/// topology rather than the full cross product of atoms.
fn candidates(frame: &Frame, arity: usize) -> Vec<Match> {
    match arity {
        1 => (0..frame.size()).map(|i| Match::from([i])).collect(),
        2 => {
            let mut candidates = Vec::new();
            for bond in frame.topology().bonds() {
                candidates.push(Match::from([bond[0], bond[1]]));
                if bond[0] != bond[1] {
                    candidates.push(Match::from([bond[1], bond[0]]));
                }
            }
            candidates
        }
        3 => {
            let mut candidates = Vec::new();
            for angle in frame.topology().angles() {
                candidates.push(Match::from([angle[0], angle[1], angle[2]]));
                if angle[0] != angle[2] {
                    candidates.push(Match::from([angle[2], angle[1], angle[0]]));
                }
            }
            candidates
        }
        4 => {
            let mut candidates = Vec::new();
            for dihedral in frame.topology().dihedrals() {
                let forward = [dihedral[0], dihedral[1], dihedral[2], dihedral[3]];
                let backward = [dihedral[3], dihedral[2], dihedral[1], dihedral[0]];
                candidates.push(Match::from(forward));
                if forward != backward {
                    candidates.push(Match::from(backward));
                }
            }
            candidates
        }
        _ => unreachable!("selection arity is always between 1 and {MAX_ARITY}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::residue::Residue;

    fn water() -> Frame {
        let mut frame = Frame::new();
        frame.add_atom(Atom::new("O"));
        frame.add_atom(Atom::new("H"));
        frame.add_atom(Atom::new("H"));
        frame.add_bond(0, 1).unwrap();
        frame.add_bond(0, 2).unwrap();
        frame
    }

    fn chain(names: &[&str]) -> Frame {
        let mut frame = Frame::new();
        for name in names {
            frame.add_atom(Atom::new(name));
        }
        for i in 1..names.len() {
            frame.add_bond(i - 1, i).unwrap();
        }
        frame
    }

    fn matches(selection: &str, frame: &Frame) -> Vec<Vec<usize>> {
        Selection::new(selection)
            .unwrap()
            .evaluate(frame)
            .into_iter()
            .map(|matched| matched.as_slice().to_vec())
            .collect()
    }

    #[test]
    fn match_slots_are_ordered_and_indexable() {
        let matched = Match::from([4, 2]);
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0], 4);
        assert_eq!(matched[1], 2);
        assert_eq!(matched.get(2), None);
        assert_eq!(matched.iter().collect::<Vec<_>>(), vec![4, 2]);
    }

    #[test]
    #[should_panic(expected = "between 1 and 4")]
    fn oversized_match_panics() {
        Match::new(&[0, 1, 2, 3, 4]);
    }

    #[test]
    fn arity_defaults_to_one_and_follows_bindings() {
        assert_eq!(Selection::new("all").unwrap().arity(), 1);
        assert_eq!(Selection::new("name O").unwrap().arity(), 1);
        assert_eq!(Selection::new("name(2) O").unwrap().arity(), 2);
        assert_eq!(
            Selection::new("name(1) H and name(4) O").unwrap().arity(),
            4
        );
        assert_eq!(Selection::new("mass(3) > 2").unwrap().arity(), 3);
    }

    #[test]
    fn all_matches_every_atom_in_order() {
        let frame = water();
        assert_eq!(matches("all", &frame), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn none_matches_nothing() {
        let frame = water();
        assert!(matches("none", &frame).is_empty());
    }

    #[test]
    fn string_selection_on_water() {
        let frame = water();
        assert_eq!(matches("name O", &frame), vec![vec![0]]);
        assert_eq!(matches("name H", &frame), vec![vec![1], vec![2]]);
        assert_eq!(matches("not name O", &frame), vec![vec![1], vec![2]]);
    }

    #[test]
    fn index_comparisons_on_a_five_atom_frame() {
        let frame = chain(&["C", "C", "C", "C", "C"]);
        assert_eq!(matches("index < 2", &frame), vec![vec![0], vec![1]]);
        assert_eq!(matches("index >= 3", &frame), vec![vec![3], vec![4]]);
    }

    #[test]
    fn bond_selection_is_order_sensitive() {
        // single H-O bond; the hydrogen is atom 1, the oxygen atom 0
        let mut frame = Frame::new();
        frame.add_atom(Atom::new("O"));
        frame.add_atom(Atom::new("H"));
        frame.add_bond(1, 0).unwrap();

        assert_eq!(
            matches("name(1) H and name(2) O", &frame),
            vec![vec![1, 0]]
        );
        assert_eq!(
            matches("name(1) O and name(2) H", &frame),
            vec![vec![0, 1]]
        );
    }

    #[test]
    fn bond_candidates_test_both_orderings() {
        let frame = water();
        // every bond twice, once per direction
        assert_eq!(
            matches("all", &frame).len(),
            3 // arity 1: atoms
        );
        let bonds = matches("name(1) H or name(2) H", &frame);
        assert_eq!(
            bonds,
            vec![vec![0, 1], vec![1, 0], vec![0, 2], vec![2, 0]]
        );
    }

    #[test]
    fn angle_selection_follows_the_topology() {
        let frame = chain(&["C", "O", "H"]);
        // one angle, both orderings
        assert_eq!(
            matches("name(1) C and name(3) H", &frame),
            vec![vec![0, 1, 2]]
        );
        assert_eq!(
            matches("name(1) H and name(3) C", &frame),
            vec![vec![2, 1, 0]]
        );
        assert_eq!(matches("name(2) O and all", &frame).len(), 2);
    }

    #[test]
    fn dihedral_selection_follows_the_topology() {
        let frame = chain(&["N", "C", "C", "O"]);
        assert_eq!(
            matches("name(1) N and name(4) O", &frame),
            vec![vec![0, 1, 2, 3]]
        );
        assert_eq!(
            matches("name(1) O and name(4) N", &frame),
            vec![vec![3, 2, 1, 0]]
        );
    }

    #[test]
    fn mass_and_name_combine() {
        let mut frame = water();
        frame.add_atom(Atom::new("C"));
        frame.add_atom(Atom::new("Fe"));

        // excludes C regardless of mass, and H regardless of name
        assert_eq!(
            matches("mass > 10 and not name C", &frame),
            vec![vec![0], vec![4]]
        );
    }

    #[test]
    fn nan_comparisons_never_match_except_not_equal() {
        let frame = water();
        // inf - inf is NaN
        assert!(matches("1/0 - 1/0 == 1/0 - 1/0", &frame).is_empty());
        assert!(matches("1/0 - 1/0 < 1", &frame).is_empty());
        assert!(matches("1/0 - 1/0 <= 1", &frame).is_empty());
        assert!(matches("1/0 - 1/0 > 1", &frame).is_empty());
        assert!(matches("1/0 - 1/0 >= 1", &frame).is_empty());
        assert_eq!(matches("1/0 - 1/0 != 1", &frame).len(), 3);
    }

    #[test]
    fn resid_fails_open_for_atoms_outside_residues() {
        let mut frame = water();
        let mut residue = Residue::with_id("HOH", 7);
        residue.add_atom(0);
        frame.add_residue(residue).unwrap();

        assert_eq!(matches("resid == 7", &frame), vec![vec![0]]);
        // atoms 1 and 2 have no residue: excluded under any comparison
        assert!(matches("resid != 7", &frame).is_empty());
    }

    #[test]
    fn evaluation_is_deterministic() {
        let frame = water();
        let selection = Selection::new("name(1) H or name(2) H").unwrap();
        assert_eq!(selection.evaluate(&frame), selection.evaluate(&frame));
    }

    #[test]
    fn compile_failures_never_build_a_selection() {
        assert!(Selection::new("name(5) O").is_err());
        assert!(Selection::new("name == 3").is_err());
        assert!(Selection::new("(name O").is_err());
    }

    #[test]
    fn list_projects_arity_one_matches() {
        let frame = water();
        let selection = Selection::new("name H").unwrap();
        assert_eq!(selection.list(&frame), Some(vec![1, 2]));

        let bonds = Selection::new("name(2) O").unwrap();
        assert_eq!(bonds.list(&frame), None);
    }

    #[test]
    fn string_returns_the_original_source() {
        let selection = Selection::new("name   O").unwrap();
        assert_eq!(selection.string(), "name   O");
    }

    #[test]
    fn print_reparse_round_trip_is_stable() {
        let frame = water();
        for source in [
            "all",
            "none",
            "name O",
            "not name O",
            "name != O and not all",
            "name(1) H and name(2) O",
            "(name O or name H) and index < 2",
            "mass > 10 and not name C",
            "-2^2 == 4",
            "1 + 2 * 3 < mass",
            "sqrt(x^2 + y^2 + z^2) < 5",
            "1/0 - 1/0 != 1",
        ] {
            let compiled = Selection::new(source).unwrap();
            let printed = compiled.to_string();
            let reparsed = Selection::new(&printed)
                .unwrap_or_else(|error| panic!("'{printed}' failed to re-parse: {error}"));
            assert_eq!(
                printed,
                reparsed.to_string(),
                "printing is not a fixed point for '{source}'"
            );
            assert_eq!(
                compiled.evaluate(&frame),
                reparsed.evaluate(&frame),
                "'{source}' and '{printed}' evaluate differently"
            );
        }
    }

    #[test]
    fn selections_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Selection>();
    }
}
