use super::atom::Atom;
use super::residue::Residue;
use super::topology::Topology;
use thiserror::Error;

/// Errors raised when mutating a [`Frame`] in an inconsistent way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("atom index {index} is out of bounds for a frame of size {size}")]
    OutOfBounds { index: usize, size: usize },

    #[error("can not bond atom {0} to itself")]
    SelfBond(usize),

    #[error("atom {index} already belongs to residue '{residue}'")]
    AtomInResidue { index: usize, residue: String },
}

/// A single frame of a molecular system.
///
/// A frame owns a sequence of atoms (addressed by their position index),
/// the residues grouping them, and the bond topology connecting them. It is
/// the structure file format readers fill, writers serialize, and the
/// selection engine queries; the engine only ever reads it.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    atoms: Vec<Atom>,
    residues: Vec<Residue>,
    topology: Topology,
    /// For each atom, the slot of the residue it belongs to, if any.
    residue_map: Vec<Option<usize>>,
}

impl Frame {
    /// Creates a new empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of atoms in the frame.
    pub fn size(&self) -> usize {
        self.atoms.len()
    }

    /// Returns whether the frame contains no atoms.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Appends an atom to the frame and returns its index.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.residue_map.push(None);
        self.atoms.len() - 1
    }

    /// Returns the atom at `index`, or `None` if the index is out of range.
    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    /// Returns a mutable reference to the atom at `index`.
    pub fn atom_mut(&mut self, index: usize) -> Option<&mut Atom> {
        self.atoms.get_mut(index)
    }

    /// Returns all atoms in the frame, in index order.
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Returns the bond topology of the frame.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Adds a bond between the atoms at `i` and `j`.
    ///
    /// The angle and dihedral lists of the topology are updated
    /// automatically.
    ///
    /// # Errors
    ///
    /// Returns an error if either index is out of range or if `i == j`.
    pub fn add_bond(&mut self, i: usize, j: usize) -> Result<(), FrameError> {
        self.check_index(i)?;
        self.check_index(j)?;
        if i == j {
            return Err(FrameError::SelfBond(i));
        }
        self.topology.add_bond(i, j);
        Ok(())
    }

    /// Removes the bond between the atoms at `i` and `j`, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if either index is out of range.
    pub fn remove_bond(&mut self, i: usize, j: usize) -> Result<(), FrameError> {
        self.check_index(i)?;
        self.check_index(j)?;
        self.topology.remove_bond(i, j);
        Ok(())
    }

    /// Adds a residue to the frame and returns its slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the residue references an atom that is out of
    /// range or that already belongs to another residue.
    pub fn add_residue(&mut self, residue: Residue) -> Result<usize, FrameError> {
        for &index in residue.atoms() {
            self.check_index(index)?;
            if let Some(slot) = self.residue_map[index] {
                return Err(FrameError::AtomInResidue {
                    index,
                    residue: self.residues[slot].name.clone(),
                });
            }
        }
        let slot = self.residues.len();
        for &index in residue.atoms() {
            self.residue_map[index] = Some(slot);
        }
        self.residues.push(residue);
        Ok(slot)
    }

    /// Returns all residues in the frame, in insertion order.
    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    /// Returns the residue containing the atom at `index`, if any.
    pub fn residue_for_atom(&self, index: usize) -> Option<&Residue> {
        let slot = (*self.residue_map.get(index)?)?;
        Some(&self.residues[slot])
    }

    fn check_index(&self, index: usize) -> Result<(), FrameError> {
        if index >= self.atoms.len() {
            return Err(FrameError::OutOfBounds {
                index,
                size: self.atoms.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::topology::{Angle, Bond};
    use nalgebra::Point3;

    fn water() -> Frame {
        let mut frame = Frame::new();
        frame.add_atom(Atom::new("O"));
        frame.add_atom(Atom::new("H"));
        frame.add_atom(Atom::new("H"));
        frame.add_bond(0, 1).unwrap();
        frame.add_bond(0, 2).unwrap();
        frame
    }

    #[test]
    fn add_atom_returns_sequential_indices() {
        let mut frame = Frame::new();
        assert_eq!(frame.add_atom(Atom::new("C")), 0);
        assert_eq!(frame.add_atom(Atom::new("O")), 1);
        assert_eq!(frame.size(), 2);
    }

    #[test]
    fn atom_returns_none_out_of_range() {
        let frame = water();
        assert!(frame.atom(2).is_some());
        assert!(frame.atom(3).is_none());
    }

    #[test]
    fn atom_mut_allows_editing_positions() {
        let mut frame = water();
        frame.atom_mut(0).unwrap().position = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(frame.atom(0).unwrap().position, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn bonds_derive_angles_through_the_topology() {
        let frame = water();
        assert_eq!(
            frame.topology().bonds(),
            &[Bond::new(0, 1), Bond::new(0, 2)]
        );
        assert_eq!(frame.topology().angles(), &[Angle::new(1, 0, 2)]);
    }

    #[test]
    fn add_bond_rejects_bad_indices() {
        let mut frame = water();
        assert_eq!(
            frame.add_bond(0, 7),
            Err(FrameError::OutOfBounds { index: 7, size: 3 })
        );
        assert_eq!(frame.add_bond(1, 1), Err(FrameError::SelfBond(1)));
    }

    #[test]
    fn remove_bond_is_forwarded_to_the_topology() {
        let mut frame = water();
        frame.remove_bond(0, 2).unwrap();
        assert_eq!(frame.topology().bonds(), &[Bond::new(0, 1)]);
        assert!(frame.topology().angles().is_empty());
    }

    #[test]
    fn residue_membership_is_queryable_per_atom() {
        let mut frame = water();
        let mut residue = Residue::with_id("HOH", 1);
        residue.add_atom(0);
        residue.add_atom(1);
        residue.add_atom(2);
        frame.add_residue(residue).unwrap();

        assert_eq!(frame.residue_for_atom(0).unwrap().name, "HOH");
        assert_eq!(frame.residue_for_atom(2).unwrap().id, Some(1));
    }

    #[test]
    fn residue_for_atom_is_none_without_membership() {
        let frame = water();
        assert!(frame.residue_for_atom(0).is_none());
        assert!(frame.residue_for_atom(99).is_none());
    }

    #[test]
    fn add_residue_rejects_atoms_already_grouped() {
        let mut frame = water();
        let mut first = Residue::new("HOH");
        first.add_atom(0);
        frame.add_residue(first).unwrap();

        let mut second = Residue::new("SOL");
        second.add_atom(0);
        assert_eq!(
            frame.add_residue(second),
            Err(FrameError::AtomInResidue {
                index: 0,
                residue: "HOH".to_string()
            })
        );
    }

    #[test]
    fn add_residue_rejects_out_of_range_atoms() {
        let mut frame = water();
        let mut residue = Residue::new("HOH");
        residue.add_atom(12);
        assert_eq!(
            frame.add_residue(residue),
            Err(FrameError::OutOfBounds { index: 12, size: 3 })
        );
    }
}
