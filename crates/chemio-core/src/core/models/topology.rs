use std::collections::{BTreeMap, BTreeSet};
use std::ops::Index;

/// A bond between two atoms, stored with the smaller index first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bond([usize; 2]);

impl Bond {
    /// Creates a bond between atoms `i` and `j`, in canonical order.
    pub fn new(i: usize, j: usize) -> Self {
        Bond([i.min(j), i.max(j)])
    }

    /// Returns whether this bond involves the atom at `index`.
    pub fn contains(&self, index: usize) -> bool {
        self.0[0] == index || self.0[1] == index
    }
}

impl Index<usize> for Bond {
    type Output = usize;
    fn index(&self, index: usize) -> &usize {
        &self.0[index]
    }
}

/// An angle formed by three bonded atoms i-j-k, with `j` the apex.
///
/// Stored in canonical order: the smaller of the two end atoms first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Angle([usize; 3]);

impl Angle {
    /// Creates an angle i-j-k, in canonical order.
    pub fn new(i: usize, j: usize, k: usize) -> Self {
        Angle([i.min(k), j, i.max(k)])
    }
}

impl Index<usize> for Angle {
    type Output = usize;
    fn index(&self, index: usize) -> &usize {
        &self.0[index]
    }
}

/// A dihedral formed by four atoms bonded in sequence i-j-k-m.
///
/// Stored in canonical order: the direction is flipped so that the two
/// central atoms compare smaller first (ties broken by the end atoms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dihedral([usize; 4]);

impl Dihedral {
    /// Creates a dihedral i-j-k-m, in canonical order.
    pub fn new(i: usize, j: usize, k: usize, m: usize) -> Self {
        if j > k || (j == k && i > m) {
            Dihedral([m, k, j, i])
        } else {
            Dihedral([i, j, k, m])
        }
    }
}

impl Index<usize> for Dihedral {
    type Output = usize;
    fn index(&self, index: usize) -> &usize {
        &self.0[index]
    }
}

/// The connectivity of a frame: bonds, and the angles/dihedrals they imply.
///
/// Only bonds are stored explicitly; the angle and dihedral lists are
/// recomputed from bond connectivity whenever the bonds change. All three
/// lists are sorted and free of duplicates, so their enumeration order is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    bonds: Vec<Bond>,
    angles: Vec<Angle>,
    dihedrals: Vec<Dihedral>,
}

impl Topology {
    /// Creates an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all bonds, sorted.
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Returns all angles derived from the bonds, sorted.
    pub fn angles(&self) -> &[Angle] {
        &self.angles
    }

    /// Returns all dihedrals derived from the bonds, sorted.
    pub fn dihedrals(&self) -> &[Dihedral] {
        &self.dihedrals
    }

    pub(crate) fn add_bond(&mut self, i: usize, j: usize) {
        let bond = Bond::new(i, j);
        if let Err(position) = self.bonds.binary_search(&bond) {
            self.bonds.insert(position, bond);
            self.rebuild();
        }
    }

    pub(crate) fn remove_bond(&mut self, i: usize, j: usize) {
        let bond = Bond::new(i, j);
        if let Ok(position) = self.bonds.binary_search(&bond) {
            self.bonds.remove(position);
            self.rebuild();
        }
    }

    /// Recomputes the angle and dihedral lists from bond connectivity.
    fn rebuild(&mut self) {
        let mut adjacency: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for bond in &self.bonds {
            adjacency.entry(bond[0]).or_default().push(bond[1]);
            adjacency.entry(bond[1]).or_default().push(bond[0]);
        }

        let mut angles = BTreeSet::new();
        for bond in &self.bonds {
            let (i, j) = (bond[0], bond[1]);
            for &k in adjacency.get(&i).map(Vec::as_slice).unwrap_or(&[]) {
                if k != j {
                    angles.insert(Angle::new(k, i, j));
                }
            }
            for &k in adjacency.get(&j).map(Vec::as_slice).unwrap_or(&[]) {
                if k != i {
                    angles.insert(Angle::new(i, j, k));
                }
            }
        }

        let mut dihedrals = BTreeSet::new();
        for angle in &angles {
            let (i, j, k) = (angle[0], angle[1], angle[2]);
            for &m in adjacency.get(&i).map(Vec::as_slice).unwrap_or(&[]) {
                if m != j && m != k {
                    dihedrals.insert(Dihedral::new(m, i, j, k));
                }
            }
            for &m in adjacency.get(&k).map(Vec::as_slice).unwrap_or(&[]) {
                if m != j && m != i {
                    dihedrals.insert(Dihedral::new(i, j, k, m));
                }
            }
        }

        self.angles = angles.into_iter().collect();
        self.dihedrals = dihedrals.into_iter().collect();
    }
}
