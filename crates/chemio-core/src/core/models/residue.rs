/// A residue: a named group of atoms inside a frame.
///
/// Residues usually come from file formats that carry grouping information
/// (PDB chains and residues, for instance). The numeric id and the chain
/// identifier are optional because not every format provides them; atoms
/// without a residue are equally legal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    /// The residue name (e.g., "ALA", "HOH").
    pub name: String,
    /// The residue sequence number from the source file, if any.
    pub id: Option<i64>,
    /// The chain identifier from the source file, if any.
    pub chain: Option<char>,
    atoms: Vec<usize>,
}

impl Residue {
    /// Creates a new empty residue with the given name and no id.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: None,
            chain: None,
            atoms: Vec::new(),
        }
    }

    /// Creates a new empty residue with the given name and sequence number.
    pub fn with_id(name: &str, id: i64) -> Self {
        Self {
            name: name.to_string(),
            id: Some(id),
            chain: None,
            atoms: Vec::new(),
        }
    }

    /// Registers the atom at `index` as a member of this residue.
    ///
    /// Indices are kept sorted and deduplicated, so membership queries and
    /// iteration order are deterministic regardless of insertion order.
    pub fn add_atom(&mut self, index: usize) {
        if let Err(position) = self.atoms.binary_search(&index) {
            self.atoms.insert(position, index);
        }
    }

    /// Returns the sorted atom indices belonging to this residue.
    pub fn atoms(&self) -> &[usize] {
        &self.atoms
    }

    /// Returns whether the atom at `index` belongs to this residue.
    pub fn contains(&self, index: usize) -> bool {
        self.atoms.binary_search(&index).is_ok()
    }

    /// Returns the number of atoms in this residue.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Returns whether this residue contains no atoms.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}
