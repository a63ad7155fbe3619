use super::element;
use nalgebra::{Point3, Vector3};

/// Represents a single atom in a frame.
///
/// An atom carries an identity (its `name`, e.g. "CA" or "OW", and its
/// chemical `atom_type`, e.g. "C" or "O"), a mass, and its instantaneous
/// position and velocity. The name is free-form and comes from the source
/// file; the type is expected to be a chemical symbol when one is known.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "CA", "OW", "H1").
    pub name: String,
    /// The chemical type of the atom, usually an element symbol.
    pub atom_type: String,
    /// The atomic mass in unified atomic mass units.
    pub mass: f64,
    /// The position of the atom in Angstroms.
    pub position: Point3<f64>,
    /// The velocity of the atom in Angstroms per femtosecond.
    pub velocity: Vector3<f64>,
}

impl Atom {
    /// Creates a new `Atom` from a name, using the name as the type as well.
    ///
    /// The mass is looked up from the element table using the type; atoms
    /// whose type is not a chemical symbol get a mass of zero. Position and
    /// velocity start at the origin.
    pub fn new(name: &str) -> Self {
        Self::with_type(name, name)
    }

    /// Creates a new `Atom` with separate name and chemical type.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom as it appears in the source file.
    /// * `atom_type` - The chemical type, usually an element symbol.
    pub fn with_type(name: &str, atom_type: &str) -> Self {
        Self {
            name: name.to_string(),
            atom_type: atom_type.to_string(),
            mass: element::atomic_mass(atom_type).unwrap_or(0.0),
            position: Point3::origin(),
            velocity: Vector3::zeros(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_uses_name_as_type() {
        let atom = Atom::new("O");
        assert_eq!(atom.name, "O");
        assert_eq!(atom.atom_type, "O");
        assert_eq!(atom.mass, 15.999);
    }

    #[test]
    fn with_type_separates_name_and_type() {
        let atom = Atom::with_type("OW", "O");
        assert_eq!(atom.name, "OW");
        assert_eq!(atom.atom_type, "O");
        assert_eq!(atom.mass, 15.999);
    }

    #[test]
    fn unknown_type_gets_zero_mass() {
        let atom = Atom::new("CA2+");
        assert_eq!(atom.mass, 0.0);
    }

    #[test]
    fn new_atom_starts_at_origin_and_at_rest() {
        let atom = Atom::new("H");
        assert_eq!(atom.position, Point3::origin());
        assert_eq!(atom.velocity, Vector3::zeros());
    }
}
