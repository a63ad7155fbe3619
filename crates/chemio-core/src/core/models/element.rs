use phf::{Map, phf_map};

/// Standard atomic masses in unified atomic mass units (IUPAC 2021),
/// keyed by chemical symbol.
static ATOMIC_MASSES: Map<&'static str, f64> = phf_map! {
    "H" => 1.008, "He" => 4.002602,
    "Li" => 6.94, "Be" => 9.0121831, "B" => 10.81, "C" => 12.011,
    "N" => 14.007, "O" => 15.999, "F" => 18.998403163, "Ne" => 20.1797,
    "Na" => 22.98976928, "Mg" => 24.305, "Al" => 26.9815384,
    "Si" => 28.085, "P" => 30.973761998, "S" => 32.06, "Cl" => 35.45,
    "Ar" => 39.95,
    "K" => 39.0983, "Ca" => 40.078, "Sc" => 44.955907, "Ti" => 47.867,
    "V" => 50.9415, "Cr" => 51.9961, "Mn" => 54.938043, "Fe" => 55.845,
    "Co" => 58.933194, "Ni" => 58.6934, "Cu" => 63.546, "Zn" => 65.38,
    "Ga" => 69.723, "Ge" => 72.63, "As" => 74.921595, "Se" => 78.971,
    "Br" => 79.904, "Kr" => 83.798,
    "Rb" => 85.4678, "Sr" => 87.62, "Y" => 88.905838, "Zr" => 91.222,
    "Nb" => 92.90637, "Mo" => 95.95, "Ru" => 101.07, "Rh" => 102.90549,
    "Pd" => 106.42, "Ag" => 107.8682, "Cd" => 112.414, "In" => 114.818,
    "Sn" => 118.71, "Sb" => 121.76, "Te" => 127.6, "I" => 126.90447,
    "Xe" => 131.293,
    "Cs" => 132.90545196, "Ba" => 137.327, "La" => 138.90547,
    "W" => 183.84, "Re" => 186.207, "Os" => 190.23, "Ir" => 192.217,
    "Pt" => 195.084, "Au" => 196.96657, "Hg" => 200.592,
    "Tl" => 204.38, "Pb" => 207.2, "Bi" => 208.9804, "U" => 238.02891,
};

/// Normalizes a chemical symbol to its canonical capitalization ("fe",
/// "FE", and " Fe " all become "Fe").
fn normalize(symbol: &str) -> String {
    let mut chars = symbol.trim().chars();
    match chars.next() {
        Some(first) => {
            let mut normalized = first.to_ascii_uppercase().to_string();
            normalized.extend(chars.map(|c| c.to_ascii_lowercase()));
            normalized
        }
        None => String::new(),
    }
}

/// Returns the standard atomic mass for a chemical symbol, or `None` if the
/// symbol is not a known element.
pub fn atomic_mass(symbol: &str) -> Option<f64> {
    ATOMIC_MASSES.get(normalize(symbol).as_str()).copied()
}

/// Returns whether a string is a known chemical symbol.
pub fn is_element(symbol: &str) -> bool {
    ATOMIC_MASSES.contains_key(normalize(symbol).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_mass_returns_standard_masses() {
        assert_eq!(atomic_mass("O"), Some(15.999));
        assert_eq!(atomic_mass("H"), Some(1.008));
        assert_eq!(atomic_mass("Fe"), Some(55.845));
    }

    #[test]
    fn atomic_mass_normalizes_capitalization_and_whitespace() {
        assert_eq!(atomic_mass("o"), Some(15.999));
        assert_eq!(atomic_mass("FE"), atomic_mass("Fe"));
        assert_eq!(atomic_mass(" Cl "), Some(35.45));
    }

    #[test]
    fn atomic_mass_returns_none_for_unknown_symbols() {
        assert_eq!(atomic_mass("Xx"), None);
        assert_eq!(atomic_mass(""), None);
        assert_eq!(atomic_mass("CA2+"), None);
    }

    #[test]
    fn is_element_matches_table_membership() {
        assert!(is_element("C"));
        assert!(is_element("kr"));
        assert!(!is_element("Zz"));
        assert!(!is_element(""));
    }
}
