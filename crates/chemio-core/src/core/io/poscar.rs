use crate::core::io::traits::ChemicalFile;
use crate::core::models::atom::Atom;
use crate::core::models::frame::Frame;
use nalgebra::{Point3, Vector3};
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// File-level POSCAR data carried next to the frame.
///
/// The lattice is kept here verbatim because the frame model is not
/// periodic: it is needed to expand Direct coordinates while reading, and
/// is written back unchanged. `cartesian` and `selective_dynamics` record
/// what the source file declared; the writer always emits Cartesian
/// coordinates and no selective-dynamics block.
#[derive(Debug, Clone, PartialEq)]
pub struct PoscarMetadata {
    /// The first-line comment.
    pub comment: String,
    /// The global scaling factor.
    pub scale: f64,
    /// The three lattice vectors, one per row, unscaled.
    pub lattice: [[f64; 3]; 3],
    /// Whether the source file used Cartesian coordinates.
    pub cartesian: bool,
    /// Whether the source file declared selective dynamics.
    pub selective_dynamics: bool,
}

impl Default for PoscarMetadata {
    fn default() -> Self {
        Self {
            comment: String::new(),
            scale: 1.0,
            lattice: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            cartesian: true,
            selective_dynamics: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum PoscarError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PoscarParseErrorKind,
    },
    #[error("Unexpected end of file while reading {0}")]
    UnexpectedEof(String),
}

#[derive(Debug, Error)]
pub enum PoscarParseErrorKind {
    #[error("Invalid float format (value: '{0}')")]
    InvalidFloat(String),
    #[error("Invalid integer format (value: '{0}')")]
    InvalidInt(String),
    #[error("Expected at least {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("Species symbols line is missing (VASP 4 files without symbols are not supported)")]
    MissingSpecies,
    #[error("Expected 'Direct' or 'Cartesian', found '{0}'")]
    InvalidCoordinateMode(String),
    #[error("The scaling factor must be positive (value: {0})")]
    InvalidScale(f64),
}

/// Line cursor over the whole file content.
struct Lines {
    lines: Vec<String>,
    position: usize,
}

impl Lines {
    fn read(reader: &mut impl BufRead) -> Result<Self, PoscarError> {
        let lines = reader.lines().collect::<Result<Vec<_>, _>>()?;
        Ok(Lines { lines, position: 0 })
    }

    /// The next line with its 1-based number, or an EOF error naming what
    /// was expected.
    fn next(&mut self, expected: &str) -> Result<(usize, &str), PoscarError> {
        match self.lines.get(self.position) {
            Some(line) => {
                self.position += 1;
                Ok((self.position, line))
            }
            None => Err(PoscarError::UnexpectedEof(expected.to_string())),
        }
    }

    fn peek(&self) -> Option<&str> {
        self.lines.get(self.position).map(String::as_str)
    }

    fn skip_blank(&mut self) {
        while self.peek().is_some_and(|line| line.trim().is_empty()) {
            self.position += 1;
        }
    }
}

fn parse_floats(
    line: &str,
    line_number: usize,
    count: usize,
) -> Result<Vec<f64>, PoscarError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < count {
        return Err(PoscarError::Parse {
            line: line_number,
            kind: PoscarParseErrorKind::FieldCount {
                expected: count,
                found: fields.len(),
            },
        });
    }
    fields[..count]
        .iter()
        .map(|field| {
            field.parse().map_err(|_| PoscarError::Parse {
                line: line_number,
                kind: PoscarParseErrorKind::InvalidFloat(field.to_string()),
            })
        })
        .collect()
}

/// Reader and writer for VASP's POSCAR text format.
///
/// The format holds exactly one frame: a comment, a scaling factor, three
/// lattice vectors, species symbols with their counts, an optional
/// selective-dynamics declaration, a Direct/Cartesian switch, the atom
/// coordinates, and an optional trailing velocity block.
pub struct PoscarFile;

impl PoscarFile {
    fn read_comment(lines: &mut Lines, metadata: &mut PoscarMetadata) -> Result<(), PoscarError> {
        let (_, line) = lines.next("the comment line")?;
        metadata.comment = line.trim().to_string();
        Ok(())
    }

    fn read_unit_cell(lines: &mut Lines, metadata: &mut PoscarMetadata) -> Result<(), PoscarError> {
        let (line_number, line) = lines.next("the scaling factor")?;
        let scale = parse_floats(line, line_number, 1)?[0];
        if scale <= 0.0 {
            return Err(PoscarError::Parse {
                line: line_number,
                kind: PoscarParseErrorKind::InvalidScale(scale),
            });
        }
        metadata.scale = scale;

        for row in 0..3 {
            let (line_number, line) = lines.next("a lattice vector")?;
            let fields = parse_floats(line, line_number, 3)?;
            metadata.lattice[row] = [fields[0], fields[1], fields[2]];
        }
        Ok(())
    }

    fn read_species(lines: &mut Lines) -> Result<Vec<(String, usize)>, PoscarError> {
        let (line_number, line) = lines.next("the species symbols")?;
        let symbols: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if symbols.is_empty() || symbols.iter().all(|s| s.parse::<usize>().is_ok()) {
            return Err(PoscarError::Parse {
                line: line_number,
                kind: PoscarParseErrorKind::MissingSpecies,
            });
        }

        let (line_number, line) = lines.next("the species counts")?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < symbols.len() {
            return Err(PoscarError::Parse {
                line: line_number,
                kind: PoscarParseErrorKind::FieldCount {
                    expected: symbols.len(),
                    found: fields.len(),
                },
            });
        }
        symbols
            .into_iter()
            .zip(fields)
            .map(|(symbol, field)| {
                let count = field.parse().map_err(|_| PoscarError::Parse {
                    line: line_number,
                    kind: PoscarParseErrorKind::InvalidInt(field.to_string()),
                })?;
                Ok((symbol, count))
            })
            .collect()
    }

    fn read_selective_dynamics(
        lines: &mut Lines,
        metadata: &mut PoscarMetadata,
    ) -> Result<(), PoscarError> {
        if let Some(line) = lines.peek()
            && line.trim_start().starts_with(['s', 'S'])
        {
            metadata.selective_dynamics = true;
            lines.position += 1;
        }
        Ok(())
    }

    fn read_cartesian_direct(
        lines: &mut Lines,
        metadata: &mut PoscarMetadata,
    ) -> Result<(), PoscarError> {
        let (line_number, line) = lines.next("the coordinate mode")?;
        match line.trim_start().chars().next() {
            Some('c') | Some('C') | Some('k') | Some('K') => metadata.cartesian = true,
            Some('d') | Some('D') => metadata.cartesian = false,
            _ => {
                return Err(PoscarError::Parse {
                    line: line_number,
                    kind: PoscarParseErrorKind::InvalidCoordinateMode(line.trim().to_string()),
                });
            }
        }
        Ok(())
    }

    fn read_atoms(
        lines: &mut Lines,
        frame: &mut Frame,
        metadata: &PoscarMetadata,
        species: &[(String, usize)],
    ) -> Result<(), PoscarError> {
        let scaled: Vec<Vector3<f64>> = metadata
            .lattice
            .iter()
            .map(|row| metadata.scale * Vector3::new(row[0], row[1], row[2]))
            .collect();

        for (symbol, count) in species {
            for _ in 0..*count {
                let (line_number, line) = lines.next("an atom coordinate line")?;
                let fields = parse_floats(line, line_number, 3)?;
                let position = if metadata.cartesian {
                    metadata.scale * Vector3::new(fields[0], fields[1], fields[2])
                } else {
                    fields[0] * scaled[0] + fields[1] * scaled[1] + fields[2] * scaled[2]
                };
                let mut atom = Atom::new(symbol);
                atom.position = Point3::from(position);
                frame.add_atom(atom);
            }
        }

        // an optional velocity block follows after blank lines
        lines.skip_blank();
        if lines.peek().is_some() {
            for index in 0..frame.size() {
                let (line_number, line) = lines.next("a velocity line")?;
                let fields = parse_floats(line, line_number, 3)?;
                if let Some(atom) = frame.atom_mut(index) {
                    atom.velocity = Vector3::new(fields[0], fields[1], fields[2]);
                }
            }
        }
        Ok(())
    }

    /// Groups atom indices by chemical type, in order of first appearance.
    fn species_blocks(frame: &Frame) -> Vec<(String, Vec<usize>)> {
        let mut blocks: Vec<(String, Vec<usize>)> = Vec::new();
        for (index, atom) in frame.atoms().iter().enumerate() {
            match blocks.iter_mut().find(|(symbol, _)| *symbol == atom.atom_type) {
                Some((_, indices)) => indices.push(index),
                None => blocks.push((atom.atom_type.clone(), vec![index])),
            }
        }
        blocks
    }
}

impl ChemicalFile for PoscarFile {
    type Metadata = PoscarMetadata;
    type Error = PoscarError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Frame, Self::Metadata), Self::Error> {
        let mut lines = Lines::read(reader)?;
        let mut frame = Frame::new();
        let mut metadata = PoscarMetadata::default();

        Self::read_comment(&mut lines, &mut metadata)?;
        Self::read_unit_cell(&mut lines, &mut metadata)?;
        let species = Self::read_species(&mut lines)?;
        Self::read_selective_dynamics(&mut lines, &mut metadata)?;
        Self::read_cartesian_direct(&mut lines, &mut metadata)?;
        Self::read_atoms(&mut lines, &mut frame, &metadata, &species)?;

        Ok((frame, metadata))
    }

    fn write_to(
        frame: &Frame,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "{}", metadata.comment)?;
        writeln!(writer, "  {:.14}", metadata.scale)?;
        for row in &metadata.lattice {
            writeln!(writer, "  {:.14}  {:.14}  {:.14}", row[0], row[1], row[2])?;
        }

        let blocks = Self::species_blocks(frame);
        let symbols: Vec<&str> = blocks.iter().map(|(symbol, _)| symbol.as_str()).collect();
        let counts: Vec<String> = blocks
            .iter()
            .map(|(_, indices)| indices.len().to_string())
            .collect();
        writeln!(writer, "  {}", symbols.join("  "))?;
        writeln!(writer, "  {}", counts.join("  "))?;

        writeln!(writer, "Cartesian")?;
        for (_, indices) in &blocks {
            for &index in indices {
                let position = frame.atoms()[index].position / metadata.scale;
                writeln!(
                    writer,
                    "  {:.14}  {:.14}  {:.14}",
                    position[0], position[1], position[2]
                )?;
            }
        }

        let has_velocities = frame
            .atoms()
            .iter()
            .any(|atom| atom.velocity != Vector3::zeros());
        if has_velocities {
            writeln!(writer)?;
            for (_, indices) in &blocks {
                for &index in indices {
                    let velocity = frame.atoms()[index].velocity;
                    writeln!(
                        writer,
                        "  {:.14}  {:.14}  {:.14}",
                        velocity[0], velocity[1], velocity[2]
                    )?;
                }
            }
        }
        Ok(())
    }

    fn write_frame_to(frame: &Frame, writer: &mut impl Write) -> Result<(), Self::Error> {
        Self::write_to(frame, &PoscarMetadata::default(), writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIAMOND_DIRECT: &str = "\
cubic diamond
 3.7
   0.5 0.5 0.0
   0.0 0.5 0.5
   0.5 0.0 0.5
 C
 2
Direct
 0.0 0.0 0.0
 0.25 0.25 0.25
";

    fn read(content: &str) -> (Frame, PoscarMetadata) {
        PoscarFile::read_from(&mut content.as_bytes()).unwrap()
    }

    fn assert_close(point: Point3<f64>, expected: [f64; 3]) {
        for axis in 0..3 {
            assert!(
                (point[axis] - expected[axis]).abs() < 1e-12,
                "{point:?} differs from {expected:?} on axis {axis}"
            );
        }
    }

    #[test]
    fn direct_coordinates_go_through_the_scaled_lattice() {
        let (frame, metadata) = read(DIAMOND_DIRECT);
        assert_eq!(metadata.comment, "cubic diamond");
        assert_eq!(metadata.scale, 3.7);
        assert!(!metadata.cartesian);

        assert_eq!(frame.size(), 2);
        assert_close(frame.atom(0).unwrap().position, [0.0, 0.0, 0.0]);
        assert_close(frame.atom(1).unwrap().position, [0.925, 0.925, 0.925]);
    }

    #[test]
    fn species_blocks_expand_to_named_atoms() {
        let content = "\
water vapor
 1.0
   10.0 0.0 0.0
   0.0 10.0 0.0
   0.0 0.0 10.0
 O  H
 1  2
Cartesian
 0.0 0.0 0.0
 0.757 0.586 0.0
 -0.757 0.586 0.0
";
        let (frame, _) = read(content);
        assert_eq!(frame.size(), 3);
        assert_eq!(frame.atom(0).unwrap().name, "O");
        assert_eq!(frame.atom(0).unwrap().mass, 15.999);
        assert_eq!(frame.atom(1).unwrap().name, "H");
        assert_eq!(frame.atom(2).unwrap().name, "H");
    }

    #[test]
    fn cartesian_coordinates_are_scaled() {
        let content = "\
scaled
 2.0
   1.0 0.0 0.0
   0.0 1.0 0.0
   0.0 0.0 1.0
 He
 1
Cartesian
 1.0 2.0 3.0
";
        let (frame, _) = read(content);
        assert_close(frame.atom(0).unwrap().position, [2.0, 4.0, 6.0]);
    }

    #[test]
    fn selective_dynamics_flag_is_recorded_and_skipped() {
        let content = "\
with flags
 1.0
   1.0 0.0 0.0
   0.0 1.0 0.0
   0.0 0.0 1.0
 H
 1
Selective dynamics
Cartesian
 0.5 0.5 0.5 T T F
";
        let (frame, metadata) = read(content);
        assert!(metadata.selective_dynamics);
        assert!(metadata.cartesian);
        assert_close(frame.atom(0).unwrap().position, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn trailing_velocity_block_is_read() {
        let content = "\
moving
 1.0
   1.0 0.0 0.0
   0.0 1.0 0.0
   0.0 0.0 1.0
 Ar
 1
Cartesian
 0.0 0.0 0.0

 0.1 -0.2 0.3
";
        let (frame, _) = read(content);
        let velocity = frame.atom(0).unwrap().velocity;
        assert_eq!(velocity, Vector3::new(0.1, -0.2, 0.3));
    }

    #[test]
    fn counts_without_symbols_are_rejected() {
        let content = "\
vasp4
 1.0
   1.0 0.0 0.0
   0.0 1.0 0.0
   0.0 0.0 1.0
 2
Cartesian
 0.0 0.0 0.0
 1.0 1.0 1.0
";
        let result = PoscarFile::read_from(&mut content.as_bytes());
        assert!(matches!(
            result,
            Err(PoscarError::Parse {
                kind: PoscarParseErrorKind::MissingSpecies,
                ..
            })
        ));
    }

    #[test]
    fn bad_coordinate_mode_is_rejected() {
        let content = "\
bad mode
 1.0
   1.0 0.0 0.0
   0.0 1.0 0.0
   0.0 0.0 1.0
 H
 1
Fractional
 0.0 0.0 0.0
";
        let result = PoscarFile::read_from(&mut content.as_bytes());
        assert!(matches!(
            result,
            Err(PoscarError::Parse {
                kind: PoscarParseErrorKind::InvalidCoordinateMode(_),
                ..
            })
        ));
    }

    #[test]
    fn negative_scale_is_rejected() {
        let content = "bad scale\n -1.0\n";
        let result = PoscarFile::read_from(&mut content.as_bytes());
        assert!(matches!(
            result,
            Err(PoscarError::Parse {
                kind: PoscarParseErrorKind::InvalidScale(_),
                ..
            })
        ));
    }

    #[test]
    fn truncated_file_reports_what_was_expected() {
        let result = PoscarFile::read_from(&mut "only a comment\n".as_bytes());
        assert!(matches!(result, Err(PoscarError::UnexpectedEof(_))));
    }

    #[test]
    fn missing_coordinate_fields_are_rejected() {
        let content = "\
short line
 1.0
   1.0 0.0 0.0
   0.0 1.0 0.0
   0.0 0.0 1.0
 H
 1
Cartesian
 0.0 0.0
";
        let result = PoscarFile::read_from(&mut content.as_bytes());
        assert!(matches!(
            result,
            Err(PoscarError::Parse {
                line: 9,
                kind: PoscarParseErrorKind::FieldCount {
                    expected: 3,
                    found: 2
                },
            })
        ));
    }

    #[test]
    fn write_then_read_round_trips_geometry_and_species() {
        let (frame, metadata) = read(DIAMOND_DIRECT);

        let mut output = Vec::new();
        PoscarFile::write_to(&frame, &metadata, &mut output).unwrap();
        let written = String::from_utf8(output).unwrap();

        let (reread, remetadata) = read(&written);
        assert_eq!(remetadata.comment, metadata.comment);
        assert_eq!(remetadata.scale, metadata.scale);
        assert_eq!(remetadata.lattice, metadata.lattice);
        // the writer always emits Cartesian coordinates
        assert!(remetadata.cartesian);

        assert_eq!(reread.size(), frame.size());
        for index in 0..frame.size() {
            let before = frame.atom(index).unwrap();
            let after = reread.atom(index).unwrap();
            assert_eq!(before.name, after.name);
            assert_close(after.position, before.position.coords.into());
        }
    }
}
