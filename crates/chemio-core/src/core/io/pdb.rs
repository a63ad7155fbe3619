use crate::core::io::traits::ChemicalFile;
use crate::core::models::atom::Atom;
use crate::core::models::frame::Frame;
use crate::core::models::residue::Residue;
use nalgebra::Point3;
use phf::{Set, phf_set};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::warn;

/// PDB records that carry no structural information and are skipped
/// without a warning.
static IGNORED_RECORDS: Set<&'static str> = phf_set! {
    "REMARK", "MASTER", "AUTHOR", "CAVEAT", "COMPND", "EXPDTA", "KEYWDS",
    "OBSLTE", "SOURCE", "SPLIT", "SPRSDE", "JRNL", "SEQRES", "HET",
    "REVDAT", "SCALE1", "SCALE2", "SCALE3", "ORIGX1", "ORIGX2", "ORIGX3",
    "ANISOU", "SITE", "FORMUL", "DBREF", "HETNAM", "HETSYN", "SSBOND",
    "LINK", "SEQADV", "MODRES", "CISPEP", "HELIX", "SHEET", "TURN",
};

/// File-level PDB records preserved across a read/write cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbMetadata {
    /// The HEADER classification text.
    pub header: Option<String>,
    /// The TITLE text, continuation lines joined with spaces.
    pub title: Option<String>,
    /// The raw CRYST1 record, kept verbatim.
    pub cryst1: Option<String>,
}

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PdbParseErrorKind,
    },
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Line is too short for an ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    line.get(start..end).unwrap_or("").trim()
}

/// Reader and writer for the Protein Data Bank text format.
///
/// A single frame is read per file: ATOM/HETATM records become atoms
/// grouped into residues by (chain, residue number, insertion code),
/// CONECT records become bonds, and ENDMDL/END stop the parse. HEADER,
/// TITLE and CRYST1 are carried as [`PdbMetadata`].
pub struct PdbFile;

impl PdbFile {
    fn read_atom(
        line: &str,
        line_number: usize,
        frame: &mut Frame,
        serial_to_index: &mut HashMap<i64, usize>,
        residues: &mut BTreeMap<(char, i64, char), Residue>,
    ) -> Result<(), PdbError> {
        if line.len() < 54 {
            return Err(PdbError::Parse {
                line: line_number,
                kind: PdbParseErrorKind::LineTooShort,
            });
        }

        let name = slice_and_trim(line, 12, 16);
        let element = slice_and_trim(line, 76, 78);
        let mut atom = if element.is_empty() {
            Atom::new(name)
        } else {
            Atom::with_type(name, element)
        };

        let parse_coordinate = |start: usize, columns: &str| -> Result<f64, PdbError> {
            let text = slice_and_trim(line, start, start + 8);
            text.parse().map_err(|_| PdbError::Parse {
                line: line_number,
                kind: PdbParseErrorKind::InvalidFloat {
                    columns: columns.to_string(),
                    value: text.to_string(),
                },
            })
        };
        let x = parse_coordinate(30, "31-38")?;
        let y = parse_coordinate(38, "39-46")?;
        let z = parse_coordinate(46, "47-54")?;
        atom.position = Point3::new(x, y, z);

        let index = frame.add_atom(atom);

        let serial_text = slice_and_trim(line, 6, 11);
        match serial_text.parse::<i64>() {
            Ok(serial) => {
                serial_to_index.insert(serial, index);
            }
            Err(_) => {
                warn!(
                    "'{}' is not a valid atom serial on line {}, CONECT records can not reference this atom",
                    serial_text, line_number
                );
            }
        }

        // a bad residue number means no residue information, not an error
        if let Ok(resid) = slice_and_trim(line, 22, 26).parse::<i64>() {
            let chain = slice_and_trim(line, 21, 22).chars().next().unwrap_or(' ');
            let insertion = line.get(26..27).and_then(|s| s.chars().next()).unwrap_or(' ');
            let resname = slice_and_trim(line, 17, 20);
            let residue = residues.entry((chain, resid, insertion)).or_insert_with(|| {
                let mut residue = Residue::with_id(resname, resid);
                if chain != ' ' {
                    residue.chain = Some(chain);
                }
                residue
            });
            residue.add_atom(index);
        }

        Ok(())
    }

    fn read_conect(
        line: &str,
        line_number: usize,
        serial_to_index: &HashMap<i64, usize>,
        pending_bonds: &mut Vec<(usize, usize)>,
    ) {
        let resolve = |start: usize| -> Option<usize> {
            let text = slice_and_trim(line, start, start + 5);
            if text.is_empty() {
                return None;
            }
            let serial = text.parse::<i64>().ok()?;
            let index = serial_to_index.get(&serial).copied();
            if index.is_none() {
                warn!(
                    "ignoring CONECT reference to unknown atom serial {} on line {}",
                    serial, line_number
                );
            }
            index
        };

        let Some(first) = resolve(6) else {
            return;
        };
        for start in [11, 16, 21, 26] {
            if let Some(other) = resolve(start) {
                pending_bonds.push((first, other));
            }
        }
    }

    fn write_atom_line(
        writer: &mut impl Write,
        index: usize,
        atom: &Atom,
        residue: Option<&Residue>,
        frame_size: usize,
    ) -> Result<(), PdbError> {
        let serial = index + 1;
        if serial == 100_000 {
            warn!(
                "too many atoms for the PDB format ({}), serial numbers will overflow their columns",
                frame_size
            );
        }

        let (record, resname, resid, chain) = match residue {
            Some(residue) => (
                "ATOM  ",
                residue.name.as_str(),
                residue.id.unwrap_or(-1),
                residue.chain.unwrap_or(' '),
            ),
            None => ("HETATM", "XXX", -1, 'X'),
        };

        // names shorter than 4 characters start one column late
        let name = if atom.name.len() < 4 {
            format!(" {:<3}", atom.name)
        } else {
            format!("{:.4}", atom.name)
        };

        writeln!(
            writer,
            "{}{:>5} {} {:>3.3} {}{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2.2}",
            record,
            serial,
            name,
            resname,
            chain,
            resid,
            atom.position[0],
            atom.position[1],
            atom.position[2],
            1.0,
            0.0,
            atom.atom_type,
        )?;
        Ok(())
    }
}

impl ChemicalFile for PdbFile {
    type Metadata = PdbMetadata;
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Frame, Self::Metadata), Self::Error> {
        let mut frame = Frame::new();
        let mut metadata = PdbMetadata::default();
        let mut serial_to_index = HashMap::new();
        let mut residues: BTreeMap<(char, i64, char), Residue> = BTreeMap::new();
        let mut pending_bonds = Vec::new();

        for (line_number, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line_number = line_number + 1;
            let record = slice_and_trim(&line, 0, 6);

            match record {
                "ATOM" | "HETATM" => {
                    Self::read_atom(
                        &line,
                        line_number,
                        &mut frame,
                        &mut serial_to_index,
                        &mut residues,
                    )?;
                }
                "CONECT" => {
                    Self::read_conect(&line, line_number, &serial_to_index, &mut pending_bonds);
                }
                "HEADER" => {
                    let text = slice_and_trim(&line, 10, line.len());
                    if !text.is_empty() {
                        metadata.header = Some(text.to_string());
                    }
                }
                "TITLE" => {
                    let text = slice_and_trim(&line, 10, line.len());
                    if !text.is_empty() {
                        match &mut metadata.title {
                            Some(title) => {
                                title.push(' ');
                                title.push_str(text);
                            }
                            None => metadata.title = Some(text.to_string()),
                        }
                    }
                }
                "CRYST1" => {
                    metadata.cryst1 = Some(line.clone());
                }
                // single-frame reader: the first model is the frame
                "END" | "ENDMDL" => break,
                "MODEL" | "TER" | "" => {}
                _ if IGNORED_RECORDS.contains(record) => {}
                _ => {
                    warn!("ignoring unknown PDB record '{}' on line {}", record, line_number);
                }
            }
        }

        for residue in residues.into_values() {
            if let Err(error) = frame.add_residue(residue) {
                warn!("dropping inconsistent PDB residue: {}", error);
            }
        }
        for (i, j) in pending_bonds {
            if let Err(error) = frame.add_bond(i, j) {
                warn!("ignoring invalid CONECT bond: {}", error);
            }
        }

        Ok((frame, metadata))
    }

    fn write_to(
        frame: &Frame,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        if let Some(header) = &metadata.header {
            writeln!(writer, "HEADER    {header}")?;
        }
        if let Some(title) = &metadata.title {
            writeln!(writer, "TITLE     {title}")?;
        }
        if let Some(cryst1) = &metadata.cryst1 {
            writeln!(writer, "{cryst1}")?;
        }

        for (index, atom) in frame.atoms().iter().enumerate() {
            Self::write_atom_line(writer, index, atom, frame.residue_for_atom(index), frame.size())?;
        }

        for bond in frame.topology().bonds() {
            let (i, j) = (bond[0] + 1, bond[1] + 1);
            if i > 99_999 || j > 99_999 {
                warn!(
                    "atom serial is too big for CONECT, dropping the bond between {} and {}",
                    bond[0], bond[1]
                );
                continue;
            }
            writeln!(writer, "CONECT{i:>5}{j:>5}")?;
        }

        writeln!(writer, "END")?;
        Ok(())
    }

    fn write_frame_to(frame: &Frame, writer: &mut impl Write) -> Result<(), Self::Error> {
        Self::write_to(frame, &PdbMetadata::default(), writer)
    }
}
