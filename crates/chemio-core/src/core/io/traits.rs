use crate::core::models::frame::Frame;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing chemistry file formats.
///
/// Implementors parse one frame out of a buffered reader and serialize one
/// frame back. Information that belongs to the file rather than the frame
/// (header records, lattice descriptions) travels through the associated
/// `Metadata` type, so that reading then writing preserves it.
pub trait ChemicalFile {
    /// The format-specific metadata carried next to the frame.
    type Metadata;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a frame and its metadata from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid for this format or if
    /// the underlying reader fails.
    fn read_from(reader: &mut impl BufRead) -> Result<(Frame, Self::Metadata), Self::Error>;

    /// Writes a frame and its metadata to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails.
    fn write_to(
        frame: &Frame,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Writes a frame with default metadata for this format.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails.
    fn write_frame_to(frame: &Frame, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads a frame and its metadata from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<(Frame, Self::Metadata), Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes a frame and its metadata to a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    fn write_to_path<P: AsRef<Path>>(
        frame: &Frame,
        metadata: &Self::Metadata,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(frame, metadata, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes a frame with default metadata to a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    fn write_frame_to_path<P: AsRef<Path>>(frame: &Frame, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_frame_to(frame, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
