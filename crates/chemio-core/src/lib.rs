//! # chemio
//!
//! A library for reading, writing, and querying chemistry file formats.
//!
//! ## Architectural Philosophy
//!
//! The library is split into two layers with a clear dependency direction,
//! keeping the data model independent from the code that consumes it.
//!
//! - **[`core`]: The Foundation.** Contains the molecular data model
//!   (`Frame`, `Atom`, `Residue`, `Topology`) and the file I/O layer that
//!   fills and serializes it (`pdb`, `poscar`).
//!
//! - **[`selection`]: The Query Engine.** A small compiled language for
//!   describing sets of atoms, bonds, angles, and dihedrals. A selection
//!   string is compiled once into an immutable expression tree and can then
//!   be evaluated efficiently and repeatedly against many frames.
//!
//! ```ignore
//! use chemio::core::models::frame::Frame;
//! use chemio::selection::Selection;
//!
//! let selection = Selection::new("name O and mass > 10")?;
//! let matches = selection.evaluate(&frame);
//! ```

pub mod core;
pub mod selection;
