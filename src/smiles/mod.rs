//! SMILES reader for building target graphs in-process.
//!
//! Covers the organic subset, bracket atoms (isotope, charge, explicit
//! hydrogens), branches, ring closures including `%nn`, aromatic lowercase
//! atoms and disconnected components. Stereo marks are read and discarded.

pub mod error;
mod parser;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::mol::Mol;
pub use error::SmilesError;

/// Parse a SMILES string into a target graph.
///
/// Bonds written between two aromatic atoms without an explicit symbol get
/// [`BondOrder::Aromatic`](crate::bond::BondOrder::Aromatic); organic-subset
/// atoms receive implicit hydrogens from their default valences.
///
/// # Examples
///
/// ```
/// use crabquery::from_smiles;
///
/// let acetic_acid = from_smiles("CC(=O)O").unwrap();
/// assert_eq!(acetic_acid.atom_count(), 4);
/// assert_eq!(acetic_acid.bond_count(), 3);
/// ```
pub fn from_smiles(s: &str) -> Result<Mol<Atom, Bond>, SmilesError> {
    parser::parse(s)
}
