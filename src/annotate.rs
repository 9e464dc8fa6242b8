use petgraph::graph::{EdgeIndex, NodeIndex};
use thiserror::Error;
use tracing::{debug, trace};

use crate::aromaticity::{detect_aromaticity, AromaticityError};
use crate::element::Element;
use crate::mol::Mol;
use crate::rings::{all_rings, sssr, RingPerceptionError, RingSet};
use crate::traits::{HasAtomicNum, HasBondOrder, HasFormalCharge, HasHydrogenCount};

/// Bounds for the structural perception run before every match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatorConfig {
    /// Exhaustive ring enumeration fails once it has found more rings than
    /// this.
    pub max_rings: usize,
    /// Rings with more atoms than this are left out of the exhaustive set.
    pub max_ring_size: Option<usize>,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            max_rings: 10_000,
            max_ring_size: None,
        }
    }
}

/// Failure of the structural perception that precedes matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PerceptionError {
    #[error("ring perception failed: {0}")]
    Rings(#[from] RingPerceptionError),
    #[error("aromaticity perception failed: {0}")]
    Aromaticity(#[from] AromaticityError),
}

/// Derived facts about one target atom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomAnnotation {
    pub in_ring: bool,
    /// Sizes of every exhaustive-set ring through this atom, in ring-set
    /// order. Empty outside rings.
    pub ring_sizes: Vec<usize>,
    /// Positions of the SSSR rings through this atom.
    pub smallest_rings: Vec<usize>,
    /// Neighbors that are themselves ring atoms.
    pub ring_connections: usize,
    /// Implicit hydrogens plus graph neighbors.
    pub total_connections: usize,
    /// Implicit hydrogens plus hydrogen-atom neighbors.
    pub total_h_count: usize,
    /// Group valence less formal charge, for elements with a tabulated
    /// valence.
    pub valence: Option<i32>,
    pub aromatic: bool,
}

/// Derived facts about one target bond.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BondAnnotation {
    pub in_ring: bool,
    pub aromatic: bool,
}

/// Side table of derived atom and bond facts for one target graph, indexed
/// by the graph's node and edge indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    atoms: Vec<AtomAnnotation>,
    bonds: Vec<BondAnnotation>,
    all_rings: RingSet,
    sssr: RingSet,
}

impl Annotations {
    pub fn atom(&self, idx: NodeIndex) -> &AtomAnnotation {
        &self.atoms[idx.index()]
    }

    pub fn bond(&self, idx: EdgeIndex) -> &BondAnnotation {
        &self.bonds[idx.index()]
    }

    pub fn atoms(&self) -> &[AtomAnnotation] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[BondAnnotation] {
        &self.bonds
    }

    /// Every simple cycle found.
    pub fn all_rings(&self) -> &RingSet {
        &self.all_rings
    }

    /// The smallest set of smallest rings.
    pub fn sssr(&self) -> &RingSet {
        &self.sssr
    }

    /// Size of the smallest SSSR ring through `idx`.
    pub fn smallest_ring_size(&self, idx: NodeIndex) -> Option<usize> {
        self.atom(idx)
            .smallest_rings
            .iter()
            .map(|&r| self.sssr.rings()[r].len())
            .min()
    }
}

/// Derive ring, connectivity, valence and aromaticity facts for `mol`.
///
/// The graph itself is left untouched; the result is a table keyed by the
/// graph's indices.
///
/// # Errors
///
/// [`PerceptionError::Rings`] when exhaustive ring enumeration exceeds
/// `config.max_rings`, [`PerceptionError::Aromaticity`] when aromaticity
/// perception rejects the ring set.
pub fn annotate<A, B>(
    mol: &Mol<A, B>,
    config: &AnnotatorConfig,
) -> Result<Annotations, PerceptionError>
where
    A: HasAtomicNum + HasFormalCharge + HasHydrogenCount,
    B: HasBondOrder,
{
    let all = all_rings(mol, config.max_rings, config.max_ring_size).inspect_err(|e| {
        debug!(error = %e, atoms = mol.atom_count(), "exhaustive ring perception failed");
    })?;
    let smallest = sssr(mol);

    let mut atoms = vec![AtomAnnotation::default(); mol.atom_count()];

    for (idx, ann) in mol.atoms().zip(atoms.iter_mut()) {
        let memberships = all.rings_with_atom(idx);
        if !memberships.is_empty() {
            ann.in_ring = true;
            ann.ring_sizes = memberships.iter().map(|&r| all.rings()[r].len()).collect();
            ann.smallest_rings = smallest.rings_with_atom(idx);
        }
    }

    for (idx, ann) in mol.atoms().zip(atoms.iter_mut()) {
        let atom = mol.atom(idx);
        let implicit = atom.hydrogen_count() as usize;
        let h_neighbors = mol
            .neighbors(idx)
            .filter(|&nb| mol.atom(nb).atomic_num() == 1)
            .count();
        ann.total_connections = implicit + mol.degree(idx);
        ann.total_h_count = implicit + h_neighbors;
        ann.valence = Element::from_atomic_num(atom.atomic_num())
            .and_then(Element::standard_valence)
            .map(|v| v as i32 - atom.formal_charge() as i32);
    }

    let mut bonds = vec![BondAnnotation::default(); mol.bond_count()];
    for (edge, ann) in mol.bonds().zip(bonds.iter_mut()) {
        if let Some((a, b)) = mol.bond_endpoints(edge) {
            ann.in_ring = all.contains_bond(a, b);
        }
    }

    for idx in mol.atoms() {
        let count = mol.neighbors(idx).filter(|nb| atoms[nb.index()].in_ring).count();
        atoms[idx.index()].ring_connections = count;
    }

    let aromaticity = detect_aromaticity(mol, &all).inspect_err(|e| {
        debug!(error = %e, "aromaticity perception failed");
    })?;
    for (ann, &flag) in atoms.iter_mut().zip(&aromaticity.atoms) {
        ann.aromatic = flag;
    }
    for (ann, &flag) in bonds.iter_mut().zip(&aromaticity.bonds) {
        ann.aromatic = flag;
    }

    trace!(
        atoms = atoms.len(),
        bonds = bonds.len(),
        rings = all.len(),
        sssr = smallest.len(),
        aromatic_atoms = atoms.iter().filter(|a| a.aromatic).count(),
        "annotated target"
    );

    Ok(Annotations {
        atoms,
        bonds,
        all_rings: all,
        sssr: smallest,
    })
}
