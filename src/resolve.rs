use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use tracing::trace;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::matcher::BondMapping;
use crate::mol::Mol;

/// Target atom indices of one match, in first-seen order.
pub type AtomMapping = Vec<usize>;

/// Convert bond-level occurrences into atom mappings.
///
/// Atoms are collected by walking each occurrence's target bonds in query
/// bond order and taking endpoints as stored, skipping repeats. An occurrence
/// covering exactly one target bond between two atoms of the same element
/// is emitted twice, back to back.
pub fn resolve(occurrences: &[BondMapping], target: &Mol<Atom, Bond>) -> Vec<AtomMapping> {
    let mut out = Vec::with_capacity(occurrences.len());
    for occurrence in occurrences {
        let mut atoms: AtomMapping = Vec::new();
        for &(_, bond) in occurrence {
            let Some((a, b)) = target.bond_endpoints(bond) else {
                continue;
            };
            for idx in [a.index(), b.index()] {
                if !atoms.contains(&idx) {
                    atoms.push(idx);
                }
            }
        }

        let symmetric = occurrence.len() == 1
            && atoms.len() == 2
            && target.atom(NodeIndex::new(atoms[0])).atomic_num
                == target.atom(NodeIndex::new(atoms[1])).atomic_num;
        if symmetric {
            out.push(atoms.clone());
        }
        out.push(atoms);
    }
    trace!(occurrences = occurrences.len(), mappings = out.len(), "resolved atom mappings");
    out
}

/// Mappings with distinct atom sets, as sorted index lists, keeping the
/// first of each in input order.
pub fn unique_of(mappings: &[AtomMapping]) -> Vec<AtomMapping> {
    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    let mut out = Vec::new();
    for mapping in mappings {
        let mut sorted = mapping.clone();
        sorted.sort_unstable();
        if seen.insert(sorted.clone()) {
            out.push(sorted);
        }
    }
    out
}
