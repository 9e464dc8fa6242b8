use petgraph::graph::NodeIndex;
use thiserror::Error;

use crate::bond::BondOrder;
use crate::mol::Mol;
use crate::rings::RingSet;
use crate::traits::{HasAtomicNum, HasBondOrder, HasFormalCharge, HasHydrogenCount};

/// Failure of aromaticity perception.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AromaticityError {
    /// The ring set refers to an atom the molecule does not have, i.e. it was
    /// perceived on a different graph.
    #[error("ring {ring} refers to atom {atom}, which is not in the molecule")]
    RingAtomOutOfRange { ring: usize, atom: usize },
}

/// Per-atom and per-bond aromatic flags, indexed by node and edge index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aromaticity {
    pub atoms: Vec<bool>,
    pub bonds: Vec<bool>,
}

const SP2_CAPABLE: [u8; 9] = [
    5,  // B
    6,  // C
    7,  // N
    8,  // O
    15, // P
    16, // S
    33, // As
    34, // Se
    52, // Te
];

/// Hückel aromaticity over every ring of `rings`.
///
/// A ring is aromatic when all of its atoms are sp2-capable, none of its
/// bonds is triple, every atom can donate a defined number of pi electrons
/// and the total satisfies 4n + 2. All atoms and bonds of an aromatic ring
/// are flagged. Passing the exhaustive ring set lets fused systems be judged
/// through their envelope rings as well as their individual rings.
pub fn detect_aromaticity<A, B>(
    mol: &Mol<A, B>,
    rings: &RingSet,
) -> Result<Aromaticity, AromaticityError>
where
    A: HasAtomicNum + HasFormalCharge + HasHydrogenCount,
    B: HasBondOrder,
{
    let n = mol.atom_count();
    for (ring_idx, ring) in rings.rings().iter().enumerate() {
        if let Some(atom) = ring.iter().find(|a| a.index() >= n) {
            return Err(AromaticityError::RingAtomOutOfRange {
                ring: ring_idx,
                atom: atom.index(),
            });
        }
    }

    let mut in_ring = vec![false; n];
    for ring in rings.rings() {
        for atom in ring {
            in_ring[atom.index()] = true;
        }
    }

    let mut result = Aromaticity {
        atoms: vec![false; n],
        bonds: vec![false; mol.bond_count()],
    };

    for ring in rings.rings() {
        if !is_aromatic_ring(mol, ring, &in_ring) {
            continue;
        }
        for (i, &atom) in ring.iter().enumerate() {
            result.atoms[atom.index()] = true;
            let next = ring[(i + 1) % ring.len()];
            if let Some(edge) = mol.bond_between(atom, next) {
                result.bonds[edge.index()] = true;
            }
        }
    }

    Ok(result)
}

fn is_aromatic_ring<A, B>(mol: &Mol<A, B>, ring: &[NodeIndex], in_ring: &[bool]) -> bool
where
    A: HasAtomicNum + HasFormalCharge + HasHydrogenCount,
    B: HasBondOrder,
{
    if ring.len() < 3 {
        return false;
    }

    if ring
        .iter()
        .any(|&atom| !SP2_CAPABLE.contains(&mol.atom(atom).atomic_num()))
    {
        return false;
    }

    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        if let Some(edge) = mol.bond_between(a, b) {
            if mol.bond(edge).bond_order() == BondOrder::Triple {
                return false;
            }
        }
    }

    let mut pi_total: u8 = 0;
    for (i, &atom) in ring.iter().enumerate() {
        match pi_electrons(mol, atom, ring, i, in_ring) {
            Some(e) => pi_total = pi_total.saturating_add(e),
            None => return false,
        }
    }

    is_huckel(pi_total)
}

fn pi_electrons<A, B>(
    mol: &Mol<A, B>,
    atom_idx: NodeIndex,
    ring: &[NodeIndex],
    pos_in_ring: usize,
    in_ring: &[bool],
) -> Option<u8>
where
    A: HasAtomicNum + HasFormalCharge + HasHydrogenCount,
    B: HasBondOrder,
{
    let atom = mol.atom(atom_idx);
    let charge = atom.formal_charge();

    let bonds = BondSummary::of(mol, atom_idx, ring, pos_in_ring, in_ring);
    let total_degree = mol.degree(atom_idx) as u8 + atom.hydrogen_count();

    match atom.atomic_num() {
        6 => {
            if bonds.exocyclic_hetero_double {
                return Some(0);
            }
            match charge {
                0 => (bonds.ring_system_double || bonds.aromatic_in_ring).then_some(1),
                -1 => Some(2),
                1 => Some(if bonds.ring_system_double { 1 } else { 0 }),
                _ => None,
            }
        }
        7 | 15 | 33 => match charge {
            0 => {
                if bonds.ring_system_double {
                    Some(1)
                } else if bonds.aromatic_in_ring {
                    if atom.hydrogen_count() > 0 || mol.degree(atom_idx) >= 3 {
                        Some(2)
                    } else {
                        Some(1)
                    }
                } else if total_degree <= 3 {
                    Some(2)
                } else {
                    None
                }
            }
            1 => (bonds.double_in_ring || bonds.aromatic_in_ring).then_some(1),
            -1 => Some(2),
            _ => None,
        },
        8 | 16 | 34 | 52 => {
            if bonds.double_in_ring || charge == 1 {
                Some(1)
            } else {
                Some(2)
            }
        }
        5 => Some(if bonds.ring_system_double { 1 } else { 0 }),
        _ => None,
    }
}

struct BondSummary {
    /// A double bond to the ring neighbor before or after the atom.
    double_in_ring: bool,
    /// A double bond to any ring atom, inside this ring or a fused one.
    ring_system_double: bool,
    /// A double bond leaving the ring system to N, O or S (carbonyl-like).
    exocyclic_hetero_double: bool,
    /// An input-aromatic bond to a ring neighbor.
    aromatic_in_ring: bool,
}

impl BondSummary {
    fn of<A, B>(
        mol: &Mol<A, B>,
        atom_idx: NodeIndex,
        ring: &[NodeIndex],
        pos_in_ring: usize,
        in_ring: &[bool],
    ) -> Self
    where
        A: HasAtomicNum,
        B: HasBondOrder,
    {
        let len = ring.len();
        let prev = ring[(pos_in_ring + len - 1) % len];
        let next = ring[(pos_in_ring + 1) % len];

        let mut summary = Self {
            double_in_ring: false,
            ring_system_double: false,
            exocyclic_hetero_double: false,
            aromatic_in_ring: false,
        };

        for nb in mol.neighbors(atom_idx) {
            let Some(edge) = mol.bond_between(atom_idx, nb) else {
                continue;
            };
            let order = mol.bond(edge).bond_order();
            let ring_neighbor = nb == prev || nb == next;
            match order {
                BondOrder::Double => {
                    if ring_neighbor {
                        summary.double_in_ring = true;
                    }
                    if in_ring[nb.index()] {
                        summary.ring_system_double = true;
                    } else if matches!(mol.atom(nb).atomic_num(), 7 | 8 | 16) {
                        summary.exocyclic_hetero_double = true;
                    }
                }
                BondOrder::Aromatic if ring_neighbor => summary.aromatic_in_ring = true,
                _ => {}
            }
        }

        summary
    }
}

fn is_huckel(pi_electrons: u8) -> bool {
    if pi_electrons < 2 {
        return false;
    }
    (pi_electrons - 2) % 4 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::bond::Bond;
    use crate::rings::all_rings;
    use crate::smiles::from_smiles;

    fn perceive(smiles: &str) -> Aromaticity {
        let mol = from_smiles(smiles).unwrap_or_else(|e| panic!("bad SMILES {smiles:?}: {e}"));
        let rings = all_rings(&mol, 10_000, None).unwrap();
        detect_aromaticity(&mol, &rings).unwrap()
    }

    fn all_atoms(smiles: &str) -> bool {
        perceive(smiles).atoms.iter().all(|&a| a)
    }

    fn no_atoms(smiles: &str) -> bool {
        perceive(smiles).atoms.iter().all(|&a| !a)
    }

    #[test]
    fn benzene_lowercase() {
        let arom = perceive("c1ccccc1");
        assert_eq!(arom.atoms.len(), 6);
        assert!(arom.atoms.iter().all(|&a| a));
        assert!(arom.bonds.iter().all(|&b| b));
    }

    #[test]
    fn benzene_kekule() {
        assert!(all_atoms("C1=CC=CC=C1"));
    }

    #[test]
    fn cyclohexane_none_aromatic() {
        assert!(no_atoms("C1CCCCC1"));
    }

    #[test]
    fn heteroaromatic_five_and_six_rings() {
        assert!(all_atoms("c1ccncc1"));
        assert!(all_atoms("[nH]1cccc1"));
        assert!(all_atoms("o1cccc1"));
        assert!(all_atoms("s1cccc1"));
    }

    #[test]
    fn pyrrole_kekule() {
        assert!(all_atoms("N1C=CC=C1"));
    }

    #[test]
    fn naphthalene_kekule_fusion_bond_aromatic() {
        let mol = from_smiles("C1=CC=C2C=CC=CC2=C1").unwrap();
        let rings = all_rings(&mol, 10_000, None).unwrap();
        let arom = detect_aromaticity(&mol, &rings).unwrap();
        assert!(arom.atoms.iter().all(|&a| a));
        assert!(arom.bonds.iter().all(|&b| b));
    }

    #[test]
    fn cyclopentadienyl_anion_aromatic() {
        assert!(all_atoms("[CH-]1C=CC=C1"));
    }

    #[test]
    fn cyclopentadiene_not_aromatic() {
        assert!(no_atoms("C1=CCC=C1"));
    }

    #[test]
    fn cyclooctatetraene_not_aromatic() {
        assert!(no_atoms("C1=CC=CC=CC=C1"));
    }

    #[test]
    fn benzoquinone_not_aromatic() {
        assert!(no_atoms("O=C1C=CC(=O)C=C1"));
    }

    #[test]
    fn pyridone_aromatic() {
        let arom = perceive("O=C1C=CC=CN1");
        assert!(!arom.atoms[0]);
        assert!(arom.atoms[1..].iter().all(|&a| a));
    }

    #[test]
    fn phenol_ring_aromatic_oxygen_not() {
        let arom = perceive("Oc1ccccc1");
        assert!(!arom.atoms[0]);
        assert!(arom.atoms[1..].iter().all(|&a| a));
        let exocyclic = arom.bonds[0];
        assert!(!exocyclic);
    }

    #[test]
    fn hand_built_kekule_benzene() {
        let mut mol = Mol::new();
        let atoms: Vec<_> = (0..6)
            .map(|_| {
                mol.add_atom(Atom {
                    atomic_num: 6,
                    hydrogen_count: 1,
                    ..Atom::default()
                })
            })
            .collect();
        for i in 0..6 {
            let order = if i % 2 == 0 {
                BondOrder::Double
            } else {
                BondOrder::Single
            };
            mol.add_bond(atoms[i], atoms[(i + 1) % 6], Bond::new(order));
        }
        let rings = all_rings(&mol, 100, None).unwrap();
        let arom = detect_aromaticity(&mol, &rings).unwrap();
        assert!(arom.atoms.iter().all(|&a| a));
    }

    #[test]
    fn foreign_ring_set_is_rejected() {
        let big = from_smiles("C1CCCCC1").unwrap();
        let small = from_smiles("CC").unwrap();
        let rings = all_rings(&big, 100, None).unwrap();
        let err = detect_aromaticity(&small, &rings).unwrap_err();
        assert!(matches!(
            err,
            AromaticityError::RingAtomOutOfRange { ring: 0, atom } if atom >= 2
        ));
    }

    #[test]
    fn huckel_rule() {
        assert!(!is_huckel(0));
        assert!(!is_huckel(1));
        assert!(is_huckel(2));
        assert!(!is_huckel(4));
        assert!(is_huckel(6));
        assert!(!is_huckel(8));
        assert!(is_huckel(10));
        assert!(is_huckel(14));
    }
}
