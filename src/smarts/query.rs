use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::bind::MatchContext;
use crate::bond::BondOrder;
use crate::mol::Mol;

/// A compiled SMARTS pattern: predicate atoms joined by predicate bonds.
pub type QueryGraph = Mol<AtomExpr, BondExpr>;

/// Boolean connective of a logical expression node. `Not` is the only unary
/// connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

/// Leaf test on a single target atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomPrimitive {
    /// Matches any atom (`*`).
    Any,
    /// Matches by element. `aromatic` is `None` for `#n` (either), `Some(true)`
    /// for lowercase (`c`), `Some(false)` for uppercase (`C`).
    Element { atomic_num: u8, aromatic: Option<bool> },
    /// Perceived aromatic atom (`a`).
    Aromatic,
    /// Atom not perceived aromatic (`A`).
    Aliphatic,
    /// Mass number (`13C`).
    Isotope(u16),
    /// Explicit neighbor count (`D`).
    Degree(u8),
    /// Group valence less formal charge (`v`).
    Valence(u8),
    /// Neighbors plus implicit hydrogens (`X`).
    Connectivity(u8),
    /// Implicit hydrogen count (`h`).
    ImplicitHCount(u8),
    /// Member of any ring (`R`, `r`).
    InRing,
    /// Member of no ring (`R0`, `r0`).
    NotInRing,
    /// Number of smallest-set rings through the atom (`R<n>`).
    RingMembership(u8),
    /// Size of the smallest ring through the atom (`r<n>`).
    SmallestRingSize(u8),
    /// Number of neighbors that are ring atoms (`x<n>`).
    RingConnectivity(u8),
    /// Formal charge (`+`, `-2`, `++`).
    Charge(i8),
}

/// Predicate atom of a query graph.
///
/// Logical nodes form a strict binary tree; `right` is `None` exactly when
/// `op` is [`LogicalOp::Not`].
#[derive(Debug, Clone, PartialEq)]
pub enum AtomExpr {
    Primitive(AtomPrimitive),
    Logical {
        op: LogicalOp,
        left: Box<AtomExpr>,
        right: Option<Box<AtomExpr>>,
    },
    /// Nested pattern (`$(...)`), holding where its first atom can anchor an
    /// occurrence in the target.
    Recursive(RecursivePattern),
    /// Total hydrogen count, implicit plus explicit neighbors (`H<n>`).
    HydrogenCount(u8),
}

/// An embedded query owned by its recursive predicate. `id` keys the
/// predicate's binding and is unique within one compiled pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct RecursivePattern {
    pub id: usize,
    pub query: Box<QueryGraph>,
}

/// Leaf test on a single target bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondPrimitive {
    /// Any bond (`~`).
    Any,
    /// Single bond that is not aromatic (`-`).
    Single,
    /// Double bond that is not aromatic (`=`).
    Double,
    /// Triple bond (`#`).
    Triple,
    /// Aromatic bond (`:`).
    Aromatic,
    /// Ring bond (`@`).
    Ring,
    /// Implicit SMARTS bond: single or aromatic.
    SingleOrAromatic,
}

/// Predicate bond of a query graph. Same tree shape as [`AtomExpr`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BondExpr {
    Primitive(BondPrimitive),
    Logical {
        op: LogicalOp,
        left: Box<BondExpr>,
        right: Option<Box<BondExpr>>,
    },
}

impl AtomExpr {
    pub fn and(left: AtomExpr, right: AtomExpr) -> Self {
        AtomExpr::Logical {
            op: LogicalOp::And,
            left: Box::new(left),
            right: Some(Box::new(right)),
        }
    }

    pub fn or(left: AtomExpr, right: AtomExpr) -> Self {
        AtomExpr::Logical {
            op: LogicalOp::Or,
            left: Box::new(left),
            right: Some(Box::new(right)),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: AtomExpr) -> Self {
        AtomExpr::Logical {
            op: LogicalOp::Not,
            left: Box::new(inner),
            right: None,
        }
    }

    /// Evaluate this predicate on target atom `idx`.
    pub fn matches(&self, idx: NodeIndex, ctx: &MatchContext) -> bool {
        match self {
            AtomExpr::Primitive(p) => p.matches(idx, ctx),
            AtomExpr::Logical { op, left, right } => match (op, right) {
                (LogicalOp::Not, _) => !left.matches(idx, ctx),
                (LogicalOp::And, Some(right)) => left.matches(idx, ctx) && right.matches(idx, ctx),
                (LogicalOp::Or, Some(right)) => left.matches(idx, ctx) || right.matches(idx, ctx),
                (_, None) => left.matches(idx, ctx),
            },
            AtomExpr::Recursive(pattern) => ctx.bindings.holds(pattern.id, idx),
            AtomExpr::HydrogenCount(n) => ctx.annotations.atom(idx).total_h_count == *n as usize,
        }
    }
}

impl AtomPrimitive {
    pub fn matches(&self, idx: NodeIndex, ctx: &MatchContext) -> bool {
        let atom = ctx.mol.atom(idx);
        let ann = ctx.annotations.atom(idx);
        match self {
            AtomPrimitive::Any => true,
            AtomPrimitive::Element {
                atomic_num,
                aromatic,
            } => atom.atomic_num == *atomic_num && aromatic.is_none_or(|a| ann.aromatic == a),
            AtomPrimitive::Aromatic => ann.aromatic,
            AtomPrimitive::Aliphatic => !ann.aromatic,
            AtomPrimitive::Isotope(iso) => atom.isotope == *iso,
            AtomPrimitive::Degree(d) => ctx.mol.degree(idx) == *d as usize,
            AtomPrimitive::Valence(v) => ann.valence == Some(*v as i32),
            AtomPrimitive::Connectivity(x) => ann.total_connections == *x as usize,
            AtomPrimitive::ImplicitHCount(h) => atom.hydrogen_count == *h,
            AtomPrimitive::InRing => ann.in_ring,
            AtomPrimitive::NotInRing => !ann.in_ring,
            AtomPrimitive::RingMembership(n) => ann.smallest_rings.len() == *n as usize,
            AtomPrimitive::SmallestRingSize(r) => {
                ctx.annotations.smallest_ring_size(idx) == Some(*r as usize)
            }
            AtomPrimitive::RingConnectivity(x) => ann.ring_connections == *x as usize,
            AtomPrimitive::Charge(c) => atom.formal_charge == *c,
        }
    }
}

impl BondExpr {
    pub fn and(left: BondExpr, right: BondExpr) -> Self {
        BondExpr::Logical {
            op: LogicalOp::And,
            left: Box::new(left),
            right: Some(Box::new(right)),
        }
    }

    pub fn or(left: BondExpr, right: BondExpr) -> Self {
        BondExpr::Logical {
            op: LogicalOp::Or,
            left: Box::new(left),
            right: Some(Box::new(right)),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: BondExpr) -> Self {
        BondExpr::Logical {
            op: LogicalOp::Not,
            left: Box::new(inner),
            right: None,
        }
    }

    /// Evaluate this predicate on target bond `edge`.
    pub fn matches(&self, edge: EdgeIndex, ctx: &MatchContext) -> bool {
        match self {
            BondExpr::Primitive(p) => p.matches(edge, ctx),
            BondExpr::Logical { op, left, right } => match (op, right) {
                (LogicalOp::Not, _) => !left.matches(edge, ctx),
                (LogicalOp::And, Some(right)) => {
                    left.matches(edge, ctx) && right.matches(edge, ctx)
                }
                (LogicalOp::Or, Some(right)) => left.matches(edge, ctx) || right.matches(edge, ctx),
                (_, None) => left.matches(edge, ctx),
            },
        }
    }
}

impl BondPrimitive {
    pub fn matches(&self, edge: EdgeIndex, ctx: &MatchContext) -> bool {
        let order = ctx.mol.bond(edge).order;
        let ann = ctx.annotations.bond(edge);
        let aromatic = ann.aromatic || order == BondOrder::Aromatic;
        match self {
            BondPrimitive::Any => true,
            BondPrimitive::Single => order == BondOrder::Single && !aromatic,
            BondPrimitive::Double => order == BondOrder::Double && !aromatic,
            BondPrimitive::Triple => order == BondOrder::Triple,
            BondPrimitive::Aromatic => aromatic,
            BondPrimitive::Ring => ann.in_ring,
            BondPrimitive::SingleOrAromatic => order == BondOrder::Single || aromatic,
        }
    }
}

impl Default for BondExpr {
    fn default() -> Self {
        BondExpr::Primitive(BondPrimitive::SingleOrAromatic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::{annotate, AnnotatorConfig};
    use crate::atom::Atom;
    use crate::bind::Bindings;
    use crate::bond::Bond;
    use crate::smiles::from_smiles;

    fn n(i: usize) -> NodeIndex {
        NodeIndex::new(i)
    }

    fn mol(smiles: &str) -> Mol<Atom, Bond> {
        from_smiles(smiles).unwrap_or_else(|e| panic!("bad SMILES {smiles:?}: {e}"))
    }

    fn prim(p: AtomPrimitive) -> AtomExpr {
        AtomExpr::Primitive(p)
    }

    fn atoms_matching(smiles: &str, expr: &AtomExpr) -> Vec<usize> {
        let target = mol(smiles);
        let annotations = annotate(&target, &AnnotatorConfig::default()).unwrap();
        let bindings = Bindings::default();
        let ctx = MatchContext {
            mol: &target,
            annotations: &annotations,
            bindings: &bindings,
        };
        target
            .atoms()
            .filter(|&i| expr.matches(i, &ctx))
            .map(|i| i.index())
            .collect()
    }

    fn bond_matches(smiles: &str, a: usize, b: usize, expr: &BondExpr) -> bool {
        let target = mol(smiles);
        let annotations = annotate(&target, &AnnotatorConfig::default()).unwrap();
        let bindings = Bindings::default();
        let ctx = MatchContext {
            mol: &target,
            annotations: &annotations,
            bindings: &bindings,
        };
        let edge = target.bond_between(n(a), n(b)).unwrap();
        expr.matches(edge, &ctx)
    }

    #[test]
    fn element_uses_perceived_aromaticity() {
        let aromatic_c = prim(AtomPrimitive::Element {
            atomic_num: 6,
            aromatic: Some(true),
        });
        let aliphatic_c = prim(AtomPrimitive::Element {
            atomic_num: 6,
            aromatic: Some(false),
        });
        assert_eq!(atoms_matching("CC1=CC=CC=C1", &aromatic_c), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(atoms_matching("CC1=CC=CC=C1", &aliphatic_c), vec![0]);
    }

    #[test]
    fn connectivity_and_hydrogens() {
        assert_eq!(atoms_matching("CCO", &prim(AtomPrimitive::Connectivity(2))), vec![2]);
        assert_eq!(atoms_matching("CCO", &prim(AtomPrimitive::ImplicitHCount(3))), vec![0]);
        assert_eq!(atoms_matching("CC(C)O", &prim(AtomPrimitive::Degree(3))), vec![1]);
        assert_eq!(atoms_matching("[H]OC", &AtomExpr::HydrogenCount(1)), vec![1]);
    }

    #[test]
    fn valence_is_group_valence_less_charge() {
        assert_eq!(
            atoms_matching("C[N+](C)(C)C", &prim(AtomPrimitive::Valence(4))),
            vec![0, 1, 2, 3, 4]
        );
        assert_eq!(atoms_matching("CN", &prim(AtomPrimitive::Valence(5))), vec![1]);
    }

    #[test]
    fn ring_primitives() {
        let spiro = "C1CC12CCC2";
        assert_eq!(atoms_matching(spiro, &prim(AtomPrimitive::RingMembership(2))), vec![2]);
        assert_eq!(atoms_matching(spiro, &prim(AtomPrimitive::SmallestRingSize(3))), vec![0, 1, 2]);
        assert_eq!(atoms_matching(spiro, &prim(AtomPrimitive::SmallestRingSize(4))), vec![3, 4, 5]);
        assert_eq!(atoms_matching("CC1CC1", &prim(AtomPrimitive::NotInRing)), vec![0]);
        assert_eq!(atoms_matching("CC1CC1", &prim(AtomPrimitive::RingConnectivity(1))), vec![0]);
    }

    #[test]
    fn logical_combinations() {
        let carbon = prim(AtomPrimitive::Element {
            atomic_num: 6,
            aromatic: None,
        });
        let ring = prim(AtomPrimitive::InRing);
        assert_eq!(
            atoms_matching("CC1CC1O", &AtomExpr::and(carbon.clone(), ring.clone())),
            vec![1, 2, 3]
        );
        assert_eq!(
            atoms_matching("CC1CC1O", &AtomExpr::or(carbon.clone(), ring)),
            vec![0, 1, 2, 3]
        );
        assert_eq!(atoms_matching("CC1CC1O", &AtomExpr::not(carbon)), vec![4]);
    }

    #[test]
    fn charge_and_isotope() {
        assert_eq!(atoms_matching("C[O-]", &prim(AtomPrimitive::Charge(-1))), vec![1]);
        assert_eq!(atoms_matching("C[13CH3]", &prim(AtomPrimitive::Isotope(13))), vec![1]);
    }

    #[test]
    fn unbound_recursive_predicate_fails() {
        let expr = AtomExpr::Recursive(RecursivePattern {
            id: 0,
            query: Box::new(QueryGraph::new()),
        });
        assert!(atoms_matching("CC", &expr).is_empty());
    }

    #[test]
    fn bond_primitives_on_kekule_benzene() {
        let single = BondExpr::Primitive(BondPrimitive::Single);
        let double = BondExpr::Primitive(BondPrimitive::Double);
        let aromatic = BondExpr::Primitive(BondPrimitive::Aromatic);
        let default = BondExpr::default();
        assert!(!bond_matches("C1=CC=CC=C1", 0, 1, &double));
        assert!(!bond_matches("C1=CC=CC=C1", 1, 2, &single));
        assert!(bond_matches("C1=CC=CC=C1", 0, 1, &aromatic));
        assert!(bond_matches("C1=CC=CC=C1", 0, 1, &default));
        assert!(bond_matches("C1=CCCCC1", 0, 1, &double));
        assert!(!bond_matches("C1=CCCCC1", 0, 1, &default));
    }

    #[test]
    fn bond_ring_and_logic() {
        let ring = BondExpr::Primitive(BondPrimitive::Ring);
        let single = BondExpr::Primitive(BondPrimitive::Single);
        assert!(bond_matches("CC1CC1", 1, 2, &ring));
        assert!(!bond_matches("CC1CC1", 0, 1, &ring));
        let acyclic_single = BondExpr::and(single, BondExpr::not(ring));
        assert!(bond_matches("CC1CC1", 0, 1, &acyclic_single));
        assert!(!bond_matches("CC1CC1", 1, 2, &acyclic_single));
        let triple_or_double = BondExpr::or(
            BondExpr::Primitive(BondPrimitive::Triple),
            BondExpr::Primitive(BondPrimitive::Double),
        );
        assert!(bond_matches("CC#N", 1, 2, &triple_or_double));
        assert!(!bond_matches("CC#N", 0, 1, &triple_or_double));
    }
}
