//! SMARTS pattern compiler.
//!
//! [`compile`] turns pattern text into a [`QueryGraph`] whose atoms and bonds
//! are predicate trees. Stereochemistry (`@`, `/`, `\`) is rejected.

mod error;
mod parser;
pub mod query;

use petgraph::graph::NodeIndex;
use tracing::debug;

pub use error::SmartsError;
pub use query::{
    AtomExpr, AtomPrimitive, BondExpr, BondPrimitive, LogicalOp, QueryGraph, RecursivePattern,
};

/// Compile SMARTS text into a query graph.
///
/// Every recursive pattern, at any nesting depth, receives an id unique
/// within the returned graph. Nested patterns are numbered before the
/// pattern that contains them.
///
/// # Examples
///
/// ```
/// use crabquery::smarts::compile;
///
/// let query = compile("[$([OH]C=O)]").unwrap();
/// assert_eq!(query.atom_count(), 1);
/// assert!(compile("[C@H](F)Cl").is_err());
/// ```
pub fn compile(text: &str) -> Result<QueryGraph, SmartsError> {
    let mut query = parser::parse(text)?;
    let mut next_id = 0;
    number_recursive(&mut query, &mut next_id);
    debug!(
        pattern = text,
        atoms = query.atom_count(),
        bonds = query.bond_count(),
        recursive = next_id,
        "compiled SMARTS"
    );
    Ok(query)
}

fn number_recursive(query: &mut QueryGraph, next_id: &mut usize) {
    let atoms: Vec<NodeIndex> = query.atoms().collect();
    for idx in atoms {
        number_expr(query.atom_mut(idx), next_id);
    }
}

fn number_expr(expr: &mut AtomExpr, next_id: &mut usize) {
    match expr {
        AtomExpr::Recursive(pattern) => {
            number_recursive(&mut pattern.query, next_id);
            pattern.id = *next_id;
            *next_id += 1;
        }
        AtomExpr::Logical { left, right, .. } => {
            number_expr(left, next_id);
            if let Some(right) = right {
                number_expr(right, next_id);
            }
        }
        AtomExpr::Primitive(_) | AtomExpr::HydrogenCount(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smarts(s: &str) -> QueryGraph {
        compile(s).unwrap_or_else(|e| panic!("bad SMARTS {s:?}: {e}"))
    }

    fn atom0(s: &str) -> AtomExpr {
        smarts(s).atom(NodeIndex::new(0)).clone()
    }

    fn prim(p: AtomPrimitive) -> AtomExpr {
        AtomExpr::Primitive(p)
    }

    fn element(atomic_num: u8, aromatic: Option<bool>) -> AtomExpr {
        prim(AtomPrimitive::Element {
            atomic_num,
            aromatic,
        })
    }

    fn bond01(s: &str) -> BondExpr {
        let q = smarts(s);
        let edge = q
            .bond_between(NodeIndex::new(0), NodeIndex::new(1))
            .unwrap_or_else(|| panic!("no bond in {s:?}"));
        q.bond(edge).clone()
    }

    // ---- Atoms ----

    #[test]
    fn parse_elements() {
        assert_eq!(atom0("[#6]"), element(6, None));
        assert_eq!(atom0("[C]"), element(6, Some(false)));
        assert_eq!(atom0("[c]"), element(6, Some(true)));
        assert_eq!(atom0("C"), element(6, Some(false)));
        assert_eq!(atom0("c"), element(6, Some(true)));
        assert_eq!(atom0("Cl"), element(17, Some(false)));
        assert_eq!(atom0("Br"), element(35, Some(false)));
        assert_eq!(atom0("[Na]"), element(11, Some(false)));
        assert_eq!(atom0("[se]"), element(34, Some(true)));
        assert_eq!(atom0("[Hg]"), element(80, Some(false)));
    }

    #[test]
    fn parse_wildcards() {
        assert_eq!(atom0("*"), prim(AtomPrimitive::Any));
        assert_eq!(atom0("[*]"), prim(AtomPrimitive::Any));
        assert_eq!(atom0("a"), prim(AtomPrimitive::Aromatic));
        assert_eq!(atom0("A"), prim(AtomPrimitive::Aliphatic));
        assert_eq!(atom0("[a]"), prim(AtomPrimitive::Aromatic));
    }

    #[test]
    fn parse_count_primitives() {
        assert_eq!(atom0("[D2]"), prim(AtomPrimitive::Degree(2)));
        assert_eq!(atom0("[D]"), prim(AtomPrimitive::Degree(1)));
        assert_eq!(atom0("[v4]"), prim(AtomPrimitive::Valence(4)));
        assert_eq!(atom0("[X4]"), prim(AtomPrimitive::Connectivity(4)));
        assert_eq!(atom0("[h2]"), prim(AtomPrimitive::ImplicitHCount(2)));
        assert_eq!(atom0("[x3]"), prim(AtomPrimitive::RingConnectivity(3)));
        assert_eq!(atom0("[13]"), prim(AtomPrimitive::Isotope(13)));
    }

    #[test]
    fn parse_ring_primitives() {
        assert_eq!(atom0("[R]"), prim(AtomPrimitive::InRing));
        assert_eq!(atom0("[R0]"), prim(AtomPrimitive::NotInRing));
        assert_eq!(atom0("[R2]"), prim(AtomPrimitive::RingMembership(2)));
        assert_eq!(atom0("[r]"), prim(AtomPrimitive::InRing));
        assert_eq!(atom0("[r5]"), prim(AtomPrimitive::SmallestRingSize(5)));
    }

    #[test]
    fn parse_charges() {
        assert_eq!(atom0("[+]"), prim(AtomPrimitive::Charge(1)));
        assert_eq!(atom0("[-]"), prim(AtomPrimitive::Charge(-1)));
        assert_eq!(atom0("[+2]"), prim(AtomPrimitive::Charge(2)));
        assert_eq!(atom0("[--]"), prim(AtomPrimitive::Charge(-2)));
    }

    #[test]
    fn parse_hydrogen_count_versus_hydrogen_atom() {
        assert_eq!(atom0("[H]"), element(1, Some(false)));
        assert_eq!(
            atom0("[H+]"),
            AtomExpr::and(element(1, Some(false)), prim(AtomPrimitive::Charge(1)))
        );
        assert_eq!(
            atom0("[2H]"),
            AtomExpr::and(prim(AtomPrimitive::Isotope(2)), element(1, Some(false)))
        );
        assert_eq!(
            atom0("[OH]"),
            AtomExpr::and(element(8, Some(false)), AtomExpr::HydrogenCount(1))
        );
        assert_eq!(
            atom0("[CH2]"),
            AtomExpr::and(element(6, Some(false)), AtomExpr::HydrogenCount(2))
        );
    }

    #[test]
    fn parse_or() {
        assert_eq!(
            atom0("[C,N]"),
            AtomExpr::or(element(6, Some(false)), element(7, Some(false)))
        );
    }

    #[test]
    fn parse_not() {
        assert_eq!(atom0("[!C]"), AtomExpr::not(element(6, Some(false))));
        assert_eq!(
            atom0("[!!C]"),
            AtomExpr::not(AtomExpr::not(element(6, Some(false))))
        );
    }

    #[test]
    fn logical_trees_are_binary_and_left_associative() {
        let expected = AtomExpr::or(
            AtomExpr::or(element(6, Some(false)), element(7, Some(false))),
            element(8, Some(false)),
        );
        assert_eq!(atom0("[C,N,O]"), expected);
        match atom0("[C;R;D2]") {
            AtomExpr::Logical {
                op: LogicalOp::And,
                left,
                right: Some(right),
            } => {
                assert_eq!(*right, prim(AtomPrimitive::Degree(2)));
                assert!(matches!(*left, AtomExpr::Logical { op: LogicalOp::And, .. }));
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn parse_precedence_comma_semicolon() {
        let expected = AtomExpr::and(
            AtomExpr::or(element(6, Some(false)), element(7, Some(false))),
            AtomExpr::HydrogenCount(1),
        );
        assert_eq!(atom0("[C,N;H1]"), expected);
    }

    #[test]
    fn parse_precedence_high_and_binds_tighter_than_comma() {
        let expected = AtomExpr::or(
            AtomExpr::and(element(6, Some(false)), prim(AtomPrimitive::InRing)),
            element(7, Some(false)),
        );
        assert_eq!(atom0("[C&R,N]"), expected);
        assert_eq!(atom0("[CR,N]"), expected);
    }

    #[test]
    fn atom_map_class_is_ignored() {
        assert_eq!(atom0("[C:1]"), element(6, Some(false)));
    }

    // ---- Bonds ----

    #[test]
    fn parse_bond_primitives() {
        assert_eq!(bond01("CC"), BondExpr::Primitive(BondPrimitive::SingleOrAromatic));
        assert_eq!(bond01("C-C"), BondExpr::Primitive(BondPrimitive::Single));
        assert_eq!(bond01("C=C"), BondExpr::Primitive(BondPrimitive::Double));
        assert_eq!(bond01("C#C"), BondExpr::Primitive(BondPrimitive::Triple));
        assert_eq!(bond01("C~C"), BondExpr::Primitive(BondPrimitive::Any));
        assert_eq!(bond01("C:C"), BondExpr::Primitive(BondPrimitive::Aromatic));
        assert_eq!(bond01("C@C"), BondExpr::Primitive(BondPrimitive::Ring));
    }

    #[test]
    fn parse_bond_logic() {
        assert_eq!(
            bond01("C-!@C"),
            BondExpr::and(
                BondExpr::Primitive(BondPrimitive::Single),
                BondExpr::not(BondExpr::Primitive(BondPrimitive::Ring)),
            )
        );
        assert_eq!(
            bond01("C=,#C"),
            BondExpr::or(
                BondExpr::Primitive(BondPrimitive::Double),
                BondExpr::Primitive(BondPrimitive::Triple),
            )
        );
    }

    // ---- Graph shape ----

    #[test]
    fn branches_and_ring_closures() {
        let q = smarts("CC(=O)O");
        assert_eq!(q.atom_count(), 4);
        assert_eq!(q.bond_count(), 3);
        let edge = q.bond_between(NodeIndex::new(1), NodeIndex::new(2)).unwrap();
        assert_eq!(q.bond(edge), &BondExpr::Primitive(BondPrimitive::Double));

        let q = smarts("c1ccccc1");
        assert_eq!(q.atom_count(), 6);
        assert_eq!(q.bond_count(), 6);
        assert!(q.bond_between(NodeIndex::new(0), NodeIndex::new(5)).is_some());

        let q = smarts("C=1CCC1");
        let edge = q.bond_between(NodeIndex::new(0), NodeIndex::new(3)).unwrap();
        assert_eq!(q.bond(edge), &BondExpr::Primitive(BondPrimitive::Double));

        let q = smarts("C%12CC%12");
        assert_eq!(q.bond_count(), 3);
    }

    #[test]
    fn disconnected_components() {
        let q = smarts("C.O");
        assert_eq!(q.atom_count(), 2);
        assert_eq!(q.bond_count(), 0);
    }

    // ---- Recursive patterns ----

    #[test]
    fn recursive_patterns_are_numbered_inner_first() {
        let q = smarts("[$(C[$(O)]),$(N)]");
        let AtomExpr::Logical {
            op: LogicalOp::Or,
            left,
            right: Some(right),
        } = q.atom(NodeIndex::new(0))
        else {
            panic!("expected Or");
        };
        let AtomExpr::Recursive(outer) = &**left else {
            panic!("expected recursive left child");
        };
        let AtomExpr::Recursive(second) = &**right else {
            panic!("expected recursive right child");
        };
        assert_eq!(outer.id, 1);
        assert_eq!(second.id, 2);
        let AtomExpr::Recursive(inner) = outer.query.atom(NodeIndex::new(1)) else {
            panic!("expected nested recursive atom");
        };
        assert_eq!(inner.id, 0);
        assert_eq!(outer.query.atom_count(), 2);
    }

    #[test]
    fn recursive_ids_unique_across_atoms() {
        let q = smarts("[$(CO)][$(CN)]");
        let ids: Vec<usize> = q
            .atoms()
            .map(|i| match q.atom(i) {
                AtomExpr::Recursive(p) => p.id,
                other => panic!("expected recursive, got {other:?}"),
            })
            .collect();
        assert_eq!(ids, vec![0, 1]);
    }

    // ---- Errors ----

    #[test]
    fn errors() {
        assert_eq!(compile(""), Err(SmartsError::EmptyInput));
        assert_eq!(compile("  "), Err(SmartsError::EmptyInput));
        assert!(matches!(compile("["), Err(SmartsError::InvalidSmarts { .. })));
        assert!(matches!(compile("[C"), Err(SmartsError::UnclosedBracket { pos: 0 })));
        assert!(matches!(compile("[]"), Err(SmartsError::InvalidSmarts { pos: 0, .. })));
        assert_eq!(compile("C1CC"), Err(SmartsError::UnclosedRing { digit: 1 }));
        assert!(matches!(compile("C(C"), Err(SmartsError::UnmatchedParen { .. })));
        assert!(matches!(compile("C)C"), Err(SmartsError::UnmatchedParen { pos: 1 })));
        assert!(matches!(compile("[#0]"), Err(SmartsError::InvalidAtomicNum { .. })));
        assert!(matches!(compile("[#119]"), Err(SmartsError::InvalidAtomicNum { .. })));
        assert!(matches!(compile("[$(CC]"), Err(SmartsError::UnclosedRecursive { .. })));
        assert!(matches!(compile("C=="), Err(SmartsError::InvalidSmarts { .. })));
        assert!(matches!(compile("C-"), Err(SmartsError::InvalidSmarts { .. })));
        assert!(matches!(compile("Q"), Err(SmartsError::UnexpectedChar { pos: 0, ch: 'Q' })));
        assert!(matches!(compile("C11"), Err(SmartsError::InvalidSmarts { .. })));
    }

    #[test]
    fn stereo_is_unsupported() {
        assert_eq!(
            compile("[C@H](F)Cl"),
            Err(SmartsError::Unsupported {
                pos: 2,
                feature: "chirality"
            })
        );
        assert_eq!(
            compile("F/C=C/F"),
            Err(SmartsError::Unsupported {
                pos: 1,
                feature: "directional bond"
            })
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(SmartsError::EmptyInput.to_string(), "empty SMARTS string");
        assert_eq!(
            SmartsError::Unsupported {
                pos: 2,
                feature: "chirality"
            }
            .to_string(),
            "unsupported SMARTS feature 'chirality' at position 2"
        );
    }
}
