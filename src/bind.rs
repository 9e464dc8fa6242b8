use std::collections::{HashMap, HashSet};

use petgraph::graph::NodeIndex;
use tracing::trace;

use crate::annotate::Annotations;
use crate::atom::Atom;
use crate::bond::Bond;
use crate::matcher::anchored_atoms;
use crate::mol::Mol;
use crate::smarts::{AtomExpr, QueryGraph};

/// Everything a predicate needs to evaluate against one target graph.
pub struct MatchContext<'a> {
    pub mol: &'a Mol<Atom, Bond>,
    pub annotations: &'a Annotations,
    pub bindings: &'a Bindings,
}

/// Per-target state of the predicates in a query graph.
///
/// A recursive predicate with id `k` is bound to the set of target atoms at
/// which its embedded pattern's first atom can anchor an occurrence.
/// Hydrogen-count predicates need no entry: they are bound through the
/// annotation table of the [`MatchContext`] they are evaluated with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    anchors: HashMap<usize, HashSet<NodeIndex>>,
}

impl Bindings {
    /// Whether recursive predicate `id` holds at target atom `atom`. An
    /// unbound predicate holds nowhere.
    pub fn holds(&self, id: usize, atom: NodeIndex) -> bool {
        self.anchors.get(&id).is_some_and(|set| set.contains(&atom))
    }

    pub fn anchors(&self, id: usize) -> Option<&HashSet<NodeIndex>> {
        self.anchors.get(&id)
    }

    /// Number of bound recursive predicates, nested ones included.
    pub fn recursive_count(&self) -> usize {
        self.anchors.len()
    }
}

/// Bind every recursive predicate of `query` to `target`.
///
/// Atoms are visited in index order and logical trees depth-first, left
/// child before right. A recursive pattern's own nested patterns are bound
/// before the pattern itself is evaluated.
pub fn bind(
    query: &QueryGraph,
    target: &Mol<Atom, Bond>,
    annotations: &Annotations,
) -> Bindings {
    let mut bindings = Bindings::default();
    bind_query(query, target, annotations, &mut bindings);
    trace!(recursive = bindings.recursive_count(), "bound query predicates");
    bindings
}

fn bind_query(
    query: &QueryGraph,
    target: &Mol<Atom, Bond>,
    annotations: &Annotations,
    bindings: &mut Bindings,
) {
    for idx in query.atoms() {
        bind_expr(query.atom(idx), target, annotations, bindings);
    }
}

fn bind_expr(
    expr: &AtomExpr,
    target: &Mol<Atom, Bond>,
    annotations: &Annotations,
    bindings: &mut Bindings,
) {
    match expr {
        AtomExpr::Recursive(pattern) => {
            bind_query(&pattern.query, target, annotations, bindings);
            let anchors = {
                let ctx = MatchContext {
                    mol: target,
                    annotations,
                    bindings,
                };
                anchored_atoms(&ctx, &pattern.query)
            };
            trace!(id = pattern.id, anchors = anchors.len(), "bound recursive pattern");
            bindings.anchors.insert(pattern.id, anchors);
        }
        AtomExpr::Logical { left, right, .. } => {
            bind_expr(left, target, annotations, bindings);
            if let Some(right) = right {
                bind_expr(right, target, annotations, bindings);
            }
        }
        AtomExpr::Primitive(_) | AtomExpr::HydrogenCount(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::{annotate, AnnotatorConfig};
    use crate::smarts::compile;
    use crate::smiles::from_smiles;

    fn mol(smiles: &str) -> Mol<Atom, Bond> {
        from_smiles(smiles).unwrap_or_else(|e| panic!("bad SMILES {smiles:?}: {e}"))
    }

    fn smarts(s: &str) -> QueryGraph {
        compile(s).unwrap_or_else(|e| panic!("bad SMARTS {s:?}: {e}"))
    }

    fn bound(pattern: &str, smiles: &str) -> Bindings {
        let target = mol(smiles);
        let annotations = annotate(&target, &AnnotatorConfig::default()).unwrap();
        bind(&smarts(pattern), &target, &annotations)
    }

    fn sorted(set: Option<&HashSet<NodeIndex>>) -> Vec<usize> {
        let mut v: Vec<usize> = set.into_iter().flatten().map(|n| n.index()).collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn plain_query_binds_nothing() {
        let b = bound("CC", "CCO");
        assert_eq!(b, Bindings::default());
    }

    #[test]
    fn recursive_binds_first_atom_images() {
        let b = bound("[$(CO)]", "CCO");
        assert_eq!(sorted(b.anchors(0)), vec![1]);
        assert!(b.holds(0, NodeIndex::new(1)));
        assert!(!b.holds(0, NodeIndex::new(0)));
    }

    #[test]
    fn recursive_anchor_is_query_atom_zero() {
        let b = bound("[$(OC)]", "CCO");
        assert_eq!(sorted(b.anchors(0)), vec![2]);
    }

    #[test]
    fn single_atom_recursive_pattern() {
        let b = bound("[$([C;R])]", "CC1CC1");
        assert_eq!(sorted(b.anchors(0)), vec![1, 2, 3]);
    }

    #[test]
    fn nested_patterns_bound_first() {
        let b = bound("[$(C[$([OH])])]", "OCC(=O)CO");
        assert_eq!(b.recursive_count(), 2);
        assert_eq!(sorted(b.anchors(0)), vec![0, 5]);
        assert_eq!(sorted(b.anchors(1)), vec![1, 4]);
    }

    #[test]
    fn recursive_inside_logical_tree() {
        let b = bound("[!$(C=O);C]", "CC(=O)C");
        assert_eq!(sorted(b.anchors(0)), vec![1]);
    }

    #[test]
    fn hydrogen_counts_need_no_binding() {
        let b = bound("[CH3][OH]", "CO");
        assert_eq!(b, Bindings::default());
    }

    #[test]
    fn unbound_id_holds_nowhere() {
        let b = Bindings::default();
        assert!(!b.holds(7, NodeIndex::new(0)));
        assert!(b.anchors(7).is_none());
    }
}
