use std::collections::{HashSet, VecDeque};

use petgraph::graph::{EdgeIndex, NodeIndex};
use tracing::trace;

use crate::bind::MatchContext;
use crate::resolve::AtomMapping;
use crate::smarts::{AtomExpr, QueryGraph};

/// One occurrence of a query: `(query bond, target bond)` pairs in query
/// bond index order.
pub type BondMapping = Vec<(EdgeIndex, EdgeIndex)>;

/// All occurrences of a multi-atom query, as bond mappings.
///
/// Vertex embeddings that induce the same set of bond pairs count once; the
/// first one found wins. A query without bonds has no bond-level occurrences,
/// so single-atom queries go through [`single_atom_matches`] instead.
pub fn find_all(ctx: &MatchContext<'_>, query: &QueryGraph) -> Vec<BondMapping> {
    if query.bond_count() == 0 {
        return Vec::new();
    }

    let mut embeddings = Vec::new();
    Vf2::new(ctx, query, None).recurse(0, &mut embeddings, false);

    let mut seen: HashSet<Vec<(usize, usize)>> = HashSet::new();
    let mut out = Vec::new();
    for embedding in &embeddings {
        let mapping = bond_mapping(ctx, query, embedding);
        let mut key: Vec<(usize, usize)> = mapping
            .iter()
            .map(|(q, t)| (q.index(), t.index()))
            .collect();
        key.sort_unstable();
        if seen.insert(key) {
            out.push(mapping);
        }
    }

    trace!(
        embeddings = embeddings.len(),
        occurrences = out.len(),
        "enumerated query occurrences"
    );
    out
}

/// Target atoms satisfying a one-atom query, each as its own mapping, in
/// target index order.
pub fn single_atom_matches(ctx: &MatchContext<'_>, expr: &AtomExpr) -> Vec<AtomMapping> {
    ctx.mol
        .atoms()
        .filter(|&idx| expr.matches(idx, ctx))
        .map(|idx| vec![idx.index()])
        .collect()
}

/// Target atoms onto which query atom 0 can be mapped by some complete
/// embedding of `query`.
pub fn anchored_atoms(ctx: &MatchContext<'_>, query: &QueryGraph) -> HashSet<NodeIndex> {
    let mut anchors = HashSet::new();
    if query.atom_count() == 0 {
        return anchors;
    }
    let root = NodeIndex::new(0);
    let mut vf2 = Vf2::new(ctx, query, Some(root));
    for target in ctx.mol.atoms() {
        if !vf2.is_feasible(root, target) {
            continue;
        }
        vf2.query_map[root.index()] = Some(target);
        vf2.target_used[target.index()] = true;
        let mut found = Vec::new();
        vf2.recurse(1, &mut found, true);
        if !found.is_empty() {
            anchors.insert(target);
        }
        vf2.query_map[root.index()] = None;
        vf2.target_used[target.index()] = false;
    }
    anchors
}

fn bond_mapping(
    ctx: &MatchContext<'_>,
    query: &QueryGraph,
    embedding: &[NodeIndex],
) -> BondMapping {
    query
        .bonds()
        .map(|qe| {
            let (a, b) = query
                .bond_endpoints(qe)
                .expect("query bond must have endpoints");
            let te = ctx
                .mol
                .bond_between(embedding[a.index()], embedding[b.index()])
                .expect("embedding must preserve query bonds");
            (qe, te)
        })
        .collect()
}

/// Query atoms in the order they get mapped: breadth-first per connected
/// component, so every atom after a component's first has an already-mapped
/// neighbor. Components start from their highest-degree atom unless `root`
/// is given.
fn search_order(query: &QueryGraph, root: Option<NodeIndex>) -> Vec<NodeIndex> {
    let mut starts: Vec<NodeIndex> = query.atoms().collect();
    starts.sort_by(|&a, &b| query.degree(b).cmp(&query.degree(a)));
    if let Some(root) = root {
        starts.insert(0, root);
    }

    let mut visited = vec![false; query.atom_count()];
    let mut order = Vec::with_capacity(query.atom_count());
    for start in starts {
        if visited[start.index()] {
            continue;
        }
        visited[start.index()] = true;
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            let mut next: Vec<NodeIndex> = query
                .neighbors(node)
                .filter(|n| !visited[n.index()])
                .collect();
            next.sort_unstable();
            next.dedup();
            for n in next {
                visited[n.index()] = true;
                queue.push_back(n);
            }
        }
    }
    order
}

struct Vf2<'a, 'b> {
    ctx: &'a MatchContext<'b>,
    query: &'a QueryGraph,
    query_order: Vec<NodeIndex>,
    query_map: Vec<Option<NodeIndex>>,
    target_used: Vec<bool>,
}

impl<'a, 'b> Vf2<'a, 'b> {
    fn new(ctx: &'a MatchContext<'b>, query: &'a QueryGraph, root: Option<NodeIndex>) -> Self {
        Self {
            ctx,
            query,
            query_order: search_order(query, root),
            query_map: vec![None; query.atom_count()],
            target_used: vec![false; ctx.mol.atom_count()],
        }
    }

    fn recurse(&mut self, depth: usize, results: &mut Vec<Vec<NodeIndex>>, first_only: bool) {
        if depth == self.query_order.len() {
            let embedding: Option<Vec<NodeIndex>> = self.query_map.iter().copied().collect();
            if let Some(embedding) = embedding {
                results.push(embedding);
            }
            return;
        }

        if first_only && !results.is_empty() {
            return;
        }

        let query_node = self.query_order[depth];

        for target_node in self.candidates(query_node) {
            if self.target_used[target_node.index()] {
                continue;
            }
            if !self.is_feasible(query_node, target_node) {
                continue;
            }

            self.query_map[query_node.index()] = Some(target_node);
            self.target_used[target_node.index()] = true;

            self.recurse(depth + 1, results, first_only);

            self.query_map[query_node.index()] = None;
            self.target_used[target_node.index()] = false;

            if first_only && !results.is_empty() {
                return;
            }
        }
    }

    /// Neighbors of the target image of an already-mapped query neighbor, or
    /// every target atom when the query atom starts a new component.
    fn candidates(&self, query_node: NodeIndex) -> Vec<NodeIndex> {
        let anchor = self
            .query
            .neighbors(query_node)
            .find_map(|n| self.query_map[n.index()]);
        match anchor {
            Some(mapped) => {
                let mut next: Vec<NodeIndex> = self.ctx.mol.neighbors(mapped).collect();
                next.sort_unstable();
                next.dedup();
                next
            }
            None => self.ctx.mol.atoms().collect(),
        }
    }

    fn is_feasible(&self, query_node: NodeIndex, target_node: NodeIndex) -> bool {
        if !self.query.atom(query_node).matches(target_node, self.ctx) {
            return false;
        }

        for q_neighbor in self.query.neighbors(query_node) {
            let Some(t_mapped) = self.query_map[q_neighbor.index()] else {
                continue;
            };
            let q_bond = self
                .query
                .bond_between(query_node, q_neighbor)
                .expect("query neighbors must share a bond");
            match self.ctx.mol.bond_between(target_node, t_mapped) {
                Some(t_bond) => {
                    if !self.query.bond(q_bond).matches(t_bond, self.ctx) {
                        return false;
                    }
                }
                None => return false,
            }
        }

        true
    }
}
