use std::collections::VecDeque;

use petgraph::algo::connected_components;
use petgraph::graph::NodeIndex;
use thiserror::Error;

use crate::mol::Mol;

/// Failure of exhaustive ring perception.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingPerceptionError {
    /// The graph holds more simple cycles than the configured bound; usually
    /// a large fused or caged system.
    #[error("ring enumeration exceeded the limit of {limit} rings")]
    TooManyRings { limit: usize },
}

/// A collection of simple cycles, each a sequence of atom indices that
/// starts at its smallest index and proceeds towards the smaller of that
/// atom's two ring neighbors. Rings are ordered by size, then
/// lexicographically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingSet {
    rings: Vec<Vec<NodeIndex>>,
}

impl RingSet {
    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn rings(&self) -> &[Vec<NodeIndex>] {
        &self.rings
    }

    /// Positions (into [`rings`](Self::rings)) of the rings containing `atom`.
    pub fn rings_with_atom(&self, atom: NodeIndex) -> Vec<usize> {
        self.rings
            .iter()
            .enumerate()
            .filter(|(_, ring)| ring.contains(&atom))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn contains_bond(&self, a: NodeIndex, b: NodeIndex) -> bool {
        self.rings.iter().any(|ring| ring_has_edge(ring, a, b))
    }
}

/// Cyclomatic number `E - V + C`: the size of any smallest set of smallest
/// rings.
pub fn expected_ring_count<A, B>(mol: &Mol<A, B>) -> usize {
    let v = mol.atom_count();
    let e = mol.bond_count();
    let c = connected_components(mol.graph());
    (e + c).saturating_sub(v)
}

/// Smallest set of smallest rings, selected from Horton candidate cycles by
/// Gaussian elimination over GF(2) on edge bit vectors.
pub fn sssr<A, B>(mol: &Mol<A, B>) -> RingSet {
    let num_expected = expected_ring_count(mol);
    if num_expected == 0 {
        return RingSet::default();
    }

    let num_edges = mol.bond_count();
    let candidates = horton_candidates(mol);
    let rings = select_independent_rings(&candidates, num_expected, num_edges, mol);

    RingSet { rings }
}

/// Every simple cycle of the graph.
///
/// The search runs only over the 2-core (atoms that can lie on a cycle) and
/// fails once more than `max_rings` cycles have been found. Cycles longer
/// than `max_ring_size`, when given, are not reported.
pub fn all_rings<A, B>(
    mol: &Mol<A, B>,
    max_rings: usize,
    max_ring_size: Option<usize>,
) -> Result<RingSet, RingPerceptionError> {
    if expected_ring_count(mol) == 0 {
        return Ok(RingSet::default());
    }

    let n = mol.atom_count();
    let core = two_core(mol);
    let adj: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            if !core[i] {
                return Vec::new();
            }
            let mut nbs: Vec<usize> = mol
                .neighbors(NodeIndex::new(i))
                .map(|nb| nb.index())
                .filter(|&nb| core[nb])
                .collect();
            nbs.sort_unstable();
            nbs.dedup();
            nbs
        })
        .collect();

    let limit = max_ring_size.unwrap_or(n);
    let mut search = CycleSearch {
        adj: &adj,
        on_path: vec![false; n],
        path: Vec::new(),
        rings: Vec::new(),
        max_rings,
        max_len: limit,
    };

    for start in 0..n {
        if adj[start].len() < 2 {
            continue;
        }
        search.path.push(start);
        search.on_path[start] = true;
        let result = search.extend(start);
        search.on_path[start] = false;
        search.path.pop();
        result?;
    }

    let mut rings: Vec<Vec<NodeIndex>> = search
        .rings
        .into_iter()
        .map(|r| r.into_iter().map(NodeIndex::new).collect())
        .collect();
    rings.sort_by(|a: &Vec<NodeIndex>, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    Ok(RingSet { rings })
}

struct CycleSearch<'a> {
    adj: &'a [Vec<usize>],
    on_path: Vec<bool>,
    path: Vec<usize>,
    rings: Vec<Vec<usize>>,
    max_rings: usize,
    max_len: usize,
}

impl CycleSearch<'_> {
    // Cycles are rooted at their smallest atom, so only atoms above `start`
    // are walked; each cycle is reached once per direction and kept only in
    // the direction whose second atom is smaller than its last.
    fn extend(&mut self, start: usize) -> Result<(), RingPerceptionError> {
        let Some(&cur) = self.path.last() else {
            return Ok(());
        };
        let adj = self.adj;
        for &next in &adj[cur] {
            if next == start {
                if self.path.len() >= 3 && self.path[1] < cur {
                    if self.rings.len() >= self.max_rings {
                        return Err(RingPerceptionError::TooManyRings {
                            limit: self.max_rings,
                        });
                    }
                    self.rings.push(self.path.clone());
                }
                continue;
            }
            if next < start || self.on_path[next] || self.path.len() >= self.max_len {
                continue;
            }
            self.on_path[next] = true;
            self.path.push(next);
            let result = self.extend(start);
            self.path.pop();
            self.on_path[next] = false;
            result?;
        }
        Ok(())
    }
}

// Repeatedly strips atoms with fewer than two remaining neighbors.
fn two_core<A, B>(mol: &Mol<A, B>) -> Vec<bool> {
    let n = mol.atom_count();
    let mut degree: Vec<usize> = (0..n).map(|i| mol.degree(NodeIndex::new(i))).collect();
    let mut alive = vec![true; n];
    let mut stack: Vec<usize> = (0..n).filter(|&i| degree[i] < 2).collect();
    while let Some(i) = stack.pop() {
        if !alive[i] {
            continue;
        }
        alive[i] = false;
        for nb in mol.neighbors(NodeIndex::new(i)) {
            let j = nb.index();
            if alive[j] {
                degree[j] -= 1;
                if degree[j] < 2 {
                    stack.push(j);
                }
            }
        }
    }
    alive
}

fn ring_has_edge(ring: &[NodeIndex], a: NodeIndex, b: NodeIndex) -> bool {
    let len = ring.len();
    (0..len).any(|i| {
        let j = (i + 1) % len;
        (ring[i] == a && ring[j] == b) || (ring[i] == b && ring[j] == a)
    })
}

fn horton_candidates<A, B>(mol: &Mol<A, B>) -> Vec<Vec<NodeIndex>> {
    let n = mol.atom_count();
    let dist = all_pairs_bfs(mol, n);
    let pred = all_pairs_predecessors(mol, n, &dist);

    let mut candidates: Vec<Vec<NodeIndex>> = Vec::new();

    for edge in mol.bonds() {
        let (u, v) = match mol.bond_endpoints(edge) {
            Some(pair) => pair,
            None => continue,
        };
        for w_idx in 0..n {
            let w = NodeIndex::new(w_idx);
            let du = dist[w.index()][u.index()];
            let dv = dist[w.index()][v.index()];
            if du == u32::MAX || dv == u32::MAX {
                continue;
            }
            let ring_size = du as usize + dv as usize + 1;
            if ring_size < 3 {
                continue;
            }
            let path_u = reconstruct_path(&pred, w, u);
            let path_v = reconstruct_path(&pred, w, v);
            if paths_share_internal_node(&path_u, &path_v) {
                continue;
            }
            let mut ring = path_u;
            for &node in path_v[1..].iter().rev() {
                ring.push(node);
            }
            candidates.push(ring);
        }
    }

    candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    candidates.dedup();
    candidates
}

fn all_pairs_bfs<A, B>(mol: &Mol<A, B>, n: usize) -> Vec<Vec<u32>> {
    let mut dist = vec![vec![u32::MAX; n]; n];
    for (src_idx, row) in dist.iter_mut().enumerate() {
        let src = NodeIndex::new(src_idx);
        row[src_idx] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(src);
        while let Some(cur) = queue.pop_front() {
            let d = row[cur.index()];
            for nb in mol.neighbors(cur) {
                if row[nb.index()] == u32::MAX {
                    row[nb.index()] = d + 1;
                    queue.push_back(nb);
                }
            }
        }
    }
    dist
}

fn all_pairs_predecessors<A, B>(
    mol: &Mol<A, B>,
    n: usize,
    dist: &[Vec<u32>],
) -> Vec<Vec<Option<NodeIndex>>> {
    let mut pred = vec![vec![None; n]; n];
    for src_idx in 0..n {
        let src = NodeIndex::new(src_idx);
        let mut queue = VecDeque::new();
        queue.push_back(src);
        let mut visited = vec![false; n];
        visited[src_idx] = true;
        while let Some(cur) = queue.pop_front() {
            for nb in mol.neighbors(cur) {
                if !visited[nb.index()]
                    && dist[src_idx][nb.index()] == dist[src_idx][cur.index()] + 1
                {
                    visited[nb.index()] = true;
                    pred[src_idx][nb.index()] = Some(cur);
                    queue.push_back(nb);
                }
            }
        }
    }
    pred
}

fn reconstruct_path(
    pred: &[Vec<Option<NodeIndex>>],
    src: NodeIndex,
    dst: NodeIndex,
) -> Vec<NodeIndex> {
    let mut path = vec![dst];
    let mut cur = dst;
    while cur != src {
        match pred[src.index()][cur.index()] {
            Some(p) => {
                path.push(p);
                cur = p;
            }
            None => return vec![],
        }
    }
    path.reverse();
    path
}

fn paths_share_internal_node(path_u: &[NodeIndex], path_v: &[NodeIndex]) -> bool {
    if path_u.len() < 2 || path_v.len() < 2 {
        return false;
    }
    let internal_u = &path_u[1..];
    let internal_v = &path_v[1..];
    for node in internal_u {
        if internal_v.contains(node) {
            return true;
        }
    }
    false
}

fn ring_to_edge_bitvector<A, B>(
    ring: &[NodeIndex],
    num_edges: usize,
    mol: &Mol<A, B>,
) -> Vec<u64> {
    let num_words = num_edges.div_ceil(64);
    let mut bv = vec![0u64; num_words];
    let len = ring.len();
    for i in 0..len {
        let a = ring[i];
        let b = ring[(i + 1) % len];
        if let Some(edge) = mol.bond_between(a, b) {
            let idx = edge.index();
            bv[idx / 64] |= 1u64 << (idx % 64);
        }
    }
    bv
}

fn select_independent_rings<A, B>(
    candidates: &[Vec<NodeIndex>],
    num_needed: usize,
    num_edges: usize,
    mol: &Mol<A, B>,
) -> Vec<Vec<NodeIndex>> {
    let mut result = Vec::with_capacity(num_needed);
    let mut basis: Vec<Vec<u64>> = Vec::with_capacity(num_needed);

    for ring in candidates {
        if result.len() >= num_needed {
            break;
        }
        let bv = ring_to_edge_bitvector(ring, num_edges, mol);
        if bv.iter().all(|&w| w == 0) {
            continue;
        }
        if try_add_to_basis(&mut basis, bv) {
            result.push(normalize_ring(ring));
        }
    }

    result.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    result
}

fn try_add_to_basis(basis: &mut Vec<Vec<u64>>, candidate: Vec<u64>) -> bool {
    let mut v = candidate;
    for row in basis.iter() {
        let pivot = leading_bit(row);
        if let Some(p) = pivot {
            if v[p / 64] & (1u64 << (p % 64)) != 0 {
                xor_into(&mut v, row);
            }
        }
    }
    if v.iter().all(|&w| w == 0) {
        return false;
    }
    basis.push(v);
    true
}

fn leading_bit(bv: &[u64]) -> Option<usize> {
    for (i, &word) in bv.iter().enumerate() {
        if word != 0 {
            return Some(i * 64 + word.trailing_zeros() as usize);
        }
    }
    None
}

fn xor_into(a: &mut [u64], b: &[u64]) {
    for (aw, bw) in a.iter_mut().zip(b.iter()) {
        *aw ^= *bw;
    }
}

fn normalize_ring(ring: &[NodeIndex]) -> Vec<NodeIndex> {
    let Some(min_pos) = ring
        .iter()
        .enumerate()
        .min_by_key(|&(_, idx)| idx)
        .map(|(i, _)| i)
    else {
        return vec![];
    };

    let len = ring.len();
    let mut normalized = Vec::with_capacity(len);
    for i in 0..len {
        normalized.push(ring[(min_pos + i) % len]);
    }

    if len > 2 && normalized[1] > normalized[len - 1] {
        normalized[1..].reverse();
    }

    normalized
}
