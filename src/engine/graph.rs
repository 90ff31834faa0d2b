// Boundary graph walks over a set of edges.
//
//   find_edge_cycles() → lazy closed cycles (BFS from each unvisited vertex)
//   find_edge_strips() → open strips between degree-1 endpoints
//   get_strip_verts()  → ordered vertex sequence of an edge strip
//   walk_to_corner()   → BFS along boundary (non-manifold) edges to a target edge set
//
// Everything here depends only on `Adjacency`. Boundary selections are
// small (tens of edges), so the quadratic / path-enumerating searches are fine.

use std::collections::{HashMap, HashSet, VecDeque};

use super::mesh::{Adjacency, EdgeId, VertId};

/// Cap on partial paths explored from one start vertex while looking for a cycle.
const MAX_CYCLE_PATHS: usize = 1 << 14;

fn other_vert(adj: &(impl Adjacency + ?Sized), e: EdgeId, v: VertId) -> Option<VertId> {
    let [a, b] = adj.edge_verts(e)?;
    if a == v { Some(b) } else if b == v { Some(a) } else { None }
}

fn shared_vert(adj: &(impl Adjacency + ?Sized), e0: EdgeId, e1: EdgeId) -> Option<VertId> {
    let [a, b] = adj.edge_verts(e0)?;
    let other = adj.edge_verts(e1)?;
    if other.contains(&a) {
        Some(a)
    } else if other.contains(&b) {
        Some(b)
    } else {
        None
    }
}

/// Vertices touched by `edges`, sorted for a deterministic walk order.
fn verts_of(adj: &(impl Adjacency + ?Sized), edges: &HashSet<EdgeId>) -> Vec<VertId> {
    let mut verts: Vec<VertId> = edges
        .iter()
        .filter_map(|&e| adj.edge_verts(e))
        .flatten()
        .collect();
    verts.sort_unstable();
    verts.dedup();
    verts
}

// ============================================================================
// CYCLES
// ============================================================================

/// Lazy iterator returned by [`find_edge_cycles`].
pub struct EdgeCycles<'a, A: Adjacency + ?Sized> {
    adj: &'a A,
    edges: &'a HashSet<EdgeId>,
    starts: VecDeque<VertId>,
    visited_verts: HashSet<VertId>,
    visited_edges: HashSet<EdgeId>,
}

struct PartialPath {
    verts: Vec<VertId>,
    edges: Vec<EdgeId>,
}

impl<A: Adjacency + ?Sized> EdgeCycles<'_, A> {
    /// Breadth-first search for the shortest simple cycle through `start`.
    fn cycle_from(&self, start: VertId) -> Option<Vec<EdgeId>> {
        let mut queue = VecDeque::new();
        queue.push_back(PartialPath { verts: vec![start], edges: Vec::new() });
        let mut explored = 0usize;

        while let Some(path) = queue.pop_front() {
            explored += 1;
            if explored > MAX_CYCLE_PATHS {
                return None;
            }
            let Some(&tip) = path.verts.last() else { continue };
            for &e in self.adj.vert_edges(tip) {
                if !self.edges.contains(&e) || self.visited_edges.contains(&e) || path.edges.contains(&e) {
                    continue;
                }
                let Some(next) = other_vert(self.adj, e, tip) else { continue };
                if next == start && path.edges.len() >= 2 {
                    let mut edges = path.edges.clone();
                    edges.push(e);
                    return Some(edges);
                }
                if path.verts.contains(&next) || self.visited_verts.contains(&next) {
                    continue;
                }
                let mut verts = path.verts.clone();
                verts.push(next);
                let mut edges = path.edges.clone();
                edges.push(e);
                queue.push_back(PartialPath { verts, edges });
            }
        }
        None
    }
}

impl<A: Adjacency + ?Sized> Iterator for EdgeCycles<'_, A> {
    type Item = Vec<EdgeId>;

    fn next(&mut self) -> Option<Vec<EdgeId>> {
        while let Some(start) = self.starts.pop_front() {
            if self.visited_verts.contains(&start) {
                continue;
            }
            if let Some(cycle) = self.cycle_from(start) {
                for &e in &cycle {
                    self.visited_edges.insert(e);
                    if let Some(vs) = self.adj.edge_verts(e) {
                        self.visited_verts.extend(vs);
                    }
                }
                return Some(cycle);
            }
        }
        None
    }
}

/// Simple cycles within `edges`. Each emitted cycle is an ordered edge list
/// whose strip vertices start and end on the same vertex. Edges that lie on
/// no cycle are omitted.
pub fn find_edge_cycles<'a, A: Adjacency + ?Sized>(adj: &'a A, edges: &'a HashSet<EdgeId>) -> EdgeCycles<'a, A> {
    EdgeCycles {
        adj,
        edges,
        starts: verts_of(adj, edges).into(),
        visited_verts: HashSet::new(),
        visited_edges: HashSet::new(),
    }
}

// ============================================================================
// STRIPS
// ============================================================================

/// Breadth-first edge path from `from` to the first vertex satisfying
/// `is_target`, stepping only across edges accepted by `allow`.
fn bfs_path(
    adj: &(impl Adjacency + ?Sized),
    from: VertId,
    is_target: impl Fn(VertId) -> bool,
    allow: impl Fn(EdgeId) -> bool,
) -> Option<Vec<EdgeId>> {
    if is_target(from) {
        return Some(Vec::new());
    }
    // parent[v] = (previous vertex, edge used to reach v)
    let mut parent: HashMap<VertId, (VertId, EdgeId)> = HashMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(from);

    while let Some(v) = queue.pop_front() {
        for &e in adj.vert_edges(v) {
            if !allow(e) {
                continue;
            }
            let Some(next) = other_vert(adj, e, v) else { continue };
            if next == from || parent.contains_key(&next) {
                continue;
            }
            parent.insert(next, (v, e));
            if is_target(next) {
                let mut path = Vec::new();
                let mut cur = next;
                while cur != from {
                    let (prev, edge) = parent[&cur];
                    path.push(edge);
                    cur = prev;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }
    None
}

/// Ordered strips connecting pairs of degree-1 vertices of `edges`.
/// O(endpoints²) breadth-first searches.
pub fn find_edge_strips<'a, A: Adjacency + ?Sized>(
    adj: &'a A,
    edges: &'a HashSet<EdgeId>,
) -> impl Iterator<Item = Vec<EdgeId>> + 'a {
    let mut degree: HashMap<VertId, usize> = HashMap::new();
    for &e in edges {
        if let Some(vs) = adj.edge_verts(e) {
            for v in vs {
                *degree.entry(v).or_default() += 1;
            }
        }
    }
    let mut ends: Vec<VertId> = degree.into_iter().filter(|&(_, d)| d == 1).map(|(v, _)| v).collect();
    ends.sort_unstable();

    let n = ends.len();
    (0..n)
        .flat_map(move |i| (i + 1..n).map(move |j| (i, j)))
        .filter_map(move |(i, j)| {
            let target = ends[j];
            bfs_path(adj, ends[i], |v| v == target, |e| edges.contains(&e))
        })
}

/// Ordered vertices of an ordered edge strip. For a closed cycle the first
/// vertex is repeated at the end. `None` if consecutive edges do not share
/// a vertex.
pub fn get_strip_verts(adj: &(impl Adjacency + ?Sized), strip: &[EdgeId]) -> Option<Vec<VertId>> {
    match strip {
        [] => None,
        [only] => adj.edge_verts(*only).map(|vs| vs.to_vec()),
        [first, second, ..] => {
            let join = shared_vert(adj, *first, *second)?;
            let mut verts = vec![other_vert(adj, *first, join)?];
            for w in strip.windows(2) {
                verts.push(shared_vert(adj, w[0], w[1])?);
            }
            let tail = *verts.last()?;
            verts.push(other_vert(adj, strip[strip.len() - 1], tail)?);
            Some(verts)
        }
    }
}

// ============================================================================
// CORNER WALK
// ============================================================================

/// Walk outward from `from` along boundary (non-manifold) edges until a
/// vertex incident to `to_edges` is reached. Returns the ordered edge path,
/// empty if `from` already touches `to_edges`, `None` if unreachable.
pub fn walk_to_corner(
    adj: &(impl Adjacency + ?Sized),
    from: VertId,
    to_edges: &HashSet<EdgeId>,
) -> Option<Vec<EdgeId>> {
    let corners: HashSet<VertId> = verts_of(adj, to_edges).into_iter().collect();
    bfs_path(adj, from, |v| corners.contains(&v), |e| adj.is_boundary_edge(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mesh::{HostMesh, PolyMesh};
    use glam::Vec3;

    /// Ring of `n` vertices on the unit circle with edges v_i → v_{i+1}.
    fn ring(mesh: &mut PolyMesh, n: usize, offset: Vec3) -> (Vec<VertId>, Vec<EdgeId>) {
        let verts: Vec<VertId> = (0..n)
            .map(|i| {
                let a = i as f32 / n as f32 * std::f32::consts::TAU;
                mesh.add_vertex(offset + Vec3::new(a.cos(), a.sin(), 0.0))
            })
            .collect();
        let edges = (0..n).map(|i| mesh.new_edge(verts[i], verts[(i + 1) % n]).unwrap()).collect();
        (verts, edges)
    }

    #[test]
    fn cycles_partition_cyclic_edges() {
        let mut mesh = PolyMesh::new();
        let (_, a) = ring(&mut mesh, 5, Vec3::ZERO);
        let (rv, b) = ring(&mut mesh, 4, Vec3::new(5.0, 0.0, 0.0));
        // A dangling tail that lies on no cycle.
        let tip = mesh.add_vertex(Vec3::new(9.0, 0.0, 0.0));
        let tail = mesh.new_edge(rv[0], tip).unwrap();

        let set: HashSet<EdgeId> = a.iter().chain(&b).copied().chain([tail]).collect();
        let cycles: Vec<Vec<EdgeId>> = find_edge_cycles(&mesh, &set).collect();
        assert_eq!(cycles.len(), 2);

        let mut seen: Vec<EdgeId> = cycles.iter().flatten().copied().collect();
        seen.sort_unstable();
        let mut expected: Vec<EdgeId> = a.iter().chain(&b).copied().collect();
        expected.sort_unstable();
        assert_eq!(seen, expected);

        for cycle in &cycles {
            let verts = get_strip_verts(&mesh, cycle).unwrap();
            assert_eq!(verts.first(), verts.last());
        }
    }

    #[test]
    fn strips_connect_degree_one_endpoints() {
        let mut mesh = PolyMesh::new();
        let v: Vec<VertId> = (0..4).map(|i| mesh.add_vertex(Vec3::new(i as f32, 0.0, 0.0))).collect();
        let e: Vec<EdgeId> = (0..3).map(|i| mesh.new_edge(v[i], v[i + 1]).unwrap()).collect();
        let set: HashSet<EdgeId> = e.iter().copied().collect();

        let strips: Vec<Vec<EdgeId>> = find_edge_strips(&mesh, &set).collect();
        assert_eq!(strips.len(), 1);
        let verts = get_strip_verts(&mesh, &strips[0]).unwrap();
        assert_eq!(verts.len(), 4);
        assert!(verts == v || verts.iter().rev().copied().collect::<Vec<_>>() == v);
    }

    #[test]
    fn strip_verts_of_single_edge() {
        let mut mesh = PolyMesh::new();
        let a = mesh.add_vertex(Vec3::ZERO);
        let b = mesh.add_vertex(Vec3::X);
        let e = mesh.new_edge(a, b).unwrap();
        assert_eq!(get_strip_verts(&mesh, &[e]), Some(vec![a, b]));
        assert_eq!(get_strip_verts(&mesh, &[]), None);
    }

    #[test]
    fn corner_walk_follows_boundary_edges_only() {
        let mut mesh = PolyMesh::new();
        // Two triangles sharing the diagonal v0-v2; the diagonal is manifold.
        let v: Vec<VertId> = [Vec3::ZERO, Vec3::X, Vec3::ONE, Vec3::Y]
            .into_iter()
            .map(|p| mesh.add_vertex(p))
            .collect();
        mesh.new_face(&[v[0], v[1], v[2]]).unwrap();
        mesh.new_face(&[v[0], v[2], v[3]]).unwrap();
        let far = mesh.add_vertex(Vec3::new(1.0, 3.0, 0.0));
        let spur = mesh.new_edge(v[2], far).unwrap();

        let targets: HashSet<EdgeId> = [spur].into_iter().collect();
        let path = walk_to_corner(&mesh, v[0], &targets).unwrap();
        // v0 → v1 → v2 (or v0 → v3 → v2), never across the diagonal.
        assert_eq!(path.len(), 2);
        assert!(path.iter().all(|&e| mesh.is_boundary_edge(e)));

        assert_eq!(walk_to_corner(&mesh, v[2], &targets), Some(Vec::new()));

        let island = mesh.add_vertex(Vec3::splat(10.0));
        assert_eq!(walk_to_corner(&mesh, island, &targets), None);
    }
}
