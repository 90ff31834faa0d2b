// Side: one directed boundary polyline of a patch.
//
// A side is an ordered chain of host-mesh vertex handles. verts[0] and
// verts[last] are its endpoints. A loop side (drawn as a closed stroke)
// repeats its first vertex at the end; nothing else may repeat.
//
// Two sides are equal when they cover the same vertex set, so a side and
// its reversal compare equal.

use std::collections::BTreeSet;

use glam::Vec3;

use super::error::{AutofillError, MeshError, Result};
use super::graph::get_strip_verts;
use super::mesh::{Adjacency, EdgeId, HostMesh, VertId};
use super::restroke::restroke;

#[derive(Debug, Clone)]
pub struct Side {
    verts: Vec<VertId>,
}

impl PartialEq for Side {
    fn eq(&self, other: &Self) -> bool {
        self.vert_set() == other.vert_set()
    }
}

impl Eq for Side {}

// ============================================================================
// CONSTRUCTION
// ============================================================================

impl Side {
    /// Build a side from an ordered vertex chain.
    /// Consecutive duplicates are collapsed; any other repetition (besides a
    /// loop's closing vertex) is rejected.
    pub fn from_verts(mut verts: Vec<VertId>) -> Result<Side> {
        verts.dedup();
        if verts.len() < 2 {
            return Err(AutofillError::DegenerateSide(verts.len()));
        }
        let body = if verts.first() == verts.last() { &verts[..verts.len() - 1] } else { &verts[..] };
        let mut seen = BTreeSet::new();
        for &v in body {
            if !seen.insert(v) {
                return Err(AutofillError::NotSimple(v));
            }
        }
        if body.len() < 2 {
            return Err(AutofillError::DegenerateSide(body.len()));
        }
        Ok(Side { verts })
    }

    /// Build a side from a contiguous, ordered edge chain.
    pub fn from_edges(adj: &(impl Adjacency + ?Sized), edges: &[EdgeId]) -> Result<Side> {
        let verts = get_strip_verts(adj, edges).ok_or(AutofillError::DisconnectedEdges)?;
        Side::from_verts(verts)
    }

    /// Turn an unordered set of edges into one or more maximal sides by
    /// repeatedly merging any two fragments that share an endpoint.
    pub fn multiple_from_edges(adj: &(impl Adjacency + ?Sized), edges: impl IntoIterator<Item = EdgeId>) -> Vec<Side> {
        let mut edges: Vec<EdgeId> = edges.into_iter().collect();
        edges.sort_unstable();
        edges.dedup();
        let mut sides: Vec<Side> = edges
            .iter()
            .filter_map(|&e| Side::from_edges(adj, &[e]).ok())
            .collect();

        loop {
            let pair = (0..sides.len())
                .flat_map(|i| (i + 1..sides.len()).map(move |j| (i, j)))
                .find(|&(i, j)| sides[i].can_merge_with(&sides[j]));
            let Some((i, j)) = pair else { break };
            let other = sides.remove(j);
            sides[i].merge(&other);
        }
        sides
    }

    /// Merging must keep the result simple: neither side is already a loop
    /// and they share nothing but endpoints.
    fn can_merge_with(&self, other: &Side) -> bool {
        if self.is_loop() || other.is_loop() || !self.shares_endpoint_with(other) {
            return false;
        }
        let ends = [self.first(), self.last()];
        let interior_overlap = other.verts.iter().any(|v| self.contains(*v) && !ends.contains(v));
        !interior_overlap
    }
}

// ============================================================================
// QUERIES
// ============================================================================

impl Side {
    pub fn verts(&self) -> &[VertId] { &self.verts }

    /// Number of vertices, endpoints included.
    pub fn len(&self) -> usize { self.verts.len() }

    pub fn is_empty(&self) -> bool { self.verts.is_empty() }

    /// Number of edges along the side.
    pub fn edge_count(&self) -> usize { self.verts.len().saturating_sub(1) }

    pub fn first(&self) -> VertId { self.verts[0] }

    pub fn last(&self) -> VertId { self.verts[self.verts.len() - 1] }

    pub fn endpoints(&self) -> [VertId; 2] { [self.first(), self.last()] }

    /// Closed stroke: first vertex repeated at the end.
    pub fn is_loop(&self) -> bool { self.first() == self.last() }

    pub fn contains(&self, v: VertId) -> bool { self.verts.contains(&v) }

    pub fn position_of(&self, v: VertId) -> Option<usize> {
        self.verts.iter().position(|&x| x == v)
    }

    pub(crate) fn rename(&mut self, old: VertId, new: VertId) {
        for v in &mut self.verts {
            if *v == old {
                *v = new;
            }
        }
    }

    pub fn vert_set(&self) -> BTreeSet<VertId> {
        self.verts.iter().copied().collect()
    }

    pub fn shares_endpoint_with(&self, other: &Side) -> bool {
        let [a0, a1] = self.endpoints();
        let [b0, b1] = other.endpoints();
        a0 == b0 || a0 == b1 || a1 == b0 || a1 == b1
    }

    /// Current vertex positions, in order.
    pub fn positions(&self, mesh: &impl HostMesh) -> std::result::Result<Vec<Vec3>, MeshError> {
        self.verts
            .iter()
            .map(|&v| mesh.position(v).ok_or(MeshError::StaleVertex(v)))
            .collect()
    }

    /// True if the first edge exists and borders no face.
    pub fn first_edge_is_open(&self, mesh: &impl HostMesh) -> bool {
        self.verts.len() >= 2
            && mesh
                .shared_edge(self.verts[0], self.verts[1])
                .is_some_and(|e| mesh.edge_face_count(e) == 0)
    }
}

// ============================================================================
// EDITING
// ============================================================================

impl Side {
    pub fn reverse(&mut self) {
        self.verts.reverse();
    }

    pub fn reversed(&self) -> Side {
        let mut side = self.clone();
        side.reverse();
        side
    }

    /// Concatenate `other` onto this side at their shared endpoint,
    /// reversing `other` as needed.
    ///
    /// Panics if the sides do not share an endpoint.
    pub fn merge(&mut self, other: &Side) {
        let (s0, s1) = (self.first(), self.last());
        let (o0, o1) = (other.first(), other.last());
        let merged: Vec<VertId> = if s0 == o0 {
            other.verts.iter().rev().chain(&self.verts[1..]).copied().collect()
        } else if s0 == o1 {
            other.verts.iter().chain(&self.verts[1..]).copied().collect()
        } else if s1 == o0 {
            self.verts[..self.verts.len() - 1].iter().chain(&other.verts).copied().collect()
        } else if s1 == o1 {
            self.verts[..self.verts.len() - 1].iter().chain(other.verts.iter().rev()).copied().collect()
        } else {
            panic!("sides do not share an endpoint");
        };
        self.verts = merged;
    }

    /// Cut at interior position `k`: `[0..=k]` and `[k..]`.
    ///
    /// Panics unless `0 < k < len - 1`.
    pub fn split_at(&self, k: usize) -> (Side, Side) {
        assert!(k > 0 && k + 1 < self.verts.len(), "split point must be interior");
        (
            Side { verts: self.verts[..=k].to_vec() },
            Side { verts: self.verts[k..].to_vec() },
        )
    }

    /// Resample the side to `len + delta` vertices, keeping both endpoints.
    ///
    /// Interior vertices are replaced by fresh ones along the current
    /// polyline and the old interior vertices are deleted from the host.
    /// Returns `Ok(false)` (nothing changed) if fewer than 2 vertices would
    /// remain or the polyline cannot be resampled.
    pub fn change_subdivisions(&mut self, mesh: &mut impl HostMesh, delta: i32) -> Result<bool> {
        let target = self.verts.len() as i64 + delta as i64;
        if target < 2 || delta == 0 {
            return Ok(false);
        }
        let target = target as usize;

        let points = self.positions(&*mesh)?;
        let fractions: Vec<f32> = (0..target).map(|i| i as f32 / (target - 1) as f32).collect();
        let resampled = restroke(&points, &fractions);
        if resampled.len() != target {
            return Ok(false);
        }

        let (first, last) = (self.first(), self.last());
        let mut new_verts = Vec::with_capacity(target);
        new_verts.push(first);
        for &p in &resampled[1..target - 1] {
            new_verts.push(mesh.new_vert(p));
        }
        new_verts.push(last);

        for w in new_verts.windows(2) {
            match mesh.new_edge(w[0], w[1]) {
                Ok(_) | Err(MeshError::DuplicateEdge(..)) => {}
                Err(err) => return Err(err.into()),
            }
        }

        // A bare two-vertex side keeps its direct edge when it gains interior
        // vertices; drop it unless a face still needs it.
        if self.verts.len() == 2 && target > 2 {
            if let Some(e) = mesh.shared_edge(first, last) {
                if mesh.edge_face_count(e) == 0 {
                    mesh.delete_edges(&[e]);
                }
            }
        }

        let old_interior = self.verts[1..self.verts.len() - 1].to_vec();
        mesh.delete_verts(&old_interior);
        self.verts = new_verts;
        Ok(true)
    }
}

// ============================================================================
// ORDERING
// ============================================================================

impl Side {
    /// Chain unordered sides start-to-end, reversing sides as needed.
    ///
    /// Returns the ordering and whether it closes into a single cycle that
    /// uses every side. On failure the chained prefix comes first, followed
    /// by the sides that could not be attached.
    pub fn order(sides: Vec<Side>) -> (Vec<Side>, bool) {
        let mut remaining = sides;
        if remaining.is_empty() {
            return (Vec::new(), false);
        }
        let mut ordered = vec![remaining.remove(0)];

        loop {
            let head = ordered[0].first();
            let tail = ordered[ordered.len() - 1].last();
            if tail == head {
                let closed = remaining.is_empty();
                ordered.extend(remaining);
                return (ordered, closed);
            }
            let next = remaining
                .iter()
                .position(|s| s.first() == tail || s.last() == tail);
            let Some(i) = next else {
                ordered.extend(remaining);
                return (ordered, false);
            };
            let mut side = remaining.remove(i);
            if side.first() != tail {
                side.reverse();
            }
            ordered.push(side);
        }
    }
}
