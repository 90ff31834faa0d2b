// Host mesh interface and the in-crate reference host.
//
// The autofill core never owns geometry. It talks to the host through two
// traits:
//   Adjacency → read-only vertex/edge/face incidence (graph walks need only this)
//   HostMesh  → the editing primitives the core consumes
//
// PolyMesh implements both and backs the demo binary and the tests.
// Vertices, edges and faces live in slot maps, so a handle that outlived
// its element is detected as stale instead of aliasing whatever reused the
// slot.

use glam::Vec3;
use slotmap::SlotMap;

use super::error::MeshError;

// ============================================================================
// HANDLES
// ============================================================================

slotmap::new_key_type! {
    /// Stable handle to a host-mesh vertex.
    pub struct VertId;
}

slotmap::new_key_type! {
    /// Stable handle to a host-mesh edge.
    pub struct EdgeId;
}

slotmap::new_key_type! {
    /// Stable handle to a host-mesh face.
    pub struct FaceId;
}

// ============================================================================
// HOST INTERFACE
// ============================================================================

/// Read-only incidence queries. The boundary graph walker depends on nothing else.
pub trait Adjacency {
    /// The two endpoints of `e`, or `None` if the handle is stale.
    fn edge_verts(&self, e: EdgeId) -> Option<[VertId; 2]>;

    /// Edges incident to `v`. Empty for a stale handle.
    fn vert_edges(&self, v: VertId) -> &[EdgeId];

    /// Number of faces bordering `e`.
    fn edge_face_count(&self, e: EdgeId) -> usize;

    /// Boundary-type (non-manifold) edge: borders fewer than two faces.
    fn is_boundary_edge(&self, e: EdgeId) -> bool {
        self.edge_face_count(e) < 2
    }

    /// The edge joining `a` and `b`, if any.
    fn shared_edge(&self, a: VertId, b: VertId) -> Option<EdgeId> {
        self.vert_edges(a).iter().copied().find(|&e| {
            self.edge_verts(e).is_some_and(|[v0, v1]| (v0 == a && v1 == b) || (v0 == b && v1 == a))
        })
    }
}

/// Mesh-editing primitives consumed by the autofill core.
pub trait HostMesh: Adjacency {
    fn position(&self, v: VertId) -> Option<Vec3>;
    fn set_position(&mut self, v: VertId, position: Vec3) -> Result<(), MeshError>;
    fn is_vert_valid(&self, v: VertId) -> bool;
    fn face_verts(&self, f: FaceId) -> Option<&[VertId]>;

    fn new_vert(&mut self, position: Vec3) -> VertId;
    /// Fails if the edge already exists.
    fn new_edge(&mut self, a: VertId, b: VertId) -> Result<EdgeId, MeshError>;
    /// Face from an ordered vertex loop. Missing edges are created.
    fn new_face(&mut self, verts: &[VertId]) -> Result<FaceId, MeshError>;

    /// Cascades to incident edges and faces. Stale handles are skipped.
    fn delete_verts(&mut self, verts: &[VertId]);
    /// Removes edges and the faces they border. Vertices stay. Stale handles are skipped.
    fn delete_edges(&mut self, edges: &[EdgeId]);
    /// Stale handles are skipped.
    fn delete_faces(&mut self, faces: &[FaceId], del_empty_edges: bool, del_empty_verts: bool);
    /// Fold `gone` into `keep`. `keep` retains its position.
    fn merge_verts(&mut self, keep: VertId, gone: VertId) -> Result<(), MeshError>;

    fn nearest_vert(&self, point: Vec3, max_dist: f32) -> Option<(VertId, f32)>;
    /// Every vertex within `max_dist`, nearest first.
    fn verts_within(&self, point: Vec3, max_dist: f32) -> Vec<(VertId, f32)>;
    fn nearest_face(&self, point: Vec3, max_dist: f32) -> Option<(FaceId, f32)>;
}

// ============================================================================
// POLY MESH
// ============================================================================

struct Vertex {
    position: Vec3,
    edges: Vec<EdgeId>,
}

struct Edge {
    verts: [VertId; 2],
    faces: Vec<FaceId>,
}

struct Face {
    verts: Vec<VertId>,  // ordered loop
    edges: Vec<EdgeId>,  // edges[i] joins verts[i] → verts[i+1]
}

/// Editable polygon mesh with n-gon faces and explicit edges.
/// Faces keep the winding of the vertex loop they were created from.
pub struct PolyMesh {
    verts: SlotMap<VertId, Vertex>,
    edges: SlotMap<EdgeId, Edge>,
    faces: SlotMap<FaceId, Face>,
}

impl Default for PolyMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl PolyMesh {
    pub fn new() -> Self {
        Self {
            verts: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            faces: SlotMap::with_key(),
        }
    }

    /// Add a vertex and return its handle.
    pub fn add_vertex(&mut self, pos: Vec3) -> VertId {
        self.verts.insert(Vertex { position: pos, edges: Vec::new() })
    }

    pub fn vertex_count(&self) -> usize { self.verts.len() }
    pub fn edge_count(&self)   -> usize { self.edges.len() }
    pub fn face_count(&self)   -> usize { self.faces.len() }

    pub fn vert_ids(&self) -> impl Iterator<Item = VertId> + '_ {
        self.verts.keys()
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.keys()
    }

    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces.keys()
    }

    /// Average of the face's vertex positions.
    pub fn is_face_valid(&self, f: FaceId) -> bool {
        self.faces.contains_key(f)
    }

    pub fn face_centroid(&self, f: FaceId) -> Option<Vec3> {
        let face = self.faces.get(f)?;
        let sum: Vec3 = face.verts.iter().filter_map(|&v| self.position(v)).sum();
        Some(sum / face.verts.len() as f32)
    }

    fn remove_edge(&mut self, e: EdgeId) {
        let Some(edge) = self.edges.remove(e) else { return };
        for f in edge.faces {
            self.remove_face(f, false, false);
        }
        for v in edge.verts {
            if let Some(vert) = self.verts.get_mut(v) {
                vert.edges.retain(|&x| x != e);
            }
        }
    }

    fn remove_face(&mut self, f: FaceId, del_empty_edges: bool, del_empty_verts: bool) {
        let Some(face) = self.faces.remove(f) else { return };
        for &e in &face.edges {
            let now_empty = match self.edges.get_mut(e) {
                Some(edge) => {
                    edge.faces.retain(|&x| x != f);
                    edge.faces.is_empty()
                }
                None => false,
            };
            if del_empty_edges && now_empty {
                self.remove_edge(e);
            }
        }
        if del_empty_verts {
            for v in face.verts {
                if self.verts.get(v).is_some_and(|vert| vert.edges.is_empty()) {
                    self.verts.remove(v);
                }
            }
        }
    }

    fn remove_vert(&mut self, v: VertId) {
        let Some(vert) = self.verts.get(v) else { return };
        let incident = vert.edges.clone();
        for e in incident {
            self.remove_edge(e);
        }
        self.verts.remove(v);
    }
}

impl Adjacency for PolyMesh {
    fn edge_verts(&self, e: EdgeId) -> Option<[VertId; 2]> {
        self.edges.get(e).map(|edge| edge.verts)
    }

    fn vert_edges(&self, v: VertId) -> &[EdgeId] {
        self.verts.get(v).map(|vert| vert.edges.as_slice()).unwrap_or(&[])
    }

    fn edge_face_count(&self, e: EdgeId) -> usize {
        self.edges.get(e).map(|edge| edge.faces.len()).unwrap_or(0)
    }
}

impl HostMesh for PolyMesh {
    fn position(&self, v: VertId) -> Option<Vec3> {
        self.verts.get(v).map(|vert| vert.position)
    }

    fn set_position(&mut self, v: VertId, position: Vec3) -> Result<(), MeshError> {
        let vert = self.verts.get_mut(v).ok_or(MeshError::StaleVertex(v))?;
        vert.position = position;
        Ok(())
    }

    fn is_vert_valid(&self, v: VertId) -> bool {
        self.verts.contains_key(v)
    }

    fn face_verts(&self, f: FaceId) -> Option<&[VertId]> {
        self.faces.get(f).map(|face| face.verts.as_slice())
    }

    fn new_vert(&mut self, position: Vec3) -> VertId {
        self.add_vertex(position)
    }

    fn new_edge(&mut self, a: VertId, b: VertId) -> Result<EdgeId, MeshError> {
        if a == b {
            return Err(MeshError::DegenerateEdge(a));
        }
        for v in [a, b] {
            if !self.is_vert_valid(v) {
                return Err(MeshError::StaleVertex(v));
            }
        }
        if let Some(existing) = self.shared_edge(a, b) {
            return Err(MeshError::DuplicateEdge(a, b, existing));
        }
        let e = self.edges.insert(Edge { verts: [a, b], faces: Vec::new() });
        for v in [a, b] {
            if let Some(vert) = self.verts.get_mut(v) {
                vert.edges.push(e);
            }
        }
        Ok(e)
    }

    fn new_face(&mut self, verts: &[VertId]) -> Result<FaceId, MeshError> {
        let mut distinct = verts.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        if verts.len() < 3 || distinct.len() != verts.len() {
            return Err(MeshError::DegenerateFace(distinct.len()));
        }
        if let Some(&stale) = verts.iter().find(|&&v| !self.is_vert_valid(v)) {
            return Err(MeshError::StaleVertex(stale));
        }

        let n = verts.len();
        let mut edges = Vec::with_capacity(n);
        for i in 0..n {
            let (a, b) = (verts[i], verts[(i + 1) % n]);
            let e = match self.shared_edge(a, b) {
                Some(e) => e,
                None => self.new_edge(a, b)?,
            };
            edges.push(e);
        }

        let f = self.faces.insert(Face { verts: verts.to_vec(), edges: edges.clone() });
        for e in edges {
            if let Some(edge) = self.edges.get_mut(e) {
                edge.faces.push(f);
            }
        }
        Ok(f)
    }

    fn delete_verts(&mut self, verts: &[VertId]) {
        for &v in verts {
            self.remove_vert(v);
        }
    }

    fn delete_edges(&mut self, edges: &[EdgeId]) {
        for &e in edges {
            self.remove_edge(e);
        }
    }

    fn delete_faces(&mut self, faces: &[FaceId], del_empty_edges: bool, del_empty_verts: bool) {
        for &f in faces {
            self.remove_face(f, del_empty_edges, del_empty_verts);
        }
    }

    fn merge_verts(&mut self, keep: VertId, gone: VertId) -> Result<(), MeshError> {
        for v in [keep, gone] {
            if !self.is_vert_valid(v) {
                return Err(MeshError::StaleVertex(v));
            }
        }
        if keep == gone {
            return Ok(());
        }

        // Faces touching `gone` are rebuilt around `keep`; faces that would
        // then repeat a vertex are dropped.
        let touching: Vec<FaceId> = self.faces
            .iter()
            .filter(|(_, face)| face.verts.contains(&gone))
            .map(|(f, _)| f)
            .collect();
        let mut rebuilt: Vec<Vec<VertId>> = Vec::new();
        for f in touching {
            if let Some(face) = self.faces.get(f) {
                if !face.verts.contains(&keep) {
                    rebuilt.push(face.verts.iter().map(|&v| if v == gone { keep } else { v }).collect());
                }
            }
            self.remove_face(f, false, false);
        }

        let neighbours: Vec<VertId> = self
            .vert_edges(gone)
            .iter()
            .filter_map(|&e| self.edge_verts(e))
            .map(|[a, b]| if a == gone { b } else { a })
            .filter(|&o| o != keep)
            .collect();
        self.remove_vert(gone);

        for o in neighbours {
            if self.shared_edge(keep, o).is_none() {
                self.new_edge(keep, o)?;
            }
        }
        for loop_verts in rebuilt {
            self.new_face(&loop_verts)?;
        }
        Ok(())
    }

    fn nearest_vert(&self, point: Vec3, max_dist: f32) -> Option<(VertId, f32)> {
        self.verts
            .iter()
            .map(|(v, vert)| (v, vert.position.distance(point)))
            .filter(|&(_, d)| d <= max_dist)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    fn verts_within(&self, point: Vec3, max_dist: f32) -> Vec<(VertId, f32)> {
        let mut near: Vec<(VertId, f32)> = self
            .verts
            .iter()
            .map(|(v, vert)| (v, vert.position.distance(point)))
            .filter(|&(_, d)| d <= max_dist)
            .collect();
        near.sort_by(|a, b| a.1.total_cmp(&b.1));
        near
    }

    fn nearest_face(&self, point: Vec3, max_dist: f32) -> Option<(FaceId, f32)> {
        self.faces
            .keys()
            .filter_map(|f| self.face_centroid(f).map(|c| (f, c.distance(point))))
            .filter(|&(_, d)| d <= max_dist)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_handle_is_detected_after_slot_reuse() {
        let mut mesh = PolyMesh::new();
        let a = mesh.add_vertex(Vec3::ZERO);
        mesh.delete_verts(&[a]);
        let b = mesh.add_vertex(Vec3::X);
        assert!(!mesh.is_vert_valid(a));
        assert!(mesh.is_vert_valid(b));
        assert_ne!(a, b);
        assert_eq!(mesh.position(a), None);
    }

    #[test]
    fn duplicate_edge_is_rejected() {
        let mut mesh = PolyMesh::new();
        let a = mesh.add_vertex(Vec3::ZERO);
        let b = mesh.add_vertex(Vec3::X);
        let e = mesh.new_edge(a, b).unwrap();
        assert_eq!(mesh.new_edge(b, a), Err(MeshError::DuplicateEdge(b, a, e)));
    }

    #[test]
    fn deleting_a_vertex_cascades_to_edges_and_faces() {
        let mut mesh = PolyMesh::new();
        let v: Vec<VertId> = [Vec3::ZERO, Vec3::X, Vec3::Y]
            .into_iter()
            .map(|p| mesh.add_vertex(p))
            .collect();
        let f = mesh.new_face(&v).unwrap();
        assert_eq!(mesh.edge_count(), 3);
        mesh.delete_verts(&[v[0]]);
        assert!(!mesh.is_face_valid(f));
        assert_eq!(mesh.edge_count(), 1);
        assert_eq!(mesh.vertex_count(), 2);
    }

    #[test]
    fn delete_faces_keeps_empty_verts_when_asked() {
        let mut mesh = PolyMesh::new();
        let v: Vec<VertId> = [Vec3::ZERO, Vec3::X, Vec3::Y]
            .into_iter()
            .map(|p| mesh.add_vertex(p))
            .collect();
        let f = mesh.new_face(&v).unwrap();
        mesh.delete_faces(&[f, f], true, false);
        assert_eq!(mesh.face_count(), 0);
        assert_eq!(mesh.edge_count(), 0);
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn merge_rewires_edges_onto_kept_vertex() {
        let mut mesh = PolyMesh::new();
        let a = mesh.add_vertex(Vec3::ZERO);
        let b = mesh.add_vertex(Vec3::X);
        let c = mesh.add_vertex(Vec3::new(1.0, 0.0, 0.001));
        let d = mesh.add_vertex(Vec3::Y);
        mesh.new_edge(a, b).unwrap();
        mesh.new_edge(c, d).unwrap();
        mesh.merge_verts(b, c).unwrap();
        assert!(!mesh.is_vert_valid(c));
        assert!(mesh.shared_edge(b, d).is_some());
        assert_eq!(mesh.position(b), Some(Vec3::X));
        assert_eq!(mesh.vert_edges(b).len(), 2);
    }

    #[test]
    fn verts_within_is_nearest_first() {
        let mut mesh = PolyMesh::new();
        let far = mesh.add_vertex(Vec3::new(0.3, 0.0, 0.0));
        let near = mesh.add_vertex(Vec3::new(0.1, 0.0, 0.0));
        mesh.add_vertex(Vec3::new(2.0, 0.0, 0.0));
        let found: Vec<VertId> = mesh.verts_within(Vec3::ZERO, 0.5).into_iter().map(|(v, _)| v).collect();
        assert_eq!(found, vec![near, far]);
    }

    #[test]
    fn boundary_edges_border_fewer_than_two_faces() {
        let mut mesh = PolyMesh::new();
        let v: Vec<VertId> = [Vec3::ZERO, Vec3::X, Vec3::ONE, Vec3::Y]
            .into_iter()
            .map(|p| mesh.add_vertex(p))
            .collect();
        mesh.new_face(&[v[0], v[1], v[2]]).unwrap();
        mesh.new_face(&[v[0], v[2], v[3]]).unwrap();
        let diagonal = mesh.shared_edge(v[0], v[2]).unwrap();
        let rim = mesh.shared_edge(v[0], v[1]).unwrap();
        assert!(!mesh.is_boundary_edge(diagonal));
        assert!(mesh.is_boundary_edge(rim));
    }
}
