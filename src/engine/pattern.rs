// Expanded patterns: candidate interior fills for a closed patch, and the
// per-patch cache that cycles through them.
//
// Combined vertex space of a candidate:
//   index i is a boundary vertex if some side_mapping[j][k] == i
//     → reuse sides[j].verts()[k] (no duplicate is created)
//   otherwise verts[i] is the position of a new interior vertex
//
// At most one candidate is materialized (drawn into the host mesh) at a time.

use std::collections::{HashMap, HashSet};

use glam::Vec3;
use log::{debug, warn};

use super::mesh::{EdgeId, FaceId, HostMesh, VertId};
use super::service::PatternService;
use super::side::Side;

// ============================================================================
// EXPANDED PATTERN
// ============================================================================

/// One immutable candidate fill, as returned by the pattern service.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedPattern {
    /// Faces as index loops (3 or 4 entries) into the combined vertex space.
    pub faces: Vec<Vec<usize>>,
    /// Positions in the combined vertex space, one per index. Entries at
    /// boundary indices are ignored.
    pub verts: Vec<Vec3>,
    /// side_mapping[j][k] = combined index of vertex k on boundary side j.
    pub side_mapping: Vec<Vec<usize>>,
}

impl ExpandedPattern {
    pub fn new(faces: Vec<Vec<usize>>, verts: Vec<Vec3>, side_mapping: Vec<Vec<usize>>) -> Self {
        Self { faces, verts, side_mapping }
    }

    /// combined index → (side ordinal, position on side). First mapping wins.
    pub fn boundary_lookup(&self) -> HashMap<usize, (usize, usize)> {
        let mut lookup = HashMap::new();
        for (j, side) in self.side_mapping.iter().enumerate() {
            for (k, &i) in side.iter().enumerate() {
                lookup.entry(i).or_insert((j, k));
            }
        }
        lookup
    }

    /// Size of the combined vertex space.
    pub fn combined_len(&self) -> usize {
        self.verts.len()
    }

    /// Check the candidate against the boundary it was requested for.
    pub fn validate(&self, side_lengths: &[usize]) -> Result<(), String> {
        if self.side_mapping.len() > side_lengths.len() {
            return Err(format!(
                "maps {} sides but the patch has {}",
                self.side_mapping.len(),
                side_lengths.len()
            ));
        }
        let n = self.combined_len();
        for (j, side) in self.side_mapping.iter().enumerate() {
            if side.len() > side_lengths[j] {
                return Err(format!("side {j} maps {} vertices but has {}", side.len(), side_lengths[j]));
            }
            if let Some(&bad) = side.iter().find(|&&i| i >= n) {
                return Err(format!("side {j} maps vertex {bad} outside {n} combined vertices"));
            }
        }
        for (fi, face) in self.faces.iter().enumerate() {
            if face.len() != 3 && face.len() != 4 {
                return Err(format!("face {fi} has {} corners", face.len()));
            }
            if let Some(&bad) = face.iter().find(|&&i| i >= n) {
                return Err(format!("face {fi} references vertex {bad} outside {n} combined vertices"));
            }
        }
        Ok(())
    }

    /// Draw this candidate into the host mesh around `sides`.
    /// Faces the host rejects are skipped.
    pub fn materialize(&self, mesh: &mut impl HostMesh, sides: &[Side]) -> DrawnPattern {
        let lookup = self.boundary_lookup();
        let mut drawn = DrawnPattern::default();

        for (i, &p) in self.verts.iter().enumerate() {
            let reused = lookup
                .get(&i)
                .and_then(|&(j, k)| sides.get(j).and_then(|s| s.verts().get(k)).copied());
            let v = match reused {
                Some(v) => v,
                None => {
                    let v = mesh.new_vert(p);
                    drawn.created.push(v);
                    v
                }
            };
            drawn.verts.push(v);
        }

        for face in &self.faces {
            let loop_verts: Vec<VertId> = face.iter().map(|&i| drawn.verts[i]).collect();
            match mesh.new_face(&loop_verts) {
                Ok(f) => drawn.faces.push(f),
                Err(err) => warn!("skipping pattern face {face:?}: {err}"),
            }
        }
        drawn.edges = interior_edges(mesh, &drawn.faces, sides);
        drawn
    }
}

/// Edges of `faces` that do not run along any of `sides`.
pub(crate) fn interior_edges(mesh: &impl HostMesh, faces: &[FaceId], sides: &[Side]) -> Vec<EdgeId> {
    let key = |a: VertId, b: VertId| if a < b { (a, b) } else { (b, a) };
    let boundary: HashSet<(VertId, VertId)> = sides
        .iter()
        .flat_map(|s| s.verts().windows(2).map(|w| key(w[0], w[1])).collect::<Vec<_>>())
        .collect();

    let mut edges = Vec::new();
    for &f in faces {
        let Some(verts) = mesh.face_verts(f) else { continue };
        for i in 0..verts.len() {
            let (a, b) = (verts[i], verts[(i + 1) % verts.len()]);
            if boundary.contains(&key(a, b)) {
                continue;
            }
            if let Some(e) = mesh.shared_edge(a, b) {
                if !edges.contains(&e) {
                    edges.push(e);
                }
            }
        }
    }
    edges
}

// ============================================================================
// DRAWN PATTERN
// ============================================================================

/// Live host geometry of the materialized candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawnPattern {
    /// Host vertex for every combined index (boundary vertices are reused).
    pub(crate) verts: Vec<VertId>,
    /// Interior vertices this pattern created and owns.
    pub(crate) created: Vec<VertId>,
    /// Face edges off the boundary.
    pub(crate) edges: Vec<EdgeId>,
    pub(crate) faces: Vec<FaceId>,
}

impl DrawnPattern {
    pub fn verts(&self) -> &[VertId] { &self.verts }
    pub fn faces(&self) -> &[FaceId] { &self.faces }
    pub fn contains_face(&self, face: FaceId) -> bool { self.faces.contains(&face) }
    pub fn owns_vert(&self, v: VertId) -> bool { self.created.contains(&v) }

    /// Remove the drawn faces, their interior edges and the vertices this
    /// pattern created. Boundary edges stay. Elements already deleted by
    /// unrelated edits are skipped.
    pub fn destroy(self, mesh: &mut impl HostMesh) {
        mesh.delete_faces(&self.faces, false, false);
        mesh.delete_edges(&self.edges);
        mesh.delete_verts(&self.created);
    }
}

// ============================================================================
// PATTERN CACHE
// ============================================================================

/// Per-patch store of candidate fills plus the currently drawn one.
///
/// Cycling clamps at both ends: `next()` on the last candidate and `prev()`
/// on the first are no-ops that return `false`.
#[derive(Debug, Default)]
pub struct PatternCache {
    variants: Vec<ExpandedPattern>,
    active: Option<usize>,
    drawn: Option<DrawnPattern>,
    /// Boundary changed while recomputation was deferred.
    stale: bool,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn restored(variants: Vec<ExpandedPattern>, active: Option<usize>, drawn: Option<DrawnPattern>) -> Self {
        let active = active.filter(|&i| i < variants.len());
        Self { variants, active, drawn, stale: false }
    }

    pub fn variants(&self) -> &[ExpandedPattern] { &self.variants }
    pub fn active_index(&self) -> Option<usize> { self.active }
    pub fn active(&self) -> Option<&ExpandedPattern> { self.active.map(|i| &self.variants[i]) }
    pub fn drawn(&self) -> Option<&DrawnPattern> { self.drawn.as_ref() }
    pub fn is_stale(&self) -> bool { self.stale }

    pub fn contains_face(&self, face: FaceId) -> bool {
        self.drawn.as_ref().is_some_and(|d| d.contains_face(face))
    }

    /// Mark for reload once the surrounding deferral scope ends.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Remove the drawn candidate from the host, if any.
    pub fn destroy(&mut self, mesh: &mut impl HostMesh) {
        if let Some(drawn) = self.drawn.take() {
            drawn.destroy(mesh);
        }
    }

    /// Fetch fresh candidates for `sides` and draw the first one.
    ///
    /// Service failures and malformed responses leave the cache empty (the
    /// patch stays boundary-only); they are logged, never propagated.
    pub fn load<M: HostMesh, S: PatternService + ?Sized>(&mut self, mesh: &mut M, service: &mut S, sides: &[Side]) {
        self.destroy(mesh);
        self.variants.clear();
        self.active = None;
        self.stale = false;
        if sides.is_empty() {
            return;
        }

        let request: Result<Vec<Vec<Vec3>>, _> = sides.iter().map(|s| s.positions(&*mesh)).collect();
        let request = match request {
            Ok(r) => r,
            Err(err) => {
                warn!("cannot request patterns: {err}");
                return;
            }
        };

        let variants = match service.expanded_patterns(&request) {
            Ok(v) => v,
            Err(err) => {
                warn!("pattern service failed: {err}");
                return;
            }
        };

        let lengths: Vec<usize> = sides.iter().map(Side::len).collect();
        if let Some(err) = variants.iter().find_map(|v| v.validate(&lengths).err()) {
            warn!("discarding malformed pattern response: {err}");
            return;
        }

        debug!("loaded {} pattern candidates for {} sides", variants.len(), sides.len());
        self.variants = variants;
        if !self.variants.is_empty() {
            self.show(mesh, sides, 0);
        }
    }

    /// Advance to the next candidate. Returns whether it changed.
    pub fn next(&mut self, mesh: &mut impl HostMesh, sides: &[Side]) -> bool {
        match self.active {
            Some(i) if i + 1 < self.variants.len() => {
                self.show(mesh, sides, i + 1);
                true
            }
            _ => false,
        }
    }

    /// Step back to the previous candidate. Returns whether it changed.
    pub fn prev(&mut self, mesh: &mut impl HostMesh, sides: &[Side]) -> bool {
        match self.active {
            Some(i) if i > 0 => {
                self.show(mesh, sides, i - 1);
                true
            }
            _ => false,
        }
    }

    fn show(&mut self, mesh: &mut impl HostMesh, sides: &[Side], index: usize) {
        self.destroy(mesh);
        self.active = Some(index);
        self.drawn = Some(self.variants[index].materialize(mesh, sides));
    }
}
