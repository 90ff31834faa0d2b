// Saved state: a PatchSet flattened to positions so it survives a host
// reload that reissues every handle.
//
// Vertices are resolved back by nearest lookup at distance 0, drawn faces by
// the nearest face to their saved centroid. Whatever no longer resolves is
// dropped with a warning.

use glam::Vec3;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::mesh::{FaceId, HostMesh, VertId};
use super::patch::Patch;
use super::patches::{PatchSet, Selection};
use super::pattern::{interior_edges, DrawnPattern, ExpandedPattern, PatternCache};
use super::side::Side;

/// Saved positions must match the host exactly.
const RESOLVE_DIST: f32 = 0.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSide {
    pub verts: Vec<[f32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPattern {
    pub faces: Vec<Vec<usize>>,
    pub verts: Vec<[f32; 3]>,
    pub sides: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedDrawn {
    /// Position of the host vertex behind every combined index.
    pub verts: Vec<[f32; 3]>,
    pub created: Vec<[f32; 3]>,
    /// Face centroids.
    pub faces: Vec<[f32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPatch {
    pub sides: Vec<SavedSide>,
    pub closed: bool,
    #[serde(default)]
    pub patterns: Vec<SavedPattern>,
    #[serde(default)]
    pub active: Option<usize>,
    #[serde(default)]
    pub drawn: Option<SavedDrawn>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SavedPatchSet {
    pub patches: Vec<SavedPatch>,
    pub pending: Vec<SavedPatch>,
    #[serde(default)]
    pub selection: Selection,
}

impl SavedPatchSet {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl From<&ExpandedPattern> for SavedPattern {
    fn from(p: &ExpandedPattern) -> Self {
        SavedPattern {
            faces: p.faces.clone(),
            verts: p.verts.iter().map(|v| v.to_array()).collect(),
            sides: p.side_mapping.clone(),
        }
    }
}

impl From<&SavedPattern> for ExpandedPattern {
    fn from(p: &SavedPattern) -> Self {
        ExpandedPattern::new(p.faces.clone(), p.verts.iter().map(|&v| Vec3::from(v)).collect(), p.sides.clone())
    }
}

// ============================================================================
// SAVE
// ============================================================================

fn face_centroid(mesh: &impl HostMesh, f: FaceId) -> Option<Vec3> {
    let verts = mesh.face_verts(f)?;
    let sum: Vec3 = verts.iter().filter_map(|&v| mesh.position(v)).sum();
    Some(sum / verts.len() as f32)
}

fn save_positions(mesh: &impl HostMesh, verts: &[VertId]) -> Vec<[f32; 3]> {
    verts.iter().filter_map(|&v| mesh.position(v)).map(|p| p.to_array()).collect()
}

fn save_patch(mesh: &impl HostMesh, patch: &Patch) -> SavedPatch {
    let cache = patch.patterns();
    let drawn = cache.drawn().map(|d| SavedDrawn {
        verts: save_positions(mesh, &d.verts),
        created: save_positions(mesh, &d.created),
        faces: d
            .faces
            .iter()
            .filter_map(|&f| face_centroid(mesh, f))
            .map(|c| c.to_array())
            .collect(),
    });
    SavedPatch {
        sides: patch
            .sides()
            .iter()
            .map(|s| SavedSide { verts: save_positions(mesh, s.verts()) })
            .collect(),
        closed: patch.is_closed(),
        patterns: cache.variants().iter().map(SavedPattern::from).collect(),
        active: cache.active_index(),
        drawn,
    }
}

impl PatchSet {
    pub fn save(&self, mesh: &impl HostMesh) -> SavedPatchSet {
        SavedPatchSet {
            patches: self.patches().iter().map(|p| save_patch(mesh, p)).collect(),
            pending: self.pending().iter().map(|p| save_patch(mesh, p)).collect(),
            selection: self.selection(),
        }
    }
}

// ============================================================================
// RESTORE
// ============================================================================

fn resolve_vert(mesh: &impl HostMesh, p: [f32; 3]) -> Option<VertId> {
    mesh.nearest_vert(Vec3::from(p), RESOLVE_DIST).map(|(v, _)| v)
}

fn resolve_verts(mesh: &impl HostMesh, points: &[[f32; 3]]) -> Vec<VertId> {
    points.iter().filter_map(|&p| resolve_vert(mesh, p)).collect()
}

fn restore_side(mesh: &impl HostMesh, saved: &SavedSide) -> Option<Side> {
    let verts = resolve_verts(mesh, &saved.verts);
    if verts.len() != saved.verts.len() {
        warn!("{} side vertices no longer resolve", saved.verts.len() - verts.len());
    }
    match Side::from_verts(verts) {
        Ok(side) => Some(side),
        Err(err) => {
            warn!("dropping saved side: {err}");
            None
        }
    }
}

fn restore_cache(mesh: &impl HostMesh, saved: &SavedPatch, sides: &[Side]) -> PatternCache {
    let variants: Vec<ExpandedPattern> = saved.patterns.iter().map(ExpandedPattern::from).collect();
    let drawn = saved.drawn.as_ref().map(|d| {
        let faces: Vec<FaceId> = d
            .faces
            .iter()
            .filter_map(|&c| mesh.nearest_face(Vec3::from(c), RESOLVE_DIST).map(|(f, _)| f))
            .collect();
        if faces.len() != d.faces.len() {
            warn!("{} drawn faces no longer resolve", d.faces.len() - faces.len());
        }
        DrawnPattern {
            verts: resolve_verts(mesh, &d.verts),
            created: resolve_verts(mesh, &d.created),
            edges: interior_edges(mesh, &faces, sides),
            faces,
        }
    });
    PatternCache::restored(variants, saved.active, drawn)
}

fn restore_patch(mesh: &impl HostMesh, saved: &SavedPatch) -> Option<Patch> {
    let mut patch = Patch::new();
    for side in saved.sides.iter().filter_map(|s| restore_side(mesh, s)) {
        if patch.can_add_side(&side) {
            patch.add_side(side);
        } else {
            warn!("dropping saved side that no longer chains");
        }
    }
    if patch.is_empty() {
        return None;
    }
    if saved.closed && !patch.is_closed() {
        warn!("saved patch no longer closes; keeping it open");
    }
    if patch.is_closed() {
        let cache = restore_cache(mesh, saved, patch.sides());
        patch = patch.with_patterns(cache);
    }
    Some(patch)
}

impl PatchSet {
    /// Rebuild a patch set against `mesh`.
    pub fn restore(saved: &SavedPatchSet, mesh: &impl HostMesh) -> PatchSet {
        let mut patches = Vec::new();
        let mut pending = Vec::new();
        let mut remap = Vec::with_capacity(saved.patches.len());

        for s in saved.patches.iter().chain(&saved.pending) {
            match restore_patch(mesh, s) {
                Some(p) if p.is_closed() => {
                    remap.push(Some(patches.len()));
                    patches.push(p);
                }
                Some(p) => {
                    remap.push(None);
                    pending.push(p);
                }
                None => remap.push(None),
            }
        }

        let selection = Selection {
            patch: saved.selection.patch.and_then(|i| remap.get(i).copied().flatten()),
            highlighted: saved.selection.highlighted,
        };
        debug!("restored {} patches, {} open chains", patches.len(), pending.len());
        PatchSet::from_parts(patches, pending, selection)
    }
}
