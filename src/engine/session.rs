// Autofill session: the host mesh, the pattern service and the patch set,
// driven by discrete artist actions.

use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use glam::Vec3;
use log::{debug, info};

use super::config::AutofillOptions;
use super::error::{AutofillError, Result};
use super::graph::{find_edge_cycles, find_edge_strips, get_strip_verts, walk_to_corner};
use super::mesh::{EdgeId, FaceId, HostMesh, VertId};
use super::patches::{PatchSet, SideOutcome};
use super::saved::SavedPatchSet;
use super::service::PatternService;
use super::side::Side;
use super::stroke::{
    create_cycle, create_strip, erase_side, filter_stroke, is_cyclic, snap_ends, span_count, stroke_length,
};

/// The most recent stroke, kept so its span count can be changed after the fact.
#[derive(Debug, Clone)]
struct LastStroke {
    points: Vec<Vec3>,
    spans: usize,
    cyclic: bool,
    side: Side,
}

pub struct Autofill<M: HostMesh, S: PatternService> {
    mesh: M,
    service: S,
    patches: PatchSet,
    options: AutofillOptions,
    last_stroke: Option<LastStroke>,
}

impl<M: HostMesh, S: PatternService> Autofill<M, S> {
    pub fn new(mesh: M, service: S, options: AutofillOptions) -> Self {
        Self { mesh, service, patches: PatchSet::new(), options, last_stroke: None }
    }

    pub fn mesh(&self) -> &M { &self.mesh }
    pub fn service(&self) -> &S { &self.service }
    pub fn patches(&self) -> &PatchSet { &self.patches }
    pub fn options(&self) -> &AutofillOptions { &self.options }

    pub fn into_parts(self) -> (M, S) {
        (self.mesh, self.service)
    }

    // ========================================================================
    // DRAWING
    // ========================================================================

    /// Turn a finished freehand stroke into a side and classify it.
    pub fn stroke(&mut self, points: &[Vec3]) -> Result<SideOutcome> {
        let mut points = filter_stroke(points, self.options.filter_min_dist);
        if points.len() < 2 || stroke_length(&points) < self.options.filter_min_dist {
            return Err(AutofillError::StrokeTooShort(points.len().min(1)));
        }
        let radius = self.options.brush_radius;
        let cyclic = is_cyclic(&points, radius);
        if self.options.snap_stroke && !cyclic {
            snap_ends(&self.mesh, &mut points, self.options.snap_dist);
        }

        let spans = span_count(stroke_length(&points), radius);
        self.place_stroke(points, spans, cyclic)
    }

    /// Redraw the last stroke with `delta` more (or fewer) spans and classify
    /// it again. `None` when there is nothing to redraw: no stroke yet, an
    /// edit since, a side now shared by two patches, or a span count below
    /// one (three for a loop).
    pub fn change_stroke_spans(&mut self, delta: i32) -> Result<Option<SideOutcome>> {
        let Some(last) = self.last_stroke.take() else { return Ok(None) };
        let min = if last.cyclic { 3 } else { 1 };
        let spans = last.spans as i64 + i64::from(delta);
        if delta == 0 || spans < min {
            self.last_stroke = Some(last);
            return Ok(None);
        }
        if !self.patches.remove_side(&mut self.mesh, &last.side) {
            debug!("last stroke is no longer a free side; left as drawn");
            return Ok(None);
        }
        erase_side(&mut self.mesh, &last.side);
        info!("redrawing last stroke with {spans} spans");
        self.place_stroke(last.points, spans as usize, last.cyclic).map(Some)
    }

    fn place_stroke(&mut self, points: Vec<Vec3>, spans: usize, cyclic: bool) -> Result<SideOutcome> {
        self.last_stroke = None;
        let side = if cyclic {
            create_cycle(&mut self.mesh, &points, spans)?
        } else {
            create_strip(&mut self.mesh, &points, spans, &self.options)?
        };
        debug!("stroke → {} side with {} vertices", if cyclic { "loop" } else { "open" }, side.len());
        let outcome = self.patches.add_side(&mut self.mesh, &mut self.service, side.clone())?;
        self.last_stroke = Some(LastStroke { points, spans, cyclic, side });
        Ok(outcome)
    }

    /// Feed existing host edges in as sides: closed cycles become loop
    /// sides, the rest are merged into maximal open sides.
    pub fn add_selected_edges(&mut self, edges: &[EdgeId]) -> Result<Vec<SideOutcome>> {
        self.last_stroke = None;
        let selected: HashSet<EdgeId> = edges.iter().copied().collect();
        let cycles: Vec<Vec<EdgeId>> = find_edge_cycles(&self.mesh, &selected).collect();
        let in_cycle: HashSet<EdgeId> = cycles.iter().flatten().copied().collect();

        let mut sides = Vec::new();
        for cycle in &cycles {
            sides.push(Side::from_edges(&self.mesh, cycle)?);
        }
        let rest = selected.iter().copied().filter(|e| !in_cycle.contains(e));
        sides.extend(Side::multiple_from_edges(&self.mesh, rest));
        info!("{} selected edges → {} sides", edges.len(), sides.len());

        let mut outcomes = Vec::with_capacity(sides.len());
        let mut scope = self.defer_recomputing();
        for side in sides {
            let session = &mut *scope;
            outcomes.push(session.patches.add_side(&mut session.mesh, &mut session.service, side)?);
        }
        Ok(outcomes)
    }

    /// Reposition host vertices; patches running through them reload.
    ///
    /// With `automerge` on, a moved vertex that lands within `merge_dist` of
    /// a vertex that stayed put is folded into it, and sides holding it are
    /// renamed to match.
    pub fn move_verts(&mut self, moves: &[(VertId, Vec3)]) -> Result<()> {
        self.last_stroke = None;
        for &(v, p) in moves {
            self.mesh.set_position(v, p)?;
        }
        let mut moved: Vec<VertId> = moves.iter().map(|&(v, _)| v).collect();

        if self.options.automerge {
            for i in 0..moved.len() {
                let v = moved[i];
                let Some(p) = self.mesh.position(v) else { continue };
                let target = self
                    .mesh
                    .verts_within(p, self.options.merge_dist)
                    .into_iter()
                    .map(|(u, _)| u)
                    .find(|u| !moved.contains(u));
                let Some(keep) = target else { continue };
                if self.patches.merge_vert(&mut self.mesh, &mut self.service, keep, v)? {
                    debug!("moved vertex merged into {keep:?}");
                    moved[i] = keep;
                }
            }
        }

        self.patches.touch_verts(&mut self.mesh, &mut self.service, &moved);
        Ok(())
    }

    /// Grow an edge selection along open host edges until each end of every
    /// selected strip reaches a corner: a vertex of some patch side.
    /// Ends with no path to a corner stay where they are.
    pub fn extend_to_corners(&self, edges: &[EdgeId]) -> Vec<EdgeId> {
        let selected: HashSet<EdgeId> = edges.iter().copied().collect();
        let corner_edges: HashSet<EdgeId> = self
            .patches
            .patches()
            .iter()
            .chain(self.patches.pending())
            .flat_map(|p| p.sides())
            .flat_map(|s| s.verts().windows(2).filter_map(|w| self.mesh.shared_edge(w[0], w[1])).collect::<Vec<_>>())
            .collect();

        let mut grown: Vec<EdgeId> = edges.to_vec();
        for strip in find_edge_strips(&self.mesh, &selected) {
            let Some(verts) = get_strip_verts(&self.mesh, &strip) else { continue };
            let (Some(&first), Some(&last)) = (verts.first(), verts.last()) else { continue };
            if first == last {
                continue;
            }
            for end in [first, last] {
                if let Some(path) = walk_to_corner(&self.mesh, end, &corner_edges) {
                    grown.extend(path.into_iter().filter(|e| !selected.contains(e)));
                }
            }
        }
        let mut seen = HashSet::new();
        grown.retain(|e| seen.insert(*e));
        grown
    }

    /// Suppress pattern reloads until the returned guard (and every guard
    /// nested inside it) is dropped, then reload each stale patch once.
    pub fn defer_recomputing(&mut self) -> Deferred<'_, M, S> {
        self.patches.begin_deferral();
        Deferred { session: self }
    }

    // ========================================================================
    // EDITING
    // ========================================================================

    pub fn change_subdivisions(&mut self, targets: &[Side], add: bool) -> Result<bool> {
        self.last_stroke = None;
        self.patches.change_subdivisions(&mut self.mesh, &mut self.service, targets, add)
    }

    pub fn next(&mut self) -> bool {
        self.patches.next(&mut self.mesh)
    }

    pub fn prev(&mut self) -> bool {
        self.patches.prev(&mut self.mesh)
    }

    pub fn select_patch_from_face(&mut self, face: FaceId) -> Option<usize> {
        self.patches.select_patch_from_face(face)
    }

    pub fn deselect(&mut self) {
        self.patches.deselect();
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    pub fn save(&self) -> SavedPatchSet {
        self.patches.save(&self.mesh)
    }

    /// Replace the patch set with `saved`, resolved against the current mesh.
    pub fn restore(&mut self, saved: &SavedPatchSet) {
        self.last_stroke = None;
        self.patches = PatchSet::restore(saved, &self.mesh);
    }
}

/// Deferral scope returned by `Autofill::defer_recomputing`.
pub struct Deferred<'a, M: HostMesh, S: PatternService> {
    session: &'a mut Autofill<M, S>,
}

impl<M: HostMesh, S: PatternService> Deref for Deferred<'_, M, S> {
    type Target = Autofill<M, S>;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl<M: HostMesh, S: PatternService> DerefMut for Deferred<'_, M, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl<M: HostMesh, S: PatternService> Drop for Deferred<'_, M, S> {
    fn drop(&mut self) {
        let session = &mut *self.session;
        session.patches.end_deferral(&mut session.mesh, &mut session.service);
    }
}
