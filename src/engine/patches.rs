// PatchSet: every patch of one autofill session plus the selection.
//
// Incoming sides are classified in a fixed order:
//   1. extend/close → an open chain accepts the side
//   2. split        → a closed patch is crossed by the side
//   3. new          → the side starts its own chain
//
// Topology is settled before any pattern cache is touched. While a deferral
// scope is open, caches are only marked stale; `end_deferral` on the
// outermost scope reloads each stale cache once.

use std::collections::BTreeSet;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::error::Result;
use super::mesh::{FaceId, HostMesh, VertId};
use super::patch::Patch;
use super::service::PatternService;
use super::side::Side;

/// What `PatchSet::add_side` did with a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideOutcome {
    /// Appended to the open chain at this pending index.
    Extended(usize),
    /// Closed a patch, now at this index of `patches()`.
    Closed(usize),
    /// Split a closed patch; the two halves sit at these indices.
    Split(usize, usize),
    /// Started a new open chain at this pending index.
    Started(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub patch: Option<usize>,
    /// The selected patch's drawn candidate is highlighted.
    pub highlighted: bool,
}

#[derive(Debug, Default)]
pub struct PatchSet {
    patches: Vec<Patch>,
    pending: Vec<Patch>,
    selection: Selection,
    defer_depth: usize,
}

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(patches: Vec<Patch>, pending: Vec<Patch>, selection: Selection) -> Self {
        let selection = match selection.patch {
            Some(i) if i < patches.len() => selection,
            _ => Selection::default(),
        };
        Self { patches, pending, selection, defer_depth: 0 }
    }

    /// Closed patches.
    pub fn patches(&self) -> &[Patch] { &self.patches }

    /// Open chains not yet closed.
    pub fn pending(&self) -> &[Patch] { &self.pending }

    pub fn pending_sides(&self) -> impl Iterator<Item = &Side> + '_ {
        self.pending.iter().flat_map(|p| p.sides())
    }

    pub fn selection(&self) -> Selection { self.selection }

    pub fn selected(&self) -> Option<&Patch> {
        self.selection.patch.and_then(|i| self.patches.get(i))
    }

    pub fn is_deferring(&self) -> bool { self.defer_depth > 0 }

    fn recompute<M: HostMesh, S: PatternService + ?Sized>(&mut self, mesh: &mut M, service: &mut S, index: usize) {
        let deferring = self.is_deferring();
        let patch = &mut self.patches[index];
        if deferring {
            patch.invalidate();
        } else {
            patch.reload(mesh, service);
        }
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

impl PatchSet {
    pub fn add_side<M: HostMesh, S: PatternService + ?Sized>(
        &mut self,
        mesh: &mut M,
        service: &mut S,
        side: Side,
    ) -> Result<SideOutcome> {
        // 1. extend / close
        if let Some(i) = self.pending.iter().position(|p| p.can_add_side(&side)) {
            self.pending[i].add_side(side);
            let i = self.absorb_pending(i);
            if self.pending[i].is_closed() {
                let patch = self.pending.remove(i);
                let index = self.finish_closed(mesh, service, patch)?;
                return Ok(SideOutcome::Closed(index));
            }
            debug!("extended chain {i} to {} sides", self.pending[i].sides().len());
            return Ok(SideOutcome::Extended(i));
        }

        // 2. split
        if let Some(i) = self.patches.iter().position(|p| p.is_split_by(&side)) {
            let (a, b) = self.split_patch(mesh, service, i, side)?;
            return Ok(SideOutcome::Split(a, b));
        }

        // 3. new
        let patch = Patch::from_side(side);
        if patch.is_closed() {
            let index = self.finish_closed(mesh, service, patch)?;
            return Ok(SideOutcome::Closed(index));
        }
        self.pending.push(patch);
        debug!("started chain {}", self.pending.len() - 1);
        Ok(SideOutcome::Started(self.pending.len() - 1))
    }

    /// Fold any other open chain that now touches chain `target` into it.
    /// Returns where the chain ends up.
    fn absorb_pending(&mut self, target: usize) -> usize {
        let mut target = target;
        loop {
            if self.pending[target].is_closed() {
                return target;
            }
            let joins = (0..self.pending.len()).find(|&j| {
                j != target
                    && self.pending[j]
                        .sides()
                        .iter()
                        .any(|s| self.pending[target].can_add_side(s))
            });
            let Some(j) = joins else { return target };

            let mut rest = self.pending.remove(j).take_sides();
            if j < target {
                target -= 1;
            }
            while let Some(k) = rest.iter().position(|s| self.pending[target].can_add_side(s)) {
                let s = rest.remove(k);
                self.pending[target].add_side(s);
            }
            if !rest.is_empty() {
                warn!("{} sides could not join chain {target}", rest.len());
                for s in rest {
                    self.pending.push(Patch::from_side(s));
                }
            }
            debug!("merged chain {j} into chain {target}");
        }
    }

    /// Even out the perimeter, store the patch and load its patterns.
    fn finish_closed<M: HostMesh, S: PatternService + ?Sized>(
        &mut self,
        mesh: &mut M,
        service: &mut S,
        mut patch: Patch,
    ) -> Result<usize> {
        if patch.perimeter() % 2 == 1 {
            let side = patch
                .sides()
                .iter()
                .position(|s| s.first_edge_is_open(&*mesh))
                .unwrap_or(0);
            let old = patch.sides()[side].vert_set();
            if patch.side_mut(side).change_subdivisions(mesh, 1)? {
                let new = patch.sides()[side].clone();
                debug!("odd perimeter: side {side} now has {} vertices", new.len());
                for i in self.replace_everywhere(&old, &new) {
                    self.patches[i].destroy_pattern(mesh);
                    self.recompute(mesh, service, i);
                }
            }
        }

        self.patches.push(patch);
        let index = self.patches.len() - 1;
        info!(
            "closed patch {index}: {} sides, perimeter {}",
            self.patches[index].sides().len(),
            self.patches[index].perimeter()
        );
        self.recompute(mesh, service, index);
        self.selection = Selection { patch: Some(index), highlighted: true };
        Ok(index)
    }

    fn split_patch<M: HostMesh, S: PatternService + ?Sized>(
        &mut self,
        mesh: &mut M,
        service: &mut S,
        index: usize,
        mut chord: Side,
    ) -> Result<(usize, usize)> {
        let (mut a, mut b, mut cuts) = self.patches[index].split_with_cuts(&chord)?;
        if a.perimeter() % 2 == 1 && b.perimeter() % 2 == 1 {
            // Both halves odd: one more vertex on the shared chord fixes both.
            if chord.change_subdivisions(mesh, 1)? {
                (a, b, cuts) = self.patches[index].split_with_cuts(&chord)?;
            }
        }

        self.patches[index].destroy_pattern(mesh);
        self.patches[index] = a;
        self.patches.push(b);
        let other = self.patches.len() - 1;
        info!("split patch {index} into {index} and {other}");

        // Neighbours sharing a cut side take the same cut.
        let mut neighbours = BTreeSet::new();
        for cut in &cuts {
            for chain in &mut self.pending {
                chain.apply_cut(cut);
            }
            for (i, patch) in self.patches.iter_mut().enumerate() {
                if i != index && i != other && patch.apply_cut(cut) {
                    neighbours.insert(i);
                }
            }
        }
        for &i in &neighbours {
            debug!("patch {i} shares a side cut by the split");
            self.patches[i].destroy_pattern(mesh);
            self.recompute(mesh, service, i);
        }

        if self.selection.patch == Some(index) {
            self.selection = Selection::default();
        }
        self.recompute(mesh, service, index);
        self.recompute(mesh, service, other);
        Ok((index, other))
    }

    /// Swap `new` in for every copy of the side covering `old`. Returns the
    /// closed patches that changed.
    fn replace_everywhere(&mut self, old: &BTreeSet<VertId>, new: &Side) -> Vec<usize> {
        for chain in &mut self.pending {
            chain.replace_side(old, new);
        }
        self.patches
            .iter_mut()
            .enumerate()
            .filter_map(|(i, p)| p.replace_side(old, new).then_some(i))
            .collect()
    }
}

// ============================================================================
// EDITING
// ============================================================================

impl PatchSet {
    /// Take `side` out of the patch holding it. A closed patch loses its
    /// drawn pattern and reopens as a chain of its other sides; a chain
    /// holding it in the middle breaks in two. A side shared by two closed
    /// patches is left alone and `false` returned.
    pub fn remove_side(&mut self, mesh: &mut impl HostMesh, side: &Side) -> bool {
        let in_chain = self
            .pending
            .iter()
            .enumerate()
            .find_map(|(i, p)| p.find_side(side).map(|k| (i, k)));
        if let Some((i, k)) = in_chain {
            let chain = self.pending.remove(i);
            self.pending.extend(chain.without_side(k));
            debug!("removed side from chain {i}");
            return true;
        }

        let holders: Vec<usize> = (0..self.patches.len())
            .filter(|&i| self.patches[i].find_side(side).is_some())
            .collect();
        let [index] = holders[..] else { return false };
        let Some(k) = self.patches[index].find_side(side) else { return false };

        let mut patch = self.patches.remove(index);
        patch.destroy_pattern(mesh);
        self.pending.extend(patch.without_side(k));
        self.selection = match self.selection.patch {
            Some(i) if i == index => Selection::default(),
            Some(i) if i > index => Selection { patch: Some(i - 1), ..self.selection },
            _ => self.selection,
        };
        info!("reopened patch {index} without one of its sides");
        true
    }

    /// Fold host vertex `gone` into `keep` and rename it in every side.
    ///
    /// Refused with `false` when a patch holding `gone` already holds `keep`,
    /// or when either vertex belongs to a drawn pattern. Chains that meet at
    /// `keep` afterwards join, and may close.
    pub fn merge_vert<M: HostMesh, S: PatternService + ?Sized>(
        &mut self,
        mesh: &mut M,
        service: &mut S,
        keep: VertId,
        gone: VertId,
    ) -> Result<bool> {
        let owned = |v: VertId| {
            self.patches
                .iter()
                .any(|p| p.patterns().drawn().is_some_and(|d| d.owns_vert(v)))
        };
        if keep == gone || owned(keep) || owned(gone) {
            return Ok(false);
        }
        if self
            .patches
            .iter()
            .chain(&self.pending)
            .any(|p| p.touches(gone) && p.touches(keep))
        {
            debug!("merge would fold a patch onto itself; skipped");
            return Ok(false);
        }

        for patch in &mut self.patches {
            if patch.touches(gone) {
                patch.destroy_pattern(mesh);
            }
        }
        mesh.merge_verts(keep, gone)?;

        let mut renamed = None;
        for (i, chain) in self.pending.iter_mut().enumerate() {
            if chain.touches(gone) {
                chain.rename_vert(gone, keep);
                renamed.get_or_insert(i);
            }
        }
        for patch in &mut self.patches {
            if patch.touches(gone) {
                patch.rename_vert(gone, keep);
                patch.invalidate();
            }
        }

        if let Some(i) = renamed {
            let i = self.absorb_pending(i);
            if self.pending[i].is_closed() {
                let patch = self.pending.remove(i);
                self.finish_closed(mesh, service, patch)?;
            }
        }
        Ok(true)
    }
}

// ============================================================================
// SUBDIVISIONS
// ============================================================================

impl PatchSet {
    /// Add (or remove) boundary vertices on one or two selected sides.
    ///
    /// - one open side: ±1
    /// - one side of a closed patch: ±2, so the perimeter stays even
    /// - two sides of the same closed patch: ±1 each
    ///
    /// Returns `false` when the targets are not found together or a side
    /// would drop below two vertices.
    ///
    /// Panics unless one or two targets are given.
    pub fn change_subdivisions<M: HostMesh, S: PatternService + ?Sized>(
        &mut self,
        mesh: &mut M,
        service: &mut S,
        targets: &[Side],
        add: bool,
    ) -> Result<bool> {
        assert!(
            targets.len() == 1 || targets.len() == 2,
            "change_subdivisions takes one or two sides, got {}",
            targets.len()
        );
        let sign = if add { 1 } else { -1 };

        if let [target] = targets {
            let open = self
                .pending
                .iter()
                .enumerate()
                .find_map(|(i, p)| p.find_side(target).map(|s| (i, s)));
            if let Some((chain, side)) = open {
                if self.runs_through_corner(target) {
                    return Ok(false);
                }
                return self.pending[chain].side_mut(side).change_subdivisions(mesh, sign);
            }
            let Some(owner) = self.patches.iter().position(|p| p.find_side(target).is_some()) else {
                return Ok(false);
            };
            return self.resubdivide(mesh, service, owner, &[(target, 2 * sign)]);
        }

        let owner = self
            .patches
            .iter()
            .position(|p| targets.iter().all(|t| p.find_side(t).is_some()));
        let Some(owner) = owner else { return Ok(false) };
        let plan: Vec<(&Side, i32)> = targets.iter().map(|t| (t, sign)).collect();
        self.resubdivide(mesh, service, owner, &plan)
    }

    /// Some interior vertex of `side` is a side endpoint elsewhere.
    fn runs_through_corner(&self, side: &Side) -> bool {
        let verts = side.verts();
        verts[1..verts.len() - 1]
            .iter()
            .any(|&v| self.patches.iter().chain(&self.pending).any(|p| p.incidence(v) > 0))
    }

    fn resubdivide<M: HostMesh, S: PatternService + ?Sized>(
        &mut self,
        mesh: &mut M,
        service: &mut S,
        owner: usize,
        plan: &[(&Side, i32)],
    ) -> Result<bool> {
        let fits = plan.iter().all(|(side, delta)| side.len() as i64 + *delta as i64 >= 2);
        if !fits {
            return Ok(false);
        }
        // Interior vertices that are another side's corner must stay put.
        if plan.iter().any(|(side, _)| self.runs_through_corner(side)) {
            debug!("side runs through a patch corner; subdivisions unchanged");
            return Ok(false);
        }

        let mut affected = BTreeSet::from([owner]);
        for (target, _) in plan {
            for (i, p) in self.patches.iter().enumerate() {
                if p.find_side(target).is_some() {
                    affected.insert(i);
                }
            }
        }
        for &i in &affected {
            self.patches[i].destroy_pattern(mesh);
        }

        for &(target, delta) in plan {
            let Some(k) = self.patches[owner].find_side(target) else { continue };
            let old = self.patches[owner].sides()[k].vert_set();
            if !self.patches[owner].side_mut(k).change_subdivisions(mesh, delta)? {
                continue;
            }
            let new = self.patches[owner].sides()[k].clone();
            self.replace_everywhere(&old, &new);
        }

        for &i in &affected {
            self.recompute(mesh, service, i);
        }
        debug!("resubdivided {} sides of patch {owner}", plan.len());
        Ok(true)
    }
}

// ============================================================================
// SELECTION & CYCLING
// ============================================================================

impl PatchSet {
    /// Toggle the highlight off if a candidate is highlighted; otherwise
    /// select the patch whose drawn candidate contains `face`.
    pub fn select_patch_from_face(&mut self, face: FaceId) -> Option<usize> {
        if self.selection.highlighted {
            self.selection.highlighted = false;
            return None;
        }
        let index = self.patches.iter().position(|p| p.patterns().contains_face(face))?;
        self.selection = Selection { patch: Some(index), highlighted: true };
        Some(index)
    }

    pub fn deselect(&mut self) {
        self.selection = Selection::default();
    }

    /// Show the selected patch's next candidate. Returns whether it changed.
    pub fn next(&mut self, mesh: &mut impl HostMesh) -> bool {
        match self.selection.patch {
            Some(i) if i < self.patches.len() => self.patches[i].next_pattern(mesh),
            _ => false,
        }
    }

    /// Show the selected patch's previous candidate. Returns whether it changed.
    pub fn prev(&mut self, mesh: &mut impl HostMesh) -> bool {
        match self.selection.patch {
            Some(i) if i < self.patches.len() => self.patches[i].prev_pattern(mesh),
            _ => false,
        }
    }
}

// ============================================================================
// DEFERRAL
// ============================================================================

impl PatchSet {
    pub fn begin_deferral(&mut self) {
        self.defer_depth += 1;
    }

    /// Close one deferral scope. The outermost close reloads stale caches.
    pub fn end_deferral<M: HostMesh, S: PatternService + ?Sized>(&mut self, mesh: &mut M, service: &mut S) {
        self.defer_depth = self.defer_depth.saturating_sub(1);
        if self.defer_depth == 0 {
            self.flush(mesh, service);
        }
    }

    /// Mark every closed patch whose boundary passes through `verts` stale,
    /// reloading at once unless deferring.
    pub fn touch_verts<M: HostMesh, S: PatternService + ?Sized>(&mut self, mesh: &mut M, service: &mut S, verts: &[VertId]) {
        for patch in &mut self.patches {
            if verts.iter().any(|&v| patch.touches(v)) {
                patch.invalidate();
            }
        }
        if !self.is_deferring() {
            self.flush(mesh, service);
        }
    }

    fn flush<M: HostMesh, S: PatternService + ?Sized>(&mut self, mesh: &mut M, service: &mut S) {
        let stale: Vec<usize> = (0..self.patches.len())
            .filter(|&i| self.patches[i].patterns().is_stale())
            .collect();
        if !stale.is_empty() {
            debug!("reloading {} stale pattern caches", stale.len());
        }
        for i in stale {
            self.patches[i].reload(mesh, service);
        }
    }
}
