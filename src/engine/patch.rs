// Patch: an ordered run of sides that forms (or is growing toward) one
// closed boundary loop.
//
// States:
//   empty  → no sides
//   open   → a chain; sides[i].last() == sides[i + 1].first()
//   closed → the chain's tail meets its head; every side endpoint has
//            incidence exactly 2 across the patch
//
// The chain orientation is maintained on every add, so a closed patch's
// sides are always in cyclic order.

use std::collections::BTreeSet;

use log::debug;

use super::error::{AutofillError, Result};
use super::mesh::{HostMesh, VertId};
use super::pattern::PatternCache;
use super::service::PatternService;
use super::side::Side;

#[derive(Debug, Default)]
pub struct Patch {
    sides: Vec<Side>,
    closed: bool,
    patterns: PatternCache,
}

/// A boundary side cut in two at one of its interior vertices.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SideCut {
    pub(crate) side: BTreeSet<VertId>,
    pub(crate) at: VertId,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_side(side: Side) -> Self {
        let mut patch = Self::new();
        patch.add_side(side);
        patch
    }

    pub(crate) fn with_patterns(mut self, patterns: PatternCache) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn sides(&self) -> &[Side] { &self.sides }
    pub fn is_closed(&self) -> bool { self.closed }
    pub fn is_empty(&self) -> bool { self.sides.is_empty() }
    pub fn patterns(&self) -> &PatternCache { &self.patterns }

    /// Number of times `v` appears as a side endpoint.
    pub fn incidence(&self, v: VertId) -> usize {
        self.sides
            .iter()
            .flat_map(|s| s.endpoints())
            .filter(|&e| e == v)
            .count()
    }

    /// Total edge count around the boundary.
    pub fn perimeter(&self) -> usize {
        self.sides.iter().map(Side::edge_count).sum()
    }

    pub fn find_side(&self, side: &Side) -> Option<usize> {
        self.sides.iter().position(|s| s == side)
    }

    /// True if any side passes through `v`.
    pub fn touches(&self, v: VertId) -> bool {
        self.sides.iter().any(|s| s.contains(v))
    }

    fn head(&self) -> Option<VertId> { self.sides.first().map(Side::first) }
    fn tail(&self) -> Option<VertId> { self.sides.last().map(Side::last) }

    fn recompute_closed(&mut self) {
        self.closed = !self.sides.is_empty()
            && self
                .sides
                .iter()
                .flat_map(|s| s.endpoints())
                .all(|v| self.incidence(v) == 2);
    }
}

// ============================================================================
// GROWING
// ============================================================================

impl Patch {
    pub fn can_add_side(&self, side: &Side) -> bool {
        if self.closed {
            return false;
        }
        if self.sides.is_empty() {
            return true;
        }
        if side.is_loop() || self.find_side(side).is_some() {
            return false;
        }
        let [a, b] = side.endpoints().map(|v| self.incidence(v));
        a <= 1 && b <= 1 && (a == 1 || b == 1)
    }

    /// Attach `side` at the head or tail of the chain, reversing it as needed.
    ///
    /// Panics if `can_add_side(&side)` is false.
    pub fn add_side(&mut self, mut side: Side) {
        assert!(self.can_add_side(&side), "side cannot be added to this patch");
        match (self.head(), self.tail()) {
            (Some(head), Some(tail)) => {
                if side.first() == tail {
                    self.sides.push(side);
                } else if side.last() == tail {
                    side.reverse();
                    self.sides.push(side);
                } else if side.last() == head {
                    self.sides.insert(0, side);
                } else {
                    side.reverse();
                    self.sides.insert(0, side);
                }
            }
            _ => self.sides.push(side),
        }
        self.recompute_closed();
    }
}

// ============================================================================
// SPLITTING
// ============================================================================

impl Patch {
    /// A closed patch is split by a chord whose two distinct endpoints both
    /// lie on its boundary.
    pub fn is_split_by(&self, side: &Side) -> bool {
        if !self.closed || side.is_loop() || self.find_side(side).is_some() {
            return false;
        }
        side.endpoints().iter().all(|&v| self.touches(v))
    }

    /// Replace this patch by the two patches on either side of `chord`.
    ///
    /// Panics if `is_split_by(chord)` is false.
    pub fn split(&self, chord: &Side) -> Result<(Patch, Patch)> {
        self.split_with_cuts(chord).map(|(a, b, _)| (a, b))
    }

    /// `split`, also reporting every boundary side cut at a chord endpoint,
    /// in the order the cuts were made.
    pub(crate) fn split_with_cuts(&self, chord: &Side) -> Result<(Patch, Patch, Vec<SideCut>)> {
        assert!(self.is_split_by(chord), "side does not split this patch");
        let [a, b] = chord.endpoints();

        // Cut mid-side endpoints so both chord ends are side corners.
        let mut sides = self.sides.clone();
        let mut cuts = Vec::new();
        for p in [a, b] {
            let found = sides
                .iter()
                .enumerate()
                .find_map(|(i, s)| s.position_of(p).map(|k| (i, k)));
            let Some((i, k)) = found else { return Err(AutofillError::SplitFailed) };
            if k > 0 && k + 1 < sides[i].len() {
                cuts.push(SideCut { side: sides[i].vert_set(), at: p });
                let (before, after) = sides[i].split_at(k);
                sides.splice(i..=i, [before, after]);
            }
        }

        let n = sides.len();
        let start_a = sides.iter().position(|s| s.first() == a);
        let start_b = sides.iter().position(|s| s.first() == b);
        let (Some(ia), Some(ib)) = (start_a, start_b) else { return Err(AutofillError::SplitFailed) };

        let arc = |from: usize, to: usize| -> Vec<Side> {
            let mut out = Vec::new();
            let mut i = from;
            loop {
                out.push(sides[i].clone());
                i = (i + 1) % n;
                if i == to {
                    return out;
                }
            }
        };
        let mut half_a = arc(ia, ib);
        let mut half_b = arc(ib, ia);
        half_a.push(chord.reversed());
        half_b.push(chord.clone());

        let (ordered_a, closed_a) = Side::order(half_a);
        let (ordered_b, closed_b) = Side::order(half_b);
        if !closed_a || !closed_b {
            return Err(AutofillError::SplitFailed);
        }
        let patch_a = Patch::from_ordered(ordered_a);
        let patch_b = Patch::from_ordered(ordered_b);
        if !patch_a.closed || !patch_b.closed {
            return Err(AutofillError::SplitFailed);
        }
        debug!(
            "split {} sides into {} + {}",
            self.sides.len(),
            patch_a.sides.len(),
            patch_b.sides.len()
        );
        Ok((patch_a, patch_b, cuts))
    }

    fn from_ordered(sides: Vec<Side>) -> Patch {
        let mut patch = Patch { sides, closed: false, patterns: PatternCache::new() };
        patch.recompute_closed();
        patch
    }
}

// ============================================================================
// EDITING & PATTERNS
// ============================================================================

impl Patch {
    pub(crate) fn side_mut(&mut self, index: usize) -> &mut Side {
        &mut self.sides[index]
    }

    /// Swap in `new` for the side covering `old`, keeping chain orientation.
    pub(crate) fn replace_side(&mut self, old: &BTreeSet<VertId>, new: &Side) -> bool {
        let Some(i) = self.sides.iter().position(|s| &s.vert_set() == old) else { return false };
        let oriented = if new.first() == self.sides[i].first() { new.clone() } else { new.reversed() };
        self.sides[i] = oriented;
        true
    }

    /// Cut the side covering `cut.side` in two at `cut.at`. Returns whether
    /// this patch held that side.
    pub(crate) fn apply_cut(&mut self, cut: &SideCut) -> bool {
        let Some(i) = self.sides.iter().position(|s| s.vert_set() == cut.side) else { return false };
        let Some(k) = self.sides[i].position_of(cut.at) else { return false };
        if k == 0 || k + 1 >= self.sides[i].len() {
            return false;
        }
        let (before, after) = self.sides[i].split_at(k);
        self.sides.splice(i..=i, [before, after]);
        self.recompute_closed();
        true
    }

    /// Break this patch open at side `k`, dropping that side. A closed patch
    /// becomes one chain starting after `k`; an open chain falls into the
    /// runs before and after it.
    pub(crate) fn without_side(self, k: usize) -> Vec<Patch> {
        let Patch { mut sides, closed, .. } = self;
        sides.remove(k);
        let runs = if closed {
            sides.rotate_left(k);
            vec![sides]
        } else {
            let after = sides.split_off(k);
            vec![sides, after]
        };
        runs.into_iter().filter(|r| !r.is_empty()).map(Patch::from_ordered).collect()
    }

    /// Swap host vertex `old` for `new` in every side.
    pub(crate) fn rename_vert(&mut self, old: VertId, new: VertId) {
        for side in &mut self.sides {
            side.rename(old, new);
        }
        self.recompute_closed();
    }

    pub(crate) fn take_sides(self) -> Vec<Side> {
        self.sides
    }

    pub(crate) fn reload<M: HostMesh, S: PatternService + ?Sized>(&mut self, mesh: &mut M, service: &mut S) {
        self.patterns.load(mesh, service, &self.sides);
    }

    pub(crate) fn invalidate(&mut self) {
        self.patterns.invalidate();
    }

    pub(crate) fn destroy_pattern(&mut self, mesh: &mut impl HostMesh) {
        self.patterns.destroy(mesh);
    }

    pub(crate) fn next_pattern(&mut self, mesh: &mut impl HostMesh) -> bool {
        self.patterns.next(mesh, &self.sides)
    }

    pub(crate) fn prev_pattern(&mut self, mesh: &mut impl HostMesh) -> bool {
        self.patterns.prev(mesh, &self.sides)
    }
}
