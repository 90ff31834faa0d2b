// Stroke processing: freehand points → resampled side in the host mesh.
//
//   filter_stroke → drop jitter closer than min_dist
//   snap_ends     → pull stroke ends onto nearby existing vertices
//   is_cyclic     → closed loop or open strip?
//   create_strip / create_cycle → new host vertices + edges, returned as a Side
//
// Degenerate strokes fail with StrokeTooShort before the mesh is touched.

use glam::Vec3;

use super::config::AutofillOptions;
use super::error::{AutofillError, Result};
use super::mesh::{HostMesh, VertId};
use super::restroke::{loop_fractions, restroke, strip_fractions};
use super::side::Side;

/// Drop points closer than `min_dist` to the previously kept point.
/// The final point is always kept so the stroke still ends where it was released.
pub fn filter_stroke(points: &[Vec3], min_dist: f32) -> Vec<Vec3> {
    let mut kept: Vec<Vec3> = Vec::with_capacity(points.len());
    for &p in points {
        if kept.last().is_none_or(|&last| last.distance(p) >= min_dist) {
            kept.push(p);
        }
    }
    if let (Some(&end), Some(&last)) = (points.last(), kept.last()) {
        let n = kept.len();
        if last != end && n > 1 {
            kept[n - 1] = end;
        } else if last != end {
            kept.push(end);
        }
    }
    kept
}

pub fn stroke_length(points: &[Vec3]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Number of spans along a stroke: about one per brush diameter, at least one.
pub fn span_count(length: f32, brush_radius: f32) -> usize {
    if brush_radius <= 0.0 {
        return 1;
    }
    ((length / (2.0 * brush_radius)).ceil() as usize).max(1)
}

/// The stroke returns to where it started after leaving the brush.
pub fn is_cyclic(points: &[Vec3], radius: f32) -> bool {
    let (Some(&start), Some(&end)) = (points.first(), points.last()) else { return false };
    start.distance(end) < radius && points.iter().any(|p| p.distance(start) > 2.0 * radius)
}

/// Move each stroke end onto the nearest host vertex within `snap_dist`.
pub fn snap_ends(mesh: &impl HostMesh, points: &mut [Vec3], snap_dist: f32) {
    let n = points.len();
    if n == 0 {
        return;
    }
    for i in [0, n - 1] {
        if let Some((v, _)) = mesh.nearest_vert(points[i], snap_dist) {
            if let Some(p) = mesh.position(v) {
                points[i] = p;
            }
        }
    }
}

/// Resample an open stroke into `spans` spans and build it in the host.
///
/// An end that lands within `merge_dist` of an existing vertex is merged
/// into it, so the new side shares that vertex with its neighbours.
pub fn create_strip(mesh: &mut impl HostMesh, stroke: &[Vec3], spans: usize, options: &AutofillOptions) -> Result<Side> {
    let points = restroke(stroke, &strip_fractions(spans));
    if points.len() < 2 {
        return Err(AutofillError::StrokeTooShort(points.len()));
    }
    let last = points.len() - 1;

    // Look up merge targets before any new vertex can shadow them.
    let snap_first = mesh.nearest_vert(points[0], options.merge_dist).map(|(v, _)| v);
    let snap_last = mesh.nearest_vert(points[last], options.merge_dist).map(|(v, _)| v);
    if snap_first.is_some() && snap_first == snap_last {
        return Err(AutofillError::StrokeTooShort(1));
    }

    let mut verts: Vec<VertId> = points.iter().map(|&p| mesh.new_vert(p)).collect();
    for w in verts.windows(2) {
        mesh.new_edge(w[0], w[1])?;
    }
    for (i, snap) in [(0, snap_first), (last, snap_last)] {
        if let Some(keep) = snap {
            mesh.merge_verts(keep, verts[i])?;
            verts[i] = keep;
        }
    }
    Side::from_verts(verts)
}

/// Resample a closed stroke into `spans` vertices joined in a ring.
/// The returned side is a loop: its first vertex repeats at the end.
pub fn create_cycle(mesh: &mut impl HostMesh, stroke: &[Vec3], spans: usize) -> Result<Side> {
    let mut closed = stroke.to_vec();
    if let Some(&start) = stroke.first() {
        closed.push(start);
    }
    let points = restroke(&closed, &loop_fractions(spans));
    if points.len() < 3 {
        return Err(AutofillError::StrokeTooShort(points.len()));
    }

    let mut verts: Vec<VertId> = points.iter().map(|&p| mesh.new_vert(p)).collect();
    verts.push(verts[0]);
    for w in verts.windows(2) {
        mesh.new_edge(w[0], w[1])?;
    }
    Side::from_verts(verts)
}

/// Remove the host geometry a drawn side added. A loop owns all of its
/// vertices; a strip keeps its two ends, which neighbours may share.
pub fn erase_side(mesh: &mut impl HostMesh, side: &Side) {
    let verts = side.verts();
    if side.is_loop() {
        mesh.delete_verts(&verts[..verts.len() - 1]);
        return;
    }
    if let [a, b] = verts {
        if let Some(e) = mesh.shared_edge(*a, *b).filter(|&e| mesh.edge_face_count(e) == 0) {
            mesh.delete_edges(&[e]);
        }
        return;
    }
    mesh.delete_verts(&verts[1..verts.len() - 1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mesh::PolyMesh;

    fn line(n: usize, length: f32) -> Vec<Vec3> {
        (0..=n).map(|i| Vec3::new(length * i as f32 / n as f32, 0.0, 0.0)).collect()
    }

    fn circle(n: usize, r: f32) -> Vec<Vec3> {
        (0..n)
            .map(|i| {
                let a = std::f32::consts::TAU * i as f32 / n as f32;
                Vec3::new(r * a.cos(), r * a.sin(), 0.0)
            })
            .collect()
    }

    #[test]
    fn filter_drops_jitter_but_keeps_the_end() {
        let points = [Vec3::ZERO, Vec3::new(0.001, 0.0, 0.0), Vec3::X, Vec3::new(1.001, 0.0, 0.0)];
        let kept = filter_stroke(&points, 0.01);
        assert_eq!(kept, vec![Vec3::ZERO, Vec3::new(1.001, 0.0, 0.0)]);
    }

    #[test]
    fn filter_keeps_a_lone_end_point() {
        let kept = filter_stroke(&[Vec3::ZERO, Vec3::new(0.005, 0.0, 0.0)], 0.01);
        assert_eq!(kept, vec![Vec3::ZERO, Vec3::new(0.005, 0.0, 0.0)]);
        assert_eq!(filter_stroke(&[Vec3::ONE], 0.01), vec![Vec3::ONE]);
    }

    #[test]
    fn span_count_is_at_least_one() {
        assert_eq!(span_count(0.0, 0.5), 1);
        assert_eq!(span_count(3.0, 0.5), 3);
        assert_eq!(span_count(3.1, 0.5), 4);
    }

    #[test]
    fn cyclic_detection() {
        assert!(is_cyclic(&circle(32, 2.0), 0.5));
        assert!(!is_cyclic(&line(10, 4.0), 0.5));
    }

    #[test]
    fn strip_creates_spans_plus_one_vertices() {
        let mut mesh = PolyMesh::new();
        let side = create_strip(&mut mesh, &line(10, 4.0), 4, &AutofillOptions::new()).unwrap();
        assert_eq!(side.len(), 5);
        assert_eq!(mesh.edge_count(), 4);
        assert!(!side.is_loop());
    }

    #[test]
    fn strip_merges_end_into_existing_vertex() {
        let mut mesh = PolyMesh::new();
        let options = AutofillOptions::new();
        let first = create_strip(&mut mesh, &line(4, 2.0), 2, &options).unwrap();
        let second = create_strip(&mut mesh, &[Vec3::new(2.0, 0.0, 0.0), Vec3::new(2.0, 2.0, 0.0)], 2, &options).unwrap();
        assert_eq!(second.first(), first.last());
        assert_eq!(mesh.vertex_count(), 5);
    }

    #[test]
    fn cycle_is_a_loop_side() {
        let mut mesh = PolyMesh::new();
        let side = create_cycle(&mut mesh, &circle(32, 2.0), 6).unwrap();
        assert!(side.is_loop());
        assert_eq!(side.len(), 7);
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.edge_count(), 6);
    }

    #[test]
    fn erase_keeps_strip_ends_but_not_loops() {
        let mut mesh = PolyMesh::new();
        let options = AutofillOptions::new();
        let strip = create_strip(&mut mesh, &line(10, 4.0), 4, &options).unwrap();
        erase_side(&mut mesh, &strip);
        assert_eq!(mesh.vertex_count(), 2);
        assert!(mesh.is_vert_valid(strip.first()) && mesh.is_vert_valid(strip.last()));
        assert_eq!(mesh.edge_count(), 0);

        let single = create_strip(&mut mesh, &line(2, 0.5), 1, &options).unwrap();
        erase_side(&mut mesh, &single);
        assert_eq!(mesh.edge_count(), 0);

        let ring = create_cycle(&mut mesh, &circle(32, 2.0).iter().map(|p| *p + Vec3::Z).collect::<Vec<_>>(), 6).unwrap();
        erase_side(&mut mesh, &ring);
        assert!(!mesh.is_vert_valid(ring.first()));
        // The two strip ends plus the short strip's free end.
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn degenerate_strokes_leave_the_mesh_alone() {
        let mut mesh = PolyMesh::new();
        let options = AutofillOptions::new();
        assert!(matches!(create_strip(&mut mesh, &[Vec3::ONE], 3, &options), Err(AutofillError::StrokeTooShort(0))));
        assert!(matches!(create_cycle(&mut mesh, &[Vec3::ZERO, Vec3::X], 2), Err(AutofillError::StrokeTooShort(2))));
        assert_eq!(mesh.vertex_count(), 0);
    }
}
