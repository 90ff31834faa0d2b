// Shared test utilities for autofill tests.

#![allow(dead_code)]

use autofill::{Adjacency, ExpandedPattern, FaceId, HostMesh, PatternService, PolyMesh, ServiceError, Side, VertId};
use glam::Vec3;

/// `count` evenly spaced points from `a` to `b`, both ends included.
pub fn line(a: Vec3, b: Vec3, count: usize) -> Vec<Vec3> {
    (0..count).map(|i| a.lerp(b, i as f32 / (count - 1) as f32)).collect()
}

/// Add `points` as a vertex chain joined by edges.
pub fn chain(mesh: &mut PolyMesh, points: &[Vec3]) -> Vec<VertId> {
    let verts: Vec<VertId> = points.iter().map(|&p| mesh.add_vertex(p)).collect();
    for w in verts.windows(2) {
        mesh.new_edge(w[0], w[1]).unwrap();
    }
    verts
}

/// Corners of the axis-aligned square of side `size` at the origin, counter-clockwise.
pub fn square(size: f32) -> [Vec3; 4] {
    [Vec3::ZERO, Vec3::new(size, 0.0, 0.0), Vec3::new(size, size, 0.0), Vec3::new(0.0, size, 0.0)]
}

/// Four sides around a square, sharing corner vertices. Side `i` runs from
/// corner `i` to corner `i + 1` with `counts[i]` vertices.
pub fn quad_sides(mesh: &mut PolyMesh, size: f32, counts: [usize; 4]) -> Vec<Side> {
    let corners = square(size);
    let corner_verts: Vec<VertId> = corners.iter().map(|&p| mesh.add_vertex(p)).collect();
    (0..4)
        .map(|i| {
            let j = (i + 1) % 4;
            let points = line(corners[i], corners[j], counts[i]);
            let mut verts = vec![corner_verts[i]];
            verts.extend(points[1..counts[i] - 1].iter().map(|&p| mesh.add_vertex(p)));
            verts.push(corner_verts[j]);
            for w in verts.windows(2) {
                mesh.new_edge(w[0], w[1]).unwrap();
            }
            Side::from_verts(verts).unwrap()
        })
        .collect()
}

/// Open side through `verts`, creating any missing edges.
pub fn side_through(mesh: &mut PolyMesh, verts: &[VertId]) -> Side {
    for w in verts.windows(2) {
        if mesh.shared_edge(w[0], w[1]).is_none() {
            mesh.new_edge(w[0], w[1]).unwrap();
        }
    }
    Side::from_verts(verts.to_vec()).unwrap()
}

/// Vertex positions of each face, in order.
pub fn face_positions(mesh: &PolyMesh, faces: &[FaceId]) -> Vec<Vec<Vec3>> {
    faces
        .iter()
        .map(|&f| {
            mesh.face_verts(f)
                .unwrap()
                .iter()
                .map(|&v| mesh.position(v).unwrap())
                .collect()
        })
        .collect()
}

// ============================================================================
// SCRIPTED SERVICES
// ============================================================================

/// Triangle fan around the boundary centroid, lifted by `lift` along Z.
pub fn fan_pattern(sides: &[Vec<Vec3>], lift: f32) -> ExpandedPattern {
    let total: usize = sides.iter().map(|s| s.len() - 1).sum();
    let mut mapping = Vec::new();
    let mut verts = vec![Vec3::ZERO; total + 1];
    let mut offset = 0;
    for side in sides {
        let map: Vec<usize> = (0..side.len()).map(|k| (offset + k) % total).collect();
        for (p, &i) in side.iter().zip(&map) {
            verts[i] = *p;
        }
        mapping.push(map);
        offset += side.len() - 1;
    }
    let centroid = verts[..total].iter().copied().sum::<Vec3>() / total as f32;
    verts[total] = centroid + Vec3::Z * lift;
    let faces = (0..total).map(|i| vec![i, (i + 1) % total, total]).collect();
    ExpandedPattern::new(faces, verts, mapping)
}

/// Returns `variants` fans per request, each with a different hub height.
pub struct FanService {
    pub variants: usize,
    pub calls: usize,
    pub last_request: Vec<Vec<Vec3>>,
}

impl FanService {
    pub fn new(variants: usize) -> Self {
        Self { variants, calls: 0, last_request: Vec::new() }
    }
}

impl PatternService for FanService {
    fn expanded_patterns(&mut self, sides: &[Vec<Vec3>]) -> Result<Vec<ExpandedPattern>, ServiceError> {
        self.calls += 1;
        self.last_request = sides.to_vec();
        Ok((0..self.variants).map(|k| fan_pattern(sides, k as f32 * 0.25)).collect())
    }
}

/// A backend that is never reachable.
pub struct OfflineService;

impl PatternService for OfflineService {
    fn expanded_patterns(&mut self, _sides: &[Vec<Vec3>]) -> Result<Vec<ExpandedPattern>, ServiceError> {
        Err(ServiceError::Unavailable("connection refused".to_string()))
    }
}
