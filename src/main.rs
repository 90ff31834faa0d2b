// Headless autofill demo
//
// Scripts one artist session against the in-crate PolyMesh:
//   1. four jittered strokes close a quad patch
//   2. cycle through the fill candidates
//   3. resubdivide a side
//   4. save, rebuild the mesh from scratch, restore
//
// Fills come from a small local generator standing in for the pattern
// backend, or from the HTTP backend with `--backend`. A JSON options file
// may be passed as the first other argument. Run with RUST_LOG=debug to
// watch classification and cache traffic.

use autofill::{
    Adjacency, Autofill, AutofillOptions, ExpandedPattern, HostMesh, JsonPatternService, PatternService, PolyMesh,
    SavedPatchSet, ServiceError, SideOutcome,
};
use glam::Vec3;
use rand::Rng;

// ============================================================================
// LOCAL FILL GENERATOR
// ============================================================================

/// Offers a structured grid when opposite sides of a 4-sided boundary
/// match, and always a fan around the centroid.
struct LocalFills;

impl LocalFills {
    /// Combined index of boundary vertex `k` on side `j` in a ring layout.
    fn ring_mapping(sides: &[Vec<Vec3>]) -> (Vec<Vec<usize>>, usize) {
        let total: usize = sides.iter().map(|s| s.len() - 1).sum();
        let mut mapping = Vec::with_capacity(sides.len());
        let mut offset = 0;
        for side in sides {
            mapping.push((0..side.len()).map(|k| (offset + k) % total.max(1)).collect());
            offset += side.len() - 1;
        }
        (mapping, total)
    }

    fn fan(sides: &[Vec<Vec3>]) -> ExpandedPattern {
        let (mapping, total) = Self::ring_mapping(sides);
        let mut verts = vec![Vec3::ZERO; total + 1];
        for (side, map) in sides.iter().zip(&mapping) {
            for (p, &i) in side.iter().zip(map) {
                verts[i] = *p;
            }
        }
        verts[total] = verts[..total].iter().copied().sum::<Vec3>() / total as f32;
        let faces = (0..total).map(|i| vec![i, (i + 1) % total, total]).collect();
        ExpandedPattern::new(faces, verts, mapping)
    }

    fn grid(sides: &[Vec<Vec3>]) -> Option<ExpandedPattern> {
        let [bottom, right, top, left] = sides else { return None };
        if bottom.len() != top.len() || right.len() != left.len() {
            return None;
        }
        let (n, m) = (bottom.len() - 1, right.len() - 1);
        let index = |i: usize, j: usize| j * (n + 1) + i;

        // Coons patch over the four boundary curves.
        let at_bottom = |i: usize| bottom[i];
        let at_top = |i: usize| top[n - i];
        let at_left = |j: usize| left[m - j];
        let at_right = |j: usize| right[j];
        let mut verts = vec![Vec3::ZERO; (n + 1) * (m + 1)];
        for j in 0..=m {
            for i in 0..=n {
                let (u, v) = (i as f32 / n as f32, j as f32 / m as f32);
                let ruled_u = at_left(j) * (1.0 - u) + at_right(j) * u;
                let ruled_v = at_bottom(i) * (1.0 - v) + at_top(i) * v;
                let corners = at_bottom(0) * (1.0 - u) * (1.0 - v)
                    + at_bottom(n) * u * (1.0 - v)
                    + at_top(0) * (1.0 - u) * v
                    + at_top(n) * u * v;
                verts[index(i, j)] = ruled_u + ruled_v - corners;
            }
        }

        let mut faces = Vec::with_capacity(n * m);
        for j in 0..m {
            for i in 0..n {
                faces.push(vec![index(i, j), index(i + 1, j), index(i + 1, j + 1), index(i, j + 1)]);
            }
        }
        let mapping = vec![
            (0..=n).map(|k| index(k, 0)).collect(),
            (0..=m).map(|k| index(n, k)).collect(),
            (0..=n).map(|k| index(n - k, m)).collect(),
            (0..=m).map(|k| index(0, m - k)).collect(),
        ];
        Some(ExpandedPattern::new(faces, verts, mapping))
    }
}

impl PatternService for LocalFills {
    fn expanded_patterns(&mut self, sides: &[Vec<Vec3>]) -> Result<Vec<ExpandedPattern>, ServiceError> {
        if sides.iter().any(|s| s.len() < 2) {
            return Err(ServiceError::InvalidVariant("side with fewer than 2 points".to_string()));
        }
        let mut variants: Vec<ExpandedPattern> = Self::grid(sides).into_iter().collect();
        variants.push(Self::fan(sides));
        Ok(variants)
    }
}

// ============================================================================
// SCRIPT
// ============================================================================

/// Hand-drawn-looking stroke from `a` to `b`: ends exact, interior wobbles.
fn jittered_stroke(rng: &mut impl Rng, a: Vec3, b: Vec3, samples: usize) -> Vec<Vec3> {
    let normal = (b - a).cross(Vec3::Z).normalize_or_zero();
    (0..=samples)
        .map(|i| {
            let t = i as f32 / samples as f32;
            let wobble: f32 = if i == 0 || i == samples { 0.0 } else { rng.gen_range(-0.04..0.04) };
            a.lerp(b, t) + normal * wobble
        })
        .collect()
}

fn describe<S: PatternService>(session: &Autofill<PolyMesh, S>) {
    let patches = session.patches();
    println!(
        "  patches: {} closed, {} open | mesh: {} verts, {} edges, {} faces",
        patches.patches().len(),
        patches.pending().len(),
        session.mesh().vertex_count(),
        session.mesh().edge_count(),
        session.mesh().face_count()
    );
    for (i, patch) in patches.patches().iter().enumerate() {
        let lengths: Vec<usize> = patch.sides().iter().map(|s| s.len()).collect();
        println!(
            "  patch {i}: sides {:?}, candidate {:?} of {}",
            lengths,
            patch.patterns().active_index(),
            patch.patterns().variants().len()
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let use_backend = args.iter().any(|a| a == "--backend");
    let options = match args.iter().find(|a| !a.starts_with("--")) {
        Some(path) => AutofillOptions::from_json(&std::fs::read_to_string(path)?)?,
        None => AutofillOptions::new(),
    };

    if use_backend {
        let backend = options.clone();
        run(options, move || JsonPatternService::connect(&backend))
    } else {
        run(options, || LocalFills)
    }
}

fn run<S: PatternService>(options: AutofillOptions, mut fills: impl FnMut() -> S) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = rand::thread_rng();
    let mut session = Autofill::new(PolyMesh::new(), fills(), options.clone());

    println!("Drawing quad boundary");
    let corners = [Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0), Vec3::new(4.0, 4.0, 0.0), Vec3::new(0.0, 4.0, 0.0)];
    for i in 0..corners.len() {
        let stroke = jittered_stroke(&mut rng, corners[i], corners[(i + 1) % corners.len()], 40);
        match session.stroke(&stroke)? {
            SideOutcome::Closed(index) => println!("  stroke {i} closed patch {index}"),
            outcome => println!("  stroke {i}: {outcome:?}"),
        }
    }
    describe(&session);

    println!("Cycling candidates");
    println!("  next → {}", session.next());
    println!("  next → {} (clamped)", session.next());
    println!("  prev → {}", session.prev());

    println!("Redrawing the last stroke with one more span");
    if let Some(outcome) = session.change_stroke_spans(1)? {
        println!("  {outcome:?}");
    }

    println!("Adding two vertices to the first side");
    let first_side = session.patches().patches().first().and_then(|p| p.sides().first()).cloned();
    if let Some(side) = first_side {
        session.change_subdivisions(&[side], true)?;
    }
    describe(&session);

    println!("Saving and restoring into an identical mesh");
    let saved = session.save();
    let json = saved.to_json()?;
    println!("  saved state: {} bytes of JSON", json.len());

    let (mesh, _) = session.into_parts();
    let mut copy = PolyMesh::new();
    let ids: Vec<_> = mesh.vert_ids().collect();
    let mut remap = std::collections::HashMap::new();
    for v in &ids {
        if let Some(p) = mesh.position(*v) {
            remap.insert(*v, copy.add_vertex(p));
        }
    }
    for e in mesh.edge_ids() {
        if let Some([a, b]) = mesh.edge_verts(e) {
            copy.new_edge(remap[&a], remap[&b])?;
        }
    }
    for f in mesh.face_ids() {
        if let Some(loop_verts) = mesh.face_verts(f) {
            let mapped: Vec<_> = loop_verts.iter().map(|v| remap[v]).collect();
            copy.new_face(&mapped)?;
        }
    }

    let mut restored = Autofill::new(copy, fills(), options);
    restored.restore(&SavedPatchSet::from_json(&json)?);
    describe(&restored);

    Ok(())
}
