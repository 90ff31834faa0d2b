// Tests for sides and single patches: chaining, closure and splitting.

mod helpers;

use std::collections::{BTreeSet, HashSet};

use autofill::graph::find_edge_cycles;
use autofill::{Adjacency, AutofillError, HostMesh, Patch, PolyMesh, Side, VertId};
use glam::Vec3;
use helpers::{chain, quad_sides, side_through};

fn union(sides: &[Side]) -> BTreeSet<VertId> {
    sides.iter().flat_map(|s| s.verts().iter().copied()).collect()
}

#[test]
fn quad_sides_close_one_at_a_time() {
    let mut mesh = PolyMesh::new();
    let sides = quad_sides(&mut mesh, 2.0, [3, 3, 3, 3]);

    let mut patch = Patch::new();
    for (i, side) in sides.iter().enumerate() {
        assert!(patch.can_add_side(side), "side {i} should attach");
        assert!(!patch.is_closed());
        patch.add_side(side.clone());
    }
    assert!(patch.is_closed());
    assert_eq!(patch.perimeter(), 8);
    for side in patch.sides() {
        for v in side.endpoints() {
            assert_eq!(patch.incidence(v), 2);
        }
    }
    // Chain order is cyclic.
    let n = patch.sides().len();
    for i in 0..n {
        assert_eq!(patch.sides()[i].last(), patch.sides()[(i + 1) % n].first());
    }
    assert!(!patch.can_add_side(&sides[0]));
}

#[test]
fn sides_may_arrive_out_of_order_and_reversed() {
    let mut mesh = PolyMesh::new();
    let sides = quad_sides(&mut mesh, 2.0, [2, 2, 2, 2]);

    let mut patch = Patch::from_side(sides[2].clone());
    patch.add_side(sides[1].reversed());
    patch.add_side(sides[3].clone());
    assert!(!patch.is_closed());
    patch.add_side(sides[0].reversed());
    assert!(patch.is_closed());
    assert_eq!(patch.sides()[0].first(), sides[1].first());
}

#[test]
fn disconnected_side_cannot_attach() {
    let mut mesh = PolyMesh::new();
    let sides = quad_sides(&mut mesh, 2.0, [2, 2, 2, 2]);
    let patch = Patch::from_side(sides[0].clone());
    assert!(!patch.can_add_side(&sides[2]));
    assert!(patch.can_add_side(&sides[1]));
    assert!(patch.can_add_side(&sides[3]));
}

#[test]
fn loop_side_closes_on_its_own() {
    let mut mesh = PolyMesh::new();
    let verts = chain(&mut mesh, &[Vec3::ZERO, Vec3::X, Vec3::ONE, Vec3::Y]);
    mesh.new_edge(verts[3], verts[0]).unwrap();
    let edges: HashSet<_> = mesh.edge_ids().collect();

    let cycles: Vec<_> = find_edge_cycles(&mesh, &edges).collect();
    assert_eq!(cycles.len(), 1);
    let side = Side::from_edges(&mesh, &cycles[0]).unwrap();
    assert!(side.is_loop());
    assert_eq!(side.len(), 5);

    let patch = Patch::from_side(side);
    assert!(patch.is_closed());
    assert_eq!(patch.perimeter(), 4);
}

#[test]
fn midpoint_chord_splits_quad_into_two_closed_patches() {
    let mut mesh = PolyMesh::new();
    let sides = quad_sides(&mut mesh, 2.0, [3, 3, 3, 3]);
    let mut patch = Patch::new();
    for side in &sides {
        patch.add_side(side.clone());
    }

    let bottom_mid = sides[0].verts()[1];
    let top_mid = sides[2].verts()[1];
    let center = mesh.add_vertex(Vec3::new(1.0, 1.0, 0.0));
    let chord = side_through(&mut mesh, &[bottom_mid, center, top_mid]);

    assert!(patch.is_split_by(&chord));
    let (a, b) = patch.split(&chord).unwrap();
    assert!(a.is_closed() && b.is_closed());
    assert!(a.find_side(&chord).is_some());
    assert!(b.find_side(&chord).is_some());

    let (va, vb) = (union(a.sides()), union(b.sides()));
    let mut expected = union(patch.sides());
    expected.extend(chord.verts());
    assert_eq!(va.union(&vb).copied().collect::<BTreeSet<_>>(), expected);
    assert_eq!(va.intersection(&vb).copied().collect::<BTreeSet<_>>(), chord.vert_set());
    assert_eq!(a.perimeter() + b.perimeter(), patch.perimeter() + 2 * chord.edge_count());
}

#[test]
fn chord_from_corner_to_corner_splits_without_cutting() {
    let mut mesh = PolyMesh::new();
    let sides = quad_sides(&mut mesh, 2.0, [2, 2, 2, 2]);
    let mut patch = Patch::new();
    for side in &sides {
        patch.add_side(side.clone());
    }
    let diagonal = side_through(&mut mesh, &[sides[0].first(), sides[1].last()]);
    let (a, b) = patch.split(&diagonal).unwrap();
    assert_eq!(a.sides().len(), 3);
    assert_eq!(b.sides().len(), 3);
}

#[test]
fn open_patch_and_boundary_sides_do_not_split() {
    let mut mesh = PolyMesh::new();
    let sides = quad_sides(&mut mesh, 2.0, [3, 3, 3, 3]);
    let mut patch = Patch::new();
    for side in &sides[..3] {
        patch.add_side(side.clone());
    }
    let chord = side_through(&mut mesh, &[sides[0].verts()[1], sides[2].verts()[1]]);
    assert!(!patch.is_split_by(&chord));

    patch.add_side(sides[3].clone());
    assert!(patch.is_split_by(&chord));
    assert!(!patch.is_split_by(&sides[1]));

    let outside = mesh.add_vertex(Vec3::new(5.0, 5.0, 0.0));
    let stray = side_through(&mut mesh, &[sides[0].verts()[1], outside]);
    assert!(!patch.is_split_by(&stray));
}

#[test]
#[should_panic(expected = "side does not split this patch")]
fn split_without_crossing_panics() {
    let mut mesh = PolyMesh::new();
    let sides = quad_sides(&mut mesh, 2.0, [2, 2, 2, 2]);
    let patch = Patch::from_side(sides[0].clone());
    let _ = patch.split(&sides[1]);
}

#[test]
fn side_from_broken_edge_chain_is_rejected() {
    let mut mesh = PolyMesh::new();
    let a = chain(&mut mesh, &[Vec3::ZERO, Vec3::X]);
    let b = chain(&mut mesh, &[Vec3::new(5.0, 0.0, 0.0), Vec3::new(6.0, 0.0, 0.0)]);
    let edges = [mesh.shared_edge(a[0], a[1]).unwrap(), mesh.shared_edge(b[0], b[1]).unwrap()];
    assert!(matches!(Side::from_edges(&mesh, &edges), Err(AutofillError::DisconnectedEdges)));
}
