// Tests for saving a patch set and resolving it back against a mesh.

mod helpers;

use std::collections::{BTreeSet, HashMap};

use autofill::{
    Adjacency, Autofill, AutofillOptions, HostMesh, PatchSet, PolyMesh, SavedPatchSet, Selection, VertId,
};
use glam::Vec3;
use helpers::{face_positions, line, square, FanService};

type Session = Autofill<PolyMesh, FanService>;

fn options() -> AutofillOptions {
    AutofillOptions { brush_radius: 0.52, ..AutofillOptions::new() }
}

/// A closed square showing its second candidate, plus one open side off to the right.
fn drawn_session() -> Session {
    let mut session = Autofill::new(PolyMesh::new(), FanService::new(2), options());
    let corners = square(4.0);
    for i in 0..4 {
        session.stroke(&line(corners[i], corners[(i + 1) % 4], 41)).unwrap();
    }
    session.next();
    session.stroke(&line(Vec3::new(10.0, 0.0, 0.0), Vec3::new(12.0, 0.0, 0.0), 21)).unwrap();
    session
}

fn topology(set: &PatchSet) -> Vec<(bool, Vec<Vec<VertId>>)> {
    set.patches()
        .iter()
        .chain(set.pending())
        .map(|p| (p.is_closed(), p.sides().iter().map(|s| s.verts().to_vec()).collect()))
        .collect()
}

/// Copy `mesh` element by element; every handle is reissued.
fn rebuild(mesh: &PolyMesh) -> PolyMesh {
    let mut copy = PolyMesh::new();
    // Shift slots so no handle lines up with the original by accident.
    let spacer = copy.add_vertex(Vec3::splat(-100.0));
    let mut remap = HashMap::new();
    for v in mesh.vert_ids() {
        remap.insert(v, copy.add_vertex(mesh.position(v).unwrap()));
    }
    for e in mesh.edge_ids() {
        let [a, b] = mesh.edge_verts(e).unwrap();
        copy.new_edge(remap[&a], remap[&b]).unwrap();
    }
    for f in mesh.face_ids() {
        let verts: Vec<VertId> = mesh.face_verts(f).unwrap().iter().map(|v| remap[v]).collect();
        copy.new_face(&verts).unwrap();
    }
    copy.delete_verts(&[spacer]);
    copy
}

#[test]
fn round_trip_on_the_same_mesh_keeps_topology() {
    let mut session = drawn_session();
    let before = topology(session.patches());
    let selection = session.patches().selection();
    let faces = session.patches().patches()[0].patterns().drawn().unwrap().faces().to_vec();

    let saved = session.save();
    session.restore(&saved);

    assert_eq!(topology(session.patches()), before);
    assert_eq!(session.patches().selection(), selection);
    let cache = session.patches().patches()[0].patterns();
    assert_eq!(cache.variants().len(), 2);
    assert_eq!(cache.active_index(), Some(1));
    assert_eq!(cache.drawn().unwrap().faces(), &faces[..]);
}

#[test]
fn round_trip_through_json_and_a_rebuilt_mesh() {
    let session = drawn_session();
    let saved = session.save();
    let json = saved.to_json().unwrap();
    let before = session.patches().patches()[0].sides().len();
    let drawn_before = face_positions(session.mesh(), session.patches().patches()[0].patterns().drawn().unwrap().faces());

    let (mesh, _) = session.into_parts();
    let copy = rebuild(&mesh);
    let restored = PatchSet::restore(&SavedPatchSet::from_json(&json).unwrap(), &copy);

    assert_eq!(restored.patches().len(), 1);
    assert_eq!(restored.pending().len(), 1);
    assert!(restored.patches()[0].is_closed());
    assert_eq!(restored.patches()[0].sides().len(), before);
    assert_eq!(restored.selection(), Selection { patch: Some(0), highlighted: true });

    let drawn = restored.patches()[0].patterns().drawn().unwrap();
    assert_eq!(face_positions(&copy, drawn.faces()), drawn_before);
    for f in drawn.faces() {
        assert!(copy.is_face_valid(*f));
    }
}

#[test]
fn restored_cache_can_keep_cycling() {
    let mut session = drawn_session();
    let saved = session.save();
    session.restore(&saved);

    let faces_before = session.mesh().face_count();
    assert!(session.prev());
    assert_eq!(session.mesh().face_count(), faces_before);
    assert_eq!(session.patches().patches()[0].patterns().active_index(), Some(0));
    // Only boundary and one hub remain: the old hub went with its candidate.
    assert_eq!(session.mesh().vertex_count(), 16 + 1 + 3);
}

#[test]
fn unresolvable_sides_are_dropped() {
    let session = drawn_session();
    let saved = session.save();
    let (mut mesh, _) = session.into_parts();

    // Remove one end of the open side: it collapses and is dropped.
    let open_end = mesh.nearest_vert(Vec3::new(12.0, 0.0, 0.0), 0.01).unwrap().0;
    let open_mid = mesh.nearest_vert(Vec3::new(11.0, 0.0, 0.0), 0.01).unwrap().0;
    mesh.delete_verts(&[open_end, open_mid]);

    let restored = PatchSet::restore(&saved, &mesh);
    assert_eq!(restored.patches().len(), 1);
    assert!(restored.pending().is_empty());
}

#[test]
fn saved_state_is_plain_positions() {
    let session = drawn_session();
    let saved = session.save();
    assert_eq!(saved.patches.len(), 1);
    assert_eq!(saved.pending.len(), 1);
    assert_eq!(saved.patches[0].active, Some(1));
    assert!(saved.patches[0].closed);
    let key = |p: [f32; 3]| p.map(|c| (c * 1000.0).round() as i32);
    let corners: BTreeSet<[i32; 3]> = saved.patches[0].sides.iter().map(|s| key(s.verts[0])).collect();
    let expected: BTreeSet<[i32; 3]> = square(4.0).iter().map(|p| key(p.to_array())).collect();
    assert_eq!(corners, expected);
}
