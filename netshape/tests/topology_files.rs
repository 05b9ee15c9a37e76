use std::collections::BTreeSet;

use netshape::{
    PeerMapping, TopologyBuilder, generate, graph,
    manifest::Manifest,
    persistence::{self, PersistError},
};

#[test]
fn generated_topology_survives_a_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let topology = TopologyBuilder::default()
        .nodes(6)
        .min_peers(2)
        .max_peers(3)
        .require_floor(true)
        .seed(2024)
        .generate()
        .unwrap();

    assert!(topology.peers.degrees().iter().all(|d| (2..=3).contains(d)));
    assert!(graph::is_connected(&topology.peers));

    let path = persistence::save_to_dir(&topology.peers, dir.path(), &topology.id).unwrap();
    assert!(path.ends_with(format!("topology_{}.json", topology.id)));

    let loaded = persistence::load(&path).unwrap();
    assert_eq!(loaded, topology.peers);
    assert_eq!(loaded.graph_id(), topology.id);
}

#[test]
fn edge_case_mappings_round_trip() {
    let dir = tempfile::tempdir().unwrap();

    let single = generate(1, 0, 0, 1).unwrap().peers;
    let pair = generate(2, 1, 1, 1).unwrap().peers;
    let empty = PeerMapping::new();

    for (name, mapping) in [("single", single), ("pair", pair), ("empty", empty)] {
        let path = dir.path().join(format!("{name}.json"));
        persistence::save(&mapping, &path).unwrap();
        assert_eq!(persistence::load(&path).unwrap(), mapping, "{name}");
    }
}

#[test]
fn larger_topologies_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    for seed in 0..5 {
        let topology = generate(64, 3, 7, seed).unwrap();
        let path = persistence::save_to_dir(&topology.peers, dir.path(), &topology.id).unwrap();
        assert_eq!(persistence::load(&path).unwrap(), topology.peers);
    }
}

#[test]
fn load_reports_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let err = persistence::load(&dir.path().join("topology_missing.json")).unwrap_err();
    assert!(matches!(err, PersistError::NotFound(_)));
}

#[test]
fn manifest_follows_the_generated_links() {
    let topology = generate(12, 2, 4, 9).unwrap();
    let manifest = Manifest::from_peers(&topology.peers, &BTreeSet::from([1, 5])).unwrap();

    assert_eq!(manifest.node.len(), 12);
    for (id, peers) in topology.peers.iter() {
        let record = &manifest.node[&netshape::manifest::node_name(id)];
        assert_eq!(record.persistent_peers.len(), peers.len());
        assert_eq!(record.send_no_load, id != 1 && id != 5);
    }
}
