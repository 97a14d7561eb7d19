use std::fs;

use edge_placement::{
    dag::{Graph, TaskKind},
    parser::graphs_from_yaml,
    system::SystemConfig,
    Error,
};

const SYSTEM: &str = "
devices:
  - {cpu: 4, ram: 8}
  - {cpu: 2, ram: 4}
device_links:
  - [{cost: 0, bandwidth: 1}, {cost: 1, bandwidth: 10}]
  - [{cost: 1, bandwidth: 10}, {cost: 0, bandwidth: 1}]
client_links:
  - [{cost: 1, bandwidth: 10}, {cost: 2, bandwidth: 10}]
";

const GRAPHS: &str = "
graphs:
  - client: 0
    id: 0
    tasks:
      - {kind: Scan, cpu: 1, ram: 1, selectivity: 1, input_rate: 10}
      - {kind: Filter, cpu: 1, ram: 1, selectivity: 0.5, parents: [0]}
      - {kind: Map, cpu: 1, ram: 1, selectivity: 0.5, parents: [0]}
      - {kind: GroupBy, cpu: 1, ram: 2, selectivity: 1, parents: [1, 2]}
";

#[test]
fn system_from_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("system.yaml");
    fs::write(&path, SYSTEM).unwrap();
    let config = SystemConfig::from_yaml(&path).unwrap();
    assert_eq!(config.device_count(), 2);
    assert_eq!(config.client_count(), 1);
    assert_eq!(config.tunables.rc_theta, 1.5);
    assert_eq!(config.client_transfer_time(10.0, 0, 1), 2.0);
}

#[test]
fn asymmetric_links_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("system.yaml");
    fs::write(&path, SYSTEM.replacen("{cost: 1, bandwidth: 10}]", "{cost: 3, bandwidth: 10}]", 1)).unwrap();
    assert!(matches!(SystemConfig::from_yaml(&path), Err(Error::InvalidConfig(_))));
}

#[test]
fn graphs_from_yaml_derive_children_and_rates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graphs.yaml");
    fs::write(&path, GRAPHS).unwrap();
    let graphs = graphs_from_yaml(&path).unwrap();
    assert_eq!(graphs.len(), 1);

    let graph = &graphs[0];
    assert_eq!(graph.children(0), &[1, 2]);
    assert_eq!(graph.task(1).input_rate, 10.0);
    assert_eq!(graph.task(3).input_rate, 10.0);
    assert_eq!(graph.task(3).kind, TaskKind::GroupBy);
    assert_eq!(graph.paths().len(), 2);
}

#[test]
fn parents_must_precede_children() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.yaml");
    fs::write(
        &path,
        "
client: 0
id: 3
tasks:
  - {kind: Scan, cpu: 1, ram: 1, selectivity: 1, input_rate: 1, parents: [1]}
  - {kind: Map, cpu: 1, ram: 1, selectivity: 1}
",
    )
    .unwrap();
    assert!(matches!(Graph::from_yaml(&path), Err(Error::InvalidGraph(_))));
}

#[test]
fn missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        SystemConfig::from_yaml(dir.path().join("missing.yaml")),
        Err(Error::Io(_))
    ));
}
