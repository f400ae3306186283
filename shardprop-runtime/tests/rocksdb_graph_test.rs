use shardprop_api::graph::GraphSource;
use shardprop_common::types::{Edge, Vertex, VertexId, VertexInterval};
use shardprop_runtime::algorithms::label_propagation::{
    LabelEdge, LabelPropagationConfig, LabelState,
};
use shardprop_runtime::graph::mem_graph::InMemoryGraphSource;
use shardprop_runtime::graph::rocksdb_graph::RocksDbGraphSource;
use shardprop_runtime::job::run_label_propagation;
use shardprop_runtime::plan::run_config::{RunConfig, ShardCount};

#[test]
fn test_rocksdb_window_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = RocksDbGraphSource::open(dir.path()).unwrap();
    store
        .ingest(
            6,
            &[Vertex::new(1u64, 10i32), Vertex::new(4u64, 40i32)],
            &[
                Edge::new(0u64, 1u64, 1i32),
                Edge::new(5u64, 1u64, 2i32),
                Edge::new(1u64, 4u64, 3i32),
                Edge::new(3u64, 5u64, 4i32),
                Edge::new(2u64, 3u64, 5i32),
            ],
        )
        .unwrap();

    assert_eq!(GraphSource::<i32, i32>::num_vertices(&store).unwrap(), 6);
    assert_eq!(GraphSource::<i32, i32>::num_edges(&store).unwrap(), 5);

    let window = GraphSource::<i32, i32>::load_window(&store, VertexInterval::new(1, 3)).unwrap();
    assert_eq!(window.vertices, vec![Vertex::new(1, 10)]);
    let in_edges: Vec<(VertexId, VertexId, i32)> = window
        .in_edges
        .iter()
        .map(|e| (e.src_id, e.target_id, e.value))
        .collect();
    assert_eq!(in_edges, vec![(0, 1, 1), (5, 1, 2), (2, 3, 5)]);
    assert_eq!(window.out_edges, vec![(1, 4), (2, 3), (3, 5)]);

    GraphSource::<i32, i32>::persist_edges(
        &store,
        VertexInterval::new(4, 5),
        &[Edge::new(1, 4, 30)],
    )
    .unwrap();
    let window = GraphSource::<i32, i32>::load_window(&store, VertexInterval::new(4, 5)).unwrap();
    assert_eq!(window.vertices, vec![Vertex::new(4, 40)]);
    assert_eq!(window.in_edges[0].value, 30);

    // edge 0->1 belongs to another window
    assert!(GraphSource::<i32, i32>::persist_edges(
        &store,
        VertexInterval::new(4, 5),
        &[Edge::new(0, 1, 9)],
    )
    .is_err());
}

#[test]
fn test_rocksdb_store_reopens_and_rejects_bad_ids() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = RocksDbGraphSource::open(dir.path()).unwrap();
        store
            .ingest::<i32, i32>(3, &[], &[Edge::new(0, 2, 7)])
            .unwrap();
        assert!(store
            .ingest::<i32, i32>(3, &[], &[Edge::new(0, 3, 7)])
            .is_err());
    }
    let store = RocksDbGraphSource::open_existing(dir.path()).unwrap();
    assert_eq!(GraphSource::<i32, i32>::num_vertices(&store).unwrap(), 3);
    assert_eq!(GraphSource::<i32, i32>::num_edges(&store).unwrap(), 1);
}

fn sample_graph() -> (
    u64,
    Vec<Vertex<VertexId, LabelState>>,
    Vec<Edge<VertexId, LabelEdge>>,
) {
    let n = 40u64;
    let seeds = vec![
        Vertex::new(0, LabelState::seed(vec![1.0, 0.0, 0.0], 1.0).unwrap()),
        Vertex::new(17, LabelState::seed(vec![0.0, 1.0, 0.0], 0.8).unwrap()),
        Vertex::new(33, LabelState::seed(vec![0.0, 0.0, 1.0], 0.9).unwrap()),
    ];
    let mut edges = Vec::new();
    let mut x = 11u64;
    for src in 0..n {
        for _ in 0..3 {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let target = (x >> 33) % n;
            let weight = 0.25 + ((x >> 13) % 8) as f32 * 0.25;
            if target != src {
                edges.push(Edge::new(src, target, LabelEdge::new(weight).unwrap()));
            }
        }
    }
    (n, seeds, edges)
}

#[test]
fn test_rocksdb_and_in_memory_sources_agree() {
    let (n, seeds, edges) = sample_graph();
    let config = LabelPropagationConfig {
        dimensions: 3,
        ..LabelPropagationConfig::default()
    };
    let run = RunConfig {
        iterations: 8,
        shards: ShardCount::Fixed(4),
        ..RunConfig::default()
    };

    let mem = InMemoryGraphSource::new(n, seeds.clone(), edges.clone()).unwrap();
    let from_mem = run_label_propagation(&mem, run.clone(), config.clone()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = RocksDbGraphSource::open(dir.path()).unwrap();
    store.ingest(n, &seeds, &edges).unwrap();
    let from_db = run_label_propagation(store.clone(), run, config).unwrap();

    assert_eq!(from_mem.state.into_values(), from_db.state.into_values());
    assert_eq!(from_mem.report.state_writes, from_db.report.state_writes);

    for e in mem.edges() {
        let window = GraphSource::<LabelState, LabelEdge>::load_window(
            &store,
            VertexInterval::new(e.target_id, e.target_id),
        )
        .unwrap();
        let stored = window
            .in_edges
            .iter()
            .find(|s| s.src_id == e.src_id)
            .unwrap();
        assert_eq!(stored.value, e.value);
    }
}
