use shardprop_api::graph::GraphSource;
use shardprop_api::program::{VertexProgram, VertexUpdateContext};
use shardprop_api::scheduler::Scheduler;
use shardprop_api::state::SharedVertexState;
use shardprop_common::error::ShardPropResult;
use shardprop_common::types::{Edge, VertexInterval};
use shardprop_runtime::graph::mem_graph::InMemoryGraphSource;
use shardprop_runtime::scheduler::selective::SelectiveScheduler;
use shardprop_runtime::window::WindowRunner;

/// Writes `10 * id` into even vertices, bumps every in-edge value and schedules out-neighbors.
struct EvenWriter;

impl VertexProgram<u64, u32> for EvenWriter {
    fn name(&self) -> &str {
        "even-writer"
    }

    fn update(&self, ctx: &mut dyn VertexUpdateContext<u64, u32>) -> ShardPropResult<()> {
        let id = ctx.vertex_id();
        if id % 2 == 0 {
            ctx.set_vertex_state(id * 10);
        }
        for i in 0..ctx.num_in_edges() {
            let value = ctx.in_edge(i).value;
            ctx.set_in_edge_value(i, value + 1);
        }
        let targets = ctx.out_neighbors().to_vec();
        for t in targets {
            ctx.schedule(t);
        }
        Ok(())
    }
}

fn graph() -> InMemoryGraphSource<u64, u32> {
    InMemoryGraphSource::new(
        6,
        Vec::new(),
        vec![
            Edge::new(0, 2, 0),
            Edge::new(1, 2, 0),
            Edge::new(2, 3, 0),
            Edge::new(3, 5, 0),
            Edge::new(5, 0, 0),
        ],
    )
    .unwrap()
}

#[test]
fn test_window_writes_are_staged_for_own_slots_only() {
    let graph = graph();
    let mut state = SharedVertexState::new(6, 1u64);
    let mut scheduler = SelectiveScheduler::new(6);
    let interval = VertexInterval::new(2, 3);
    let window = graph.load_window(interval).unwrap();

    for parallel in [true, false] {
        let stats = WindowRunner::new(parallel)
            .run(0, window.clone(), &EvenWriter, &mut state, &scheduler, &graph)
            .unwrap();
        assert_eq!(stats.active_vertices, 2);
        assert_eq!(stats.state_writes, 1);
        assert_eq!(stats.edges_persisted, 3);
        state.discard_staged();
    }

    WindowRunner::default()
        .run(0, window, &EvenWriter, &mut state, &scheduler, &graph)
        .unwrap();
    // nothing is visible before the barrier
    assert_eq!(state.get(2), Some(&1));
    assert_eq!(state.staged_len(), 1);
    state.commit();
    let values = state.into_values();
    assert_eq!(values, vec![1, 1, 20, 1, 1, 1]);

    // in-edges of the window were flushed, others untouched
    assert_eq!(graph.edge_value(0, 2), Some(1));
    assert_eq!(graph.edge_value(2, 3), Some(1));
    assert_eq!(graph.edge_value(3, 5), Some(0));

    // marks only apply after the barrier
    assert!(scheduler.is_active(0));
    scheduler.advance();
    assert!(scheduler.is_active(3));
    assert!(scheduler.is_active(5));
    assert!(!scheduler.is_active(0));
}

#[test]
fn test_inactive_vertices_are_skipped() {
    let graph = graph();
    let mut state = SharedVertexState::new(6, 1u64);
    let mut scheduler = SelectiveScheduler::new(6);
    scheduler.mark_active(3);
    scheduler.advance();

    let window = graph.load_window(VertexInterval::new(0, 5)).unwrap();
    let stats = WindowRunner::default()
        .run(1, window, &EvenWriter, &mut state, &scheduler, &graph)
        .unwrap();
    assert_eq!(stats.active_vertices, 1);
    assert_eq!(stats.state_writes, 0);
    assert_eq!(stats.edges_persisted, 1);
    assert_eq!(graph.edge_value(2, 3), Some(1));
    assert_eq!(graph.edge_value(0, 2), Some(0));
}
