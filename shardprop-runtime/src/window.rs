use rayon::prelude::*;
use shardprop_api::graph::{GraphSource, WindowData};
use shardprop_api::program::{VertexProgram, VertexUpdateContext};
use shardprop_api::scheduler::Scheduler;
use shardprop_api::state::SharedVertexState;
use shardprop_common::error::{ShardPropError, ShardPropResult};
use shardprop_common::types::{Edge, VertexId, VertexInterval};
use std::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowStats {
    pub active_vertices: u64,
    pub state_writes: u64,
    pub edges_persisted: u64,
}

struct VertexScope<VV, EV> {
    id: VertexId,
    source_value: Option<VV>,
    in_edges: Vec<Edge<VertexId, EV>>,
    out_neighbors: Vec<VertexId>,
}

struct VertexOutcome<VV, EV> {
    id: VertexId,
    new_state: Option<VV>,
    dirty_edges: Vec<Edge<VertexId, EV>>,
}

struct WindowVertexContext<'a, VV, EV> {
    iteration: u64,
    scope: &'a mut VertexScope<VV, EV>,
    own_state: &'a VV,
    state: &'a SharedVertexState<VV>,
    scheduler: &'a dyn Scheduler,
    new_state: Option<VV>,
    dirty: Vec<bool>,
}

impl<'a, VV, EV> VertexUpdateContext<VV, EV> for WindowVertexContext<'a, VV, EV> {
    fn vertex_id(&self) -> VertexId {
        self.scope.id
    }

    fn iteration(&self) -> u64 {
        self.iteration
    }

    fn source_value(&self) -> Option<&VV> {
        self.scope.source_value.as_ref()
    }

    fn vertex_state(&self) -> &VV {
        self.own_state
    }

    fn neighbor_state(&self, vertex_id: VertexId) -> Option<&VV> {
        self.state.get(vertex_id)
    }

    fn set_vertex_state(&mut self, value: VV) {
        self.new_state = Some(value);
    }

    fn num_in_edges(&self) -> usize {
        self.scope.in_edges.len()
    }

    fn in_edge(&self, index: usize) -> &Edge<VertexId, EV> {
        &self.scope.in_edges[index]
    }

    fn set_in_edge_value(&mut self, index: usize, value: EV) {
        self.scope.in_edges[index].value = value;
        self.dirty[index] = true;
    }

    fn num_out_edges(&self) -> usize {
        self.scope.out_neighbors.len()
    }

    fn out_neighbors(&self) -> &[VertexId] {
        &self.scope.out_neighbors
    }

    fn schedule(&mut self, vertex_id: VertexId) {
        self.scheduler.mark_active(vertex_id);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WindowRunner {
    parallel: bool,
}

impl Default for WindowRunner {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl WindowRunner {
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    pub fn run<VV, EV, P, S>(
        &self,
        iteration: u64,
        window: WindowData<VV, EV>,
        program: &P,
        state: &mut SharedVertexState<VV>,
        scheduler: &dyn Scheduler,
        source: &S,
    ) -> ShardPropResult<WindowStats>
    where
        VV: Clone + Send + Sync,
        EV: Clone + Send + Sync,
        P: VertexProgram<VV, EV> + ?Sized,
        S: GraphSource<VV, EV> + ?Sized,
    {
        let start = Instant::now();
        let interval = window.interval;
        let mut scopes = build_scopes(window)?;
        scopes.retain(|s| scheduler.is_active(s.id));

        let committed: &SharedVertexState<VV> = state;
        let run_one = |scope: &mut VertexScope<VV, EV>| -> ShardPropResult<VertexOutcome<VV, EV>> {
            let own_state = committed.get(scope.id).ok_or_else(|| {
                ShardPropError::Internal(format!("no state slot for vertex {}", scope.id))
            })?;
            let dirty = vec![false; scope.in_edges.len()];
            let mut ctx = WindowVertexContext {
                iteration,
                scope,
                own_state,
                state: committed,
                scheduler,
                new_state: None,
                dirty,
            };
            program.update(&mut ctx)?;

            let WindowVertexContext {
                scope,
                new_state,
                dirty,
                ..
            } = ctx;
            let dirty_edges = scope
                .in_edges
                .iter()
                .zip(dirty)
                .filter(|(_, d)| *d)
                .map(|(e, _)| e.clone())
                .collect();
            Ok(VertexOutcome {
                id: scope.id,
                new_state,
                dirty_edges,
            })
        };

        let outcomes: Vec<VertexOutcome<VV, EV>> = if self.parallel {
            scopes
                .par_iter_mut()
                .map(|scope| run_one(scope))
                .collect::<ShardPropResult<_>>()?
        } else {
            scopes
                .iter_mut()
                .map(|scope| run_one(scope))
                .collect::<ShardPropResult<_>>()?
        };

        let mut stats = WindowStats {
            active_vertices: scopes.len() as u64,
            ..WindowStats::default()
        };
        let mut dirty_edges = Vec::new();
        for outcome in outcomes {
            if let Some(value) = outcome.new_state {
                state.stage(outcome.id, value)?;
                stats.state_writes += 1;
            }
            dirty_edges.extend(outcome.dirty_edges);
        }
        if !dirty_edges.is_empty() {
            source.persist_edges(interval, &dirty_edges)?;
            stats.edges_persisted = dirty_edges.len() as u64;
        }

        metrics::counter!("shardprop_window_vertex_updates_total").increment(stats.active_vertices);
        metrics::counter!("shardprop_window_edges_persisted_total").increment(stats.edges_persisted);
        metrics::histogram!("shardprop_window_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::debug!(
            iteration,
            %interval,
            active = stats.active_vertices,
            writes = stats.state_writes,
            edges = stats.edges_persisted,
            "window done"
        );
        Ok(stats)
    }
}

fn build_scopes<VV, EV>(window: WindowData<VV, EV>) -> ShardPropResult<Vec<VertexScope<VV, EV>>> {
    let interval = window.interval;
    let mut scopes: Vec<VertexScope<VV, EV>> = interval
        .ids()
        .map(|id| VertexScope {
            id,
            source_value: None,
            in_edges: Vec::new(),
            out_neighbors: Vec::new(),
        })
        .collect();

    for v in window.vertices {
        let slot = slot_of(interval, v.id)?;
        scopes[slot].source_value = Some(v.value);
    }
    for e in window.in_edges {
        let slot = slot_of(interval, e.target_id)?;
        scopes[slot].in_edges.push(e);
    }
    for (src, target) in window.out_edges {
        let slot = slot_of(interval, src)?;
        scopes[slot].out_neighbors.push(target);
    }
    Ok(scopes)
}

fn slot_of(interval: VertexInterval, vertex_id: VertexId) -> ShardPropResult<usize> {
    if !interval.contains(vertex_id) {
        return Err(ShardPropError::GraphSource(format!(
            "vertex {vertex_id} returned for window {interval}"
        )));
    }
    Ok((vertex_id - interval.start) as usize)
}
