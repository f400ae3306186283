use crate::window::WindowStats;
use serde::{Deserialize, Serialize};
use shardprop_common::error::{ShardPropError, ShardPropResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationStats {
    pub iteration: u64,
    pub scheduled_vertices: u64,
    pub windows: u64,
    pub vertex_updates: u64,
    pub state_writes: u64,
    pub edges_persisted: u64,
    pub duration_ms: f64,
}

impl IterationStats {
    pub fn new(iteration: u64, scheduled_vertices: u64) -> Self {
        Self {
            iteration,
            scheduled_vertices,
            ..Self::default()
        }
    }

    pub fn add_window(&mut self, stats: &WindowStats) {
        self.windows += 1;
        self.vertex_updates += stats.active_vertices;
        self.state_writes += stats.state_writes;
        self.edges_persisted += stats.edges_persisted;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub program: String,
    #[serde(default)]
    pub graph: String,
    pub num_vertices: u64,
    pub num_edges: u64,
    pub num_shards: u64,
    pub requested_iterations: u64,
    pub iterations_executed: u64,
    pub selective_scheduling: bool,
    pub converged: bool,
    pub vertex_updates: u64,
    pub state_writes: u64,
    pub edges_persisted: u64,
    pub elapsed_ms: f64,
    pub iterations: Vec<IterationStats>,
}

impl RunReport {
    pub fn record_iteration(&mut self, stats: IterationStats) {
        self.iterations_executed += 1;
        self.vertex_updates += stats.vertex_updates;
        self.state_writes += stats.state_writes;
        self.edges_persisted += stats.edges_persisted;
        self.iterations.push(stats);
    }

    pub fn emit(&self) {
        metrics::counter!("shardprop_run_iterations_total").increment(self.iterations_executed);
        metrics::counter!("shardprop_run_vertex_updates_total").increment(self.vertex_updates);
        metrics::counter!("shardprop_run_state_writes_total").increment(self.state_writes);
        metrics::histogram!("shardprop_run_duration_ms").record(self.elapsed_ms);
        tracing::info!(
            program = %self.program,
            graph = %self.graph,
            vertices = self.num_vertices,
            edges = self.num_edges,
            shards = self.num_shards,
            iterations = self.iterations_executed,
            requested = self.requested_iterations,
            converged = self.converged,
            updates = self.vertex_updates,
            writes = self.state_writes,
            edges_persisted = self.edges_persisted,
            elapsed_ms = self.elapsed_ms,
            "run finished"
        );
    }

    pub fn to_json_pretty(&self) -> ShardPropResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ShardPropError::Internal(format!("report json: {e}")))
    }
}
