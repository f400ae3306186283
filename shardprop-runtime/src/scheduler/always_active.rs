use shardprop_api::scheduler::Scheduler;
use shardprop_common::types::VertexId;

#[derive(Debug, Clone)]
pub struct AlwaysActiveScheduler {
    num_vertices: u64,
}

impl AlwaysActiveScheduler {
    pub fn new(num_vertices: u64) -> Self {
        Self { num_vertices }
    }
}

impl Scheduler for AlwaysActiveScheduler {
    fn is_active(&self, vertex_id: VertexId) -> bool {
        vertex_id < self.num_vertices
    }

    fn mark_active(&self, _vertex_id: VertexId) {}

    fn reset(&mut self) {}

    fn advance(&mut self) {}

    fn active_count(&self) -> u64 {
        self.num_vertices
    }

    fn is_selective(&self) -> bool {
        false
    }
}
