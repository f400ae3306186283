use shardprop_common::types::VertexId;

pub trait Scheduler: Send + Sync {
    fn is_active(&self, vertex_id: VertexId) -> bool;

    /// Safe to call concurrently from update workers.
    fn mark_active(&self, vertex_id: VertexId);

    fn reset(&mut self);

    fn advance(&mut self);

    fn active_count(&self) -> u64;

    fn is_selective(&self) -> bool;
}
