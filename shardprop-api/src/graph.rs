pub use shardprop_common::types::{Edge, Vertex, VertexId, VertexInterval};
use shardprop_common::error::ShardPropResult;

#[derive(Debug, Clone)]
pub struct WindowData<VV, EV> {
    pub interval: VertexInterval,
    pub vertices: Vec<Vertex<VertexId, VV>>,
    pub in_edges: Vec<Edge<VertexId, EV>>,
    pub out_edges: Vec<(VertexId, VertexId)>,
}

impl<VV, EV> WindowData<VV, EV> {
    pub fn empty(interval: VertexInterval) -> Self {
        Self {
            interval,
            vertices: Vec::new(),
            in_edges: Vec::new(),
            out_edges: Vec::new(),
        }
    }
}

/// Disk- or memory-resident graph the engine pulls windows from.
pub trait GraphSource<VV, EV>: Send + Sync {
    fn num_vertices(&self) -> ShardPropResult<u64>;

    fn num_edges(&self) -> ShardPropResult<u64>;

    fn load_window(&self, interval: VertexInterval) -> ShardPropResult<WindowData<VV, EV>>;

    /// Writes back mutated in-edges of `interval`. Edges are identified by `(src_id, target_id)`.
    fn persist_edges(
        &self,
        interval: VertexInterval,
        edges: &[Edge<VertexId, EV>],
    ) -> ShardPropResult<()>;
}

impl<VV, EV, S> GraphSource<VV, EV> for &S
where
    S: GraphSource<VV, EV> + ?Sized,
{
    fn num_vertices(&self) -> ShardPropResult<u64> {
        (**self).num_vertices()
    }

    fn num_edges(&self) -> ShardPropResult<u64> {
        (**self).num_edges()
    }

    fn load_window(&self, interval: VertexInterval) -> ShardPropResult<WindowData<VV, EV>> {
        (**self).load_window(interval)
    }

    fn persist_edges(
        &self,
        interval: VertexInterval,
        edges: &[Edge<VertexId, EV>],
    ) -> ShardPropResult<()> {
        (**self).persist_edges(interval, edges)
    }
}
