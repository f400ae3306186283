use parking_lot::RwLock;
use shardprop_api::graph::{GraphSource, WindowData};
use shardprop_common::error::{ShardPropError, ShardPropResult};
use shardprop_common::types::{Edge, Vertex, VertexId, VertexInterval};
use std::collections::BTreeMap;

pub struct InMemoryGraphSource<VV, EV> {
    vertices: Vec<Option<VV>>,
    // sorted by (target_id, src_id)
    in_edges: RwLock<Vec<Edge<VertexId, EV>>>,
    // sorted by (src, target)
    out_edges: Vec<(VertexId, VertexId)>,
}

impl<VV, EV> InMemoryGraphSource<VV, EV>
where
    VV: Clone + Send + Sync,
    EV: Clone + Send + Sync,
{
    pub fn new(
        num_vertices: u64,
        vertices: Vec<Vertex<VertexId, VV>>,
        edges: Vec<Edge<VertexId, EV>>,
    ) -> ShardPropResult<Self> {
        let mut values: Vec<Option<VV>> = vec![None; num_vertices as usize];
        for v in vertices {
            check_id(v.id, num_vertices)?;
            values[v.id as usize] = Some(v.value);
        }

        let mut by_target: BTreeMap<(VertexId, VertexId), Edge<VertexId, EV>> = BTreeMap::new();
        for e in edges {
            check_id(e.src_id, num_vertices)?;
            check_id(e.target_id, num_vertices)?;
            by_target.insert((e.target_id, e.src_id), e);
        }
        let in_edges: Vec<Edge<VertexId, EV>> = by_target.into_values().collect();
        let mut out_edges: Vec<(VertexId, VertexId)> =
            in_edges.iter().map(|e| (e.src_id, e.target_id)).collect();
        out_edges.sort_unstable();

        Ok(Self {
            vertices: values,
            in_edges: RwLock::new(in_edges),
            out_edges,
        })
    }

    pub fn from_parts(
        vertices: Vec<Vertex<VertexId, VV>>,
        edges: Vec<Edge<VertexId, EV>>,
    ) -> ShardPropResult<Self> {
        let max_id = vertices
            .iter()
            .map(|v| v.id)
            .chain(edges.iter().flat_map(|e| [e.src_id, e.target_id]))
            .max();
        let num_vertices = max_id.map(|m| m + 1).unwrap_or(0);
        Self::new(num_vertices, vertices, edges)
    }

    pub fn edges(&self) -> Vec<Edge<VertexId, EV>> {
        self.in_edges.read().clone()
    }

    pub fn edge_value(&self, src_id: VertexId, target_id: VertexId) -> Option<EV> {
        let edges = self.in_edges.read();
        edges
            .binary_search_by_key(&(target_id, src_id), |e| (e.target_id, e.src_id))
            .ok()
            .map(|i| edges[i].value.clone())
    }
}

fn check_id(id: VertexId, num_vertices: u64) -> ShardPropResult<()> {
    if id >= num_vertices {
        return Err(ShardPropError::InvalidArgument(format!(
            "vertex id {id} out of range (num_vertices={num_vertices})"
        )));
    }
    Ok(())
}

impl<VV, EV> GraphSource<VV, EV> for InMemoryGraphSource<VV, EV>
where
    VV: Clone + Send + Sync,
    EV: Clone + Send + Sync,
{
    fn num_vertices(&self) -> ShardPropResult<u64> {
        Ok(self.vertices.len() as u64)
    }

    fn num_edges(&self) -> ShardPropResult<u64> {
        Ok(self.out_edges.len() as u64)
    }

    fn load_window(&self, interval: VertexInterval) -> ShardPropResult<WindowData<VV, EV>> {
        let mut window = WindowData::empty(interval);
        if interval.is_empty() {
            return Ok(window);
        }

        let last = interval.end.min(self.vertices.len() as u64);
        for id in interval.start..last.saturating_add(1) {
            if let Some(Some(value)) = self.vertices.get(id as usize) {
                window.vertices.push(Vertex::new(id, value.clone()));
            }
        }

        let edges = self.in_edges.read();
        let lo = edges.partition_point(|e| e.target_id < interval.start);
        let hi = edges.partition_point(|e| e.target_id <= interval.end);
        window.in_edges = edges[lo..hi].to_vec();

        let lo = self.out_edges.partition_point(|(s, _)| *s < interval.start);
        let hi = self.out_edges.partition_point(|(s, _)| *s <= interval.end);
        window.out_edges = self.out_edges[lo..hi].to_vec();
        Ok(window)
    }

    fn persist_edges(
        &self,
        interval: VertexInterval,
        edges: &[Edge<VertexId, EV>],
    ) -> ShardPropResult<()> {
        let mut stored = self.in_edges.write();
        for e in edges {
            if !interval.contains(e.target_id) {
                return Err(ShardPropError::InvalidArgument(format!(
                    "edge {}->{} does not belong to window {interval}",
                    e.src_id, e.target_id
                )));
            }
            let idx = stored
                .binary_search_by_key(&(e.target_id, e.src_id), |s| (s.target_id, s.src_id))
                .map_err(|_| {
                    ShardPropError::GraphSource(format!(
                        "edge {}->{} not found",
                        e.src_id, e.target_id
                    ))
                })?;
            stored[idx].value = e.value.clone();
        }
        Ok(())
    }
}
