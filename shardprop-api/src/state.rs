use shardprop_common::error::{ShardPropError, ShardPropResult};
use shardprop_common::types::VertexId;

/// Per-vertex algorithm state for the whole graph, indexed by vertex id.
///
/// Reads always observe the values committed at the last barrier. Writes are
/// staged and only become visible after [`SharedVertexState::commit`].
#[derive(Debug, Clone)]
pub struct SharedVertexState<VV> {
    values: Vec<VV>,
    staged: Vec<(VertexId, VV)>,
}

impl<VV: Clone> SharedVertexState<VV> {
    pub fn new(num_vertices: u64, initial: VV) -> Self {
        Self {
            values: vec![initial; num_vertices as usize],
            staged: Vec::new(),
        }
    }
}

impl<VV> SharedVertexState<VV> {
    pub fn from_values(values: Vec<VV>) -> Self {
        Self {
            values,
            staged: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, vertex_id: VertexId) -> Option<&VV> {
        self.values.get(usize::try_from(vertex_id).ok()?)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VertexId, &VV)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (i as VertexId, v))
    }

    pub fn stage(&mut self, vertex_id: VertexId, value: VV) -> ShardPropResult<()> {
        if vertex_id as usize >= self.values.len() {
            return Err(ShardPropError::InvalidArgument(format!(
                "vertex {vertex_id} out of range (num_vertices={})",
                self.values.len()
            )));
        }
        self.staged.push((vertex_id, value));
        Ok(())
    }

    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    pub fn commit(&mut self) -> usize {
        let n = self.staged.len();
        for (id, value) in self.staged.drain(..) {
            self.values[id as usize] = value;
        }
        n
    }

    pub fn discard_staged(&mut self) {
        self.staged.clear();
    }

    pub fn into_values(self) -> Vec<VV> {
        self.values
    }
}
