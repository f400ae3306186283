use crate::state::SharedVertexState;
use shardprop_common::error::ShardPropResult;
use shardprop_common::types::{Edge, VertexId, VertexInterval};

pub trait VertexUpdateContext<VV, EV> {
    fn vertex_id(&self) -> VertexId;
    fn iteration(&self) -> u64;

    fn source_value(&self) -> Option<&VV>;

    fn vertex_state(&self) -> &VV;
    fn neighbor_state(&self, vertex_id: VertexId) -> Option<&VV>;
    fn set_vertex_state(&mut self, value: VV);

    fn num_in_edges(&self) -> usize;
    fn in_edge(&self, index: usize) -> &Edge<VertexId, EV>;
    fn set_in_edge_value(&mut self, index: usize, value: EV);

    fn num_out_edges(&self) -> usize;
    fn out_neighbors(&self) -> &[VertexId];

    /// Requests an update of `vertex_id` in the next iteration.
    fn schedule(&mut self, vertex_id: VertexId);
}

pub struct ProgramContext<'a, VV> {
    pub iteration: u64,
    pub num_iterations: u64,
    pub num_vertices: u64,
    pub state: &'a SharedVertexState<VV>,
}

impl<'a, VV> ProgramContext<'a, VV> {
    pub fn is_last_iteration(&self) -> bool {
        self.iteration + 1 >= self.num_iterations
    }
}

pub trait VertexProgram<VV, EV>: Send + Sync {
    fn name(&self) -> &str;

    fn update(&self, context: &mut dyn VertexUpdateContext<VV, EV>) -> ShardPropResult<()>;

    fn before_iteration(
        &mut self,
        _iteration: u64,
        _context: &ProgramContext<'_, VV>,
    ) -> ShardPropResult<()> {
        Ok(())
    }

    fn after_iteration(
        &mut self,
        _iteration: u64,
        _context: &ProgramContext<'_, VV>,
    ) -> ShardPropResult<()> {
        Ok(())
    }

    fn before_exec_interval(
        &mut self,
        _interval: VertexInterval,
        _context: &ProgramContext<'_, VV>,
    ) -> ShardPropResult<()> {
        Ok(())
    }

    fn after_exec_interval(
        &mut self,
        _interval: VertexInterval,
        _context: &ProgramContext<'_, VV>,
    ) -> ShardPropResult<()> {
        Ok(())
    }
}
