use crate::algorithms::label_propagation::{LabelEdge, LabelPropagation, LabelPropagationConfig, LabelState};
use crate::engine::{Engine, RunOutcome};
use crate::graph::rocksdb_graph::RocksDbGraphSource;
use crate::io::file::{read_edges, read_seeds, write_states};
use crate::plan::job_spec::{AlgorithmSpec, JobSpec, OutputSpec};
use crate::plan::run_config::RunConfig;
use shardprop_api::graph::GraphSource;
use shardprop_common::error::{ShardPropError, ShardPropResult};
use shardprop_common::types::{Edge, Vertex, VertexId};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub num_vertices: u64,
    pub edges_read: u64,
    pub seeds_read: u64,
}

pub fn ingest_csv(
    store_dir: impl AsRef<Path>,
    edges_path: impl AsRef<Path>,
    seeds_path: Option<&Path>,
    num_vertices: Option<u64>,
    dimensions: usize,
) -> ShardPropResult<IngestSummary> {
    let edges = read_edges(edges_path)?;
    let seeds = match seeds_path {
        Some(path) => read_seeds(path, dimensions)?,
        None => Vec::new(),
    };
    let num_vertices = match num_vertices {
        Some(n) => n,
        None => implied_num_vertices(&seeds, &edges),
    };

    let store = RocksDbGraphSource::open(store_dir)?;
    store.ingest(num_vertices, &seeds, &edges)?;
    Ok(IngestSummary {
        num_vertices,
        edges_read: edges.len() as u64,
        seeds_read: seeds.len() as u64,
    })
}

fn implied_num_vertices(
    seeds: &[Vertex<VertexId, LabelState>],
    edges: &[Edge<VertexId, LabelEdge>],
) -> u64 {
    seeds
        .iter()
        .map(|v| v.id)
        .chain(edges.iter().flat_map(|e| [e.src_id, e.target_id]))
        .max()
        .map(|m| m + 1)
        .unwrap_or(0)
}

pub fn run_label_propagation<S>(
    source: S,
    run: RunConfig,
    config: LabelPropagationConfig,
) -> ShardPropResult<RunOutcome<LabelState>>
where
    S: GraphSource<LabelState, LabelEdge>,
{
    let mut program = LabelPropagation::new(config)?;
    let iterations = run.iterations;
    let engine = Engine::new(source, run)?;
    engine.run(&mut program, iterations)
}

pub fn run_job(spec: &JobSpec) -> ShardPropResult<RunOutcome<LabelState>> {
    let AlgorithmSpec::LabelPropagation(config) = &spec.algorithm;
    tracing::info!(job_id = %spec.job_id, name = %spec.name, "job start");

    let graph = &spec.graph;
    if let Some(edges) = &graph.edges {
        let seeds = graph.seeds.as_ref().map(|s| Path::new(s.path()));
        let summary = ingest_csv(
            &graph.store_dir,
            edges.path(),
            seeds,
            graph.num_vertices,
            config.dimensions,
        )?;
        tracing::info!(
            job_id = %spec.job_id,
            vertices = summary.num_vertices,
            edges = summary.edges_read,
            seeds = summary.seeds_read,
            "job input ingested"
        );
    } else if graph.seeds.is_some() {
        return Err(ShardPropError::InvalidArgument(
            "job has seeds but no edge list to ingest with them".to_string(),
        ));
    }

    let store = RocksDbGraphSource::open_existing(&graph.store_dir)?;
    let run = RunConfig {
        graph: graph.store_dir.clone(),
        ..spec.run.clone()
    };
    let outcome = run_label_propagation(store, run, config.clone())?;
    if let Some(output) = &spec.output {
        write_outputs(output, &outcome)?;
    }
    Ok(outcome)
}

pub fn write_outputs(output: &OutputSpec, outcome: &RunOutcome<LabelState>) -> ShardPropResult<()> {
    if let Some(path) = &output.states_csv {
        write_states(path, &outcome.state)?;
        tracing::info!(path = %path, "vertex states written");
    }
    if let Some(path) = &output.report_json {
        std::fs::write(path, outcome.report.to_json_pretty()?)?;
        tracing::info!(path = %path, "run report written");
    }
    Ok(())
}
