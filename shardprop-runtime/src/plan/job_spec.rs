use crate::algorithms::label_propagation::LabelPropagationConfig;
use crate::plan::run_config::RunConfig;
use serde::{Deserialize, Serialize};
use shardprop_common::error::{ShardPropError, ShardPropResult};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub job_id: String,
    pub name: String,
    pub graph: GraphSpec,
    #[serde(default)]
    pub run: RunConfig,
    pub algorithm: AlgorithmSpec,
    #[serde(default)]
    pub output: Option<OutputSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSpec {
    pub store_dir: String,
    #[serde(default)]
    pub edges: Option<FileSource>,
    #[serde(default)]
    pub seeds: Option<FileSource>,
    #[serde(default)]
    pub num_vertices: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FileSource {
    Csv { path: String },
}

impl FileSource {
    pub fn path(&self) -> &str {
        match self {
            FileSource::Csv { path } => path,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AlgorithmSpec {
    LabelPropagation(LabelPropagationConfig),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSpec {
    #[serde(default)]
    pub states_csv: Option<String>,
    #[serde(default)]
    pub report_json: Option<String>,
}

impl JobSpec {
    pub fn read_json(path: impl AsRef<Path>) -> ShardPropResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            ShardPropError::InvalidArgument(format!("job spec {}: {e}", path.display()))
        })
    }

    pub fn to_json_pretty(&self) -> ShardPropResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ShardPropError::Internal(format!("job spec json: {e}")))
    }
}
