use serde::{Deserialize, Serialize};
use shardprop_common::config::Configuration;
use shardprop_common::error::{ShardPropError, ShardPropResult};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_ITERATIONS: u64 = 4;
pub const DEFAULT_MAX_EDGES_PER_WINDOW: u64 = 4_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardCount {
    Auto,
    Fixed(usize),
}

impl ShardCount {
    pub fn resolve(
        &self,
        num_vertices: u64,
        num_edges: u64,
        max_edges_per_window: u64,
    ) -> ShardPropResult<usize> {
        if num_vertices == 0 {
            return Err(ShardPropError::GraphSource(
                "graph has no vertices; cannot resolve shards".to_string(),
            ));
        }
        let shards = match *self {
            ShardCount::Fixed(0) => {
                return Err(ShardPropError::InvalidArgument(
                    "shard count must be positive".to_string(),
                ))
            }
            ShardCount::Fixed(n) => n as u64,
            ShardCount::Auto => {
                if max_edges_per_window == 0 {
                    return Err(ShardPropError::InvalidArgument(
                        "max_edges_per_window must be positive".to_string(),
                    ));
                }
                num_edges.div_ceil(max_edges_per_window).max(1)
            }
        };
        Ok(shards.min(num_vertices) as usize)
    }
}

impl FromStr for ShardCount {
    type Err = ShardPropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(ShardCount::Auto);
        }
        s.parse::<usize>()
            .map(ShardCount::Fixed)
            .map_err(|e| ShardPropError::InvalidArgument(format!("nshards {s:?}: {e}")))
    }
}

impl fmt::Display for ShardCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardCount::Auto => f.write_str("auto"),
            ShardCount::Fixed(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub graph: String,
    pub iterations: u64,
    pub selective_scheduling: bool,
    pub shards: ShardCount,
    pub max_edges_per_window: u64,
    /// Loads window k+1 while window k computes, ahead of its `before_exec_interval` hook.
    pub prefetch: bool,
    pub parallel: bool,
    pub threads: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            graph: String::new(),
            iterations: DEFAULT_ITERATIONS,
            selective_scheduling: false,
            shards: ShardCount::Auto,
            max_edges_per_window: DEFAULT_MAX_EDGES_PER_WINDOW,
            prefetch: true,
            parallel: true,
            threads: None,
        }
    }
}

impl RunConfig {
    pub fn from_configuration(config: &Configuration) -> ShardPropResult<Self> {
        let defaults = Self::default();
        let threads = match config.get("execthreads") {
            None => None,
            Some(_) => Some(config.get_parsed::<usize>("execthreads", 0)?),
        };
        let run = Self {
            graph: config.get_string("file", ""),
            iterations: config.get_parsed("niters", defaults.iterations)?,
            selective_scheduling: config.get_bool("scheduler", defaults.selective_scheduling)?,
            shards: config.get_string("nshards", "auto").parse()?,
            max_edges_per_window: config
                .get_parsed("max_edges_per_window", defaults.max_edges_per_window)?,
            prefetch: config.get_bool("prefetch", defaults.prefetch)?,
            parallel: config.get_bool("parallel", defaults.parallel)?,
            threads,
        };
        run.validate()?;
        Ok(run)
    }

    pub fn validate(&self) -> ShardPropResult<()> {
        if self.threads == Some(0) {
            return Err(ShardPropError::InvalidArgument(
                "execthreads must be positive".to_string(),
            ));
        }
        if self.max_edges_per_window == 0 {
            return Err(ShardPropError::InvalidArgument(
                "max_edges_per_window must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
