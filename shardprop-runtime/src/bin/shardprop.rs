use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use shardprop_common::config::Configuration;
use shardprop_runtime::algorithms::label_propagation::LabelPropagationConfig;
use shardprop_runtime::graph::rocksdb_graph::RocksDbGraphSource;
use shardprop_runtime::job::{ingest_csv, run_job, run_label_propagation, write_outputs};
use shardprop_runtime::observability::{init_prometheus, init_tracing};
use shardprop_runtime::plan::job_spec::{JobSpec, OutputSpec};
use shardprop_runtime::plan::run_config::RunConfig;
use std::path::PathBuf;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum WeightingArg {
    Exponential,
    Linear,
}

#[derive(Debug, Parser)]
#[command(name = "shardprop", about = "Out-of-core label propagation over sharded graphs")]
struct Args {
    /// Dump Prometheus-formatted metrics here once the command finishes.
    #[arg(long, global = true)]
    metrics_out: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a shard store from CSV inputs.
    Ingest {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        edges: PathBuf,
        #[arg(long)]
        seeds: Option<PathBuf>,
        #[arg(long)]
        num_vertices: Option<u64>,
        #[arg(long, default_value_t = 20)]
        dimensions: usize,
    },
    /// Run label propagation over an existing shard store.
    Run {
        #[arg(long)]
        store: Option<PathBuf>,
        #[arg(long)]
        iterations: Option<u64>,
        #[arg(long)]
        selective: bool,
        /// A positive number or `auto`.
        #[arg(long)]
        shards: Option<String>,
        #[arg(long)]
        threads: Option<usize>,
        #[arg(long)]
        no_prefetch: bool,
        #[arg(long)]
        dimensions: Option<usize>,
        #[arg(long)]
        weighting: Option<WeightingArg>,
        /// Extra `key=value` options, e.g. `--opt niters=10 --opt scheduler=1`.
        #[arg(long = "opt", value_name = "KEY=VALUE")]
        opts: Vec<String>,
        #[arg(long)]
        states_out: Option<PathBuf>,
        #[arg(long)]
        report_out: Option<PathBuf>,
    },
    /// Run a job described by a JSON job spec.
    Submit {
        #[arg(long)]
        job: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let metrics = match &args.metrics_out {
        Some(_) => Some(init_prometheus()?),
        None => None,
    };

    match args.cmd {
        Command::Ingest {
            store,
            edges,
            seeds,
            num_vertices,
            dimensions,
        } => {
            let summary = ingest_csv(&store, &edges, seeds.as_deref(), num_vertices, dimensions)
                .with_context(|| format!("ingest into {}", store.display()))?;
            println!(
                "ingested {} edges and {} seeds into {} ({} vertices)",
                summary.edges_read,
                summary.seeds_read,
                store.display(),
                summary.num_vertices
            );
        }
        Command::Run {
            store,
            iterations,
            selective,
            shards,
            threads,
            no_prefetch,
            dimensions,
            weighting,
            opts,
            states_out,
            report_out,
        } => {
            let mut config = Configuration::from_pairs(&opts)?;
            if let Some(store) = &store {
                config.put("file", store.to_string_lossy());
            }
            if let Some(n) = iterations {
                config.put("niters", n.to_string());
            }
            if selective {
                config.put("scheduler", "1");
            }
            if let Some(shards) = shards {
                config.put("nshards", shards);
            }
            if let Some(n) = threads {
                config.put("execthreads", n.to_string());
            }
            if no_prefetch {
                config.put("prefetch", "0");
            }
            if let Some(d) = dimensions {
                config.put("dimensions", d.to_string());
            }
            if let Some(w) = weighting {
                let name = match w {
                    WeightingArg::Exponential => "exponential",
                    WeightingArg::Linear => "linear",
                };
                config.put("weighting", name);
            }

            let run = RunConfig::from_configuration(&config)?;
            if run.graph.is_empty() {
                anyhow::bail!("no shard store given; pass --store or --opt file=<dir>");
            }
            let algorithm = LabelPropagationConfig::from_configuration(&config)?;
            let source = RocksDbGraphSource::open_existing(&run.graph)?;
            let outcome = run_label_propagation(source, run, algorithm)?;
            write_outputs(
                &OutputSpec {
                    states_csv: states_out.map(|p| p.to_string_lossy().into_owned()),
                    report_json: report_out.map(|p| p.to_string_lossy().into_owned()),
                },
                &outcome,
            )?;
            println!("{}", outcome.report.to_json_pretty()?);
        }
        Command::Submit { job } => {
            let spec = JobSpec::read_json(&job)?;
            let outcome = run_job(&spec).with_context(|| format!("job {}", spec.job_id))?;
            println!("{}", outcome.report.to_json_pretty()?);
        }
    }

    if let (Some(path), Some(handle)) = (&args.metrics_out, metrics) {
        std::fs::write(path, handle.render())
            .with_context(|| format!("write metrics to {}", path.display()))?;
    }
    Ok(())
}
