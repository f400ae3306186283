use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use shardprop_common::error::{ShardPropError, ShardPropResult};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn init_prometheus() -> ShardPropResult<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ShardPropError::Internal(format!("prometheus init: {e}")))
}
