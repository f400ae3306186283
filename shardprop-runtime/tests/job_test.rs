use shardprop_runtime::job::{ingest_csv, run_job};
use shardprop_runtime::plan::job_spec::{AlgorithmSpec, JobSpec};
use shardprop_runtime::report::RunReport;
use std::fs;

#[test]
fn test_submit_job_from_json() {
    let dir = tempfile::tempdir().unwrap();
    let edges = dir.path().join("edges.csv");
    let seeds = dir.path().join("seeds.csv");
    let states = dir.path().join("states.csv");
    let report = dir.path().join("report.json");
    let store = dir.path().join("store");
    fs::write(&edges, "0,1,0.8\n1,2,0.5\n2,0\n").unwrap();
    fs::write(&seeds, "0,1.0,1,0\n").unwrap();

    let json = serde_json::json!({
        "job_id": "job_1",
        "name": "label-propagation",
        "graph": {
            "store_dir": store.to_str().unwrap(),
            "edges": { "Csv": { "path": edges.to_str().unwrap() } },
            "seeds": { "Csv": { "path": seeds.to_str().unwrap() } }
        },
        "run": { "iterations": 10, "selective_scheduling": true, "shards": { "fixed": 2 } },
        "algorithm": { "LabelPropagation": { "dimensions": 2 } },
        "output": {
            "states_csv": states.to_str().unwrap(),
            "report_json": report.to_str().unwrap()
        }
    });
    let spec_path = dir.path().join("job.json");
    fs::write(&spec_path, serde_json::to_string_pretty(&json).unwrap()).unwrap();

    let spec = JobSpec::read_json(&spec_path).unwrap();
    let AlgorithmSpec::LabelPropagation(config) = &spec.algorithm;
    assert_eq!(config.dimensions, 2);
    // unspecified run options keep their defaults
    assert!(spec.run.prefetch);
    assert_eq!(spec.run.threads, None);

    let outcome = run_job(&spec).unwrap();
    assert!(outcome.report.converged);
    assert_eq!(outcome.report.iterations_executed, 4);
    assert_eq!(outcome.report.num_vertices, 3);
    assert_eq!(outcome.report.num_shards, 2);
    assert_eq!(outcome.report.graph, store.to_str().unwrap());

    let written = fs::read_to_string(&states).unwrap();
    let rows: Vec<Vec<&str>> = written.lines().map(|l| l.split(',').collect()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][..2], ["0", "1"]);
    assert_eq!(rows[2][3..], ["1", "0"]);

    let parsed: RunReport = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(parsed.iterations_executed, outcome.report.iterations_executed);
    assert_eq!(parsed.iterations.len(), 4);
    assert_eq!(parsed.graph, outcome.report.graph);
}

#[test]
fn test_ingest_sizes_store_from_largest_id() {
    let dir = tempfile::tempdir().unwrap();
    let edges = dir.path().join("edges.csv");
    fs::write(&edges, "0,9\n9,4\n").unwrap();

    let summary = ingest_csv(dir.path().join("store"), &edges, None, None, 2).unwrap();
    assert_eq!(summary.num_vertices, 10);
    assert_eq!(summary.edges_read, 2);
    assert_eq!(summary.seeds_read, 0);

    let err = ingest_csv(dir.path().join("small"), &edges, None, Some(5), 2).unwrap_err();
    assert!(err.to_string().contains("out of range"));
}

#[test]
fn test_job_with_missing_store_fails() {
    let dir = tempfile::tempdir().unwrap();
    let json = serde_json::json!({
        "job_id": "job_2",
        "name": "missing",
        "graph": { "store_dir": dir.path().join("nope").to_str().unwrap() },
        "algorithm": { "LabelPropagation": {} }
    });
    let spec: JobSpec = serde_json::from_value(json).unwrap();
    assert!(run_job(&spec).is_err());
}
