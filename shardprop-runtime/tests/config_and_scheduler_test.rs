use shardprop_api::scheduler::Scheduler;
use shardprop_api::state::SharedVertexState;
use shardprop_common::config::Configuration;
use shardprop_common::types::VertexInterval;
use shardprop_runtime::algorithms::label_propagation::{LabelPropagationConfig, Weighting};
use shardprop_runtime::plan::run_config::{RunConfig, ShardCount, DEFAULT_ITERATIONS};
use shardprop_runtime::scheduler::always_active::AlwaysActiveScheduler;
use shardprop_runtime::scheduler::selective::SelectiveScheduler;

#[test]
fn test_run_config_defaults() {
    let run = RunConfig::from_configuration(&Configuration::new()).unwrap();
    assert_eq!(run, RunConfig::default());
    assert_eq!(run.iterations, DEFAULT_ITERATIONS);
    assert!(!run.selective_scheduling);
    assert_eq!(run.shards, ShardCount::Auto);
    assert!(run.prefetch);
    assert_eq!(run.threads, None);
}

#[test]
fn test_run_config_from_key_value_options() {
    let config = Configuration::from_pairs([
        "file=/data/graph",
        "niters=12",
        "scheduler=1",
        "nshards=8",
        "prefetch=off",
        "execthreads=3",
        "dimensions=4",
        "weighting=linear",
        "activation_margin=0.1",
    ])
    .unwrap();
    let run = RunConfig::from_configuration(&config).unwrap();
    assert_eq!(run.graph, "/data/graph");
    assert_eq!(run.iterations, 12);
    assert!(run.selective_scheduling);
    assert_eq!(run.shards, ShardCount::Fixed(8));
    assert!(!run.prefetch);
    assert_eq!(run.threads, Some(3));

    let algo = LabelPropagationConfig::from_configuration(&config).unwrap();
    assert_eq!(algo.dimensions, 4);
    assert_eq!(algo.weighting, Weighting::Linear);
    assert_eq!(algo.activation_margin, 0.1);
    assert_eq!(algo.max_confidence, 1.0);
}

#[test]
fn test_bad_options_are_rejected() {
    assert!(Configuration::from_pairs(["niters"]).is_err());
    assert!(Configuration::from_pairs(["=4"]).is_err());

    let config = Configuration::from_pairs(["niters=many"]).unwrap();
    assert!(RunConfig::from_configuration(&config).is_err());
    let config = Configuration::from_pairs(["scheduler=maybe"]).unwrap();
    assert!(RunConfig::from_configuration(&config).is_err());
    let config = Configuration::from_pairs(["nshards=-2"]).unwrap();
    assert!(RunConfig::from_configuration(&config).is_err());
    let config = Configuration::from_pairs(["execthreads=0"]).unwrap();
    assert!(RunConfig::from_configuration(&config).is_err());
    let config = Configuration::from_pairs(["weighting=cubic"]).unwrap();
    assert!(LabelPropagationConfig::from_configuration(&config).is_err());
}

#[test]
fn test_shard_count_resolution() {
    assert_eq!("auto".parse::<ShardCount>().unwrap(), ShardCount::Auto);
    assert_eq!(" 5 ".parse::<ShardCount>().unwrap(), ShardCount::Fixed(5));
    assert_eq!(ShardCount::Fixed(5).to_string(), "5");

    assert_eq!(ShardCount::Auto.resolve(100, 0, 10).unwrap(), 1);
    assert_eq!(ShardCount::Auto.resolve(100, 25, 10).unwrap(), 3);
    assert_eq!(ShardCount::Auto.resolve(2, 1000, 10).unwrap(), 2);
    assert_eq!(ShardCount::Fixed(8).resolve(3, 0, 10).unwrap(), 3);
    assert!(ShardCount::Fixed(0).resolve(3, 0, 10).is_err());
    assert!(ShardCount::Fixed(2).resolve(0, 0, 10).is_err());
}

#[test]
fn test_interval_split_covers_id_space() {
    let intervals = VertexInterval::split(10, 3);
    assert_eq!(
        intervals,
        vec![
            VertexInterval::new(0, 3),
            VertexInterval::new(4, 6),
            VertexInterval::new(7, 9),
        ]
    );
    assert_eq!(intervals.iter().map(|i| i.len()).sum::<u64>(), 10);
    assert_eq!(VertexInterval::split(2, 5).len(), 2);
    assert!(VertexInterval::split(0, 5).is_empty());
    assert!(VertexInterval::new(4, 6).contains(6));
    assert!(!VertexInterval::new(4, 6).contains(7));
}

#[test]
fn test_selective_scheduler_marks_take_effect_after_advance() {
    let mut scheduler = SelectiveScheduler::new(130);
    assert!(scheduler.is_selective());
    assert_eq!(scheduler.active_count(), 130);
    assert!(scheduler.is_active(129));
    assert!(!scheduler.is_active(130));

    scheduler.mark_active(3);
    scheduler.mark_active(128);
    scheduler.mark_active(500);
    assert_eq!(scheduler.pending_count(), 2);
    assert_eq!(scheduler.active_count(), 130);

    scheduler.advance();
    assert_eq!(scheduler.active_count(), 2);
    assert!(scheduler.is_active(3));
    assert!(scheduler.is_active(128));
    assert!(!scheduler.is_active(4));
    assert_eq!(scheduler.pending_count(), 0);

    scheduler.advance();
    assert_eq!(scheduler.active_count(), 0);

    scheduler.mark_active(7);
    scheduler.reset();
    scheduler.advance();
    assert_eq!(scheduler.active_count(), 0);

    scheduler.activate_all();
    assert_eq!(scheduler.active_count(), 130);
}

#[test]
fn test_selective_scheduler_concurrent_marks() {
    let scheduler = SelectiveScheduler::new(1000);
    std::thread::scope(|s| {
        for t in 0..4u64 {
            let scheduler = &scheduler;
            s.spawn(move || {
                for id in (t..1000).step_by(4) {
                    scheduler.mark_active(id);
                }
            });
        }
    });
    assert_eq!(scheduler.pending_count(), 1000);
}

#[test]
fn test_always_active_scheduler() {
    let mut scheduler = AlwaysActiveScheduler::new(4);
    assert!(!scheduler.is_selective());
    scheduler.mark_active(1);
    scheduler.advance();
    assert_eq!(scheduler.active_count(), 4);
    assert!(scheduler.is_active(0));
    assert!(!scheduler.is_active(4));
}

#[test]
fn test_shared_state_commit_is_the_barrier() {
    let mut state = SharedVertexState::new(3, 0u32);
    state.stage(1, 5).unwrap();
    state.stage(2, 6).unwrap();
    assert!(state.stage(3, 7).is_err());
    assert_eq!(state.get(1), Some(&0));
    assert_eq!(state.staged_len(), 2);

    assert_eq!(state.commit(), 2);
    assert_eq!(state.get(1), Some(&5));
    assert_eq!(state.get(2), Some(&6));

    state.stage(0, 9).unwrap();
    state.discard_staged();
    assert_eq!(state.commit(), 0);
    assert_eq!(state.into_values(), vec![0, 5, 6]);
}
