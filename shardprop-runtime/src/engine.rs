use crate::plan::run_config::RunConfig;
use crate::report::{IterationStats, RunReport};
use crate::scheduler::always_active::AlwaysActiveScheduler;
use crate::scheduler::selective::SelectiveScheduler;
use crate::window::WindowRunner;
use shardprop_api::graph::GraphSource;
use shardprop_api::program::{ProgramContext, VertexProgram};
use shardprop_api::scheduler::Scheduler;
use shardprop_api::state::SharedVertexState;
use shardprop_common::error::{ShardPropError, ShardPropResult};
use shardprop_common::types::VertexInterval;
use std::time::Instant;

#[derive(Debug)]
pub struct RunOutcome<VV> {
    pub state: SharedVertexState<VV>,
    pub report: RunReport,
}

struct RunPlan {
    num_vertices: u64,
    num_edges: u64,
    intervals: Vec<VertexInterval>,
    iterations: u64,
}

impl RunPlan {
    fn context<'a, VV>(
        &self,
        iteration: u64,
        state: &'a SharedVertexState<VV>,
    ) -> ProgramContext<'a, VV> {
        ProgramContext {
            iteration,
            num_iterations: self.iterations,
            num_vertices: self.num_vertices,
            state,
        }
    }
}

pub struct Engine<S> {
    source: S,
    config: RunConfig,
    runner: WindowRunner,
    pool: Option<rayon::ThreadPool>,
}

impl<S> Engine<S> {
    pub fn new(source: S, config: RunConfig) -> ShardPropResult<Self> {
        config.validate()?;
        let pool = match config.threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("shardprop-exec-{i}"))
                    .build()
                    .map_err(|e| ShardPropError::Internal(format!("thread pool: {e}")))?,
            ),
            None => None,
        };
        Ok(Self {
            runner: WindowRunner::new(config.parallel),
            source,
            config,
            pool,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn intervals<VV, EV>(&self) -> ShardPropResult<Vec<VertexInterval>>
    where
        S: GraphSource<VV, EV>,
    {
        Ok(self.plan::<VV, EV>(0)?.intervals)
    }

    fn plan<VV, EV>(&self, iterations: u64) -> ShardPropResult<RunPlan>
    where
        S: GraphSource<VV, EV>,
    {
        let num_vertices = self.source.num_vertices()?;
        let num_edges = self.source.num_edges()?;
        let shards =
            self.config
                .shards
                .resolve(num_vertices, num_edges, self.config.max_edges_per_window)?;
        Ok(RunPlan {
            num_vertices,
            num_edges,
            intervals: VertexInterval::split(num_vertices, shards),
            iterations,
        })
    }

    /// Runs `iterations` passes, fewer if selective scheduling runs out of work.
    /// Any error aborts the run; the state of the failing iteration is discarded.
    pub fn run<VV, EV, P>(
        &self,
        program: &mut P,
        iterations: u64,
    ) -> ShardPropResult<RunOutcome<VV>>
    where
        S: GraphSource<VV, EV>,
        VV: Clone + Default + Send + Sync,
        EV: Clone + Send + Sync,
        P: VertexProgram<VV, EV>,
    {
        let started = Instant::now();
        let plan = self.plan::<VV, EV>(iterations).inspect_err(|e| {
            tracing::error!(error = %e, "engine start failed");
        })?;
        tracing::info!(
            program = program.name(),
            vertices = plan.num_vertices,
            edges = plan.num_edges,
            shards = plan.intervals.len(),
            iterations,
            selective = self.config.selective_scheduling,
            "engine start"
        );

        let mut state = SharedVertexState::new(plan.num_vertices, VV::default());
        let mut scheduler: Box<dyn Scheduler> = if self.config.selective_scheduling {
            Box::new(SelectiveScheduler::new(plan.num_vertices))
        } else {
            Box::new(AlwaysActiveScheduler::new(plan.num_vertices))
        };
        let mut report = RunReport {
            program: program.name().to_string(),
            graph: self.config.graph.clone(),
            num_vertices: plan.num_vertices,
            num_edges: plan.num_edges,
            num_shards: plan.intervals.len() as u64,
            requested_iterations: iterations,
            selective_scheduling: scheduler.is_selective(),
            ..RunReport::default()
        };

        let mut execute = || {
            self.iterate(
                program,
                &plan,
                &mut state,
                scheduler.as_mut(),
                &mut report,
            )
        };
        let result = match &self.pool {
            Some(pool) => pool.install(execute),
            None => execute(),
        };
        if let Err(e) = result {
            tracing::error!(error = %e, "run aborted");
            return Err(e);
        }

        report.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        report.emit();
        Ok(RunOutcome { state, report })
    }

    fn iterate<VV, EV, P>(
        &self,
        program: &mut P,
        plan: &RunPlan,
        state: &mut SharedVertexState<VV>,
        scheduler: &mut dyn Scheduler,
        report: &mut RunReport,
    ) -> ShardPropResult<()>
    where
        S: GraphSource<VV, EV>,
        VV: Clone + Send + Sync,
        EV: Clone + Send + Sync,
        P: VertexProgram<VV, EV>,
    {
        for iteration in 0..plan.iterations {
            let scheduled = scheduler.active_count();
            if scheduler.is_selective() && scheduled == 0 {
                tracing::info!(iteration, "no scheduled vertices left, stopping");
                report.converged = true;
                break;
            }

            let started = Instant::now();
            let mut stats = IterationStats::new(iteration, scheduled);
            program.before_iteration(iteration, &plan.context(iteration, state))?;

            let mut prefetched = None;
            for (idx, &interval) in plan.intervals.iter().enumerate() {
                program.before_exec_interval(interval, &plan.context(iteration, state))?;
                // a prefetched window was loaded while the previous one computed
                let window = match prefetched.take() {
                    Some(window) => window,
                    None => self.source.load_window(interval)?,
                };

                let next = plan.intervals.get(idx + 1).copied();
                let program_ref: &P = program;
                let window_stats = match next {
                    Some(next) if self.config.prefetch => {
                        let (computed, loaded) = rayon::join(
                            || {
                                self.runner.run(
                                    iteration,
                                    window,
                                    program_ref,
                                    state,
                                    &*scheduler,
                                    &self.source,
                                )
                            },
                            || self.source.load_window(next),
                        );
                        prefetched = Some(loaded?);
                        computed?
                    }
                    _ => self.runner.run(
                        iteration,
                        window,
                        program_ref,
                        state,
                        &*scheduler,
                        &self.source,
                    )?,
                };
                stats.add_window(&window_stats);

                program.after_exec_interval(interval, &plan.context(iteration, state))?;
            }

            state.commit();
            scheduler.advance();
            program.after_iteration(iteration, &plan.context(iteration, state))?;

            stats.duration_ms = started.elapsed().as_secs_f64() * 1000.0;
            metrics::histogram!("shardprop_iteration_duration_ms").record(stats.duration_ms);
            tracing::debug!(
                iteration,
                scheduled,
                updates = stats.vertex_updates,
                writes = stats.state_writes,
                "iteration done"
            );
            report.record_iteration(stats);
        }

        if scheduler.is_selective() && !report.converged && scheduler.active_count() == 0 {
            report.converged = true;
        }
        Ok(())
    }
}
