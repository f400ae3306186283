use serde::{Deserialize, Serialize};
use shardprop_api::program::{ProgramContext, VertexProgram, VertexUpdateContext};
use shardprop_common::config::Configuration;
use shardprop_common::error::{ShardPropError, ShardPropResult};
use shardprop_common::types::VertexId;
use std::fmt::Debug;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

pub const DEFAULT_DIMENSIONS: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexPhase {
    #[default]
    Uninitialized,
    Seeded,
    Propagating,
    Active,
    Converged,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelState {
    pub pvec: Vec<f32>,
    pub confidence: f32,
    pub seed: bool,
    #[serde(default)]
    pub phase: VertexPhase,
}

impl LabelState {
    pub fn unlabeled(dimensions: usize) -> Self {
        Self {
            pvec: vec![0.0; dimensions],
            confidence: 0.0,
            seed: false,
            phase: VertexPhase::Uninitialized,
        }
    }

    pub fn seed(pvec: Vec<f32>, confidence: f32) -> ShardPropResult<Self> {
        check_confidence(confidence)?;
        check_pvec(&pvec)?;
        Ok(Self {
            pvec,
            confidence,
            seed: true,
            phase: VertexPhase::Uninitialized,
        })
    }

    // only meant for seeds, so it marks the vertex as one
    pub fn set_p(&mut self, index: usize, value: f32) -> ShardPropResult<()> {
        check_probability(value)?;
        let slot = self.pvec.get_mut(index).ok_or_else(|| {
            ShardPropError::InvalidArgument(format!("label index {index} out of range"))
        })?;
        *slot = value;
        self.seed = true;
        Ok(())
    }

    pub fn set_c(&mut self, value: f32) -> ShardPropResult<()> {
        check_confidence(value)?;
        self.confidence = value;
        self.seed = true;
        Ok(())
    }

    pub fn get_p(&self, index: usize) -> Option<f32> {
        self.pvec.get(index).copied()
    }

    pub fn get_c(&self) -> f32 {
        self.confidence
    }

    pub fn label(&self) -> Option<usize> {
        self.pvec
            .iter()
            .enumerate()
            .filter(|(_, p)| **p > 0.0)
            .fold(None, |best: Option<(usize, f32)>, (i, p)| match best {
                Some((_, bp)) if bp >= *p => best,
                _ => Some((i, *p)),
            })
            .map(|(i, _)| i)
    }
}

fn check_confidence(confidence: f32) -> ShardPropResult<()> {
    if !confidence.is_finite() || confidence < 0.0 {
        return Err(ShardPropError::InvalidArgument(format!(
            "confidence must be finite and non-negative, got {confidence}"
        )));
    }
    Ok(())
}

fn check_probability(value: f32) -> ShardPropResult<()> {
    if !value.is_finite() {
        return Err(ShardPropError::InvalidArgument(format!(
            "label probability must be finite, got {value}"
        )));
    }
    Ok(())
}

fn check_pvec(pvec: &[f32]) -> ShardPropResult<()> {
    pvec.iter().try_for_each(|p| check_probability(*p))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelEdge {
    pub weight: f32,
    pub is_active: bool,
}

impl LabelEdge {
    pub fn new(weight: f32) -> ShardPropResult<Self> {
        let edge = Self {
            weight,
            is_active: false,
        };
        edge.validate()?;
        Ok(edge)
    }

    pub fn validate(&self) -> ShardPropResult<()> {
        if self.weight == 0.0 || !self.weight.is_finite() {
            return Err(ShardPropError::PreconditionViolated(format!(
                "edge weight must be non-zero and finite, got {}",
                self.weight
            )));
        }
        Ok(())
    }

    pub fn activated(self) -> Self {
        Self {
            is_active: true,
            ..self
        }
    }
}

/// How much an active in-edge contributes to the weighted average.
///
/// Only the ratios between the weights of one vertex's in-edges matter.
/// `peak_confidence` is the largest confidence among those active neighbors.
pub trait ContributionWeighting: Debug + Send + Sync {
    fn weight(&self, edge_weight: f32, neighbor_confidence: f32, peak_confidence: f32) -> f32;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// `edge_weight * exp(neighbor_confidence)`
    #[default]
    Exponential,
    Linear,
}

impl ContributionWeighting for Weighting {
    fn weight(&self, edge_weight: f32, neighbor_confidence: f32, peak_confidence: f32) -> f32 {
        match self {
            // shifted by the peak so exp stays <= 1; the shift cancels in the average
            Weighting::Exponential => edge_weight * (neighbor_confidence - peak_confidence).exp(),
            Weighting::Linear => edge_weight * neighbor_confidence,
        }
    }
}

impl FromStr for Weighting {
    type Err = ShardPropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exponential" | "exp" => Ok(Weighting::Exponential),
            "linear" => Ok(Weighting::Linear),
            other => Err(ShardPropError::InvalidArgument(format!(
                "unknown weighting {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelPropagationConfig {
    pub dimensions: usize,
    pub max_confidence: f32,
    pub activation_margin: f32,
    pub weighting: Weighting,
}

impl Default for LabelPropagationConfig {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            max_confidence: 1.0,
            activation_margin: 0.0,
            weighting: Weighting::Exponential,
        }
    }
}

impl LabelPropagationConfig {
    pub fn from_configuration(config: &Configuration) -> ShardPropResult<Self> {
        let defaults = Self::default();
        let parsed = Self {
            dimensions: config.get_parsed("dimensions", defaults.dimensions)?,
            max_confidence: config.get_parsed("max_confidence", defaults.max_confidence)?,
            activation_margin: config
                .get_parsed("activation_margin", defaults.activation_margin)?,
            weighting: config.get_parsed("weighting", defaults.weighting)?,
        };
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> ShardPropResult<()> {
        if self.dimensions == 0 {
            return Err(ShardPropError::InvalidArgument(
                "dimensions must be positive".to_string(),
            ));
        }
        if !self.max_confidence.is_finite() || self.max_confidence <= 0.0 {
            return Err(ShardPropError::InvalidArgument(format!(
                "max_confidence must be positive, got {}",
                self.max_confidence
            )));
        }
        if !self.activation_margin.is_finite() || self.activation_margin < 0.0 {
            return Err(ShardPropError::InvalidArgument(format!(
                "activation_margin must be non-negative, got {}",
                self.activation_margin
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationSummary {
    pub iteration: u64,
    pub changed_vertices: u64,
    pub activated_edges: u64,
    pub converged_vertices: u64,
}

#[derive(Debug, Default)]
struct Counters {
    changed: AtomicU64,
    activated: AtomicU64,
    converged: AtomicU64,
}

impl Counters {
    fn reset(&self) {
        self.changed.store(0, Ordering::Relaxed);
        self.activated.store(0, Ordering::Relaxed);
        self.converged.store(0, Ordering::Relaxed);
    }

    fn summary(&self, iteration: u64) -> IterationSummary {
        IterationSummary {
            iteration,
            changed_vertices: self.changed.load(Ordering::Relaxed),
            activated_edges: self.activated.load(Ordering::Relaxed),
            converged_vertices: self.converged.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
pub struct LabelPropagation {
    config: LabelPropagationConfig,
    weighting: Box<dyn ContributionWeighting>,
    counters: Counters,
    history: Vec<IterationSummary>,
}

impl LabelPropagation {
    pub fn new(config: LabelPropagationConfig) -> ShardPropResult<Self> {
        config.validate()?;
        Ok(Self {
            weighting: Box::new(config.weighting),
            config,
            counters: Counters::default(),
            history: Vec::new(),
        })
    }

    pub fn with_weighting(mut self, weighting: impl ContributionWeighting + 'static) -> Self {
        self.weighting = Box::new(weighting);
        self
    }

    pub fn config(&self) -> &LabelPropagationConfig {
        &self.config
    }

    pub fn history(&self) -> &[IterationSummary] {
        &self.history
    }

    fn initialize(&self, ctx: &mut dyn VertexUpdateContext<LabelState, LabelEdge>) -> ShardPropResult<()> {
        let vertex_id = ctx.vertex_id();
        let mut state = match ctx.source_value() {
            Some(value) => {
                if value.pvec.len() != self.config.dimensions {
                    return Err(ShardPropError::PreconditionViolated(format!(
                        "vertex {vertex_id}: pvec has {} entries, expected {}",
                        value.pvec.len(),
                        self.config.dimensions
                    )));
                }
                check_confidence(value.confidence)?;
                check_pvec(&value.pvec).map_err(|e| {
                    ShardPropError::PreconditionViolated(format!("vertex {vertex_id}: {e}"))
                })?;
                value.clone()
            }
            None => LabelState::unlabeled(self.config.dimensions),
        };
        state.phase = if state.seed {
            VertexPhase::Seeded
        } else {
            VertexPhase::Propagating
        };

        for i in 0..ctx.num_in_edges() {
            let edge = ctx.in_edge(i);
            let (src, value) = (edge.src_id, edge.value);
            value
                .validate()
                .map_err(|e| edge_error(e, src, vertex_id))?;
            if value.is_active {
                ctx.set_in_edge_value(
                    i,
                    LabelEdge {
                        is_active: false,
                        ..value
                    },
                );
            }
        }

        ctx.set_vertex_state(state);
        ctx.schedule(vertex_id);
        Ok(())
    }

    fn propagate(&self, ctx: &mut dyn VertexUpdateContext<LabelState, LabelEdge>) -> ShardPropResult<()> {
        let vertex_id = ctx.vertex_id();
        let own = ctx.vertex_state().clone();
        if own.seed || ctx.num_out_edges() == 0 {
            return Ok(());
        }

        let threshold = own.confidence + self.config.activation_margin;
        let num_in = ctx.num_in_edges();
        let mut active = Vec::with_capacity(num_in);
        let mut newly_activated = 0u64;
        for i in 0..num_in {
            let edge = ctx.in_edge(i);
            let (src, value) = (edge.src_id, edge.value);
            value
                .validate()
                .map_err(|e| edge_error(e, src, vertex_id))?;
            let candidate = self.neighbor(ctx, src)?.confidence * value.weight;
            if value.is_active {
                active.push(true);
            } else if candidate > threshold {
                ctx.set_in_edge_value(i, value.activated());
                newly_activated += 1;
                active.push(true);
            } else {
                active.push(false);
            }
        }

        let dimensions = self.config.dimensions;
        let mut sum = vec![0.0f32; dimensions];
        let mut total = 0.0f32;
        let mut confidence_sum = 0.0f32;
        let mut peak = f32::NEG_INFINITY;
        for (i, _) in active.iter().enumerate().filter(|(_, a)| **a) {
            let src = ctx.in_edge(i).src_id;
            peak = peak.max(self.neighbor(ctx, src)?.confidence);
        }
        for (i, _) in active.iter().enumerate().filter(|(_, a)| **a) {
            let edge = ctx.in_edge(i);
            let (src, weight) = (edge.src_id, edge.value.weight);
            let neighbor = self.neighbor(ctx, src)?;
            if neighbor.pvec.len() != dimensions {
                return Err(ShardPropError::PreconditionViolated(format!(
                    "vertex {src}: pvec has {} entries, expected {dimensions}",
                    neighbor.pvec.len()
                )));
            }
            let cw = self.weighting.weight(weight, neighbor.confidence, peak);
            if !cw.is_finite() {
                return Err(ShardPropError::PreconditionViolated(format!(
                    "edge {src}->{vertex_id}: contribution weight {cw} is not finite"
                )));
            }
            total += cw;
            confidence_sum += cw * neighbor.confidence * weight;
            for (acc, p) in sum.iter_mut().zip(&neighbor.pvec) {
                *acc += cw * p;
            }
        }

        let mut next = own.clone();
        let mut changed = newly_activated > 0;
        if total > 0.0 && total.is_finite() {
            let pvec: Vec<f32> = sum.iter().map(|s| s / total).collect();
            let confidence = (confidence_sum / total).clamp(0.0, self.config.max_confidence);
            if pvec != own.pvec || confidence != own.confidence {
                next.pvec = pvec;
                next.confidence = confidence;
                changed = true;
            }
        }

        if changed {
            next.phase = VertexPhase::Active;
            ctx.set_vertex_state(next);
            ctx.schedule(vertex_id);
            let targets = ctx.out_neighbors().to_vec();
            for target in targets {
                ctx.schedule(target);
            }
            self.counters.changed.fetch_add(1, Ordering::Relaxed);
            self.counters
                .activated
                .fetch_add(newly_activated, Ordering::Relaxed);
        } else {
            if own.phase != VertexPhase::Converged {
                next.phase = VertexPhase::Converged;
                ctx.set_vertex_state(next);
            }
            self.counters.converged.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn neighbor<'c>(
        &self,
        ctx: &'c dyn VertexUpdateContext<LabelState, LabelEdge>,
        src: VertexId,
    ) -> ShardPropResult<&'c LabelState> {
        ctx.neighbor_state(src).ok_or_else(|| {
            ShardPropError::GraphSource(format!(
                "edge {src}->{} references an unknown vertex",
                ctx.vertex_id()
            ))
        })
    }
}

fn edge_error(err: ShardPropError, src: VertexId, target: VertexId) -> ShardPropError {
    match err {
        ShardPropError::PreconditionViolated(msg) => {
            ShardPropError::PreconditionViolated(format!("edge {src}->{target}: {msg}"))
        }
        other => other,
    }
}

impl VertexProgram<LabelState, LabelEdge> for LabelPropagation {
    fn name(&self) -> &str {
        "label-propagation"
    }

    fn update(&self, ctx: &mut dyn VertexUpdateContext<LabelState, LabelEdge>) -> ShardPropResult<()> {
        if ctx.iteration() == 0 {
            self.initialize(ctx)
        } else {
            self.propagate(ctx)
        }
    }

    fn before_iteration(
        &mut self,
        _iteration: u64,
        _context: &ProgramContext<'_, LabelState>,
    ) -> ShardPropResult<()> {
        self.counters.reset();
        Ok(())
    }

    fn after_iteration(
        &mut self,
        iteration: u64,
        _context: &ProgramContext<'_, LabelState>,
    ) -> ShardPropResult<()> {
        let summary = self.counters.summary(iteration);
        tracing::info!(
            iteration,
            changed = summary.changed_vertices,
            activated_edges = summary.activated_edges,
            converged = summary.converged_vertices,
            "label propagation iteration finished"
        );
        self.history.push(summary);
        Ok(())
    }
}
