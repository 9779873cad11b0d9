//! Optimizer driver.
//!
//! One call to [`Optimizer::optimize`] runs:
//!
//! 1. resource dedup and structural dedup over the authored graph;
//! 2. skeleton unification (optional), followed by resource dedup;
//! 3. the size pass alone until it converges;
//! 4. the main loop, once per [`OptimizationPass`]: local passes until
//!    they converge, then structural dedup, resource dedup, constant
//!    folding and logic simplification, repeated while anything changes;
//! 5. mesh format classification and garbage collection.
//!
//! A single iteration budget is shared by every loop. Each local-pass round
//! consumes one unit; once it is spent, every loop stops regardless of
//! convergence.

use std::sync::Arc;

use bon::bon;
use rayon::{ThreadPool, ThreadPoolBuilder};
use snafu::ResultExt;
use tessera_ir::Graph;

use crate::collab::{BoneIndexRemapper, Evaluator, ResourceProvider, SkeletonRemapper};
use crate::config::OptimizerConfig;
use crate::cse;
use crate::error::{Result, ThreadPoolSnafu};
use crate::fold::{FoldContext, fold_constants};
use crate::passes::mesh_format::classify_meshes;
use crate::passes::{OptimizationPass, PassContext, PassSet};
use crate::resources::dedup_resources;
use crate::skeleton::unify_skeletons;

/// What one [`Optimizer::optimize`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeReport {
    /// Budget units consumed by local-pass rounds.
    pub iterations_used: u32,
    /// The budget ran out before every loop converged.
    pub budget_exhausted: bool,
    pub folded: usize,
    pub resolved: usize,
    /// Evaluations and resolutions that failed and were left unfolded.
    pub fold_failures: usize,
    /// Merge points whose meshes were unified onto one skeleton.
    pub unified_merge_points: usize,
    /// Merge points left as authored because a mesh remap was refused.
    pub skipped_merge_points: usize,
    pub remapped_meshes: usize,
    pub classified_meshes: usize,
    /// Nodes reclaimed by the final garbage collection.
    pub collected: usize,
}

/// Iteration budget shared by every loop of one run.
///
/// Running out only counts as exhaustion when a loop still wanted another round.
#[derive(Debug)]
struct Budget {
    left: u32,
    exhausted: bool,
}

impl Budget {
    fn new(units: u32) -> Self {
        Self { left: units, exhausted: false }
    }

    /// Consume one unit. Returns `false` once the budget is spent.
    fn take(&mut self) -> bool {
        match self.left.checked_sub(1) {
            Some(left) => {
                self.left = left;
                true
            }
            None => {
                self.exhausted = true;
                false
            }
        }
    }

    /// Whether a loop with pending changes may start another round.
    fn allows_another_round(&mut self) -> bool {
        if self.left == 0 {
            self.exhausted = true;
        }
        !self.exhausted
    }
}

pub struct Optimizer {
    config: OptimizerConfig,
    evaluator: Option<Arc<dyn Evaluator>>,
    provider: Option<Arc<dyn ResourceProvider>>,
    remapper: Arc<dyn SkeletonRemapper>,
    passes: PassSet,
    pool: ThreadPool,
}

#[bon]
impl Optimizer {
    /// Create an optimizer.
    ///
    /// Without an evaluator, constant folding is skipped. Without a provider,
    /// external references are never resolved.
    #[builder]
    pub fn new(
        #[builder(default)] config: OptimizerConfig,
        evaluator: Option<Arc<dyn Evaluator>>,
        provider: Option<Arc<dyn ResourceProvider>>,
        #[builder(default = Arc::new(BoneIndexRemapper) as Arc<dyn SkeletonRemapper>)]
        remapper: Arc<dyn SkeletonRemapper>,
    ) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("tessera-fold-{i}"))
            .build()
            .context(ThreadPoolSnafu)?;
        Ok(Self { config, evaluator, provider, remapper, passes: PassSet::default(), pool })
    }
}

impl Optimizer {
    /// Replace the local passes of the main loop.
    pub fn with_passes(mut self, passes: PassSet) -> Self {
        self.passes = passes;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Optimize `graph` in place.
    ///
    /// Recoverable problems (failed evaluations or resolutions, an exhausted
    /// budget) only show up in the report; the graph is always left valid.
    #[tracing::instrument(skip_all, fields(roots = graph.roots().len(), budget = self.config.max_iterations))]
    pub fn optimize(&self, graph: &mut Graph) -> Result<OptimizeReport> {
        let mut budget = Budget::new(self.config.max_iterations);
        let mut report = OptimizeReport::default();

        dedup_resources(graph)?;
        cse::dedup(graph)?;

        if self.config.unify_skeletons {
            let unified = unify_skeletons(graph, self.remapper.as_ref())?;
            report.unified_merge_points = unified.merge_points.len();
            report.remapped_meshes = unified.remapped;
            report.skipped_merge_points = unified.skipped.len();
            dedup_resources(graph)?;
        }

        let ctx = PassContext { pass: OptimizationPass::Initial, config: &self.config };
        while budget.take() {
            if !self.passes.size.run(graph, &ctx)? {
                break;
            }
        }
        tracing::debug!(iterations.left = budget.left, "size resolution done");

        for pass in [OptimizationPass::Initial, OptimizationPass::ReferenceResolution] {
            self.full_optimize(graph, pass, &mut budget, &mut report)?;
        }

        report.classified_meshes = classify_meshes(graph)?;
        report.collected = graph.collect_garbage();
        report.iterations_used = self.config.max_iterations - budget.left;
        report.budget_exhausted = budget.exhausted;
        tracing::debug!(
            iterations.used = report.iterations_used,
            budget_exhausted = report.budget_exhausted,
            folded = report.folded,
            nodes = graph.reachable_count(),
            "optimization done"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            for root in graph.roots() {
                tracing::trace!(root = %root.name, tree = %graph.tree(root.node), "optimized root");
            }
        }
        Ok(report)
    }

    #[tracing::instrument(skip_all, fields(pass = %pass))]
    fn full_optimize(
        &self,
        graph: &mut Graph,
        pass: OptimizationPass,
        budget: &mut Budget,
        report: &mut OptimizeReport,
    ) -> Result<()> {
        let ctx = PassContext { pass, config: &self.config };
        loop {
            let mut changed = false;

            while budget.take() {
                let mut local = self.passes.semantic.run(graph, &ctx)?;
                local |= self.passes.sink.run(graph, &ctx)?;
                local |= self.passes.size.run(graph, &ctx)?;
                if !local {
                    break;
                }
                changed = true;
            }

            changed |= cse::dedup(graph)?;
            changed |= dedup_resources(graph)?;
            if self.fold(graph, pass, report)? {
                changed = true;
                dedup_resources(graph)?;
            }
            changed |= self.passes.logic.run(graph, &ctx)?;

            tracing::debug!(changed, iterations.left = budget.left, "main loop iteration");
            if !changed || !budget.allows_another_round() {
                return Ok(());
            }
        }
    }

    fn fold(&self, graph: &mut Graph, pass: OptimizationPass, report: &mut OptimizeReport) -> Result<bool> {
        if !self.config.fold_constants {
            return Ok(false);
        }
        let Some(evaluator) = self.evaluator.as_deref() else {
            tracing::debug!("no evaluator configured, folding skipped");
            return Ok(false);
        };

        let ctx = FoldContext {
            pass,
            config: &self.config,
            evaluator,
            provider: self.provider.as_deref(),
            pool: &self.pool,
        };
        let folded = fold_constants(graph, &ctx)?;
        report.folded += folded.folded;
        report.resolved += folded.resolved;
        report.fold_failures += folded.failures;
        Ok(folded.changed())
    }
}

impl std::fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Optimizer")
            .field("config", &self.config)
            .field("evaluator", &self.evaluator.is_some())
            .field("provider", &self.provider.is_some())
            .field("passes", &self.passes)
            .finish()
    }
}
