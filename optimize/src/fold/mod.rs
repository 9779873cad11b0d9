//! Constant-folding scheduler.
//!
//! Folding replaces a parameter-free subgraph by a single constant node
//! holding its value. It runs in four phases:
//!
//! 1. **Discovery**: one bottom-up sweep computes, per node, whether its
//!    subgraph is fully constant and whether a blocking op sits below it.
//!    These flags are cached on the node for the current graph generation.
//!    A node is a candidate when its subgraph is constant, nothing below
//!    blocks, it is not already a constant and its category is foldable.
//! 2. **Dependencies**: a candidate that contains other candidates depends
//!    on the nearest ones below it, so its clone is taken only after their
//!    results have been substituted.
//! 3. **References**: during [`OptimizationPass::ReferenceResolution`],
//!    external references are resolved through the provider instead of
//!    being evaluated.
//! 4. **Execution**: ready jobs are cloned and linked on the coordinating
//!    thread, evaluated on the worker pool, and their results substituted
//!    back by the coordinator alone. Independent jobs run in parallel.
//!
//! Evaluation and resolution failures are logged and leave the candidate
//! untouched; a later iteration may retry.
//!
//! [`OptimizationPass::ReferenceResolution`]: crate::passes::OptimizationPass::ReferenceResolution

mod candidates;
mod jobs;

use rayon::ThreadPool;
use tessera_ir::Graph;

use crate::collab::{Evaluator, ResourceProvider};
use crate::config::OptimizerConfig;
use crate::error::Result;
use crate::passes::OptimizationPass;

pub use candidates::{Candidate, CandidateKind, Discovery, discover};

/// Everything a folding round needs besides the graph.
pub struct FoldContext<'a> {
    pub pass: OptimizationPass,
    pub config: &'a OptimizerConfig,
    pub evaluator: &'a dyn Evaluator,
    /// Only consulted during the reference-resolution pass.
    pub provider: Option<&'a dyn ResourceProvider>,
    pub pool: &'a ThreadPool,
}

impl FoldContext<'_> {
    /// Whether references count as constants in this round.
    pub fn resolves_references(&self) -> bool {
        self.pass == OptimizationPass::ReferenceResolution && self.config.resolve_references && self.provider.is_some()
    }
}

/// Outcome of one folding round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldReport {
    /// Candidates replaced by an evaluated constant.
    pub folded: usize,
    /// References replaced by a resolved constant.
    pub resolved: usize,
    /// Evaluations or resolutions that failed and were skipped.
    pub failures: usize,
}

impl FoldReport {
    pub fn changed(&self) -> bool {
        self.folded + self.resolved > 0
    }
}

/// Fold every candidate subgraph reachable from the roots.
#[tracing::instrument(skip_all, fields(pass = %ctx.pass))]
pub fn fold_constants(graph: &mut Graph, ctx: &FoldContext<'_>) -> Result<FoldReport> {
    let discovery = discover(graph, ctx)?;
    if discovery.candidates.is_empty() {
        tracing::debug!("no fold candidates");
        return Ok(FoldReport::default());
    }
    tracing::debug!(candidates = discovery.candidates.len(), "fold candidates discovered");

    let report = jobs::run(graph, discovery, ctx)?;
    tracing::debug!(folded = report.folded, resolved = report.resolved, failures = report.failures, "folding done");
    Ok(report)
}
