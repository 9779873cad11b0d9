//! Local rewrite passes driven by the optimizer loop.
//!
//! Each pass is a single bottom-up sweep built on
//! [`tessera_ir::rewrite_bottom_up`] and reports whether it changed the
//! graph. The driver owns them as a [`PassSet`], so tests can swap in their
//! own implementations.

pub mod logic;
pub mod mesh_format;
pub mod semantic;
pub mod sink;
pub mod size;

use tessera_ir::Graph;

use crate::config::OptimizerConfig;
use crate::error::Result;

pub use logic::LogicPass;
pub use semantic::SemanticPass;
pub use sink::SinkPass;
pub use size::SizePass;

/// Optimization pass id. The main loop runs once per id, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum OptimizationPass {
    /// External references are opaque; nothing above them folds.
    Initial,
    /// External references are resolved through the provider and fold like constants.
    ReferenceResolution,
}

/// What a pass may know about the run it is part of.
#[derive(Debug, Clone, Copy)]
pub struct PassContext<'a> {
    pub pass: OptimizationPass,
    pub config: &'a OptimizerConfig,
}

pub trait Pass: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run one sweep. Returns whether the graph changed.
    fn run(&self, graph: &mut Graph, ctx: &PassContext<'_>) -> Result<bool>;
}

/// The replaceable local passes of the main loop.
pub struct PassSet {
    pub semantic: Box<dyn Pass>,
    pub sink: Box<dyn Pass>,
    pub size: Box<dyn Pass>,
    pub logic: Box<dyn Pass>,
}

impl Default for PassSet {
    fn default() -> Self {
        Self {
            semantic: Box::new(SemanticPass),
            sink: Box::new(SinkPass),
            size: Box::new(SizePass),
            logic: Box::new(LogicPass),
        }
    }
}

impl std::fmt::Debug for PassSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassSet")
            .field("semantic", &self.semantic.name())
            .field("sink", &self.sink.name())
            .field("size", &self.size.name())
            .field("logic", &self.logic.name())
            .finish()
    }
}
