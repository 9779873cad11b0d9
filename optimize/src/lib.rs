//! Fixed-point optimizer for tessera op graphs.
//!
//! [`Optimizer::optimize`] rewrites a [`tessera_ir::Graph`] in place until
//! no pass changes it or the iteration budget runs out. Every rewrite
//! preserves the value each root evaluates to.
//!
//! # Module Organization
//!
//! - [`driver`] - Pass sequencing and the global iteration budget
//! - [`cse`] - Structural deduplication
//! - [`resources`] - Content deduplication of constant payloads
//! - [`skeleton`] - Skeleton unification at mesh merge points
//! - [`fold`] - Parallel constant-folding scheduler
//! - [`passes`] - Local rewrite passes and the mesh format post-pass
//! - [`collab`] - Evaluator, resource provider and remapper interfaces
//! - [`config`] - Typed configuration

pub mod collab;
pub mod config;
pub mod cse;
pub mod driver;
pub mod error;
pub mod fold;
pub mod passes;
pub mod resources;
pub mod skeleton;


pub use collab::{BoneIndexRemapper, Evaluator, ResourceProvider, SkeletonRemapper};
pub use config::{BlockingPolicy, OptimizerConfig};
pub use cse::dedup;
pub use driver::{OptimizeReport, Optimizer};
pub use error::{Error, EvaluationError, ResolutionError, Result};
pub use fold::{FoldContext, FoldReport, fold_constants};
pub use passes::{OptimizationPass, Pass, PassContext, PassSet};
pub use resources::dedup_resources;
pub use skeleton::{UnifyReport, unify_skeletons};
