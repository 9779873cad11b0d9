//! Collaborators the optimizer consumes.
//!
//! The optimizer never interprets ops itself. Folding hands a linked
//! [`Program`] to an [`Evaluator`], external references go to a
//! [`ResourceProvider`], and skeleton unification asks a
//! [`SkeletonRemapper`] to rewrite skinning data. Evaluators and providers
//! run on the fold worker pool, hence the `Send + Sync` bounds.

use tessera_ir::{Program, ReferenceKind};
use tessera_value::{Category, Mesh, Skeleton, Value};

use crate::error::{EvaluationError, ResolutionError};

pub trait Evaluator: Send + Sync {
    /// Evaluate a self-contained, parameter-free program to a value of `category`.
    fn evaluate(&self, program: &Program, category: Category) -> Result<Value, EvaluationError>;
}

impl<F> Evaluator for F
where
    F: Fn(&Program, Category) -> Result<Value, EvaluationError> + Send + Sync,
{
    fn evaluate(&self, program: &Program, category: Category) -> Result<Value, EvaluationError> {
        self(program, category)
    }
}

pub trait ResourceProvider: Send + Sync {
    /// Fetch the payload of an externally identified resource.
    fn resolve(&self, id: u32, kind: ReferenceKind) -> Result<Value, ResolutionError>;
}

impl<F> ResourceProvider for F
where
    F: Fn(u32, ReferenceKind) -> Result<Value, ResolutionError> + Send + Sync,
{
    fn resolve(&self, id: u32, kind: ReferenceKind) -> Result<Value, ResolutionError> {
        self(id, kind)
    }
}

pub trait SkeletonRemapper: Send + Sync {
    /// Re-express the skinning data of `mesh` against `target`.
    fn remap_skeleton(&self, mesh: &Mesh, target: &Skeleton) -> tessera_value::Result<Mesh>;
}

/// Remaps influence bone indices by bone identity, see [`Mesh::remap_to`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BoneIndexRemapper;

impl SkeletonRemapper for BoneIndexRemapper {
    fn remap_skeleton(&self, mesh: &Mesh, target: &Skeleton) -> tessera_value::Result<Mesh> {
        mesh.remap_to(target)
    }
}
