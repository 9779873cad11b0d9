use snafu::Snafu;
use tessera_ir::ReferenceKind;
use tessera_value::Category;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fatal optimizer failure. The graph must not be used after one of these.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A pass broke a graph invariant (cycle, dangling id, ...).
    #[snafu(display("graph invariant violated: {source}"))]
    InvariantViolation { source: tessera_ir::Error },

    #[snafu(display("failed to build fold worker pool: {source}"))]
    ThreadPool { source: rayon::ThreadPoolBuildError },
}

impl From<tessera_ir::Error> for Error {
    fn from(source: tessera_ir::Error) -> Self {
        Self::InvariantViolation { source }
    }
}

/// The evaluator could not produce a value for a fold candidate.
///
/// Recovered locally: the candidate stays unfolded.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(display("evaluation of {category} subgraph failed: {reason}"))]
pub struct EvaluationError {
    pub category: Category,
    pub reason: String,
}

impl EvaluationError {
    pub fn new(category: Category, reason: impl Into<String>) -> Self {
        Self { category, reason: reason.into() }
    }
}

/// An external reference could not be resolved.
///
/// Recovered locally: the reference node stays in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(display("failed to resolve {kind} reference {id}: {reason}"))]
pub struct ResolutionError {
    pub id: u32,
    pub kind: ReferenceKind,
    pub reason: String,
}

impl ResolutionError {
    pub fn new(id: u32, kind: ReferenceKind, reason: impl Into<String>) -> Self {
        Self { id, kind, reason: reason.into() }
    }
}
