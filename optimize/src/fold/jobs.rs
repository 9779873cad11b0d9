//! Fold job execution.
//!
//! The coordinating thread owns the graph. It clones and links a job's
//! subgraph, hands the isolated program to the worker pool, and installs
//! results as they arrive through a parent index built once per round.
//! A job is launched only when every prerequisite has completed, so its
//! clone observes their substitutions.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc;

use smallvec::SmallVec;
use tessera_ir::{Graph, NodeId, Op, ParentIndex, Payload, Program, Provenance};
use tessera_value::{Resource, Value};

use super::candidates::{Candidate, CandidateKind, Discovery};
use super::{FoldContext, FoldReport};
use crate::error::{EvaluationError, ResolutionError, Result};

enum Outcome {
    Evaluated(Result<Value, EvaluationError>),
    Resolved(Result<Value, ResolutionError>),
}

struct Completion {
    job: usize,
    outcome: Outcome,
}

pub(super) fn run(graph: &mut Graph, discovery: Discovery, ctx: &FoldContext<'_>) -> Result<FoldReport> {
    let candidates = discovery.candidates;
    let mut pending: Vec<usize> = candidates.iter().map(|c| c.prerequisites.len()).collect();
    let mut dependents: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); candidates.len()];
    for (index, candidate) in candidates.iter().enumerate() {
        for &prerequisite in &candidate.prerequisites {
            dependents[prerequisite].push(index);
        }
    }
    let parents = graph.parent_index();
    let mut provenance = vec![Provenance::default(); candidates.len()];
    let mut report = FoldReport::default();
    let (tx, rx) = mpsc::channel::<Completion>();

    ctx.pool.in_place_scope(|scope| -> Result<()> {
        let mut ready: Vec<usize> = (0..candidates.len()).filter(|&i| pending[i] == 0).collect();
        let mut in_flight = 0usize;

        loop {
            for job in ready.drain(..) {
                let candidate = &candidates[job];
                let tx = tx.clone();
                match (candidate.kind, ctx.provider) {
                    (CandidateKind::Evaluate { category }, _) => {
                        let (program, sources) = isolate(graph, candidate.root)?;
                        provenance[job] = sources;
                        let evaluator = ctx.evaluator;
                        scope.spawn(move |_| {
                            let result = catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(&program, category)))
                                .unwrap_or_else(|_| Err(EvaluationError::new(category, "evaluator panicked")));
                            let _ = tx.send(Completion { job, outcome: Outcome::Evaluated(result) });
                        });
                    }
                    (CandidateKind::Resolve { id, kind }, Some(provider)) => {
                        provenance[job] = graph.op(candidate.root)?.provenance().cloned().unwrap_or_default();
                        scope.spawn(move |_| {
                            let result = catch_unwind(AssertUnwindSafe(|| provider.resolve(id, kind)))
                                .unwrap_or_else(|_| Err(ResolutionError::new(id, kind, "provider panicked")));
                            let _ = tx.send(Completion { job, outcome: Outcome::Resolved(result) });
                        });
                    }
                    (CandidateKind::Resolve { id, kind }, None) => {
                        let outcome = Outcome::Resolved(Err(ResolutionError::new(id, kind, "no resource provider")));
                        let _ = tx.send(Completion { job, outcome });
                    }
                }
                in_flight += 1;
            }

            if in_flight == 0 {
                break;
            }
            let Ok(Completion { job, outcome }) = rx.recv() else {
                return Err(tessera_ir::Error::InvariantViolation { reason: "fold workers disconnected".into() }.into());
            };
            in_flight -= 1;

            install(graph, &parents, &candidates[job], outcome, &provenance[job], &mut report)?;
            for &dependent in &dependents[job] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.push(dependent);
                }
            }
        }
        Ok(())
    })?;

    Ok(report)
}

/// Clone the subgraph below `root` and link it into a standalone program.
///
/// Also returns the union of the provenance of every constant inside it.
fn isolate(graph: &Graph, root: NodeId) -> Result<(Program, Provenance)> {
    let (mut copy, root) = graph.extract(root)?;
    let provenance = copy
        .iter()
        .filter_map(|(_, node)| node.op().provenance())
        .fold(Provenance::default(), |acc, p| acc.union(p));
    let program = copy.link(root)?;
    Ok((program, provenance))
}

fn constant_op(value: Value, provenance: Provenance) -> Op {
    match value {
        Value::Bool(b) => Op::ConstantBool(b),
        Value::Scalar(s) => Op::ConstantScalar(s),
        Value::Color(c) => Op::ConstantColor(c),
        Value::Image(image) => Op::ConstantImage { image: Payload(Resource::from_arc(image)), provenance },
        Value::Mesh(mesh) => Op::constant_mesh(mesh, provenance),
        Value::Layout(layout) => Op::ConstantLayout { layout: Payload(Resource::from_arc(layout)) },
    }
}

/// Substitute a finished job's value for its candidate root.
fn install(
    graph: &mut Graph,
    parents: &ParentIndex,
    candidate: &Candidate,
    outcome: Outcome,
    provenance: &Provenance,
    report: &mut FoldReport,
) -> Result<()> {
    let root = candidate.root;
    let (value, resolved) = match outcome {
        Outcome::Evaluated(Ok(value)) => (value, false),
        Outcome::Resolved(Ok(value)) => (value, true),
        Outcome::Evaluated(Err(err)) => {
            tracing::warn!(node = %root, error = %err, "evaluation failed, candidate left unfolded");
            report.failures += 1;
            return Ok(());
        }
        Outcome::Resolved(Err(err)) => {
            tracing::warn!(node = %root, error = %err, "reference left unresolved");
            report.failures += 1;
            return Ok(());
        }
    };

    let expected = graph.op(root)?.category();
    if value.category() != expected {
        tracing::warn!(node = %root, %expected, got = %value.category(), "category mismatch, candidate left unfolded");
        report.failures += 1;
        return Ok(());
    }

    let constant = graph.add(constant_op(value, provenance.clone()), [])?;
    graph.replace_leaf(root, constant, parents)?;
    if resolved {
        report.resolved += 1;
    } else {
        report.folded += 1;
    }
    tracing::trace!(node = %root, constant = %constant, resolved, "candidate replaced");
    Ok(())
}
