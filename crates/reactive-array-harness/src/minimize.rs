#![forbid(unsafe_code)]

//! Delta debugging for mutation scripts.
//!
//! Given a script and a predicate that holds while the failure reproduces,
//! [`minimize_script`] removes chunks of the script until no single call can
//! be dropped without losing the failure.
//!
//! # Algorithm
//!
//! 1. Split the script into `n` chunks (starting at 2).
//! 2. Try dropping each chunk. If the failure survives, keep the reduction
//!    and restart at `n = 2`.
//! 3. Otherwise try keeping each chunk alone.
//! 4. Otherwise double `n` until chunks are single calls.
//!
//! Every attempt is logged so the reduction can be audited as JSONL.

use std::cell::{Cell, RefCell};
use std::fmt;

use serde::Serialize;

/// One reduction attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReductionStep {
    pub step: usize,
    pub phase: ReductionPhase,
    pub len_before: usize,
    /// Script length after the attempt; equal to `len_before` when rejected.
    pub len_after: usize,
    /// Whether the failure still reproduced.
    pub accepted: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionPhase {
    /// Dropping one chunk.
    ChunkRemoval,
    /// Keeping only one chunk.
    ChunkRetention,
}

impl fmt::Display for ReductionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChunkRemoval => write!(f, "chunk_removal"),
            Self::ChunkRetention => write!(f, "chunk_retention"),
        }
    }
}

/// Minimized script plus its audit trail.
#[derive(Clone, Debug)]
pub struct MinimizationResult<M> {
    pub minimized: Vec<M>,
    pub steps: Vec<ReductionStep>,
    /// Total predicate evaluations, including the initial check.
    pub predicate_calls: usize,
}

impl<M> MinimizationResult<M> {
    /// Reduction log, one JSON object per line.
    pub fn steps_to_jsonl(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for step in &self.steps {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&serde_json::to_string(step)?);
        }
        Ok(out)
    }

    pub fn accepted_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.accepted).count()
    }
}

/// Shrink `script` while `predicate` keeps returning `true`.
///
/// # Panics
///
/// Panics if `predicate` does not hold on the original script.
pub fn minimize_script<M, F>(script: Vec<M>, predicate: F) -> MinimizationResult<M>
where
    M: Clone,
    F: Fn(&[M]) -> bool,
{
    let calls = Cell::new(0usize);
    let counted = |candidate: &[M]| -> bool {
        calls.set(calls.get() + 1);
        predicate(candidate)
    };

    assert!(
        counted(&script[..]),
        "predicate must hold on the original script"
    );

    let log = RefCell::new(Vec::new());
    let original_len = script.len();
    let minimized = ddmin(script, &counted, &log);

    tracing::debug!(
        message = "harness.minimize.done",
        original_len,
        minimized_len = minimized.len(),
        predicate_calls = calls.get()
    );

    MinimizationResult {
        minimized,
        steps: log.into_inner(),
        predicate_calls: calls.get(),
    }
}

fn ddmin<M, F>(mut input: Vec<M>, predicate: &F, log: &RefCell<Vec<ReductionStep>>) -> Vec<M>
where
    M: Clone,
    F: Fn(&[M]) -> bool,
{
    let mut n = 2usize;

    loop {
        let len = input.len();
        if len == 0 {
            break;
        }

        let chunk_size = len.div_ceil(n);
        let chunks: Vec<(usize, usize)> = (0..n)
            .map(|i| (i * chunk_size, ((i + 1) * chunk_size).min(len)))
            .filter(|(start, _)| *start < len)
            .collect();

        let mut reduced = None;

        for &(start, end) in &chunks {
            let candidate: Vec<M> = input[..start]
                .iter()
                .chain(&input[end..])
                .cloned()
                .collect();
            if record(log, ReductionPhase::ChunkRemoval, len, &candidate, predicate) {
                reduced = Some(candidate);
                break;
            }
        }

        if reduced.is_none() && chunks.len() > 1 {
            for &(start, end) in &chunks {
                let candidate = input[start..end].to_vec();
                if record(log, ReductionPhase::ChunkRetention, len, &candidate, predicate) {
                    reduced = Some(candidate);
                    break;
                }
            }
        }

        match reduced {
            Some(candidate) => {
                input = candidate;
                n = 2;
            }
            None if n >= len => break,
            None => n = (n * 2).min(len),
        }
    }

    input
}

fn record<M, F>(
    log: &RefCell<Vec<ReductionStep>>,
    phase: ReductionPhase,
    len_before: usize,
    candidate: &[M],
    predicate: &F,
) -> bool
where
    F: Fn(&[M]) -> bool,
{
    let accepted = predicate(candidate);
    let mut log = log.borrow_mut();
    let step = log.len();
    log.push(ReductionStep {
        step,
        phase,
        len_before,
        len_after: if accepted { candidate.len() } else { len_before },
        accepted,
    });
    accepted
}
