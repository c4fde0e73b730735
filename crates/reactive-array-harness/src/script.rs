#![forbid(unsafe_code)]

//! Seeded mutation scripts and a reference model.
//!
//! A script is a list of [`Mutation`]s: calls against the public array API,
//! not operations. Running a script drives a [`ReactiveArray`] through its
//! fallible `try_*` entry points and a plain `Vec` through
//! [`Mutation::apply_to_model`] side by side. Rejected mutations must leave
//! both untouched.
//!
//! Scripts are generated from a seed with a fixed LCG, so a failing seed is
//! a complete reproduction.

use reactive_array::{ArrayError, ReactiveArray};
use serde::{Deserialize, Serialize};

/// One call against the array API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Mutation<T> {
    Append { value: T },
    AppendContentsOf { values: Vec<T> },
    Insert { value: T, index: usize },
    Replace { value: T, index: usize },
    RemoveAt { index: usize },
    ReplaceAll { values: Vec<T> },
    RemoveAll { keep_capacity: bool },
}

impl<T: Clone> Mutation<T> {
    /// Perform the call. Out-of-range indices come back as errors.
    pub fn apply_to(&self, array: &ReactiveArray<T>) -> Result<(), ArrayError> {
        match self {
            Self::Append { value } => array.append(value.clone()),
            Self::AppendContentsOf { values } => array.append_contents_of(values.clone()),
            Self::Insert { value, index } => array.try_insert(value.clone(), *index)?,
            Self::Replace { value, index } => {
                array.try_replace(value.clone(), *index)?;
            }
            Self::RemoveAt { index } => {
                array.try_remove_at_index(*index)?;
            }
            Self::ReplaceAll { values } => array.replace_all(values.clone()),
            Self::RemoveAll { keep_capacity } => array.remove_all(*keep_capacity),
        }
        Ok(())
    }

    /// Reference semantics on a bare vector. Returns `false` when the call
    /// would be rejected, leaving `model` unchanged.
    pub fn apply_to_model(&self, model: &mut Vec<T>) -> bool {
        match self {
            Self::Append { value } => model.push(value.clone()),
            Self::AppendContentsOf { values } => model.extend(values.iter().cloned()),
            Self::Insert { value, index } => {
                if *index > model.len() {
                    return false;
                }
                model.insert(*index, value.clone());
            }
            Self::Replace { value, index } => match model.get_mut(*index) {
                Some(slot) => *slot = value.clone(),
                None => return false,
            },
            Self::RemoveAt { index } => {
                if *index >= model.len() {
                    return false;
                }
                model.remove(*index);
            }
            Self::ReplaceAll { values } => *model = values.clone(),
            Self::RemoveAll { .. } => model.clear(),
        }
        true
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Append { .. } => "append",
            Self::AppendContentsOf { .. } => "append_contents_of",
            Self::Insert { .. } => "insert",
            Self::Replace { .. } => "replace",
            Self::RemoveAt { .. } => "remove_at",
            Self::ReplaceAll { .. } => "replace_all",
            Self::RemoveAll { .. } => "remove_all",
        }
    }
}

/// Parameters for [`generate_script`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptConfig {
    pub seed: u64,
    /// Number of mutations.
    pub steps: usize,
    /// Length the generator assumes the array starts with.
    pub initial_len: usize,
    /// Percentage (0..=100) of index-bearing calls aimed past the end.
    pub out_of_range_percent: u8,
    /// Upper bound on bulk payload length.
    pub max_batch: usize,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            steps: 64,
            initial_len: 3,
            out_of_range_percent: 10,
            max_batch: 4,
        }
    }
}

impl ScriptConfig {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    #[must_use]
    pub fn with_initial_len(mut self, len: usize) -> Self {
        self.initial_len = len;
        self
    }

    #[must_use]
    pub fn with_out_of_range_percent(mut self, percent: u8) -> Self {
        self.out_of_range_percent = percent.min(100);
        self
    }

    #[must_use]
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }
}

/// Deterministic generator for script data.
#[derive(Debug, Clone)]
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0
    }

    /// Uniform-ish value in `0..bound`. `bound` of zero yields zero.
    pub fn below(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        ((self.next_u64() >> 33) % bound as u64) as usize
    }

    pub fn chance(&mut self, percent: u8) -> bool {
        self.below(100) < usize::from(percent)
    }
}

/// Build a script of `config.steps` mutations over `i32` values.
///
/// The generator runs each call against a shadow model, so in-range indices
/// stay in range for the whole script.
pub fn generate_script(config: &ScriptConfig) -> Vec<Mutation<i32>> {
    let mut rng = Lcg::new(config.seed);
    let mut shadow = vec![0; config.initial_len];
    let mut script = Vec::with_capacity(config.steps);

    for _ in 0..config.steps {
        let len = shadow.len();
        let value = rng.below(1000) as i32;
        let batch = |rng: &mut Lcg| -> Vec<i32> {
            (0..rng.below(config.max_batch + 1))
                .map(|_| rng.below(1000) as i32)
                .collect()
        };
        let wild = rng.chance(config.out_of_range_percent);

        let mutation = match rng.below(10) {
            0 | 1 => Mutation::Append { value },
            2 => Mutation::AppendContentsOf {
                values: batch(&mut rng),
            },
            3 | 4 => {
                let index = if wild {
                    len + 1 + rng.below(4)
                } else {
                    rng.below(len + 1)
                };
                Mutation::Insert { value, index }
            }
            5 | 6 if len > 0 || wild => {
                let index = if wild { len + rng.below(4) } else { rng.below(len) };
                Mutation::Replace { value, index }
            }
            7 | 8 if len > 0 || wild => {
                let index = if wild { len + rng.below(4) } else { rng.below(len) };
                Mutation::RemoveAt { index }
            }
            9 => {
                if rng.chance(50) {
                    Mutation::ReplaceAll {
                        values: batch(&mut rng),
                    }
                } else {
                    Mutation::RemoveAll {
                        keep_capacity: rng.chance(50),
                    }
                }
            }
            _ => Mutation::Append { value },
        };

        mutation.apply_to_model(&mut shadow);

        script.push(mutation);
    }

    script
}

/// Outcome of [`run_script_checked`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptReport {
    pub accepted: usize,
    pub rejected: usize,
    /// First step at which the array and the model disagreed.
    pub divergence: Option<usize>,
}

impl ScriptReport {
    pub fn is_consistent(&self) -> bool {
        self.divergence.is_none()
    }
}

/// Run `script` against `array` and a model seeded from its snapshot,
/// returning the final model. Rejected calls are skipped on both sides.
pub fn run_script<T: Clone>(array: &ReactiveArray<T>, script: &[Mutation<T>]) -> Vec<T> {
    let mut model = array.snapshot();
    let mut rejected = 0usize;
    for mutation in script {
        if mutation.apply_to(array).is_err() {
            rejected += 1;
        }
        mutation.apply_to_model(&mut model);
    }
    tracing::debug!(
        message = "harness.script.run",
        array = %array.name(),
        steps = script.len(),
        rejected
    );
    model
}

/// Like [`run_script`], comparing array and model after every step.
pub fn run_script_checked<T: Clone + PartialEq>(
    array: &ReactiveArray<T>,
    script: &[Mutation<T>],
) -> ScriptReport {
    let mut model = array.snapshot();
    let mut report = ScriptReport::default();

    for (step, mutation) in script.iter().enumerate() {
        let applied = mutation.apply_to(array).is_ok();
        let modelled = mutation.apply_to_model(&mut model);
        if applied {
            report.accepted += 1;
        } else {
            report.rejected += 1;
        }

        let same = applied == modelled && array.with(|items| items == model.as_slice());
        if !same && report.divergence.is_none() {
            tracing::warn!(
                message = "harness.script.divergence",
                array = %array.name(),
                step,
                call = mutation.name()
            );
            report.divergence = Some(step);
        }
    }

    tracing::debug!(
        message = "harness.script.done",
        array = %array.name(),
        accepted = report.accepted,
        rejected = report.rejected
    );
    report
}
