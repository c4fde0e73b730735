#![forbid(unsafe_code)]

//! Test harness for `reactive-array`.
//!
//! - [`recorder`]: capture the operation stream of an array, export it as
//!   JSONL and fingerprint it with BLAKE3.
//! - [`script`]: deterministic, seeded mutation scripts plus a plain `Vec`
//!   reference model to check arrays against.
//! - [`minimize`]: delta debugging over failing scripts, with a JSONL audit
//!   trail of every reduction attempt.
//!
//! # Example
//!
//! ```rust
//! use reactive_array::ReactiveArray;
//! use reactive_array_harness::recorder::OperationRecorder;
//! use reactive_array_harness::script::{ScriptConfig, generate_script, run_script};
//!
//! let array = ReactiveArray::from(vec![1, 2, 3]);
//! let recorder = OperationRecorder::replay(&array);
//!
//! let script = generate_script(&ScriptConfig::default().with_seed(7));
//! let model = run_script(&array, &script);
//!
//! assert_eq!(array.snapshot(), model);
//! assert_eq!(recorder.rebuild().unwrap(), model);
//! ```

pub mod minimize;
pub mod recorder;
pub mod script;
