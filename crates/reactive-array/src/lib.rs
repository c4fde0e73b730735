#![forbid(unsafe_code)]

//! Observable sequences that publish a replayable log of their mutations.
//!
//! A [`ReactiveArray<T>`] behaves like a `Vec<T>` whose every mutation is
//! described by an [`Operation<T>`] and pushed synchronously to any number of
//! subscribers. Consumers apply those operations to their own state instead
//! of diffing snapshots.
//!
//! - [`Operation`]: one mutation with enough payload to replay it.
//! - [`ReactiveArray`]: owns the storage, validates and performs mutations,
//!   broadcasts operations in live or replay mode.
//! - [`Scan`] / [`ObservableCount`]: values folded from the operation stream.
//! - [`ReactiveArray::mirror`]: a derived array kept equal to
//!   `transform(source)` by forwarding mapped operations.
//! - [`Broadcast`] / [`Subscription`]: the per-instance push primitive and
//!   its RAII guard.
//!
//! # Architecture
//!
//! Everything is single-threaded and synchronous (`Rc`/`RefCell`). A
//! mutation call returns only after every subscriber has seen its operation.
//! Subscriber slots are held weakly by the broadcast and strongly by the
//! [`Subscription`] guard, so dropping a guard, a [`Scan`] or a mirror
//! detaches it.
//!
//! # Example
//!
//! ```
//! use reactive_array::{Operation, ReactiveArray};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let source = ReactiveArray::from(vec![1, 2, 3, 4]);
//! let labels = source.mirror(|v| format!("#{v}"));
//! let count = source.observable_count();
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&log);
//! let _sub = source.subscribe(move |op| sink.borrow_mut().push(op.clone()));
//!
//! source.append(5);
//! source.remove_at_index(1);
//!
//! assert_eq!(
//!     *log.borrow(),
//!     vec![Operation::Append(5), Operation::RemoveElement { index: 1 }]
//! );
//! assert_eq!(labels.snapshot(), vec!["#1", "#3", "#4", "#5"]);
//! assert_eq!(count.get(), 4);
//! ```

pub mod array;
pub mod broadcast;
pub mod config;
pub mod error;
mod mirror;
pub mod operation;
pub mod scan;

pub use array::ReactiveArray;
pub use broadcast::{Broadcast, Subscription, SubscriptionId};
pub use config::{DEFAULT_ARRAY_NAME, ReactiveArrayConfig};
pub use error::{ArrayError, Result};
pub use operation::{Operation, OperationKind, replay};
pub use scan::{ObservableCount, Scan, count_reducer};
