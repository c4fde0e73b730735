#![forbid(unsafe_code)]

//! Operation recorders.
//!
//! An [`OperationRecorder`] subscribes to an array and keeps every operation
//! it receives. The log can be replayed into a fresh `Vec`, exported as JSONL
//! (one operation per line) and fingerprinted, so two runs of the same
//! script can be compared by checksum alone.

use std::cell::RefCell;
use std::rc::Rc;

use reactive_array::{Operation, ReactiveArray, Subscription, replay};
use serde::Serialize;

/// Subscriber that appends every delivered operation to an in-memory log.
///
/// Recording stops when the recorder is dropped.
pub struct OperationRecorder<T> {
    log: Rc<RefCell<Vec<Operation<T>>>>,
    subscription: Subscription,
}

impl<T: Clone + 'static> OperationRecorder<T> {
    /// Record operations from now on.
    pub fn live(array: &ReactiveArray<T>) -> Self {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let subscription = array.subscribe(move |op| sink.borrow_mut().push(op.clone()));
        Self { log, subscription }
    }

    /// Record an `Initiate` with the current contents, then every later
    /// operation. The log alone is enough to rebuild the array.
    pub fn replay(array: &ReactiveArray<T>) -> Self {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let subscription = array.subscribe_replay(move |op| sink.borrow_mut().push(op.clone()));
        Self { log, subscription }
    }

    /// Copy of the recorded operations.
    pub fn ops(&self) -> Vec<Operation<T>> {
        self.log.borrow().clone()
    }

    /// Drain the log, keeping the subscription.
    pub fn take(&self) -> Vec<Operation<T>> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    /// Fold the log into a fresh vector.
    pub fn rebuild(&self) -> reactive_array::Result<Vec<T>> {
        replay(self.log.borrow().iter())
    }
}

impl<T> OperationRecorder<T> {
    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.borrow().is_empty()
    }

    /// Whether the recorder is still attached to its array.
    pub fn is_recording(&self) -> bool {
        self.subscription.is_active()
    }
}

impl<T: Serialize> OperationRecorder<T> {
    /// Serialize the log as JSONL.
    pub fn to_jsonl(&self) -> serde_json::Result<String> {
        operations_to_jsonl(&self.log.borrow())
    }

    /// BLAKE3 hex digest of [`to_jsonl`](Self::to_jsonl).
    pub fn checksum(&self) -> serde_json::Result<String> {
        Ok(checksum_jsonl(&self.to_jsonl()?))
    }
}

impl<T> std::fmt::Debug for OperationRecorder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRecorder")
            .field("len", &self.len())
            .field("subscription", &self.subscription)
            .finish()
    }
}

/// One JSON object per operation, newline separated, no trailing newline.
pub fn operations_to_jsonl<T: Serialize>(ops: &[Operation<T>]) -> serde_json::Result<String> {
    let mut out = String::new();
    for op in ops {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&serde_json::to_string(op)?);
    }
    Ok(out)
}

/// Parse a JSONL log produced by [`operations_to_jsonl`]. Blank lines are
/// skipped.
pub fn operations_from_jsonl<T>(jsonl: &str) -> serde_json::Result<Vec<Operation<T>>>
where
    T: serde::de::DeserializeOwned,
{
    jsonl
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str)
        .collect()
}

pub fn checksum_jsonl(jsonl: &str) -> String {
    blake3::hash(jsonl.as_bytes()).to_hex().to_string()
}
