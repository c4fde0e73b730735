#![forbid(unsafe_code)]

//! Observable values folded from an operation stream.
//!
//! # Design
//!
//! [`Scan<S>`] holds a running state in shared, reference-counted storage
//! and a replay-mode subscription to a source [`ReactiveArray`]. Each
//! operation the source emits is folded into the state with a reducer
//! `(&S, &Operation<T>) -> S`, and the new state is pushed to the scan's own
//! subscribers. The replayed `Initiate` seeds the state, so a scan is
//! consistent with its source from the moment it is built.
//!
//! [`ObservableCount`] is the scan produced by
//! [`ReactiveArray::observable_count`], using [`count_reducer`].
//!
//! # Invariants
//!
//! 1. After any source mutation returns, `get()` equals the reducer folded
//!    over `Initiate(snapshot at build time)` and every later operation.
//! 2. Every source operation produces exactly one state update and one
//!    delivery, even when the state does not change (`Replace` for counts).
//! 3. `version` increments by exactly 1 per folded operation, starting at 1
//!    after the initial `Initiate`.
//!
//! # Failure Modes
//!
//! - **Reducer panics**: the panic propagates to the mutating caller. The
//!   previous state is kept.
//! - **Source dropped**: the subscription becomes inert. The scan retains its
//!   last state and never changes again.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::array::ReactiveArray;
use crate::broadcast::{Broadcast, Subscription};
use crate::operation::Operation;

/// Element count implied by `operation` applied to a store of `count` elements.
#[must_use]
pub fn count_reducer<T>(count: usize, operation: &Operation<T>) -> usize {
    match operation {
        Operation::Initiate(values) | Operation::ReplaceAll(values) => values.len(),
        Operation::Append(_) | Operation::Insert { .. } => count + 1,
        Operation::AppendContentsOf(values) => count + values.len(),
        Operation::Replace { .. } => count,
        Operation::RemoveElement { .. } => count.saturating_sub(1),
        Operation::RemoveAll { .. } => 0,
    }
}

/// Shared interior for [`Scan<S>`].
struct ScanInner<S> {
    /// Latest folded state.
    value: RefCell<S>,
    /// Bumped once per folded operation.
    version: Cell<u64>,
    /// Downstream subscribers of the state.
    broadcast: Broadcast<S>,
}

impl<S: Clone> ScanInner<S> {
    fn store(&self, next: S) {
        *self.value.borrow_mut() = next.clone();
        self.version.set(self.version.get() + 1);
        self.broadcast.emit(&next);
    }
}

/// A read-only observable value derived by folding a [`ReactiveArray`]'s
/// operations.
///
/// Cloning a `Scan` creates a new handle to the **same** state. The source
/// subscription is released when the last handle is dropped.
pub struct Scan<S> {
    inner: Rc<ScanInner<S>>,
    /// Replay-mode subscription to the source array.
    _upstream: Rc<Subscription>,
}

/// Live element count of a [`ReactiveArray`].
pub type ObservableCount = Scan<usize>;

impl<S> Clone for Scan<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            _upstream: Rc::clone(&self._upstream),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Scan<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scan")
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<S: Clone + 'static> Scan<S> {
    /// Fold `source`'s operations into a value, starting from `seed`.
    ///
    /// The reducer first sees `Initiate(source snapshot)`, then every
    /// operation the source emits.
    pub fn follow<T>(
        source: &ReactiveArray<T>,
        seed: S,
        reducer: impl Fn(&S, &Operation<T>) -> S + 'static,
    ) -> Self
    where
        T: Clone + 'static,
    {
        let inner = Rc::new(ScanInner {
            value: RefCell::new(seed),
            version: Cell::new(0),
            broadcast: Broadcast::new(),
        });

        let weak_inner = Rc::downgrade(&inner);
        let upstream = source.subscribe_replay(move |op| {
            if let Some(strong) = weak_inner.upgrade() {
                let next = reducer(&strong.value.borrow(), op);
                strong.store(next);
            }
        });

        Self {
            inner,
            _upstream: Rc::new(upstream),
        }
    }

    /// Current state.
    #[must_use]
    pub fn get(&self) -> S {
        self.inner.value.borrow().clone()
    }

    /// Replay-mode subscription: `observer` gets the current state now, then
    /// one value per source operation.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe(&self, observer: impl Fn(&S) + 'static) -> Subscription {
        let current = self.get();
        observer(&current);
        self.inner.broadcast.subscribe(observer)
    }

    /// Live-mode subscription: only values produced after this call.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe_live(&self, observer: impl Fn(&S) + 'static) -> Subscription {
        self.inner.broadcast.subscribe(observer)
    }
}

impl<S> Scan<S> {
    /// Access the state by reference without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` mutates the source array (re-entrant borrow).
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Number of folded operations, including the initial `Initiate`.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of live subscriptions on this scan.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.broadcast.subscriber_count()
    }
}

impl<T: Clone + 'static> ReactiveArray<T> {
    /// Fold this array's operation stream into an observable value.
    pub fn scan<S: Clone + 'static>(
        &self,
        seed: S,
        reducer: impl Fn(&S, &Operation<T>) -> S + 'static,
    ) -> Scan<S> {
        Scan::follow(self, seed, reducer)
    }

    /// Observable element count, driven by [`count_reducer`].
    #[must_use]
    pub fn observable_count(&self) -> ObservableCount {
        self.scan(0, |count, op| count_reducer(*count, op))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
