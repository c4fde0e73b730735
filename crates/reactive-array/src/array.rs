#![forbid(unsafe_code)]

//! The observable sequence.
//!
//! # Design
//!
//! [`ReactiveArray<T>`] owns a `Vec<T>` and a [`Broadcast`] of
//! [`Operation<T>`]. Every mutation is expressed as an operation first and
//! then committed: the operation is applied to the backing store through
//! [`Operation::apply`] and, once the store borrow is released, pushed to
//! all current subscribers. Mirrors commit forwarded operations through the
//! same path, so a mirror's store evolves exactly like its source's.
//!
//! # Invariants
//!
//! 1. Storage never changes without exactly one matching operation being
//!    broadcast, and nothing is broadcast for a rejected call.
//! 2. Delivery is synchronous: when a top-level mutator returns, every
//!    subscriber has seen its operation and any operation it triggered.
//! 3. A replay-mode subscriber sees `Initiate(snapshot)` before any live
//!    operation.
//!
//! # Failure Modes
//!
//! - **Out-of-range index**: `insert`, `replace`, `remove_at_index`, `get`
//!   and `set` panic with the [`ArrayError`] message. The `try_*` twins return
//!   the error instead. Either way storage is untouched and nothing is
//!   emitted.
//! - **Re-entrant borrow**: calling a mutator from inside [`ReactiveArray::with`]
//!   panics (`RefCell` already borrowed).
//!
//! # Mutating from a callback
//!
//! Allowed. Storage changes immediately, but the operation is queued behind
//! the one being delivered, so every subscriber receives operations in the
//! order storage applied them. A callback reading the array may see state
//! that is ahead of the operation it is handling.

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::broadcast::{Broadcast, Subscription};
use crate::config::ReactiveArrayConfig;
use crate::error::{ArrayError, Result};
use crate::operation::Operation;

/// Shared storage and stream of one array.
///
/// Held strongly by the owning [`ReactiveArray`] and weakly by mirror
/// forwarders.
pub(crate) struct ArrayCore<T> {
    pub(crate) name: Cow<'static, str>,
    items: RefCell<Vec<T>>,
    broadcast: Broadcast<Operation<T>>,
}

impl<T> ArrayCore<T> {
    pub(crate) fn len(&self) -> usize {
        self.items.borrow().len()
    }

    fn reject(&self, err: ArrayError) -> ArrayError {
        tracing::warn!(
            message = "reactive_array.precondition",
            array = %self.name,
            error = %err
        );
        err
    }
}

impl<T: Clone> ArrayCore<T> {
    /// Apply `op` to storage, then broadcast it.
    ///
    /// Returns the element displaced by `Replace`/`RemoveElement`.
    pub(crate) fn commit(&self, op: Operation<T>) -> Result<Option<T>> {
        let (displaced, len) = {
            let mut items = self.items.borrow_mut();
            let displaced = op.apply(&mut items).map_err(|err| self.reject(err))?;
            (displaced, items.len())
        };

        let delivered = self.broadcast.emit(&op);
        tracing::trace!(
            message = "reactive_array.emit",
            array = %self.name,
            op = %op.kind(),
            len,
            delivered
        );
        Ok(displaced)
    }
}

/// An ordered sequence that broadcasts every mutation as an [`Operation`].
///
/// Single-owner: dropping the array tears down its broadcast and, for a
/// mirror, releases the subscription to its source.
pub struct ReactiveArray<T> {
    pub(crate) core: Rc<ArrayCore<T>>,
    /// Forwarding link into a source array. `Some` only for mirrors.
    pub(crate) upstream: Option<Subscription>,
}

impl<T> ReactiveArray<T> {
    /// Empty array with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Vec::new(), ReactiveArrayConfig::default())
    }

    /// Array seeded with `elements`.
    #[must_use]
    pub fn from_vec(elements: Vec<T>) -> Self {
        Self::with_config(elements, ReactiveArrayConfig::default())
    }

    /// Array seeded with `elements`, using `config`.
    #[must_use]
    pub fn with_config(mut elements: Vec<T>, config: ReactiveArrayConfig) -> Self {
        elements.reserve(config.capacity);
        tracing::debug!(
            message = "reactive_array.new",
            array = %config.name,
            len = elements.len()
        );
        Self {
            core: Rc::new(ArrayCore {
                name: config.name,
                items: RefCell::new(elements),
                broadcast: Broadcast::new(),
            }),
            upstream: None,
        }
    }

    /// Tracing label of this array.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Number of elements.
    #[must_use]
    pub fn count(&self) -> usize {
        self.core.len()
    }

    /// Alias for [`count`](Self::count).
    #[must_use]
    pub fn len(&self) -> usize {
        self.count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Always 0.
    #[must_use]
    pub fn start_index(&self) -> usize {
        0
    }

    /// One past the last valid index; equals [`count`](Self::count).
    #[must_use]
    pub fn end_index(&self) -> usize {
        self.count()
    }

    /// Borrow the contents for the duration of `f`.
    ///
    /// # Panics
    ///
    /// Panics if `f` mutates this array.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.core.items.borrow())
    }

    /// Whether this array is forwarding operations from a source.
    #[must_use]
    pub fn is_mirror(&self) -> bool {
        self.upstream.is_some()
    }

    /// Number of live subscriptions on this array's stream.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.core.broadcast.subscriber_count()
    }
}

impl<T: 'static> ReactiveArray<T> {
    /// Live-mode subscription: `observer` receives every operation emitted
    /// after this call.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe(&self, observer: impl Fn(&Operation<T>) + 'static) -> Subscription {
        self.core.broadcast.subscribe(observer)
    }
}

impl<T: Clone + 'static> ReactiveArray<T> {
    /// Replay-mode subscription: `observer` is first handed
    /// `Initiate(snapshot)` synchronously, then every later operation.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe_replay(&self, observer: impl Fn(&Operation<T>) + 'static) -> Subscription {
        observer(&Operation::Initiate(self.snapshot()));
        self.core.broadcast.subscribe(observer)
    }
}

impl<T: Clone> ReactiveArray<T> {
    /// Copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.core.items.borrow().clone()
    }

    #[must_use]
    pub fn first(&self) -> Option<T> {
        self.core.items.borrow().first().cloned()
    }

    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.core.items.borrow().last().cloned()
    }

    /// Element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= count()`.
    #[track_caller]
    #[must_use]
    pub fn get(&self, index: usize) -> T {
        match self.try_get(index) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Checked form of [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// [`ArrayError::IndexOutOfBounds`] if `index >= count()`.
    pub fn try_get(&self, index: usize) -> Result<T> {
        let items = self.core.items.borrow();
        match items.get(index) {
            Some(value) => Ok(value.clone()),
            None => Err(self
                .core
                .reject(ArrayError::out_of_bounds("get", index, items.len()))),
        }
    }

    /// Push `value` at the end. Emits `Append(value)`.
    pub fn append(&self, value: T) {
        self.commit_infallible(Operation::Append(value));
    }

    /// Push `values` at the end, in order. Emits `AppendContentsOf(values)`,
    /// also for an empty input.
    pub fn append_contents_of(&self, values: Vec<T>) {
        self.commit_infallible(Operation::AppendContentsOf(values));
    }

    /// Insert `value` so that it ends up at `index`. Emits `Insert`.
    ///
    /// # Panics
    ///
    /// Panics if `index > count()`.
    #[track_caller]
    pub fn insert(&self, value: T, index: usize) {
        if let Err(err) = self.try_insert(value, index) {
            panic!("{err}");
        }
    }

    /// Checked form of [`insert`](Self::insert).
    ///
    /// # Errors
    ///
    /// [`ArrayError::IndexOutOfBounds`] if `index > count()`.
    pub fn try_insert(&self, value: T, index: usize) -> Result<()> {
        self.core.commit(Operation::Insert { value, index })?;
        Ok(())
    }

    /// Overwrite the element at `index`, returning the previous one.
    /// Emits `Replace`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= count()`.
    #[track_caller]
    pub fn replace(&self, value: T, index: usize) -> T {
        match self.try_replace(value, index) {
            Ok(previous) => previous,
            Err(err) => panic!("{err}"),
        }
    }

    /// Checked form of [`replace`](Self::replace).
    ///
    /// # Errors
    ///
    /// [`ArrayError::IndexOutOfBounds`] if `index >= count()`.
    pub fn try_replace(&self, value: T, index: usize) -> Result<T> {
        match self.core.commit(Operation::Replace { value, index })? {
            Some(previous) => Ok(previous),
            None => unreachable!("replace always displaces an element"),
        }
    }

    /// Indexed assignment; same as [`replace`](Self::replace) without the
    /// return value.
    ///
    /// # Panics
    ///
    /// Panics if `index >= count()`.
    #[track_caller]
    pub fn set(&self, index: usize, value: T) {
        self.replace(value, index);
    }

    /// Checked form of [`set`](Self::set).
    ///
    /// # Errors
    ///
    /// [`ArrayError::IndexOutOfBounds`] if `index >= count()`.
    pub fn try_set(&self, index: usize, value: T) -> Result<()> {
        self.try_replace(value, index).map(drop)
    }

    /// Remove and return the element at `index`. Emits `RemoveElement`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= count()`.
    #[track_caller]
    pub fn remove_at_index(&self, index: usize) -> T {
        match self.try_remove_at_index(index) {
            Ok(removed) => removed,
            Err(err) => panic!("{err}"),
        }
    }

    /// Checked form of [`remove_at_index`](Self::remove_at_index).
    ///
    /// # Errors
    ///
    /// [`ArrayError::IndexOutOfBounds`] if `index >= count()`.
    pub fn try_remove_at_index(&self, index: usize) -> Result<T> {
        match self.core.commit(Operation::RemoveElement { index })? {
            Some(removed) => Ok(removed),
            None => unreachable!("remove always displaces an element"),
        }
    }

    /// Discard the contents and store `values`. Emits `ReplaceAll(values)`.
    pub fn replace_all(&self, values: Vec<T>) {
        self.commit_infallible(Operation::ReplaceAll(values));
    }

    /// Empty the array. Emits `RemoveAll(keep_capacity)`.
    ///
    /// With `keep_capacity` the backing allocation is kept for reuse.
    pub fn remove_all(&self, keep_capacity: bool) {
        self.commit_infallible(Operation::RemoveAll { keep_capacity });
    }

    /// Commit an operation that carries no index.
    fn commit_infallible(&self, op: Operation<T>) {
        debug_assert!(op.index().is_none());
        if let Err(err) = self.core.commit(op) {
            unreachable!("index-free operation rejected: {err}");
        }
    }
}

impl<T> Default for ReactiveArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for ReactiveArray<T> {
    fn from(elements: Vec<T>) -> Self {
        Self::from_vec(elements)
    }
}

impl<T> FromIterator<T> for ReactiveArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

/// Extending emits a single `AppendContentsOf`.
impl<T: Clone> Extend<T> for ReactiveArray<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.append_contents_of(iter.into_iter().collect());
    }
}

impl<T: fmt::Debug> fmt::Debug for ReactiveArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveArray")
            .field("name", &self.core.name)
            .field("items", &*self.core.items.borrow())
            .field("subscribers", &self.core.broadcast.subscriber_count())
            .field("mirror", &self.upstream.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tracing_test::traced_test;

    fn fixture() -> ReactiveArray<i32> {
        ReactiveArray::from(vec![1, 2, 3, 4])
    }

    /// Records every operation delivered through a live subscription.
    fn record<T: Clone + 'static>(
        array: &ReactiveArray<T>,
    ) -> (Rc<RefCell<Vec<Operation<T>>>>, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let sub = array.subscribe(move |op| sink.borrow_mut().push(op.clone()));
        (log, sub)
    }

    #[test]
    fn construction_exposes_snapshot_and_count() {
        let array = fixture();
        assert_eq!(array.snapshot(), vec![1, 2, 3, 4]);
        assert_eq!(array.count(), 4);
        assert_eq!(array.len(), 4);
        assert!(!array.is_empty());
    }

    #[test]
    fn default_is_empty() {
        let array: ReactiveArray<i32> = ReactiveArray::default();
        assert!(array.is_empty());
        assert_eq!(array.first(), None);
        assert_eq!(array.last(), None);
        assert_eq!(array.start_index(), 0);
        assert_eq!(array.end_index(), 0);
    }

    #[test]
    fn append_pushes_and_signals() {
        let array = fixture();
        let (log, _sub) = record(&array);

        array.append(5);

        assert_eq!(array.get(array.count() - 1), 5);
        assert_eq!(array.count(), 5);
        assert_eq!(*log.borrow(), vec![Operation::Append(5)]);
    }

    #[test]
    fn append_contents_of_preserves_order() {
        let array = fixture();
        let (log, _sub) = record(&array);

        array.append_contents_of(vec![5, 6, 7, 8]);

        assert_eq!(array.snapshot(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(
            *log.borrow(),
            vec![Operation::AppendContentsOf(vec![5, 6, 7, 8])]
        );
    }

    #[test]
    fn append_contents_of_empty_still_signals() {
        let array = fixture();
        let (log, _sub) = record(&array);

        array.append_contents_of(Vec::new());

        assert_eq!(array.count(), 4);
        assert_eq!(*log.borrow(), vec![Operation::AppendContentsOf(vec![])]);
    }

    #[test]
    fn insert_places_element_and_signals() {
        let array = fixture();
        let (log, _sub) = record(&array);

        array.insert(10, 1);

        assert_eq!(array.get(1), 10);
        assert_eq!(array.snapshot(), vec![1, 10, 2, 3, 4]);
        assert_eq!(
            *log.borrow(),
            vec![Operation::Insert {
                value: 10,
                index: 1
            }]
        );
    }

    #[test]
    fn insert_at_end_index_appends() {
        let array = fixture();
        array.insert(5, array.end_index());
        assert_eq!(array.last(), Some(5));
    }

    #[test]
    fn replace_returns_previous_and_signals() {
        let array = fixture();
        let (log, _sub) = record(&array);

        let previous = array.replace(9, 2);

        assert_eq!(previous, 3);
        assert_eq!(array.get(2), 9);
        assert_eq!(array.count(), 4);
        assert_eq!(
            *log.borrow(),
            vec![Operation::Replace { value: 9, index: 2 }]
        );
    }

    #[test]
    fn remove_at_index_returns_removed_and_signals() {
        let array = fixture();
        let (log, _sub) = record(&array);

        let removed = array.remove_at_index(1);

        assert_eq!(removed, 2);
        assert_eq!(array.snapshot(), vec![1, 3, 4]);
        assert_eq!(*log.borrow(), vec![Operation::RemoveElement { index: 1 }]);
    }

    #[test]
    fn replace_all_swaps_contents() {
        let array = fixture();
        let (log, _sub) = record(&array);

        array.replace_all(vec![1, 3, 5, 7, 9]);

        assert_eq!(array.snapshot(), vec![1, 3, 5, 7, 9]);
        assert_eq!(
            *log.borrow(),
            vec![Operation::ReplaceAll(vec![1, 3, 5, 7, 9])]
        );
    }

    #[test]
    fn remove_all_carries_flag() {
        for keep in [true, false] {
            let array = fixture();
            let (log, _sub) = record(&array);

            array.remove_all(keep);

            assert!(array.is_empty());
            assert_eq!(
                *log.borrow(),
                vec![Operation::RemoveAll {
                    keep_capacity: keep
                }]
            );
        }
    }

    #[test]
    fn indexed_get_and_set() {
        let array = fixture();
        let (log, _sub) = record(&array);
        assert_eq!(array.get(2), 3);

        array.set(1, 5);

        assert_eq!(array.get(1), 5);
        assert_eq!(
            *log.borrow(),
            vec![Operation::Replace { value: 5, index: 1 }]
        );
    }

    #[test]
    fn first_last_start_end() {
        let array = fixture();
        assert_eq!(array.first(), Some(1));
        assert_eq!(array.last(), Some(4));
        assert_eq!(array.start_index(), 0);
        assert_eq!(array.end_index(), 4);
    }

    #[test]
    fn accessors_do_not_emit() {
        let array = fixture();
        let (log, _sub) = record(&array);
        let _ = (
            array.count(),
            array.is_empty(),
            array.first(),
            array.last(),
            array.start_index(),
            array.end_index(),
            array.snapshot(),
            array.get(0),
        );
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn spec_scenario() {
        let array = fixture();
        let (log, _sub) = record(&array);

        array.append(5);
        assert_eq!(array.snapshot(), vec![1, 2, 3, 4, 5]);
        assert_eq!(array.count(), 5);

        array.remove_at_index(1);
        assert_eq!(array.snapshot(), vec![1, 3, 4, 5]);
        assert_eq!(array.count(), 4);

        array.replace_all(vec![9, 9]);
        assert_eq!(array.snapshot(), vec![9, 9]);
        assert_eq!(array.count(), 2);

        assert_eq!(
            *log.borrow(),
            vec![
                Operation::Append(5),
                Operation::RemoveElement { index: 1 },
                Operation::ReplaceAll(vec![9, 9]),
            ]
        );
    }

    #[test]
    fn replay_subscription_starts_with_initiate() {
        let array = ReactiveArray::from(vec![3, 5, 76, 3, 6, 4, 6]);
        array.append(1);
        array.remove_at_index(0);

        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let _sub = array.subscribe_replay(move |op| sink.borrow_mut().push(op.clone()));

        array.append(5);

        assert_eq!(
            *log.borrow(),
            vec![
                Operation::Initiate(vec![5, 76, 3, 6, 4, 6, 1]),
                Operation::Append(5),
            ]
        );
    }

    #[test]
    fn replay_subscription_on_empty_array() {
        let array: ReactiveArray<i32> = ReactiveArray::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let _sub = array.subscribe_replay(move |op| sink.borrow_mut().push(op.clone()));
        assert_eq!(*log.borrow(), vec![Operation::Initiate(vec![])]);
    }

    #[test]
    fn live_subscription_sees_only_later_operations() {
        let array = fixture();
        array.append(5);
        let (log, _sub) = record(&array);
        array.replace(0, 0);
        assert_eq!(
            *log.borrow(),
            vec![Operation::Replace { value: 0, index: 0 }]
        );
    }

    #[test]
    fn every_subscriber_sees_the_same_sequence() {
        let array = fixture();
        let (a, _sa) = record(&array);
        let (b, _sb) = record(&array);

        array.append(5);
        array.insert(0, 0);
        array.remove_all(false);

        assert_eq!(*a.borrow(), *b.borrow());
        assert_eq!(a.borrow().len(), 3);
    }

    #[test]
    fn unsubscribed_observer_receives_nothing() {
        let array = fixture();
        let (log, sub) = record(&array);
        array.append(5);
        sub.unsubscribe();
        array.append(6);
        assert_eq!(*log.borrow(), vec![Operation::Append(5)]);
        assert_eq!(array.subscriber_count(), 0);
    }

    #[test]
    fn subscriber_can_read_array_during_delivery() {
        let array = Rc::new(fixture());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let weak = Rc::downgrade(&array);
        let sink = Rc::clone(&seen);
        let _sub = array.subscribe(move |_| {
            if let Some(array) = weak.upgrade() {
                sink.borrow_mut().push(array.snapshot());
            }
        });

        array.append(5);
        assert_eq!(*seen.borrow(), vec![vec![1, 2, 3, 4, 5]]);
    }

    #[test]
    #[should_panic(expected = "insert: index 6 out of bounds (length 4)")]
    fn insert_out_of_bounds_panics() {
        fixture().insert(5, 6);
    }

    #[test]
    #[should_panic(expected = "replace: index 14 out of bounds (length 4)")]
    fn replace_out_of_bounds_panics() {
        let array = fixture();
        array.replace(5, array.count() + 10);
    }

    #[test]
    #[should_panic(expected = "remove_element: index 4 out of bounds (length 4)")]
    fn remove_out_of_bounds_panics() {
        fixture().remove_at_index(4);
    }

    #[test]
    #[should_panic(expected = "get: index 4 out of bounds (length 4)")]
    fn get_out_of_bounds_panics() {
        let _ = fixture().get(4);
    }

    #[test]
    #[should_panic(expected = "replace: index 4 out of bounds")]
    fn set_out_of_bounds_panics() {
        fixture().set(4, 0);
    }

    #[test]
    fn checked_calls_report_and_leave_state_untouched() {
        let array = fixture();
        let (log, _sub) = record(&array);

        assert_eq!(
            array.try_insert(0, 5),
            Err(ArrayError::out_of_bounds("insert", 5, 4))
        );
        assert_eq!(
            array.try_replace(0, 4),
            Err(ArrayError::out_of_bounds("replace", 4, 4))
        );
        assert_eq!(
            array.try_remove_at_index(4),
            Err(ArrayError::out_of_bounds("remove_element", 4, 4))
        );
        assert_eq!(
            array.try_get(4),
            Err(ArrayError::out_of_bounds("get", 4, 4))
        );
        assert!(array.try_set(4, 0).is_err());

        assert_eq!(array.snapshot(), vec![1, 2, 3, 4]);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn checked_calls_succeed_in_range() {
        let array = fixture();
        array.try_insert(0, 0).unwrap();
        assert_eq!(array.try_replace(10, 0).unwrap(), 0);
        assert_eq!(array.try_remove_at_index(0).unwrap(), 10);
        array.try_set(0, 7).unwrap();
        assert_eq!(array.try_get(0).unwrap(), 7);
    }

    #[test]
    fn extend_emits_single_append_contents_of() {
        let mut array = fixture();
        let (log, _sub) = record(&array);
        array.extend([5, 6]);
        assert_eq!(
            *log.borrow(),
            vec![Operation::AppendContentsOf(vec![5, 6])]
        );
    }

    #[test]
    fn collect_into_array() {
        let array: ReactiveArray<u8> = (1..=3).collect();
        assert_eq!(array.snapshot(), vec![1, 2, 3]);
    }

    #[test]
    fn config_name_and_capacity() {
        let array: ReactiveArray<u8> = ReactiveArray::with_config(
            vec![1],
            ReactiveArrayConfig::new()
                .with_name("rows")
                .with_capacity(32),
        );
        assert_eq!(array.name(), "rows");
        assert!(array.with(|items| items.len()) == 1);
        assert!(array.core.items.borrow().capacity() >= 33);
    }

    #[test]
    fn remove_all_keep_capacity_retains_allocation() {
        let array: ReactiveArray<u32> = (0..100).collect();
        let before = array.core.items.borrow().capacity();
        array.remove_all(true);
        assert_eq!(array.core.items.borrow().capacity(), before);
        array.append_contents_of((0..100).collect());
        array.remove_all(false);
        assert_eq!(array.core.items.borrow().capacity(), 0);
    }

    #[test]
    fn debug_format() {
        let array = fixture();
        let dbg = format!("{array:?}");
        assert!(dbg.contains("ReactiveArray"));
        assert!(dbg.contains("[1, 2, 3, 4]"));
        assert!(dbg.contains("mirror: false"));
    }

    #[traced_test]
    #[test]
    fn rejected_call_is_logged() {
        let array =
            ReactiveArray::with_config(vec![1], ReactiveArrayConfig::new().with_name("audit"));
        let _ = array.try_remove_at_index(3);
        assert!(logs_contain("reactive_array.precondition"));
        assert!(logs_contain("audit"));
    }

    #[traced_test]
    #[test]
    fn emission_is_logged() {
        let array = fixture();
        array.append(5);
        assert!(logs_contain("reactive_array.emit"));
        assert!(logs_contain("op=append"));
    }

    /// An early subscriber that reacts to `Append` by inserting at the end.
    fn append_echo(array: &Rc<ReactiveArray<i32>>) -> Subscription {
        let weak = Rc::downgrade(array);
        array.subscribe(move |op| {
            if let (Operation::Append(_), Some(array)) = (op, weak.upgrade()) {
                array.insert(99, array.count());
            }
        })
    }

    #[test]
    fn mutation_from_callback_reaches_later_subscribers_in_storage_order() {
        let source = Rc::new(fixture());
        let _echo = append_echo(&source);
        let mirror = source.mirror(|v| v * 10);
        let count = source.observable_count();
        let (log, _sub) = record(&*source);

        source.append(5);

        assert_eq!(source.snapshot(), vec![1, 2, 3, 4, 5, 99]);
        assert_eq!(
            *log.borrow(),
            vec![
                Operation::Append(5),
                Operation::Insert {
                    value: 99,
                    index: 5
                }
            ]
        );
        let expected: Vec<i32> = source.snapshot().iter().map(|v| v * 10).collect();
        assert_eq!(mirror.snapshot(), expected);
        assert_eq!(count.get(), 6);
        assert_eq!(count.version(), 3);
    }

    #[test]
    fn replay_log_survives_mutation_from_callback() {
        let source = Rc::new(fixture());
        let _echo = append_echo(&source);
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let _sub = source.subscribe_replay(move |op| sink.borrow_mut().push(op.clone()));

        source.append(5);
        source.append(6);

        assert_eq!(
            crate::operation::replay(log.borrow().iter()).unwrap(),
            source.snapshot()
        );
        assert_eq!(source.snapshot(), vec![1, 2, 3, 4, 5, 99, 6, 99]);
    }

    #[test]
    fn replay_subscription_made_from_callback_sees_each_operation_once() {
        let source = Rc::new(fixture());
        let _echo = append_echo(&source);
        let late_log = Rc::new(RefCell::new(Vec::new()));
        let late_sub: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let weak = Rc::downgrade(&source);
        let log = Rc::clone(&late_log);
        let slot = Rc::clone(&late_sub);
        let _joiner = source.subscribe(move |_| {
            let joined = slot.borrow().is_some();
            if !joined && let Some(source) = weak.upgrade() {
                let sink = Rc::clone(&log);
                let sub = source.subscribe_replay(move |op| sink.borrow_mut().push(op.clone()));
                *slot.borrow_mut() = Some(sub);
            }
        });

        source.append(5);

        // The replayed snapshot already holds the echoed 99, so the queued
        // Insert must not be delivered to the new subscriber again.
        assert_eq!(
            *late_log.borrow(),
            vec![Operation::Initiate(vec![1, 2, 3, 4, 5, 99])]
        );
        assert_eq!(
            crate::operation::replay(late_log.borrow().iter()).unwrap(),
            source.snapshot()
        );
    }
}
