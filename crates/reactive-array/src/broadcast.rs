#![forbid(unsafe_code)]

//! Synchronous single-producer fan-out.
//!
//! # Design
//!
//! A [`Broadcast<E>`] keeps an ordered map from [`SubscriptionId`] to a weak
//! reference to the subscriber slot. The strong reference lives in the
//! [`Subscription`] guard returned to the caller, so dropping the guard is
//! all it takes to leave the broadcast. Dead entries are pruned lazily on the
//! next emission or subscription.
//!
//! Every broadcast is owned by one instance (an array, a scan); there is no
//! process-wide registry.
//!
//! # Invariants
//!
//! 1. Subscribers are invoked in subscription order.
//! 2. No internal borrow is held while a callback runs. Callbacks may
//!    subscribe, unsubscribe, or emit again on the same broadcast.
//! 3. Once a [`Subscription`] is unsubscribed (explicitly or by drop) its
//!    callback is never invoked again, even if the detach happens in the
//!    middle of an emission that already collected it.
//! 4. Every subscriber sees events in the order `emit` was called. An emit
//!    from inside a callback is queued and delivered once the current event
//!    has reached every subscriber (FIFO, never depth-first).
//! 5. A queued event only reaches subscribers that existed when it was
//!    queued.
//!
//! # Failure Modes
//!
//! - **Callback panics**: the panic propagates to the emitting caller.
//!   Subscribers later in the order miss that event, and events still
//!   queued behind it are discarded. The broadcast stays usable.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

/// Identifier of one subscription within a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw numeric value. Unique per broadcast, starting at 1.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// One registered callback.
struct Slot<E> {
    active: Cell<bool>,
    callback: Box<dyn Fn(&E)>,
}

/// Type-erased view of a slot, so [`Subscription`] is not generic.
trait Detach {
    fn detach(&self);
    fn is_attached(&self) -> bool;
}

impl<E> Detach for Slot<E> {
    fn detach(&self) {
        self.active.set(false);
    }

    fn is_attached(&self) -> bool {
        self.active.get()
    }
}

struct BroadcastInner<E> {
    next_id: u64,
    slots: BTreeMap<SubscriptionId, Weak<Slot<E>>>,
    /// Set while a top-level `emit` is draining.
    emitting: bool,
    /// Events emitted from inside callbacks, each with the first id that
    /// must not receive it.
    pending: VecDeque<(SubscriptionId, E)>,
}

impl<E> BroadcastInner<E> {
    fn prune(&mut self) {
        self.slots
            .retain(|_, slot| slot.upgrade().is_some_and(|s| s.active.get()));
    }
}

/// Per-instance push stream: one producer, any number of subscribers.
pub struct Broadcast<E> {
    inner: RefCell<BroadcastInner<E>>,
}

impl<E> Default for Broadcast<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Broadcast<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcast")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<E> Broadcast<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(BroadcastInner {
                next_id: 1,
                slots: BTreeMap::new(),
                emitting: false,
                pending: VecDeque::new(),
            }),
        }
    }

    /// Number of subscriptions that will receive the next event.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .slots
            .values()
            .filter(|slot| slot.upgrade().is_some_and(|s| s.active.get()))
            .count()
    }

    /// Deliver `event` to every current subscriber, in subscription order.
    ///
    /// Called from inside one of this broadcast's callbacks, the event is
    /// queued behind the one being delivered and this returns 0. Otherwise
    /// returns how many callbacks ran, queued events included.
    pub fn emit(&self, event: &E) -> usize
    where
        E: Clone,
    {
        let limit = {
            let mut inner = self.inner.borrow_mut();
            let limit = SubscriptionId(inner.next_id);
            if inner.emitting {
                inner.pending.push_back((limit, event.clone()));
                return 0;
            }
            inner.emitting = true;
            limit
        };

        let _drain = DrainGuard { inner: &self.inner };
        let mut delivered = self.deliver(event, limit);
        while let Some((limit, queued)) = self.next_pending() {
            delivered += self.deliver(&queued, limit);
        }
        delivered
    }

    fn next_pending(&self) -> Option<(SubscriptionId, E)> {
        self.inner.borrow_mut().pending.pop_front()
    }

    /// Run the callbacks of live slots with an id below `limit`.
    fn deliver(&self, event: &E, limit: SubscriptionId) -> usize {
        let targets: Vec<Rc<Slot<E>>> = {
            let mut inner = self.inner.borrow_mut();
            inner.prune();
            inner
                .slots
                .range(..limit)
                .filter_map(|(_, slot)| slot.upgrade())
                .collect()
        };

        let mut delivered = 0;
        for slot in &targets {
            // Re-check: an earlier callback may have detached this one.
            if slot.active.get() {
                (slot.callback)(event);
                delivered += 1;
            }
        }
        delivered
    }
}

/// Ends a drain, also when a callback unwinds.
struct DrainGuard<'a, E> {
    inner: &'a RefCell<BroadcastInner<E>>,
}

impl<E> Drop for DrainGuard<'_, E> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.emitting = false;
            inner.pending.clear();
        }
    }
}

impl<E: 'static> Broadcast<E> {
    /// Register `callback` for every event emitted from now on.
    ///
    /// The callback stays registered for as long as the returned guard lives.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&E) + 'static) -> Subscription {
        let slot = Rc::new(Slot {
            active: Cell::new(true),
            callback: Box::new(callback),
        });

        let id = {
            let mut inner = self.inner.borrow_mut();
            inner.prune();
            let id = SubscriptionId(inner.next_id);
            inner.next_id += 1;
            inner.slots.insert(id, Rc::downgrade(&slot));
            id
        };
        tracing::trace!(message = "broadcast.subscribe", id = id.raw());

        Subscription {
            id,
            slot: Some(slot),
        }
    }
}

/// RAII guard for a broadcast registration.
///
/// Dropping it (or calling [`unsubscribe`](Self::unsubscribe)) stops
/// delivery immediately. Safe to do from inside a delivery callback.
#[must_use = "dropping the Subscription unsubscribes immediately"]
pub struct Subscription {
    id: SubscriptionId,
    slot: Option<Rc<dyn Detach>>,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether this guard is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.slot.as_ref().is_some_and(|slot| slot.is_attached())
    }

    /// Stop receiving events. Equivalent to dropping the guard.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.detach();
            tracing::trace!(message = "broadcast.unsubscribe", id = self.id.raw());
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
