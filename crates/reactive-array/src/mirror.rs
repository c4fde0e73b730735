#![forbid(unsafe_code)]

//! Derived arrays that track a value-transform of a source.
//!
//! A mirror is an ordinary [`ReactiveArray<U>`] seeded with the mapped
//! snapshot of its source and kept in step by one forwarding subscription:
//! each source operation is mapped with [`Operation::map_ref`], committed to
//! the mirror's own store and re-broadcast to the mirror's subscribers.
//!
//! The link is one-directional. The source only sees an anonymous
//! subscriber; the mirror owns the [`Subscription`](crate::Subscription) and
//! releases it when dropped. The forwarder holds the mirror's storage weakly,
//! so neither side keeps the other alive.
//!
//! Mutating a mirror directly is allowed but breaks the correspondence with
//! its source from that point on.

use std::rc::Rc;

use crate::array::ReactiveArray;
use crate::config::ReactiveArrayConfig;
use crate::operation::Operation;

impl<T: Clone + 'static> ReactiveArray<T> {
    /// Build an array that always equals `self` mapped through `transform`.
    ///
    /// The mirror is named `"<source>.mirror"`.
    #[must_use]
    pub fn mirror<U, F>(&self, transform: F) -> ReactiveArray<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let config = ReactiveArrayConfig::new().with_name(format!("{}.mirror", self.name()));
        self.mirror_with_config(config, transform)
    }

    /// [`mirror`](Self::mirror) with explicit settings for the new array.
    #[must_use]
    pub fn mirror_with_config<U, F>(
        &self,
        config: ReactiveArrayConfig,
        transform: F,
    ) -> ReactiveArray<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let seed: Vec<U> = self.with(|items| items.iter().map(&transform).collect());
        let mut target = ReactiveArray::with_config(seed, config);
        tracing::debug!(
            message = "reactive_array.mirror",
            source = %self.name(),
            mirror = %target.name(),
            len = target.count()
        );

        let weak_target = Rc::downgrade(&target.core);
        let upstream = self.subscribe(move |op: &Operation<T>| {
            let Some(core) = weak_target.upgrade() else {
                return;
            };
            if let Err(err) = core.commit(op.map_ref(&transform)) {
                // The source validated the index against an identical length.
                tracing::error!(
                    message = "reactive_array.mirror.diverged",
                    mirror = %core.name,
                    error = %err
                );
            }
        });
        target.upstream = Some(upstream);
        target
    }
}
