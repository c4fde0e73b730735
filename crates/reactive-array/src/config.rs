//! Construction-time settings for [`ReactiveArray`](crate::ReactiveArray).

use std::borrow::Cow;

/// Default label recorded on tracing events.
pub const DEFAULT_ARRAY_NAME: &str = "reactive_array";

/// Settings applied when an array is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactiveArrayConfig {
    /// Label attached to every tracing event the array emits.
    /// Mirrors derive `"<source>.mirror"` unless configured.
    /// Default: `"reactive_array"`.
    pub name: Cow<'static, str>,

    /// Initial reservation for the backing store, on top of the seed
    /// elements. Default: 0.
    pub capacity: usize,
}

impl Default for ReactiveArrayConfig {
    fn default() -> Self {
        Self {
            name: Cow::Borrowed(DEFAULT_ARRAY_NAME),
            capacity: 0,
        }
    }
}

impl ReactiveArrayConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tracing label.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Reserve room for `capacity` additional elements up front.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}
