#![forbid(unsafe_code)]

//! Replayable mutation records.
//!
//! An [`Operation<T>`] describes exactly one mutation of a sequence and
//! carries only the payload needed to replay it. Consumers receive these
//! from a [`ReactiveArray`](crate::ReactiveArray) and apply them to their own
//! state instead of diffing snapshots.
//!
//! # Invariants
//!
//! 1. An index carried by `Insert`, `Replace` or `RemoveElement` was valid
//!    for the producing store at the instant the operation was emitted.
//! 2. [`Operation::map`] keeps the variant and any index; it only touches
//!    element payload. `RemoveElement` and `RemoveAll` map to themselves.
//! 3. Applying a log that starts with `Initiate` to any vector reproduces
//!    the producer's snapshot (see [`replay`]).

use std::fmt;

use crate::error::{ArrayError, Result};

/// One mutation of an observable sequence.
///
/// Equality is structural: same variant, equal payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "op", content = "payload", rename_all = "snake_case")
)]
pub enum Operation<T> {
    /// Full snapshot handed to a replay-mode subscriber.
    Initiate(Vec<T>),
    /// One element pushed at the end.
    Append(T),
    /// Many elements pushed at the end, in order.
    AppendContentsOf(Vec<T>),
    /// One element inserted; elements at and after `index` shift right.
    Insert { value: T, index: usize },
    /// Element at `index` overwritten.
    Replace { value: T, index: usize },
    /// Element at `index` removed; later elements shift left.
    RemoveElement { index: usize },
    /// Entire contents replaced.
    ReplaceAll(Vec<T>),
    /// Contents emptied. `keep_capacity` is a hint for the backing store.
    RemoveAll { keep_capacity: bool },
}

/// Fieldless discriminant of [`Operation`], used for logging and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum OperationKind {
    Initiate,
    Append,
    AppendContentsOf,
    Insert,
    Replace,
    RemoveElement,
    ReplaceAll,
    RemoveAll,
}

impl OperationKind {
    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initiate => "initiate",
            Self::Append => "append",
            Self::AppendContentsOf => "append_contents_of",
            Self::Insert => "insert",
            Self::Replace => "replace",
            Self::RemoveElement => "remove_element",
            Self::ReplaceAll => "replace_all",
            Self::RemoveAll => "remove_all",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T> Operation<T> {
    /// The variant of this operation.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Initiate(_) => OperationKind::Initiate,
            Self::Append(_) => OperationKind::Append,
            Self::AppendContentsOf(_) => OperationKind::AppendContentsOf,
            Self::Insert { .. } => OperationKind::Insert,
            Self::Replace { .. } => OperationKind::Replace,
            Self::RemoveElement { .. } => OperationKind::RemoveElement,
            Self::ReplaceAll(_) => OperationKind::ReplaceAll,
            Self::RemoveAll { .. } => OperationKind::RemoveAll,
        }
    }

    /// The single element carried by `Append`, `Insert` and `Replace`.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Append(value) | Self::Insert { value, .. } | Self::Replace { value, .. } => {
                Some(value)
            }
            _ => None,
        }
    }

    /// The sequence carried by `Initiate`, `AppendContentsOf` and `ReplaceAll`.
    #[must_use]
    pub fn array_value(&self) -> Option<&[T]> {
        match self {
            Self::Initiate(values) | Self::AppendContentsOf(values) | Self::ReplaceAll(values) => {
                Some(values)
            }
            _ => None,
        }
    }

    /// The position targeted by `Insert`, `Replace` and `RemoveElement`.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Insert { index, .. }
            | Self::Replace { index, .. }
            | Self::RemoveElement { index } => Some(*index),
            _ => None,
        }
    }

    /// Transform every element of the payload, keeping variant and index.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Operation<U> {
        match self {
            Self::Initiate(values) => Operation::Initiate(values.into_iter().map(f).collect()),
            Self::Append(value) => Operation::Append(f(value)),
            Self::AppendContentsOf(values) => {
                Operation::AppendContentsOf(values.into_iter().map(f).collect())
            }
            Self::Insert { value, index } => Operation::Insert {
                value: f(value),
                index,
            },
            Self::Replace { value, index } => Operation::Replace {
                value: f(value),
                index,
            },
            Self::RemoveElement { index } => Operation::RemoveElement { index },
            Self::ReplaceAll(values) => Operation::ReplaceAll(values.into_iter().map(f).collect()),
            Self::RemoveAll { keep_capacity } => Operation::RemoveAll { keep_capacity },
        }
    }

    /// Borrowing form of [`map`](Self::map).
    pub fn map_ref<U>(&self, mut f: impl FnMut(&T) -> U) -> Operation<U> {
        match self {
            Self::Initiate(values) => Operation::Initiate(values.iter().map(f).collect()),
            Self::Append(value) => Operation::Append(f(value)),
            Self::AppendContentsOf(values) => {
                Operation::AppendContentsOf(values.iter().map(f).collect())
            }
            Self::Insert { value, index } => Operation::Insert {
                value: f(value),
                index: *index,
            },
            Self::Replace { value, index } => Operation::Replace {
                value: f(value),
                index: *index,
            },
            Self::RemoveElement { index } => Operation::RemoveElement { index: *index },
            Self::ReplaceAll(values) => Operation::ReplaceAll(values.iter().map(f).collect()),
            Self::RemoveAll { keep_capacity } => Operation::RemoveAll {
                keep_capacity: *keep_capacity,
            },
        }
    }
}

impl<T: Clone> Operation<T> {
    /// Replay this operation onto `items`.
    ///
    /// Returns the displaced element for `Replace` and `RemoveElement`.
    /// On an out-of-range index `items` is left untouched.
    ///
    /// # Errors
    ///
    /// [`ArrayError::IndexOutOfBounds`] when the carried index is invalid
    /// for `items.len()`.
    pub fn apply(&self, items: &mut Vec<T>) -> Result<Option<T>> {
        match self {
            Self::Initiate(values) | Self::ReplaceAll(values) => {
                items.clone_from(values);
                Ok(None)
            }
            Self::Append(value) => {
                items.push(value.clone());
                Ok(None)
            }
            Self::AppendContentsOf(values) => {
                items.extend_from_slice(values);
                Ok(None)
            }
            Self::Insert { value, index } => {
                check_index(self.kind(), *index, items.len() + 1)?;
                items.insert(*index, value.clone());
                Ok(None)
            }
            Self::Replace { value, index } => {
                check_index(self.kind(), *index, items.len())?;
                Ok(Some(std::mem::replace(&mut items[*index], value.clone())))
            }
            Self::RemoveElement { index } => {
                check_index(self.kind(), *index, items.len())?;
                Ok(Some(items.remove(*index)))
            }
            Self::RemoveAll { keep_capacity } => {
                if *keep_capacity {
                    items.clear();
                } else {
                    *items = Vec::new();
                }
                Ok(None)
            }
        }
    }
}

/// `index < bound`, reported against the length the caller sees.
fn check_index(kind: OperationKind, index: usize, bound: usize) -> Result<()> {
    if index < bound {
        return Ok(());
    }
    let len = match kind {
        OperationKind::Insert => bound - 1,
        _ => bound,
    };
    Err(ArrayError::out_of_bounds(kind.as_str(), index, len))
}

/// Rebuild a snapshot from an operation log.
///
/// Starts from an empty vector, so a log recorded through a replay-mode
/// subscription (leading `Initiate`) reproduces the producer exactly.
///
/// # Errors
///
/// Fails on the first operation whose index does not fit the state built so
/// far.
pub fn replay<'a, T, I>(ops: I) -> Result<Vec<T>>
where
    T: Clone + 'a,
    I: IntoIterator<Item = &'a Operation<T>>,
{
    let mut items = Vec::new();
    for op in ops {
        op.apply(&mut items)?;
    }
    Ok(items)
}
