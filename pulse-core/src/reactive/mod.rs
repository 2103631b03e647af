//! Reactive cells: atoms, derived values and action cells.
//!
//! An [`Atom`] holds one value and replaces it wholesale on every write. A
//! [`Derived`] is a pure function of other cells, recomputed lazily when any
//! of them commits. An [`Action`] is the write side: it maps an input and the
//! current value to the next value.

mod action;
mod atom;
mod derived;
mod subscription;

use std::sync::Arc;

pub use action::Action;
pub use atom::Atom;
pub use derived::Derived;
pub use subscription::Subscription;

/// Anything a derived cell can depend on.
pub trait Source: Send + Sync {
    /// Monotonic counter that moves on every commit.
    fn version(&self) -> u64;

    fn on_change(&self, f: Arc<dyn Fn() + Send + Sync>) -> Subscription;
}

/// A source whose current value can be read.
pub trait Readable<T>: Source {
    fn get(&self) -> T;
}
