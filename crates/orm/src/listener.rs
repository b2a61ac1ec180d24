//! Entity lifecycle listeners.

use std::fmt;
use std::sync::Arc;

use sea_query::Value;

/// Column assignments of an INSERT or UPDATE, in statement order.
pub type Assignments = Vec<(String, Value)>;

/// Hook invoked before an INSERT or UPDATE for an entity is rendered.
///
/// Listeners run in declaration order and may add, replace or remove
/// assignments.
pub trait Listener: Send + Sync + fmt::Debug {
    /// Called before an INSERT is rendered.
    fn on_insert(&self, _values: &mut Assignments) {}

    /// Called before an UPDATE is rendered.
    fn on_update(&self, _values: &mut Assignments) {}
}

/// Constructs a listener when the owning entity is resolved.
pub type ListenerFactory = fn() -> Arc<dyn Listener>;
