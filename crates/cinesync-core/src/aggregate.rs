//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Trait for state-based aggregate roots that record the events their
/// mutations produce until the owning store has persisted them.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate records.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the last persisted version (number of successful saves).
    fn version(&self) -> i64;

    /// Returns events recorded since the last persistence.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Drains the recorded events in the order they were recorded.
    fn take_uncommitted_events(&mut self) -> Vec<Self::Event>;

    /// Discards recorded events without delivering them.
    fn clear_uncommitted_events(&mut self);
}
