//! Pluggable persistent event store (§6): `save` and `query`, the only two
//! operations the relay service depends on.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::RelayError;
use crate::event::Event;
use crate::subscription::Subscription;

/// Persists and queries events. Implementations are expected to be
/// internally thread-safe; the relay service never serializes access to
/// the store itself.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Idempotent insertion keyed by `event.id`. Re-insertion of the same
    /// id may succeed silently or report a non-fatal error — either way
    /// the admission pipeline treats it as success for the
    /// acknowledgement.
    async fn save(&self, event: &Event) -> Result<(), RelayError>;

    /// Events matching the subscription's disjunction of filters,
    /// deduplicated by id, each per-filter bounded by its `limit`.
    /// Ordering is `created_at` descending by convention; the wire
    /// protocol does not mandate an order.
    async fn query(&self, subscription: &Subscription) -> Result<Vec<Event>, RelayError>;
}

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
