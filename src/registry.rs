//! Subscription registry (C5): `connection_id -> ordered subscriptions`.
//!
//! Readers (`find_matches`) take the shared lock; writers
//! (`register`/`unregister`/`unregister_all`) take the exclusive lock.
//! `parking_lot::RwLock` is used rather than `std::sync::RwLock` for the
//! same reason the rest of the shared state does — non-poisoning,
//! lighter-weight locks, matching the concurrency shape the pack's own
//! relay framework (`verse-pbc-nostr_relay_builder`) uses for its
//! subscription map.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::event::Event;
use crate::subscription::Subscription;

#[derive(Default)]
pub struct SubscriptionRegistry {
    by_connection: RwLock<HashMap<String, Vec<Subscription>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sub` under `conn_id`. A subscription with the same id
    /// already registered on this connection is replaced in place
    /// (preserving its position); otherwise `sub` is appended.
    pub fn register(&self, conn_id: &str, sub: Subscription) {
        let mut map = self.by_connection.write();
        let subs = map.entry(conn_id.to_string()).or_default();
        if let Some(existing) = subs.iter_mut().find(|s| s.id == sub.id) {
            *existing = sub;
        } else {
            subs.push(sub);
        }
    }

    /// Removes the named subscription if present. Never fails.
    pub fn unregister(&self, conn_id: &str, sub_id: &str) {
        let mut map = self.by_connection.write();
        if let Some(subs) = map.get_mut(conn_id) {
            subs.retain(|s| s.id != sub_id);
        }
    }

    /// Removes every subscription registered under `conn_id`. No-op if
    /// the connection has none.
    pub fn unregister_all(&self, conn_id: &str) {
        self.by_connection.write().remove(conn_id);
    }

    /// Every `(connection_id, subscription_id)` pair whose subscription
    /// matches `event`. No ordering guarantee across connections; within
    /// one connection, matches are returned in registration order.
    pub fn find_matches(&self, event: &Event) -> Vec<(String, String)> {
        let map = self.by_connection.read();
        let mut matches = Vec::new();
        for (conn_id, subs) in map.iter() {
            for sub in subs {
                if sub.matches(event) {
                    matches.push((conn_id.clone(), sub.id.clone()));
                }
            }
        }
        matches
    }
}
