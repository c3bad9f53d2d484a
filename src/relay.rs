//! Relay service (C7): the admission pipeline, REQ replay, and CLOSE /
//! disconnect handling. This is the piece that stitches C1–C6 together;
//! it knows nothing about the transport (WebSocket vs. anything else).

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info};

use crate::event::Event;
use crate::filter::Filter;
use crate::pool::ConnectionPool;
use crate::registry::SubscriptionRegistry;
use crate::store::EventStore;
use crate::subscription::Subscription;
use crate::wire::ServerMessage;

pub struct RelayService {
    store: Arc<dyn EventStore>,
    registry: Arc<SubscriptionRegistry>,
    pool: Arc<ConnectionPool>,
}

impl RelayService {
    pub fn new(
        store: Arc<dyn EventStore>,
        registry: Arc<SubscriptionRegistry>,
        pool: Arc<ConnectionPool>,
    ) -> Self {
        RelayService {
            store,
            registry,
            pool,
        }
    }

    /// Admission pipeline: validate -> verify -> persist -> acknowledge ->
    /// fan out. The `OK` response is sent before fanout is attempted, so a
    /// publisher that is also a subscriber of its own event observes its
    /// `OK` first (§5 ordering guarantee, §8 invariant 6).
    pub async fn handle_event(&self, conn_id: &str, event: Event) {
        if let Err(e) = event.validate() {
            self.ack(conn_id, &event.id, false, e.wire_message());
            return;
        }
        if let Err(e) = event.verify() {
            self.ack(conn_id, &event.id, false, e.wire_message());
            return;
        }
        if let Err(e) = self.store.save(&event).await {
            error!(event_id = %event.id, error = %e, "failed to persist event");
            self.ack(conn_id, &event.id, false, e.wire_message());
            return;
        }

        info!(event_id = %event.id, kind = event.kind, pubkey = %event.pubkey, "accepted event");
        self.ack(conn_id, &event.id, true, String::new());

        let matches = self.registry.find_matches(&event);
        debug!(event_id = %event.id, matches = matches.len(), "fanning out accepted event");
        for (target_conn, sub_id) in matches {
            let frame = ServerMessage::Event {
                subscription_id: sub_id,
                event: event.clone(),
            }
            .encode();
            self.pool.send_to(&target_conn, frame);
        }
    }

    fn ack(&self, conn_id: &str, event_id: &str, accepted: bool, message: String) {
        let frame = ServerMessage::Ok {
            event_id: event_id.to_string(),
            accepted,
            message,
        }
        .encode();
        self.pool.send_to(conn_id, frame);
    }

    /// REQ: parse filters (each independently; per-filter failures
    /// aggregate into one `NOTICE`), query the store, replay, `EOSE`,
    /// then register the subscription so future events fan out to it.
    /// Registration happens after replay but the window this leaves open
    /// is accepted per §4.7 — duplicates over a missed event are
    /// preferable to a silent gap, and this ordering keeps the store
    /// snapshot and the replay loop trivially consistent.
    pub async fn handle_req(&self, conn_id: &str, subscription_id: String, raw_filters: Vec<Value>) {
        let mut filters = Vec::new();
        let mut parse_errors = Vec::new();
        for raw in &raw_filters {
            match Filter::from_value(raw) {
                Ok(filter) => filters.push(filter),
                Err(e) => parse_errors.push(e.to_string()),
            }
        }

        if !parse_errors.is_empty() {
            let notice = ServerMessage::Notice {
                message: format!("invalid REQ filter: {}", parse_errors.join("; ")),
            }
            .encode();
            self.pool.send_to(conn_id, notice);
        }

        if filters.is_empty() {
            // Every filter failed to parse: abort without installing a
            // subscription.
            return;
        }

        let subscription = Subscription::new(subscription_id.clone(), filters);

        match self.store.query(&subscription).await {
            Ok(events) => {
                info!(subscription_id = %subscription_id, count = events.len(), "replaying stored events");
                for event in events {
                    let frame = ServerMessage::Event {
                        subscription_id: subscription_id.clone(),
                        event,
                    }
                    .encode();
                    self.pool.send_to(conn_id, frame);
                }
            }
            Err(e) => {
                error!(subscription_id = %subscription_id, error = %e, "REQ query failed");
                let notice = ServerMessage::Notice {
                    message: "internal error on REQ".to_string(),
                }
                .encode();
                self.pool.send_to(conn_id, notice);
                return;
            }
        }

        let eose = ServerMessage::Eose {
            subscription_id: subscription_id.clone(),
        }
        .encode();
        self.pool.send_to(conn_id, eose);

        self.registry.register(conn_id, subscription);
    }

    /// CLOSE: unregister the subscription. No acknowledgement is sent.
    pub fn handle_close(&self, conn_id: &str, subscription_id: &str) {
        self.registry.unregister(conn_id, subscription_id);
    }

    /// Connection teardown: remove every subscription for this
    /// connection, then drop it from the pool.
    pub fn handle_disconnect(&self, conn_id: &str) {
        self.registry.unregister_all(conn_id);
        self.pool.remove(conn_id);
    }
}
