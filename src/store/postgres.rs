//! Postgres-backed `EventStore` (§6), grounded on the teacher's direct
//! `sqlx::query` usage in `handle_event`/`handle_req`. Dynamic filter
//! clauses are built with `sqlx::QueryBuilder` (bound parameters) rather
//! than the teacher's string interpolation, which let attacker-controlled
//! author/kind values flow straight into the SQL text.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, QueryBuilder, Row};

use crate::error::RelayError;
use crate::event::Event;
use crate::filter::Filter;
use crate::subscription::Subscription;

use super::EventStore;

pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PostgresStore { pool }
    }

    /// Creates the `events` table if it does not already exist. Intended
    /// for first-run bootstrapping; production deployments are expected
    /// to run migrations separately.
    pub async fn ensure_schema(&self) -> Result<(), RelayError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS events (
                event_id TEXT PRIMARY KEY,
                pubkey TEXT NOT NULL,
                sig TEXT NOT NULL,
                kind BIGINT NOT NULL,
                content TEXT NOT NULL,
                tags JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                received_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RelayError::StoreError {
            reason: e.to_string(),
        })?;
        Ok(())
    }

    async fn query_one_filter(&self, filter: &Filter) -> Result<Vec<Event>, RelayError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT event_id, pubkey, kind, content, tags, sig, created_at FROM events WHERE 1=1",
        );

        if let Some(ids) = &filter.ids {
            if ids.is_empty() {
                return Ok(vec![]);
            }
            builder.push(" AND event_id = ANY(");
            builder.push_bind(ids.clone());
            builder.push(")");
        }
        if let Some(authors) = &filter.authors {
            if authors.is_empty() {
                return Ok(vec![]);
            }
            builder.push(" AND pubkey = ANY(");
            builder.push_bind(authors.clone());
            builder.push(")");
        }
        if let Some(kinds) = &filter.kinds {
            if kinds.is_empty() {
                return Ok(vec![]);
            }
            builder.push(" AND kind = ANY(");
            builder.push_bind(kinds.clone());
            builder.push(")");
        }
        if let Some(since) = filter.since {
            builder.push(" AND created_at >= to_timestamp(");
            builder.push_bind(since);
            builder.push(")");
        }
        if let Some(until) = filter.until {
            builder.push(" AND created_at <= to_timestamp(");
            builder.push_bind(until);
            builder.push(")");
        }

        builder.push(" ORDER BY created_at DESC");
        let limit = filter.limit.unwrap_or(100).min(500) as i64;

        // Tag filters aren't expressible generically over JSONB without
        // knowing the filter shape ahead of time; apply them in memory.
        // `limit` bounds the count of matching events, so with a tag
        // clause present the row fetch stays unbounded and the limit is
        // applied after the retain below instead.
        if filter.tags.is_empty() {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RelayError::StoreError {
                reason: e.to_string(),
            })?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            events.push(row_to_event(&row)?);
        }

        if !filter.tags.is_empty() {
            events.retain(|e| filter.matches(e));
            events.truncate(limit as usize);
        }

        Ok(events)
    }
}

fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<Event, RelayError> {
    let event_id: String = row.try_get("event_id").map_err(store_err)?;
    let pubkey: String = row.try_get("pubkey").map_err(store_err)?;
    let kind: i64 = row.try_get("kind").map_err(store_err)?;
    let content: String = row.try_get("content").map_err(store_err)?;
    let tags_json: serde_json::Value = row.try_get("tags").map_err(store_err)?;
    let sig: String = row.try_get("sig").map_err(store_err)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(store_err)?;

    let tags: Vec<Vec<String>> = serde_json::from_value(tags_json).unwrap_or_default();

    Ok(Event {
        id: event_id,
        pubkey,
        sig,
        created_at: created_at.timestamp(),
        kind,
        tags,
        content,
    })
}

fn store_err(e: sqlx::Error) -> RelayError {
    RelayError::StoreError {
        reason: e.to_string(),
    }
}

#[async_trait::async_trait]
impl EventStore for PostgresStore {
    async fn save(&self, event: &Event) -> Result<(), RelayError> {
        let tags_json = serde_json::to_value(&event.tags).unwrap_or(serde_json::Value::Null);
        let created_at = DateTime::<Utc>::from_timestamp(event.created_at, 0)
            .ok_or_else(|| RelayError::StoreError {
                reason: "created_at out of range".to_string(),
            })?;

        sqlx::query(
            "INSERT INTO events (event_id, pubkey, kind, content, tags, sig, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(&event.id)
        .bind(&event.pubkey)
        .bind(event.kind)
        .bind(&event.content)
        .bind(tags_json)
        .bind(&event.sig)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn query(&self, subscription: &Subscription) -> Result<Vec<Event>, RelayError> {
        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for filter in &subscription.filters {
            for event in self.query_one_filter(filter).await? {
                if seen.insert(event.id.clone()) {
                    merged.push(event);
                }
            }
        }
        merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(merged)
    }
}
