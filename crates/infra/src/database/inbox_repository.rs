//! SQLite-backed request inbox with lease-based claiming.
//!
//! A claimed request stays in the table, invisible to other workers until its
//! lease expires. Acknowledging deletes it; a worker that dies or gives up
//! simply lets the lease run out and the request is delivered again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use eventsync_core::sync::RequestQueue;
use eventsync_domain::{InboundMessage, MessageProperties, Result as DomainResult};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tokio::task;
use tracing::debug;

use super::activity_repository::parse_column;
use super::manager::{map_sql_error, DbManager};
use crate::errors::{map_join_error, InfraError};

pub struct SqliteRequestQueue {
    db: Arc<DbManager>,
}

impl SqliteRequestQueue {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Requests waiting or in flight.
    pub async fn pending_count(&self) -> DomainResult<usize> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<usize> {
            let conn = db.get_connection()?;
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM request_inbox", [], |row| row.get(0))
                .map_err(map_sql_error)?;
            Ok(usize::try_from(count).unwrap_or_default())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl RequestQueue for SqliteRequestQueue {
    async fn enqueue(&self, message: &InboundMessage) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let message = message.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            insert_message(&conn, &message)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn dequeue(
        &self,
        worker_id: &str,
        lease: Duration,
    ) -> DomainResult<Option<InboundMessage>> {
        let db = Arc::clone(&self.db);
        let worker_id = worker_id.to_string();

        let claimed = task::spawn_blocking(move || -> DomainResult<Option<InboundMessage>> {
            let mut conn = db.get_connection()?;
            claim_next(&mut conn, &worker_id, lease)
        })
        .await
        .map_err(map_join_error)??;

        if let Some(message) = &claimed {
            debug!(message_id = %message.id, delivery = message.delivery_count, "claimed request");
        }
        Ok(claimed)
    }

    async fn renew_lease(
        &self,
        message_id: &str,
        worker_id: &str,
        lease: Duration,
    ) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let message_id = message_id.to_string();
        let worker_id = worker_id.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let expires = lease_deadline(Utc::now().timestamp_millis(), lease);
            let updated = conn
                .execute(
                    "UPDATE request_inbox SET lease_expires_at = ?1
                     WHERE id = ?2 AND claimed_by = ?3",
                    params![expires, message_id, worker_id],
                )
                .map_err(map_sql_error)?;
            Ok(updated > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn acknowledge(&self, message_id: &str) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let message_id = message_id.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute("DELETE FROM request_inbox WHERE id = ?1", params![message_id])
                .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

pub(crate) fn insert_message(conn: &Connection, message: &InboundMessage) -> DomainResult<()> {
    let properties = encode_properties(&message.properties)?;
    conn.execute(
        "INSERT OR REPLACE INTO request_inbox (
            id, body, properties, received_at, delivery_count, claimed_by, lease_expires_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, NULL)",
        params![
            message.id,
            message.body,
            properties,
            format_timestamp(&message.received_at),
            message.delivery_count,
        ],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

fn claim_next(
    conn: &mut Connection,
    worker_id: &str,
    lease: Duration,
) -> DomainResult<Option<InboundMessage>> {
    let now = Utc::now().timestamp_millis();
    let expires = lease_deadline(now, lease);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate).map_err(map_sql_error)?;
    let next = tx
        .query_row(
            "SELECT id, body, properties, received_at, delivery_count
             FROM request_inbox
             WHERE lease_expires_at IS NULL OR lease_expires_at <= ?1
             ORDER BY received_at, rowid
             LIMIT 1",
            params![now],
            map_message_row,
        )
        .optional()
        .map_err(map_sql_error)?;

    let Some((mut message, properties)) = next else {
        return Ok(None);
    };

    tx.execute(
        "UPDATE request_inbox
         SET claimed_by = ?1, lease_expires_at = ?2, delivery_count = delivery_count + 1
         WHERE id = ?3",
        params![worker_id, expires, message.id],
    )
    .map_err(map_sql_error)?;
    tx.commit().map_err(map_sql_error)?;

    message.properties = decode_properties(&properties)?;
    message.delivery_count += 1;
    Ok(Some(message))
}

fn lease_deadline(now_ms: i64, lease: Duration) -> i64 {
    now_ms.saturating_add(i64::try_from(lease.as_millis()).unwrap_or(i64::MAX))
}

/// A message row with its properties still encoded.
pub(crate) fn map_message_row(row: &Row<'_>) -> rusqlite::Result<(InboundMessage, String)> {
    let received_at = parse_column(row, 3, DateTime::parse_from_rfc3339)?.with_timezone(&Utc);
    let message = InboundMessage {
        id: row.get(0)?,
        body: row.get(1)?,
        properties: MessageProperties::new(),
        received_at,
        delivery_count: row.get(4)?,
    };
    Ok((message, row.get(2)?))
}

/// Fixed-width RFC 3339 so stored timestamps sort as text.
pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn encode_properties(properties: &MessageProperties) -> DomainResult<String> {
    serde_json::to_string(properties).map_err(|e| InfraError::from(e).into())
}

pub(crate) fn decode_properties(raw: &str) -> DomainResult<MessageProperties> {
    serde_json::from_str(raw).map_err(|e| InfraError::from(e).into())
}
