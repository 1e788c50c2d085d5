//! Dead letter table: the durable failure channel.
//!
//! Failed requests are stored verbatim (body, properties, receipt time and
//! delivery count) together with the failure kind and reason. Operators can
//! list them and put one back on the request inbox.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventsync_core::sync::{FailureChannel, SyncFailure};
use eventsync_domain::{DeadLetter, EventSyncError, InboundMessage, Result as DomainResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::task;
use tracing::info;

use super::activity_repository::parse_column;
use super::inbox_repository::{
    decode_properties, encode_properties, format_timestamp, insert_message, map_message_row,
};
use super::manager::{map_sql_error, DbManager};
use crate::errors::map_join_error;

pub struct SqliteFailureChannel {
    db: Arc<DbManager>,
}

impl SqliteFailureChannel {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Dead letters, most recent failure first.
    pub async fn list_dead_letters(&self) -> DomainResult<Vec<DeadLetter>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<DeadLetter>> {
            let conn = db.get_connection()?;
            query_dead_letters(&conn)
        })
        .await
        .map_err(map_join_error)?
    }

    /// Move a dead letter back onto the request inbox, unchanged apart from a
    /// reset delivery count.
    pub async fn resubmit(&self, message_id: &str) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let id = message_id.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            move_to_inbox(&mut conn, &id)
        })
        .await
        .map_err(map_join_error)??;

        info!(message_id, "dead letter resubmitted");
        Ok(())
    }
}

#[async_trait]
impl FailureChannel for SqliteFailureChannel {
    async fn publish(&self, message: &InboundMessage, failure: &SyncFailure) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let letter = DeadLetter {
            message: message.clone(),
            failure_kind: failure.label().to_string(),
            failure_reason: failure.to_string(),
            failed_at: Utc::now(),
        };

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            insert_dead_letter(&conn, &letter)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

const DEAD_LETTER_COLUMNS: &str =
    "id, body, properties, received_at, delivery_count, failure_kind, failure_reason, failed_at";

fn insert_dead_letter(conn: &Connection, letter: &DeadLetter) -> DomainResult<()> {
    let message = &letter.message;
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO dead_letters ({DEAD_LETTER_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ),
        params![
            message.id,
            message.body,
            encode_properties(&message.properties)?,
            format_timestamp(&message.received_at),
            message.delivery_count,
            letter.failure_kind,
            letter.failure_reason,
            format_timestamp(&letter.failed_at),
        ],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

fn query_dead_letters(conn: &Connection) -> DomainResult<Vec<DeadLetter>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {DEAD_LETTER_COLUMNS} FROM dead_letters ORDER BY failed_at DESC, id"
        ))
        .map_err(map_sql_error)?;
    let rows = stmt
        .query_map([], map_dead_letter_row)
        .map_err(map_sql_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sql_error)?;

    rows.into_iter()
        .map(|(mut letter, properties)| {
            letter.message.properties = decode_properties(&properties)?;
            Ok(letter)
        })
        .collect()
}

fn move_to_inbox(conn: &mut Connection, message_id: &str) -> DomainResult<()> {
    let tx = conn.transaction().map_err(map_sql_error)?;
    let row = tx
        .query_row(
            &format!("SELECT {DEAD_LETTER_COLUMNS} FROM dead_letters WHERE id = ?1"),
            params![message_id],
            map_dead_letter_row,
        )
        .optional()
        .map_err(map_sql_error)?;

    let Some((letter, properties)) = row else {
        return Err(EventSyncError::NotFound(format!("dead letter {message_id}")));
    };

    let mut message = letter.message;
    message.properties = decode_properties(&properties)?;
    message.delivery_count = 0;
    insert_message(&tx, &message)?;
    tx.execute("DELETE FROM dead_letters WHERE id = ?1", params![message_id])
        .map_err(map_sql_error)?;
    tx.commit().map_err(map_sql_error)
}

fn map_dead_letter_row(row: &Row<'_>) -> rusqlite::Result<(DeadLetter, String)> {
    let (message, properties) = map_message_row(row)?;
    let failed_at = parse_column(row, 7, DateTime::parse_from_rfc3339)?.with_timezone(&Utc);
    let letter = DeadLetter {
        message,
        failure_kind: row.get(5)?,
        failure_reason: row.get(6)?,
        failed_at,
    };
    Ok((letter, properties))
}
