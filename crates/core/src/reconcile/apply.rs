//! Applies a reconciliation to the remote calendar.
//!
//! Items are independent: a failed write is recorded and the engine moves on.
//! Successful writes are never rolled back.

use std::time::Duration;

use eventsync_common::time::with_deadline;
use eventsync_domain::{EventSyncError, RemoteEvent};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::calendar_ports::RemoteCalendar;
use crate::sync::errors::{FailedOperation, OperationKind, PartialFailure};

/// Writes that succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

impl ApplyReport {
    pub fn applied(&self) -> usize {
        self.created + self.updated + self.removed
    }

    fn record(&mut self, kind: OperationKind) {
        match kind {
            OperationKind::Create => self.created += 1,
            OperationKind::Update => self.updated += 1,
            OperationKind::Remove => self.removed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ApplyEngine {
    write_timeout: Duration,
    concurrency: usize,
}

impl Default for ApplyEngine {
    fn default() -> Self {
        Self { write_timeout: Duration::from_secs(15), concurrency: 4 }
    }
}

impl ApplyEngine {
    pub fn new(write_timeout: Duration, concurrency: usize) -> Self {
        Self { write_timeout, concurrency: concurrency.max(1) }
    }

    /// Create, update and remove events in `calendar_id`.
    ///
    /// Returns the counts of successful writes, or a [`PartialFailure`]
    /// listing every failed write alongside them. A write that exceeds the
    /// write timeout counts as failed.
    #[instrument(
        skip_all,
        fields(
            calendar = %calendar_id,
            create = to_create.len(),
            update = to_update.len(),
            remove = to_remove.len()
        )
    )]
    pub async fn synchronize(
        &self,
        calendar: &dyn RemoteCalendar,
        calendar_id: &str,
        to_create: Vec<RemoteEvent>,
        to_update: Vec<RemoteEvent>,
        to_remove: Vec<RemoteEvent>,
    ) -> Result<ApplyReport, PartialFailure> {
        let operations = to_create
            .into_iter()
            .map(|e| (OperationKind::Create, e))
            .chain(to_remove.into_iter().map(|e| (OperationKind::Remove, e)))
            .chain(to_update.into_iter().map(|e| (OperationKind::Update, e)));

        let outcomes: Vec<(OperationKind, RemoteEvent, Result<(), EventSyncError>)> =
            stream::iter(operations)
                .map(|(kind, event)| async move {
                    let outcome = self.apply_one(calendar, calendar_id, kind, &event).await;
                    (kind, event, outcome)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut report = ApplyReport::default();
        let mut failures = Vec::new();

        for (kind, event, outcome) in outcomes {
            match outcome {
                Ok(()) => {
                    debug!(operation = %kind, event = %event.describe(), "remote write applied");
                    report.record(kind);
                }
                Err(error) => {
                    warn!(
                        operation = %kind,
                        event = %event.describe(),
                        error = %error,
                        "remote write failed"
                    );
                    failures.push(FailedOperation {
                        kind,
                        key: event.correlation_key(),
                        event_id: event.id.clone(),
                        summary: event.summary.clone(),
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(PartialFailure { report, failures })
        }
    }

    async fn apply_one(
        &self,
        calendar: &dyn RemoteCalendar,
        calendar_id: &str,
        kind: OperationKind,
        event: &RemoteEvent,
    ) -> Result<(), EventSyncError> {
        let write = async {
            match kind {
                OperationKind::Create => calendar.insert_event(calendar_id, event).await.map(drop),
                OperationKind::Update => calendar.update_event(calendar_id, event).await.map(drop),
                OperationKind::Remove => match event.id.as_deref() {
                    Some(id) => calendar.delete_event(calendar_id, id).await,
                    None => Err(EventSyncError::InvalidInput(
                        "cannot remove an event without provider id".to_string(),
                    )),
                },
            }
        };

        with_deadline("remote write", self.write_timeout, write)
            .await
            .map_err(|e| EventSyncError::Timeout(e.to_string()))?
    }
}
