//! Request consumer: decode, synchronize, route failures.

use std::sync::Arc;

use eventsync_common::error::ErrorClassification;
use eventsync_domain::{EventSyncError, InboundMessage};
use tracing::{error, info, instrument, warn};

use super::errors::SyncFailure;
use super::ports::FailureChannel;
use super::request::decode_request;
use super::service::{SyncReport, SyncService};

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Completed(SyncReport),
    /// The request failed and was handed to the failure channel unchanged.
    RoutedToFailureChannel { kind: &'static str, retryable: bool },
}

impl ProcessOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

pub struct RequestConsumer {
    service: Arc<SyncService>,
    failures: Arc<dyn FailureChannel>,
}

impl RequestConsumer {
    pub fn new(service: Arc<SyncService>, failures: Arc<dyn FailureChannel>) -> Self {
        Self { service, failures }
    }

    /// Process one message to completion.
    ///
    /// Every failure of the request itself ends up on the failure channel and
    /// yields `Ok`. `Err` means the failure could not be published either;
    /// the caller must then leave the message unacknowledged so it is
    /// delivered again.
    #[instrument(skip_all, fields(message_id = %message.id, delivery = message.delivery_count))]
    pub async fn process(&self, message: &InboundMessage) -> Result<ProcessOutcome, EventSyncError> {
        let failure = match decode_request(message) {
            Err(invalid) => SyncFailure::from(invalid),
            Ok(request) => match self.service.synchronize(&request).await {
                Ok(report) => {
                    info!(
                        organisation = %request.organisation_name,
                        calendar = %request.calendar_identifier,
                        requested_by = %request.active_membership_alias,
                        created = report.created,
                        updated = report.updated,
                        removed = report.removed,
                        "request completed"
                    );
                    return Ok(ProcessOutcome::Completed(report));
                }
                Err(failure) => failure,
            },
        };

        self.log_failure(&failure);
        self.failures.publish(message, &failure).await.map_err(|e| {
            error!(error = %e, kind = failure.label(), "failure channel rejected message");
            e
        })?;

        Ok(ProcessOutcome::RoutedToFailureChannel {
            kind: failure.label(),
            retryable: failure.is_retryable(),
        })
    }

    fn log_failure(&self, failure: &SyncFailure) {
        let severity = failure.severity();
        match failure {
            SyncFailure::PartialFailure(partial) => {
                for item in &partial.failures {
                    warn!(operation = %item.kind, error = %item.error, "{item}");
                }
                error!(
                    failed = partial.failures.len(),
                    applied = partial.report.applied(),
                    %severity,
                    "request partially applied"
                );
            }
            SyncFailure::Validation(_) | SyncFailure::TransientRead { .. } => {
                warn!(kind = failure.label(), %severity, error = %failure, "request failed");
            }
            _ => {
                error!(kind = failure.label(), %severity, error = %failure, "request failed");
            }
        }
    }
}
