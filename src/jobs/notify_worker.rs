use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::app::dispatcher::{DispatchError, NotificationDispatcher};
use crate::infra::queue::{JobQueue, ReceivedJob};

const POLL_WAIT_SECONDS: i32 = 10;
const IDLE_SLEEP_MS: u64 = 200;
const ERROR_BACKOFF_MS: u64 = 1000;

pub async fn run(dispatcher: NotificationDispatcher, queue: Arc<dyn JobQueue>) -> Result<()> {
    info!("notify worker started");
    loop {
        match queue.receive(POLL_WAIT_SECONDS).await {
            Ok(Some(message)) => handle_message(&dispatcher, queue.as_ref(), message).await,
            Ok(None) => {
                tokio::time::sleep(Duration::from_millis(IDLE_SLEEP_MS)).await;
            }
            Err(err) => {
                warn!(error = ?err, "queue receive failed, backing off");
                tokio::time::sleep(Duration::from_millis(ERROR_BACKOFF_MS)).await;
            }
        }
    }
}

/// Runs one dispatch and removes the message whatever the outcome. A
/// redelivered job would email recipients that were already reached.
pub async fn handle_message(
    dispatcher: &NotificationDispatcher,
    queue: &dyn JobQueue,
    message: ReceivedJob,
) {
    let incident_id = message.job.incident_id;
    match dispatcher.dispatch(incident_id).await {
        Ok(summary) => {
            info!(
                incident_id = %incident_id,
                attempted = summary.results.attempted,
                successful = summary.results.successful,
                failed = summary.results.failed,
                "notify job completed"
            );
            for failure in summary.results.details.iter().flatten() {
                warn!(
                    incident_id = %incident_id,
                    email = %failure.email,
                    error = %failure.error,
                    "notification not delivered"
                );
            }
        }
        Err(DispatchError::NotFound(_)) => {
            warn!(incident_id = %incident_id, "incident no longer approved, dropping notify job");
        }
        Err(err) => {
            error!(error = ?err, incident_id = %incident_id, "notify job failed");
        }
    }

    if let Err(err) = queue.delete(&message.receipt_handle).await {
        warn!(error = ?err, "failed to delete queue message");
    }
}
