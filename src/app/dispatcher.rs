use futures::stream::{self, StreamExt};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::alert_email;
use crate::domain::incident::{Incident, IncidentStatus};
use crate::domain::notification::{DeliveryOutcome, DeliveryResults, DispatchSummary};
use crate::infra::mailer::{Mailer, OutboundEmail};
use crate::infra::store::{IncidentStore, ProfileStore};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("incident {0} not found or not approved")]
    NotFound(Uuid),
    #[error("failed to fetch incident: {0}")]
    IncidentLookup(anyhow::Error),
    #[error("failed to fetch users in locality: {0}")]
    Directory(anyhow::Error),
}

/// Emails every profile in an approved incident's locality.
///
/// Holds no state between calls: dispatching the same incident twice sends
/// every recipient two emails.
#[derive(Clone)]
pub struct NotificationDispatcher {
    incidents: Arc<dyn IncidentStore>,
    profiles: Arc<dyn ProfileStore>,
    mailer: Arc<dyn Mailer>,
    from: String,
    send_concurrency: usize,
}

impl NotificationDispatcher {
    pub fn new(
        incidents: Arc<dyn IncidentStore>,
        profiles: Arc<dyn ProfileStore>,
        mailer: Arc<dyn Mailer>,
        from: String,
        send_concurrency: usize,
    ) -> Self {
        Self {
            incidents,
            profiles,
            mailer,
            from,
            send_concurrency: send_concurrency.max(1),
        }
    }

    pub async fn dispatch(&self, incident_id: Uuid) -> Result<DispatchSummary, DispatchError> {
        let incident = self
            .incidents
            .find_incident(incident_id, IncidentStatus::Approved)
            .await
            .map_err(DispatchError::IncidentLookup)?
            .ok_or(DispatchError::NotFound(incident_id))?;

        info!(
            incident_id = %incident.id,
            locality = %incident.locality,
            "dispatching locality notifications"
        );

        let recipients = self
            .profiles
            .recipients_in_locality(&incident.locality)
            .await
            .map_err(DispatchError::Directory)?;

        if recipients.is_empty() {
            info!(locality = %incident.locality, "no users found in locality");
            return Ok(DispatchSummary {
                success: true,
                message: "No users found in locality".to_string(),
                results: DeliveryResults::default(),
            });
        }

        let matched = recipients.len();
        let deliverable: Vec<(String, Option<String>)> = recipients
            .into_iter()
            .filter_map(|recipient| {
                let email = recipient.deliverable_email().map(str::to_string);
                if email.is_none() {
                    debug!("skipping recipient with no email");
                }
                email.map(|email| (email, recipient.name))
            })
            .collect();

        let outcomes: Vec<DeliveryOutcome> = stream::iter(deliverable)
            .map(|(email, name)| self.deliver(&incident, email, name))
            .buffer_unordered(self.send_concurrency)
            .collect()
            .await;

        let results = DeliveryResults::from_outcomes(outcomes);
        info!(
            incident_id = %incident.id,
            matched,
            attempted = results.attempted,
            successful = results.successful,
            failed = results.failed,
            "email sending complete"
        );

        Ok(DispatchSummary {
            success: true,
            message: format!(
                "Email sending attempted for {} users in {}",
                matched, incident.locality
            ),
            results,
        })
    }

    async fn deliver(
        &self,
        incident: &Incident,
        email: String,
        name: Option<String>,
    ) -> DeliveryOutcome {
        let html = match alert_email::render_body(incident, name.as_deref()) {
            Ok(html) => html,
            Err(err) => {
                error!(error = ?err, email = %email, "failed to render alert email");
                return DeliveryOutcome {
                    email,
                    error: Some(err.to_string()),
                };
            }
        };

        let message = OutboundEmail {
            from: self.from.clone(),
            to: email.clone(),
            subject: alert_email::subject(incident),
            html,
        };

        match self.mailer.send(&message).await {
            Ok(message_id) => {
                debug!(email = %email, message_id = %message_id, "email sent");
                DeliveryOutcome { email, error: None }
            }
            Err(err) => {
                error!(error = ?err, email = %email, "failed to send email");
                let error = err.to_string();
                if error.contains("domain") {
                    warn!("sender domain may be unverified with the email provider");
                }
                DeliveryOutcome {
                    email,
                    error: Some(error),
                }
            }
        }
    }
}
