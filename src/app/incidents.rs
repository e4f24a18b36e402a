use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::incident::{Incident, IncidentStatus, NewIncident};
use crate::domain::notification::NotifyJob;
use crate::domain::profile::Profile;
use crate::infra::queue::JobQueue;
use crate::infra::store::{IncidentStore, ProfileStore};

#[derive(Clone)]
pub struct IncidentService {
    incidents: Arc<dyn IncidentStore>,
    profiles: Arc<dyn ProfileStore>,
    queue: Arc<dyn JobQueue>,
}

#[derive(Debug, Clone)]
pub struct IncidentSubmission {
    pub title: String,
    pub description: String,
    pub location: String,
    pub image_url: String,
    pub user_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusChange {
    #[serde(flatten)]
    pub incident: Incident,
    pub notification_queued: bool,
}

impl IncidentService {
    pub fn new(
        incidents: Arc<dyn IncidentStore>,
        profiles: Arc<dyn ProfileStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            incidents,
            profiles,
            queue,
        }
    }

    /// Files a pending report. The locality is copied from the reporter's
    /// profile now and never recomputed. Returns `None` when the reporter has
    /// no profile or the profile has no locality.
    pub async fn report(
        &self,
        reporter_id: Uuid,
        submission: IncidentSubmission,
    ) -> Result<Option<Incident>> {
        let Some(profile) = self.profiles.get_profile(reporter_id).await? else {
            return Ok(None);
        };
        let Some(locality) = profile_locality(&profile) else {
            return Ok(None);
        };

        let user_name = submission
            .user_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| display_name(&profile));

        let incident = self
            .incidents
            .insert_incident(NewIncident {
                title: submission.title,
                description: submission.description,
                location: submission.location,
                locality: locality.to_string(),
                image_url: submission.image_url,
                user_id: reporter_id,
                user_name,
            })
            .await?;

        tracing::info!(
            incident_id = %incident.id,
            locality = %incident.locality,
            "incident reported"
        );
        Ok(Some(incident))
    }

    pub async fn list_for_reporter(&self, user_id: Uuid) -> Result<Vec<Incident>> {
        self.incidents.list_by_reporter(user_id).await
    }

    /// Approved incidents in the viewer's current locality.
    pub async fn list_for_locality_of(&self, user_id: Uuid) -> Result<Vec<Incident>> {
        let profile = self.profiles.get_profile(user_id).await?;
        match profile.as_ref().and_then(profile_locality) {
            Some(locality) => {
                self.incidents
                    .list_by_locality(locality, IncidentStatus::Approved)
                    .await
            }
            None => Ok(Vec::new()),
        }
    }

    pub async fn list_pending(&self) -> Result<Vec<Incident>> {
        self.incidents.list_by_status(IncidentStatus::Pending).await
    }

    /// Writes the new status, then queues a notify job for approvals. A queue
    /// failure is logged and never undoes the status write.
    pub async fn set_status(
        &self,
        incident_id: Uuid,
        status: IncidentStatus,
    ) -> Result<Option<StatusChange>> {
        let Some(incident) = self.incidents.update_status(incident_id, status).await? else {
            return Ok(None);
        };

        let notification_queued = if status == IncidentStatus::Approved {
            match self.queue.enqueue(&NotifyJob { incident_id }).await {
                Ok(()) => {
                    tracing::info!(incident_id = %incident_id, "notify job queued");
                    true
                }
                Err(err) => {
                    tracing::error!(
                        error = ?err,
                        incident_id = %incident_id,
                        "failed to queue notify job"
                    );
                    false
                }
            }
        } else {
            false
        };

        Ok(Some(StatusChange {
            incident,
            notification_queued,
        }))
    }
}

fn profile_locality(profile: &Profile) -> Option<&str> {
    profile
        .locality
        .as_deref()
        .filter(|locality| !locality.trim().is_empty())
}

fn display_name(profile: &Profile) -> String {
    profile
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .or(profile.email.as_deref())
        .unwrap_or("Anonymous")
        .to_string()
}
