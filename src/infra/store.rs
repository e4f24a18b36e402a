use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::incident::{Incident, IncidentStatus, NewIncident};
use crate::domain::profile::{NewProfile, Profile, Recipient};

/// Persisted incident reports.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    async fn insert_incident(&self, incident: NewIncident) -> Result<Incident>;

    /// Returns the incident only if it currently has `status`.
    async fn find_incident(&self, id: Uuid, status: IncidentStatus) -> Result<Option<Incident>>;

    async fn list_by_reporter(&self, user_id: Uuid) -> Result<Vec<Incident>>;

    async fn list_by_status(&self, status: IncidentStatus) -> Result<Vec<Incident>>;

    async fn list_by_locality(
        &self,
        locality: &str,
        status: IncidentStatus,
    ) -> Result<Vec<Incident>>;

    async fn update_status(&self, id: Uuid, status: IncidentStatus) -> Result<Option<Incident>>;

    async fn ping(&self) -> Result<()>;
}

/// Persisted user profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns `None` when a profile with this id already exists.
    async fn insert_profile(&self, profile: NewProfile) -> Result<Option<Profile>>;

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>>;

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        locality: Option<String>,
    ) -> Result<Option<Profile>>;

    async fn list_profiles(&self) -> Result<Vec<Profile>>;

    async fn set_admin(&self, id: Uuid, is_admin: bool) -> Result<Option<Profile>>;

    /// Every profile whose locality equals `locality` byte for byte.
    async fn recipients_in_locality(&self, locality: &str) -> Result<Vec<Recipient>>;
}
