use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::incident::{Incident, IncidentStatus, NewIncident};
use crate::domain::profile::{NewProfile, Profile, Recipient};
use crate::infra::store::{IncidentStore, ProfileStore};

const INCIDENT_COLUMNS: &str = "id, title, description, location, locality, image_url, \
     created_at, status::text AS status, user_id, user_name";

const PROFILE_COLUMNS: &str = "id, email, name, locality, is_admin, created_at";

#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.db_idle_timeout_seconds))
            .max_lifetime(Duration::from_secs(config.db_max_lifetime_seconds))
            .connect(&config.database_url)
            .await?;
        Ok(Self { pool })
    }
}

fn incident_from_row(row: &PgRow) -> Result<Incident> {
    let status: String = row.get("status");
    let status = IncidentStatus::from_db(&status)
        .ok_or_else(|| anyhow!("unknown incident status: {}", status))?;

    Ok(Incident {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        location: row.get("location"),
        locality: row.get("locality"),
        image_url: row.get("image_url"),
        created_at: row.get("created_at"),
        status,
        user_id: row.get("user_id"),
        user_name: row.get("user_name"),
    })
}

fn incidents_from_rows(rows: Vec<PgRow>) -> Result<Vec<Incident>> {
    let mut incidents = Vec::with_capacity(rows.len());
    for row in rows {
        incidents.push(incident_from_row(&row)?);
    }
    Ok(incidents)
}

fn profile_from_row(row: &PgRow) -> Profile {
    Profile {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        locality: row.get("locality"),
        is_admin: row.get("is_admin"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl IncidentStore for Db {
    async fn insert_incident(&self, incident: NewIncident) -> Result<Incident> {
        let row = sqlx::query(&format!(
            "INSERT INTO incidents (title, description, location, locality, image_url, status, user_id, user_name) \
             VALUES ($1, $2, $3, $4, $5, $6::incident_status, $7, $8) \
             RETURNING {}",
            INCIDENT_COLUMNS
        ))
        .bind(incident.title)
        .bind(incident.description)
        .bind(incident.location)
        .bind(incident.locality)
        .bind(incident.image_url)
        .bind(IncidentStatus::Pending.as_db())
        .bind(incident.user_id)
        .bind(incident.user_name)
        .fetch_one(&self.pool)
        .await?;

        incident_from_row(&row)
    }

    async fn find_incident(&self, id: Uuid, status: IncidentStatus) -> Result<Option<Incident>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM incidents WHERE id = $1 AND status = $2::incident_status",
            INCIDENT_COLUMNS
        ))
        .bind(id)
        .bind(status.as_db())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(incident_from_row).transpose()
    }

    async fn list_by_reporter(&self, user_id: Uuid) -> Result<Vec<Incident>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM incidents \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC",
            INCIDENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        incidents_from_rows(rows)
    }

    async fn list_by_status(&self, status: IncidentStatus) -> Result<Vec<Incident>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM incidents \
             WHERE status = $1::incident_status \
             ORDER BY created_at DESC, id DESC",
            INCIDENT_COLUMNS
        ))
        .bind(status.as_db())
        .fetch_all(&self.pool)
        .await?;

        incidents_from_rows(rows)
    }

    async fn list_by_locality(
        &self,
        locality: &str,
        status: IncidentStatus,
    ) -> Result<Vec<Incident>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM incidents \
             WHERE locality = $1 AND status = $2::incident_status \
             ORDER BY created_at DESC, id DESC",
            INCIDENT_COLUMNS
        ))
        .bind(locality)
        .bind(status.as_db())
        .fetch_all(&self.pool)
        .await?;

        incidents_from_rows(rows)
    }

    async fn update_status(&self, id: Uuid, status: IncidentStatus) -> Result<Option<Incident>> {
        let row = sqlx::query(&format!(
            "UPDATE incidents SET status = $2::incident_status WHERE id = $1 RETURNING {}",
            INCIDENT_COLUMNS
        ))
        .bind(id)
        .bind(status.as_db())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(incident_from_row).transpose()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for Db {
    async fn insert_profile(&self, profile: NewProfile) -> Result<Option<Profile>> {
        let row = sqlx::query(&format!(
            "INSERT INTO profiles (id, email, name, locality) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO NOTHING \
             RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(profile.id)
        .bind(profile.email)
        .bind(profile.name)
        .bind(profile.locality)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(profile_from_row))
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM profiles WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(profile_from_row))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        locality: Option<String>,
    ) -> Result<Option<Profile>> {
        let row = sqlx::query(&format!(
            "UPDATE profiles \
             SET name = COALESCE($2, name), \
                 locality = COALESCE($3, locality) \
             WHERE id = $1 \
             RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .bind(name)
        .bind(locality)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(profile_from_row))
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM profiles ORDER BY created_at DESC, id DESC",
            PROFILE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(profile_from_row).collect())
    }

    async fn set_admin(&self, id: Uuid, is_admin: bool) -> Result<Option<Profile>> {
        let row = sqlx::query(&format!(
            "UPDATE profiles SET is_admin = $2 WHERE id = $1 RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .bind(is_admin)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(profile_from_row))
    }

    async fn recipients_in_locality(&self, locality: &str) -> Result<Vec<Recipient>> {
        let rows = sqlx::query("SELECT email, name FROM profiles WHERE locality = $1")
            .bind(locality)
            .fetch_all(&self.pool)
            .await?;

        let recipients = rows
            .into_iter()
            .map(|row| Recipient {
                email: row.get("email"),
                name: row.get("name"),
            })
            .collect();

        Ok(recipients)
    }
}
