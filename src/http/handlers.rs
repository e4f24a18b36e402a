use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::app::dispatcher::DispatchError;
use crate::app::incidents::{IncidentService, IncidentSubmission, StatusChange};
use crate::app::profiles::ProfileService;
use crate::domain::incident::{Incident, IncidentStatus};
use crate::domain::notification::DispatchSummary;
use crate::domain::profile::{NewProfile, Profile};
use crate::http::{AdminUser, AppError, AuthUser, ServiceToken};
use crate::AppState;

const MAX_TITLE_LEN: usize = 200;
const MAX_TEXT_LEN: usize = 5000;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.incidents.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

fn incident_service(state: &AppState) -> IncidentService {
    IncidentService::new(
        state.incidents.clone(),
        state.profiles.clone(),
        state.queue.clone(),
    )
}

fn required(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request(format!("{} is required", field)));
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct RegisterProfileRequest {
    pub email: String,
    pub name: String,
    pub locality: String,
}

pub async fn register_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<RegisterProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    required(&payload.email, "email")?;
    required(&payload.name, "name")?;
    required(&payload.locality, "locality")?;
    if !payload.email.contains('@') {
        return Err(AppError::bad_request("email is invalid"));
    }

    let service = ProfileService::new(state.profiles.clone());
    let profile = service
        .register(NewProfile {
            id: auth.user_id,
            email: payload.email.trim().to_string(),
            name: payload.name,
            locality: payload.locality,
        })
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to register profile");
            AppError::internal("failed to register profile")
        })?;

    profile
        .map(Json)
        .ok_or_else(|| AppError::conflict("profile already exists"))
}

pub async fn get_my_profile(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Profile>, AppError> {
    let service = ProfileService::new(state.profiles.clone());
    let profile = service.get(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to get profile");
        AppError::internal("failed to get profile")
    })?;

    profile
        .map(Json)
        .ok_or_else(|| AppError::not_found("profile not found"))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub locality: Option<String>,
}

pub async fn update_my_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    if payload.name.is_none() && payload.locality.is_none() {
        return Err(AppError::bad_request("name or locality is required"));
    }
    if let Some(name) = payload.name.as_deref() {
        required(name, "name")?;
    }
    if let Some(locality) = payload.locality.as_deref() {
        required(locality, "locality")?;
    }

    let service = ProfileService::new(state.profiles.clone());
    let profile = service
        .update(auth.user_id, payload.name, payload.locality)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to update profile");
            AppError::internal("failed to update profile")
        })?;

    profile
        .map(Json)
        .ok_or_else(|| AppError::not_found("profile not found"))
}

pub async fn list_profiles(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Profile>>, AppError> {
    let service = ProfileService::new(state.profiles.clone());
    let profiles = service.list().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list profiles");
        AppError::internal("failed to list profiles")
    })?;

    Ok(Json(profiles))
}

#[derive(Deserialize)]
pub struct SetAdminRequest {
    pub is_admin: bool,
}

pub async fn set_admin_flag(
    admin: AdminUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<SetAdminRequest>,
) -> Result<Json<Profile>, AppError> {
    if id == admin.user_id {
        return Err(AppError::bad_request("cannot change your own admin status"));
    }

    let service = ProfileService::new(state.profiles.clone());
    let profile = service
        .set_admin(id, payload.is_admin)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, actor_id = %admin.user_id, target_id = %id, "failed to update admin flag");
            AppError::internal("failed to update admin flag")
        })?;

    profile
        .map(Json)
        .ok_or_else(|| AppError::not_found("profile not found"))
}

#[derive(Deserialize)]
pub struct ReportIncidentRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub image_url: String,
    pub user_name: Option<String>,
}

pub async fn report_incident(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ReportIncidentRequest>,
) -> Result<Json<Incident>, AppError> {
    required(&payload.title, "title")?;
    required(&payload.description, "description")?;
    required(&payload.location, "location")?;
    required(&payload.image_url, "image_url")?;
    if payload.title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::bad_request("title must be at most 200 characters"));
    }
    if payload.description.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::bad_request(
            "description must be at most 5000 characters",
        ));
    }

    let image_url = Url::parse(payload.image_url.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .ok_or_else(|| AppError::bad_request("image_url must be an absolute http(s) URL"))?;

    let service = incident_service(&state);
    let incident = service
        .report(
            auth.user_id,
            IncidentSubmission {
                title: payload.title,
                description: payload.description,
                location: payload.location,
                image_url: image_url.to_string(),
                user_name: payload.user_name,
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to report incident");
            AppError::internal("failed to report incident")
        })?;

    incident.map(Json).ok_or_else(|| {
        AppError::bad_request("a profile with a locality is required to report incidents")
    })
}

pub async fn list_my_incidents(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Incident>>, AppError> {
    let incidents = incident_service(&state)
        .list_for_reporter(auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to list incidents");
            AppError::internal("failed to list incidents")
        })?;

    Ok(Json(incidents))
}

pub async fn list_locality_incidents(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Incident>>, AppError> {
    let incidents = incident_service(&state)
        .list_for_locality_of(auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to list locality incidents");
            AppError::internal("failed to list locality incidents")
        })?;

    Ok(Json(incidents))
}

pub async fn list_pending_incidents(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Incident>>, AppError> {
    let incidents = incident_service(&state)
        .list_pending()
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list pending incidents");
            AppError::internal("failed to list pending incidents")
        })?;

    Ok(Json(incidents))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: IncidentStatus,
}

pub async fn update_incident_status(
    admin: AdminUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<StatusChange>, AppError> {
    if payload.status == IncidentStatus::Pending {
        return Err(AppError::bad_request("status must be approved or rejected"));
    }

    let change = incident_service(&state)
        .set_status(id, payload.status)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, actor_id = %admin.user_id, incident_id = %id, "failed to update incident status");
            AppError::internal("failed to update incident status")
        })?;

    change
        .map(Json)
        .ok_or_else(|| AppError::not_found("incident not found"))
}

#[derive(Deserialize)]
pub struct NotifyRequest {
    #[serde(rename = "incidentId")]
    pub incident_id: String,
}

pub async fn notify_locality(
    _service: ServiceToken,
    State(state): State<AppState>,
    Json(payload): Json<NotifyRequest>,
) -> Result<Json<DispatchSummary>, AppError> {
    tracing::info!(incident_id = %payload.incident_id, "received request to notify for incident");

    let incident_id = Uuid::parse_str(payload.incident_id.trim())
        .map_err(|_| AppError::not_found("Incident not found or not approved"))?;

    match state.dispatcher().dispatch(incident_id).await {
        Ok(summary) => Ok(Json(summary)),
        Err(DispatchError::NotFound(_)) => {
            Err(AppError::not_found("Incident not found or not approved"))
        }
        Err(err @ DispatchError::IncidentLookup(_)) => {
            tracing::error!(error = %err, incident_id = %incident_id, "failed to fetch incident");
            Err(AppError::internal("Error fetching incident"))
        }
        Err(err @ DispatchError::Directory(_)) => {
            tracing::error!(error = %err, incident_id = %incident_id, "failed to fetch users");
            Err(AppError::internal("Error fetching users in locality"))
        }
    }
}
