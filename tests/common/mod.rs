#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use snapper::app::dispatcher::NotificationDispatcher;
use snapper::domain::incident::{Incident, IncidentStatus, NewIncident};
use snapper::domain::notification::NotifyJob;
use snapper::domain::profile::{NewProfile, Profile, Recipient};
use snapper::infra::mailer::{Mailer, OutboundEmail};
use snapper::infra::queue::{JobQueue, ReceivedJob};
use snapper::infra::store::{IncidentStore, ProfileStore};
use snapper::AppState;

const TEST_ADMIN_TOKEN: &str = "test-admin-token-12345";
pub const MAIL_FROM: &str = "Incident Snapper <notifications@example.com>";

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    incidents: Mutex<Vec<Incident>>,
    profiles: Mutex<Vec<Profile>>,
    pub fail_incident_lookup: AtomicBool,
    pub fail_directory: AtomicBool,
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (OffsetDateTime, Uuid)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl IncidentStore for MemoryStore {
    async fn insert_incident(&self, incident: NewIncident) -> Result<Incident> {
        let incident = Incident {
            id: Uuid::new_v4(),
            title: incident.title,
            description: incident.description,
            location: incident.location,
            locality: incident.locality,
            image_url: Some(incident.image_url),
            created_at: OffsetDateTime::now_utc(),
            status: IncidentStatus::Pending,
            user_id: incident.user_id,
            user_name: incident.user_name,
        };
        self.incidents.lock().await.push(incident.clone());
        Ok(incident)
    }

    async fn find_incident(&self, id: Uuid, status: IncidentStatus) -> Result<Option<Incident>> {
        if self.fail_incident_lookup.load(Ordering::SeqCst) {
            return Err(anyhow!("connection reset by peer"));
        }
        let incidents = self.incidents.lock().await;
        Ok(incidents
            .iter()
            .find(|incident| incident.id == id && incident.status == status)
            .cloned())
    }

    async fn list_by_reporter(&self, user_id: Uuid) -> Result<Vec<Incident>> {
        let mut found: Vec<Incident> = self
            .incidents
            .lock()
            .await
            .iter()
            .filter(|incident| incident.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut found, |incident| (incident.created_at, incident.id));
        Ok(found)
    }

    async fn list_by_status(&self, status: IncidentStatus) -> Result<Vec<Incident>> {
        let mut found: Vec<Incident> = self
            .incidents
            .lock()
            .await
            .iter()
            .filter(|incident| incident.status == status)
            .cloned()
            .collect();
        newest_first(&mut found, |incident| (incident.created_at, incident.id));
        Ok(found)
    }

    async fn list_by_locality(
        &self,
        locality: &str,
        status: IncidentStatus,
    ) -> Result<Vec<Incident>> {
        let mut found: Vec<Incident> = self
            .incidents
            .lock()
            .await
            .iter()
            .filter(|incident| incident.locality == locality && incident.status == status)
            .cloned()
            .collect();
        newest_first(&mut found, |incident| (incident.created_at, incident.id));
        Ok(found)
    }

    async fn update_status(&self, id: Uuid, status: IncidentStatus) -> Result<Option<Incident>> {
        let mut incidents = self.incidents.lock().await;
        Ok(incidents
            .iter_mut()
            .find(|incident| incident.id == id)
            .map(|incident| {
                incident.status = status;
                incident.clone()
            }))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn insert_profile(&self, profile: NewProfile) -> Result<Option<Profile>> {
        let mut profiles = self.profiles.lock().await;
        if profiles.iter().any(|existing| existing.id == profile.id) {
            return Ok(None);
        }
        let profile = Profile {
            id: profile.id,
            email: Some(profile.email),
            name: Some(profile.name),
            locality: Some(profile.locality),
            is_admin: false,
            created_at: OffsetDateTime::now_utc(),
        };
        profiles.push(profile.clone());
        Ok(Some(profile))
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        let profiles = self.profiles.lock().await;
        Ok(profiles.iter().find(|profile| profile.id == id).cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<String>,
        locality: Option<String>,
    ) -> Result<Option<Profile>> {
        let mut profiles = self.profiles.lock().await;
        Ok(profiles
            .iter_mut()
            .find(|profile| profile.id == id)
            .map(|profile| {
                if let Some(name) = name {
                    profile.name = Some(name);
                }
                if let Some(locality) = locality {
                    profile.locality = Some(locality);
                }
                profile.clone()
            }))
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let mut profiles = self.profiles.lock().await.clone();
        newest_first(&mut profiles, |profile| (profile.created_at, profile.id));
        Ok(profiles)
    }

    async fn set_admin(&self, id: Uuid, is_admin: bool) -> Result<Option<Profile>> {
        let mut profiles = self.profiles.lock().await;
        Ok(profiles
            .iter_mut()
            .find(|profile| profile.id == id)
            .map(|profile| {
                profile.is_admin = is_admin;
                profile.clone()
            }))
    }

    async fn recipients_in_locality(&self, locality: &str) -> Result<Vec<Recipient>> {
        if self.fail_directory.load(Ordering::SeqCst) {
            return Err(anyhow!("connection reset by peer"));
        }
        let profiles = self.profiles.lock().await;
        Ok(profiles
            .iter()
            .filter(|profile| profile.locality.as_deref() == Some(locality))
            .map(|profile| Recipient {
                email: profile.email.clone(),
                name: profile.name.clone(),
            })
            .collect())
    }
}

impl MemoryStore {
    pub async fn put_profile(&self, profile: Profile) {
        self.profiles.lock().await.push(profile);
    }

    pub async fn put_incident(&self, incident: Incident) {
        self.incidents.lock().await.push(incident);
    }

    pub async fn incident(&self, id: Uuid) -> Option<Incident> {
        let incidents = self.incidents.lock().await;
        incidents.iter().find(|incident| incident.id == id).cloned()
    }

    pub async fn incident_count(&self) -> usize {
        self.incidents.lock().await.len()
    }
}

// ---------------------------------------------------------------------------
// Recording mailer
// ---------------------------------------------------------------------------

/// Records every send attempt; addresses in `rejections` fail with the mapped
/// error text.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    rejections: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<String> {
        self.sent.lock().await.push(email.clone());
        if let Some(error) = self.rejections.lock().await.get(&email.to) {
            return Err(anyhow!(error.clone()));
        }
        Ok(Uuid::new_v4().to_string())
    }
}

impl RecordingMailer {
    pub async fn reject(&self, address: &str, error: &str) {
        self.rejections
            .lock()
            .await
            .insert(address.to_string(), error.to_string());
    }

    pub async fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().await.clone()
    }

    pub async fn recipients(&self) -> Vec<String> {
        let mut to: Vec<String> = self.sent().await.into_iter().map(|email| email.to).collect();
        to.sort();
        to
    }
}

// ---------------------------------------------------------------------------
// In-memory queue
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryQueue {
    pending: Mutex<VecDeque<(String, NotifyJob)>>,
    deleted: Mutex<Vec<String>>,
    next_handle: AtomicU64,
    pub fail_enqueue: AtomicBool,
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: &NotifyJob) -> Result<()> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(anyhow!("queue unavailable"));
        }
        let handle = format!("receipt-{}", self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.pending.lock().await.push_back((handle, job.clone()));
        Ok(())
    }

    async fn receive(&self, _wait_time_seconds: i32) -> Result<Option<ReceivedJob>> {
        Ok(self
            .pending
            .lock()
            .await
            .pop_front()
            .map(|(receipt_handle, job)| ReceivedJob {
                job,
                receipt_handle,
            }))
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        self.deleted.lock().await.push(receipt_handle.to_string());
        Ok(())
    }
}

impl MemoryQueue {
    pub async fn jobs(&self) -> Vec<NotifyJob> {
        self.pending
            .lock()
            .await
            .iter()
            .map(|(_, job)| job.clone())
            .collect()
    }

    pub async fn deleted(&self) -> Vec<String> {
        self.deleted.lock().await.clone()
    }
}

// ---------------------------------------------------------------------------
// TestApp, built fresh per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub queue: Arc<MemoryQueue>,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub fn app() -> TestApp {
    TestApp::new()
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let queue = Arc::new(MemoryQueue::default());

        let state = AppState {
            incidents: store.clone(),
            profiles: store.clone(),
            mailer: mailer.clone(),
            queue: queue.clone(),
            admin_token: Some(TEST_ADMIN_TOKEN.to_string()),
            mail_from: MAIL_FROM.to_string(),
            notify_send_concurrency: 1,
        };

        let router = snapper::http::router(state.clone());

        TestApp {
            router,
            state,
            store,
            mailer,
            queue,
        }
    }

    pub fn dispatcher(&self) -> NotificationDispatcher {
        self.state.dispatcher()
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, user: Option<Uuid>) -> TestResponse {
        let id = user.map(|id| id.to_string());
        let mut headers = vec![];
        if let Some(id) = id.as_deref() {
            headers.push(("x-user-id", id));
        }
        self.request(Method::GET, path, None, &headers).await
    }

    pub async fn post_json(&self, path: &str, body: Value, user: Option<Uuid>) -> TestResponse {
        let id = user.map(|id| id.to_string());
        let mut headers = vec![];
        if let Some(id) = id.as_deref() {
            headers.push(("x-user-id", id));
        }
        self.request(Method::POST, path, Some(body), &headers).await
    }

    pub async fn patch_json(&self, path: &str, body: Value, user: Option<Uuid>) -> TestResponse {
        let id = user.map(|id| id.to_string());
        let mut headers = vec![];
        if let Some(id) = id.as_deref() {
            headers.push(("x-user-id", id));
        }
        self.request(Method::PATCH, path, Some(body), &headers).await
    }

    /// POST with a service token in the x-admin-token header.
    pub async fn post_service(
        &self,
        path: &str,
        body: Value,
        admin_token: Option<&str>,
    ) -> TestResponse {
        let mut headers = vec![];
        if let Some(t) = admin_token {
            headers.push(("x-admin-token", t));
        }
        self.request(Method::POST, path, Some(body), &headers).await
    }

    pub fn admin_token(&self) -> &str {
        TEST_ADMIN_TOKEN
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Insert a profile directly into the store. Returns its id.
    pub async fn create_profile(&self, email: Option<&str>, locality: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store
            .put_profile(Profile {
                id,
                email: email.map(str::to_string),
                name: email.map(|email| format!("User {}", email)),
                locality: Some(locality.to_string()),
                is_admin: false,
                created_at: OffsetDateTime::now_utc(),
            })
            .await;
        id
    }

    pub async fn create_admin(&self, locality: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store
            .put_profile(Profile {
                id,
                email: Some(format!("admin_{}@example.com", id.simple())),
                name: Some("Admin".to_string()),
                locality: Some(locality.to_string()),
                is_admin: true,
                created_at: OffsetDateTime::now_utc(),
            })
            .await;
        id
    }

    /// Insert an incident directly into the store with the given status.
    pub async fn create_incident(&self, locality: &str, status: IncidentStatus) -> Incident {
        let incident = Incident {
            id: Uuid::new_v4(),
            title: "Pothole".to_string(),
            description: "Large pothole".to_string(),
            location: "5th & Main".to_string(),
            locality: locality.to_string(),
            image_url: Some("https://cdn.example.com/incidents/pothole.jpg".to_string()),
            created_at: OffsetDateTime::now_utc(),
            status,
            user_id: Uuid::new_v4(),
            user_name: "Reporter".to_string(),
        };
        self.store.put_incident(incident.clone()).await;
        incident
    }
}
