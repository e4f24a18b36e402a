pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;
pub mod jobs;

use std::sync::Arc;

use crate::app::dispatcher::NotificationDispatcher;
use crate::infra::{
    mailer::Mailer,
    queue::JobQueue,
    store::{IncidentStore, ProfileStore},
};

#[derive(Clone)]
pub struct AppState {
    pub incidents: Arc<dyn IncidentStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub mailer: Arc<dyn Mailer>,
    pub queue: Arc<dyn JobQueue>,
    pub admin_token: Option<String>,
    pub mail_from: String,
    pub notify_send_concurrency: usize,
}

impl AppState {
    pub fn dispatcher(&self) -> NotificationDispatcher {
        NotificationDispatcher::new(
            self.incidents.clone(),
            self.profiles.clone(),
            self.mailer.clone(),
            self.mail_from.clone(),
            self.notify_send_concurrency,
        )
    }
}
