use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    pub locality: Option<String>,
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The slice of a profile the locality fan-out needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Recipient {
    /// Address to deliver to, if the profile has a usable one.
    pub fn deliverable_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub locality: String,
}
