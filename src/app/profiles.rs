use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::profile::{NewProfile, Profile};
use crate::infra::store::ProfileStore;

#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn ProfileStore>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    /// Returns `None` if the identity already has a profile.
    pub async fn register(&self, profile: NewProfile) -> Result<Option<Profile>> {
        self.profiles.insert_profile(profile).await
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.profiles.get_profile(user_id).await
    }

    /// Changing the locality only affects incidents reported afterwards.
    pub async fn update(
        &self,
        user_id: Uuid,
        name: Option<String>,
        locality: Option<String>,
    ) -> Result<Option<Profile>> {
        self.profiles.update_profile(user_id, name, locality).await
    }

    pub async fn list(&self) -> Result<Vec<Profile>> {
        self.profiles.list_profiles().await
    }

    pub async fn set_admin(&self, user_id: Uuid, is_admin: bool) -> Result<Option<Profile>> {
        let profile = self.profiles.set_admin(user_id, is_admin).await?;
        if profile.is_some() {
            tracing::info!(user_id = %user_id, is_admin, "admin flag updated");
        }
        Ok(profile)
    }
}
