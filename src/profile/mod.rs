//! User profiles, user pages and the explore listing.

use crate::backend::{Backend, ProfileUpdate, Timeslot, UserProfile, PROFILE_CATEGORIES};
use crate::error::{ServiceError, ServiceResult};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Category value meaning "no category filter".
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, Serialize)]
pub struct ProfilePage {
    pub profile: UserProfile,
    pub timeslots: Vec<Timeslot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub profile: UserProfile,
    pub timeslots: Vec<Timeslot>,
    pub is_following: bool,
    pub is_self: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExploreFilter {
    pub category: Option<String>,
    pub q: Option<String>,
}

impl ExploreFilter {
    fn matches(&self, profile: &UserProfile) -> bool {
        if let Some(category) = self.category.as_deref() {
            if category != ALL_CATEGORIES && !category.is_empty() && profile.category != category {
                return false;
            }
        }
        match self.q.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                [&profile.name, &profile.title, &profile.bio]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&q))
            }
            _ => true,
        }
    }
}

pub struct ProfileManager {
    backend: Arc<dyn Backend>,
}

impl ProfileManager {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        ProfileManager { backend }
    }

    pub async fn get(&self, user_id: &str) -> ServiceResult<UserProfile> {
        self.backend
            .get_profile(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("User {}", user_id)))
    }

    pub async fn own_page(&self, user_id: &str) -> ServiceResult<ProfilePage> {
        let profile = self.get(user_id).await?;
        let timeslots = self.backend.list_user_timeslots(user_id).await?;
        Ok(ProfilePage { profile, timeslots })
    }

    pub async fn user_page(&self, viewer_id: Option<&str>, user_id: &str) -> ServiceResult<UserPage> {
        let profile = self.get(user_id).await?;
        let timeslots = self.backend.list_user_timeslots(user_id).await?;
        let is_following = match viewer_id {
            Some(viewer) if viewer != user_id => self.backend.is_following(viewer, user_id).await?,
            _ => false,
        };
        Ok(UserPage {
            profile,
            timeslots,
            is_following,
            is_self: viewer_id == Some(user_id),
        })
    }

    pub async fn update(&self, user_id: &str, update: ProfileUpdate) -> ServiceResult<UserProfile> {
        let name = update.name.trim();
        if name.is_empty() {
            return Err(ServiceError::invalid("name is required"));
        }
        let category = update.category.trim();
        if !PROFILE_CATEGORIES.contains(&category) {
            return Err(ServiceError::invalid(format!("unknown category '{}'", category)));
        }

        let update = ProfileUpdate {
            name: name.to_string(),
            avatar: update.avatar.trim().to_string(),
            title: update.title.trim().to_string(),
            bio: update.bio.trim().to_string(),
            category: category.to_string(),
        };
        let profile = self
            .backend
            .update_profile(user_id, update)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("User {}", user_id)))?;
        info!(user_id, "Updated profile");
        Ok(profile)
    }

    /// Newest profiles first, the viewer left out.
    pub async fn explore(
        &self,
        viewer_id: Option<&str>,
        filter: &ExploreFilter,
    ) -> ServiceResult<Vec<UserProfile>> {
        Ok(self
            .backend
            .list_profiles()
            .await?
            .into_iter()
            .filter(|p| Some(p.id.as_str()) != viewer_id)
            .filter(|p| filter.matches(p))
            .collect())
    }

    pub async fn followers(&self, user_id: &str) -> ServiceResult<Vec<UserProfile>> {
        let ids = self.backend.list_follower_ids(user_id).await?;
        Ok(self.backend.get_profiles(&ids).await?)
    }

    pub async fn following(&self, user_id: &str) -> ServiceResult<Vec<UserProfile>> {
        let ids = self.backend.list_following_ids(user_id).await?;
        Ok(self.backend.get_profiles(&ids).await?)
    }
}
