use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;

use crate::models::error::ApiError;
use crate::models::user::{ProfileUpdate, UserProfile};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        tracing::error!("profile store error: {}", error);
        ApiError::internal(&error.to_string())
    }
}

/// Persistence for user profiles. Every method returns `None` when the user
/// row does not exist.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    async fn update_location(
        &self,
        user_id: &str,
        location: &str,
    ) -> Result<Option<UserProfile>, StoreError>;

    async fn update_fields(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<UserProfile>, StoreError>;
}

const PROFILE_COLUMNS: &str = "id, name, email, image, location, village, district, state";

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn fetch(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            r#"SELECT {PROFILE_COLUMNS} FROM "user" WHERE id = $1 LIMIT 1"#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn update_location(
        &self,
        user_id: &str,
        location: &str,
    ) -> Result<Option<UserProfile>, StoreError> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            r#"UPDATE "user" SET location = $1 WHERE id = $2 RETURNING {PROFILE_COLUMNS}"#
        ))
        .bind(location)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn update_fields(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<UserProfile>, StoreError> {
        let mut query = QueryBuilder::<Postgres>::new(r#"UPDATE "user" SET "#);
        {
            let mut set = query.separated(", ");
            if let Some(name) = &update.name {
                set.push("name = ").push_bind_unseparated(name);
            }
            if let Some(image) = &update.image {
                set.push("image = ").push_bind_unseparated(image.clone());
            }
            if let Some(village) = &update.village {
                set.push("village = ").push_bind_unseparated(village);
            }
            if let Some(district) = &update.district {
                set.push("district = ").push_bind_unseparated(district);
            }
            if let Some(state) = &update.state {
                set.push("state = ").push_bind_unseparated(state);
            }
        }
        query.push(" WHERE id = ").push_bind(user_id);
        query.push(format!(" RETURNING {PROFILE_COLUMNS}"));

        let profile = query
            .build_query_as::<UserProfile>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }
}

/// In-process store used by tests and local runs without a database.
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: DashMap<String, UserProfile>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: UserProfile) {
        self.profiles.insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn fetch(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.get(user_id).map(|p| p.value().clone()))
    }

    async fn update_location(
        &self,
        user_id: &str,
        location: &str,
    ) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.get_mut(user_id).map(|mut profile| {
            profile.location = Some(location.to_string());
            profile.clone()
        }))
    }

    async fn update_fields(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.get_mut(user_id).map(|mut profile| {
            if let Some(name) = &update.name {
                profile.name = name.clone();
            }
            if let Some(image) = &update.image {
                profile.image = image.clone();
            }
            if let Some(village) = &update.village {
                profile.village = Some(village.clone());
            }
            if let Some(district) = &update.district {
                profile.district = Some(district.clone());
            }
            if let Some(state) = &update.state {
                profile.state = Some(state.clone());
            }
            profile.clone()
        }))
    }
}
