use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::error::{MatchError, MatchResult};
use crate::models::ProfileCard;
use crate::services::cache::{CacheKey, CacheManager};
use crate::services::store::ProfileDirectory;

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<AppwriteError> for MatchError {
    fn from(err: AppwriteError) -> Self {
        MatchError::Unavailable(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ProfileDocument {
    #[serde(rename = "userId")]
    user_id: String,
    name: String,
    #[serde(rename = "imageFileIds", default)]
    image_file_ids: Vec<String>,
}

/// Appwrite-backed profile directory
///
/// Only display fields are read; the profile collection itself is owned by
/// the marketplace. Cards are cached through the `CacheManager`.
pub struct AppwriteProfiles {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    profiles_collection: String,
    images_bucket: String,
    client: Client,
    cache: Option<Arc<CacheManager>>,
}

impl AppwriteProfiles {
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        profiles_collection: String,
        images_bucket: String,
        cache: Option<Arc<CacheManager>>,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            profiles_collection,
            images_bucket,
            client,
            cache,
        })
    }

    fn image_url(&self, file_id: &str) -> String {
        format!(
            "{}/storage/buckets/{}/files/{}/view?project={}",
            self.base_url.trim_end_matches('/'),
            self.images_bucket,
            file_id,
            self.project_id
        )
    }

    async fn fetch_cards(&self, uids: &[String]) -> Result<Vec<ProfileCard>, AppwriteError> {
        let queries = vec![
            serde_json::json!({"method": "equal", "attribute": "userId", "values": uids})
                .to_string(),
            serde_json::json!({"method": "limit", "values": [uids.len()]}).to_string(),
        ];

        let query_string = queries
            .iter()
            .map(|q| format!("queries[]={}", urlencoding::encode(q)))
            .collect::<Vec<_>>()
            .join("&");

        let url = format!(
            "{}/databases/{}/collections/{}/documents?{}",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            self.profiles_collection,
            query_string
        );

        tracing::debug!("Fetching {} profile cards", uids.len());

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppwriteError::ApiError(format!(
                "Failed to fetch profiles: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))?;

        let cards = documents
            .iter()
            .filter_map(|doc| {
                let data = doc.get("data").unwrap_or(doc);
                serde_json::from_value::<ProfileDocument>(data.clone()).ok()
            })
            .map(|doc| ProfileCard {
                image_url: doc.image_file_ids.first().map(|id| self.image_url(id)),
                uid: doc.user_id,
                display_name: doc.name,
            })
            .collect();

        Ok(cards)
    }
}

#[async_trait]
impl ProfileDirectory for AppwriteProfiles {
    async fn get_cards(&self, uids: &[String]) -> MatchResult<Vec<ProfileCard>> {
        let mut cards = Vec::with_capacity(uids.len());
        let mut misses = Vec::new();

        for uid in uids {
            match &self.cache {
                Some(cache) => match cache.get::<ProfileCard>(&CacheKey::profile_card(uid)).await {
                    Ok(card) => cards.push(card),
                    Err(_) => misses.push(uid.clone()),
                },
                None => misses.push(uid.clone()),
            }
        }

        if misses.is_empty() {
            return Ok(cards);
        }

        let fetched = self.fetch_cards(&misses).await?;

        if let Some(cache) = &self.cache {
            for card in &fetched {
                if let Err(e) = cache.set(&CacheKey::profile_card(&card.uid), card).await {
                    tracing::warn!("Failed to cache profile card {}: {}", card.uid, e);
                }
            }
        }

        cards.extend(fetched);
        Ok(cards)
    }
}
