//! HTTP client for the gallery server (JSON over reqwest)

use super::{AssetDeletion, AssetQuery, DeleteOutcome, FaceService, MergeOutcome};
use crate::cache::{CacheKey, Page, PageItems, Resource};
use crate::config::ServerConfig;
use crate::error::GalleryError;
use crate::types::{Asset, AssetId, Face, FaceId, Person, PersonId};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub struct HttpGalleryClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct PageResponse<T> {
    items: T,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct DeleteResponse {
    success: bool,
    #[serde(default)]
    read_only: bool,
    #[serde(default)]
    path: Option<String>,
}

impl HttpGalleryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GalleryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GalleryError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, GalleryError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn resource_path(resource: &Resource) -> String {
        match resource {
            Resource::Assets => "/api/assets".to_string(),
            Resource::People => "/api/people".to_string(),
            Resource::UnassignedFaces => "/api/faces/unassigned".to_string(),
            Resource::FaceProgress => "/api/faces/progress".to_string(),
            Resource::Named(name) => format!("/api/{}", name),
        }
    }

    async fn parse_page<T: DeserializeOwned>(
        response: Response,
    ) -> Result<PageResponse<T>, GalleryError> {
        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| GalleryError::Transport(format!("Failed to parse page: {}", e)))
    }
}

async fn check_status(response: Response) -> Result<Response, GalleryError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(GalleryError::Transport(format!(
        "Server returned {}: {}",
        status, body
    )))
}

#[async_trait]
impl AssetQuery for HttpGalleryClient {
    async fn fetch_page(
        &self,
        key: &CacheKey,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<Page, GalleryError> {
        let url = format!("{}{}", self.base_url, Self::resource_path(key.resource()));
        let mut query = key.query_pairs();
        query.push(("limit".to_string(), page_size.to_string()));
        if let Some(cursor) = cursor {
            query.push(("cursor".to_string(), cursor.to_string()));
        }
        debug!(url = %url, key = %key, "Fetching page");

        let response = self.client.get(&url).query(&query).send().await?;
        let page = match key.resource() {
            Resource::Assets | Resource::Named(_) => {
                let page: PageResponse<Vec<Asset>> = Self::parse_page(response).await?;
                Page {
                    items: PageItems::Assets(page.items),
                    next_cursor: page.next_cursor,
                }
            }
            Resource::People => {
                let page: PageResponse<Vec<Person>> = Self::parse_page(response).await?;
                Page {
                    items: PageItems::People(page.items),
                    next_cursor: page.next_cursor,
                }
            }
            Resource::UnassignedFaces => {
                let page: PageResponse<Vec<Face>> = Self::parse_page(response).await?;
                Page {
                    items: PageItems::Faces(page.items),
                    next_cursor: page.next_cursor,
                }
            }
            Resource::FaceProgress => {
                let summary: serde_json::Value = check_status(response).await?.json().await?;
                Page {
                    items: PageItems::Summary(summary),
                    next_cursor: None,
                }
            }
        };
        Ok(page)
    }
}

#[async_trait]
impl FaceService for HttpGalleryClient {
    async fn faces_for_asset(&self, asset_id: AssetId) -> Result<Vec<Face>, GalleryError> {
        let url = format!("{}/api/assets/{}/faces", self.base_url, asset_id);
        let response = self.client.get(&url).send().await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn assign_face(
        &self,
        face_id: FaceId,
        person_id: Option<PersonId>,
    ) -> Result<(), GalleryError> {
        let url = format!("{}/api/faces/{}", self.base_url, face_id);
        let response = self
            .client
            .put(&url)
            .json(&json!({ "person_id": person_id }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn merge_person(
        &self,
        source: PersonId,
        target: PersonId,
    ) -> Result<MergeOutcome, GalleryError> {
        let url = format!("{}/api/people/{}/merge", self.base_url, source);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "target_id": target }))
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }
}

#[async_trait]
impl AssetDeletion for HttpGalleryClient {
    async fn delete_asset(
        &self,
        asset_id: AssetId,
        permanent: bool,
    ) -> Result<DeleteOutcome, GalleryError> {
        let url = format!("{}/api/assets/{}", self.base_url, asset_id);
        let response = self
            .client
            .delete(&url)
            .query(&[("permanent", permanent)])
            .send()
            .await?;
        let body: DeleteResponse = check_status(response).await?.json().await?;
        Ok(DeleteOutcome {
            success: body.success,
            read_only_path: if body.read_only { body.path } else { None },
        })
    }
}
