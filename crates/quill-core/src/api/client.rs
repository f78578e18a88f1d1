//! Reqwest implementation of the remote note service

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{Note, NotesPage};
use crate::util::{is_http_url, normalize_text_option};

use super::error::{user_message, ApiError, ApiResult};
use super::{NoteApi, NoteFilter};

const HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Serialize)]
struct NoteBody<'a> {
    title: &'a str,
    description: &'a str,
}

/// Authenticated HTTP client for the note service.
#[derive(Clone)]
pub struct NotesApiClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl NotesApiClient {
    /// Build a client against the given base URL with a bearer token.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_text_option(Some(base_url.into())).ok_or_else(|| {
            ApiError::InvalidConfiguration("base URL must not be empty".to_string())
        })?;
        if !is_http_url(&base_url) {
            return Err(ApiError::InvalidConfiguration(
                "base URL must include http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        if !(200..300).contains(&status) {
            return Err(ApiError::Status {
                status,
                message: user_message(status, &body),
            });
        }
        if body.trim().is_empty() {
            return Err(ApiError::EmptyBody);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl NoteApi for NotesApiClient {
    async fn list_notes(&self, page: Option<u32>, page_size: Option<u32>) -> ApiResult<NotesPage> {
        let mut request = self
            .client
            .get(self.url("api/notes/"))
            .bearer_auth(&self.token);
        if let Some(page) = page {
            request = request.query(&[("page", page)]);
        }
        if let Some(page_size) = page_size {
            request = request.query(&[("page_size", page_size)]);
        }

        let response = request.send().await?;
        Self::parse_json(response).await
    }

    async fn filter_notes(&self, filter: NoteFilter) -> ApiResult<NotesPage> {
        let mut request = self
            .client
            .get(self.url("api/notes/filter"))
            .bearer_auth(&self.token);
        if let Some(title) = &filter.title {
            request = request.query(&[("title", title)]);
        }
        if let Some(description) = &filter.description {
            request = request.query(&[("description", description)]);
        }
        if let Some(updated_gte) = &filter.updated_gte {
            request = request.query(&[("updated__gte", updated_gte)]);
        }
        if let Some(updated_lte) = &filter.updated_lte {
            request = request.query(&[("updated__lte", updated_lte)]);
        }
        if let Some(page) = filter.page {
            request = request.query(&[("page", page)]);
        }
        if let Some(page_size) = filter.page_size {
            request = request.query(&[("page_size", page_size)]);
        }

        let response = request.send().await?;
        Self::parse_json(response).await
    }

    async fn create_note(&self, title: &str, description: &str) -> ApiResult<Note> {
        let response = self
            .client
            .post(self.url("api/notes/"))
            .bearer_auth(&self.token)
            .json(&NoteBody { title, description })
            .send()
            .await?;
        Self::parse_json(response).await
    }

    async fn get_note(&self, id: i64) -> ApiResult<Note> {
        let response = self
            .client
            .get(self.url(&format!("api/notes/{id}/")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::parse_json(response).await
    }

    async fn update_note(&self, id: i64, title: &str, description: &str) -> ApiResult<Note> {
        let response = self
            .client
            .put(self.url(&format!("api/notes/{id}/")))
            .bearer_auth(&self.token)
            .json(&NoteBody { title, description })
            .send()
            .await?;
        Self::parse_json(response).await
    }

    async fn delete_note(&self, id: i64) -> ApiResult<()> {
        let response = self
            .client
            .delete(self.url(&format!("api/notes/{id}/")))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Status {
                status: status.as_u16(),
                message: user_message(status.as_u16(), &body),
            })
        }
    }
}
