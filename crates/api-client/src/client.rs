//! REST client for the FieldSafe backend.
//!
//! Every endpoint takes the caller's bearer token; the client itself holds no
//! credentials.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;

use fieldsafe_core::errors::RemoteResult;
use fieldsafe_core::observations::{NewObservation, ObservationDto};
use fieldsafe_core::reference::{ReferenceItem, ReferenceKind};
use fieldsafe_core::remote::RemoteApi;
use fieldsafe_core::tasks::{NewTask, TaskDto};
use fieldsafe_core::workflow::StatusTransition;

use crate::error::{ApiClientError, Result};
use crate::types::{ApiErrorResponse, ListResponse};

const MAX_LOG_BODY_CHARS: usize = 512;
const OBSERVATIONS: &str = "observations";
const TASKS: &str = "tasks";

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("[ApiClient] Response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[ApiClient] Response error ({}): {}", status, preview);
    }

    /// * `base_url` - API root, e.g. "https://api.fieldsafe.app"
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn headers(&self, token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiClientError::auth("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);
        Ok(headers)
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, resource)
    }

    fn transition_url(&self, resource: &str, server_id: &str, transition: &StatusTransition) -> String {
        format!(
            "{}/{}/{}",
            self.url(resource),
            urlencoding::encode(server_id),
            transition.action.path_segment()
        )
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .ok()
                .and_then(|error| error.describe())
                .unwrap_or_else(|| format!("Request failed: {}", body));
            return Err(ApiClientError::api(status.as_u16(), message));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "[ApiClient] Failed to deserialize response from {}: {}",
                status,
                e
            );
            ApiClientError::Json(e)
        })
    }

    async fn get_list<T: DeserializeOwned>(&self, token: &str, resource: &str) -> Result<Vec<T>> {
        let response = self
            .client
            .get(self.url(resource))
            .headers(self.headers(token)?)
            .send()
            .await?;
        let list: ListResponse<T> = Self::parse_response(response).await?;
        Ok(list.into_items())
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        token: &str,
        url: String,
        body: &B,
    ) -> Result<T> {
        debug!("[ApiClient] POST {}", url);
        let response = self
            .client
            .post(url)
            .headers(self.headers(token)?)
            .json(body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// GET /api/v1/observations
    pub async fn list_observations(&self, token: &str) -> Result<Vec<ObservationDto>> {
        self.get_list(token, OBSERVATIONS).await
    }

    /// POST /api/v1/observations
    pub async fn create_observation(
        &self,
        token: &str,
        input: &NewObservation,
    ) -> Result<ObservationDto> {
        self.post(token, self.url(OBSERVATIONS), input).await
    }

    /// POST /api/v1/observations/{id}/{answer|close|reject}
    pub async fn transition_observation(
        &self,
        token: &str,
        server_id: &str,
        transition: &StatusTransition,
    ) -> Result<ObservationDto> {
        let url = self.transition_url(OBSERVATIONS, server_id, transition);
        self.post(token, url, transition).await
    }

    /// GET /api/v1/tasks
    pub async fn list_tasks(&self, token: &str) -> Result<Vec<TaskDto>> {
        self.get_list(token, TASKS).await
    }

    /// POST /api/v1/tasks
    pub async fn create_task(&self, token: &str, input: &NewTask) -> Result<TaskDto> {
        self.post(token, self.url(TASKS), input).await
    }

    /// POST /api/v1/tasks/{id}/{answer|close|reject}
    pub async fn transition_task(
        &self,
        token: &str,
        server_id: &str,
        transition: &StatusTransition,
    ) -> Result<TaskDto> {
        let url = self.transition_url(TASKS, server_id, transition);
        self.post(token, url, transition).await
    }

    /// GET /api/v1/{projects|departments|supervisors|categories|subcategories|locations}
    pub async fn list_reference(
        &self,
        token: &str,
        kind: ReferenceKind,
    ) -> Result<Vec<ReferenceItem>> {
        self.get_list(token, kind.table_name()).await
    }
}

#[async_trait]
impl RemoteApi for ApiClient {
    async fn list_observations(&self, token: &str) -> RemoteResult<Vec<ObservationDto>> {
        Ok(ApiClient::list_observations(self, token).await?)
    }

    async fn create_observation(
        &self,
        token: &str,
        input: &NewObservation,
    ) -> RemoteResult<ObservationDto> {
        Ok(ApiClient::create_observation(self, token, input).await?)
    }

    async fn transition_observation(
        &self,
        token: &str,
        server_id: &str,
        transition: &StatusTransition,
    ) -> RemoteResult<ObservationDto> {
        Ok(ApiClient::transition_observation(self, token, server_id, transition).await?)
    }

    async fn list_tasks(&self, token: &str) -> RemoteResult<Vec<TaskDto>> {
        Ok(ApiClient::list_tasks(self, token).await?)
    }

    async fn create_task(&self, token: &str, input: &NewTask) -> RemoteResult<TaskDto> {
        Ok(ApiClient::create_task(self, token, input).await?)
    }

    async fn transition_task(
        &self,
        token: &str,
        server_id: &str,
        transition: &StatusTransition,
    ) -> RemoteResult<TaskDto> {
        Ok(ApiClient::transition_task(self, token, server_id, transition).await?)
    }

    async fn list_reference(
        &self,
        token: &str,
        kind: ReferenceKind,
    ) -> RemoteResult<Vec<ReferenceItem>> {
        Ok(ApiClient::list_reference(self, token, kind).await?)
    }
}
