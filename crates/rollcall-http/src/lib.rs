//! Rollcall HTTP - REST implementation of `AttendanceBackend`
//!
//! Endpoints, relative to `base_url`:
//! - `GET  /class-sessions/{id}`
//! - `GET  /class-sessions/{id}/attendances`
//! - `GET  /students/{id}/attendances?limit={n}`
//! - `POST /class-sessions/{id}/attendances`
//! - `PUT  /class-sessions/{id}/attendances/{studentId}`
//!
//! Every request carries the batch credential as a bearer token and its own
//! timeout. Non-2xx responses map to `TransportError::Status`.

mod config;

pub use config::{HttpBackendConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

use reqwest::{Client, Method, Response, Url};
use rollcall_core::{
    AttendanceBackend, AttendanceError, Credential, MarkWrite, SessionId, StudentId,
    TransportError,
};
use serde_json::Value;
use std::time::Duration;

/// Longest error body kept in `TransportError::Status`
const MAX_ERROR_BODY: usize = 512;

/// `AttendanceBackend` over the remote REST API
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpBackend {
    /// Build a backend from configuration
    ///
    /// # Errors
    /// `AttendanceError::Config` for an unusable base URL or client setup.
    pub fn new(config: &HttpBackendConfig) -> Result<Self, AttendanceError> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| AttendanceError::Config(format!("invalid base_url {:?}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(AttendanceError::Config(format!(
                "base_url cannot carry paths: {}",
                config.base_url
            )));
        }

        let timeout = config.timeout();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AttendanceError::Config(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Base URL requests are resolved against
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TransportError::Network(format!("unusable base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        credential: &Credential,
        body: Option<&MarkWrite>,
    ) -> Result<Response, TransportError> {
        tracing::debug!(%method, %url, "attendance store request");
        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(credential.token());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| self.map_error(&e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        Err(TransportError::Status {
            code: status.as_u16(),
            body,
        })
    }

    async fn get_json(&self, url: Url, credential: &Credential) -> Result<Value, TransportError> {
        let response = self.send(Method::GET, url, credential, None).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    fn map_error(&self, error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else if error.is_decode() {
            TransportError::Decode(error.to_string())
        } else {
            TransportError::Network(error.to_string())
        }
    }
}

#[async_trait::async_trait]
impl AttendanceBackend for HttpBackend {
    async fn session_detail(
        &self,
        credential: &Credential,
        session_id: &SessionId,
    ) -> Result<Value, TransportError> {
        let url = self.endpoint(&["class-sessions", session_id.as_str()])?;
        self.get_json(url, credential).await
    }

    async fn session_roster(
        &self,
        credential: &Credential,
        session_id: &SessionId,
    ) -> Result<Value, TransportError> {
        let url = self.endpoint(&["class-sessions", session_id.as_str(), "attendances"])?;
        self.get_json(url, credential).await
    }

    async fn student_history(
        &self,
        credential: &Credential,
        student_id: &StudentId,
        page_size: usize,
    ) -> Result<Value, TransportError> {
        let mut url = self.endpoint(&["students", student_id.as_str(), "attendances"])?;
        url.query_pairs_mut()
            .append_pair("limit", &page_size.to_string());
        self.get_json(url, credential).await
    }

    async fn create_mark(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        write: &MarkWrite,
    ) -> Result<(), TransportError> {
        let url = self.endpoint(&["class-sessions", session_id.as_str(), "attendances"])?;
        self.send(Method::POST, url, credential, Some(write)).await?;
        Ok(())
    }

    async fn update_mark(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        write: &MarkWrite,
    ) -> Result<(), TransportError> {
        let url = self.endpoint(&[
            "class-sessions",
            session_id.as_str(),
            "attendances",
            write.student_id.as_str(),
        ])?;
        self.send(Method::PUT, url, credential, Some(write)).await?;
        Ok(())
    }
}
