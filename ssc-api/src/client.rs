//! Core SSC API client implementation.
//!
//! This module contains the HTTP gateway used by every API area: URL
//! construction, the two authentication schemes (basic auth for token
//! operations, `FortifyToken` for everything else), status checking and
//! decoding of the `{ data, responseCode, count }` response envelope.

use log::{Level, debug, log_enabled};
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{MAX_JSON_DEPTH, validate_json_depth};
use crate::{SscConfig, SscError};

/// Response fields whose values are masked in debug output
const REDACTED_FIELDS: &[&str] = &["token", "clearPassword", "password"];

/// Mask credential values in a decoded body before it is logged.
fn redact_secrets(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if field.is_string() && REDACTED_FIELDS.contains(&key.as_str()) {
                    *field = Value::String("[REDACTED]".to_string());
                } else {
                    redact_secrets(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_secrets),
        _ => {}
    }
}

/// Standard SSC response wrapper.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    pub data: Option<T>,
    pub response_code: Option<u16>,
    /// Total number of matching entities for list endpoints
    pub count: Option<u64>,
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the `data` member.
    ///
    /// # Errors
    ///
    /// Returns [`SscError::InvalidResponse`] when the server omitted `data`.
    pub fn into_data(self, context: &str) -> Result<T, SscError> {
        self.data.ok_or_else(|| {
            SscError::InvalidResponse(format!(
                "{context}: response has no data{}",
                self.message
                    .map(|m| format!(" ({m})"))
                    .unwrap_or_default()
            ))
        })
    }
}

#[derive(Clone)]
struct Session {
    token: SecretString,
}

/// Core SSC API client.
///
/// Holds the HTTP client, the configuration and at most one session token.
/// Cheap to clone; clones share the connection pool and carry a copy of the
/// session.
#[derive(Clone)]
pub struct SscClient {
    config: SscConfig,
    client: Client,
    session: Option<Session>,
}

impl SscClient {
    /// Build URL with query parameters
    fn build_url_with_params(&self, endpoint: &str, query_params: &[(&str, &str)]) -> String {
        let mut url = String::with_capacity(
            self.config
                .api_base_url
                .len()
                .saturating_add(endpoint.len())
                .saturating_add(query_params.len().saturating_mul(32)),
        );
        url.push_str(&self.config.api_base_url);
        url.push_str(endpoint);

        if !query_params.is_empty() {
            url.push('?');
            for (i, (key, value)) in query_params.iter().enumerate() {
                if i > 0 {
                    url.push('&');
                }
                url.push_str(&urlencoding::encode(key));
                url.push('=');
                url.push_str(&urlencoding::encode(value));
            }
        }

        url
    }

    /// Create a new SSC API client.
    ///
    /// The client starts without a session; call
    /// [`SscClient::initialize`](crate::SscClient::initialize) before using
    /// session-bound operations.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: SscConfig) -> Result<Self, SscError> {
        config.validate()?;

        let mut client_builder = Client::builder();
        if !config.validate_certificates {
            client_builder = client_builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        let client = client_builder.build().map_err(SscError::Transport)?;
        Ok(Self {
            config,
            client,
            session: None,
        })
    }

    /// Get access to the configuration
    #[must_use]
    pub fn config(&self) -> &SscConfig {
        &self.config
    }

    /// Get access to the underlying reqwest client
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Whether a session token is currently held.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    pub(crate) fn set_session(&mut self, token: SecretString) {
        self.session = Some(Session { token });
    }

    pub(crate) fn clear_session(&mut self) {
        self.session = None;
    }

    /// Fails with [`SscError::NotInitialized`] when no session is held.
    pub(crate) fn ensure_initialized(&self) -> Result<(), SscError> {
        if self.session.is_none() {
            return Err(SscError::NotInitialized);
        }
        Ok(())
    }

    fn session_request(
        &self,
        method: Method,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<RequestBuilder, SscError> {
        let session = self.session.as_ref().ok_or(SscError::NotInitialized)?;
        let url = self.build_url_with_params(endpoint, query_params);
        debug!("{method} {url}");
        Ok(self
            .client
            .request(method, url)
            .header(
                "Authorization",
                format!("FortifyToken {}", session.token.expose_secret()),
            )
            .header("Accept", "application/json"))
    }

    fn basic_request(
        &self,
        method: Method,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> RequestBuilder {
        let url = self.build_url_with_params(endpoint, query_params);
        debug!("{method} {url} (basic auth)");
        self.client
            .request(method, url)
            .basic_auth(
                &self.config.username,
                Some(self.config.password.expose_secret()),
            )
            .header("Accept", "application/json")
    }

    /// Make a session-authenticated GET request.
    ///
    /// # Errors
    ///
    /// Returns an error if no session is held, the request fails or the
    /// server answers with a non-success status.
    pub async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Response, SscError> {
        let response = self
            .session_request(Method::GET, endpoint, query_params)?
            .send()
            .await?;
        Self::handle_response(response, &format!("GET {endpoint}")).await
    }

    /// Make a session-authenticated POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if no session is held, the request fails or the
    /// server answers with a non-success status.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<Response, SscError> {
        let response = self
            .session_request(Method::POST, endpoint, &[])?
            .json(body)
            .send()
            .await?;
        Self::handle_response(response, &format!("POST {endpoint}")).await
    }

    /// Make a session-authenticated PUT request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if no session is held, the request fails or the
    /// server answers with a non-success status.
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<Response, SscError> {
        let response = self
            .session_request(Method::PUT, endpoint, &[])?
            .json(body)
            .send()
            .await?;
        Self::handle_response(response, &format!("PUT {endpoint}")).await
    }

    /// POST with basic authentication (token endpoints).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server answers with a
    /// non-success status.
    pub async fn post_basic<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<Response, SscError> {
        let response = self
            .basic_request(Method::POST, endpoint, &[])
            .json(body)
            .send()
            .await?;
        Self::handle_response(response, &format!("POST {endpoint}")).await
    }

    /// DELETE with basic authentication (token endpoints).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server answers with a
    /// non-success status.
    pub async fn delete_basic(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Response, SscError> {
        let response = self
            .basic_request(Method::DELETE, endpoint, query_params)
            .send()
            .await?;
        Self::handle_response(response, &format!("DELETE {endpoint}")).await
    }

    /// Turn a non-success response into [`SscError::Api`].
    ///
    /// # Errors
    ///
    /// Returns [`SscError::Api`] carrying the status, URL and body text.
    pub async fn handle_response(response: Response, context: &str) -> Result<Response, SscError> {
        if !response.status().is_success() {
            let status = response.status();
            let url = response.url().clone();
            let error_text = response.text().await?;
            return Err(SscError::Api {
                status: status.as_u16(),
                message: format!(
                    "Failed to {context}\n  URL: {url}\n  HTTP {status}: {error_text}"
                ),
            });
        }
        Ok(response)
    }

    /// Decode a response body as an SSC envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be read, nests too deeply or does
    /// not match `T`.
    pub async fn decode_envelope<T: DeserializeOwned>(
        response: Response,
    ) -> Result<ApiEnvelope<T>, SscError> {
        let text = response.text().await?;
        let value: Value = serde_json::from_str(&text)?;
        validate_json_depth(&value, MAX_JSON_DEPTH)?;
        if log_enabled!(Level::Debug) {
            let mut logged = value.clone();
            redact_secrets(&mut logged);
            debug!("Response body: {logged}");
        }
        Ok(serde_json::from_value(value)?)
    }

    /// GET and return the whole envelope (used where `count` matters).
    ///
    /// # Errors
    ///
    /// See [`SscClient::get`] and [`SscClient::decode_envelope`].
    pub async fn get_envelope<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<ApiEnvelope<T>, SscError> {
        let response = self.get(endpoint, query_params).await?;
        Self::decode_envelope(response).await
    }

    /// GET and unwrap `data`.
    ///
    /// # Errors
    ///
    /// See [`SscClient::get_envelope`] and [`ApiEnvelope::into_data`].
    pub async fn get_data<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<T, SscError> {
        self.get_envelope(endpoint, query_params)
            .await?
            .into_data(&format!("GET {endpoint}"))
    }

    /// POST a JSON body and unwrap `data`.
    ///
    /// # Errors
    ///
    /// See [`SscClient::post`] and [`ApiEnvelope::into_data`].
    pub async fn post_data<B, T>(&self, endpoint: &str, body: &B) -> Result<T, SscError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.post(endpoint, body).await?;
        Self::decode_envelope(response)
            .await?
            .into_data(&format!("POST {endpoint}"))
    }

    /// PUT a JSON body and unwrap `data`.
    ///
    /// # Errors
    ///
    /// See [`SscClient::put`] and [`ApiEnvelope::into_data`].
    pub async fn put_data<B, T>(&self, endpoint: &str, body: &B) -> Result<T, SscError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.put(endpoint, body).await?;
        Self::decode_envelope(response)
            .await?
            .into_data(&format!("PUT {endpoint}"))
    }
}
