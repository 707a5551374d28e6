//! # API Transport
//!
//! The single boundary where HTTP outcomes become typed results. Everything
//! above this module sees either a decoded body, an [`AppError`], or
//! [`Outcome::Cancelled`].
//!
//! ## Status mapping
//!
//! | Outcome                          | Result                      |
//! |----------------------------------|-----------------------------|
//! | 2xx                              | body decoded as JSON        |
//! | 404                              | `NotFound { resource }`     |
//! | 409                              | `Conflict { resource }`     |
//! | 400                              | `Validation { field_errors }` |
//! | other status                     | `Network { status: Some }`  |
//! | no response (refused, timeout)   | `Network { status: None }`  |
//! | bad JSON, missing capability     | `Unknown`                   |
//! | token cancelled                  | `Outcome::Cancelled`        |
//!
//! Error bodies follow `{ "error": "..." }`; validation bodies may add a
//! `fields` (or `fieldErrors`) map.

use crate::error::{AppError, FieldErrors, Result};
use bridge_traits::{BridgeError, HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartPart};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

/// Result of a request that may be cancelled.
///
/// Cancellation is not a failure: it only means a newer request took over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Settled(Result<T>),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// `None` when cancelled.
    pub fn settled(self) -> Option<Result<T>> {
        match self {
            Outcome::Settled(result) => Some(result),
            Outcome::Cancelled => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Settled(result) => Outcome::Settled(result.map(f)),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        Outcome::Settled(result)
    }
}

#[derive(Debug, Clone)]
enum ApiBody {
    Json(Value),
    Multipart(Vec<MultipartPart>),
}

/// A request against the catalog API, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: HttpMethod,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<ApiBody>,
}

impl ApiRequest {
    /// `segments` are appended under `/api/` and percent-encoded individually.
    pub fn new<I, S>(method: HttpMethod, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(HttpMethod::Get, segments)
    }

    pub fn post<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(HttpMethod::Post, segments)
    }

    pub fn put<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(HttpMethod::Put, segments)
    }

    pub fn delete<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(HttpMethod::Delete, segments)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn query_pairs<I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.query.extend(pairs);
        self
    }

    /// Attach a JSON body. Serialization failures surface as `Unknown`.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| AppError::unknown(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(ApiBody::Json(value));
        Ok(self)
    }

    pub fn multipart(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = Some(ApiBody::Multipart(parts));
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Path for display, e.g. `/api/tracks/42/file`.
    pub fn path(&self) -> String {
        format!("/api/{}", self.segments.join("/"))
    }

    /// Collection name the request targets, e.g. `tracks`.
    pub fn resource(&self) -> &str {
        self.segments
            .first()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("resource")
    }
}

/// Maps HTTP exchanges on the injected [`HttpClient`] to typed outcomes.
#[derive(Clone)]
pub struct Transport {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Transport {
    /// `base_url` is the API origin, e.g. `http://localhost:8000`.
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &core_runtime::config::CatalogConfig) -> Self {
        Self::new(Arc::clone(&config.http_client), config.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request that cannot be cancelled.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        match self.request(request, None).await {
            Outcome::Settled(result) => result,
            Outcome::Cancelled => Err(AppError::unknown("request cancelled without a token")),
        }
    }

    /// Send a request, giving up as soon as `cancel` fires.
    ///
    /// A cancelled token always yields [`Outcome::Cancelled`], even when the
    /// response had already arrived.
    #[instrument(
        level = "debug",
        skip_all,
        fields(method = request.method.as_str(), path = %request.path())
    )]
    pub async fn request<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        cancel: Option<&CancellationToken>,
    ) -> Outcome<T> {
        let is_cancelled = || cancel.is_some_and(CancellationToken::is_cancelled);
        if is_cancelled() {
            return Outcome::Cancelled;
        }

        let resource = request.resource().to_string();
        let http_request = match self.build(request) {
            Ok(req) => req,
            Err(err) => return Outcome::Settled(Err(err)),
        };

        let exchange = self.http.execute(http_request);
        let response = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("Request cancelled");
                    return Outcome::Cancelled;
                }
                response = exchange => response,
            },
            None => exchange.await,
        };

        if is_cancelled() {
            debug!("Response discarded after cancellation");
            return Outcome::Cancelled;
        }

        let result = match response {
            Ok(response) => interpret(&resource, response),
            Err(err) => Err(map_bridge_error(err)),
        };

        if let Err(err) = &result {
            warn!(kind = err.kind(), status = ?err.status(), error = %err, "API request failed");
        }

        Outcome::Settled(result)
    }

    fn build(&self, request: ApiRequest) -> Result<HttpRequest> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::unknown(format!("Invalid base URL '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::unknown(format!("Base URL '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .push("api")
            .extend(&request.segments);

        let mut http_request = HttpRequest::new(request.method, url.as_str())
            .header("Accept", "application/json");
        for (key, value) in request.query {
            http_request = http_request.query_param(key, value);
        }

        match request.body {
            Some(ApiBody::Json(value)) => http_request
                .json(&value)
                .map_err(|e| AppError::unknown(e.to_string())),
            Some(ApiBody::Multipart(parts)) => Ok(http_request.multipart(parts)),
            None => Ok(http_request),
        }
    }
}

fn interpret<T: DeserializeOwned>(resource: &str, response: HttpResponse) -> Result<T> {
    if !response.is_success() {
        return Err(map_status(resource, &response));
    }

    // Empty bodies (204, bare DELETE) decode as JSON null so `()` and
    // `Option<T>` targets work.
    let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &response.body
    };

    serde_json::from_slice(body)
        .map_err(|e| AppError::unknown(format!("Failed to decode {} response: {}", resource, e)))
}

/// Translate a non-2xx response into the matching error variant.
pub fn map_status(resource: &str, response: &HttpResponse) -> AppError {
    let payload: Option<Value> = serde_json::from_slice(&response.body).ok();
    let message = payload
        .as_ref()
        .and_then(|p| p.get("error"))
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status code {}", response.status));

    match response.status {
        404 => AppError::not_found(resource, message),
        409 => AppError::conflict(resource, message),
        400 => AppError::validation(field_errors_of(payload.as_ref()), message),
        status => AppError::network(Some(status), message),
    }
}

fn field_errors_of(payload: Option<&Value>) -> FieldErrors {
    let Some(map) = payload
        .and_then(|p| p.get("fields").or_else(|| p.get("fieldErrors")))
        .and_then(Value::as_object)
    else {
        return FieldErrors::new();
    };

    map.iter()
        .map(|(field, value)| {
            let message = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (field.clone(), message)
        })
        .collect()
}

fn map_bridge_error(err: BridgeError) -> AppError {
    match err {
        BridgeError::Network(message) => AppError::network(None, message),
        BridgeError::Io(io) => AppError::network(None, io.to_string()),
        other => AppError::unknown(other.to_string()),
    }
}
