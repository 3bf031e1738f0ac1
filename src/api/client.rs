//! HTTP verb surface over the executor, decoder, and cache.
//!
//! Every verb follows the same pipeline: build URL -> cache check (GET only) ->
//! headers -> execute -> decode -> cache write (GET only) -> read invalidation
//! (non-GET only) -> typed result. Errors raised anywhere in the pipeline also
//! reach the notification sink before propagating.

use reqwest::multipart::{Form, Part};
use reqwest::{header, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::dates;
use super::executor::RequestExecutor;
use super::response;
use crate::cache::TtlCache;
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::notify::{NotificationKind, Notifier};

/// Correlation header for distributed tracing. Generated once per logical call
/// and reused across retry attempts.
const CORRELATION_HEADER: &str = "x-correlation-id";

/// Advisory health endpoint, relative to the base path.
const HEALTH_ENDPOINT: &str = "actuator/health";

/// Per-call options. Everything unset falls back to the client's configured
/// defaults; caching is always opt-in.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
  pub timeout: Option<Duration>,
  pub retries: Option<u32>,
  /// Cache this GET's payload (and serve it from cache while valid).
  pub cache: bool,
  /// TTL override for this call's cache entry.
  pub cache_ttl: Option<Duration>,
}

impl RequestOptions {
  /// Options with caching enabled at the client's default TTL.
  pub fn cached() -> Self {
    Self {
      cache: true,
      ..Self::default()
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn with_retries(mut self, retries: u32) -> Self {
    self.retries = Some(retries);
    self
  }

  pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
    self.cache_ttl = Some(ttl);
    self
  }
}

/// One binary part of a multipart request. Owned bytes, so the form can be
/// rebuilt from scratch on every retry attempt.
#[derive(Debug, Clone)]
pub struct FilePart {
  /// Form field name.
  pub name: String,
  pub file_name: String,
  pub content_type: String,
  pub bytes: Vec<u8>,
}

/// Outcome of the advisory health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
  Up,
  Down,
}

/// API client: verb methods, URL/header construction, and cache policy.
///
/// The cache is an owned field, never shared; two clients never interfere.
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
  base_path: String,
  timeout: Duration,
  retries: u32,
  backoff_base: Duration,
  cache_ttl: Duration,
  health_timeout: Duration,
  cache: TtlCache,
  notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for ApiClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ApiClient")
      .field("base_url", &self.base_url)
      .field("base_path", &self.base_path)
      .field("timeout", &self.timeout)
      .field("retries", &self.retries)
      .field("backoff_base", &self.backoff_base)
      .field("cache_ttl", &self.cache_ttl)
      .field("health_timeout", &self.health_timeout)
      .finish_non_exhaustive()
  }
}

impl ApiClient {
  pub fn new(config: &ApiConfig, notifier: Arc<dyn Notifier>) -> Result<Self, ApiError> {
    let base_url = Url::parse(&config.base_url)
      .map_err(|e| ApiError::Config(format!("invalid base_url {:?}: {}", config.base_url, e)))?;

    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;

    Ok(Self {
      http,
      base_url,
      base_path: config.base_path.clone(),
      timeout: config.timeout(),
      retries: config.retries,
      backoff_base: config.backoff_base(),
      cache_ttl: config.cache_ttl(),
      health_timeout: config.health_timeout(),
      cache: TtlCache::new(),
      notifier,
    })
  }

  /// GET with optional query parameters. `None` values are omitted.
  pub async fn get<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    query: &[(&str, Option<String>)],
    opts: &RequestOptions,
  ) -> Result<T, ApiError> {
    self.run(Method::GET, endpoint, query, None, opts).await
  }

  pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    endpoint: &str,
    body: &B,
    opts: &RequestOptions,
  ) -> Result<T, ApiError> {
    let body = self.write_body(body)?;
    self
      .run(Method::POST, endpoint, &[], Some(body), opts)
      .await
  }

  pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    endpoint: &str,
    body: &B,
    opts: &RequestOptions,
  ) -> Result<T, ApiError> {
    let body = self.write_body(body)?;
    self.run(Method::PUT, endpoint, &[], Some(body), opts).await
  }

  pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    endpoint: &str,
    body: &B,
    opts: &RequestOptions,
  ) -> Result<T, ApiError> {
    let body = self.write_body(body)?;
    self
      .run(Method::PATCH, endpoint, &[], Some(body), opts)
      .await
  }

  pub async fn delete<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    opts: &RequestOptions,
  ) -> Result<T, ApiError> {
    self.run(Method::DELETE, endpoint, &[], None, opts).await
  }

  /// POST a multipart form: one JSON part (named by `json_part`) plus binary
  /// parts. The form is rebuilt from owned parts on every retry attempt.
  pub async fn post_multipart<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    endpoint: &str,
    json_part: &str,
    body: &B,
    files: Vec<FilePart>,
    opts: &RequestOptions,
  ) -> Result<T, ApiError> {
    self
      .run_multipart(Method::POST, endpoint, json_part, body, files, opts)
      .await
  }

  /// PUT variant of [`Self::post_multipart`].
  pub async fn put_multipart<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    endpoint: &str,
    json_part: &str,
    body: &B,
    files: Vec<FilePart>,
    opts: &RequestOptions,
  ) -> Result<T, ApiError> {
    self
      .run_multipart(Method::PUT, endpoint, json_part, body, files, opts)
      .await
  }

  /// Advisory health check: short timeout, no retries, never fails.
  pub async fn health(&self) -> HealthStatus {
    let url = self.build_url(HEALTH_ENDPOINT, &[]);
    let executor = RequestExecutor::new(self.health_timeout, 0, self.backoff_base);
    let http = self.http.clone();
    let correlation_id = Uuid::new_v4().to_string();
    let send_url = url.clone();

    let result = executor
      .execute(move || {
        http
          .get(send_url.clone())
          .header(header::ACCEPT, "application/json")
          .header(CORRELATION_HEADER, correlation_id.clone())
          .send()
      })
      .await;

    match result {
      Ok(response) => match response::decode_payload(response).await {
        Ok(payload) if payload.value.get("status").and_then(Value::as_str) == Some("UP") => {
          HealthStatus::Up
        }
        _ => HealthStatus::Down,
      },
      Err(err) => {
        warn!(error = %err, "health check failed");
        HealthStatus::Down
      }
    }
  }

  /// Evict cache entries by substring, or everything when no pattern is given.
  pub fn invalidate(&self, pattern: Option<&str>) {
    self.cache.invalidate(pattern);
  }

  /// Serialize a write body and canonicalize its dates.
  fn write_body<B: Serialize + ?Sized>(&self, body: &B) -> Result<Value, ApiError> {
    let mut value =
      serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    dates::canonicalize(&mut value);
    Ok(value)
  }

  /// `{base_path}/{endpoint}`, always rooted at `/` regardless of any path on
  /// the configured base URL.
  fn build_url(&self, endpoint: &str, query: &[(&str, Option<String>)]) -> Url {
    let mut url = self.base_url.clone();
    url.set_path(&format!(
      "{}/{}",
      self.base_path.trim_end_matches('/'),
      endpoint.trim_start_matches('/')
    ));
    if query.iter().any(|(_, v)| v.is_some()) {
      let mut pairs = url.query_pairs_mut();
      for (key, value) in query {
        if let Some(value) = value {
          pairs.append_pair(key, value);
        }
      }
    }
    url
  }

  fn executor(&self, opts: &RequestOptions) -> RequestExecutor {
    RequestExecutor::new(
      opts.timeout.unwrap_or(self.timeout),
      opts.retries.unwrap_or(self.retries),
      self.backoff_base,
    )
  }

  async fn run<T: DeserializeOwned>(
    &self,
    method: Method,
    endpoint: &str,
    query: &[(&str, Option<String>)],
    body: Option<Value>,
    opts: &RequestOptions,
  ) -> Result<T, ApiError> {
    match self.request_value(method, endpoint, query, body, opts).await {
      Ok(value) => serde_json::from_value(value).map_err(|e| {
        let err = ApiError::Decode(e.to_string());
        self.notify_error(&err);
        err
      }),
      Err(err) => {
        self.notify_error(&err);
        Err(err)
      }
    }
  }

  async fn request_value(
    &self,
    method: Method,
    endpoint: &str,
    query: &[(&str, Option<String>)],
    body: Option<Value>,
    opts: &RequestOptions,
  ) -> Result<Value, ApiError> {
    let url = self.build_url(endpoint, query);
    let cache_key = format!("{method} {url}");

    if method == Method::GET && opts.cache {
      if let Some(hit) = self.cache.get(&cache_key) {
        debug!(key = %cache_key, "cache hit");
        return Ok(hit);
      }
    }

    let correlation_id = Uuid::new_v4().to_string();
    debug!(%method, %url, %correlation_id, "issuing request");

    let executor = self.executor(opts);
    let http = self.http.clone();
    let send_method = method.clone();
    let send_url = url.clone();
    let response = executor
      .execute(move || {
        let builder = http
          .request(send_method.clone(), send_url.clone())
          .header(header::CONTENT_TYPE, "application/json")
          .header(header::ACCEPT, "application/json")
          .header(CORRELATION_HEADER, correlation_id.clone());
        let builder = match &body {
          Some(body) => builder.json(body),
          None => builder,
        };
        builder.send()
      })
      .await?;

    let value = self.finish(&method, response).await?;

    if method == Method::GET && opts.cache {
      let ttl = opts.cache_ttl.unwrap_or(self.cache_ttl);
      self.cache.set(cache_key, value.clone(), ttl);
    }

    Ok(value)
  }

  async fn run_multipart<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    method: Method,
    endpoint: &str,
    json_part: &str,
    body: &B,
    files: Vec<FilePart>,
    opts: &RequestOptions,
  ) -> Result<T, ApiError> {
    let result = self
      .multipart_value(method, endpoint, json_part, body, files, opts)
      .await;
    match result {
      Ok(value) => serde_json::from_value(value).map_err(|e| {
        let err = ApiError::Decode(e.to_string());
        self.notify_error(&err);
        err
      }),
      Err(err) => {
        self.notify_error(&err);
        Err(err)
      }
    }
  }

  async fn multipart_value<B: Serialize + ?Sized>(
    &self,
    method: Method,
    endpoint: &str,
    json_part: &str,
    body: &B,
    files: Vec<FilePart>,
    opts: &RequestOptions,
  ) -> Result<Value, ApiError> {
    let url = self.build_url(endpoint, &[]);
    let json_body = self.write_body(body)?.to_string();
    let json_name = json_part.to_string();

    let correlation_id = Uuid::new_v4().to_string();
    debug!(%method, %url, %correlation_id, parts = files.len(), "issuing multipart request");

    let executor = self.executor(opts);
    let http = self.http.clone();
    let send_method = method.clone();
    let send_url = url.clone();
    let response = executor
      .execute(move || {
        // Content-Type is deliberately absent so reqwest can set the boundary.
        let builder = http
          .request(send_method.clone(), send_url.clone())
          .header(header::ACCEPT, "application/json")
          .header(CORRELATION_HEADER, correlation_id.clone());
        let json_name = json_name.clone();
        let json_body = json_body.clone();
        let files = files.clone();
        async move {
          let mut form = Form::new().text(json_name, json_body);
          for file in files {
            let part = Part::bytes(file.bytes)
              .file_name(file.file_name)
              .mime_str(&file.content_type)?;
            form = form.part(file.name, part);
          }
          builder.multipart(form).send().await
        }
      })
      .await?;

    self.finish(&method, response).await
  }

  /// Shared tail of the pipeline: decode, surface soft errors, invalidate
  /// cached reads after a successful write.
  async fn finish(&self, method: &Method, response: reqwest::Response) -> Result<Value, ApiError> {
    let payload = response::decode_payload(response).await?;

    if let Some(warning) = &payload.warning {
      self
        .notifier
        .notify(NotificationKind::Warning, "API warning", &warning.display());
    }

    if *method != Method::GET {
      // Coarse but safe: every cached read is stale after any write.
      self.cache.invalidate_reads();
    }

    Ok(payload.value)
  }

  fn notify_error(&self, err: &ApiError) {
    let title = match err.status() {
      Some(status) => format!("HTTP {status}"),
      None => "Request failed".to_string(),
    };
    let message = match err {
      ApiError::Http { message, code, .. } => match code {
        Some(code) => format!("{code}: {message}"),
        None => message.clone(),
      },
      other => other.to_string(),
    };
    self
      .notifier
      .notify(NotificationKind::Error, &title, &message);
  }
}
