// core/src/api/transport.rs

use crate::error::{Result, TuckshopError};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl fmt::Display for HttpMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      HttpMethod::Get => "GET",
      HttpMethod::Post => "POST",
      HttpMethod::Put => "PUT",
      HttpMethod::Patch => "PATCH",
      HttpMethod::Delete => "DELETE",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: HttpMethod,
  pub path: String,
  pub query: Vec<(String, String)>,
  pub body: Option<Value>,
  pub bearer: Option<String>,
}

impl ApiRequest {
  pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
    ApiRequest {
      method,
      path: path.into(),
      query: Vec::new(),
      body: None,
      bearer: None,
    }
  }

  pub fn json(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }

  pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
    self.query.extend(pairs);
    self
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
  pub status: u16,
  pub body: Value,
}

/// The seam between the API client and the network.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// A live server-push connection: raw byte chunks as they arrive.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// Opens the backend's server-sent-events stream for a signed session token.
#[async_trait]
pub trait EventSource: Send + Sync {
  async fn connect(&self, session_token: &str) -> Result<ByteStream>;
}

/// `reqwest`-backed transport for the real backend.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  stream_client: reqwest::Client,
  base_url: String,
}

impl HttpTransport {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    // Server push connections stay open indefinitely, so no overall timeout.
    let stream_client = reqwest::Client::builder().connect_timeout(timeout).build()?;
    Ok(HttpTransport {
      client,
      stream_client,
      base_url: base_url.trim_end_matches('/').to_string(),
    })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url, path.trim_start_matches('/'))
  }
}

#[async_trait]
impl Transport for HttpTransport {
  #[instrument(name = "HttpTransport::send", skip_all, fields(method = %request.method, path = %request.path))]
  async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
    let method = match request.method {
      HttpMethod::Get => reqwest::Method::GET,
      HttpMethod::Post => reqwest::Method::POST,
      HttpMethod::Put => reqwest::Method::PUT,
      HttpMethod::Patch => reqwest::Method::PATCH,
      HttpMethod::Delete => reqwest::Method::DELETE,
    };

    let mut builder = self.client.request(method, self.url(&request.path));
    if !request.query.is_empty() {
      builder = builder.query(&request.query);
    }
    if let Some(token) = &request.bearer {
      builder = builder.bearer_auth(token);
    }
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder.send().await?;
    let status = response.status().as_u16();
    let text = response.text().await?;
    debug!(status, bytes = text.len(), "Backend responded.");

    let body = if text.trim().is_empty() {
      Value::Null
    } else {
      serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    Ok(ApiResponse { status, body })
  }
}

#[async_trait]
impl EventSource for HttpTransport {
  #[instrument(name = "HttpTransport::connect", skip_all)]
  async fn connect(&self, session_token: &str) -> Result<ByteStream> {
    let response = self
      .stream_client
      .get(self.url("/events"))
      .query(&[("token", session_token)])
      .header(reqwest::header::ACCEPT, "text/event-stream")
      .send()
      .await?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
      return Err(TuckshopError::Unauthorized("event stream rejected the session".to_string()));
    }
    if !status.is_success() {
      return Err(TuckshopError::Api {
        status: status.as_u16(),
        message: "event stream unavailable".to_string(),
        detail: None,
      });
    }

    Ok(
      response
        .bytes_stream()
        .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(TuckshopError::from))
        .boxed(),
    )
  }
}
