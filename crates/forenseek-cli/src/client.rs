//! Async HTTP client wrapping the ForenSeek JSON API.

use std::time::Duration;

use anyhow::Context as _;
use forenseek_core::{
  case::Case,
  case_form::{CaseUpdate, NewCase},
  evidence::{Evidence, NewEvidence},
  session::{AuthContext, Role},
};
use reqwest::{Client, RequestBuilder, Response, StatusCode, header::AUTHORIZATION};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
  #[error("{method} {path} failed: {source}")]
  Transport {
    method: &'static str,
    path:   String,
    #[source]
    source: reqwest::Error,
  },

  #[error("{method} {path} returned {status}: {message}")]
  Status {
    method:  &'static str,
    path:    String,
    status:  StatusCode,
    message: String,
  },

  #[error("could not decode response of {method} {path}: {source}")]
  Decode {
    method: &'static str,
    path:   String,
    #[source]
    source: reqwest::Error,
  },
}

impl ClientError {
  /// Whether the same request may succeed later without being changed.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Transport { .. } => true,
      Self::Status { status, .. } => {
        status.is_server_error()
          || *status == StatusCode::REQUEST_TIMEOUT
          || *status == StatusCode::TOO_MANY_REQUESTS
      }
      Self::Decode { .. } => false,
    }
  }

  pub fn status(&self) -> Option<StatusCode> {
    match self {
      Self::Status { status, .. } => Some(*status),
      _ => None,
    }
  }
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct LoginBody<'a> {
  matricula: &'a str,
  senha:     &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
  pub token: String,
  pub user:  LoginUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginUser {
  #[serde(alias = "_id", deserialize_with = "string_or_number")]
  pub id: String,
}

/// `GET /user/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
  #[serde(rename = "_id", alias = "id", default, deserialize_with = "string_or_number")]
  pub id:   String,
  #[serde(rename = "nome", default)]
  pub name: String,
  #[serde(default = "unknown_role")]
  pub role: Role,
}

fn unknown_role() -> Role { Role::Unknown }

/// What a create endpoint told us about the record it made.
///
/// Any 2xx means the record exists server-side. The body only contributes the
/// new id, which some endpoints return at the top level and others under a
/// wrapper key such as `evidence`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Created {
  pub id: Option<String>,
}

impl Created {
  fn from_body(body: &str) -> Self {
    let id = serde_json::from_str::<Value>(body)
      .ok()
      .and_then(|v| id_field(&v).or_else(|| v.as_object()?.values().find_map(id_field)));
    Self { id }
  }
}

fn id_field(value: &Value) -> Option<String> {
  ["_id", "id"].into_iter().find_map(|key| match value.get(key)? {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  })
}

#[derive(Deserialize)]
struct ErrorBody {
  message: String,
}

/// Ids arrive as strings from most endpoints and as numbers from some.
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Id {
    Text(String),
    Number(i64),
  }
  Ok(match Id::deserialize(d)? {
    Id::Text(s) => s,
    Id::Number(n) => n.to_string(),
  })
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// Async HTTP client for the ForenSeek REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: String,
  auth:     Option<AuthContext>,
}

impl ApiClient {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      auth: None,
    })
  }

  /// A copy of this client that authenticates as `auth`.
  pub fn with_auth(&self, auth: AuthContext) -> Self {
    Self { auth: Some(auth), ..self.clone() }
  }

  fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }

  fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
    match &self.auth {
      Some(auth) => req.header(AUTHORIZATION, auth.bearer()),
      None => req,
    }
  }

  /// Send `req` and turn non-success statuses into [`ClientError::Status`].
  async fn send(
    &self,
    method: &'static str,
    path: &str,
    req: RequestBuilder,
  ) -> Result<Response, ClientError> {
    tracing::debug!(method, path, "api request");
    let resp = self
      .authorize(req)
      .send()
      .await
      .map_err(|source| ClientError::Transport { method, path: path.to_string(), source })?;

    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
      .map(|b| b.message)
      .unwrap_or(body);
    tracing::debug!(method, path, %status, %message, "api request failed");
    Err(ClientError::Status { method, path: path.to_string(), status, message })
  }

  async fn decode<T: DeserializeOwned>(
    method: &'static str,
    path: &str,
    resp: Response,
  ) -> Result<T, ClientError> {
    resp
      .json()
      .await
      .map_err(|source| ClientError::Decode { method, path: path.to_string(), source })
  }

  /// Decode a JSON array one element at a time, skipping with a warning any
  /// element that does not decode as `T`.
  async fn decode_each<T: DeserializeOwned>(
    method: &'static str,
    path: &str,
    resp: Response,
  ) -> Result<Vec<T>, ClientError> {
    let raw: Vec<Value> = Self::decode(method, path, resp).await?;
    let total = raw.len();
    let items: Vec<T> = raw
      .into_iter()
      .enumerate()
      .filter_map(|(index, value)| match serde_json::from_value::<T>(value) {
        Ok(item) => Some(item),
        Err(error) => {
          tracing::warn!(path, index, %error, "skipping undecodable record");
          None
        }
      })
      .collect();
    tracing::debug!(path, total, decoded = items.len(), "records fetched");
    Ok(items)
  }

  /// Read the body of a successful create. Never fails: the record already
  /// exists, so an unreadable body only costs us its id.
  async fn created(path: &str, resp: Response) -> Created {
    let body = match resp.text().await {
      Ok(body) => body,
      Err(error) => {
        tracing::warn!(path, %error, "could not read create response");
        String::new()
      }
    };
    let created = Created::from_body(&body);
    if created.id.is_none() {
      tracing::warn!(path, "create response did not name the new record");
    }
    created
  }

  // ── Session ───────────────────────────────────────────────────────────────

  /// `POST /login`
  pub async fn login(&self, matricula: &str, senha: &str) -> Result<LoginResponse, ClientError> {
    let path = "/login";
    let req = self
      .client
      .post(self.url(path))
      .json(&LoginBody { matricula, senha });
    let resp = self.send("POST", path, req).await?;
    Self::decode("POST", path, resp).await
  }

  /// `GET /user/{id}`
  pub async fn get_user(&self, user_id: &str) -> Result<UserProfile, ClientError> {
    let path = format!("/user/{user_id}");
    let resp = self.send("GET", &path, self.client.get(self.url(&path))).await?;
    Self::decode("GET", &path, resp).await
  }

  // ── Cases ─────────────────────────────────────────────────────────────────

  /// `GET /case`
  ///
  /// Records that cannot be decoded at all are skipped with a warning; the
  /// rest of the list is still returned.
  pub async fn list_cases(&self) -> Result<Vec<Case>, ClientError> {
    let path = "/case";
    let resp = self.send("GET", path, self.client.get(self.url(path))).await?;
    Self::decode_each("GET", path, resp).await
  }

  /// `GET /case/{id}`
  pub async fn get_case(&self, case_id: &str) -> Result<Case, ClientError> {
    let path = format!("/case/{case_id}");
    let resp = self.send("GET", &path, self.client.get(self.url(&path))).await?;
    Self::decode("GET", &path, resp).await
  }

  /// `POST /case`
  pub async fn create_case(&self, case: &NewCase) -> Result<Created, ClientError> {
    let path = "/case";
    let req = self.client.post(self.url(path)).json(case);
    let resp = self.send("POST", path, req).await?;
    Ok(Self::created(path, resp).await)
  }

  /// `PUT /case/{id}`. The response body is not needed.
  pub async fn update_case(&self, case_id: &str, update: &CaseUpdate) -> Result<(), ClientError> {
    let path = format!("/case/{case_id}");
    let req = self.client.put(self.url(&path)).json(update);
    self.send("PUT", &path, req).await?;
    Ok(())
  }

  // ── Evidence ──────────────────────────────────────────────────────────────

  /// `GET /evidence?idCaso=<id>`
  ///
  /// Like [`Self::list_cases`], one bad record does not hide the others.
  pub async fn list_evidence(&self, case_id: &str) -> Result<Vec<Evidence>, ClientError> {
    let path = "/evidence";
    let req = self
      .client
      .get(self.url(path))
      .query(&[("idCaso", case_id)]);
    let resp = self.send("GET", path, req).await?;
    Self::decode_each("GET", path, resp).await
  }

  /// `POST /evidence`
  pub async fn create_evidence(&self, evidence: &NewEvidence) -> Result<Created, ClientError> {
    let path = "/evidence";
    let req = self.client.post(self.url(path)).json(evidence);
    let resp = self.send("POST", path, req).await?;
    Ok(Self::created(path, resp).await)
  }
}

// ─── Fake API ─────────────────────────────────────────────────────────────────
