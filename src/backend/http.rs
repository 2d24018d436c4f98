use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::auth::dto::{AuthUser, Session};
use crate::backend::rows::{filter_pairs, Filter, RowQuery};
use crate::backend::BackendClient;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::session::SessionStore;

/// Wire client for the hosted backend: identity endpoints under `/auth/v1`,
/// row endpoints under `/rest/v1`, remote procedures under `/rest/v1/rpc`
/// and blob storage under `/storage/v1`.
pub struct HttpBackend {
    http: reqwest::Client,
    base: String,
    anon_key: String,
    session: SessionStore,
}

impl HttpBackend {
    pub fn new(config: Arc<AppConfig>, session: SessionStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base: config.backend_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            session,
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base)
    }

    /// Access token of the current session, else the publishable key.
    fn bearer(&self) -> String {
        self.session
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
    }

    async fn token_request(&self, url: String, body: Value) -> Result<Session> {
        let response = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;
        let wire: TokenResponse = decode_response(response).await?;
        Ok(wire.into_session())
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        self.token_request(
            self.auth_url("signup"),
            json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.token_request(
            self.auth_url("token?grant_type=password"),
            json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .http
            .post(self.auth_url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        check_status(response).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        self.token_request(
            self.auth_url("token?grant_type=refresh_token"),
            json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    async fn send_password_reset(&self, email: &str) -> Result<()> {
        let response = self
            .http
            .post(self.auth_url("recover"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email }))
            .send()
            .await?;
        check_status(response).await
    }

    async fn select(&self, table: &str, query: RowQuery) -> Result<Vec<Value>> {
        let response = self
            .request(Method::GET, self.rest_url(table))
            .query(&query.to_query_pairs())
            .send()
            .await?;
        decode_response(response).await
    }

    async fn select_one(&self, table: &str, query: RowQuery) -> Result<Value> {
        let response = self
            .request(Method::GET, self.rest_url(table))
            .query(&query.to_query_pairs())
            .header(header::ACCEPT, "application/vnd.pgrst.object+json")
            .send()
            .await?;
        decode_response(response).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let response = self
            .request(Method::POST, self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        first_row(decode_response(response).await?)
    }

    async fn update(
        &self,
        table: &str,
        filters: Vec<Filter>,
        patch: Value,
    ) -> Result<Vec<Value>> {
        let response = self
            .request(Method::PATCH, self.rest_url(table))
            .query(&filter_pairs(&filters))
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        decode_response(response).await
    }

    async fn upsert(&self, table: &str, row: Value) -> Result<Value> {
        let response = self
            .request(Method::POST, self.rest_url(table))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&row)
            .send()
            .await?;
        first_row(decode_response(response).await?)
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> Result<()> {
        let response = self
            .request(Method::DELETE, self.rest_url(table))
            .query(&filter_pairs(&filters))
            .send()
            .await?;
        check_status(response).await
    }

    async fn count(&self, table: &str, filters: Vec<Filter>) -> Result<u64> {
        let response = self
            .request(Method::HEAD, self.rest_url(table))
            .query(&filter_pairs(&filters))
            .header("Prefer", "count=exact")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let total = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|v| v.parse::<u64>().ok());
        total.ok_or_else(|| {
            Error::backend("PGRST103", "count missing from content-range")
        })
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value> {
        debug!(%function, "rpc");
        let response = self
            .request(Method::POST, self.rest_url(&format!("rpc/{function}")))
            .json(&args)
            .send()
            .await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        decode_response(response).await
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<()> {
        let url = format!("{}/storage/v1/object/{bucket}/{path}", self.base);
        let response = self
            .request(Method::POST, url)
            .header("x-upsert", "true")
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        check_status(response).await
    }

    fn public_object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{path}", self.base)
    }
}

/// Token grant payload as the identity endpoints return it.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    /// Unix seconds; preferred over `expires_in` when present.
    expires_at: Option<i64>,
    user: WireUser,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: Uuid,
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
            .unwrap_or_else(|| {
                OffsetDateTime::now_utc()
                    + time::Duration::seconds(self.expires_in.unwrap_or(3600))
            });
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: AuthUser {
                id: self.user.id,
                email: self.user.email.unwrap_or_default(),
            },
        }
    }
}

/// Error body shapes used across the backend's sub-services; whichever
/// code field is present is kept verbatim.
#[derive(Debug, Default, Deserialize)]
struct WireError {
    code: Option<String>,
    message: Option<String>,
    error_code: Option<String>,
    msg: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn error_from_response(response: Response) -> Error {
    let status = response.status();
    let body: WireError = response.json().await.unwrap_or_default();
    let code = body
        .code
        .or(body.error_code)
        .or(body.error)
        .unwrap_or_else(|| status.as_u16().to_string());
    let message = body
        .message
        .or(body.msg)
        .or(body.error_description)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    Error::Backend { code, message }
}

async fn decode_response<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    Ok(response.json().await?)
}

async fn check_status(response: Response) -> Result<()> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    Ok(())
}

/// Row endpoints answer writes with a one-element array under
/// `return=representation`.
fn first_row(rows: Value) -> Result<Value> {
    match rows {
        Value::Array(mut rows) if !rows.is_empty() => Ok(rows.remove(0)),
        Value::Array(_) => Err(Error::backend(
            crate::error::CODE_NOT_FOUND,
            "write returned no representation",
        )),
        other => Ok(other),
    }
}
