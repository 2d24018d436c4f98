#[cfg(test)]
pub mod fake;
pub mod http;
pub mod rows;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::dto::Session;
use crate::error::Result;
use self::rows::{Filter, RowQuery};

/// Boundary to the hosted backend. Everything the app authenticates,
/// persists or resolves goes through this trait; implementations report
/// failures with the backend's machine-readable codes and never retry.
#[async_trait]
pub trait BackendClient: Send + Sync {
    // --- identity ---
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;
    async fn sign_out(&self, access_token: &str) -> Result<()>;
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session>;
    async fn send_password_reset(&self, email: &str) -> Result<()>;

    // --- row access ---
    async fn select(&self, table: &str, query: RowQuery) -> Result<Vec<Value>>;
    /// Single-object select; zero rows surfaces the backend's not-found code.
    async fn select_one(&self, table: &str, query: RowQuery) -> Result<Value>;
    async fn insert(&self, table: &str, row: Value) -> Result<Value>;
    async fn update(&self, table: &str, filters: Vec<Filter>, patch: Value)
        -> Result<Vec<Value>>;
    /// Insert-or-merge keyed on the table's primary key.
    async fn upsert(&self, table: &str, row: Value) -> Result<Value>;
    async fn delete(&self, table: &str, filters: Vec<Filter>) -> Result<()>;
    async fn count(&self, table: &str, filters: Vec<Filter>) -> Result<u64>;

    // --- remote procedures ---
    async fn rpc(&self, function: &str, args: Value) -> Result<Value>;

    // --- blob storage ---
    /// Upload with overwrite semantics.
    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<()>;
    fn public_object_url(&self, bucket: &str, path: &str) -> String;
}

pub(crate) fn decode_row<T: DeserializeOwned>(row: Value) -> Result<T> {
    Ok(serde_json::from_value(row)?)
}

pub(crate) fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter().map(decode_row).collect()
}
