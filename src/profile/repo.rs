use serde_json::{json, Value};
use uuid::Uuid;

use crate::backend::rows::{Filter, RowQuery};
use crate::backend::{decode_row, decode_rows, BackendClient};
use crate::error::Result;
use crate::profile::dto::Profile;

const TABLE: &str = "profiles";

pub async fn find_by_id(backend: &dyn BackendClient, id: Uuid) -> Result<Profile> {
    let row = backend
        .select_one(TABLE, RowQuery::new().filter(Filter::eq("id", id)))
        .await?;
    decode_row(row)
}

pub async fn find_by_invite_code(
    backend: &dyn BackendClient,
    code: &str,
) -> Result<Profile> {
    let row = backend
        .select_one(TABLE, RowQuery::new().filter(Filter::eq("invite_code", code)))
        .await?;
    decode_row(row)
}

/// Batch fetch; an empty id set never reaches the backend.
pub async fn find_many(backend: &dyn BackendClient, ids: &[Uuid]) -> Result<Vec<Profile>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = backend
        .select(TABLE, RowQuery::new().filter(Filter::is_in("id", ids)))
        .await?;
    decode_rows(rows)
}

pub async fn insert(backend: &dyn BackendClient, profile: &Profile) -> Result<Profile> {
    let row = backend.insert(TABLE, serde_json::to_value(profile)?).await?;
    decode_row(row)
}

pub async fn upsert(backend: &dyn BackendClient, patch: Value) -> Result<Profile> {
    decode_row(backend.upsert(TABLE, patch).await?)
}

pub async fn set_invite_code(
    backend: &dyn BackendClient,
    id: Uuid,
    code: &str,
) -> Result<()> {
    backend
        .update(
            TABLE,
            vec![Filter::eq("id", id)],
            json!({ "invite_code": code }),
        )
        .await?;
    Ok(())
}

pub async fn set_avatar_url(backend: &dyn BackendClient, id: Uuid, url: &str) -> Result<()> {
    backend
        .update(
            TABLE,
            vec![Filter::eq("id", id)],
            json!({ "avatar_url": url }),
        )
        .await?;
    Ok(())
}
