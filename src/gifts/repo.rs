use serde_json::json;
use uuid::Uuid;

use crate::backend::rows::{Filter, RowQuery};
use crate::backend::{decode_row, decode_rows, BackendClient};
use crate::error::Result;
use crate::gifts::dto::Gift;

const TABLE: &str = "gifts";

pub async fn insert(
    backend: &dyn BackendClient,
    item_name: &str,
    amount: i64,
    creator_id: Uuid,
    group_id: Option<Uuid>,
) -> Result<Gift> {
    let mut row = json!({
        "item_name": item_name,
        "amount": amount,
        "creator_id": creator_id,
    });
    if let Some(group_id) = group_id {
        row["group_id"] = json!(group_id);
    }
    decode_row(backend.insert(TABLE, row).await?)
}

/// Newest first; optionally scoped to a group.
pub async fn list(backend: &dyn BackendClient, group_id: Option<Uuid>) -> Result<Vec<Gift>> {
    let mut query = RowQuery::new().order_desc("created_at");
    if let Some(group_id) = group_id {
        query = query.filter(Filter::eq("group_id", group_id));
    }
    decode_rows(backend.select(TABLE, query).await?)
}

pub async fn set_reserved(
    backend: &dyn BackendClient,
    id: Uuid,
    reserved: bool,
) -> Result<()> {
    backend
        .update(
            TABLE,
            vec![Filter::eq("id", id)],
            json!({ "is_reserved": reserved }),
        )
        .await?;
    Ok(())
}

pub async fn count_by_creator(backend: &dyn BackendClient, creator_id: Uuid) -> Result<u64> {
    backend
        .count(TABLE, vec![Filter::eq("creator_id", creator_id)])
        .await
}
