use serde_json::json;
use uuid::Uuid;

use crate::backend::rows::{Filter, RowQuery};
use crate::backend::{decode_rows, BackendClient};
use crate::error::Result;
use crate::friends::dto::Friendship;

const TABLE: &str = "friendships";

/// Canonical storage orientation: lesser id first. Both add directions land
/// on the same row, so the pair's uniqueness constraint makes the add
/// idempotent.
pub(crate) fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// All rows the user appears in, on either side of the edge.
pub async fn relations_for(
    backend: &dyn BackendClient,
    user_id: Uuid,
) -> Result<Vec<Friendship>> {
    let rows = backend
        .select(
            TABLE,
            RowQuery::new()
                .columns("user_id,friend_id")
                .filter(Filter::any_of([
                    ("user_id", user_id),
                    ("friend_id", user_id),
                ])),
        )
        .await?;
    decode_rows(rows)
}

pub async fn insert_edge(backend: &dyn BackendClient, a: Uuid, b: Uuid) -> Result<()> {
    let (user_id, friend_id) = canonical_pair(a, b);
    backend
        .insert(TABLE, json!({ "user_id": user_id, "friend_id": friend_id }))
        .await?;
    Ok(())
}

/// Clear the edge in both storage orientations; rows written by older
/// clients may predate canonical ordering.
pub async fn delete_edge(backend: &dyn BackendClient, a: Uuid, b: Uuid) -> Result<()> {
    backend
        .delete(
            TABLE,
            vec![Filter::eq("user_id", a), Filter::eq("friend_id", b)],
        )
        .await?;
    backend
        .delete(
            TABLE,
            vec![Filter::eq("user_id", b), Filter::eq("friend_id", a)],
        )
        .await?;
    Ok(())
}
