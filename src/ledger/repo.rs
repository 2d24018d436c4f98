use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::backend::rows::{Filter, RowQuery};
use crate::backend::{decode_row, decode_rows, BackendClient};
use crate::error::Result;
use crate::ledger::dto::{LedgerEntry, STATUS_PENDING};

const TABLE: &str = "ledgers";

pub async fn insert(
    backend: &dyn BackendClient,
    description: &str,
    amount: i64,
    creditor_id: Uuid,
    debtor_id: Uuid,
    group_id: Option<Uuid>,
) -> Result<LedgerEntry> {
    let mut row = json!({
        "description": description,
        "amount": amount,
        "creditor_id": creditor_id,
        "debtor_id": debtor_id,
    });
    if let Some(group_id) = group_id {
        row["group_id"] = json!(group_id);
    }
    decode_row(backend.insert(TABLE, row).await?)
}

/// Newest first; optionally scoped to a group.
pub async fn list(
    backend: &dyn BackendClient,
    group_id: Option<Uuid>,
) -> Result<Vec<LedgerEntry>> {
    let mut query = RowQuery::new().order_desc("created_at");
    if let Some(group_id) = group_id {
        query = query.filter(Filter::eq("group_id", group_id));
    }
    decode_rows(backend.select(TABLE, query).await?)
}

pub async fn set_status(backend: &dyn BackendClient, id: Uuid, status: &str) -> Result<()> {
    backend
        .update(TABLE, vec![Filter::eq("id", id)], json!({ "status": status }))
        .await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct AmountRow {
    amount: i64,
}

/// Amounts still owed to the creditor.
pub async fn pending_amounts(backend: &dyn BackendClient, creditor_id: Uuid) -> Result<Vec<i64>> {
    let rows = backend
        .select(
            TABLE,
            RowQuery::new()
                .columns("amount")
                .filter(Filter::eq("creditor_id", creditor_id))
                .filter(Filter::eq("status", STATUS_PENDING)),
        )
        .await?;
    let amounts: Vec<AmountRow> = decode_rows(rows)?;
    Ok(amounts.into_iter().map(|row| row.amount).collect())
}
