use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::friends;
use crate::ledger::dto::{LedgerEntry, LedgerItem};
use crate::ledger::repo;
use crate::profile;
use crate::state::AppState;

/// Record a debt owed to the caller. The debtor must currently be a friend;
/// the entry starts out pending.
pub async fn record_debt(
    state: &AppState,
    description: &str,
    amount: i64,
    debtor_id: Uuid,
    group_id: Option<Uuid>,
) -> Result<LedgerEntry> {
    let user = state.session.current_user()?;
    let description = description.trim();
    if description.is_empty() {
        return Err(Error::EmptyField("description"));
    }

    let friends = friends::services::list(state).await?;
    if !friends.iter().any(|p| p.id == debtor_id) {
        return Err(Error::DebtorNotFriend);
    }

    let entry = repo::insert(
        state.backend.as_ref(),
        description,
        amount,
        user.id,
        debtor_id,
        group_id,
    )
    .await?;
    info!(user_id = %user.id, entry_id = %entry.id, %debtor_id, "debt recorded");
    Ok(entry)
}

/// Ledger, newest first, with creditor and debtor display names stitched in
/// by batch profile fetch.
pub async fn list(state: &AppState, group_id: Option<Uuid>) -> Result<Vec<LedgerItem>> {
    state.session.current_user()?;
    let entries = repo::list(state.backend.as_ref(), group_id).await?;

    let mut ids: Vec<Uuid> = entries
        .iter()
        .flat_map(|e| [e.creditor_id, e.debtor_id])
        .collect();
    ids.sort();
    ids.dedup();
    let names: HashMap<Uuid, Option<String>> =
        profile::repo::find_many(state.backend.as_ref(), &ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.display_name().map(str::to_string)))
            .collect();

    Ok(entries
        .into_iter()
        .map(|entry| {
            let creditor_name = names.get(&entry.creditor_id).cloned().flatten();
            let debtor_name = names.get(&entry.debtor_id).cloned().flatten();
            LedgerItem {
                entry,
                creditor_name,
                debtor_name,
            }
        })
        .collect())
}

/// The only mutation path an entry has. The vocabulary is free-form; only
/// empty values are rejected.
pub async fn set_status(state: &AppState, entry_id: Uuid, status: &str) -> Result<()> {
    state.session.current_user()?;
    let status = status.trim();
    if status.is_empty() {
        return Err(Error::EmptyField("status"));
    }
    repo::set_status(state.backend.as_ref(), entry_id, status).await?;
    info!(%entry_id, status, "ledger status updated");
    Ok(())
}

/// Dashboard stat: what the caller is still owed across pending entries.
pub async fn receivable_total(state: &AppState) -> Result<i64> {
    let user = state.session.current_user()?;
    let amounts = repo::pending_amounts(state.backend.as_ref(), user.id).await?;
    Ok(amounts.into_iter().sum())
}
