use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Status a freshly recorded debt carries. The field is free-form; the
/// backend does not constrain its vocabulary.
pub const STATUS_PENDING: &str = "pending";

/// A recorded debt between a creditor and a debtor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub description: String,
    pub amount: i64,
    pub creditor_id: Uuid,
    pub debtor_id: Uuid,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub group_id: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

/// Ledger entry plus both display names, as the list screen renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerItem {
    pub entry: LedgerEntry,
    pub creditor_name: Option<String>,
    pub debtor_name: Option<String>,
}
