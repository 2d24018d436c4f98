use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A wishlist entry. `is_reserved` is a plain toggle; whoever claims the
/// gift flips it, with no locking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gift {
    pub id: Uuid,
    pub item_name: String,
    pub amount: i64,
    pub creator_id: Uuid,
    #[serde(default)]
    pub is_reserved: bool,
    #[serde(default)]
    pub group_id: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

/// Gift plus its creator's display name, as the list screen renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct GiftItem {
    pub gift: Gift,
    pub creator_name: Option<String>,
}
