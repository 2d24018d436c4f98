use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::gifts::dto::{Gift, GiftItem};
use crate::gifts::repo;
use crate::profile;
use crate::state::AppState;

/// Publish a wish. The name must be non-empty; the amount is whatever the
/// caller entered (0 is fine).
pub async fn create(
    state: &AppState,
    item_name: &str,
    amount: i64,
    group_id: Option<Uuid>,
) -> Result<Gift> {
    let user = state.session.current_user()?;
    let item_name = item_name.trim();
    if item_name.is_empty() {
        return Err(Error::EmptyField("item_name"));
    }
    let gift = repo::insert(state.backend.as_ref(), item_name, amount, user.id, group_id).await?;
    info!(user_id = %user.id, gift_id = %gift.id, "gift created");
    Ok(gift)
}

/// Wishlist, newest first, with creator display names stitched in by batch
/// profile fetch.
pub async fn list(state: &AppState, group_id: Option<Uuid>) -> Result<Vec<GiftItem>> {
    state.session.current_user()?;
    let gifts = repo::list(state.backend.as_ref(), group_id).await?;

    let mut creator_ids: Vec<Uuid> = gifts.iter().map(|g| g.creator_id).collect();
    creator_ids.sort();
    creator_ids.dedup();
    let names: HashMap<Uuid, Option<String>> =
        profile::repo::find_many(state.backend.as_ref(), &creator_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.display_name().map(str::to_string)))
            .collect();

    Ok(gifts
        .into_iter()
        .map(|gift| {
            let creator_name = names.get(&gift.creator_id).cloned().flatten();
            GiftItem { gift, creator_name }
        })
        .collect())
}

/// Flip the reservation state and report the new value.
pub async fn toggle_reservation(state: &AppState, gift: &Gift) -> Result<bool> {
    state.session.current_user()?;
    let reserved = !gift.is_reserved;
    repo::set_reserved(state.backend.as_ref(), gift.id, reserved).await?;
    info!(gift_id = %gift.id, reserved, "reservation toggled");
    Ok(reserved)
}

/// Dashboard stat: how many wishes the caller has published.
pub async fn wish_count(state: &AppState) -> Result<u64> {
    let user = state.session.current_user()?;
    repo::count_by_creator(state.backend.as_ref(), user.id).await
}
