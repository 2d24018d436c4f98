use std::collections::HashSet;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::friends::dto::FriendAdd;
use crate::friends::repo;
use crate::profile;
use crate::profile::dto::Profile;
use crate::state::AppState;

/// Resolve an invite code to a profile and link it to the caller.
///
/// The code is trimmed and uppercased before lookup. Empty input and the
/// caller's own code are rejected before anything is written; an unknown
/// code maps the backend's not-found code to [`Error::InviteCodeNotFound`];
/// a uniqueness violation on the insert means the pair is already linked and
/// is reported as [`FriendAdd::AlreadyFriends`].
pub async fn add_by_code(state: &AppState, code: &str) -> Result<FriendAdd> {
    let user = state.session.current_user()?;
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(Error::EmptyInviteCode);
    }

    let target = match profile::repo::find_by_invite_code(state.backend.as_ref(), &code).await
    {
        Ok(profile) => profile,
        Err(e) if e.is_not_found() => return Err(Error::InviteCodeNotFound),
        Err(e) => return Err(e),
    };
    if target.id == user.id {
        return Err(Error::OwnInviteCode);
    }

    match repo::insert_edge(state.backend.as_ref(), user.id, target.id).await {
        Ok(()) => {
            info!(user_id = %user.id, friend_id = %target.id, "friend added");
            Ok(FriendAdd::Added(target))
        }
        Err(e) if e.is_unique_violation() => {
            debug!(user_id = %user.id, friend_id = %target.id, "already friends");
            Ok(FriendAdd::AlreadyFriends(target))
        }
        Err(e) => Err(e),
    }
}

/// The caller's friends, resolved from relationship rows in both directions
/// and batch-fetched as profiles. No friends is an empty list, not an error.
pub async fn list(state: &AppState) -> Result<Vec<Profile>> {
    let user = state.session.current_user()?;
    let relations = repo::relations_for(state.backend.as_ref(), user.id).await?;

    let mut seen = HashSet::new();
    let friend_ids: Vec<Uuid> = relations
        .iter()
        .map(|edge| edge.other(user.id))
        .filter(|id| seen.insert(*id))
        .collect();

    profile::repo::find_many(state.backend.as_ref(), &friend_ids).await
}

/// Unfriend: one logical removal clears both possible storage orientations.
pub async fn remove(state: &AppState, friend_id: Uuid) -> Result<()> {
    let user = state.session.current_user()?;
    repo::delete_edge(state.backend.as_ref(), user.id, friend_id).await?;
    info!(user_id = %user.id, %friend_id, "friend removed");
    Ok(())
}
