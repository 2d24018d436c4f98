use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::backend::{decode_row, decode_rows};
use crate::error::{Error, Result};
use crate::groups::dto::{Group, GroupMember};
use crate::profile;
use crate::profile::dto::Profile;
use crate::state::AppState;

// Group rows sit behind a membership-visibility policy that would have to
// consult itself under direct row access, so creation and member lookup go
// through backend procedures; the client never touches the membership table
// directly.

/// Create a group and become its admin member in one atomic backend call.
pub async fn create(state: &AppState, name: &str) -> Result<Group> {
    let user = state.session.current_user()?;
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::EmptyField("name"));
    }

    let invite_code = profile::services::generate_invite_code();
    let row = state
        .backend
        .rpc(
            "create_group_with_admin",
            json!({ "p_name": name, "p_invite_code": invite_code }),
        )
        .await?;
    let group: Group = decode_row(row)?;
    info!(user_id = %user.id, group_id = %group.id, "group created");
    Ok(group)
}

/// Members of a group, resolved to profiles for display.
pub async fn members(state: &AppState, group_id: Uuid) -> Result<Vec<Profile>> {
    state.session.current_user()?;
    let rows = state
        .backend
        .rpc("get_group_members", json!({ "p_group_id": group_id }))
        .await?;
    let members: Vec<GroupMember> = match rows {
        serde_json::Value::Array(rows) => decode_rows(rows)?,
        serde_json::Value::Null => Vec::new(),
        other => decode_row(other)?,
    };

    let ids: Vec<Uuid> = members.iter().map(|m| m.user_id).collect();
    profile::repo::find_many(state.backend.as_ref(), &ids).await
}
