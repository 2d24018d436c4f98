use bytes::Bytes;
use rand::Rng;
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::dto::AuthUser;
use crate::error::{Error, Result};
use crate::profile::dto::Profile;
use crate::profile::repo;
use crate::state::AppState;

pub(crate) const INVITE_CODE_LEN: usize = 6;
const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Uniqueness lives in the backend constraint; on a collision the code is
/// regenerated at most this many times before the error surfaces.
const MAX_CODE_ATTEMPTS: usize = 3;

/// 6-character uppercase alphanumeric token, short enough to share by hand.
pub fn generate_invite_code() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITE_CODE_LEN)
        .map(|_| {
            let index = rng.gen_range(0..INVITE_CODE_ALPHABET.len());
            INVITE_CODE_ALPHABET[index] as char
        })
        .collect()
}

pub(crate) fn derive_username(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    if local.is_empty() {
        "user".to_string()
    } else {
        local.to_string()
    }
}

/// Fetch the caller's profile, healing it as needed: a missing row is
/// created with a derived username and a fresh invite code, and a row
/// predating invite codes is backfilled with exactly one.
pub async fn ensure_profile(state: &AppState) -> Result<Profile> {
    let user = state.session.current_user()?;
    match repo::find_by_id(state.backend.as_ref(), user.id).await {
        Ok(profile) => {
            if profile
                .invite_code
                .as_deref()
                .map_or(true, |code| code.is_empty())
            {
                backfill_invite_code(state, profile, &mut generate_invite_code).await
            } else {
                Ok(profile)
            }
        }
        Err(e) if e.is_not_found() => {
            create_initial_profile(state, &user, &mut generate_invite_code).await
        }
        Err(e) => Err(e),
    }
}

async fn create_initial_profile(
    state: &AppState,
    user: &AuthUser,
    next_code: &mut dyn FnMut() -> String,
) -> Result<Profile> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let profile = Profile {
            id: user.id,
            username: Some(derive_username(&user.email)),
            avatar_url: None,
            invite_code: Some(next_code()),
            bank_code: None,
            bank_account: None,
            updated_at: None,
        };
        match repo::insert(state.backend.as_ref(), &profile).await {
            Ok(created) => {
                info!(user_id = %user.id, "profile created");
                return Ok(created);
            }
            Err(e) if is_invite_code_collision(&e) && attempt < MAX_CODE_ATTEMPTS => {
                warn!(user_id = %user.id, attempt, "invite code collided, regenerating");
            }
            Err(e) => return Err(e),
        }
    }
}

async fn backfill_invite_code(
    state: &AppState,
    mut profile: Profile,
    next_code: &mut dyn FnMut() -> String,
) -> Result<Profile> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let code = next_code();
        match repo::set_invite_code(state.backend.as_ref(), profile.id, &code).await {
            Ok(()) => {
                info!(user_id = %profile.id, "invite code backfilled");
                profile.invite_code = Some(code);
                return Ok(profile);
            }
            Err(e) if is_invite_code_collision(&e) && attempt < MAX_CODE_ATTEMPTS => {
                warn!(user_id = %profile.id, attempt, "invite code collided, regenerating");
            }
            Err(e) => return Err(e),
        }
    }
}

/// A unique violation attributable to the invite-code column; other unique
/// violations (e.g. the primary key) are not retried.
fn is_invite_code_collision(e: &Error) -> bool {
    e.is_unique_violation()
        && matches!(e, Error::Backend { message, .. } if message.contains("invite_code"))
}

/// Save the editable profile fields. Upsert keyed on the user id; fields not
/// carried here (avatar, invite code) are left as stored.
pub async fn update_profile(
    state: &AppState,
    username: &str,
    bank_code: &str,
    bank_account: &str,
) -> Result<Profile> {
    let user = state.session.current_user()?;
    let updated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("rfc3339 formatting of a utc timestamp");
    let profile = repo::upsert(
        state.backend.as_ref(),
        json!({
            "id": user.id,
            "username": username,
            "bank_code": bank_code,
            "bank_account": bank_account,
            "updated_at": updated_at,
        }),
    )
    .await?;
    info!(user_id = %user.id, "profile updated");
    Ok(profile)
}

/// Overwrite the caller's avatar object and point the profile at its public
/// URL. The object key is stable per user, so re-uploads replace in place.
pub async fn upload_avatar(
    state: &AppState,
    image: Bytes,
    content_type: &str,
) -> Result<String> {
    let user = state.session.current_user()?;
    let path = format!("{}/avatar.png", user.id);
    state
        .backend
        .upload_object(&state.config.avatar_bucket, &path, image, content_type)
        .await?;
    let url = state
        .backend
        .public_object_url(&state.config.avatar_bucket, &path);
    repo::set_avatar_url(state.backend.as_ref(), user.id, &url).await?;
    info!(user_id = %user.id, "avatar uploaded");
    Ok(url)
}

/// Batch profile lookup for list rendering.
pub async fn fetch_profiles(state: &AppState, ids: &[Uuid]) -> Result<Vec<Profile>> {
    repo::find_many(state.backend.as_ref(), ids).await
}
