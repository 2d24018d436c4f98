use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::dto::Session;
use crate::error::{Error, Result};
use crate::state::AppState;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref PASSWORD_RE: Regex = Regex::new(r"^[A-Za-z\d]{8,}$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// At least 8 characters, letters and digits only, with at least one of each.
pub(crate) fn is_valid_password(password: &str) -> bool {
    PASSWORD_RE.is_match(password)
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Register a new account and make its session current.
pub async fn sign_up(state: &AppState, email: &str, password: &str) -> Result<Session> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "sign up with invalid email");
        return Err(Error::InvalidEmail);
    }
    if !is_valid_password(password) {
        warn!("sign up with weak password");
        return Err(Error::WeakPassword);
    }

    let session = state.backend.sign_up(&email, password).await?;
    state.session.set(session.clone());
    info!(user_id = %session.user.id, "signed up");
    Ok(session)
}

/// Password sign-in; observers of the session store see the change.
pub async fn sign_in(state: &AppState, email: &str, password: &str) -> Result<Session> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "sign in with invalid email");
        return Err(Error::InvalidEmail);
    }

    let session = state.backend.sign_in(&email, password).await?;
    state.session.set(session.clone());
    info!(user_id = %session.user.id, "signed in");
    Ok(session)
}

/// Revoke the backend session. The local session is cleared even when the
/// revocation call fails, so the app shell always falls back to signed-out.
pub async fn sign_out(state: &AppState) -> Result<()> {
    let result = match state.session.current() {
        Some(session) => state.backend.sign_out(&session.access_token).await,
        None => Ok(()),
    };
    state.session.clear();
    info!("signed out");
    result
}

pub async fn send_password_reset(state: &AppState, email: &str) -> Result<()> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(Error::InvalidEmail);
    }
    state.backend.send_password_reset(&email).await?;
    info!(email = %email, "password reset email requested");
    Ok(())
}

/// Exchange the refresh token for a new session and make it current.
pub async fn refresh(state: &AppState) -> Result<Session> {
    let current = state.session.current().ok_or(Error::NotSignedIn)?;
    let session = state.backend.refresh_session(&current.refresh_token).await?;
    state.session.set(session.clone());
    Ok(session)
}

/// The session the next call should use, refreshed first if it has expired.
pub async fn ensure_fresh(state: &AppState) -> Result<Session> {
    let current = state.session.current().ok_or(Error::NotSignedIn)?;
    if current.is_expired() {
        refresh(state).await
    } else {
        Ok(current)
    }
}
