use thiserror::Error;

/// Code the backend's REST layer reports when a single-object request
/// matches no rows.
pub const CODE_NOT_FOUND: &str = "PGRST116";

/// SQLSTATE reported on a unique-constraint violation.
pub const CODE_UNIQUE_VIOLATION: &str = "23505";

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Structured error reported by the backend; `code` is kept verbatim so
    /// callers can branch on it.
    #[error("backend error {code}: {message}")]
    Backend { code: String, message: String },

    #[error("not signed in")]
    NotSignedIn,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("password must be at least 8 letters and digits, with at least one of each")]
    WeakPassword,

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("invite code is empty")]
    EmptyInviteCode,

    #[error("invite code does not match any profile")]
    InviteCodeNotFound,

    #[error("cannot add yourself as a friend")]
    OwnInviteCode,

    #[error("debtor is not in the friend list")]
    DebtorNotFriend,

    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("decode row: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    pub fn backend(code: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Backend {
            code: code.into(),
            message: message.into(),
        }
    }

    /// True for the backend's "no rows for a single-object request" code.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Backend { code, .. } if code == CODE_NOT_FOUND)
    }

    /// True for a unique-constraint violation reported by the backend.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Error::Backend { code, .. } if code == CODE_UNIQUE_VIOLATION)
    }
}
