use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::dto::Profile;

/// Storage row for a friendship. Stored directionally, interpreted as an
/// undirected edge between the two users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Friendship {
    pub user_id: Uuid,
    pub friend_id: Uuid,
}

impl Friendship {
    /// The end of the edge that is not `me`.
    pub fn other(&self, me: Uuid) -> Uuid {
        if self.user_id == me {
            self.friend_id
        } else {
            self.user_id
        }
    }
}

/// Outcome of an add-by-invite-code attempt that did not error. A backend
/// uniqueness violation on the insert means the edge already existed, which
/// is reported as success.
#[derive(Debug, Clone, PartialEq)]
pub enum FriendAdd {
    Added(Profile),
    AlreadyFriends(Profile),
}

impl FriendAdd {
    pub fn profile(&self) -> &Profile {
        match self {
            FriendAdd::Added(profile) | FriendAdd::AlreadyFriends(profile) => profile,
        }
    }
}
