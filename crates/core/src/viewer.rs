//! Viewer identity and the user lookup capability.

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::record::UserId;

/// Account level, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserLevel {
    Anonymous,
    Regular,
    Trusted,
    Moderator,
    Administrator,
}

impl UserLevel {
    /// Map the stored numeric level (0 = regular .. 3 = administrator).
    pub fn from_stored(level: i64) -> Self {
        match level {
            i64::MIN..=0 => UserLevel::Regular,
            1 => UserLevel::Trusted,
            2 => UserLevel::Moderator,
            _ => UserLevel::Administrator,
        }
    }

    pub fn to_stored(self) -> i64 {
        match self {
            UserLevel::Anonymous | UserLevel::Regular => 0,
            UserLevel::Trusted => 1,
            UserLevel::Moderator => 2,
            UserLevel::Administrator => 3,
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub username: String,
    pub level: UserLevel,
}

/// Whoever is making the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub identity: Option<UserIdentity>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn user(identity: UserIdentity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn id(&self) -> Option<UserId> {
        self.identity.as_ref().map(|i| i.id)
    }

    pub fn level(&self) -> UserLevel {
        self.identity
            .as_ref()
            .map(|i| i.level)
            .unwrap_or(UserLevel::Anonymous)
    }

    /// Moderator or above.
    pub fn is_privileged(&self) -> bool {
        self.level() >= UserLevel::Moderator
    }

    /// Literal identity equality with `user`.
    pub fn is(&self, user: UserId) -> bool {
        self.id() == Some(user)
    }
}

/// Resolves users for owner scopes and viewer identities.
pub trait UserDirectory: Send + Sync {
    fn by_username(&self, username: &str) -> Result<Option<UserIdentity>, SearchError>;

    fn by_id(&self, id: UserId) -> Result<Option<UserIdentity>, SearchError>;
}
