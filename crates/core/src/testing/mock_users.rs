//! Mock user directory for testing.

use std::sync::RwLock;

use crate::error::SearchError;
use crate::record::UserId;
use crate::viewer::{UserDirectory, UserIdentity};

/// In-memory [`UserDirectory`].
#[derive(Debug, Default)]
pub struct MockUserDirectory {
    users: RwLock<Vec<UserIdentity>>,
    lookups: RwLock<Vec<String>>,
}

impl MockUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserIdentity>) -> Self {
        Self {
            users: RwLock::new(users),
            lookups: RwLock::new(Vec::new()),
        }
    }

    pub fn add_user(&self, user: UserIdentity) {
        if let Ok(mut users) = self.users.write() {
            users.push(user);
        }
    }

    /// Usernames looked up so far.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.read().map(|l| l.clone()).unwrap_or_default()
    }

    fn find(&self, pred: impl Fn(&UserIdentity) -> bool) -> Result<Option<UserIdentity>, SearchError> {
        let users = self
            .users
            .read()
            .map_err(|_| SearchError::Internal("mock directory poisoned".to_string()))?;
        Ok(users.iter().find(|u| pred(u)).cloned())
    }
}

impl UserDirectory for MockUserDirectory {
    fn by_username(&self, username: &str) -> Result<Option<UserIdentity>, SearchError> {
        if let Ok(mut lookups) = self.lookups.write() {
            lookups.push(username.to_string());
        }
        self.find(|u| u.username == username)
    }

    fn by_id(&self, id: UserId) -> Result<Option<UserIdentity>, SearchError> {
        self.find(|u| u.id == id)
    }
}
