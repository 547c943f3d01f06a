//! Identity lookup against the external user directory.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use toolhire_core::{DomainError, DomainResult, UserId};

/// Minimal projection of a directory user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
}

/// Read-only user lookup. Unknown users fail with `NotFound`.
pub trait Directory: Send + Sync {
    fn user(&self, user_id: UserId) -> DomainResult<UserProfile>;
}

impl<D> Directory for Arc<D>
where
    D: Directory + ?Sized,
{
    fn user(&self, user_id: UserId) -> DomainResult<UserProfile> {
        (**self).user(user_id)
    }
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<UserId, UserProfile>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, display_name: impl Into<String>) -> UserId {
        let id = UserId::new();
        let profile = UserProfile {
            id,
            display_name: display_name.into(),
        };
        if let Ok(mut users) = self.users.write() {
            users.insert(id, profile);
        }
        id
    }
}

impl Directory for InMemoryDirectory {
    fn user(&self, user_id: UserId) -> DomainResult<UserProfile> {
        let users = self
            .users
            .read()
            .map_err(|_| DomainError::invariant("directory lock poisoned"))?;
        users.get(&user_id).cloned().ok_or(DomainError::NotFound)
    }
}
