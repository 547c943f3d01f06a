//! Acting identity attached to every lifecycle operation.

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Role the actor holds when performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    /// Owns the inventory being rented out.
    Provider,
    /// Rents the inventory.
    Renter,
    /// Back-office staff acting on behalf of the platform.
    Admin,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Provider => "provider",
            ActorRole::Renter => "renter",
            ActorRole::Admin => "admin",
        }
    }
}

/// Who performed an operation, recorded on every timeline checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(user_id: UserId, role: ActorRole) -> Self {
        Self { user_id, role }
    }
}
