use async_trait::async_trait;
use dashmap::DashMap;

use crate::model::UserId;
use crate::store::StoreError;

/// Resolves participant ids to display names. Unknown ids are dropped, not
/// errors — a stale id must never block an availability check.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Names for the given ids, in input order.
    async fn usernames(&self, ids: &[UserId]) -> Result<Vec<String>, StoreError>;
}

/// In-memory directory keyed by user id.
pub struct MemoryDirectory {
    users: DashMap<UserId, String>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    pub fn insert(&self, id: UserId, name: impl Into<String>) {
        self.users.insert(id, name.into());
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn usernames(&self, ids: &[UserId]) -> Result<Vec<String>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|name| name.clone()))
            .collect())
    }
}
