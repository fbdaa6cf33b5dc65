use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{models::UserEntity, storage::StorageResult};

/// Seam towards the user registry: the coordinator only reads users and rewrites their stats.
pub trait UserStore: Send + Sync {
    /// Load a user by id.
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Insert or replace a user record.
    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;
}

/// Process-local user registry.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, UserEntity>>>,
}

impl MemoryUserStore {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a user with empty stats and return its record.
    pub async fn register_user(&self, username: impl Into<String>) -> UserEntity {
        let user = UserEntity::new(username);
        self.users.write().await.insert(user.id, user.clone());
        user
    }
}

impl UserStore for MemoryUserStore {
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let users = self.users.clone();
        Box::pin(async move { Ok(users.read().await.get(&id).cloned()) })
    }

    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let users = self.users.clone();
        Box::pin(async move {
            users.write().await.insert(user.id, user);
            Ok(())
        })
    }
}
