//! User administration and the live user-list watcher.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::access::{authorize_account_change, Action};
use crate::cache::kinds::{UserList, ALL};
use crate::cache::{CacheManager, Mutation};
use crate::error::{Error, PolicyError, Result};
use crate::models::{Actor, Role, User};
use crate::store::{collections, decode_all, fields, DocumentStore, StoreError, Write};

/// Buffer size for the watcher channel.
const UPDATE_CHANNEL_SIZE: usize = 16;

pub struct UserService<S> {
    store: Arc<S>,
    cache: CacheManager,
}

impl<S> Clone for UserService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: self.cache.clone(),
        }
    }
}

async fn fetch_users<S: DocumentStore>(store: &S) -> std::result::Result<Vec<User>, StoreError> {
    let docs = store.list(collections::USERS).await?;
    let mut users: Vec<User> = decode_all(&docs)?;
    users.sort_by(|a, b| {
        let a_key = a.name.as_deref().or(a.email.as_deref()).unwrap_or("").to_lowercase();
        let b_key = b.name.as_deref().or(b.email.as_deref()).unwrap_or("").to_lowercase();
        a_key.cmp(&b_key).then_with(|| a.uid.cmp(&b.uid))
    });
    Ok(users)
}

impl<S: DocumentStore> UserService<S> {
    pub fn new(store: Arc<S>, cache: CacheManager) -> Self {
        Self { store, cache }
    }

    pub async fn list_users(&self, force_refresh: bool) -> Result<Vec<User>> {
        self.cache
            .read_through::<UserList, _, _, Error>(ALL, force_refresh, || async {
                Ok(fetch_users(self.store.as_ref()).await?)
            })
            .await
    }

    async fn require_user(&self, uid: &str) -> Result<User> {
        let doc = self
            .store
            .get(collections::USERS, uid)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collections::USERS, uid)))?;
        Ok(doc.decode()?)
    }

    async fn patch_user(&self, uid: &str, changes: Vec<(&str, Value)>) -> Result<()> {
        self.store
            .commit(vec![Write::update(collections::USERS, uid, fields(changes))])
            .await?;
        self.cache.invalidate(&Mutation::UserChanged { uid: uid.to_string() });
        Ok(())
    }

    pub async fn set_verified(&self, actor: &Actor, uid: &str, verified: bool) -> Result<User> {
        let mut target = self.require_user(uid).await?;
        authorize_account_change(actor, uid, target.role, None, Action::VerifyUser)?;
        self.patch_user(uid, vec![("isVerified", Value::Bool(verified))]).await?;
        info!(uid, verified, by = %actor.uid, "User verification changed");
        target.verified = verified;
        Ok(target)
    }

    pub async fn set_role(&self, actor: &Actor, uid: &str, role: Role) -> Result<User> {
        let mut target = self.require_user(uid).await?;
        authorize_account_change(actor, uid, target.role, Some(role), Action::ChangeRole)?;
        self.patch_user(uid, vec![("role", Value::String(role.as_str().to_string()))])
            .await?;
        info!(uid, from = %target.role, to = %role, by = %actor.uid, "User role changed");
        target.role = role;
        Ok(target)
    }

    /// Move a user one step up the role ladder.
    pub async fn promote(&self, actor: &Actor, uid: &str) -> Result<User> {
        let target = self.require_user(uid).await?;
        let role = target.role.next().ok_or_else(|| {
            PolicyError::InvalidInput(format!("{} is already the highest role", target.role))
        })?;
        self.set_role(actor, uid, role).await
    }

    /// Move a user one step down the role ladder.
    pub async fn demote(&self, actor: &Actor, uid: &str) -> Result<User> {
        let target = self.require_user(uid).await?;
        let role = target.role.prev().ok_or_else(|| {
            PolicyError::InvalidInput(format!("{} is already the lowest role", target.role))
        })?;
        self.set_role(actor, uid, role).await
    }

    pub async fn delete_user(&self, actor: &Actor, uid: &str) -> Result<()> {
        let target = self.require_user(uid).await?;
        authorize_account_change(actor, uid, target.role, None, Action::DeleteUser)?;
        self.store
            .commit(vec![Write::delete(collections::USERS, uid)])
            .await?;
        self.cache.invalidate(&Mutation::UserChanged { uid: uid.to_string() });
        info!(uid, by = %actor.uid, "User deleted");
        Ok(())
    }
}

impl<S: DocumentStore + 'static> UserService<S> {
    /// Start watching the user list.
    ///
    /// The first update comes from cache when a fresh copy exists. After
    /// that the store is polled every `interval` and an update is sent only
    /// when the list changed. Dropping the subscription stops the watcher.
    pub fn subscribe(&self, interval: Duration) -> UserSubscription {
        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_SIZE);
        let store = Arc::clone(&self.store);
        let cache = self.cache.clone();

        let handle = tokio::spawn(async move {
            let mut last: Option<Vec<User>> = None;
            if let Some(cached) = cache.get::<UserList>(ALL) {
                let update = UserListUpdate {
                    users: cached.clone(),
                    from_cache: true,
                };
                if tx.send(update).await.is_err() {
                    return;
                }
                last = Some(cached);
            }

            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match fetch_users(store.as_ref()).await {
                    Ok(users) => {
                        if last.as_ref() == Some(&users) {
                            continue;
                        }
                        cache.set::<UserList>(ALL, &users);
                        let update = UserListUpdate {
                            users: users.clone(),
                            from_cache: false,
                        };
                        if tx.send(update).await.is_err() {
                            debug!("User list receiver dropped, stopping watcher");
                            return;
                        }
                        last = Some(users);
                    }
                    Err(e) => warn!(error = %e, "User list poll failed"),
                }
            }
        });

        UserSubscription { rx, handle }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListUpdate {
    pub users: Vec<User>,
    pub from_cache: bool,
}

/// Handle to a running user-list watcher.
pub struct UserSubscription {
    rx: mpsc::Receiver<UserListUpdate>,
    handle: JoinHandle<()>,
}

impl UserSubscription {
    /// Wait for the next update. `None` once the watcher has stopped.
    pub async fn recv(&mut self) -> Option<UserListUpdate> {
        self.rx.recv().await
    }

    pub fn stop(&mut self) {
        self.handle.abort();
        self.rx.close();
    }
}

impl Drop for UserSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
