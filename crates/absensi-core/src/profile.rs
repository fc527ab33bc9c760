//! Signed-in profile, the auth guard and school settings.

use std::sync::Arc;

use chrono::SecondsFormat;
use serde_json::Value;
use tracing::{debug, info};

use crate::access::{authorize, Action};
use crate::cache::kinds::{LoginSession, ProfileCache, SettingsCache, UserList, ALL};
use crate::cache::{CacheManager, Mutation};
use crate::error::{Error, PolicyError, Result};
use crate::models::{Actor, Role, SchoolSettings, User};
use crate::store::{collections, fields, to_fields, DocumentStore, StoreError, Write};
use crate::utils::{email_local_part, encode_uri_component};

const AVATAR_BASE: &str = "https://ui-avatars.com/api/";

/// Name shown for a user: the profile name, the email local part, or "User".
pub fn display_name(user: &User) -> String {
    user.name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .or_else(|| user.email.as_deref().and_then(email_local_part))
        .unwrap_or("User")
        .to_string()
}

/// The profile photo, or a generated initials avatar.
pub fn avatar_url(user: &User) -> String {
    if let Some(photo) = user.photo.as_deref().filter(|p| !p.is_empty()) {
        return photo.to_string();
    }
    let name = user
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .or(user.email.as_deref())
        .unwrap_or("User");
    format!(
        "{}?name={}&background=6366f1&color=fff&bold=true",
        AVATAR_BASE,
        encode_uri_component(name)
    )
}

pub struct ProfileService<S> {
    store: Arc<S>,
    cache: CacheManager,
}

impl<S> Clone for ProfileService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: self.cache.clone(),
        }
    }
}

impl<S: DocumentStore> ProfileService<S> {
    pub fn new(store: Arc<S>, cache: CacheManager) -> Self {
        Self { store, cache }
    }

    async fn fetch_user(&self, uid: &str) -> Result<User> {
        let doc = self
            .store
            .get(collections::USERS, uid)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collections::USERS, uid)))?;
        Ok(doc.decode()?)
    }

    pub async fn current_profile(&self, uid: &str, force_refresh: bool) -> Result<User> {
        self.cache
            .read_through::<ProfileCache, _, _, Error>(uid, force_refresh, || self.fetch_user(uid))
            .await
    }

    /// Resolve the caller for a service operation.
    ///
    /// Uses the cached login session when there is one. Accounts that are not
    /// verified are turned away unless they are admins.
    pub async fn resolve_actor(&self, uid: &str) -> Result<Actor> {
        let actor = match self.cache.get::<LoginSession>(uid) {
            Some(actor) => {
                debug!(uid, "Login session from cache");
                actor
            }
            None => {
                let actor = self.fetch_user(uid).await?.actor();
                self.cache.set::<LoginSession>(uid, &actor);
                actor
            }
        };

        if !actor.verified && actor.role < Role::Admin {
            return Err(PolicyError::NotVerified.into());
        }
        Ok(actor)
    }

    /// First sign-in: load the account, creating an unverified viewer
    /// profile when none exists yet.
    pub async fn register(
        &self,
        uid: &str,
        name: Option<&str>,
        email: Option<&str>,
        photo: Option<&str>,
    ) -> Result<User> {
        if let Some(actor) = self.cache.get::<LoginSession>(uid) {
            if let Some(user) = self.cache.get::<ProfileCache>(uid) {
                debug!(uid, role = %actor.role, "Sign-in from cached session");
                return Ok(user);
            }
        }

        if let Some(doc) = self.store.get(collections::USERS, uid).await? {
            let user: User = doc.decode()?;
            self.cache.set::<LoginSession>(uid, &user.actor());
            self.cache.set::<ProfileCache>(uid, &user);
            return Ok(user);
        }

        let user = User {
            uid: uid.to_string(),
            name: name.map(str::to_string),
            email: email.map(str::to_string),
            photo: photo.map(str::to_string),
            role: Role::Viewer,
            verified: false,
        };
        let mut doc = to_fields(uid, &user)?;
        doc.insert("uid".to_string(), Value::String(uid.to_string()));
        doc.insert("createdAt".to_string(), Value::String(self.timestamp()));
        self.store
            .commit(vec![Write::Set {
                collection: collections::USERS.to_string(),
                id: uid.to_string(),
                fields: doc,
                merge: false,
            }])
            .await?;

        self.cache.remove::<UserList>(ALL);
        self.cache.set::<LoginSession>(uid, &user.actor());
        self.cache.set::<ProfileCache>(uid, &user);
        info!(uid, "New user profile created");
        Ok(user)
    }

    /// Update the caller's own name and NIP.
    pub async fn update_profile(&self, uid: &str, name: &str, nip: Option<&str>) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PolicyError::InvalidInput("Name must not be empty".to_string()).into());
        }
        let nip = nip.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("-");
        let changes = fields([
            ("nama", Value::String(name.to_string())),
            ("nip", Value::String(nip.to_string())),
            ("updatedAt", Value::String(self.timestamp())),
        ]);
        self.store
            .commit(vec![Write::update(collections::USERS, uid, changes)])
            .await?;
        self.cache.invalidate(&Mutation::UserChanged { uid: uid.to_string() });
        Ok(())
    }

    /// Forget everything cached for the signed-in user.
    pub fn sign_out(&self, uid: &str) {
        self.cache.remove::<ProfileCache>(uid);
        self.cache.clear::<LoginSession>();
        self.cache.clear::<UserList>();
        self.cache.clear_draft();
        info!(uid, "Signed out");
    }

    pub async fn school_settings(&self, force_refresh: bool) -> Result<SchoolSettings> {
        self.cache
            .read_through::<SettingsCache, _, _, Error>(ALL, force_refresh, || async {
                let doc = self
                    .store
                    .get(collections::SETTINGS, collections::SCHOOL_SETTINGS_ID)
                    .await?;
                match doc {
                    Some(doc) => Ok(doc.decode()?),
                    None => Ok(SchoolSettings::default()),
                }
            })
            .await
    }

    pub async fn update_settings(&self, actor: &Actor, settings: &SchoolSettings) -> Result<()> {
        authorize(actor, Action::ManageSettings)?;
        self.store
            .commit(vec![Write::set(
                collections::SETTINGS,
                collections::SCHOOL_SETTINGS_ID,
                settings,
                true,
            )?])
            .await?;
        self.cache.invalidate(&Mutation::SettingsChanged);
        info!(by = %actor.uid, "School settings updated");
        Ok(())
    }

    fn timestamp(&self) -> String {
        self.cache.now().to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}
