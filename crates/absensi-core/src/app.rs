//! Application wiring.
//!
//! `App` bundles the services over one document store and one local cache,
//! the way a front end uses them. The services share the store connection
//! and the cache, so an invalidation declared by one is seen by all.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::attendance::AttendanceService;
use crate::auth::{CredentialStore, Session};
use crate::cache::{CacheManager, FileStorage};
use crate::config::Config;
use crate::models::Actor;
use crate::profile::ProfileService;
use crate::roster::RosterService;
use crate::store::{DocumentStore, FirestoreClient};
use crate::users::UserService;

/// Cache entries live in their own directory, apart from the session file
/// and logs.
const STORAGE_DIR: &str = "store";

pub struct App<S> {
    pub cache: CacheManager,
    pub roster: RosterService<S>,
    pub attendance: AttendanceService<S>,
    pub users: UserService<S>,
    pub profile: ProfileService<S>,
}

impl<S: DocumentStore> App<S> {
    pub fn new(store: Arc<S>, cache: CacheManager) -> Self {
        Self {
            roster: RosterService::new(Arc::clone(&store), cache.clone()),
            attendance: AttendanceService::new(Arc::clone(&store), cache.clone()),
            users: UserService::new(Arc::clone(&store), cache.clone()),
            profile: ProfileService::new(store, cache.clone()),
            cache,
        }
    }

    /// The signed-in caller, checked by the auth guard.
    pub async fn actor(&self, uid: &str) -> crate::error::Result<Actor> {
        self.profile.resolve_actor(uid).await
    }
}

impl App<FirestoreClient> {
    /// Connect to the configured project with a file-backed cache.
    ///
    /// An explicit `token` wins over the stored session, which wins over the
    /// keychain entry of the last signed-in user.
    pub fn connect(config: &Config, token: Option<String>) -> Result<(Self, Session)> {
        let project_id = config
            .project_id
            .as_deref()
            .context("No project configured. Set ABSENSI_PROJECT_ID or run `absensi login`")?;

        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(?cache_dir, "Cache directory configured");

        let mut session = Session::new(cache_dir.clone());
        if let Err(e) = session.load() {
            warn!(error = %e, "Failed to load session, continuing signed out");
        }

        let mut client = FirestoreClient::new(project_id, config.base_url.as_deref())
            .context("Failed to build document store client")?;
        let token = token
            .or_else(|| session.token().map(str::to_string))
            .or_else(|| {
                config
                    .last_uid
                    .as_deref()
                    .and_then(|uid| CredentialStore::token(uid).ok())
            });
        match token {
            Some(token) => client.set_token(token),
            None => debug!("No identity token, requests are unauthenticated"),
        }

        let storage = FileStorage::new(cache_dir.join(STORAGE_DIR)).context("Failed to open local cache")?;
        let cache = CacheManager::new(Arc::new(storage));
        Ok((Self::new(Arc::new(client), cache), session))
    }
}
