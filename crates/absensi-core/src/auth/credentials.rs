use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "absensi";

/// Identity tokens in the OS keychain, one entry per uid.
pub struct CredentialStore;

impl CredentialStore {
    pub fn store_token(uid: &str, token: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, uid).context("Failed to create keyring entry")?;
        entry
            .set_password(token)
            .context("Failed to store token in keychain")?;
        Ok(())
    }

    pub fn token(uid: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, uid).context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve token from keychain")
    }

    /// Remove the stored token. A missing entry is not an error.
    pub fn delete(uid: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, uid).context("Failed to create keyring entry")?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }

    pub fn has_token(uid: &str) -> bool {
        Entry::new(SERVICE_NAME, uid)
            .and_then(|entry| entry.get_password())
            .is_ok()
    }
}
