//! Credential storage.
//!
//! The bearer token lives in exactly one cookie-like record. Only a
//! [`TokenStore`] touches that record; everything else asks the store.

use std::fmt;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ApiError;

pub const COOKIE_NAME: &str = "auth_token";

/// Nominal credential lifetime.
pub const CREDENTIAL_LIFETIME_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes applied whenever a credential is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    pub name: String,
    pub path: String,
    pub lifetime: Duration,
    pub same_site: SameSite,
    pub secure: bool,
}

impl CookiePolicy {
    /// Site-wide, strict same-site, 7 days; `Secure` only in production.
    pub fn for_environment(production: bool) -> Self {
        Self {
            name: COOKIE_NAME.to_string(),
            path: "/".to_string(),
            lifetime: Duration::days(CREDENTIAL_LIFETIME_DAYS),
            same_site: SameSite::Strict,
            secure: production,
        }
    }
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self::for_environment(false)
    }
}

/// One persisted credential with its cookie attributes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub expires_at: DateTime<Utc>,
    pub same_site: SameSite,
    pub secure: bool,
}

impl StoredCookie {
    pub fn issue(policy: &CookiePolicy, token: &str, now: DateTime<Utc>) -> Self {
        Self {
            name: policy.name.clone(),
            value: token.to_string(),
            path: policy.path.clone(),
            expires_at: now + policy.lifetime,
            same_site: policy.same_site,
            secure: policy.secure,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Render as a `Set-Cookie` header value.
    pub fn set_cookie_header(&self, now: DateTime<Utc>) -> String {
        let max_age = (self.expires_at - now).num_seconds().max(0);
        let mut header = format!(
            "{}={}; Path={}; Expires={}; Max-Age={}; SameSite={}",
            self.name,
            self.value,
            self.path,
            self.expires_at.format("%a, %d %b %Y %H:%M:%S GMT"),
            max_age,
            self.same_site.as_str(),
        );
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }
}

impl fmt::Debug for StoredCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCookie")
            .field("name", &self.name)
            .field("value", &"***")
            .field("expires_at", &self.expires_at)
            .field("same_site", &self.same_site)
            .field("secure", &self.secure)
            .finish()
    }
}

/// Holder of the single active credential.
///
/// `set` replaces any previous credential in one step. `get` never returns
/// an expired credential.
pub trait TokenStore: Send + Sync + 'static {
    fn set(&self, token: &str) -> Result<(), ApiError>;
    fn get(&self) -> Option<String>;
    fn clear(&self) -> Result<(), ApiError>;
}

// ── MemoryTokenStore ────────────────────────────────────────────────

/// Process-local store. Used by tests and embedders that persist
/// elsewhere.
pub struct MemoryTokenStore {
    policy: CookiePolicy,
    cookie: RwLock<Option<StoredCookie>>,
}

impl MemoryTokenStore {
    pub fn new(policy: CookiePolicy) -> Self {
        Self {
            policy,
            cookie: RwLock::new(None),
        }
    }

    /// Start with a credential already present.
    pub fn with_token(policy: CookiePolicy, token: &str) -> Self {
        let cookie = StoredCookie::issue(&policy, token, Utc::now());
        Self::with_cookie(policy, cookie)
    }

    pub fn with_cookie(policy: CookiePolicy, cookie: StoredCookie) -> Self {
        Self {
            policy,
            cookie: RwLock::new(Some(cookie)),
        }
    }

    pub fn cookie(&self) -> Option<StoredCookie> {
        self.cookie
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new(CookiePolicy::default())
    }
}

impl TokenStore for MemoryTokenStore {
    fn set(&self, token: &str) -> Result<(), ApiError> {
        let cookie = StoredCookie::issue(&self.policy, token, Utc::now());
        *self.cookie.write().unwrap_or_else(PoisonError::into_inner) = Some(cookie);
        Ok(())
    }

    fn get(&self) -> Option<String> {
        let mut guard = self.cookie.write().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(c) if c.is_expired_at(Utc::now()) => {
                debug!("credential expired");
                *guard = None;
                None
            }
            Some(c) => Some(c.value.clone()),
            None => None,
        }
    }

    fn clear(&self) -> Result<(), ApiError> {
        *self.cookie.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// ── FileTokenStore ──────────────────────────────────────────────────

/// Credential persisted as a JSON cookie record on disk, surviving
/// restarts. Writes go to a sibling temp file that is renamed over the
/// record, so readers see either the old credential or the new one.
pub struct FileTokenStore {
    path: PathBuf,
    policy: CookiePolicy,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>, policy: CookiePolicy) -> Self {
        Self {
            path: path.into(),
            policy,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cookie(&self) -> Option<StoredCookie> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("cannot read credential file {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<StoredCookie>(&content) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("ignoring malformed credential file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn write(&self, cookie: &StoredCookie) -> Result<(), ApiError> {
        let storage = |e: std::io::Error| ApiError::Storage(format!("{}: {}", self.path.display(), e));
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(storage)?;
        }
        let body = serde_json::to_string_pretty(cookie)
            .map_err(|e| ApiError::Storage(format!("encode credential: {}", e)))?;
        let tmp = self.path.with_extension("tmp");
        // A leftover from an interrupted write may carry other permissions.
        match std::fs::remove_file(&tmp) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(storage(e)),
            _ => {}
        }
        let mut file = Self::create_private(&tmp).map_err(storage)?;
        file.write_all(body.as_bytes()).map_err(storage)?;
        file.sync_all().map_err(storage)?;
        drop(file);
        std::fs::rename(&tmp, &self.path).map_err(storage)
    }

    /// Owner-only from the moment the file exists.
    #[cfg(unix)]
    fn create_private(path: &Path) -> std::io::Result<std::fs::File> {
        use std::os::unix::fs::OpenOptionsExt;
        std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)
    }

    #[cfg(not(unix))]
    fn create_private(path: &Path) -> std::io::Result<std::fs::File> {
        std::fs::OpenOptions::new().write(true).create_new(true).open(path)
    }
}

impl TokenStore for FileTokenStore {
    fn set(&self, token: &str) -> Result<(), ApiError> {
        self.write(&StoredCookie::issue(&self.policy, token, Utc::now()))
    }

    fn get(&self) -> Option<String> {
        let cookie = self.cookie()?;
        if cookie.is_expired_at(Utc::now()) {
            debug!("credential expired, removing {}", self.path.display());
            let _ = self.clear();
            return None;
        }
        Some(cookie.value)
    }

    fn clear(&self) -> Result<(), ApiError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::Storage(format!("{}: {}", self.path.display(), e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // Policy / cookie attributes
    // =====================================================================

    #[test]
    fn policy_per_environment() {
        let dev = CookiePolicy::for_environment(false);
        assert_eq!(dev.lifetime, Duration::days(7));
        assert_eq!(dev.same_site, SameSite::Strict);
        assert!(!dev.secure);
        assert!(CookiePolicy::for_environment(true).secure);
    }

    #[test]
    fn set_cookie_header_attributes() {
        let now = Utc::now();
        let cookie = StoredCookie::issue(&CookiePolicy::for_environment(true), "abc", now);
        let header = cookie.set_cookie_header(now);
        assert!(header.starts_with("auth_token=abc; Path=/; Expires="));
        assert!(header.contains("Max-Age=604800"));
        assert!(header.contains("SameSite=Strict"));
        assert!(header.ends_with("; Secure"));

        let dev = StoredCookie::issue(&CookiePolicy::default(), "abc", now);
        assert!(!dev.set_cookie_header(now).contains("Secure"));
    }

    #[test]
    fn cookie_debug_hides_value() {
        let cookie = StoredCookie::issue(&CookiePolicy::default(), "secret-token", Utc::now());
        assert!(!format!("{cookie:?}").contains("secret-token"));
    }

    // =====================================================================
    // MemoryTokenStore
    // =====================================================================

    #[test]
    fn memory_set_get_clear() {
        let store = MemoryTokenStore::default();
        assert!(store.get().is_none());

        store.set("t1").unwrap();
        store.set("t2").unwrap();
        assert_eq!(store.get().as_deref(), Some("t2"));

        store.clear().unwrap();
        assert!(store.get().is_none());
    }

    #[test]
    fn memory_expired_cookie_reads_absent() {
        let policy = CookiePolicy::default();
        let issued = Utc::now() - Duration::days(8);
        let store = MemoryTokenStore::with_cookie(
            policy.clone(),
            StoredCookie::issue(&policy, "old", issued),
        );
        assert!(store.get().is_none());
        assert!(store.cookie().is_none());
    }

    // =====================================================================
    // FileTokenStore
    // =====================================================================

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credential.json");

        FileTokenStore::new(&path, CookiePolicy::default()).set("persisted").unwrap();

        let reopened = FileTokenStore::new(&path, CookiePolicy::default());
        assert_eq!(reopened.get().as_deref(), Some("persisted"));
        let cookie = reopened.cookie().unwrap();
        assert_eq!(cookie.same_site, SameSite::Strict);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn file_store_replaces_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("c.json"), CookiePolicy::default());

        store.set("first").unwrap();
        store.set("second").unwrap();
        assert_eq!(store.get().as_deref(), Some("second"));

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.get().is_none());
    }

    #[test]
    fn file_store_drops_expired_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        let policy = CookiePolicy::default();
        let stale = StoredCookie::issue(&policy, "stale", Utc::now() - Duration::days(30));
        std::fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

        let store = FileTokenStore::new(&path, policy);
        assert!(store.get().is_none());
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn file_store_writes_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        // Leftover from an interrupted write, readable by everyone.
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, "partial").unwrap();
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileTokenStore::new(&path, CookiePolicy::default());
        store.set("private").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!tmp.exists());
        assert_eq!(store.get().as_deref(), Some("private"));
    }

    #[test]
    fn file_store_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(FileTokenStore::new(&path, CookiePolicy::default()).get().is_none());
    }
}
