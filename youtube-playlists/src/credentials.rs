//! The persisted authorization credential and its on-disk store.
//!
//! The token file is a small versioned JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "access_token": "ya29...",
//!   "refresh_token": "1//0g...",
//!   "expires_at": "2025-01-01T12:00:00Z",
//!   "scopes": ["https://www.googleapis.com/auth/youtube"]
//! }
//! ```
//!
//! `refresh_token` and `expires_at` may be `null`. A credential without an expiry is considered
//! valid until the API says otherwise.

use eyre::Context;
use jiff::{SignedDuration, Timestamp};
use oauth2::TokenResponse;
use oauth2::basic::BasicTokenResponse;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Version of the token file schema written by [`CredentialStore::save`].
pub const CREDENTIAL_SCHEMA_VERSION: u32 = 1;

/// Access tokens this close to expiry are treated as already expired.
const EXPIRY_SKEW: SignedDuration = SignedDuration::from_mins(5);

/// An OAuth authorization for the YouTube Data API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<Timestamp>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl Credential {
    /// Builds a credential from a token endpoint response received at `now`.
    ///
    /// Google omits `scope` from some responses, in which case `requested_scopes` is recorded.
    pub fn from_token_response(
        token: &BasicTokenResponse,
        requested_scopes: &[String],
        now: Timestamp,
    ) -> Self {
        let expires_at = token
            .expires_in()
            .and_then(|expires_in| SignedDuration::try_from(expires_in).ok())
            .and_then(|expires_in| now.checked_add(expires_in).ok());
        let scopes = match token.scopes() {
            Some(scopes) if !scopes.is_empty() => {
                scopes.iter().map(|scope| scope.to_string()).collect()
            }
            _ => requested_scopes.to_vec(),
        };
        Self {
            access_token: token.access_token().secret().to_string(),
            refresh_token: token.refresh_token().map(|rt| rt.secret().to_string()),
            expires_at,
            scopes,
        }
    }

    /// Whether the access token can still be used at `now`.
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => match now.checked_add(EXPIRY_SKEW) {
                Ok(deadline) => deadline < expires_at,
                Err(_) => false,
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Timestamp::now())
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Folds a freshly refreshed credential into this one's lineage.
    ///
    /// Google does not always hand out a new refresh token on refresh, so the existing one is
    /// kept unless replaced.
    pub fn refreshed_with(&self, mut fresh: Credential) -> Credential {
        if fresh.refresh_token.is_none() {
            tracing::trace!("refreshed credential lacks refresh token, preserving original");
            fresh.refresh_token = self.refresh_token.clone();
        }
        if fresh.scopes.is_empty() {
            fresh.scopes = self.scopes.clone();
        }
        fresh
    }
}

#[derive(Serialize)]
struct StoredCredentialRef<'a> {
    version: u32,
    #[serde(flatten)]
    credential: &'a Credential,
}

#[derive(Deserialize)]
struct StoredCredential {
    version: u32,
    #[serde(flatten)]
    credential: Credential,
}

/// Reads and writes the [`Credential`] kept at the configured token path.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored credential, if there is a usable one.
    ///
    /// Every failure (missing file, unreadable file, corrupt content, unknown schema version) is
    /// logged and reported as `None` so the caller falls back to asking for fresh consent.
    pub async fn load(&self) -> Option<Credential> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no stored credential");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "error loading credentials: {e}");
                return None;
            }
        };

        let stored: StoredCredential = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "error parsing credentials: {e}");
                return None;
            }
        };

        if stored.version != CREDENTIAL_SCHEMA_VERSION {
            tracing::warn!(
                path = %self.path.display(),
                version = stored.version,
                expected = CREDENTIAL_SCHEMA_VERSION,
                "unsupported credential schema version"
            );
            return None;
        }

        tracing::debug!(path = %self.path.display(), "loaded stored credential");
        Some(stored.credential)
    }

    /// Persists `credential`, replacing whatever was stored before.
    ///
    /// The document is written to a sibling temporary file and then renamed over the token file,
    /// so a crash mid-write never clobbers a previously valid token.
    pub async fn save(&self, credential: &Credential) -> eyre::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create token directory {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&StoredCredentialRef {
            version: CREDENTIAL_SCHEMA_VERSION,
            credential,
        })
        .context("serialize credential")?;

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, json)
            .await
            .with_context(|| format!("write temporary token file {}", temp_path.display()))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("move token file into place at {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), "saved credential");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn credential(expires_at: Option<Timestamp>) -> Credential {
        Credential {
            access_token: "ya29.access".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expires_at,
            scopes: vec!["https://www.googleapis.com/auth/youtube".to_string()],
        }
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));
        let original = credential(Some("2030-01-01T00:00:00Z".parse().unwrap()));

        store.save(&original).await.unwrap();
        let loaded = store.load().await.expect("credential was just saved");

        assert_eq!(loaded, original);
        assert_eq!(store.path(), dir.path().join("token.json"));
        assert!(store.path().exists());
        assert!(!dir.path().join("token.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_overwrites_and_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("nested").join("token.json"));

        store.save(&credential(None)).await.unwrap();
        let mut second = credential(None);
        second.access_token = "ya29.second".to_string();
        store.save(&second).await.unwrap();

        assert_eq!(store.load().await, Some(second));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, b"\x80\x04\x95 pickled garbage").unwrap();

        assert_eq!(CredentialStore::new(path).load().await, None);
    }

    #[tokio::test]
    async fn test_load_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(
            &path,
            r#"{"version": 2, "access_token": "a", "refresh_token": null, "expires_at": null}"#,
        )
        .unwrap();

        assert_eq!(CredentialStore::new(path).load().await, None);
    }

    #[test]
    fn test_validity() {
        let now: Timestamp = "2025-06-01T12:00:00Z".parse().unwrap();

        assert!(credential(None).is_valid_at(now));
        assert!(credential(Some("2025-06-01T13:00:00Z".parse().unwrap())).is_valid_at(now));
        // inside the skew window
        assert!(!credential(Some("2025-06-01T12:03:00Z".parse().unwrap())).is_valid_at(now));
        assert!(!credential(Some("2025-06-01T11:00:00Z".parse().unwrap())).is_valid_at(now));
    }

    #[test]
    fn test_refreshed_with_preserves_refresh_token() {
        let old = credential(None);
        let fresh = Credential {
            access_token: "ya29.fresh".to_string(),
            refresh_token: None,
            expires_at: None,
            scopes: vec![],
        };

        let merged = old.refreshed_with(fresh);
        assert_eq!(merged.access_token, "ya29.fresh");
        assert_eq!(merged.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(merged.scopes, old.scopes);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", credential(None));
        assert!(!rendered.contains("ya29"), "{rendered}");
        assert!(!rendered.contains("1//refresh"), "{rendered}");
    }

    #[test]
    fn test_from_token_response() {
        let token: BasicTokenResponse = serde_json::from_str(
            r#"{"access_token": "ya29.new", "token_type": "Bearer", "expires_in": 3599}"#,
        )
        .unwrap();
        let now: Timestamp = "2025-06-01T12:00:00Z".parse().unwrap();
        let scopes = vec!["https://www.googleapis.com/auth/youtube".to_string()];

        let credential = Credential::from_token_response(&token, &scopes, now);
        assert_eq!(credential.access_token, "ya29.new");
        assert_eq!(credential.refresh_token, None);
        assert_eq!(
            credential.expires_at,
            Some("2025-06-01T12:59:59Z".parse().unwrap())
        );
        assert_eq!(credential.scopes, scopes);
    }
}
