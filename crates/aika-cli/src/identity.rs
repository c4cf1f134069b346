//! Local user identity.
//!
//! Each installation gets a persistent user UUID stored in `identity.json`.
//! Entries record it as their creator, and it names the personal scope.

use std::path::{Path, PathBuf};

use aika_core::{OrganizationId, Session, UserId};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User identity stored in `identity.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Persistent UUID for this user.
    pub user_id: String,
    /// Human-friendly display name.
    pub name: String,
}

impl UserIdentity {
    /// The session for this user, in `organization` if one is given.
    pub fn session(&self, organization: Option<&str>) -> Result<Session> {
        let user = UserId::new(self.user_id.as_str()).context("identity.json has an empty user_id")?;
        let organization = organization
            .map(OrganizationId::new)
            .transpose()
            .context("organization cannot be empty")?;
        Ok(Session { user, organization })
    }
}

/// Returns the path to identity.json in the XDG data directory.
pub fn identity_json_path() -> Result<PathBuf> {
    let data_dir = crate::config::data_dir().context("could not determine data directory")?;
    Ok(data_dir.join("identity.json"))
}

/// Loads the user identity from identity.json.
///
/// Returns `None` if the file doesn't exist.
/// Returns an error if the file exists but is unreadable/unparseable.
pub fn load_identity() -> Result<Option<UserIdentity>> {
    load_from(&identity_json_path()?)
}

fn load_from(path: &Path) -> Result<Option<UserIdentity>> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let identity: UserIdentity =
                serde_json::from_str(&content).context("failed to parse identity.json")?;
            Ok(Some(identity))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).context("failed to read identity.json"),
    }
}

/// Loads the user identity, failing with a helpful message if not found.
pub fn require_identity() -> Result<UserIdentity> {
    load_identity()?.context("No identity found. Run 'aika init' first.")
}

/// Initializes the user identity.
///
/// An existing identity is kept (renamed if `name` is given); otherwise a new
/// UUID is generated, named after the host unless `name` is given.
pub fn init_identity(name: Option<&str>) -> Result<UserIdentity> {
    init_identity_at(&identity_json_path()?, name)
}

pub(crate) fn init_identity_at(path: &Path, name: Option<&str>) -> Result<UserIdentity> {
    let default_name = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    let identity = if let Some(mut existing) = load_from(path)? {
        if let Some(new_name) = name {
            existing.name = new_name.to_string();
            save_to(path, &existing)?;
        }
        existing
    } else {
        let identity = UserIdentity {
            user_id: Uuid::new_v4().to_string(),
            name: name.unwrap_or(&default_name).to_string(),
        };
        save_to(path, &identity)?;
        identity
    };

    Ok(identity)
}

fn save_to(path: &Path, identity: &UserIdentity) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("failed to create data directory")?;
    }
    let json = serde_json::to_string_pretty(identity).context("failed to serialize identity")?;
    std::fs::write(path, json).context("failed to write identity.json")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_new_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");

        let identity = init_identity_at(&path, Some("sami")).unwrap();
        assert_eq!(identity.name, "sami");
        Uuid::parse_str(&identity.user_id).unwrap();
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");

        let first = init_identity_at(&path, Some("sami")).unwrap();
        let second = init_identity_at(&path, None).unwrap();
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(first.name, second.name);
    }

    #[test]
    fn test_init_renames_existing_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");

        let first = init_identity_at(&path, Some("old")).unwrap();
        let second = init_identity_at(&path, Some("new")).unwrap();
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(load_from(&path).unwrap().unwrap().name, "new");
    }

    #[test]
    fn test_session_uses_organization_scope() {
        let identity = UserIdentity {
            user_id: "user-1".to_string(),
            name: "sami".to_string(),
        };
        let personal = identity.session(None).unwrap();
        assert_eq!(personal.scope().to_string(), "user:user-1");

        let shared = identity.session(Some("org-7")).unwrap();
        assert_eq!(shared.scope().to_string(), "organization:org-7");
        assert_eq!(shared.user.as_str(), "user-1");

        assert!(identity.session(Some("")).is_err());
    }

    #[test]
    fn test_load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_from(&dir.path().join("identity.json")).unwrap().is_none());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_from(&path).is_err());
    }
}
