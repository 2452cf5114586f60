//! User profiles, keyed by username.
//!
//! The backing store is external in production; [`InMemoryProfileStore`]
//! follows the same semantics for tests and embedding. The avatar
//! configuration is opaque here and passed through untouched.

use crate::error::{Result, SignlensError};
use crate::user::{SharedUserKey, UserKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// A stored profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: u64,
    pub username: String,
    pub display_name: String,
    pub avatar_config: serde_json::Value,
    #[serde(rename = "optInEncryptedTemplates")]
    pub opt_in_templates: bool,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
}

/// Fields supplied on create and update.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_config: Option<serde_json::Value>,
    #[serde(default, rename = "optIn")]
    pub opt_in: bool,
}

impl ProfileRequest {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            ..Default::default()
        }
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    pub fn with_avatar_config(mut self, config: serde_json::Value) -> Self {
        self.avatar_config = Some(config);
        self
    }

    pub fn with_opt_in(mut self, opt_in: bool) -> Self {
        self.opt_in = opt_in;
        self
    }

    /// Display name, falling back to the username.
    fn resolved_display_name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.username.clone())
    }

    /// Avatar config, falling back to an empty object.
    fn resolved_avatar_config(&self) -> serde_json::Value {
        self.avatar_config
            .clone()
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()))
    }
}

/// Profile CRUD keyed by username.
pub trait ProfileStore: Send {
    /// Insert a profile unless one exists for the username. Returns the id of
    /// the stored profile either way.
    fn create(&mut self, request: &ProfileRequest) -> Result<u64>;

    fn get(&self, username: &str) -> Result<ProfileRecord>;

    /// Overwrite display name, avatar config and opt-in. A missing username
    /// is not an error and changes nothing.
    fn update(&mut self, request: &ProfileRequest) -> Result<()>;

    /// Remove a profile. Removing a missing profile succeeds.
    fn delete(&mut self, username: &str) -> Result<()>;
}

fn require_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(SignlensError::ProfileInvalid {
            message: "username required".to_string(),
        });
    }
    Ok(())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: HashMap<String, ProfileRecord>,
    next_id: u64,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn create(&mut self, request: &ProfileRequest) -> Result<u64> {
        require_username(&request.username)?;
        if let Some(existing) = self.profiles.get(&request.username) {
            return Ok(existing.id);
        }

        self.next_id += 1;
        let record = ProfileRecord {
            id: self.next_id,
            username: request.username.clone(),
            display_name: request.resolved_display_name(),
            avatar_config: request.resolved_avatar_config(),
            opt_in_templates: request.opt_in,
            created_at: now_millis(),
        };
        self.profiles.insert(request.username.clone(), record);
        Ok(self.next_id)
    }

    fn get(&self, username: &str) -> Result<ProfileRecord> {
        require_username(username)?;
        self.profiles
            .get(username)
            .cloned()
            .ok_or_else(|| SignlensError::ProfileNotFound {
                username: username.to_string(),
            })
    }

    fn update(&mut self, request: &ProfileRequest) -> Result<()> {
        require_username(&request.username)?;
        if let Some(record) = self.profiles.get_mut(&request.username) {
            record.display_name = request.resolved_display_name();
            record.avatar_config = request.resolved_avatar_config();
            record.opt_in_templates = request.opt_in;
        }
        Ok(())
    }

    fn delete(&mut self, username: &str) -> Result<()> {
        require_username(username)?;
        self.profiles.remove(username);
        Ok(())
    }
}

/// Sign in as `username`, creating the profile on first use, and make it the
/// current user for the running pipeline.
pub fn sign_in(
    store: &mut dyn ProfileStore,
    current: &SharedUserKey,
    username: &str,
) -> Result<ProfileRecord> {
    let username = username.trim();
    require_username(username)?;

    let profile = match store.get(username) {
        Ok(profile) => profile,
        Err(SignlensError::ProfileNotFound { .. }) => {
            debug!(user = username, "Creating profile on first sign-in");
            store.create(&ProfileRequest::new(username).with_display_name(username))?;
            store.get(username)?
        }
        Err(e) => return Err(e),
    };

    current.set(UserKey::new(username));
    info!(user = username, "Signed in");
    Ok(profile)
}

/// Switch back to the guest identity.
pub fn sign_out(current: &SharedUserKey) {
    current.set(UserKey::guest());
}

/// Delete the stored profile for `user`. Guests have nothing stored.
pub fn reset_profile(store: &mut dyn ProfileStore, user: &UserKey) -> Result<()> {
    if user.is_guest() {
        return Ok(());
    }
    store.delete(user.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_defaults_display_name_and_avatar() {
        let mut store = InMemoryProfileStore::new();
        let id = store.create(&ProfileRequest::new("alice")).unwrap();

        let profile = store.get("alice").unwrap();
        assert_eq!(profile.id, id);
        assert_eq!(profile.display_name, "alice");
        assert_eq!(profile.avatar_config, json!({}));
        assert!(!profile.opt_in_templates);
    }

    #[test]
    fn create_is_insert_or_ignore() {
        let mut store = InMemoryProfileStore::new();
        let first = store
            .create(&ProfileRequest::new("alice").with_display_name("Alice"))
            .unwrap();
        let second = store
            .create(&ProfileRequest::new("alice").with_display_name("Other"))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("alice").unwrap().display_name, "Alice");
    }

    #[test]
    fn avatar_config_passes_through_untouched() {
        let mut store = InMemoryProfileStore::new();
        let avatar = json!({"skin": "#c58c85", "rig": {"scale": 1.1, "bones": [1, 2]}});
        store
            .create(&ProfileRequest::new("bob").with_avatar_config(avatar.clone()))
            .unwrap();

        assert_eq!(store.get("bob").unwrap().avatar_config, avatar);
    }

    #[test]
    fn update_missing_user_is_silent_noop() {
        let mut store = InMemoryProfileStore::new();
        store
            .update(&ProfileRequest::new("ghost").with_opt_in(true))
            .unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn update_overwrites_fields() {
        let mut store = InMemoryProfileStore::new();
        store.create(&ProfileRequest::new("carol")).unwrap();
        store
            .update(&ProfileRequest::new("carol").with_opt_in(true))
            .unwrap();

        let profile = store.get("carol").unwrap();
        assert!(profile.opt_in_templates);
        assert_eq!(profile.display_name, "carol");
    }

    #[test]
    fn delete_is_idempotent() {
        let mut store = InMemoryProfileStore::new();
        store.create(&ProfileRequest::new("dave")).unwrap();
        store.delete("dave").unwrap();
        store.delete("dave").unwrap();
        assert!(matches!(
            store.get("dave"),
            Err(SignlensError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn empty_username_rejected_everywhere() {
        let mut store = InMemoryProfileStore::new();
        assert!(matches!(
            store.create(&ProfileRequest::new("")),
            Err(SignlensError::ProfileInvalid { .. })
        ));
        assert!(store.get(" ").is_err());
        assert!(store.update(&ProfileRequest::new("")).is_err());
        assert!(store.delete("").is_err());
    }

    #[test]
    fn sign_in_creates_profile_and_switches_user() {
        let mut store = InMemoryProfileStore::new();
        let current = SharedUserKey::default();

        let profile = sign_in(&mut store, &current, "  erin ").unwrap();

        assert_eq!(profile.username, "erin");
        assert_eq!(current.get().as_str(), "erin");
        assert_eq!(store.len(), 1);

        sign_in(&mut store, &current, "erin").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sign_in_blank_keeps_current_user() {
        let mut store = InMemoryProfileStore::new();
        let current = SharedUserKey::default();

        assert!(sign_in(&mut store, &current, "   ").is_err());
        assert!(current.get().is_guest());
    }

    #[test]
    fn sign_out_returns_to_guest() {
        let current = SharedUserKey::new(UserKey::new("frank"));
        sign_out(&current);
        assert!(current.get().is_guest());
    }

    #[test]
    fn reset_profile_skips_guest() {
        let mut store = InMemoryProfileStore::new();
        store.create(&ProfileRequest::new("gina")).unwrap();

        reset_profile(&mut store, &UserKey::guest()).unwrap();
        assert_eq!(store.len(), 1);
        reset_profile(&mut store, &UserKey::new("gina")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn record_serializes_with_wire_names() {
        let mut store = InMemoryProfileStore::new();
        store.create(&ProfileRequest::new("hal")).unwrap();
        let value = serde_json::to_value(store.get("hal").unwrap()).unwrap();

        assert_eq!(value["displayName"], "hal");
        assert_eq!(value["optInEncryptedTemplates"], false);
        assert!(value.get("avatarConfig").is_some());
    }
}
