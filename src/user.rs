//! User identity used to key per-user tic baselines.

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};

/// Identifies whose baseline a frame updates. Not persisted.
///
/// Deserializes through [`UserKey::new`], so an empty string becomes `"default"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct UserKey(String);

impl UserKey {
    /// Key as given. An empty key maps to `"default"`.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        if key.is_empty() {
            Self::default_user()
        } else {
            Self(key)
        }
    }

    /// The signed-out sentinel.
    pub fn guest() -> Self {
        Self(defaults::GUEST_USER.to_string())
    }

    /// Fallback for frames arriving without any key.
    pub fn default_user() -> Self {
        Self(defaults::DEFAULT_USER.to_string())
    }

    /// Resolve a display name from a sign-in form: blank means guest.
    pub fn resolve(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(n) if !n.is_empty() => Self(n.to_string()),
            _ => Self::guest(),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.0 == defaults::GUEST_USER
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for UserKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Current user, live-updatable from another thread (sign-in, guest switch)
/// while capture keeps running.
#[derive(Debug, Clone)]
pub struct SharedUserKey(Arc<RwLock<UserKey>>);

impl SharedUserKey {
    pub fn new(key: UserKey) -> Self {
        Self(Arc::new(RwLock::new(key)))
    }

    pub fn get(&self) -> UserKey {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, key: UserKey) {
        match self.0.write() {
            Ok(mut guard) => *guard = key,
            Err(poisoned) => *poisoned.into_inner() = key,
        }
    }
}

impl Default for SharedUserKey {
    fn default() -> Self {
        Self::new(UserKey::guest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_maps_to_default() {
        assert_eq!(UserKey::new("").as_str(), "default");
        assert_eq!(UserKey::new("alice").as_str(), "alice");
    }

    #[test]
    fn resolve_blank_is_guest() {
        assert!(UserKey::resolve(None).is_guest());
        assert!(UserKey::resolve(Some("   ")).is_guest());
        assert_eq!(UserKey::resolve(Some(" bob ")).as_str(), "bob");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&UserKey::new("carol")).unwrap();
        assert_eq!(json, "\"carol\"");
    }

    #[test]
    fn deserializing_empty_key_gives_default() {
        let key: UserKey = serde_json::from_str("\"\"").unwrap();
        assert_eq!(key.as_str(), "default");
        let key: UserKey = serde_json::from_str("\"dana\"").unwrap();
        assert_eq!(key.as_str(), "dana");
    }

    #[test]
    fn shared_key_updates_are_visible_to_clones() {
        let shared = SharedUserKey::default();
        let reader = shared.clone();
        assert!(reader.get().is_guest());

        shared.set(UserKey::new("alice"));
        assert_eq!(reader.get().as_str(), "alice");
    }
}
