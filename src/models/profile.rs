//! Site owner profile.

use serde::{Deserialize, Serialize};

/// Singleton profile record stored at a fixed path.
///
/// Has no id or creation time; saving replaces the whole record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Logo image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_logo: Option<String>,
    /// Biography text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl Profile {
    /// Creates an empty profile.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            user_logo: None,
            bio: None,
        }
    }

    /// Sets the logo reference.
    #[must_use]
    pub fn with_user_logo(mut self, logo: impl Into<String>) -> Self {
        self.user_logo = Some(logo.into());
        self
    }

    /// Sets the biography.
    #[must_use]
    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_wire_shape() {
        let profile = Profile::new().with_user_logo("https://x/logo.png");
        assert_eq!(
            serde_json::to_value(&profile).unwrap(),
            json!({"userLogo": "https://x/logo.png"})
        );

        let parsed: Profile = serde_json::from_value(json!({"bio": "hi"})).unwrap();
        assert_eq!(parsed, Profile::new().with_bio("hi"));
    }

    #[test]
    fn test_profile_rejects_wrong_types() {
        assert!(serde_json::from_value::<Profile>(json!({"bio": 42})).is_err());
    }
}
