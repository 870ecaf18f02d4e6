//! Work history entries.

use super::record::CollectionEntry;
use serde::{Deserialize, Serialize};

/// One entry in the work history.
///
/// `period` is a free-text label ("2021 - Present") and is never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkExperience {
    /// Employer name.
    pub company: String,
    /// Role or title held.
    pub role: String,
    /// Display label for the time span.
    #[serde(default)]
    pub period: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
}

impl WorkExperience {
    /// Creates a work experience entry.
    #[must_use]
    pub fn new(
        company: impl Into<String>,
        role: impl Into<String>,
        period: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            company: company.into(),
            role: role.into(),
            period: period.into(),
            description: description.into(),
        }
    }
}

/// Field-level update for a work experience entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkExperiencePatch {
    /// New employer name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// New role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// New period label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CollectionEntry for WorkExperience {
    const KIND: &'static str = "work experience";

    type Patch = WorkExperiencePatch;

    fn validate(&self) -> std::result::Result<(), String> {
        if self.company.trim().is_empty() {
            return Err("company must not be empty".to_string());
        }
        if self.role.trim().is_empty() {
            return Err("role must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate() {
        assert!(WorkExperience::new("Acme", "Engineer", "2020 - 2022", "").validate().is_ok());
        assert!(WorkExperience::new("", "Engineer", "", "").validate().is_err());
        assert!(WorkExperience::new("Acme", " ", "", "").validate().is_err());
    }

    #[test]
    fn test_period_is_opaque_text() {
        let value = json!({
            "company": "Acme",
            "role": "Lead",
            "period": "Summer, some years ago",
            "description": "d",
            "createdAt": 1_700_000_000_000_i64
        });
        let entry: WorkExperience = serde_json::from_value(value).unwrap();
        assert_eq!(entry.period, "Summer, some years ago");
    }

    #[test]
    fn test_patch_shape() {
        let patch = WorkExperiencePatch {
            role: Some("Staff Engineer".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"role": "Staff Engineer"})
        );
    }
}
