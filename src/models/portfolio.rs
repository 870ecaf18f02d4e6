//! Portfolio project entries.

use super::record::CollectionEntry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of project shown in the portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// Web application or site.
    Web,
    /// Mobile application.
    Mobile,
}

impl ProjectType {
    /// Returns the stored string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Mobile => "mobile",
        }
    }

    /// Parses a project type (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "web" => Some(Self::Web),
            "mobile" => Some(Self::Mobile),
            _ => None,
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A portfolio project.
///
/// `technologies` keeps the caller's order and duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioItem {
    /// Project title.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Optional image reference (URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Technology tags, in display order.
    #[serde(default)]
    pub technologies: Vec<String>,
    /// Project kind.
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    /// Source repository URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    /// Live deployment URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
}

impl PortfolioItem {
    /// Creates a portfolio item with no image, tags, or links.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        project_type: ProjectType,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            image: None,
            technologies: Vec::new(),
            project_type,
            github_url: None,
            live_url: None,
        }
    }

    /// Sets the image reference.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Sets the technology tags.
    #[must_use]
    pub fn with_technologies<I, S>(mut self, technologies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.technologies = technologies.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the source repository URL.
    #[must_use]
    pub fn with_github_url(mut self, url: impl Into<String>) -> Self {
        self.github_url = Some(url.into());
        self
    }

    /// Sets the live deployment URL.
    #[must_use]
    pub fn with_live_url(mut self, url: impl Into<String>) -> Self {
        self.live_url = Some(url.into());
        self
    }
}

/// Field-level update for a portfolio item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioItemPatch {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Replacement technology list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Vec<String>>,
    /// New project kind.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub project_type: Option<ProjectType>,
    /// New source repository URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    /// New live deployment URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
}

impl PortfolioItemPatch {
    /// Returns true when the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.technologies.is_none()
            && self.project_type.is_none()
            && self.github_url.is_none()
            && self.live_url.is_none()
    }
}

impl CollectionEntry for PortfolioItem {
    const KIND: &'static str = "portfolio item";

    type Patch = PortfolioItemPatch;

    fn validate(&self) -> std::result::Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        Ok(())
    }

    fn seed() -> Vec<Self> {
        sample_items()
    }
}

/// Sample projects written into an absent portfolio subtree.
#[must_use]
pub fn sample_items() -> Vec<PortfolioItem> {
    vec![
        PortfolioItem::new(
            "E-commerce Mobile App",
            "A full-featured mobile shopping app built with React Native and Node.js backend. \
             Features include user authentication, product catalog, shopping cart, and payment \
             integration.",
            ProjectType::Mobile,
        )
        .with_image(
            "https://images.pexels.com/photos/1181244/pexels-photo-1181244.jpeg?auto=compress&cs=tinysrgb&w=800",
        )
        .with_technologies(["React Native", "Node.js", "MongoDB", "Stripe"])
        .with_github_url("https://github.com")
        .with_live_url("https://app-store-link.com"),
        PortfolioItem::new(
            "Task Management Dashboard",
            "A modern web application for project management with real-time collaboration, \
             drag-and-drop interface, and team chat functionality.",
            ProjectType::Web,
        )
        .with_image(
            "https://images.pexels.com/photos/1181677/pexels-photo-1181677.jpeg?auto=compress&cs=tinysrgb&w=800",
        )
        .with_technologies(["Next.js", "TypeScript", "PostgreSQL", "Socket.io"])
        .with_github_url("https://github.com")
        .with_live_url("https://taskmanager-demo.com"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_type_parse() {
        assert_eq!(ProjectType::parse("web"), Some(ProjectType::Web));
        assert_eq!(ProjectType::parse(" Mobile "), Some(ProjectType::Mobile));
        assert_eq!(ProjectType::parse("desktop"), None);
        assert_eq!(ProjectType::Mobile.to_string(), "mobile");
    }

    #[test]
    fn test_wire_shape() {
        let item = PortfolioItem::new("X", "d", ProjectType::Web)
            .with_technologies(["A", "B", "A"])
            .with_github_url("https://github.com/x");
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            json!({
                "title": "X",
                "description": "d",
                "technologies": ["A", "B", "A"],
                "type": "web",
                "githubUrl": "https://github.com/x"
            })
        );
    }

    #[test]
    fn test_deserialize_ignores_envelope_fields() {
        let value = json!({
            "id": "legacy-1",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "title": "Old",
            "description": "from local storage",
            "technologies": ["Rust"],
            "type": "mobile"
        });
        let item: PortfolioItem = serde_json::from_value(value).unwrap();
        assert_eq!(item.title, "Old");
        assert_eq!(item.project_type, ProjectType::Mobile);
        assert!(item.image.is_none());
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let item = PortfolioItem::new("  ", "d", ProjectType::Web);
        assert!(item.validate().is_err());
        assert!(PortfolioItem::new("ok", "", ProjectType::Web).validate().is_ok());
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = PortfolioItemPatch {
            title: Some("New".to_string()),
            project_type: Some(ProjectType::Mobile),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"title": "New", "type": "mobile"})
        );
        assert!(PortfolioItemPatch::default().is_empty());
    }

    #[test]
    fn test_sample_items() {
        let samples = sample_items();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].title, "E-commerce Mobile App");
        assert_eq!(samples[0].project_type, ProjectType::Mobile);
        assert_eq!(samples[1].title, "Task Management Dashboard");
        assert_eq!(samples[1].project_type, ProjectType::Web);
        assert!(samples.iter().all(|s| s.technologies.len() == 4));
    }
}
