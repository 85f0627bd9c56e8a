//! Project and membership models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{double_option, MemberRole, Role, Visibility};
use crate::errors::ValidationErrors;

pub const MAX_PROJECT_NAME_LENGTH: usize = 100;
pub const MAX_PROJECT_DESCRIPTION_LENGTH: usize = 500;
pub const DEFAULT_BACKGROUND_COLOR: &str = "#0079bf";

/// Allowed project background colors.
pub const BACKGROUND_COLORS: [&str; 9] = [
    "#0079bf", // Blue
    "#d29034", // Orange
    "#519839", // Green
    "#b04632", // Red
    "#89609e", // Purple
    "#cd5a91", // Pink
    "#4bbf6b", // Light Green
    "#00aecc", // Light Blue
    "#838c91", // Gray
];

/// A board owned by one user and optionally shared with others.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub owner_email: String,
    pub visibility: Visibility,
    pub is_archived: bool,
    pub background_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    /// Roster size plus the owner
    pub members_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project with its roster and the caller's effective role.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub members: Vec<Membership>,
    pub user_role: Role,
}

/// A roster row joined with the member's and inviter's display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: MemberRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invited_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invited_by_email: Option<String>,
    pub joined_at: DateTime<Utc>,
}

/// Request body for creating a project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub background_image: Option<String>,
}

impl CreateProjectRequest {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        check_project_name(&mut errors, &self.name);
        if let Some(description) = &self.description {
            check_project_description(&mut errors, description);
        }
        if let Some(color) = &self.background_color {
            check_background_color(&mut errors, color);
        }
        if let Some(image) = &self.background_image {
            check_background_image(&mut errors, image);
        }
        errors
    }
}

/// Request body for updating a project. PUT requires `name`, PATCH does not.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub is_archived: Option<bool>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub background_image: Option<Option<String>>,
}

impl UpdateProjectRequest {
    pub fn validate(&self, require_name: bool) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        match &self.name {
            Some(name) => check_project_name(&mut errors, name),
            None if require_name => errors.add("name", "This field is required."),
            None => {}
        }
        if let Some(description) = &self.description {
            check_project_description(&mut errors, description);
        }
        if let Some(color) = &self.background_color {
            check_background_color(&mut errors, color);
        }
        if let Some(Some(image)) = &self.background_image {
            check_background_image(&mut errors, image);
        }
        errors
    }
}

/// Request body for `POST /projects/{id}/add_member`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    #[serde(default)]
    pub role: MemberRole,
}

/// Request body for `PATCH /projects/{id}/members/{userId}/role`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: MemberRole,
}

/// Query parameters for project listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectListQuery {
    #[serde(default)]
    pub archived: Option<bool>,
}

fn check_project_name(errors: &mut ValidationErrors, name: &str) {
    let length = name.trim().chars().count();
    if length == 0 {
        errors.add("name", "This field may not be blank.");
    } else if name.chars().count() > MAX_PROJECT_NAME_LENGTH {
        errors.add(
            "name",
            format!(
                "Ensure this field has no more than {} characters.",
                MAX_PROJECT_NAME_LENGTH
            ),
        );
    }
}

fn check_project_description(errors: &mut ValidationErrors, description: &str) {
    if description.chars().count() > MAX_PROJECT_DESCRIPTION_LENGTH {
        errors.add(
            "description",
            format!(
                "Ensure this field has no more than {} characters.",
                MAX_PROJECT_DESCRIPTION_LENGTH
            ),
        );
    }
}

fn check_background_color(errors: &mut ValidationErrors, color: &str) {
    if !BACKGROUND_COLORS.contains(&color) {
        errors.add(
            "backgroundColor",
            format!("\"{}\" is not a valid choice.", color),
        );
    }
}

fn check_background_image(errors: &mut ValidationErrors, url: &str) {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.add("backgroundImage", "Enter a valid URL.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str) -> CreateProjectRequest {
        CreateProjectRequest {
            name: name.to_string(),
            description: None,
            visibility: None,
            background_color: None,
            background_image: None,
        }
    }

    #[test]
    fn test_name_bounds() {
        assert!(create("Roadmap").validate().is_empty());
        assert!(create("   ").validate().has("name"));
        assert!(create(&"x".repeat(100)).validate().is_empty());
        assert!(create(&"x".repeat(101)).validate().has("name"));
    }

    #[test]
    fn test_collects_every_invalid_field() {
        let mut request = create("");
        request.description = Some("d".repeat(501));
        request.background_color = Some("#ffffff".to_string());
        request.background_image = Some("ftp://example.com/a.png".to_string());

        let errors = request.validate();
        assert!(errors.has("name"));
        assert!(errors.has("description"));
        assert!(errors.has("backgroundColor"));
        assert!(errors.has("backgroundImage"));
    }

    #[test]
    fn test_put_requires_name() {
        let request = UpdateProjectRequest::default();
        assert!(request.validate(true).has("name"));
        assert!(request.validate(false).is_empty());
    }

    #[test]
    fn test_background_image_can_be_cleared() {
        let request: UpdateProjectRequest =
            serde_json::from_value(serde_json::json!({ "backgroundImage": null })).unwrap();
        assert_eq!(request.background_image, Some(None));

        let request: UpdateProjectRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(request.background_image, None);
    }
}
