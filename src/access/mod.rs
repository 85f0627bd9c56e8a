//! Access control for projects and everything nested under them.
//!
//! Every gate in the API resolves a [`ProjectAccess`] for the acting user and
//! asks it for a decision. Nothing here touches the database; loading the
//! owner/membership facts lives in `db::access`.

use crate::errors::{AppError, MembershipError};
use crate::models::{MemberRole, Role, Visibility};

/// The facts a decision needs: the caller's effective role and the project's visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectAccess {
    pub role: Role,
    pub visibility: Visibility,
}

/// Resolve the effective role of `user_id` on a project.
///
/// The owner short-circuits to [`Role::Owner`]; otherwise the membership row
/// decides, and no row means [`Role::None`].
pub fn effective_role(user_id: &str, owner_id: &str, membership: Option<MemberRole>) -> Role {
    if user_id == owner_id {
        return Role::Owner;
    }
    membership.map(Role::from).unwrap_or(Role::None)
}

impl ProjectAccess {
    pub fn new(role: Role, visibility: Visibility) -> Self {
        Self { role, visibility }
    }

    pub fn can_view(&self) -> bool {
        self.visibility == Visibility::Public || self.role != Role::None
    }

    pub fn can_edit(&self) -> bool {
        self.role.at_least(Role::Editor)
    }

    pub fn can_administer(&self) -> bool {
        self.role.at_least(Role::Admin)
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    pub fn require_view(&self) -> Result<(), AppError> {
        if self.can_view() {
            Ok(())
        } else {
            Err(forbidden("You do not have access to this project."))
        }
    }

    pub fn require_edit(&self) -> Result<(), AppError> {
        if self.can_edit() {
            Ok(())
        } else {
            Err(forbidden("You do not have permission to edit this project."))
        }
    }

    pub fn require_administer(&self) -> Result<(), AppError> {
        if self.can_administer() {
            Ok(())
        } else {
            Err(forbidden("Only project owners and admins can manage members."))
        }
    }

    /// Only the owner may delete a project.
    pub fn require_delete_project(&self) -> Result<(), AppError> {
        if self.is_owner() {
            Ok(())
        } else {
            Err(forbidden("Only the project owner can delete this project."))
        }
    }

    /// Guard for changing a member's role.
    ///
    /// Callers who cannot see the project are refused before the target is
    /// inspected. The owner's role is never changeable, whoever asks.
    pub fn require_role_change(&self, target_user_id: &str, owner_id: &str) -> Result<(), AppError> {
        self.require_view()?;
        if target_user_id == owner_id {
            return Err(MembershipError::CannotChangeOwner.into());
        }
        self.require_administer()
    }

    /// A comment may be deleted by its author or by anyone who can edit the project.
    pub fn require_comment_delete(&self, author_id: &str, user_id: &str) -> Result<(), AppError> {
        if author_id == user_id || self.can_edit() {
            Ok(())
        } else {
            Err(forbidden("You can only delete your own comments."))
        }
    }
}

/// Only the author edits a comment; project role does not matter.
pub fn require_comment_edit(author_id: &str, user_id: &str) -> Result<(), AppError> {
    if author_id == user_id {
        Ok(())
    } else {
        Err(forbidden("You can only edit your own comments."))
    }
}

fn forbidden(message: &str) -> AppError {
    AppError::Forbidden(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ROLES: [Role; 5] = [Role::None, Role::Viewer, Role::Editor, Role::Admin, Role::Owner];

    fn private(role: Role) -> ProjectAccess {
        ProjectAccess::new(role, Visibility::Private)
    }

    #[test]
    fn test_effective_role() {
        assert_eq!(effective_role("alice", "alice", None), Role::Owner);
        // A stray membership row for the owner is ignored.
        assert_eq!(effective_role("alice", "alice", Some(MemberRole::Viewer)), Role::Owner);
        assert_eq!(effective_role("bob", "alice", Some(MemberRole::Editor)), Role::Editor);
        assert_eq!(effective_role("carol", "alice", None), Role::None);
    }

    #[test]
    fn test_permission_matrix() {
        for role in ALL_ROLES {
            let access = private(role);
            assert_eq!(
                access.can_edit(),
                matches!(role, Role::Owner | Role::Admin | Role::Editor),
                "can_edit for {:?}",
                role
            );
            assert_eq!(
                access.can_administer(),
                matches!(role, Role::Owner | Role::Admin),
                "can_administer for {:?}",
                role
            );
            assert_eq!(access.can_view(), role != Role::None, "can_view for {:?}", role);
        }
    }

    #[test]
    fn test_public_projects_are_viewable_but_not_editable() {
        let outsider = ProjectAccess::new(Role::None, Visibility::Public);
        assert!(outsider.can_view());
        assert!(!outsider.can_edit());
        assert!(outsider.require_view().is_ok());
        assert!(matches!(outsider.require_edit(), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_only_owner_deletes_project() {
        assert!(private(Role::Owner).require_delete_project().is_ok());
        for role in [Role::Admin, Role::Editor, Role::Viewer, Role::None] {
            assert!(private(role).require_delete_project().is_err());
        }
    }

    #[test]
    fn test_role_change_guard() {
        // Even the owner cannot change the owner's role.
        let err = private(Role::Owner).require_role_change("alice", "alice").unwrap_err();
        assert_eq!(err.error_code(), crate::errors::codes::CANNOT_CHANGE_OWNER);

        assert!(private(Role::Admin).require_role_change("bob", "alice").is_ok());

        // Outsiders learn nothing about who owns a private project.
        for target in ["alice", "bob"] {
            assert!(matches!(
                private(Role::None).require_role_change(target, "alice"),
                Err(AppError::Forbidden(_))
            ));
        }
        assert!(matches!(
            private(Role::Editor).require_role_change("bob", "alice"),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_comment_guards() {
        assert!(require_comment_edit("bob", "bob").is_ok());
        assert!(require_comment_edit("bob", "alice").is_err());

        // Viewers delete their own comments only; editors delete anyone's.
        assert!(private(Role::Viewer).require_comment_delete("bob", "bob").is_ok());
        assert!(private(Role::Viewer).require_comment_delete("carol", "bob").is_err());
        assert!(private(Role::Editor).require_comment_delete("carol", "bob").is_ok());
    }

    #[test]
    fn test_viewer_promoted_to_editor() {
        let before = private(effective_role("bob", "alice", Some(MemberRole::Viewer)));
        assert!(before.can_view());
        assert!(!before.can_edit());

        let after = private(effective_role("bob", "alice", Some(MemberRole::Editor)));
        assert!(after.can_edit());
        assert!(!after.can_administer());
    }
}
