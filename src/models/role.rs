//! Roles and visibility.

use serde::{Deserialize, Serialize};

/// Effective access level of a principal on a project.
///
/// `Owner` is never stored; it is derived from `projects.owner_id` at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    None,
    Viewer,
    Editor,
    Admin,
    Owner,
}

impl Role {
    /// Position in the total order `none < viewer < editor < admin < owner`.
    pub const fn rank(self) -> u8 {
        match self {
            Role::None => 0,
            Role::Viewer => 1,
            Role::Editor => 2,
            Role::Admin => 3,
            Role::Owner => 4,
        }
    }

    pub const fn at_least(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::None => "none",
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// Role stored on a membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Viewer,
    #[default]
    Editor,
    Admin,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Viewer => "viewer",
            MemberRole::Editor => "editor",
            MemberRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "viewer" => Some(MemberRole::Viewer),
            "editor" => Some(MemberRole::Editor),
            "admin" => Some(MemberRole::Admin),
            _ => None,
        }
    }
}

impl From<MemberRole> for Role {
    fn from(role: MemberRole) -> Self {
        match role {
            MemberRole::Viewer => Role::Viewer,
            MemberRole::Editor => Role::Editor,
            MemberRole::Admin => Role::Admin,
        }
    }
}

/// Project visibility. Stored as the `is_private` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl Visibility {
    pub fn from_private_flag(is_private: bool) -> Self {
        if is_private {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Visibility::Private)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_total_order() {
        let ordered = [Role::None, Role::Viewer, Role::Editor, Role::Admin, Role::Owner];
        for window in ordered.windows(2) {
            assert!(window[0] < window[1]);
        }
        assert_eq!(ordered.iter().max(), Some(&Role::Owner));
    }

    #[test]
    fn test_member_role_round_trip_through_storage() {
        for role in [MemberRole::Viewer, MemberRole::Editor, MemberRole::Admin] {
            assert_eq!(MemberRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(MemberRole::parse("owner"), None);
    }

    #[test]
    fn test_member_role_never_maps_to_owner() {
        for role in [MemberRole::Viewer, MemberRole::Editor, MemberRole::Admin] {
            assert!(Role::from(role) < Role::Owner);
        }
    }
}
