//! Role capability table.
//!
//! Every service operation calls `authorize` once, before touching the store.
//! The table below is the only place that knows which role may do what.

use crate::error::PolicyError;
use crate::models::{Actor, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewAttendance,
    EditAttendance,
    SaveAttendance,
    LockAttendance,
    UnlockAttendance,
    ExportReport,
    ManageClasses,
    ImportStudents,
    DeleteStudents,
    PromoteStudents,
    ManageMembership,
    VerifyUser,
    ChangeRole,
    DeleteUser,
    ManageSettings,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Action::ViewAttendance => "view attendance",
            Action::EditAttendance => "edit attendance",
            Action::SaveAttendance => "save attendance",
            Action::LockAttendance => "lock attendance",
            Action::UnlockAttendance => "unlock attendance",
            Action::ExportReport => "export reports",
            Action::ManageClasses => "manage classes",
            Action::ImportStudents => "import students",
            Action::DeleteStudents => "delete students",
            Action::PromoteStudents => "promote students",
            Action::ManageMembership => "manage class membership",
            Action::VerifyUser => "verify users",
            Action::ChangeRole => "change roles",
            Action::DeleteUser => "delete users",
            Action::ManageSettings => "manage school settings",
        };
        f.write_str(text)
    }
}

const VIEWER: &[Action] = &[Action::ViewAttendance, Action::ExportReport];

const GURU: &[Action] = &[
    Action::ViewAttendance,
    Action::ExportReport,
    Action::EditAttendance,
    Action::SaveAttendance,
    Action::LockAttendance,
];

const ADMIN: &[Action] = &[
    Action::ViewAttendance,
    Action::ExportReport,
    Action::EditAttendance,
    Action::SaveAttendance,
    Action::LockAttendance,
    Action::UnlockAttendance,
    Action::ManageClasses,
    Action::ImportStudents,
    Action::DeleteStudents,
    Action::PromoteStudents,
    Action::ManageMembership,
    Action::VerifyUser,
    Action::ChangeRole,
    Action::DeleteUser,
];

/// Actions permitted to a role.
pub fn capabilities(role: Role) -> &'static [Action] {
    match role {
        Role::Viewer => VIEWER,
        Role::Guru => GURU,
        Role::Admin => ADMIN,
        Role::SuperAdmin => &[],
    }
}

pub fn permits(role: Role, action: Action) -> bool {
    role == Role::SuperAdmin || capabilities(role).contains(&action)
}

/// The single authorization boundary.
///
/// Unverified accounts below admin may do nothing at all.
pub fn authorize(actor: &Actor, action: Action) -> Result<(), PolicyError> {
    if !actor.verified && !actor.role.is_privileged() {
        return Err(PolicyError::NotVerified);
    }
    if permits(actor.role, action) {
        Ok(())
    } else {
        Err(PolicyError::NotPermitted {
            role: actor.role,
            action,
        })
    }
}

/// Whether `actor` may manage an account currently holding `target_role`
/// and, when given, assign it `new_role`.
pub fn authorize_account_change(
    actor: &Actor,
    target_uid: &str,
    target_role: Role,
    new_role: Option<Role>,
    action: Action,
) -> Result<(), PolicyError> {
    authorize(actor, action)?;

    if actor.uid == target_uid {
        return Err(PolicyError::InvalidInput(
            "You cannot change your own account".to_string(),
        ));
    }
    if actor.role == Role::SuperAdmin {
        return Ok(());
    }
    if target_role >= actor.role {
        return Err(PolicyError::NotPermitted {
            role: actor.role,
            action,
        });
    }
    if let Some(role) = new_role {
        if role > actor.role {
            return Err(PolicyError::NotPermitted {
                role: actor.role,
                action,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor::new("me", role, true)
    }

    #[test]
    fn test_viewer_can_only_view_and_export() {
        let a = actor(Role::Viewer);
        assert!(authorize(&a, Action::ViewAttendance).is_ok());
        assert!(authorize(&a, Action::ExportReport).is_ok());
        assert_eq!(
            authorize(&a, Action::EditAttendance),
            Err(PolicyError::NotPermitted {
                role: Role::Viewer,
                action: Action::EditAttendance
            })
        );
    }

    #[test]
    fn test_unlock_is_privileged() {
        assert!(authorize(&actor(Role::Guru), Action::LockAttendance).is_ok());
        assert!(authorize(&actor(Role::Guru), Action::UnlockAttendance).is_err());
        assert!(authorize(&actor(Role::Admin), Action::UnlockAttendance).is_ok());
        assert!(authorize(&actor(Role::SuperAdmin), Action::UnlockAttendance).is_ok());
    }

    #[test]
    fn test_settings_are_super_admin_only() {
        assert!(authorize(&actor(Role::Admin), Action::ManageSettings).is_err());
        assert!(authorize(&actor(Role::SuperAdmin), Action::ManageSettings).is_ok());
    }

    #[test]
    fn test_roles_are_monotonic() {
        let all = [
            Action::ViewAttendance,
            Action::EditAttendance,
            Action::SaveAttendance,
            Action::LockAttendance,
            Action::UnlockAttendance,
            Action::ExportReport,
            Action::ManageClasses,
            Action::ImportStudents,
            Action::DeleteStudents,
            Action::PromoteStudents,
            Action::ManageMembership,
            Action::VerifyUser,
            Action::ChangeRole,
            Action::DeleteUser,
            Action::ManageSettings,
        ];
        for pair in Role::LADDER.windows(2) {
            for action in all {
                if permits(pair[0], action) {
                    assert!(permits(pair[1], action), "{} lost {}", pair[1], action);
                }
            }
        }
    }

    #[test]
    fn test_unverified_guru_is_blocked_but_admin_is_not() {
        let guru = Actor::new("g", Role::Guru, false);
        assert_eq!(authorize(&guru, Action::ViewAttendance), Err(PolicyError::NotVerified));
        let admin = Actor::new("a", Role::Admin, false);
        assert!(authorize(&admin, Action::ViewAttendance).is_ok());
    }

    #[test]
    fn test_account_change_rules() {
        let admin = actor(Role::Admin);
        // Own account
        assert!(authorize_account_change(&admin, "me", Role::Viewer, None, Action::DeleteUser).is_err());
        // Peer admin
        assert!(authorize_account_change(&admin, "x", Role::Admin, None, Action::DeleteUser).is_err());
        // Lower rank, within own rank
        assert!(authorize_account_change(&admin, "x", Role::Guru, Some(Role::Admin), Action::ChangeRole).is_ok());
        // Cannot hand out super_admin
        assert!(authorize_account_change(&admin, "x", Role::Guru, Some(Role::SuperAdmin), Action::ChangeRole).is_err());
        // Super admin can do anything to others
        let root = actor(Role::SuperAdmin);
        assert!(authorize_account_change(&root, "x", Role::SuperAdmin, Some(Role::Viewer), Action::ChangeRole).is_ok());
    }
}
