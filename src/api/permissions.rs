use super::ApiError;
use super::auth::AuthUser;

/// Access policy attached to a resource family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// No authentication required for anything.
    AllowAny,
    /// Reads open to everyone; writes restricted to admins.
    AdminOrReadOnly,
    /// Reads open to everyone; writes restricted to admins, moderators
    /// and the resource author.
    AdminModeratorAuthorOrReadOnly,
    /// Every operation restricted to admins.
    AdminOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    const fn is_write(self) -> bool {
        !matches!(self, Action::Read)
    }
}

/// Decide whether `actor` may perform `action` under `policy`.
///
/// `is_author` is only meaningful for update/delete on an existing resource;
/// pass `false` everywhere else. Anonymous actors get 401 on protected
/// actions, authenticated-but-insufficient actors get 403.
pub fn authorize(
    policy: Policy,
    actor: Option<&AuthUser>,
    action: Action,
    is_author: bool,
) -> Result<(), ApiError> {
    let allowed = match policy {
        Policy::AllowAny => true,
        Policy::AdminOrReadOnly => {
            !action.is_write() || actor.is_some_and(AuthUser::is_admin)
        }
        Policy::AdminModeratorAuthorOrReadOnly => {
            if !action.is_write() {
                true
            } else {
                match actor {
                    None => false,
                    Some(user) => {
                        user.is_admin()
                            || user.is_moderator()
                            || matches!(action, Action::Create)
                            || is_author
                    }
                }
            }
        }
        Policy::AdminOnly => actor.is_some_and(AuthUser::is_admin),
    };

    if allowed {
        return Ok(());
    }
    match actor {
        None => Err(ApiError::Unauthorized(
            "Authentication credentials were not provided".to_string(),
        )),
        Some(_) => Err(ApiError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::users::Role;

    fn actor(role: Role, is_superuser: bool) -> AuthUser {
        AuthUser {
            id: 1,
            username: "someone".to_string(),
            role,
            is_superuser,
        }
    }

    fn is_unauthorized(result: Result<(), ApiError>) -> bool {
        matches!(result, Err(ApiError::Unauthorized(_)))
    }

    fn is_forbidden(result: Result<(), ApiError>) -> bool {
        matches!(result, Err(ApiError::Forbidden(_)))
    }

    #[test]
    fn allow_any_never_denies() {
        for action in [Action::Read, Action::Create, Action::Update, Action::Delete] {
            assert!(authorize(Policy::AllowAny, None, action, false).is_ok());
        }
    }

    #[test]
    fn admin_or_read_only_gates_writes() {
        let user = actor(Role::User, false);
        let moderator = actor(Role::Moderator, false);
        let admin = actor(Role::Admin, false);
        let superuser = actor(Role::User, true);

        assert!(authorize(Policy::AdminOrReadOnly, None, Action::Read, false).is_ok());
        assert!(authorize(Policy::AdminOrReadOnly, Some(&user), Action::Read, false).is_ok());

        assert!(is_unauthorized(authorize(
            Policy::AdminOrReadOnly,
            None,
            Action::Create,
            false
        )));
        assert!(is_forbidden(authorize(
            Policy::AdminOrReadOnly,
            Some(&user),
            Action::Create,
            false
        )));
        assert!(is_forbidden(authorize(
            Policy::AdminOrReadOnly,
            Some(&moderator),
            Action::Delete,
            false
        )));
        assert!(authorize(Policy::AdminOrReadOnly, Some(&admin), Action::Create, false).is_ok());
        assert!(authorize(Policy::AdminOrReadOnly, Some(&superuser), Action::Delete, false).is_ok());
    }

    #[test]
    fn author_policy_lets_authors_moderators_and_admins_write() {
        let policy = Policy::AdminModeratorAuthorOrReadOnly;
        let user = actor(Role::User, false);
        let moderator = actor(Role::Moderator, false);
        let admin = actor(Role::Admin, false);

        assert!(authorize(policy, None, Action::Read, false).is_ok());
        assert!(is_unauthorized(authorize(policy, None, Action::Create, false)));

        // Any authenticated user may create; ownership applies to existing
        // resources only.
        assert!(authorize(policy, Some(&user), Action::Create, false).is_ok());

        assert!(authorize(policy, Some(&user), Action::Update, true).is_ok());
        assert!(is_forbidden(authorize(policy, Some(&user), Action::Update, false)));
        assert!(is_forbidden(authorize(policy, Some(&user), Action::Delete, false)));

        assert!(authorize(policy, Some(&moderator), Action::Delete, false).is_ok());
        assert!(authorize(policy, Some(&admin), Action::Update, false).is_ok());
    }

    #[test]
    fn admin_only_rejects_everyone_else() {
        let user = actor(Role::User, false);
        let moderator = actor(Role::Moderator, false);
        let admin = actor(Role::Admin, false);
        let superuser = actor(Role::User, true);

        assert!(is_unauthorized(authorize(Policy::AdminOnly, None, Action::Read, false)));
        assert!(is_forbidden(authorize(
            Policy::AdminOnly,
            Some(&user),
            Action::Read,
            false
        )));
        assert!(is_forbidden(authorize(
            Policy::AdminOnly,
            Some(&moderator),
            Action::Create,
            false
        )));
        assert!(authorize(Policy::AdminOnly, Some(&admin), Action::Delete, false).is_ok());
        assert!(authorize(Policy::AdminOnly, Some(&superuser), Action::Read, false).is_ok());
    }
}
