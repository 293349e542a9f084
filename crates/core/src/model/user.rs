use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("user name cannot be empty")]
    EmptyUserName,

    #[error("user {0} cannot be their own manager")]
    SelfManaged(UserId),
}

//
// ─── ROLE ──────────────────────────────────────────────────────────────────────
//

/// Role of a user within the organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Learner,
    Manager,
    Admin,
}

impl Role {
    /// Managers and admins may supervise learners and read reports.
    #[must_use]
    pub fn is_supervisor(self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

//
// ─── USER ──────────────────────────────────────────────────────────────────────
//

/// A person known to the system.
///
/// `manager_id` is a plain back-reference resolved through the user directory;
/// only one level of the hierarchy is ever consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    user_name: String,
    first_name: String,
    last_name: String,
    role: Role,
    manager_id: Option<UserId>,
    created_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user.
    ///
    /// # Errors
    ///
    /// Returns `UserError::EmptyUserName` for a blank user name and
    /// `UserError::SelfManaged` if `manager_id` equals `id`.
    pub fn new(
        id: UserId,
        user_name: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        role: Role,
        manager_id: Option<UserId>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, UserError> {
        let user_name = user_name.into();
        if user_name.trim().is_empty() {
            return Err(UserError::EmptyUserName);
        }
        if manager_id == Some(id) {
            return Err(UserError::SelfManaged(id));
        }

        Ok(Self {
            id,
            user_name: user_name.trim().to_owned(),
            first_name: first_name.into().trim().to_owned(),
            last_name: last_name.into().trim().to_owned(),
            role,
            manager_id,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// "First Last", trimmed when either part is missing.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn manager_id(&self) -> Option<UserId> {
        self.manager_id
    }

    /// True when `manager` is this user's direct manager.
    #[must_use]
    pub fn reports_to(&self, manager: UserId) -> bool {
        self.manager_id == Some(manager)
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn rejects_self_management() {
        let id = UserId::generate();
        let err = User::new(id, "amy", "Amy", "Pond", Role::Learner, Some(id), fixed_now())
            .unwrap_err();
        assert_eq!(err, UserError::SelfManaged(id));
    }

    #[test]
    fn rejects_blank_user_name() {
        let err = User::new(
            UserId::generate(),
            "  ",
            "Amy",
            "Pond",
            Role::Learner,
            None,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, UserError::EmptyUserName);
    }

    #[test]
    fn full_name_trims_missing_parts() {
        let user = User::new(
            UserId::generate(),
            "rory",
            "Rory",
            "",
            Role::Learner,
            None,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(user.full_name(), "Rory");
    }

    #[test]
    fn reports_to_checks_direct_manager_only() {
        let manager = UserId::generate();
        let user = User::new(
            UserId::generate(),
            "clara",
            "Clara",
            "Oswald",
            Role::Learner,
            Some(manager),
            fixed_now(),
        )
        .unwrap();
        assert!(user.reports_to(manager));
        assert!(!user.reports_to(UserId::generate()));
    }

    #[test]
    fn supervisor_roles() {
        assert!(!Role::Learner.is_supervisor());
        assert!(Role::Manager.is_supervisor());
        assert!(Role::Admin.is_supervisor());
    }
}
