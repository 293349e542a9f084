use std::sync::Arc;

use tracing::debug;

use lms_core::access;
use lms_core::model::{User, UserId};
use storage::repository::UserDirectory;

use crate::error::AccessError;

/// Decides who may see whose progress.
#[derive(Clone)]
pub struct AccessPolicy {
    users: Arc<dyn UserDirectory>,
}

impl AccessPolicy {
    #[must_use]
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    /// Self-view is always allowed. Otherwise admins see everyone, managers see
    /// their direct reports, and learners see nobody else.
    ///
    /// An unknown viewer or subject is denied.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::Storage` if the user directory fails.
    pub async fn can_view_progress(
        &self,
        viewer_id: UserId,
        subject_id: UserId,
    ) -> Result<bool, AccessError> {
        if viewer_id == subject_id {
            return Ok(true);
        }

        let (Some(viewer), Some(subject)) = (
            self.users.get_user(viewer_id).await?,
            self.users.get_user(subject_id).await?,
        ) else {
            debug!(viewer = %viewer_id, subject = %subject_id, "unknown user; access denied");
            return Ok(false);
        };

        let allowed = access::can_view_progress(&viewer, &subject);
        if !allowed {
            debug!(
                viewer = %viewer_id,
                role = ?viewer.role(),
                subject = %subject_id,
                "progress access denied"
            );
        }
        Ok(allowed)
    }

    /// True for managers and admins.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::Storage` if the user directory fails.
    pub async fn is_manager(&self, user_id: UserId) -> Result<bool, AccessError> {
        Ok(self
            .users
            .get_user(user_id)
            .await?
            .is_some_and(|u| u.role().is_supervisor()))
    }

    /// Direct reports of `manager_id`.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::Storage` if the user directory fails.
    pub async fn subordinates(&self, manager_id: UserId) -> Result<Vec<User>, AccessError> {
        Ok(self.users.list_subordinates(manager_id).await?)
    }
}
