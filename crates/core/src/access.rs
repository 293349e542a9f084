//! Who may look at whose progress.

use crate::model::{Role, User};

/// Decide whether `viewer` may see `subject`'s progress.
///
/// - Anyone may see their own progress.
/// - Learners may not see anyone else's.
/// - Admins may see everyone's, with or without a reporting line.
/// - Managers may see only their direct reports; the hierarchy is never walked
///   further than one level.
#[must_use]
pub fn can_view_progress(viewer: &User, subject: &User) -> bool {
    if viewer.id() == subject.id() {
        return true;
    }
    match viewer.role() {
        Role::Learner => false,
        Role::Admin => true,
        Role::Manager => subject.reports_to(viewer.id()),
    }
}
