use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AssignmentId, UserId};

/// Longest accepted assignment title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssignmentError {
    #[error("assignment title cannot be empty")]
    EmptyTitle,

    #[error("assignment title exceeds {MAX_TITLE_LEN} characters")]
    TitleTooLong,

    #[error("assignment description cannot be empty")]
    EmptyDescription,

    #[error("due date is before creation time")]
    DueBeforeCreated,
}

//
// ─── MATERIAL ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialType {
    Text,
    Pdf,
    Video,
    Link,
}

/// Study material attached to an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub content: String,
    pub url: Option<String>,
    pub kind: MaterialType,
}

impl Material {
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            url: None,
            kind: MaterialType::Text,
        }
    }
}

//
// ─── ASSIGNMENT ────────────────────────────────────────────────────────────────
//

/// A unit of work handed to learners: material to study plus a fixed quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    id: AssignmentId,
    title: String,
    description: String,
    material: Material,
    created_at: DateTime<Utc>,
    due_date: Option<DateTime<Utc>>,
    is_active: bool,
    created_by: UserId,
}

impl Assignment {
    /// Creates a new, active assignment.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError` if the title or description is blank, the title
    /// is too long, or the due date precedes `created_at`.
    pub fn new(
        id: AssignmentId,
        title: impl Into<String>,
        description: impl Into<String>,
        material: Material,
        created_by: UserId,
        due_date: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, AssignmentError> {
        let title = Self::clean_title(&title.into())?;
        let description = Self::clean_description(&description.into())?;
        Self::check_due_date(due_date, created_at)?;

        Ok(Self {
            id,
            title,
            description,
            material,
            created_at,
            due_date,
            is_active: true,
            created_by,
        })
    }

    /// Rehydrate an assignment from storage, including its active flag.
    ///
    /// # Errors
    ///
    /// Same validation as [`Assignment::new`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: AssignmentId,
        title: String,
        description: String,
        material: Material,
        created_by: UserId,
        due_date: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        is_active: bool,
    ) -> Result<Self, AssignmentError> {
        let mut assignment = Self::new(
            id,
            title,
            description,
            material,
            created_by,
            due_date,
            created_at,
        )?;
        assignment.is_active = is_active;
        Ok(assignment)
    }

    /// Trimmed title, checked for emptiness and length.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError::EmptyTitle` or `AssignmentError::TitleTooLong`.
    pub fn clean_title(title: &str) -> Result<String, AssignmentError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AssignmentError::EmptyTitle);
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(AssignmentError::TitleTooLong);
        }
        Ok(title.to_owned())
    }

    /// # Errors
    ///
    /// Returns `AssignmentError::EmptyDescription` for blank text.
    pub fn clean_description(description: &str) -> Result<String, AssignmentError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(AssignmentError::EmptyDescription);
        }
        Ok(description.to_owned())
    }

    /// # Errors
    ///
    /// Returns `AssignmentError::DueBeforeCreated` if `due_date` precedes `created_at`.
    pub fn check_due_date(
        due_date: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Result<(), AssignmentError> {
        if due_date.is_some_and(|due| due < created_at) {
            return Err(AssignmentError::DueBeforeCreated);
        }
        Ok(())
    }

    /// Hide the assignment from learners.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    #[must_use]
    pub fn id(&self) -> AssignmentId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn material(&self) -> &Material {
        &self.material
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn created_by(&self) -> UserId {
        self.created_by
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
