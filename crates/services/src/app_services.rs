use std::sync::Arc;

use storage::repository::{Storage, UserDirectory};

use crate::Clock;
use crate::access_policy::AccessPolicy;
use crate::attempt_service::AttemptService;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::reporting::ReportingService;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    users: Arc<dyn UserDirectory>,
    attempts: Arc<AttemptService>,
    access: Arc<AccessPolicy>,
    reporting: Arc<ReportingService>,
    catalog: Arc<CatalogService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, applying migrations.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services backed by in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let attempts = Arc::new(AttemptService::new(
            clock,
            Arc::clone(&storage.assignments),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.submissions),
            Arc::clone(&storage.users),
        ));
        let access = Arc::new(AccessPolicy::new(Arc::clone(&storage.users)));
        let reporting = Arc::new(ReportingService::new(
            Arc::clone(&storage.users),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.progress),
        ));
        let catalog = Arc::new(CatalogService::new(
            clock,
            Arc::clone(&storage.users),
            Arc::clone(&storage.assignments),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.progress),
        ));

        Self {
            users: Arc::clone(&storage.users),
            attempts,
            access,
            reporting,
            catalog,
        }
    }

    /// The user directory, for provisioning users from an identity source.
    #[must_use]
    pub fn users(&self) -> Arc<dyn UserDirectory> {
        Arc::clone(&self.users)
    }

    #[must_use]
    pub fn attempts(&self) -> Arc<AttemptService> {
        Arc::clone(&self.attempts)
    }

    #[must_use]
    pub fn access(&self) -> Arc<AccessPolicy> {
        Arc::clone(&self.access)
    }

    #[must_use]
    pub fn reporting(&self) -> Arc<ReportingService> {
        Arc::clone(&self.reporting)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }
}
