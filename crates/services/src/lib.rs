#![forbid(unsafe_code)]

pub mod access_policy;
pub mod app_services;
pub mod attempt_service;
pub mod catalog_service;
pub mod error;
mod locks;
pub mod reporting;
pub mod view;

pub use lms_core::Clock;

pub use access_policy::AccessPolicy;
pub use app_services::AppServices;
pub use attempt_service::{AttemptService, StartOutcome};
pub use catalog_service::{AssignmentDraft, CatalogService, QuizDraft};
pub use error::{
    AccessError, AppServicesError, AttemptError, CatalogError, ErrorKind, ReportError,
};
pub use reporting::ReportingService;
pub use view::{AssignmentDetails, AssignmentOverview, ProgressView, QuizView, ScoredAnswerView};
