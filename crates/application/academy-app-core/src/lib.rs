pub mod app_core;
pub mod backend;
pub mod domain;
pub mod drafts;
pub mod kernel;
pub mod persistence;
pub mod ports;

pub use app_core::*;
pub use backend::http_course_api;
pub use domain::{AppSettings, AppState, Notification, NotificationId, NotificationLevel, WizardPhase};
pub use kernel::AppKernel;
pub use persistence::FilePersistence;
pub use ports::*;
