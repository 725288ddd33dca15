//! Course creation wizard: a four-step session (course, modules, lessons,
//! quiz) whose state only changes through [`session::transition`], driven
//! against the backend by [`WizardOrchestrator`].

pub mod api;
pub mod error;
pub mod orchestrator;
pub mod requests;
pub mod session;

pub use api::{CourseApi, HttpCourseApi};
pub use error::WizardError;
pub use orchestrator::{AbandonedResources, CompletionReport, StepReport, WizardOrchestrator};
pub use session::{
    transition, SessionStatus, StepInput, StepResults, TransitionError, UploadedAsset,
    WizardEvent, WizardSession, WizardStep,
};
