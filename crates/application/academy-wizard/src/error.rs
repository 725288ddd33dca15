use academy_core::ValidationErrors;
use academy_infra::{ApiError, ApiErrorKind};

use crate::session::{TransitionError, WizardStep};

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("no wizard session is open")]
    NoSession,
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("the {step} step needs a {missing} that has not been saved yet")]
    MissingPrerequisite {
        step: WizardStep,
        missing: &'static str,
    },
    #[error("attachment {0} has not been uploaded")]
    UnresolvedAttachment(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("saving the {step} step failed: {cause}")]
    Api { step: WizardStep, cause: ApiError },
}

impl WizardError {
    pub(crate) fn api(step: WizardStep) -> impl FnOnce(ApiError) -> WizardError {
        move |cause| WizardError::Api { step, cause }
    }

    /// Whether retrying the same submission may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WizardError::Api { cause, .. } => matches!(
                cause.kind(),
                ApiErrorKind::Connectivity | ApiErrorKind::Api | ApiErrorKind::Local
            ),
            _ => false,
        }
    }

    pub fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            WizardError::Validation(v) => Some(v),
            _ => None,
        }
    }
}
