use academy_core::FieldError;
use academy_persistence::DraftSummary;
use academy_wizard::{AbandonedResources, CompletionReport, StepReport, WizardSession, WizardStep};

use crate::domain::{AppSettings, NotificationId, NotificationLevel};

#[derive(Debug, Clone)]
pub enum DomainEvent {
    SettingsLoaded(AppSettings),

    // Wizard
    WizardOpened(WizardSession),
    WizardUpdated(WizardSession),
    StepSubmitting(WizardStep),
    StepSaved {
        session: WizardSession,
        report: StepReport,
    },
    StepRejected(Vec<FieldError>),
    StepFailed(WizardSession),
    WizardCompleted(CompletionReport),
    WizardCancelled(AbandonedResources),
    WizardClosed,

    // Drafts
    DraftsListed(Vec<DraftSummary>),

    // User-visible messages
    Notify {
        level: NotificationLevel,
        message: String,
    },
    NotificationDismissed(NotificationId),
}
