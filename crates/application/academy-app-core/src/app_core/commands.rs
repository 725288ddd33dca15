use academy_wizard::{StepInput, WizardStep};
use uuid::Uuid;

use crate::domain::{AppSettings, NotificationId};

#[derive(Debug, Clone)]
pub enum AppCommand {
    // Boot
    LoadInitialState,
    UpdateSettings(AppSettings),

    // Wizard lifecycle
    OpenWizard,
    SubmitStep(StepInput),
    GoBack,
    GoTo(WizardStep),
    SkipQuiz,
    FinishWizard,
    CancelWizard,

    // Drafts
    SaveDraft,
    CloseWizard,
    RefreshDrafts,
    RestoreDraft(Uuid),
    DiscardDraft(Uuid),

    DismissNotification(NotificationId),
}
