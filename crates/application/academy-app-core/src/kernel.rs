use std::sync::Arc;

use academy_persistence::{DbState, DraftStore};
use academy_wizard::{CourseApi, StepInput, WizardError, WizardOrchestrator};
use anyhow::Context;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app_core::{AppCommand, AppStore, DomainEvent};
use crate::domain::{AppSettings, NotificationLevel};
use crate::drafts::{session_from, snapshot_of};
use crate::ports::SettingsRepo;

/// Owns the wizard orchestrator and turns commands into store events.
///
/// Every failure ends up as a dismissible notification; no command leaves
/// the wizard unusable.
pub struct AppKernel<S, D> {
    pub store: AppStore,
    settings: Arc<S>,
    drafts: Arc<D>,
    wizard: WizardOrchestrator,
}

impl<S, D> AppKernel<S, D>
where
    S: SettingsRepo,
    D: DraftStore + 'static,
{
    pub fn new(store: AppStore, settings: S, drafts: D, api: Arc<dyn CourseApi>) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
            drafts: Arc::new(drafts),
            wizard: WizardOrchestrator::new(api),
        }
    }

    pub fn state(&self) -> crate::domain::AppState {
        self.store.state()
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.store.apply(DomainEvent::Notify {
            level,
            message: message.into(),
        });
    }

    fn report_error(&self, err: &anyhow::Error) {
        error!("{err:#}");
        self.notify(NotificationLevel::Error, format!("{err:#}"));
    }

    fn sync_session(&self) {
        if let Some(session) = self.wizard.session() {
            self.store.apply(DomainEvent::WizardUpdated(session.clone()));
        }
    }

    pub async fn dispatch(&mut self, cmd: AppCommand) {
        debug!(?cmd, "dispatch");
        if let Err(e) = self.try_dispatch(cmd).await {
            self.report_error(&e);
        }
    }

    async fn try_dispatch(&mut self, cmd: AppCommand) -> anyhow::Result<()> {
        match cmd {
            AppCommand::LoadInitialState => {
                let settings = self.settings.load().context("Failed to load settings")?;
                self.store.apply(DomainEvent::SettingsLoaded(settings));
                if self.check_draft_store()? {
                    self.refresh_drafts()?;
                }
            }

            AppCommand::UpdateSettings(settings) => {
                let settings = settings.normalized();
                self.settings
                    .save(&settings)
                    .context("Failed to save settings")?;
                self.store.apply(DomainEvent::SettingsLoaded(settings));
                self.notify(NotificationLevel::Info, "Settings saved");
            }

            AppCommand::OpenWizard => {
                let session = self.wizard.start().clone();
                self.store.apply(DomainEvent::WizardOpened(session));
            }

            AppCommand::SubmitStep(input) => self.submit(input).await?,

            AppCommand::GoBack => {
                self.wizard.retreat()?;
                self.sync_session();
            }

            AppCommand::GoTo(step) => {
                self.wizard.go_to(step)?;
                self.sync_session();
            }

            AppCommand::SkipQuiz => {
                let report = self.wizard.skip_quiz()?;
                self.forget_draft(report.session_id);
                self.notify(
                    NotificationLevel::Success,
                    format!("Course {} published without a quiz", report.course_id),
                );
                self.store.apply(DomainEvent::WizardCompleted(report));
            }

            AppCommand::FinishWizard => {
                let report = self.wizard.complete()?;
                self.forget_draft(report.session_id);
                self.notify(
                    NotificationLevel::Success,
                    format!(
                        "Course {} created with {} module(s) and {} lesson(s)",
                        report.course_id,
                        report.module_ids.len(),
                        report.lesson_count()
                    ),
                );
                self.store.apply(DomainEvent::WizardCompleted(report));
            }

            AppCommand::CancelWizard => {
                let abandoned = self.wizard.cancel()?;
                self.forget_draft(abandoned.session_id);
                if !abandoned.is_empty() {
                    self.notify(
                        NotificationLevel::Info,
                        format!(
                            "Wizard cancelled; {} saved record(s) remain on the server",
                            abandoned.total()
                        ),
                    );
                }
                self.store.apply(DomainEvent::WizardCancelled(abandoned));
            }

            AppCommand::SaveDraft => {
                let session = self
                    .wizard
                    .session()
                    .context("No wizard is open, nothing to save")?;
                self.save_draft_of(session)?;
                self.notify(NotificationLevel::Info, "Draft saved");
            }

            AppCommand::CloseWizard => {
                if let Some(session) = self.wizard.session().cloned() {
                    self.save_draft_of(&session)?;
                    self.wizard.take_session();
                }
                self.store.apply(DomainEvent::WizardClosed);
            }

            AppCommand::RefreshDrafts => self.refresh_drafts()?,

            AppCommand::RestoreDraft(id) => {
                let snapshot = self
                    .drafts
                    .load_draft(&id)
                    .context("Failed to read drafts")?
                    .with_context(|| format!("No draft with id {id}"))?;
                let session = session_from(snapshot)?;
                let session = self.wizard.resume(session)?.clone();
                info!(session = %id, step = %session.step, "draft restored");
                self.store.apply(DomainEvent::WizardOpened(session));
            }

            AppCommand::DiscardDraft(id) => {
                let removed = self
                    .drafts
                    .delete_draft(&id)
                    .context("Failed to delete draft")?;
                anyhow::ensure!(removed, "No draft with id {id}");
                self.refresh_drafts()?;
            }

            AppCommand::DismissNotification(id) => {
                self.store.apply(DomainEvent::NotificationDismissed(id));
            }
        }
        Ok(())
    }

    async fn submit(&mut self, input: StepInput) -> anyhow::Result<()> {
        let step = input.step();
        self.store.apply(DomainEvent::StepSubmitting(step));

        match self.wizard.advance(input).await {
            Ok(report) => {
                let session = self
                    .wizard
                    .session()
                    .cloned()
                    .context("Wizard session vanished after a step")?;
                self.store.apply(DomainEvent::StepSaved { session, report });
                Ok(())
            }
            Err(WizardError::Validation(invalid)) => {
                debug!(%step, fields = invalid.errors.len(), "step rejected");
                self.store.apply(DomainEvent::StepRejected(invalid.errors));
                Ok(())
            }
            Err(e) => {
                match self.wizard.session() {
                    Some(session) => self.store.apply(DomainEvent::StepFailed(session.clone())),
                    None => self.store.apply(DomainEvent::WizardClosed),
                }
                Err(e.into())
            }
        }
    }

    fn save_draft_of(&self, session: &academy_wizard::WizardSession) -> anyhow::Result<()> {
        let snapshot = snapshot_of(session)?;
        self.drafts
            .save_draft(&snapshot)
            .context("Failed to save draft")?;
        info!(session = %session.id, step = %session.step, "draft saved");
        self.refresh_drafts()
    }

    /// Report a draft store that cannot be used as is. Returns whether its
    /// drafts can be listed.
    fn check_draft_store(&self) -> anyhow::Result<bool> {
        let state = self
            .drafts
            .validate()
            .context("Failed to check the draft store")?;
        debug!(?state, "draft store checked");
        match state {
            DbState::Missing | DbState::Valid => Ok(true),
            DbState::Corrupt => {
                self.notify(
                    NotificationLevel::Warning,
                    "The draft store was unreadable and has been set aside; earlier drafts are not listed",
                );
                Ok(true)
            }
            DbState::Busy => {
                self.notify(
                    NotificationLevel::Warning,
                    "Drafts are unavailable while another academy-cli run holds the draft store",
                );
                Ok(false)
            }
            DbState::NewerSchema { found, supported } => {
                self.notify(
                    NotificationLevel::Warning,
                    format!(
                        "Drafts were written by a newer version (schema {found}, this build reads {supported}) and are left untouched"
                    ),
                );
                Ok(false)
            }
        }
    }

    fn refresh_drafts(&self) -> anyhow::Result<()> {
        let drafts = self.drafts.list_drafts().context("Failed to list drafts")?;
        self.store.apply(DomainEvent::DraftsListed(drafts));
        Ok(())
    }

    /// A finished or cancelled session no longer needs its draft.
    fn forget_draft(&self, session_id: Uuid) {
        match self.drafts.delete_draft(&session_id) {
            Ok(true) => debug!(session = %session_id, "draft removed"),
            Ok(false) => {}
            Err(e) => warn!(session = %session_id, "could not remove draft: {e}"),
        }
        if let Err(e) = self.refresh_drafts() {
            warn!("{e:#}");
        }
    }

    pub fn settings(&self) -> AppSettings {
        self.store.state().settings
    }
}
