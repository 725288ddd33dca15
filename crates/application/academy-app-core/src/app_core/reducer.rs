use crate::domain::{AppState, Notification, NotificationLevel, WizardPhase};

use super::events::DomainEvent;

pub fn reduce(mut state: AppState, ev: DomainEvent) -> AppState {
    match ev {
        DomainEvent::SettingsLoaded(settings) => state.settings = settings,

        DomainEvent::WizardOpened(session) => {
            state.wizard = Some(session);
            state.phase = WizardPhase::Editing;
            state.field_errors.clear();
            state.last_step = None;
            state.last_completion = None;
            state.last_abandoned = None;
        }

        DomainEvent::WizardUpdated(session) => {
            state.wizard = Some(session);
            state.field_errors.clear();
        }

        DomainEvent::StepSubmitting(step) => {
            state.phase = WizardPhase::Submitting(step);
            state.field_errors.clear();
        }

        DomainEvent::StepSaved { session, report } => {
            state.wizard = Some(session);
            state.phase = WizardPhase::Editing;
            state.last_step = Some(report);
        }

        DomainEvent::StepRejected(errors) => {
            state.phase = WizardPhase::Editing;
            state.field_errors = errors;
        }

        DomainEvent::StepFailed(session) => {
            state.wizard = Some(session);
            state.phase = WizardPhase::Editing;
        }

        DomainEvent::WizardCompleted(report) => {
            close_wizard(&mut state);
            state.last_completion = Some(report);
        }

        DomainEvent::WizardCancelled(abandoned) => {
            close_wizard(&mut state);
            state.last_abandoned = Some(abandoned);
        }

        DomainEvent::WizardClosed => close_wizard(&mut state),

        DomainEvent::DraftsListed(drafts) => state.drafts = drafts,

        DomainEvent::Notify { level, message } => {
            let id = state.next_notification_id;
            state.next_notification_id += 1;
            state.notifications.push(Notification { id, level, message });
        }

        DomainEvent::NotificationDismissed(id) => {
            state.notifications.retain(|n| n.id != id);
        }
    }
    state
}

fn close_wizard(state: &mut AppState) {
    state.wizard = None;
    state.phase = WizardPhase::Closed;
    state.field_errors.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_core::FieldError;
    use academy_wizard::{StepReport, WizardSession, WizardStep};

    fn notify(message: &str) -> DomainEvent {
        DomainEvent::Notify {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    #[test]
    fn notifications_get_increasing_ids_and_can_be_dismissed() {
        let s = reduce(AppState::default(), notify("first"));
        let s = reduce(s, notify("second"));
        let ids: Vec<_> = s.notifications.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2]);

        let s = reduce(s, DomainEvent::NotificationDismissed(1));
        assert_eq!(s.notifications.len(), 1);
        assert_eq!(s.notifications[0].message, "second");
        assert_eq!(s.errors().count(), 1);
    }

    #[test]
    fn submission_cycle_moves_between_phases() {
        let session = WizardSession::new();
        let s = reduce(AppState::default(), DomainEvent::WizardOpened(session.clone()));
        assert_eq!(s.phase, WizardPhase::Editing);

        let s = reduce(s, DomainEvent::StepSubmitting(WizardStep::Course));
        assert_eq!(s.phase, WizardPhase::Submitting(WizardStep::Course));

        let s = reduce(
            s,
            DomainEvent::StepRejected(vec![FieldError {
                field: "course.title".into(),
                message: "is required".into(),
            }]),
        );
        assert_eq!(s.phase, WizardPhase::Editing);
        assert_eq!(s.field_errors.len(), 1);

        let s = reduce(s, DomainEvent::StepSubmitting(WizardStep::Course));
        assert!(s.field_errors.is_empty());
        let s = reduce(
            s,
            DomainEvent::StepSaved {
                session,
                report: StepReport::default(),
            },
        );
        assert_eq!(s.phase, WizardPhase::Editing);
        assert!(s.last_step.is_some());
    }

    #[test]
    fn closing_resets_the_wizard_but_keeps_notifications() {
        let s = reduce(
            AppState::default(),
            DomainEvent::WizardOpened(WizardSession::new()),
        );
        let s = reduce(s, notify("kept"));
        let s = reduce(s, DomainEvent::WizardClosed);
        assert!(s.wizard.is_none());
        assert_eq!(s.phase, WizardPhase::Closed);
        assert_eq!(s.notifications.len(), 1);
    }
}
