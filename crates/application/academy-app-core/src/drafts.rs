use anyhow::{Context, Result};
use academy_persistence::DraftSnapshot;
use academy_wizard::WizardSession;
use chrono::Utc;

pub fn snapshot_of(session: &WizardSession) -> Result<DraftSnapshot> {
    let state = serde_json::to_value(session).context("Failed to serialize wizard session")?;
    Ok(DraftSnapshot {
        session_id: session.id,
        saved_at: Utc::now(),
        step: session.step.label().to_string(),
        course_title: session.plan.course.title.trim().to_string(),
        state,
    })
}

pub fn session_from(snapshot: DraftSnapshot) -> Result<WizardSession> {
    let session: WizardSession = serde_json::from_value(snapshot.state)
        .with_context(|| format!("Draft {} cannot be read back", snapshot.session_id))?;
    anyhow::ensure!(
        session.id == snapshot.session_id,
        "Draft {} holds session {}",
        snapshot.session_id,
        session.id
    );
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_core::CourseId;
    use academy_wizard::WizardStep;

    #[test]
    fn snapshot_keeps_form_data_and_identifiers() {
        let mut session = WizardSession::new();
        session.plan.course.title = "  Sailing 101 ".into();
        session.results.course_id = Some(CourseId::new("c-9"));
        session.step = WizardStep::Modules;
        session.completed.insert(WizardStep::Course);

        let snap = snapshot_of(&session).unwrap();
        assert_eq!(snap.course_title, "Sailing 101");
        assert_eq!(snap.step, "modules");

        let back = session_from(snap).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn mismatched_session_id_is_rejected() {
        let session = WizardSession::new();
        let mut snap = snapshot_of(&session).unwrap();
        snap.session_id = uuid::Uuid::new_v4();
        assert!(session_from(snap).is_err());
    }
}
