use academy_app_core::drafts::session_from;
use academy_app_core::FilePersistence;
use academy_persistence::{DbState, DraftSnapshot, DraftStore, DraftSummary, RedbDraftStore};
use academy_wizard::WizardStep;
use anyhow::{anyhow, bail, Context, Result};
use tracing::warn;
use uuid::Uuid;

/// Read-side access to stored drafts. Restoring goes through the app kernel,
/// see [`crate::commands::cmd_draft_restore`].
pub struct DraftManager {
    store: RedbDraftStore,
}

impl DraftManager {
    pub fn new(files: &FilePersistence) -> Result<Self> {
        Ok(Self {
            store: RedbDraftStore::in_dir(&files.drafts_dir()?),
        })
    }

    /// Fail on a store that cannot be read as is. An unreadable file has
    /// already been set aside, so listing continues from an empty store.
    pub fn check(&self) -> Result<()> {
        match self
            .store
            .validate()
            .context("Failed to check the draft store")?
        {
            DbState::Missing | DbState::Valid => Ok(()),
            DbState::Corrupt => {
                warn!("the draft store was unreadable and has been set aside");
                Ok(())
            }
            DbState::Busy => {
                bail!("The draft store is in use (retry once other academy-cli runs have exited)")
            }
            DbState::NewerSchema { found, supported } => bail!(
                "Drafts were written by a newer version of academy-cli (schema {found}, this build reads {supported})"
            ),
        }
    }

    pub fn list(&self) -> Result<Vec<DraftSummary>> {
        self.check()?;
        self.store.list_drafts().map_err(|e| {
            let hint = if e.is_transient() {
                " (retry once other academy-cli runs have exited)"
            } else {
                ""
            };
            anyhow!("Failed to list drafts: {e}{hint}")
        })
    }

    pub fn find(&self, id: &Uuid) -> Result<DraftSnapshot> {
        self.store
            .load_draft(id)
            .context("Failed to read drafts")?
            .ok_or_else(|| anyhow!("Draft '{}' not found", id))
    }

    pub fn remove(&self, id: &Uuid) -> Result<()> {
        if !self.store.delete_draft(id).context("Failed to delete draft")? {
            return Err(anyhow!("Draft '{}' not found", id));
        }
        Ok(())
    }
}

pub fn handle_list(files: &FilePersistence) -> Result<()> {
    let drafts = DraftManager::new(files)?.list()?;

    if drafts.is_empty() {
        println!("No drafts found.");
        return Ok(());
    }

    println!("{:<36} {:<8} {:<20} {:<32}", "ID", "STEP", "SAVED", "COURSE");
    println!("{:-<36} {:-<8} {:-<20} {:-<32}", "", "", "", "");
    for d in drafts {
        let title = if d.course_title.is_empty() {
            "(untitled)"
        } else {
            d.course_title.as_str()
        };
        println!(
            "{:<36} {:<8} {:<20} {:<32}",
            d.session_id,
            d.step,
            d.saved_at.format("%Y-%m-%d %H:%M:%S"),
            title
        );
    }

    Ok(())
}

pub fn handle_show(files: &FilePersistence, id: Uuid, json: bool) -> Result<()> {
    let mgr = DraftManager::new(files)?;
    let snapshot = mgr.find(&id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.state)?);
        return Ok(());
    }

    let session = session_from(snapshot.clone())?;
    let results = &session.results;
    println!(":: Draft {}", snapshot.session_id);
    println!("   Course:  {}", snapshot.course_title);
    println!(
        "   Step:    {} ({}/{})",
        session.step,
        session.step.number(),
        WizardStep::ALL.len()
    );
    println!("   Saved:   {}", snapshot.saved_at.to_rfc3339());
    println!("   Modules: {}", session.plan.modules.len());
    println!("   Lessons: {}", session.plan.lesson_count());
    println!("\n:: Saved on the server");
    match &results.course_id {
        Some(id) => println!("   Course:  {}", id),
        None => println!("   Nothing yet"),
    }
    for (i, m) in results.module_ids.iter().enumerate() {
        println!(
            "   Module {}: {} ({} lesson(s))",
            i + 1,
            m,
            results.lessons_of(i).len()
        );
    }
    if let Some(q) = &results.quiz_id {
        println!("   Quiz:    {}", q);
    }
    if results.has_orphans() {
        println!(
            "   Orphans: {} module(s), {} lesson(s) removed from the plan",
            results.orphaned_modules.len(),
            results.orphaned_lessons.len()
        );
    }
    Ok(())
}

pub fn handle_discard(files: &FilePersistence, id: Uuid) -> Result<()> {
    DraftManager::new(files)?.remove(&id)?;
    println!("Draft '{}' discarded.", id);
    Ok(())
}
