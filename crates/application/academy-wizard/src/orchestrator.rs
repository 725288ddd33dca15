use std::sync::Arc;

use academy_core::validation::{validate_course, validate_lessons, validate_modules, validate_quiz};
use academy_core::{Attachment, CourseId, LessonId, ModuleId, QuizId, ValidationErrors};
use academy_infra::{ApiError, UploadRequest};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::api::CourseApi;
use crate::error::WizardError;
use crate::requests::{
    course_request, lesson_requests, module_requests, pending_lesson_attachments, quiz_request,
    Write,
};
use crate::session::{
    transition, StepInput, UploadedAsset, WizardEvent, WizardSession, WizardStep,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepReport {
    pub step: WizardStep,
    /// Step the session is on after the submission.
    pub current: WizardStep,
    pub uploaded: usize,
    pub created: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub session_id: Uuid,
    pub course_id: CourseId,
    pub module_ids: Vec<ModuleId>,
    pub lesson_ids: Vec<Vec<LessonId>>,
    pub quiz_id: Option<QuizId>,
    pub quiz_skipped: bool,
    /// Created by an earlier submission, then removed from the forms.
    pub orphaned_module_ids: Vec<ModuleId>,
    pub orphaned_lesson_ids: Vec<LessonId>,
}

impl CompletionReport {
    fn from_session(session: WizardSession, quiz_skipped: bool) -> Result<Self, WizardError> {
        let course_id = session
            .results
            .course_id
            .ok_or(WizardError::MissingPrerequisite {
                step: WizardStep::Quiz,
                missing: "course",
            })?;
        Ok(Self {
            session_id: session.id,
            course_id,
            module_ids: session.results.module_ids,
            lesson_ids: session.results.lesson_ids,
            quiz_id: session.results.quiz_id,
            quiz_skipped,
            orphaned_module_ids: session.results.orphaned_modules,
            orphaned_lesson_ids: session.results.orphaned_lessons,
        })
    }

    pub fn lesson_count(&self) -> usize {
        self.lesson_ids.iter().map(Vec::len).sum()
    }

    pub fn orphan_count(&self) -> usize {
        self.orphaned_module_ids.len() + self.orphaned_lesson_ids.len()
    }
}

/// Server-side records left behind by a cancelled wizard. They are reported,
/// not removed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AbandonedResources {
    pub session_id: Uuid,
    pub course_id: Option<CourseId>,
    pub module_ids: Vec<ModuleId>,
    pub lesson_ids: Vec<LessonId>,
    pub quiz_id: Option<QuizId>,
    pub orphaned_module_ids: Vec<ModuleId>,
    pub orphaned_lesson_ids: Vec<LessonId>,
}

impl AbandonedResources {
    fn from_session(session: WizardSession) -> Self {
        Self {
            session_id: session.id,
            course_id: session.results.course_id,
            module_ids: session.results.module_ids,
            lesson_ids: session.results.lesson_ids.into_iter().flatten().collect(),
            quiz_id: session.results.quiz_id,
            orphaned_module_ids: session.results.orphaned_modules,
            orphaned_lesson_ids: session.results.orphaned_lessons,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        usize::from(self.course_id.is_some())
            + self.module_ids.len()
            + self.lesson_ids.len()
            + usize::from(self.quiz_id.is_some())
            + self.orphaned_module_ids.len()
            + self.orphaned_lesson_ids.len()
    }
}

fn count_mismatch(step: WizardStep, what: &str, expected: usize, returned: usize) -> WizardError {
    WizardError::Api {
        step,
        cause: ApiError::Decode(format!(
            "asked to create {expected} {what}, server returned {returned}"
        )),
    }
}

fn validate_input(input: &StepInput) -> Result<(), ValidationErrors> {
    match input {
        StepInput::Course(course) => validate_course(course),
        StepInput::Modules(modules) => validate_modules(modules),
        StepInput::Lessons(groups) => validate_lessons(groups),
        StepInput::Quiz(quiz) => validate_quiz(quiz),
    }
}

/// Drives one wizard session against the backend.
///
/// Every state change goes through [`transition`]; identifiers are recorded
/// as soon as the call producing them succeeds, so a failed step can be
/// retried without creating duplicates.
pub struct WizardOrchestrator {
    api: Arc<dyn CourseApi>,
    session: Option<WizardSession>,
}

impl WizardOrchestrator {
    pub fn new(api: Arc<dyn CourseApi>) -> Self {
        Self { api, session: None }
    }

    pub fn session(&self) -> Option<&WizardSession> {
        self.session.as_ref()
    }

    fn current(&self) -> Result<&WizardSession, WizardError> {
        self.session.as_ref().ok_or(WizardError::NoSession)
    }

    fn apply(&mut self, ev: WizardEvent) -> Result<(), WizardError> {
        let current = self.current()?.clone();
        let next = transition(current, ev)?;
        self.session = Some(next);
        Ok(())
    }

    /// Open a fresh session, discarding any session held in memory.
    pub fn start(&mut self) -> &WizardSession {
        if let Some(old) = self.session.take() {
            debug!(session = %old.id, "replacing open wizard session");
        }
        let session = WizardSession::new();
        info!(session = %session.id, "wizard started");
        self.session.insert(session)
    }

    /// Continue a session restored from a draft.
    pub fn resume(&mut self, session: WizardSession) -> Result<&WizardSession, WizardError> {
        if !session.is_open() {
            return Err(crate::session::TransitionError::SessionClosed.into());
        }
        info!(session = %session.id, step = %session.step, "wizard resumed");
        Ok(self.session.insert(session))
    }

    /// Hand the in-memory session to the caller and forget it.
    pub fn take_session(&mut self) -> Option<WizardSession> {
        self.session.take()
    }

    /// Validate and submit the current step. On success the session moves to
    /// the next step; on failure it stays where it was, keeping whatever
    /// identifiers were captured before the failing call.
    pub async fn advance(&mut self, input: StepInput) -> Result<StepReport, WizardError> {
        let session = self.current()?;
        let step = session.step;
        let session_id = session.id;
        if !session.is_open() {
            return Err(crate::session::TransitionError::SessionClosed.into());
        }
        if input.step() != step {
            return Err(crate::session::TransitionError::WrongStep {
                expected: step,
                found: input.step(),
            }
            .into());
        }
        validate_input(&input)?;
        self.apply(WizardEvent::FormSubmitted(input))?;

        let mut report = StepReport {
            step,
            current: step,
            ..StepReport::default()
        };
        let span = tracing::info_span!("wizard_step", session = %session_id, step = %step);
        let outcome = async {
            match step {
                WizardStep::Course => self.save_course(&mut report).await,
                WizardStep::Modules => self.save_modules(&mut report).await,
                WizardStep::Lessons => self.save_lessons(&mut report).await,
                WizardStep::Quiz => self.save_quiz(&mut report).await,
            }
        }
        .instrument(span)
        .await;

        if let Err(e) = outcome {
            warn!(%step, created = report.created, updated = report.updated, "step not saved: {e}");
            return Err(e);
        }

        self.apply(WizardEvent::StepCompleted(step))?;
        report.current = self.current()?.step;
        info!(
            %step,
            uploaded = report.uploaded,
            created = report.created,
            updated = report.updated,
            "step saved"
        );
        Ok(report)
    }

    pub fn retreat(&mut self) -> Result<WizardStep, WizardError> {
        self.apply(WizardEvent::Retreated)?;
        let step = self.current()?.step;
        debug!(%step, "moved back");
        Ok(step)
    }

    pub fn go_to(&mut self, step: WizardStep) -> Result<(), WizardError> {
        self.apply(WizardEvent::Jumped(step))?;
        debug!(%step, "jumped to step");
        Ok(())
    }

    /// Finish without a quiz. The course and its content stay as saved.
    pub fn skip_quiz(&mut self) -> Result<CompletionReport, WizardError> {
        self.apply(WizardEvent::QuizSkipped)?;
        self.finish(true)
    }

    pub fn complete(&mut self) -> Result<CompletionReport, WizardError> {
        self.apply(WizardEvent::Completed)?;
        self.finish(false)
    }

    fn finish(&mut self, quiz_skipped: bool) -> Result<CompletionReport, WizardError> {
        let session = self.session.take().ok_or(WizardError::NoSession)?;
        let report = CompletionReport::from_session(session, quiz_skipped)?;
        info!(
            session = %report.session_id,
            course_id = %report.course_id,
            modules = report.module_ids.len(),
            lessons = report.lesson_count(),
            quiz_skipped,
            "wizard completed"
        );
        if report.orphan_count() > 0 {
            warn!(
                modules = ?report.orphaned_module_ids,
                lessons = ?report.orphaned_lesson_ids,
                "records removed from the forms are still on the server"
            );
        }
        Ok(report)
    }

    /// Abandon the session. Nothing is deleted on the server; the records
    /// created so far are returned so the caller can tell the user.
    pub fn cancel(&mut self) -> Result<AbandonedResources, WizardError> {
        self.apply(WizardEvent::Cancelled)?;
        let session = self.session.take().ok_or(WizardError::NoSession)?;
        let abandoned = AbandonedResources::from_session(session);
        if abandoned.is_empty() {
            info!(session = %abandoned.session_id, "wizard cancelled");
        } else {
            warn!(
                session = %abandoned.session_id,
                course_id = ?abandoned.course_id,
                records = abandoned.total(),
                "wizard cancelled, saved records are left on the server"
            );
        }
        Ok(abandoned)
    }

    async fn upload(
        &mut self,
        step: WizardStep,
        attachments: Vec<Attachment>,
        report: &mut StepReport,
    ) -> Result<(), WizardError> {
        if attachments.is_empty() {
            return Ok(());
        }
        let api = self.api.clone();
        let requests: Vec<UploadRequest> =
            attachments.iter().map(UploadRequest::for_attachment).collect();
        let expected = requests.len();
        let results = api.upload_files(requests).await;

        let mut first_error: Option<ApiError> = None;
        if results.len() != expected {
            first_error = Some(ApiError::Decode(format!(
                "{expected} uploads requested, {} answered",
                results.len()
            )));
        }
        for res in results {
            match res {
                Ok(file) => {
                    debug!(key = %file.key, folder = %file.folder, bytes = file.bytes, "file uploaded");
                    self.apply(WizardEvent::AssetUploaded {
                        key: file.key,
                        asset: UploadedAsset {
                            url: file.url,
                            folder: file.folder,
                        },
                    })?;
                    report.uploaded += 1;
                }
                Err(e) => {
                    warn!("upload failed: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(cause) => Err(WizardError::Api { step, cause }),
            None => Ok(()),
        }
    }

    async fn save_course(&mut self, report: &mut StepReport) -> Result<(), WizardError> {
        let session = self.current()?;
        let pending: Vec<Attachment> = session
            .plan
            .course
            .cover
            .iter()
            .filter(|c| !session.results.uploads.contains_key(&c.key()))
            .cloned()
            .collect();
        self.upload(WizardStep::Course, pending, report).await?;

        let api = self.api.clone();
        let step = WizardStep::Course;
        match course_request(self.current()?)? {
            Write::Create(payload) => {
                let id = api.create_course(&payload).await.map_err(WizardError::api(step))?;
                info!(course_id = %id, "course created");
                self.apply(WizardEvent::CourseSaved(id))?;
                report.created += 1;
            }
            Write::Update(id, payload) => {
                api.update_course(&id, &payload).await.map_err(WizardError::api(step))?;
                debug!(course_id = %id, "course updated");
                report.updated += 1;
            }
        }
        Ok(())
    }

    async fn save_modules(&mut self, report: &mut StepReport) -> Result<(), WizardError> {
        let api = self.api.clone();
        let step = WizardStep::Modules;
        let writes = module_requests(self.current()?)?;

        for (position, id, payload) in &writes.updates {
            api.update_module(id, payload).await.map_err(WizardError::api(step))?;
            debug!(position, module_id = %id, "module updated");
            report.updated += 1;
        }

        if let Some(first) = writes.creates.first() {
            let course_id = first.course_id.clone();
            let expected = writes.creates.len();
            let ids = api
                .create_modules(&course_id, &writes.creates)
                .await
                .map_err(WizardError::api(step))?;
            let returned = ids.len();
            let mut ids = ids.into_iter();
            for (offset, id) in ids.by_ref().take(expected).enumerate() {
                info!(position = writes.first_new + offset, module_id = %id, "module created");
                self.apply(WizardEvent::ModuleSaved {
                    position: writes.first_new + offset,
                    id,
                })?;
                report.created += 1;
            }
            let extra: Vec<ModuleId> = ids.collect();
            if !extra.is_empty() {
                self.apply(WizardEvent::Detached {
                    modules: extra,
                    lessons: Vec::new(),
                })?;
            }
            if returned != expected {
                return Err(count_mismatch(step, "modules", expected, returned));
            }
        }
        Ok(())
    }

    async fn save_lessons(&mut self, report: &mut StepReport) -> Result<(), WizardError> {
        let pending = pending_lesson_attachments(self.current()?);
        self.upload(WizardStep::Lessons, pending, report).await?;

        let api = self.api.clone();
        let step = WizardStep::Lessons;
        let groups = lesson_requests(self.current()?)?;

        for group in groups {
            for (position, id, payload) in &group.writes.updates {
                api.update_lesson(id, payload).await.map_err(WizardError::api(step))?;
                debug!(module = group.module, position, lesson_id = %id, "lesson updated");
                report.updated += 1;
            }
            if group.writes.creates.is_empty() {
                continue;
            }
            let expected = group.writes.creates.len();
            let ids = api
                .create_lessons(&group.module_id, &group.writes.creates)
                .await
                .map_err(WizardError::api(step))?;
            let returned = ids.len();
            let mut ids = ids.into_iter();
            for (offset, id) in ids.by_ref().take(expected).enumerate() {
                let position = group.writes.first_new + offset;
                info!(module = group.module, position, lesson_id = %id, "lesson created");
                self.apply(WizardEvent::LessonSaved {
                    module: group.module,
                    position,
                    id,
                })?;
                report.created += 1;
            }
            let extra: Vec<LessonId> = ids.collect();
            if !extra.is_empty() {
                self.apply(WizardEvent::Detached {
                    modules: Vec::new(),
                    lessons: extra,
                })?;
            }
            if returned != expected {
                return Err(count_mismatch(step, "lessons", expected, returned));
            }
        }
        Ok(())
    }

    async fn save_quiz(&mut self, report: &mut StepReport) -> Result<(), WizardError> {
        let api = self.api.clone();
        let step = WizardStep::Quiz;
        match quiz_request(self.current()?)? {
            Write::Create(payload) => {
                let id = api
                    .create_quiz(&payload.course_id, &payload)
                    .await
                    .map_err(WizardError::api(step))?;
                info!(quiz_id = %id, "quiz created");
                self.apply(WizardEvent::QuizSaved(id))?;
                report.created += 1;
            }
            Write::Update(id, payload) => {
                api.update_quiz(&id, &payload).await.map_err(WizardError::api(step))?;
                debug!(quiz_id = %id, "quiz updated");
                report.updated += 1;
            }
        }
        Ok(())
    }
}
