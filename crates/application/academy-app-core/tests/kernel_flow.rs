use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use academy_app_core::{
    AppCommand, AppKernel, AppStore, FilePersistence, NotificationLevel, WizardPhase,
};
use academy_core::{
    ContentType, CourseDraft, CourseId, LessonDraft, LessonId, ModuleDraft, ModuleId, QuizId,
};
use academy_infra::{ApiError, UploadRequest, UploadedFile};
use academy_persistence::{DraftStore, RedbDraftStore};
use academy_wizard::requests::{CoursePayload, LessonPayload, ModulePayload, QuizPayload};
use academy_wizard::{CourseApi, StepInput, WizardStep};
use camino::Utf8PathBuf;

/// Backend that hands out sequential ids and can refuse module creation.
#[derive(Default)]
struct CountingApi {
    seq: AtomicUsize,
    refuse_modules: AtomicBool,
}

impl CountingApi {
    fn id(&self) -> String {
        (self.seq.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }
}

#[async_trait::async_trait]
impl CourseApi for CountingApi {
    async fn upload_files(&self, files: Vec<UploadRequest>) -> Vec<Result<UploadedFile, ApiError>> {
        files
            .into_iter()
            .map(|f| {
                Ok(UploadedFile {
                    url: format!("https://cdn.test/{}", f.file_name),
                    key: f.key,
                    folder: f.folder,
                    bytes: 0,
                })
            })
            .collect()
    }

    async fn create_course(&self, _course: &CoursePayload) -> Result<CourseId, ApiError> {
        Ok(CourseId::new(self.id()))
    }

    async fn update_course(&self, _id: &CourseId, _course: &CoursePayload) -> Result<(), ApiError> {
        Ok(())
    }

    async fn create_modules(
        &self,
        _course_id: &CourseId,
        modules: &[ModulePayload],
    ) -> Result<Vec<ModuleId>, ApiError> {
        if self.refuse_modules.load(Ordering::SeqCst) {
            return Err(ApiError::Rejected("module titles must be unique".into()));
        }
        Ok(modules.iter().map(|_| ModuleId::new(self.id())).collect())
    }

    async fn update_module(&self, _id: &ModuleId, _module: &ModulePayload) -> Result<(), ApiError> {
        Ok(())
    }

    async fn create_lessons(
        &self,
        _module_id: &ModuleId,
        lessons: &[LessonPayload],
    ) -> Result<Vec<LessonId>, ApiError> {
        Ok(lessons.iter().map(|_| LessonId::new(self.id())).collect())
    }

    async fn update_lesson(&self, _id: &LessonId, _lesson: &LessonPayload) -> Result<(), ApiError> {
        Ok(())
    }

    async fn create_quiz(&self, _course_id: &CourseId, _quiz: &QuizPayload) -> Result<QuizId, ApiError> {
        Ok(QuizId::new(self.id()))
    }

    async fn update_quiz(&self, _id: &QuizId, _quiz: &QuizPayload) -> Result<(), ApiError> {
        Ok(())
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    api: Arc<CountingApi>,
    drafts: RedbDraftStore,
    kernel: AppKernel<FilePersistence, RedbDraftStore>,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let files = FilePersistence::with_root(root.as_std_path());
    let drafts = RedbDraftStore::in_dir(&files.drafts_dir().unwrap());
    let api = Arc::new(CountingApi::default());
    let kernel = AppKernel::new(AppStore::default(), files, drafts.clone(), api.clone());
    Harness {
        _dir: dir,
        api,
        drafts,
        kernel,
    }
}

fn course(title: &str) -> CourseDraft {
    CourseDraft {
        title: title.into(),
        description: "Knots and tides".into(),
        language: "fr".into(),
        ..Default::default()
    }
}

fn modules() -> Vec<ModuleDraft> {
    vec![ModuleDraft {
        title: "Knots".into(),
        ..Default::default()
    }]
}

#[tokio::test]
async fn closed_wizard_can_be_restored_and_finished() {
    let mut h = harness();
    h.kernel.dispatch(AppCommand::LoadInitialState).await;
    h.kernel.dispatch(AppCommand::OpenWizard).await;
    h.kernel
        .dispatch(AppCommand::SubmitStep(StepInput::Course(course("Sailing"))))
        .await;
    h.kernel.dispatch(AppCommand::CloseWizard).await;

    let state = h.kernel.state();
    assert!(state.wizard.is_none());
    assert_eq!(state.phase, WizardPhase::Closed);
    assert_eq!(state.drafts.len(), 1);
    assert_eq!(state.drafts[0].course_title, "Sailing");
    assert_eq!(state.drafts[0].step, "modules");

    let id = state.drafts[0].session_id;
    h.kernel.dispatch(AppCommand::RestoreDraft(id)).await;
    let restored = h.kernel.state().wizard.expect("session restored");
    assert_eq!(restored.step, WizardStep::Modules);
    assert_eq!(restored.results.course_id, Some(CourseId::new("1")));

    h.kernel
        .dispatch(AppCommand::SubmitStep(StepInput::Modules(modules())))
        .await;
    h.kernel
        .dispatch(AppCommand::SubmitStep(StepInput::Lessons(vec![vec![LessonDraft {
            title: "Bowline".into(),
            content_type: ContentType::Text,
            body: Some("Rabbit out of the hole".into()),
            ..Default::default()
        }]])))
        .await;
    h.kernel.dispatch(AppCommand::SkipQuiz).await;

    let state = h.kernel.state();
    let done = state.last_completion.as_ref().expect("completed");
    assert!(done.quiz_skipped);
    assert_eq!(done.course_id, CourseId::new("1"));
    assert!(state.wizard.is_none());
    assert!(state.drafts.is_empty(), "draft is removed on completion");
    assert!(h.drafts.load_draft(&id).unwrap().is_none());
    assert_eq!(state.errors().count(), 0);
}

#[tokio::test]
async fn nothing_is_restored_without_asking() {
    let mut h = harness();
    h.kernel.dispatch(AppCommand::OpenWizard).await;
    h.kernel
        .dispatch(AppCommand::SubmitStep(StepInput::Course(course("Sailing"))))
        .await;
    h.kernel.dispatch(AppCommand::SaveDraft).await;

    h.kernel.dispatch(AppCommand::OpenWizard).await;
    let fresh = h.kernel.state().wizard.unwrap();
    assert_eq!(fresh.step, WizardStep::Course);
    assert!(fresh.results.course_id.is_none());
    assert_eq!(h.kernel.state().drafts.len(), 1);
}

#[tokio::test]
async fn failed_step_becomes_a_dismissible_notification() {
    let mut h = harness();
    h.kernel.dispatch(AppCommand::OpenWizard).await;
    h.kernel
        .dispatch(AppCommand::SubmitStep(StepInput::Course(course("Sailing"))))
        .await;

    h.api.refuse_modules.store(true, Ordering::SeqCst);
    h.kernel
        .dispatch(AppCommand::SubmitStep(StepInput::Modules(modules())))
        .await;

    let state = h.kernel.state();
    assert_eq!(state.phase, WizardPhase::Editing);
    assert_eq!(state.wizard.as_ref().unwrap().step, WizardStep::Modules);
    let errors: Vec<_> = state.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("module titles must be unique"));

    let id = errors[0].id;
    h.kernel.dispatch(AppCommand::DismissNotification(id)).await;
    assert!(h.kernel.state().notifications.is_empty());

    h.api.refuse_modules.store(false, Ordering::SeqCst);
    h.kernel
        .dispatch(AppCommand::SubmitStep(StepInput::Modules(modules())))
        .await;
    assert_eq!(
        h.kernel.state().wizard.unwrap().step,
        WizardStep::Lessons
    );
}

#[tokio::test]
async fn invalid_fields_are_reported_inline() {
    let mut h = harness();
    h.kernel.dispatch(AppCommand::OpenWizard).await;
    h.kernel
        .dispatch(AppCommand::SubmitStep(StepInput::Course(course(""))))
        .await;

    let state = h.kernel.state();
    assert_eq!(state.phase, WizardPhase::Editing);
    assert!(state.field_errors.iter().any(|e| e.field == "course.title"));
    assert!(state.notifications.is_empty());
    assert_eq!(h.api.seq.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancelling_reports_leftovers_and_drops_the_draft() {
    let mut h = harness();
    h.kernel.dispatch(AppCommand::OpenWizard).await;
    h.kernel
        .dispatch(AppCommand::SubmitStep(StepInput::Course(course("Sailing"))))
        .await;
    h.kernel.dispatch(AppCommand::SaveDraft).await;
    h.kernel.dispatch(AppCommand::CancelWizard).await;

    let state = h.kernel.state();
    let abandoned = state.last_abandoned.expect("cancel report");
    assert_eq!(abandoned.course_id, Some(CourseId::new("1")));
    assert!(state.drafts.is_empty());
    assert!(state
        .notifications
        .iter()
        .any(|n| n.level == NotificationLevel::Info && n.message.contains("1 saved record")));
}

#[tokio::test]
async fn restoring_an_unknown_draft_is_an_error_notification() {
    let mut h = harness();
    h.kernel
        .dispatch(AppCommand::RestoreDraft(uuid::Uuid::new_v4()))
        .await;
    let state = h.kernel.state();
    assert!(state.wizard.is_none());
    assert_eq!(state.errors().count(), 1);
}

#[tokio::test]
async fn settings_are_normalized_and_persisted() {
    let mut h = harness();
    let mut settings = h.kernel.settings();
    settings.upload_concurrency = 0;
    settings.api_base_url = " https://school.test/api ".into();
    h.kernel
        .dispatch(AppCommand::UpdateSettings(settings))
        .await;

    let saved = h.kernel.settings();
    assert_eq!(saved.upload_concurrency, academy_config::MIN_UPLOAD_CONCURRENCY);
    assert_eq!(saved.api_base_url, "https://school.test/api");

    h.kernel.dispatch(AppCommand::LoadInitialState).await;
    assert_eq!(h.kernel.settings(), saved);
}

#[tokio::test]
async fn unreadable_draft_store_is_set_aside_with_a_warning() {
    let mut h = harness();
    let drafts_dir = h._dir.path().join("drafts");
    std::fs::create_dir_all(&drafts_dir).unwrap();
    std::fs::write(drafts_dir.join("academy.redb"), b"not a database").unwrap();

    h.kernel.dispatch(AppCommand::LoadInitialState).await;

    let state = h.kernel.state();
    assert_eq!(state.errors().count(), 0);
    let warnings: Vec<_> = state.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("set aside"));
    assert!(state.drafts.is_empty());

    let moved_aside = std::fs::read_dir(&drafts_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .any(|n| n.starts_with("academy.redb.corrupt-"));
    assert!(moved_aside);
}
