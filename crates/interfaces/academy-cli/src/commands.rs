use std::sync::Arc;
use std::time::Duration;

use academy_app_core::{
    http_course_api, AppCommand, AppKernel, AppSettings, AppStore, FilePersistence,
};
use academy_core::validation::{validate_course, validate_lessons, validate_modules, validate_quiz};
use academy_core::{Attachment, CoursePlan, FieldError, LessonId, ModuleId};
use academy_persistence::RedbDraftStore;
use academy_wizard::{CompletionReport, StepInput, StepResults, WizardSession, WizardStep};
use anyhow::{bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{ApiOverrides, SettingsChange};

pub type CliKernel = AppKernel<FilePersistence, RedbDraftStore>;

#[derive(Debug, Clone, Copy, Default)]
pub struct CreateOptions {
    pub skip_quiz: bool,
    pub save_draft_on_error: bool,
}

/// Read a course plan. Relative attachment paths are taken relative to the
/// plan file.
pub fn load_plan(path: &Utf8Path) -> Result<CoursePlan> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read course plan {path}"))?;
    let mut plan: CoursePlan =
        serde_json::from_str(&text).with_context(|| format!("Invalid course plan {path}"))?;
    if let Some(base) = path.parent().filter(|p| !p.as_str().is_empty()) {
        resolve_attachments(&mut plan, base);
    }
    Ok(plan)
}

fn resolve_attachments(plan: &mut CoursePlan, base: &Utf8Path) {
    let rebase = |a: &mut Attachment| {
        if a.path.is_relative() {
            a.path = base.join(&a.path);
        }
    };
    if let Some(cover) = plan.course.cover.as_mut() {
        rebase(cover);
    }
    for lesson in plan.modules.iter_mut().flat_map(|m| m.lessons.iter_mut()) {
        if let Some(att) = lesson.attachment.as_mut() {
            rebase(att);
        }
    }
}

fn attachments(plan: &CoursePlan) -> impl Iterator<Item = &Attachment> {
    plan.course.cover.iter().chain(
        plan.modules
            .iter()
            .flat_map(|m| m.lessons.iter())
            .filter_map(|l| l.attachment.as_ref()),
    )
}

/// Every problem in the plan, across all steps, without touching the network.
pub fn check_plan(plan: &CoursePlan) -> Vec<FieldError> {
    let lessons: Vec<_> = plan.modules.iter().map(|m| m.lessons.clone()).collect();
    let mut problems = Vec::new();
    for res in [
        validate_course(&plan.course),
        validate_modules(&plan.modules),
        validate_lessons(&lessons),
        plan.quiz.as_ref().map_or(Ok(()), validate_quiz),
    ] {
        if let Err(invalid) = res {
            problems.extend(invalid.errors);
        }
    }
    for att in attachments(plan) {
        if !att.path.is_file() {
            problems.push(FieldError {
                field: att.path.to_string(),
                message: "file not found".into(),
            });
        }
    }
    problems
}

pub fn cmd_course_check(plan_path: Utf8PathBuf) -> Result<()> {
    let plan = load_plan(&plan_path)?;
    let problems = check_plan(&plan);

    println!(":: Checking {}", plan_path);
    println!("   Modules: {}", plan.modules.len());
    println!("   Lessons: {}", plan.lesson_count());
    println!(
        "   Quiz:    {}",
        plan.quiz
            .as_ref()
            .map_or("none".to_string(), |q| format!("{} question(s)", q.questions.len()))
    );

    if problems.is_empty() {
        println!("   Status:  Ready (run `course create`)");
        return Ok(());
    }
    for p in &problems {
        println!("   - {}: {}", p.field, p.message);
    }
    bail!("{} problem(s) in {}", problems.len(), plan_path)
}

/// Build a kernel talking to the configured backend and load its state.
pub async fn open_kernel(files: &FilePersistence, overrides: &ApiOverrides) -> Result<CliKernel> {
    let settings = overrides.apply(files.load_settings()?);
    debug!(url = %settings.api_base_url, "using course API");
    let api = Arc::new(http_course_api(&settings)?);
    let drafts = RedbDraftStore::in_dir(&files.drafts_dir()?);
    let mut kernel = AppKernel::new(AppStore::default(), files.clone(), drafts, api);
    kernel.dispatch(AppCommand::LoadInitialState).await;
    take_failure(&mut kernel).await?;

    let warnings: Vec<_> = kernel
        .state()
        .warnings()
        .map(|n| (n.id, n.message.clone()))
        .collect();
    for (id, message) in warnings {
        warn!("{message}");
        kernel.dispatch(AppCommand::DismissNotification(id)).await;
    }
    Ok(kernel)
}

/// Turn what the kernel recorded for the last command into a result. Error
/// notifications are dismissed once read.
async fn take_failure(kernel: &mut CliKernel) -> Result<()> {
    let state = kernel.state();
    if !state.field_errors.is_empty() {
        let lines: Vec<String> = state
            .field_errors
            .iter()
            .map(|e| format!("  {}: {}", e.field, e.message))
            .collect();
        bail!("Invalid input:\n{}", lines.join("\n"));
    }

    let errors: Vec<_> = state.errors().map(|n| (n.id, n.message.clone())).collect();
    if errors.is_empty() {
        return Ok(());
    }
    for (id, _) in &errors {
        kernel.dispatch(AppCommand::DismissNotification(*id)).await;
    }
    let messages: Vec<String> = errors.into_iter().map(|(_, m)| m).collect();
    bail!("{}", messages.join("; "))
}

fn spinner(msg: String) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

async fn run_steps(kernel: &mut CliKernel, inputs: Vec<StepInput>) -> Result<()> {
    let total = WizardStep::ALL.len();
    for input in inputs {
        let step = input.step();
        let tag = format!("[{}/{}]", step.number(), total);
        let pb = spinner(format!("{tag} Saving {step}..."))?;

        kernel.dispatch(AppCommand::SubmitStep(input)).await;
        if let Err(e) = take_failure(kernel).await {
            pb.abandon_with_message(format!("{tag} {step} failed"));
            return Err(e);
        }

        let report = kernel.state().last_step.unwrap_or_default();
        pb.finish_with_message(format!(
            "{tag} {step}: {} created, {} updated, {} uploaded",
            report.created, report.updated, report.uploaded
        ));
    }
    Ok(())
}

/// Submit the remaining steps and close the wizard. On failure the records
/// saved so far are listed; they are never deleted.
async fn drive(
    kernel: &mut CliKernel,
    inputs: Vec<StepInput>,
    keep_draft: bool,
) -> Result<CompletionReport> {
    let with_quiz = inputs.iter().any(|i| i.step() == WizardStep::Quiz);

    if let Err(e) = run_steps(kernel, inputs).await {
        report_partial(kernel, keep_draft).await;
        return Err(e);
    }

    let uploads = upload_totals(kernel.state().wizard.as_ref());
    let finish = if with_quiz {
        AppCommand::FinishWizard
    } else {
        AppCommand::SkipQuiz
    };
    kernel.dispatch(finish).await;
    take_failure(kernel).await?;

    let report = kernel
        .state()
        .last_completion
        .context("The wizard did not complete")?;
    print_completion(&report, uploads);
    Ok(report)
}

async fn report_partial(kernel: &mut CliKernel, keep_draft: bool) {
    let Some(session) = kernel.state().wizard else {
        return;
    };
    print_saved(&session.results);

    if keep_draft {
        kernel.dispatch(AppCommand::SaveDraft).await;
        match take_failure(kernel).await {
            Ok(()) => {
                println!("   Draft saved. Resume with `academy-cli draft restore {}`", session.id)
            }
            Err(e) => warn!("draft not saved: {e:#}"),
        }
    } else {
        kernel.dispatch(AppCommand::CancelWizard).await;
        if !session.results.is_empty() {
            println!("   These records were left on the server.");
        }
    }
}

fn print_saved(results: &StepResults) {
    println!("\n:: Saved before the failure");
    let Some(course) = &results.course_id else {
        println!("   Nothing");
        return;
    };
    println!("   Course:  {}", course);
    for (i, m) in results.module_ids.iter().enumerate() {
        let lessons: Vec<String> = results.lessons_of(i).iter().map(|l| l.to_string()).collect();
        if lessons.is_empty() {
            println!("   Module:  {}", m);
        } else {
            println!("   Module:  {} (lessons {})", m, lessons.join(", "));
        }
    }
    if let Some(q) = &results.quiz_id {
        println!("   Quiz:    {}", q);
    }
    print_orphans(&results.orphaned_modules, &results.orphaned_lessons);
}

fn print_orphans(modules: &[ModuleId], lessons: &[LessonId]) {
    if modules.is_empty() && lessons.is_empty() {
        return;
    }
    println!("\n:: Removed from the plan but still on the server");
    if !modules.is_empty() {
        println!("   Modules: {}", id_list(modules));
    }
    if !lessons.is_empty() {
        println!("   Lessons: {}", id_list(lessons));
    }
}

fn id_list<T: std::fmt::Display>(ids: &[T]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn upload_totals(session: Option<&WizardSession>) -> (usize, u64) {
    let Some(session) = session else {
        return (0, 0);
    };
    let bytes = session
        .results
        .uploads
        .keys()
        .filter_map(|path| std::fs::metadata(path).ok())
        .map(|m| m.len())
        .sum();
    (session.results.uploads.len(), bytes)
}

fn print_completion(report: &CompletionReport, (files, bytes): (usize, u64)) {
    println!("\n:: Course created");
    println!("   Course:  {}", report.course_id);
    println!("   Modules: {}", report.module_ids.len());
    println!("   Lessons: {}", report.lesson_count());
    match &report.quiz_id {
        Some(q) => println!("   Quiz:    {}", q),
        None => println!("   Quiz:    skipped"),
    }
    println!("   Uploads: {} file(s), {}", files, format_size(bytes, DECIMAL));
    print_orphans(&report.orphaned_module_ids, &report.orphaned_lesson_ids);
}

pub async fn cmd_course_create(
    files: &FilePersistence,
    overrides: &ApiOverrides,
    plan_path: Utf8PathBuf,
    opts: CreateOptions,
) -> Result<CompletionReport> {
    let plan = load_plan(&plan_path)?;
    println!(":: Creating course \"{}\"", plan.course.title.trim());
    println!("   Plan:    {}", plan_path);

    let mut kernel = open_kernel(files, overrides).await?;
    kernel.dispatch(AppCommand::OpenWizard).await;

    let mut inputs = StepInput::from_plan(&plan);
    if opts.skip_quiz {
        inputs.retain(|i| i.step() != WizardStep::Quiz);
    }
    drive(&mut kernel, inputs, opts.save_draft_on_error).await
}

/// Continue a stored draft from the step it was saved on. Steps still to do
/// take their input from `plan_path` when given, otherwise from the draft.
pub async fn cmd_draft_restore(
    files: &FilePersistence,
    overrides: &ApiOverrides,
    id: Uuid,
    plan_path: Option<Utf8PathBuf>,
    skip_quiz: bool,
) -> Result<CompletionReport> {
    let mut kernel = open_kernel(files, overrides).await?;
    kernel.dispatch(AppCommand::RestoreDraft(id)).await;
    take_failure(&mut kernel).await?;

    let session = kernel
        .state()
        .wizard
        .context("The draft did not open a wizard")?;
    let plan = match &plan_path {
        Some(path) => load_plan(path)?,
        None => session.plan.clone(),
    };
    println!(
        ":: Resuming \"{}\" at the {} step",
        session.plan.course.title.trim(),
        session.step
    );

    let mut inputs: Vec<StepInput> = StepInput::from_plan(&plan)
        .into_iter()
        .filter(|i| i.step() >= session.step)
        .collect();
    if skip_quiz {
        inputs.retain(|i| i.step() != WizardStep::Quiz);
    }
    drive(&mut kernel, inputs, true).await
}

pub fn cmd_settings_show(files: &FilePersistence) -> Result<AppSettings> {
    let s = files.load_settings()?;
    println!(":: Settings");
    println!("   API URL:  {}", s.api_base_url);
    println!(
        "   Token:    {}",
        if s.api_token.is_some() { "set" } else { "not set" }
    );
    println!("   Timeout:  {}s", s.request_timeout_secs);
    println!("   Uploads:  {} at a time", s.upload_concurrency);
    println!("   Drafts:   {}", files.drafts_dir()?);
    Ok(s)
}

pub fn cmd_settings_set(files: &FilePersistence, change: SettingsChange) -> Result<AppSettings> {
    if change.is_empty() {
        bail!("Nothing to change (see `academy-cli settings set --help`)");
    }
    let settings = change.apply(files.load_settings()?).normalized();
    files.save_settings(&settings)?;
    println!("Settings saved.");
    Ok(settings)
}
