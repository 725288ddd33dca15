use std::collections::{BTreeMap, BTreeSet};

use academy_core::{
    CourseDraft, CourseId, CoursePlan, LessonDraft, LessonId, ModuleDraft, ModuleId, QuizDraft,
    QuizId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Course,
    Modules,
    Lessons,
    Quiz,
}

impl WizardStep {
    pub const ALL: [WizardStep; 4] = [
        WizardStep::Course,
        WizardStep::Modules,
        WizardStep::Lessons,
        WizardStep::Quiz,
    ];

    pub fn first() -> Self {
        WizardStep::Course
    }

    pub fn next(self) -> Option<Self> {
        match self {
            WizardStep::Course => Some(WizardStep::Modules),
            WizardStep::Modules => Some(WizardStep::Lessons),
            WizardStep::Lessons => Some(WizardStep::Quiz),
            WizardStep::Quiz => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            WizardStep::Course => None,
            WizardStep::Modules => Some(WizardStep::Course),
            WizardStep::Lessons => Some(WizardStep::Modules),
            WizardStep::Quiz => Some(WizardStep::Lessons),
        }
    }

    /// 1-based position, as shown to the user.
    pub fn number(self) -> usize {
        self as usize + 1
    }

    pub fn label(self) -> &'static str {
        match self {
            WizardStep::Course => "course",
            WizardStep::Modules => "modules",
            WizardStep::Lessons => "lessons",
            WizardStep::Quiz => "quiz",
        }
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for WizardStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WizardStep::ALL
            .into_iter()
            .find(|step| step.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown wizard step '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub url: String,
    pub folder: String,
}

/// Identifiers handed back by the backend, indexed by list position.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepResults {
    pub course_id: Option<CourseId>,
    #[serde(default)]
    pub module_ids: Vec<ModuleId>,
    /// `lesson_ids[m][l]` is lesson `l` of module `m`.
    #[serde(default)]
    pub lesson_ids: Vec<Vec<LessonId>>,
    pub quiz_id: Option<QuizId>,
    /// Attachment key to uploaded asset.
    #[serde(default)]
    pub uploads: BTreeMap<String, UploadedAsset>,
    /// Records created earlier whose form entry was later removed. They stay
    /// on the server and are no longer part of the course being built.
    #[serde(default)]
    pub orphaned_modules: Vec<ModuleId>,
    #[serde(default)]
    pub orphaned_lessons: Vec<LessonId>,
}

impl StepResults {
    pub fn lesson_count(&self) -> usize {
        self.lesson_ids.iter().map(Vec::len).sum()
    }

    pub fn lessons_of(&self, module: usize) -> &[LessonId] {
        self.lesson_ids.get(module).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.course_id.is_none()
            && self.module_ids.is_empty()
            && self.lesson_count() == 0
            && self.quiz_id.is_none()
            && !self.has_orphans()
    }

    pub fn has_orphans(&self) -> bool {
        !self.orphaned_modules.is_empty() || !self.orphaned_lessons.is_empty()
    }

    /// Move identifiers with no matching form entry out of the live lists.
    fn detach_removed(&mut self, plan: &CoursePlan) {
        let modules = plan.modules.len();
        if self.module_ids.len() > modules {
            self.orphaned_modules.extend(self.module_ids.drain(modules..));
        }
        if self.lesson_ids.len() > modules {
            let dropped = self.lesson_ids.drain(modules..).flatten();
            self.orphaned_lessons.extend(dropped);
        }
        for (ids, module) in self.lesson_ids.iter_mut().zip(&plan.modules) {
            if ids.len() > module.lessons.len() {
                self.orphaned_lessons.extend(ids.drain(module.lessons.len()..));
            }
        }
    }
}

/// Input collected by one step's form.
#[derive(Debug, Clone, PartialEq)]
pub enum StepInput {
    Course(CourseDraft),
    Modules(Vec<ModuleDraft>),
    /// Lessons grouped by module position.
    Lessons(Vec<Vec<LessonDraft>>),
    Quiz(QuizDraft),
}

impl StepInput {
    pub fn step(&self) -> WizardStep {
        match self {
            StepInput::Course(_) => WizardStep::Course,
            StepInput::Modules(_) => WizardStep::Modules,
            StepInput::Lessons(_) => WizardStep::Lessons,
            StepInput::Quiz(_) => WizardStep::Quiz,
        }
    }

    /// Split a whole plan into the inputs of each step, in order.
    pub fn from_plan(plan: &CoursePlan) -> Vec<StepInput> {
        let mut out = vec![
            StepInput::Course(plan.course.clone()),
            StepInput::Modules(plan.modules.clone()),
            StepInput::Lessons(plan.modules.iter().map(|m| m.lessons.clone()).collect()),
        ];
        if let Some(q) = &plan.quiz {
            out.push(StepInput::Quiz(q.clone()));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSession {
    pub id: Uuid,
    pub step: WizardStep,
    pub completed: BTreeSet<WizardStep>,
    pub status: SessionStatus,
    pub plan: CoursePlan,
    pub results: StepResults,
}

impl WizardSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            step: WizardStep::first(),
            completed: BTreeSet::new(),
            status: SessionStatus::Open,
            plan: CoursePlan::default(),
            results: StepResults::default(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    pub fn is_completed(&self, step: WizardStep) -> bool {
        self.completed.contains(&step)
    }

    /// Whether every step before `step` has been submitted successfully and
    /// still holds an identifier for each entry of the current forms.
    pub fn can_enter(&self, step: WizardStep) -> bool {
        WizardStep::ALL
            .iter()
            .take_while(|s| **s < step)
            .all(|s| self.completed.contains(s) && step_outputs_present(self, *s).is_ok())
    }
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent {
    FormSubmitted(StepInput),
    AssetUploaded { key: String, asset: UploadedAsset },
    CourseSaved(CourseId),
    ModuleSaved { position: usize, id: ModuleId },
    LessonSaved {
        module: usize,
        position: usize,
        id: LessonId,
    },
    QuizSaved(QuizId),
    /// Records the server created beyond the ones requested.
    Detached {
        modules: Vec<ModuleId>,
        lessons: Vec<LessonId>,
    },
    StepCompleted(WizardStep),
    Retreated,
    Jumped(WizardStep),
    QuizSkipped,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("the wizard session is closed")]
    SessionClosed,
    #[error("expected input for the {expected} step, got {found}")]
    WrongStep {
        expected: WizardStep,
        found: WizardStep,
    },
    #[error("{what} is already {existing}, refusing to replace it with {incoming}")]
    IdentifierConflict {
        what: &'static str,
        existing: String,
        incoming: String,
    },
    #[error("{0} has not been created yet")]
    MissingPrerequisite(&'static str),
    #[error("{what} at position {position} recorded before position {expected}")]
    OutOfOrder {
        what: &'static str,
        position: usize,
        expected: usize,
    },
    #[error("lessons given for module {0}, which does not exist")]
    UnknownModule(usize),
    #[error("already at the first step")]
    NoPreviousStep,
    #[error("the {0} step cannot be opened before the steps preceding it are saved")]
    StepLocked(WizardStep),
    #[error("cannot finish yet: {0}")]
    NotReady(&'static str),
}

/// Record `id` at `position`, keeping already captured identifiers intact.
fn record_at<T: Clone + PartialEq + std::fmt::Display>(
    ids: &mut Vec<T>,
    position: usize,
    id: T,
    what: &'static str,
) -> Result<(), TransitionError> {
    match position.cmp(&ids.len()) {
        std::cmp::Ordering::Less => {
            if ids[position] != id {
                return Err(TransitionError::IdentifierConflict {
                    what,
                    existing: ids[position].to_string(),
                    incoming: id.to_string(),
                });
            }
            Ok(())
        }
        std::cmp::Ordering::Equal => {
            ids.push(id);
            Ok(())
        }
        std::cmp::Ordering::Greater => Err(TransitionError::OutOfOrder {
            what,
            position,
            expected: ids.len(),
        }),
    }
}

fn record_once<T: Clone + PartialEq + std::fmt::Display>(
    slot: &mut Option<T>,
    id: T,
    what: &'static str,
) -> Result<(), TransitionError> {
    match slot {
        Some(existing) if *existing != id => Err(TransitionError::IdentifierConflict {
            what,
            existing: existing.to_string(),
            incoming: id.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            *slot = Some(id);
            Ok(())
        }
    }
}

/// Whether the identifiers a step is supposed to produce are all present.
fn step_outputs_present(session: &WizardSession, step: WizardStep) -> Result<(), TransitionError> {
    let r = &session.results;
    match step {
        WizardStep::Course => r
            .course_id
            .as_ref()
            .map(|_| ())
            .ok_or(TransitionError::MissingPrerequisite("course")),
        WizardStep::Modules => {
            if r.module_ids.is_empty() || r.module_ids.len() < session.plan.modules.len() {
                Err(TransitionError::MissingPrerequisite("module"))
            } else {
                Ok(())
            }
        }
        WizardStep::Lessons => {
            let missing = session
                .plan
                .modules
                .iter()
                .enumerate()
                .any(|(m, module)| r.lessons_of(m).len() < module.lessons.len());
            if missing {
                Err(TransitionError::MissingPrerequisite("lesson"))
            } else {
                Ok(())
            }
        }
        WizardStep::Quiz => r
            .quiz_id
            .as_ref()
            .map(|_| ())
            .ok_or(TransitionError::MissingPrerequisite("quiz")),
    }
}

fn apply_form(plan: &mut CoursePlan, input: StepInput) -> Result<(), TransitionError> {
    match input {
        StepInput::Course(course) => plan.course = course,
        StepInput::Modules(mut modules) => {
            // Lesson forms belong to the next step; keep them by position.
            for (incoming, old) in modules.iter_mut().zip(plan.modules.iter_mut()) {
                if incoming.lessons.is_empty() {
                    incoming.lessons = std::mem::take(&mut old.lessons);
                }
            }
            plan.modules = modules;
        }
        StepInput::Lessons(groups) => {
            if groups.len() > plan.modules.len() {
                return Err(TransitionError::UnknownModule(plan.modules.len()));
            }
            for (module, lessons) in plan.modules.iter_mut().zip(
                groups
                    .into_iter()
                    .chain(std::iter::repeat_with(Vec::new)),
            ) {
                module.lessons = lessons;
            }
        }
        StepInput::Quiz(quiz) => plan.quiz = Some(quiz),
    }
    Ok(())
}

/// Pure transition function: the session is consumed and the next one
/// returned. On error the caller keeps its previous value untouched.
pub fn transition(
    mut session: WizardSession,
    ev: WizardEvent,
) -> Result<WizardSession, TransitionError> {
    if !session.is_open() {
        return Err(TransitionError::SessionClosed);
    }

    match ev {
        WizardEvent::FormSubmitted(input) => {
            if input.step() != session.step {
                return Err(TransitionError::WrongStep {
                    expected: session.step,
                    found: input.step(),
                });
            }
            let step = input.step();
            apply_form(&mut session.plan, input)?;
            session.results.detach_removed(&session.plan);
            // Later steps were saved against the old form and must be saved again.
            session.completed.retain(|s| *s <= step);
        }

        WizardEvent::AssetUploaded { key, asset } => {
            session.results.uploads.entry(key).or_insert(asset);
        }

        WizardEvent::CourseSaved(id) => {
            record_once(&mut session.results.course_id, id, "course id")?;
        }

        WizardEvent::ModuleSaved { position, id } => {
            if session.results.course_id.is_none() {
                return Err(TransitionError::MissingPrerequisite("course"));
            }
            record_at(&mut session.results.module_ids, position, id, "module id")?;
        }

        WizardEvent::LessonSaved {
            module,
            position,
            id,
        } => {
            if module >= session.results.module_ids.len() {
                return Err(TransitionError::MissingPrerequisite("module"));
            }
            let groups = &mut session.results.lesson_ids;
            if groups.len() <= module {
                groups.resize_with(module + 1, Vec::new);
            }
            record_at(&mut groups[module], position, id, "lesson id")?;
        }

        WizardEvent::QuizSaved(id) => {
            if session.results.course_id.is_none() {
                return Err(TransitionError::MissingPrerequisite("course"));
            }
            record_once(&mut session.results.quiz_id, id, "quiz id")?;
        }

        WizardEvent::Detached { modules, lessons } => {
            session.results.orphaned_modules.extend(modules);
            session.results.orphaned_lessons.extend(lessons);
        }

        WizardEvent::StepCompleted(step) => {
            if step != session.step {
                return Err(TransitionError::WrongStep {
                    expected: session.step,
                    found: step,
                });
            }
            step_outputs_present(&session, step)?;
            session.completed.insert(step);
            if let Some(next) = step.next() {
                session.step = next;
            }
        }

        WizardEvent::Retreated => {
            session.step = session
                .step
                .previous()
                .ok_or(TransitionError::NoPreviousStep)?;
        }

        WizardEvent::Jumped(target) => {
            if !session.can_enter(target) {
                return Err(TransitionError::StepLocked(target));
            }
            session.step = target;
        }

        WizardEvent::QuizSkipped => {
            if session.step != WizardStep::Quiz {
                return Err(TransitionError::WrongStep {
                    expected: WizardStep::Quiz,
                    found: session.step,
                });
            }
            if session.results.course_id.is_none() {
                return Err(TransitionError::MissingPrerequisite("course"));
            }
            if !session.can_enter(WizardStep::Quiz) {
                return Err(TransitionError::NotReady("earlier steps have unsaved entries"));
            }
            session.status = SessionStatus::Completed;
        }

        WizardEvent::Completed => {
            if session.step != WizardStep::Quiz || !session.is_completed(WizardStep::Quiz) {
                return Err(TransitionError::NotReady(
                    "the quiz has not been saved (skip it instead)",
                ));
            }
            if !session.can_enter(WizardStep::Quiz) {
                return Err(TransitionError::NotReady("earlier steps have unsaved entries"));
            }
            session.status = SessionStatus::Completed;
        }

        WizardEvent::Cancelled => {
            session.status = SessionStatus::Cancelled;
        }
    }

    Ok(session)
}
