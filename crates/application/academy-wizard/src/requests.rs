//! Payload builders. Each turns the session's form data plus the identifiers
//! captured so far into the bodies sent for one step, without touching the
//! network.

use academy_core::{
    dense_orders, resolve_content_type, Attachment, ContentType, CourseId, LessonDraft, LessonId,
    ModuleId, QuizId,
};
use serde::Serialize;

use crate::error::WizardError;
use crate::session::{WizardSession, WizardStep};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePayload {
    pub title: String,
    pub description: String,
    pub category: String,
    pub level: academy_core::Level,
    pub language: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModulePayload {
    pub course_id: CourseId,
    pub title: String,
    pub description: String,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPayload {
    pub module_id: ModuleId,
    pub title: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPayload {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPayload {
    pub course_id: CourseId,
    pub title: String,
    pub passing_score: u8,
    pub questions: Vec<QuestionPayload>,
}

/// Whether a record is new or replaces one created by an earlier attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Write<Id, T> {
    Create(T),
    Update(Id, T),
}

impl<Id, T> Write<Id, T> {
    pub fn payload(&self) -> &T {
        match self {
            Write::Create(p) | Write::Update(_, p) => p,
        }
    }

    pub fn is_update(&self) -> bool {
        matches!(self, Write::Update(..))
    }
}

/// Writes for one step, split so creations can be sent as a single batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchWrites<Id, T> {
    pub updates: Vec<(usize, Id, T)>,
    /// First position the batch of creations starts at.
    pub first_new: usize,
    pub creates: Vec<T>,
}

impl<Id, T> BatchWrites<Id, T> {
    fn split(existing: &[Id], payloads: Vec<T>) -> Self
    where
        Id: Clone,
    {
        let mut updates = Vec::new();
        let mut creates = Vec::new();
        for (position, payload) in payloads.into_iter().enumerate() {
            match existing.get(position) {
                Some(id) => updates.push((position, id.clone(), payload)),
                None => creates.push(payload),
            }
        }
        Self {
            updates,
            first_new: existing.len(),
            creates,
        }
    }

    pub fn len(&self) -> usize {
        self.updates.len() + self.creates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lesson writes for one module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleLessons {
    pub module: usize,
    pub module_id: ModuleId,
    pub writes: BatchWrites<LessonId, LessonPayload>,
}

fn uploaded_url(session: &WizardSession, attachment: &Attachment) -> Result<String, WizardError> {
    session
        .results
        .uploads
        .get(&attachment.key())
        .map(|a| a.url.clone())
        .ok_or_else(|| WizardError::UnresolvedAttachment(attachment.key()))
}

fn require_course(session: &WizardSession, step: WizardStep) -> Result<CourseId, WizardError> {
    session
        .results
        .course_id
        .clone()
        .ok_or(WizardError::MissingPrerequisite {
            step,
            missing: "course",
        })
}

pub fn course_request(session: &WizardSession) -> Result<Write<CourseId, CoursePayload>, WizardError> {
    let course = &session.plan.course;
    let thumbnail_url = course
        .cover
        .as_ref()
        .map(|cover| uploaded_url(session, cover))
        .transpose()?;

    let payload = CoursePayload {
        title: course.title.trim().to_string(),
        description: course.description.trim().to_string(),
        category: course.category.trim().to_string(),
        level: course.level,
        language: course.language.trim().to_string(),
        price: course.price,
        thumbnail_url,
    };
    Ok(match &session.results.course_id {
        Some(id) => Write::Update(id.clone(), payload),
        None => Write::Create(payload),
    })
}

pub fn module_requests(
    session: &WizardSession,
) -> Result<BatchWrites<ModuleId, ModulePayload>, WizardError> {
    let course_id = require_course(session, WizardStep::Modules)?;
    let payloads = session
        .plan
        .modules
        .iter()
        .zip(dense_orders(session.plan.modules.len()))
        .map(|(m, order)| ModulePayload {
            course_id: course_id.clone(),
            title: m.title.trim().to_string(),
            description: m.description.trim().to_string(),
            order,
        })
        .collect();
    Ok(BatchWrites::split(&session.results.module_ids, payloads))
}

fn lesson_payload(
    session: &WizardSession,
    module_id: &ModuleId,
    lesson: &LessonDraft,
    order: u32,
) -> Result<LessonPayload, WizardError> {
    let content_type = resolve_content_type(lesson.content_type, lesson.attachment.as_ref());
    let content_url = match &lesson.attachment {
        Some(att) => Some(uploaded_url(session, att)?),
        None => lesson
            .content_url
            .as_ref()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty()),
    };
    let content = lesson
        .body
        .as_ref()
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty());

    Ok(LessonPayload {
        module_id: module_id.clone(),
        title: lesson.title.trim().to_string(),
        content_type,
        content_url,
        content,
        duration: lesson.duration_minutes,
        order,
    })
}

/// Lesson writes grouped per module. Modules without lessons are left out.
pub fn lesson_requests(session: &WizardSession) -> Result<Vec<ModuleLessons>, WizardError> {
    let mut out = Vec::new();
    for (m, module) in session.plan.modules.iter().enumerate() {
        if module.lessons.is_empty() {
            continue;
        }
        let module_id = session.results.module_ids.get(m).cloned().ok_or(
            WizardError::MissingPrerequisite {
                step: WizardStep::Lessons,
                missing: "module",
            },
        )?;

        let payloads = module
            .lessons
            .iter()
            .zip(dense_orders(module.lessons.len()))
            .map(|(lesson, order)| lesson_payload(session, &module_id, lesson, order))
            .collect::<Result<Vec<_>, _>>()?;

        out.push(ModuleLessons {
            module: m,
            writes: BatchWrites::split(session.results.lessons_of(m), payloads),
            module_id,
        });
    }
    Ok(out)
}

pub fn quiz_request(session: &WizardSession) -> Result<Write<QuizId, QuizPayload>, WizardError> {
    let course_id = require_course(session, WizardStep::Quiz)?;
    let quiz = session.plan.quiz.as_ref().ok_or(WizardError::MissingPrerequisite {
        step: WizardStep::Quiz,
        missing: "quiz form",
    })?;

    let payload = QuizPayload {
        course_id,
        title: quiz.title.trim().to_string(),
        passing_score: quiz.passing_score,
        questions: quiz
            .questions
            .iter()
            .map(|q| QuestionPayload {
                question: q.prompt.trim().to_string(),
                options: q.options.iter().map(|o| o.trim().to_string()).collect(),
                correct_answer: q.correct_index,
            })
            .collect(),
    };
    Ok(match &session.results.quiz_id {
        Some(id) => Write::Update(id.clone(), payload),
        None => Write::Create(payload),
    })
}

/// Attachments referenced by the lessons that have not been uploaded yet,
/// one entry per distinct file.
pub fn pending_lesson_attachments(session: &WizardSession) -> Vec<Attachment> {
    let mut seen = std::collections::BTreeSet::new();
    session
        .plan
        .modules
        .iter()
        .flat_map(|m| m.lessons.iter())
        .filter_map(|l| l.attachment.as_ref())
        .filter(|a| !session.results.uploads.contains_key(&a.key()))
        .filter(|a| seen.insert(a.key()))
        .cloned()
        .collect()
}
