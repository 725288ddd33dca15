use crate::content::{classify_attachment, ContentCategory};
use crate::{ContentType, CourseDraft, LessonDraft, ModuleDraft, QuizDraft};

pub const MIN_TITLE_LEN: usize = 3;

/// One rejected field. `field` is a dotted path such as `modules[1].title`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, thiserror::Error)]
#[error("{} invalid field(s): {}", .errors.len(), summarize(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn for_field(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn check_title(errs: &mut ValidationErrors, field: String, title: &str) {
    if title.trim().is_empty() {
        errs.push(field, "is required");
    } else if title.trim().chars().count() < MIN_TITLE_LEN {
        errs.push(field, format!("must be at least {MIN_TITLE_LEN} characters"));
    }
}

fn is_http_url(s: &str) -> bool {
    let s = s.trim();
    s.starts_with("http://") || s.starts_with("https://")
}

pub fn validate_course(course: &CourseDraft) -> Result<(), ValidationErrors> {
    let mut errs = ValidationErrors::default();
    check_title(&mut errs, "course.title".into(), &course.title);
    if course.description.trim().is_empty() {
        errs.push("course.description", "is required");
    }
    if course.language.trim().is_empty() {
        errs.push("course.language", "is required");
    }
    if !course.price.is_finite() || course.price < 0.0 {
        errs.push("course.price", "must be zero or a positive amount");
    }
    if let Some(cover) = &course.cover {
        if classify_attachment(cover) != ContentCategory::Image {
            errs.push("course.cover", "must be an image");
        }
    }
    errs.into_result()
}

pub fn validate_modules(modules: &[ModuleDraft]) -> Result<(), ValidationErrors> {
    let mut errs = ValidationErrors::default();
    if modules.is_empty() {
        errs.push("modules", "at least one module is required");
    }
    for (i, m) in modules.iter().enumerate() {
        check_title(&mut errs, format!("modules[{i}].title"), &m.title);
    }
    errs.into_result()
}

fn check_lesson(errs: &mut ValidationErrors, prefix: &str, lesson: &LessonDraft) {
    check_title(errs, format!("{prefix}.title"), &lesson.title);

    if let Some(att) = &lesson.attachment {
        if att.path.as_str().trim().is_empty() {
            errs.push(format!("{prefix}.attachment"), "file path is empty");
        }
        return;
    }

    match lesson.content_type {
        ContentType::Text => {
            if lesson.body.as_deref().map_or(true, |b| b.trim().is_empty()) {
                errs.push(format!("{prefix}.body"), "text lessons need a body");
            }
        }
        _ => match lesson.content_url.as_deref() {
            Some(url) if is_http_url(url) => {}
            Some(_) => errs.push(format!("{prefix}.content_url"), "must be an http(s) URL"),
            None => errs.push(
                format!("{prefix}.attachment"),
                "a file or a content URL is required",
            ),
        },
    }
}

/// Lessons are grouped by module position.
pub fn validate_lessons(lessons: &[Vec<LessonDraft>]) -> Result<(), ValidationErrors> {
    let mut errs = ValidationErrors::default();
    for (mi, group) in lessons.iter().enumerate() {
        for (li, lesson) in group.iter().enumerate() {
            check_lesson(&mut errs, &format!("modules[{mi}].lessons[{li}]"), lesson);
        }
    }
    errs.into_result()
}

pub fn validate_quiz(quiz: &QuizDraft) -> Result<(), ValidationErrors> {
    let mut errs = ValidationErrors::default();
    check_title(&mut errs, "quiz.title".into(), &quiz.title);
    if quiz.passing_score > 100 {
        errs.push("quiz.passing_score", "must be between 0 and 100");
    }
    if quiz.questions.is_empty() {
        errs.push("quiz.questions", "at least one question is required");
    }
    for (qi, q) in quiz.questions.iter().enumerate() {
        if q.prompt.trim().is_empty() {
            errs.push(format!("quiz.questions[{qi}].prompt"), "is required");
        }
        if q.options.len() < 2 {
            errs.push(
                format!("quiz.questions[{qi}].options"),
                "at least two options are required",
            );
        }
        if q.options.iter().any(|o| o.trim().is_empty()) {
            errs.push(format!("quiz.questions[{qi}].options"), "options cannot be empty");
        }
        if q.correct_index >= q.options.len() {
            errs.push(
                format!("quiz.questions[{qi}].correct_index"),
                "does not point at an option",
            );
        }
    }
    errs.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attachment, QuizQuestion};

    fn course() -> CourseDraft {
        CourseDraft {
            title: "Rust basics".into(),
            description: "Ownership and borrowing".into(),
            language: "fr".into(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_course_passes() {
        assert!(validate_course(&course()).is_ok());
    }

    #[test]
    fn course_reports_every_bad_field() {
        let mut c = course();
        c.title = "  ".into();
        c.description = String::new();
        c.price = -1.0;
        c.cover = Some(Attachment::new("intro.mp4"));
        let errs = validate_course(&c).unwrap_err();
        for field in ["course.title", "course.description", "course.price", "course.cover"] {
            assert!(errs.for_field(field).is_some(), "missing error for {field}");
        }
    }

    #[test]
    fn modules_need_at_least_one_entry_and_titles() {
        assert!(validate_modules(&[]).is_err());
        let errs = validate_modules(&[
            ModuleDraft {
                title: "Intro".into(),
                ..Default::default()
            },
            ModuleDraft::default(),
        ])
        .unwrap_err();
        assert_eq!(errs.errors.len(), 1);
        assert_eq!(errs.errors[0].field, "modules[1].title");
    }

    #[test]
    fn lessons_need_a_source() {
        let ok_file = LessonDraft {
            title: "Clip".into(),
            attachment: Some(Attachment::new("clip.mp4")),
            ..Default::default()
        };
        let ok_text = LessonDraft {
            title: "Reading".into(),
            content_type: ContentType::Text,
            body: Some("Read this".into()),
            ..Default::default()
        };
        let bad_url = LessonDraft {
            title: "Link".into(),
            content_type: ContentType::Video,
            content_url: Some("ftp://nope".into()),
            ..Default::default()
        };
        let empty = LessonDraft {
            title: "Nothing".into(),
            ..Default::default()
        };

        assert!(validate_lessons(&[vec![ok_file, ok_text]]).is_ok());
        let errs = validate_lessons(&[vec![], vec![bad_url, empty]]).unwrap_err();
        assert!(errs.for_field("modules[1].lessons[0].content_url").is_some());
        assert!(errs.for_field("modules[1].lessons[1].attachment").is_some());
    }

    #[test]
    fn quiz_answers_must_point_at_options() {
        let quiz = QuizDraft {
            title: "Check".into(),
            passing_score: 120,
            questions: vec![QuizQuestion {
                prompt: "2+2?".into(),
                options: vec!["4".into()],
                correct_index: 3,
            }],
        };
        let errs = validate_quiz(&quiz).unwrap_err();
        assert!(errs.for_field("quiz.passing_score").is_some());
        assert!(errs.for_field("quiz.questions[0].options").is_some());
        assert!(errs.for_field("quiz.questions[0].correct_index").is_some());
    }

    #[test]
    fn display_lists_fields() {
        let errs = validate_modules(&[]).unwrap_err();
        assert_eq!(
            errs.to_string(),
            "1 invalid field(s): modules at least one module is required"
        );
    }
}
