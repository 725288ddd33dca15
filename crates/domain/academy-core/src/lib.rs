use serde::{Deserialize, Serialize};

pub mod content;
pub mod envelope;
pub mod ordering;
pub mod validation;

pub use content::{classify_attachment, resolve_content_type, ContentCategory};
pub use envelope::{extract_id, extract_str, normalize_payload, ResponseBody};
pub use ordering::dense_orders;
pub use validation::{FieldError, ValidationErrors};

macro_rules! remote_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

remote_id!(CourseId);
remote_id!(ModuleId);
remote_id!(LessonId);
remote_id!(QuizId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// Declared kind of a lesson. For lessons carrying a file, the file's
/// category wins over whatever was selected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    Video,
    #[default]
    Document,
    Audio,
    Image,
    Text,
}

/// A local file that must be uploaded before the record owning it is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub path: camino::Utf8PathBuf,
    /// MIME type reported by the picker, if any. Falls back to the extension.
    #[serde(default)]
    pub mime: Option<String>,
}

impl Attachment {
    pub fn new(path: impl Into<camino::Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Key used to remember an upload across re-submissions.
    pub fn key(&self) -> String {
        self.path.as_str().to_string()
    }

    pub fn file_name(&self) -> &str {
        self.path.file_name().unwrap_or("upload.bin")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CourseDraft {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub level: Level,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub cover: Option<Attachment>,
}

fn default_language() -> String {
    "fr".to_string()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub lessons: Vec<LessonDraft>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LessonDraft {
    pub title: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    #[serde(default)]
    pub content_url: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizDraft {
    pub title: String,
    #[serde(default = "default_passing_score")]
    pub passing_score: u8,
    pub questions: Vec<QuizQuestion>,
}

fn default_passing_score() -> u8 {
    50
}

/// Everything the user has typed into the wizard so far.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoursePlan {
    pub course: CourseDraft,
    #[serde(default)]
    pub modules: Vec<ModuleDraft>,
    #[serde(default)]
    pub quiz: Option<QuizDraft>,
}

impl CoursePlan {
    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }
}
