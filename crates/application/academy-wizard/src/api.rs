use academy_core::{extract_id, CourseId, LessonId, ModuleId, QuizId};
use academy_infra::{ApiClient, ApiError, UploadRequest, UploadedFile, Uploader};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::requests::{CoursePayload, LessonPayload, ModulePayload, QuizPayload};

/// Backend operations the wizard relies on. Creation and update only; the
/// wizard never removes what it created.
#[async_trait::async_trait]
pub trait CourseApi: Send + Sync {
    /// Upload independent files; results are returned in request order.
    async fn upload_files(&self, files: Vec<UploadRequest>) -> Vec<Result<UploadedFile, ApiError>>;

    async fn create_course(&self, course: &CoursePayload) -> Result<CourseId, ApiError>;
    async fn update_course(&self, id: &CourseId, course: &CoursePayload) -> Result<(), ApiError>;

    /// Create several modules at once; ids come back in the same order. The
    /// list is returned as answered, even when its length differs from the
    /// request.
    async fn create_modules(
        &self,
        course_id: &CourseId,
        modules: &[ModulePayload],
    ) -> Result<Vec<ModuleId>, ApiError>;
    async fn update_module(&self, id: &ModuleId, module: &ModulePayload) -> Result<(), ApiError>;

    async fn create_lessons(
        &self,
        module_id: &ModuleId,
        lessons: &[LessonPayload],
    ) -> Result<Vec<LessonId>, ApiError>;
    async fn update_lesson(&self, id: &LessonId, lesson: &LessonPayload) -> Result<(), ApiError>;

    async fn create_quiz(&self, course_id: &CourseId, quiz: &QuizPayload) -> Result<QuizId, ApiError>;
    async fn update_quiz(&self, id: &QuizId, quiz: &QuizPayload) -> Result<(), ApiError>;
}

/// [`CourseApi`] over the REST backend.
pub struct HttpCourseApi {
    api: ApiClient,
    uploader: Uploader,
}

fn to_body<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(format!("cannot encode request: {e}")))
}

fn single_id(payload: Option<Value>, what: &str) -> Result<String, ApiError> {
    payload
        .as_ref()
        .and_then(extract_id)
        .ok_or_else(|| ApiError::MissingField(format!("{what}.id")))
}

/// Identifiers of a batch creation. Accepts a bare array or an object
/// holding the array under `key`. Reading stops at the first entry without
/// an id, so every returned id still matches its request position.
fn batch_ids(payload: Option<Value>, key: &str) -> Result<Vec<String>, ApiError> {
    let payload = payload.ok_or_else(|| ApiError::MissingField(key.to_string()))?;
    let items = match &payload {
        Value::Array(items) => items,
        Value::Object(map) => match map.get(key) {
            Some(Value::Array(items)) => items,
            _ => return Err(ApiError::MissingField(key.to_string())),
        },
        _ => return Err(ApiError::Decode(format!("expected a list of {key}"))),
    };

    Ok(items.iter().map_while(extract_id).collect())
}

impl HttpCourseApi {
    pub fn new(api: ApiClient, upload_concurrency: usize) -> Self {
        Self {
            uploader: Uploader::new(api.clone(), upload_concurrency),
            api,
        }
    }

    async fn send<T: Serialize + Sync>(
        &self,
        method: Method,
        segments: &[&str],
        body: &T,
    ) -> Result<Option<Value>, ApiError> {
        let body = to_body(body)?;
        self.api.fetch_api(method, segments, Some(&body)).await
    }
}

#[async_trait::async_trait]
impl CourseApi for HttpCourseApi {
    async fn upload_files(&self, files: Vec<UploadRequest>) -> Vec<Result<UploadedFile, ApiError>> {
        self.uploader.upload_batch(files).await
    }

    async fn create_course(&self, course: &CoursePayload) -> Result<CourseId, ApiError> {
        let payload = self.send(Method::POST, &["courses"], course).await?;
        single_id(payload, "course").map(CourseId::new)
    }

    async fn update_course(&self, id: &CourseId, course: &CoursePayload) -> Result<(), ApiError> {
        self.send(Method::PUT, &["courses", id.as_str()], course)
            .await
            .map(|_| ())
    }

    async fn create_modules(
        &self,
        course_id: &CourseId,
        modules: &[ModulePayload],
    ) -> Result<Vec<ModuleId>, ApiError> {
        let body = serde_json::json!({ "modules": to_body(&modules)? });
        let payload = self
            .send(Method::POST, &["courses", course_id.as_str(), "modules"], &body)
            .await?;
        Ok(batch_ids(payload, "modules")?
            .into_iter()
            .map(ModuleId::new)
            .collect())
    }

    async fn update_module(&self, id: &ModuleId, module: &ModulePayload) -> Result<(), ApiError> {
        self.send(Method::PUT, &["modules", id.as_str()], module)
            .await
            .map(|_| ())
    }

    async fn create_lessons(
        &self,
        module_id: &ModuleId,
        lessons: &[LessonPayload],
    ) -> Result<Vec<LessonId>, ApiError> {
        let body = serde_json::json!({ "lessons": to_body(&lessons)? });
        let payload = self
            .send(Method::POST, &["modules", module_id.as_str(), "lessons"], &body)
            .await?;
        Ok(batch_ids(payload, "lessons")?
            .into_iter()
            .map(LessonId::new)
            .collect())
    }

    async fn update_lesson(&self, id: &LessonId, lesson: &LessonPayload) -> Result<(), ApiError> {
        self.send(Method::PUT, &["lessons", id.as_str()], lesson)
            .await
            .map(|_| ())
    }

    async fn create_quiz(&self, course_id: &CourseId, quiz: &QuizPayload) -> Result<QuizId, ApiError> {
        let payload = self
            .send(Method::POST, &["courses", course_id.as_str(), "quiz"], quiz)
            .await?;
        single_id(payload, "quiz").map(QuizId::new)
    }

    async fn update_quiz(&self, id: &QuizId, quiz: &QuizPayload) -> Result<(), ApiError> {
        self.send(Method::PUT, &["quizzes", id.as_str()], quiz)
            .await
            .map(|_| ())
    }
}
