use crate::{Attachment, ContentType};

/// Storage category of an uploaded file. Decides both the upload folder and
/// the content type of the record that owns the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCategory {
    Video,
    Audio,
    Image,
    Document,
}

impl ContentCategory {
    pub fn folder(self) -> &'static str {
        match self {
            ContentCategory::Video => "videos",
            ContentCategory::Audio => "audio",
            ContentCategory::Image => "images",
            ContentCategory::Document => "documents",
        }
    }

    pub fn content_type(self) -> ContentType {
        match self {
            ContentCategory::Video => ContentType::Video,
            ContentCategory::Audio => ContentType::Audio,
            ContentCategory::Image => ContentType::Image,
            ContentCategory::Document => ContentType::Document,
        }
    }
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "webm", "mkv", "avi", "mpeg", "mpg"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "aac", "flac"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp"];

fn from_mime(mime: &str) -> Option<ContentCategory> {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let (top, _) = essence.split_once('/')?;
    match top {
        "video" => Some(ContentCategory::Video),
        "audio" => Some(ContentCategory::Audio),
        "image" => Some(ContentCategory::Image),
        "application" | "text" => Some(ContentCategory::Document),
        _ => None,
    }
}

fn from_extension(ext: &str) -> ContentCategory {
    let ext = ext.to_ascii_lowercase();
    if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        ContentCategory::Video
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        ContentCategory::Audio
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        ContentCategory::Image
    } else {
        ContentCategory::Document
    }
}

/// Classify a file by its MIME type, falling back to the extension when the
/// MIME type is missing or not informative (`application/octet-stream`).
pub fn classify_attachment(attachment: &Attachment) -> ContentCategory {
    let by_mime = attachment
        .mime
        .as_deref()
        .filter(|m| !m.eq_ignore_ascii_case("application/octet-stream"))
        .and_then(from_mime);

    by_mime.unwrap_or_else(|| from_extension(attachment.path.extension().unwrap_or_default()))
}

/// The file signature is authoritative; the declared type only matters for
/// lessons without a file.
pub fn resolve_content_type(declared: ContentType, attachment: Option<&Attachment>) -> ContentType {
    match attachment {
        Some(a) => classify_attachment(a).content_type(),
        None => declared,
    }
}

/// Best-effort MIME type for the upload part.
pub fn mime_for(attachment: &Attachment) -> String {
    if let Some(m) = &attachment.mime {
        return m.clone();
    }
    let ext = attachment
        .path
        .extension()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mime = match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mpeg" | "mpg" => "video/mpeg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" | "aac" => "audio/aac",
        "flac" => "audio/flac",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        _ => "application/octet-stream",
    };
    mime.to_string()
}
