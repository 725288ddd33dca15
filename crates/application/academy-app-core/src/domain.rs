use academy_core::FieldError;
use academy_persistence::DraftSummary;
use academy_wizard::{AbandonedResources, CompletionReport, StepReport, WizardSession, WizardStep};
use serde::{Deserialize, Serialize};

fn default_api_base_url() -> String {
    academy_config::DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    academy_config::DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_upload_concurrency() -> usize {
    academy_config::DEFAULT_UPLOAD_CONCURRENCY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_token: None,
            request_timeout_secs: default_timeout(),
            upload_concurrency: default_upload_concurrency(),
        }
    }
}

impl AppSettings {
    /// Bring user-entered values back into supported ranges.
    pub fn normalized(mut self) -> Self {
        self.api_base_url = self.api_base_url.trim().to_string();
        if self.api_base_url.is_empty() {
            self.api_base_url = default_api_base_url();
        }
        self.api_token = self
            .api_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_timeout();
        }
        self.upload_concurrency = academy_config::clamp_upload_concurrency(self.upload_concurrency);
        self
    }
}

pub type NotificationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message shown to the user until dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub level: NotificationLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardPhase {
    Closed,
    Editing,
    Submitting(WizardStep),
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: AppSettings,

    /// Copy of the orchestrator's session, refreshed after every change.
    pub wizard: Option<WizardSession>,
    pub phase: WizardPhase,
    /// Per-field problems of the last rejected submission.
    pub field_errors: Vec<FieldError>,
    pub last_step: Option<StepReport>,
    pub last_completion: Option<CompletionReport>,
    pub last_abandoned: Option<AbandonedResources>,

    pub drafts: Vec<DraftSummary>,

    pub notifications: Vec<Notification>,
    pub next_notification_id: NotificationId,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            settings: AppSettings::default(),
            wizard: None,
            phase: WizardPhase::Closed,
            field_errors: Vec::new(),
            last_step: None,
            last_completion: None,
            last_abandoned: None,
            drafts: Vec::new(),
            notifications: Vec::new(),
            next_notification_id: 1,
        }
    }
}

impl AppState {
    pub fn errors(&self) -> impl Iterator<Item = &Notification> {
        self.notifications
            .iter()
            .filter(|n| n.level == NotificationLevel::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Notification> {
        self.notifications
            .iter()
            .filter(|n| n.level == NotificationLevel::Warning)
    }
}
