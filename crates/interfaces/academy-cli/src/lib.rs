pub mod commands;
pub mod drafts;

use academy_app_core::AppSettings;

/// Connection flags given on the command line. They apply to one run and are
/// never written back to the settings file.
#[derive(Debug, Clone, Default)]
pub struct ApiOverrides {
    pub api_url: Option<String>,
    pub token: Option<String>,
}

impl ApiOverrides {
    pub fn apply(&self, mut settings: AppSettings) -> AppSettings {
        if let Some(url) = &self.api_url {
            settings.api_base_url = url.clone();
        }
        if let Some(token) = &self.token {
            settings.api_token = Some(token.clone());
        }
        settings.normalized()
    }
}

/// Changes requested by `settings set`.
#[derive(Debug, Clone, Default)]
pub struct SettingsChange {
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub clear_token: bool,
    pub timeout_secs: Option<u64>,
    pub uploads: Option<usize>,
}

impl SettingsChange {
    pub fn is_empty(&self) -> bool {
        self.api_url.is_none()
            && self.token.is_none()
            && !self.clear_token
            && self.timeout_secs.is_none()
            && self.uploads.is_none()
    }

    pub fn apply(&self, mut settings: AppSettings) -> AppSettings {
        if let Some(url) = &self.api_url {
            settings.api_base_url = url.clone();
        }
        if self.clear_token {
            settings.api_token = None;
        } else if let Some(token) = &self.token {
            settings.api_token = Some(token.clone());
        }
        if let Some(secs) = self.timeout_secs {
            settings.request_timeout_secs = secs;
        }
        if let Some(n) = self.uploads {
            settings.upload_concurrency = n;
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_connection_settings_only() {
        let saved = AppSettings {
            upload_concurrency: 6,
            ..AppSettings::default()
        };
        let overrides = ApiOverrides {
            api_url: Some(" https://school.test/api ".into()),
            token: Some("secret".into()),
        };
        let s = overrides.apply(saved);
        assert_eq!(s.api_base_url, "https://school.test/api");
        assert_eq!(s.api_token.as_deref(), Some("secret"));
        assert_eq!(s.upload_concurrency, 6);
    }

    #[test]
    fn clearing_the_token_wins_over_a_new_one() {
        let change = SettingsChange {
            token: Some("new".into()),
            clear_token: true,
            ..SettingsChange::default()
        };
        let saved = AppSettings {
            api_token: Some("old".into()),
            ..AppSettings::default()
        };
        assert_eq!(change.apply(saved).api_token, None);
        assert!(SettingsChange::default().is_empty());
    }
}
