use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use askmom_api::SharedCredential;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::deep_link::Platform;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_THINKING_PHRASE: &str = "One sec, I’m looking into it";
pub const SETTINGS_DIRECTORY_NAME: &str = "askmom";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "ASKMOM_";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_THINKING_CADENCE_MS: u64 = 240;
const MIN_THINKING_CADENCE_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_thinking_cadence_ms")]
    pub thinking_cadence_ms: u64,
    #[serde(default = "default_thinking_phrases")]
    pub thinking_phrases: Vec<String>,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            thinking_cadence_ms: default_thinking_cadence_ms(),
            thinking_phrases: default_thinking_phrases(),
            platform: Platform::default(),
            auth_token: None,
        }
    }
}

impl SessionSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn thinking_cadence(&self) -> Duration {
        Duration::from_millis(self.thinking_cadence_ms)
    }

    pub fn normalized(mut self) -> Self {
        self.api_base_url = if self.api_base_url.trim().is_empty() {
            default_api_base_url()
        } else {
            self.api_base_url.trim().trim_end_matches('/').to_string()
        };
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout_secs();
        }
        self.thinking_cadence_ms = self.thinking_cadence_ms.max(MIN_THINKING_CADENCE_MS);

        self.thinking_phrases = self
            .thinking_phrases
            .into_iter()
            .map(|phrase| phrase.trim().to_string())
            .filter(|phrase| !phrase.is_empty())
            .collect();
        if self.thinking_phrases.is_empty() {
            self.thinking_phrases = default_thinking_phrases();
        }

        self.auth_token = self
            .auth_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        self
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<SessionSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".askmom"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<SessionSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: SessionSettings) -> Result<(), SettingsError> {
        let settings = settings.normalized();
        write_settings_file(&self.config_path, &settings)?;
        self.settings.store(Arc::new(settings));
        Ok(())
    }

    /// Saves the sign-in token and swaps it into the live credential.
    ///
    /// A blank or missing token signs out. Returns whether a token is now held.
    pub fn save_auth_token(
        &self,
        token: Option<&str>,
        credential: &SharedCredential,
    ) -> Result<bool, SettingsError> {
        self.update(SessionSettings {
            auth_token: token.map(str::to_string),
            ..self.settings().as_ref().clone()
        })?;

        match self.settings().auth_token.clone() {
            Some(token) => {
                credential.set(Some(token));
                tracing::info!("auth token updated");
                Ok(true)
            }
            None => {
                credential.clear();
                tracing::info!("auth token cleared");
                Ok(false)
            }
        }
    }

    fn load_from_disk(path: &Path) -> SessionSettings {
        let mut figment = Figment::from(Serialized::defaults(SessionSettings::default()));
        if path.exists() {
            figment = figment.merge(Json::file(path));
        } else {
            tracing::info!(path = %path.display(), "settings file not found, using defaults");
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        match figment.extract::<SessionSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "failed to parse settings, using defaults"
                );
                SessionSettings::default()
            }
        }
    }
}

/// Writes a sibling `.json.partial` file, then renames it over `path`.
fn write_settings_file(path: &Path, settings: &SessionSettings) -> Result<(), SettingsError> {
    if let Some(directory) = path.parent() {
        std::fs::create_dir_all(directory).context(CreateSettingsDirSnafu {
            stage: "create-settings-dir",
            path: directory.to_path_buf(),
        })?;
    }

    let encoded = serde_json::to_vec_pretty(settings).context(EncodeSettingsSnafu {
        stage: "encode-settings",
    })?;
    let staging_path = path.with_extension("json.partial");
    std::fs::write(&staging_path, encoded).context(WriteSettingsSnafu {
        stage: "write-settings",
        path: staging_path.clone(),
    })?;
    std::fs::rename(&staging_path, path).context(ReplaceSettingsSnafu {
        stage: "replace-settings",
        path: path.to_path_buf(),
    })?;

    tracing::debug!(path = %path.display(), "settings saved");
    Ok(())
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("cannot create settings directory {path:?} on `{stage}`: {source}"))]
    CreateSettingsDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot encode settings on `{stage}`: {source}"))]
    EncodeSettings {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("cannot write settings to {path:?} on `{stage}`: {source}"))]
    WriteSettings {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot replace settings file {path:?} on `{stage}`: {source}"))]
    ReplaceSettings {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_thinking_cadence_ms() -> u64 {
    DEFAULT_THINKING_CADENCE_MS
}

fn default_thinking_phrases() -> Vec<String> {
    vec![DEFAULT_THINKING_PHRASE.to_string()]
}

#[cfg(test)]
mod tests {
    use askmom_api::CredentialSource;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));

        let settings = store.settings();
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.thinking_cadence(), Duration::from_millis(240));
        assert_eq!(settings.thinking_phrases, vec![DEFAULT_THINKING_PHRASE]);
        assert_eq!(settings.platform, Platform::Android);
    }

    #[test]
    fn partial_file_merges_over_defaults_and_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{
                "api_base_url": " https://api.example.com/ ",
                "thinking_cadence_ms": 5,
                "thinking_phrases": ["  ", "Hang on"],
                "platform": "ios",
                "auth_token": "   "
            }"#,
        )
        .unwrap();

        let settings = SettingsStore::new(path).settings();

        assert_eq!(settings.api_base_url, "https://api.example.com");
        assert_eq!(settings.thinking_cadence_ms, 50);
        assert_eq!(settings.thinking_phrases, vec!["Hang on"]);
        assert_eq!(settings.platform, Platform::Ios);
        assert_eq!(settings.auth_token, None);
        assert_eq!(settings.request_timeout_secs, 30);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert_eq!(*SettingsStore::new(path).settings(), SessionSettings::default());
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let store = SettingsStore::new(path.clone());

        store
            .update(SessionSettings {
                auth_token: Some(" token-1 ".to_string()),
                ..SessionSettings::default()
            })
            .unwrap();

        assert_eq!(store.settings().auth_token.as_deref(), Some("token-1"));
        assert!(!path.with_extension("json.partial").exists());
        assert_eq!(
            SettingsStore::new(path).settings().auth_token.as_deref(),
            Some("token-1")
        );
    }

    #[test]
    fn saving_auth_token_persists_and_swaps_live_credential() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone());
        let credential = SharedCredential::new(None);

        assert!(store.save_auth_token(Some(" tok-9 "), &credential).unwrap());
        assert_eq!(credential.bearer_token().as_deref(), Some("tok-9"));
        assert_eq!(
            SettingsStore::new(path.clone()).settings().auth_token.as_deref(),
            Some("tok-9")
        );

        assert!(!store.save_auth_token(Some("   "), &credential).unwrap());
        assert_eq!(credential.bearer_token(), None);
        assert_eq!(SettingsStore::new(path).settings().auth_token, None);
    }
}
