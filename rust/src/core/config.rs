use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::AppCore;
use crate::injection::{RemotePageContract, ScriptCatalog};
use crate::state::ExitPrompt;

const CONFIG_FILE_NAME: &str = "hasat_config.json";
const DEFAULT_SPLASH_MEDIA: &str = "splashscreen.mp4";
const DEFAULT_OFFLINE_MESSAGE: &str = "İnternet bağlantınız yok.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct AppConfig {
    pub(super) start_url: Option<String>,
    pub(super) splash_media: Option<String>,
    // Whether a splash that fails to play should still lead to content.
    pub(super) advance_on_playback_error: Option<bool>,
    pub(super) offline_message: Option<String>,
    pub(super) exit_prompt: Option<ExitPromptConfig>,
    pub(super) remote_page: Option<RemotePageContract>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct ExitPromptConfig {
    pub(super) title: String,
    pub(super) message: String,
    pub(super) cancel_label: String,
    pub(super) confirm_label: String,
}

impl Default for ExitPromptConfig {
    fn default() -> Self {
        Self {
            title: "Uygulamadan Çıkış".into(),
            message: "Uygulamadan çıkmak istediğinize emin misiniz?".into(),
            cancel_label: "İptal".into(),
            confirm_label: "Evet".into(),
        }
    }
}

fn config_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join(CONFIG_FILE_NAME)
}

fn read_app_config(path: &Path) -> anyhow::Result<AppConfig> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice::<AppConfig>(&bytes).with_context(|| format!("parse {}", path.display()))
}

pub(super) fn load_app_config(data_dir: &str) -> AppConfig {
    let path = config_path(data_dir);
    if !path.exists() {
        return AppConfig::default();
    }
    match read_app_config(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("ignoring config, using defaults: {e:#}");
            AppConfig::default()
        }
    }
}

pub(crate) fn default_app_config_json() -> String {
    let config = AppConfig {
        start_url: Some(RemotePageContract::default().home_url),
        splash_media: Some(DEFAULT_SPLASH_MEDIA.into()),
        advance_on_playback_error: Some(true),
        offline_message: Some(DEFAULT_OFFLINE_MESSAGE.into()),
        exit_prompt: Some(ExitPromptConfig::default()),
        remote_page: Some(RemotePageContract::default()),
    };
    serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".into())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

impl AppCore {
    /// Config wins over the page contract's home URL; `HASAT_START_URL` wins over both.
    pub(super) fn start_url(&self) -> String {
        if let Some(url) = non_empty(&std::env::var("HASAT_START_URL").ok()) {
            return url;
        }
        non_empty(&self.config.start_url).unwrap_or_else(|| self.contract.home_url.clone())
    }

    pub(super) fn splash_media(&self) -> String {
        non_empty(&self.config.splash_media).unwrap_or_else(|| DEFAULT_SPLASH_MEDIA.into())
    }

    pub(super) fn advance_on_playback_error(&self) -> bool {
        self.config.advance_on_playback_error.unwrap_or(true)
    }

    pub(super) fn offline_message(&self) -> String {
        non_empty(&self.config.offline_message).unwrap_or_else(|| DEFAULT_OFFLINE_MESSAGE.into())
    }

    pub(super) fn exit_prompt(&self) -> ExitPrompt {
        let c = self.config.exit_prompt.clone().unwrap_or_default();
        ExitPrompt {
            title: c.title,
            message: c.message,
            cancel_label: c.cancel_label,
            confirm_label: c.confirm_label,
        }
    }
}

/// The configured contract and its scripts, or the built-in ones if the override does
/// not compile. `None` scripts leave the nav buttons inert.
pub(super) fn resolve_scripts(config: &AppConfig) -> (RemotePageContract, Option<ScriptCatalog>) {
    if let Some(contract) = config.remote_page.clone() {
        match ScriptCatalog::compile(&contract) {
            Ok(scripts) => return (contract, Some(scripts)),
            Err(e) => tracing::warn!(%e, "invalid remote_page config, using defaults"),
        }
    }
    let contract = RemotePageContract::default();
    match ScriptCatalog::compile(&contract) {
        Ok(scripts) => (contract, Some(scripts)),
        Err(e) => {
            tracing::error!(%e, "built-in page contract does not compile");
            (contract, None)
        }
    }
}
