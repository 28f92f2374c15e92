//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, path::PathBuf, sync::Arc};

use serde::Deserialize;

use super::types::Res;

/// Default root directory for the persistent member stores.
fn default_storage_dir() -> PathBuf {
    PathBuf::from(".storage")
}

/// Configuration for the mention-bot application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Telegram bot token (`MENTION_BOT_TELEGRAM_BOT_TOKEN`).
    pub telegram_bot_token: String,
    /// Root directory for the persistent member stores (`MENTION_BOT_STORAGE_DIR`).
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("MENTION_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        if result.telegram_bot_token.trim().is_empty() {
            return Err(anyhow::anyhow!("Telegram bot token must not be empty."));
        }

        Ok(result)
    }
}
