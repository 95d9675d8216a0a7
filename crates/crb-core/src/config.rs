use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{errors::Error, Result};

/// Typed process configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Bot API token. Required.
    pub bot_token: String,

    /// Primary staff group. Staff commands and reply routing are disabled
    /// when absent.
    pub crm_group_id: Option<i64>,

    /// Secondary broadcast channel. Receives copies of forwarded messages,
    /// with no reply routing back.
    pub superchat_id: Option<i64>,

    /// Durable client registry document.
    pub clients_file: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        // A destination id of 0 means "not configured".
        let crm_group_id = env_i64("CRM_GROUP_ID").filter(|id| *id != 0);
        let superchat_id = env_i64("SUPERCHAT_ID").filter(|id| *id != 0);

        let clients_file =
            env_path("CLIENTS_FILE").unwrap_or_else(|| PathBuf::from("clients.json"));

        Ok(Self {
            bot_token,
            crm_group_id,
            superchat_id,
            clients_file,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_i64(key: &str) -> Option<i64> {
    env_str(key).and_then(|s| s.trim().parse::<i64>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}
