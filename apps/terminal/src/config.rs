use std::{fs, io::ErrorKind, path::Path};

use anyhow::Context;
use game_core::{EngineConfig, TimingOverrides};
use serde::Deserialize;
use shared::domain::TiePolicy;
use storage::{
    normalize_database_url, BackendKind, DEFAULT_DATABASE_URL, DEFAULT_PREFERENCES_PATH,
};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "simon.toml";

#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: BackendKind,
    pub database_url: String,
    pub preferences_path: String,
    pub player_name: Option<String>,
    pub seed: Option<u64>,
    pub tie_policy: TiePolicy,
    pub history_limit: Option<usize>,
    pub timing: TimingOverrides,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            database_url: DEFAULT_DATABASE_URL.into(),
            preferences_path: DEFAULT_PREFERENCES_PATH.into(),
            player_name: None,
            seed: None,
            tie_policy: TiePolicy::StrictlyGreater,
            history_limit: None,
            timing: TimingOverrides::default(),
        }
    }
}

impl Settings {
    /// Where the selected backend keeps its records.
    pub fn store_location(&self) -> String {
        match self.backend {
            BackendKind::Sqlite => normalize_database_url(&self.database_url),
            BackendKind::Preferences => self.preferences_path.clone(),
            BackendKind::Memory => String::new(),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            timing: self.timing.apply(Default::default()),
            seed: self.seed,
            player_name: self.player_name.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    backend: Option<BackendKind>,
    database_url: Option<String>,
    preferences_path: Option<String>,
    player_name: Option<String>,
    seed: Option<u64>,
    tie_policy: Option<TiePolicy>,
    history_limit: Option<usize>,
    timing: TimingOverrides,
}

/// Defaults, then `path` if it exists, then environment overrides.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => {
            return Err(error).with_context(|| format!("failed to read '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file_cfg.backend {
        settings.backend = v;
    }
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.preferences_path {
        settings.preferences_path = v;
    }
    if file_cfg.player_name.is_some() {
        settings.player_name = file_cfg.player_name;
    }
    if file_cfg.seed.is_some() {
        settings.seed = file_cfg.seed;
    }
    if let Some(v) = file_cfg.tie_policy {
        settings.tie_policy = v;
    }
    if file_cfg.history_limit.is_some() {
        settings.history_limit = file_cfg.history_limit;
    }
    settings.timing = file_cfg.timing;

    Ok(())
}

/// Unparsable values are logged and leave the setting unchanged.
pub(crate) fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SIMON_BACKEND") {
        match v.parse() {
            Ok(kind) => settings.backend = kind,
            Err(error) => warn!(%error, "config: ignoring SIMON_BACKEND"),
        }
    }

    // SIMON_DATABASE_URL wins over the generic APP__DATABASE_URL.
    if let Some(v) = var("SIMON_DATABASE_URL").or_else(|| var("APP__DATABASE_URL")) {
        settings.database_url = v;
    }

    if let Some(v) = var("SIMON_PREFERENCES_PATH") {
        settings.preferences_path = v;
    }

    if let Some(v) = var("SIMON_PLAYER") {
        let v = v.trim();
        settings.player_name = (!v.is_empty()).then(|| v.to_string());
    }

    if let Some(v) = var("SIMON_SEED") {
        match v.parse::<u64>() {
            Ok(seed) => settings.seed = Some(seed),
            Err(error) => warn!(%error, value = %v, "config: ignoring SIMON_SEED"),
        }
    }

    if let Some(v) = var("SIMON_TIE_POLICY") {
        match v.parse() {
            Ok(policy) => settings.tie_policy = policy,
            Err(error) => warn!(%error, "config: ignoring SIMON_TIE_POLICY"),
        }
    }

    if let Some(v) = var("SIMON_HISTORY_LIMIT") {
        match v.parse::<usize>() {
            Ok(limit) => settings.history_limit = (limit > 0).then_some(limit),
            Err(error) => warn!(%error, value = %v, "config: ignoring SIMON_HISTORY_LIMIT"),
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
