use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::model::DEFAULT_PER_PAGE;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "NoteHub";
const APP_NAME: &str = "notehub";

pub const DEFAULT_BASE_URL: &str = "https://notehub-public.goit.study/api";

pub const ENV_CONFIG: &str = "NOTEHUB_CONFIG";
pub const ENV_TOKEN: &str = "NOTEHUB_TOKEN";
pub const ENV_BASE_URL: &str = "NOTEHUB_BASE_URL";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let default_cfg = AppConfig::default();
            self.write_default_config(&default_cfg)?;
            let mut cfg = default_cfg;
            cfg.post_load()?;
            return Ok(cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load()?;
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub log_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(ENV_CONFIG).ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let log_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| project_dirs.data_dir().join("state"))
            .join("logs");

        Ok(Self {
            config_dir,
            config_file,
            log_dir,
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.log_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("notehub.log")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub search: SearchOptions,
    pub list: ListOptions,
    pub cache: CacheOptions,
    pub ui: UiOptions,
}

impl AppConfig {
    fn post_load(&mut self) -> Result<()> {
        if let Ok(token) = env::var(ENV_TOKEN) {
            if !token.trim().is_empty() {
                self.api.token = Some(token.trim().to_owned());
            }
        }
        if let Ok(base_url) = env::var(ENV_BASE_URL) {
            if !base_url.trim().is_empty() {
                self.api.base_url = base_url.trim().to_owned();
            }
        }
        if self.list.per_page == 0 {
            tracing::warn!("per_page of 0 in config, falling back to {DEFAULT_PER_PAGE}");
            self.list.per_page = DEFAULT_PER_PAGE;
        }
        if self.ui.tick_ms == 0 {
            self.ui.tick_ms = UiOptions::default().tick_ms;
        }
        Ok(())
    }

    /// The bearer token is required for every call; there is no login flow.
    pub fn require_token(&self) -> Result<&str> {
        match self.api.token.as_deref() {
            Some(token) if !token.is_empty() => Ok(token),
            _ => bail!("no API token configured; set {ENV_TOKEN} or api.token in the config file"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout_secs: 15,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub debounce_ms: u64,
    pub reset_page_on_change: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            reset_page_on_change: true,
        }
    }
}

impl SearchOptions {
    pub fn debounce_duration(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListOptions {
    pub per_page: u32,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Settled results older than this are refetched when their key comes back.
    pub max_age_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_age_secs: 60,
            max_entries: 64,
        }
    }
}

impl CacheOptions {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiOptions {
    pub tick_ms: u64,
    /// Disabling the overlay layer leaves the create form unreachable.
    pub modal_enabled: bool,
    pub modal_width: u16,
    pub modal_height: u16,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            modal_enabled: true,
            modal_width: 60,
            modal_height: 70,
        }
    }
}

impl UiOptions {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
