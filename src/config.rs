use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::accounts::{Account, Backend};
use crate::trending::{Country, TrendingCategory};
use crate::ui::Variant;

const DEFAULT_ENV_PREFIX: &str = "TREND_TUI";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_accounts")]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub active_account: String,
    #[serde(default)]
    pub trending: TrendingConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            accounts: default_accounts(),
            active_account: String::new(),
            trending: TrendingConfig::default(),
            ui: UIConfig::default(),
            media: MediaConfig::default(),
            player: PlayerConfig::default(),
        }
    }
}

fn default_accounts() -> Vec<Account> {
    vec![Account {
        name: "yewtu.be".into(),
        backend: Backend::Invidious,
        url: "https://yewtu.be".into(),
        token: None,
    }]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingConfig {
    #[serde(default)]
    pub country: Country,
    #[serde(default)]
    pub category: TrendingCategory,
    #[serde(default = "default_freshness", with = "humantime_serde")]
    pub freshness: Duration,
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            country: Country::default(),
            category: TrendingCategory::default(),
            freshness: default_freshness(),
        }
    }
}

fn default_freshness() -> Duration {
    Duration::from_secs(5 * 60)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub variant: Variant,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            variant: Variant::default(),
        }
    }
}

fn default_theme() -> String {
    "default".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaConfig {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: i64,
    #[serde(default = "default_media_ttl_duration", with = "humantime_serde")]
    pub default_ttl: Duration,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            max_size_bytes: default_max_size_bytes(),
            default_ttl: default_media_ttl_duration(),
            workers: default_workers(),
        }
    }
}

fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("trend-tui"))
}

fn default_max_size_bytes() -> i64 {
    100 * 1024 * 1024
}

fn default_media_ttl_duration() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_workers() -> usize {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    #[serde(default = "default_video_command")]
    pub video_command: Vec<String>,
    #[serde(default = "default_video_detach")]
    pub video_detach: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            video_command: default_video_command(),
            video_detach: default_video_detach(),
        }
    }
}

fn default_video_command() -> Vec<String> {
    vec!["mpv".into(), "--fs".into(), "%URL%".into()]
}

fn default_video_detach() -> bool {
    true
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let path = options.config_file.or_else(default_path);
    let mut cfg = match path.as_deref().filter(|path| path.exists()) {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    for (key, value) in env_overrides(prefix) {
        if let Err(err) = cfg.apply_override(&key, &value) {
            log::warn!("config: ignoring {key}: {err:#}");
        }
    }
    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("config: read {}", path.display()))?;
    serde_yaml::from_str(&data).with_context(|| format!("config: parse {}", path.display()))
}

fn env_overrides(prefix: &str) -> BTreeMap<String, String> {
    let head = format!("{}_", prefix.to_ascii_uppercase());
    env::vars()
        .filter_map(|(key, value)| {
            let rest = key.strip_prefix(&head)?;
            Some((rest.to_ascii_lowercase().replace("__", "."), value))
        })
        .collect()
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got {other:?}"),
    }
}

impl Config {
    fn apply_override(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = key.split_once('.').unwrap_or(("", key));
        match (section, field) {
            ("", "active_account") => self.active_account = value.to_string(),
            ("trending", "country") => self.trending.country = value.parse()?,
            ("trending", "category") => self.trending.category = value.parse()?,
            ("trending", "freshness") => {
                self.trending.freshness = humantime::parse_duration(value)?;
            }
            ("ui", "theme") => self.ui.theme = value.to_string(),
            ("ui", "variant") => self.ui.variant = value.parse()?,
            ("media", "cache_dir") => self.media.cache_dir = Some(PathBuf::from(value)),
            ("media", "max_size_bytes") => self.media.max_size_bytes = value.trim().parse()?,
            ("media", "default_ttl") => {
                self.media.default_ttl = humantime::parse_duration(value)?;
            }
            ("media", "workers") => self.media.workers = value.trim().parse()?,
            ("player", "video_command") => {
                self.player.video_command = value
                    .split(',')
                    .map(str::trim)
                    .filter(|arg| !arg.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            ("player", "video_detach") => self.player.video_detach = parse_flag(value)?,
            _ => log::debug!("config: unknown override {key}"),
        }
        Ok(())
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("trend-tui").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    fn isolated() -> LoadOptions {
        LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/trend-tui.yaml")),
            env_prefix: Some("TREND_TUI_TEST_NONE".into()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(isolated()).unwrap();
        assert_eq!(cfg.ui.theme, "default");
        assert_eq!(cfg.trending.country, Country::US);
        assert_eq!(cfg.trending.freshness, Duration::from_secs(300));
        assert_eq!(cfg.accounts[0].backend, Backend::Invidious);
    }

    #[test]
    fn reads_yaml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            r#"
accounts:
  - name: home
    backend: piped
    url: https://pipedapi.example
    token: abc
active_account: home
trending:
  country: DE
  category: gaming
  freshness: 90s
ui:
  variant: tv
"#,
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("TREND_TUI_TEST_NONE".into()),
        })
        .unwrap();
        assert_eq!(cfg.active_account, "home");
        assert_eq!(cfg.accounts[0].backend, Backend::Piped);
        assert!(cfg.accounts[0].signed_in());
        assert_eq!(cfg.trending.country, Country::DE);
        assert_eq!(cfg.trending.category, TrendingCategory::Gaming);
        assert_eq!(cfg.trending.freshness, Duration::from_secs(90));
        assert_eq!(cfg.ui.variant, Variant::Tv);
    }

    #[test]
    fn bad_overrides_are_rejected_individually() {
        let mut cfg = Config::default();
        assert!(cfg.apply_override("trending.country", "XX").is_err());
        assert!(cfg.apply_override("media.workers", "many").is_err());
        assert!(cfg.apply_override("player.video_detach", "maybe").is_err());
        assert_eq!(cfg, Config::default());

        cfg.apply_override("player.video_detach", "off").unwrap();
        cfg.apply_override("player.video_command", "vlc, --fullscreen ,%URL%").unwrap();
        cfg.apply_override("trending.freshness", "2m").unwrap();
        assert!(!cfg.player.video_detach);
        assert_eq!(cfg.player.video_command, ["vlc", "--fullscreen", "%URL%"]);
        assert_eq!(cfg.trending.freshness, Duration::from_secs(120));
    }

    #[test]
    fn environment_overrides_file_values() {
        env::set_var("TREND_TUI_ENVTEST_UI__VARIANT", "phone");
        env::set_var("TREND_TUI_ENVTEST_TRENDING__COUNTRY", "jp");
        let cfg = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/trend-tui.yaml")),
            env_prefix: Some("TREND_TUI_ENVTEST".into()),
        })
        .unwrap();
        assert_eq!(cfg.ui.variant, Variant::Phone);
        assert_eq!(cfg.trending.country, Country::JP);
        env::remove_var("TREND_TUI_ENVTEST_UI__VARIANT");
        env::remove_var("TREND_TUI_ENVTEST_TRENDING__COUNTRY");
    }
}
