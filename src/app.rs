use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::accounts::{self, Account, Backend};
use crate::browser::{Browser, BrowserOptions};
use crate::config;
use crate::data::{
    InvidiousTrendingService, MockTrendingService, PipedTrendingService, SelectionStore,
    StoredSelection, SubscriptionService, TrendingService,
};
use crate::favorites::Favorites;
use crate::invidious;
use crate::media;
use crate::piped;
use crate::resource::ResourceCache;
use crate::storage;
use crate::subscriptions::SubscribedChannels;
use crate::ui;
use crate::video::{self, Video};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    pub variant: Option<ui::Variant>,
    pub preset: Option<PathBuf>,
    pub demo: bool,
}

type Services = (Arc<dyn TrendingService>, Arc<dyn SubscriptionService>);

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    let config_path = opts.config_file.clone().or_else(config::default_path);
    let display_path = friendly_path(config_path.as_ref());
    let variant = opts.variant.unwrap_or(cfg.ui.variant);

    let store =
        Arc::new(storage::Store::open(storage::Options::default()).context("open storage")?);

    let accounts = Arc::new(
        accounts::Manager::new(cfg.accounts.clone(), &cfg.active_account)
            .context("load accounts")?,
    );
    let account = accounts.active().clone();
    log::info!(
        "app: account {} ({} at {}), variant {variant}",
        account.name,
        account.backend.display_name(),
        account.url
    );

    let (trending, subscription_service) = if opts.demo {
        let mock = Arc::new(MockTrendingService);
        (mock.clone() as Arc<dyn TrendingService>, mock as Arc<dyn SubscriptionService>)
    } else {
        services_for(&account)?
    };

    let preset = match opts.preset.as_deref() {
        Some(path) => load_preset(path)?,
        None if opts.demo => video::fixtures(),
        None => Vec::new(),
    };

    let subscriptions = Arc::new(SubscribedChannels::new(Some(store.clone())));
    if let Err(err) = subscriptions.load_cached(&account) {
        log::warn!("app: cached subscriptions unavailable: {err:#}");
    }
    if account.signed_in() && account.backend.capabilities().supports_subscriptions {
        subscriptions.refresh_in_background(subscription_service, account.clone());
    }

    let media = match media::Options::from_config(&cfg.media)
        .and_then(|media_opts| media::Loader::new(store.clone(), media_opts))
    {
        Ok(loader) => Some(loader),
        Err(err) => {
            log::warn!("app: thumbnails disabled: {err:#}");
            None
        }
    };

    let mut cache = ResourceCache::new(trending, cfg.trending.freshness);
    let selection: Arc<dyn SelectionStore> = Arc::new(StoredSelection::new(store.clone()));
    let browser = Browser::new(
        &mut cache,
        selection,
        BrowserOptions {
            preset,
            default_country: cfg.trending.country,
            default_category: cfg.trending.category,
            capabilities: accounts.state().app,
        },
    );

    let status_message = if browser.uses_preset() {
        format!(
            "Showing {} videos from a fixed list. Config: {display_path}",
            if opts.demo { "demo" } else { "preset" }
        )
    } else {
        format!(
            "Loading trending from {} ({}). Config: {display_path}",
            account.name,
            account.backend.display_name()
        )
    };

    let mut model = ui::Model::new(ui::Options {
        variant,
        theme: cfg.ui.theme.clone(),
        browser,
        cache,
        accounts,
        subscriptions,
        thumbnails: Some(store.clone()),
        favorites: Favorites::new(store.clone()),
        media,
        player: cfg.player.clone(),
        status_message,
    });
    model.run()?;
    drop(model);

    Ok(())
}

fn services_for(account: &Account) -> Result<Services> {
    let user_agent = format!("trend-tui/{}", crate::VERSION);
    match account.backend {
        Backend::Invidious => {
            let client = invidious::Client::new(invidious::ClientConfig {
                base_url: account.url.clone(),
                user_agent,
                http_client: None,
            })
            .with_context(|| format!("create Invidious client for {}", account.url))?;
            let service = Arc::new(InvidiousTrendingService::new(Arc::new(client)));
            Ok((
                service.clone() as Arc<dyn TrendingService>,
                service as Arc<dyn SubscriptionService>,
            ))
        }
        Backend::Piped => {
            let client = piped::Client::new(piped::ClientConfig {
                base_url: account.url.clone(),
                user_agent,
                http_client: None,
            })
            .with_context(|| format!("create Piped client for {}", account.url))?;
            let service = Arc::new(PipedTrendingService::new(Arc::new(client)));
            Ok((
                service.clone() as Arc<dyn TrendingService>,
                service as Arc<dyn SubscriptionService>,
            ))
        }
    }
}

pub fn load_preset(path: &Path) -> Result<Vec<Video>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read preset list {}", path.display()))?;
    let videos: Vec<Video> = serde_json::from_str(&data)
        .with_context(|| format!("parse preset list {}", path.display()))?;
    log::info!("app: {} preset videos from {}", videos.len(), path.display());
    Ok(videos)
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/trend-tui/config.yaml".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_file_round_trips_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preset.json");
        fs::write(&path, serde_json::to_string(&video::fixtures()).unwrap()).unwrap();
        let videos = load_preset(&path).unwrap();
        assert_eq!(videos, video::fixtures());
    }

    #[test]
    fn preset_accepts_minimal_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preset.json");
        fs::write(&path, r#"[{"id": "abc", "title": "Only the basics"}]"#).unwrap();
        let videos = load_preset(&path).unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].title, "Only the basics");
        assert!(!videos[0].is_local());
    }

    #[test]
    fn bad_preset_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_preset(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }

    #[test]
    fn friendly_path_falls_back_to_default() {
        assert_eq!(friendly_path(None), "~/.config/trend-tui/config.yaml");
    }
}
