use std::sync::Arc;

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;

use crate::accounts::Account;
use crate::invidious;
use crate::piped;
use crate::storage::Store;
use crate::trending::{Country, TrendingCategory};
use crate::video::{self, Channel, Video};

const COUNTRY_KEY: &str = "trending.country";
const CATEGORY_KEY: &str = "trending.category";

pub trait TrendingService: Send + Sync {
    fn trending(&self, country: Country, category: TrendingCategory) -> Result<Vec<Video>>;
}

pub trait SubscriptionService: Send + Sync {
    fn subscriptions(&self, account: &Account) -> Result<Vec<Channel>>;
}

pub trait SelectionStore: Send + Sync {
    fn country(&self) -> Option<Country>;
    fn set_country(&self, country: Country);
    fn category(&self) -> Option<TrendingCategory>;
    fn set_category(&self, category: TrendingCategory);
}

pub struct InvidiousTrendingService {
    client: Arc<invidious::Client>,
}

impl InvidiousTrendingService {
    pub fn new(client: Arc<invidious::Client>) -> Self {
        Self { client }
    }
}

impl TrendingService for InvidiousTrendingService {
    fn trending(&self, country: Country, category: TrendingCategory) -> Result<Vec<Video>> {
        self.client
            .trending(country, category)
            .context("fetch trending")
    }
}

impl SubscriptionService for InvidiousTrendingService {
    fn subscriptions(&self, account: &Account) -> Result<Vec<Channel>> {
        let Some(sid) = account.token.as_deref().filter(|_| account.signed_in()) else {
            bail!("{} is not signed in", account.name);
        };
        self.client.subscriptions(sid).context("fetch subscriptions")
    }
}

pub struct PipedTrendingService {
    client: Arc<piped::Client>,
}

impl PipedTrendingService {
    pub fn new(client: Arc<piped::Client>) -> Self {
        Self { client }
    }
}

impl TrendingService for PipedTrendingService {
    fn trending(&self, country: Country, _category: TrendingCategory) -> Result<Vec<Video>> {
        self.client.trending(country).context("fetch trending")
    }
}

impl SubscriptionService for PipedTrendingService {
    fn subscriptions(&self, account: &Account) -> Result<Vec<Channel>> {
        let Some(token) = account.token.as_deref().filter(|_| account.signed_in()) else {
            bail!("{} is not signed in", account.name);
        };
        self.client
            .subscriptions(token)
            .context("fetch subscriptions")
    }
}

#[derive(Default)]
pub struct MockTrendingService;

impl TrendingService for MockTrendingService {
    fn trending(&self, country: Country, category: TrendingCategory) -> Result<Vec<Video>> {
        Ok(video::fixtures()
            .into_iter()
            .filter(|video| !video.is_local())
            .map(|mut video| {
                video.title = format!("{} [{} · {}]", video.title, country.code(), category.name());
                video
            })
            .collect())
    }
}

impl SubscriptionService for MockTrendingService {
    fn subscriptions(&self, _account: &Account) -> Result<Vec<Channel>> {
        Ok(video::fixtures()
            .into_iter()
            .take(1)
            .map(|video| video.channel)
            .collect())
    }
}

pub struct StoredSelection {
    store: Arc<Store>,
}

impl StoredSelection {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get_setting(key) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("selection: read {key} failed: {err:#}");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(err) = self.store.set_setting(key, value) {
            log::warn!("selection: write {key} failed: {err:#}");
        }
    }
}

impl SelectionStore for StoredSelection {
    fn country(&self) -> Option<Country> {
        self.read(COUNTRY_KEY)
            .and_then(|code| Country::from_code(&code))
    }

    fn set_country(&self, country: Country) {
        self.write(COUNTRY_KEY, country.code());
    }

    fn category(&self) -> Option<TrendingCategory> {
        self.read(CATEGORY_KEY)
            .and_then(|raw| TrendingCategory::from_raw(&raw))
    }

    fn set_category(&self, category: TrendingCategory) {
        self.write(CATEGORY_KEY, category.raw_value());
    }
}

#[derive(Default)]
pub struct MemorySelection {
    inner: Mutex<(Option<Country>, Option<TrendingCategory>)>,
}

impl MemorySelection {
    pub fn new(country: Option<Country>, category: Option<TrendingCategory>) -> Self {
        Self {
            inner: Mutex::new((country, category)),
        }
    }
}

impl SelectionStore for MemorySelection {
    fn country(&self) -> Option<Country> {
        self.inner.lock().0
    }

    fn set_country(&self, country: Country) {
        self.inner.lock().0 = Some(country);
    }

    fn category(&self) -> Option<TrendingCategory> {
        self.inner.lock().1
    }

    fn set_category(&self, category: TrendingCategory) {
        self.inner.lock().1 = Some(category);
    }
}
