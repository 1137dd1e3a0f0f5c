use std::sync::Arc;

use crate::accounts::AppCapabilities;
use crate::data::SelectionStore;
use crate::favorites::{FavoriteItem, FavoriteSection};
use crate::resource::{
    LoadState, Notification, ObserverId, ResourceCache, ResourceEvent, TrendingResource,
};
use crate::trending::{Country, TrendingCategory};
use crate::video::Video;

pub const REFRESH_FAILED_TITLE: &str = "Could not refresh Trending";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct BrowserOptions {
    pub preset: Vec<Video>,
    pub default_country: Country,
    pub default_category: TrendingCategory,
    pub capabilities: AppCapabilities,
}

pub struct Browser {
    country: Country,
    category: TrendingCategory,
    presenting_country_selection: bool,
    favorite_item: Option<FavoriteItem>,
    videos: Arc<Vec<Video>>,
    preset: Arc<Vec<Video>>,
    observer: ObserverId,
    observed: Option<TrendingResource>,
    selection: Arc<dyn SelectionStore>,
    supports_categories: bool,
    alert: Option<Alert>,
}

impl Browser {
    pub fn new(
        cache: &mut ResourceCache,
        selection: Arc<dyn SelectionStore>,
        options: BrowserOptions,
    ) -> Self {
        let supports_categories = options.capabilities.supports_trending_categories;
        let country = selection.country().unwrap_or(options.default_country);
        let category = if supports_categories {
            selection.category().unwrap_or(options.default_category)
        } else {
            TrendingCategory::Default
        };
        Self {
            country,
            category,
            presenting_country_selection: false,
            favorite_item: None,
            videos: Arc::new(Vec::new()),
            preset: Arc::new(options.preset),
            observer: cache.register_observer(),
            observed: None,
            selection,
            supports_categories,
            alert: None,
        }
    }

    pub fn country(&self) -> Country {
        self.country
    }

    pub fn category(&self) -> TrendingCategory {
        self.category
    }

    pub fn videos(&self) -> &Arc<Vec<Video>> {
        &self.videos
    }

    pub fn favorite_item(&self) -> Option<&FavoriteItem> {
        self.favorite_item.as_ref()
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn presenting_country_selection(&self) -> bool {
        self.presenting_country_selection
    }

    pub fn supports_categories(&self) -> bool {
        self.supports_categories
    }

    pub fn uses_preset(&self) -> bool {
        !self.preset.is_empty()
    }

    pub fn resource(&self) -> TrendingResource {
        TrendingResource::new(self.country, self.category)
    }

    pub fn is_loading(&self, cache: &ResourceCache) -> bool {
        self.observed
            .map(|resource| cache.state(resource) == LoadState::Loading)
            .unwrap_or(false)
    }

    pub fn appear(&mut self, cache: &mut ResourceCache) {
        self.update_favorite_item();
        if self.uses_preset() {
            self.videos = self.preset.clone();
            return;
        }
        let resource = self.observe(cache);
        cache.load_if_needed(resource);
    }

    pub fn enter_foreground(&mut self, cache: &mut ResourceCache) {
        if self.uses_preset() {
            return;
        }
        cache.load_if_needed(self.resource());
    }

    pub fn refresh(&mut self, cache: &mut ResourceCache) {
        if self.uses_preset() {
            return;
        }
        let resource = self.observe(cache);
        cache.load(resource);
    }

    pub fn set_country(&mut self, cache: &mut ResourceCache, country: Country) {
        self.change_selection(cache, country, self.category);
    }

    pub fn set_category(&mut self, cache: &mut ResourceCache, category: TrendingCategory) {
        if !self.supports_categories {
            return;
        }
        self.change_selection(cache, self.country, category);
    }

    pub fn cycle_category(&mut self, cache: &mut ResourceCache) {
        self.set_category(cache, self.category.next());
    }

    pub fn apply_favorite(&mut self, cache: &mut ResourceCache, section: &FavoriteSection) {
        let Some((country, category)) = section.trending_selection() else {
            log::warn!("browser: cannot apply favorite {}", section.stable_id());
            return;
        };
        let category = if self.supports_categories {
            category
        } else {
            TrendingCategory::Default
        };
        self.change_selection(cache, country, category);
    }

    pub fn begin_country_selection(&mut self, cache: &mut ResourceCache) {
        self.presenting_country_selection = true;
        self.unobserve(cache);
    }

    pub fn cancel_country_selection(&mut self, cache: &mut ResourceCache) {
        self.presenting_country_selection = false;
        if !self.uses_preset() {
            self.observe(cache);
        }
    }

    /// Applies cache notifications; returns whether anything visible changed.
    pub fn handle(&mut self, notifications: &[Notification]) -> bool {
        let mut changed = false;
        for note in notifications {
            if note.observer != self.observer || Some(note.resource) != self.observed {
                continue;
            }
            match &note.event {
                ResourceEvent::ObserverAdded(videos) | ResourceEvent::NewData(videos) => {
                    self.videos = videos.clone();
                }
                ResourceEvent::Error(err) => {
                    self.alert = Some(Alert {
                        title: REFRESH_FAILED_TITLE.to_string(),
                        message: err.user_message().to_string(),
                    });
                }
            }
            changed = true;
        }
        changed
    }

    fn change_selection(
        &mut self,
        cache: &mut ResourceCache,
        country: Country,
        category: TrendingCategory,
    ) {
        self.presenting_country_selection = false;
        if country == self.country && category == self.category {
            if !self.uses_preset() {
                self.observe(cache);
            }
            return;
        }

        self.unobserve(cache);
        if country != self.country {
            self.country = country;
            self.selection.set_country(country);
        }
        if category != self.category {
            self.category = category;
            self.selection.set_category(category);
        }
        self.update_favorite_item();

        if self.uses_preset() {
            return;
        }
        let resource = self.observe(cache);
        cache.load(resource);
    }

    fn observe(&mut self, cache: &mut ResourceCache) -> TrendingResource {
        let resource = self.resource();
        if self.observed != Some(resource) {
            self.unobserve(cache);
        }
        cache.add_observer(resource, self.observer);
        self.observed = Some(resource);
        resource
    }

    fn unobserve(&mut self, cache: &mut ResourceCache) {
        if let Some(resource) = self.observed.take() {
            cache.remove_observers(resource, self.observer);
        }
    }

    fn update_favorite_item(&mut self) {
        self.favorite_item = Some(FavoriteItem::new(FavoriteSection::trending(
            self.country,
            self.category,
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemorySelection;
    use crate::testing::{video, GatedService};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn capabilities() -> AppCapabilities {
        AppCapabilities {
            supports_subscriptions: true,
            supports_trending_categories: true,
        }
    }

    fn setup(preset: Vec<Video>) -> (Arc<GatedService>, ResourceCache, Browser, Arc<MemorySelection>) {
        let service = GatedService::new();
        let mut cache = ResourceCache::new(service.clone(), Duration::from_secs(300));
        let selection = Arc::new(MemorySelection::new(Some(Country::US), None));
        let browser = Browser::new(
            &mut cache,
            selection.clone(),
            BrowserOptions {
                preset,
                capabilities: capabilities(),
                ..BrowserOptions::default()
            },
        );
        (service, cache, browser, selection)
    }

    fn ids(browser: &Browser) -> Vec<String> {
        browser.videos().iter().map(|v| v.id.clone()).collect()
    }

    #[test]
    fn appear_loads_and_shows_videos() {
        let (service, mut cache, mut browser, _) = setup(Vec::new());
        browser.appear(&mut cache);
        assert!(browser.is_loading(&cache));
        service.release(Country::US, Ok(vec![video("a"), video("b")]));
        assert!(browser.handle(&cache.poll_timeout(WAIT)));
        assert_eq!(ids(&browser), ["a", "b"]);
        assert_eq!(
            browser.favorite_item().unwrap().section,
            FavoriteSection::trending(Country::US, TrendingCategory::Default)
        );
    }

    #[test]
    fn favorite_tracks_latest_selection() {
        let (service, mut cache, mut browser, selection) = setup(Vec::new());
        browser.appear(&mut cache);
        browser.set_country(&mut cache, Country::IT);
        browser.set_category(&mut cache, TrendingCategory::Music);
        let item = browser.favorite_item().unwrap();
        assert_eq!(item.section, FavoriteSection::trending(Country::IT, TrendingCategory::Music));
        assert_eq!(item.id, "trending-IT-music");
        assert_eq!(selection.country(), Some(Country::IT));
        assert_eq!(selection.category(), Some(TrendingCategory::Music));

        browser.cycle_category(&mut cache);
        assert_eq!(browser.category(), TrendingCategory::Gaming);
        assert_eq!(
            browser.favorite_item().unwrap().section,
            FavoriteSection::trending(Country::IT, TrendingCategory::Gaming)
        );
        service.release(Country::US, Ok(Vec::new()));
    }

    #[test]
    fn preset_never_touches_the_cache() {
        let (service, mut cache, mut browser, _) = setup(vec![video("p")]);
        browser.appear(&mut cache);
        browser.refresh(&mut cache);
        browser.enter_foreground(&mut cache);
        browser.set_country(&mut cache, Country::JP);
        browser.set_category(&mut cache, TrendingCategory::Movies);
        browser.begin_country_selection(&mut cache);
        browser.cancel_country_selection(&mut cache);

        assert!(cache.is_empty());
        assert!(service.calls().is_empty());
        assert_eq!(ids(&browser), ["p"]);
        assert_eq!(
            browser.favorite_item().unwrap().section,
            FavoriteSection::trending(Country::JP, TrendingCategory::Movies)
        );
    }

    #[test]
    fn failed_refresh_raises_alert_and_keeps_videos() {
        let (service, mut cache, mut browser, _) = setup(Vec::new());
        browser.appear(&mut cache);
        service.release(Country::US, Ok(vec![video("a")]));
        browser.handle(&cache.poll_timeout(WAIT));

        browser.refresh(&mut cache);
        service.release(Country::US, Err("503 Service Unavailable".into()));
        browser.handle(&cache.poll_timeout(WAIT));

        assert_eq!(ids(&browser), ["a"]);
        let alert = browser.alert().unwrap();
        assert_eq!(alert.title, REFRESH_FAILED_TITLE);
        assert!(alert.message.contains("503"));
        browser.dismiss_alert();
        assert!(browser.alert().is_none());
    }

    #[test]
    fn later_selection_wins_over_earlier_in_flight_load() {
        let (service, mut cache, mut browser, _) = setup(Vec::new());
        browser.appear(&mut cache);
        browser.set_country(&mut cache, Country::DE);
        browser.set_country(&mut cache, Country::FR);

        service.release(Country::FR, Ok(vec![video("fr")]));
        browser.handle(&cache.poll_timeout(WAIT));
        assert_eq!(ids(&browser), ["fr"]);

        service.release(Country::DE, Ok(vec![video("de")]));
        assert!(!browser.handle(&cache.poll_timeout(WAIT)));
        assert_eq!(ids(&browser), ["fr"]);
        assert!(cache.latest_data(TrendingResource::new(Country::DE, TrendingCategory::Default)).is_some());

        service.release(Country::US, Ok(vec![video("us")]));
        assert!(!browser.handle(&cache.poll_timeout(WAIT)));
        assert_eq!(ids(&browser), ["fr"]);
    }

    #[test]
    fn earlier_selection_failure_is_not_reported() {
        let (service, mut cache, mut browser, _) = setup(Vec::new());
        browser.appear(&mut cache);
        browser.set_country(&mut cache, Country::DE);
        browser.set_country(&mut cache, Country::FR);

        service.release(Country::DE, Err("timed out".into()));
        assert!(!browser.handle(&cache.poll_timeout(WAIT)));
        assert!(browser.alert().is_none());

        service.release(Country::FR, Err("bad gateway".into()));
        assert!(browser.handle(&cache.poll_timeout(WAIT)));
        assert!(browser.alert().unwrap().message.contains("bad gateway"));
        assert!(browser.videos().is_empty());
        service.release(Country::US, Ok(Vec::new()));
    }

    #[test]
    fn country_selection_pauses_observation() {
        let (service, mut cache, mut browser, _) = setup(Vec::new());
        browser.appear(&mut cache);
        let us = browser.resource();
        service.release(Country::US, Ok(vec![video("a")]));
        browser.handle(&cache.poll_timeout(WAIT));

        browser.begin_country_selection(&mut cache);
        assert!(browser.presenting_country_selection());
        assert!(!cache.is_observing(us, browser.observer));

        browser.cancel_country_selection(&mut cache);
        assert!(!browser.presenting_country_selection());
        assert!(cache.is_observing(us, browser.observer));
        assert_eq!(cache.state(us), LoadState::Loaded);
        assert!(browser.handle(&cache.poll()));
        assert_eq!(ids(&browser), ["a"]);

        browser.begin_country_selection(&mut cache);
        browser.set_country(&mut cache, Country::PL);
        assert!(!browser.presenting_country_selection());
        assert!(cache.is_observing(browser.resource(), browser.observer));
        assert!(!cache.is_observing(us, browser.observer));
        service.release(Country::PL, Ok(Vec::new()));
    }

    #[test]
    fn favorite_applies_both_dimensions() {
        let (service, mut cache, mut browser, _) = setup(Vec::new());
        browser.appear(&mut cache);
        browser.apply_favorite(
            &mut cache,
            &FavoriteSection::trending(Country::KR, TrendingCategory::Gaming),
        );
        assert_eq!(browser.resource(), TrendingResource::new(Country::KR, TrendingCategory::Gaming));
        service.release(Country::KR, Ok(vec![video("kr")]));
        browser.handle(&cache.poll_timeout(WAIT));
        assert_eq!(ids(&browser), ["kr"]);
        service.release(Country::US, Ok(Vec::new()));
    }

    #[test]
    fn categories_stay_default_without_backend_support() {
        let service = GatedService::new();
        let mut cache = ResourceCache::new(service.clone(), Duration::from_secs(300));
        let selection = Arc::new(MemorySelection::new(None, Some(TrendingCategory::Music)));
        let mut browser = Browser::new(
            &mut cache,
            selection,
            BrowserOptions {
                capabilities: AppCapabilities {
                    supports_subscriptions: true,
                    supports_trending_categories: false,
                },
                ..BrowserOptions::default()
            },
        );
        assert_eq!(browser.category(), TrendingCategory::Default);
        browser.cycle_category(&mut cache);
        assert_eq!(browser.category(), TrendingCategory::Default);
        assert!(cache.is_empty());
    }
}
