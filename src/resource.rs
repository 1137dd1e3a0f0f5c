use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::data::TrendingService;
use crate::trending::{Country, TrendingCategory};
use crate::video::Video;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrendingResource {
    pub country: Country,
    pub category: TrendingCategory,
}

impl TrendingResource {
    pub fn new(country: Country, category: TrendingCategory) -> Self {
        Self { country, category }
    }
}

impl fmt::Display for TrendingResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trending?region={}", self.country.code())?;
        if self.category != TrendingCategory::Default {
            write!(f, "&type={}", self.category.raw_value())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LoadError {
    message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn user_message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for LoadError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(LoadError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Debug, Clone)]
pub enum ResourceEvent {
    /// Sent once on registration when the resource already holds data.
    ObserverAdded(Arc<Vec<Video>>),
    NewData(Arc<Vec<Video>>),
    Error(LoadError),
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub observer: ObserverId,
    pub resource: TrendingResource,
    pub event: ResourceEvent,
}

struct Completion {
    resource: TrendingResource,
    request_id: u64,
    result: anyhow::Result<Vec<Video>>,
}

#[derive(Default)]
struct Entry {
    state: LoadState,
    data: Option<Arc<Vec<Video>>>,
    fetched_at: Option<Instant>,
    in_flight: Option<u64>,
    observers: Vec<ObserverId>,
}

pub struct ResourceCache {
    service: Arc<dyn TrendingService>,
    freshness: Duration,
    entries: HashMap<TrendingResource, Entry>,
    queued: Vec<Notification>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    next_request_id: u64,
    next_observer_id: u64,
}

impl ResourceCache {
    pub fn new(service: Arc<dyn TrendingService>, freshness: Duration) -> Self {
        let (tx, rx) = unbounded();
        Self {
            service,
            freshness,
            entries: HashMap::new(),
            queued: Vec::new(),
            tx,
            rx,
            next_request_id: 1,
            next_observer_id: 1,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn register_observer(&mut self) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id = self.next_observer_id.wrapping_add(1);
        id
    }

    pub fn add_observer(&mut self, resource: TrendingResource, observer: ObserverId) {
        let entry = self.entries.entry(resource).or_default();
        if entry.observers.contains(&observer) {
            return;
        }
        entry.observers.push(observer);
        if let Some(data) = entry.data.clone() {
            self.queued.push(Notification {
                observer,
                resource,
                event: ResourceEvent::ObserverAdded(data),
            });
        }
    }

    pub fn remove_observers(&mut self, resource: TrendingResource, observer: ObserverId) {
        if let Some(entry) = self.entries.get_mut(&resource) {
            entry.observers.retain(|id| *id != observer);
        }
        self.queued
            .retain(|note| !(note.observer == observer && note.resource == resource));
    }

    #[cfg(test)]
    pub(crate) fn is_observing(&self, resource: TrendingResource, observer: ObserverId) -> bool {
        self.entries
            .get(&resource)
            .map(|entry| entry.observers.contains(&observer))
            .unwrap_or(false)
    }

    /// Starts a new request for `resource`, superseding any in flight.
    pub fn load(&mut self, resource: TrendingResource) -> u64 {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);

        let entry = self.entries.entry(resource).or_default();
        entry.state = LoadState::Loading;
        entry.in_flight = Some(request_id);
        log::debug!("resource: loading {resource} (request {request_id})");

        let service = self.service.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = service.trending(resource.country, resource.category);
            let _ = tx.send(Completion {
                resource,
                request_id,
                result,
            });
        });
        request_id
    }

    pub fn load_if_needed(&mut self, resource: TrendingResource) -> Option<u64> {
        let needed = match self.entries.get(&resource) {
            Some(entry) => match entry.state {
                LoadState::Loading => false,
                LoadState::Loaded => !self.is_fresh(resource),
                LoadState::Idle | LoadState::Failed(_) => true,
            },
            None => true,
        };
        if needed {
            Some(self.load(resource))
        } else {
            None
        }
    }

    pub fn is_fresh(&self, resource: TrendingResource) -> bool {
        if self.freshness.is_zero() {
            return false;
        }
        self.entries
            .get(&resource)
            .and_then(|entry| entry.fetched_at)
            .map(|at| at.elapsed() < self.freshness)
            .unwrap_or(false)
    }

    pub fn state(&self, resource: TrendingResource) -> LoadState {
        self.entries
            .get(&resource)
            .map(|entry| entry.state.clone())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn latest_data(&self, resource: TrendingResource) -> Option<Arc<Vec<Video>>> {
        self.entries
            .get(&resource)
            .and_then(|entry| entry.data.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.entries
            .values()
            .any(|entry| matches!(entry.state, LoadState::Loading))
    }

    pub fn poll(&mut self) -> Vec<Notification> {
        while let Ok(completion) = self.rx.try_recv() {
            self.apply(completion);
        }
        std::mem::take(&mut self.queued)
    }

    #[cfg(test)]
    pub(crate) fn poll_timeout(&mut self, timeout: Duration) -> Vec<Notification> {
        let waiting = self.entries.values().any(|entry| entry.in_flight.is_some());
        if self.queued.is_empty() && waiting {
            if let Ok(completion) = self.rx.recv_timeout(timeout) {
                self.apply(completion);
            }
        }
        self.poll()
    }

    fn apply(&mut self, completion: Completion) {
        let Completion {
            resource,
            request_id,
            result,
        } = completion;
        let Some(entry) = self.entries.get_mut(&resource) else {
            return;
        };
        if entry.in_flight != Some(request_id) {
            log::debug!("resource: discarding superseded request {request_id} for {resource}");
            return;
        }
        entry.in_flight = None;

        let event = match result {
            Ok(videos) => {
                log::info!("resource: {resource} loaded {} videos", videos.len());
                let data = Arc::new(videos);
                entry.data = Some(data.clone());
                entry.fetched_at = Some(Instant::now());
                entry.state = LoadState::Loaded;
                ResourceEvent::NewData(data)
            }
            Err(err) => {
                let err = LoadError::from(err);
                log::warn!("resource: {resource} failed: {err}");
                entry.state = LoadState::Failed(err.clone());
                ResourceEvent::Error(err)
            }
        };

        for observer in &entry.observers {
            self.queued.push(Notification {
                observer: *observer,
                resource,
                event: event.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{video, GatedService};

    const WAIT: Duration = Duration::from_secs(5);

    fn us() -> TrendingResource {
        TrendingResource::new(Country::US, TrendingCategory::Default)
    }

    #[test]
    fn display_matches_request_path() {
        assert_eq!(us().to_string(), "trending?region=US");
        let music = TrendingResource::new(Country::FR, TrendingCategory::Music);
        assert_eq!(music.to_string(), "trending?region=FR&type=music");
    }

    #[test]
    fn load_notifies_registered_observers() {
        let service = GatedService::new();
        let mut cache = ResourceCache::new(service.clone(), Duration::from_secs(60));
        let observer = cache.register_observer();
        let bystander = cache.register_observer();
        cache.add_observer(us(), observer);
        cache.load(us());
        assert_eq!(cache.state(us()), LoadState::Loading);

        service.release(Country::US, Ok(vec![video("a")]));
        let notes = cache.poll_timeout(WAIT);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].observer, observer);
        assert_ne!(notes[0].observer, bystander);
        assert!(matches!(&notes[0].event, ResourceEvent::NewData(data) if data[0].id == "a"));
        assert_eq!(cache.state(us()), LoadState::Loaded);
    }

    #[test]
    fn failure_keeps_previous_data() {
        let service = GatedService::new();
        let mut cache = ResourceCache::new(service.clone(), Duration::from_secs(60));
        let observer = cache.register_observer();
        cache.add_observer(us(), observer);

        cache.load(us());
        service.release(Country::US, Ok(vec![video("a")]));
        cache.poll_timeout(WAIT);

        cache.load(us());
        service.release(Country::US, Err("instance unreachable".into()));
        let notes = cache.poll_timeout(WAIT);
        assert!(matches!(&notes[0].event, ResourceEvent::Error(err)
            if err.user_message().contains("instance unreachable")));
        assert!(matches!(cache.state(us()), LoadState::Failed(_)));
        assert_eq!(cache.latest_data(us()).unwrap()[0].id, "a");
    }

    #[test]
    fn superseded_request_is_discarded() {
        let service = GatedService::new();
        let mut cache = ResourceCache::new(service.clone(), Duration::from_secs(60));
        let observer = cache.register_observer();
        cache.add_observer(us(), observer);

        cache.load(us());
        cache.load(us());
        service.release(Country::US, Ok(vec![video("first")]));
        service.release(Country::US, Ok(vec![video("second")]));

        let mut delivered = Vec::new();
        for _ in 0..2 {
            delivered.extend(cache.poll_timeout(WAIT));
        }
        assert_eq!(delivered.len(), 1);
        assert_eq!(cache.state(us()), LoadState::Loaded);
    }

    #[test]
    fn load_if_needed_skips_fresh_and_in_flight() {
        let service = GatedService::new();
        let mut cache = ResourceCache::new(service.clone(), Duration::from_secs(60));
        assert!(cache.load_if_needed(us()).is_some());
        assert!(cache.load_if_needed(us()).is_none());
        service.release(Country::US, Ok(vec![video("a")]));
        cache.poll_timeout(WAIT);
        assert!(cache.is_fresh(us()));
        assert!(cache.load_if_needed(us()).is_none());
        assert_eq!(service.calls().len(), 1);
    }

    #[test]
    fn load_if_needed_reloads_stale_and_failed() {
        let service = GatedService::new();
        let mut cache = ResourceCache::new(service.clone(), Duration::ZERO);
        cache.load(us());
        service.release(Country::US, Ok(vec![video("a")]));
        cache.poll_timeout(WAIT);
        assert!(cache.load_if_needed(us()).is_some());
        service.release(Country::US, Err("boom".into()));
        cache.poll_timeout(WAIT);
        assert!(cache.load_if_needed(us()).is_some());
    }

    #[test]
    fn removed_observer_hears_nothing() {
        let service = GatedService::new();
        let mut cache = ResourceCache::new(service.clone(), Duration::from_secs(60));
        let observer = cache.register_observer();
        cache.add_observer(us(), observer);
        cache.load(us());
        cache.remove_observers(us(), observer);
        assert!(!cache.is_observing(us(), observer));
        service.release(Country::US, Ok(vec![video("a")]));
        assert!(cache.poll_timeout(WAIT).is_empty());
        assert!(cache.latest_data(us()).is_some());
    }

    #[test]
    fn late_observer_receives_existing_data() {
        let service = GatedService::new();
        let mut cache = ResourceCache::new(service.clone(), Duration::from_secs(60));
        cache.load(us());
        service.release(Country::US, Ok(vec![video("a")]));
        cache.poll_timeout(WAIT);

        let observer = cache.register_observer();
        cache.add_observer(us(), observer);
        cache.add_observer(us(), observer);
        let notes = cache.poll();
        assert_eq!(notes.len(), 1);
        assert!(matches!(notes[0].event, ResourceEvent::ObserverAdded(_)));
    }
}
