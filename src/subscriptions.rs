use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use parking_lot::RwLock;

use crate::accounts::Account;
use crate::data::SubscriptionService;
use crate::storage::Store;
use crate::video::Channel;

pub trait SubscriptionLookup {
    fn is_subscribing(&self, channel_id: &str) -> bool;
}

pub struct SubscribedChannels {
    ids: RwLock<HashSet<String>>,
    generation: AtomicU64,
    store: Option<Arc<Store>>,
}

impl SubscribedChannels {
    pub fn new(store: Option<Arc<Store>>) -> Self {
        Self {
            ids: RwLock::new(HashSet::new()),
            generation: AtomicU64::new(0),
            store,
        }
    }

    pub fn load_cached(&self, account: &Account) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let channels = store.list_subscriptions(&account.name)?;
        *self.ids.write() = channels.into_iter().map(|channel| channel.id).collect();
        self.generation.fetch_add(1, Ordering::Release);
        Ok(())
    }

    pub fn replace(&self, account: &Account, channels: &[Channel]) -> Result<()> {
        if let Some(store) = &self.store {
            for channel in channels.iter().filter(|c| c.thumbnail_url.is_some()) {
                store.upsert_channel(channel)?;
            }
            store.replace_subscriptions(&account.name, channels)?;
        }
        *self.ids.write() = channels.iter().map(|channel| channel.id.clone()).collect();
        self.generation.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Bumped whenever the set is replaced; the UI compares it between frames.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn refresh_in_background(
        self: &Arc<Self>,
        service: Arc<dyn SubscriptionService>,
        account: Account,
    ) -> thread::JoinHandle<()> {
        let this = self.clone();
        thread::spawn(move || match service.subscriptions(&account) {
            Ok(channels) => {
                log::info!(
                    "subscriptions: {} channels for {}",
                    channels.len(),
                    account.name
                );
                if let Err(err) = this.replace(&account, &channels) {
                    log::warn!("subscriptions: storing failed: {err:#}");
                }
            }
            Err(err) => log::warn!("subscriptions: refresh failed: {err:#}"),
        })
    }
}

impl SubscriptionLookup for SubscribedChannels {
    fn is_subscribing(&self, channel_id: &str) -> bool {
        self.ids.read().contains(channel_id)
    }
}
