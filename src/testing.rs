use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::data::TrendingService;
use crate::trending::{Country, TrendingCategory};
use crate::video::{Channel, Video};

pub fn video(id: &str) -> Video {
    Video {
        id: id.to_string(),
        title: format!("Video {id}"),
        channel: Channel::new(format!("UC-{id}"), format!("Channel {id}")),
        ..Video::default()
    }
}

type Outcome = std::result::Result<Vec<Video>, String>;

#[derive(Default)]
pub struct GatedService {
    gates: Mutex<HashMap<Country, (Sender<Outcome>, Receiver<Outcome>)>>,
    calls: Mutex<Vec<(Country, TrendingCategory)>>,
}

impl GatedService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn gate(&self, country: Country) -> (Sender<Outcome>, Receiver<Outcome>) {
        self.gates
            .lock()
            .entry(country)
            .or_insert_with(unbounded)
            .clone()
    }

    pub fn release(&self, country: Country, outcome: Outcome) {
        let (tx, _) = self.gate(country);
        tx.send(outcome).unwrap();
    }

    pub fn calls(&self) -> Vec<(Country, TrendingCategory)> {
        self.calls.lock().clone()
    }
}

impl TrendingService for GatedService {
    fn trending(&self, country: Country, category: TrendingCategory) -> Result<Vec<Video>> {
        self.calls.lock().push((country, category));
        let (_, rx) = self.gate(country);
        match rx.recv_timeout(Duration::from_secs(10)) {
            Ok(Ok(videos)) => Ok(videos),
            Ok(Err(message)) => Err(anyhow!(message)),
            Err(_) => Err(anyhow!("gate for {} never released", country.code())),
        }
    }
}
