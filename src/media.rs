use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use image::ImageFormat;
use parking_lot::Mutex;
use reqwest::blocking::Client;
use sha1::{Digest, Sha1};

use crate::avatar::Thumbnail;
use crate::config::MediaConfig;
use crate::storage::{MediaEntry, Store};

#[derive(Debug, Clone)]
pub struct Options {
    pub cache_dir: PathBuf,
    pub max_size_bytes: i64,
    pub default_ttl: Duration,
    pub workers: usize,
    pub http_client: Option<Client>,
}

impl Options {
    pub fn from_config(cfg: &MediaConfig) -> Result<Self> {
        let cache_dir = cfg
            .cache_dir
            .clone()
            .or_else(default_cache_dir)
            .context("media: cache dir not configured")?;
        Ok(Self {
            cache_dir,
            max_size_bytes: cfg.max_size_bytes,
            default_ttl: cfg.default_ttl,
            workers: cfg.workers,
            http_client: None,
        })
    }
}

struct Fetched {
    url: String,
    thumbnail: Option<Thumbnail>,
}

struct Inner {
    store: Arc<Store>,
    opts: Options,
    client: Client,
    pruning: Mutex<()>,
}

pub struct Loader {
    inner: Arc<Inner>,
    jobs: Option<Sender<String>>,
    results: Receiver<Fetched>,
    pending: HashSet<String>,
    decoded: HashMap<String, Option<Thumbnail>>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl Loader {
    pub fn new(store: Arc<Store>, opts: Options) -> Result<Self> {
        let mut opts = opts;
        if opts.workers == 0 {
            opts.workers = 2;
        }
        fs::create_dir_all(&opts.cache_dir).with_context(|| {
            format!("media: create cache dir {}", opts.cache_dir.display())
        })?;

        let client = match opts.http_client.clone() {
            Some(client) => client,
            None => Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .context("media: build http client")?,
        };

        let inner = Arc::new(Inner {
            store,
            opts,
            client,
            pruning: Mutex::new(()),
        });

        let (job_tx, job_rx) = unbounded::<String>();
        let (result_tx, result_rx) = unbounded();
        let handles = (0..inner.opts.workers)
            .map(|_| {
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                let worker = inner.clone();
                thread::spawn(move || worker.work(jobs, results))
            })
            .collect();

        Ok(Self {
            inner,
            jobs: Some(job_tx),
            results: result_rx,
            pending: HashSet::new(),
            decoded: HashMap::new(),
            handles,
        })
    }

    pub fn request(&mut self, url: &str) {
        if url.is_empty() || self.decoded.contains_key(url) || self.pending.contains(url) {
            return;
        }
        let Some(jobs) = &self.jobs else {
            return;
        };
        if jobs.send(url.to_string()).is_ok() {
            self.pending.insert(url.to_string());
        }
    }

    pub fn thumbnail(&self, url: &str) -> Option<&Thumbnail> {
        self.decoded.get(url).and_then(Option::as_ref)
    }

    pub fn poll(&mut self) -> bool {
        let mut arrived = false;
        while let Ok(fetched) = self.results.try_recv() {
            self.pending.remove(&fetched.url);
            self.decoded.insert(fetched.url, fetched.thumbnail);
            arrived = true;
        }
        arrived
    }

    #[cfg(test)]
    pub(crate) fn poll_timeout(&mut self, timeout: Duration) -> bool {
        if self.pending.is_empty() {
            return self.poll();
        }
        match self.results.recv_timeout(timeout) {
            Ok(fetched) => {
                self.pending.remove(&fetched.url);
                self.decoded.insert(fetched.url, fetched.thumbnail);
                self.poll();
                true
            }
            Err(_) => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        !self.pending.is_empty()
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.jobs.take();
        while let Some(handle) = self.handles.pop() {
            let _ = handle.join();
        }
    }
}

impl Inner {
    fn work(&self, jobs: Receiver<String>, results: Sender<Fetched>) {
        for url in jobs {
            let thumbnail = match self.bytes_for(&url).and_then(|bytes| Thumbnail::decode(&bytes)) {
                Ok(thumbnail) => Some(thumbnail),
                Err(err) => {
                    log::debug!("media: {url}: {err:#}");
                    None
                }
            };
            if results.send(Fetched { url, thumbnail }).is_err() {
                break;
            }
        }
    }

    fn bytes_for(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(entry) = self.store.get_media_entry_by_url(url)? {
            if self.is_fresh(&entry) && Path::new(&entry.file_path).exists() {
                return fs::read(&entry.file_path).context("media: read cached file");
            }
        }
        let (bytes, content_type) = self.download(url)?;
        self.store_bytes(url, &bytes, content_type)?;
        Ok(bytes)
    }

    fn download(&self, url: &str) -> Result<(Vec<u8>, Option<String>)> {
        let response = self.client.get(url).send().context("media: download")?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("media: request failed: {status}"));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|val| val.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().context("media: body")?.to_vec();
        Ok((bytes, content_type))
    }

    fn store_bytes(&self, url: &str, bytes: &[u8], content_type: Option<String>) -> Result<MediaEntry> {
        let checksum = sha1_hex(bytes);
        let path = self.opts.cache_dir.join(format!("{checksum}.bin"));
        fs::write(&path, bytes).context("media: write")?;

        let (width, height) = image::load_from_memory(bytes)
            .map(|img| (img.width() as i64, img.height() as i64))
            .unwrap_or_default();
        let entry = MediaEntry {
            id: 0,
            url: url.to_string(),
            media_type: content_type.unwrap_or_else(|| detect_mime(bytes)),
            file_path: path.to_string_lossy().to_string(),
            width,
            height,
            size_bytes: bytes.len() as i64,
            fetched_at: Utc::now(),
            expires_at: SystemTime::now()
                .checked_add(self.opts.default_ttl)
                .map(DateTime::<Utc>::from),
            checksum,
        };

        self.prune_if_needed(entry.size_bytes, &path)?;
        let id = self.store.upsert_media_entry(entry.clone())?;
        Ok(MediaEntry { id, ..entry })
    }

    fn is_fresh(&self, entry: &MediaEntry) -> bool {
        if let Some(expires_at) = entry.expires_at {
            return Utc::now() < expires_at;
        }
        if self.opts.default_ttl.is_zero() {
            return false;
        }
        match chrono::Duration::from_std(self.opts.default_ttl) {
            Ok(ttl) => Utc::now() < entry.fetched_at + ttl,
            Err(_) => false,
        }
    }

    /// Never removes `keep`, the file just written, even when an older entry
    /// shares its checksum.
    fn prune_if_needed(&self, new_bytes: i64, keep: &Path) -> Result<()> {
        let _guard = self.pruning.lock();
        let mut total = self.store.total_media_size()? + new_bytes;
        if total <= self.opts.max_size_bytes {
            return Ok(());
        }

        let mut ids = Vec::new();
        let mut paths = Vec::new();
        for entry in self.store.list_oldest_media(100)? {
            total -= entry.size_bytes;
            ids.push(entry.id);
            paths.push(entry.file_path);
            if total <= self.opts.max_size_bytes {
                break;
            }
        }
        log::info!("media: pruning {} cached thumbnails", ids.len());
        self.store.delete_media_entries(&ids)?;
        for path in paths.iter().map(Path::new).filter(|path| *path != keep) {
            let _ = fs::remove_file(path);
        }
        Ok(())
    }
}

pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("trend-tui"))
}

fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn detect_mime(bytes: &[u8]) -> String {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => "image/jpeg".into(),
        Ok(ImageFormat::Png) => "image/png".into(),
        Ok(ImageFormat::Gif) => "image/gif".into(),
        Ok(ImageFormat::WebP) => "image/webp".into(),
        _ => tree_magic_mini::from_u8(&bytes[..bytes.len().min(512)]).to_string(),
    }
}
