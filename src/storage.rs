use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::video::{Channel, ChannelThumbnailCache};

#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone)]
pub struct MediaEntry {
    pub id: i64,
    pub url: String,
    pub media_type: String,
    pub file_path: String,
    pub width: i64,
    pub height: i64,
    pub size_bytes: i64,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteRow {
    pub id: String,
    pub section: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub path: Option<PathBuf>,
}

impl Store {
    pub fn open(opts: Options) -> Result<Self> {
        let path = if let Some(path) = opts.path {
            path
        } else {
            default_path().context("storage: resolve default path")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("storage: create directory {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("storage: open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", &"WAL")
            .context("storage: set WAL")?;
        conn.pragma_update(None, "busy_timeout", &5000)
            .context("storage: set busy timeout")?;
        migrate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn close(self) -> Result<()> {
        let conn = Arc::try_unwrap(self.conn)
            .map_err(|_| anyhow!("storage: connection still in use"))?
            .into_inner();
        conn.close()
            .map_err(|(_, err)| err)
            .context("storage: close connection")
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .context("storage: query setting")
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            bail!("storage: setting key required");
        }
        let conn = self.conn.lock();
        conn.execute(
            r#"
INSERT INTO settings (key, value) VALUES (?1, ?2)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
            params![key, value],
        )?;
        Ok(())
    }

    pub fn replace_subscriptions(&self, account: &str, channels: &[Channel]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("storage: begin subscriptions")?;
        tx.execute(
            "DELETE FROM subscriptions WHERE account = ?1",
            params![account],
        )?;
        {
            let mut stmt = tx.prepare(
                r#"
INSERT OR REPLACE INTO subscriptions (account, channel_id, channel_name)
VALUES (?1, ?2, ?3)
"#,
            )?;
            for channel in channels {
                if channel.id.is_empty() {
                    continue;
                }
                stmt.execute(params![account, channel.id, channel.name])?;
            }
        }
        tx.commit().context("storage: commit subscriptions")
    }

    pub fn list_subscriptions(&self, account: &str) -> Result<Vec<Channel>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
SELECT s.channel_id, s.channel_name, c.thumbnail_url
FROM subscriptions s
LEFT JOIN channels c ON c.id = s.channel_id
WHERE s.account = ?1
ORDER BY s.channel_name COLLATE NOCASE
"#,
        )?;
        let rows = stmt
            .query_map(params![account], |row| {
                Ok(Channel {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    thumbnail_url: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn upsert_channel(&self, channel: &Channel) -> Result<()> {
        if channel.id.is_empty() {
            bail!("storage: channel id required");
        }
        let conn = self.conn.lock();
        conn.execute(
            r#"
INSERT INTO channels (id, name, thumbnail_url, updated_at)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(id) DO UPDATE SET
  name = excluded.name,
  thumbnail_url = COALESCE(excluded.thumbnail_url, channels.thumbnail_url),
  updated_at = excluded.updated_at
"#,
            params![
                channel.id,
                channel.name,
                channel.thumbnail_url,
                Utc::now().timestamp(),
            ],
        )?;
        Ok(())
    }

    pub fn channel_thumbnail(&self, channel_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let url: Option<Option<String>> = conn
            .query_row(
                "SELECT thumbnail_url FROM channels WHERE id = ?1",
                params![channel_id],
                |row| row.get(0),
            )
            .optional()
            .context("storage: query channel thumbnail")?;
        Ok(url.flatten())
    }

    pub fn add_favorite(&self, id: &str, section: &str) -> Result<()> {
        if id.is_empty() {
            bail!("storage: favorite id required");
        }
        let conn = self.conn.lock();
        conn.execute(
            r#"
INSERT INTO favorites (id, section, created_at) VALUES (?1, ?2, ?3)
ON CONFLICT(id) DO UPDATE SET section = excluded.section
"#,
            params![id, section, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    pub fn remove_favorite(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM favorites WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn has_favorite(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM favorites WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .context("storage: query favorite")?;
        Ok(found.is_some())
    }

    pub fn list_favorites(&self) -> Result<Vec<FavoriteRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
SELECT id, section, created_at
FROM favorites
ORDER BY created_at ASC, id ASC
"#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                let created: i64 = row.get(2)?;
                Ok(FavoriteRow {
                    id: row.get(0)?,
                    section: row.get(1)?,
                    created_at: timestamp(created),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn upsert_media_entry(&self, mut entry: MediaEntry) -> Result<i64> {
        if entry.url.is_empty() {
            bail!("storage: media url required");
        }
        if entry.fetched_at.timestamp() == 0 {
            entry.fetched_at = Utc::now();
        }
        let expires = entry.expires_at.map(|dt| dt.timestamp());
        let conn = self.conn.lock();
        let id: i64 = conn.query_row(
            r#"
INSERT INTO media_cache (url, media_type, file_path, width, height, size_bytes, fetched_at, expires_at, checksum)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
ON CONFLICT(url) DO UPDATE SET
  media_type = excluded.media_type,
  file_path = excluded.file_path,
  width = excluded.width,
  height = excluded.height,
  size_bytes = excluded.size_bytes,
  fetched_at = excluded.fetched_at,
  expires_at = excluded.expires_at,
  checksum = excluded.checksum
RETURNING id
"#,
            params![
                entry.url,
                entry.media_type,
                entry.file_path,
                entry.width,
                entry.height,
                entry.size_bytes,
                entry.fetched_at.timestamp(),
                expires,
                entry.checksum,
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn get_media_entry_by_url(&self, url: &str) -> Result<Option<MediaEntry>> {
        let conn = self.conn.lock();
        conn.query_row(
            r#"
SELECT id, url, media_type, file_path, width, height, size_bytes, fetched_at, expires_at, checksum
FROM media_cache
WHERE url = ?1
"#,
            params![url],
            media_entry_from_row,
        )
        .optional()
        .context("storage: query media entry")
    }

    pub fn total_media_size(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let total: Option<i64> = conn.query_row(
            "SELECT COALESCE(SUM(size_bytes), 0) FROM media_cache",
            [],
            |row| row.get(0),
        )?;
        Ok(total.unwrap_or(0))
    }

    pub fn list_oldest_media(&self, limit: usize) -> Result<Vec<MediaEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
SELECT id, url, media_type, file_path, width, height, size_bytes, fetched_at, expires_at, checksum
FROM media_cache
ORDER BY fetched_at ASC, id ASC
LIMIT ?1
"#,
        )?;
        let rows = stmt
            .query_map(params![limit as i64], media_entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn delete_media_entries(&self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let placeholders = ids
            .iter()
            .enumerate()
            .map(|(i, _)| format!("?{}", i + 1))
            .collect::<Vec<_>>()
            .join(",");
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "DELETE FROM media_cache WHERE id IN ({})",
            placeholders
        ))?;
        stmt.execute(rusqlite::params_from_iter(ids.iter()))?;
        Ok(())
    }
}

impl ChannelThumbnailCache for Store {
    fn cached_thumbnail(&self, channel_id: &str) -> Option<String> {
        match self.channel_thumbnail(channel_id) {
            Ok(url) => url,
            Err(err) => {
                log::debug!("storage: channel thumbnail lookup failed: {err:#}");
                None
            }
        }
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

fn media_entry_from_row(row: &Row<'_>) -> rusqlite::Result<MediaEntry> {
    let fetched: i64 = row.get(7)?;
    let expires: Option<i64> = row.get(8)?;
    Ok(MediaEntry {
        id: row.get(0)?,
        url: row.get(1)?,
        media_type: row.get(2)?,
        file_path: row.get(3)?,
        width: row.get(4)?,
        height: row.get(5)?,
        size_bytes: row.get(6)?,
        fetched_at: timestamp(fetched),
        expires_at: expires.and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
        checksum: row.get(9)?,
    })
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at INTEGER NOT NULL
)
"#,
        [],
    )?;

    let current: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    let migrations = migrations();
    for (idx, sql) in migrations.iter().enumerate() {
        let version = (idx + 1) as i64;
        if version <= current {
            continue;
        }
        conn.execute_batch(sql)?;
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![
                version,
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or(Duration::from_secs(0))
                    .as_secs() as i64,
            ],
        )?;
    }
    Ok(())
}

fn migrations() -> Vec<&'static str> {
    vec![
        r#"
CREATE TABLE IF NOT EXISTS settings (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS channels (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  thumbnail_url TEXT,
  updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS subscriptions (
  account TEXT NOT NULL,
  channel_id TEXT NOT NULL,
  channel_name TEXT NOT NULL,
  PRIMARY KEY (account, channel_id)
);

CREATE TABLE IF NOT EXISTS favorites (
  id TEXT PRIMARY KEY,
  section TEXT NOT NULL,
  created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS media_cache (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  url TEXT NOT NULL UNIQUE,
  media_type TEXT NOT NULL,
  file_path TEXT NOT NULL,
  width INTEGER,
  height INTEGER,
  size_bytes INTEGER,
  fetched_at INTEGER NOT NULL,
  expires_at INTEGER,
  checksum TEXT
);

CREATE INDEX IF NOT EXISTS idx_media_cache_fetched_at ON media_cache(fetched_at);
"#,
    ]
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("trend-tui").join("state.db"))
}

#[cfg(test)]
pub(crate) fn open_temp() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(Options {
        path: Some(dir.path().join("state.db")),
    })
    .unwrap();
    (dir, store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        let store = Store::open(Options {
            path: Some(path.clone()),
        })
        .unwrap();
        assert!(path.exists());
        store.close().unwrap();
    }

    #[test]
    fn settings_overwrite() {
        let (_dir, store) = open_temp();
        assert_eq!(store.get_setting("trending.country").unwrap(), None);
        store.set_setting("trending.country", "US").unwrap();
        store.set_setting("trending.country", "FR").unwrap();
        assert_eq!(
            store.get_setting("trending.country").unwrap().as_deref(),
            Some("FR")
        );
    }

    #[test]
    fn subscriptions_are_replaced_per_account() {
        let (_dir, store) = open_temp();
        store
            .replace_subscriptions(
                "home",
                &[Channel::new("UC1", "Beta"), Channel::new("UC2", "alpha")],
            )
            .unwrap();
        store
            .replace_subscriptions("work", &[Channel::new("UC9", "Other")])
            .unwrap();
        store
            .replace_subscriptions("home", &[Channel::new("UC2", "alpha")])
            .unwrap();
        let home = store.list_subscriptions("home").unwrap();
        assert_eq!(home.len(), 1);
        assert_eq!(home[0].id, "UC2");
        assert_eq!(store.list_subscriptions("work").unwrap().len(), 1);
    }

    #[test]
    fn channel_thumbnail_survives_update_without_one() {
        let (_dir, store) = open_temp();
        store
            .upsert_channel(&Channel::new("UC1", "One").with_thumbnail("https://t.test/1"))
            .unwrap();
        store.upsert_channel(&Channel::new("UC1", "One renamed")).unwrap();
        assert_eq!(
            store.cached_thumbnail("UC1").as_deref(),
            Some("https://t.test/1")
        );
        assert_eq!(store.cached_thumbnail("missing"), None);
    }

    #[test]
    fn favorites_add_remove() {
        let (_dir, store) = open_temp();
        store.add_favorite("trending-US-music", "{}").unwrap();
        assert!(store.has_favorite("trending-US-music").unwrap());
        assert_eq!(store.list_favorites().unwrap().len(), 1);
        store.remove_favorite("trending-US-music").unwrap();
        assert!(!store.has_favorite("trending-US-music").unwrap());
    }
}
