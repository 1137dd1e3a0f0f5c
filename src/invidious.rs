use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{COOKIE, USER_AGENT};
use serde::Deserialize;
use url::Url;

use crate::trending::{Country, TrendingCategory};
use crate::video::{Channel, Video};

const AVATAR_TARGET_PX: u32 = 176;

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub http_client: Option<HttpClient>,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("invidious client user agent required");
        }
        let mut base_url = Url::parse(config.base_url.trim())
            .with_context(|| format!("invidious: invalid instance url {:?}", config.base_url))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(Duration::from_secs(20))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn trending_url(&self, country: Country, category: TrendingCategory) -> Result<Url> {
        let mut url = self.base_url.join("api/v1/trending")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("region", country.code());
            if let Some(kind) = category.invidious_type() {
                query.append_pair("type", kind);
            }
        }
        Ok(url)
    }

    pub fn trending(&self, country: Country, category: TrendingCategory) -> Result<Vec<Video>> {
        let url = self.trending_url(country, category)?;
        let items: Vec<TrendingItem> = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .context("request trending videos")?
            .error_for_status()
            .context("trending videos")?
            .json()
            .context("decode trending videos")?;
        Ok(self.videos_from_items(items))
    }

    pub fn subscriptions(&self, sid: &str) -> Result<Vec<Channel>> {
        let url = self.base_url.join("api/v1/auth/subscriptions")?;
        let subs: Vec<Subscription> = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(COOKIE, format!("SID={sid}"))
            .send()
            .context("request subscriptions")?
            .error_for_status()
            .context("subscriptions")?
            .json()
            .context("decode subscriptions")?;
        Ok(subs
            .into_iter()
            .map(|sub| Channel::new(sub.author_id, sub.author))
            .collect())
    }

    fn videos_from_items(&self, items: Vec<TrendingItem>) -> Vec<Video> {
        items
            .into_iter()
            .filter(|item| item.item_type.as_deref().unwrap_or("video") == "video")
            .map(|item| self.video_from_item(item))
            .collect()
    }

    fn video_from_item(&self, item: TrendingItem) -> Video {
        let channel_thumbnail = pick_avatar(&item.author_thumbnails).map(|url| self.absolute(&url));
        let thumbnail_url = item
            .video_thumbnails
            .iter()
            .find(|thumb| thumb.quality.as_deref() == Some("medium"))
            .or_else(|| item.video_thumbnails.first())
            .map(|thumb| self.absolute(&thumb.url));
        Video {
            id: item.video_id,
            title: item.title,
            channel: Channel {
                id: item.author_id,
                name: item.author,
                thumbnail_url: channel_thumbnail,
            },
            length_seconds: item.length_seconds,
            view_count: item.view_count,
            published_text: item.published_text.filter(|text| !text.is_empty()),
            thumbnail_url,
            live: item.live_now,
            local_stream: None,
        }
    }

    fn absolute(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.starts_with("//") {
            return format!("https:{raw}");
        }
        match self.base_url.join(raw) {
            Ok(url) => url.to_string(),
            Err(_) => raw.to_string(),
        }
    }
}

fn pick_avatar(thumbnails: &[Thumbnail]) -> Option<String> {
    thumbnails
        .iter()
        .filter(|thumb| thumb.width.unwrap_or(0) >= AVATAR_TARGET_PX)
        .min_by_key(|thumb| thumb.width.unwrap_or(u32::MAX))
        .or_else(|| thumbnails.last())
        .map(|thumb| thumb.url.clone())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrendingItem {
    #[serde(default, rename = "type")]
    item_type: Option<String>,
    title: String,
    video_id: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    author_id: String,
    #[serde(default)]
    author_thumbnails: Vec<Thumbnail>,
    #[serde(default)]
    video_thumbnails: Vec<Thumbnail>,
    #[serde(default)]
    view_count: u64,
    #[serde(default)]
    published_text: Option<String>,
    #[serde(default)]
    length_seconds: u64,
    #[serde(default)]
    live_now: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct Thumbnail {
    #[serde(default)]
    quality: Option<String>,
    url: String,
    #[serde(default)]
    width: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Subscription {
    author: String,
    author_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new(ClientConfig {
            base_url: "https://inv.example/".into(),
            user_agent: "trend-tui/test".into(),
            http_client: None,
        })
        .unwrap()
    }

    #[test]
    fn trending_url_carries_region_and_type() {
        let client = client();
        let url = client
            .trending_url(Country::GB, TrendingCategory::Music)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://inv.example/api/v1/trending?region=GB&type=Music"
        );
        let url = client
            .trending_url(Country::US, TrendingCategory::Default)
            .unwrap();
        assert_eq!(url.as_str(), "https://inv.example/api/v1/trending?region=US");
    }

    #[test]
    fn decodes_trending_payload() {
        let payload = r#"[
          {"type":"video","title":"First","videoId":"aaaaaaaaaaa","author":"Chan",
           "authorId":"UC1","viewCount":42,"publishedText":"1 day ago","lengthSeconds":61,
           "liveNow":false,
           "authorThumbnails":[{"url":"//yt3.example/a=s32","width":32,"height":32},
                               {"url":"//yt3.example/a=s176","width":176,"height":176},
                               {"url":"//yt3.example/a=s512","width":512,"height":512}],
           "videoThumbnails":[{"quality":"maxres","url":"/vi/aaaaaaaaaaa/maxres.jpg","width":1280},
                              {"quality":"medium","url":"/vi/aaaaaaaaaaa/mqdefault.jpg","width":320}]},
          {"type":"channel","title":"ignored","videoId":"x"},
          {"title":"Second","videoId":"bbbbbbbbbbb","author":"Other","authorId":"UC2",
           "liveNow":true}
        ]"#;
        let items: Vec<TrendingItem> = serde_json::from_str(payload).unwrap();
        let videos = client().videos_from_items(items);
        assert_eq!(videos.len(), 2);
        let first = &videos[0];
        assert_eq!(first.channel.id, "UC1");
        assert_eq!(
            first.channel.thumbnail_url.as_deref(),
            Some("https://yt3.example/a=s176")
        );
        assert_eq!(
            first.thumbnail_url.as_deref(),
            Some("https://inv.example/vi/aaaaaaaaaaa/mqdefault.jpg")
        );
        assert_eq!(first.length_seconds, 61);
        let second = &videos[1];
        assert!(second.live);
        assert_eq!(second.channel.thumbnail_url, None);
        assert_eq!(second.thumbnail_url, None);
    }

    #[test]
    fn rejects_invalid_instance_url() {
        let result = Client::new(ClientConfig {
            base_url: "not a url".into(),
            user_agent: "trend-tui/test".into(),
            http_client: None,
        });
        assert!(result.is_err());
    }
}
