use std::time::Duration;

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use url::Url;

use crate::trending::Country;
use crate::video::{Channel, Video};

static WATCH_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]v=([A-Za-z0-9_-]+)").expect("watch id pattern"));
static CHANNEL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/channel/([A-Za-z0-9_-]+)").expect("channel id pattern"));

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
            bail!("piped client user agent required");
        }
        let mut base_url = Url::parse(config.base_url.trim())
            .with_context(|| format!("piped: invalid api url {:?}", config.base_url))?;
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

    pub fn trending_url(&self, country: Country) -> Result<Url> {
        let mut url = self.base_url.join("trending")?;
        url.query_pairs_mut().append_pair("region", country.code());
        Ok(url)
    }

    pub fn trending(&self, country: Country) -> Result<Vec<Video>> {
        let url = self.trending_url(country)?;
        let items: Vec<StreamItem> = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .context("request trending videos")?
            .error_for_status()
            .context("trending videos")?
            .json()
            .context("decode trending videos")?;
        Ok(items.into_iter().filter_map(video_from_stream).collect())
    }

    pub fn subscriptions(&self, token: &str) -> Result<Vec<Channel>> {
        let url = self.base_url.join("subscriptions")?;
        let subs: Vec<Subscription> = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(AUTHORIZATION, token)
            .send()
            .context("request subscriptions")?
            .error_for_status()
            .context("subscriptions")?
            .json()
            .context("decode subscriptions")?;
        Ok(subs
            .into_iter()
            .filter_map(|sub| {
                let id = extract(&CHANNEL_ID, &sub.url)?;
                Some(Channel {
                    id,
                    name: sub.name,
                    thumbnail_url: sub.avatar.filter(|url| !url.is_empty()),
                })
            })
            .collect())
    }
}

fn extract(pattern: &Regex, raw: &str) -> Option<String> {
    pattern
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn video_from_stream(item: StreamItem) -> Option<Video> {
    if item.item_type.as_deref().unwrap_or("stream") != "stream" {
        return None;
    }
    let id = extract(&WATCH_ID, &item.url)?;
    let channel_id = item
        .uploader_url
        .as_deref()
        .and_then(|url| extract(&CHANNEL_ID, url))
        .unwrap_or_default();
    Some(Video {
        id,
        title: item.title,
        channel: Channel {
            id: channel_id,
            name: item.uploader_name.unwrap_or_default(),
            thumbnail_url: item.uploader_avatar.filter(|url| !url.is_empty()),
        },
        length_seconds: item.duration.max(0) as u64,
        view_count: item.views.max(0) as u64,
        published_text: item.uploaded_date.filter(|text| !text.is_empty()),
        thumbnail_url: item.thumbnail.filter(|url| !url.is_empty()),
        live: item.duration < 0,
        local_stream: None,
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamItem {
    url: String,
    #[serde(default, rename = "type")]
    item_type: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    uploader_name: Option<String>,
    #[serde(default)]
    uploader_url: Option<String>,
    #[serde(default)]
    uploader_avatar: Option<String>,
    #[serde(default)]
    uploaded_date: Option<String>,
    #[serde(default)]
    duration: i64,
    #[serde(default)]
    views: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct Subscription {
    url: String,
    name: String,
    #[serde(default)]
    avatar: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trending_url_has_region_only() {
        let client = Client::new(ClientConfig {
            base_url: "https://pipedapi.example".into(),
            user_agent: "trend-tui/test".into(),
            http_client: None,
        })
        .unwrap();
        assert_eq!(
            client.trending_url(Country::NL).unwrap().as_str(),
            "https://pipedapi.example/trending?region=NL"
        );
    }

    #[test]
    fn decodes_streams() {
        let payload = r#"[
          {"url":"/watch?v=abcdefghijk","type":"stream","title":"Clip","thumbnail":"https://p.example/t.jpg",
           "uploaderName":"Chan","uploaderUrl":"/channel/UCchan","uploaderAvatar":"https://p.example/a.jpg",
           "uploadedDate":"3 hours ago","duration":125,"views":9000},
          {"url":"/watch?v=livelivelive","title":"Live now","uploaderName":"Live","duration":-1,"views":5},
          {"url":"/playlist?list=PL1","type":"playlist","title":"skip"},
          {"url":"/nonsense","type":"stream","title":"no id"}
        ]"#;
        let items: Vec<StreamItem> = serde_json::from_str(payload).unwrap();
        let videos: Vec<Video> = items.into_iter().filter_map(video_from_stream).collect();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].id, "abcdefghijk");
        assert_eq!(videos[0].channel.id, "UCchan");
        assert_eq!(
            videos[0].channel.thumbnail_url.as_deref(),
            Some("https://p.example/a.jpg")
        );
        assert!(videos[1].live);
        assert_eq!(videos[1].length_seconds, 0);
        assert_eq!(videos[1].channel.id, "");
    }
}
