use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch";

pub trait ChannelThumbnailCache {
    fn cached_thumbnail(&self, channel_id: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Channel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl Channel {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            thumbnail_url: None,
        }
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    pub fn thumbnail_url_or_cached(&self, cache: Option<&dyn ChannelThumbnailCache>) -> Option<String> {
        if let Some(url) = self.thumbnail_url.as_ref().filter(|url| !url.trim().is_empty()) {
            return Some(url.clone());
        }
        if self.id.is_empty() {
            return None;
        }
        cache
            .and_then(|cache| cache.cached_thumbnail(&self.id))
            .filter(|url| !url.trim().is_empty())
    }

    pub fn initial(&self) -> char {
        self.name
            .chars()
            .find(|ch| ch.is_alphanumeric())
            .map(|ch| ch.to_uppercase().next().unwrap_or(ch))
            .unwrap_or('?')
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum LocalStream {
    File(PathBuf),
    Directory(PathBuf),
    Url(String),
}

impl LocalStream {
    pub fn image_system_name(&self) -> &'static str {
        match self {
            LocalStream::File(_) => "doc",
            LocalStream::Directory(_) => "folder",
            LocalStream::Url(_) => "globe",
        }
    }

    pub fn location(&self) -> String {
        match self {
            LocalStream::File(path) | LocalStream::Directory(path) => {
                path.to_string_lossy().to_string()
            }
            LocalStream::Url(url) => url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Video {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub channel: Channel,
    #[serde(default)]
    pub length_seconds: u64,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub published_text: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub live: bool,
    #[serde(default)]
    pub local_stream: Option<LocalStream>,
}

impl Video {
    pub fn is_local(&self) -> bool {
        self.local_stream.is_some()
    }

    pub fn local_stream_image_system_name(&self) -> Option<&'static str> {
        self.local_stream.as_ref().map(LocalStream::image_system_name)
    }

    pub fn author(&self) -> &str {
        &self.channel.name
    }

    pub fn watch_url(&self) -> Option<String> {
        if self.id.is_empty() {
            return None;
        }
        Some(format!("{YOUTUBE_WATCH_URL}?v={}", self.id))
    }

    pub fn playback_target(&self) -> Option<String> {
        match &self.local_stream {
            Some(stream) => Some(stream.location()),
            None => self.watch_url(),
        }
    }
}

pub fn fixtures() -> Vec<Video> {
    let ferris = Channel::new("UCferris000000000000000", "Ferris Talks")
        .with_thumbnail("https://yt3.ggpht.example/ferris=s176");
    let tapes = Channel::new("UCtapes0000000000000000", "Old Tapes");
    vec![
        Video {
            id: "dQw4w9WgXcQ".into(),
            title: "Borrow checker explained in 4 minutes".into(),
            channel: ferris.clone(),
            length_seconds: 241,
            view_count: 1_204_331,
            published_text: Some("2 days ago".into()),
            thumbnail_url: Some("https://i.ytimg.example/vi/dQw4w9WgXcQ/mqdefault.jpg".into()),
            live: false,
            local_stream: None,
        },
        Video {
            id: "9bZkp7q19f0".into(),
            title: "Live: rewriting a tracker in Rust".into(),
            channel: ferris,
            length_seconds: 0,
            view_count: 8_713,
            published_text: None,
            thumbnail_url: None,
            live: true,
            local_stream: None,
        },
        Video {
            id: "local-holiday".into(),
            title: "holiday-1998.mkv".into(),
            channel: tapes.clone(),
            length_seconds: 3_725,
            view_count: 0,
            published_text: None,
            thumbnail_url: None,
            live: false,
            local_stream: Some(LocalStream::File(PathBuf::from("/media/tapes/holiday-1998.mkv"))),
        },
        Video {
            id: "local-stream".into(),
            title: "Camera feed".into(),
            channel: tapes,
            length_seconds: 0,
            view_count: 0,
            published_text: None,
            thumbnail_url: None,
            live: true,
            local_stream: Some(LocalStream::Url("rtsp://camera.local/stream".into())),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapCache(HashMap<String, String>);

    impl ChannelThumbnailCache for MapCache {
        fn cached_thumbnail(&self, channel_id: &str) -> Option<String> {
            self.0.get(channel_id).cloned()
        }
    }

    #[test]
    fn prefers_own_thumbnail_over_cached() {
        let mut map = HashMap::new();
        map.insert("UC1".to_string(), "https://cache.test/a".to_string());
        let cache = MapCache(map);
        let channel = Channel::new("UC1", "One").with_thumbnail("https://own.test/a");
        assert_eq!(
            channel.thumbnail_url_or_cached(Some(&cache)).as_deref(),
            Some("https://own.test/a")
        );
        let bare = Channel::new("UC1", "One");
        assert_eq!(
            bare.thumbnail_url_or_cached(Some(&cache)).as_deref(),
            Some("https://cache.test/a")
        );
        assert_eq!(bare.thumbnail_url_or_cached(None), None);
    }

    #[test]
    fn blank_thumbnail_counts_as_missing() {
        let channel = Channel::new("UC2", "Two").with_thumbnail("  ");
        assert_eq!(channel.thumbnail_url_or_cached(None), None);
    }

    #[test]
    fn local_videos_play_their_location() {
        let videos = fixtures();
        let local = videos.iter().find(|v| v.is_local()).unwrap();
        assert_eq!(local.local_stream_image_system_name(), Some("doc"));
        assert_eq!(
            local.playback_target().as_deref(),
            Some("/media/tapes/holiday-1998.mkv")
        );
        let remote = &videos[0];
        assert_eq!(
            remote.playback_target().as_deref(),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        );
    }

    #[test]
    fn initial_skips_symbols() {
        assert_eq!(Channel::new("x", "#rustlang").initial(), 'R');
        assert_eq!(Channel::new("x", "").initial(), '?');
    }

    #[test]
    fn preset_lists_parse_from_json() {
        let json = r#"[{"id":"a","title":"A","channel":{"id":"UC","name":"Chan"},
            "local_stream":{"kind":"url","location":"http://lan/a"}}]"#;
        let videos: Vec<Video> = serde_json::from_str(json).unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].local_stream_image_system_name(), Some("globe"));
    }
}
