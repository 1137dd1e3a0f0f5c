use anyhow::{Context, Result};
use image::imageops::FilterType;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

use crate::accounts::AccountState;
use crate::subscriptions::SubscriptionLookup;
use crate::video::{Channel, ChannelThumbnailCache, Video};

pub const AVATAR_COLS: u16 = 6;
pub const AVATAR_ROWS: u16 = 3;
const PIXELS: u32 = 6;

const PLACEHOLDER_GREY: (u8, u8, u8) = (153, 153, 153);
const PLACEHOLDER_OPACITY: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderIcon {
    Play,
    LocalStream(&'static str),
}

impl PlaceholderIcon {
    pub fn system_name(&self) -> &'static str {
        match self {
            PlaceholderIcon::Play => "play.rectangle",
            PlaceholderIcon::LocalStream(name) => name,
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self.system_name() {
            "doc" => "≡",
            "folder" => "▤",
            "globe" => "◎",
            _ => "▶",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarFill {
    Thumbnail { url: String, initial: char },
    Placeholder(PlaceholderIcon),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarSpec {
    pub fill: AvatarFill,
    pub badge: bool,
}

impl AvatarSpec {
    pub fn resolve(
        channel: Option<&Channel>,
        video: Option<&Video>,
        subscribed_badge: bool,
        account: &AccountState,
        subscriptions: &dyn SubscriptionLookup,
        thumbnails: Option<&dyn ChannelThumbnailCache>,
    ) -> Self {
        let thumbnail = channel.and_then(|channel| {
            channel
                .thumbnail_url_or_cached(thumbnails)
                .map(|url| (url, channel.initial()))
        });
        let fill = match thumbnail {
            Some((url, initial)) => AvatarFill::Thumbnail { url, initial },
            None => match video.and_then(Video::local_stream_image_system_name) {
                Some(name) => AvatarFill::Placeholder(PlaceholderIcon::LocalStream(name)),
                None => AvatarFill::Placeholder(PlaceholderIcon::Play),
            },
        };
        Self {
            fill,
            badge: shows_badge(subscribed_badge, account, channel, subscriptions),
        }
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        match &self.fill {
            AvatarFill::Thumbnail { url, .. } => Some(url),
            AvatarFill::Placeholder(_) => None,
        }
    }
}

pub fn shows_badge(
    subscribed_badge: bool,
    account: &AccountState,
    channel: Option<&Channel>,
    subscriptions: &dyn SubscriptionLookup,
) -> bool {
    subscribed_badge
        && account.app.supports_subscriptions
        && account.signed_in
        && channel
            .map(|channel| subscriptions.is_subscribing(&channel.id))
            .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pixels: Vec<(u8, u8, u8)>,
}

impl Thumbnail {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).context("avatar: decode thumbnail")?;
        let scaled = image
            .resize_exact(PIXELS, PIXELS, FilterType::Triangle)
            .to_rgb8();
        let pixels = scaled.pixels().map(|p| (p[0], p[1], p[2])).collect();
        Ok(Self { pixels })
    }

    fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        self.pixels
            .get((y * PIXELS + x) as usize)
            .copied()
            .unwrap_or(PLACEHOLDER_GREY)
    }
}

fn in_circle(x: u32, y: u32) -> bool {
    let radius = PIXELS as f32 / 2.0;
    let dx = x as f32 + 0.5 - radius;
    let dy = y as f32 + 0.5 - radius;
    dx * dx + dy * dy <= radius * radius
}

fn blend(top: (u8, u8, u8), under: (u8, u8, u8), alpha: f32) -> (u8, u8, u8) {
    let mix = |a: u8, b: u8| (a as f32 * alpha + b as f32 * (1.0 - alpha)).round() as u8;
    (mix(top.0, under.0), mix(top.1, under.1), mix(top.2, under.2))
}

fn rgb(color: (u8, u8, u8)) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

#[derive(Debug, Clone, Copy)]
pub struct AvatarPalette {
    pub background: (u8, u8, u8),
    pub accent: Color,
    pub secondary: Color,
    pub badge_background: Color,
}

pub struct ChannelAvatar<'a> {
    spec: &'a AvatarSpec,
    thumbnail: Option<&'a Thumbnail>,
    palette: AvatarPalette,
}

impl<'a> ChannelAvatar<'a> {
    pub fn new(spec: &'a AvatarSpec, thumbnail: Option<&'a Thumbnail>, palette: AvatarPalette) -> Self {
        Self {
            spec,
            thumbnail,
            palette,
        }
    }

    fn pixel_color(&self, x: u32, y: u32) -> (u8, u8, u8) {
        if !in_circle(x, y) {
            return self.palette.background;
        }
        match (&self.spec.fill, self.thumbnail) {
            (AvatarFill::Thumbnail { .. }, Some(thumbnail)) => thumbnail.pixel(x, y),
            _ => blend(PLACEHOLDER_GREY, self.palette.background, PLACEHOLDER_OPACITY),
        }
    }
}

impl Widget for ChannelAvatar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = area.intersection(buf.area);
        let cols = AVATAR_COLS.min(area.width);
        let rows = AVATAR_ROWS.min(area.height);

        for row in 0..rows {
            for col in 0..cols {
                let x = col as u32;
                let top = self.pixel_color(x, row as u32 * 2);
                let bottom = self.pixel_color(x, row as u32 * 2 + 1);
                buf.get_mut(area.x + col, area.y + row)
                    .set_symbol("▀")
                    .set_style(Style::default().fg(rgb(top)).bg(rgb(bottom)));
            }
        }

        let center = (area.x + AVATAR_COLS / 2 - 1, area.y + AVATAR_ROWS / 2);
        if center.0 < area.x + cols && center.1 < area.y + rows {
            let fill = rgb(self.pixel_color(2, 2));
            let label = match (&self.spec.fill, self.thumbnail) {
                (AvatarFill::Thumbnail { .. }, Some(_)) => None,
                (AvatarFill::Thumbnail { initial, .. }, None) => Some(initial.to_string()),
                (AvatarFill::Placeholder(icon), _) => Some(icon.glyph().to_string()),
            };
            if let Some(label) = label {
                buf.get_mut(center.0, center.1)
                    .set_symbol(&label)
                    .set_style(Style::default().fg(self.palette.accent).bg(fill));
                if center.0 + 1 < area.x + cols {
                    buf.get_mut(center.0 + 1, center.1)
                        .set_symbol(" ")
                        .set_style(Style::default().bg(fill));
                }
            }
        }

        if self.spec.badge && cols == AVATAR_COLS && rows == AVATAR_ROWS {
            buf.get_mut(area.x + AVATAR_COLS - 1, area.y + AVATAR_ROWS - 1)
                .set_symbol("★")
                .set_style(
                    Style::default()
                        .fg(self.palette.secondary)
                        .bg(self.palette.badge_background),
                );
        }
    }
}
