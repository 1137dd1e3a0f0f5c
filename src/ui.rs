use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{self, Stdout};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use crossterm::event::{
    self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use serde::{Deserialize, Serialize};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::accounts;
use crate::avatar::{AvatarPalette, AvatarSpec, ChannelAvatar, AVATAR_COLS, AVATAR_ROWS};
use crate::browser::Browser;
use crate::config::PlayerConfig;
use crate::favorites::{FavoriteItem, FavoriteSection, Favorites};
use crate::media;
use crate::player;
use crate::resource::ResourceCache;
use crate::storage::Store;
use crate::subscriptions::SubscribedChannels;
use crate::trending::{Country, TrendingCategory};
use crate::video::{ChannelThumbnailCache, Video};

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const DESKTOP_CELL_WIDTH: u16 = 44;
const TV_CELL_WIDTH: u16 = 36;
const CELL_HEIGHT: u16 = 5;
const TV_CELL_HEIGHT: u16 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Phone,
    #[default]
    Desktop,
    Tv,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Phone => "phone",
            Variant::Desktop => "desktop",
            Variant::Tv => "tv",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phone" => Ok(Variant::Phone),
            "desktop" => Ok(Variant::Desktop),
            "tv" => Ok(Variant::Tv),
            other => Err(anyhow!("unknown variant {other:?} (expected phone, desktop or tv)")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Theme {
    bg: Color,
    panel_bg: Color,
    panel_focused_bg: Color,
    panel_selected_bg: Color,
    border_idle: Color,
    border_focused: Color,
    text_primary: Color,
    text_secondary: Color,
    accent: Color,
    error: Color,
}

impl Theme {
    fn named(name: &str) -> Self {
        match name {
            "light" => Self {
                bg: Color::Rgb(239, 241, 245),
                panel_bg: Color::Rgb(230, 233, 239),
                panel_focused_bg: Color::Rgb(204, 208, 218),
                panel_selected_bg: Color::Rgb(188, 192, 204),
                border_idle: Color::Rgb(188, 192, 204),
                border_focused: Color::Rgb(30, 102, 245),
                text_primary: Color::Rgb(76, 79, 105),
                text_secondary: Color::Rgb(92, 95, 119),
                accent: Color::Rgb(30, 102, 245),
                error: Color::Rgb(210, 15, 57),
            },
            other => {
                if other != "default" {
                    log::warn!("ui: unknown theme {other:?}, using default");
                }
                Self {
                    bg: Color::Rgb(30, 30, 46),
                    panel_bg: Color::Rgb(24, 24, 36),
                    panel_focused_bg: Color::Rgb(49, 50, 68),
                    panel_selected_bg: Color::Rgb(69, 71, 90),
                    border_idle: Color::Rgb(49, 50, 68),
                    border_focused: Color::Rgb(137, 180, 250),
                    text_primary: Color::Rgb(205, 214, 244),
                    text_secondary: Color::Rgb(166, 173, 200),
                    accent: Color::Rgb(137, 180, 250),
                    error: Color::Rgb(243, 139, 168),
                }
            }
        }
    }
}

fn rgb_of(color: Color) -> (u8, u8, u8) {
    match color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Black => (0, 0, 0),
        _ => (24, 24, 36),
    }
}

fn badge_background(variant: Variant, panel: Color) -> Color {
    match variant {
        Variant::Tv => Color::Black,
        Variant::Phone | Variant::Desktop => panel,
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

#[derive(Default)]
struct ResolvedThumbnails {
    looked_up: HashSet<String>,
    urls: HashMap<String, String>,
}

impl ResolvedThumbnails {
    fn resolve(&mut self, videos: &[Video], cache: &dyn ChannelThumbnailCache) {
        for channel in videos.iter().map(|video| &video.channel) {
            let has_own = channel
                .thumbnail_url
                .as_deref()
                .is_some_and(|url| !url.trim().is_empty());
            if has_own || channel.id.is_empty() || self.looked_up.contains(&channel.id) {
                continue;
            }
            self.looked_up.insert(channel.id.clone());
            if let Some(url) = cache.cached_thumbnail(&channel.id) {
                self.urls.insert(channel.id.clone(), url);
            }
        }
    }

    fn clear(&mut self) {
        self.looked_up.clear();
        self.urls.clear();
    }
}

impl ChannelThumbnailCache for ResolvedThumbnails {
    fn cached_thumbnail(&self, channel_id: &str) -> Option<String> {
        self.urls.get(channel_id).cloned()
    }
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

pub fn format_views(count: u64) -> String {
    match count {
        1 => "1 view".to_string(),
        0..=999 => format!("{count} views"),
        1_000..=999_999 => format!("{:.1}K views", count as f64 / 1_000.0),
        1_000_000..=999_999_999 => format!("{:.1}M views", count as f64 / 1_000_000.0),
        _ => format!("{:.1}B views", count as f64 / 1_000_000_000.0),
    }
}

pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return String::new();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

fn video_meta_line(video: &Video) -> String {
    let mut parts = Vec::new();
    if video.live {
        parts.push("● LIVE".to_string());
    } else {
        let length = format_duration(video.length_seconds);
        if !length.is_empty() {
            parts.push(length);
        }
    }
    if video.view_count > 0 {
        parts.push(format_views(video.view_count));
    }
    if let Some(published) = video.published_text.as_deref().filter(|s| !s.is_empty()) {
        parts.push(published.to_string());
    }
    if let Some(stream) = &video.local_stream {
        parts.push(stream.location());
    }
    parts.join(" · ")
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn wrap_title(title: &str, width: usize, max_lines: usize) -> Vec<String> {
    let wrapped = textwrap::wrap(title, width.max(1));
    let mut lines: Vec<String> = wrapped
        .iter()
        .take(max_lines)
        .map(|line| line.to_string())
        .collect();
    if wrapped.len() > max_lines {
        if let Some(last) = lines.last_mut() {
            *last = truncate_to_width(&format!("{last} …"), width);
            if !last.ends_with('…') {
                last.push('…');
            }
        }
    }
    lines
}

fn grid_columns(width: u16, variant: Variant) -> usize {
    match variant {
        Variant::Phone => 1,
        Variant::Desktop => (width / DESKTOP_CELL_WIDTH).max(1) as usize,
        Variant::Tv => (width / TV_CELL_WIDTH).max(1) as usize,
    }
}

fn scroll_offset(selected: usize, visible: usize, offset: usize) -> usize {
    if visible == 0 || selected < offset {
        selected
    } else if selected >= offset + visible {
        selected + 1 - visible
    } else {
        offset
    }
}

fn filter_countries(query: &str) -> Vec<Country> {
    let query = query.trim();
    if query.is_empty() {
        return Country::ALL.to_vec();
    }
    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(i64, Country)> = Country::ALL
        .iter()
        .filter_map(|country| {
            let haystack = format!("{} {}", country.name(), country.code());
            matcher
                .fuzzy_match(&haystack, query)
                .map(|score| (score, *country))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, country)| country).collect()
}

struct CountryPicker {
    query: String,
    matches: Vec<Country>,
    selected: usize,
}

impl CountryPicker {
    fn new(current: Country) -> Self {
        let matches = filter_countries("");
        let selected = matches.iter().position(|c| *c == current).unwrap_or(0);
        Self {
            query: String::new(),
            matches,
            selected,
        }
    }

    fn refilter(&mut self) {
        self.matches = filter_countries(&self.query);
        self.selected = 0;
    }

    fn current(&self) -> Option<Country> {
        self.matches.get(self.selected).copied()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum MenuEntry {
    Country,
    Category,
    Favorite,
}

enum Popup {
    Countries(CountryPicker),
    Categories { selected: usize },
    Favorites { items: Vec<FavoriteItem>, selected: usize },
    TrendingMenu { selected: usize },
}

pub struct Options {
    pub variant: Variant,
    pub theme: String,
    pub browser: Browser,
    pub cache: ResourceCache,
    pub accounts: Arc<accounts::Manager>,
    pub subscriptions: Arc<SubscribedChannels>,
    pub thumbnails: Option<Arc<Store>>,
    pub favorites: Favorites,
    pub media: Option<media::Loader>,
    pub player: PlayerConfig,
    pub status_message: String,
}

pub struct Model {
    variant: Variant,
    theme: Theme,
    browser: Browser,
    cache: ResourceCache,
    accounts: Arc<accounts::Manager>,
    subscriptions: Arc<SubscribedChannels>,
    thumbnails: Option<Arc<Store>>,
    channel_thumbnails: ResolvedThumbnails,
    subscriptions_seen: u64,
    favorites: Favorites,
    media: Option<media::Loader>,
    player: PlayerConfig,
    status_message: String,
    selected: usize,
    scroll: Cell<usize>,
    grid_cols: Cell<usize>,
    popup: Option<Popup>,
    needs_redraw: bool,
    spinner: Spinner,
}

impl Model {
    pub fn new(options: Options) -> Self {
        let Options {
            variant,
            theme,
            browser,
            cache,
            accounts,
            subscriptions,
            thumbnails,
            favorites,
            media,
            player,
            status_message,
        } = options;
        let subscriptions_seen = subscriptions.generation();
        let mut model = Self {
            variant,
            theme: Theme::named(&theme),
            browser,
            cache,
            accounts,
            subscriptions,
            thumbnails,
            channel_thumbnails: ResolvedThumbnails::default(),
            subscriptions_seen,
            favorites,
            media,
            player,
            status_message,
            selected: 0,
            scroll: Cell::new(0),
            grid_cols: Cell::new(1),
            popup: None,
            needs_redraw: true,
            spinner: Spinner::new(),
        };
        model.browser.appear(&mut model.cache);
        model.resolve_channel_thumbnails();
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableFocusChange)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableFocusChange)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                log::warn!("ui: {err:#}");
                                self.status_message = format!("Error: {err:#}");
                            }
                        }
                        self.mark_dirty();
                    }
                    Event::FocusGained => {
                        log::debug!("ui: focus regained");
                        self.browser.enter_foreground(&mut self.cache);
                        self.mark_dirty();
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.browser.is_loading(&self.cache)
            || self.media.as_ref().map(media::Loader::is_busy).unwrap_or(false)
    }

    fn poll_async(&mut self) -> bool {
        let notes = self.cache.poll();
        let mut changed = self.browser.handle(&notes);
        if changed {
            self.clamp_selection();
            if self.browser.alert().is_none() {
                self.status_message = self.showing_message();
            } else {
                self.status_message = "Refresh failed.".to_string();
            }
            self.resolve_channel_thumbnails();
        }
        let generation = self.subscriptions.generation();
        if generation != self.subscriptions_seen {
            self.subscriptions_seen = generation;
            log::debug!("ui: subscriptions changed (generation {generation})");
            // A refresh may have stored thumbnails for channels looked up earlier.
            self.channel_thumbnails.clear();
            self.resolve_channel_thumbnails();
            changed = true;
        }
        if let Some(media) = self.media.as_mut() {
            changed |= media.poll();
        }
        changed
    }

    fn showing_message(&self) -> String {
        let count = self.browser.videos().len();
        let mut message = format!(
            "{count} trending videos · {}",
            self.browser.country()
        );
        if self.browser.supports_categories() {
            message.push_str(&format!(" · {}", self.browser.category().name()));
        }
        message
    }

    fn clamp_selection(&mut self) {
        let len = self.browser.videos().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    fn selected_video(&self) -> Option<&Video> {
        self.browser.videos().get(self.selected)
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.browser.videos().len();
        if len == 0 {
            return;
        }
        let next = self.selected as isize + delta;
        self.selected = next.clamp(0, len as isize - 1) as usize;
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.browser.alert().is_some() {
            if matches!(code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.browser.dismiss_alert();
            }
            return Ok(false);
        }

        if let Some(popup) = self.popup.take() {
            return self.handle_popup_key(popup, code);
        }

        let cols = self.grid_cols.get().max(1) as isize;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Char('j') | KeyCode::Down => match self.variant {
                Variant::Desktop => self.move_selection(cols),
                Variant::Phone | Variant::Tv => self.move_selection(1),
            },
            KeyCode::Char('k') | KeyCode::Up => match self.variant {
                Variant::Desktop => self.move_selection(-cols),
                Variant::Phone | Variant::Tv => self.move_selection(-1),
            },
            KeyCode::Char('l') | KeyCode::Right => {
                if self.variant != Variant::Phone {
                    self.move_selection(1);
                }
            }
            KeyCode::Char('h') | KeyCode::Left => {
                if self.variant != Variant::Phone {
                    self.move_selection(-1);
                }
            }
            KeyCode::Char('g') | KeyCode::Home => self.selected = 0,
            KeyCode::Char('G') | KeyCode::End => {
                self.selected = self.browser.videos().len().saturating_sub(1);
            }
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('c') => {
                if self.variant == Variant::Tv {
                    self.cycle_category();
                } else {
                    self.open_categories();
                }
            }
            KeyCode::Char('C') if self.variant == Variant::Tv => self.open_categories(),
            KeyCode::Char('n') => self.open_countries(),
            KeyCode::Char('f') => self.toggle_favorite()?,
            KeyCode::Char('b') => self.open_favorites()?,
            KeyCode::Char('m') if self.variant == Variant::Phone => {
                self.popup = Some(Popup::TrendingMenu { selected: 0 });
            }
            KeyCode::Enter => self.play_selected()?,
            KeyCode::Char('o') => self.open_selected()?,
            KeyCode::Char('y') => self.copy_selected()?,
            _ => {}
        }
        Ok(false)
    }

    fn handle_popup_key(&mut self, popup: Popup, code: KeyCode) -> Result<bool> {
        match popup {
            Popup::Countries(mut picker) => match code {
                KeyCode::Esc => {
                    self.browser.cancel_country_selection(&mut self.cache);
                    self.status_message = self.showing_message();
                }
                KeyCode::Enter => match picker.current() {
                    Some(country) => self.select_country(country),
                    None => self.popup = Some(Popup::Countries(picker)),
                },
                KeyCode::Down => {
                    if picker.selected + 1 < picker.matches.len() {
                        picker.selected += 1;
                    }
                    self.popup = Some(Popup::Countries(picker));
                }
                KeyCode::Up => {
                    picker.selected = picker.selected.saturating_sub(1);
                    self.popup = Some(Popup::Countries(picker));
                }
                KeyCode::Backspace => {
                    picker.query.pop();
                    picker.refilter();
                    self.popup = Some(Popup::Countries(picker));
                }
                KeyCode::Char(ch) => {
                    picker.query.push(ch);
                    picker.refilter();
                    self.popup = Some(Popup::Countries(picker));
                }
                _ => self.popup = Some(Popup::Countries(picker)),
            },
            Popup::Categories { selected } => match code {
                KeyCode::Esc | KeyCode::Char('q') => {}
                KeyCode::Enter => {
                    let category = TrendingCategory::ALL[selected % TrendingCategory::ALL.len()];
                    self.select_category(category);
                }
                KeyCode::Char('j') | KeyCode::Down => {
                    self.popup = Some(Popup::Categories {
                        selected: (selected + 1).min(TrendingCategory::ALL.len() - 1),
                    });
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    self.popup = Some(Popup::Categories {
                        selected: selected.saturating_sub(1),
                    });
                }
                _ => self.popup = Some(Popup::Categories { selected }),
            },
            Popup::Favorites { items, selected } => match code {
                KeyCode::Esc | KeyCode::Char('q') => {}
                KeyCode::Enter => {
                    if let Some(item) = items.get(selected) {
                        let section = item.section.clone();
                        self.apply_favorite(&section);
                    }
                }
                KeyCode::Char('d') => {
                    if let Some(item) = items.get(selected) {
                        self.favorites.toggle(item)?;
                    }
                    let items = self.favorites.list()?;
                    let selected = selected.min(items.len().saturating_sub(1));
                    self.popup = Some(Popup::Favorites { items, selected });
                }
                KeyCode::Char('j') | KeyCode::Down => {
                    let selected = (selected + 1).min(items.len().saturating_sub(1));
                    self.popup = Some(Popup::Favorites { items, selected });
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    let selected = selected.saturating_sub(1);
                    self.popup = Some(Popup::Favorites { items, selected });
                }
                _ => self.popup = Some(Popup::Favorites { items, selected }),
            },
            Popup::TrendingMenu { selected } => {
                let entries = self.trending_menu_entries();
                match code {
                    KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('m') => {}
                    KeyCode::Enter => match entries.get(selected) {
                        Some(MenuEntry::Country) => self.open_countries(),
                        Some(MenuEntry::Category) => self.open_categories(),
                        Some(MenuEntry::Favorite) => self.toggle_favorite()?,
                        None => {}
                    },
                    KeyCode::Char('j') | KeyCode::Down => {
                        self.popup = Some(Popup::TrendingMenu {
                            selected: (selected + 1).min(entries.len().saturating_sub(1)),
                        });
                    }
                    KeyCode::Char('k') | KeyCode::Up => {
                        self.popup = Some(Popup::TrendingMenu {
                            selected: selected.saturating_sub(1),
                        });
                    }
                    _ => self.popup = Some(Popup::TrendingMenu { selected }),
                }
            }
        }
        Ok(false)
    }

    fn trending_menu_entries(&self) -> Vec<MenuEntry> {
        let mut entries = vec![MenuEntry::Country];
        if self.browser.supports_categories() {
            entries.push(MenuEntry::Category);
        }
        entries.push(MenuEntry::Favorite);
        entries
    }

    fn refresh(&mut self) {
        if self.browser.uses_preset() {
            self.status_message = "Showing a fixed video list; nothing to refresh.".to_string();
            return;
        }
        self.browser.refresh(&mut self.cache);
        self.status_message = format!("Refreshing {}…", self.browser.resource());
    }

    fn open_countries(&mut self) {
        self.browser.begin_country_selection(&mut self.cache);
        self.popup = Some(Popup::Countries(CountryPicker::new(self.browser.country())));
        self.status_message = "Type to filter countries, Enter to choose, Esc to cancel.".to_string();
    }

    fn open_categories(&mut self) {
        if !self.browser.supports_categories() {
            self.status_message = "This instance does not offer trending categories.".to_string();
            return;
        }
        let selected = TrendingCategory::ALL
            .iter()
            .position(|c| *c == self.browser.category())
            .unwrap_or(0);
        self.popup = Some(Popup::Categories { selected });
    }

    fn cycle_category(&mut self) {
        if !self.browser.supports_categories() {
            self.status_message = "This instance does not offer trending categories.".to_string();
            return;
        }
        let next = self.browser.category().next();
        self.select_category(next);
    }

    fn select_country(&mut self, country: Country) {
        self.browser.set_country(&mut self.cache, country);
        self.after_selection_change();
    }

    fn select_category(&mut self, category: TrendingCategory) {
        self.browser.set_category(&mut self.cache, category);
        self.after_selection_change();
    }

    fn apply_favorite(&mut self, section: &FavoriteSection) {
        self.browser.apply_favorite(&mut self.cache, section);
        self.after_selection_change();
    }

    fn after_selection_change(&mut self) {
        self.selected = 0;
        self.scroll.set(0);
        self.clamp_selection();
        self.status_message = if self.browser.is_loading(&self.cache) {
            format!("Loading {}…", self.browser.resource())
        } else {
            self.showing_message()
        };
    }

    fn toggle_favorite(&mut self) -> Result<()> {
        let Some(item) = self.browser.favorite_item().cloned() else {
            return Ok(());
        };
        let added = self.favorites.toggle(&item)?;
        let label = item.section.label();
        self.status_message = if added {
            format!("Added {label} to favorites.")
        } else {
            format!("Removed {label} from favorites.")
        };
        Ok(())
    }

    fn open_favorites(&mut self) -> Result<()> {
        let items = self.favorites.list()?;
        if items.is_empty() {
            self.status_message = "No favorites yet. Press f to bookmark this view.".to_string();
            return Ok(());
        }
        let selected = self
            .browser
            .favorite_item()
            .and_then(|current| items.iter().position(|item| item.id == current.id))
            .unwrap_or(0);
        self.popup = Some(Popup::Favorites { items, selected });
        Ok(())
    }

    fn play_selected(&mut self) -> Result<()> {
        let Some(video) = self.selected_video() else {
            return Ok(());
        };
        let target = video
            .playback_target()
            .context("video has nothing to play")?;
        let title = video.title.clone();
        player::spawn(
            &self.player,
            player::LaunchOptions {
                target: &target,
                title: &title,
            },
        )?;
        self.status_message = format!("Playing {title}");
        Ok(())
    }

    fn open_selected(&mut self) -> Result<()> {
        let Some(url) = self.selected_video().and_then(Video::watch_url) else {
            return Ok(());
        };
        webbrowser::open(&url).with_context(|| format!("open {url}"))?;
        self.status_message = format!("Opened {url}");
        Ok(())
    }

    fn copy_selected(&mut self) -> Result<()> {
        let Some(url) = self.selected_video().and_then(Video::playback_target) else {
            return Ok(());
        };
        let mut clipboard = arboard::Clipboard::new().context("open clipboard")?;
        clipboard
            .set_text(url.clone())
            .context("copy to clipboard")?;
        self.status_message = format!("Copied {url}");
        Ok(())
    }

    fn resolve_channel_thumbnails(&mut self) {
        if let Some(store) = self.thumbnails.as_deref() {
            self.channel_thumbnails.resolve(self.browser.videos(), store);
        }
    }

    fn avatar_spec(&self, video: &Video) -> AvatarSpec {
        AvatarSpec::resolve(
            Some(&video.channel),
            Some(video),
            true,
            &self.accounts.state(),
            self.subscriptions.as_ref(),
            Some(&self.channel_thumbnails),
        )
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(self.theme.bg)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_text = if self.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
                .trim()
                .to_string()
        } else {
            self.status_message.clone()
        };
        let status_line = Paragraph::new(status_text).style(
            Style::default()
                .fg(self.theme.text_primary)
                .bg(self.theme.panel_focused_bg)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        self.draw_toolbar(frame, layout[1]);

        let specs = self.layout_videos(layout[2]);
        if let Some(media) = self.media.as_mut() {
            for (_, spec) in &specs {
                if let Some(url) = spec.thumbnail_url() {
                    media.request(url);
                }
            }
        }
        self.draw_videos(frame, layout[2], &specs);

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(self.theme.text_secondary)
                    .bg(self.theme.panel_bg)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, layout[3]);

        match &self.popup {
            Some(Popup::Countries(picker)) => self.draw_country_picker(frame, layout[2], picker),
            Some(Popup::Categories { selected }) => {
                self.draw_category_picker(frame, layout[2], *selected)
            }
            Some(Popup::Favorites { items, selected }) => {
                self.draw_favorites(frame, layout[2], items, *selected)
            }
            Some(Popup::TrendingMenu { selected }) => {
                self.draw_trending_menu(frame, layout[2], *selected)
            }
            None => {}
        }

        if self.browser.alert().is_some() {
            self.draw_alert(frame, full);
        }
    }

    fn toolbar_block(&self) -> Block<'static> {
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(self.theme.border_idle))
            .style(Style::default().bg(self.theme.panel_bg))
            .padding(Padding::horizontal(1))
    }

    fn favorite_marker(&self) -> &'static str {
        let favorite = self
            .browser
            .favorite_item()
            .map(|item| self.favorites.is_favorite(item))
            .unwrap_or(false);
        if favorite {
            "★"
        } else {
            "☆"
        }
    }

    fn draw_toolbar(&self, frame: &mut Frame<'_>, area: Rect) {
        let accent = Style::default()
            .fg(self.theme.accent)
            .add_modifier(Modifier::BOLD);
        let plain = Style::default().fg(self.theme.text_primary);
        let dim = Style::default().fg(self.theme.text_secondary);
        let country = self.browser.country();
        let category = self.browser.category();
        let categories = self.browser.supports_categories();

        let line = match self.variant {
            Variant::Tv => {
                let mut spans = vec![
                    Span::styled("Trending  ", accent),
                    Span::styled(format!("{}  ", self.favorite_marker()), plain),
                ];
                if categories {
                    spans.push(Span::styled(
                        format!("‹ {} {} ›", category.glyph(), category.control_label()),
                        plain.add_modifier(Modifier::BOLD),
                    ));
                    spans.push(Span::styled("  ", dim));
                }
                spans.push(Span::styled(format!("{} {}", country.flag(), country.name()), plain));
                Line::from(spans).alignment(Alignment::Center)
            }
            Variant::Desktop => {
                let mut spans = vec![
                    Span::styled("Trending", accent),
                    Span::styled("    ", dim),
                    Span::styled(format!("{} Favorite", self.favorite_marker()), plain),
                    Span::styled("  │  ", dim),
                ];
                if categories {
                    spans.push(Span::styled(
                        format!("{} {} ▾", category.glyph(), category.control_label()),
                        plain,
                    ));
                    spans.push(Span::styled("  │  ", dim));
                }
                spans.push(Span::styled(format!("{} {}", country.flag(), country.name()), plain));
                Line::from(spans).alignment(Alignment::Right)
            }
            Variant::Phone => {
                let mut spans = vec![Span::styled(
                    format!("{} {} ▾", country.flag(), country.name()),
                    accent,
                )];
                if categories && category != TrendingCategory::Default {
                    spans.push(Span::styled(format!("  {} {}", category.glyph(), category.name()), dim));
                }
                Line::from(spans).alignment(Alignment::Center)
            }
        };
        frame.render_widget(Paragraph::new(line).block(self.toolbar_block()), area);
    }

    fn layout_videos(&self, area: Rect) -> Vec<(usize, AvatarSpec)> {
        let videos = self.browser.videos();
        if videos.is_empty() || area.height == 0 {
            return Vec::new();
        }
        let cols = grid_columns(area.width, self.variant);
        self.grid_cols.set(cols);

        let range = match self.variant {
            Variant::Tv => {
                let offset = scroll_offset(self.selected, cols, self.scroll.get());
                self.scroll.set(offset);
                offset..(offset + cols).min(videos.len())
            }
            Variant::Phone | Variant::Desktop => {
                let rows = (area.height / CELL_HEIGHT).max(1) as usize;
                let offset = scroll_offset(self.selected / cols, rows, self.scroll.get());
                self.scroll.set(offset);
                let start = offset * cols;
                start..(start + rows * cols).min(videos.len())
            }
        };
        range
            .map(|index| (index, self.avatar_spec(&videos[index])))
            .collect()
    }

    fn draw_videos(&self, frame: &mut Frame<'_>, area: Rect, cells: &[(usize, AvatarSpec)]) {
        frame.render_widget(
            Block::default().style(Style::default().bg(self.theme.bg)),
            area,
        );
        if cells.is_empty() {
            let message = if self.browser.is_loading(&self.cache) {
                "Loading trending videos…"
            } else {
                "No videos to show. Press r to refresh or n to pick another country."
            };
            let empty = Paragraph::new(message)
                .style(Style::default().fg(self.theme.text_secondary))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            frame.render_widget(empty, centered_rect(80, 20, area));
            return;
        }

        let cols = self.grid_cols.get().max(1);
        let videos = self.browser.videos();
        for (position, (index, spec)) in cells.iter().enumerate() {
            let cell = match self.variant {
                Variant::Tv => Rect {
                    x: area.x + position as u16 * TV_CELL_WIDTH,
                    y: area.y + 1,
                    width: TV_CELL_WIDTH.min(area.width),
                    height: TV_CELL_HEIGHT.min(area.height.saturating_sub(1)),
                },
                Variant::Phone | Variant::Desktop => {
                    let width = area.width / cols as u16;
                    Rect {
                        x: area.x + (position % cols) as u16 * width,
                        y: area.y + (position / cols) as u16 * CELL_HEIGHT,
                        width,
                        height: CELL_HEIGHT,
                    }
                }
            };
            if cell.right() > area.right() || cell.bottom() > area.bottom() {
                continue;
            }
            if let Some(video) = videos.get(*index) {
                self.draw_video_cell(frame, cell, video, spec, *index == self.selected);
            }
        }
    }

    fn draw_video_cell(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        video: &Video,
        spec: &AvatarSpec,
        selected: bool,
    ) {
        let background = if selected {
            self.theme.panel_selected_bg
        } else {
            self.theme.panel_bg
        };
        let border = if selected {
            self.theme.border_focused
        } else {
            self.theme.border_idle
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(background));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let avatar_area = Rect {
            x: inner.x,
            y: inner.y,
            width: AVATAR_COLS.min(inner.width),
            height: AVATAR_ROWS.min(inner.height),
        };
        let thumbnail = spec
            .thumbnail_url()
            .and_then(|url| self.media.as_ref().and_then(|media| media.thumbnail(url)));
        let palette = AvatarPalette {
            background: rgb_of(background),
            accent: self.theme.accent,
            secondary: self.theme.text_secondary,
            badge_background: badge_background(self.variant, background),
        };
        frame.render_widget(ChannelAvatar::new(spec, thumbnail, palette), avatar_area);

        let text_area = Rect {
            x: inner.x + AVATAR_COLS + 1,
            y: inner.y,
            width: inner.width.saturating_sub(AVATAR_COLS + 1),
            height: inner.height,
        };
        if text_area.width == 0 {
            return;
        }
        let width = text_area.width as usize;
        let title_style = Style::default()
            .fg(self.theme.text_primary)
            .add_modifier(Modifier::BOLD);
        let dim = Style::default().fg(self.theme.text_secondary);
        let meta_style = if video.live {
            Style::default().fg(self.theme.error)
        } else {
            dim
        };
        let title_lines = if self.variant == Variant::Tv {
            wrap_title(&video.title, width, 2)
        } else {
            vec![truncate_to_width(&video.title, width)]
        };
        let mut lines: Vec<Line<'static>> = title_lines
            .into_iter()
            .map(|line| Line::from(Span::styled(line, title_style)))
            .collect();
        lines.push(Line::from(Span::styled(
            truncate_to_width(video.author(), width),
            dim,
        )));
        lines.push(Line::from(Span::styled(
            truncate_to_width(&video_meta_line(video), width),
            meta_style,
        )));
        frame.render_widget(Paragraph::new(lines), text_area);
    }

    fn popup_block(&self, title: &str) -> Block<'static> {
        Block::default()
            .title(Span::styled(
                title.to_string(),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.accent))
            .style(Style::default().bg(self.theme.panel_bg))
    }

    fn draw_list_popup(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        title: &str,
        items: Vec<ListItem<'static>>,
        selected: usize,
    ) {
        frame.render_widget(Clear, area);
        let list = List::new(items)
            .block(self.popup_block(title))
            .style(Style::default().fg(self.theme.text_primary))
            .highlight_style(
                Style::default()
                    .bg(self.theme.panel_selected_bg)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("› ");
        let mut state = ListState::default();
        state.select(Some(selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_country_picker(&self, frame: &mut Frame<'_>, area: Rect, picker: &CountryPicker) {
        let popup = centered_rect(50, 80, area);
        frame.render_widget(Clear, popup);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(popup);
        let query = Paragraph::new(format!("{}▏", picker.query))
            .style(Style::default().fg(self.theme.text_primary))
            .block(self.popup_block("Country"));
        frame.render_widget(query, chunks[0]);
        let current = self.browser.country();
        let items = picker
            .matches
            .iter()
            .map(|country| {
                let marker = if *country == current { " ✓" } else { "" };
                ListItem::new(format!("{} {}{marker}", country.flag(), country.name()))
            })
            .collect();
        self.draw_list_popup(frame, chunks[1], "", items, picker.selected);
    }

    fn draw_category_picker(&self, frame: &mut Frame<'_>, area: Rect, selected: usize) {
        let popup = centered_rect(40, 40, area);
        let current = self.browser.category();
        let items = TrendingCategory::ALL
            .iter()
            .map(|category| {
                let marker = if *category == current { " ✓" } else { "" };
                ListItem::new(format!("{} {}{marker}", category.glyph(), category.name()))
            })
            .collect();
        self.draw_list_popup(frame, popup, "Category", items, selected);
    }

    fn draw_favorites(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        items: &[FavoriteItem],
        selected: usize,
    ) {
        let popup = centered_rect(60, 60, area);
        let items = items
            .iter()
            .map(|item| ListItem::new(item.section.label()))
            .collect();
        self.draw_list_popup(frame, popup, "Favorites (Enter open · d remove)", items, selected);
    }

    fn draw_trending_menu(&self, frame: &mut Frame<'_>, area: Rect, selected: usize) {
        let popup = centered_rect(60, 40, area);
        let country = self.browser.country();
        let category = self.browser.category();
        let items = self
            .trending_menu_entries()
            .into_iter()
            .map(|entry| match entry {
                MenuEntry::Country => ListItem::new(format!("{} {}", country.flag(), country.name())),
                MenuEntry::Category => ListItem::new(format!(
                    "{} {}",
                    category.glyph(),
                    category.control_label()
                )),
                MenuEntry::Favorite => ListItem::new(format!("{} Favorite", self.favorite_marker())),
            })
            .collect();
        self.draw_list_popup(frame, popup, "Trending", items, selected);
    }

    fn draw_alert(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(alert) = self.browser.alert() else {
            return;
        };
        let popup = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup);
        let body = vec![
            Line::from(Span::styled(
                alert.message.clone(),
                Style::default().fg(self.theme.text_primary),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press Enter to dismiss.",
                Style::default()
                    .fg(self.theme.text_secondary)
                    .add_modifier(Modifier::ITALIC),
            )),
        ];
        let paragraph = Paragraph::new(body)
            .block(
                Block::default()
                    .title(Span::styled(
                        alert.title.clone(),
                        Style::default()
                            .fg(self.theme.error)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.error))
                    .style(Style::default().bg(self.theme.panel_bg))
                    .padding(Padding::uniform(1)),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup);
    }

    fn footer_text(&self) -> String {
        if self.browser.alert().is_some() {
            return "Enter: dismiss".to_string();
        }
        match &self.popup {
            Some(Popup::Countries(_)) => {
                return "type: filter · ↑/↓: move · Enter: choose · Esc: cancel".to_string()
            }
            Some(_) => return "j/k: move · Enter: choose · Esc: close".to_string(),
            None => {}
        }
        let categories = self.browser.supports_categories();
        let mut hints = match self.variant {
            Variant::Phone => vec!["j/k: move", "m: menu", "n: country"],
            Variant::Desktop => vec!["h/j/k/l: move", "n: country"],
            Variant::Tv => vec!["h/l: move", "n: country"],
        };
        if categories {
            hints.push(match self.variant {
                Variant::Tv => "c: next category · C: categories",
                Variant::Phone | Variant::Desktop => "c: category",
            });
        }
        hints.extend([
            "f: favorite",
            "b: favorites",
            "r: refresh",
            "Enter: play",
            "o: open",
            "y: copy",
            "q: quit",
        ]);
        hints.join(" · ")
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use ratatui::backend::TestBackend;

    use super::*;
    use crate::accounts::{Account, Backend};
    use crate::browser::BrowserOptions;
    use crate::data::{MemorySelection, MockTrendingService};
    use crate::storage;
    use crate::video::{self, Channel};

    const TAPES: &str = "UCtapes0000000000000000";

    fn account() -> Account {
        Account {
            name: "home".into(),
            backend: Backend::Invidious,
            url: "https://inv.example".into(),
            token: Some("sid".into()),
        }
    }

    fn model(variant: Variant, store: Arc<Store>) -> Model {
        let mut cache = ResourceCache::new(Arc::new(MockTrendingService), Duration::from_secs(300));
        let browser = Browser::new(
            &mut cache,
            Arc::new(MemorySelection::new(Some(Country::US), None)),
            BrowserOptions {
                preset: video::fixtures(),
                capabilities: Backend::Invidious.capabilities(),
                ..BrowserOptions::default()
            },
        );
        Model::new(Options {
            variant,
            theme: "default".into(),
            browser,
            cache,
            accounts: Arc::new(accounts::Manager::new(vec![account()], "home").unwrap()),
            subscriptions: Arc::new(SubscribedChannels::new(Some(store.clone()))),
            thumbnails: Some(store.clone()),
            favorites: Favorites::new(store),
            media: None,
            player: PlayerConfig::default(),
            status_message: String::new(),
        })
    }

    fn toolbar_text(model: &mut Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| model.draw(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        (1..4)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer.get(x, y).symbol())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[derive(Default)]
    struct CountingCache {
        lookups: RefCell<Vec<String>>,
    }

    impl ChannelThumbnailCache for CountingCache {
        fn cached_thumbnail(&self, channel_id: &str) -> Option<String> {
            self.lookups.borrow_mut().push(channel_id.to_string());
            Some(format!("https://cached.test/{channel_id}"))
        }
    }

    #[test]
    fn channel_thumbnails_are_looked_up_once() {
        let cache = CountingCache::default();
        let videos = video::fixtures();
        let mut resolved = ResolvedThumbnails::default();
        resolved.resolve(&videos, &cache);
        resolved.resolve(&videos, &cache);
        assert_eq!(*cache.lookups.borrow(), [TAPES]);
        assert_eq!(
            resolved.cached_thumbnail(TAPES).as_deref(),
            Some("https://cached.test/UCtapes0000000000000000")
        );
        assert_eq!(resolved.cached_thumbnail("UCferris000000000000000"), None);

        resolved.clear();
        resolved.resolve(&videos, &cache);
        assert_eq!(cache.lookups.borrow().len(), 2);
    }

    #[test]
    fn subscription_refresh_redraws_and_picks_up_thumbnails() {
        let (_dir, store) = storage::open_temp();
        let mut model = model(Variant::Desktop, Arc::new(store));
        assert!(!model.poll_async());
        assert_eq!(model.channel_thumbnails.cached_thumbnail(TAPES), None);

        let tapes = Channel::new(TAPES, "Old Tapes").with_thumbnail("https://t.test/tapes");
        model.subscriptions.replace(&account(), &[tapes]).unwrap();
        assert!(model.poll_async());
        assert_eq!(
            model.channel_thumbnails.cached_thumbnail(TAPES).as_deref(),
            Some("https://t.test/tapes")
        );
        assert!(!model.poll_async());
    }

    #[test]
    fn tv_toolbar_shows_favorite_state() {
        let (_dir, store) = storage::open_temp();
        let mut model = model(Variant::Tv, Arc::new(store));
        let toolbar = toolbar_text(&mut model);
        assert!(toolbar.contains('☆'), "{toolbar}");
        assert!(!toolbar.contains('★'), "{toolbar}");

        model.toggle_favorite().unwrap();
        let toolbar = toolbar_text(&mut model);
        assert!(toolbar.contains('★'), "{toolbar}");
    }

    #[test]
    fn variant_parses_case_insensitively() {
        assert_eq!("TV".parse::<Variant>().unwrap(), Variant::Tv);
        assert_eq!(" phone ".parse::<Variant>().unwrap(), Variant::Phone);
        assert!("watch".parse::<Variant>().is_err());
        assert_eq!(Variant::default().to_string(), "desktop");
    }

    #[test]
    fn badge_background_is_black_on_tv() {
        let panel = Color::Rgb(1, 2, 3);
        assert_eq!(badge_background(Variant::Tv, panel), Color::Black);
        assert_eq!(badge_background(Variant::Desktop, panel), panel);
        assert_eq!(badge_background(Variant::Phone, panel), panel);
    }

    #[test]
    fn formats_view_counts() {
        assert_eq!(format_views(1), "1 view");
        assert_eq!(format_views(999), "999 views");
        assert_eq!(format_views(1_234), "1.2K views");
        assert_eq!(format_views(1_500_000), "1.5M views");
        assert_eq!(format_views(2_000_000_000), "2.0B views");
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(0), "");
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(754), "12:34");
        assert_eq!(format_duration(3723), "1:02:03");
    }

    #[test]
    fn live_videos_say_so() {
        let video = Video {
            live: true,
            length_seconds: 100,
            view_count: 10,
            ..Video::default()
        };
        assert_eq!(video_meta_line(&video), "● LIVE · 10 views");
    }

    #[test]
    fn grid_columns_follow_variant() {
        assert_eq!(grid_columns(200, Variant::Phone), 1);
        assert_eq!(grid_columns(132, Variant::Desktop), 3);
        assert_eq!(grid_columns(10, Variant::Desktop), 1);
        assert_eq!(grid_columns(108, Variant::Tv), 3);
    }

    #[test]
    fn scroll_keeps_selection_visible() {
        assert_eq!(scroll_offset(0, 4, 0), 0);
        assert_eq!(scroll_offset(5, 4, 0), 2);
        assert_eq!(scroll_offset(1, 4, 3), 1);
        assert_eq!(scroll_offset(3, 4, 2), 2);
        assert_eq!(scroll_offset(7, 0, 0), 7);
    }

    #[test]
    fn country_filter_is_fuzzy() {
        assert_eq!(filter_countries("").len(), Country::ALL.len());
        assert_eq!(filter_countries("germ").first(), Some(&Country::DE));
        assert!(filter_countries("zzzz").is_empty());
    }

    #[test]
    fn tv_titles_wrap_to_two_lines() {
        assert_eq!(wrap_title("short", 20, 2), ["short"]);
        let lines = wrap_title("one two three four five six", 9, 2);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "one two");
        assert!(lines[1].ends_with('…'));
    }

    #[test]
    fn truncation_respects_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("a long title", 6), "a lon…");
    }
}
