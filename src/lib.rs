#![allow(clippy::uninlined_format_args)]

pub mod accounts;
pub mod app;
pub mod avatar;
pub mod browser;
pub mod config;
pub mod data;
pub mod favorites;
pub mod invidious;
pub mod media;
pub mod piped;
pub mod player;
pub mod resource;
pub mod storage;
pub mod subscriptions;
pub mod trending;
pub mod ui;
pub mod video;

#[cfg(test)]
mod testing;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
