use std::process::{Command, Stdio};
use std::thread;

use anyhow::{anyhow, Context, Result};

use crate::config::PlayerConfig;

const URL_PLACEHOLDER: &str = "%URL%";
const TITLE_PLACEHOLDER: &str = "%TITLE%";

pub struct LaunchOptions<'a> {
    pub target: &'a str,
    pub title: &'a str,
}

/// Substitutes the playback target and title into the configured command.
/// A template without `%URL%` gets the target appended as its last argument.
pub fn expand_args(template: &[String], target: &str, title: &str) -> Vec<String> {
    let mut saw_url = false;
    let mut args: Vec<String> = template
        .iter()
        .map(|arg| {
            if arg.contains(URL_PLACEHOLDER) {
                saw_url = true;
            }
            arg.replace(URL_PLACEHOLDER, target)
                .replace(TITLE_PLACEHOLDER, title)
        })
        .collect();
    if !saw_url {
        args.push(target.to_string());
    }
    args
}

pub fn spawn(cfg: &PlayerConfig, opts: LaunchOptions<'_>) -> Result<()> {
    if opts.target.trim().is_empty() {
        return Err(anyhow!("video playback target missing"));
    }
    let args = expand_args(&cfg.video_command, opts.target, opts.title);
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("player: video_command is empty"))?;

    let mut command = Command::new(program);
    command.args(rest);
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());
    let mut child = command
        .spawn()
        .with_context(|| format!("launch {program} for {}", opts.target))?;
    log::info!("player: launched {program} for {}", opts.target);

    if !cfg.video_detach {
        let program = program.clone();
        thread::spawn(move || match child.wait() {
            Ok(status) if !status.success() => {
                log::warn!("player: {program} exited with {status}");
            }
            Ok(_) => {}
            Err(err) => log::warn!("player: waiting for {program} failed: {err}"),
        });
    }
    Ok(())
}
