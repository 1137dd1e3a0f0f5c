use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use env_logger::{Builder, Target};
use log::LevelFilter;
use trend_tui::app::RunOptions;
use trend_tui::ui::Variant;

const LOG_FILE: &str = "trend-tui.log";

const HELP: &str = "TREND-TUI - Browse trending videos from the terminal.

  --version, -V             Show version and exit
  --help,    -h             Show this help message
  --config <path>           Read configuration from <path>
  --variant <phone|desktop|tv>
                            Choose the screen layout
  --demo                    Browse bundled sample videos offline
  --preset <file.json>      Show the videos listed in a JSON file";

enum Command {
    Exit,
    Run(RunOptions),
}

fn main() {
    let command = match parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("error: {err}\n\n{HELP}");
            std::process::exit(2);
        }
    };
    let Command::Run(opts) = command else {
        return;
    };

    init_logger();
    if let Err(err) = trend_tui::run(opts) {
        log::error!("{err:#}");
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args(args: impl Iterator<Item = String>) -> anyhow::Result<Command> {
    let mut opts = RunOptions::default();
    let mut args = args.peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("TREND-TUI {}", trend_tui::VERSION);
                return Ok(Command::Exit);
            }
            "--help" | "-h" => {
                println!("{HELP}");
                return Ok(Command::Exit);
            }
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config needs a path"))?;
                opts.config_file = Some(PathBuf::from(path));
            }
            "--variant" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--variant needs a value"))?;
                opts.variant = Some(value.parse::<Variant>()?);
            }
            "--preset" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--preset needs a file"))?;
                opts.preset = Some(PathBuf::from(path));
            }
            "--demo" => opts.demo = true,
            other => anyhow::bail!("unknown argument {other:?}"),
        }
    }
    Ok(Command::Run(opts))
}

fn init_logger() {
    let mut builder = Builder::new();
    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder
            .filter_level(LevelFilter::Warn)
            .filter_module("trend_tui", LevelFilter::Info);
    }

    let file = dirs::cache_dir()
        .map(|dir| dir.join("trend-tui"))
        .and_then(|dir| fs::create_dir_all(&dir).ok().map(|_| dir.join(LOG_FILE)))
        .and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok());
    match file {
        Some(file) => {
            builder.target(Target::Pipe(Box::new(file)));
        }
        None => {
            builder.filter_level(LevelFilter::Off);
        }
    }
    let _ = builder.try_init();
}
