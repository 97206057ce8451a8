use std::fs::OpenOptions;
use std::io::Write;

use anyhow::Context;
use chrono::Local;
use env_logger::{Builder, Env, Target};
use log::{warn, Level, LevelFilter, Record};

use crate::config::settings::LogSettings;

/// Set up the process logger
///
/// Without a log file, records at `console` level and above go to stderr. With a log file, the
/// file gets everything from info up and records at `console` level and above are echoed to
/// stderr as well. `RUST_LOG` still wins when it is set.
pub fn init(settings: &LogSettings, console: LevelFilter) -> anyhow::Result<()> {
    let mut builder = Builder::new();

    let mut log_existed = false;
    match &settings.log_filename {
        None => {
            builder
                .filter_level(console)
                .format(|buf, record| writeln!(buf, "{}", format_line(record)));
        }
        Some(path) => {
            log_existed = path.exists();
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Can't open log file {}", path.display()))?;
            builder
                .filter_level(file_level(console))
                .format(move |buf, record| {
                    let line = format_line(record);
                    if echoes_to_console(record.level(), console) {
                        eprintln!("{line}");
                    }
                    writeln!(buf, "{line}")
                })
                .target(Target::Pipe(Box::new(file)));
        }
    }
    builder.parse_env(Env::default());
    builder.try_init().context("Logger already initialised")?;

    if let (true, Some(path)) = (log_existed, &settings.log_filename) {
        warn!("A log file {} already exists. Appending.", path.display());
    }
    Ok(())
}

/// The log file never drops below info, a chattier console raises it
fn file_level(console: LevelFilter) -> LevelFilter {
    console.max(LevelFilter::Info)
}

fn echoes_to_console(level: Level, console: LevelFilter) -> bool {
    level <= console
}

/// `<time> - <target> - <LEVEL> - <message>`
fn format_line(record: &Record) -> String {
    format!(
        "{} - {} - {} - {}",
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        record.target(),
        record.level(),
        record.args()
    )
}
