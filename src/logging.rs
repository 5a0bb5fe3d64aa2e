use crate::wr::config::LogConfig;
use anyhow::{Context, Result};
use chrono::Utc;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;

/// Installs the process logger. `RUST_LOG` still wins over `log.debug`.
/// Safe to call more than once; later calls are ignored.
pub fn init(cfg: &LogConfig) -> Result<()> {
    let mut builder = Builder::new();
    builder
        .filter_level(if cfg.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                Utc::now().format("%Y-%m-%d %H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });

    match cfg.file.as_deref() {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {path}"))?;
            builder.target(Target::Pipe(Box::new(file)));
        }
        None => {
            builder.target(Target::Stderr);
        }
    }

    let _ = builder.try_init();
    Ok(())
}
