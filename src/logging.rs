//! Process-wide tracing setup.
//!
//! Always logs to stdout; optionally tees into a rolling file under
//! `logging.dir`. Level precedence: config `logging.level` > `RUST_LOG` >
//! "info".

use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LoggingConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

pub fn init_with_config(cfg: &LoggingConfig) {
    let filter = match &cfg.level {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let mut layers: Vec<BoxedLayer> = vec![stdout_layer(cfg.format)];
    if cfg.enable_file_logging {
        if let Some(layer) = file_layer(cfg) {
            layers.push(layer);
        }
    }

    // try_init so repeated calls (tests, embedding) are harmless.
    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();
}

fn stdout_layer(format: LogFormat) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer().with_timer(UtcTime::rfc_3339());
    match format {
        LogFormat::Json => layer
            .json()
            .with_ansi(false)
            .with_writer(std::io::stdout)
            .boxed(),
        LogFormat::Text => layer.with_ansi(true).with_writer(std::io::stdout).boxed(),
    }
}

fn file_layer(cfg: &LoggingConfig) -> Option<BoxedLayer> {
    if std::fs::create_dir_all(&cfg.dir).is_err() {
        eprintln!(
            "Failed to create log directory '{}', continuing with stdout logs",
            cfg.dir
        );
        return None;
    }

    let appender = tracing_appender::rolling::RollingFileAppender::new(
        parse_rotation(&cfg.rotation),
        &cfg.dir,
        &cfg.filename,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);

    // Keep the worker guard alive for the process lifetime.
    let _leaked: &'static _ = Box::leak(Box::new(guard));

    let layer = tracing_subscriber::fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(false)
        .with_writer(writer);
    Some(match cfg.format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Text => layer.boxed(),
    })
}

fn parse_rotation(raw: &str) -> tracing_appender::rolling::Rotation {
    match raw.to_lowercase().as_str() {
        "hourly" => tracing_appender::rolling::Rotation::HOURLY,
        "never" => tracing_appender::rolling::Rotation::NEVER,
        _ => tracing_appender::rolling::Rotation::DAILY,
    }
}
