//! Process-wide `tracing` setup.
//!
//! [`LogSettings`] is the `log:` section of the client configuration and
//! [`init_logging`] turns it into a subscriber: an `EnvFilter`, a daily
//! rolling file and, on request, a copy of every event on stderr.

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Deserializer};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Consulted when the settings carry no explicit directory.
pub const LOG_DIR_ENV: &str = "SERPAPI_LOG_DIR";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogSettings {
    #[serde(default)]
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default, deserialize_with = "bool_from_bool_or_string")]
    pub stderr: bool,
    /// `~` and `$VAR` are expanded.
    #[serde(default)]
    pub dir: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: default_filter(),
            stderr: false,
            dir: None,
        }
    }
}

impl LogSettings {
    /// Directory the rolling file lives in: `dir`, then `SERPAPI_LOG_DIR`,
    /// then `~/.local/share/<app_name>`.
    pub fn resolve_dir(&self, app_name: &str) -> PathBuf {
        let raw = self
            .dir
            .clone()
            .or_else(|| std::env::var(LOG_DIR_ENV).ok().filter(|d| !d.trim().is_empty()))
            .unwrap_or_else(|| format!("~/.local/share/{app_name}"));
        let expanded = shellexpand::full(&raw).map(|c| c.into_owned()).unwrap_or(raw);
        PathBuf::from(expanded)
    }
}

fn default_filter() -> String {
    "info".into()
}

// Environment overlays deliver booleans as strings.
fn bool_from_bool_or_string<'de, D>(de: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Str(String),
    }
    match Raw::deserialize(de)? {
        Raw::Bool(b) => Ok(b),
        Raw::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected a boolean, got {other:?}"
            ))),
        },
    }
}

fn sink<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(ansi).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}

/// Install the global subscriber and return today's log file path.
///
/// Only the first call installs anything; later calls return the path
/// resolved by the first one.
pub fn init_logging(app_name: &str, settings: &LogSettings) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let dir = settings.resolve_dir(app_name);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let file_prefix = format!("{app_name}.log");
    // tracing-appender stamps daily files with the UTC date.
    let path = dir.join(format!("{file_prefix}.{}", Utc::now().format("%Y-%m-%d")));

    let appender = tracing_appender::rolling::daily(&dir, &file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let mut layers = vec![sink(settings.format, writer, false)];
    if settings.stderr {
        layers.push(sink(settings.format, std::io::stderr, true));
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.filter));

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let _ = LOG_GUARD.set(guard);
    Ok(LOG_PATH.get_or_init(|| path).clone())
}
