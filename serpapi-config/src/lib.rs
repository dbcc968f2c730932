//! Loader for client configuration with YAML + environment overlays.
//!
//! Precedence, lowest to highest: built-in defaults, files and inline
//! snippets (in the order they were attached), then `SERPAPI_`-prefixed
//! environment variables. `${VAR}` placeholders inside any string value are
//! expanded after merging.
//!
//! Recognised keys:
//!
//! | key            | env                     | default               |
//! |----------------|-------------------------|-----------------------|
//! | `api_key`      | `SERPAPI_API_KEY`       | `""`                  |
//! | `base_url`     | `SERPAPI_BASE_URL`      | `https://serpapi.com` |
//! | `timeout_secs` | `SERPAPI_TIMEOUT_SECS`  | `60`                  |
//! | `log.format`   | `SERPAPI_LOG__FORMAT`   | `text`                |
//! | `log.filter`   | `SERPAPI_LOG__FILTER`   | `info`                |
//! | `log.stderr`   | `SERPAPI_LOG__STDERR`   | `false`               |
//! | `log.dir`      | `SERPAPI_LOG__DIR`      | unset                 |
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

pub use serpapi_common::observability::{LogFormat, LogSettings};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "SERPAPI";

pub const DEFAULT_BASE_URL: &str = "https://serpapi.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct SerpApiConfig {
    /// Sent as the `api_key` query parameter. When empty, a caller-supplied
    /// `api_key` parameter is forwarded instead.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(
        default = "default_timeout_secs",
        deserialize_with = "u64_from_number_or_string"
    )]
    pub timeout_secs: u64,
    #[serde(default)]
    pub log: LogSettings,
}

impl Default for SerpApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            log: LogSettings::default(),
        }
    }
}

impl SerpApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reject values that would only fail later, at request time.
    ///
    /// ```
    /// use serpapi_config::SerpApiConfig;
    ///
    /// let mut cfg = SerpApiConfig::default();
    /// assert!(cfg.validate().is_ok());
    ///
    /// cfg.base_url = "not a url".into();
    /// assert!(cfg.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            ConfigError::Message(format!("base_url {:?} is not a URL: {e}", self.base_url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Message(format!(
                "base_url must use http or https, got {:?}",
                parsed.scheme()
            )));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

// Environment overlays arrive as strings; files may carry native types.
fn u64_from_number_or_string<'de, D>(de: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }
    match Raw::deserialize(de)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (files + env overrides).
pub struct SerpApiConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    use_env: bool,
}

impl Default for SerpApiConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SerpApiConfigLoader {
    /// Start with defaults only; `SERPAPI_` env overrides are applied last.
    ///
    /// ```
    /// use serpapi_config::SerpApiConfigLoader;
    ///
    /// let config = SerpApiConfigLoader::new()
    ///     .without_env()
    ///     .with_yaml_str("api_key: 'abc'\ntimeout_secs: 5")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.api_key, "abc");
    /// assert_eq!(config.timeout_secs, 5);
    /// assert_eq!(config.base_url, "https://serpapi.com");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            use_env: true,
        }
    }

    /// Ignore process environment (useful for deterministic tests).
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// ```
    /// use serpapi_config::SerpApiConfigLoader;
    ///
    /// unsafe { std::env::set_var("VAULT_SERPAPI_KEY", "from-vault"); }
    ///
    /// let config = SerpApiConfigLoader::new()
    ///     .without_env()
    ///     .with_yaml_str(r#"api_key: "${VAULT_SERPAPI_KEY}""#)
    ///     .load()
    ///     .unwrap();
    /// assert_eq!(config.api_key, "from-vault");
    ///
    /// unsafe { std::env::remove_var("VAULT_SERPAPI_KEY"); }
    /// ```
    pub fn load(self) -> Result<SerpApiConfig, ConfigError> {
        let mut builder = self.builder;
        if self.use_env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true),
            );
        }
        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: SerpApiConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.validate()?;
        Ok(typed)
    }
}
