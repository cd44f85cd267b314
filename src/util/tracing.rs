//! Logging setup for applications embedding the chunking and index modules

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::Subscriber;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::{EnvFilter, filter, prelude::*};

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub app_name: Option<String>,
    pub level: Option<String>,
    pub file_name: Option<String>,
    pub file_dir: Option<String>,
    #[serde(default)]
    pub use_json: bool,
    #[serde(default = "default_use_stdout")]
    pub use_stdout: bool,
}

fn default_use_stdout() -> bool {
    true
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self {
            app_name: None,
            level: None,
            file_name: None,
            file_dir: None,
            use_json: false,
            use_stdout: true,
        }
    }

    /// Configured level, INFO when unset or unparsable
    pub fn level(&self) -> tracing::Level {
        self.level
            .as_deref()
            .and_then(|lv| tracing::Level::from_str(lv).ok())
            .unwrap_or(tracing::Level::INFO)
    }

    fn log_file(&self) -> Result<Option<File>> {
        let Some(file_name) = self.file_name.as_deref() else {
            return Ok(None);
        };
        let dir = match self.file_dir.as_deref() {
            Some(d) => PathBuf::from(d),
            None => env::current_dir().context("cannot resolve current directory")?,
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create log file directory: {:?}", dir.as_os_str()))?;
        let path = dir.join(file_name);
        let file = File::create(&path)
            .with_context(|| format!("create log file to {:?}", path.as_os_str()))?;
        Ok(Some(file))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_tracing_config_from_env() -> Result<LoggingConfig> {
    envy::prefixed("LOG_")
        .from_env::<LoggingConfig>()
        .context("cannot read logging config from env:")
}

pub fn tracing_init(conf: LoggingConfig) -> Result<()> {
    let layer = setup_layer_from_logging_config(&conf)?;
    tracing::subscriber::set_global_default(layer).context("setting default subscriber failed")?;
    tracing::debug!(
        "logging initialized: level={}, json={}",
        conf.level(),
        conf.use_json
    );
    Ok(())
}

pub fn tracing_init_from_env() -> Result<()> {
    match load_tracing_config_from_env() {
        Ok(conf) => tracing_init(conf),
        Err(e) => {
            tracing::warn!("failed to load logging config from env: {:?}", e);
            Err(e)
        }
    }
}

pub fn setup_layer_from_logging_config(
    conf: &LoggingConfig,
) -> Result<Box<dyn Subscriber + Send + Sync + 'static>> {
    let lv = conf.level();
    let filter = filter::Targets::new().with_default(lv);
    // RUST_LOG directives, falling back to the configured level
    let env_filter = EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::from_level(lv).into())
        .from_env_lossy();
    let log_file = conf.log_file()?.map(Arc::new);

    let subscriber = Box::new(
        tracing_subscriber::registry()
            .with(filter)
            .with(env_filter)
            .with(match log_file.clone() {
                Some(f) if conf.use_json => Some(
                    Layer::new()
                        .with_writer(f.with_max_level(lv))
                        .with_ansi(false)
                        .json(),
                ),
                _ => None,
            })
            .with(match log_file {
                Some(f) if !conf.use_json => Some(
                    Layer::new()
                        .with_writer(f.with_max_level(lv))
                        .with_ansi(false),
                ),
                _ => None,
            })
            .with(if !conf.use_json && conf.use_stdout {
                Some(tracing_subscriber::fmt::layer().pretty())
            } else {
                None
            })
            .with(if conf.use_json && conf.use_stdout {
                Some(tracing_subscriber::fmt::layer().json())
            } else {
                None
            }),
    );
    Ok(subscriber)
}

// for simple stdout logging
pub fn tracing_init_test(level: tracing::Level) {
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
}
