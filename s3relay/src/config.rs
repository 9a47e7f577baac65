//! Configuration management
//!
//! Front-end settings only. Storage credentials always come from the option
//! bag of each action, never from here.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Pretty-print JSON results
    #[serde(default)]
    pub pretty: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            pretty: false,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Settings {
    /// Load settings from a file and the `S3RELAY_` environment
    ///
    /// Without an explicit path, `s3relay.toml` in the working directory is
    /// used when present.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("s3relay").required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix("S3RELAY"))
            .build()?;

        Ok(config.try_deserialize::<Settings>()?)
    }
}
