use crate::error::AppResult;
use config::{Config, Environment as ConfigEnv, File as ConfigFile};
use duration_str::deserialize_duration;
use serde::{Deserialize, Serialize};
use std::{default::Default, time::Duration};

mod file_content;

pub use file_content::FileContent;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_PORT: u16 = 443;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GlobalConfig {
    #[serde(default = "default_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,

    #[serde(default = "default_port")]
    pub default_port: u16,

    #[serde(default = "default_sni_fallback")]
    pub sni_fallback: bool,

    /// Trusted root bundle. The platform store is used when unset.
    #[serde(default)]
    pub trust_bundle: Option<FileContent>,
}

impl GlobalConfig {
    pub fn load_config() -> AppResult<Self> {
        let cfg = Config::builder()
            .add_source(ConfigFile::with_name("/etc/cert-chain-tree/config").required(false))
            .add_source(ConfigFile::with_name("config").required(false))
            .add_source(ConfigEnv::with_prefix("CCTREE").prefix_separator("_").separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(cfg)
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            default_port: default_port(),
            sni_fallback: default_sni_fallback(),
            trust_bundle: Default::default(),
        }
    }
}

const fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

const fn default_sni_fallback() -> bool {
    true
}
