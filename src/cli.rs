use crate::{configs::GlobalConfig, types::Target};
use clap::{ArgGroup, Parser};
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Parser)]
#[command(
    version,
    about = "Show the issuance tree of a certificate chain and check it against a root store",
    group(ArgGroup::new("source").required(true).args(["target", "file"]))
)]
pub struct Cli {
    /// Server to fetch the chain from, as host[:port]
    pub target: Option<Target>,

    /// Read the chain from a PEM bundle instead of connecting
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// PEM bundle of trusted roots (defaults to the platform store)
    #[arg(long, value_name = "FILE")]
    pub roots: Option<PathBuf>,

    /// Connect and handshake timeout, e.g. 5s or 1m
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Do not retry without SNI when the first handshake fails
    #[arg(long)]
    pub no_sni_fallback: bool,

    /// Print every certificate in PEM form before the tree
    #[arg(long)]
    pub show_pem: bool,
}

impl Cli {
    /// Command line flags win over the configuration files.
    pub fn apply_to(&self, config: &mut GlobalConfig) {
        if let Some(roots) = &self.roots {
            config.trust_bundle = Some(roots.clone().into());
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if self.no_sni_fallback {
            config.sni_fallback = false;
        }
    }
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    duration_str::parse(s).map_err(|e| e.to_string())
}
