use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

use crate::models::RegionPolicy;
use crate::services::ruleset::{Ruleset, RulesetError};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Source
    pub source_url: String,
    pub fetch_timeout_ms: u64,
    pub max_retries: u32,
    pub max_playlist_size_mb: usize,
    pub user_agent: String,

    // Rewriting
    pub multicast_scheme: String,
    pub proxy_base: String,
    pub proxy_path: String,

    // Output
    pub logo_template: String,
    pub epg_url: Option<String>,
    pub output_dir: PathBuf,
    pub annotated_output: String,
    pub grouped_output: String,
    pub passthrough_output: Option<String>,

    // Rules
    pub region_policy: Option<RegionPolicy>,
    pub ruleset_path: Option<PathBuf>,
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            // Source
            source_url: env::var("SOURCE_URL").unwrap_or_else(|_| {
                "https://raw.githubusercontent.com/Tzwcard/ChinaTelecom-GuangdongIPTV-RTP-List/refs/heads/master/GuangdongIPTV_rtp_all.m3u"
                    .to_string()
            }),
            fetch_timeout_ms: env::var("FETCH_TIMEOUT_MS")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()
                .unwrap_or(30_000), // 30 seconds
            max_retries: env::var("MAX_RETRIES")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap_or(2),
            max_playlist_size_mb: env::var("MAX_PLAYLIST_SIZE_MB")
                .unwrap_or_else(|_| "32".to_string())
                .parse()
                .unwrap_or(32),
            user_agent: env::var("USER_AGENT")
                .unwrap_or_else(|_| "VLC/3.0.20 LibVLC/3.0.20".to_string()),

            // Rewriting
            multicast_scheme: env::var("MULTICAST_SCHEME").unwrap_or_else(|_| "rtp://".to_string()),
            proxy_base: env::var("PROXY_BASE")
                .unwrap_or_else(|_| "http://10.109.60.250:4022".to_string()),
            proxy_path: env::var("PROXY_PATH").unwrap_or_else(|_| "udp".to_string()),

            // Output
            logo_template: env::var("LOGO_TEMPLATE")
                .unwrap_or_else(|_| "https://live.fanmingming.com/tv/{id}.png".to_string()),
            epg_url: non_empty("EPG_URL"),
            output_dir: PathBuf::from(env::var("OUTPUT_DIR").unwrap_or_else(|_| ".".to_string())),
            annotated_output: env::var("ANNOTATED_OUTPUT").unwrap_or_else(|_| "iptv.m3u".to_string()),
            grouped_output: env::var("GROUPED_OUTPUT").unwrap_or_else(|_| "iptv.txt".to_string()),
            passthrough_output: non_empty("PASSTHROUGH_OUTPUT"),

            // Rules
            region_policy: non_empty("REGION_POLICY").and_then(|v| match v.parse() {
                Ok(policy) => Some(policy),
                Err(e) => {
                    tracing::warn!("Ignoring REGION_POLICY: {}", e);
                    None
                }
            }),
            ruleset_path: non_empty("RULESET_PATH").map(PathBuf::from),
        }
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        let proxy = url::Url::parse(&self.proxy_base)
            .with_context(|| format!("Invalid PROXY_BASE: {}", self.proxy_base))?;
        if proxy.scheme() != "http" && proxy.scheme() != "https" {
            bail!("PROXY_BASE must be an http(s) URL, got {}", self.proxy_base);
        }
        if proxy.host_str().is_none() {
            bail!("PROXY_BASE has no host: {}", self.proxy_base);
        }

        if !self.multicast_scheme.ends_with("://") {
            bail!("MULTICAST_SCHEME must look like 'rtp://', got {}", self.multicast_scheme);
        }

        url::Url::parse(&self.source_url)
            .with_context(|| format!("Invalid SOURCE_URL: {}", self.source_url))?;

        if self.annotated_output.trim().is_empty() || self.grouped_output.trim().is_empty() {
            bail!("Output file names must not be empty");
        }

        Ok(())
    }

    /// Built-in ruleset, or the JSON file at RULESET_PATH, with REGION_POLICY applied
    pub fn load_ruleset(&self) -> Result<Ruleset, RulesetError> {
        let ruleset = match &self.ruleset_path {
            Some(path) => Ruleset::from_path(path)?,
            None => Ruleset::default(),
        };

        Ok(match self.region_policy {
            Some(policy) => ruleset.with_region_policy(policy),
            None => ruleset,
        })
    }

    pub fn annotated_path(&self) -> PathBuf {
        self.output_dir.join(&self.annotated_output)
    }

    pub fn grouped_path(&self) -> PathBuf {
        self.output_dir.join(&self.grouped_output)
    }

    pub fn passthrough_path(&self) -> Option<PathBuf> {
        self.passthrough_output.as_ref().map(|name| self.output_dir.join(name))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
