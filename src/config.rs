use crate::api::{MAX_ITEM_PAGE, MAX_PLAYLIST_PAGE, MAX_TRACK_LOOKUP, MAX_WRITE_BATCH};
use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    // Per-request sizes; each must stay within the remote ceiling.
    #[serde(default = "default_playlist_page_limit")]
    pub playlist_page_limit: u32,
    #[serde(default = "default_item_page_limit")]
    pub item_page_limit: u32,
    #[serde(default = "default_metadata_batch_size")]
    pub metadata_batch_size: usize,
    #[serde(default = "default_write_batch_size")]
    pub write_batch_size: usize,
}

/// Page and batch sizes the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub playlist_page: u32,
    pub item_page: u32,
    pub metadata_batch: usize,
    pub write_batch: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            playlist_page: MAX_PLAYLIST_PAGE,
            item_page: MAX_ITEM_PAGE,
            metadata_batch: MAX_TRACK_LOOKUP,
            write_batch: MAX_WRITE_BATCH,
        }
    }
}

fn default_api_base() -> String { crate::api::spotify::default_api_base() }
fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("playlist-reorder").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}
fn default_request_timeout() -> u64 { 30 }
fn default_playlist_page_limit() -> u32 { MAX_PLAYLIST_PAGE }
fn default_item_page_limit() -> u32 { MAX_ITEM_PAGE }
fn default_metadata_batch_size() -> usize { MAX_TRACK_LOOKUP }
fn default_write_batch_size() -> usize { MAX_WRITE_BATCH }

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            log_dir: default_log_dir(),
            request_timeout_secs: default_request_timeout(),
            playlist_page_limit: default_playlist_page_limit(),
            item_page_limit: default_item_page_limit(),
            metadata_batch_size: default_metadata_batch_size(),
            write_batch_size: default_write_batch_size(),
        }
    }
}

impl Config {
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `--config` if given, else the per-user config file if present, else defaults.
    pub fn resolve(explicit: Option<&std::path::Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(p) = explicit {
            return Ok((Self::from_path(p)?, Some(p.to_path_buf())));
        }
        if let Some(p) = default_config_path().filter(|p| p.exists()) {
            return Ok((Self::from_path(&p)?, Some(p)));
        }
        Ok((Self::default(), None))
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() {
            bail!("api_base must not be empty");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be positive");
        }
        check_range("playlist_page_limit", self.playlist_page_limit as usize, MAX_PLAYLIST_PAGE as usize)?;
        check_range("item_page_limit", self.item_page_limit as usize, MAX_ITEM_PAGE as usize)?;
        check_range("metadata_batch_size", self.metadata_batch_size, MAX_TRACK_LOOKUP)?;
        check_range("write_batch_size", self.write_batch_size, MAX_WRITE_BATCH)?;
        Ok(())
    }

    pub fn limits(&self) -> Limits {
        Limits {
            playlist_page: self.playlist_page_limit,
            item_page: self.item_page_limit,
            metadata_batch: self.metadata_batch_size,
            write_batch: self.write_batch_size,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn check_range(field: &str, value: usize, ceiling: usize) -> Result<()> {
    if value == 0 || value > ceiling {
        bail!("{} must be between 1 and {}, got {}", field, ceiling, value);
    }
    Ok(())
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("playlist-reorder").join("config.toml"))
}
