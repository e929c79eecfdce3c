use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;

use crate::browser::{BrowserOptions, DEFAULT_BASE_URL};
use crate::history::BackPolicy;
use crate::listing::SortCriterion;
use crate::protocol::ROOT_PATH;

/// Bulk folder downloads wait longer than the generic ad hoc default.
pub const FOLDER_FETCH_TIMEOUT: Duration = Duration::from_millis(15_000);

const LOG_FILE_PREFIX: &str = "rexplorer.log";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub base_url: String,
    pub fetch_timeout: Duration,
    pub back_policy: BackPolicy,
    pub sort: SortCriterion,
    pub root: String,
    pub debug: bool,
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8888".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            fetch_timeout: FOLDER_FETCH_TIMEOUT,
            back_policy: BackPolicy::default(),
            sort: SortCriterion::default(),
            root: ROOT_PATH.to_string(),
            debug: false,
            log_dir: default_log_dir(),
        }
    }
}

impl Config {
    /// Build from the `connect` subcommand's matches.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let mut config = Self {
            debug: matches.get_flag("debug"),
            ..Self::default()
        };

        config.server_addr = matches
            .get_one::<String>("ADDR")
            .cloned()
            .context("server address is required")?;
        if let Some(base_url) = matches.get_one::<String>("base-url") {
            config.base_url.clone_from(base_url);
        }
        if let Some(ms) = matches.get_one::<u64>("timeout") {
            config.fetch_timeout = Duration::from_millis(*ms);
        }
        if let Some(policy) = matches.get_one::<String>("back-policy") {
            config.back_policy = policy.parse().map_err(|e: String| anyhow!(e))?;
        }
        if let Some(sort) = matches.get_one::<String>("sort") {
            config.sort = sort.parse().map_err(|e: String| anyhow!(e))?;
        }
        if let Some(root) = matches.get_one::<String>("root") {
            config.root.clone_from(root);
        }
        Ok(config)
    }

    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            base_url: self.base_url.clone(),
            fetch_timeout: self.fetch_timeout,
            back_policy: self.back_policy,
            sort: self.sort,
        }
    }

    pub fn log_file_prefix(&self) -> &'static str {
        LOG_FILE_PREFIX
    }
}

fn default_log_dir() -> PathBuf {
    dirs_next::data_local_dir()
        .map(|dir| dir.join("rexplorer"))
        .unwrap_or_else(|| std::env::temp_dir().join("rexplorer"))
}
