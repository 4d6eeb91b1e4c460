// Runtime configuration: where the catalog lives, how tokens are issued,
// where the host CLI keeps its files and how status polling behaves.

use std::path::PathBuf;
use std::time::Duration;

use crate::poller::PollPolicy;

pub const DEFAULT_CATALOG_URL: &str =
    "https://predix-analytics-catalog-release.run.aws-usw02-pr.ice.predix.io";

/// `{guid}` is replaced with the identity service instance id.
pub const DEFAULT_TOKEN_URL: &str =
    "https://{guid}.predix-uaa.run.aws-usw02-pr.ice.predix.io/oauth/token";

const STATE_FILE_NAME: &str = "cf_predix_analytics_plugin";

#[derive(Debug, Clone)]
pub struct Config {
    pub catalog_url: String,
    pub token_url_template: String,
    /// Directory holding the host CLI's `.cf` folder.
    pub cf_home: PathBuf,
    pub http_timeout: Option<Duration>,
    pub poll: PollPolicy,
}

impl Config {
    pub fn new(cf_home: Option<PathBuf>) -> Self {
        Config {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            token_url_template: DEFAULT_TOKEN_URL.to_string(),
            cf_home: cf_home.unwrap_or_else(default_cf_home),
            http_timeout: None,
            poll: PollPolicy::default(),
        }
    }

    /// The host CLI's own config file.
    pub fn cf_config_file(&self) -> PathBuf {
        self.cf_home.join(".cf").join("config.json")
    }

    /// Session state lives next to the host config file.
    pub fn state_file(&self) -> PathBuf {
        self.cf_home.join(".cf").join(STATE_FILE_NAME)
    }
}

fn default_cf_home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}
