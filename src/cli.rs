// Command line surface. Subcommand names follow the cf plugin verbs users
// already know (`analytics`, `create-analytic`, ...).

use clap::{Args, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::DeploymentConfig;
use crate::config::{Config, DEFAULT_CATALOG_URL, DEFAULT_TOKEN_URL};
use crate::poller::PollPolicy;

#[derive(Parser, Debug)]
#[command(name = "analytics")]
#[command(about = "Manage analytics in the Predix analytics catalog", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Deploy flags the cf plugin spelled with a single dash.
const SINGLE_DASH_FLAGS: [&str; 3] = ["memory", "diskQuota", "instances"];

/// Rewrite `-memory 2048` style flags after `deploy-analytic` to their
/// double-dash form. Everything else passes through untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut deploying = false;
    args.into_iter()
        .map(|arg| {
            let arg: OsString = arg.into();
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "deploy-analytic" {
                deploying = true;
                return arg;
            }
            let single_dash = text
                .strip_prefix('-')
                .map(|flag| flag.split('=').next().unwrap_or(flag))
                .is_some_and(|name| SINGLE_DASH_FLAGS.contains(&name));
            if deploying && single_dash {
                return OsString::from(format!("-{}", text));
            }
            arg
        })
        .collect()
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Base URL of the analytics catalog
    #[arg(long, global = true, env = "ANALYTICS_CATALOG_URL", default_value = DEFAULT_CATALOG_URL)]
    pub catalog_url: String,

    /// Token endpoint; `{guid}` is replaced with the UAA instance id
    #[arg(long, global = true, env = "ANALYTICS_TOKEN_URL", default_value = DEFAULT_TOKEN_URL)]
    pub token_url: String,

    /// Directory containing the cf CLI `.cf` folder
    #[arg(long, global = true, env = "CF_HOME")]
    pub cf_home: Option<PathBuf>,

    /// HTTP timeout in seconds (no timeout when omitted)
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Delay between status checks of validations and deployments
    #[arg(long, global = true, default_value_t = 0)]
    pub poll_interval_ms: u64,

    /// Give up after this many status checks (unlimited when omitted)
    #[arg(long, global = true)]
    pub max_polls: Option<u32>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, env = "ANALYTICS_LOG", default_value = "warn")]
    pub log_level: String,
}

impl GlobalArgs {
    pub fn config(&self) -> Config {
        let mut config = Config::new(self.cf_home.clone());
        config.catalog_url = self.catalog_url.clone();
        config.token_url_template = self.token_url.clone();
        config.http_timeout = self.timeout_secs.map(Duration::from_secs);
        config.poll = PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_polls,
        };
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the taxonomy tree
    Taxonomy,

    /// Add a taxonomy branch, e.g. `Energy/Wind/Turbine`
    AddTaxonomy { taxonomy: String },

    /// List analytics in the catalog
    Analytics,

    /// Register an analytic and upload its executable
    CreateAnalytic(CreateArgs),

    /// List the artifacts of an analytic
    AnalyticArtifacts { analytic: String },

    /// Download an artifact into the current directory
    GetAnalyticArtifact { analytic: String, file_name: String },

    /// Upload an artifact for an analytic
    AddAnalyticArtifact {
        analytic: String,
        file_path: PathBuf,
        /// Artifact type
        #[arg(short = 't', long = "type")]
        kind: String,
        /// Artifact description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Remove an artifact from an analytic
    DeleteAnalyticArtifact { analytic: String, file_name: String },

    /// Run an analytic on an input file and print its output
    RunAnalytic { analytic: String, input_file: PathBuf },

    /// Validate an analytic with an input file
    ValidateAnalytic { analytic: String, input_file: PathBuf },

    /// Delete an analytic
    DeleteAnalytic { analytic: String },

    /// Show the logs of an analytic
    AnalyticLogs { analytic: String },

    /// Deploy an analytic
    DeployAnalytic(DeployArgs),

    /// Send an authenticated request to the catalog API
    AnalyticsCurl(CurlArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    pub name: String,
    pub executable: PathBuf,
    /// Analytic version [default: V1-<Mon>-<day>]
    #[arg(short, long)]
    pub version: Option<String>,
    /// Analytic author [default: cf user name]
    #[arg(short, long)]
    pub author: Option<String>,
    /// Supported language [default: Python for .zip, Java for .jar]
    #[arg(short, long)]
    pub language: Option<String>,
    /// Analytic description
    #[arg(short, long, default_value = "")]
    pub description: String,
    /// Taxonomy location
    #[arg(short, long, default_value = "")]
    pub taxonomy: String,
    /// Custom metadata
    #[arg(short, long, default_value = "")]
    pub metadata: String,
}

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    pub analytic: String,
    /// Memory size in MB (`-memory` is accepted too)
    #[arg(short, long, default_value_t = 512)]
    pub memory: u32,
    /// Disk space in MB (`-diskQuota` is accepted too)
    #[arg(short, long = "disk-quota", alias = "diskQuota", default_value_t = 1024)]
    pub disk_quota: u32,
    /// Number of instances (`-instances` is accepted too)
    #[arg(short, long, default_value_t = 1)]
    pub instances: u32,
}

impl DeployArgs {
    pub fn deployment(&self) -> DeploymentConfig {
        DeploymentConfig {
            memory: self.memory,
            disk_quota: self.disk_quota,
            instances: self.instances,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CurlArgs {
    /// Path below /api, e.g. /v1/catalog/analytics
    pub path: String,
    /// Include response headers in the output
    #[arg(short = 'i')]
    pub include_headers: bool,
    /// HTTP method (GET,POST,PUT,DELETE,etc)
    #[arg(short = 'X')]
    pub method: Option<String>,
    /// Custom headers to include in the request, flag can be specified multiple times
    #[arg(short = 'H')]
    pub headers: Vec<String>,
    /// HTTP data to include in the request body, or '@' followed by a file name to read the data from
    #[arg(short = 'd')]
    pub data: Option<String>,
    /// Write curl body to FILE instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}
