//! CLI configuration and deployment settings.

use clap::Parser;
use std::fmt;
use std::path::PathBuf;

use crate::env_file::EnvVars;
use crate::error::DeployError;
use crate::protocol::{Protocol, DEFAULT_PORT};

pub const KEY_HOST: &str = "FTP_HOST";
pub const KEY_USER: &str = "FTP_USER";
pub const KEY_PASS: &str = "FTP_PASS";
pub const KEY_PORT: &str = "FTP_PORT";
pub const KEY_REMOTE_ROOT: &str = "REMOTE_ROOT";
pub const KEY_SITE_URL: &str = "SITE_URL";

/// Settings that must be present and non-empty, in reporting order
pub const REQUIRED_KEYS: &[&str] = &[KEY_HOST, KEY_USER, KEY_PASS, KEY_REMOTE_ROOT];

/// Mirror a built static site to a remote host over FTP or SFTP
#[derive(Parser, Debug)]
#[command(name = "site-deploy")]
#[command(version)]
#[command(about = "Mirror a built static site to a remote host over FTP or SFTP")]
pub struct Cli {
    /// Settings file with FTP_HOST, FTP_USER, FTP_PASS, REMOTE_ROOT, ...
    /// (resolved against the current directory, not the binary's location)
    #[arg(short, long, default_value = ".env.deploy")]
    pub env_file: PathBuf,

    /// Build output directory to deploy
    #[arg(short, long, default_value = "dist")]
    pub local_root: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Runtime options parsed from CLI
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Settings file location
    pub env_file: PathBuf,
    /// Local directory mirrored to the remote root
    pub local_root: PathBuf,
    /// Enable verbose output
    pub verbose: bool,
}

impl RunOptions {
    /// Create RunOptions from CLI arguments
    pub fn from_cli(cli: Cli) -> Self {
        RunOptions {
            env_file: cli.env_file,
            local_root: cli.local_root,
            verbose: cli.verbose,
        }
    }
}

/// Immutable deployment settings, built once per run
#[derive(Clone, PartialEq, Eq)]
pub struct DeploymentConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    pub protocol: Protocol,
    /// Remote base directory for deployed files
    pub remote_root: String,
    /// Only used in the post-deploy confirmation
    pub site_url: Option<String>,
}

impl DeploymentConfig {
    /// Validate loaded settings into a config.
    ///
    /// All missing required keys are reported together. Values are never
    /// included in the error.
    pub fn from_env(vars: &EnvVars) -> Result<Self, DeployError> {
        let missing: Vec<&'static str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| vars.non_empty(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(DeployError::MissingConfig { keys: missing });
        }

        let port_setting = vars.non_empty(KEY_PORT);
        let port = match port_setting {
            None => DEFAULT_PORT,
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(port) if port > 0 => port,
                _ => {
                    return Err(DeployError::InvalidPort {
                        value: raw.to_string(),
                    })
                }
            },
        };

        Ok(DeploymentConfig {
            host: required(vars, KEY_HOST),
            user: required(vars, KEY_USER),
            password: required(vars, KEY_PASS),
            port,
            protocol: Protocol::from_port_setting(port_setting),
            remote_root: required(vars, KEY_REMOTE_ROOT),
            site_url: vars.non_empty(KEY_SITE_URL).map(str::to_string),
        })
    }
}

fn required(vars: &EnvVars, key: &str) -> String {
    vars.non_empty(key).unwrap_or_default().to_string()
}

impl fmt::Debug for DeploymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("remote_root", &self.remote_root)
            .field("site_url", &self.site_url)
            .finish()
    }
}
