//! Human-readable console output.
//!
//! Lines carry a status glyph so a CI log can be scanned at a glance.
//! Progress and success go to `out`, failures to `err`. Write errors on the
//! console are ignored; there is nowhere left to report them.

use std::io::Write;
use std::path::Path;

use crate::config::DeploymentConfig;
use crate::deployer::DeploySummary;
use crate::env_file::EnvVars;
use crate::error::DeployError;
use crate::rules::TransferRules;

pub struct Reporter<O: Write, E: Write> {
    out: O,
    err: E,
    /// Settings file name used in hints, e.g. `.env.deploy`
    env_label: String,
}

impl Reporter<std::io::Stdout, std::io::Stderr> {
    /// Reporter on the process stdout/stderr
    pub fn console(env_file: &Path) -> Self {
        let label = env_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| env_file.display().to_string());
        Self::new(std::io::stdout(), std::io::stderr(), label)
    }
}

impl<O: Write, E: Write> Reporter<O, E> {
    pub fn new(out: O, err: E, env_label: impl Into<String>) -> Self {
        Self {
            out,
            err,
            env_label: env_label.into(),
        }
    }

    /// Recover the writers (tests inspect captured output this way)
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }

    fn out(&mut self, line: &str) {
        let _ = writeln!(self.out, "{line}");
    }

    fn err(&mut self, line: &str) {
        let _ = writeln!(self.err, "{line}");
    }

    /// The settings file could not be read; the run continues with no settings
    pub fn env_file_error(&mut self, error: &DeployError) {
        self.err(&format!("❌ {error}"));
    }

    /// Settings failed validation. Only key names are printed, never values.
    pub fn config_error(&mut self, error: &DeployError, available: &EnvVars) {
        match error {
            DeployError::MissingConfig { keys } => {
                for key in keys {
                    let line = format!("❌ Missing {key} in {}", self.env_label);
                    self.err(&line);
                }
                let line = if available.is_empty() {
                    "Available env vars: (none)".to_string()
                } else {
                    let names: Vec<&str> = available.keys().collect();
                    format!("Available env vars: {}", names.join(", "))
                };
                self.err(&line);
            }
            other => self.err(&format!("❌ {other}")),
        }
    }

    /// Announce what is about to be deployed where
    pub fn start(&mut self, config: &DeploymentConfig, local_root: &Path, rules: &TransferRules) {
        self.out("🚀 Starting deployment...");
        self.out(&format!("📁 Local: {}/", local_root.display()));
        self.out(&format!(
            "🌐 Remote: {}:{}{}",
            config.host, config.port, config.remote_root
        ));
        self.out(&format!("🔐 Protocol: {}", config.protocol));
        self.out(&format!("👤 User: {}", config.user));
        self.out(&format!(
            "📋 Include pattern: {}",
            rules.include_patterns().join(", ")
        ));
        self.out(&format!(
            "🚫 Exclude patterns: {}",
            rules.exclude_patterns().join(", ")
        ));
        self.out("");
    }

    pub fn deploying(&mut self) {
        self.out("⏳ Deploying files...");
    }

    pub fn success(&mut self, config: &DeploymentConfig, summary: &DeploySummary) {
        let stats = &summary.stats;
        self.out("");
        self.out("✅ Deployment completed successfully!");
        self.out(&format!(
            "📊 Uploaded {} file(s) ({}), removed {} file(s) and {} director(ies), created {} director(ies) in {:.2}s",
            stats.files_uploaded,
            format_bytes(stats.bytes_uploaded),
            stats.files_deleted,
            stats.dirs_deleted,
            stats.dirs_created,
            summary.duration.as_secs_f64()
        ));
        self.out("");

        if let Some(url) = &config.site_url {
            self.out(&format!("🌍 Your site should now be available at: {url}"));
            self.out("🔍 Please verify the deployment by visiting the URL in your browser.");
        }
    }

    pub fn failure(&mut self, error: &DeployError) {
        self.err("");
        self.err("❌ Deployment failed!");
        self.err(&format!("Error: {error}"));
        self.err("");
        self.err("🔧 Troubleshooting tips:");
        let credentials = format!("   - Check your FTP credentials in {}", self.env_label);
        self.err(&credentials);
        self.err("   - Verify the server is accessible");
        self.err("   - Check if the remote directory exists");
        self.err("   - Ensure you have write permissions");
    }
}

/// Format a byte count with a binary unit
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
