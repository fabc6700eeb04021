//! Deployment orchestration.
//!
//! One run is a straight line: load settings, validate, scan the local build
//! directory, connect with the selected protocol, mirror, report. There is no
//! retry and no rollback. Concurrent runs against the same remote root are
//! not guarded against and can leave it in a mixed state; run one deployment
//! at a time.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::config::{DeploymentConfig, RunOptions};
use crate::env_file::EnvVars;
use crate::error::DeployError;
use crate::ftp::FtpFs;
use crate::protocol::Protocol;
use crate::remote::{make_dir_all, Connector, RemoteFs};
use crate::reporter::Reporter;
use crate::rules::TransferRules;
use crate::scanner::{scan_local, LocalTree};
use crate::sftp::SftpFs;
use crate::sync::{apply_plan, plan_sync, walk_remote, SyncStats};

/// Exit code for a completed deployment
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code for any failure: missing settings or a failed transfer
pub const EXIT_FAILURE: u8 = 1;

/// Opens real FTP or SFTP sessions depending on the configured protocol
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkConnector;

impl Connector for NetworkConnector {
    fn connect(&self, config: &DeploymentConfig) -> Result<Box<dyn RemoteFs>, DeployError> {
        match config.protocol {
            Protocol::Ftp => Ok(Box::new(FtpFs::connect(config)?)),
            Protocol::Sftp => Ok(Box::new(SftpFs::connect(config)?)),
        }
    }
}

/// Result of a successful deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploySummary {
    pub stats: SyncStats,
    pub duration: Duration,
}

/// Mirror `local_root` onto the configured remote root.
///
/// The local tree is scanned before any connection is opened, so a missing
/// build directory never touches the network.
pub fn deploy(
    config: &DeploymentConfig,
    local_root: &Path,
    rules: &TransferRules,
    connector: &dyn Connector,
    progress: &ProgressBar,
) -> Result<DeploySummary, DeployError> {
    let start = Instant::now();

    let local = scan_local(local_root, rules)?;
    info!(
        files = local.files.len(),
        bytes = local.total_bytes(),
        "scanned local tree"
    );

    let mut fs = connector.connect(config)?;
    info!(host = %config.host, protocol = %config.protocol, "connected");

    let result = mirror(fs.as_mut(), config, &local, progress);

    if let Err(e) = fs.close() {
        warn!(error = %e, "closing remote session failed");
    }

    let stats = result?;
    Ok(DeploySummary {
        stats,
        duration: start.elapsed(),
    })
}

fn mirror(
    fs: &mut dyn RemoteFs,
    config: &DeploymentConfig,
    local: &LocalTree,
    progress: &ProgressBar,
) -> Result<SyncStats, DeployError> {
    make_dir_all(fs, &config.remote_root)?;

    let remote = walk_remote(fs, &config.remote_root)?;
    debug!(
        files = remote.files.len(),
        dirs = remote.dirs.len(),
        "listed remote tree"
    );

    let plan = plan_sync(local, &remote);
    if plan.is_empty() {
        info!("remote tree already matches, nothing to do");
    }
    info!(
        uploads = plan.uploads.len(),
        deletes = plan.delete_files.len(),
        "planned mirror"
    );

    progress.set_length(plan.uploads.len() as u64);
    let stats = apply_plan(fs, &plan, &config.remote_root, progress)?;
    progress.finish_and_clear();

    Ok(stats)
}

/// Run the whole pipeline and return the process exit code
pub fn execute<O: Write, E: Write>(
    opts: &RunOptions,
    rules: &TransferRules,
    connector: &dyn Connector,
    reporter: &mut Reporter<O, E>,
    progress: &ProgressBar,
) -> u8 {
    let vars = match EnvVars::load(&opts.env_file) {
        Ok(vars) => vars,
        Err(e) => {
            reporter.env_file_error(&e);
            EnvVars::default()
        }
    };
    debug!(keys = vars.len(), "loaded settings");

    let config = match DeploymentConfig::from_env(&vars) {
        Ok(config) => config,
        Err(e) => {
            reporter.config_error(&e, &vars);
            return EXIT_FAILURE;
        }
    };

    reporter.start(&config, &opts.local_root, rules);
    reporter.deploying();

    match deploy(&config, &opts.local_root, rules, connector, progress) {
        Ok(summary) => {
            reporter.success(&config, &summary);
            EXIT_SUCCESS
        }
        Err(e) => {
            progress.abandon();
            reporter.failure(&e);
            EXIT_FAILURE
        }
    }
}
