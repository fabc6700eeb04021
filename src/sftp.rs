//! SFTP backend over russh.
//!
//! The SSH client is async; each call drives it to completion on a private
//! current-thread runtime so the session looks blocking to the mirror code.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::Disconnect;
use russh_keys::key;
use russh_sftp::client::SftpSession;
use tokio::io::AsyncWriteExt;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use crate::config::DeploymentConfig;
use crate::error::DeployError;
use crate::remote::{EntryKind, RemoteEntry, RemoteFs};

struct Client {
    host: String,
}

#[async_trait]
impl client::Handler for Client {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // No known_hosts store: every host key is accepted.
        warn!(
            host = %self.host,
            fingerprint = %server_public_key.fingerprint(),
            "accepting unverified SSH host key"
        );
        Ok(true)
    }
}

/// An authenticated SFTP session
pub struct SftpFs {
    // Fields drop in order; the runtime must outlive the session.
    sftp: SftpSession,
    session: Handle<Client>,
    runtime: Runtime,
}

impl SftpFs {
    /// Connect, authenticate with the password and open the `sftp` subsystem
    pub fn connect(config: &DeploymentConfig) -> Result<Self, DeployError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;

        let (session, sftp) = runtime.block_on(open_session(config))?;

        Ok(Self {
            sftp,
            session,
            runtime,
        })
    }
}

async fn open_session(
    config: &DeploymentConfig,
) -> Result<(Handle<Client>, SftpSession), DeployError> {
    let connect_err = |message: String| DeployError::Connect {
        host: config.host.clone(),
        port: config.port,
        message,
    };

    debug!(host = %config.host, port = config.port, "opening SSH connection");
    let ssh_config = Arc::new(client::Config::default());
    let handler = Client {
        host: config.host.clone(),
    };
    let mut session = client::connect(ssh_config, (config.host.as_str(), config.port), handler)
        .await
        .map_err(|e| connect_err(e.to_string()))?;

    let authenticated = session
        .authenticate_password(config.user.as_str(), config.password.as_str())
        .await
        .map_err(|e| DeployError::Auth {
            user: config.user.clone(),
            message: e.to_string(),
        })?;
    if !authenticated {
        return Err(DeployError::Auth {
            user: config.user.clone(),
            message: "password rejected by server".to_string(),
        });
    }

    let channel = session
        .channel_open_session()
        .await
        .map_err(|e| connect_err(e.to_string()))?;
    channel
        .request_subsystem(true, "sftp")
        .await
        .map_err(|e| connect_err(e.to_string()))?;
    let sftp = SftpSession::new(channel.into_stream())
        .await
        .map_err(|e| connect_err(e.to_string()))?;

    Ok((session, sftp))
}

impl RemoteFs for SftpFs {
    fn list_dir(&mut self, path: &str) -> Result<Option<Vec<RemoteEntry>>, DeployError> {
        let sftp = &self.sftp;
        self.runtime.block_on(async {
            let exists = sftp
                .try_exists(path)
                .await
                .map_err(|e| DeployError::transfer("stat", path, e))?;
            if !exists {
                return Ok::<_, DeployError>(None);
            }

            let entries: Vec<RemoteEntry> = sftp
                .read_dir(path)
                .await
                .map_err(|e| DeployError::transfer("readdir", path, e))?
                .filter_map(|entry| {
                    let name = entry.file_name();
                    if name == "." || name == ".." {
                        return None;
                    }
                    let kind = if entry.file_type().is_dir() {
                        EntryKind::Dir
                    } else {
                        EntryKind::File
                    };
                    Some(RemoteEntry { name, kind })
                })
                .collect();
            Ok(Some(entries))
        })
    }

    fn make_dir(&mut self, path: &str) -> Result<(), DeployError> {
        self.runtime
            .block_on(self.sftp.create_dir(path))
            .map_err(|e| DeployError::transfer("mkdir", path, e))
    }

    fn upload(&mut self, local: &Path, remote: &str) -> Result<u64, DeployError> {
        let sftp = &self.sftp;
        self.runtime.block_on(async {
            let mut source = tokio::fs::File::open(local).await?;
            let mut target = sftp
                .create(remote)
                .await
                .map_err(|e| DeployError::transfer("open", remote, e))?;
            let bytes = tokio::io::copy(&mut source, &mut target)
                .await
                .map_err(|e| DeployError::transfer("write", remote, e))?;
            target
                .shutdown()
                .await
                .map_err(|e| DeployError::transfer("close", remote, e))?;
            Ok::<_, DeployError>(bytes)
        })
    }

    fn remove_file(&mut self, path: &str) -> Result<(), DeployError> {
        self.runtime
            .block_on(self.sftp.remove_file(path))
            .map_err(|e| DeployError::transfer("remove", path, e))
    }

    fn remove_dir(&mut self, path: &str) -> Result<(), DeployError> {
        self.runtime
            .block_on(self.sftp.remove_dir(path))
            .map_err(|e| DeployError::transfer("rmdir", path, e))
    }

    fn close(&mut self) -> Result<(), DeployError> {
        let sftp = &self.sftp;
        let session = &self.session;
        self.runtime.block_on(async {
            sftp.close()
                .await
                .map_err(|e| DeployError::session("close", e))?;
            session
                .disconnect(Disconnect::ByApplication, "", "en")
                .await
                .map_err(|e| DeployError::session("disconnect", e))
        })
    }
}
