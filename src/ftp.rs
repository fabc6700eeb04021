//! Plain FTP backend.
//!
//! Data connections use active mode (`PORT`) and passive negotiation is never
//! attempted. This is an assumption about the target host, not a protocol
//! requirement; servers that reject `PORT` need `FTP_MODE` changed.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use suppaftp::list::File as ListEntry;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Mode};
use tracing::{debug, warn};

use crate::config::DeploymentConfig;
use crate::error::DeployError;
use crate::remote::{EntryKind, RemoteEntry, RemoteFs};

const FTP_MODE: Mode = Mode::Active;

/// An authenticated FTP session
pub struct FtpFs {
    stream: FtpStream,
    /// Login directory; relative remote paths are resolved against it
    home: String,
}

impl FtpFs {
    /// Connect, log in and switch to binary transfers
    pub fn connect(config: &DeploymentConfig) -> Result<Self, DeployError> {
        debug!(host = %config.host, port = config.port, "opening FTP control connection");
        let mut stream =
            FtpStream::connect((config.host.as_str(), config.port)).map_err(|e| {
                DeployError::Connect {
                    host: config.host.clone(),
                    port: config.port,
                    message: e.to_string(),
                }
            })?;
        stream.set_mode(FTP_MODE);

        stream
            .login(config.user.as_str(), config.password.as_str())
            .map_err(|e| DeployError::Auth {
                user: config.user.clone(),
                message: e.to_string(),
            })?;

        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| DeployError::session("TYPE I", e))?;

        // Listing moves the working directory, so every later path is made
        // absolute against the directory the login landed in.
        let home = stream
            .pwd()
            .map_err(|e| DeployError::session("PWD", e))?;
        debug!(home = %home, "FTP login directory");

        Ok(Self { stream, home })
    }

    fn resolve(&self, path: &str) -> String {
        resolve_path(&self.home, path)
    }
}

/// Anchor a remote path at `home` unless it is already absolute
fn resolve_path(home: &str, path: &str) -> String {
    if path.starts_with('/') {
        return path.to_string();
    }
    let base = home.trim_end_matches('/');
    let rel = path.trim_start_matches("./");
    if rel.is_empty() || rel == "." {
        return if base.is_empty() { "/".to_string() } else { base.to_string() };
    }
    format!("{base}/{rel}")
}

/// Parse `LIST` output, skipping lines no known format understands
fn parse_listing(lines: &[String]) -> Vec<RemoteEntry> {
    lines
        .iter()
        .filter_map(|line| match ListEntry::from_str(line) {
            Ok(entry) => Some(entry),
            Err(_) => {
                warn!(line = %line, "unparseable LIST line skipped");
                None
            }
        })
        .filter(|entry| entry.name() != "." && entry.name() != "..")
        .map(|entry| RemoteEntry {
            name: entry.name().to_string(),
            kind: if entry.is_directory() {
                EntryKind::Dir
            } else {
                EntryKind::File
            },
        })
        .collect()
}

fn is_missing(err: &FtpError) -> bool {
    matches!(err, FtpError::UnexpectedResponse(resp) if resp.status.code() == 550)
}

impl RemoteFs for FtpFs {
    fn list_dir(&mut self, path: &str) -> Result<Option<Vec<RemoteEntry>>, DeployError> {
        let path = self.resolve(path);
        // Servers differ on LIST of a missing path; CWD gives a definite answer.
        match self.stream.cwd(&path) {
            Ok(()) => {}
            Err(e) if is_missing(&e) => return Ok(None),
            Err(e) => return Err(DeployError::transfer("CWD", path, e)),
        }

        let lines = self
            .stream
            .list(None)
            .map_err(|e| DeployError::transfer("LIST", path.as_str(), e))?;
        Ok(Some(parse_listing(&lines)))
    }

    fn make_dir(&mut self, path: &str) -> Result<(), DeployError> {
        let path = self.resolve(path);
        self.stream
            .mkdir(&path)
            .map_err(|e| DeployError::transfer("MKD", path, e))
    }

    fn upload(&mut self, local: &Path, remote: &str) -> Result<u64, DeployError> {
        let remote = self.resolve(remote);
        let file = File::open(local)?;
        let mut reader = BufReader::new(file);
        self.stream
            .put_file(&remote, &mut reader)
            .map_err(|e| DeployError::transfer("STOR", remote, e))
    }

    fn remove_file(&mut self, path: &str) -> Result<(), DeployError> {
        let path = self.resolve(path);
        self.stream
            .rm(&path)
            .map_err(|e| DeployError::transfer("DELE", path, e))
    }

    fn remove_dir(&mut self, path: &str) -> Result<(), DeployError> {
        let path = self.resolve(path);
        self.stream
            .rmdir(&path)
            .map_err(|e| DeployError::transfer("RMD", path, e))
    }

    fn close(&mut self) -> Result<(), DeployError> {
        self.stream
            .quit()
            .map_err(|e| DeployError::session("QUIT", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passive_mode_disabled() {
        assert!(matches!(FTP_MODE, Mode::Active));
    }

    #[test]
    fn test_resolve_relative_root_against_home() {
        assert_eq!(resolve_path("/", "public_html"), "/public_html");
        assert_eq!(
            resolve_path("/home/site", "public_html/assets/app.js"),
            "/home/site/public_html/assets/app.js"
        );
        assert_eq!(resolve_path("/home/site/", "./public_html"), "/home/site/public_html");
    }

    #[test]
    fn test_resolve_keeps_absolute_paths() {
        assert_eq!(resolve_path("/home/site", "/public_html/a.js"), "/public_html/a.js");
    }

    #[test]
    fn test_resolve_current_dir() {
        assert_eq!(resolve_path("/home/site", "."), "/home/site");
        assert_eq!(resolve_path("/", "."), "/");
    }

    #[test]
    fn test_parse_listing_unix_format() {
        let lines = vec![
            "drwxr-xr-x    2 web      web          4096 Jan 10 12:00 assets".to_string(),
            "-rw-r--r--    1 web      web           512 Jan 10 12:00 index.html".to_string(),
            "-rw-r--r--    1 web      web            64 Jan 10 12:00 .htaccess".to_string(),
        ];

        let entries = parse_listing(&lines);

        assert_eq!(
            entries,
            vec![
                RemoteEntry::dir("assets"),
                RemoteEntry::file("index.html"),
                RemoteEntry::file(".htaccess"),
            ]
        );
    }

    #[test]
    fn test_parse_listing_skips_dot_entries() {
        let lines = vec![
            "drwxr-xr-x    2 web      web          4096 Jan 10 12:00 .".to_string(),
            "drwxr-xr-x    2 web      web          4096 Jan 10 12:00 ..".to_string(),
        ];

        assert!(parse_listing(&lines).is_empty());
    }

    #[test]
    fn test_parse_listing_skips_garbage() {
        let lines = vec!["total 12".to_string()];
        assert!(parse_listing(&lines).is_empty());
    }
}
