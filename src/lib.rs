//! # Site Deploy
//!
//! Mirror a built static site directory onto a web host over FTP or SFTP.
//!
//! Settings come from a `.env.deploy`-style `KEY=VALUE` file. The transfer
//! protocol is chosen from the configured port (`22` means SFTP, anything
//! else plain FTP in active mode), and the remote root is made to match the
//! local build output, deletions included.
//!
//! ## Features
//!
//! - Fail-soft settings loader with explicit validation
//! - Fixed include/exclude policy with gitignore-style patterns
//! - Mirror planning independent of the transport
//! - FTP (suppaftp) and SFTP (russh) backends behind one trait
//!
//! ## Usage
//!
//! ```ignore
//! use site_deploy::deployer::{deploy, NetworkConnector};
//! use site_deploy::rules::TransferRules;
//!
//! let summary = deploy(&config, Path::new("dist"), &TransferRules::standard(),
//!     &NetworkConnector, &ProgressBar::hidden())?;
//! ```

/// CLI options and validated deployment settings
pub mod config;

/// Deployment orchestration and exit codes
pub mod deployer;

/// `.env.deploy` file loader
pub mod env_file;

/// Error types for deployment operations
pub mod error;

/// Plain FTP backend
pub mod ftp;

/// FTP/SFTP selection
pub mod protocol;

/// Remote filesystem trait and helpers
pub mod remote;

/// Console output
pub mod reporter;

/// Include/exclude transfer rules
pub mod rules;

/// Local build directory scanning
pub mod scanner;

/// SFTP backend
pub mod sftp;

/// Mirror planning and execution
pub mod sync;
