//! Transfer protocol selection.

use std::fmt;

/// Port assumed when `FTP_PORT` is not set
pub const DEFAULT_PORT: u16 = 21;

/// Port setting that switches the transfer to SFTP
const SFTP_PORT_SETTING: &str = "22";

/// File transfer protocol used for a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Plain FTP, active mode
    Ftp,
    /// SFTP over SSH
    Sftp,
}

impl Protocol {
    /// Select the protocol from the raw `FTP_PORT` setting.
    ///
    /// Only the literal setting `22` selects SFTP; everything else, including
    /// an absent setting, stays on FTP. There is no probing or fallback.
    pub fn from_port_setting(setting: Option<&str>) -> Self {
        let setting = setting.unwrap_or("21");
        if setting == SFTP_PORT_SETTING {
            Protocol::Sftp
        } else {
            Protocol::Ftp
        }
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Ftp => "FTP",
            Protocol::Sftp => "SFTP",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
