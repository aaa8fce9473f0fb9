//! Configuration Module
//!
//! This module provides constants, default values and the TOML configuration
//! file of the monitoggle daemon.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::screen::backend::BackendKind;
use crate::utils::error::Result;

/// Constants for default settings
pub const DEFAULT_CONFIG_PATH: &str = "/etc/monitoggle.toml";
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/monitoggled.sock";
pub const DEFAULT_LOG_PATH: &str = "/var/log/monitoggle.log";
pub const DEFAULT_GRAB_SERVER: bool = true;
pub const DEFAULT_RESTORE_ON_EXIT: bool = false;

/// Daemon settings; every field may be left out of the file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// Path of the ZeroMQ IPC socket
    pub socket_path: PathBuf,
    pub log_path: PathBuf,
    pub backend: BackendKind,
    /// Grab the X server while a new layout is written
    pub grab_server: bool,
    /// Enable every known output when the daemon stops
    pub restore_on_exit: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            backend: BackendKind::default(),
            grab_server: DEFAULT_GRAB_SERVER,
            restore_on_exit: DEFAULT_RESTORE_ON_EXIT,
        }
    }
}

impl DaemonConfig {
    /// Reads `path`. `None` means there is no such file and the defaults apply.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(Self::parse(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
