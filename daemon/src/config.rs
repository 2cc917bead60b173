// This file is part of accelplug, an application to expose accelerator hardware to container orchestrators and to manage FPGA bitstreams.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// accelplug is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// accelplug is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! Locations and policy constants used by accelplug, and the optional TOML overrides for them.
//!
//! The hardcoded values below are used unless a `[paths]` or `[scan]` table in
//! [`USER_CONFIG_FILE`] or [`VENDOR_CONFIG_FILE`] says otherwise. User values take priority over
//! vendor values. A missing file is normal; a malformed file is reported and ignored.
//!
//! ```toml
//! [paths]
//! qat_config_dir = "/etc"
//! bitstream_dir = "/srv/intel.com/fpga"
//!
//! [scan]
//! status_command = ["adf_ctl", "status"]
//! io_timeout_secs = 10
//! ```

use crate::error::AccelError;
use crate::system_io::fs_read;
use log::{trace, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding the per-device QAT driver configuration files, `{type}_{id}.conf`.
pub static QAT_CONFIG_DIR: &str = "/etc";

/// Directory holding device nodes. Typically `/dev`.
pub static DEV_DIR: &str = "/dev";

/// Mount point of sysfs. Typically `/sys`.
pub static SYSFS_DIR: &str = "/sys";

/// Well-known root under which bitstreams are installed, keyed by their identity.
pub static FPGA_BITSTREAM_DIR: &str = "/srv/intel.com/fpga";

/// The QAT driver status query.
pub static STATUS_COMMAND: &[&str] = &["adf_ctl", "status"];

/// Delay between two consecutive publications of the resource inventory.
pub const SCAN_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound for any single I/O step of a scan (status query, config file read).
pub const IO_TIMEOUT: Duration = Duration::from_secs(10);

pub static VENDOR_CONFIG_FILE: &str = "/usr/lib/accelplug/config.toml";
pub static USER_CONFIG_FILE: &str = "/etc/accelplug/config.toml";

/// Resolved settings handed to each component at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub qat_config_dir: PathBuf,
    pub dev_dir: PathBuf,
    pub sysfs_dir: PathBuf,
    pub bitstream_dir: PathBuf,
    pub status_command: Vec<String>,
    pub io_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            qat_config_dir: PathBuf::from(QAT_CONFIG_DIR),
            dev_dir: PathBuf::from(DEV_DIR),
            sysfs_dir: PathBuf::from(SYSFS_DIR),
            bitstream_dir: PathBuf::from(FPGA_BITSTREAM_DIR),
            status_command: STATUS_COMMAND.iter().map(|s| s.to_string()).collect(),
            io_timeout: IO_TIMEOUT,
        }
    }
}

/// This is the top level struct which holds all tables
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    paths: Option<PathsToml>,
    scan: Option<ScanToml>,
}

/// This is the "paths" table
#[derive(Debug, Default, Deserialize)]
struct PathsToml {
    qat_config_dir: Option<String>,
    dev_dir: Option<String>,
    sysfs_dir: Option<String>,
    bitstream_dir: Option<String>,
}

/// This is the "scan" table
#[derive(Debug, Default, Deserialize)]
struct ScanToml {
    status_command: Option<Vec<String>>,
    io_timeout_secs: Option<u64>,
}

impl PathsToml {
    fn merge(self, fallback: PathsToml) -> PathsToml {
        PathsToml {
            qat_config_dir: self.qat_config_dir.or(fallback.qat_config_dir),
            dev_dir: self.dev_dir.or(fallback.dev_dir),
            sysfs_dir: self.sysfs_dir.or(fallback.sysfs_dir),
            bitstream_dir: self.bitstream_dir.or(fallback.bitstream_dir),
        }
    }
}

impl ScanToml {
    fn merge(self, fallback: ScanToml) -> ScanToml {
        ScanToml {
            status_command: self.status_command.or(fallback.status_command),
            io_timeout_secs: self.io_timeout_secs.or(fallback.io_timeout_secs),
        }
    }
}

impl TomlConfig {
    fn merge(self, fallback: TomlConfig) -> TomlConfig {
        TomlConfig {
            paths: Some(
                self.paths
                    .unwrap_or_default()
                    .merge(fallback.paths.unwrap_or_default()),
            ),
            scan: Some(
                self.scan
                    .unwrap_or_default()
                    .merge(fallback.scan.unwrap_or_default()),
            ),
        }
    }
}

impl From<TomlConfig> for Settings {
    fn from(value: TomlConfig) -> Self {
        trace!("Creating Settings from {value:?}");
        let defaults = Settings::default();
        let paths = value.paths.unwrap_or_default();
        let scan = value.scan.unwrap_or_default();
        Settings {
            qat_config_dir: paths
                .qat_config_dir
                .map_or(defaults.qat_config_dir, PathBuf::from),
            dev_dir: paths.dev_dir.map_or(defaults.dev_dir, PathBuf::from),
            sysfs_dir: paths.sysfs_dir.map_or(defaults.sysfs_dir, PathBuf::from),
            bitstream_dir: paths
                .bitstream_dir
                .map_or(defaults.bitstream_dir, PathBuf::from),
            status_command: scan
                .status_command
                .filter(|cmd| !cmd.is_empty())
                .unwrap_or(defaults.status_command),
            io_timeout: scan
                .io_timeout_secs
                .filter(|secs| *secs > 0)
                .map_or(defaults.io_timeout, Duration::from_secs),
        }
    }
}

fn toml_str_to_config(file_path: &Path, toml_string: &str) -> Result<TomlConfig, AccelError> {
    toml::from_str(toml_string).map_err(|e| AccelError::Parse {
        file: file_path.into(),
        msg: e.to_string(),
    })
}

fn config_from_file(file_path: &Path) -> TomlConfig {
    if !file_path.is_file() {
        trace!("No config file at {file_path:?}");
        return TomlConfig::default();
    }
    match fs_read(file_path).and_then(|s| toml_str_to_config(file_path, &s)) {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring config file: {e}");
            TomlConfig::default()
        }
    }
}

/// Build [`Settings`] from a user and a vendor config file, the user file taking priority.
pub fn settings_from_files(user_file: &Path, vendor_file: &Path) -> Settings {
    let user_config = config_from_file(user_file);
    let vendor_config = config_from_file(vendor_file);
    user_config.merge(vendor_config).into()
}

/// Build [`Settings`] from the well-known config file locations.
pub fn load_settings() -> Settings {
    settings_from_files(Path::new(USER_CONFIG_FILE), Path::new(VENDOR_CONFIG_FILE))
}
