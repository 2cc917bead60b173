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

//! Builds the [`SectionMap`] from the QAT driver status and the per-device configuration files.

use crate::config::Settings;
use crate::error::AccelError;
use crate::qat::conf::{ConfFile, ConfSection};
use crate::qat::{Endpoint, Section, SectionMap};
use crate::system_io::{fs_read_bounded, fs_read_dir};
use log::{debug, info, trace};
use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Sections every QAT configuration carries that do not describe user-space resources.
pub static RESERVED_SECTIONS: &[&str] = &["GENERAL", "KERNEL", ""];

/// Device types whose configuration files are scanned.
pub static SUPPORTED_DEVICE_TYPES: &[&str] = &["c6xx", "dh895xcc", "c3xxx", "d15xx"];

/// Device nodes granted to every QAT instance in addition to the `uio` nodes.
pub static QAT_COMMON_NODES: &[&str] = &["qat_adf_ctl", "qat_dev_processes", "usdm_drv"];

static KEY_NUM_PROCESSES: &str = "NumProcesses";
static KEY_CRYPTO_INSTANCES: &str = "NumberCyInstances";
static KEY_COMPRESSION_INSTANCES: &str = "NumberDcInstances";
static KEY_LIMIT_DEV_ACCESS: &str = "LimitDevAccess";

/// Source of the driver status listing.
pub trait DriverStatus {
    /// Return the full textual status output of the driver.
    fn status(&self) -> impl Future<Output = Result<String, AccelError>> + Send;
}

/// Runs the driver control utility (`adf_ctl status` by default).
#[derive(Debug, Clone)]
pub struct AdfCtl {
    command: Vec<String>,
    limit: Duration,
}

impl AdfCtl {
    pub fn new(command: Vec<String>, limit: Duration) -> Self {
        AdfCtl { command, limit }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        AdfCtl::new(settings.status_command.clone(), settings.io_timeout)
    }
}

impl DriverStatus for AdfCtl {
    /// Run the status command and return its stdout followed by its stderr.
    ///
    /// # Returns: `Result<String, AccelError>`
    /// * `Ok(String)` - Combined output of a successful run
    /// * `Err(AccelError::Command)` - The command could not be spawned or exited non-zero
    /// * `Err(AccelError::Timeout)` - The command did not finish in time
    async fn status(&self) -> Result<String, AccelError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| AccelError::Argument("The driver status command is empty".into()))?;
        let cmd = self.command.join(" ");
        trace!("Running `{cmd}`");

        let output = tokio::time::timeout(
            self.limit,
            Command::new(program).args(args).kill_on_drop(true).output(),
        )
        .await
        .map_err(|_| AccelError::Timeout {
            what: format!("`{cmd}`"),
            after: self.limit,
        })?
        .map_err(|e| AccelError::Command {
            cmd: cmd.clone(),
            msg: e.to_string(),
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        if !output.status.success() {
            return Err(AccelError::Command {
                cmd,
                msg: format!("{}: {}", output.status, combined.trim()),
            });
        }
        Ok(combined)
    }
}

/// A device record of the driver status listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub device_type: String,
    pub device_id: String,
}

/// Extract the supported device records from the driver status output.
///
/// Device records look like
/// ` qat_dev0 - type: c6xx,  inst_id: 0,  node_id: 0,  bsf: 0000:3d:00.0,  #accel: 5 ... state: up`.
pub fn parse_status(output: &str) -> Vec<DeviceRecord> {
    output.lines().filter_map(parse_device_line).collect()
}

fn parse_device_line(line: &str) -> Option<DeviceRecord> {
    if !line.starts_with(" qat_") {
        return None;
    }
    let Some((device, properties)) = line.split_once('-') else {
        debug!("Skipping malformed device record '{line}'");
        return None;
    };
    let device_type = properties
        .split(',')
        .find_map(|property| property.trim().strip_prefix("type:"))
        .map(str::trim)?;
    if !SUPPORTED_DEVICE_TYPES.contains(&device_type) {
        debug!("Skipping device of unsupported type '{device_type}': '{line}'");
        return None;
    }
    let device_id = device.trim().trim_start_matches("qat_");
    if device_id.is_empty() {
        return None;
    }
    Some(DeviceRecord {
        device_type: device_type.to_string(),
        device_id: device_id.to_string(),
    })
}

/// The per-device declaration of one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SectionDecl {
    processes: u32,
    crypto_engines: u32,
    compression_engines: u32,
    pinned: bool,
}

impl SectionDecl {
    fn from_conf(file: &Path, name: &str, entries: &ConfSection) -> Result<Self, AccelError> {
        let processes = parse_count(file, name, entries, KEY_NUM_PROCESSES)?;
        if processes == 0 {
            return Err(AccelError::Parse {
                file: file.into(),
                msg: format!("{KEY_NUM_PROCESSES} in section [{name}] must be at least 1"),
            });
        }
        Ok(SectionDecl {
            processes,
            crypto_engines: parse_count(file, name, entries, KEY_CRYPTO_INSTANCES)?,
            compression_engines: parse_count(file, name, entries, KEY_COMPRESSION_INSTANCES)?,
            pinned: entries
                .get(KEY_LIMIT_DEV_ACCESS)
                .is_some_and(|value| value != "0"),
        })
    }
}

fn parse_count(
    file: &Path,
    section: &str,
    entries: &ConfSection,
    key: &str,
) -> Result<u32, AccelError> {
    let value = entries.get(key).ok_or_else(|| AccelError::Parse {
        file: file.into(),
        msg: format!("{key} is missing in section [{section}]"),
    })?;
    value.parse::<u32>().map_err(|e| AccelError::Parse {
        file: file.into(),
        msg: format!("Can't convert {key} '{value}' in section [{section}]: {e}"),
    })
}

fn merge_section(
    sections: &mut SectionMap,
    name: &str,
    device_id: &str,
    decl: SectionDecl,
) -> Result<(), AccelError> {
    let endpoint = Endpoint {
        id: device_id.to_string(),
        processes: decl.processes,
    };
    let Some(existing) = sections.get_mut(name) else {
        sections.insert(
            name.to_string(),
            Section {
                crypto_engines: decl.crypto_engines,
                compression_engines: decl.compression_engines,
                pinned: decl.pinned,
                endpoints: vec![endpoint],
            },
        );
        return Ok(());
    };

    if existing.pinned != decl.pinned {
        return Err(AccelError::Consistency(format!(
            "Value of {KEY_LIMIT_DEV_ACCESS} must be consistent across all devices in section [{name}] (device {device_id} differs)"
        )));
    }
    if !decl.pinned
        && let Some(first) = existing.endpoints.first()
        && first.processes != decl.processes
    {
        return Err(AccelError::Consistency(format!(
            "For not pinned section [{name}] {KEY_NUM_PROCESSES} must be equal for all devices: device {device_id} declares {}, device {} declares {}",
            decl.processes, first.id, first.processes
        )));
    }
    if existing.crypto_engines != decl.crypto_engines
        || existing.compression_engines != decl.compression_engines
    {
        return Err(AccelError::Consistency(format!(
            "Number of engines must be consistent across all devices in section [{name}]: device {device_id} declares cy{}_dc{}, expected cy{}_dc{}",
            decl.crypto_engines,
            decl.compression_engines,
            existing.crypto_engines,
            existing.compression_engines
        )));
    }
    existing.endpoints.push(endpoint);
    Ok(())
}

fn check_pinned_coverage(sections: &SectionMap, device_count: usize) -> Result<(), AccelError> {
    for (name, section) in sections {
        if section.pinned && section.endpoints.len() != device_count {
            return Err(AccelError::Consistency(format!(
                "Section [{name}] must be defined for all {device_count} QAT devices since it contains {KEY_LIMIT_DEV_ACCESS}, found on {}",
                section.endpoints.len()
            )));
        }
    }
    Ok(())
}

/// Turns the driver status and the configuration files into a [`SectionMap`].
pub struct ConfigScanner<S: DriverStatus> {
    status: S,
    config_dir: PathBuf,
    io_timeout: Duration,
}

impl<S: DriverStatus> ConfigScanner<S> {
    pub fn new(status: S, config_dir: impl Into<PathBuf>, io_timeout: Duration) -> Self {
        ConfigScanner {
            status,
            config_dir: config_dir.into(),
            io_timeout,
        }
    }

    /// Scan every supported device and merge its sections.
    ///
    /// No partial result is ever returned: the first failure aborts the scan.
    ///
    /// # Returns: `Result<SectionMap, AccelError>`
    /// * `Ok(SectionMap)` - Sections of all devices, endpoints in discovery order
    /// * `Err(AccelError::Command | AccelError::Timeout)` - The status query failed
    /// * `Err(AccelError::IORead | AccelError::Parse)` - A configuration file is unreadable or malformed
    /// * `Err(AccelError::Consistency)` - Devices disagree about a section or a device is listed twice
    pub async fn scan(&self) -> Result<SectionMap, AccelError> {
        let output = self.status.status().await?;
        let records = parse_status(&output);

        let mut seen = BTreeSet::new();
        let mut sections = SectionMap::new();
        for record in &records {
            if !seen.insert(record.device_id.as_str()) {
                return Err(AccelError::Consistency(format!(
                    "device {} is listed more than once by the driver status",
                    record.device_id
                )));
            }
            let conf_path = self
                .config_dir
                .join(format!("{}_{}.conf", record.device_type, record.device_id));
            let contents = fs_read_bounded(&conf_path, self.io_timeout).await?;
            let conf = ConfFile::parse(&conf_path, &contents)?;
            debug!(
                "Scanning {} device {} from {conf_path:?}",
                record.device_type, record.device_id
            );

            for (name, entries) in conf.sections() {
                if RESERVED_SECTIONS.contains(&name) {
                    continue;
                }
                let decl = SectionDecl::from_conf(&conf_path, name, entries)?;
                merge_section(&mut sections, name, &record.device_id, decl)?;
            }
        }
        check_pinned_coverage(&sections, records.len())?;

        info!(
            "Scanned {} QAT device(s), found {} section(s)",
            records.len(),
            sections.len()
        );
        Ok(sections)
    }
}

fn is_uio_node(name: &str) -> bool {
    name.strip_prefix("uio")
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

/// Collect the device nodes granted to every QAT instance.
///
/// # Returns: `Result<BTreeSet<PathBuf>, AccelError>`
/// * `Ok(BTreeSet<PathBuf>)` - The common control nodes plus every `uioN` node of `dev_dir`
/// * `Err(AccelError::IOReadDir)` - `dev_dir` cannot be listed
pub fn discover_device_nodes(dev_dir: &Path) -> Result<BTreeSet<PathBuf>, AccelError> {
    let mut nodes: BTreeSet<PathBuf> = QAT_COMMON_NODES
        .iter()
        .map(|node| dev_dir.join(node))
        .collect();
    nodes.extend(
        fs_read_dir(dev_dir)?
            .into_iter()
            .filter(|name| is_uio_node(name))
            .map(|name| dev_dir.join(name)),
    );
    Ok(nodes)
}
