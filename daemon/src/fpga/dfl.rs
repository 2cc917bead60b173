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

//! Sysfs and device node model of DFL FPGA cards.
//!
//! A card is a PCI function carrying an FPGA region with one FME and its ports:
//! ```text
//! /sys/devices/pci0000:00/0000:00:01.0/0000:5e:00.0/          PCI function
//!     fpga_region/region0/dfl-fme.0/                           FME
//!         dfl-fme-region.1/fpga_region/region1/compat_id       FME interface UUID
//!     fpga_region/region0/dfl-port.0/afu_id                    port AFU UUID
//! /sys/bus/platform/devices/dfl-fme.0 -> ../../../devices/...  lookup by name
//! /dev/dfl-fme.0, /dev/dfl-port.0                              device nodes
//! ```

pub mod ioctl;

use crate::config::Settings;
use crate::error::AccelError;
use crate::fpga::bitstream::Bitstream;
use crate::fpga::canonical_uuid;
use crate::fpga::port::{PortIdentity, ReprogrammablePort};
use crate::system_io::{fs_canonicalize, fs_read_attr, fs_read_dir};
use ioctl::{PortInfo, RegionInfo};
use log::{info, trace, warn};
use std::path::{Path, PathBuf};

pub static FME_PREFIX: &str = "dfl-fme.";
pub static PORT_PREFIX: &str = "dfl-port.";
static FME_REGION_PREFIX: &str = "dfl-fme-region.";
static PLATFORM_DEVICES_DIR: &str = "bus/platform/devices";

fn file_name(path: &Path) -> Result<String, AccelError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| AccelError::Argument(format!("{path:?} does not name a device")))
}

/// Whether `path` names an FME device node.
pub fn is_fme(path: &Path) -> bool {
    file_name(path).is_ok_and(|name| name.starts_with(FME_PREFIX))
}

/// Whether `path` names a port device node.
pub fn is_port(path: &Path) -> bool {
    file_name(path).is_ok_and(|name| name.starts_with(PORT_PREFIX))
}

/// Entry point to the DFL devices below a sysfs and a device directory.
#[derive(Debug, Clone)]
pub struct DflTopology {
    dev_dir: PathBuf,
    sysfs_dir: PathBuf,
}

impl DflTopology {
    pub fn new(dev_dir: impl Into<PathBuf>, sysfs_dir: impl Into<PathBuf>) -> Self {
        DflTopology {
            dev_dir: dev_dir.into(),
            sysfs_dir: sysfs_dir.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        DflTopology::new(&settings.dev_dir, &settings.sysfs_dir)
    }

    /// Device nodes of all FMEs and all ports, each sorted.
    pub fn list_devices(&self) -> Result<(Vec<PathBuf>, Vec<PathBuf>), AccelError> {
        let mut fmes = vec![];
        let mut ports = vec![];
        for name in fs_read_dir(&self.dev_dir)? {
            if name.starts_with(FME_PREFIX) {
                fmes.push(self.dev_dir.join(name));
            } else if name.starts_with(PORT_PREFIX) {
                ports.push(self.dev_dir.join(name));
            }
        }
        Ok((fmes, ports))
    }

    fn sysfs_path(&self, name: &str) -> Result<PathBuf, AccelError> {
        fs_canonicalize(&self.sysfs_dir.join(PLATFORM_DEVICES_DIR).join(name))
    }

    pub fn fme(&self, dev_path: &Path) -> Result<DflFme, AccelError> {
        let name = file_name(dev_path)?;
        if !name.starts_with(FME_PREFIX) {
            return Err(AccelError::Argument(format!(
                "{dev_path:?} is not an FME device"
            )));
        }
        Ok(DflFme {
            sysfs_path: self.sysfs_path(&name)?,
            dev_path: dev_path.into(),
            name,
        })
    }

    pub fn port(&self, dev_path: &Path) -> Result<DflPort, AccelError> {
        let name = file_name(dev_path)?;
        if !name.starts_with(PORT_PREFIX) {
            return Err(AccelError::Argument(format!(
                "{dev_path:?} is not a port device"
            )));
        }
        Ok(DflPort {
            sysfs_path: self.sysfs_path(&name)?,
            dev_path: dev_path.into(),
            dev_dir: self.dev_dir.clone(),
            name,
        })
    }
}

/// Nearest ancestor of `sysfs_path` that is a PCI function.
fn pci_device_above(sysfs_path: &Path) -> Result<PciDevice, AccelError> {
    sysfs_path
        .ancestors()
        .skip(1)
        .find(|dir| dir.join("vendor").is_file() && dir.join("device").is_file())
        .ok_or_else(|| {
            AccelError::Hardware(format!("No PCI device found above {sysfs_path:?}"))
        })
        .and_then(PciDevice::from_sysfs)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DflFme {
    pub name: String,
    pub dev_path: PathBuf,
    pub sysfs_path: PathBuf,
}

impl DflFme {
    fn attr(&self, attr: &str) -> Result<String, AccelError> {
        fs_read_attr(&self.sysfs_path.join(attr))
    }

    /// The interface the FME exposes, from the `compat_id` of its FPGA region.
    pub fn interface_uuid(&self) -> Result<String, AccelError> {
        for entry in fs_read_dir(&self.sysfs_path)? {
            if !entry.starts_with(FME_REGION_PREFIX) {
                continue;
            }
            let regions_dir = self.sysfs_path.join(&entry).join("fpga_region");
            if let Some(region) = fs_read_dir(&regions_dir)?.into_iter().next() {
                let compat_id_path = regions_dir.join(region).join("compat_id");
                let compat_id = fs_read_attr(&compat_id_path)?;
                return canonical_uuid(&compat_id).ok_or_else(|| {
                    AccelError::Hardware(format!(
                        "Malformed compat_id '{compat_id}' in {compat_id_path:?}"
                    ))
                });
            }
        }
        Err(AccelError::Hardware(format!(
            "No FPGA region with a compat_id below {:?}",
            self.sysfs_path
        )))
    }

    pub fn pci_device(&self) -> Result<PciDevice, AccelError> {
        pci_device_above(&self.sysfs_path)
    }

    pub fn api_version(&self) -> Result<i32, AccelError> {
        ioctl::get_api_version(&self.dev_path)
    }

    /// Gather everything `fmeinfo` shows. Optional attributes missing on older kernels are `None`.
    pub fn summary(&self) -> Result<FmeSummary, AccelError> {
        Ok(FmeSummary {
            name: self.name.clone(),
            dev_path: self.dev_path.clone(),
            sysfs_path: self.sysfs_path.clone(),
            interface_uuid: self.interface_uuid()?,
            ports_num: self.attr("ports_num").ok(),
            socket_id: self.attr("socket_id").ok(),
            bitstream_id: self.attr("bitstream_id").ok(),
            bitstream_metadata: self.attr("bitstream_metadata").ok(),
            api_version: self
                .api_version()
                .inspect_err(|e| trace!("No API version for {}: {e}", self.name))
                .ok(),
            pci: self.pci_device()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DflPort {
    pub name: String,
    pub dev_path: PathBuf,
    pub sysfs_path: PathBuf,
    dev_dir: PathBuf,
}

impl DflPort {
    fn attr(&self, attr: &str) -> Result<String, AccelError> {
        fs_read_attr(&self.sysfs_path.join(attr))
    }

    pub fn port_id(&self) -> Result<u32, AccelError> {
        let id = self.attr("id")?;
        id.parse::<u32>().map_err(|e| {
            AccelError::Hardware(format!("Invalid id '{id}' for port {}: {e}", self.name))
        })
    }

    pub fn afu_id(&self) -> Result<String, AccelError> {
        let afu_id = self.attr("afu_id")?;
        canonical_uuid(&afu_id).ok_or_else(|| {
            AccelError::Hardware(format!("Malformed afu_id '{afu_id}' for port {}", self.name))
        })
    }

    /// The FME sharing this port's FPGA region.
    pub fn fme(&self) -> Result<DflFme, AccelError> {
        let region = self.sysfs_path.parent().ok_or_else(|| {
            AccelError::Hardware(format!("Port {} has no parent region", self.name))
        })?;
        let name = fs_read_dir(region)?
            .into_iter()
            .find(|entry| entry.starts_with(FME_PREFIX))
            .ok_or_else(|| AccelError::Hardware(format!("No FME found for port {}", self.name)))?;
        Ok(DflFme {
            dev_path: self.dev_dir.join(&name),
            sysfs_path: region.join(&name),
            name,
        })
    }

    pub fn pci_device(&self) -> Result<PciDevice, AccelError> {
        pci_device_above(&self.sysfs_path)
    }

    pub fn port_info(&self) -> Result<PortInfo, AccelError> {
        ioctl::port_info(&self.dev_path)
    }

    pub fn region_info(&self, index: u32) -> Result<RegionInfo, AccelError> {
        ioctl::region_info(&self.dev_path, index)
    }

    /// Gather everything `portinfo` shows. The ioctl based parts are `None` without access to
    /// the device node.
    pub fn summary(&self) -> Result<PortSummary, AccelError> {
        let fme = self.fme()?;
        let port_info = self
            .port_info()
            .inspect_err(|e| trace!("No port info for {}: {e}", self.name))
            .ok();
        let regions = match &port_info {
            Some(info) => (0..info.num_regions)
                .map(|index| self.region_info(index))
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![],
        };
        Ok(PortSummary {
            name: self.name.clone(),
            dev_path: self.dev_path.clone(),
            sysfs_path: self.sysfs_path.clone(),
            port_id: self.port_id()?,
            interface_uuid: fme.interface_uuid()?,
            accelerator_type_uuid: self.afu_id()?,
            fme_name: fme.name,
            api_version: ioctl::get_api_version(&self.dev_path).ok(),
            port_info,
            regions,
            pci: self.pci_device()?,
        })
    }
}

impl ReprogrammablePort for DflPort {
    fn name(&self) -> String {
        self.dev_path.display().to_string()
    }

    fn identity(&self) -> Result<PortIdentity, AccelError> {
        Ok(PortIdentity {
            interface_uuid: self.fme()?.interface_uuid()?,
            accelerator_type_uuid: self.afu_id()?,
        })
    }

    /// Reject bitstreams built for another interface, then program through the FME.
    fn program(&self, bitstream: &dyn Bitstream, dry_run: bool) -> Result<(), AccelError> {
        let fme = self.fme()?;
        let fme_interface = fme.interface_uuid()?;
        let wanted = &bitstream.identity().interface_uuid;
        if fme_interface != *wanted {
            return Err(AccelError::Hardware(format!(
                "FME interface UUID {fme_interface} and bitstream interface UUID {wanted} mismatch"
            )));
        }
        let port_id = self.port_id()?;
        if dry_run {
            info!(
                "dry-run: {:?} is compatible with port {port_id} of {}",
                bitstream.path(),
                fme.name
            );
            return Ok(());
        }

        let data = bitstream.raw_data()?;
        if data.len() % 4 != 0 {
            warn!("Bitstream size {} is not a multiple of 4 bytes", data.len());
        }
        ioctl::fme_port_pr(&fme.dev_path, port_id, &data)?;
        info!("Programmed port {port_id} of {} with {:?}", fme.name, bitstream.path());
        Ok(())
    }
}

/// A PCI function as seen in sysfs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PciDevice {
    pub bdf: String,
    pub vendor: String,
    pub device: String,
    pub class: String,
    pub local_cpus: String,
    pub numa_node: String,
    /// Current and total SR-IOV virtual functions, when SR-IOV is supported.
    pub sriov_vfs: Option<(String, String)>,
    /// BDF of the physical function, for virtual functions.
    pub physfn: Option<String>,
}

impl PciDevice {
    pub fn from_sysfs(dir: &Path) -> Result<PciDevice, AccelError> {
        let attr = |name: &str| fs_read_attr(&dir.join(name));
        let sriov_vfs = match (attr("sriov_numvfs"), attr("sriov_totalvfs")) {
            (Ok(current), Ok(total)) => Some((current, total)),
            _ => None,
        };
        let physfn = fs_canonicalize(&dir.join("physfn"))
            .ok()
            .and_then(|path| file_name(&path).ok());
        Ok(PciDevice {
            bdf: file_name(dir)?,
            vendor: attr("vendor")?,
            device: attr("device")?,
            class: attr("class")?,
            local_cpus: attr("local_cpulist")?,
            numa_node: attr("numa_node")?,
            sriov_vfs,
            physfn,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FmeSummary {
    pub name: String,
    pub dev_path: PathBuf,
    pub sysfs_path: PathBuf,
    pub interface_uuid: String,
    pub ports_num: Option<String>,
    pub socket_id: Option<String>,
    pub bitstream_id: Option<String>,
    pub bitstream_metadata: Option<String>,
    pub api_version: Option<i32>,
    pub pci: PciDevice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSummary {
    pub name: String,
    pub dev_path: PathBuf,
    pub sysfs_path: PathBuf,
    pub port_id: u32,
    pub interface_uuid: String,
    pub accelerator_type_uuid: String,
    pub fme_name: String,
    pub api_version: Option<i32>,
    pub port_info: Option<PortInfo>,
    pub regions: Vec<RegionInfo>,
    pub pci: PciDevice,
}
