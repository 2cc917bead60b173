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

//! Human readable reports for `fpga_tool`. Formatting only, no I/O.
//!
//! Quiet mode keeps the identifying lines and drops the rest.

use crate::fpga::bitstream::Bitstream;
use crate::fpga::dfl::{FmeSummary, PciDevice, PortSummary};
use std::fmt::Display;
use std::path::{Path, PathBuf};

const LABEL_WIDTH: usize = 24;

#[derive(Default)]
struct Report {
    text: String,
}

impl Report {
    fn line(&mut self, indent: usize, label: &str, value: impl Display) {
        let width = LABEL_WIDTH.saturating_sub(indent);
        self.text
            .push_str(&format!("{:indent$}{label:<width$}: {value}\n", ""));
    }

    fn optional(&mut self, indent: usize, label: &str, value: Option<impl Display>) {
        if let Some(value) = value {
            self.line(indent, label, value);
        }
    }

    fn finish(self) -> String {
        self.text
    }
}

pub fn bitstream_info(bitstream: &dyn Bitstream, install_root: &Path, quiet: bool) -> String {
    let identity = bitstream.identity();
    let mut report = Report::default();
    report.line(0, "Bitstream file", format!("{:?}", bitstream.path()));
    report.line(0, "Interface UUID", &identity.interface_uuid);
    report.line(0, "Accelerator Type UUID", &identity.accelerator_type_uuid);
    report.line(0, "Unique UUID", &identity.unique_uuid);
    report.line(
        0,
        "Installation Path",
        format!("{:?}", bitstream.install_path(install_root)),
    );
    if !quiet && !identity.extra_metadata.is_empty() {
        report.text.push_str("Metadata:\n");
        for (key, value) in &identity.extra_metadata {
            report.line(2, key, value);
        }
    }
    report.finish()
}

fn pci_info(report: &mut Report, pci: &PciDevice, quiet: bool) {
    report.line(0, "PCIe s:b:d.f", &pci.bdf);
    if quiet {
        return;
    }
    report.line(2, "Vendor Id", &pci.vendor);
    report.line(2, "Device Id", &pci.device);
    report.line(2, "Device Class", &pci.class);
    report.line(2, "Local CPUs", &pci.local_cpus);
    report.line(2, "NUMA", &pci.numa_node);
    if let Some((current, total)) = &pci.sriov_vfs {
        report.line(2, "SR-IOV Virtual Functions", current);
        report.line(2, "SR-IOV Total VFs", total);
    }
    report.optional(2, "SR-IOV Physical Function", pci.physfn.as_ref());
}

pub fn fme_info(fme: &FmeSummary, quiet: bool) -> String {
    let mut report = Report::default();
    report.line(0, "Name", &fme.name);
    report.line(0, "Device Node", fme.dev_path.display());
    report.line(0, "Interface UUID", &fme.interface_uuid);
    if !quiet {
        report.line(0, "SysFS Path", fme.sysfs_path.display());
        report.optional(0, "Ports Num", fme.ports_num.as_ref());
        report.optional(0, "Socket Id", fme.socket_id.as_ref());
        report.optional(0, "Bitstream Id", fme.bitstream_id.as_ref());
        report.optional(0, "Bitstream Metadata", fme.bitstream_metadata.as_ref());
        report.optional(0, "Kernel API Version", fme.api_version);
    }
    pci_info(&mut report, &fme.pci, quiet);
    report.finish()
}

pub fn port_info(port: &PortSummary, quiet: bool) -> String {
    let mut report = Report::default();
    report.line(0, "Name", &port.name);
    report.line(0, "Device Node", port.dev_path.display());
    report.line(0, "Interface UUID", &port.interface_uuid);
    report.line(0, "Accelerator Type UUID", &port.accelerator_type_uuid);
    if !quiet {
        report.line(0, "SysFS Path", port.sysfs_path.display());
        report.line(0, "Port Id", port.port_id);
        report.line(0, "FME", &port.fme_name);
        report.optional(0, "Kernel API Version", port.api_version);
        if let Some(info) = &port.port_info {
            report.line(0, "Regions", info.num_regions);
            report.line(0, "UMsgs", info.num_umsgs);
        }
        for region in &port.regions {
            report.line(
                2,
                &format!("Region {}", region.index),
                format!(
                    "size {:#x} offset {:#x} flags {:#x}",
                    region.size, region.offset, region.flags
                ),
            );
        }
    }
    pci_info(&mut report, &port.pci, quiet);
    report.finish()
}

/// Device nodes of FMEs and ports, each list omitted unless requested.
pub fn device_list(
    fmes: &[PathBuf],
    ports: &[PathBuf],
    show_fmes: bool,
    show_ports: bool,
    quiet: bool,
) -> String {
    let mut text = String::new();
    let mut section = |title: &str, devices: &[PathBuf]| {
        if !quiet {
            text.push_str(&format!("Detected FPGA {title}: {}\n", devices.len()));
        }
        for device in devices {
            text.push_str(&format!("{}\n", device.display()));
        }
    };
    if show_fmes {
        section("FMEs", fmes);
    }
    if show_ports {
        section("Ports", ports);
    }
    text
}
