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

use accelplug::error::AccelError;
use accelplug::fpga::bitstream::open_bitstream;
use accelplug::fpga::dfl::{DflTopology, is_fme, is_port};
use accelplug::fpga::report;
use std::path::Path;

/// Identity and install location of the bitstream at `path`.
pub fn bitstream_info(path: &Path, install_root: &Path, quiet: bool) -> Result<String, AccelError> {
    let bitstream = open_bitstream(path)?;
    Ok(report::bitstream_info(bitstream.as_ref(), install_root, quiet))
}

pub fn fme_info(topology: &DflTopology, device: &Path, quiet: bool) -> Result<String, AccelError> {
    let summary = topology.fme(device)?.summary()?;
    Ok(report::fme_info(&summary, quiet))
}

pub fn port_info(topology: &DflTopology, device: &Path, quiet: bool) -> Result<String, AccelError> {
    let summary = topology.port(device)?.summary()?;
    Ok(report::port_info(&summary, quiet))
}

/// `fmeinfo` or `portinfo`, depending on the device node name.
pub fn fpga_info(topology: &DflTopology, device: &Path, quiet: bool) -> Result<String, AccelError> {
    if is_fme(device) {
        fme_info(topology, device, quiet)
    } else if is_port(device) {
        port_info(topology, device, quiet)
    } else {
        Err(AccelError::Argument(format!(
            "Unknown FPGA device file {device:?}, expected a dfl-fme.N or dfl-port.N node"
        )))
    }
}
