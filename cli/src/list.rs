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
use accelplug::fpga::dfl::DflTopology;
use accelplug::fpga::report;

pub fn list(
    topology: &DflTopology,
    fmes: bool,
    ports: bool,
    quiet: bool,
) -> Result<String, AccelError> {
    let (fme_nodes, port_nodes) = topology.list_devices()?;
    Ok(report::device_list(&fme_nodes, &port_nodes, fmes, ports, quiet))
}
