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
use accelplug::fpga::dfl::DflTopology;
use accelplug::fpga::reprogram::reprogram;
use std::path::Path;

/// Program `bitstream` into the port at `device`.
///
/// The report is printed even when programming fails, the error is returned for the exit status.
pub fn program(
    topology: &DflTopology,
    device: &Path,
    bitstream: &Path,
    dry_run: bool,
    quiet: bool,
) -> Result<String, AccelError> {
    let port = topology.port(device)?;
    let bitstream = open_bitstream(bitstream)?;
    let report = reprogram(&port, bitstream.as_ref(), dry_run)?;
    let rendered = if quiet { String::new() } else { report.render() };
    match report.into_result() {
        Ok(()) => Ok(rendered),
        Err(e) => {
            print!("{rendered}");
            Err(e)
        }
    }
}
