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
use accelplug::fpga::installer;
use std::fmt::Write;
use std::path::Path;

/// Install `source` below `root`. A dry run only reports the planned destination.
pub fn install(
    source: &Path,
    root: &Path,
    dry_run: bool,
    force: bool,
    quiet: bool,
) -> Result<String, AccelError> {
    let bitstream = open_bitstream(source)?;
    let destination = bitstream.install_path(root);
    let mut out = String::new();
    if !quiet {
        let _ = writeln!(out, "Installing bitstream {source:?} as {destination:?}");
    }
    if dry_run {
        if !quiet {
            let _ = writeln!(out, "Dry-run: nothing copied");
            if destination.exists() && !force {
                let _ = writeln!(out, "Destination already exists, --force is required");
            }
        }
        return Ok(out);
    }
    installer::install(bitstream.as_ref(), root, force)?;
    Ok(out)
}
