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

//! FPGA bitstream management for Linux DFL (Device Feature List) devices.
//!
//! A DFL card exposes one FME (FPGA Management Engine) and one or more ports. Ports are
//! reprogrammed through the FME with partial reconfiguration, which only succeeds for
//! bitstreams built against the interface the FME currently exposes.

pub mod bitstream;
pub mod dfl;
pub mod installer;
pub mod port;
pub mod reprogram;
pub mod report;

/// Lowercase a UUID and strip its dashes, e.g. `69528DB6-EB31-...` to `69528db6eb31...`.
///
/// # Returns: `Option<String>`
/// * `Some(String)` - 32 lowercase hex digits
/// * `None` - The input is not a UUID
pub fn canonical_uuid(raw: &str) -> Option<String> {
    let uuid: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    (uuid.len() == 32 && uuid.chars().all(|c| c.is_ascii_hexdigit())).then_some(uuid)
}
